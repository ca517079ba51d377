//! Application configuration loaded from environment variables.

use secrecy::{ExposeSecret, SecretString};
use std::env;

/// Development default values - NEVER use in production.
pub mod defaults {
    pub const DEV_HOST: &str = "127.0.0.1";
    pub const DEV_PORT: u16 = 3000;
    pub const DEV_SESSION_SECRET: &str =
        "dev-session-secret-do-not-use-in-production-0123456789abcdef";
    pub const DEV_MAX_UPLOAD_SIZE: usize = 52_428_800; // 50MB per file

    pub const DEV_AWS_REGION: &str = "eu-central-1";
    pub const DEV_COMPANIES_TABLE: &str = "Companies";
    pub const DEV_UPLOADS_TABLE: &str = "LogisticsData";
    pub const DEV_S3_BUCKET: &str = "xyz-logistics-files";

    pub const DEV_OIDC_ISSUER_URL: &str = "http://localhost:9000";
    pub const DEV_OIDC_CLIENT_ID: &str = "logistics-intake-dev";
    pub const DEV_OIDC_CLIENT_SECRET: &str = "dev-client-secret";
    pub const DEV_OIDC_REDIRECT_URL: &str = "http://localhost:3000/callback";
    pub const DEV_OIDC_POST_LOGOUT_REDIRECT_URL: &str = "http://localhost:3000";
    pub const DEV_OIDC_GROUPS_CLAIM: &str = "cognito:groups";
    pub const DEV_OIDC_ADMIN_GROUP: &str = "admin";
}

/// Minimum session secret length accepted by the cookie key derivation.
pub const MIN_SESSION_SECRET_LEN: usize = 32;

/// Runtime environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    /// Parse environment from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Some(Self::Development),
            "production" | "prod" => Some(Self::Production),
            _ => None,
        }
    }

    /// Check if this is a development environment.
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    /// Check if this is a production environment.
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
        }
    }
}

/// Metadata store (DynamoDB) configuration.
#[derive(Debug, Clone)]
pub struct MetadataConfig {
    /// Endpoint override for a local emulator
    pub endpoint: Option<String>,
    pub companies_table: String,
    /// Shared table holding upload records
    pub uploads_table: String,
}

/// Blob store (S3) configuration.
#[derive(Debug, Clone)]
pub struct S3Config {
    /// S3 endpoint URL (for MinIO or custom S3-compatible services)
    pub endpoint: Option<String>,
    /// S3 bucket name
    pub bucket: String,
}

/// OpenID Connect client configuration.
#[derive(Debug)]
pub struct OidcConfig {
    /// Issuer URL; discovery reads `{issuer}/.well-known/openid-configuration`
    pub issuer_url: String,
    pub client_id: String,
    pub client_secret: SecretString,
    pub redirect_url: String,
    /// Explicit logout endpoint; falls back to the discovered `end_session_endpoint`
    pub logout_url: Option<String>,
    pub post_logout_redirect_url: String,
    /// ID token claim listing the user's groups
    pub groups_claim: String,
    /// Group whose members are admins (matched case-insensitively)
    pub admin_group: String,
}

/// Application configuration.
#[derive(Debug)]
pub struct Config {
    /// Runtime environment
    pub environment: Environment,
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Secret the session cookie key is derived from
    pub session_secret: SecretString,
    /// Maximum size of one uploaded file in bytes (default: 50MB)
    pub max_upload_size: usize,
    /// AWS region shared by the metadata and blob stores
    pub aws_region: String,
    pub metadata: MetadataConfig,
    pub s3: S3Config,
    pub oidc: OidcConfig,
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// In development mode (RUST_ENV=development) every variable has a
    /// default and only RUST_ENV is required. In production mode the server
    /// will NOT start while secrets or the OIDC client still use
    /// development defaults.
    ///
    /// Environment variables:
    /// - `RUST_ENV`: Environment (development/production) - REQUIRED
    /// - `INTAKE_HOST`: Server host (default: 127.0.0.1)
    /// - `INTAKE_PORT`: Server port (default: 3000)
    /// - `INTAKE_SESSION_SECRET`: Session cookie secret, at least 32 bytes
    /// - `INTAKE_MAX_UPLOAD_SIZE`: Max upload size in bytes (default: 50MB)
    /// - `AWS_REGION`: AWS region (default: eu-central-1)
    /// - `INTAKE_COMPANIES_TABLE`: Companies table (default: Companies)
    /// - `INTAKE_UPLOADS_TABLE`: Uploads table (default: LogisticsData)
    /// - `DYNAMODB_ENDPOINT`: DynamoDB endpoint override (local emulator)
    /// - `S3_BUCKET`: Bucket name (default: xyz-logistics-files)
    /// - `S3_ENDPOINT`: S3 endpoint override (MinIO)
    /// - `OIDC_ISSUER_URL`, `OIDC_CLIENT_ID`, `OIDC_CLIENT_SECRET`: OIDC client
    /// - `OIDC_REDIRECT_URL`: Callback URL registered with the provider
    /// - `OIDC_LOGOUT_URL`: Provider logout endpoint
    /// - `OIDC_POST_LOGOUT_REDIRECT_URL`: Where the provider returns after logout
    /// - `OIDC_GROUPS_CLAIM`: Group claim name (default: cognito:groups)
    /// - `OIDC_ADMIN_GROUP`: Admin group name (default: admin)
    pub fn from_env() -> Result<Self, ConfigError> {
        // Parse environment - required
        let env_str = env::var("RUST_ENV").map_err(|_| ConfigError::MissingEnvVar("RUST_ENV"))?;

        let environment = Environment::parse(&env_str).ok_or(ConfigError::InvalidValue(
            "RUST_ENV must be 'development' or 'production'",
        ))?;

        let host = var_or("INTAKE_HOST", defaults::DEV_HOST);

        let port = var_or("INTAKE_PORT", &defaults::DEV_PORT.to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidValue("INTAKE_PORT must be a valid port number"))?;

        let session_secret =
            SecretString::from(var_or("INTAKE_SESSION_SECRET", defaults::DEV_SESSION_SECRET));

        let max_upload_size = var_or(
            "INTAKE_MAX_UPLOAD_SIZE",
            &defaults::DEV_MAX_UPLOAD_SIZE.to_string(),
        )
        .parse::<usize>()
        .map_err(|_| ConfigError::InvalidValue("INTAKE_MAX_UPLOAD_SIZE must be a valid number"))?;

        let metadata = MetadataConfig {
            endpoint: env::var("DYNAMODB_ENDPOINT").ok(),
            companies_table: var_or("INTAKE_COMPANIES_TABLE", defaults::DEV_COMPANIES_TABLE),
            uploads_table: var_or("INTAKE_UPLOADS_TABLE", defaults::DEV_UPLOADS_TABLE),
        };

        let s3 = S3Config {
            endpoint: env::var("S3_ENDPOINT").ok(),
            bucket: var_or("S3_BUCKET", defaults::DEV_S3_BUCKET),
        };

        let oidc = OidcConfig {
            issuer_url: var_or("OIDC_ISSUER_URL", defaults::DEV_OIDC_ISSUER_URL),
            client_id: var_or("OIDC_CLIENT_ID", defaults::DEV_OIDC_CLIENT_ID),
            client_secret: SecretString::from(var_or(
                "OIDC_CLIENT_SECRET",
                defaults::DEV_OIDC_CLIENT_SECRET,
            )),
            redirect_url: var_or("OIDC_REDIRECT_URL", defaults::DEV_OIDC_REDIRECT_URL),
            logout_url: env::var("OIDC_LOGOUT_URL").ok(),
            post_logout_redirect_url: var_or(
                "OIDC_POST_LOGOUT_REDIRECT_URL",
                defaults::DEV_OIDC_POST_LOGOUT_REDIRECT_URL,
            ),
            groups_claim: var_or("OIDC_GROUPS_CLAIM", defaults::DEV_OIDC_GROUPS_CLAIM),
            admin_group: var_or("OIDC_ADMIN_GROUP", defaults::DEV_OIDC_ADMIN_GROUP),
        };

        let config = Config {
            environment,
            host,
            port,
            session_secret,
            max_upload_size,
            aws_region: var_or("AWS_REGION", defaults::DEV_AWS_REGION),
            metadata,
            s3,
            oidc,
        };

        config.validate()?;

        // Validate production configuration
        if environment.is_production() {
            config.validate_production()?;
        }

        Ok(config)
    }

    /// Checks that apply in every environment.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.session_secret.expose_secret().len() < MIN_SESSION_SECRET_LEN {
            return Err(ConfigError::InvalidValue(
                "INTAKE_SESSION_SECRET must be at least 32 bytes",
            ));
        }
        if self.max_upload_size == 0 {
            return Err(ConfigError::InvalidValue(
                "INTAKE_MAX_UPLOAD_SIZE must be greater than zero",
            ));
        }
        Ok(())
    }

    /// Validate that production configuration does not use development defaults.
    fn validate_production(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.session_secret.expose_secret() == defaults::DEV_SESSION_SECRET {
            errors.push(
                "INTAKE_SESSION_SECRET is using development default. Set a random secret."
                    .to_string(),
            );
        }

        if self.oidc.issuer_url == defaults::DEV_OIDC_ISSUER_URL {
            errors.push("OIDC_ISSUER_URL is using development default.".to_string());
        }

        if self.oidc.client_id == defaults::DEV_OIDC_CLIENT_ID
            || self.oidc.client_secret.expose_secret() == defaults::DEV_OIDC_CLIENT_SECRET
        {
            errors.push(
                "OIDC_CLIENT_ID/OIDC_CLIENT_SECRET are using development defaults. Set the registered client credentials."
                    .to_string(),
            );
        }

        if !errors.is_empty() {
            return Err(ConfigError::ProductionValidation(errors));
        }

        Ok(())
    }

    /// Get the server bind address.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if running in development mode.
    pub fn is_development(&self) -> bool {
        self.environment.is_development()
    }

    /// Session cookies are only marked `Secure` outside development.
    pub fn secure_cookies(&self) -> bool {
        self.environment.is_production()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(&'static str),

    #[error("Production configuration validation failed:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    ProductionValidation(Vec<String>),
}
