//! In-memory stand-ins for the metadata store, the object store and the
//! identity provider.

use async_trait::async_trait;
use logistics_intake_lib::db::MetadataStore;
use logistics_intake_lib::error::{AppError, AppResult};
use logistics_intake_lib::models::{Company, UploadRecord, UserInfo};
use logistics_intake_lib::services::identity::TokenSet;
use logistics_intake_lib::services::{AuthFlow, BlobStore, IdentityGateway};
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// Companies and upload records kept in vectors.
#[derive(Default)]
pub struct InMemoryMetadata {
    pub companies: Mutex<Vec<Company>>,
    pub uploads: Mutex<Vec<UploadRecord>>,
    /// Every call fails with a database error while set
    pub fail: AtomicBool,
}

impl InMemoryMetadata {
    pub fn with_company(self, name: &str) -> Self {
        let company = Company::new(name).expect("valid company name");
        self.companies.lock().unwrap().push(company);
        self
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }

    pub fn company_ids(&self) -> Vec<String> {
        self.companies
            .lock()
            .unwrap()
            .iter()
            .map(|c| c.company_id.clone())
            .collect()
    }

    pub fn upload_records(&self) -> Vec<UploadRecord> {
        self.uploads.lock().unwrap().clone()
    }

    fn check(&self) -> AppResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::Database("table unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl MetadataStore for InMemoryMetadata {
    async fn scan_companies(&self) -> AppResult<Vec<Company>> {
        self.check()?;
        Ok(self.companies.lock().unwrap().clone())
    }

    async fn get_company(&self, company_id: &str) -> AppResult<Option<Company>> {
        self.check()?;
        Ok(self
            .companies
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.company_id == company_id)
            .cloned())
    }

    async fn create_company(&self, company: &Company) -> AppResult<()> {
        self.check()?;
        let mut companies = self.companies.lock().unwrap();
        if companies.iter().any(|c| c.company_id == company.company_id) {
            return Err(AppError::Conflict("Company already exists".to_string()));
        }
        companies.push(company.clone());
        Ok(())
    }

    async fn scan_uploads(&self, limit: usize) -> AppResult<Vec<UploadRecord>> {
        self.check()?;
        Ok(self.uploads.lock().unwrap().iter().take(limit).cloned().collect())
    }

    async fn scan_uploads_for_company(&self, company_id: &str) -> AppResult<Vec<UploadRecord>> {
        self.check()?;
        Ok(self
            .uploads
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.company_id == company_id)
            .cloned()
            .collect())
    }

    async fn put_upload(&self, record: &UploadRecord) -> AppResult<()> {
        self.check()?;
        self.uploads.lock().unwrap().push(record.clone());
        Ok(())
    }
}

/// One stored object.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub key: String,
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Object store keeping every object in memory.
#[derive(Default)]
pub struct InMemoryBlobs {
    pub objects: Mutex<Vec<StoredObject>>,
    pub fail: AtomicBool,
}

impl InMemoryBlobs {
    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }

    pub fn stored(&self) -> Vec<StoredObject> {
        self.objects.lock().unwrap().clone()
    }

    /// Add an object directly, bypassing the upload flow.
    pub fn insert(&self, key: &str) {
        self.objects.lock().unwrap().push(StoredObject {
            key: key.to_string(),
            bytes: Vec::new(),
            content_type: "application/octet-stream".to_string(),
        });
    }

    fn check(&self) -> AppResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::Storage("bucket unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobs {
    async fn put_object(&self, key: &str, data: Vec<u8>, content_type: &str) -> AppResult<()> {
        self.check()?;
        let mut objects = self.objects.lock().unwrap();
        objects.retain(|o| o.key != key);
        objects.push(StoredObject {
            key: key.to_string(),
            bytes: data,
            content_type: content_type.to_string(),
        });
        Ok(())
    }

    async fn list_keys(&self, prefix: &str) -> AppResult<Vec<String>> {
        self.check()?;
        Ok(self
            .objects
            .lock()
            .unwrap()
            .iter()
            .filter(|o| o.key.starts_with(prefix))
            .map(|o| o.key.clone())
            .collect())
    }
}

/// Identity provider driven by the authorization code itself.
///
/// Codes look like `admin:<email>` or `client:<email>`; anything else is
/// rejected at the token endpoint.
#[derive(Default)]
pub struct FakeIdentity {
    pub logout_url: Option<String>,
    /// Codes passed to `exchange_code`, in order
    pub exchanged: Mutex<Vec<String>>,
}

impl FakeIdentity {
    pub fn with_logout_url(url: &str) -> Self {
        Self {
            logout_url: Some(url.to_string()),
            ..Default::default()
        }
    }

    pub fn exchanged_codes(&self) -> Vec<String> {
        self.exchanged.lock().unwrap().clone()
    }
}

#[async_trait]
impl IdentityGateway for FakeIdentity {
    fn authorization_url(&self, flow: &AuthFlow) -> AppResult<String> {
        Ok(format!(
            "https://idp.test/oauth2/authorize?state={}&nonce={}",
            flow.state, flow.nonce
        ))
    }

    async fn exchange_code(&self, code: &str, flow: &AuthFlow) -> AppResult<TokenSet> {
        self.exchanged.lock().unwrap().push(code.to_string());

        let (role, email) = code
            .split_once(':')
            .ok_or_else(|| AppError::AuthFlow("invalid_grant".to_string()))?;
        let claims = match role {
            "admin" => json!({
                "sub": email,
                "email": email,
                "nonce": flow.nonce,
                "cognito:groups": ["admin"],
            }),
            "client" => json!({"sub": email, "email": email, "nonce": flow.nonce}),
            _ => return Err(AppError::AuthFlow("invalid_grant".to_string())),
        };

        Ok(TokenSet {
            // The access token carries the email so user_info can answer
            access_token: SecretString::from(email.to_string()),
            id_token_claims: claims.as_object().cloned().unwrap_or_default(),
        })
    }

    async fn user_info(&self, tokens: &TokenSet) -> AppResult<UserInfo> {
        let email = tokens.access_token.expose_secret().to_string();
        Ok(UserInfo {
            sub: email.clone(),
            email: Some(email),
            ..Default::default()
        })
    }

    fn logout_url(&self) -> Option<String> {
        self.logout_url.clone()
    }
}
