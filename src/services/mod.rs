//! Business logic services and external collaborators.

pub mod companies;
pub mod identity;
pub mod oidc;
pub mod storage;
pub mod uploads;

pub use identity::{AuthFlow, CallbackParams, IdentityGateway, RoleMapping, UnavailableGateway};
pub use oidc::OidcClient;
pub use storage::{BlobStore, S3Storage};
