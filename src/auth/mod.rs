//! Session-based authentication and role checks.

mod extractor;
pub mod session;
mod store;

pub use extractor::{ACCESS_DENIED, AccessDeniedRedirect, AdminSession, ClientSession};
pub use session::{SESSION_COOKIE, SessionContext, session_key, session_middleware};
pub use store::MemorySessionStore;
