//! Bearer token validation for Azure AD / Entra ID protected APIs.
//!
//! ```ignore
//! let cancel = CancellationToken::new();
//! let validator = Validator::new(
//!     "contoso",
//!     cancel.clone(),
//!     ValidatorOptions::default().with_audiences(["api://myapp"]),
//! )
//! .await?;
//!
//! let protected = middleware::auth::bearer::apply(router, Arc::new(validator));
//! ```
pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod services;
pub mod state;

pub use error::AppError;
pub use middleware::auth::{claims_from_extensions, claims_from_request};
pub use services::auth::{AuthError, UserClaims, Validator, ValidatorOptions};
