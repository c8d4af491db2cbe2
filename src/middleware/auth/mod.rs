pub mod bearer;
pub mod context;

pub use bearer::extract_bearer_token;
pub use context::{claims_from_extensions, claims_from_request};
