pub mod claims;
pub mod error;
pub mod jwks;
pub mod resolver;
pub mod validator;

#[cfg(test)]
pub(crate) mod test_support;

pub use claims::{RawClaims, TokenKind, UserClaims};
pub use error::{AuthError, InvalidTokenReason, KeySetError, TOKEN_INVALID_MESSAGE, ValidatorError};
pub use jwks::{JwksCache, JwksOptions};
pub use resolver::{DualKeySet, KeyResolver};
pub use validator::{Validator, ValidatorOptions};
