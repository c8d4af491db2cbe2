/*!
 * Handler 向け extractor
 *
 * Public API:
 * - AuthClaims
 */
mod claims;

pub use claims::AuthClaims;
