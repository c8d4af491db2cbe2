/*
 * Responsibility
 * - Public interface of the middleware layer (re-exports)
 * - auth::bearer::apply(...) for protected routes, http::apply(...) for everything
 */
pub mod auth;
pub mod http;
