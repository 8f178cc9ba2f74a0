/// Request pipeline stages
///
/// - `ViewerMiddleware`: attaches the authenticated `Viewer` when a valid token is presented
/// - `LoginRequired`: redirects anonymous requests to the login page
/// - `PageCacheMiddleware`: serves and stores full-page GET responses
pub mod auth;
pub mod page_cache;

pub use auth::{login_redirect_url, LoginRequired, Viewer, ViewerMiddleware, ACCESS_TOKEN_COOKIE};
pub use page_cache::{page_cache_key, PageCacheMiddleware, CACHE_STATUS_HEADER};
