/// Business logic layer for blog-service
///
/// - `pagination`: page windows over feed listings
/// - `feed`: index, group, profile and follow feeds
/// - `posts` / `comments`: publishing and editing content
/// - `follow`: the follow graph
/// - `auth`: password hashing, tokens and account lookup
pub mod auth;
pub mod comments;
pub mod feed;
pub mod follow;
pub mod pagination;
pub mod posts;

pub use auth::{AuthService, Claims, TokenService};
pub use comments::CommentService;
pub use feed::{FeedService, ProfileFeed};
pub use follow::{FollowOutcome, FollowService};
pub use pagination::{Page, PageWindow, Paginator};
pub use posts::{EditAccess, PostDetail, PostService};
