//! Persistence layer
//!
//! `BlogRepository` is the only way handlers and services reach stored data.
//! `PgRepository` backs it with PostgreSQL; `MemoryRepository` keeps
//! everything in process for tests and throwaway local runs.

pub mod memory;
pub mod postgres;

pub use memory::MemoryRepository;
pub use postgres::{create_pool, run_migrations, PgRepository};

use crate::error::Result;
use crate::models::{
    Comment, CommentView, FollowCounts, Group, NewGroup, NewPost, Post, PostChanges, PostFilter,
    PostView, User,
};

#[async_trait::async_trait]
pub trait BlogRepository: Send + Sync {
    /// Cheap round trip used by readiness checks
    async fn ping(&self) -> Result<()>;

    /// Fails with `AppError::Conflict` when the username is taken
    async fn create_user(&self, username: &str, password_hash: &str) -> Result<User>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Removes the user together with their posts, comments and follow edges
    async fn delete_user(&self, username: &str) -> Result<bool>;

    /// Fails with `AppError::Conflict` when the slug is taken
    async fn create_group(&self, group: &NewGroup) -> Result<Group>;

    async fn find_group_by_slug(&self, slug: &str) -> Result<Option<Group>>;

    async fn list_groups(&self) -> Result<Vec<Group>>;

    /// Posts of a deleted group survive with their group cleared
    async fn delete_group(&self, slug: &str) -> Result<bool>;

    async fn create_post(&self, post: &NewPost) -> Result<Post>;

    async fn find_post(&self, post_id: i64) -> Result<Option<Post>>;

    async fn find_post_view(&self, post_id: i64) -> Result<Option<PostView>>;

    /// Returns `None` when the post does not exist
    async fn update_post(&self, post_id: i64, changes: &PostChanges) -> Result<Option<Post>>;

    async fn count_posts(&self, filter: PostFilter) -> Result<i64>;

    /// Newest first, ties broken by id
    async fn list_posts(&self, filter: PostFilter, limit: i64, offset: i64)
        -> Result<Vec<PostView>>;

    async fn create_comment(&self, post_id: i64, author_id: i64, text: &str) -> Result<Comment>;

    /// Oldest first
    async fn list_comments(&self, post_id: i64) -> Result<Vec<CommentView>>;

    /// Idempotent; returns true if a new edge was stored
    async fn create_follow(&self, user_id: i64, author_id: i64) -> Result<bool>;

    /// Returns true if an edge was removed
    async fn delete_follow(&self, user_id: i64, author_id: i64) -> Result<bool>;

    async fn is_following(&self, user_id: i64, author_id: i64) -> Result<bool>;

    async fn follow_counts(&self, user_id: i64) -> Result<FollowCounts>;
}
