/// Post service - handles post creation, retrieval and author-only editing
use crate::db::BlogRepository;
use crate::error::{AppError, Result};
use crate::metrics::POSTS_CREATED_TOTAL;
use crate::models::{CommentView, NewPost, Post, PostChanges, PostFilter, PostView};
use std::sync::Arc;

/// Outcome of checking whether a viewer may edit a post.
#[derive(Debug)]
pub enum EditAccess {
    Allowed(Post),
    NotAuthor(Post),
}

/// A single post with everything its page shows.
#[derive(Debug)]
pub struct PostDetail {
    pub post: PostView,
    pub comments: Vec<CommentView>,
    pub author_post_count: i64,
}

#[derive(Clone)]
pub struct PostService {
    repo: Arc<dyn BlogRepository>,
}

impl PostService {
    pub fn new(repo: Arc<dyn BlogRepository>) -> Self {
        Self { repo }
    }

    /// Create a new post
    pub async fn create_post(&self, post: NewPost) -> Result<Post> {
        let created = self.repo.create_post(&post).await?;
        POSTS_CREATED_TOTAL.inc();
        tracing::info!(post_id = created.id, author_id = created.author_id, "post created");
        Ok(created)
    }

    /// Get a post with its author, group and comments
    pub async fn get_post_detail(&self, post_id: i64) -> Result<PostDetail> {
        let post = self
            .repo
            .find_post_view(post_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("post {}", post_id)))?;
        let comments = self.repo.list_comments(post_id).await?;
        let author_post_count = self
            .repo
            .count_posts(PostFilter::Author(post.author.id))
            .await?;

        Ok(PostDetail {
            post,
            comments,
            author_post_count,
        })
    }

    pub async fn edit_access(&self, post_id: i64, viewer_id: i64) -> Result<EditAccess> {
        let post = self
            .repo
            .find_post(post_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("post {}", post_id)))?;

        if post.author_id == viewer_id {
            Ok(EditAccess::Allowed(post))
        } else {
            Ok(EditAccess::NotAuthor(post))
        }
    }

    /// Apply `changes` to a post the caller already confirmed is editable
    pub async fn update_post(&self, post: &Post, changes: PostChanges) -> Result<Post> {
        let updated = self
            .repo
            .update_post(post.id, &changes)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("post {}", post.id)))?;
        tracing::info!(post_id = updated.id, "post updated");
        Ok(updated)
    }
}
