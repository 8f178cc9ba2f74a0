/// Comment service - comments attached to posts
use crate::db::BlogRepository;
use crate::error::{AppError, Result};
use crate::metrics::COMMENTS_CREATED_TOTAL;
use crate::models::Comment;
use std::sync::Arc;

#[derive(Clone)]
pub struct CommentService {
    repo: Arc<dyn BlogRepository>,
}

impl CommentService {
    pub fn new(repo: Arc<dyn BlogRepository>) -> Self {
        Self { repo }
    }

    /// Fails with `NotFound` when the post does not exist
    pub async fn ensure_post_exists(&self, post_id: i64) -> Result<()> {
        match self.repo.find_post(post_id).await? {
            Some(_) => Ok(()),
            None => Err(AppError::NotFound(format!("post {}", post_id))),
        }
    }

    /// Create a comment on a post; a missing post surfaces as `NotFound`
    /// from the repository.
    pub async fn create_comment(&self, post_id: i64, author_id: i64, text: &str) -> Result<Comment> {
        let comment = self.repo.create_comment(post_id, author_id, text).await?;
        COMMENTS_CREATED_TOTAL.inc();
        tracing::debug!(comment_id = comment.id, post_id, "comment created");
        Ok(comment)
    }
}
