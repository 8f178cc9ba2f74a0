use crate::db::BlogRepository;
use crate::error::{AppError, Result};
use crate::metrics::record_follow_event;
use crate::models::User;
use std::sync::Arc;

/// What a follow request ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowOutcome {
    Followed,
    AlreadyFollowing,
    /// Following yourself is a silent no-op
    SelfIgnored,
}

#[derive(Clone)]
pub struct FollowService {
    repo: Arc<dyn BlogRepository>,
}

impl FollowService {
    pub fn new(repo: Arc<dyn BlogRepository>) -> Self {
        Self { repo }
    }

    async fn target(&self, username: &str) -> Result<User> {
        self.repo
            .find_user_by_username(username)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user '{}'", username)))
    }

    /// Idempotent follow of `username` by `user_id`.
    pub async fn follow(&self, user_id: i64, username: &str) -> Result<FollowOutcome> {
        let author = self.target(username).await?;
        if author.id == user_id {
            record_follow_event("ignored");
            return Ok(FollowOutcome::SelfIgnored);
        }

        if self.repo.create_follow(user_id, author.id).await? {
            record_follow_event("follow");
            tracing::info!(user_id, author_id = author.id, "follow created");
            Ok(FollowOutcome::Followed)
        } else {
            Ok(FollowOutcome::AlreadyFollowing)
        }
    }

    /// Remove the edge; a missing edge is `NotFound`.
    pub async fn unfollow(&self, user_id: i64, username: &str) -> Result<()> {
        let author = self.target(username).await?;
        if !self.repo.delete_follow(user_id, author.id).await? {
            return Err(AppError::NotFound(format!(
                "follow of '{}'",
                author.username
            )));
        }

        record_follow_event("unfollow");
        tracing::info!(user_id, author_id = author.id, "follow removed");
        Ok(())
    }
}
