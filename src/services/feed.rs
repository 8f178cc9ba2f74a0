/// Feed service - paginated post listings for the index, group, profile and follow pages
use crate::db::BlogRepository;
use crate::error::{AppError, Result};
use crate::models::{FollowCounts, Group, PostFilter, PostView, User};
use crate::services::pagination::{Page, Paginator};
use std::sync::Arc;

/// An author's page as seen by a particular viewer.
#[derive(Debug)]
pub struct ProfileFeed {
    pub author: User,
    pub page: Page<PostView>,
    pub post_count: i64,
    /// True only for an authenticated viewer other than the author who follows them
    pub following: bool,
    pub counts: FollowCounts,
}

#[derive(Clone)]
pub struct FeedService {
    repo: Arc<dyn BlogRepository>,
    paginator: Paginator,
}

impl FeedService {
    pub fn new(repo: Arc<dyn BlogRepository>, paginator: Paginator) -> Self {
        Self { repo, paginator }
    }

    /// One page of posts matching `filter`, newest first
    pub async fn page(&self, filter: PostFilter, raw_page: Option<&str>) -> Result<Page<PostView>> {
        let count = self.repo.count_posts(filter).await?;
        let window = self.paginator.window(raw_page, count);
        let posts = self
            .repo
            .list_posts(filter, window.limit(), window.offset())
            .await?;
        Ok(window.into_page(posts))
    }

    pub async fn index(&self, raw_page: Option<&str>) -> Result<Page<PostView>> {
        self.page(PostFilter::All, raw_page).await
    }

    pub async fn group(&self, slug: &str, raw_page: Option<&str>) -> Result<(Group, Page<PostView>)> {
        let group = self
            .repo
            .find_group_by_slug(slug)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("group '{}'", slug)))?;
        let page = self.page(PostFilter::Group(group.id), raw_page).await?;
        Ok((group, page))
    }

    pub async fn profile(
        &self,
        username: &str,
        viewer_id: Option<i64>,
        raw_page: Option<&str>,
    ) -> Result<ProfileFeed> {
        let author = self
            .repo
            .find_user_by_username(username)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user '{}'", username)))?;

        let page = self.page(PostFilter::Author(author.id), raw_page).await?;
        let following = match viewer_id {
            Some(viewer_id) if viewer_id != author.id => {
                self.repo.is_following(viewer_id, author.id).await?
            }
            _ => false,
        };
        let counts = self.repo.follow_counts(author.id).await?;

        Ok(ProfileFeed {
            post_count: page.count,
            author,
            page,
            following,
            counts,
        })
    }

    /// Posts by every author `viewer_id` follows
    pub async fn following(&self, viewer_id: i64, raw_page: Option<&str>) -> Result<Page<PostView>> {
        self.page(PostFilter::FollowedBy(viewer_id), raw_page).await
    }
}
