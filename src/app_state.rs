//! Central application state
//!
//! Every handler reaches storage, caching, media and the services through
//! `AppState`.

use std::sync::Arc;
use std::time::Duration;

use crate::cache::PageCache;
use crate::config::Config;
use crate::db::BlogRepository;
use crate::media::MediaStorage;
use crate::services::{
    AuthService, CommentService, FeedService, FollowService, Paginator, PostService, TokenService,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub repo: Arc<dyn BlogRepository>,
    pub page_cache: Arc<dyn PageCache>,
    pub tokens: Arc<TokenService>,
    pub media: MediaStorage,
    pub services: Arc<AppServices>,
}

pub struct AppServices {
    pub feed: FeedService,
    pub posts: PostService,
    pub comments: CommentService,
    pub follows: FollowService,
    pub auth: AuthService,
}

impl AppState {
    pub fn new(
        config: Config,
        repo: Arc<dyn BlogRepository>,
        page_cache: Arc<dyn PageCache>,
    ) -> Self {
        let paginator = Paginator::new(config.feed.posts_per_page);
        let services = AppServices {
            feed: FeedService::new(repo.clone(), paginator),
            posts: PostService::new(repo.clone()),
            comments: CommentService::new(repo.clone()),
            follows: FollowService::new(repo.clone()),
            auth: AuthService::new(repo.clone()),
        };

        Self {
            tokens: Arc::new(TokenService::new(&config.auth)),
            media: MediaStorage::new(&config.media),
            config: Arc::new(config),
            repo,
            page_cache,
            services: Arc::new(services),
        }
    }

    pub fn index_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.config.cache.index_ttl_secs)
    }

    pub fn login_url(&self) -> &str {
        &self.config.auth.login_url
    }
}
