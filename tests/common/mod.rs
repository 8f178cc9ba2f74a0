#![allow(dead_code)]

use actix_web::{dev::ServiceResponse, http::header};
use std::sync::Arc;
use tempfile::TempDir;

use blog_service::cache::MemoryPageCache;
use blog_service::config::{
    AppConfig, AuthConfig, CacheConfig, Config, DatabaseConfig, FeedConfig, MediaConfig,
};
use blog_service::db::{BlogRepository, MemoryRepository};
use blog_service::models::{Group, NewGroup, NewPost, Post, User};
use blog_service::AppState;

pub const BOUNDARY: &str = "----blogservicetestboundary";

pub const SMALL_GIF: &[u8] = b"GIF89a\x02\x00\x01\x00\x80\x00\x00\x00\x00\x00\xff\xff\xff!\xf9\x04\x00\x00\x00\x00\x00,\x00\x00\x00\x00\x02\x00\x01\x00\x00\x02\x02\x0c\x0a\x00;";

/// Build the app around `$ctx.state` the same way the server does.
macro_rules! init_app {
    ($ctx:expr) => {{
        let state = $ctx.state.clone();
        actix_web::test::init_service(
            actix_web::App::new()
                .wrap(blog_service::middleware::ViewerMiddleware::new(
                    state.tokens.clone(),
                    state.repo.clone(),
                ))
                .configure(move |cfg| blog_service::routes::configure_routes(cfg, &state)),
        )
        .await
    }};
}

pub fn test_config(media_root: &str) -> Config {
    Config {
        app: AppConfig {
            env: "test".into(),
            host: "127.0.0.1".into(),
            port: 0,
            workers: 1,
        },
        database: DatabaseConfig {
            url: "memory:".into(),
            max_connections: 1,
            run_migrations: false,
        },
        cache: CacheConfig {
            url: None,
            index_ttl_secs: 20,
        },
        auth: AuthConfig {
            jwt_secret: "integration-test-secret-0123456789abcdef".into(),
            token_ttl_secs: 3600,
            login_url: "/auth/login/".into(),
        },
        media: MediaConfig {
            root: media_root.into(),
            url: "/media/".into(),
            max_upload_bytes: 1024 * 1024,
        },
        feed: FeedConfig { posts_per_page: 10 },
    }
}

/// In-process state plus the fixtures tests seed it with.
pub struct TestContext {
    pub state: AppState,
    pub cache: Arc<MemoryPageCache>,
    _media: TempDir,
}

impl TestContext {
    pub fn new() -> Self {
        let media = tempfile::tempdir().expect("media tempdir");
        let config = test_config(media.path().to_str().expect("utf-8 tempdir"));
        let cache = Arc::new(MemoryPageCache::new());
        let state = AppState::new(config, Arc::new(MemoryRepository::new()), cache.clone());
        Self {
            state,
            cache,
            _media: media,
        }
    }

    pub fn repo(&self) -> &Arc<dyn BlogRepository> {
        &self.state.repo
    }

    /// A user that never logs in with a password.
    pub async fn user(&self, username: &str) -> User {
        self.repo()
            .create_user(username, "!unusable")
            .await
            .expect("create user")
    }

    pub async fn group(&self, slug: &str) -> Group {
        self.repo()
            .create_group(&NewGroup {
                title: format!("Group {}", slug),
                slug: slug.into(),
                description: format!("All about {}", slug),
            })
            .await
            .expect("create group")
    }

    pub async fn post(&self, author: &User, text: &str, group: Option<&Group>) -> Post {
        self.repo()
            .create_post(&NewPost {
                author_id: author.id,
                text: text.into(),
                group_id: group.map(|g| g.id),
                image: None,
            })
            .await
            .expect("create post")
    }

    /// `Authorization` header value for `user`.
    pub fn bearer(&self, user: &User) -> (header::HeaderName, String) {
        let token = self.state.tokens.issue(user).expect("issue token");
        (header::AUTHORIZATION, format!("Bearer {}", token))
    }
}

pub fn location<B>(resp: &ServiceResponse<B>) -> String {
    resp.headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// Encode text fields and an optional `image` file as multipart/form-data.
pub fn multipart_body(fields: &[(&str, &str)], image: Option<(&str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }
    if let Some((filename, bytes)) = image {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{}\"\r\nContent-Type: image/gif\r\n\r\n",
                BOUNDARY, filename
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={}", BOUNDARY)
}
