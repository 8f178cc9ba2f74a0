use crate::config::DatabaseConfig;
use crate::error::{AppError, Result};
use crate::models::{
    Comment, CommentView, FollowCounts, Group, GroupSummary, NewGroup, NewPost, Post, PostChanges,
    PostFilter, PostView, User, UserSummary,
};
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::info;

use super::BlogRepository;

/// Create the PostgreSQL connection pool
pub async fn create_pool(config: &DatabaseConfig) -> std::result::Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(&config.url)
        .await?;

    info!(
        max_connections = config.max_connections,
        "PostgreSQL pool created"
    );
    Ok(pool)
}

/// Apply the embedded schema migrations
pub async fn run_migrations(pool: &PgPool) -> std::result::Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("Database migrations applied");
    Ok(())
}

const POST_VIEW_SELECT: &str = r#"
    SELECT p.id, p.text, p.pub_date, p.image,
           u.id AS author_id, u.username AS author_username,
           g.id AS group_id, g.title AS group_title, g.slug AS group_slug
    FROM posts p
    JOIN users u ON u.id = p.author_id
    LEFT JOIN post_groups g ON g.id = p.group_id
"#;

const POST_COLUMNS: &str = "id, text, pub_date, author_id, group_id, image";

#[derive(sqlx::FromRow)]
struct PostViewRow {
    id: i64,
    text: String,
    pub_date: DateTime<Utc>,
    image: Option<String>,
    author_id: i64,
    author_username: String,
    group_id: Option<i64>,
    group_title: Option<String>,
    group_slug: Option<String>,
}

impl From<PostViewRow> for PostView {
    fn from(row: PostViewRow) -> Self {
        let group = match (row.group_id, row.group_title, row.group_slug) {
            (Some(id), Some(title), Some(slug)) => Some(GroupSummary { id, title, slug }),
            _ => None,
        };

        PostView {
            id: row.id,
            text: row.text,
            pub_date: row.pub_date,
            author: UserSummary {
                id: row.author_id,
                username: row.author_username,
            },
            group,
            image: row.image,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CommentViewRow {
    id: i64,
    post_id: i64,
    author_id: i64,
    author_username: String,
    text: String,
    created: DateTime<Utc>,
}

impl From<CommentViewRow> for CommentView {
    fn from(row: CommentViewRow) -> Self {
        CommentView {
            id: row.id,
            post_id: row.post_id,
            author: UserSummary {
                id: row.author_id,
                username: row.author_username,
            },
            text: row.text,
            created: row.created,
        }
    }
}

/// WHERE clause for a feed filter and the id it binds as `$1`, if any.
fn filter_clause(filter: PostFilter) -> (&'static str, Option<i64>) {
    match filter {
        PostFilter::All => ("", None),
        PostFilter::Group(group_id) => ("WHERE p.group_id = $1", Some(group_id)),
        PostFilter::Author(author_id) => ("WHERE p.author_id = $1", Some(author_id)),
        PostFilter::FollowedBy(user_id) => (
            "WHERE p.author_id IN (SELECT f.author_id FROM follows f WHERE f.user_id = $1)",
            Some(user_id),
        ),
    }
}

fn conflict_on_unique(err: sqlx::Error, what: &str) -> AppError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::Conflict(format!("{} already exists", what))
        }
        _ => AppError::Database(err),
    }
}

fn missing_on_foreign_key(err: sqlx::Error, what: &str) -> AppError {
    match &err {
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
            AppError::NotFound(what.to_string())
        }
        _ => AppError::Database(err),
    }
}

#[derive(Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl BlogRepository for PgRepository {
    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn create_user(&self, username: &str, password_hash: &str) -> Result<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, password_hash)
            VALUES ($1, $2)
            RETURNING id, username, password_hash, date_joined
            "#,
        )
        .bind(username)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "A user with that username"))
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, password_hash, date_joined FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn delete_user(&self, username: &str) -> Result<bool> {
        // Posts, comments and follows go with the user via ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM users WHERE username = $1")
            .bind(username)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn create_group(&self, group: &NewGroup) -> Result<Group> {
        sqlx::query_as::<_, Group>(
            r#"
            INSERT INTO post_groups (title, slug, description)
            VALUES ($1, $2, $3)
            RETURNING id, title, slug, description
            "#,
        )
        .bind(&group.title)
        .bind(&group.slug)
        .bind(&group.description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "A group with that slug"))
    }

    async fn find_group_by_slug(&self, slug: &str) -> Result<Option<Group>> {
        let group = sqlx::query_as::<_, Group>(
            "SELECT id, title, slug, description FROM post_groups WHERE slug = $1",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        Ok(group)
    }

    async fn list_groups(&self) -> Result<Vec<Group>> {
        let groups = sqlx::query_as::<_, Group>(
            "SELECT id, title, slug, description FROM post_groups ORDER BY title, id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(groups)
    }

    async fn delete_group(&self, slug: &str) -> Result<bool> {
        // posts.group_id is ON DELETE SET NULL
        let result = sqlx::query("DELETE FROM post_groups WHERE slug = $1")
            .bind(slug)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn create_post(&self, post: &NewPost) -> Result<Post> {
        let sql = format!(
            "INSERT INTO posts (author_id, text, group_id, image) VALUES ($1, $2, $3, $4) RETURNING {}",
            POST_COLUMNS
        );
        let created = sqlx::query_as::<_, Post>(&sql)
            .bind(post.author_id)
            .bind(&post.text)
            .bind(post.group_id)
            .bind(&post.image)
            .fetch_one(&self.pool)
            .await?;

        Ok(created)
    }

    async fn find_post(&self, post_id: i64) -> Result<Option<Post>> {
        let sql = format!("SELECT {} FROM posts WHERE id = $1", POST_COLUMNS);
        let post = sqlx::query_as::<_, Post>(&sql)
            .bind(post_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(post)
    }

    async fn find_post_view(&self, post_id: i64) -> Result<Option<PostView>> {
        let sql = format!("{} WHERE p.id = $1", POST_VIEW_SELECT);
        let row = sqlx::query_as::<_, PostViewRow>(&sql)
            .bind(post_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(PostView::from))
    }

    async fn update_post(&self, post_id: i64, changes: &PostChanges) -> Result<Option<Post>> {
        let sql = format!(
            "UPDATE posts SET text = $1, group_id = $2, image = $3 WHERE id = $4 RETURNING {}",
            POST_COLUMNS
        );
        let updated = sqlx::query_as::<_, Post>(&sql)
            .bind(&changes.text)
            .bind(changes.group_id)
            .bind(&changes.image)
            .bind(post_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(updated)
    }

    async fn count_posts(&self, filter: PostFilter) -> Result<i64> {
        let (clause, arg) = filter_clause(filter);
        let sql = format!("SELECT COUNT(*) FROM posts p {}", clause);
        let mut query = sqlx::query_scalar::<_, i64>(&sql);
        if let Some(id) = arg {
            query = query.bind(id);
        }

        Ok(query.fetch_one(&self.pool).await?)
    }

    async fn list_posts(
        &self,
        filter: PostFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<PostView>> {
        let (clause, arg) = filter_clause(filter);
        let first = if arg.is_some() { 2 } else { 1 };
        let sql = format!(
            "{} {} ORDER BY p.pub_date DESC, p.id DESC LIMIT ${} OFFSET ${}",
            POST_VIEW_SELECT,
            clause,
            first,
            first + 1
        );

        let mut query = sqlx::query_as::<_, PostViewRow>(&sql);
        if let Some(id) = arg {
            query = query.bind(id);
        }
        let rows = query
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(PostView::from).collect())
    }

    async fn create_comment(&self, post_id: i64, author_id: i64, text: &str) -> Result<Comment> {
        let comment = sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comments (post_id, author_id, text)
            VALUES ($1, $2, $3)
            RETURNING id, post_id, author_id, text, created
            "#,
        )
        .bind(post_id)
        .bind(author_id)
        .bind(text)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| missing_on_foreign_key(e, &format!("post {}", post_id)))?;

        Ok(comment)
    }

    async fn list_comments(&self, post_id: i64) -> Result<Vec<CommentView>> {
        let rows = sqlx::query_as::<_, CommentViewRow>(
            r#"
            SELECT c.id, c.post_id, c.text, c.created,
                   u.id AS author_id, u.username AS author_username
            FROM comments c
            JOIN users u ON u.id = c.author_id
            WHERE c.post_id = $1
            ORDER BY c.created ASC, c.id ASC
            "#,
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(CommentView::from).collect())
    }

    async fn create_follow(&self, user_id: i64, author_id: i64) -> Result<bool> {
        let inserted = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO follows (user_id, author_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, author_id) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(author_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(inserted.is_some())
    }

    async fn delete_follow(&self, user_id: i64, author_id: i64) -> Result<bool> {
        let affected = sqlx::query("DELETE FROM follows WHERE user_id = $1 AND author_id = $2")
            .bind(user_id)
            .bind(author_id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(affected > 0)
    }

    async fn is_following(&self, user_id: i64, author_id: i64) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM follows WHERE user_id = $1 AND author_id = $2)",
        )
        .bind(user_id)
        .bind(author_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn follow_counts(&self, user_id: i64) -> Result<FollowCounts> {
        let (followers, following) = sqlx::query_as::<_, (i64, i64)>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM follows WHERE author_id = $1),
                (SELECT COUNT(*) FROM follows WHERE user_id = $1)
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(FollowCounts {
            followers,
            following,
        })
    }
}
