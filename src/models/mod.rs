/// Data models for blog-service
///
/// Persisted rows (`User`, `Group`, `Post`, `Comment`), the joined read
/// shapes handed to views (`PostView`, `CommentView`), and the write inputs
/// accepted by the repository.
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Characters shown when a post or comment is displayed by itself.
pub const DISPLAY_TEXT_CHARS: usize = 15;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub date_joined: DateTime<Utc>,
}

impl User {
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            username: self.username.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Group {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub description: String,
}

impl Group {
    pub fn summary(&self) -> GroupSummary {
        GroupSummary {
            id: self.id,
            title: self.title.clone(),
            slug: self.slug.clone(),
        }
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupSummary {
    pub id: i64,
    pub title: String,
    pub slug: String,
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Post {
    pub id: i64,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub author_id: i64,
    pub group_id: Option<i64>,
    /// Storage path relative to the media root, e.g. `posts/cat.gif`
    pub image: Option<String>,
}

impl fmt::Display for Post {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(truncate_chars(&self.text, DISPLAY_TEXT_CHARS))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub author_id: i64,
    pub text: String,
    pub created: DateTime<Utc>,
}

impl fmt::Display for Comment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(truncate_chars(&self.text, DISPLAY_TEXT_CHARS))
    }
}

/// A post joined with its author and group, as listed in feeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostView {
    pub id: i64,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub author: UserSummary,
    pub group: Option<GroupSummary>,
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentView {
    pub id: i64,
    pub post_id: i64,
    pub author: UserSummary,
    pub text: String,
    pub created: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewGroup {
    pub title: String,
    pub slug: String,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub author_id: i64,
    pub text: String,
    pub group_id: Option<i64>,
    pub image: Option<String>,
}

/// Editable fields of a post; author and publication date never change.
#[derive(Debug, Clone)]
pub struct PostChanges {
    pub text: String,
    pub group_id: Option<i64>,
    pub image: Option<String>,
}

/// Which posts a feed lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostFilter {
    All,
    Group(i64),
    Author(i64),
    /// Posts by authors the given user follows
    FollowedBy(i64),
}

/// Follower/following totals shown on a profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FollowCounts {
    pub followers: i64,
    pub following: i64,
}

/// Longest prefix of `text` holding at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(text: &str) -> Post {
        Post {
            id: 1,
            text: text.to_string(),
            pub_date: Utc::now(),
            author_id: 1,
            group_id: None,
            image: None,
        }
    }

    #[test]
    fn post_displays_first_fifteen_chars() {
        assert_eq!(post("Test text longer than fifteen").to_string(), "Test text longe");
        assert_eq!(post("short").to_string(), "short");
    }

    #[test]
    fn truncation_counts_chars_not_bytes() {
        let text = "Тестовый текст, длинее 15 символов";
        assert_eq!(truncate_chars(text, 15), "Тестовый текст,");
    }

    #[test]
    fn group_displays_title() {
        let group = Group {
            id: 1,
            title: "Test group".into(),
            slug: "test-slug".into(),
            description: "desc".into(),
        };
        assert_eq!(group.to_string(), "Test group");
    }

    #[test]
    fn comment_displays_first_fifteen_chars() {
        let comment = Comment {
            id: 1,
            post_id: 1,
            author_id: 1,
            text: "A comment that goes on and on".into(),
            created: Utc::now(),
        };
        assert_eq!(comment.to_string(), "A comment that ");
    }
}
