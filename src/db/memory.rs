//! In-process repository
//!
//! Mirrors the PostgreSQL schema rules: unique usernames, slugs and follow
//! pairs, cascading deletes for users and posts, and group references
//! cleared when a group goes away.

use crate::error::{AppError, Result};
use crate::models::{
    Comment, CommentView, FollowCounts, Group, NewGroup, NewPost, Post, PostChanges, PostFilter,
    PostView, User, UserSummary,
};
use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet};
use tokio::sync::RwLock;

use super::BlogRepository;

#[derive(Default)]
struct State {
    next_id: i64,
    users: BTreeMap<i64, User>,
    groups: BTreeMap<i64, Group>,
    posts: BTreeMap<i64, Post>,
    comments: BTreeMap<i64, Comment>,
    /// (user_id, author_id)
    follows: BTreeSet<(i64, i64)>,
}

impl State {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn matches(&self, post: &Post, filter: PostFilter) -> bool {
        match filter {
            PostFilter::All => true,
            PostFilter::Group(group_id) => post.group_id == Some(group_id),
            PostFilter::Author(author_id) => post.author_id == author_id,
            PostFilter::FollowedBy(user_id) => self.follows.contains(&(user_id, post.author_id)),
        }
    }

    fn user_summary(&self, user_id: i64) -> Result<UserSummary> {
        self.users
            .get(&user_id)
            .map(User::summary)
            .ok_or_else(|| AppError::Internal(format!("dangling user reference {}", user_id)))
    }

    fn post_view(&self, post: &Post) -> Result<PostView> {
        Ok(PostView {
            id: post.id,
            text: post.text.clone(),
            pub_date: post.pub_date,
            author: self.user_summary(post.author_id)?,
            group: post
                .group_id
                .and_then(|id| self.groups.get(&id))
                .map(Group::summary),
            image: post.image.clone(),
        })
    }

    fn delete_post_cascade(&mut self, post_id: i64) {
        self.posts.remove(&post_id);
        self.comments.retain(|_, c| c.post_id != post_id);
    }
}

#[derive(Default)]
pub struct MemoryRepository {
    state: RwLock<State>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl BlogRepository for MemoryRepository {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn create_user(&self, username: &str, password_hash: &str) -> Result<User> {
        let mut state = self.state.write().await;
        if state.users.values().any(|u| u.username == username) {
            return Err(AppError::Conflict(
                "A user with that username already exists".to_string(),
            ));
        }

        let user = User {
            id: state.allocate_id(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            date_joined: Utc::now(),
        };
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let state = self.state.read().await;
        Ok(state.users.values().find(|u| u.username == username).cloned())
    }

    async fn delete_user(&self, username: &str) -> Result<bool> {
        let mut state = self.state.write().await;
        let Some(user_id) = state
            .users
            .values()
            .find(|u| u.username == username)
            .map(|u| u.id)
        else {
            return Ok(false);
        };

        state.users.remove(&user_id);
        let owned_posts: Vec<i64> = state
            .posts
            .values()
            .filter(|p| p.author_id == user_id)
            .map(|p| p.id)
            .collect();
        for post_id in owned_posts {
            state.delete_post_cascade(post_id);
        }
        state.comments.retain(|_, c| c.author_id != user_id);
        state
            .follows
            .retain(|(follower, author)| *follower != user_id && *author != user_id);

        Ok(true)
    }

    async fn create_group(&self, group: &NewGroup) -> Result<Group> {
        let mut state = self.state.write().await;
        if state.groups.values().any(|g| g.slug == group.slug) {
            return Err(AppError::Conflict(
                "A group with that slug already exists".to_string(),
            ));
        }

        let created = Group {
            id: state.allocate_id(),
            title: group.title.clone(),
            slug: group.slug.clone(),
            description: group.description.clone(),
        };
        state.groups.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_group_by_slug(&self, slug: &str) -> Result<Option<Group>> {
        let state = self.state.read().await;
        Ok(state.groups.values().find(|g| g.slug == slug).cloned())
    }

    async fn list_groups(&self) -> Result<Vec<Group>> {
        let state = self.state.read().await;
        let mut groups: Vec<Group> = state.groups.values().cloned().collect();
        groups.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
        Ok(groups)
    }

    async fn delete_group(&self, slug: &str) -> Result<bool> {
        let mut state = self.state.write().await;
        let Some(group_id) = state.groups.values().find(|g| g.slug == slug).map(|g| g.id) else {
            return Ok(false);
        };

        state.groups.remove(&group_id);
        for post in state.posts.values_mut() {
            if post.group_id == Some(group_id) {
                post.group_id = None;
            }
        }
        Ok(true)
    }

    async fn create_post(&self, post: &NewPost) -> Result<Post> {
        let mut state = self.state.write().await;
        if !state.users.contains_key(&post.author_id) {
            return Err(AppError::NotFound(format!("user {}", post.author_id)));
        }
        if let Some(group_id) = post.group_id {
            if !state.groups.contains_key(&group_id) {
                return Err(AppError::NotFound(format!("group {}", group_id)));
            }
        }

        let created = Post {
            id: state.allocate_id(),
            text: post.text.clone(),
            pub_date: Utc::now(),
            author_id: post.author_id,
            group_id: post.group_id,
            image: post.image.clone(),
        };
        state.posts.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_post(&self, post_id: i64) -> Result<Option<Post>> {
        let state = self.state.read().await;
        Ok(state.posts.get(&post_id).cloned())
    }

    async fn find_post_view(&self, post_id: i64) -> Result<Option<PostView>> {
        let state = self.state.read().await;
        state.posts.get(&post_id).map(|p| state.post_view(p)).transpose()
    }

    async fn update_post(&self, post_id: i64, changes: &PostChanges) -> Result<Option<Post>> {
        let mut state = self.state.write().await;
        if let Some(group_id) = changes.group_id {
            if !state.groups.contains_key(&group_id) {
                return Err(AppError::NotFound(format!("group {}", group_id)));
            }
        }

        let Some(post) = state.posts.get_mut(&post_id) else {
            return Ok(None);
        };
        post.text = changes.text.clone();
        post.group_id = changes.group_id;
        post.image = changes.image.clone();
        Ok(Some(post.clone()))
    }

    async fn count_posts(&self, filter: PostFilter) -> Result<i64> {
        let state = self.state.read().await;
        let count = state
            .posts
            .values()
            .filter(|p| state.matches(p, filter))
            .count();
        Ok(count as i64)
    }

    async fn list_posts(
        &self,
        filter: PostFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<PostView>> {
        let state = self.state.read().await;
        let mut posts: Vec<&Post> = state
            .posts
            .values()
            .filter(|p| state.matches(p, filter))
            .collect();
        posts.sort_by(|a, b| b.pub_date.cmp(&a.pub_date).then(b.id.cmp(&a.id)));

        posts
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .map(|p| state.post_view(p))
            .collect()
    }

    async fn create_comment(&self, post_id: i64, author_id: i64, text: &str) -> Result<Comment> {
        let mut state = self.state.write().await;
        if !state.posts.contains_key(&post_id) {
            return Err(AppError::NotFound(format!("post {}", post_id)));
        }
        if !state.users.contains_key(&author_id) {
            return Err(AppError::NotFound(format!("user {}", author_id)));
        }

        let comment = Comment {
            id: state.allocate_id(),
            post_id,
            author_id,
            text: text.to_string(),
            created: Utc::now(),
        };
        state.comments.insert(comment.id, comment.clone());
        Ok(comment)
    }

    async fn list_comments(&self, post_id: i64) -> Result<Vec<CommentView>> {
        let state = self.state.read().await;
        let mut comments: Vec<&Comment> = state
            .comments
            .values()
            .filter(|c| c.post_id == post_id)
            .collect();
        comments.sort_by(|a, b| a.created.cmp(&b.created).then(a.id.cmp(&b.id)));

        comments
            .into_iter()
            .map(|c| {
                Ok(CommentView {
                    id: c.id,
                    post_id: c.post_id,
                    author: state.user_summary(c.author_id)?,
                    text: c.text.clone(),
                    created: c.created,
                })
            })
            .collect()
    }

    async fn create_follow(&self, user_id: i64, author_id: i64) -> Result<bool> {
        let mut state = self.state.write().await;
        if !state.users.contains_key(&user_id) || !state.users.contains_key(&author_id) {
            return Err(AppError::NotFound("follow participant".to_string()));
        }
        Ok(state.follows.insert((user_id, author_id)))
    }

    async fn delete_follow(&self, user_id: i64, author_id: i64) -> Result<bool> {
        let mut state = self.state.write().await;
        Ok(state.follows.remove(&(user_id, author_id)))
    }

    async fn is_following(&self, user_id: i64, author_id: i64) -> Result<bool> {
        let state = self.state.read().await;
        Ok(state.follows.contains(&(user_id, author_id)))
    }

    async fn follow_counts(&self, user_id: i64) -> Result<FollowCounts> {
        let state = self.state.read().await;
        Ok(FollowCounts {
            followers: state.follows.iter().filter(|(_, a)| *a == user_id).count() as i64,
            following: state.follows.iter().filter(|(u, _)| *u == user_id).count() as i64,
        })
    }
}
