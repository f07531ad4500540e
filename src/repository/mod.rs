use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, sqlx::FromRow)]
pub struct User {
    pub user_id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub is_admin: bool,
}

/// A blog post joined with its author's username.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, sqlx::FromRow)]
pub struct Post {
    pub post_id: i64,
    pub title: String,
    pub content: String,
    /// Stored upload filename, or an absolute `http(s)` URL.
    pub image_file: Option<String>,
    pub created_at: DateTime<Utc>,
    pub author_id: i64,
    pub author_username: String,
}

impl Post {
    pub fn has_local_image(&self) -> bool {
        self.image_file
            .as_deref()
            .is_some_and(|image| !image.starts_with("http"))
    }
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub image_file: Option<String>,
    pub author_id: i64,
}

#[derive(Debug, Clone)]
pub struct PostChanges {
    pub title: String,
    pub content: String,
    pub image_file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, sqlx::FromRow)]
pub struct Job {
    pub job_id: i64,
    pub title: String,
    pub location: String,
    pub job_type: String,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct JobFields {
    pub title: String,
    pub location: String,
    pub job_type: String,
    pub description: String,
}

#[async_trait]
pub trait UserRepository: Send + Sync + 'static {
    async fn find_by_id(&self, user_id: i64) -> Result<Option<User>>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;
    async fn insert_user(&self, new_user: NewUser) -> Result<User>;
    /// Returns false when no such user exists.
    async fn set_admin(&self, user_id: i64, is_admin: bool) -> Result<bool>;
}

#[async_trait]
pub trait PostRepository: Send + Sync + 'static {
    /// Newest first; `None` lists everything.
    async fn list_posts(&self, limit: Option<i64>) -> Result<Vec<Post>>;
    async fn find_by_id(&self, post_id: i64) -> Result<Option<Post>>;
    async fn insert_post(&self, new_post: NewPost) -> Result<Post>;
    async fn update_post(&self, post_id: i64, changes: PostChanges) -> Result<Option<Post>>;
    async fn delete_post(&self, post_id: i64) -> Result<bool>;
}

#[async_trait]
pub trait JobRepository: Send + Sync + 'static {
    /// Ordered by id.
    async fn list_jobs(&self) -> Result<Vec<Job>>;
    async fn find_by_id(&self, job_id: i64) -> Result<Option<Job>>;
    async fn insert_job(&self, fields: JobFields) -> Result<Job>;
    async fn update_job(&self, job_id: i64, fields: JobFields) -> Result<Option<Job>>;
    async fn delete_job(&self, job_id: i64) -> Result<bool>;
}

pub mod sqlx_impl;
