use super::{
    Job, JobFields, JobRepository, NewPost, NewUser, Post, PostChanges, PostRepository, User,
    UserRepository,
};
use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;

const USER_COLUMNS: &str = "user_id, username, email, password_hash, is_admin, created_at";

const POST_SELECT: &str = r#"
    SELECT p.post_id, p.title, p.content, p.image_file, p.created_at, p.author_id,
           u.username AS author_username
    FROM posts p
    JOIN users u ON u.user_id = p.author_id"#;

pub struct PgUserRepository {
    pub pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_id(&self, user_id: i64) -> Result<Option<User>> {
        let rec = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(rec)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let rec = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE lower(email) = lower($1)"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(rec)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let rec = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(rec)
    }

    async fn insert_user(&self, new_user: NewUser) -> Result<User> {
        let rec = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (username, email, password_hash, is_admin) \
             VALUES ($1, $2, $3, $4) RETURNING {USER_COLUMNS}"
        ))
        .bind(new_user.username)
        .bind(new_user.email)
        .bind(new_user.password_hash)
        .bind(new_user.is_admin)
        .fetch_one(&self.pool)
        .await?;
        Ok(rec)
    }

    async fn set_admin(&self, user_id: i64, is_admin: bool) -> Result<bool> {
        let result = sqlx::query("UPDATE users SET is_admin = $2 WHERE user_id = $1")
            .bind(user_id)
            .bind(is_admin)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

pub struct PgPostRepository {
    pub pool: PgPool,
}

impl PgPostRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PostRepository for PgPostRepository {
    async fn list_posts(&self, limit: Option<i64>) -> Result<Vec<Post>> {
        // LIMIT NULL means no limit in Postgres
        let recs = sqlx::query_as::<_, Post>(&format!(
            "{POST_SELECT} ORDER BY p.created_at DESC, p.post_id DESC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(recs)
    }

    async fn find_by_id(&self, post_id: i64) -> Result<Option<Post>> {
        let rec = sqlx::query_as::<_, Post>(&format!("{POST_SELECT} WHERE p.post_id = $1"))
            .bind(post_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(rec)
    }

    async fn insert_post(&self, new_post: NewPost) -> Result<Post> {
        let post_id: i64 = sqlx::query_scalar(
            "INSERT INTO posts (title, content, image_file, author_id) \
             VALUES ($1, $2, $3, $4) RETURNING post_id",
        )
        .bind(new_post.title)
        .bind(new_post.content)
        .bind(new_post.image_file)
        .bind(new_post.author_id)
        .fetch_one(&self.pool)
        .await?;

        self.find_by_id(post_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("post {} vanished after insert", post_id))
    }

    async fn update_post(&self, post_id: i64, changes: PostChanges) -> Result<Option<Post>> {
        let result = sqlx::query(
            "UPDATE posts SET title = $2, content = $3, image_file = $4 WHERE post_id = $1",
        )
        .bind(post_id)
        .bind(changes.title)
        .bind(changes.content)
        .bind(changes.image_file)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.find_by_id(post_id).await
    }

    async fn delete_post(&self, post_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM posts WHERE post_id = $1")
            .bind(post_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

pub struct PgJobRepository {
    pub pool: PgPool,
}

impl PgJobRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobRepository for PgJobRepository {
    async fn list_jobs(&self) -> Result<Vec<Job>> {
        let recs = sqlx::query_as::<_, Job>(
            "SELECT job_id, title, location, job_type, description FROM jobs ORDER BY job_id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(recs)
    }

    async fn find_by_id(&self, job_id: i64) -> Result<Option<Job>> {
        let rec = sqlx::query_as::<_, Job>(
            "SELECT job_id, title, location, job_type, description FROM jobs WHERE job_id = $1",
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(rec)
    }

    async fn insert_job(&self, fields: JobFields) -> Result<Job> {
        let rec = sqlx::query_as::<_, Job>(
            "INSERT INTO jobs (title, location, job_type, description) VALUES ($1, $2, $3, $4) \
             RETURNING job_id, title, location, job_type, description",
        )
        .bind(fields.title)
        .bind(fields.location)
        .bind(fields.job_type)
        .bind(fields.description)
        .fetch_one(&self.pool)
        .await?;
        Ok(rec)
    }

    async fn update_job(&self, job_id: i64, fields: JobFields) -> Result<Option<Job>> {
        let rec = sqlx::query_as::<_, Job>(
            "UPDATE jobs SET title = $2, location = $3, job_type = $4, description = $5 \
             WHERE job_id = $1 RETURNING job_id, title, location, job_type, description",
        )
        .bind(job_id)
        .bind(fields.title)
        .bind(fields.location)
        .bind(fields.job_type)
        .bind(fields.description)
        .fetch_optional(&self.pool)
        .await?;
        Ok(rec)
    }

    async fn delete_job(&self, job_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM jobs WHERE job_id = $1")
            .bind(job_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
