#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, Response, header},
};
use chrono::Utc;
use sitecraft::api::health::{DatabaseProbe, SharedProbe};
use sitecraft::handler::flash::{FLASH_COOKIE, FlashMessage};
use sitecraft::repository::{
    Job, JobFields, JobRepository, NewPost, NewUser, Post, PostChanges, PostRepository, User,
    UserRepository,
};
use sitecraft::services::jwt_service::JwtService;
use sitecraft::services::user_service::CreateUserRequest;
use sitecraft::domain::user::{Email, Password, Username};
use sitecraft::{AppServices, Settings, build_app};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tera::Tera;
use tower::ServiceExt;

pub const TEST_SECRET: &str = "integration-test-secret";
pub const CSRF: &str = "integration-csrf-token";
pub const PASSWORD: &str = "password123";

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    posts: Vec<Post>,
    jobs: Vec<Job>,
    next_post_id: i64,
    next_job_id: i64,
}

/// One in-memory store backing all three repositories.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn posts(&self) -> Vec<Post> {
        self.tables.lock().unwrap().posts.clone()
    }

    pub fn jobs(&self) -> Vec<Job> {
        self.tables.lock().unwrap().jobs.clone()
    }

    pub fn users(&self) -> Vec<User> {
        self.tables.lock().unwrap().users.clone()
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_by_id(&self, user_id: i64) -> anyhow::Result<Option<User>> {
        let t = self.tables.lock().unwrap();
        Ok(t.users.iter().find(|u| u.user_id == user_id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let t = self.tables.lock().unwrap();
        Ok(t.users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<User>> {
        let t = self.tables.lock().unwrap();
        Ok(t.users.iter().find(|u| u.username == username).cloned())
    }

    async fn insert_user(&self, new_user: NewUser) -> anyhow::Result<User> {
        let mut t = self.tables.lock().unwrap();
        let user = User {
            user_id: t.users.len() as i64 + 1,
            username: new_user.username,
            email: new_user.email,
            password_hash: new_user.password_hash,
            is_admin: new_user.is_admin,
            created_at: Utc::now(),
        };
        t.users.push(user.clone());
        Ok(user)
    }

    async fn set_admin(&self, user_id: i64, is_admin: bool) -> anyhow::Result<bool> {
        let mut t = self.tables.lock().unwrap();
        match t.users.iter_mut().find(|u| u.user_id == user_id) {
            Some(user) => {
                user.is_admin = is_admin;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl PostRepository for MemoryStore {
    async fn list_posts(&self, limit: Option<i64>) -> anyhow::Result<Vec<Post>> {
        let t = self.tables.lock().unwrap();
        let mut posts = t.posts.clone();
        posts.sort_by(|a, b| b.post_id.cmp(&a.post_id));
        if let Some(limit) = limit {
            posts.truncate(limit as usize);
        }
        Ok(posts)
    }

    async fn find_by_id(&self, post_id: i64) -> anyhow::Result<Option<Post>> {
        let t = self.tables.lock().unwrap();
        Ok(t.posts.iter().find(|p| p.post_id == post_id).cloned())
    }

    async fn insert_post(&self, new_post: NewPost) -> anyhow::Result<Post> {
        let mut t = self.tables.lock().unwrap();
        let author_username = t
            .users
            .iter()
            .find(|u| u.user_id == new_post.author_id)
            .map(|u| u.username.clone())
            .ok_or_else(|| anyhow::anyhow!("unknown author {}", new_post.author_id))?;
        t.next_post_id += 1;
        let post = Post {
            post_id: t.next_post_id,
            title: new_post.title,
            content: new_post.content,
            image_file: new_post.image_file,
            created_at: Utc::now(),
            author_id: new_post.author_id,
            author_username,
        };
        t.posts.push(post.clone());
        Ok(post)
    }

    async fn update_post(
        &self,
        post_id: i64,
        changes: PostChanges,
    ) -> anyhow::Result<Option<Post>> {
        let mut t = self.tables.lock().unwrap();
        Ok(t.posts.iter_mut().find(|p| p.post_id == post_id).map(|post| {
            post.title = changes.title;
            post.content = changes.content;
            post.image_file = changes.image_file;
            post.clone()
        }))
    }

    async fn delete_post(&self, post_id: i64) -> anyhow::Result<bool> {
        let mut t = self.tables.lock().unwrap();
        let before = t.posts.len();
        t.posts.retain(|p| p.post_id != post_id);
        Ok(t.posts.len() != before)
    }
}

#[async_trait]
impl JobRepository for MemoryStore {
    async fn list_jobs(&self) -> anyhow::Result<Vec<Job>> {
        let t = self.tables.lock().unwrap();
        let mut jobs = t.jobs.clone();
        jobs.sort_by_key(|j| j.job_id);
        Ok(jobs)
    }

    async fn find_by_id(&self, job_id: i64) -> anyhow::Result<Option<Job>> {
        let t = self.tables.lock().unwrap();
        Ok(t.jobs.iter().find(|j| j.job_id == job_id).cloned())
    }

    async fn insert_job(&self, fields: JobFields) -> anyhow::Result<Job> {
        let mut t = self.tables.lock().unwrap();
        t.next_job_id += 1;
        let job = Job {
            job_id: t.next_job_id,
            title: fields.title,
            location: fields.location,
            job_type: fields.job_type,
            description: fields.description,
        };
        t.jobs.push(job.clone());
        Ok(job)
    }

    async fn update_job(&self, job_id: i64, fields: JobFields) -> anyhow::Result<Option<Job>> {
        let mut t = self.tables.lock().unwrap();
        Ok(t.jobs.iter_mut().find(|j| j.job_id == job_id).map(|job| {
            job.title = fields.title;
            job.location = fields.location;
            job.job_type = fields.job_type;
            job.description = fields.description;
            job.clone()
        }))
    }

    async fn delete_job(&self, job_id: i64) -> anyhow::Result<bool> {
        let mut t = self.tables.lock().unwrap();
        let before = t.jobs.len();
        t.jobs.retain(|j| j.job_id != job_id);
        Ok(t.jobs.len() != before)
    }
}

pub struct AlwaysUp;

#[async_trait]
impl DatabaseProbe for AlwaysUp {
    async fn ping(&self) -> anyhow::Result<i64> {
        Ok(1)
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub services: AppServices,
    pub settings: Arc<Settings>,
}

impl TestApp {
    pub fn new() -> Self {
        let upload_dir: PathBuf =
            std::env::temp_dir().join(format!("sitecraft-it-{}", uuid::Uuid::new_v4()));
        let settings = Arc::new(Settings {
            secret_key: TEST_SECRET.into(),
            upload_dir,
            ..Settings::default()
        });

        let store = Arc::new(MemoryStore::default());
        let services = AppServices::new(
            &settings,
            store.clone(),
            store.clone(),
            store.clone(),
            Arc::new(AlwaysUp) as SharedProbe,
        );

        let tera = Tera::new("templates/**/*").expect("templates load");
        let router = build_app(settings.clone(), tera, services.clone());

        Self {
            router,
            store,
            services,
            settings,
        }
    }

    pub async fn create_user(&self, username: &str, is_admin: bool) -> User {
        self.services
            .users
            .create_user(CreateUserRequest {
                email: Email::try_from(format!("{username}@example.com").as_str()).unwrap(),
                username: Username::try_from(username).unwrap(),
                password: Password::try_from(PASSWORD).unwrap(),
                is_admin,
            })
            .await
            .unwrap()
    }

    /// Cookie header for a logged-in user that also carries the CSRF cookie.
    pub fn cookies_for(&self, user: &User) -> String {
        let token = JwtService::new(TEST_SECRET)
            .generate_token(user.user_id, &user.username, user.is_admin)
            .unwrap();
        format!("jwt_token={token}; csrf_token={CSRF}")
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str, cookies: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(cookies) = cookies {
            builder = builder.header(header::COOKIE, cookies);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn post_form(
        &self,
        uri: &str,
        cookies: Option<&str>,
        fields: &[(&str, &str)],
    ) -> Response<Body> {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields)
            .finish();
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookies) = cookies {
            builder = builder.header(header::COOKIE, cookies);
        }
        self.send(builder.body(Body::from(body)).unwrap()).await
    }

    pub async fn post_multipart(
        &self,
        uri: &str,
        cookies: Option<&str>,
        multipart: Multipart,
    ) -> Response<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, multipart.content_type());
        if let Some(cookies) = cookies {
            builder = builder.header(header::COOKIE, cookies);
        }
        self.send(builder.body(Body::from(multipart.finish())).unwrap())
            .await
    }
}

const BOUNDARY: &str = "----sitecraft-test-boundary";

/// Hand-built `multipart/form-data` body.
#[derive(Default)]
pub struct Multipart {
    body: Vec<u8>,
}

impl Multipart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, filename: &str, content_type: &str, bytes: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(bytes);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={BOUNDARY}")
    }

    pub fn finish(mut self) -> Vec<u8> {
        self.body
            .extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        self.body
    }
}

pub fn png(width: u32, height: u32) -> Vec<u8> {
    let img = image::DynamicImage::ImageRgb8(image::RgbImage::new(width, height));
    let mut buf = Vec::new();
    img.write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

pub async fn body_string(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub fn location(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// `Set-Cookie` header (name=value plus attributes) for `name`, if any.
pub fn set_cookie(response: &Response<Body>, name: &str) -> Option<String> {
    let prefix = format!("{name}=");
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(&prefix))
        .map(str::to_string)
}

pub fn flashes(response: &Response<Body>) -> Vec<FlashMessage> {
    let Some(cookie) = set_cookie(response, FLASH_COOKIE) else {
        return Vec::new();
    };
    let value = cookie
        .trim_start_matches(&format!("{FLASH_COOKIE}="))
        .split(';')
        .next()
        .unwrap_or_default()
        .to_string();
    if value.is_empty() {
        return Vec::new();
    }
    let bytes = hex::decode(value).unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn flash_texts(response: &Response<Body>) -> Vec<String> {
    flashes(response).into_iter().map(|f| f.message).collect()
}
