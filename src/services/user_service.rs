use crate::domain::forms::{FormErrors, FormSchema, RegisterForm};
use crate::domain::user::{Email, Password, Username, looks_like_email};
use crate::error::AppError;
use crate::repository::{NewUser, User, UserRepository};
use crate::services::jwt_service::JwtService;
use anyhow::{Result, anyhow};
use argon2::{
    Argon2,
    password_hash::{PasswordHasher, SaltString},
};
use chrono::Duration;
use password_hash::{PasswordHash, PasswordVerifier};
use rand::thread_rng;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct CreateUserRequest {
    pub email: Email,
    pub username: Username,
    pub password: Password,
    pub is_admin: bool,
}

#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user: User,
    pub token: String,
}

#[derive(Clone)]
pub struct UserService {
    pub user_repo: Arc<dyn UserRepository>,
    pub jwt_service: Arc<JwtService>,
}

impl UserService {
    pub fn new(user_repo: Arc<dyn UserRepository>, jwt_service: Arc<JwtService>) -> Self {
        Self {
            user_repo,
            jwt_service,
        }
    }

    pub async fn create_user(&self, req: CreateUserRequest) -> Result<User> {
        // Check uniqueness
        if self
            .user_repo
            .find_by_email(req.email.as_ref())
            .await?
            .is_some()
        {
            return Err(anyhow!("email already registered"));
        }

        if self
            .user_repo
            .find_by_username(req.username.as_ref())
            .await?
            .is_some()
        {
            return Err(anyhow!("username taken"));
        }

        let password_hash = self.hash_password(req.password.expose())?;

        let user = self
            .user_repo
            .insert_user(NewUser {
                username: req.username.as_ref().to_string(),
                email: req.email.to_string(),
                password_hash,
                is_admin: req.is_admin,
            })
            .await?;

        tracing::info!(user_id = user.user_id, username = %user.username, is_admin = user.is_admin, "User created");
        Ok(user)
    }

    /// Sign-up from the registration page; clashes are reported per field.
    pub async fn register(&self, form: &RegisterForm) -> Result<User, AppError> {
        form.check().map_err(AppError::Validation)?;

        let mut errors = FormErrors::default();
        if self
            .user_repo
            .find_by_username(&form.username)
            .await?
            .is_some()
        {
            errors.add(
                "username",
                "That username is taken. Please choose a different one.",
            );
        }
        if self.user_repo.find_by_email(&form.email).await?.is_some() {
            errors.add("email", "That email is taken. Please choose a different one.");
        }
        errors.into_result().map_err(AppError::Validation)?;

        let req = CreateUserRequest {
            email: Email::try_from(form.email.as_str())
                .map_err(|_| AppError::Validation(FormErrors::single("email", "Invalid email address.")))?,
            username: Username::try_from(form.username.as_str()).map_err(|e| {
                AppError::Validation(FormErrors::single("username", e.to_string()))
            })?,
            password: Password::try_from(form.password.as_str()).map_err(|_| {
                AppError::Validation(FormErrors::single(
                    "password",
                    "Password must be at least 8 characters long.",
                ))
            })?,
            is_admin: false,
        };

        Ok(self.create_user(req).await?)
    }

    /// Check credentials (email or username) and issue a session token.
    pub async fn login(
        &self,
        identity: &str,
        password: &str,
        session_ttl: Duration,
    ) -> Result<LoginOutcome> {
        let identity = identity.trim();
        let user_opt = if looks_like_email(identity) {
            self.user_repo.find_by_email(identity).await?
        } else {
            self.user_repo.find_by_username(identity).await?
        };

        let user = user_opt.ok_or_else(|| anyhow!("invalid credentials"))?;

        let parsed_hash = PasswordHash::new(&user.password_hash)
            .map_err(|_| anyhow!("invalid stored password hash"))?;
        let argon2 = Argon2::default();

        if argon2
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_err()
        {
            return Err(anyhow!("invalid credentials"));
        }

        let token = self.jwt_service.generate_token_with_ttl(
            user.user_id,
            &user.username,
            user.is_admin,
            session_ttl,
        )?;

        Ok(LoginOutcome { user, token })
    }

    /// Resolve a session token to the account it names. Tokens for deleted
    /// accounts resolve to `None`.
    pub async fn session_user(&self, token: &str) -> Result<Option<User>> {
        let user_id = self.jwt_service.extract_user_id(token)?;
        self.user_repo.find_by_id(user_id).await
    }

    pub async fn set_admin(&self, username: &str, is_admin: bool) -> Result<User> {
        let user = self
            .user_repo
            .find_by_username(username)
            .await?
            .ok_or_else(|| anyhow!("user `{}` not found", username))?;

        if !self.user_repo.set_admin(user.user_id, is_admin).await? {
            return Err(anyhow!("user `{}` not found", username));
        }

        self.user_repo
            .find_by_id(user.user_id)
            .await?
            .ok_or_else(|| anyhow!("user `{}` not found", username))
    }

    fn hash_password(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(thread_rng());
        let argon2 = Argon2::default();
        let password_hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow!(e))?
            .to_string();
        Ok(password_hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::Mutex;

    // Mock implementations for testing
    struct MockUserRepository {
        users: Mutex<Vec<User>>,
    }

    impl MockUserRepository {
        fn new() -> Self {
            Self {
                users: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl UserRepository for MockUserRepository {
        async fn find_by_id(&self, user_id: i64) -> Result<Option<User>> {
            let users = self.users.lock().unwrap();
            Ok(users.iter().find(|u| u.user_id == user_id).cloned())
        }

        async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
            let users = self.users.lock().unwrap();
            Ok(users
                .iter()
                .find(|u| u.email.eq_ignore_ascii_case(email))
                .cloned())
        }

        async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
            let users = self.users.lock().unwrap();
            Ok(users.iter().find(|u| u.username == username).cloned())
        }

        async fn insert_user(&self, new_user: NewUser) -> Result<User> {
            let mut users = self.users.lock().unwrap();
            let user = User {
                user_id: (users.len() + 1) as i64,
                username: new_user.username,
                email: new_user.email,
                password_hash: new_user.password_hash,
                is_admin: new_user.is_admin,
                created_at: Utc::now(),
            };
            users.push(user.clone());
            Ok(user)
        }

        async fn set_admin(&self, user_id: i64, is_admin: bool) -> Result<bool> {
            let mut users = self.users.lock().unwrap();
            match users.iter_mut().find(|u| u.user_id == user_id) {
                Some(user) => {
                    user.is_admin = is_admin;
                    Ok(true)
                }
                None => Ok(false),
            }
        }
    }

    fn service() -> UserService {
        UserService::new(
            Arc::new(MockUserRepository::new()),
            Arc::new(JwtService::new("test_secret")),
        )
    }

    fn register_form(username: &str, email: &str) -> RegisterForm {
        RegisterForm {
            csrf_token: String::new(),
            username: username.into(),
            email: email.into(),
            password: "password123".into(),
            confirm_password: "password123".into(),
        }
    }

    #[tokio::test]
    async fn test_register_then_login_by_email_and_username() {
        let service = service();
        let user = service
            .register(&register_form("ada", "Ada@Example.com"))
            .await
            .unwrap();
        assert_eq!(user.email, "ada@example.com");
        assert!(!user.is_admin);
        assert_ne!(user.password_hash, "password123");

        let by_email = service
            .login("ada@example.com", "password123", Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(by_email.user.user_id, user.user_id);

        let by_username = service
            .login("ada", "password123", Duration::hours(1))
            .await
            .unwrap();
        let claims = service.jwt_service.verify_token(&by_username.token).unwrap();
        assert_eq!(claims.username, "ada");
    }

    #[tokio::test]
    async fn test_register_reports_taken_fields() {
        let service = service();
        service
            .register(&register_form("ada", "ada@example.com"))
            .await
            .unwrap();

        let err = service
            .register(&register_form("ada", "ADA@example.com"))
            .await
            .unwrap_err();
        match err {
            AppError::Validation(errors) => {
                assert!(errors.has("username"));
                assert!(errors.has("email"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_login_with_wrong_password() {
        let service = service();
        service
            .register(&register_form("ada", "ada@example.com"))
            .await
            .unwrap();

        let err = service
            .login("ada", "wrong-password", Duration::hours(1))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "invalid credentials");
    }

    #[tokio::test]
    async fn test_login_unknown_user() {
        let err = service()
            .login("nobody", "password123", Duration::hours(1))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "invalid credentials");
    }

    #[tokio::test]
    async fn test_create_admin_and_demote() {
        let service = service();
        let admin = service
            .create_user(CreateUserRequest {
                email: Email::try_from("root@example.com").unwrap(),
                username: Username::try_from("root").unwrap(),
                password: Password::try_from("password123").unwrap(),
                is_admin: true,
            })
            .await
            .unwrap();
        assert!(admin.is_admin);

        let demoted = service.set_admin("root", false).await.unwrap();
        assert!(!demoted.is_admin);

        assert!(service.set_admin("ghost", true).await.is_err());
    }

    #[tokio::test]
    async fn test_session_user_reads_current_record() {
        let service = service();
        let admin = service
            .create_user(CreateUserRequest {
                email: Email::try_from("root@example.com").unwrap(),
                username: Username::try_from("root").unwrap(),
                password: Password::try_from("password123").unwrap(),
                is_admin: true,
            })
            .await
            .unwrap();
        let token = service
            .jwt_service
            .generate_token(admin.user_id, "root", true)
            .unwrap();

        service.set_admin("root", false).await.unwrap();
        let current = service.session_user(&token).await.unwrap().unwrap();
        assert!(!current.is_admin);
    }

    #[tokio::test]
    async fn test_session_user_for_missing_account() {
        let service = service();
        let token = service.jwt_service.generate_token(99, "gone", true).unwrap();
        assert!(service.session_user(&token).await.unwrap().is_none());
        assert!(service.session_user("not.a.token").await.is_err());
    }
}
