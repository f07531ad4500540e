//! Form schemas for every page that accepts input.
//!
//! Field rules are declared with `validator`; rules spanning several fields
//! (or needing more than a length check) live in [`FormSchema::cross_checks`].
//! A failed check yields [`FormErrors`], which the page re-renders next to the
//! submitted values.

use axum::body::Bytes;
use axum::extract::Multipart;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use url::Url;
use validator::{Validate, ValidationErrors};

use crate::domain::user::Username;
use crate::error::AppError;
use crate::repository::{Job, Post};

pub const JOB_TYPES: [&str; 5] = ["Full-time", "Part-time", "Contract", "Internship", "Remote"];
pub const ALLOWED_IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "gif"];

const REQUIRED: &str = "This field is required.";

/// Field name -> messages, in a shape templates can index directly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::default();
        errors.add(field, message);
        errors
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_result(self) -> Result<(), FormErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl From<ValidationErrors> for FormErrors {
    fn from(errors: ValidationErrors) -> Self {
        let mut out = FormErrors::default();
        for (field, field_errors) in errors.field_errors() {
            for error in field_errors.iter() {
                let message = error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid value ({}).", error.code));
                out.add(&field.to_string(), message);
            }
        }
        out
    }
}

pub trait FormSchema: Validate {
    fn cross_checks(&self, _errors: &mut FormErrors) {}

    fn check(&self) -> Result<(), FormErrors> {
        let mut errors = match self.validate() {
            Ok(()) => FormErrors::default(),
            Err(e) => FormErrors::from(e),
        };
        self.cross_checks(&mut errors);
        errors.into_result()
    }
}

/// Body of POST forms that carry nothing but the CSRF token.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CsrfForm {
    pub csrf_token: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
#[serde(default)]
pub struct ContactForm {
    #[serde(skip_serializing)]
    pub csrf_token: String,
    #[validate(length(min = 1, max = 100, message = "Field must be between 1 and 100 characters long."))]
    pub name: String,
    #[validate(email(message = "Invalid email address."))]
    pub email: String,
    #[validate(length(min = 1, max = 200, message = "Field must be between 1 and 200 characters long."))]
    pub subject: String,
    #[validate(length(min = 10, max = 5000, message = "Field must be between 10 and 5000 characters long."))]
    pub message: String,
}

impl ContactForm {
    pub fn normalized(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self.email = self.email.trim().to_string();
        self.subject = self.subject.trim().to_string();
        self.message = self.message.trim().to_string();
        self
    }
}

impl FormSchema for ContactForm {}

/// An uploaded file part.
#[derive(Clone)]
pub struct Upload {
    pub filename: String,
    pub bytes: Bytes,
}

impl Upload {
    /// Lower-cased extension of the client-side filename, without the dot.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
    }
}

impl fmt::Debug for Upload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Upload")
            .field("filename", &self.filename)
            .field("len", &self.bytes.len())
            .finish()
    }
}

#[derive(Debug, Clone, Default, Serialize, Validate)]
pub struct PostForm {
    #[serde(skip)]
    pub csrf_token: String,
    #[validate(length(min = 1, max = 100, message = "Field must be between 1 and 100 characters long."))]
    pub title: String,
    #[validate(length(min = 1, message = "This field is required."))]
    pub content: String,
    pub image_url: String,
    #[serde(skip)]
    pub image_upload: Option<Upload>,
}

impl PostForm {
    /// Read the form out of a `multipart/form-data` body. Empty text fields and
    /// file parts without a name or content count as absent.
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = PostForm::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::bad_request(format!("Malformed form data: {}", e)))?
        {
            let name = field.name().unwrap_or("").to_string();
            match name.as_str() {
                "image_upload" => {
                    let filename = field.file_name().unwrap_or("").to_string();
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| AppError::bad_request(format!("Upload failed: {}", e)))?;
                    if !filename.is_empty() && !bytes.is_empty() {
                        form.image_upload = Some(Upload { filename, bytes });
                    }
                }
                "csrf_token" | "title" | "content" | "image_url" => {
                    let text = field
                        .text()
                        .await
                        .map_err(|e| AppError::bad_request(format!("Malformed form data: {}", e)))?;
                    match name.as_str() {
                        "csrf_token" => form.csrf_token = text,
                        "title" => form.title = text,
                        "content" => form.content = text,
                        _ => form.image_url = text,
                    }
                }
                _ => {
                    // drain unknown parts
                    let _ = field.bytes().await;
                }
            }
        }

        Ok(form.normalized())
    }

    pub fn normalized(mut self) -> Self {
        self.title = self.title.trim().to_string();
        self.content = self.content.trim().to_string();
        self.image_url = self.image_url.trim().to_string();
        self
    }

    /// Pre-fill for the edit page. Only web images go back into the URL field.
    pub fn from_post(post: &Post) -> Self {
        let image_url = post
            .image_file
            .as_deref()
            .filter(|image| image.starts_with("http"))
            .unwrap_or_default()
            .to_string();

        Self {
            title: post.title.clone(),
            content: post.content.clone(),
            image_url,
            ..Self::default()
        }
    }

    pub fn image_url(&self) -> Option<&str> {
        Some(self.image_url.as_str()).filter(|url| !url.is_empty())
    }
}

impl FormSchema for PostForm {
    fn cross_checks(&self, errors: &mut FormErrors) {
        if let Some(raw) = self.image_url() {
            match Url::parse(raw) {
                Ok(url) if matches!(url.scheme(), "http" | "https") => {}
                _ => errors.add("image_url", "Invalid URL."),
            }
        }

        if let Some(upload) = &self.image_upload {
            let allowed = upload
                .extension()
                .is_some_and(|ext| ALLOWED_IMAGE_EXTENSIONS.contains(&ext.as_str()));
            if !allowed {
                errors.add("image_upload", "Images only! (jpg, jpeg, png, gif)");
            }
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
#[serde(default)]
pub struct JobForm {
    #[serde(skip_serializing)]
    pub csrf_token: String,
    #[validate(length(min = 1, max = 100, message = "Field must be between 1 and 100 characters long."))]
    pub title: String,
    #[validate(length(min = 1, max = 100, message = "Field must be between 1 and 100 characters long."))]
    pub location: String,
    pub job_type: String,
    #[validate(length(min = 1, message = "This field is required."))]
    pub description: String,
}

impl JobForm {
    pub fn normalized(mut self) -> Self {
        self.title = self.title.trim().to_string();
        self.location = self.location.trim().to_string();
        self.job_type = self.job_type.trim().to_string();
        self.description = self.description.trim().to_string();
        self
    }

    pub fn from_job(job: &Job) -> Self {
        Self {
            title: job.title.clone(),
            location: job.location.clone(),
            job_type: job.job_type.clone(),
            description: job.description.clone(),
            ..Self::default()
        }
    }
}

impl FormSchema for JobForm {
    fn cross_checks(&self, errors: &mut FormErrors) {
        if self.job_type.is_empty() {
            errors.add("job_type", REQUIRED);
        } else if !JOB_TYPES.contains(&self.job_type.as_str()) {
            errors.add("job_type", "Not a valid choice.");
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
#[serde(default)]
pub struct RegisterForm {
    #[serde(skip_serializing)]
    pub csrf_token: String,
    #[validate(length(min = 2, max = 20, message = "Field must be between 2 and 20 characters long."))]
    pub username: String,
    #[validate(
        email(message = "Invalid email address."),
        length(max = 120, message = "Field cannot be longer than 120 characters.")
    )]
    pub email: String,
    #[serde(skip_serializing)]
    #[validate(length(min = 8, message = "Password must be at least 8 characters long."))]
    pub password: String,
    #[serde(skip_serializing)]
    pub confirm_password: String,
}

impl RegisterForm {
    pub fn normalized(mut self) -> Self {
        self.username = self.username.trim().to_string();
        self.email = self.email.trim().to_string();
        self
    }
}

impl FormSchema for RegisterForm {
    fn cross_checks(&self, errors: &mut FormErrors) {
        if !errors.has("username") && Username::try_from(self.username.as_str()).is_err() {
            errors.add(
                "username",
                "Usernames may only contain letters, digits, '.', '-' and '_'.",
            );
        }
        if self.confirm_password != self.password {
            errors.add("confirm_password", "Field must be equal to password.");
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
#[serde(default)]
pub struct LoginForm {
    #[serde(skip_serializing)]
    pub csrf_token: String,
    #[validate(length(min = 1, message = "This field is required."))]
    pub identity: String,
    #[serde(skip_serializing)]
    #[validate(length(min = 1, message = "This field is required."))]
    pub password: String,
    pub remember: Option<String>,
}

impl LoginForm {
    pub fn remember_me(&self) -> bool {
        self.remember
            .as_deref()
            .is_some_and(|v| matches!(v, "on" | "true" | "y" | "1"))
    }
}

impl FormSchema for LoginForm {}
