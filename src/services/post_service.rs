use std::sync::Arc;

use crate::domain::forms::{FormSchema, PostForm};
use crate::error::AppError;
use crate::handler::auth::AuthenticatedUser;
use crate::repository::{NewPost, Post, PostChanges, PostRepository};
use crate::services::image_service::ImageStore;

/// Posts shown on the home page.
pub const RECENT_POSTS: i64 = 3;

#[derive(Clone)]
pub struct PostService {
    pub post_repo: Arc<dyn PostRepository>,
    pub images: Arc<ImageStore>,
}

impl PostService {
    pub fn new(post_repo: Arc<dyn PostRepository>, images: Arc<ImageStore>) -> Self {
        Self { post_repo, images }
    }

    pub async fn list_recent(&self) -> Result<Vec<Post>, AppError> {
        Ok(self.post_repo.list_posts(Some(RECENT_POSTS)).await?)
    }

    pub async fn list_all(&self) -> Result<Vec<Post>, AppError> {
        Ok(self.post_repo.list_posts(None).await?)
    }

    pub async fn get(&self, post_id: i64) -> Result<Post, AppError> {
        self.post_repo
            .find_by_id(post_id)
            .await?
            .ok_or(AppError::NotFound("post"))
    }

    /// Fetch a post the actor is allowed to change.
    pub async fn editable(&self, actor: &AuthenticatedUser, post_id: i64) -> Result<Post, AppError> {
        let post = self.get(post_id).await?;
        if !actor.can_manage(post.author_id) {
            tracing::warn!(
                user_id = actor.user_id,
                post_id,
                "Refused to hand out a post owned by someone else"
            );
            return Err(AppError::forbidden("You can only change your own posts."));
        }
        Ok(post)
    }

    pub async fn create(&self, actor: &AuthenticatedUser, form: &PostForm) -> Result<Post, AppError> {
        form.check().map_err(AppError::Validation)?;

        let image_file = self.resolve_image(form, None).await?;
        let inserted = self
            .post_repo
            .insert_post(NewPost {
                title: form.title.clone(),
                content: form.content.clone(),
                image_file: image_file.clone(),
                author_id: actor.user_id,
            })
            .await;
        let post = match inserted {
            Ok(post) => post,
            Err(e) => {
                self.discard_upload(form, image_file.as_deref()).await;
                return Err(e.into());
            }
        };

        tracing::info!(post_id = post.post_id, author_id = actor.user_id, "Post created");
        Ok(post)
    }

    pub async fn update(
        &self,
        actor: &AuthenticatedUser,
        post_id: i64,
        form: &PostForm,
    ) -> Result<Post, AppError> {
        let existing = self.editable(actor, post_id).await?;
        form.check().map_err(AppError::Validation)?;

        let image_file = self
            .resolve_image(form, existing.image_file.clone())
            .await?;
        let replaced = existing.image_file.clone().filter(|old| {
            existing.has_local_image() && image_file.as_deref() != Some(old.as_str())
        });

        let updated = self
            .post_repo
            .update_post(
                post_id,
                PostChanges {
                    title: form.title.clone(),
                    content: form.content.clone(),
                    image_file: image_file.clone(),
                },
            )
            .await;
        let post = match updated {
            Ok(Some(post)) => post,
            Ok(None) => {
                self.discard_upload(form, image_file.as_deref()).await;
                return Err(AppError::NotFound("post"));
            }
            Err(e) => {
                self.discard_upload(form, image_file.as_deref()).await;
                return Err(e.into());
            }
        };

        if let Some(old) = replaced {
            self.images.remove_picture(&old).await;
        }

        tracing::info!(post_id, user_id = actor.user_id, "Post updated");
        Ok(post)
    }

    pub async fn delete(&self, actor: &AuthenticatedUser, post_id: i64) -> Result<(), AppError> {
        let post = self.editable(actor, post_id).await?;

        if !self.post_repo.delete_post(post_id).await? {
            return Err(AppError::NotFound("post"));
        }

        if post.has_local_image() {
            if let Some(image) = post.image_file.as_deref() {
                self.images.remove_picture(image).await;
            }
        }

        tracing::info!(post_id, user_id = actor.user_id, "Post deleted");
        Ok(())
    }

    /// Drop a picture stored for a write that never landed.
    async fn discard_upload(&self, form: &PostForm, image_file: Option<&str>) {
        if form.image_upload.is_some() {
            if let Some(image) = image_file {
                self.images.remove_picture(image).await;
            }
        }
    }

    /// An upload wins over a URL; with neither, the current image stays.
    async fn resolve_image(
        &self,
        form: &PostForm,
        current: Option<String>,
    ) -> Result<Option<String>, AppError> {
        if let Some(upload) = &form.image_upload {
            return Ok(Some(self.images.save_picture(upload).await?));
        }
        if let Some(url) = form.image_url() {
            return Ok(Some(url.to_string()));
        }
        Ok(current)
    }
}
