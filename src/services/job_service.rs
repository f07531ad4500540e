use std::sync::Arc;

use crate::domain::forms::{FormSchema, JobForm};
use crate::error::AppError;
use crate::repository::{Job, JobFields, JobRepository};

#[derive(Clone)]
pub struct JobService {
    pub job_repo: Arc<dyn JobRepository>,
}

impl JobService {
    pub fn new(job_repo: Arc<dyn JobRepository>) -> Self {
        Self { job_repo }
    }

    pub async fn list(&self) -> Result<Vec<Job>, AppError> {
        Ok(self.job_repo.list_jobs().await?)
    }

    pub async fn get(&self, job_id: i64) -> Result<Job, AppError> {
        self.job_repo
            .find_by_id(job_id)
            .await?
            .ok_or(AppError::NotFound("job"))
    }

    pub async fn create(&self, form: &JobForm) -> Result<Job, AppError> {
        form.check().map_err(AppError::Validation)?;
        let job = self.job_repo.insert_job(fields(form)).await?;
        tracing::info!(job_id = job.job_id, title = %job.title, "Job posting created");
        Ok(job)
    }

    pub async fn update(&self, job_id: i64, form: &JobForm) -> Result<Job, AppError> {
        // 404 wins over form errors
        self.get(job_id).await?;
        form.check().map_err(AppError::Validation)?;

        let job = self
            .job_repo
            .update_job(job_id, fields(form))
            .await?
            .ok_or(AppError::NotFound("job"))?;
        tracing::info!(job_id, "Job posting updated");
        Ok(job)
    }

    pub async fn delete(&self, job_id: i64) -> Result<(), AppError> {
        if !self.job_repo.delete_job(job_id).await? {
            return Err(AppError::NotFound("job"));
        }
        tracing::info!(job_id, "Job posting deleted");
        Ok(())
    }
}

fn fields(form: &JobForm) -> JobFields {
    JobFields {
        title: form.title.clone(),
        location: form.location.clone(),
        job_type: form.job_type.clone(),
        description: form.description.clone(),
    }
}
