pub mod image_service;
pub mod job_service;
pub mod jwt_service;
pub mod post_service;
pub mod user_service;
