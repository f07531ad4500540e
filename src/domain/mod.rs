pub mod forms;
pub mod user;
