pub mod auth;
pub mod csrf;
pub mod errors;
pub mod flash;
pub mod logging;
pub mod params;
