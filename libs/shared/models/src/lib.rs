pub mod auth;
pub mod error;

pub use error::{AppError, ServiceError};
