pub mod config;
pub mod error;
pub mod listeners;

pub use config::AppConfig;
pub use error::{AppError, Result};
pub use listeners::{ListenerRegistry, Subscription};
