pub mod config;
pub mod link;

pub use config::SerialConfig;
pub use link::{SerialError, SerialLink};
