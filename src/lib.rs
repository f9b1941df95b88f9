pub mod config;
pub mod error;
pub mod infrastructure;
pub mod logging;
pub mod models;
pub mod services;

pub use error::{ConversionError, Result};
