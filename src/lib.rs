pub mod config;
pub mod error;
pub mod handlers;
pub mod merkle;
pub mod models;
pub mod progress;
pub mod scheduler;
pub mod utils;

pub use error::{Error, Result};
