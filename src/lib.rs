mod config;
mod error;

pub mod pagination;
pub mod service;
pub mod storage;
pub mod task;

pub use config::Config;
pub use error::{Error, Result};
