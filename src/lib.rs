pub mod auth;
pub mod catalog;
pub mod config;
pub mod error;
pub mod export;
pub mod http_client;
pub mod media;
pub mod nodes;
pub mod providers;
pub mod runner;
pub mod ssrf;
pub mod util;

pub use error::{AdapterError, Result};
