pub mod settings;

pub use settings::{HttpConfig, KeyLogStrategy, LoggingConfig, Settings};
