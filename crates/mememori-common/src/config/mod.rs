//! Configuration structs

mod app_config;

pub use app_config::{
    AppSettings, BackendConfig, ChatSettings, ClientConfig, ConfigError, Environment,
    RealtimeConfig,
};
