use serde::Deserialize;

pub const DATA_BACKEND_MEMORY: &str = "memory";
pub const DATA_BACKEND_SURREAL: &str = "surreal";
const ENV_PREFIX: &str = "FORUM";

/// Service settings. Every key can be overridden with a `FORUM_`-prefixed
/// environment variable, e.g. `FORUM_DATA_BACKEND=surreal`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app_env: String,
    pub port: u16,
    pub log_level: String,
    pub data_backend: String,
    pub surreal_endpoint: String,
    pub surreal_ns: String,
    pub surreal_db: String,
    pub surreal_user: String,
    pub surreal_pass: String,
    /// Page size for activity feeds when the caller sends none.
    pub default_per_page: usize,
    pub request_timeout_ms: u64,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();
        let loaded: Self = config::Config::builder()
            .set_default("app_env", "development")?
            .set_default("port", 4567)?
            .set_default("log_level", "info")?
            .set_default("data_backend", DATA_BACKEND_MEMORY)?
            .set_default("surreal_endpoint", "ws://127.0.0.1:8000")?
            .set_default("surreal_ns", "forum")?
            .set_default("surreal_db", "comments")?
            .set_default("surreal_user", "root")?
            .set_default("surreal_pass", "root")?
            .set_default("default_per_page", 20)?
            .set_default("request_timeout_ms", 30_000)?
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    fn validate(&self) -> Result<(), config::ConfigError> {
        let backend = self.data_backend.to_ascii_lowercase();
        if backend != DATA_BACKEND_MEMORY && backend != DATA_BACKEND_SURREAL {
            return Err(config::ConfigError::Message(format!(
                "data_backend must be '{DATA_BACKEND_MEMORY}' or '{DATA_BACKEND_SURREAL}', got '{}'",
                self.data_backend
            )));
        }
        if self.default_per_page == 0 {
            return Err(config::ConfigError::Message(
                "default_per_page must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.app_env.eq_ignore_ascii_case("production")
    }

    pub fn uses_surreal(&self) -> bool {
        self.data_backend.eq_ignore_ascii_case(DATA_BACKEND_SURREAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AppConfig {
        AppConfig {
            app_env: "test".into(),
            port: 0,
            log_level: "info".into(),
            data_backend: DATA_BACKEND_MEMORY.into(),
            surreal_endpoint: "ws://127.0.0.1:8000".into(),
            surreal_ns: "forum".into(),
            surreal_db: "comments".into(),
            surreal_user: "root".into(),
            surreal_pass: "root".into(),
            default_per_page: 20,
            request_timeout_ms: 1_000,
        }
    }

    #[test]
    fn backend_name_is_case_insensitive() {
        let mut config = sample();
        config.data_backend = "SurReal".into();
        assert!(config.validate().is_ok());
        assert!(config.uses_surreal());
    }

    #[test]
    fn unknown_backend_and_zero_page_size_are_rejected() {
        let mut config = sample();
        config.data_backend = "postgres".into();
        assert!(config.validate().is_err());

        let mut config = sample();
        config.default_per_page = 0;
        assert!(config.validate().is_err());
    }
}
