use std::{env, path::PathBuf};

use secrecy::SecretString;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub upload_dir: PathBuf,
    pub textgen: TextgenConfig,
}

/// Remote text-generation settings. Leaving the URL or key unset puts the
/// description generator in fallback mode.
#[derive(Debug, Clone, Default)]
pub struct TextgenConfig {
    pub api_url: Option<String>,
    pub api_key: Option<SecretString>,
    pub model: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://marketplace.db".to_string());
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(4000);
        let upload_dir = env::var("UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("uploads"));
        Ok(Self {
            port,
            database_url,
            host,
            upload_dir,
            textgen: TextgenConfig::from_env(),
        })
    }
}

impl TextgenConfig {
    pub fn from_env() -> Self {
        Self {
            api_url: non_empty_var("TEXTGEN_API_URL"),
            api_key: non_empty_var("TEXTGEN_API_KEY").map(SecretString::from),
            model: non_empty_var("TEXTGEN_MODEL"),
        }
    }

    pub fn is_remote(&self) -> bool {
        self.api_url.is_some() && self.api_key.is_some()
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}
