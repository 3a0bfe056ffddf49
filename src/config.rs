use std::env;

use crate::provider::{ProviderConfig, DEFAULT_API_BASE, DEFAULT_MODEL};

pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub provider: ProviderConfig,
}

impl AppConfig {
    /// Reads the process environment. A missing `GEMINI_API_KEY` is not an
    /// error here; `/ask` reports it per request.
    pub fn from_env() -> Self {
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let port = env::var("PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(3000);

        let api_key = env::var("GEMINI_API_KEY")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());

        let model = env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        let base_url =
            env::var("GEMINI_API_BASE").unwrap_or_else(|_| DEFAULT_API_BASE.to_string());

        Self {
            host,
            port,
            provider: ProviderConfig {
                api_key,
                model,
                base_url,
            },
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
