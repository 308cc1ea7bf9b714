use std::path::Path;

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use config::{Config, Environment, File, Map};
use serde::Deserialize;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

pub const CONFIG_FILE: &str = "server.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub bind_host: String,
    pub port: u16,
    pub tables_path: String,
    pub cors_origin: String,
    pub cors_methods: Vec<String>,
    pub event_capacity: usize,
    pub max_body_bytes: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".into(),
            port: 3006,
            tables_path: "data/tables.json".into(),
            cors_origin: "*".into(),
            cors_methods: ["GET", "POST", "PUT", "PATCH", "DELETE"]
                .map(String::from)
                .to_vec(),
            event_capacity: server_api::DEFAULT_EVENT_CAPACITY,
            max_body_bytes: 64 * 1024,
        }
    }
}

impl Settings {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_host, self.port)
    }

    /// `cors_origin` is either `*` or a comma-separated list of origins.
    pub fn cors_layer(&self) -> anyhow::Result<CorsLayer> {
        let methods = self
            .cors_methods
            .iter()
            .map(|method| {
                method
                    .trim()
                    .to_ascii_uppercase()
                    .parse::<Method>()
                    .with_context(|| format!("invalid CORS method '{method}'"))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        let origin = if self.cors_origin.trim() == "*" {
            AllowOrigin::any()
        } else {
            let origins = self
                .cors_origin
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(|origin| {
                    HeaderValue::from_str(origin)
                        .with_context(|| format!("invalid CORS origin '{origin}'"))
                })
                .collect::<anyhow::Result<Vec<_>>>()?;
            AllowOrigin::list(origins)
        };

        Ok(CorsLayer::new()
            .allow_origin(origin)
            .allow_methods(methods)
            .allow_headers(Any))
    }
}

/// Defaults, then `server.toml` if present, then `APP__*` variables, then
/// a plain `PORT`.
pub fn load_settings() -> anyhow::Result<Settings> {
    build_settings(Path::new(CONFIG_FILE), std::env::vars().collect())
}

pub(crate) fn build_settings(file: &Path, env: Map<String, String>) -> anyhow::Result<Settings> {
    let port_override = env.get("PORT").cloned();

    let mut settings: Settings = Config::builder()
        .add_source(File::from(file).required(false))
        .add_source(
            Environment::with_prefix("APP")
                .prefix_separator("__")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("cors_methods")
                .try_parsing(true)
                .source(Some(env)),
        )
        .build()
        .with_context(|| format!("failed to load configuration from '{}'", file.display()))?
        .try_deserialize()
        .context("invalid server configuration")?;

    if let Some(port) = port_override {
        settings.port = port
            .trim()
            .parse()
            .with_context(|| format!("PORT must be a TCP port number, got '{port}'"))?;
    }

    Ok(settings)
}

#[cfg(test)]
#[path = "tests/settings_tests.rs"]
mod tests;
