use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use config::{builder::DefaultState, ConfigBuilder};
use serde::Deserialize;

const DEFAULT_ENV: &str = "local";
const ENV_VAR_NAME: &str = "SHELF_ENV";
const CONFIG_DIR_ENV: &str = "SHELF_CONFIG_DIR";
const ENV_PREFIX: &str = "SHELF";

/// Conventional variables honoured on top of the `SHELF_*` ones.
const PORT_ENV: &str = "PORT";
const MONGODB_URI_ENV: &str = "MONGODB_URI";

/// Deployment environment the application is running in.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Local,
    Staging,
    Production,
}

impl std::str::FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "local" => Ok(Environment::Local),
            "staging" => Ok(Environment::Staging),
            "production" => Ok(Environment::Production),
            other => Err(anyhow!(
                "unsupported environment '{}'; expected local/staging/production",
                other
            )),
        }
    }
}

/// Top-level configuration structure loaded from layered sources.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
}

impl Settings {
    /// Load configuration by layering `.env`, base file, environment overlay,
    /// `SHELF_*` variables and finally `PORT` / `MONGODB_URI`.
    pub fn load() -> anyhow::Result<Self> {
        // Allow missing `.env` files without failing.
        let _ = dotenvy::dotenv();

        let environment = std::env::var(ENV_VAR_NAME).unwrap_or_else(|_| DEFAULT_ENV.to_string());
        let config_dir = match std::env::var(CONFIG_DIR_ENV) {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => std::env::current_dir()
                .context("unable to resolve current directory")?
                .join("config"),
        };

        let builder = Self::file_sources(&config_dir, &environment)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .set_override_option("server.port", std::env::var(PORT_ENV).ok())?
            .set_override_option("database.uri", std::env::var(MONGODB_URI_ENV).ok())?;

        Self::from_builder(builder, &environment)
    }

    /// `base.toml` then `{environment}.toml`, both optional.
    fn file_sources(config_dir: &Path, environment: &str) -> ConfigBuilder<DefaultState> {
        let base_path = config_dir.join("base.toml");
        let environment_path = config_dir.join(format!("{}.toml", environment));

        config::Config::builder()
            .add_source(config::File::from(base_path).required(false))
            .add_source(config::File::from(environment_path).required(false))
    }

    fn from_builder(
        builder: ConfigBuilder<DefaultState>,
        environment: &str,
    ) -> anyhow::Result<Self> {
        let cfg = builder
            .build()
            .with_context(|| "failed to build configuration")?;

        let mut settings: Settings = cfg
            .try_deserialize()
            .with_context(|| "failed to deserialize configuration")?;

        // The selector variable wins over anything a file says.
        settings.environment = environment.parse()?;

        Ok(settings)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "ServerSettings::default_host")]
    pub host: String,
    #[serde(default = "ServerSettings::default_port")]
    pub port: u16,
    #[serde(default = "ServerSettings::default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl ServerSettings {
    fn default_host() -> String {
        "0.0.0.0".to_string()
    }

    fn default_port() -> u16 {
        3000
    }

    fn default_request_timeout_ms() -> u64 {
        15000
    }

    /// `host:port` string suitable for binding.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
            request_timeout_ms: Self::default_request_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// MongoDB connection string. There is no default: the service refuses
    /// to start without one.
    #[serde(default)]
    pub uri: Option<String>,
    /// Database used when the connection string does not name one.
    #[serde(default = "DatabaseSettings::default_database")]
    pub database: String,
    #[serde(default = "DatabaseSettings::default_collection")]
    pub collection: String,
}

impl DatabaseSettings {
    fn default_database() -> String {
        "shelf".to_string()
    }

    fn default_collection() -> String {
        "books".to_string()
    }

    /// The connection string, or an error naming the variables that supply it.
    pub fn require_uri(&self) -> anyhow::Result<&str> {
        self.uri
            .as_deref()
            .filter(|uri| !uri.trim().is_empty())
            .ok_or_else(|| {
                anyhow!(
                    "no document store connection string; set {} or {}_DATABASE__URI",
                    MONGODB_URI_ENV,
                    ENV_PREFIX
                )
            })
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            uri: None,
            database: Self::default_database(),
            collection: Self::default_collection(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelemetrySettings {
    #[serde(default)]
    pub log_format: LogFormat,
    /// `tracing_subscriber::EnvFilter` directives; `RUST_LOG` takes precedence.
    #[serde(default = "TelemetrySettings::default_filter")]
    pub filter: String,
}

impl TelemetrySettings {
    fn default_filter() -> String {
        "info".to_string()
    }
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Pretty,
            filter: Self::default_filter(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_environment_is_local() {
        let settings = Settings::default();
        assert_eq!(settings.environment, Environment::Local);
    }

    #[test]
    fn default_port_is_3000() {
        let settings = Settings::default();
        assert_eq!(settings.server.port, 3000);
        assert_eq!(settings.server.bind_address(), "0.0.0.0:3000");
    }

    #[test]
    fn missing_connection_string_is_an_error() {
        let settings = DatabaseSettings::default();
        let err = settings.require_uri().unwrap_err();
        assert!(err.to_string().contains("MONGODB_URI"));

        let blank = DatabaseSettings {
            uri: Some("  ".to_string()),
            ..DatabaseSettings::default()
        };
        assert!(blank.require_uri().is_err());
    }

    #[test]
    fn unknown_environment_is_rejected() {
        assert!("qa".parse::<Environment>().is_err());
        assert_eq!(
            "production".parse::<Environment>().unwrap(),
            Environment::Production
        );
    }

    #[test]
    fn environment_file_overlays_base_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("base.toml"),
            "[server]\nport = 4000\n\n[database]\ncollection = \"books\"\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("staging.toml"),
            "[database]\nuri = \"mongodb://db:27017/catalogue\"\ncollection = \"novels\"\n\n[telemetry]\nlog_format = \"json\"\n",
        )
        .unwrap();

        let builder = Settings::file_sources(dir.path(), "staging");
        let settings = Settings::from_builder(builder, "staging").unwrap();

        assert_eq!(settings.environment, Environment::Staging);
        assert_eq!(settings.server.port, 4000);
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.database.collection, "novels");
        assert_eq!(
            settings.database.require_uri().unwrap(),
            "mongodb://db:27017/catalogue"
        );
        assert_eq!(settings.telemetry.log_format, LogFormat::Json);
    }

    #[test]
    fn overrides_take_precedence_over_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("base.toml"), "[server]\nport = 4000\n").unwrap();

        let builder = Settings::file_sources(dir.path(), "local")
            .set_override_option("server.port", Some("5050"))
            .unwrap();
        let settings = Settings::from_builder(builder, "local").unwrap();

        assert_eq!(settings.server.port, 5050);
    }
}
