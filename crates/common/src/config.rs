use std::path::Path;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

const PRIMARY_HOSTS: [&str; 2] = ["github.com", "api.github.com"];

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub github: GithubConfig,
    pub enricher: EnricherConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path(".")
    }

    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Config::builder()
            .add_source(
                File::with_name(
                    path.as_ref()
                        .join("config/default")
                        .to_string_lossy()
                        .as_ref(),
                )
                .required(false),
            )
            .add_source(
                File::with_name(
                    path.as_ref()
                        .join("config/local")
                        .to_string_lossy()
                        .as_ref(),
                )
                .required(false),
            )
            .add_source(Environment::default().separator("__"))
            .build()?
            .try_deserialize()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GithubConfig {
    #[serde(default = "GithubConfig::default_host")]
    pub host: String,
    /// Dotted server version of a self-hosted deployment, e.g. `2.21.3`.
    #[serde(default)]
    pub server_version: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "GithubConfig::default_user_agent")]
    pub user_agent: String,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            server_version: None,
            token: None,
            user_agent: Self::default_user_agent(),
        }
    }
}

impl GithubConfig {
    fn default_host() -> String {
        "github.com".to_string()
    }

    fn default_user_agent() -> String {
        "issue-timeline".to_string()
    }

    pub fn is_primary_host(&self) -> bool {
        let host = self.host.trim();
        PRIMARY_HOSTS
            .iter()
            .any(|primary| host.eq_ignore_ascii_case(primary))
    }

    pub fn graphql_endpoint(&self) -> String {
        if self.is_primary_host() {
            "https://api.github.com/graphql".to_string()
        } else {
            format!("https://{}/api/graphql", self.host.trim())
        }
    }

    pub fn server_version_or_default(&self) -> &str {
        self.server_version.as_deref().unwrap_or("")
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnricherConfig {
    pub input_path: String,
    #[serde(default)]
    pub output_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
    #[serde(default)]
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
            with_target: false,
        }
    }
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ObservabilityConfig {
    /// Where to write the Prometheus text exposition on exit.
    #[serde(default)]
    pub metrics_path: Option<String>,
}
