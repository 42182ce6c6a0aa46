//! Configuration file parsing for `reportdb.toml`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::error::{SchemaError, SchemaResult};

/// Main configuration structure for `reportdb.toml`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ReportDbConfig {
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Schema file configuration.
    #[serde(default)]
    pub schema: SchemaConfig,

    /// Generator configuration.
    #[serde(default)]
    pub generator: GeneratorConfig,

    /// Client logging configuration.
    #[serde(default)]
    pub client: ClientConfig,

    /// Interactive transaction defaults.
    #[serde(default)]
    pub transaction: TransactionSettings,

    /// Environment-specific overrides.
    #[serde(default)]
    pub environments: HashMap<String, EnvironmentOverride>,
}

impl ReportDbConfig {
    /// Load configuration from a file path.
    pub fn from_file(path: impl AsRef<Path>) -> SchemaResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| SchemaError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> SchemaResult<Self> {
        let expanded = expand_env_vars(content);
        toml::from_str(&expanded).map_err(|e| SchemaError::TomlError { source: e })
    }

    /// Get the configured database URL.
    pub fn database_url(&self) -> Option<&str> {
        self.database.url.as_deref()
    }

    /// Apply environment-specific overrides.
    pub fn with_environment(mut self, env: &str) -> Self {
        if let Some(overrides) = self.environments.remove(env) {
            if let Some(url) = overrides.database.and_then(|db| db.url) {
                self.database.url = Some(url);
            }
            if let Some(client) = overrides.client {
                if let Some(log) = client.log {
                    self.client.log = log;
                }
                if let Some(emit) = client.emit {
                    self.client.emit = emit;
                }
            }
            if let Some(tx) = overrides.transaction {
                if let Some(max_wait) = tx.max_wait_ms {
                    self.transaction.max_wait_ms = max_wait;
                }
                if let Some(timeout) = tx.timeout_ms {
                    self.transaction.timeout_ms = timeout;
                }
                if let Some(isolation) = tx.isolation {
                    self.transaction.isolation = Some(isolation);
                }
            }
        }
        self
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Database provider.
    #[serde(default = "default_provider")]
    pub provider: DatabaseProvider,

    /// Connection URL (supports `${ENV_VAR}` interpolation).
    pub url: Option<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            provider: DatabaseProvider::PostgreSql,
            url: None,
        }
    }
}

fn default_provider() -> DatabaseProvider {
    DatabaseProvider::PostgreSql
}

/// Supported database providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseProvider {
    /// PostgreSQL.
    #[serde(alias = "postgres")]
    PostgreSql,
}

impl DatabaseProvider {
    /// Get the provider name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PostgreSql => "postgresql",
        }
    }
}

/// Schema file configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaConfig {
    /// Path to the schema file.
    #[serde(default = "default_schema_path")]
    pub path: String,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            path: default_schema_path(),
        }
    }
}

fn default_schema_path() -> String {
    "db/schema.rdb".to_string()
}

/// Generator configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GeneratorConfig {
    /// File the `generate` command writes to.
    #[serde(default = "default_output")]
    pub output: String,

    /// Pretty-print the generated file.
    #[serde(default = "default_true")]
    pub format: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            format: true,
        }
    }
}

fn default_output() -> String {
    "src/generated.rs".to_string()
}

fn default_true() -> bool {
    true
}

/// Client log levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevelSetting {
    /// Connection lifecycle messages.
    Info,
    /// Every executed statement.
    Query,
    /// Warnings such as rollbacks.
    Warn,
    /// Failed operations.
    Error,
}

/// Where client log messages go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EmitSetting {
    /// Route through `tracing`.
    #[default]
    Stdout,
    /// Deliver to subscribers registered with `on`.
    Event,
}

/// Client logging configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// Enabled log levels.
    #[serde(default)]
    pub log: Vec<LogLevelSetting>,

    /// Emit mode.
    #[serde(default)]
    pub emit: EmitSetting,
}

/// Transaction isolation levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum IsolationSetting {
    /// READ UNCOMMITTED.
    ReadUncommitted,
    /// READ COMMITTED.
    ReadCommitted,
    /// REPEATABLE READ.
    RepeatableRead,
    /// SERIALIZABLE.
    Serializable,
}

/// Interactive transaction defaults.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TransactionSettings {
    /// Maximum time to wait for a transaction to start.
    #[serde(default = "default_max_wait_ms")]
    pub max_wait_ms: u64,

    /// Maximum time the transaction body may run.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Isolation level (database default when unset).
    pub isolation: Option<IsolationSetting>,
}

impl Default for TransactionSettings {
    fn default() -> Self {
        Self {
            max_wait_ms: default_max_wait_ms(),
            timeout_ms: default_timeout_ms(),
            isolation: None,
        }
    }
}

fn default_max_wait_ms() -> u64 {
    2_000
}

fn default_timeout_ms() -> u64 {
    5_000
}

/// Environment-specific configuration overrides.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EnvironmentOverride {
    /// Database overrides.
    pub database: Option<DatabaseOverride>,

    /// Client logging overrides.
    pub client: Option<ClientOverride>,

    /// Transaction overrides.
    pub transaction: Option<TransactionOverride>,
}

/// Database configuration overrides.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseOverride {
    /// Override connection URL.
    pub url: Option<String>,
}

/// Client logging overrides.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ClientOverride {
    /// Override log levels.
    pub log: Option<Vec<LogLevelSetting>>,

    /// Override emit mode.
    pub emit: Option<EmitSetting>,
}

/// Transaction overrides.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TransactionOverride {
    /// Override max wait.
    pub max_wait_ms: Option<u64>,

    /// Override timeout.
    pub timeout_ms: Option<u64>,

    /// Override isolation level.
    pub isolation: Option<IsolationSetting>,
}

/// Expand environment variables in the format `${VAR_NAME}`.
///
/// Unset variables are left in place.
fn expand_env_vars(content: &str) -> String {
    let Ok(re) = regex_lite::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}") else {
        return content.to_string();
    };

    re.replace_all(content, |caps: &regex_lite::Captures<'_>| {
        std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
    })
    .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = ReportDbConfig::default();
        assert_eq!(config.database.provider, DatabaseProvider::PostgreSql);
        assert_eq!(config.schema.path, "db/schema.rdb");
        assert_eq!(config.generator.output, "src/generated.rs");
        assert_eq!(config.transaction.max_wait_ms, 2_000);
        assert_eq!(config.transaction.timeout_ms, 5_000);
        assert_eq!(config.client.emit, EmitSetting::Stdout);
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
            [database]
            provider = "postgres"
            url = "postgres://localhost/reports"

            [schema]
            path = "schema/main.rdb"

            [generator]
            output = "src/client.rs"
            format = false

            [client]
            log = ["query", "warn", "error"]
            emit = "event"

            [transaction]
            max_wait_ms = 500
            timeout_ms = 10000
            isolation = "Serializable"
        "#;

        let config = ReportDbConfig::from_str(toml).unwrap();
        assert_eq!(config.database_url(), Some("postgres://localhost/reports"));
        assert_eq!(config.schema.path, "schema/main.rdb");
        assert!(!config.generator.format);
        assert_eq!(
            config.client.log,
            vec![
                LogLevelSetting::Query,
                LogLevelSetting::Warn,
                LogLevelSetting::Error
            ]
        );
        assert_eq!(config.client.emit, EmitSetting::Event);
        assert_eq!(config.transaction.timeout_ms, 10_000);
        assert_eq!(
            config.transaction.isolation,
            Some(IsolationSetting::Serializable)
        );
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let err = ReportDbConfig::from_str("[database]\npool_size = 4\n").unwrap_err();
        assert!(matches!(err, SchemaError::TomlError { .. }));
    }

    #[test]
    fn test_environment_override() {
        let toml = r#"
            [database]
            url = "postgres://localhost/dev"

            [environments.production.database]
            url = "postgres://db.internal/reports"

            [environments.production.transaction]
            timeout_ms = 15000
        "#;

        let config = ReportDbConfig::from_str(toml)
            .unwrap()
            .with_environment("production");
        assert_eq!(config.database_url(), Some("postgres://db.internal/reports"));
        assert_eq!(config.transaction.timeout_ms, 15_000);
        assert_eq!(config.transaction.max_wait_ms, 2_000);
    }

    #[test]
    fn test_env_var_expansion() {
        // SAFETY: the variable name is unique to this test.
        unsafe {
            std::env::set_var("REPORTDB_TEST_CONFIG_URL", "postgres://test");
        }
        let expanded = expand_env_vars("url = \"${REPORTDB_TEST_CONFIG_URL}\"");
        assert_eq!(expanded, "url = \"postgres://test\"");
        unsafe {
            std::env::remove_var("REPORTDB_TEST_CONFIG_URL");
        }
    }

    #[test]
    fn test_unset_env_var_left_in_place() {
        let expanded = expand_env_vars("url = \"${REPORTDB_SURELY_UNSET_VAR}\"");
        assert_eq!(expanded, "url = \"${REPORTDB_SURELY_UNSET_VAR}\"");
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reportdb.toml");
        std::fs::write(&path, "[schema]\npath = \"db/other.rdb\"\n").unwrap();

        let config = ReportDbConfig::from_file(&path).unwrap();
        assert_eq!(config.schema.path, "db/other.rdb");
    }
}
