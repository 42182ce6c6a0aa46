//! CLI configuration handling.

use std::path::{Path, PathBuf};

use reportdb_schema::ReportDbConfig;

use crate::error::CliResult;

/// Default config file name (lives in project root)
pub const CONFIG_FILE_NAME: &str = "reportdb.toml";

/// Load `reportdb.toml` from `dir`, falling back to the defaults when the
/// file does not exist.
pub fn load(dir: &Path) -> CliResult<ReportDbConfig> {
    let path = dir.join(CONFIG_FILE_NAME);
    if path.exists() {
        Ok(ReportDbConfig::from_file(&path)?)
    } else {
        Ok(ReportDbConfig::default())
    }
}

/// The schema file to use: the explicit argument, else the configured path
/// relative to `dir`.
pub fn schema_path(dir: &Path, explicit: Option<PathBuf>, config: &ReportDbConfig) -> PathBuf {
    explicit.unwrap_or_else(|| dir.join(&config.schema.path))
}
