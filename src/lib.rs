//! # reportdb
//!
//! The typed database client of the report generation service.
//!
//! The client is generated at compile time from `db/schema.rdb`: every model
//! gets a module (`reportdb::tweet`, `reportdb::report`, …) with its payload
//! struct, unique lookups, write inputs and filter/order builders, and
//! [`Client`] exposes one delegate per model.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use reportdb::prelude::*;
//! use reportdb::{Client, tweet};
//!
//! let client = Client::new(engine, ClientOptions::new());
//!
//! let tweets = client
//!     .tweet()
//!     .find_many()
//!     .r#where(tweet::twitter_user_id::equals(user_id))
//!     .r#where(tweet::like_count::gt(10))
//!     .order_by(tweet::tweeted_at::desc())
//!     .take(20)
//!     .exec()
//!     .await?;
//! ```
//!
//! ## Configuration
//!
//! Client options can be read from `reportdb.toml`:
//!
//! ```rust
//! use reportdb::options_from_config;
//! use reportdb::schema::ReportDbConfig;
//!
//! let config = ReportDbConfig::from_str(r#"
//!     [client]
//!     log = ["query", "warn"]
//!     emit = "event"
//!
//!     [transaction]
//!     timeout_ms = 10000
//! "#).unwrap();
//!
//! let options = options_from_config(&config);
//! assert_eq!(options.log.len(), 2);
//! assert_eq!(options.transaction.timeout.as_millis(), 10_000);
//! ```

use std::time::Duration;

pub use reportdb_query as query;

/// Re-exports from the schema crate.
pub mod schema {
    pub use reportdb_schema::*;
}

pub use reportdb_query::{
    ClientOptions, EmitMode, ErrorCode, ErrorKind, Event, IsolationLevel, LogLevel, NumberUpdate,
    OrderBy, QueryEngine, QueryError, QueryResult, SortOrder, Sql, TransactionConfig, Where, raw_query,
};

reportdb_macros::reportdb_schema!("db/schema.rdb");

/// Build client options from the `[client]` and `[transaction]` sections of
/// a configuration file.
pub fn options_from_config(config: &schema::ReportDbConfig) -> ClientOptions {
    use crate::schema::config::{EmitSetting, IsolationSetting, LogLevelSetting};

    let emit = match config.client.emit {
        EmitSetting::Stdout => EmitMode::Stdout,
        EmitSetting::Event => EmitMode::Event,
    };
    let levels = config.client.log.iter().map(|level| match level {
        LogLevelSetting::Info => LogLevel::Info,
        LogLevelSetting::Query => LogLevel::Query,
        LogLevelSetting::Warn => LogLevel::Warn,
        LogLevelSetting::Error => LogLevel::Error,
    });

    let settings = &config.transaction;
    let mut transaction = TransactionConfig::new()
        .max_wait(Duration::from_millis(settings.max_wait_ms))
        .timeout(Duration::from_millis(settings.timeout_ms));
    if let Some(isolation) = settings.isolation {
        transaction = transaction.isolation(match isolation {
            IsolationSetting::ReadUncommitted => IsolationLevel::ReadUncommitted,
            IsolationSetting::ReadCommitted => IsolationLevel::ReadCommitted,
            IsolationSetting::RepeatableRead => IsolationLevel::RepeatableRead,
            IsolationSetting::Serializable => IsolationLevel::Serializable,
        });
    }

    ClientOptions::new().log_levels(levels, emit).transaction(transaction)
}

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{Client, ModelName, options_from_config};
    pub use reportdb_query::prelude::*;
}
