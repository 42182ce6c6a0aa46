//! Client log configuration and event subscription.
//!
//! Every log level is either routed to `tracing` (`EmitMode::Stdout`) or
//! delivered to callbacks registered with `Client::on` (`EmitMode::Event`).
//! Levels without a definition are dropped.
//!
//! ```rust
//! use reportdb_query::events::{ClientOptions, EmitMode, LogLevel};
//!
//! let options = ClientOptions::new()
//!     .log(LogLevel::Query, EmitMode::Event)
//!     .log(LogLevel::Error, EmitMode::Stdout);
//!
//! assert_eq!(options.emit_mode(LogLevel::Query), Some(EmitMode::Event));
//! assert_eq!(options.emit_mode(LogLevel::Info), None);
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::{error, info, warn};

use crate::filter::FilterValue;
use crate::transaction::TransactionConfig;

/// Client log levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogLevel {
    /// Connection lifecycle messages.
    Info,
    /// Every executed statement.
    Query,
    /// Warnings such as rollbacks.
    Warn,
    /// Failed operations.
    Error,
}

impl LogLevel {
    /// Lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Query => "query",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where messages of a level go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EmitMode {
    /// Route through `tracing`.
    #[default]
    Stdout,
    /// Deliver to subscribers.
    Event,
}

/// One `log` entry of the client options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogDefinition {
    /// Level enabled.
    pub level: LogLevel,
    /// Where it goes.
    pub emit: EmitMode,
}

/// Client construction options.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientOptions {
    /// Enabled log levels.
    pub log: Vec<LogDefinition>,
    /// Defaults for interactive transactions.
    pub transaction: TransactionConfig,
}

impl ClientOptions {
    /// Options with logging disabled and default transaction settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable `level` with `emit`.
    pub fn log(mut self, level: LogLevel, emit: EmitMode) -> Self {
        self.log.retain(|d| d.level != level);
        self.log.push(LogDefinition { level, emit });
        self
    }

    /// Enable several levels with the same emit mode.
    pub fn log_levels(mut self, levels: impl IntoIterator<Item = LogLevel>, emit: EmitMode) -> Self {
        for level in levels {
            self = self.log(level, emit);
        }
        self
    }

    /// Set the transaction defaults.
    pub fn transaction(mut self, config: TransactionConfig) -> Self {
        self.transaction = config;
        self
    }

    /// How `level` is emitted, if enabled.
    pub fn emit_mode(&self, level: LogLevel) -> Option<EmitMode> {
        self.log.iter().find(|d| d.level == level).map(|d| d.emit)
    }
}

/// An executed statement.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryEvent {
    /// SQL text.
    pub query: String,
    /// Bound parameters as a JSON array.
    pub params: String,
    /// Execution time.
    pub duration: Duration,
    /// When the statement started.
    pub timestamp: DateTime<Utc>,
}

impl QueryEvent {
    /// Build an event for a statement.
    pub fn new(query: &str, params: &[FilterValue], duration: Duration, timestamp: DateTime<Utc>) -> Self {
        let params = serde_json::Value::Array(params.iter().map(FilterValue::to_json).collect());
        Self {
            query: query.to_string(),
            params: params.to_string(),
            duration,
            timestamp,
        }
    }
}

/// A log message.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEvent {
    /// Level of the message.
    pub level: LogLevel,
    /// Message text.
    pub message: String,
    /// Component that produced it.
    pub target: String,
    /// When it was produced.
    pub timestamp: DateTime<Utc>,
}

/// An event delivered to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A statement ran.
    Query(QueryEvent),
    /// A message was logged.
    Log(LogEvent),
}

impl Event {
    /// The level this event belongs to.
    pub fn level(&self) -> LogLevel {
        match self {
            Self::Query(_) => LogLevel::Query,
            Self::Log(log) => log.level,
        }
    }
}

type Callback = Arc<dyn Fn(&Event) + Send + Sync>;

/// Subscriber registry shared by a client and its clones.
#[derive(Clone, Default)]
pub struct EventBus {
    subscribers: Arc<RwLock<Vec<(LogLevel, Callback)>>>,
}

impl EventBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` for events of `level`.
    pub fn subscribe(&self, level: LogLevel, callback: impl Fn(&Event) + Send + Sync + 'static) {
        self.subscribers.write().push((level, Arc::new(callback)));
    }

    /// Deliver `event` to the subscribers of its level.
    pub fn emit(&self, event: &Event) {
        let level = event.level();
        let callbacks: Vec<Callback> = self
            .subscribers
            .read()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, cb)| Arc::clone(cb))
            .collect();
        for callback in callbacks {
            callback(event);
        }
    }

    /// Number of registered subscribers.
    pub fn len(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Whether nobody is subscribed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.len())
            .finish()
    }
}

/// Routes client log output according to [`ClientOptions`].
#[derive(Debug, Clone, Default)]
pub struct EventEmitter {
    options: Arc<ClientOptions>,
    bus: EventBus,
}

impl EventEmitter {
    /// Create an emitter for `options`.
    pub fn new(options: ClientOptions) -> Self {
        Self {
            options: Arc::new(options),
            bus: EventBus::new(),
        }
    }

    /// The client options.
    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// The subscriber registry.
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Report an executed statement.
    pub fn query(&self, query: &str, params: &[FilterValue], duration: Duration, timestamp: DateTime<Utc>) {
        match self.options.emit_mode(LogLevel::Query) {
            Some(EmitMode::Stdout) => {
                info!(
                    target: "reportdb::query",
                    sql = %query,
                    params = params.len(),
                    duration_ms = duration.as_millis() as u64,
                    "query"
                );
            }
            Some(EmitMode::Event) => {
                self.bus
                    .emit(&Event::Query(QueryEvent::new(query, params, duration, timestamp)));
            }
            None => {}
        }
    }

    /// Report a message at `level`.
    pub fn log(&self, level: LogLevel, target: &str, message: impl Into<String>) {
        let Some(mode) = self.options.emit_mode(level) else {
            return;
        };
        let message = message.into();
        match mode {
            EmitMode::Stdout => match level {
                LogLevel::Info | LogLevel::Query => info!(target: "reportdb::client", component = %target, "{}", message),
                LogLevel::Warn => warn!(target: "reportdb::client", component = %target, "{}", message),
                LogLevel::Error => error!(target: "reportdb::client", component = %target, "{}", message),
            },
            EmitMode::Event => self.bus.emit(&Event::Log(LogEvent {
                level,
                message,
                target: target.to_string(),
                timestamp: Utc::now(),
            })),
        }
    }
}
