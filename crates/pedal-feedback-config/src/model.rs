//! Configuration data model

use std::collections::BTreeMap;

use serde::Serialize;

/// Default time a pedal half stays highlighted, in milliseconds
pub const DEFAULT_HIGHLIGHT_DURATION_MS: u64 = 200;

/// Default number of entries kept in the input history
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub global: GlobalConfig,
    pub keys: KeyConfig,
}

/// Global settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalConfig {
    pub log_level: LogLevel,
    /// How long a half stays highlighted after its last key-down
    pub highlight_duration_ms: u64,
    /// Maximum number of history entries retained
    pub history_limit: usize,
    /// Input device to observe: a name, `vendor:product`, or `/dev/input/eventN`
    pub device: Option<String>,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            highlight_duration_ms: DEFAULT_HIGHLIGHT_DURATION_MS,
            history_limit: DEFAULT_HISTORY_LIMIT,
            device: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive string usable with `tracing_subscriber::EnvFilter`
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            _ => Err(format!("Unknown log level: {}", s)),
        }
    }
}

/// Display strings for one pedal
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PedalKey {
    /// Label shown in the top half (single press)
    pub label: String,
    /// Description shown in the bottom half (shifted press)
    pub double_tap_description: String,
}

impl PedalKey {
    pub fn new(label: impl Into<String>, double_tap_description: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            double_tap_description: double_tap_description.into(),
        }
    }
}

/// Mapping from logical key identifier (a lower-case character) to its pedal labels.
///
/// Iteration is ordered by key identifier, which is also the order pedals
/// are rendered in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct KeyConfig {
    keys: BTreeMap<String, PedalKey>,
}

impl KeyConfig {
    /// An empty key configuration; every key event is ignored.
    pub fn empty() -> Self {
        Self {
            keys: BTreeMap::new(),
        }
    }

    /// The two-pedal layout used when no `keys` block is configured.
    pub fn default_pedals() -> Self {
        let mut keys = Self::empty();
        keys.insert("a", PedalKey::new("Left Pedal", "Skip Turn"));
        keys.insert("l", PedalKey::new("Right Pedal", "Bonus"));
        keys
    }

    /// Insert or replace a key, returning the previous labels if any.
    pub fn insert(&mut self, key: impl Into<String>, pedal: PedalKey) -> Option<PedalKey> {
        self.keys.insert(key.into(), pedal)
    }

    pub fn get(&self, key: &str) -> Option<&PedalKey> {
        self.keys.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PedalKey)> {
        self.keys.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl Default for KeyConfig {
    fn default() -> Self {
        Self::default_pedals()
    }
}

impl FromIterator<(String, PedalKey)> for KeyConfig {
    fn from_iter<I: IntoIterator<Item = (String, PedalKey)>>(iter: I) -> Self {
        Self {
            keys: iter.into_iter().collect(),
        }
    }
}
