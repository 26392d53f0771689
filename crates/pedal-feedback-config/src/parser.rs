//! KDL configuration parser

use std::path::Path;

use crate::error::{ConfigError, InvalidKeyInfo, InvalidKeyReason, SourceLocation};
use crate::model::*;

/// Extract source location from a KDL node's name span
fn get_node_location(node: &kdl::KdlNode, source: &str) -> SourceLocation {
    let span = node.name().span();
    let offset = span.offset();
    let len = span.len();

    let (line, column) = offset_to_line_col(source, offset);

    SourceLocation::new(line, column, offset, len)
}

/// Convert byte offset to line and column (1-indexed)
fn offset_to_line_col(source: &str, offset: usize) -> (usize, usize) {
    let mut line = 1;
    let mut col = 1;

    for (i, ch) in source.char_indices() {
        if i >= offset {
            break;
        }
        if ch == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }

    (line, col)
}

/// Parse a configuration file from the given path
pub fn parse_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config_str(&content)
}

/// Parse configuration from a string
pub fn parse_config_str(content: &str) -> Result<Config, ConfigError> {
    let doc: kdl::KdlDocument = content.parse().map_err(|e: kdl::KdlError| {
        // kdl uses an older miette version, so the span is rebuilt from offset/len
        let offset = e.span.offset();
        let len = e.span.len();
        let span = miette::SourceSpan::from((offset, len));
        ConfigError::ParseError {
            src: content.to_string(),
            span,
            source: e,
        }
    })?;

    let mut config = Config::default();

    for node in doc.nodes() {
        match node.name().value() {
            "global" => {
                config.global = parse_global(node)?;
            }
            "keys" => {
                config.keys = parse_keys(node, content)?;
            }
            name => {
                tracing::warn!("Unknown top-level node: {}", name);
            }
        }
    }

    if config.keys.is_empty() {
        tracing::warn!("No pedal keys configured; every key event will be ignored");
    }

    Ok(config)
}

/// Read the first argument of a node as a non-negative integer
fn first_non_negative(node: &kdl::KdlNode, option: &str) -> Result<Option<u64>, ConfigError> {
    let Some(entry) = node.entries().first() else {
        return Ok(None);
    };

    match entry.value().as_i64() {
        Some(value) if value >= 0 => Ok(Some(value as u64)),
        Some(value) => Err(ConfigError::Invalid {
            message: format!("{} must not be negative (got {})", option, value),
        }),
        None => Err(ConfigError::Invalid {
            message: format!("{} must be an integer", option),
        }),
    }
}

fn parse_global(node: &kdl::KdlNode) -> Result<GlobalConfig, ConfigError> {
    let mut global = GlobalConfig::default();

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "log-level" => {
                    if let Some(entry) = child.entries().first() {
                        if let Some(val) = entry.value().as_string() {
                            global.log_level = val.parse().map_err(|e| ConfigError::Invalid {
                                message: e,
                            })?;
                        }
                    }
                }
                "highlight-duration" => {
                    if let Some(ms) = first_non_negative(child, "highlight-duration")? {
                        global.highlight_duration_ms = ms;
                    }
                }
                "history-limit" => {
                    if let Some(limit) = first_non_negative(child, "history-limit")? {
                        global.history_limit = usize::try_from(limit).unwrap_or(usize::MAX);
                    }
                }
                "device" => {
                    if let Some(entry) = child.entries().first() {
                        global.device = entry.value().as_string().map(|val| {
                            if val.starts_with('~') {
                                shellexpand::tilde(val).into_owned()
                            } else {
                                val.to_string()
                            }
                        });
                    }
                }
                name => {
                    tracing::warn!("Unknown global config option: {}", name);
                }
            }
        }
    }

    Ok(global)
}

/// Check a key identifier, returning why it is unusable if it is.
fn validate_key_identifier(key: &str) -> Option<InvalidKeyReason> {
    if key.chars().count() != 1 {
        return Some(InvalidKeyReason::NotSingleCharacter);
    }
    // The tracker looks keys up by their lower-case form, so anything else
    // could never match.
    if key.to_lowercase() != key {
        return Some(InvalidKeyReason::NotLowercase);
    }
    None
}

/// Find a named property (`name="value"`) on a node
fn get_property<'a>(node: &'a kdl::KdlNode, name: &str) -> Option<&'a str> {
    node.entries()
        .iter()
        .find(|entry| entry.name().map(|n| n.value() == name).unwrap_or(false))
        .and_then(|entry| entry.value().as_string())
}

fn parse_keys(node: &kdl::KdlNode, source: &str) -> Result<KeyConfig, ConfigError> {
    let mut keys = KeyConfig::empty();
    let mut invalid_keys = Vec::new();

    if let Some(children) = node.children() {
        for child in children.nodes() {
            let key = child.name().value().to_string();

            if let Some(reason) = validate_key_identifier(&key) {
                invalid_keys.push(InvalidKeyInfo {
                    key,
                    reason,
                    location: get_node_location(child, source),
                });
                continue;
            }

            if keys.contains(&key) {
                invalid_keys.push(InvalidKeyInfo {
                    key,
                    reason: InvalidKeyReason::Duplicate,
                    location: get_node_location(child, source),
                });
                continue;
            }

            let label = get_property(child, "label").ok_or_else(|| ConfigError::MissingField {
                field: format!("label for key '{}' (e.g., `{} label=\"Left Pedal\"`)", key, key),
            })?;
            let double_tap = get_property(child, "double-tap").unwrap_or_default();

            for entry in child.entries() {
                match entry.name().map(|n| n.value()) {
                    Some("label") | Some("double-tap") => {}
                    Some(other) => {
                        tracing::warn!("Unknown property '{}' on key '{}'", other, key);
                    }
                    None => {
                        tracing::warn!("Ignoring positional argument on key '{}'", key);
                    }
                }
            }

            keys.insert(key, PedalKey::new(label, double_tap));
        }
    }

    // Report every bad identifier at once rather than one per run
    if !invalid_keys.is_empty() {
        return Err(ConfigError::InvalidKeys { invalid_keys });
    }

    Ok(keys)
}
