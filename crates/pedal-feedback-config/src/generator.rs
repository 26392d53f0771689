//! Render a configuration back to KDL

use crate::error::ConfigError;
use crate::model::Config;

/// Quote and escape a string for use as a KDL value or node name.
fn kdl_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

/// Validate that the rendered KDL can be parsed back by kdl-rs.
fn validate_kdl(content: &str) -> Result<(), ConfigError> {
    content.parse::<kdl::KdlDocument>().map_err(|e| ConfigError::Invalid {
        message: format!(
            "Rendered KDL is invalid (this is a bug in pedal-feedback): {}",
            e
        ),
    })?;
    Ok(())
}

/// Render the configuration as a KDL document.
///
/// The output uses the same layout `parse_config_str` reads, so it can be
/// saved by the user as a starting point for their own configuration. Node
/// names for keys are always quoted since digits and symbols are not valid
/// bare identifiers.
pub fn render_config(config: &Config) -> Result<String, ConfigError> {
    let mut output = String::new();

    output.push_str("global {\n");
    output.push_str(&format!(
        "    log-level {}\n",
        kdl_string(config.global.log_level.as_str())
    ));
    output.push_str(&format!(
        "    highlight-duration {}\n",
        config.global.highlight_duration_ms
    ));
    output.push_str(&format!(
        "    history-limit {}\n",
        config.global.history_limit
    ));
    if let Some(device) = &config.global.device {
        output.push_str(&format!("    device {}\n", kdl_string(device)));
    }
    output.push_str("}\n\n");

    output.push_str("keys {\n");
    for (key, pedal) in config.keys.iter() {
        output.push_str(&format!(
            "    {} label={} double-tap={}\n",
            kdl_string(key),
            kdl_string(&pedal.label),
            kdl_string(&pedal.double_tap_description)
        ));
    }
    output.push_str("}\n");

    validate_kdl(&output)?;

    Ok(output)
}
