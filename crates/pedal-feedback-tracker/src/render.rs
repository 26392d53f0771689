//! Plain-text and JSON views of a snapshot
//!
//! The text layout follows the on-screen panel: one row per pedal with the
//! active half marked, followed by the recent inputs, newest first.
//!
//! ```text
//! a  [*Left Pedal*]  [ Skip Turn ]
//! l  [ Right Pedal ]  [*Bonus*]
//! Recent Inputs
//!   Right Pedal (bottom)  12:04:31
//!   Left Pedal (top)      12:04:30
//! ```

use std::str::FromStr;

use pedal_feedback_config::KeyConfig;

use crate::normalizer::ActiveHalf;
use crate::tracker::Snapshot;

/// How snapshots are written out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    /// One JSON object per snapshot
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown output format: {} (expected text or json)", s)),
        }
    }
}

fn cell(text: &str, lit: bool) -> String {
    if lit {
        format!("[*{}*]", text)
    } else {
        format!("[ {} ]", text)
    }
}

/// Render a snapshot as the pedal panel plus history list.
pub fn render_text(keys: &KeyConfig, snapshot: &Snapshot) -> String {
    let mut output = String::new();

    for (key, pedal) in keys.iter() {
        let active = snapshot.active_halves.get(key).copied();
        output.push_str(&format!(
            "{}  {}  {}\n",
            key,
            cell(&pedal.label, active == Some(ActiveHalf::Top)),
            cell(&pedal.double_tap_description, active == Some(ActiveHalf::Bottom))
        ));
    }

    output.push_str("Recent Inputs\n");

    let entries: Vec<(String, String)> = snapshot
        .history
        .iter()
        .map(|item| {
            let label = keys
                .get(&item.key)
                .map(|pedal| pedal.label.as_str())
                .unwrap_or(item.key.as_str());
            (format!("{} ({})", label, item.half), item.time_label())
        })
        .collect();
    let width = entries.iter().map(|(name, _)| name.chars().count()).max().unwrap_or(0);

    for (name, time) in entries {
        output.push_str(&format!("  {:<width$}  {}\n", name, time, width = width));
    }

    output
}

/// Render a snapshot as a single line of JSON.
pub fn render_json(snapshot: &Snapshot) -> Result<String, serde_json::Error> {
    serde_json::to_string(snapshot)
}
