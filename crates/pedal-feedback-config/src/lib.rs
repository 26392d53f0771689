//! Configuration parsing for pedal-feedback
//!
//! This crate handles parsing KDL configuration files describing the pedal
//! keys and tracker tuning, and rendering a configuration back to KDL.

mod error;
mod generator;
mod model;
mod parser;

pub use error::{ConfigError, InvalidKeyInfo, InvalidKeyReason, SourceLocation};
pub use generator::render_config;
pub use model::*;
pub use parser::{parse_config, parse_config_str};
