// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Rendering of the export result

mod json;
mod name;
mod yaml;

pub use json::JsonFormatter;
pub use name::NameFormatter;
pub use yaml::YamlFormatter;

use anyhow::Result;
use serde_json::Value;

use crate::cli::OutputFormat;

pub trait OutputFormatter {
    fn format(value: &Value) -> Result<String>;
}

/// Render `value` in the requested format, newline-terminated
pub fn render(value: &Value, format: &OutputFormat) -> Result<String> {
    let mut text = match format {
        OutputFormat::Yaml => YamlFormatter::format(value)?,
        OutputFormat::Json => JsonFormatter::format(value)?,
        OutputFormat::Name => NameFormatter::format(value)?,
    };
    if !text.is_empty() && !text.ends_with('\n') {
        text.push('\n');
    }
    Ok(text)
}
