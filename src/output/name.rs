// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! `-o name`: one `kind.group/name` reference per line

use anyhow::Result;
use serde_json::Value;

use super::OutputFormatter;

pub struct NameFormatter;

impl OutputFormatter for NameFormatter {
    fn format(value: &Value) -> Result<String> {
        let lines: Vec<String> = match value.get("items").and_then(Value::as_array) {
            Some(items) if value.get("kind").and_then(Value::as_str) == Some("List") => {
                items.iter().map(reference).collect()
            }
            _ => vec![reference(value)],
        };
        Ok(lines.join("\n"))
    }
}

fn field(value: Option<&Value>) -> &str {
    value.and_then(Value::as_str).unwrap_or_default()
}

fn reference(value: &Value) -> String {
    let kind = field(value.get("kind")).to_lowercase();
    let name = field(value.get("metadata").and_then(|m| m.get("name")));
    match field(value.get("apiVersion")).rsplit_once('/') {
        Some((group, _)) => format!("{}.{}/{}", kind, group, name),
        None => format!("{}/{}", kind, name),
    }
}
