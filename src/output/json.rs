// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

use anyhow::{Context, Result};
use serde_json::Value;

use super::OutputFormatter;

pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn format(value: &Value) -> Result<String> {
        serde_json::to_string_pretty(value).context("Failed to encode JSON output")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pretty_printed() {
        let value = json!({"apiVersion": "v1", "kind": "List", "metadata": {}, "items": []});
        let text = JsonFormatter::format(&value).unwrap();
        assert_eq!(
            text,
            "{\n  \"apiVersion\": \"v1\",\n  \"items\": [],\n  \"kind\": \"List\",\n  \"metadata\": {}\n}"
        );
    }
}
