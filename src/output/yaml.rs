// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

use anyhow::{Context, Result};
use serde_json::Value;

use super::OutputFormatter;

pub struct YamlFormatter;

impl OutputFormatter for YamlFormatter {
    fn format(value: &Value) -> Result<String> {
        serde_yaml::to_string(value).context("Failed to encode YAML output")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_document_layout() {
        let value = json!({
            "apiVersion": "v1",
            "kind": "Service",
            "metadata": {"name": "web"},
            "spec": {"ports": [{"port": 80}]}
        });
        let text = YamlFormatter::format(&value).unwrap();
        assert_eq!(
            text,
            "apiVersion: v1\nkind: Service\nmetadata:\n  name: web\nspec:\n  ports:\n  - port: 80\n"
        );
    }
}
