// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Resource documents from local YAML and JSON files

use anyhow::{Context, Result, bail};
use kube::core::{Selector, SelectorExt};
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::export::{Fetched, ResourceDocument};

const EXTENSIONS: &[&str] = &["yaml", "yml", "json"];

/// Read every document from the given files and directories, in order
///
/// Directories are read one level deep, files sorted by name. The result is
/// singular when exactly one regular file was given.
pub fn read_documents(paths: &[PathBuf]) -> Result<Fetched> {
    let mut documents = Vec::new();
    let mut regular_files = 0;

    for path in paths {
        let meta = fs::metadata(path)
            .with_context(|| format!("the path \"{}\" does not exist", path.display()))?;
        let files = if meta.is_dir() {
            list_dir(path)?
        } else {
            regular_files += 1;
            vec![path.clone()]
        };

        for file in files {
            let before = documents.len();
            read_file(&file, &mut documents)?;
            debug!(file = %file.display(), documents = documents.len() - before, "Read file");
        }
    }

    Ok(Fetched {
        documents,
        singular: paths.len() == 1 && regular_files == 1,
    })
}

/// Keep the documents matching `labels`
///
/// With an explicit namespace every document that names a different one is an
/// error. Documents without a namespace are left as they are, since whether a
/// kind is namespaced is not known offline.
pub fn select(
    documents: Vec<ResourceDocument>,
    labels: Option<&Selector>,
    namespace: Option<&str>,
) -> Result<Vec<ResourceDocument>> {
    if let Some(namespace) = namespace
        && let Some(doc) = documents
            .iter()
            .find(|doc| doc.namespace().is_some_and(|ns| ns != namespace))
    {
        bail!(
            "the namespace from the provided object {} does not match the namespace \"{}\"",
            doc.describe(),
            namespace
        );
    }

    let Some(labels) = labels else {
        return Ok(documents);
    };
    let total = documents.len();
    let kept: Vec<_> = documents
        .into_iter()
        .filter(|doc| labels.matches(&doc.labels()))
        .collect();
    debug!(selector = %labels, total, kept = kept.len(), "Filtered file documents");
    Ok(kept)
}

fn list_dir(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))? {
        let path = entry
            .with_context(|| format!("Failed to read {}", dir.display()))?
            .path();
        let wanted = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| EXTENSIONS.contains(&ext));
        if wanted && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn read_file(path: &Path, documents: &mut Vec<ResourceDocument>) -> Result<()> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;

    let is_json = path.extension().is_some_and(|ext| ext == "json");
    let values = if is_json {
        serde_json::Deserializer::from_str(&content)
            .into_iter::<Value>()
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("Failed to parse {}", path.display()))?
    } else {
        serde_yaml::Deserializer::from_str(&content)
            .map(Value::deserialize)
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("Failed to parse {}", path.display()))?
    };

    for value in values {
        push_flattened(value, documents);
    }
    Ok(())
}

/// Add a document, expanding `List` kinds into their items
fn push_flattened(value: Value, documents: &mut Vec<ResourceDocument>) {
    if value.is_null() {
        return;
    }

    let is_list = value
        .get("kind")
        .and_then(Value::as_str)
        .is_some_and(|kind| kind.ends_with("List"))
        && value.get("items").is_some_and(Value::is_array);

    match value {
        Value::Object(mut map) if is_list => {
            if let Some(Value::Array(items)) = map.remove("items") {
                for item in items {
                    push_flattened(item, documents);
                }
            }
        }
        value => documents.push(ResourceDocument::new(value)),
    }
}
