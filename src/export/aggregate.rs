// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Combine sanitized documents into the object handed to the renderer

use serde_json::{Value, json};

use super::convert::VersionConverter;
use super::document::ResourceDocument;
use super::error::ConversionError;

const LIST_API_VERSION: &str = "v1";
const TEMPLATE_API_VERSION: &str = "template.openshift.io/v1";

/// Shape of the export result
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AggregationTarget {
    /// A `List`, or the bare object when a single named resource was requested
    #[default]
    List,
    /// A named `Template` holding every document as an object
    Template(String),
}

/// Build the final, version-stamped export value
///
/// Document order is preserved in every shape. `singular` comes from the
/// fetcher and says the selection named exactly one resource.
pub fn aggregate(
    documents: Vec<ResourceDocument>,
    target: &AggregationTarget,
    singular: bool,
    converter: &VersionConverter,
) -> Result<Value, ConversionError> {
    let mut documents = documents;
    for doc in &mut documents {
        converter.convert(doc)?;
    }

    let container = match target {
        AggregationTarget::Template(name) => json!({
            "apiVersion": TEMPLATE_API_VERSION,
            "kind": "Template",
            "metadata": {"name": name},
            "objects": into_values(documents),
        }),
        AggregationTarget::List if singular && documents.len() == 1 => {
            return Ok(documents.remove(0).into_value());
        }
        AggregationTarget::List => json!({
            "apiVersion": LIST_API_VERSION,
            "kind": "List",
            "metadata": {},
            "items": into_values(documents),
        }),
    };

    let mut container = ResourceDocument::new(container);
    converter.convert(&mut container)?;
    Ok(container.into_value())
}

fn into_values(documents: Vec<ResourceDocument>) -> Vec<Value> {
    documents
        .into_iter()
        .map(ResourceDocument::into_value)
        .collect()
}
