// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Object metadata shared by every kind

use serde_json::Value;

use super::Malformed;
use crate::export::ExportPolicy;
use crate::export::document::ResourceDocument;

/// Assigned by the API server on create; never valid to replay
const SERVER_ASSIGNED: &[&str] = &[
    "uid",
    "resourceVersion",
    "selfLink",
    "generation",
    "creationTimestamp",
    "deletionTimestamp",
    "deletionGracePeriodSeconds",
    "managedFields",
];

/// Tie the object to its source environment
const ENVIRONMENT_SPECIFIC: &[&str] = &["namespace", "ownerReferences"];

/// Clear generated metadata; `Default` also detaches the object from its
/// namespace, owners, and generated name.
pub(super) fn clear_object_meta(
    doc: &mut ResourceDocument,
    policy: ExportPolicy,
) -> Result<(), Malformed> {
    let meta = match doc.get_path_mut(&["metadata"]) {
        None | Some(Value::Null) => return Ok(()),
        Some(meta) => meta
            .as_object_mut()
            .ok_or_else(|| Malformed("metadata must be an object".to_string()))?,
    };

    for field in SERVER_ASSIGNED {
        meta.remove(*field);
    }

    if policy.is_exact() {
        return Ok(());
    }

    for field in ENVIRONMENT_SPECIFIC {
        meta.remove(*field);
    }

    // The server will generate a fresh name from the prefix
    let generated = meta
        .get("generateName")
        .and_then(Value::as_str)
        .is_some_and(|prefix| !prefix.is_empty());
    if generated {
        meta.remove("name");
    }

    Ok(())
}
