// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! OpenShift kinds (apps, build, route and image groups)

use serde_json::Value;

use super::{Disposition, Malformed, clear_status, list_items_mut};
use crate::export::ExportPolicy;
use crate::export::document::ResourceDocument;

/// Set by the router when it generated `spec.host` itself
const HOST_GENERATED: &str = "openshift.io/host.generated";

/// `status.latestVersion` lives in status and goes with it
pub(super) fn deployment_config(
    doc: &mut ResourceDocument,
    policy: ExportPolicy,
) -> Result<Disposition, Malformed> {
    clear_status(doc);
    if policy.is_exact() {
        return Ok(Disposition::Keep);
    }

    for trigger in list_items_mut(doc, &["spec", "triggers"])? {
        if let Some(Value::Object(params)) = trigger.get_mut("imageChangeParams") {
            params.remove("lastTriggeredImage");
        }
    }
    Ok(Disposition::Keep)
}

/// `status.lastVersion` lives in status and goes with it
pub(super) fn build_config(
    doc: &mut ResourceDocument,
    policy: ExportPolicy,
) -> Result<Disposition, Malformed> {
    clear_status(doc);
    if policy.is_exact() {
        return Ok(Disposition::Keep);
    }

    for trigger in list_items_mut(doc, &["spec", "triggers"])? {
        if let Some(Value::Object(image_change)) = trigger.get_mut("imageChange") {
            image_change.remove("lastTriggeredImageID");
        }
    }
    Ok(Disposition::Keep)
}

pub(super) fn route(doc: &mut ResourceDocument, policy: ExportPolicy) -> Result<Disposition, Malformed> {
    clear_status(doc);
    if !policy.is_exact() && doc.annotation(HOST_GENERATED) == Some("true") {
        doc.remove_path(&["spec", "host"]);
    }
    Ok(Disposition::Keep)
}

pub(super) fn image_stream(
    doc: &mut ResourceDocument,
    _policy: ExportPolicy,
) -> Result<Disposition, Malformed> {
    clear_status(doc);
    for tag in list_items_mut(doc, &["spec", "tags"])? {
        tag.remove("generation");
    }
    Ok(Disposition::Keep)
}
