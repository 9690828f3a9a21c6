// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Core API (v1) kinds

use serde_json::Value;

use super::{Disposition, Malformed, clear_status, list_items_mut};
use crate::export::ExportPolicy;
use crate::export::document::ResourceDocument;

const SERVICE_ACCOUNT_TOKEN: &str = "kubernetes.io/service-account-token";
const DOCKERCFG_TYPES: &[&str] = &["kubernetes.io/dockercfg", "kubernetes.io/dockerconfigjson"];
/// Set on pull secrets the OpenShift token controller generates for a service account
const TOKEN_SECRET_ANNOTATION: &str = "openshift.io/token-secret.name";

/// Written by the volume binder when a claim is bound
const PVC_BINDING_ANNOTATIONS: &[&str] = &[
    "pv.kubernetes.io/bind-completed",
    "pv.kubernetes.io/bound-by-controller",
    "volume.beta.kubernetes.io/storage-provisioner",
    "volume.kubernetes.io/storage-provisioner",
];

pub(super) fn service(
    doc: &mut ResourceDocument,
    policy: ExportPolicy,
) -> Result<Disposition, Malformed> {
    clear_status(doc);
    if policy.is_exact() {
        return Ok(Disposition::Keep);
    }

    // Headless services keep their explicit "None"
    let headless = doc
        .get_path(&["spec", "clusterIP"])
        .and_then(Value::as_str)
        == Some("None");
    if !headless {
        doc.remove_path(&["spec", "clusterIP"]);
        doc.remove_path(&["spec", "clusterIPs"]);
    }
    doc.remove_path(&["spec", "healthCheckNodePort"]);

    for port in list_items_mut(doc, &["spec", "ports"])? {
        port.remove("nodePort");
    }

    Ok(Disposition::Keep)
}

pub(super) fn pod(doc: &mut ResourceDocument, policy: ExportPolicy) -> Result<Disposition, Malformed> {
    clear_status(doc);
    if !policy.is_exact() {
        doc.remove_path(&["spec", "nodeName"]);
    }
    Ok(Disposition::Keep)
}

/// Nodes are the only kind whose status is written directly, so `Exact` keeps it
pub(super) fn node(doc: &mut ResourceDocument, policy: ExportPolicy) -> Result<Disposition, Malformed> {
    if !policy.is_exact() {
        clear_status(doc);
    }
    Ok(Disposition::Keep)
}

/// Token and pull secrets minted for service accounts are recreated by the
/// destination cluster and are omitted under every policy.
pub(super) fn secret(
    doc: &mut ResourceDocument,
    _policy: ExportPolicy,
) -> Result<Disposition, Malformed> {
    clear_status(doc);

    let secret_type = doc.get_path(&["type"]).and_then(Value::as_str);
    let generated = match secret_type {
        Some(SERVICE_ACCOUNT_TOKEN) => true,
        Some(t) if DOCKERCFG_TYPES.contains(&t) => doc.annotation(TOKEN_SECRET_ANNOTATION).is_some(),
        _ => false,
    };

    Ok(if generated {
        Disposition::Omit
    } else {
        Disposition::Keep
    })
}

/// Drop references to the generated token and dockercfg secrets
///
/// An unnamed account is an error under `Default`, where its references
/// cannot be told apart from user secrets. `Exact` keeps it as it is.
pub(super) fn service_account(
    doc: &mut ResourceDocument,
    policy: ExportPolicy,
) -> Result<Disposition, Malformed> {
    let Some(name) = doc.name().map(String::from) else {
        if policy.is_exact() {
            return Ok(Disposition::Keep);
        }
        return Err(Malformed("metadata.name is required".to_string()));
    };
    let token_prefix = format!("{}-token-", name);
    let dockercfg_prefix = format!("{}-dockercfg-", name);

    retain_secret_refs(doc, "secrets", |secret| {
        !secret.starts_with(&token_prefix) && !secret.starts_with(&dockercfg_prefix)
    })?;
    retain_secret_refs(doc, "imagePullSecrets", |secret| {
        !secret.starts_with(&dockercfg_prefix)
    })?;

    Ok(Disposition::Keep)
}

fn retain_secret_refs(
    doc: &mut ResourceDocument,
    field: &str,
    keep: impl Fn(&str) -> bool,
) -> Result<(), Malformed> {
    let Some(refs) = doc.get_path_mut(&[field]) else {
        return Ok(());
    };
    let refs = match refs {
        Value::Null => return Ok(()),
        Value::Array(refs) => refs,
        _ => return Err(Malformed(format!("{} must be a list", field))),
    };
    if refs.iter().any(|r| !r.is_object()) {
        return Err(Malformed(format!("{} entries must be objects", field)));
    }
    refs.retain(|r| r.get("name").and_then(Value::as_str).is_none_or(&keep));
    Ok(())
}

pub(super) fn persistent_volume_claim(
    doc: &mut ResourceDocument,
    policy: ExportPolicy,
) -> Result<Disposition, Malformed> {
    clear_status(doc);
    if policy.is_exact() {
        return Ok(Disposition::Keep);
    }

    doc.remove_path(&["spec", "volumeName"]);
    for annotation in PVC_BINDING_ANNOTATIONS {
        doc.remove_annotation(annotation);
    }
    Ok(Disposition::Keep)
}

pub(super) fn persistent_volume(
    doc: &mut ResourceDocument,
    policy: ExportPolicy,
) -> Result<Disposition, Malformed> {
    clear_status(doc);
    if !policy.is_exact() {
        doc.remove_path(&["spec", "claimRef"]);
    }
    Ok(Disposition::Keep)
}
