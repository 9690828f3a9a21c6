// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Workload controllers (apps, batch)
//!
//! Controllers stamp revision counters onto the objects they own. Those are
//! meaningless on a fresh cluster and are cleared under both policies.

use serde_json::Value;

use super::{Disposition, Malformed, clear_status};
use crate::export::ExportPolicy;
use crate::export::document::{ResourceDocument, remove_map_key};

const DEPLOYMENT_REVISION: &str = "deployment.kubernetes.io/revision";
const TEMPLATE_GENERATION: &str = "deprecated.daemonset.template.generation";

/// Labels the job controller injects into a generated selector and pod template
const JOB_GENERATED_LABELS: &[&str] = &[
    "controller-uid",
    "job-name",
    "batch.kubernetes.io/controller-uid",
    "batch.kubernetes.io/job-name",
];

/// Deployments and ReplicaSets
pub(super) fn deployment(
    doc: &mut ResourceDocument,
    _policy: ExportPolicy,
) -> Result<Disposition, Malformed> {
    clear_status(doc);
    doc.remove_annotation(DEPLOYMENT_REVISION);
    Ok(Disposition::Keep)
}

pub(super) fn stateful_set(
    doc: &mut ResourceDocument,
    _policy: ExportPolicy,
) -> Result<Disposition, Malformed> {
    clear_status(doc);
    doc.remove_annotation(TEMPLATE_GENERATION);
    Ok(Disposition::Keep)
}

pub(super) fn daemon_set(
    doc: &mut ResourceDocument,
    _policy: ExportPolicy,
) -> Result<Disposition, Malformed> {
    clear_status(doc);
    doc.remove_annotation(TEMPLATE_GENERATION);
    Ok(Disposition::Keep)
}

/// A job's generated selector embeds the source object's uid, so the API
/// server rejects it on create unless the selector was set manually.
pub(super) fn job(doc: &mut ResourceDocument, _policy: ExportPolicy) -> Result<Disposition, Malformed> {
    clear_status(doc);

    let manual_selector = doc
        .get_path(&["spec", "manualSelector"])
        .and_then(Value::as_bool)
        .unwrap_or(false);
    if manual_selector {
        return Ok(Disposition::Keep);
    }

    doc.remove_path(&["spec", "selector"]);
    if let Some(template_meta) = doc.get_path_mut(&["spec", "template", "metadata"]) {
        if !template_meta.is_object() && !template_meta.is_null() {
            return Err(Malformed(
                "spec.template.metadata must be an object".to_string(),
            ));
        }
        for label in JOB_GENERATED_LABELS {
            remove_map_key(template_meta, "labels", label);
        }
    }
    Ok(Disposition::Keep)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deployment_revision_cleared_under_exact() {
        let mut doc = ResourceDocument::new(json!({
            "kind": "Deployment",
            "metadata": {"annotations": {DEPLOYMENT_REVISION: "7", "owner": "team-a"}},
            "status": {"replicas": 3}
        }));
        deployment(&mut doc, ExportPolicy::Exact).unwrap();
        assert_eq!(
            doc.as_value(),
            &json!({"kind": "Deployment", "metadata": {"annotations": {"owner": "team-a"}}})
        );
    }

    #[test]
    fn test_daemon_set_generation_cleared() {
        let mut doc = ResourceDocument::new(json!({
            "kind": "DaemonSet",
            "metadata": {"annotations": {TEMPLATE_GENERATION: "2"}}
        }));
        daemon_set(&mut doc, ExportPolicy::Default).unwrap();
        assert!(doc.get_path(&["metadata", "annotations"]).is_none());
    }

    #[test]
    fn test_job_generated_selector_removed() {
        let mut doc = ResourceDocument::new(json!({
            "kind": "Job",
            "spec": {
                "selector": {"matchLabels": {"controller-uid": "c1"}},
                "template": {
                    "metadata": {"labels": {"controller-uid": "c1", "job-name": "migrate", "app": "db"}},
                    "spec": {"restartPolicy": "Never"}
                }
            },
            "status": {"succeeded": 1}
        }));
        job(&mut doc, ExportPolicy::Exact).unwrap();
        assert_eq!(
            doc.as_value(),
            &json!({
                "kind": "Job",
                "spec": {
                    "template": {
                        "metadata": {"labels": {"app": "db"}},
                        "spec": {"restartPolicy": "Never"}
                    }
                }
            })
        );
    }

    #[test]
    fn test_job_manual_selector_preserved() {
        let original = json!({
            "kind": "Job",
            "spec": {
                "manualSelector": true,
                "selector": {"matchLabels": {"job-name": "x"}},
                "template": {"metadata": {"labels": {"job-name": "x"}}}
            }
        });
        let mut doc = ResourceDocument::new(original.clone());
        job(&mut doc, ExportPolicy::Default).unwrap();
        assert_eq!(doc.as_value(), &original);
    }

    #[test]
    fn test_job_malformed_template_metadata() {
        let mut doc = ResourceDocument::new(json!({
            "kind": "Job",
            "spec": {"template": {"metadata": ["bad"]}}
        }));
        let err = job(&mut doc, ExportPolicy::Default).unwrap_err();
        assert_eq!(err.0, "spec.template.metadata must be an object");
    }
}
