// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Field sanitation for exported resources
//!
//! Every document first has its object metadata cleaned ([`meta`]), then goes
//! through the routine registered for its API group and kind. Kinds without a
//! routine use the generic fallback, which only drops the `status` subtree.
//!
//! Routines must be idempotent, and anything cleared under `Exact` must also be
//! cleared under `Default`. The tests at the bottom of this module check both
//! properties for every registered kind.
//!
//! ## Adding a kind
//!
//! Write a function with the [`Sanitize`] signature in the module for its API
//! family and register it in `SanitizerRegistry::new()`. Add a fixture to the
//! test table so the registry-wide property tests cover it.

mod core_api;
mod meta;
mod openshift;
mod workloads;

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::debug;

use super::ExportPolicy;
use super::document::ResourceDocument;
use super::error::SanitizeError;

/// What should happen to a document after sanitation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Keep,
    /// Drop the document from the export; this is not an error
    Omit,
}

/// A document section did not have the shape a routine needs
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct Malformed(pub String);

/// A sanitize routine for one kind of resource
pub trait Sanitize: Send + Sync {
    fn sanitize(
        &self,
        doc: &mut ResourceDocument,
        policy: ExportPolicy,
    ) -> Result<Disposition, Malformed>;
}

impl<F> Sanitize for F
where
    F: Fn(&mut ResourceDocument, ExportPolicy) -> Result<Disposition, Malformed> + Send + Sync,
{
    fn sanitize(
        &self,
        doc: &mut ResourceDocument,
        policy: ExportPolicy,
    ) -> Result<Disposition, Malformed> {
        self(doc, policy)
    }
}

/// Registry key: API group (empty for core) and kind
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupKind {
    pub group: String,
    pub kind: String,
}

impl GroupKind {
    pub fn new(group: &str, kind: &str) -> Self {
        Self {
            group: group.to_string(),
            kind: kind.to_string(),
        }
    }
}

/// Global sanitizer registry instance
pub static SANITIZERS: LazyLock<SanitizerRegistry> = LazyLock::new(SanitizerRegistry::new);

/// Kind-specific sanitize routines plus the generic fallback
pub struct SanitizerRegistry {
    routines: HashMap<GroupKind, Box<dyn Sanitize>>,
    fallback: Box<dyn Sanitize>,
}

/// OpenShift 3 served its own types from the legacy core group as well
const OPENSHIFT_LEGACY_GROUP: &str = "";

impl SanitizerRegistry {
    /// Build the registry with all known kinds
    ///
    /// Note: This is called once by the static SANITIZERS.
    fn new() -> Self {
        let mut registry = Self {
            routines: HashMap::new(),
            fallback: Box::new(generic),
        };

        // Core API (v1)
        registry.register("", "Service", core_api::service);
        registry.register("", "Pod", core_api::pod);
        registry.register("", "Node", core_api::node);
        registry.register("", "Secret", core_api::secret);
        registry.register("", "ServiceAccount", core_api::service_account);
        registry.register("", "PersistentVolumeClaim", core_api::persistent_volume_claim);
        registry.register("", "PersistentVolume", core_api::persistent_volume);

        // Workload controllers, including the pre-apps extensions group
        for group in ["apps", "extensions"] {
            registry.register(group, "Deployment", workloads::deployment);
            registry.register(group, "ReplicaSet", workloads::deployment);
            registry.register(group, "DaemonSet", workloads::daemon_set);
        }
        registry.register("apps", "StatefulSet", workloads::stateful_set);
        registry.register("batch", "Job", workloads::job);

        // OpenShift
        for group in ["apps.openshift.io", OPENSHIFT_LEGACY_GROUP] {
            registry.register(group, "DeploymentConfig", openshift::deployment_config);
        }
        for group in ["build.openshift.io", OPENSHIFT_LEGACY_GROUP] {
            registry.register(group, "BuildConfig", openshift::build_config);
        }
        for group in ["route.openshift.io", OPENSHIFT_LEGACY_GROUP] {
            registry.register(group, "Route", openshift::route);
        }
        for group in ["image.openshift.io", OPENSHIFT_LEGACY_GROUP] {
            registry.register(group, "ImageStream", openshift::image_stream);
        }

        registry
    }

    /// Register (or replace) the routine for a group and kind
    pub fn register(&mut self, group: &str, kind: &str, routine: impl Sanitize + 'static) {
        self.routines
            .insert(GroupKind::new(group, kind), Box::new(routine));
    }

    /// Check whether a kind has its own routine (otherwise the fallback applies)
    #[cfg(test)]
    pub fn is_registered(&self, group: &str, kind: &str) -> bool {
        self.routines.contains_key(&GroupKind::new(group, kind))
    }

    /// All registered group/kind pairs, sorted
    #[cfg(test)]
    pub fn registered(&self) -> Vec<&GroupKind> {
        let mut keys: Vec<_> = self.routines.keys().collect();
        keys.sort();
        keys
    }

    /// Sanitize one document in place
    ///
    /// `Raw` leaves the document untouched. Errors carry the document reference
    /// as it was before any field was cleared.
    pub fn sanitize(
        &self,
        doc: &mut ResourceDocument,
        policy: ExportPolicy,
    ) -> Result<Disposition, SanitizeError> {
        if policy == ExportPolicy::Raw {
            return Ok(Disposition::Keep);
        }

        let resource = doc.describe();
        let gvk = doc.gvk();
        let routine = self
            .routines
            .get(&GroupKind::new(&gvk.group, &gvk.kind))
            .unwrap_or(&self.fallback);

        let result = if doc.object_mut().is_none() {
            Err(Malformed("document is not an object".to_string()))
        } else {
            meta::clear_object_meta(doc, policy).and_then(|()| routine.sanitize(doc, policy))
        };

        match result {
            Ok(disposition) => {
                debug!(resource = %resource, gvk = %gvk, ?policy, ?disposition, "Sanitized");
                Ok(disposition)
            }
            Err(Malformed(reason)) => Err(SanitizeError::new(resource, reason)),
        }
    }
}

/// Fallback for kinds without a routine of their own
fn generic(doc: &mut ResourceDocument, _policy: ExportPolicy) -> Result<Disposition, Malformed> {
    clear_status(doc);
    Ok(Disposition::Keep)
}

/// Drop the server-populated `status` subtree
pub(crate) fn clear_status(doc: &mut ResourceDocument) {
    doc.remove_path(&["status"]);
}

/// Object entries of the list at `path`; an absent or null list yields nothing
pub(crate) fn list_items_mut<'a>(
    doc: &'a mut ResourceDocument,
    path: &[&str],
) -> Result<Vec<&'a mut Map<String, Value>>, Malformed> {
    let field = path.join(".");
    match doc.get_path_mut(path) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter_mut()
            .map(|item| {
                item.as_object_mut()
                    .ok_or_else(|| Malformed(format!("{} entries must be objects", field)))
            })
            .collect(),
        Some(_) => Err(Malformed(format!("{} must be a list", field))),
    }
}
