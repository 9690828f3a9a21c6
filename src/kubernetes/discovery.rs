// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Resource type resolution.
//!
//! Built-in types come from k8s-openapi and resolve without any I/O. Anything
//! else (CRDs, OpenShift APIs) is looked up through the discovery API.

use anyhow::Result;
use kube::Client;
use kube::discovery::{ApiCapabilities, ApiResource, Discovery, Scope};
use std::collections::HashMap;

/// Short names for OpenShift types, which carry no k8s-openapi metadata
const OPENSHIFT_ALIASES: &[(&str, &str, &[&str])] = &[
    ("apps.openshift.io", "DeploymentConfig", &["dc"]),
    ("build.openshift.io", "BuildConfig", &["bc"]),
    ("image.openshift.io", "ImageStream", &["is"]),
    ("image.openshift.io", "ImageStreamTag", &["istag"]),
    ("template.openshift.io", "Template", &[]),
    ("route.openshift.io", "Route", &[]),
];

/// A resource type the fetcher can GET or LIST
#[derive(Debug, Clone)]
pub struct ResourceInfo {
    pub api_resource: ApiResource,
    pub capabilities: ApiCapabilities,
    /// Plural, lowercase (e.g. "deployments")
    pub plural: String,
    /// Other names accepted on the command line (e.g. "deploy")
    pub aliases: Vec<String>,
    /// Comes from a built-in API group rather than an extension
    pub is_core: bool,
}

impl ResourceInfo {
    pub fn is_namespaced(&self) -> bool {
        self.capabilities.scope == Scope::Namespaced
    }

    pub fn kind(&self) -> &str {
        &self.api_resource.kind
    }

    /// Full group/version string (e.g. "v1", "apps/v1")
    pub fn api_version(&self) -> &str {
        &self.api_resource.api_version
    }
}

/// Resource types indexed by plural name and aliases
#[derive(Debug, Clone, Default)]
pub struct ResourceRegistry {
    by_plural: HashMap<String, ResourceInfo>,
    alias_map: HashMap<String, String>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resource type
    ///
    /// Built-in types keep their plural name. An extension type whose plural is
    /// already taken is registered under its lowercase kind instead, or skipped
    /// if that is taken too.
    pub fn add(&mut self, mut info: ResourceInfo) {
        // A built-in replaces whatever holds its plural
        if !info.is_core && self.by_plural.contains_key(&info.plural) {
            let kind_name = info.api_resource.kind.to_lowercase();
            if self.by_plural.contains_key(&kind_name) {
                return;
            }
            info.plural = kind_name;
            info.aliases = vec![];
        }

        for alias in &info.aliases {
            // Aliases never shadow another type's plural
            if !self.by_plural.contains_key(alias) {
                self.alias_map.insert(alias.clone(), info.plural.clone());
            }
        }
        self.alias_map
            .insert(info.plural.clone(), info.plural.clone());
        self.by_plural.insert(info.plural.clone(), info);
    }

    /// Look up a type by plural, alias or lowercase kind
    ///
    /// `plural.group` (e.g. "deployments.apps") is also accepted.
    pub fn get(&self, name: &str) -> Option<&ResourceInfo> {
        let name = name.to_lowercase();
        if let Some(plural) = self.alias_map.get(&name) {
            return self.by_plural.get(plural);
        }
        let (plural, group) = name.split_once('.')?;
        self.by_plural
            .values()
            .find(|info| info.api_resource.group == group && info.plural == plural)
    }

    pub fn len(&self) -> usize {
        self.by_plural.len()
    }

    /// Merge another registry into this one using the normal add() rules
    pub fn merge(&mut self, other: ResourceRegistry) {
        for info in other.by_plural.into_values() {
            self.add(info);
        }
    }
}

/// Build a registry of built-in types from k8s-openapi metadata (no I/O)
pub fn build_core_registry() -> ResourceRegistry {
    use k8s_openapi::api::{
        apps::v1::{DaemonSet, Deployment, ReplicaSet, StatefulSet},
        autoscaling::v2::HorizontalPodAutoscaler,
        batch::v1::{CronJob, Job},
        core::v1::{
            ConfigMap, Endpoints, LimitRange, Namespace, Node, PersistentVolume,
            PersistentVolumeClaim, Pod, ReplicationController, ResourceQuota, Secret, Service,
            ServiceAccount,
        },
        networking::v1::{Ingress, NetworkPolicy},
        policy::v1::PodDisruptionBudget,
        rbac::v1::{ClusterRole, ClusterRoleBinding, Role, RoleBinding},
        storage::v1::StorageClass,
    };

    let mut registry = ResourceRegistry::new();

    macro_rules! add_resource {
        ($type:ty, namespaced, [$($alias:expr),* $(,)?]) => {{
            add_resource!(@inner $type, Scope::Namespaced, [$($alias),*])
        }};
        ($type:ty, cluster, [$($alias:expr),* $(,)?]) => {{
            add_resource!(@inner $type, Scope::Cluster, [$($alias),*])
        }};
        (@inner $type:ty, $scope:expr, [$($alias:expr),* $(,)?]) => {{
            let ar = ApiResource::erase::<$type>(&());
            let caps = ApiCapabilities {
                scope: $scope,
                subresources: vec![],
                operations: vec![],
            };
            let info = ResourceInfo {
                plural: ar.plural.clone(),
                aliases: vec![$($alias.to_string()),*],
                api_resource: ar,
                capabilities: caps,
                is_core: true,
            };
            registry.add(info);
        }};
    }

    // core/v1
    add_resource!(Pod, namespaced, ["pod", "po"]);
    add_resource!(Service, namespaced, ["service", "svc"]);
    add_resource!(ConfigMap, namespaced, ["configmap", "cm"]);
    add_resource!(Secret, namespaced, ["secret"]);
    add_resource!(ServiceAccount, namespaced, ["serviceaccount", "sa"]);
    add_resource!(Endpoints, namespaced, ["endpoint", "ep"]);
    add_resource!(PersistentVolumeClaim, namespaced, ["persistentvolumeclaim", "pvc"]);
    add_resource!(ReplicationController, namespaced, ["replicationcontroller", "rc"]);
    add_resource!(ResourceQuota, namespaced, ["resourcequota", "quota"]);
    add_resource!(LimitRange, namespaced, ["limitrange", "limits"]);
    add_resource!(Node, cluster, ["node", "no"]);
    add_resource!(Namespace, cluster, ["namespace", "ns"]);
    add_resource!(PersistentVolume, cluster, ["persistentvolume", "pv"]);

    // apps/v1
    add_resource!(Deployment, namespaced, ["deployment", "deploy"]);
    add_resource!(StatefulSet, namespaced, ["statefulset", "sts"]);
    add_resource!(DaemonSet, namespaced, ["daemonset", "ds"]);
    add_resource!(ReplicaSet, namespaced, ["replicaset", "rs"]);

    // batch/v1
    add_resource!(Job, namespaced, ["job"]);
    add_resource!(CronJob, namespaced, ["cronjob", "cj"]);

    add_resource!(Ingress, namespaced, ["ingress", "ing"]);
    add_resource!(NetworkPolicy, namespaced, ["networkpolicy", "netpol"]);
    add_resource!(HorizontalPodAutoscaler, namespaced, ["horizontalpodautoscaler", "hpa"]);
    add_resource!(PodDisruptionBudget, namespaced, ["poddisruptionbudget", "pdb"]);
    add_resource!(StorageClass, cluster, ["storageclass", "sc"]);

    // rbac.authorization.k8s.io/v1
    add_resource!(Role, namespaced, ["role"]);
    add_resource!(RoleBinding, namespaced, ["rolebinding"]);
    add_resource!(ClusterRole, cluster, ["clusterrole"]);
    add_resource!(ClusterRoleBinding, cluster, ["clusterrolebinding"]);

    registry
}

/// Whether an API group ships with Kubernetes itself
fn is_builtin_group(group: &str) -> bool {
    matches!(
        group,
        "" | "apps"
            | "batch"
            | "networking.k8s.io"
            | "policy"
            | "rbac.authorization.k8s.io"
            | "storage.k8s.io"
            | "autoscaling"
            | "coordination.k8s.io"
    )
}

/// Aliases for a discovered type: its lowercase kind plus known short names
fn discovered_aliases(ar: &ApiResource) -> Vec<String> {
    let mut aliases = vec![ar.kind.to_lowercase()];
    for (group, kind, short_names) in OPENSHIFT_ALIASES {
        if ar.group == *group && ar.kind == *kind {
            aliases.extend(short_names.iter().map(|s| s.to_string()));
        }
    }
    aliases
}

/// Turn one discovered API resource into a registry entry
fn discovered_info(ar: &ApiResource, caps: &ApiCapabilities) -> Option<ResourceInfo> {
    // Subresources (pods/log, deployments/scale) are not exportable
    if ar.plural.contains('/') {
        return None;
    }
    Some(ResourceInfo {
        api_resource: ar.clone(),
        capabilities: caps.clone(),
        plural: ar.plural.to_lowercase(),
        aliases: discovered_aliases(ar),
        is_core: is_builtin_group(&ar.group),
    })
}

/// Discover every resource type the server offers (including CRDs)
///
/// Used only when a name does not resolve against the built-in registry.
pub async fn discover_resources(client: &Client) -> Result<ResourceRegistry> {
    let mut registry = ResourceRegistry::new();
    let discovery = Discovery::new(client.clone()).run().await?;

    for group in discovery.groups() {
        for (ar, caps) in group.recommended_resources() {
            if let Some(info) = discovered_info(&ar, &caps) {
                registry.add(info);
            }
        }
    }

    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extension(group: &str, kind: &str, plural: &str) -> ResourceInfo {
        let ar = ApiResource {
            group: group.to_string(),
            version: "v1".to_string(),
            api_version: format!("{}/v1", group),
            kind: kind.to_string(),
            plural: plural.to_string(),
        };
        let caps = ApiCapabilities {
            scope: Scope::Namespaced,
            subresources: vec![],
            operations: vec![],
        };
        discovered_info(&ar, &caps).unwrap()
    }

    #[test]
    fn test_core_registry_aliases() {
        let registry = build_core_registry();
        let svc = registry.get("svc").unwrap();
        assert_eq!(svc.kind(), "Service");
        assert_eq!(svc.api_version(), "v1");
        assert!(svc.is_namespaced());

        let deploy = registry.get("Deployments").unwrap();
        assert_eq!(deploy.api_version(), "apps/v1");
        assert_eq!(registry.get("rc").unwrap().kind(), "ReplicationController");
        assert!(!registry.get("pv").unwrap().is_namespaced());
        assert!(registry.get("routes").is_none());
    }

    #[test]
    fn test_plural_dot_group() {
        let registry = build_core_registry();
        assert_eq!(registry.get("deployments.apps").unwrap().kind(), "Deployment");
        assert!(registry.get("deployments.batch").is_none());
    }

    #[test]
    fn test_openshift_short_names() {
        let mut registry = ResourceRegistry::new();
        registry.add(extension("apps.openshift.io", "DeploymentConfig", "deploymentconfigs"));
        registry.add(extension("image.openshift.io", "ImageStream", "imagestreams"));
        registry.add(extension("route.openshift.io", "Route", "routes"));

        assert_eq!(registry.get("dc").unwrap().kind(), "DeploymentConfig");
        assert_eq!(registry.get("is").unwrap().kind(), "ImageStream");
        assert_eq!(registry.get("route").unwrap().api_version(), "route.openshift.io/v1");
    }

    #[test]
    fn test_extension_does_not_replace_builtin() {
        let mut registry = build_core_registry();
        let before = registry.len();
        registry.merge({
            let mut other = ResourceRegistry::new();
            other.add(extension("example.com", "Widget", "services"));
            other
        });
        assert_eq!(registry.len(), before + 1);
        assert_eq!(registry.get("services").unwrap().api_version(), "v1");
        assert_eq!(registry.get("widget").unwrap().api_version(), "example.com/v1");
    }

    #[test]
    fn test_extension_plural_collision() {
        let mut registry = ResourceRegistry::new();
        registry.add(extension("a.example.com", "Gadget", "gadgets"));
        registry.add(extension("b.example.com", "Widget", "gadgets"));
        registry.add(extension("c.example.com", "Widget", "gadgets"));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("gadgets").unwrap().api_version(), "a.example.com/v1");
        assert_eq!(registry.get("widget").unwrap().api_version(), "b.example.com/v1");
    }

    #[test]
    fn test_subresources_skipped() {
        let ar = ApiResource {
            group: String::new(),
            version: "v1".to_string(),
            api_version: "v1".to_string(),
            kind: "Pod".to_string(),
            plural: "pods/log".to_string(),
        };
        let caps = ApiCapabilities {
            scope: Scope::Namespaced,
            subresources: vec![],
            operations: vec![],
        };
        assert!(discovered_info(&ar, &caps).is_none());
    }
}
