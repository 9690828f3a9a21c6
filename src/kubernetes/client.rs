// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

use anyhow::{Context, Result, anyhow, bail};
use kube::api::{DynamicObject, ListParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client, Config};
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info, trace, warn};

use super::discovery::{self, ResourceInfo, ResourceRegistry};

/// Timeout for connecting to K8s API
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout for reading K8s API responses
const READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum retry attempts for transient failures
const MAX_RETRIES: u32 = 3;

/// Base delay for exponential backoff (doubles each retry)
const RETRY_BASE_DELAY: Duration = Duration::from_millis(100);

/// Page size for paginated list requests
const PAGE_SIZE: u32 = 500;

/// Connection to one kubeconfig context
pub struct ClusterClient {
    client: Client,
    context: String,
    default_namespace: String,
    core: ResourceRegistry,
    /// Full server discovery, run at most once and only when needed
    discovered: OnceCell<ResourceRegistry>,
}

impl ClusterClient {
    /// Connect using the given context, or the kubeconfig's current one
    pub async fn connect(context: Option<&str>) -> Result<Self> {
        let kubeconfig = Kubeconfig::read().context("Failed to read kubeconfig")?;

        let context_name = context
            .map(String::from)
            .or_else(|| kubeconfig.current_context.clone())
            .ok_or_else(|| anyhow!("No context specified and no current context in kubeconfig"))?;

        if !kubeconfig.contexts.iter().any(|c| c.name == context_name) {
            bail!("Context '{}' not found in kubeconfig", context_name);
        }

        let mut config = Config::from_custom_kubeconfig(
            kubeconfig,
            &KubeConfigOptions {
                context: Some(context_name.clone()),
                ..Default::default()
            },
        )
        .await
        .with_context(|| format!("Failed to load kubeconfig for context '{}'", context_name))?;

        config.connect_timeout = Some(CONNECT_TIMEOUT);
        config.read_timeout = Some(READ_TIMEOUT);
        let default_namespace = config.default_namespace.clone();

        let client = Client::try_from(config)
            .with_context(|| format!("Failed to create client for context '{}'", context_name))?;

        info!(context = %context_name, namespace = %default_namespace, "Connected");

        Ok(Self {
            client,
            context: context_name,
            default_namespace,
            core: discovery::build_core_registry(),
            discovered: OnceCell::new(),
        })
    }

    /// Namespace from the kubeconfig context, `default` when it sets none
    pub fn default_namespace(&self) -> &str {
        &self.default_namespace
    }

    /// Resolve a command line resource name to a type
    ///
    /// Built-in types resolve locally; anything else triggers discovery.
    pub async fn resolve(&self, name: &str) -> Result<ResourceInfo> {
        if let Some(info) = self.core.get(name) {
            return Ok(info.clone());
        }

        let registry = self
            .discovered
            .get_or_try_init(|| async {
                let mut registry = discovery::build_core_registry();
                registry.merge(discovery::discover_resources(&self.client).await?);
                info!(context = %self.context, types = registry.len(), "Discovered resource types");
                Ok::<_, anyhow::Error>(registry)
            })
            .await
            .with_context(|| format!("Failed to discover resources for '{}'", self.context))?;

        registry
            .get(name)
            .cloned()
            .ok_or_else(|| anyhow!("the server doesn't have a resource type \"{}\"", name))
    }

    /// Fetch documents of one type, by name or by listing
    ///
    /// `namespace` of `None` lists across all namespaces; it is ignored for
    /// cluster-scoped types. Each document gets `apiVersion` and `kind` set.
    pub async fn fetch(
        &self,
        info: &ResourceInfo,
        names: &[String],
        namespace: Option<&str>,
        label_selector: Option<&str>,
    ) -> Result<Vec<Value>> {
        let ar = &info.api_resource;
        let (api, scope): (Api<DynamicObject>, &str) = if info.is_namespaced() {
            match namespace {
                Some(ns) => (Api::namespaced_with(self.client.clone(), ns, ar), "namespaced"),
                None => (Api::all_with(self.client.clone(), ar), "all-namespaces"),
            }
        } else {
            (Api::all_with(self.client.clone(), ar), "cluster-scoped")
        };

        debug!(
            context = %self.context,
            namespace = ?namespace,
            api_version = %info.api_version(),
            kind = %info.kind(),
            scope = %scope,
            names = names.len(),
            "Fetching K8s resource"
        );

        let objects = if names.is_empty() {
            self.list_all(&api, info, label_selector).await?
        } else {
            let mut objects = Vec::with_capacity(names.len());
            for name in names {
                let what = format!("{} {}", info.kind(), name);
                match with_retry(&what, is_retryable_error, || api.get(name)).await {
                    Ok(obj) => objects.push(obj),
                    Err(kube::Error::Api(e)) if e.code == 404 => {
                        bail!("{} \"{}\" not found", info.plural, name)
                    }
                    Err(e) => return Err(anyhow!("K8s API error: {}", e)),
                }
            }
            objects
        };

        objects
            .into_iter()
            .map(|obj| to_document(obj, info))
            .collect()
    }

    /// List with pagination, following continue tokens until exhausted
    async fn list_all(
        &self,
        api: &Api<DynamicObject>,
        info: &ResourceInfo,
        label_selector: Option<&str>,
    ) -> Result<Vec<DynamicObject>> {
        let base_params = build_list_params(label_selector);
        let mut all_items = Vec::new();
        let mut continue_token: Option<String> = None;
        let mut page_count = 0u32;

        loop {
            let mut params = base_params.clone().limit(PAGE_SIZE);
            if let Some(ref token) = continue_token {
                params = params.continue_token(token);
            }

            let list = with_retry(&info.plural, is_retryable_error, || api.list(&params))
                .await
                .map_err(|e| anyhow!("K8s API error: {}", e))?;

            let items_count = list.items.len();
            all_items.extend(list.items);
            page_count += 1;

            match list.metadata.continue_ {
                Some(token) if !token.is_empty() => {
                    debug!(
                        resource = %info.plural,
                        page = page_count,
                        items_this_page = items_count,
                        total_so_far = all_items.len(),
                        "Fetched page, continuing"
                    );
                    continue_token = Some(token);
                }
                _ => break,
            }
        }

        if page_count > 1 {
            debug!(resource = %info.plural, pages = page_count, total_items = all_items.len(), "Pagination complete");
        }
        Ok(all_items)
    }
}

/// Run an API call, retrying transient failures with exponential backoff
async fn with_retry<T, E, F, Fut>(
    what: &str,
    is_retryable: impl Fn(&E) -> bool,
    mut op: F,
) -> std::result::Result<T, E>
where
    E: std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if is_retryable(&e) && attempt + 1 < MAX_RETRIES => {
                let delay = RETRY_BASE_DELAY * 2u32.pow(attempt);
                warn!(
                    resource = %what,
                    attempt = attempt + 1,
                    max_attempts = MAX_RETRIES,
                    delay_ms = delay.as_millis(),
                    error = %e,
                    "Retryable error, backing off"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                debug!(resource = %what, error = %e, "Giving up on API call");
                return Err(e);
            }
        }
    }
}

/// Check if an error is retryable (transient failures)
fn is_retryable_error(err: &kube::Error) -> bool {
    match err {
        kube::Error::HyperError(_) => true,
        kube::Error::Api(api_err) => is_retryable_status(api_err.code),
        _ => false,
    }
}

/// 429 (rate limit), 503 (unavailable), 504 (timeout)
fn is_retryable_status(code: u16) -> bool {
    matches!(code, 429 | 503 | 504)
}

fn build_list_params(label_selector: Option<&str>) -> ListParams {
    let mut params = ListParams::default();
    if let Some(selector) = label_selector {
        params = params.labels(selector);
    }
    trace!(label_selector = ?label_selector, "Built ListParams");
    params
}

/// Serialize a fetched object and stamp its type
///
/// List responses do not carry `apiVersion` and `kind` per item.
fn to_document(obj: DynamicObject, info: &ResourceInfo) -> Result<Value> {
    let mut value = serde_json::to_value(obj).context("Failed to serialize fetched object")?;
    if let Value::Object(ref mut map) = value {
        map.insert(
            "apiVersion".to_string(),
            Value::String(info.api_version().to_string()),
        );
        map.insert("kind".to_string(), Value::String(info.kind().to_string()));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::api::ObjectMeta;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn transient(e: &String) -> bool {
        e == "unavailable"
    }

    #[test]
    fn test_retryable_status_codes() {
        assert!(is_retryable_status(429));
        assert!(is_retryable_status(503));
        assert!(is_retryable_status(504));
        assert!(!is_retryable_status(404));
        assert!(!is_retryable_status(403));
    }

    #[tokio::test]
    async fn test_retry_until_success() {
        let calls = AtomicU32::new(0);
        let result = with_retry("pods", transient, || async {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err("unavailable".to_string())
            } else {
                Ok(7)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_retry_gives_up() {
        let calls = AtomicU32::new(0);
        let result: std::result::Result<(), String> = with_retry("pods", transient, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err("unavailable".to_string())
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), MAX_RETRIES);
    }

    #[tokio::test]
    async fn test_non_retryable_fails_fast() {
        let calls = AtomicU32::new(0);
        let result: std::result::Result<(), String> = with_retry("pods", transient, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err("forbidden".to_string())
        })
        .await;
        assert_eq!(result.unwrap_err(), "forbidden");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_to_document_injects_type() {
        let registry = discovery::build_core_registry();
        let info = registry.get("deploy").unwrap();
        let obj = DynamicObject {
            types: None,
            metadata: ObjectMeta {
                name: Some("web".to_string()),
                ..Default::default()
            },
            data: serde_json::json!({"spec": {"replicas": 2}}),
        };
        let doc = to_document(obj, info).unwrap();
        assert_eq!(doc["apiVersion"], "apps/v1");
        assert_eq!(doc["kind"], "Deployment");
        assert_eq!(doc["metadata"]["name"], "web");
        assert_eq!(doc["spec"]["replicas"], 2);
    }
}
