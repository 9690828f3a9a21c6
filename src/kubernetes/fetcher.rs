// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::info;

use super::client::ClusterClient;
use super::files;
use crate::export::{Fetched, ResourceDocument, ResourceFetcher, Selection};

/// Fetches from files when any are given, otherwise from the cluster
///
/// The cluster connection is only made on first use, so file exports work
/// without a kubeconfig.
pub struct KubeFetcher {
    context: Option<String>,
    client: OnceCell<ClusterClient>,
}

impl KubeFetcher {
    pub fn new(context: Option<String>) -> Self {
        Self {
            context,
            client: OnceCell::new(),
        }
    }

    async fn client(&self) -> Result<&ClusterClient> {
        self.client
            .get_or_try_init(|| ClusterClient::connect(self.context.as_deref()))
            .await
    }
}

#[async_trait]
impl ResourceFetcher for KubeFetcher {
    async fn fetch(&self, selection: &Selection) -> Result<Fetched> {
        if !selection.filenames.is_empty() {
            let fetched = files::read_documents(&selection.filenames)?;
            let namespace = selection
                .namespace
                .as_deref()
                .filter(|_| !selection.all_namespaces);
            let documents =
                files::select(fetched.documents, selection.labels()?.as_ref(), namespace)?;
            return Ok(Fetched {
                documents,
                singular: fetched.singular,
            });
        }

        let client = self.client().await?;
        let namespace = if selection.all_namespaces {
            None
        } else {
            Some(
                selection
                    .namespace
                    .as_deref()
                    .unwrap_or(client.default_namespace()),
            )
        };

        let mut documents = Vec::new();
        for resource in selection.resources()? {
            let info = client.resolve(&resource.resource).await?;
            let values = client
                .fetch(
                    &info,
                    &resource.names,
                    namespace,
                    selection.label_selector.as_deref(),
                )
                .await?;
            info!(resource = %info.plural, count = values.len(), "Fetched");
            documents.extend(values.into_iter().map(ResourceDocument::new));
        }

        Ok(Fetched {
            documents,
            singular: selection.is_singular(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_files_need_no_cluster() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("svc.yaml");
        fs::write(&path, "apiVersion: v1\nkind: Service\nmetadata:\n  name: web\n").unwrap();

        let fetcher = KubeFetcher::new(Some("no-such-context".to_string()));
        let selection = Selection {
            filenames: vec![path],
            ..Default::default()
        };
        let fetched = fetcher.fetch(&selection).await.unwrap();
        assert!(fetched.singular);
        assert_eq!(fetched.documents[0].describe(), "Service web");
        assert!(fetcher.client.get().is_none());
    }

    #[tokio::test]
    async fn test_files_filtered_by_selector() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("svcs.yaml");
        fs::write(
            &path,
            "kind: Service\nmetadata:\n  name: a\n  labels:\n    app: a\n---\nkind: Service\nmetadata:\n  name: b\n  labels:\n    app: b\n",
        )
        .unwrap();

        let fetcher = KubeFetcher::new(None);
        let selection = Selection {
            filenames: vec![path],
            label_selector: Some("app=a".to_string()),
            ..Default::default()
        };
        let fetched = fetcher.fetch(&selection).await.unwrap();
        let described: Vec<_> = fetched.documents.iter().map(|d| d.describe()).collect();
        assert_eq!(described, vec!["Service a"]);
    }
}
