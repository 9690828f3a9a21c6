// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! The export pipeline: fetch, sanitize, aggregate, version-stamp

mod aggregate;
mod convert;
mod document;
mod error;
mod sanitize;
mod selection;

pub use aggregate::{AggregationTarget, aggregate};
pub use convert::{OutputVersion, VersionConverter};
pub use document::ResourceDocument;
pub use error::{ExportError, SanitizeFailures};
pub use sanitize::{Disposition, SANITIZERS};
pub use selection::Selection;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

/// How aggressively fields are cleared before export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportPolicy {
    /// Clear server-generated and environment-specific fields
    #[default]
    Default,
    /// Clear only fields that can never be replayed
    Exact,
    /// Leave documents exactly as fetched
    Raw,
}

impl ExportPolicy {
    pub fn is_exact(self) -> bool {
        self == ExportPolicy::Exact
    }

    /// Resolve the command line flags; asking for both is an error
    pub fn from_flags(exact: bool, raw: bool) -> Result<Self, ExportError> {
        match (exact, raw) {
            (true, true) => Err(ExportError::ConflictingPolicy),
            (true, false) => Ok(ExportPolicy::Exact),
            (false, true) => Ok(ExportPolicy::Raw),
            (false, false) => Ok(ExportPolicy::Default),
        }
    }
}

/// Documents returned by a fetcher, in fetch order
#[derive(Debug, Clone, Default)]
pub struct Fetched {
    pub documents: Vec<ResourceDocument>,
    /// The selection named exactly one resource
    pub singular: bool,
}

/// Source of resource documents for an export
#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    async fn fetch(&self, selection: &Selection) -> anyhow::Result<Fetched>;
}

/// Everything one export run needs besides the fetcher
#[derive(Debug, Clone, Default)]
pub struct ExportRequest {
    pub selection: Selection,
    pub exact: bool,
    pub raw: bool,
    /// Wrap the result in a `Template` of this name
    pub template: Option<String>,
    pub output_version: Option<OutputVersion>,
}

impl ExportRequest {
    /// Check the flags before anything is fetched
    pub fn validate(&self) -> Result<ExportPolicy, ExportError> {
        let policy = ExportPolicy::from_flags(self.exact, self.raw)?;
        self.selection.validate()?;
        Ok(policy)
    }

    fn target(&self) -> AggregationTarget {
        match &self.template {
            Some(name) => AggregationTarget::Template(name.clone()),
            None => AggregationTarget::List,
        }
    }
}

pub struct Exporter<F> {
    fetcher: F,
}

impl<F: ResourceFetcher> Exporter<F> {
    pub fn new(fetcher: F) -> Self {
        Self { fetcher }
    }

    /// Run one export and return the value to render
    ///
    /// Nothing is returned unless every document sanitized and converted
    /// cleanly; a policy conflict is reported before anything is fetched.
    pub async fn run(&self, request: &ExportRequest) -> Result<Value, ExportError> {
        let policy = request.validate()?;

        let fetched = self
            .fetcher
            .fetch(&request.selection)
            .await
            .map_err(ExportError::Fetch)?;
        if fetched.documents.is_empty() {
            return Err(ExportError::NothingToExport);
        }
        info!(
            documents = fetched.documents.len(),
            singular = fetched.singular,
            ?policy,
            "Fetched resources"
        );

        let documents = sanitize_all(fetched.documents, policy)?;
        let converter = VersionConverter::new(request.output_version.clone());
        let result = aggregate(documents, &request.target(), fetched.singular, &converter)?;
        Ok(result)
    }
}

/// Sanitize every document in fetch order
///
/// Omitted documents are dropped. Failures do not stop the pass; they are
/// all reported together once it is done. Under `Raw` every document is kept
/// as fetched.
pub fn sanitize_all(
    documents: Vec<ResourceDocument>,
    policy: ExportPolicy,
) -> Result<Vec<ResourceDocument>, SanitizeFailures> {
    let mut kept = Vec::with_capacity(documents.len());
    let mut failures = Vec::new();
    for mut doc in documents {
        match SANITIZERS.sanitize(&mut doc, policy) {
            Ok(Disposition::Keep) => kept.push(doc),
            Ok(Disposition::Omit) => debug!(resource = %doc.describe(), "Omitted from export"),
            Err(e) => failures.push(e),
        }
    }

    if failures.is_empty() {
        Ok(kept)
    } else {
        Err(SanitizeFailures(failures))
    }
}
