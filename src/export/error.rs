// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

use std::fmt;

/// Everything that can stop an export run
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("--exact and --raw may not both be specified")]
    ConflictingPolicy,

    #[error("{0}")]
    InvalidSelection(String),

    #[error("no resources found - nothing to export")]
    NothingToExport,

    #[error(transparent)]
    Sanitize(#[from] SanitizeFailures),

    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error(transparent)]
    Fetch(anyhow::Error),

    #[error(transparent)]
    Render(anyhow::Error),
}

impl ExportError {
    /// Errors caused by how the command was invoked rather than by the data
    pub fn is_usage(&self) -> bool {
        matches!(
            self,
            ExportError::ConflictingPolicy | ExportError::InvalidSelection(_)
        )
    }
}

/// A kind-specific sanitize routine could not process a document
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{resource}: {reason}")]
pub struct SanitizeError {
    /// `Kind ns/name` of the offending document
    pub resource: String,
    pub reason: String,
}

impl SanitizeError {
    pub fn new(resource: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            reason: reason.into(),
        }
    }
}

/// All sanitize failures of one pass, in fetch order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizeFailures(pub Vec<SanitizeError>);

impl fmt::Display for SanitizeFailures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.as_slice() {
            [single] => write!(f, "{}", single),
            errors => {
                write!(f, "{} resources could not be exported:", errors.len())?;
                for err in errors {
                    write!(f, "\n  * {}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for SanitizeFailures {}

/// A document or container cannot be expressed in the requested API version
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot convert {resource} from {from} to {to}")]
pub struct ConversionError {
    pub resource: String,
    pub from: String,
    pub to: String,
}
