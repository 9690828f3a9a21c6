// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! What to export: resource arguments, label selector, namespace scope and files

use kube::core::{Expression, Selector};
use std::collections::BTreeSet;
use std::path::PathBuf;

use super::error::ExportError;

/// One resource type and the names requested for it (empty means all)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRef {
    pub resource: String,
    pub names: Vec<String>,
}

impl ResourceRef {
    fn new(resource: &str, names: Vec<String>) -> Self {
        Self {
            resource: resource.to_string(),
            names,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Selection {
    /// Positional arguments as given on the command line
    pub args: Vec<String>,
    pub label_selector: Option<String>,
    /// Explicit namespace; `None` means the context default
    pub namespace: Option<String>,
    pub all_namespaces: bool,
    pub filenames: Vec<PathBuf>,
}

impl Selection {
    /// Parse the positional arguments into resource references
    ///
    /// Accepted forms are `TYPE`, `TYPE1,TYPE2`, `TYPE NAME...` and
    /// `TYPE/NAME...`. The slash form cannot be mixed with the others.
    pub fn resources(&self) -> Result<Vec<ResourceRef>, ExportError> {
        let Some(first) = self.args.first() else {
            return Ok(Vec::new());
        };

        if self.args.iter().any(|arg| arg.contains('/')) {
            return self
                .args
                .iter()
                .map(|arg| match arg.split_once('/') {
                    Some((resource, name)) if !resource.is_empty() && !name.is_empty() => {
                        Ok(ResourceRef::new(resource, vec![name.to_string()]))
                    }
                    Some(_) => Err(invalid(format!(
                        "arguments in resource/name form must have a single resource and name, got '{}'",
                        arg
                    ))),
                    None => Err(invalid(format!(
                        "there is no need to specify a resource type as a separate argument \
                         when passing arguments in resource/name form (got '{}')",
                        arg
                    ))),
                })
                .collect();
        }

        let names: Vec<String> = self.args[1..].to_vec();
        first
            .split(',')
            .map(|resource| {
                let resource = resource.trim();
                if resource.is_empty() {
                    Err(invalid(format!("invalid resource type list '{}'", first)))
                } else {
                    Ok(ResourceRef::new(resource, names.clone()))
                }
            })
            .collect()
    }

    /// The parsed `-l` selector, if one was given
    pub fn labels(&self) -> Result<Option<Selector>, ExportError> {
        self.label_selector
            .as_deref()
            .map(parse_label_selector)
            .transpose()
    }

    /// Check the selection is complete and self-consistent
    pub fn validate(&self) -> Result<(), ExportError> {
        let resources = self.resources()?;
        self.labels()?;

        if resources.is_empty() && self.filenames.is_empty() {
            return Err(invalid(
                "you must provide one or more resources by argument or filename",
            ));
        }
        if !resources.is_empty() && !self.filenames.is_empty() {
            return Err(invalid(
                "resource arguments cannot be combined with --filename",
            ));
        }

        let has_names = resources.iter().any(|r| !r.names.is_empty());
        if has_names && self.label_selector.is_some() {
            return Err(invalid(
                "name cannot be provided when a selector is specified",
            ));
        }
        if has_names && self.all_namespaces {
            return Err(invalid(
                "a resource cannot be retrieved by name across all namespaces",
            ));
        }
        Ok(())
    }

    /// True when exactly one type with exactly one name was requested
    pub fn is_singular(&self) -> bool {
        matches!(self.resources().as_deref(), Ok([only]) if only.names.len() == 1)
    }
}

fn invalid(message: impl Into<String>) -> ExportError {
    ExportError::InvalidSelection(message.into())
}

/// Parse a label selector in kubectl syntax: `a=b,c!=d,e in (x,y),f,!g`
pub fn parse_label_selector(input: &str) -> Result<Selector, ExportError> {
    split_requirements(input)
        .into_iter()
        .map(|requirement| {
            parse_requirement(requirement.trim()).ok_or_else(|| {
                invalid(format!(
                    "unable to parse requirement '{}' in label selector '{}'",
                    requirement.trim(),
                    input
                ))
            })
        })
        .collect()
}

/// Split on commas that are not inside a value set
fn split_requirements(input: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in input.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&input[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);
    parts
}

fn parse_requirement(requirement: &str) -> Option<Expression> {
    if let Some(key) = requirement.strip_prefix('!') {
        return Some(Expression::DoesNotExist(label_key(key)?));
    }
    if let Some((key, value)) = requirement.split_once("!=") {
        return Some(Expression::NotEqual(label_key(key)?, label_value(value)?));
    }
    if let Some((key, value)) = requirement
        .split_once("==")
        .or_else(|| requirement.split_once('='))
    {
        return Some(Expression::Equal(label_key(key)?, label_value(value)?));
    }
    if let Some((head, rest)) = requirement.split_once('(') {
        let (key, operator) = head.trim().split_once(char::is_whitespace)?;
        let values = rest
            .trim_end()
            .strip_suffix(')')?
            .split(',')
            .map(label_value)
            .collect::<Option<BTreeSet<String>>>()?;
        let key = label_key(key)?;
        return match operator.trim() {
            "in" => Some(Expression::In(key, values)),
            "notin" => Some(Expression::NotIn(key, values)),
            _ => None,
        };
    }
    Some(Expression::Exists(label_key(requirement)?))
}

fn label_key(key: &str) -> Option<String> {
    let key = key.trim();
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/'));
    valid.then(|| key.to_string())
}

/// Values may be empty (`tier=`)
fn label_value(value: &str) -> Option<String> {
    let value = value.trim();
    value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        .then(|| value.to_string())
}
