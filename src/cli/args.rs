// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::export::OutputVersion;

#[derive(Parser, Debug)]
#[command(name = "kexport")]
#[command(
    author,
    version,
    about = "Export Kubernetes resources as portable, replayable manifests"
)]
#[command(after_help = "Examples:
  kexport svc/web                              # one service, unwrapped
  kexport deploy,svc,route -l app=web          # several types by label
  kexport dc,svc,route --as-template=web-app   # wrap in a template
  kexport -f ./manifests --exact               # re-export files, keeping env fields")]
pub struct Args {
    /// TYPE, TYPE1,TYPE2, TYPE NAME..., or TYPE/NAME...
    #[arg(value_name = "RESOURCE")]
    pub resources: Vec<String>,

    /// Label selector to filter on (e.g. app=web,tier!=db)
    #[arg(short = 'l', long = "selector")]
    pub selector: Option<String>,

    /// Namespace to export from (default: the context's namespace)
    #[arg(short, long)]
    pub namespace: Option<String>,

    /// Export from all namespaces
    #[arg(short = 'A', long)]
    pub all_namespaces: bool,

    /// File or directory of YAML/JSON documents to export instead of the cluster
    #[arg(short = 'f', long = "filename", value_name = "PATH")]
    pub filenames: Vec<PathBuf>,

    /// Keep environment-specific fields; clear only server-generated ones
    #[arg(long)]
    pub exact: bool,

    /// Do not clear any fields
    #[arg(long)]
    pub raw: bool,

    /// Wrap the output in a Template with this name
    #[arg(long, value_name = "NAME")]
    pub as_template: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "yaml")]
    pub output: OutputFormat,

    /// API version to output (e.g. v1 or autoscaling/v2)
    #[arg(long, value_name = "VERSION")]
    pub output_version: Option<OutputVersion>,

    /// Kubernetes context to use
    #[arg(short, long, value_name = "CONTEXT")]
    pub context: Option<String>,

    /// Remember --output-version and --context as defaults
    #[arg(long)]
    pub save_defaults: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(ValueEnum, Clone, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
    Name,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["kexport", "svc", "web"]).unwrap();
        assert_eq!(args.resources, vec!["svc", "web"]);
        assert_eq!(args.output, OutputFormat::Yaml);
        assert!(!args.exact && !args.raw && !args.all_namespaces);
        assert!(args.output_version.is_none());
    }

    #[test]
    fn test_all_flags() {
        let args = Args::try_parse_from([
            "kexport",
            "deploy,svc",
            "-l",
            "app=web",
            "-n",
            "prod",
            "--exact",
            "--as-template",
            "web-app",
            "-o",
            "json",
            "--output-version",
            "apps/v1",
            "-c",
            "staging",
        ])
        .unwrap();
        assert_eq!(args.selector.as_deref(), Some("app=web"));
        assert_eq!(args.namespace.as_deref(), Some("prod"));
        assert!(args.exact);
        assert_eq!(args.as_template.as_deref(), Some("web-app"));
        assert_eq!(args.output, OutputFormat::Json);
        assert_eq!(args.output_version.unwrap().to_string(), "apps/v1");
        assert_eq!(args.context.as_deref(), Some("staging"));
    }

    #[test]
    fn test_repeated_filenames() {
        let args = Args::try_parse_from(["kexport", "-f", "a.yaml", "-f", "dir"]).unwrap();
        assert_eq!(args.filenames, vec![PathBuf::from("a.yaml"), PathBuf::from("dir")]);
    }

    #[test]
    fn test_invalid_output_version_rejected() {
        assert!(Args::try_parse_from(["kexport", "svc", "--output-version", "apps/"]).is_err());
        assert!(Args::try_parse_from(["kexport", "svc", "-o", "table"]).is_err());
    }
}
