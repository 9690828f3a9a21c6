// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

mod args;

pub use args::{Args, OutputFormat};

use std::io::{self, Write};
use tracing::{info, warn};

use crate::config::Config;
use crate::export::{ExportError, ExportRequest, Exporter, Selection};
use crate::kubernetes::KubeFetcher;
use crate::output;

/// How a run ended, decided here and acted on by `main`
#[derive(Debug)]
pub enum Outcome {
    Success,
    Failed(ExportError),
    /// Output could not be delivered; exit without reporting
    HardExit,
}

impl Outcome {
    pub fn exit_code(&self) -> u8 {
        match self {
            Outcome::Success => 0,
            Outcome::Failed(e) if e.is_usage() => 2,
            Outcome::Failed(_) | Outcome::HardExit => 1,
        }
    }
}

/// Run one export as described by the command line
pub async fn execute(args: &Args) -> Outcome {
    let config = Config::load().unwrap_or_else(|e| {
        warn!(error = %e, "Ignoring unreadable config");
        eprintln!("Warning: {:#}", e);
        Config::default()
    });

    let request = build_request(args, &config);
    let context = args.context.clone().or_else(|| config.context.clone());

    if args.save_defaults {
        match defaults_only(args, &request) {
            Ok(true) => {
                save_defaults(args, config);
                return Outcome::Success;
            }
            Ok(false) => save_defaults(args, config),
            Err(e) => return Outcome::Failed(e),
        }
    }

    let exporter = Exporter::new(KubeFetcher::new(context));
    let value = match exporter.run(&request).await {
        Ok(value) => value,
        Err(e) => return Outcome::Failed(e),
    };

    let text = match output::render(&value, &args.output) {
        Ok(text) => text,
        Err(e) => return Outcome::Failed(ExportError::Render(e)),
    };
    write_output(&mut io::stdout().lock(), &text)
}

/// Combine flags with configured defaults; flags win
fn build_request(args: &Args, config: &Config) -> ExportRequest {
    let output_version = args.output_version.clone().or_else(|| {
        config.output_version().unwrap_or_else(|e| {
            warn!(error = %e, "Ignoring configured output version");
            None
        })
    });

    ExportRequest {
        selection: Selection {
            args: args.resources.clone(),
            label_selector: args.selector.clone(),
            namespace: args.namespace.clone(),
            all_namespaces: args.all_namespaces,
            filenames: args.filenames.clone(),
        },
        exact: args.exact,
        raw: args.raw,
        template: args.as_template.clone(),
        output_version,
    }
}

/// With nothing selected, `--save-defaults` runs on its own. Otherwise the
/// request must be valid before anything is saved.
fn defaults_only(args: &Args, request: &ExportRequest) -> Result<bool, ExportError> {
    if args.resources.is_empty() && args.filenames.is_empty() {
        return Ok(true);
    }
    request.validate().map(|_| false)
}

fn save_defaults(args: &Args, mut config: Config) {
    if let Some(version) = &args.output_version {
        config.output_version = Some(version.to_string());
    }
    if let Some(context) = &args.context {
        config.context = Some(context.clone());
    }
    match config.save() {
        Ok(()) => info!(?config, "Saved defaults"),
        Err(e) => {
            warn!(error = %e, "Failed to save defaults");
            eprintln!("Warning: {:#}", e);
        }
    }
}

fn write_output(out: &mut impl Write, text: &str) -> Outcome {
    match out.write_all(text.as_bytes()).and_then(|()| out.flush()) {
        Ok(()) => Outcome::Success,
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Outcome::HardExit,
        Err(e) => Outcome::Failed(ExportError::Render(e.into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct FullDisk;

    impl Write for FullDisk {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("no space left on device"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("kexport").chain(argv.iter().copied())).unwrap()
    }

    #[test]
    fn test_write_output() {
        let mut buf = Vec::new();
        assert!(matches!(write_output(&mut buf, "kind: List\n"), Outcome::Success));
        assert_eq!(buf, b"kind: List\n");

        let outcome = write_output(&mut ClosedPipe, "x");
        assert!(matches!(outcome, Outcome::HardExit));
        assert_eq!(outcome.exit_code(), 1);

        let outcome = write_output(&mut FullDisk, "x");
        assert!(matches!(outcome, Outcome::Failed(ExportError::Render(_))));
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(Outcome::Success.exit_code(), 0);
        assert_eq!(Outcome::Failed(ExportError::ConflictingPolicy).exit_code(), 2);
        assert_eq!(Outcome::Failed(ExportError::NothingToExport).exit_code(), 1);
    }

    #[test]
    fn test_flags_override_config() {
        let config = Config {
            output_version: Some("v1".to_string()),
            context: Some("prod".to_string()),
        };

        let request = build_request(&parse(&["svc", "--output-version", "autoscaling/v2"]), &config);
        assert_eq!(request.output_version.unwrap().to_string(), "autoscaling/v2");

        let request = build_request(&parse(&["svc"]), &config);
        assert_eq!(request.output_version.unwrap().to_string(), "v1");
    }

    #[test]
    fn test_request_from_flags() {
        let args = parse(&["svc", "web", "-n", "prod", "--raw", "--as-template", "t"]);
        let request = build_request(&args, &Config::default());
        assert_eq!(request.selection.args, vec!["svc", "web"]);
        assert_eq!(request.selection.namespace.as_deref(), Some("prod"));
        assert!(request.raw && !request.exact);
        assert_eq!(request.template.as_deref(), Some("t"));
        assert!(request.output_version.is_none());
    }

    #[test]
    fn test_bad_configured_version_ignored() {
        let config = Config {
            output_version: Some("apps/".to_string()),
            context: None,
        };
        assert!(build_request(&parse(&["svc"]), &config).output_version.is_none());
    }

    #[test]
    fn test_save_defaults_on_its_own() {
        let config = Config::default();

        let args = parse(&["--save-defaults", "--output-version", "v1"]);
        assert!(defaults_only(&args, &build_request(&args, &config)).unwrap());

        let args = parse(&["--save-defaults", "svc"]);
        assert!(!defaults_only(&args, &build_request(&args, &config)).unwrap());
    }

    #[test]
    fn test_invalid_request_saves_nothing() {
        let config = Config::default();

        let args = parse(&["--save-defaults", "--exact", "--raw", "svc"]);
        let err = defaults_only(&args, &build_request(&args, &config)).unwrap_err();
        assert!(matches!(err, ExportError::ConflictingPolicy));

        let args = parse(&["--save-defaults", "-A", "svc/web"]);
        assert!(defaults_only(&args, &build_request(&args, &config)).unwrap_err().is_usage());
    }
}
