#![allow(missing_docs)]
#![allow(clippy::print_stderr)]

use std::fs::File;
use std::path::PathBuf;

use miette::IntoDiagnostic;

use haltpoint_cli::{CliAction, CliOpts};

use tracing_subscriber::EnvFilter;

fn main() {
    let cli = CliOpts::parse_from_cmdline();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::builder()
                .with_env_var("HALTPOINT_LOG")
                .from_env_lossy(),
        )
        .init();

    let res = match cli.action {
        CliAction::Replay {
            config,
            output,
            script,
        } => evaluate_replay(config, output, script),
    };

    if let Err(e) = res {
        eprintln!("{e:?}");
        std::process::exit(1);
    }
}

fn evaluate_replay(
    config: Option<String>,
    output: Option<PathBuf>,
    script: PathBuf,
) -> miette::Result<()> {
    let config = config
        .map(haltpoint_cli::parse_config)
        .transpose()?
        .unwrap_or_default();

    let script = haltpoint_cli::parse_script(&script)?;

    if let Some(output) = output {
        let file = File::create(output).into_diagnostic()?;
        haltpoint_cli::evaluate_replay(config, script, file)
    } else {
        haltpoint_cli::evaluate_replay(config, script, std::io::stdout())
    }
}
