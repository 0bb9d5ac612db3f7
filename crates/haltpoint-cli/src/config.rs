use std::ffi::OsStr;
use std::path::Path;

use haltpoint_engine::Config;
use miette::IntoDiagnostic;

/// Configuration of the debugger session.
#[derive(Debug, PartialEq, knus::Decode)]
pub struct ReplayConfig {
    /// Whether raised exceptions carry a post-mortem context.
    #[knus(child, default, unwrap(argument))]
    pub post_mortem: bool,

    /// Whether every line event is traced.
    #[knus(child, default, unwrap(argument))]
    pub tracing: bool,

    /// Number of events between two sweeps of dead thread contexts.
    #[knus(child, default = 3000, unwrap(argument))]
    pub sweep_interval: u64,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        let config = Config::default();

        Self {
            post_mortem: config.post_mortem,
            tracing: config.tracing,
            sweep_interval: config.sweep_interval,
        }
    }
}

impl From<ReplayConfig> for Config {
    fn from(config: ReplayConfig) -> Self {
        Self {
            post_mortem: config.post_mortem,
            tracing: config.tracing,
            sweep_interval: config.sweep_interval,
        }
    }
}

/// Parses the debugger configuration.
///
/// If `config` ends with `.kdl`, it is treated as a path to a configuration
/// file. Otherwise it is parsed as inline KDL.
pub fn parse_config(config: String) -> miette::Result<ReplayConfig> {
    let path = Path::new(&config);

    let config = if let Some((filename, "kdl")) = path
        .file_name()
        .and_then(OsStr::to_str)
        .zip(path.extension().and_then(OsStr::to_str))
    {
        let content = std::fs::read_to_string(path).into_diagnostic()?;
        knus::parse(filename, &content)?
    } else {
        knus::parse("<content>", &config)?
    };

    Ok(config)
}
