/// Settings of a debugger session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Whether raised exceptions carry a post-mortem copy of their context.
    pub post_mortem: bool,

    /// Whether line events of every thread are traced.
    pub tracing: bool,

    /// Number of processed events between two sweeps of the contexts of
    /// terminated threads.
    pub sweep_interval: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            post_mortem: false,
            tracing: false,
            sweep_interval: 3000,
        }
    }
}
