use super::Debugger;
use crate::config::Config;
use crate::handler::StopHandler;
use crate::host::Host;

/// Builder for [Debugger].
///
/// It is created by calling [Builder::new], and allows to specify which
/// host runtime to observe and which handler reports the stops.
///
/// ```
/// use haltpoint_engine::Builder;
/// use haltpoint_engine::handler::NoopHandler;
/// use haltpoint_sim::SimHost;
///
/// let debugger = Builder::new()
///     .with_host(SimHost::new())
///     .with_handler(NoopHandler)
///     .build();
///
/// assert!(!debugger.is_started());
/// ```
pub struct Builder<S> {
    state: S,
}

impl Builder<NeedsHost> {
    /// Creates a debugger builder.
    pub const fn new() -> Self {
        Self { state: NeedsHost }
    }

    /// Specifies the host runtime emitting the execution events.
    pub const fn with_host<H: Host>(self, host: H) -> Builder<NeedsHandler<H>> {
        Builder {
            state: NeedsHandler { host },
        }
    }
}

impl<H: Host> Builder<NeedsHandler<H>> {
    /// Specifies the handler of the stops.
    pub fn with_handler(self, handler: impl StopHandler<H>) -> Builder<Ready<H>> {
        Builder {
            state: Ready {
                host: self.state.host,
                handler: Box::new(handler),
                config: Config::default(),
            },
        }
    }
}

impl<H: Host> Builder<Ready<H>> {
    /// Specifies the settings of the session.
    ///
    /// [Config::default] is used otherwise.
    pub fn with_config(mut self, config: Config) -> Self {
        self.state.config = config;
        self
    }
}

impl<S: ReadyToBuild> Builder<S> {
    /// Builds the debugger (not started yet).
    pub fn build(self) -> Debugger<S::Host> {
        self.state.build()
    }
}

impl Default for Builder<NeedsHost> {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder state before the host runtime is known.
pub struct NeedsHost;

/// Builder state before the stop handler is known.
pub struct NeedsHandler<H> {
    host: H,
}

/// Builder state ready to build the debugger.
pub struct Ready<H: Host> {
    host: H,
    handler: Box<dyn StopHandler<H>>,
    config: Config,
}

impl<H: Host> ReadyToBuild for Ready<H> {
    type Host = H;

    fn build(self) -> Debugger<H> {
        Debugger::new(self.host, self.handler, self.config)
    }
}

/// Builder states from which a debugger can be built.
pub trait ReadyToBuild {
    /// Host runtime of the built debugger.
    type Host: Host;

    /// Builds the debugger.
    fn build(self) -> Debugger<Self::Host>;
}
