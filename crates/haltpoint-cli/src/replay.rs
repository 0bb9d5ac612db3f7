use std::io::Write;

use haltpoint_engine::{Builder, Debugger};
use haltpoint_engine::host::Host;
use haltpoint_sim::{SimHost, ThreadDriver};
use kdl::KdlDocument;
use miette::IntoDiagnostic;

use crate::config::ReplayConfig;
use crate::handler::ReplayHandler;
use crate::report::{self, Report};
use crate::script::{Event, Script, ThreadScript};

/// Runs the subcommand for replaying an execution script.
pub fn evaluate_replay(
    config: ReplayConfig,
    script: Script,
    mut output: impl Write,
) -> miette::Result<()> {
    let mut kdl = replay(config, script)?;

    kdl.autoformat();

    output
        .write_all(kdl.to_string().as_bytes())
        .into_diagnostic()?;

    Ok(())
}

#[tracing::instrument(name = "Replay", skip_all, fields(threads = script.threads.len()))]
fn replay(config: ReplayConfig, script: Script) -> miette::Result<KdlDocument> {
    let Script {
        classes,
        breakpoints,
        method_breakpoints,
        catchpoints,
        on_stop,
        threads,
    } = script;

    let host = SimHost::new();
    for class in classes {
        host.define_class(class.name, class.parent.as_deref());
    }

    let handler = ReplayHandler::new(on_stop.commands);

    let debugger = Builder::new()
        .with_host(host)
        .with_handler(handler.clone())
        .with_config(config.into())
        .build();

    debugger.start();

    for breakpoint in &breakpoints {
        let breakpoint = breakpoint.to_breakpoint().into_diagnostic()?;
        debugger.add_breakpoint(breakpoint).into_diagnostic()?;
    }

    for breakpoint in &method_breakpoints {
        let breakpoint = breakpoint.to_breakpoint().into_diagnostic()?;
        debugger.add_breakpoint(breakpoint).into_diagnostic()?;
    }

    for catchpoint in catchpoints {
        debugger.add_catchpoint(catchpoint.class).into_diagnostic()?;
    }

    for (index, thread) in threads.into_iter().enumerate() {
        let worker = debugger.clone();
        let worker_handler = handler.clone();

        let (_, handle) = debugger
            .host()
            .spawn(move || replay_thread(&worker, &worker_handler, thread));

        handle
            .join()
            .map_err(|_| miette::miette!("replay of thread #{index} panicked"))?;
    }

    tracing::info!(events = debugger.event_count(), "replay done");

    debugger.stop().into_diagnostic()?;

    Ok(report::dump_to_kdl(&handler.reports()))
}

/// Replays the events of a thread, from its own simulated thread.
fn replay_thread(debugger: &Debugger<SimHost>, handler: &ReplayHandler, thread: ThreadScript) {
    let host = debugger.host();

    if thread.debugger {
        host.set_debugger_thread(&host.current_thread(), true);
    }

    let driver = ThreadDriver::new(debugger);

    for event in thread.events {
        match event {
            Event::Line(event) => driver.line(&event.path, event.line),
            Event::Call(event) => driver.call(&event.class, &event.method, &event.path, event.line),
            Event::Return => driver.ret(),
            Event::Raise(event) => {
                let exception = host.exception(event.class);
                driver.raise(&exception);

                if let Some(post_mortem) = debugger.take_post_mortem(&exception) {
                    handler.push(Report::PostMortem {
                        thnum: post_mortem.context.thnum(),
                        class: exception.class().to_owned(),
                        path: post_mortem.path,
                        line: post_mortem.line,
                        depth: post_mortem.context.depth(),
                    });
                }
            }
            Event::ForeignCall => driver.foreign_call(),
            Event::ForeignReturn => driver.foreign_return(),
            Event::Local(event) => driver.set_local(&event.name, event.value),
        }
    }
}
