//! Command line plumbing shared by the binaries of the workspace.
pub use clap;
pub use clap_verbosity_flag as verbose;

use std::{io::Write, sync::Mutex};

use clap::builder::styling::{AnsiColor, Styles};

pub fn get_styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::Yellow.on_default().bold())
        .usage(AnsiColor::Green.on_default().bold())
        .literal(AnsiColor::Cyan.on_default().bold())
        .placeholder(AnsiColor::Cyan.on_default())
        .error(AnsiColor::Red.on_default().bold())
        .valid(AnsiColor::Green.on_default())
        .invalid(AnsiColor::Yellow.on_default())
}

/// Map the `-v` count to a tracing level, one level quieter than the flag
/// says. Without any flag only errors are shown.
pub fn verbose_level_to_trace(level: Option<verbose::Level>) -> &'static tracing::Level {
    match level {
        Some(verbose::Level::Error) => &tracing::Level::WARN,
        Some(verbose::Level::Warn) => &tracing::Level::INFO,
        Some(verbose::Level::Info) => &tracing::Level::DEBUG,
        Some(verbose::Level::Debug) => &tracing::Level::TRACE,
        Some(verbose::Level::Trace) => &tracing::Level::TRACE,
        None => &tracing::Level::ERROR,
    }
}

/// Install the global subscriber. Logs go to stderr as text, or to
/// `log_file` as JSON lines when one is given.
pub fn logging_setup<W>(level: &tracing::Level, log_file: Option<W>)
where
    W: Write + Send + 'static,
{
    let builder = tracing_subscriber::fmt().with_max_level(*level);
    let res = match log_file {
        Some(file) => builder.json().with_writer(Mutex::new(file)).try_init(),
        None => builder
            .with_writer(std::io::stderr)
            .without_time()
            .try_init(),
    };
    if let Err(e) = res {
        eprintln!("logging is already set up: {e}");
    }
}
