use std::path::Path;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Environment variable holding an `EnvFilter` directive; overrides -v/-q
pub const ENV_LOG: &str = "NOVA_LOG";

/// Filter used when `NOVA_LOG` is unset
pub fn default_directive(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "off";
    }
    match verbose {
        0 => "nova=error",
        1 => "nova=info",
        2 => "nova=debug",
        _ => "nova=trace",
    }
}

fn filter(fallback: &str) -> EnvFilter {
    EnvFilter::try_from_env(ENV_LOG).unwrap_or_else(|_| EnvFilter::new(fallback))
}

/// Log to stderr for one-shot commands
pub fn init_stderr(verbose: u8, quiet: bool) {
    let _ = tracing_subscriber::registry()
        .with(filter(default_directive(verbose, quiet)))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init();
}

/// Log to a file so the terminal UI is not drawn over. Falls back to no
/// logging when the file cannot be opened.
pub fn init_file(path: &Path, verbose: u8, quiet: bool) {
    let file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
    {
        Ok(f) => f,
        Err(_) => return,
    };
    let fallback = if verbose == 0 && !quiet {
        "nova=info"
    } else {
        default_directive(verbose, quiet)
    };
    let _ = tracing_subscriber::registry()
        .with(filter(fallback))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::sync::Mutex::new(file))
                .with_ansi(false),
        )
        .try_init();
}
