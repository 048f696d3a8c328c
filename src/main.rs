use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Log to stderr so stdout carries only command output. RUST_LOG wins over the flags.
fn init_tracing(quiet: bool, verbose: bool) {
    let default_level = if verbose {
        "info"
    } else if quiet {
        "error"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}

fn main() {
    use clap::Parser;
    use std::error::Error;
    let args = mangafeed::cli::Args::parse();
    init_tracing(args.quiet, args.verbose);
    if let Err(e) = mangafeed::cli::run(&args) {
        eprintln!("{}", e);
        if args.verbose {
            let mut source = e.source();
            while let Some(s) = source {
                eprintln!("  cause: {}", s);
                source = s.source();
            }
        }
        std::process::exit(e.exit_code());
    }
}
