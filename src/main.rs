use clap::Parser;
use logonmgr::cli::Cli;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "logonmgr=warn";

fn main() -> ExitCode {
    let cli = Cli::parse();
    let (settings, settings_warning) = cli.load_settings();

    // RUST_LOG wins, then -v, then the config file. Logs go to stderr so
    // command output on stdout stays usable in scripts.
    let fallback = if cli.verbose {
        "logonmgr=debug".to_string()
    } else {
        settings
            .log
            .filter
            .clone()
            .unwrap_or_else(|| DEFAULT_FILTER.to_string())
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Some(warning) = settings_warning {
        eprintln!("warning: cannot read config: {}", warning);
    }

    let status = cli.run(settings);
    ExitCode::from(u8::try_from(status).unwrap_or(1))
}
