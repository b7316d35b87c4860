//! docshelf entry point.
//!
//! Logging goes to stderr so command output on stdout stays machine-readable.

use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    if let Err(error) = docshelf_cli::run(std::env::args_os()).await {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}
