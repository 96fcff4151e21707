use std::process::ExitCode;
use std::sync::Arc;

use chatwire::{Cli, ClientError, Console, StdConsole};
use clap::Parser;
use tokio::io::BufReader;

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("error"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> ExitCode {
    init_tracing();
    let config = Cli::parse().into_config();
    let console = Arc::new(StdConsole);

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            console.local_error(&ClientError::Runtime(e).to_string());
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(async {
        let input = BufReader::new(tokio::io::stdin());
        let shutdown = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "cannot listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        };
        chatwire::run(&config, input, shutdown, console.clone()).await
    });

    // Stdin is read on a blocking thread that may still be parked in a
    // read; don't wait for it.
    runtime.shutdown_background();

    match result {
        Ok(ending) => ending.exit_code(),
        Err(e) => {
            tracing::debug!(error = ?e, "client failed");
            console.local_error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}
