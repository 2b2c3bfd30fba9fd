//! Process bootstrap shared by every binary.
//!
//! Each binary hands [`run`] its service name and an async body.  `run`
//! installs logging, loads the configuration, wires Ctrl-C / SIGTERM to a
//! [`Shutdown`] signal, and maps the outcome onto the exit code: `0` after
//! a graceful shutdown, `1` after a fatal error (logged first).

use std::future::Future;
use std::process::ExitCode;
use std::sync::Arc;

use mediabox_middleware::{BrokerClient, MessageBus, Shutdown};
use mediabox_runtime::init_tracing;
use mediabox_types::MediaError;
use tracing::{error, info, warn};

use crate::config::{self, Config};

/// Run one mediabox process to completion.
pub fn run<F, Fut>(service: &str, body: F) -> ExitCode
where
    F: FnOnce(Config, Shutdown) -> Fut,
    Fut: Future<Output = Result<(), MediaError>>,
{
    let _guard = init_tracing(service);

    let config = match config::load().map_err(MediaError::Config) {
        Ok(config) => config,
        Err(e) => {
            error!(service, error = %e, "startup failed");
            return ExitCode::FAILURE;
        }
    };
    info!(service, config = ?config, "starting");

    let shutdown = Shutdown::new();
    let on_signal = shutdown.clone();
    if let Err(e) = ctrlc::set_handler(move || on_signal.trigger()) {
        warn!(error = %e, "failed to install signal handler; shutdown on Ctrl-C will not be graceful");
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(service, error = %e, "failed to start async runtime");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(body(config, shutdown)) {
        Ok(()) => {
            info!(service, "stopped");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(service, error = %e, "fatal error");
            ExitCode::FAILURE
        }
    }
}

/// Connect to the broker named in `config`.
///
/// # Errors
///
/// Returns [`MediaError::Transport`] when the broker is unreachable.
pub async fn connect(config: &Config) -> Result<Arc<dyn MessageBus>, MediaError> {
    let client = BrokerClient::connect(&config.broker_addr).await?;
    info!(url = client.url(), "connected to broker");
    Ok(Arc::new(client))
}
