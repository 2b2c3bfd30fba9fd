use std::process::ExitCode;

use mediabox_cli::process;
use mediabox_middleware::Broker;

fn main() -> ExitCode {
    process::run("mediabox-broker", |config, shutdown| async move {
        Broker::new().serve(&config.broker_addr, shutdown).await
    })
}
