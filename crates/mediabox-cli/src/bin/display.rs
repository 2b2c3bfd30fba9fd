use std::process::ExitCode;

use mediabox_cli::process;
use mediabox_hal::ConsoleDisplay;
use mediabox_runtime::DisplayArbiter;

fn main() -> ExitCode {
    process::run("mediabox-display", |config, shutdown| async move {
        let bus = process::connect(&config).await?;
        DisplayArbiter::new(bus, ConsoleDisplay::new())
            .with_cooldown(config.display_cooldown())
            .run(shutdown)
            .await
    })
}
