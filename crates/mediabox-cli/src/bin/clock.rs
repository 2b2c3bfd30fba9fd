use std::process::ExitCode;

use mediabox_cli::process;
use mediabox_runtime::ClockPublisher;
use mediabox_types::MediaError;

fn main() -> ExitCode {
    process::run("mediabox-clock", |config, shutdown| async move {
        let bus = process::connect(&config).await?;
        ClockPublisher::new(bus).run(shutdown).await;
        Ok::<(), MediaError>(())
    })
}
