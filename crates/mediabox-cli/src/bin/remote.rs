use std::process::ExitCode;

use mediabox_cli::process;
use mediabox_hal::EvdevInput;
use mediabox_runtime::RemoteControlDecoder;

fn main() -> ExitCode {
    process::run("mediabox-remote", |config, shutdown| async move {
        let bus = process::connect(&config).await?;
        let input = EvdevInput::open(&config.input_device)?;
        RemoteControlDecoder::new(bus, input)
            .with_poll_interval(config.input_poll())
            .run(shutdown)
            .await
    })
}
