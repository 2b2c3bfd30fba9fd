use std::process::ExitCode;
use std::sync::Arc;

use mediabox_cli::process;
use mediabox_hal::{SimAudio, SimTagReader};
use mediabox_runtime::PlaybackReactor;

fn main() -> ExitCode {
    process::run("mediabox-player", |config, shutdown| async move {
        let bus = process::connect(&config).await?;
        let audio = Arc::new(SimAudio::new(config.sim_track_length()));
        PlaybackReactor::new(bus, audio, Arc::new(SimTagReader::new()))
            .run(shutdown)
            .await
    })
}
