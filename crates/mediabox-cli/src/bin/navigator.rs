use std::process::ExitCode;

use mediabox_cli::process;
use mediabox_kernel::NavigationEngine;
use mediabox_runtime::NavigationReactor;

fn main() -> ExitCode {
    process::run("mediabox-navigator", |config, shutdown| async move {
        let bus = process::connect(&config).await?;
        let engine = NavigationEngine::open(&config.media_root)?;
        NavigationReactor::new(bus, engine).run(shutdown).await
    })
}
