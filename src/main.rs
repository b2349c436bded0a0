use anyhow::{ensure, Context, Result};
use clap::Parser;

use icon_bgremove::{Config, IconProcessor};

mod logging;

fn main() -> Result<()> {
    let config = Config::parse();
    logging::init(config.verbose, config.json_logs);

    ensure!(
        config.model_path.exists(),
        "Model path does not exist: {}",
        config.model_path.display()
    );
    ensure!(
        config.icon_dir.is_dir(),
        "Icon directory does not exist: {}",
        config.icon_dir.display()
    );

    tracing::debug!(?config, "starting");

    let processor = IconProcessor::with_onnx_model(config).context("Failed to load model")?;
    let report = processor.run().context("Icon run aborted")?;

    for failure in &report.failed {
        tracing::debug!(path = %failure.path.display(), "{}", failure.message);
    }

    Ok(())
}
