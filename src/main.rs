use anyhow::Context;
use tracing_subscriber::EnvFilter;

use dispersal::config::USAGE;
use dispersal::{window, Config, Invocation, Sequencer, TargetImage};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match Config::from_args(std::env::args().skip(1))? {
        Invocation::Run(config) => config,
        Invocation::Help => {
            print!("{USAGE}");
            return Ok(());
        }
    };
    let settings = config.normalize();
    settings.log();

    let target = TargetImage::open(&settings.image)
        .with_context(|| format!("failed to load target image '{}'", settings.image.display()))?;
    tracing::info!(width = target.width(), height = target.height(), "target image loaded");

    let mut sequencer = Sequencer::new(&settings, target).context("failed to set up the sequence")?;
    let sequencer = if settings.headless {
        sequencer.run_headless()?;
        sequencer
    } else {
        window::run(sequencer)?
    };

    let status = sequencer.finish()?;
    tracing::info!(%status, "done");
    Ok(())
}
