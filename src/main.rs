use anyhow::Result;
use longtrack_rs::{logging, run, Config};

fn main() -> Result<()> {
    let cfg = Config::new()?;
    logging::init_logging(&cfg.logging);
    run(cfg)
}
