mod asoundrc;
mod cards;
mod cards_tracker;
mod cli;
mod error;
mod level;
mod log;
mod mixer;
mod model;
mod rts;
mod services;
mod settings;

use clap::Parser;
use model::Stream;
use rts::hardware::{AlsaSystem, SoundSystem};
use settings::Config;
use std::sync::Arc;

fn main() {
    let cli = cli::Cli::parse();
    log::init(cli.debug);

    let cfg = match Config::load_default() {
        Ok(cfg) => cfg,
        Err(e) => log::oops(format!("Could not open the config: {}", e), 1),
    };
    let sys: Arc<dyn SoundSystem> = Arc::new(AlsaSystem);

    if let Err(e) = cli::run(cli, sys, Arc::clone(&cfg)) {
        let msg = e.to_string();
        match error::advice(&msg, Some(&cfg.pcm(Stream::Output))) {
            Some(advice) => log::oops(format!("{}\n{}", msg, advice), 1),
            None => log::oops(msg, 1),
        }
    }
}
