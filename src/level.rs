//! Watch how loud each input card records

use crate::cards::{log_native_error, try_get_cards};
use crate::error::{Error, Result};
use crate::model::{CardLevel, Stream};
use crate::rts::hardware::SoundSystem;
use crate::settings::{Config, JACK_PCM};
use std::collections::BTreeMap;
use tracing::debug;

/// Width of the text meter
pub const BAR_WIDTH: usize = 30;

/// Capture device used to read a card's level, e.g. `dsnoop:CARD=PCH`
pub fn level_device(cfg: &Config, card: &str) -> String {
    format!("{}:CARD={}", cfg.plugin(Stream::Input), card)
}

/// Keeps one monitor per input card
///
/// A card that fails to record once is stopped for good, it is most
/// likely held by another program.
#[derive(Debug, Default)]
pub struct LevelMonitor {
    running: BTreeMap<String, bool>,
}

impl LevelMonitor {
    /// Monitor every hardware card, or only `card`
    pub fn new(sys: &dyn SoundSystem, card: Option<&str>) -> Result<Self> {
        let cards = try_get_cards(sys)?;
        let running: BTreeMap<String, bool> = cards
            .into_iter()
            .filter(|c| c != JACK_PCM)
            .filter(|c| card.map_or(true, |wanted| wanted == c))
            .map(|c| (c, true))
            .collect();

        match card {
            Some(card) if running.is_empty() => Err(Error::CardNotFound(card.to_owned())),
            _ => Ok(Self { running }),
        }
    }

    pub fn is_running(&self, card: &str) -> bool {
        self.running.get(card).copied().unwrap_or(false)
    }

    /// Read one level from every running card
    pub fn poll(&mut self, sys: &dyn SoundSystem, cfg: &Config) -> Vec<CardLevel> {
        let mut levels = Vec::with_capacity(self.running.len());
        for (card, running) in self.running.iter_mut() {
            let device = level_device(cfg, card);
            let mut level = None;
            if *running {
                match sys.capture_level(&device) {
                    Ok(value) => level = value,
                    Err(e) => {
                        debug!("Stopping the level monitor of {}", card);
                        log_native_error(cfg, Stream::Input, &e);
                        *running = false;
                    }
                }
            }
            levels.push(CardLevel {
                card: card.clone(),
                device,
                running: *running,
                level,
            });
        }
        levels
    }
}

/// `[#####     ]  12%` style meter
pub fn level_bar(level: Option<f64>, width: usize) -> String {
    let level = match level {
        Some(level) => level.max(0.0).min(1.0),
        None => return format!("[{}]    -", " ".repeat(width)),
    };
    let filled = (level * width as f64).round() as usize;
    format!(
        "[{}{}] {:>3}%",
        "#".repeat(filled),
        " ".repeat(width - filled),
        (level * 100.0).round() as u32
    )
}

pub fn describe_level(level: &CardLevel) -> String {
    let meter = if level.running {
        level_bar(level.level, BAR_WIDTH)
    } else {
        "stopped".to_owned()
    };
    format!("{:<16} {}", level.card, meter)
}
