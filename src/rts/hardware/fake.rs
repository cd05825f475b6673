//! Reproducible stand-in for the ALSA runtime in tests

use super::{peak_level, Percent, SoundSystem};
use crate::error::{Error, Result};
use crate::model::Stream;
use crate::settings::Config;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// This card refuses to be opened, as if jack was holding it
pub const BUSY_CARD: &str = "FakeCard2";

/// What every fake recording contains
pub const RECORDED: [i16; 6] = [1, 1, 0, -1, -1, -1];

#[derive(Debug, Default)]
pub struct FakeState {
    pub cards: Vec<String>,
    pub volumes: HashMap<String, Percent>,
    pub mutes: HashMap<String, bool>,
    pub jack: bool,
    /// Pretend the softvol plugins were never opened
    pub hide_mixers: bool,
    /// How often play_silence/record_to_nowhere were called
    pub wakeups: usize,
    /// Number of writes to any mixer volume
    pub volume_writes: usize,
    /// Make listing the cards fail
    pub fail_cards: bool,
}

/// Two cards, softvol mixers exist whenever the config enables them
pub struct FakeSoundSystem {
    config: Arc<Config>,
    state: Mutex<FakeState>,
}

impl FakeSoundSystem {
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            config,
            state: Mutex::new(FakeState {
                cards: vec!["FakeCard1".to_owned(), BUSY_CARD.to_owned()],
                jack: true,
                ..Default::default()
            }),
        }
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    fn check_mixer(&self, mixer: &str) -> Result<()> {
        match self.mixers("default")?.iter().any(|m| m == mixer) {
            true => Ok(()),
            false => Err(Error::MixerNotFound(mixer.to_owned())),
        }
    }

    fn check_pcm(&self, stream: Stream) -> Result<()> {
        if self.config.pcm(stream).contains(BUSY_CARD) {
            return Err(std::io::Error::from_raw_os_error(libc::EBUSY).into());
        }
        Ok(())
    }
}

impl SoundSystem for FakeSoundSystem {
    fn cards(&self) -> Result<Vec<String>> {
        let state = self.state();
        if state.fail_cards {
            return Err(std::io::Error::from_raw_os_error(libc::EIO).into());
        }
        Ok(state.cards.clone())
    }

    fn mixers(&self, _device: &str) -> Result<Vec<String>> {
        let mut mixers = Vec::new();
        if self.state().hide_mixers {
            return Ok(mixers);
        }
        for stream in Stream::ALL.iter() {
            if self.config.use_softvol(*stream) {
                mixers.push(stream.volume_mixer().to_owned());
                mixers.push(stream.mute_mixer().to_owned());
            }
        }
        Ok(mixers)
    }

    fn volume(&self, _device: &str, mixer: &str) -> Result<Percent> {
        self.check_mixer(mixer)?;
        Ok(*self.state().volumes.get(mixer).unwrap_or(&50))
    }

    fn set_volume(&self, _device: &str, mixer: &str, volume: Percent) -> Result<()> {
        self.check_mixer(mixer)?;
        let mut state = self.state();
        state.volume_writes += 1;
        state.volumes.insert(mixer.to_owned(), volume);
        Ok(())
    }

    fn mute(&self, _device: &str, mixer: &str) -> Result<bool> {
        self.check_mixer(mixer)?;
        Ok(*self.state().mutes.get(mixer).unwrap_or(&false))
    }

    fn set_mute(&self, _device: &str, mixer: &str, mute: bool) -> Result<()> {
        self.check_mixer(mixer)?;
        self.state().mutes.insert(mixer.to_owned(), mute);
        Ok(())
    }

    fn play_silence(&self) -> Result<()> {
        self.state().wakeups += 1;
        self.check_pcm(Stream::Output)
    }

    fn record_to_nowhere(&self) -> Result<()> {
        self.state().wakeups += 1;
        self.check_pcm(Stream::Input)
    }

    fn capture_level(&self, device: &str) -> Result<Option<f64>> {
        if device.contains(BUSY_CARD) {
            return Err(std::io::Error::from_raw_os_error(libc::EBUSY).into());
        }
        Ok(peak_level(&RECORDED))
    }

    fn max_playback_channels(&self, _device: &str) -> Result<u32> {
        Ok(2)
    }

    fn jack_running(&self) -> bool {
        self.state().jack
    }
}
