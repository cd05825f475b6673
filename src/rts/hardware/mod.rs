use crate::error::Result;

mod alsa_card;
#[cfg(test)]
pub mod fake;

pub use alsa_card::AlsaSystem;

/// Mixer volume in percent, 0 to 100
pub type Percent = u8;

/// Everything the rest of the crate needs from the native sound system
///
/// `device` arguments are ctl names such as `default` or `hw:CARD=PCH`.
pub trait SoundSystem: Send + Sync {
    /// Ids of all attached cards, e.g. `PCH` or `Generic`
    fn cards(&self) -> Result<Vec<String>>;

    /// Names of the simple mixer controls on a device
    fn mixers(&self, device: &str) -> Result<Vec<String>>;

    fn volume(&self, device: &str, mixer: &str) -> Result<Percent>;

    fn set_volume(&self, device: &str, mixer: &str, volume: Percent) -> Result<()>;

    /// `true` if the control is switched off
    fn mute(&self, device: &str, mixer: &str) -> Result<bool>;

    fn set_mute(&self, device: &str, mixer: &str, mute: bool) -> Result<()>;

    /// softvol controls only show up once the pcm was opened, so play
    /// a few silent frames through the default device
    fn play_silence(&self) -> Result<()>;

    /// Same as [`play_silence`](SoundSystem::play_silence) for capture
    fn record_to_nowhere(&self) -> Result<()>;

    /// Peak of a short recording from `device`, 0.0 to 1.0
    ///
    /// `None` if nothing could be read.
    fn capture_level(&self, device: &str) -> Result<Option<f64>>;

    fn max_playback_channels(&self, device: &str) -> Result<u32>;

    fn jack_running(&self) -> bool;
}

/// Loudest sample relative to full scale, `None` for an empty buffer
pub fn peak_level(samples: &[i16]) -> Option<f64> {
    samples
        .iter()
        .map(|s| i32::from(*s).abs())
        .max()
        .map(|peak| f64::from(peak) / 32768.0)
}

#[derive(Clone, Debug, PartialEq)]
pub enum HardwareEvent {
    /// Cards were plugged in or removed since the last poll
    CardsChanged {
        added: Vec<String>,
        removed: Vec<String>,
    },
    /// The watcher has stopped
    Shutdown,
}
