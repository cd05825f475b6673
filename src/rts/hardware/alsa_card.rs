use super::{peak_level, Percent, SoundSystem};
use crate::error::{Error, Result};
use crate::model::Stream;
use crate::services;
use alsa::card::Iter as CardIter;
use alsa::ctl::Ctl;
use alsa::mixer::{Mixer, Selem, SelemChannelId, SelemId};
use alsa::pcm::{Access, Format, HwParams, PCM};
use alsa::ValueOr;
use tracing::{debug, warn};

/// Frames written/read to make the softvol plugins register their controls
const WAKEUP_FRAMES: usize = 32;
const WAKEUP_RATE: u32 = 44100;
/// Frames looked at for one input level reading
const LEVEL_FRAMES: usize = 1024;

/// The real thing, talking to alsa-lib
#[derive(Clone, Copy, Debug, Default)]
pub struct AlsaSystem;

impl AlsaSystem {
    fn card_id(index: i32) -> Result<String> {
        let ctl = Ctl::new(&format!("hw:{}", index), false)?;
        let info = ctl.card_info()?;
        Ok(info.get_id()?.to_owned())
    }

    fn open_selem<'m>(mixer: &'m Mixer, name: &str) -> Result<Selem<'m>> {
        mixer
            .find_selem(&SelemId::new(name, 0))
            .ok_or_else(|| Error::MixerNotFound(name.to_owned()))
    }

    /// softvol controls without a direction suffix are reported as
    /// "global", which alsa-lib answers for both playback and capture
    fn is_playback(selem: &Selem) -> bool {
        selem.has_playback_volume() || selem.has_playback_switch() || !selem.has_capture_volume()
    }

    fn to_percent(value: i64, (min, max): (i64, i64)) -> Percent {
        if max <= min {
            return 0;
        }
        let scaled = (value - min) as f64 * 100.0 / (max - min) as f64;
        scaled.round().max(0.0).min(100.0) as Percent
    }

    fn from_percent(volume: Percent, (min, max): (i64, i64)) -> i64 {
        min + ((max - min) as f64 * f64::from(volume.min(100)) / 100.0).round() as i64
    }

    /// Open a pcm with parameters any plugin accepts, returns it
    /// together with the number of channels it got
    fn open(device: &str, stream: Stream) -> Result<(PCM, usize)> {
        let pcm = PCM::new(device, stream.direction(), false)?;
        let channels = {
            let hwp = HwParams::any(&pcm)?;
            hwp.set_access(Access::RWInterleaved)?;
            hwp.set_format(Format::S16LE)?;
            let channels = hwp.set_channels_near(1)?;
            hwp.set_rate_near(WAKEUP_RATE, ValueOr::Nearest)?;
            pcm.hw_params(&hwp)?;
            channels.max(1) as usize
        };
        Ok((pcm, channels))
    }
}

impl SoundSystem for AlsaSystem {
    fn cards(&self) -> Result<Vec<String>> {
        let mut cards = Vec::new();
        for card in CardIter::new() {
            let card = card?;
            match Self::card_id(card.get_index()) {
                Ok(id) => cards.push(id),
                Err(e) => warn!("Card {}: could not read its id: {}", card.get_index(), e),
            }
        }
        Ok(cards)
    }

    fn mixers(&self, device: &str) -> Result<Vec<String>> {
        let mixer = Mixer::new(device, false)?;
        let names = mixer
            .iter()
            .filter_map(Selem::new)
            .filter_map(|s| s.get_id().get_name().ok().map(str::to_owned))
            .collect();
        Ok(names)
    }

    fn volume(&self, device: &str, mixer: &str) -> Result<Percent> {
        let m = Mixer::new(device, false)?;
        let selem = Self::open_selem(&m, mixer)?;
        let volume = if Self::is_playback(&selem) {
            let raw = selem.get_playback_volume(SelemChannelId::FrontLeft)?;
            Self::to_percent(raw, selem.get_playback_volume_range())
        } else {
            let raw = selem.get_capture_volume(SelemChannelId::FrontLeft)?;
            Self::to_percent(raw, selem.get_capture_volume_range())
        };
        Ok(volume)
    }

    fn set_volume(&self, device: &str, mixer: &str, volume: Percent) -> Result<()> {
        let m = Mixer::new(device, false)?;
        let selem = Self::open_selem(&m, mixer)?;
        if Self::is_playback(&selem) {
            let raw = Self::from_percent(volume, selem.get_playback_volume_range());
            selem.set_playback_volume_all(raw)?;
        } else {
            let raw = Self::from_percent(volume, selem.get_capture_volume_range());
            for channel in SelemChannelId::all() {
                if selem.has_capture_channel(*channel) {
                    selem.set_capture_volume(*channel, raw)?;
                }
            }
        }
        Ok(())
    }

    fn mute(&self, device: &str, mixer: &str) -> Result<bool> {
        let m = Mixer::new(device, false)?;
        let selem = Self::open_selem(&m, mixer)?;
        let value = if Self::is_playback(&selem) {
            selem.get_playback_switch(SelemChannelId::FrontLeft)?
        } else {
            selem.get_capture_switch(SelemChannelId::FrontLeft)?
        };
        Ok(value == 0)
    }

    fn set_mute(&self, device: &str, mixer: &str, mute: bool) -> Result<()> {
        let m = Mixer::new(device, false)?;
        let selem = Self::open_selem(&m, mixer)?;
        let value = if mute { 0 } else { 1 };
        if Self::is_playback(&selem) {
            selem.set_playback_switch_all(value)?;
        } else {
            selem.set_capture_switch_all(value)?;
        }
        Ok(())
    }

    fn play_silence(&self) -> Result<()> {
        debug!("Trying to play sound to make the output mixers visible");
        let (pcm, channels) = Self::open("default", Stream::Output)?;
        let io = pcm.io_i16()?;
        io.writei(&vec![0i16; WAKEUP_FRAMES * channels])?;
        pcm.drain()?;
        Ok(())
    }

    fn record_to_nowhere(&self) -> Result<()> {
        debug!("Trying to capture sound to make the input mixers visible");
        let (pcm, channels) = Self::open("default", Stream::Input)?;
        let io = pcm.io_i16()?;
        let mut buf = vec![0i16; WAKEUP_FRAMES * channels];
        io.readi(&mut buf)?;
        Ok(())
    }

    fn capture_level(&self, device: &str) -> Result<Option<f64>> {
        let (pcm, channels) = Self::open(device, Stream::Input)?;
        let io = pcm.io_i16()?;
        let mut buf = vec![0i16; LEVEL_FRAMES * channels];
        let frames = io.readi(&mut buf)?;
        Ok(peak_level(&buf[..frames * channels]))
    }

    fn max_playback_channels(&self, device: &str) -> Result<u32> {
        let pcm = PCM::new(device, Stream::Output.direction(), false)?;
        let hwp = HwParams::any(&pcm)?;
        Ok(hwp.get_channels_max()?)
    }

    fn jack_running(&self) -> bool {
        services::is_jack_running()
    }
}
