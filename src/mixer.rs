//! Volume and mute control through the softvol plugins of the asoundrc

use crate::cards::control_device;
use crate::error::{Error, Result};
use crate::model::Stream;
use crate::rts::hardware::{Percent, SoundSystem};
use crate::settings::Config;
use tracing::{debug, error};

/// For a mixer volume of 0.5, figure out the perceived volume
pub fn to_perceived_volume(volume: f64) -> f64 {
    volume.powi(2).max(0.0).min(1.0)
}

/// For a perceived volume of 0.5, figure out the mixers volume
pub fn to_mixer_volume(volume: f64) -> f64 {
    volume.max(0.0).sqrt().min(1.0)
}

/// Talks to the softvol controls of whatever cards the config selects
pub struct MixerController<'a> {
    sys: &'a dyn SoundSystem,
    cfg: &'a Config,
}

impl<'a> MixerController<'a> {
    pub fn new(sys: &'a dyn SoundSystem, cfg: &'a Config) -> Self {
        Self { sys, cfg }
    }

    fn has_mixer(&self, device: &str, name: &str) -> bool {
        match self.sys.mixers(device) {
            Ok(mixers) => mixers.iter().any(|m| m == name),
            Err(e) => {
                debug!("could not open mixer of {}: {}", device, e);
                false
            }
        }
    }

    /// Locate a mixer control by name, logging if it is missing
    fn locate(&self, stream: Stream, name: &str) -> Option<String> {
        let device = control_device(self.cfg, stream);
        if self.has_mixer(&device, name) {
            Some(device)
        } else {
            error!("Could not find mixer {}", name);
            None
        }
    }

    /// Change the volume, `volume` being between 0 and 1
    ///
    /// With `nonlinear` the value is taken as perceived volume.
    pub fn set_volume(&self, stream: Stream, volume: f64, nonlinear: bool) -> Result<()> {
        let name = stream.volume_mixer();
        let device = match self.locate(stream, name) {
            Some(d) => d,
            None => return Ok(()),
        };

        let volume = if nonlinear {
            to_mixer_volume(volume)
        } else {
            volume
        };
        let percent = (volume * 100.0).round().max(0.0).min(100.0) as Percent;

        if self.sys.volume(&device, name)? == percent {
            return Ok(());
        }

        debug!("Setting {} to {}%", name, percent);
        self.sys.set_volume(&device, name, percent)
    }

    /// Get the current volume between 0 and 1
    pub fn get_volume(&self, stream: Stream, nonlinear: bool) -> Result<f64> {
        let name = stream.volume_mixer();
        let device = self
            .locate(stream, name)
            .ok_or_else(|| Error::MixerNotFound(name.to_owned()))?;

        let volume = f64::from(self.sys.volume(&device, name)?) / 100.0;
        if nonlinear {
            Ok(to_perceived_volume(volume))
        } else {
            Ok(volume)
        }
    }

    /// Mute or unmute, returns the new mute state
    ///
    /// `None` if the mixer doesn't exist or can't be written.
    pub fn toggle_mute(&self, stream: Stream) -> Option<bool> {
        let name = stream.mute_mixer();
        let device = self.locate(stream, name)?;

        let muted = !self.sys.mute(&device, name).ok()?;
        match self.sys.set_mute(&device, name, muted) {
            Ok(()) => Some(muted),
            Err(e) => {
                error!("Could not toggle {}: {}", name, e);
                None
            }
        }
    }

    /// Switch the mute control, fails with `MixerNotFound` if it isn't there
    pub fn set_mute(&self, stream: Stream, mute: bool) -> Result<()> {
        let name = stream.mute_mixer();
        let device = self
            .locate(stream, name)
            .ok_or_else(|| Error::MixerNotFound(name.to_owned()))?;
        self.sys.set_mute(&device, name, mute)
    }

    /// Figure out if a stream is muted, `false` if there is no mixer
    pub fn is_muted(&self, stream: Stream) -> bool {
        let name = stream.mute_mixer();
        self.locate(stream, name)
            .and_then(|device| self.sys.mute(&device, name).ok())
            .unwrap_or(false)
    }
}

/// Return an icon name for use in desktop notifications
pub fn volume_icon(volume: f64, muted: bool) -> &'static str {
    if muted || volume <= 0.0 {
        "audio-volume-muted"
    } else if volume < 0.5 {
        "audio-volume-low"
    } else if volume < 1.0 {
        "audio-volume-medium"
    } else {
        "audio-volume-high"
    }
}

/// Return a string representing the current state
pub fn volume_string(volume: f64, muted: bool) -> String {
    if muted {
        "muted".to_owned()
    } else {
        format!("{}%", (volume * 100.0).round())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rts::hardware::fake::FakeSoundSystem;
    use crate::settings::OUTPUT_USE_SOFTVOL;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn setup() -> (TempDir, Arc<Config>, FakeSoundSystem) {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::open(dir.path().join("config")).unwrap();
        let sys = FakeSoundSystem::new(cfg.clone());
        (dir, cfg, sys)
    }

    #[test]
    fn perceived_volume_is_inverse_of_mixer_volume() {
        for v in [0.0, 0.1, 0.25, 0.5, 0.9, 1.0].iter() {
            let back = to_perceived_volume(to_mixer_volume(*v));
            assert!((back - v).abs() < 1e-9);
        }
        assert_eq!(to_mixer_volume(2.0), 1.0);
        assert_eq!(to_mixer_volume(-1.0), 0.0);
        assert_eq!(to_perceived_volume(0.5), 0.25);
    }

    #[test]
    fn set_and_get_volume() {
        let (_dir, cfg, sys) = setup();
        let mixer = MixerController::new(&sys, &cfg);

        mixer.set_volume(Stream::Output, 0.3, false).unwrap();
        assert_eq!(mixer.get_volume(Stream::Output, false).unwrap(), 0.3);

        mixer.set_volume(Stream::Output, 0.25, true).unwrap();
        assert_eq!(mixer.get_volume(Stream::Output, false).unwrap(), 0.5);
        assert_eq!(mixer.get_volume(Stream::Output, true).unwrap(), 0.25);

        // out of range values end up clamped
        mixer.set_volume(Stream::Input, 3.0, false).unwrap();
        assert_eq!(mixer.get_volume(Stream::Input, false).unwrap(), 1.0);
    }

    #[test]
    fn unchanged_volume_is_not_written() {
        let (_dir, cfg, sys) = setup();
        let mixer = MixerController::new(&sys, &cfg);

        mixer.set_volume(Stream::Output, 0.5, false).unwrap();
        assert_eq!(sys.state().volume_writes, 0);
        mixer.set_volume(Stream::Output, 0.6, false).unwrap();
        assert_eq!(sys.state().volume_writes, 1);
    }

    #[test]
    fn missing_mixer() {
        let (_dir, cfg, sys) = setup();
        cfg.set(OUTPUT_USE_SOFTVOL, false).unwrap();
        let mixer = MixerController::new(&sys, &cfg);

        assert!(mixer.set_volume(Stream::Output, 0.5, false).is_ok());
        assert!(matches!(
            mixer.get_volume(Stream::Output, false),
            Err(Error::MixerNotFound(_))
        ));
        assert_eq!(mixer.toggle_mute(Stream::Output), None);
        assert!(matches!(
            mixer.set_mute(Stream::Output, true),
            Err(Error::MixerNotFound(_))
        ));
        assert!(!mixer.is_muted(Stream::Output));
    }

    #[test]
    fn toggling_mute_twice_restores_state() {
        let (_dir, cfg, sys) = setup();
        let mixer = MixerController::new(&sys, &cfg);

        let before = mixer.is_muted(Stream::Output);
        assert_eq!(mixer.toggle_mute(Stream::Output), Some(!before));
        assert_eq!(mixer.is_muted(Stream::Output), !before);
        assert_eq!(mixer.toggle_mute(Stream::Output), Some(before));
        assert_eq!(mixer.is_muted(Stream::Output), before);
    }

    #[test]
    fn set_mute_on_input_leaves_output_alone() {
        let (_dir, cfg, sys) = setup();
        let mixer = MixerController::new(&sys, &cfg);

        mixer.set_mute(Stream::Input, true).unwrap();
        assert!(mixer.is_muted(Stream::Input));
        assert!(!mixer.is_muted(Stream::Output));
    }

    #[test]
    fn icons() {
        assert_eq!(volume_icon(0.7, true), "audio-volume-muted");
        assert_eq!(volume_icon(0.0, false), "audio-volume-muted");
        assert_eq!(volume_icon(0.2, false), "audio-volume-low");
        assert_eq!(volume_icon(0.5, false), "audio-volume-medium");
        assert_eq!(volume_icon(1.0, false), "audio-volume-high");
    }

    #[test]
    fn strings() {
        assert_eq!(volume_string(0.426, false), "43%");
        assert_eq!(volume_string(0.426, true), "muted");
    }
}
