//! Shared value types passed between the query helpers and the front end

mod status;

pub use status::{CardEntry, CardLevel, Status, StreamStatus};

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Direction of an audio stream, as seen from the user
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stream {
    /// Capture, recording from a microphone
    Input,
    /// Playback, what goes to the speakers
    Output,
}

impl Stream {
    pub const ALL: [Stream; 2] = [Stream::Input, Stream::Output];

    pub fn name(self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Output => "output",
        }
    }

    /// Matching ALSA pcm direction
    pub fn direction(self) -> alsa::Direction {
        match self {
            Self::Input => alsa::Direction::Capture,
            Self::Output => alsa::Direction::Playback,
        }
    }

    /// Plugin that lets several clients share the device
    pub fn sharing_plugin(self) -> &'static str {
        match self {
            Self::Input => "dsnoop",
            Self::Output => "dmix",
        }
    }

    pub fn volume_mixer(self) -> &'static str {
        match self {
            Self::Input => "alsacontrol-input-volume",
            Self::Output => "alsacontrol-output-volume",
        }
    }

    pub fn mute_mixer(self) -> &'static str {
        match self {
            Self::Input => "alsacontrol-input-mute",
            Self::Output => "alsacontrol-output-mute",
        }
    }
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl FromStr for Stream {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "input" | "in" | "capture" => Ok(Self::Input),
            "output" | "out" | "playback" => Ok(Self::Output),
            other => Err(format!("unknown stream \"{}\"", other)),
        }
    }
}
