use super::Stream;
use serde::Serialize;

/// One selectable card, as listed by `alsacontrol cards`
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CardEntry {
    pub index: usize,
    pub id: String,
    /// Selected for capture
    pub input: bool,
    /// Selected for playback
    pub output: bool,
}

/// Snapshot of one stream for `alsacontrol status`
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StreamStatus {
    pub stream: Stream,
    pub pcm: String,
    pub card: Option<String>,
    pub available: bool,
    pub softvol: bool,
    /// Perceived volume between 0 and 1, if the mixer is visible
    pub volume: Option<f64>,
    pub muted: bool,
    pub icon: String,
    pub label: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Status {
    pub input: StreamStatus,
    pub output: StreamStatus,
    pub jack_running: bool,
    pub pulse_running: bool,
    pub daemon_running: bool,
}

/// Recording level of one input card for `alsacontrol level`
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CardLevel {
    pub card: String,
    pub device: String,
    /// Cleared once the card failed to record
    pub running: bool,
    /// Peak between 0 and 1 of the last reading
    pub level: Option<f64>,
}
