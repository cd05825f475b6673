use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    Alsa(alsa::Error),
    DBus(dbus::Error),
    Json(serde_json::Error),
    /// A softvol mixer control is not visible (yet)
    MixerNotFound(String),
    /// The configured card is not attached
    CardNotFound(String),
    UnsupportedPcm(String),
    SpeakerTest(String),
    Config(String),
    Daemon(String),
}

impl Error {
    /// Whether the native layer refused because another process holds the device
    pub fn is_busy(&self) -> bool {
        match self {
            Self::Io(e) => e.raw_os_error() == Some(libc::EBUSY),
            other => other.to_string().contains("resource busy"),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io error: {}", e),
            Self::Alsa(e) => write!(f, "alsa error: {}", e),
            Self::DBus(e) => write!(f, "dbus error: {}", e),
            Self::Json(e) => write!(f, "json error: {}", e),
            Self::MixerNotFound(name) => write!(f, "could not find mixer {}", name),
            Self::CardNotFound(card) => write!(f, "could not find card \"{}\"", card),
            Self::UnsupportedPcm(pcm) => write!(f, "unsupported pcm \"{}\"", pcm),
            Self::SpeakerTest(msg) => write!(f, "speaker-test: {}", msg),
            Self::Config(msg) => write!(f, "config: {}", msg),
            Self::Daemon(msg) => write!(f, "daemon: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<alsa::Error> for Error {
    fn from(e: alsa::Error) -> Self {
        Self::Alsa(e)
    }
}

impl From<dbus::Error> for Error {
    fn from(e: dbus::Error) -> Self {
        Self::DBus(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

/// Some help for errors coming out of the native layer
pub fn advice(error: &str, pcm_output: Option<&str>) -> Option<String> {
    if error.contains("resource busy") {
        return Some(
            "You can try to run `lsof | grep /dev/snd/` to see which process is blocking it."
                .to_owned(),
        );
    }
    if error.contains("No such device") {
        return Some(format!(
            "The pcm device \"{}\" does not exist. Try to select something different.",
            pcm_output.unwrap_or("null")
        ));
    }
    None
}
