//! Utilities to find, test and select cards

use crate::error::{self, Result};
use crate::model::Stream;
use crate::rts::hardware::SoundSystem;
use crate::settings::{pcm_key, Config, JACK_PCM, NULL_PCM};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{error, info, warn};

static CARD_RE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^[\w-]+:CARD=([\w-]+)(?:,DEV=\d+)?$").ok());

/// Pull the card out of a pcm string written as `<plugin>:CARD=<card>[,DEV=<n>]`
pub fn hardware_card(pcm: &str) -> Option<String> {
    CARD_RE
        .as_ref()?
        .captures(pcm)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_owned())
}

/// Split the card from a pcm string
///
/// `Generic` from `iec958:CARD=Generic,DEV=0` or `sysdefault:CARD=Generic`,
/// `jack` from `jack`, nothing from `null`.
pub fn get_card(pcm: &str) -> Option<String> {
    if pcm == NULL_PCM || pcm.is_empty() {
        return None;
    }
    if pcm == JACK_PCM {
        return Some(pcm.to_owned());
    }
    if let Some(card) = hardware_card(pcm) {
        return Some(card);
    }
    warn!(
        "Encountered unsupported non-hw pcm \"{}\". Did you mean to set the config to \"hw:CARD={}\"?",
        pcm, pcm
    );
    Some(pcm.to_owned())
}

/// Refuse pcm strings the asoundrc can't be generated for
pub fn validate_pcm(pcm: &str) -> Result<()> {
    if pcm == NULL_PCM || pcm == JACK_PCM || hardware_card(pcm).is_some() {
        Ok(())
    } else {
        Err(error::Error::UnsupportedPcm(pcm.to_owned()))
    }
}

/// List all cards, including jack if its server is up
pub fn try_get_cards(sys: &dyn SoundSystem) -> Result<Vec<String>> {
    let mut cards = sys.cards()?;
    if sys.jack_running() {
        cards.push(JACK_PCM.to_owned());
    }
    Ok(cards)
}

/// Same as [`try_get_cards`], an error counts as no cards
pub fn get_cards(sys: &dyn SoundSystem) -> Vec<String> {
    let cards = try_get_cards(sys).unwrap_or_else(|e| {
        error!("Could not list cards: {}", e);
        Vec::new()
    });
    if cards.is_empty() {
        error!("Could not find any card");
    }
    cards
}

/// Check if the card of a pcm is attached
pub fn card_exists(sys: &dyn SoundSystem, pcm: &str) -> bool {
    match get_card(pcm) {
        Some(card) => get_cards(sys).contains(&card),
        None => false,
    }
}

/// The ctl device that carries the softvol controls of a stream
pub fn control_device(cfg: &Config, stream: Stream) -> String {
    match hardware_card(&cfg.pcm(stream)) {
        Some(card) => format!("hw:CARD={}", card),
        None => "default".to_owned(),
    }
}

/// Check if the configured card and its softvol mixer are available
///
/// `context` names the caller for the log.  If the card is there but
/// the mixer isn't, the pcm gets opened once so that it shows up on
/// the next call.
pub fn stream_exists(
    sys: &dyn SoundSystem,
    cfg: &Config,
    stream: Stream,
    context: &str,
    test_card: bool,
    test_mixer: bool,
) -> bool {
    let pcm = cfg.pcm(stream);
    let card = get_card(&pcm);

    if test_card {
        match &card {
            None => {
                error!("{}, no {} card selected", context, stream);
                return false;
            }
            Some(card) if !get_cards(sys).contains(card) => {
                error!("{}, Could not find the {} card \"{}\"", context, stream, card);
                return false;
            }
            Some(_) => {}
        }
    }

    if test_mixer && cfg.use_softvol(stream) {
        let device = control_device(cfg, stream);
        let found = sys
            .mixers(&device)
            .map(|mixers| mixers.iter().any(|m| m == stream.volume_mixer()))
            .unwrap_or(false);
        if !found {
            error!("{}, Could not find the {} softvol mixer", context, stream);
            wake_mixers(sys, cfg, stream);
            return false;
        }
    }

    true
}

pub fn input_exists(sys: &dyn SoundSystem, cfg: &Config, context: &str) -> bool {
    stream_exists(sys, cfg, Stream::Input, context, true, true)
}

pub fn output_exists(sys: &dyn SoundSystem, cfg: &Config, context: &str) -> bool {
    stream_exists(sys, cfg, Stream::Output, context, true, true)
}

/// Open the default pcm briefly so alsa registers the softvol controls
pub fn wake_mixers(sys: &dyn SoundSystem, cfg: &Config, stream: Stream) {
    let result = match stream {
        Stream::Input => sys.record_to_nowhere(),
        Stream::Output => sys.play_silence(),
    };
    if let Err(e) = result {
        log_native_error(cfg, stream, &e);
    }
}

/// Log a native error together with whatever advice we have
pub fn log_native_error(cfg: &Config, stream: Stream, e: &error::Error) {
    error!("{}", e);
    if e.is_busy() {
        error!(
            "Your specified {} is currently busy, are jack or pulse using it?",
            stream
        );
    }
    if let Some(advice) = error::advice(&e.to_string(), Some(&cfg.pcm(Stream::Output))) {
        error!("{}", advice);
    }
    error!(
        "Could not initialize {} mixer, try setting a different device.",
        stream
    );
}

/// Return the configured input and output pcm string
pub fn get_pcms(cfg: &Config) -> (String, String) {
    let pcm_input = cfg.pcm(Stream::Input);
    let pcm_output = cfg.pcm(Stream::Output);
    if pcm_input == NULL_PCM {
        warn!("No input specified");
    } else {
        info!("Using input {}", pcm_input);
    }
    if pcm_output == NULL_PCM {
        warn!("No output specified");
    } else {
        info!("Using output {}", pcm_output);
    }
    (pcm_input, pcm_output)
}

/// Locate the configured card of a stream in [`get_cards`]
///
/// Returns the index and the card, `(None, Some(card))` for a card that
/// isn't attached and `(None, None)` if nothing is selected.
pub fn get_current_card(
    sys: &dyn SoundSystem,
    cfg: &Config,
    stream: Stream,
) -> (Option<usize>, Option<String>) {
    let pcm = cfg.pcm(stream);
    let card = match get_card(&pcm) {
        Some(card) => card,
        None => {
            warn!("No {} selected", stream);
            return (None, None);
        }
    };

    let cards = get_cards(sys);
    if cards.is_empty() {
        return (None, None);
    }

    match cards.iter().position(|c| *c == card) {
        Some(index) => (Some(index), Some(card)),
        None => {
            warn!("Found unknown {} \"{}\" in config", pcm_key(stream), pcm);
            (None, Some(card))
        }
    }
}

/// Write the pcm of a card into the configuration
///
/// Hardware cards get prefixed with the configured plugin, e.g.
/// `hw:CARD=Generic`.  Anything else (jack) is stored as is, `None`
/// unselects the stream.
pub fn select_pcm(
    sys: &dyn SoundSystem,
    cfg: &Config,
    stream: Stream,
    card: Option<&str>,
) -> Result<bool> {
    let pcm = match card {
        None => NULL_PCM.to_owned(),
        Some(card) => {
            let hardware = sys.cards()?;
            if hardware.iter().any(|c| c == card) {
                format!("{}:CARD={}", cfg.plugin(stream), card)
            } else {
                card.to_owned()
            }
        }
    };
    cfg.set(pcm_key(stream), pcm)
}

/// Select a card, or unselect it if it already is the selected one
pub fn toggle_pcm(sys: &dyn SoundSystem, cfg: &Config, stream: Stream, card: &str) -> Result<bool> {
    if get_card(&cfg.pcm(stream)).as_deref() == Some(card) {
        select_pcm(sys, cfg, stream, None)
    } else {
        select_pcm(sys, cfg, stream, Some(card))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rts::hardware::fake::FakeSoundSystem;
    use crate::settings::{INPUT_PLUGIN, OUTPUT_PLUGIN, OUTPUT_USE_SOFTVOL};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn setup() -> (TempDir, Arc<Config>, FakeSoundSystem) {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::open(dir.path().join("config")).unwrap();
        let sys = FakeSoundSystem::new(cfg.clone());
        (dir, cfg, sys)
    }

    #[test]
    fn splits_card_from_pcm() {
        assert_eq!(get_card("iec958:CARD=Generic,DEV=0").as_deref(), Some("Generic"));
        assert_eq!(get_card("sysdefault:CARD=UR22C").as_deref(), Some("UR22C"));
        assert_eq!(get_card("jack").as_deref(), Some("jack"));
        assert_eq!(get_card("null"), None);
        assert_eq!(get_card("weird").as_deref(), Some("weird"));
    }

    #[test]
    fn only_known_pcm_shapes_are_valid() {
        assert!(validate_pcm("hw:CARD=Generic").is_ok());
        assert!(validate_pcm("plughw:CARD=UR22C,DEV=0").is_ok());
        assert!(validate_pcm("jack").is_ok());
        assert!(validate_pcm("null").is_ok());
        assert!(matches!(
            validate_pcm("Generic"),
            Err(error::Error::UnsupportedPcm(_))
        ));
        for pcm in [
            "hw:CARD=X\" } pcm.evil {",
            "hw:CARD=Two Words",
            "hw:CARD={X}",
            " hw:CARD=X",
            "hw:CARD=X,DEV=0,SUBDEV=1",
        ]
        .iter()
        {
            assert!(validate_pcm(pcm).is_err(), "{} was accepted", pcm);
        }
    }

    #[test]
    fn busy_card_is_reported_as_busy() {
        let (_dir, cfg, sys) = setup();
        select_pcm(&sys, &cfg, Stream::Output, Some("FakeCard2")).unwrap();
        sys.state().hide_mixers = true;

        assert!(!output_exists(&sys, &cfg, "busy_card_is_reported_as_busy"));
        assert_eq!(sys.state().wakeups, 1);

        let e = sys.play_silence().unwrap_err();
        assert!(e.is_busy());
        assert!(error::advice("Device or resource busy", None).is_some());
        // logging the native error must not trip over the busy variant
        log_native_error(&cfg, Stream::Output, &e);
    }

    #[test]
    fn failed_enumeration_is_an_error() {
        let (_dir, _cfg, sys) = setup();
        sys.state().fail_cards = true;
        assert!(try_get_cards(&sys).is_err());
        assert!(get_cards(&sys).is_empty());
    }

    #[test]
    fn jack_is_listed_when_running() {
        let (_dir, _cfg, sys) = setup();
        assert_eq!(get_cards(&sys), vec!["FakeCard1", "FakeCard2", "jack"]);
        sys.state().jack = false;
        assert_eq!(get_cards(&sys), vec!["FakeCard1", "FakeCard2"]);
    }

    #[test]
    fn null_input_does_not_exist() {
        let (_dir, cfg, sys) = setup();
        cfg.set("pcm_input", "null").unwrap();

        assert!(!input_exists(&sys, &cfg, "null_input_does_not_exist"));
        assert_eq!(get_current_card(&sys, &cfg, Stream::Input), (None, None));
        assert_eq!(get_card(&cfg.pcm(Stream::Input)), None);
    }

    #[test]
    fn null_output_does_not_exist() {
        let (_dir, cfg, sys) = setup();
        cfg.set("pcm_output", "null").unwrap();

        assert!(!output_exists(&sys, &cfg, "null_output_does_not_exist"));
        assert_eq!(get_current_card(&sys, &cfg, Stream::Output), (None, None));
    }

    #[test]
    fn selected_card_exists() {
        let (_dir, cfg, sys) = setup();
        select_pcm(&sys, &cfg, Stream::Output, Some("FakeCard1")).unwrap();

        assert!(output_exists(&sys, &cfg, "selected_card_exists"));
        assert!(card_exists(&sys, &cfg.pcm(Stream::Output)));
        assert_eq!(
            get_current_card(&sys, &cfg, Stream::Output),
            (Some(0), Some("FakeCard1".to_owned()))
        );
    }

    #[test]
    fn unknown_card_keeps_its_name() {
        let (_dir, cfg, sys) = setup();
        cfg.set("pcm_output", "hw:CARD=Gone").unwrap();

        assert!(!output_exists(&sys, &cfg, "unknown_card_keeps_its_name"));
        assert_eq!(
            get_current_card(&sys, &cfg, Stream::Output),
            (None, Some("Gone".to_owned()))
        );
    }

    #[test]
    fn missing_mixer_wakes_the_pcm() {
        let (_dir, cfg, sys) = setup();
        select_pcm(&sys, &cfg, Stream::Output, Some("FakeCard1")).unwrap();
        sys.state().hide_mixers = true;

        assert!(!output_exists(&sys, &cfg, "missing_mixer_wakes_the_pcm"));
        assert_eq!(sys.state().wakeups, 1);

        // without softvol there's no mixer to look for
        cfg.set(OUTPUT_USE_SOFTVOL, false).unwrap();
        assert!(output_exists(&sys, &cfg, "missing_mixer_wakes_the_pcm"));
        assert_eq!(sys.state().wakeups, 1);
    }

    #[test]
    fn card_check_can_be_skipped() {
        let (_dir, cfg, sys) = setup();
        cfg.set("pcm_output", "hw:CARD=Gone").unwrap();
        assert!(stream_exists(&sys, &cfg, Stream::Output, "test", false, true));
    }

    #[test]
    fn select_uses_configured_plugin() {
        let (_dir, cfg, sys) = setup();

        select_pcm(&sys, &cfg, Stream::Output, Some("FakeCard1")).unwrap();
        assert_eq!(cfg.pcm(Stream::Output), "hw:CARD=FakeCard1");

        cfg.set(OUTPUT_PLUGIN, "ab").unwrap();
        select_pcm(&sys, &cfg, Stream::Output, Some("FakeCard2")).unwrap();
        assert_eq!(cfg.pcm(Stream::Output), "ab:CARD=FakeCard2");

        select_pcm(&sys, &cfg, Stream::Output, Some("jack")).unwrap();
        assert_eq!(cfg.pcm(Stream::Output), "jack");

        select_pcm(&sys, &cfg, Stream::Output, None).unwrap();
        assert_eq!(cfg.pcm(Stream::Output), "null");
    }

    #[test]
    fn selecting_twice_unselects() {
        let (_dir, cfg, sys) = setup();

        toggle_pcm(&sys, &cfg, Stream::Input, "FakeCard1").unwrap();
        assert_eq!(cfg.pcm(Stream::Input), "hw:CARD=FakeCard1");

        toggle_pcm(&sys, &cfg, Stream::Input, "FakeCard1").unwrap();
        assert_eq!(cfg.pcm(Stream::Input), "null");

        cfg.set(INPUT_PLUGIN, "ab").unwrap();
        toggle_pcm(&sys, &cfg, Stream::Input, "FakeCard2").unwrap();
        assert_eq!(cfg.pcm(Stream::Input), "ab:CARD=FakeCard2");
    }

    #[test]
    fn control_device_follows_card() {
        let (_dir, cfg, sys) = setup();
        assert_eq!(control_device(&cfg, Stream::Output), "default");
        select_pcm(&sys, &cfg, Stream::Output, Some("FakeCard1")).unwrap();
        assert_eq!(control_device(&cfg, Stream::Output), "hw:CARD=FakeCard1");
    }
}
