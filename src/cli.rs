//! Command line front end
//!
//! Every command maps onto one of the query helpers, text goes to
//! stdout and logs go to stderr so `--json` output can be piped.

use crate::asoundrc::{self, AsoundrcPaths};
use crate::cards::{
    self, card_exists, get_card, get_cards, get_current_card, get_pcms, toggle_pcm, validate_pcm,
};
use crate::error::{Error, Result};
use crate::level::{describe_level, LevelMonitor};
use crate::log;
use crate::mixer::{volume_icon, volume_string, MixerController};
use crate::model::{CardEntry, Status, Stream, StreamStatus};
use crate::rts::{daemon, hardware::SoundSystem};
use crate::services;
use crate::settings::{pcm_key, Config, PCM_INPUT, PCM_OUTPUT};
use crate::speaker_test::SpeakerTest;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::json;
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};
use tracing::{info, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Parser)]
#[command(name = "alsacontrol")]
#[command(version)]
#[command(about = "Volume control and card selection for plain ALSA", long_about = None)]
pub struct Cli {
    /// Log debug messages
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write the generated asoundrc and include it from ~/.asoundrc
    Setup,

    /// Read or write configuration values
    #[command(alias = "cfg")]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// List the cards that can be selected
    #[command(alias = "ls")]
    Cards,

    /// Select the card of a stream
    ///
    /// Selecting the current card again unselects it, as does leaving
    /// the card out.
    Select {
        /// input or output
        stream: Stream,

        /// Card id as shown by `cards`, or jack
        card: Option<String>,
    },

    /// Show or change the volume in percent
    Volume {
        /// input or output
        stream: Stream,

        #[arg(value_parser = clap::value_parser!(u8).range(0..=100))]
        value: Option<u8>,

        /// Use the raw mixer value instead of the perceived volume
        #[arg(long)]
        linear: bool,
    },

    /// Mute, unmute or toggle a stream
    Mute {
        /// input or output
        stream: Stream,

        #[arg(value_enum, default_value = "toggle")]
        action: MuteAction,
    },

    /// Show the selected cards, volumes and running sound servers
    Status,

    /// Show the recording level of the input cards
    Level {
        /// Only this card
        card: Option<String>,

        /// Keep printing until Ctrl-C
        #[arg(short, long)]
        watch: bool,
    },

    /// Play test sounds on every output channel until Ctrl-C
    SpeakerTest {
        /// Stop after this many seconds
        #[arg(long)]
        seconds: Option<u64>,
    },

    /// Watch for plugged and unplugged cards
    Daemon {
        /// Poll interval in milliseconds
        #[arg(long, default_value_t = daemon::DEFAULT_INTERVAL.as_millis() as u64)]
        interval: u64,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print one value, or all of them
    Get { key: Option<String> },

    /// Change a value and regenerate the asoundrc
    Set { key: String, value: String },
}

#[derive(Clone, Copy, Debug, PartialEq, ValueEnum)]
pub enum MuteAction {
    On,
    Off,
    Toggle,
}

/// Execute a parsed command line
pub fn run(cli: Cli, sys: Arc<dyn SoundSystem>, cfg: Arc<Config>) -> Result<()> {
    let json = cli.json;
    match cli.command {
        Commands::Setup => {
            get_pcms(&cfg);
            let paths = AsoundrcPaths::locate()?;
            asoundrc::setup(&cfg, &paths)?;
            for stream in Stream::ALL.iter().copied() {
                cards::stream_exists(&*sys, &cfg, stream, "setup", true, true);
            }
            print(json, &json!({ "asoundrc": paths.generated }), |_| {
                format!("Wrote {}", paths.generated.display())
            })
        }
        Commands::Config { action } => config(json, &cfg, action),
        Commands::Cards => print(json, &card_entries(&*sys, &cfg), |entries| {
            entries
                .iter()
                .map(describe_card)
                .collect::<Vec<_>>()
                .join("\n")
        }),
        Commands::Select { stream, card } => {
            select(&*sys, &cfg, stream, card.as_deref())?;
            asoundrc::setup(&cfg, &AsoundrcPaths::locate()?)?;
            let pcm = cfg.pcm(stream);
            print(json, &json!({ "stream": stream, "pcm": pcm }), |_| {
                format!("{} is now {}", stream, pcm)
            })
        }
        Commands::Volume {
            stream,
            value,
            linear,
        } => volume(json, &*sys, &cfg, stream, value, !linear),
        Commands::Mute { stream, action } => {
            let muted = mute(&*sys, &cfg, stream, action)?;
            print(json, &json!({ "stream": stream, "muted": muted }), |_| {
                format!("{} {}", stream, if muted { "muted" } else { "unmuted" })
            })
        }
        Commands::Status => print(json, &status(&*sys, &cfg), describe_status),
        Commands::Level { card, watch } => level(json, &*sys, &cfg, card.as_deref(), watch),
        Commands::SpeakerTest { seconds } => speaker_test(&*sys, &cfg, seconds),
        Commands::Daemon { interval } => {
            log::log_info();
            daemon::run(sys, cfg, Duration::from_millis(interval))
        }
    }
}

/// Print a value as pretty JSON, or as text
fn print<T, F>(json: bool, value: &T, text: F) -> Result<()>
where
    T: Serialize,
    F: FnOnce(&T) -> String,
{
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        println!("{}", text(value));
    }
    Ok(())
}

fn config(json: bool, cfg: &Config, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Get { key: None } => {
            let entries = cfg.entries();
            let map: serde_json::Map<_, _> = entries
                .iter()
                .map(|(k, v)| (k.clone(), json!(v)))
                .collect();
            print(json, &map, |_| {
                entries
                    .iter()
                    .map(|(k, v)| match v {
                        Some(v) => format!("{}={}", k, v),
                        None => k.clone(),
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            })
        }
        ConfigAction::Get { key: Some(key) } => {
            if !cfg.entries().iter().any(|(k, _)| *k == key) {
                return Err(Error::Config(format!("unknown key \"{}\"", key)));
            }
            let value = cfg.get(&key);
            let mut map = serde_json::Map::new();
            map.insert(key, json!(value));
            print(json, &map, |_| value.clone().unwrap_or_default())
        }
        ConfigAction::Set { key, value } => {
            if key == PCM_INPUT || key == PCM_OUTPUT {
                validate_pcm(&value)?;
            }
            if cfg.set(&key, &value)? {
                info!("Set {} to {}", key, value);
                asoundrc::setup(cfg, &AsoundrcPaths::locate()?)?;
            }
            Ok(())
        }
    }
}

/// Every selectable card, flagged with the streams using it
pub fn card_entries(sys: &dyn SoundSystem, cfg: &Config) -> Vec<CardEntry> {
    let (_, input) = get_current_card(sys, cfg, Stream::Input);
    let (_, output) = get_current_card(sys, cfg, Stream::Output);
    get_cards(sys)
        .into_iter()
        .enumerate()
        .map(|(index, id)| CardEntry {
            index,
            input: input.as_ref() == Some(&id),
            output: output.as_ref() == Some(&id),
            id,
        })
        .collect()
}

fn describe_card(entry: &CardEntry) -> String {
    let mut line = format!("{}: {}", entry.index, entry.id);
    if entry.input {
        line.push_str(" [input]");
    }
    if entry.output {
        line.push_str(" [output]");
    }
    line
}

/// Select or unselect a card for a stream, returns whether the config changed
pub fn select(sys: &dyn SoundSystem, cfg: &Config, stream: Stream, card: Option<&str>) -> Result<bool> {
    let card = match card {
        Some(card) => card,
        None => {
            info!("Unselecting {}", stream);
            return cards::select_pcm(sys, cfg, stream, None);
        }
    };

    if !get_cards(sys).iter().any(|c| c == card) {
        return Err(Error::CardNotFound(card.to_owned()));
    }

    let changed = toggle_pcm(sys, cfg, stream, card)?;
    info!("{} is now {}", pcm_key(stream), cfg.pcm(stream));
    Ok(changed)
}

fn volume(
    json: bool,
    sys: &dyn SoundSystem,
    cfg: &Config,
    stream: Stream,
    value: Option<u8>,
    nonlinear: bool,
) -> Result<()> {
    // opens the pcm once if the softvol control is not registered yet
    cards::stream_exists(sys, cfg, stream, "volume", true, true);

    let mixer = MixerController::new(sys, cfg);
    if let Some(value) = value {
        mixer.set_volume(stream, f64::from(value) / 100.0, nonlinear)?;
    }

    let volume = mixer.get_volume(stream, nonlinear)?;
    let muted = mixer.is_muted(stream);
    print(
        json,
        &json!({ "stream": stream, "volume": volume, "muted": muted }),
        |_| volume_string(volume, muted),
    )
}

/// Apply a mute action, returns the resulting state
pub fn mute(sys: &dyn SoundSystem, cfg: &Config, stream: Stream, action: MuteAction) -> Result<bool> {
    cards::stream_exists(sys, cfg, stream, "mute", true, true);

    let mixer = MixerController::new(sys, cfg);
    match action {
        MuteAction::Toggle => mixer
            .toggle_mute(stream)
            .ok_or_else(|| Error::MixerNotFound(stream.mute_mixer().to_owned())),
        MuteAction::On | MuteAction::Off => {
            mixer.set_mute(stream, action == MuteAction::On)?;
            Ok(mixer.is_muted(stream))
        }
    }
}

/// Snapshot of one stream
pub fn stream_status(sys: &dyn SoundSystem, cfg: &Config, stream: Stream) -> StreamStatus {
    let pcm = cfg.pcm(stream);
    let softvol = cfg.use_softvol(stream);
    let mixer = MixerController::new(sys, cfg);

    let volume = if softvol {
        mixer.get_volume(stream, true).ok()
    } else {
        None
    };
    let muted = softvol && mixer.is_muted(stream);
    let shown = volume.unwrap_or(1.0);

    StreamStatus {
        stream,
        card: get_card(&pcm),
        available: card_exists(sys, &pcm),
        softvol,
        volume,
        muted,
        icon: volume_icon(shown, muted).to_owned(),
        label: volume_string(shown, muted),
        pcm,
    }
}

pub fn status(sys: &dyn SoundSystem, cfg: &Config) -> Status {
    Status {
        input: stream_status(sys, cfg, Stream::Input),
        output: stream_status(sys, cfg, Stream::Output),
        jack_running: sys.jack_running(),
        pulse_running: services::is_pulse_running(),
        daemon_running: services::is_daemon_running(),
    }
}

fn describe_stream(s: &StreamStatus) -> String {
    let mut line = format!("{:<6} {:<24} ", s.stream, s.pcm);
    if s.volume.is_some() || s.muted {
        line.push_str(&s.label);
    } else {
        line.push('-');
    }
    if s.card.is_some() && !s.available {
        line.push_str(" (not attached)");
    }
    line
}

fn describe_status(status: &Status) -> String {
    let yes_no = |b: bool| if b { "running" } else { "stopped" };
    [
        describe_stream(&status.input),
        describe_stream(&status.output),
        format!("jack   {}", yes_no(status.jack_running)),
        format!("pulse  {}", yes_no(status.pulse_running)),
        format!("daemon {}", yes_no(status.daemon_running)),
    ]
    .join("\n")
}

fn interrupt_flag() -> Result<Arc<AtomicBool>> {
    let interrupted = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&interrupted);
    ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed))
        .map_err(|e| Error::Config(format!("could not install signal handler: {}", e)))?;
    Ok(interrupted)
}

/// Print input levels once, or every poll interval with `watch`
fn level(json: bool, sys: &dyn SoundSystem, cfg: &Config, card: Option<&str>, watch: bool) -> Result<()> {
    let mut monitor = LevelMonitor::new(sys, card)?;
    let interrupted = match watch {
        true => Some(interrupt_flag()?),
        false => None,
    };

    loop {
        let levels = monitor.poll(sys, cfg);
        if json && watch {
            // one line per reading
            println!("{}", serde_json::to_string(&levels)?);
        } else {
            print(json, &levels, |levels| {
                levels
                    .iter()
                    .map(describe_level)
                    .collect::<Vec<_>>()
                    .join("\n")
            })?;
        }

        let stop = match &interrupted {
            Some(flag) => flag.load(Ordering::Relaxed) || levels.iter().all(|l| !l.running),
            None => true,
        };
        if stop {
            return Ok(());
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Run speaker-test until it exits, Ctrl-C, or the timeout
fn speaker_test(sys: &dyn SoundSystem, cfg: &Config, seconds: Option<u64>) -> Result<()> {
    if !cards::output_exists(sys, cfg, "speaker-test") {
        warn!("speaker-test will most likely fail without an output");
    }

    let interrupted = interrupt_flag()?;

    let mut test = SpeakerTest::new();
    test.toggle(sys, cfg)?;
    let deadline = seconds.map(|s| Instant::now() + Duration::from_secs(s));

    loop {
        let (running, failure) = test.check();
        if let Some(msg) = failure {
            return Err(Error::SpeakerTest(msg));
        }
        if !running {
            return Ok(());
        }

        let timed_out = deadline.map_or(false, |d| Instant::now() >= d);
        if timed_out || interrupted.load(Ordering::Relaxed) {
            test.stop();
            return Ok(());
        }
        thread::sleep(POLL_INTERVAL);
    }
}
