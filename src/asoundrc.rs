//! Render the plugin chain into an asoundrc and hook it into `~/.asoundrc`
//!
//! Every stream gets a chain of pcms, top to bottom:
//!
//! ```text
//! alsacontrol-output         plug, what pcm.!default routes to
//! alsacontrol-output-mute    softvol with resolution 2, a switch
//! alsacontrol-output-volume  softvol
//! alsacontrol-output-dmix    dmix, or dsnoop for the input
//! hw:CARD=...                the configured device
//! ```
//!
//! The softvol pair and the sharing plugin are optional, jack and
//! `null` devices get pcms of their own at the bottom.

use crate::cards::hardware_card;
use crate::error::{Error, Result};
use crate::model::Stream;
use crate::settings::{scaffold, Config, JACK_PCM, NULL_PCM};
use directories::BaseDirs;
use std::fmt::Write as _;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const HEADER: &str = "# Generated by alsacontrol, changes will be overwritten.\n\
                      # Edit ~/.config/alsacontrol/config instead.\n";

/// Channels wired up for jack capture
const JACK_CAPTURE_CHANNELS: u32 = 2;

/// Where the asoundrc files live
#[derive(Clone, Debug)]
pub struct AsoundrcPaths {
    /// The user's own `~/.asoundrc`
    pub user: PathBuf,
    /// The file we generate and include from the user's
    pub generated: PathBuf,
}

impl AsoundrcPaths {
    pub fn locate() -> Result<Self> {
        let home = BaseDirs::new()
            .ok_or_else(|| Error::Config("could not determine the home directory".into()))?;
        Ok(Self {
            user: home.home_dir().join(".asoundrc"),
            generated: scaffold()?.join("asoundrc"),
        })
    }
}

/// A single `pcm.<name> { ... }` block
#[derive(Debug)]
struct Pcm {
    name: String,
    body: Vec<String>,
}

impl Pcm {
    fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            body: Vec::new(),
        }
    }

    fn line<S: Into<String>>(mut self, line: S) -> Self {
        self.body.push(line.into());
        self
    }

    fn slave(self, slave: &str) -> Self {
        self.line(format!("slave.pcm \"{}\"", slave))
    }

    /// `card` is written as is, quote it for card ids
    fn control(self, name: &str, card: &str) -> Self {
        self.line("control {")
            .line(format!("    name \"{}\"", name))
            .line(format!("    card {}", card))
            .line("}")
    }

    fn render(&self, out: &mut String) {
        let _ = writeln!(out, "pcm.{} {{", self.name);
        for line in self.body.iter() {
            let _ = writeln!(out, "    {}", line);
        }
        out.push_str("}\n\n");
    }
}

fn ipc_key(stream: Stream) -> u32 {
    match stream {
        Stream::Input => 2048,
        Stream::Output => 1024,
    }
}

/// Card the softvol controls of a stream are registered on
///
/// softvol can't ask jack or null for a card, so their controls go to
/// the card `ctl.!default` points at, which is what the `default` ctl
/// shows.  Without any hardware card that is card 0.
fn control_card(cfg: &Config, stream: Stream) -> String {
    hardware_card(&cfg.pcm(stream))
        .or_else(|| hardware_card(&cfg.pcm(Stream::Output)))
        .map(|card| format!("\"{}\"", card))
        .unwrap_or_else(|| "0".to_owned())
}

/// Build the chain of one stream, topmost pcm first
fn chain(cfg: &Config, stream: Stream) -> Vec<Pcm> {
    let dir = stream.name();
    let pcm = cfg.pcm(stream);
    let card = hardware_card(&pcm);
    let control = control_card(cfg, stream);

    // the bottom of the chain, plus its definition if it needs one
    let (device, device_pcm) = if pcm == JACK_PCM {
        let name = format!("alsacontrol-{}-jack", dir);
        let (block, prefix, channels) = match stream {
            Stream::Input => ("capture_ports", "system:capture", JACK_CAPTURE_CHANNELS),
            Stream::Output => ("playback_ports", "system:playback", cfg.num_output_channels()),
        };
        let mut jack = Pcm::new(name.clone())
            .line("type jack")
            .line(format!("{} {{", block));
        for i in 0..channels {
            jack = jack.line(format!("    {} {}_{}", i, prefix, i + 1));
        }
        (name, Some(jack.line("}")))
    } else if card.is_some() {
        (pcm.clone(), None)
    } else {
        if pcm != NULL_PCM && !pcm.is_empty() {
            warn!("Unsupported {} pcm \"{}\", using null instead", dir, pcm);
        }
        let name = format!("alsacontrol-{}-null", dir);
        (name.clone(), Some(Pcm::new(name).line("type null")))
    };

    let mut below = vec![];
    let mut next = device;
    if let Some(d) = device_pcm {
        below.push(d);
    }

    if card.is_some() && cfg.use_sharing(stream) {
        let plugin = stream.sharing_plugin();
        let name = format!("alsacontrol-{}-{}", dir, plugin);
        below.push(
            Pcm::new(name.clone())
                .line(format!("type {}", plugin))
                .line(format!("ipc_key {}", ipc_key(stream)))
                .line("ipc_perm 0666")
                .slave(&next),
        );
        next = name;
    }

    if cfg.use_softvol(stream) {
        let volume = Pcm::new(stream.volume_mixer())
            .line("type softvol")
            .slave(&next)
            .control(stream.volume_mixer(), &control);
        next = stream.volume_mixer().to_owned();
        below.push(volume);

        let mute = Pcm::new(stream.mute_mixer())
            .line("type softvol")
            .slave(&next)
            .control(stream.mute_mixer(), &control)
            .line("resolution 2");
        next = stream.mute_mixer().to_owned();
        below.push(mute);
    }

    below.push(
        Pcm::new(format!("alsacontrol-{}", dir))
            .line("type plug")
            .slave(&next),
    );

    below.reverse();
    below
}

/// Render the configuration into asoundrc syntax
pub fn render(cfg: &Config) -> String {
    let mut out = String::from(HEADER);
    out.push('\n');

    out.push_str(
        "pcm.!default {\n    \
            type asym\n    \
            playback.pcm \"alsacontrol-output\"\n    \
            capture.pcm \"alsacontrol-input\"\n\
         }\n\n",
    );

    if let Some(card) = hardware_card(&cfg.pcm(Stream::Output)) {
        let _ = write!(
            out,
            "ctl.!default {{\n    type hw\n    card \"{}\"\n}}\n\n",
            card
        );
    }

    for stream in Stream::ALL.iter().rev() {
        for pcm in chain(cfg, *stream) {
            pcm.render(&mut out);
        }
    }

    out
}

/// Find rules in a users asoundrc that conflict with ours
pub fn check_asoundrc(contents: &str) -> Vec<String> {
    let mut warnings = Vec::new();
    for line in contents.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with('#') {
            continue;
        }
        if trimmed.contains(".asoundrc.asoundconf>") {
            warnings.push(
                "asoundconf might break alsacontrol, try to comment it with # in .asoundrc."
                    .to_owned(),
            );
        }
        if trimmed.contains("pcm.!default") {
            warnings.push("already having a default device conflicts with alsacontrol".to_owned());
        }
        if trimmed.contains("alsacontrol-") {
            warnings.push(format!("your rule \"{}\" conflicts with alsacontrol", trimmed));
        }
    }
    warnings
}

/// Append the include line for the generated file, once
pub fn add_include(user: &Path, generated: &Path) -> Result<bool> {
    let contents = match fs::read_to_string(user) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e.into()),
    };

    let include = format!("<{}>", generated.display());
    if contents.lines().any(|l| l.trim() == include) {
        return Ok(false);
    }

    info!("Adding {} to {}", include, user.display());
    let mut file = OpenOptions::new().append(true).create(true).open(user)?;
    if !contents.is_empty() && !contents.ends_with('\n') {
        file.write_all(b"\n")?;
    }
    file.write_all(format!("{}\n", include).as_bytes())?;
    Ok(true)
}

/// Check the users asoundrc, write ours and include it
pub fn setup(cfg: &Config, paths: &AsoundrcPaths) -> Result<()> {
    if let Ok(contents) = fs::read_to_string(&paths.user) {
        for warning in check_asoundrc(&contents) {
            warn!("{}", warning);
        }
    }

    if let Some(parent) = paths.generated.parent() {
        fs::create_dir_all(parent)?;
    }
    info!("Writing {}", paths.generated.display());
    fs::write(&paths.generated, render(cfg))?;

    add_include(&paths.user, &paths.generated)?;
    Ok(())
}
