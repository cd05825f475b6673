//! The background watcher behind `alsacontrol daemon`

use super::hardware::{HardwareEvent, SoundSystem};
use crate::cards::{get_card, input_exists, output_exists, stream_exists};
use crate::cards_tracker::CardsTracker;
use crate::error::{Error, Result};
use crate::model::Stream;
use crate::services::{self, DAEMON_BUS_NAME};
use crate::settings::Config;
use async_std::{
    channel::{bounded, Receiver, Sender},
    task,
};
use dbus::blocking::stdintf::org_freedesktop_dbus::RequestNameReply;
use dbus::blocking::Connection;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(1000);

/// Receiving end of a running card watcher
pub struct WatcherHandle {
    /// Receive events from the watcher
    event_rx: Receiver<HardwareEvent>,
    /// Ask the watcher to stop after its current poll
    stop: Arc<AtomicBool>,
}

impl WatcherHandle {
    pub fn stopper(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    pub async fn next(&mut self) -> Option<HardwareEvent> {
        self.event_rx.recv().await.ok()
    }
}

/// Polls the card list on an interval
struct CardWatcher {
    sys: Arc<dyn SoundSystem>,
    /// Send events to the daemon loop
    event_tx: Sender<HardwareEvent>,
    interval: Duration,
    stop: Arc<AtomicBool>,
}

impl CardWatcher {
    fn start(sys: Arc<dyn SoundSystem>, interval: Duration) -> WatcherHandle {
        let (event_tx, event_rx) = bounded(4);
        let stop = Arc::new(AtomicBool::new(false));

        let watcher = CardWatcher {
            sys,
            event_tx,
            interval,
            stop: Arc::clone(&stop),
        };
        task::spawn(watcher.run());

        WatcherHandle { event_rx, stop }
    }

    async fn run(self) {
        let mut tracker = CardsTracker::new();
        tracker.diff(&*self.sys);

        while !self.stop.load(Ordering::Relaxed) {
            task::sleep(self.interval).await;

            if !tracker.log_new_pcms(&*self.sys) {
                continue;
            }

            let diff = tracker.take_changes();
            let event = HardwareEvent::CardsChanged {
                added: diff.added,
                removed: diff.removed,
            };
            if self.event_tx.send(event).await.is_err() {
                // nobody is listening anymore
                return;
            }
        }

        debug!("card watcher stopped");
        let _ = self.event_tx.send(HardwareEvent::Shutdown).await;
    }
}

/// React to plugged/unplugged cards, returns the streams that were checked again
pub fn on_cards_changed(
    sys: &dyn SoundSystem,
    cfg: &Config,
    added: &[String],
    removed: &[String],
) -> Vec<Stream> {
    let mut checked = Vec::new();
    for stream in Stream::ALL.iter().copied() {
        let card = match get_card(&cfg.pcm(stream)) {
            Some(card) => card,
            None => continue,
        };

        if removed.contains(&card) {
            warn!("The configured {} card \"{}\" was removed", stream, card);
        }
        if added.contains(&card) {
            info!("The configured {} card \"{}\" is back", stream, card);
            // opening the pcm makes the softvol mixers show up again
            stream_exists(sys, cfg, stream, "on_cards_changed", true, true);
            checked.push(stream);
        }
    }
    checked
}

/// Claim our well known name so `is_daemon_running` can find us
fn claim_bus_name() -> Result<Connection> {
    let conn = Connection::new_session()?;
    match conn.request_name(DAEMON_BUS_NAME, false, true, true)? {
        RequestNameReply::PrimaryOwner | RequestNameReply::AlreadyOwner => Ok(conn),
        _ => Err(Error::Daemon(format!(
            "{} is already owned, is another daemon running?",
            DAEMON_BUS_NAME
        ))),
    }
}

/// Run the daemon until Ctrl-C or SIGTERM
pub fn run(sys: Arc<dyn SoundSystem>, cfg: Arc<Config>, interval: Duration) -> Result<()> {
    if services::is_daemon_running() {
        return Err(Error::Daemon("the daemon is already running".into()));
    }

    // keep the connection alive for as long as we run
    let _bus = match claim_bus_name() {
        Ok(conn) => Some(conn),
        Err(e @ Error::Daemon(_)) => return Err(e),
        Err(e) => {
            warn!("Running without the session bus: {}", e);
            None
        }
    };

    if services::is_pulse_running() {
        warn!("pulseaudio is running, it might grab the cards alsacontrol is configured for");
    }

    input_exists(&*sys, &cfg, "daemon");
    output_exists(&*sys, &cfg, "daemon");

    let mut handle = CardWatcher::start(Arc::clone(&sys), interval);
    let stop = handle.stopper();
    ctrlc::set_handler(move || stop.store(true, Ordering::Relaxed))
        .map_err(|e| Error::Daemon(format!("could not install signal handler: {}", e)))?;

    info!("Watching cards every {}ms", interval.as_millis());
    task::block_on(async {
        while let Some(event) = handle.next().await {
            match event {
                HardwareEvent::CardsChanged { added, removed } => {
                    on_cards_changed(&*sys, &cfg, &added, &removed);
                }
                HardwareEvent::Shutdown => break,
            }
        }
    });

    info!("Daemon exiting, goodbye");
    Ok(())
}
