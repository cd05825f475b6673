//! Check whether other sound servers (and our own daemon) are up

use dbus::blocking::Connection;
use psutil::process;
use std::time::Duration;
use tracing::{debug, warn};

/// Well known bus name claimed by `alsacontrol daemon`
pub const DAEMON_BUS_NAME: &str = "com.alsacontrol.Daemon";

const JACK_BUS_NAME: &str = "org.jackaudio.service";
const JACK_CONTROLLER_PATH: &str = "/org/jackaudio/Controller";
const JACK_CONTROL_INTERFACE: &str = "org.jackaudio.JackControl";
const DBUS_TIMEOUT: Duration = Duration::from_millis(500);

/// Test if jack is running
///
/// jackdbus answers on the session bus, a plain `jackd` is only
/// visible in the process table.
pub fn is_jack_running() -> bool {
    match jack_controller_started() {
        Ok(started) => started,
        Err(e) => {
            debug!("jack controller not reachable: {}", e);
            process_is_running("jackd") || process_is_running("jackdbus")
        }
    }
}

fn jack_controller_started() -> Result<bool, dbus::Error> {
    let conn = Connection::new_session()?;
    let proxy = conn.with_proxy(JACK_BUS_NAME, JACK_CONTROLLER_PATH, DBUS_TIMEOUT);
    let (started,): (bool,) = proxy.method_call(JACK_CONTROL_INTERFACE, "IsStarted", ())?;
    Ok(started)
}

/// Test if pulseaudio is running, it grabs the card and keeps softvol
/// mixers from appearing
pub fn is_pulse_running() -> bool {
    process_is_running("pulseaudio")
}

/// Test if an alsacontrol daemon owns its bus name
pub fn is_daemon_running() -> bool {
    let owned = Connection::new_session().and_then(|conn| {
        let proxy = conn.with_proxy("org.freedesktop.DBus", "/org/freedesktop/DBus", DBUS_TIMEOUT);
        let (owned,): (bool,) =
            proxy.method_call("org.freedesktop.DBus", "NameHasOwner", (DAEMON_BUS_NAME,))?;
        Ok(owned)
    });

    owned.unwrap_or_else(|e| {
        debug!("could not ask the session bus about the daemon: {}", e);
        false
    })
}

fn process_is_running(name: &str) -> bool {
    let processes = match process::processes() {
        Ok(p) => p,
        Err(e) => {
            warn!("failed to list processes: {}", e);
            return false;
        }
    };

    processes
        .into_iter()
        .filter_map(Result::ok)
        .any(|p| p.name().map(|n| n == name).unwrap_or(false))
}
