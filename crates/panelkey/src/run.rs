//! `run`: hold the shortcuts and drive the main sequencing context.

use std::{
    fs,
    path::Path,
    time::{Duration, Instant, SystemTime},
};

use core_foundation::runloop::{CFRunLoop, kCFRunLoopDefaultMode};
use panelkey_arbiter::{Arbitrator, ReconcileReport, Reconciler, SlotAction, mac_backends};
use settings::{HotkeySettings, JsonStore};
use tracing::{debug, info, trace, warn};

use crate::Error;

/// Longest the main run loop blocks before activations are drained.
const RUN_SLICE: Duration = Duration::from_millis(50);

/// How often the store is checked for edits and the shortcuts for liveness.
const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Modification time of `path`, if it exists.
fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

fn log_report(report: &ReconcileReport) {
    for failure in report.failures() {
        warn!(%failure, "hotkey_unavailable");
    }
}

/// Reconcile from the store; on a broken document run with defaults and
/// leave the file alone.
fn reconcile(rec: &Reconciler<JsonStore>, arb: &mut Arbitrator) {
    match rec.reconcile(arb) {
        Ok((_, report)) => log_report(&report),
        Err(e) => {
            warn!(error = %e, "settings_unusable_using_defaults");
            let mut defaults = HotkeySettings::default();
            log_report(&rec.apply(arb, &mut defaults));
        }
    }
    // Land any revert now so it does not look like an external edit later.
    rec.store().flush();
}

/// Run until the process is killed.
pub fn run(store_path: &Path, fire_test: Option<SlotAction>) -> Result<(), Error> {
    let (registry, tap, activations) = mac_backends();
    let mut arb = Arbitrator::new(registry, tap, activations);
    for action in [
        SlotAction::TogglePanel,
        SlotAction::QuickAdd,
        SlotAction::ToggleOverlay,
    ] {
        arb.set_trigger(action, move || info!(%action, "action_fired"));
    }
    let mut statuses = arb.subscribe();

    info!(path = %store_path.display(), "starting");
    let rec = Reconciler::new(JsonStore::new(store_path));
    reconcile(&rec, &mut arb);
    if !arb.tap_authorized() {
        debug!("input_monitoring_not_granted");
    }

    if let Some(action) = fire_test
        && !arb.fire_for_test(action)
    {
        warn!(%action, "fire_test_without_trigger");
    }

    let mut stamp = modified(store_path);
    let mut last_poll = Instant::now();
    loop {
        // SAFETY: kCFRunLoopDefaultMode is an immutable CoreFoundation constant.
        let mode = unsafe { kCFRunLoopDefaultMode };
        CFRunLoop::run_in_mode(mode, RUN_SLICE, true);

        arb.pump();
        while let Ok(status) = statuses.try_recv() {
            info!(status = %status, tone = ?status.tone(), "status");
        }

        if last_poll.elapsed() < POLL_INTERVAL {
            continue;
        }
        last_poll = Instant::now();
        let now = modified(store_path);
        if now != stamp {
            debug!("settings_changed");
            reconcile(&rec, &mut arb);
            stamp = modified(store_path);
        } else if arb.ensure_armed() {
            trace!("rearm_attempted");
        }
    }
}
