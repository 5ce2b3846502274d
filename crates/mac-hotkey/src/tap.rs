//! macOS event tap (CoreGraphics) observing every key-down.
//!
//! The tap lives on a dedicated thread with its own run loop, which is the OS
//! event-delivery context. The callback never touches application state: it
//! classifies the event against the armed combo and, on a match, queues an
//! [`Activation::Tap`] and returns `CallbackResult::Drop` so the keystroke
//! never reaches the foreground app. CoreGraphics only suppresses delivery
//! when the tap returns NULL, which is what `Drop` maps to.

use std::{
    ffi::c_void,
    process,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicPtr, Ordering},
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use core_foundation::{
    base::TCFType,
    mach_port::CFMachPortRef,
    runloop::{CFRunLoop, kCFRunLoopCommonModes, kCFRunLoopDefaultMode},
};
use core_graphics::event::{self as cge, CallbackResult};
use crossbeam_channel::{Sender, bounded};
use keycombo::{Combo, Modifiers};
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::{Activation, Error, Result, policy};

#[link(name = "CoreGraphics", kind = "framework")]
unsafe extern "C" {
    fn CGEventTapEnable(tap: CFMachPortRef, enable: bool);
}

// Minimal subset of CGEventField constants used by this module.
const FIELD_EVENT_SOURCE_UNIX_PROCESS_ID: u32 = 41;
const FIELD_KEYBOARD_EVENT_KEYCODE: u32 = 9;

/// Longest the tap thread runs its loop before re-checking for a stop request.
const RUN_SLICE: Duration = Duration::from_millis(250);

/// Shared control handle to stop the tap's run loop from other threads.
struct SysControl {
    /// Run loop of the tap thread, once it is running.
    rl: Mutex<Option<CFRunLoop>>,
    /// Set once a stop was requested; checked between run loop slices.
    stopped: AtomicBool,
}

impl SysControl {
    /// Fresh handle with no run loop yet.
    fn new() -> Self {
        Self {
            rl: Mutex::new(None),
            stopped: AtomicBool::new(false),
        }
    }

    /// Record the tap thread's run loop.
    fn set_rl(&self, rl: CFRunLoop) {
        *self.rl.lock() = Some(rl);
    }

    /// Whether a stop was requested.
    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Request a stop and wake the run loop.
    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        if let Some(rl) = self.rl.lock().take() {
            rl.stop();
        }
    }
}

/// A live tap thread.
struct Running {
    /// Stop handle shared with the thread.
    ctrl: Arc<SysControl>,
    /// The tap thread itself, joined on stop.
    thread: JoinHandle<()>,
}

/// Passive, permission-gated key observer bound to one combo at a time.
pub struct InputTap {
    /// Where matches are queued.
    tx: Sender<Activation>,
    /// Combo the callback matches against; `None` disarms it.
    armed: Arc<Mutex<Option<Combo>>>,
    /// The tap thread, while started.
    running: Mutex<Option<Running>>,
}

impl InputTap {
    /// Create a stopped tap that queues matches onto `tx`.
    pub fn new(tx: Sender<Activation>) -> Self {
        Self {
            tx,
            armed: Arc::new(Mutex::new(None)),
            running: Mutex::new(None),
        }
    }

    /// Whether the process holds the Input Monitoring permission.
    pub fn is_authorized(&self) -> bool {
        permissions::input_monitoring_ok()
    }

    /// Ask the OS for Input Monitoring; may show a system prompt.
    pub fn request_authorization(&self) -> bool {
        permissions::request_input_monitoring()
    }

    /// Whether a tap thread is currently running.
    pub fn is_running(&self) -> bool {
        self.running.lock().is_some()
    }

    /// Start observing key-downs for `combo`.
    ///
    /// Fails with [`Error::PermissionDenied`] without doing anything else when
    /// Input Monitoring is missing. A running tap is stopped first. Returns
    /// once the tap is installed on its run loop, or with the install error.
    pub fn start(&self, combo: Combo) -> Result<()> {
        if !self.is_authorized() {
            warn!("input_monitoring_permission_missing");
            return Err(Error::PermissionDenied("Input Monitoring"));
        }
        self.stop();

        *self.armed.lock() = Some(combo);
        let ctrl = Arc::new(SysControl::new());
        let (ready_tx, ready_rx) = bounded::<Result<()>>(1);
        let armed = self.armed.clone();
        let tx = self.tx.clone();
        let thread_ctrl = ctrl.clone();
        let thread = thread::Builder::new()
            .name("panelkey-tap".into())
            .spawn(move || {
                if let Err(e) = run_event_loop(armed, tx, ready_tx, thread_ctrl) {
                    debug!(error = %e, "event_tap_thread_exit");
                }
            })
            .map_err(|e| Error::OsError(e.to_string()))?;

        let started = ready_rx.recv().unwrap_or(Err(Error::EventTapStart));
        match started {
            Ok(()) => {
                *self.running.lock() = Some(Running { ctrl, thread });
                debug!(combo = %combo, "tap_started");
                Ok(())
            }
            Err(e) => {
                *self.armed.lock() = None;
                if thread.join().is_err() {
                    warn!("event_tap_thread_panicked");
                }
                Err(e)
            }
        }
    }

    /// Remove the observer. Safe to call when already stopped.
    pub fn stop(&self) {
        *self.armed.lock() = None;
        let Some(running) = self.running.lock().take() else {
            return;
        };
        running.ctrl.stop();
        if running.thread.join().is_err() {
            warn!("event_tap_thread_panicked");
        }
        debug!("tap_stopped");
    }
}

impl Drop for InputTap {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Body of the tap thread: install the tap, report readiness, run the loop.
fn run_event_loop(
    armed: Arc<Mutex<Option<Combo>>>,
    tx: Sender<Activation>,
    ready: Sender<Result<()>>,
    ctrl: Arc<SysControl>,
) -> Result<()> {
    // Capture for re-enabling the tap from inside the closure.
    let tap_port_ptr: Arc<AtomicPtr<c_void>> = Arc::new(AtomicPtr::new(std::ptr::null_mut()));
    let tap_port_ptr_cb = tap_port_ptr.clone();
    let own_pid = process::id();

    debug!("creating_event_tap");
    let tap = match cge::CGEventTap::new(
        cge::CGEventTapLocation::HID,
        cge::CGEventTapPlacement::HeadInsertEventTap,
        cge::CGEventTapOptions::Default,
        vec![cge::CGEventType::KeyDown],
        move |_proxy, etype, event| match etype {
            cge::CGEventType::KeyDown => {
                let src_pid = event.get_integer_value_field(FIELD_EVENT_SOURCE_UNIX_PROCESS_ID) as u32;
                let key_code = event.get_integer_value_field(FIELD_KEYBOARD_EVENT_KEYCODE) as u32;
                let held = Modifiers::from_cg_flags(event.get_flags().bits());
                let combo = *armed.lock();
                let d = policy::classify(combo, key_code, held, src_pid == own_pid);
                trace!(key_code, held = held.bits(), emit = d.emit, "tap_event");
                if d.emit && tx.send(Activation::Tap).is_err() {
                    debug!("tap_owner_gone");
                }
                if d.consume {
                    CallbackResult::Drop
                } else {
                    CallbackResult::Keep
                }
            }
            cge::CGEventType::TapDisabledByTimeout | cge::CGEventType::TapDisabledByUserInput => {
                let p = tap_port_ptr_cb.load(Ordering::SeqCst) as CFMachPortRef;
                if !p.is_null() {
                    warn!("tap_disabled_by_os_reenabling");
                    unsafe { CGEventTapEnable(p, true) };
                }
                CallbackResult::Keep
            }
            _ => CallbackResult::Keep,
        },
    ) {
        Ok(t) => t,
        Err(_) => {
            warn!("event_tap_create_failed");
            let _ = ready.send(Err(Error::EventTapStart));
            return Err(Error::EventTapStart);
        }
    };

    tap_port_ptr.store(
        tap.mach_port().as_concrete_TypeRef() as *mut c_void,
        Ordering::SeqCst,
    );

    let source = match tap.mach_port().create_runloop_source(0) {
        Ok(s) => s,
        Err(_) => {
            warn!("run_loop_source_create_failed");
            let _ = ready.send(Err(Error::EventTapStart));
            return Err(Error::EventTapStart);
        }
    };

    let rl = CFRunLoop::get_current();
    ctrl.set_rl(rl.clone());
    let mode = unsafe { kCFRunLoopCommonModes };
    rl.add_source(&source, mode);
    tap.enable();

    let _ = ready.send(Ok(()));
    debug!("event_tap_started_run_loop");

    // A stop can land before the loop first spins; slicing the run bounds
    // how long it goes unnoticed.
    while !ctrl.is_stopped() {
        let mode = unsafe { kCFRunLoopDefaultMode };
        CFRunLoop::run_in_mode(mode, RUN_SLICE, false);
    }

    debug!("event_tap_exited");
    Ok(())
}
