//! Carbon exclusive hot key registry.
//!
//! `RegisterEventHotKey` either grants the process sole ownership of a
//! combination or fails because another listener (in this process or another
//! one) holds it. Presses are delivered as Carbon events to the application
//! event target on the main thread; one handler, installed lazily and never
//! removed, looks up the hot key id in `ROUTES` and queues an
//! [`Activation::HotKey`] for the owner.

use std::{collections::HashMap, ffi::c_void, mem, ptr, time::Instant};

use crossbeam_channel::Sender;
use keycombo::Combo;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::{Activation, Error, Result, Throttle};

type OSStatus = i32;
type EventTargetRef = *mut c_void;
type EventHandlerRef = *mut c_void;
type EventHandlerCallRef = *mut c_void;
type EventRef = *mut c_void;
type EventHotKeyRef = *mut c_void;
type EventHandlerUPP = extern "C" fn(EventHandlerCallRef, EventRef, *mut c_void) -> OSStatus;

/// Carbon event type filter for `InstallEventHandler`.
#[repr(C)]
#[derive(Copy, Clone)]
struct EventTypeSpec {
    /// Event class (`kEventClassKeyboard`).
    event_class: u32,
    /// Event kind within the class.
    event_kind: u32,
}

/// Carbon hot key identity, echoed back on every press.
#[repr(C)]
#[derive(Copy, Clone)]
struct EventHotKeyID {
    /// Four-char application signature.
    signature: u32,
    /// Slot id.
    id: u32,
}

#[link(name = "Carbon", kind = "framework")]
unsafe extern "C" {
    fn RegisterEventHotKey(
        key_code: u32,
        modifiers: u32,
        id: EventHotKeyID,
        target: EventTargetRef,
        options: u32,
        out_ref: *mut EventHotKeyRef,
    ) -> OSStatus;
    fn UnregisterEventHotKey(hot_key: EventHotKeyRef) -> OSStatus;
    fn InstallEventHandler(
        target: EventTargetRef,
        handler: EventHandlerUPP,
        num_types: u32,
        list: *const EventTypeSpec,
        user_data: *mut c_void,
        out_ref: *mut EventHandlerRef,
    ) -> OSStatus;
    fn GetApplicationEventTarget() -> EventTargetRef;
    fn GetEventParameter(
        event: EventRef,
        name: u32,
        desired_type: u32,
        actual_type: *mut u32,
        buffer_size: u32,
        actual_size: *mut u32,
        data: *mut c_void,
    ) -> OSStatus;
}

const NO_ERR: OSStatus = 0;
const EVENT_NOT_HANDLED_ERR: OSStatus = -9874;
const K_EVENT_CLASS_KEYBOARD: u32 = u32::from_be_bytes(*b"keyb");
const K_EVENT_HOTKEY_PRESSED: u32 = 5;
const K_EVENT_PARAM_DIRECT_OBJECT: u32 = u32::from_be_bytes(*b"----");
const TYPE_EVENT_HOTKEY_ID: u32 = u32::from_be_bytes(*b"hkid");

/// Signature stamped on every hot key we register.
const SIGNATURE: u32 = u32::from_be_bytes(*b"pnlk");

/// Hot key id → owner channel. Entries live exactly as long as the OS claim.
static ROUTES: Lazy<Mutex<HashMap<u32, Sender<Activation>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Whether the process-wide handler is installed.
static HANDLER_INSTALLED: Lazy<Mutex<bool>> = Lazy::new(|| Mutex::new(false));

/// Install the process-wide hot key handler once.
fn ensure_handler() -> Result<()> {
    let mut installed = HANDLER_INSTALLED.lock();
    if *installed {
        return Ok(());
    }
    let spec = EventTypeSpec {
        event_class: K_EVENT_CLASS_KEYBOARD,
        event_kind: K_EVENT_HOTKEY_PRESSED,
    };
    let mut handler_ref: EventHandlerRef = ptr::null_mut();
    let status = unsafe {
        InstallEventHandler(
            GetApplicationEventTarget(),
            hotkey_handler,
            1,
            &spec,
            ptr::null_mut(),
            &mut handler_ref,
        )
    };
    if status != NO_ERR {
        warn!(status, "hotkey_handler_install_failed");
        return Err(Error::OsError(format!(
            "InstallEventHandler failed: {status}"
        )));
    }
    *installed = true;
    debug!("hotkey_handler_installed");
    Ok(())
}

extern "C" fn hotkey_handler(
    _call_ref: EventHandlerCallRef,
    event: EventRef,
    _user_data: *mut c_void,
) -> OSStatus {
    let mut hot_id = EventHotKeyID {
        signature: 0,
        id: 0,
    };
    let status = unsafe {
        GetEventParameter(
            event,
            K_EVENT_PARAM_DIRECT_OBJECT,
            TYPE_EVENT_HOTKEY_ID,
            ptr::null_mut(),
            mem::size_of::<EventHotKeyID>() as u32,
            ptr::null_mut(),
            &mut hot_id as *mut EventHotKeyID as *mut c_void,
        )
    };
    if status != NO_ERR {
        return status;
    }
    if hot_id.signature != SIGNATURE {
        return EVENT_NOT_HANDLED_ERR;
    }
    let tx = ROUTES.lock().get(&hot_id.id).cloned();
    match tx {
        Some(tx) => {
            trace!(id = hot_id.id, "hotkey_pressed");
            if tx.send(Activation::HotKey(hot_id.id)).is_err() {
                debug!(id = hot_id.id, "hotkey_owner_gone");
            }
            NO_ERR
        }
        None => EVENT_NOT_HANDLED_ERR,
    }
}

/// An OS hot key reference.
struct HotKeyRef(EventHotKeyRef);

// Carbon hot key refs are created and released on the main thread only; the
// wrapper just lets the map live behind a Mutex.
unsafe impl Send for HotKeyRef {}

/// Exclusive registrations owned by one client, keyed by hot key id.
pub struct Registry {
    /// Where presses for our ids are queued.
    tx: Sender<Activation>,
    /// Live OS claims.
    refs: Mutex<HashMap<u32, HotKeyRef>>,
    /// Rate limit for failure warnings.
    throttle: Mutex<Throttle>,
}

impl Registry {
    /// Create a registry that queues presses onto `tx`.
    pub fn new(tx: Sender<Activation>) -> Self {
        Self {
            tx,
            refs: Mutex::new(HashMap::new()),
            throttle: Mutex::new(Throttle::default()),
        }
    }

    /// Claim `combo` under hot key `id`.
    ///
    /// Must be called on the main thread. A prior claim under the same id is
    /// released first. Failure leaves nothing registered for `id`.
    pub fn register(&self, id: u32, combo: Combo) -> Result<()> {
        ensure_handler()?;
        self.unregister(id)?;

        let hot_id = EventHotKeyID {
            signature: SIGNATURE,
            id,
        };
        let mut out: EventHotKeyRef = ptr::null_mut();
        let status = unsafe {
            RegisterEventHotKey(
                combo.key_code,
                combo.modifiers.bits(),
                hot_id,
                GetApplicationEventTarget(),
                0,
                &mut out,
            )
        };
        if status != NO_ERR || out.is_null() {
            let err = Error::from_register_status(status);
            match self.throttle.lock().admit(Instant::now()) {
                Some(suppressed) => warn!(
                    id,
                    status,
                    key_code = combo.key_code,
                    modifiers = combo.modifiers.bits(),
                    suppressed,
                    "registry_register_failed"
                ),
                None => debug!(id, status, "registry_register_failed"),
            }
            return Err(err);
        }

        ROUTES.lock().insert(id, self.tx.clone());
        self.refs.lock().insert(id, HotKeyRef(out));
        debug!(id, combo = %combo, "registry_registered");
        Ok(())
    }

    /// Release the claim under `id`. Releasing an unknown id is a no-op.
    pub fn unregister(&self, id: u32) -> Result<()> {
        let Some(hk) = self.refs.lock().remove(&id) else {
            return Ok(());
        };
        ROUTES.lock().remove(&id);
        let status = unsafe { UnregisterEventHotKey(hk.0) };
        if status != NO_ERR {
            warn!(id, status, "registry_unregister_failed");
            return Err(Error::OsError(format!(
                "UnregisterEventHotKey failed: {status}"
            )));
        }
        debug!(id, "registry_unregistered");
        Ok(())
    }

    /// Whether a claim is currently held under `id`.
    pub fn is_registered(&self, id: u32) -> bool {
        self.refs.lock().contains_key(&id)
    }
}

impl Drop for Registry {
    fn drop(&mut self) {
        let ids: Vec<u32> = self.refs.lock().keys().copied().collect();
        for id in ids {
            if let Err(e) = self.unregister(id) {
                warn!(id, error = %e, "registry_drop_unregister_failed");
            }
        }
    }
}
