//! Backend seams between the arbitrator and the OS.

use keycombo::Combo;

use crate::StrategyError;

// ---- Exclusive registry ----

/// Exclusive, OS-arbitrated claims keyed by an opaque slot id.
pub trait RegistryApi: Send + Sync {
    /// Claim `combo` for `id`, replacing any claim `id` already holds.
    fn register(&self, id: u32, combo: Combo) -> Result<(), StrategyError>;
    /// Release the claim held by `id`. Idempotent.
    fn unregister(&self, id: u32);
}

// ---- Input tap ----

/// Passive, permission-gated observer for one combo at a time.
pub trait TapApi: Send + Sync {
    /// Whether the observer permission is granted.
    fn is_authorized(&self) -> bool;
    /// Ask for the permission; the answer may only change later.
    fn request_authorization(&self) -> bool;
    /// Start matching `combo`, replacing any running observer.
    fn start(&self, combo: Combo) -> Result<(), StrategyError>;
    /// Remove the observer. Idempotent.
    fn stop(&self);
}

#[cfg(target_os = "macos")]
pub use mac::{MacRegistry, MacTap, mac_backends};

#[cfg(target_os = "macos")]
mod mac {
    use std::sync::Arc;

    use crossbeam_channel::{Receiver, unbounded};
    use keycombo::Combo;
    use mac_hotkey::{Activation, InputTap, Registry};
    use tracing::warn;

    use super::{RegistryApi, TapApi};
    use crate::StrategyError;

    /// Carbon hot key registry.
    pub struct MacRegistry {
        /// Wrapped registry.
        inner: Registry,
    }

    impl RegistryApi for MacRegistry {
        fn register(&self, id: u32, combo: Combo) -> Result<(), StrategyError> {
            Ok(self.inner.register(id, combo)?)
        }

        fn unregister(&self, id: u32) {
            if let Err(e) = self.inner.unregister(id) {
                warn!(id, error = %e, "registry_unregister_failed");
            }
        }
    }

    /// CoreGraphics event tap.
    pub struct MacTap {
        /// Wrapped tap.
        inner: InputTap,
    }

    impl TapApi for MacTap {
        fn is_authorized(&self) -> bool {
            self.inner.is_authorized()
        }

        fn request_authorization(&self) -> bool {
            self.inner.request_authorization()
        }

        fn start(&self, combo: Combo) -> Result<(), StrategyError> {
            Ok(self.inner.start(combo)?)
        }

        fn stop(&self) {
            self.inner.stop();
        }
    }

    /// Build both OS backends sharing one activation queue.
    ///
    /// The receiver belongs to the main sequencing context; hand it to
    /// [`crate::Arbitrator::new`] together with the backends.
    pub fn mac_backends() -> (Arc<dyn RegistryApi>, Arc<dyn TapApi>, Receiver<Activation>) {
        let (tx, rx) = unbounded();
        let registry = MacRegistry {
            inner: Registry::new(tx.clone()),
        };
        let tap = MacTap {
            inner: InputTap::new(tx),
        };
        (Arc::new(registry), Arc::new(tap), rx)
    }
}
