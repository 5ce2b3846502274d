//! Arbitration status and its broadcast channel.

use std::fmt;

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::{debug, trace};

/// Which backend delivers the shortcut.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// OS-arbitrated exclusive claim.
    ExclusiveRegistry,
    /// Passive observer of every key event.
    InputTap,
}

/// State of the flagship (overlay) shortcut.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Status {
    /// Nothing is armed.
    #[default]
    Inactive,
    /// Armed through the given strategy.
    Active(Strategy),
    /// Another listener owns the combination.
    Conflict,
    /// The input tap lacks its permission.
    PermissionDenied,
    /// Unexpected OS failure.
    Error(String),
}

/// Presentation hint for a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    /// Working.
    Ok,
    /// Broken until the user picks another combo.
    Danger,
    /// Broken until the user grants a permission.
    Warning,
    /// Nothing to report.
    Neutral,
}

impl Status {
    /// Whether a shortcut is armed.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active(_))
    }

    /// Short human-readable description.
    pub fn summary(&self) -> String {
        match self {
            Self::Inactive => "Not registered".into(),
            Self::Active(Strategy::ExclusiveRegistry) => "Active (system hotkey)".into(),
            Self::Active(Strategy::InputTap) => "Active (event tap)".into(),
            Self::Conflict => "Conflict: owned by another app".into(),
            Self::PermissionDenied => "Needs Input Monitoring permission".into(),
            Self::Error(m) => format!("Error: {m}"),
        }
    }

    /// How the UI should color [`Self::summary`].
    pub fn tone(&self) -> Tone {
        match self {
            Self::Active(_) => Tone::Ok,
            Self::Conflict => Tone::Danger,
            Self::PermissionDenied => Tone::Warning,
            Self::Inactive | Self::Error(_) => Tone::Neutral,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

/// Ordered status broadcast.
///
/// Subscribers get the current value first, then every distinct change in
/// the order it happened. Setting the value it already holds sends nothing.
#[derive(Default)]
pub struct StatusChannel {
    /// Current value.
    current: Status,
    /// Live subscribers; closed ones are pruned on the next send.
    subscribers: Vec<UnboundedSender<Status>>,
}

impl StatusChannel {
    /// Current value.
    pub fn get(&self) -> &Status {
        &self.current
    }

    /// Subscribe; the receiver immediately holds the current value.
    pub fn subscribe(&mut self) -> UnboundedReceiver<Status> {
        let (tx, rx) = unbounded_channel();
        if tx.send(self.current.clone()).is_ok() {
            self.subscribers.push(tx);
        }
        rx
    }

    /// Store `status` and broadcast it if it differs from the current value.
    /// Returns whether anything changed.
    pub fn set(&mut self, status: Status) -> bool {
        if self.current == status {
            trace!(status = ?status, "status_unchanged");
            return false;
        }
        debug!(from = ?self.current, to = ?status, "status_changed");
        self.current = status;
        let current = &self.current;
        self.subscribers.retain(|tx| tx.send(current.clone()).is_ok());
        true
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(rx: &mut UnboundedReceiver<Status>) -> Vec<Status> {
        let mut out = Vec::new();
        while let Ok(s) = rx.try_recv() {
            out.push(s);
        }
        out
    }

    #[test]
    fn subscribe_delivers_current_then_changes_in_order() {
        let mut ch = StatusChannel::default();
        ch.set(Status::Conflict);
        let mut rx = ch.subscribe();
        ch.set(Status::PermissionDenied);
        ch.set(Status::Active(Strategy::InputTap));
        assert_eq!(
            drain(&mut rx),
            vec![
                Status::Conflict,
                Status::PermissionDenied,
                Status::Active(Strategy::InputTap)
            ]
        );
    }

    #[test]
    fn identical_values_are_not_rebroadcast() {
        let mut ch = StatusChannel::default();
        let mut rx = ch.subscribe();
        assert!(!ch.set(Status::Inactive));
        assert!(ch.set(Status::Conflict));
        assert!(!ch.set(Status::Conflict));
        assert_eq!(drain(&mut rx), vec![Status::Inactive, Status::Conflict]);
    }

    #[test]
    fn closed_subscribers_are_pruned() {
        let mut ch = StatusChannel::default();
        let rx = ch.subscribe();
        let _keep = ch.subscribe();
        drop(rx);
        ch.set(Status::Conflict);
        assert_eq!(ch.subscriber_count(), 1);
    }

    #[test]
    fn summaries_and_tones() {
        assert_eq!(
            Status::Active(Strategy::InputTap).summary(),
            "Active (event tap)"
        );
        assert_eq!(Status::Error("boom".into()).summary(), "Error: boom");
        assert_eq!(Status::Active(Strategy::ExclusiveRegistry).tone(), Tone::Ok);
        assert_eq!(Status::Conflict.tone(), Tone::Danger);
        assert_eq!(Status::PermissionDenied.tone(), Tone::Warning);
        assert_eq!(Status::Inactive.tone(), Tone::Neutral);
    }
}
