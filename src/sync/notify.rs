//! User-facing notices raised by the queue.

use colored::Colorize;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Something the operator should see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    /// Connectivity came back
    Online,
    /// Connectivity was lost; writes are being buffered
    Offline,
    /// A replay pass confirmed `count` operations
    Synced { count: usize },
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Online => f.write_str("Connection restored"),
            Self::Offline => f.write_str("Offline mode: changes will sync later"),
            Self::Synced { count } => write!(f, "{count} operation(s) synchronized"),
        }
    }
}

/// Sink for [`Notice`]s.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Logs notices through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        match notice {
            Notice::Offline => warn!("{notice}"),
            Notice::Online | Notice::Synced { .. } => info!("{notice}"),
        }
    }
}

/// Prints notices to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, notice: Notice) {
        let line = match notice {
            Notice::Online => format!("📶 {}", notice.to_string().green()),
            Notice::Offline => format!("📴 {}", notice.to_string().yellow()),
            Notice::Synced { .. } => format!("✅ {}", notice.to_string().green()),
        };
        eprintln!("{line}");
    }
}

/// Forwards notices over a channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<Notice>,
}

impl ChannelNotifier {
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Notice>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, notice: Notice) {
        // Receiver gone means nobody is watching any more
        let _ = self.tx.send(notice);
    }
}
