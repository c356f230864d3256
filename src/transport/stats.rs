use std::sync::atomic::{AtomicU64, Ordering};

/// Per-connection counters, bumped by the read and write tasks.
#[derive(Debug, Default)]
pub struct NetStats {
    packets_sent: AtomicU64,
    packets_resent: AtomicU64,
    packets_received: AtomicU64,
    duplicates_received: AtomicU64,
    invalid_received: AtomicU64,
    unreliable_skipped: AtomicU64,
    unreliable_stale: AtomicU64,
    inbound_overflow: AtomicU64,
}

/// Point-in-time copy of [`NetStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Datagrams written, including ACKs and retransmits.
    pub packets_sent: u64,
    /// Reliable fragments sent again after a timeout.
    pub packets_resent: u64,
    pub packets_received: u64,
    /// Reliable fragments that had already been received.
    pub duplicates_received: u64,
    /// Datagrams discarded for bad framing.
    pub invalid_received: u64,
    /// Unreliable sequence numbers that never arrived.
    pub unreliable_skipped: u64,
    /// Unreliable datagrams older than one already delivered.
    pub unreliable_stale: u64,
    /// Payloads (or final fragments) refused because the inbound queue was full.
    pub inbound_overflow: u64,
}

fn bump(counter: &AtomicU64, by: u64) {
    counter.fetch_add(by, Ordering::Relaxed);
}

impl NetStats {
    pub(crate) fn sent(&self) {
        bump(&self.packets_sent, 1);
    }

    pub(crate) fn resent(&self) {
        bump(&self.packets_resent, 1);
    }

    pub(crate) fn received(&self) {
        bump(&self.packets_received, 1);
    }

    pub(crate) fn duplicate(&self) {
        bump(&self.duplicates_received, 1);
    }

    pub(crate) fn invalid(&self) {
        bump(&self.invalid_received, 1);
    }

    pub(crate) fn skipped(&self, count: u32) {
        bump(&self.unreliable_skipped, u64::from(count));
    }

    pub(crate) fn stale(&self) {
        bump(&self.unreliable_stale, 1);
    }

    pub(crate) fn overflow(&self) {
        bump(&self.inbound_overflow, 1);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            packets_sent: self.packets_sent.load(Ordering::Relaxed),
            packets_resent: self.packets_resent.load(Ordering::Relaxed),
            packets_received: self.packets_received.load(Ordering::Relaxed),
            duplicates_received: self.duplicates_received.load(Ordering::Relaxed),
            invalid_received: self.invalid_received.load(Ordering::Relaxed),
            unreliable_skipped: self.unreliable_skipped.load(Ordering::Relaxed),
            unreliable_stale: self.unreliable_stale.load(Ordering::Relaxed),
            inbound_overflow: self.inbound_overflow.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_counters() {
        let stats = NetStats::default();
        stats.sent();
        stats.sent();
        stats.skipped(3);
        let snap = stats.snapshot();
        assert_eq!(snap.packets_sent, 2);
        assert_eq!(snap.unreliable_skipped, 3);
        assert_eq!(snap.packets_resent, 0);
    }
}
