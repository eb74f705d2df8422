//! Outbound path rotation.
//!
//! The rotator is shared by every fetch in the process. Its cursor only moves
//! forward; there is no rollback.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Round-robin selector over the configured proxies.
///
/// With no proxies configured every request goes direct, but rotations are
/// still counted so callers can observe them.
#[derive(Debug, Default)]
pub struct EgressRotator {
    proxies: Vec<String>,
    cursor: AtomicUsize,
}

impl EgressRotator {
    pub fn new(proxies: Vec<String>) -> Self {
        Self {
            proxies,
            cursor: AtomicUsize::new(0),
        }
    }

    pub fn direct() -> Self {
        Self::new(Vec::new())
    }

    /// Proxy the next request should use, or `None` for a direct connection.
    pub fn current(&self) -> Option<&str> {
        if self.proxies.is_empty() {
            return None;
        }
        let idx = self.cursor.load(Ordering::SeqCst) % self.proxies.len();
        Some(self.proxies[idx].as_str())
    }

    /// Advance to the next proxy.
    pub fn rotate(&self) {
        let next = self.cursor.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!(rotations = next, proxy = ?self.current(), "egress rotated");
    }

    /// Total number of rotations since construction.
    pub fn rotations(&self) -> usize {
        self.cursor.load(Ordering::SeqCst)
    }
}
