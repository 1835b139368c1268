//! Debouncing of rename notifications.
//!
//! Hosts tend to report one rename as several overlapping events (a move
//! event plus a generic change event, for instance). Each would trigger a
//! full corpus rewrite and double-log the outcome. The guard admits the
//! first notification for a given identity transition and rejects repeats
//! inside a short window.
//!
//! Guard state is an explicit instance owned by whoever issues rewrite
//! calls; it is advisory, not authoritative. A missing entry never blocks a
//! legitimate rewrite, it only fails to suppress a near-duplicate one.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::corpus::AssetId;

/// Entries older than this are pruned lazily on each check.
pub const PRUNE_AFTER: Duration = Duration::from_secs(5);
/// A transition admitted this recently is treated as already processed.
pub const REJECT_WITHIN: Duration = Duration::from_secs(2);

/// One observed rename of an asset, as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameTransition {
    pub old: AssetId,
    pub new: AssetId,
    /// The display name the asset carried before the rename (its file name).
    pub old_name: String,
    pub new_name: String,
    pub observed_at: Instant,
}

impl RenameTransition {
    pub fn new(old: AssetId, new: AssetId) -> RenameTransition {
        let old_name = old.file_name().unwrap_or_default().to_string();
        let new_name = new.file_name().unwrap_or_default().to_string();
        RenameTransition {
            old,
            new,
            old_name,
            new_name,
            observed_at: Instant::now(),
        }
    }
}

#[derive(Debug, Default)]
pub struct RenameGuard {
    recent: HashMap<(AssetId, AssetId), Instant>,
}

impl RenameGuard {
    pub fn new() -> RenameGuard {
        RenameGuard::default()
    }

    /// Admits or rejects a transition observed now. `false` means a rewrite
    /// for this exact transition already ran moments ago and the caller must
    /// not run another.
    pub fn admit(&mut self, old: &AssetId, new: &AssetId) -> bool {
        self.admit_at(old, new, Instant::now())
    }

    /// Clock-injected form of [`RenameGuard::admit`].
    pub fn admit_at(&mut self, old: &AssetId, new: &AssetId, now: Instant) -> bool {
        self.recent
            .retain(|_, admitted| now.saturating_duration_since(*admitted) <= PRUNE_AFTER);

        let key = (old.clone(), new.clone());
        if let Some(admitted) = self.recent.get(&key) {
            if now.saturating_duration_since(*admitted) < REJECT_WITHIN {
                return false;
            }
        }

        self.recent.insert(key, now);
        true
    }

    /// Number of transitions currently remembered.
    pub fn tracked(&self) -> usize {
        self.recent.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids() -> (AssetId, AssetId) {
        (AssetId::new("photo.png"), AssetId::new("vacation/photo2.png"))
    }

    #[test]
    fn second_notification_within_window_is_rejected() {
        let (old, new) = ids();
        let mut guard = RenameGuard::new();
        let base = Instant::now();

        assert!(guard.admit_at(&old, &new, base));
        // 500ms later: the overlapping duplicate event
        assert!(!guard.admit_at(&old, &new, base + Duration::from_millis(500)));
    }

    #[test]
    fn same_transition_is_admitted_again_after_the_window() {
        let (old, new) = ids();
        let mut guard = RenameGuard::new();
        let base = Instant::now();

        assert!(guard.admit_at(&old, &new, base));
        assert!(guard.admit_at(&old, &new, base + Duration::from_millis(2500)));
    }

    #[test]
    fn distinct_transitions_do_not_interfere() {
        let (old, new) = ids();
        let other = AssetId::new("other.png");
        let mut guard = RenameGuard::new();
        let base = Instant::now();

        assert!(guard.admit_at(&old, &new, base));
        assert!(guard.admit_at(&old, &other, base));
        assert!(guard.admit_at(&new, &old, base), "reverse direction is a different key");
    }

    #[test]
    fn stale_entries_are_pruned_on_check() {
        let (old, new) = ids();
        let other = AssetId::new("other.png");
        let mut guard = RenameGuard::new();
        let base = Instant::now();

        guard.admit_at(&old, &new, base);
        assert_eq!(guard.tracked(), 1);

        // 6s later another transition arrives; the stale entry is swept.
        guard.admit_at(&old, &other, base + Duration::from_secs(6));
        assert_eq!(guard.tracked(), 1);
    }

    #[test]
    fn transition_carries_display_names() {
        let (old, new) = ids();
        let transition = RenameTransition::new(old, new);
        assert_eq!(transition.old_name, "photo.png");
        assert_eq!(transition.new_name, "photo2.png");
    }
}
