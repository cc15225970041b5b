//! Per-controller set of ignored volumes.

use std::collections::BTreeSet;

use crate::collision::VolumeId;

/// Volumes excluded from sweep hits and penetration correction.
///
/// Membership only changes through explicit calls; nothing clears it
/// automatically.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IgnoreSet {
    volumes: BTreeSet<VolumeId>,
}

impl IgnoreSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or remove a volume. Repeated calls with the same arguments are
    /// no-ops. Returns whether membership changed.
    pub fn set(&mut self, volume: VolumeId, ignore: bool) -> bool {
        if ignore {
            self.volumes.insert(volume)
        } else {
            self.volumes.remove(&volume)
        }
    }

    #[inline]
    pub fn contains(&self, volume: VolumeId) -> bool {
        self.volumes.contains(&volume)
    }

    pub fn len(&self) -> usize {
        self.volumes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.volumes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = VolumeId> + '_ {
        self.volumes.iter().copied()
    }
}
