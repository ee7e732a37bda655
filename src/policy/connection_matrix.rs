use std::sync::atomic::{AtomicU8, Ordering};

/// A square matrix of region-to-region connections.
///
/// `is_connected(from, to)` says that some slot in region `from` was seen to hold a reference
/// into region `to`.  Barriers only ever set entries.  The phase driver reads the entries of a
/// destination region (`sources_of`) to find the regions it has to scan, and clears them.
///
/// The entries of one destination are contiguous, so `sources_of` scans one row.
pub struct ConnectionMatrix {
    stride: usize,
    entries: Box<[AtomicU8]>,
}

impl ConnectionMatrix {
    pub fn new(regions: usize) -> Self {
        debug!("ConnectionMatrix: {}x{}", regions, regions);
        Self {
            stride: regions,
            entries: (0..regions * regions).map(|_| AtomicU8::new(0)).collect(),
        }
    }

    pub fn regions(&self) -> usize {
        self.stride
    }

    #[inline(always)]
    fn entry(&self, from: usize, to: usize) -> &AtomicU8 {
        debug_assert!(
            from < self.stride && to < self.stride,
            "region pair ({}, {}) is out of range for {} regions",
            from,
            to,
            self.stride
        );
        &self.entries[to * self.stride + from]
    }

    /// Record that region `from` references region `to`.  Returns `true` if the entry was not
    /// set before.
    #[inline(always)]
    pub fn set_connected(&self, from: usize, to: usize) -> bool {
        let entry = self.entry(from, to);
        // Entries are set by many threads; avoid writing the cache line when already set.
        if entry.load(Ordering::Relaxed) == 0 {
            entry.store(1, Ordering::Relaxed);
            true
        } else {
            false
        }
    }

    pub fn is_connected(&self, from: usize, to: usize) -> bool {
        self.entry(from, to).load(Ordering::Relaxed) != 0
    }

    /// Iterate the regions that reference region `to`.
    pub fn sources_of(&self, to: usize) -> impl Iterator<Item = usize> + '_ {
        let row = &self.entries[to * self.stride..(to + 1) * self.stride];
        row.iter()
            .enumerate()
            .filter(|(_, entry)| entry.load(Ordering::Relaxed) != 0)
            .map(|(from, _)| from)
    }

    /// Forget every connection into region `to`.
    pub fn clear_region(&self, to: usize) {
        for entry in &self.entries[to * self.stride..(to + 1) * self.stride] {
            entry.store(0, Ordering::Relaxed);
        }
    }

    pub fn clear_all(&self) {
        for entry in self.entries.iter() {
            entry.store(0, Ordering::Relaxed);
        }
    }
}
