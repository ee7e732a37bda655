use std::ops::Range;
use std::sync::atomic::{AtomicU8, Ordering};

use crate::util::{Address, ObjectReference};

/// The region is in the collection set of the current cycle.
const IN_COLLECTION_SET: u8 = 0b01;
/// The region was the target of a bulk copy (clone) and must be rescanned.
const DIRTY: u8 = 0b10;

/// Per-region flags the barriers consult and update.
///
/// The heap is one contiguous, region-aligned range split into equally sized, power-of-two
/// regions.  The phase driver chooses the collection set (`add_to_collection_set`) and clears
/// it and the dirty flags at the end of a cycle; barriers only query collection-set membership
/// and set dirty flags.
pub struct RegionTable {
    heap_start: Address,
    log_bytes_in_region: usize,
    flags: Box<[AtomicU8]>,
}

impl RegionTable {
    pub fn new(heap_start: Address, heap_bytes: usize, log_bytes_in_region: usize) -> Self {
        let bytes_in_region = 1usize << log_bytes_in_region;
        assert!(
            heap_start.is_aligned_to(bytes_in_region),
            "heap start {} is not aligned to the region size {}",
            heap_start,
            bytes_in_region
        );
        let regions = heap_bytes.div_ceil(bytes_in_region);
        debug!(
            "RegionTable: {} regions of {} bytes from {}",
            regions, bytes_in_region, heap_start
        );
        Self {
            heap_start,
            log_bytes_in_region,
            flags: (0..regions).map(|_| AtomicU8::new(0)).collect(),
        }
    }

    /// The number of regions in the heap.
    pub fn regions(&self) -> usize {
        self.flags.len()
    }

    /// The size of a region in bytes.
    pub fn bytes_in_region(&self) -> usize {
        1 << self.log_bytes_in_region
    }

    /// The heap address range covered by the table.
    pub fn heap_range(&self) -> Range<Address> {
        self.heap_start..self.heap_start + (self.regions() << self.log_bytes_in_region)
    }

    /// Is `addr` inside the heap?
    pub fn contains(&self, addr: Address) -> bool {
        self.heap_range().contains(&addr)
    }

    /// The index of the region that contains `addr`.
    pub fn region_index(&self, addr: Address) -> usize {
        debug_assert!(
            self.contains(addr),
            "{} is outside the heap {:?}",
            addr,
            self.heap_range()
        );
        (addr - self.heap_start) >> self.log_bytes_in_region
    }

    /// The index of the region that contains `object`.
    pub fn region_of(&self, object: ObjectReference) -> usize {
        self.region_index(object.to_raw_address())
    }

    /// The first address of a region.
    pub fn region_start(&self, index: usize) -> Address {
        debug_assert!(index < self.regions());
        self.heap_start + (index << self.log_bytes_in_region)
    }

    fn flags_of(&self, index: usize) -> u8 {
        self.flags[index].load(Ordering::Acquire)
    }

    /// Is the region of `object` in the collection set?
    #[inline(always)]
    pub fn in_collection_set(&self, object: ObjectReference) -> bool {
        self.flags_of(self.region_of(object)) & IN_COLLECTION_SET != 0
    }

    /// Is the region `index` in the collection set?
    pub fn is_region_in_collection_set(&self, index: usize) -> bool {
        self.flags_of(index) & IN_COLLECTION_SET != 0
    }

    /// Add a region to the collection set.  Called by the phase driver before evacuation starts.
    pub fn add_to_collection_set(&self, index: usize) {
        debug!("Region {} added to the collection set", index);
        self.flags[index].fetch_or(IN_COLLECTION_SET, Ordering::Release);
    }

    /// Empty the collection set.
    pub fn clear_collection_set(&self) {
        for flags in self.flags.iter() {
            flags.fetch_and(!IN_COLLECTION_SET, Ordering::Release);
        }
    }

    /// Mark every region overlapping `range` as dirty.
    pub fn mark_dirty(&self, range: Range<Address>) {
        if range.is_empty() {
            return;
        }
        let first = self.region_index(range.start);
        let last = self.region_index(range.end - 1usize);
        for flags in &self.flags[first..=last] {
            if flags.load(Ordering::Relaxed) & DIRTY == 0 {
                flags.fetch_or(DIRTY, Ordering::Relaxed);
            }
        }
    }

    /// Is the region `index` dirty?
    pub fn is_dirty(&self, index: usize) -> bool {
        self.flags_of(index) & DIRTY != 0
    }

    /// Iterate the indices of dirty regions.
    pub fn dirty_regions(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.regions()).filter(move |i| self.is_dirty(*i))
    }

    /// Clear all dirty flags.  Called by the driver after it has rescanned the dirty regions.
    pub fn clear_dirty(&self) {
        for flags in self.flags.iter() {
            flags.fetch_and(!DIRTY, Ordering::Relaxed);
        }
    }
}
