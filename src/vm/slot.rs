//! This module provides the trait [`Slot`], which lets a runtime choose how object references
//! are encoded in heap slots, and [`SimpleSlot`], the encoding of a plain word-sized pointer.

use std::fmt::Debug;
use std::hash::Hash;

use atomic::Atomic;

use crate::util::constants::BYTES_IN_ADDRESS;
use crate::util::{Address, ObjectReference};

/// `Slot` is an abstraction for the barriers to load, store and atomically update object
/// references in memory.
///
/// A `Slot` value *points to* a slot, and is not the slot itself.  A `Slot` can be copied, and
/// the copy points to the same slot.
///
/// The runtime decides the encoding.  A runtime with full-width pointers can use
/// [`SimpleSlot`].  A runtime with compressed references implements `Slot` for a 32-bit slot
/// type, decoding in `load` and encoding in `store`; `BYTES` is then 4 and array copies step
/// through memory 4 bytes at a time.
///
/// Null is represented as `None` on both sides of the interface.  How null is encoded in memory
/// is up to the implementation.
///
/// The atomic operations (`swap`, `compare_exchange`) compare and exchange the *encoded*
/// values, i.e. physical identity.  Two aliases of the same logical object compare unequal here;
/// the barrier handles that.
///
/// # Performance notes
///
/// The methods of this trait are called on hot paths.  Please ensure they have high performance.
pub trait Slot: Copy + Send + Sync + Debug + PartialEq + Eq + Hash {
    /// The number of bytes a slot of this shape occupies.  Reference arrays are a dense sequence
    /// of slots of this size.
    const BYTES: usize;

    /// Create a slot that points to the given address.
    fn from_address(address: Address) -> Self;

    /// The address of the slot.  Used to find the region the slot belongs to.
    fn as_address(&self) -> Address;

    /// Load the object reference from the slot.
    fn load(&self) -> Option<ObjectReference>;

    /// Store an object reference (or null) into the slot.
    fn store(&self, object: Option<ObjectReference>);

    /// Atomically store `object` into the slot, returning the previous value.
    fn swap(&self, object: Option<ObjectReference>) -> Option<ObjectReference>;

    /// Atomically store `new` into the slot if it holds `current`.
    ///
    /// Returns `Ok(previous)` if the value was replaced, or `Err(observed)` with the value the
    /// slot held instead.
    fn compare_exchange(
        &self,
        current: Option<ObjectReference>,
        new: Option<ObjectReference>,
    ) -> Result<Option<ObjectReference>, Option<ObjectReference>>;
}

/// A simple slot implementation that represents a word-sized slot which holds the raw address of
/// an `ObjectReference`, or 0 if it is holding a null reference.
///
/// It is the default slot type, and should be suitable for most runtimes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct SimpleSlot {
    slot_addr: *mut Atomic<Address>,
}

impl SimpleSlot {
    fn word(&self) -> &Atomic<Address> {
        unsafe { &*self.slot_addr }
    }

    fn encode(object: Option<ObjectReference>) -> Address {
        object.map_or(Address::ZERO, |o| o.to_raw_address())
    }
}

unsafe impl Send for SimpleSlot {}
unsafe impl Sync for SimpleSlot {}

// Stores publish the stored reference with release semantics so that a thread that loads the
// reference also sees the contents of an object that was evacuated just before.
impl Slot for SimpleSlot {
    const BYTES: usize = BYTES_IN_ADDRESS;

    fn from_address(address: Address) -> Self {
        debug_assert!(address.is_aligned_to(Self::BYTES), "unaligned slot {}", address);
        Self {
            slot_addr: address.to_mut_ptr(),
        }
    }

    fn as_address(&self) -> Address {
        Address::from_mut_ptr(self.slot_addr)
    }

    fn load(&self) -> Option<ObjectReference> {
        ObjectReference::from_raw_address(self.word().load(atomic::Ordering::Acquire))
    }

    fn store(&self, object: Option<ObjectReference>) {
        self.word()
            .store(Self::encode(object), atomic::Ordering::Release)
    }

    fn swap(&self, object: Option<ObjectReference>) -> Option<ObjectReference> {
        let old = self
            .word()
            .swap(Self::encode(object), atomic::Ordering::AcqRel);
        ObjectReference::from_raw_address(old)
    }

    fn compare_exchange(
        &self,
        current: Option<ObjectReference>,
        new: Option<ObjectReference>,
    ) -> Result<Option<ObjectReference>, Option<ObjectReference>> {
        self.word()
            .compare_exchange(
                Self::encode(current),
                Self::encode(new),
                atomic::Ordering::AcqRel,
                atomic::Ordering::Acquire,
            )
            .map(ObjectReference::from_raw_address)
            .map_err(ObjectReference::from_raw_address)
    }
}

static_assertions::assert_eq_size!(SimpleSlot, *mut u8);

#[cfg(test)]
mod tests {
    use super::*;

    fn object(raw: usize) -> ObjectReference {
        ObjectReference::from_raw_address(unsafe { Address::from_usize(raw) }).unwrap()
    }

    #[test]
    fn load_and_store_null() {
        let word = Atomic::new(Address::ZERO);
        let slot = SimpleSlot::from_address(Address::from_ref(&word));
        assert_eq!(slot.load(), None);
        slot.store(Some(object(0x1000)));
        assert_eq!(slot.load(), Some(object(0x1000)));
        slot.store(None);
        assert_eq!(slot.load(), None);
        assert_eq!(slot.as_address(), Address::from_ref(&word));
    }

    #[test]
    fn swap_returns_previous() {
        let word = Atomic::new(Address::ZERO);
        let slot = SimpleSlot::from_address(Address::from_ref(&word));
        assert_eq!(slot.swap(Some(object(0x2000))), None);
        assert_eq!(slot.swap(Some(object(0x3000))), Some(object(0x2000)));
        assert_eq!(slot.load(), Some(object(0x3000)));
    }

    #[test]
    fn compare_exchange_compares_physical_values() {
        let word = Atomic::new(Address::ZERO);
        let slot = SimpleSlot::from_address(Address::from_ref(&word));
        assert_eq!(slot.compare_exchange(None, Some(object(0x1000))), Ok(None));
        assert_eq!(
            slot.compare_exchange(Some(object(0x2000)), None),
            Err(Some(object(0x1000)))
        );
        assert_eq!(
            slot.compare_exchange(Some(object(0x1000)), Some(object(0x2000))),
            Ok(Some(object(0x1000)))
        );
        assert_eq!(slot.load(), Some(object(0x2000)));
    }
}
