//! Forwarding pointers.
//!
//! Each object has one forwarding pointer word (see [`crate::vm::ObjectModel`]).  The word holds
//! the object itself until the object is evacuated, and the reference of the canonical copy
//! afterwards.  Within a collection cycle the word changes at most once, from self to copy,
//! through [`attempt_to_forward`].  This is what makes a single load in [`resolve_forwarded`]
//! sufficient: whatever value a thread sees is either the object itself or its final location.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::util::{Address, ObjectReference};
use crate::vm::ObjectModel;
use crate::vm::VMBinding;

fn forwarding_word<VM: VMBinding>(object: ObjectReference) -> Address {
    VM::VMObjectModel::ref_to_forwarding_pointer(object)
}

/// Return the current location of `object`, or `None` for a null reference.
#[inline(always)]
pub fn resolve_forwarded<VM: VMBinding>(object: Option<ObjectReference>) -> Option<ObjectReference> {
    object.map(resolve_forwarded_not_null::<VM>)
}

/// Return the current location of `object`.
///
/// This is one acquire load of the forwarding pointer word.  It pairs with the release in
/// [`attempt_to_forward`], so a thread that observes the copy also observes its contents.
#[inline(always)]
pub fn resolve_forwarded_not_null<VM: VMBinding>(object: ObjectReference) -> ObjectReference {
    let raw = unsafe { forwarding_word::<VM>(object).atomic_load::<AtomicUsize>(Ordering::Acquire) };
    debug_assert!(
        raw != 0,
        "forwarding pointer of {} is not initialized",
        object
    );
    unsafe { ObjectReference::from_raw_address_unchecked(Address::from_usize(raw)) }
}

/// Has `object` been evacuated?
pub fn is_forwarded<VM: VMBinding>(object: ObjectReference) -> bool {
    resolve_forwarded_not_null::<VM>(object) != object
}

/// Make the forwarding pointer of `object` point to the object itself.
///
/// This is used on evacuation copies before they are published, and by the runtime on new
/// objects and when a cycle ends.
pub fn initialize_forwarding_pointer<VM: VMBinding>(object: ObjectReference) {
    trace!("initialize_forwarding_pointer({})", object);
    unsafe {
        forwarding_word::<VM>(object).atomic_store::<AtomicUsize>(object.value(), Ordering::Release)
    }
}

/// Attempt to install `copy` as the forwarding target of `object`.
///
/// The compare-and-swap expects the self-referential value, so only the first thread to
/// forward the object succeeds.  Returns `Ok(())` if this thread installed `copy`, or
/// `Err(winner)` with the copy installed by another thread.
pub fn attempt_to_forward<VM: VMBinding>(
    object: ObjectReference,
    copy: ObjectReference,
) -> Result<(), ObjectReference> {
    debug_assert_ne!(object, copy, "an object cannot be forwarded to itself");
    let result = unsafe {
        forwarding_word::<VM>(object).compare_exchange::<AtomicUsize>(
            object.value(),
            copy.value(),
            Ordering::AcqRel,
            Ordering::Acquire,
        )
    };
    match result {
        Ok(_) => {
            trace!("forwarded {} -> {}", object, copy);
            Ok(())
        }
        Err(winner) => {
            debug_assert_ne!(winner, object.value());
            trace!(
                "lost forwarding race for {}, winner is {:#x}",
                object,
                winner
            );
            Err(unsafe { ObjectReference::from_raw_address_unchecked(Address::from_usize(winner)) })
        }
    }
}
