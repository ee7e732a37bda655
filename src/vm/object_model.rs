use std::fmt::Debug;

use crate::util::{Address, ByteOffset, ObjectReference};
use crate::vm::VMBinding;

/// The object model tells the barrier layer how objects are laid out.
///
/// # Forwarding pointer
///
/// Every object carries one word that holds its forwarding pointer.  The word sits at a fixed
/// offset from the object reference ([`ObjectModel::FORWARDING_POINTER_OFFSET`]), usually
/// immediately before the header, so that it can be reached with one load and without decoding
/// the header.  For an object that has not moved, the word holds the object's own reference.
/// For an evacuated object, it holds the reference of the copy.  The runtime must initialise
/// the word of every new object to the object itself (see
/// [`crate::util::object_forwarding::initialize_forwarding_pointer`]).
///
/// # Copying
///
/// Evacuation needs three things from the object model: how many bytes to allocate
/// ([`ObjectModel::get_size_when_copied`]), with what alignment
/// ([`ObjectModel::get_align_when_copied`]), and how to copy the object into the allocated
/// memory ([`ObjectModel::copy_to`]).  The returned reference of the copy must be such that its
/// forwarding pointer word lies inside the allocated range.
///
/// # Element type checks
///
/// Array stores in some languages are covariant and need a per-element check.  The object
/// model names the type bound of an array's elements ([`ObjectModel::TypeBound`]), returns it for
/// a given array, and answers whether an object conforms to it.
pub trait ObjectModel<VM: VMBinding> {
    /// Offset of the forwarding pointer word from the object reference.
    const FORWARDING_POINTER_OFFSET: ByteOffset;

    /// The element type of a reference array, as needed by the covariance check.
    type TypeBound: Copy + Debug + Send + Sync;

    /// Return the size used by an object, in bytes, starting at
    /// [`ObjectModel::ref_to_object_start`].
    fn get_current_size(object: ObjectReference) -> usize;

    /// Return the size an object needs when it is copied.  This includes the forwarding pointer
    /// word.
    fn get_size_when_copied(object: ObjectReference) -> usize;

    /// Return the alignment requirement for a copy of this object.
    fn get_align_when_copied(object: ObjectReference) -> usize;

    /// Copy an object into `to`, which points to `get_size_when_copied(from)` bytes of freshly
    /// allocated memory, and return the reference of the copy.
    ///
    /// The copy must not be visible to other threads until its reference is published by the
    /// barrier.  The forwarding pointer word of the copy is initialised by the barrier after this
    /// returns.
    fn copy_to(from: ObjectReference, to: Address) -> ObjectReference;

    /// Return the lowest address of the storage associated with an object.
    fn ref_to_object_start(object: ObjectReference) -> Address;

    /// Return the element type bound of a reference array.
    fn array_element_bound(array: ObjectReference) -> Self::TypeBound;

    /// Is `object` an instance of `bound`?
    fn is_instance_of(object: ObjectReference, bound: Self::TypeBound) -> bool;

    /// Return the address of the forwarding pointer word of an object.
    fn ref_to_forwarding_pointer(object: ObjectReference) -> Address {
        object.to_raw_address() + Self::FORWARDING_POINTER_OFFSET
    }

    /// Return the address just past the storage of an object.
    fn get_object_end_address(object: ObjectReference) -> Address {
        Self::ref_to_object_start(object) + Self::get_current_size(object)
    }
}
