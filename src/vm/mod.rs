//! The interface between the barrier layer and the language runtime.
//!
//! A runtime implements [`VMBinding`], choosing an [`ObjectModel`] that knows where each
//! object's forwarding pointer lives, how large an object is, how to copy it and how to check
//! an object against an array's element type, and a [`Slot`] type that knows how references are
//! encoded in memory (full-width, compressed, ...).

mod object_model;
pub mod slot;

pub use self::object_model::ObjectModel;
pub use self::slot::SimpleSlot;
pub use self::slot::Slot;

/// Default min alignment 8 bytes
const DEFAULT_LOG_MIN_ALIGNMENT: usize = 3;

/// The `VMBinding` trait associates the runtime-specific types, and provides runtime-specific
/// constants.
pub trait VMBinding
where
    Self: Sized + 'static + Send + Sync + Default,
{
    /// The object model of this runtime.
    type VMObjectModel: ObjectModel<Self>;
    /// The type of reference slots in this runtime.
    type VMSlot: Slot;

    /// Allowed minimal alignment in bytes for evacuation copies.
    const MIN_ALIGNMENT: usize = 1 << DEFAULT_LOG_MIN_ALIGNMENT;
}
