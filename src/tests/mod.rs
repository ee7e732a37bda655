// Scenario tests that run the barriers against `MockVM` and a real mock heap.
//
// Every test creates its own `MockEnv` (a leaked heap and barrier set), so tests in this module
// can run in parallel.  Tests that set environment variables must use `serial_test`.

pub(crate) mod mock_test_prelude {
    pub use crate::memory_manager;
    pub use crate::plan::{ArraySlice, ArrayStoreError, StoreValMode};
    pub use crate::util::object_forwarding;
    pub use crate::util::test_util::mock_vm::*;
    pub use crate::util::{Address, ObjectReference};
    pub use crate::vm::*;
    pub use crate::GcPhase;
    pub use crate::Mutator;
}

mod mock_test_clone;
mod mock_test_store_barrier;
