/// Runtime limits and start-up options for a [`crate::LuaState`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmConfig {
    /// Free slots given to the root frame and to every host-function frame.
    pub min_stack: usize,
    /// Slots added on top of a Lua function's declared register count.
    pub frame_headroom: usize,
    /// Hard limit on the size of a single frame.
    pub max_stack_size: usize,
    /// Most frames in the call chain before `CallDepthExceeded`.
    pub max_call_depth: usize,
    /// Most nested [`crate::LuaState::call`] invocations, i.e. host functions
    /// calling back into the VM, before `NestedCallsExceeded`.
    pub max_nested_calls: usize,
    /// Register `print`, `type`, `pairs` and friends into the globals table.
    pub open_base_library: bool,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            min_stack: 20,
            frame_headroom: 20,
            max_stack_size: 1_000_000,
            max_call_depth: 200_000,
            max_nested_calls: 200,
            open_base_library: true,
        }
    }
}
