//! Observation points for embedding and testing.
//!
//! Every callback is a no-op by default, mirroring how Cranelift's
//! `FuncEnvironment` trait methods default to returning nothing interesting:
//! an embedder overrides only the phase transitions it cares about (IR
//! dumping, round-trip testing) without having to stub out the rest.

use crate::ir::{IrContext, MethodId};

/// Phase-transition callbacks fired by [`crate::backend::Backend::compile`].
///
/// All four methods take `&self`. A hook is expected to be a thin wrapper
/// over interior-mutable state (a `Mutex<Vec<_>>` recorder, a logger handle)
/// since the orchestrator holds it behind a shared reference for the
/// duration of one compile.
pub trait Hook {
    /// Fired right after the frontend produced an IR method in the main
    /// context, before anything is imported into the kernel context.
    fn finished_code_generation(&self, _main_context: &IrContext, _method: MethodId) {}

    /// Fired when the frontend phase itself faulted, before any kernel
    /// context exists. Distinguished from [`Hook::finished_code_generation`]
    /// so an embedder can tell "produced IR, then later failed" apart from
    /// "never produced IR at all" without inspecting the propagated error.
    fn finished_code_generation_failed(&self, _error: &crate::error::CompileError) {}

    /// Fired after the kernel method and its reachable subgraph were
    /// imported into a fresh kernel context, before any transformer runs.
    fn initialized_kernel_context(&self, _kernel_context: &IrContext, _method: MethodId) {}

    /// Fired after every transformer in the pipeline has run to completion
    /// against the kernel context.
    fn optimized_kernel_context(&self, _kernel_context: &IrContext, _method: MethodId) {}
}

/// The default hook: observes nothing, costs nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullHook;

impl Hook for NullHook {}
