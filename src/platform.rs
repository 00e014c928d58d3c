//! Target platform, backend kind, and launch-time specialization hints.
//!
//! None of this module executes anything: it is pure description consumed by
//! [`crate::abi::Abi`] and passed through to the concrete [`CodeGeneratorBackend`]
//! implementation for target metadata.
//!
//! [`CodeGeneratorBackend`]: crate::codegen::CodeGeneratorBackend

/// Pointer width a kernel is compiled for.
///
/// Resolved from the host architecture via [`TargetPlatform::host`], which
/// mirrors the `{X86, Arm -> 32-bit; X64, Arm64, Wasm -> 64-bit}` lookup
/// table built on top of `target-lexicon`'s
/// architecture enumeration rather than hand-rolling a `cfg!` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetPlatform {
    /// 32-bit pointers, 4-byte natural alignment ceiling for scalar types.
    Platform32Bit,
    /// 64-bit pointers.
    Platform64Bit,
}

impl TargetPlatform {
    /// Classify the process's own architecture the way a
    /// architecture lookup table does.
    pub fn host() -> Self {
        use target_lexicon::Architecture;
        match target_lexicon::HOST.architecture {
            Architecture::X86_32(_) | Architecture::Arm(_) => Self::Platform32Bit,
            _ => Self::Platform64Bit,
        }
    }

    /// Native pointer size in bytes for this platform.
    pub fn pointer_size(self) -> u32 {
        match self {
            Self::Platform32Bit => 4,
            Self::Platform64Bit => 8,
        }
    }
}

/// Concrete code-generation target. Only `Ptx` and `OpenCl` emit device text;
/// `Il` is a host-executed interpreter stub used for testing the pipeline
/// without a real device backend, and `Velocity` is reserved for a managed
/// in-process vector backend (out of scope for emission, but a valid
/// [`BackendType`] so hooks and diagnostics can name it).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendType {
    /// Host byte-code interpreter stub.
    Il,
    /// NVIDIA PTX assembly text.
    Ptx,
    /// OpenCL C source text.
    OpenCl,
    /// In-process vectorized interpreter.
    Velocity,
}

/// Launch-time hints attached to the compiled artifact as target metadata.
///
/// Both fields are optional and implicit: omitting them means "let the
/// target decide" via `KernelSpecialization`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct KernelSpecialization {
    /// Upper bound on threads per thread group, if the caller wants to pin
    /// it (otherwise the target chooses based on register pressure).
    pub max_threads_per_group: Option<u32>,
    /// Minimum number of resident groups per multiprocessor the caller
    /// wants the target to plan occupancy for.
    pub min_groups_per_multiprocessor: Option<u32>,
}

/// Compiler-wide knobs threaded into [`crate::backend::Backend::new`].
///
/// This is the crate's "configuration" surface: there are no environment
/// variables and no config files anywhere in this core, by design (see the
/// embedder's external interface): an embedder constructs one of these and
/// passes it in, just like Cranelift's `Flags`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompilerOptions {
    /// Target platform for ABI layout decisions.
    pub platform: TargetPlatform,
    /// Concrete code-generation target.
    pub backend_type: BackendType,
    /// Upper bound on intrinsic-specialization fixpoint passes (see
    /// [`crate::pipeline::TransformerPipeline`]). The loop always runs at
    /// least twice even if the first pass rewrites nothing.
    pub max_intrinsic_passes: u32,
    /// Whether the orchestrator should assert structural invariants (block
    /// reachability, phi arity) after each transformer pass. Disabling this
    /// trades safety for throughput in a release embedding: debug-only
    /// `DebugAssert` nodes are eliminated once at the end of the run instead
    /// of being checked after every pass.
    pub verify_after_each_pass: bool,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            platform: TargetPlatform::host(),
            backend_type: BackendType::Ptx,
            max_intrinsic_passes: 8,
            verify_after_each_pass: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pointer_size_matches_platform() {
        assert_eq!(TargetPlatform::Platform32Bit.pointer_size(), 4);
        assert_eq!(TargetPlatform::Platform64Bit.pointer_size(), 8);
    }

    #[test]
    fn default_options_run_at_least_two_intrinsic_passes() {
        let opts = CompilerOptions::default();
        assert!(opts.max_intrinsic_passes >= 2);
    }
}
