//! Kernelforge is the SSA-IR compilation core that sits between a language
//! frontend (whatever turns user source into IR) and a concrete GPU/CPU
//! backend (whatever turns IR into PTX, OpenCL C, or host byte code).
//!
//! The pipeline a [`backend::Backend`] drives end to end:
//!
//! 1. [`frontend::Frontend::generate_code`] produces an [`ir::IrContext`]
//!    plus the id of the generated kernel method.
//! 2. [`ir::IrContext::import`] deep-copies the reachable call graph rooted
//!    at that method into a private kernel context.
//! 3. [`pipeline::TransformerPipeline::run`] lowers and specializes thread
//!    intrinsics to a fixed point, then runs any caller-supplied passes.
//! 4. [`backend_context::BackendContext::build`] aggregates allocas and
//!    shared-memory usage across the reachable graph and validates that
//!    every intrinsic call left standing has a registered mapping.
//! 5. [`entry_point::EntryPoint::build`] classifies the kernel's parameter
//!    list into an index-space shape and a flattened variable list.
//! 6. [`codegen::CodeGeneratorBackend::compile`] generates each reachable
//!    method concurrently and serializes the result into one
//!    [`codegen::CompiledArtifact`].
//!
//! Everything above is fallible through one typed taxonomy,
//! [`error::CompileError`]; nothing panics on a malformed-but-recognized
//! input.

pub mod abi;
pub mod argument_mapper;
pub mod backend;
pub mod backend_context;
pub mod codegen;
pub mod diagnostics;
pub mod entry_point;
pub mod error;
pub mod frontend;
pub mod hook;
pub mod intrinsic;
pub mod ir;
pub mod phi;
pub mod pipeline;
pub mod platform;
pub mod regalloc;
pub mod types;

pub use abi::Abi;
pub use backend::{Backend, CompiledArtifact};
pub use error::{CompileError, CompileResult};
pub use frontend::{Emitter, EntryDescriptor, Frontend, FrontendOutcome};
pub use hook::{Hook, NullHook};
pub use intrinsic::IntrinsicProvider;
pub use pipeline::TransformerPipeline;
pub use platform::{BackendType, CompilerOptions, KernelSpecialization, TargetPlatform};
