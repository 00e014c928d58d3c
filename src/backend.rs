//! The compilation orchestrator (§4.9): owns the pipeline and exposes a
//! single `compile` entry point that runs frontend, import, transform,
//! entry-point construction, then code generation, wrapping only genuinely
//! unexpected failures.
//!
//! Mirrors how a Cranelift `Context` is built once per function and driven
//! through a fixed `compile` sequence, except the sequence here spans a
//! frontend call and a parallel code-generation fork rather than a single
//! in-process pass list.

use crate::abi::Abi;
use crate::argument_mapper::ArgumentMapper;
use crate::backend_context::BackendContext;
use crate::codegen::CodeGeneratorBackend;
use crate::entry_point::EntryPoint;
use crate::error::{CompileError, CompileResult};
use crate::frontend::{Emitter, EntryDescriptor, Frontend, FrontendOutcome};
use crate::hook::Hook;
use crate::intrinsic::IntrinsicProvider;
use crate::pipeline::TransformerPipeline;
use crate::platform::{CompilerOptions, KernelSpecialization};

pub use crate::codegen::CompiledArtifact;

/// Owns everything a compilation needs that outlives any single `compile`
/// call: the frontend, the intrinsic registry, the ABI memoization cache,
/// and the transformer pipeline.
///
/// Dropping a `Backend` drops its [`IntrinsicProvider`] field, whose own
/// `Drop` impl clears every cached mapping. The dispose-chain policy falls
/// out of ordinary field-drop order rather than needing an explicit `Drop`
/// impl here.
pub struct Backend<F: Frontend> {
    frontend: F,
    intrinsics: IntrinsicProvider,
    argument_mapper: ArgumentMapper,
    abi: Abi,
    pipeline: TransformerPipeline,
    options: CompilerOptions,
}

impl<F: Frontend> Backend<F> {
    /// Construct a backend instance. The ABI resolver is built fresh from
    /// `options.platform`; there is no shared process-wide registry to draw
    /// from here, matching the "no static initialization" redesign note.
    pub fn new(
        frontend: F,
        intrinsics: IntrinsicProvider,
        pipeline: TransformerPipeline,
        options: CompilerOptions,
    ) -> Self {
        let abi = Abi::new(options.platform);
        Self {
            frontend,
            intrinsics,
            argument_mapper: ArgumentMapper::new(),
            abi,
            pipeline,
            options,
        }
    }

    /// The ABI resolver this backend compiles against.
    pub fn abi(&self) -> &Abi {
        &self.abi
    }

    /// The host-parameter flattening mapper this backend's embedder drives
    /// at launch time, independent of `compile`.
    pub fn argument_mapper(&self) -> &ArgumentMapper {
        &self.argument_mapper
    }

    /// The options this backend was constructed with.
    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    /// Run the full compilation sequence for `descriptor`.
    ///
    /// 1. Run the frontend; on success deep-copy the reachable subgraph into
    ///    a fresh kernel context.
    /// 2. Run every transformer in the pipeline against the kernel context.
    /// 3. Build a [`BackendContext`] rooted at the kernel method, validating
    ///    intrinsic coverage.
    /// 4. Classify the kernel method into an [`EntryPoint`].
    /// 5. Dispatch to [`CodeGeneratorBackend::compile`].
    ///
    /// Any [`CompileError`] produced by steps 2–5 propagates unchanged,
    /// since those are already the typed failure taxonomy; only a faulted
    /// frontend call (which carries an opaque boxed error) is wrapped into
    /// [`CompileError::Internal`].
    pub fn compile(
        &self,
        descriptor: &EntryDescriptor,
        specialization: KernelSpecialization,
        hook: &dyn Hook,
        emitter: &dyn Emitter,
    ) -> CompileResult<CompiledArtifact> {
        log::debug!("beginning code-generation phase for `{}`", descriptor.method_name);
        let (main_context, generated_method) = match self.frontend.generate_code(descriptor) {
            FrontendOutcome::Generated { context, method } => {
                hook.finished_code_generation(&context, method);
                (context, method)
            }
            FrontendOutcome::Faulted { cause } => {
                let err = CompileError::Internal {
                    message: format!(
                        "frontend faulted while generating code for `{}`",
                        descriptor.method_name
                    ),
                    cause: Some(cause),
                };
                hook.finished_code_generation_failed(&err);
                return Err(err);
            }
        };

        let (mut kernel_context, kernel_method) = main_context.import(generated_method);
        hook.initialized_kernel_context(&kernel_context, kernel_method);

        self.pipeline.run(&mut kernel_context, kernel_method, &self.options)?;
        hook.optimized_kernel_context(&kernel_context, kernel_method);

        let backend_context =
            BackendContext::build(&kernel_context, kernel_method, &self.abi, &self.intrinsics)?;

        let entry_point = EntryPoint::build(
            kernel_context.method(kernel_method),
            &descriptor.parameter_kinds,
            &self.abi,
            backend_context.shared_memory_spec(),
            specialization,
        )?;

        CodeGeneratorBackend::compile(&entry_point, &backend_context, specialization, emitter)
    }
}
