//! Parallel code-generation driver (§4.10): one generator per reachable
//! method, run concurrently, then serialized into one artifact.
//!
//! Generators write into private buffers during the parallel phase and
//! touch no shared mutable state until the sequential merge: the same
//! "each task owns its buffer, join before merge" shape `rayon::scope` is
//! built for.

use std::sync::Arc;

use crate::backend_context::BackendContext;
use crate::entry_point::{EntryPoint, SharedMemorySpec};
use crate::error::{CompileError, CompileResult};
use crate::frontend::Emitter;
use crate::ir::{IrContext, MethodId};
use crate::platform::KernelSpecialization;

/// One reachable function's emitted source, as reported back to the host
/// runtime for launch configuration.
#[derive(Debug, Clone)]
pub struct FunctionInfo {
    /// The function's declared name.
    pub name: Arc<str>,
    /// Its emitted source text.
    pub source: String,
    /// Bytes of per-thread local storage this function's allocas require.
    pub local_memory_size: u32,
}

/// Restates the compilation's shared-memory footprint alongside the
/// per-function emission summary, for launch-time configuration.
#[derive(Debug, Clone)]
pub struct KernelInfo {
    /// One entry per reachable method, kernel first.
    pub function_info: Vec<FunctionInfo>,
    /// The aggregate shared-memory spec this compile produced.
    pub shared_allocations: SharedMemorySpec,
}

/// The final product of one [`crate::backend::Backend::compile`] call.
#[derive(Debug, Clone)]
pub struct CompiledArtifact {
    /// The kernel's declared name.
    pub entry_point_name: Arc<str>,
    /// Target text (PTX/OpenCL C) or host byte code, merged from every
    /// generator's buffer.
    pub byte_stream: String,
    /// Per-function emission summary for the host runtime.
    pub kernel_info: KernelInfo,
}

struct GeneratedFunction {
    name: Arc<str>,
    buffer: String,
}

/// Stateless driver realizing the concrete code-generation phase of
/// [`crate::backend::Backend::compile`].
pub struct CodeGeneratorBackend;

impl CodeGeneratorBackend {
    /// Run the parallel-then-sequential code-generation sequence described
    /// in the component design: one generator per reachable method
    /// (kernel first), generated in parallel, then constants/headers/merge
    /// run sequentially, merge in reverse generator order.
    pub fn compile(
        entry_point: &EntryPoint,
        backend_context: &BackendContext<'_>,
        specialization: KernelSpecialization,
        emitter: &dyn Emitter,
    ) -> CompileResult<CompiledArtifact> {
        debug_assert_eq!(
            entry_point.specialization, specialization,
            "entry point was built with a different specialization than the one passed to code generation"
        );

        let mut order = vec![backend_context.kernel_method()];
        order.extend(backend_context.secondary_methods());
        log::debug!(
            "code generation for `{}`: {} generators ({} secondary)",
            entry_point.method_name,
            order.len(),
            order.len() - 1
        );

        let mut slots: Vec<Option<CompileResult<GeneratedFunction>>> =
            order.iter().map(|_| None).collect();
        {
            let mut remaining = slots.as_mut_slice();
            let context = backend_context.context();
            rayon::scope(|scope| {
                for &method_id in &order {
                    let (slot, rest) = remaining
                        .split_first_mut()
                        .expect("one slot reserved per reachable method");
                    remaining = rest;
                    scope.spawn(move |_| {
                        *slot = Some(generate_one(context, method_id, emitter));
                    });
                }
            });
        }

        let mut generators = Vec::with_capacity(slots.len());
        for slot in slots {
            generators.push(slot.expect("the parallel fork fills every slot before join")?);
        }

        let mut main = String::new();
        for _ in &generators {
            emitter.generate_constants(&mut main);
        }
        for _ in &generators {
            emitter.generate_header(&mut main);
        }
        for generator in generators.iter().rev() {
            main.push_str(&generator.buffer);
        }

        let function_info = order
            .iter()
            .zip(generators.iter())
            .map(|(&method_id, generator)| FunctionInfo {
                name: Arc::clone(&generator.name),
                source: generator.buffer.clone(),
                local_memory_size: backend_context
                    .allocas_of(method_id)
                    .local
                    .iter()
                    .map(|a| a.size)
                    .sum(),
            })
            .collect();

        Ok(CompiledArtifact {
            entry_point_name: Arc::clone(&entry_point.method_name),
            byte_stream: main,
            kernel_info: KernelInfo {
                function_info,
                shared_allocations: entry_point.shared_memory_spec,
            },
        })
    }
}

fn generate_one(
    context: &IrContext,
    method_id: MethodId,
    emitter: &dyn Emitter,
) -> CompileResult<GeneratedFunction> {
    let method = context.method(method_id);
    let mut buffer = String::new();
    for value_id in method.value_ids() {
        let kind = &method.value(value_id).kind;
        if kind.must_be_eliminated() {
            return Err(CompileError::InvalidCodeGeneration(format!(
                "value {value_id} in `{}` reached code generation still carrying {kind:?}, \
                 which the transformer pipeline should have eliminated",
                method.name,
            )));
        }
        emitter.emit_value(method_id, value_id, &mut buffer)?;
    }
    Ok(GeneratedFunction {
        name: Arc::clone(&method.name),
        buffer,
    })
}
