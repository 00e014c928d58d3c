//! The two external collaborators this crate compiles against but does not
//! implement: the language frontend that turns a source descriptor into IR,
//! and the per-value-kind emitter a concrete backend supplies.
//!
//! Both are object-safe traits so the orchestrator and code generator can be
//! exercised in tests against fake implementations (hand-built IR graphs, a
//! plain-text emitter) without a real PTX/OpenCL backend linked in.

use crate::ir::{IrContext, MethodId, ValueId};

/// A source-level description of the kernel to compile: enough for a
/// [`Frontend`] to produce an IR method, and enough for
/// [`crate::entry_point::EntryPoint::build`] to classify its parameters.
#[derive(Debug, Clone)]
pub struct EntryDescriptor {
    /// The kernel method's name, as it should appear in the produced IR and
    /// in the final [`crate::backend::CompiledArtifact`].
    pub method_name: std::sync::Arc<str>,
    /// Per-parameter classification (excluding the index-space parameter),
    /// passed straight through to [`crate::entry_point::EntryPoint::build`].
    pub parameter_kinds: Vec<crate::entry_point::ParameterKind>,
}

impl EntryDescriptor {
    /// Build a descriptor naming `method_name`, with `parameter_kinds`
    /// classifying every parameter after the index-space one.
    pub fn new(
        method_name: impl Into<std::sync::Arc<str>>,
        parameter_kinds: Vec<crate::entry_point::ParameterKind>,
    ) -> Self {
        Self {
            method_name: method_name.into(),
            parameter_kinds,
        }
    }
}

/// Outcome of one [`Frontend::generate_code`] call.
///
/// Mirrors the "result, faulted?, lastException" contract: a successful
/// generation carries the produced method's id in `context`; a faulted one
/// carries the underlying cause, which the orchestrator propagates
/// unchanged rather than wrapping in [`crate::error::CompileError::Internal`].
pub enum FrontendOutcome {
    /// The frontend produced `method` inside `context`.
    Generated {
        /// The context the method was declared in.
        context: IrContext,
        /// The produced method.
        method: MethodId,
    },
    /// The frontend faulted; `cause` is the underlying error, preserved
    /// rather than summarized.
    Faulted {
        /// What went wrong while generating code.
        cause: Box<dyn std::error::Error + Send + Sync + 'static>,
    },
}

/// Produces an IR method from a source descriptor.
///
/// Out of scope for this crate's own implementation (language-specific
/// bytecode import lives elsewhere); this trait is the contract
/// [`crate::backend::Backend::compile`] calls through, and tests provide a
/// fake implementation that hands back a hand-built [`crate::ir::Method`].
pub trait Frontend {
    /// Produce an IR method for `descriptor`.
    fn generate_code(&self, descriptor: &EntryDescriptor) -> FrontendOutcome;
}

/// Per-value-kind code emission contract: every concrete IR value has
/// exactly one emitter method responsible for it.
///
/// `data` is the user-defined blob threaded through
/// [`crate::codegen::CodeGeneratorBackend`]'s construction; emitters that
/// need auxiliary state (e.g. a string-literal table) stash it there rather
/// than in `&mut self`, keeping one `Emitter` instance shareable read-only
/// across the parallel code-generation fork.
pub trait Emitter: Send + Sync {
    /// Emit the code for a single IR value in `method`, writing into the
    /// generator's private buffer (`buffer`). Returns an opaque label the
    /// rest of this method's emission can refer back to (e.g. a physical
    /// register name or a textual operand), or an error if `value`'s kind is
    /// one the transformer pipeline should have already eliminated.
    fn emit_value(
        &self,
        method: MethodId,
        value: ValueId,
        buffer: &mut String,
    ) -> crate::error::CompileResult<()>;

    /// Emit this generator's constant-pool contribution into the shared main
    /// builder, called sequentially after every generator's parallel
    /// `emit_value` pass has completed.
    fn generate_constants(&self, _main: &mut String) {}

    /// Emit this generator's forward declarations into the shared main
    /// builder, called sequentially after [`Emitter::generate_constants`].
    fn generate_header(&self, _main: &mut String) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry_point::ParameterKind;
    use crate::ir::Method;
    use crate::types::TypeNode;

    struct FakeFrontend;

    impl Frontend for FakeFrontend {
        fn generate_code(&self, descriptor: &EntryDescriptor) -> FrontendOutcome {
            let mut ctx = IrContext::new();
            let method = ctx.declare_method(Method::new(
                std::sync::Arc::clone(&descriptor.method_name),
                vec![TypeNode::primitive(crate::types::BasicValueType::Int32)],
                TypeNode::Void,
            ));
            FrontendOutcome::Generated { context: ctx, method }
        }
    }

    #[test]
    fn fake_frontend_produces_a_method_named_after_the_descriptor() {
        let descriptor = EntryDescriptor::new("add", vec![ParameterKind::Uniform]);
        let frontend = FakeFrontend;
        match frontend.generate_code(&descriptor) {
            FrontendOutcome::Generated { context, method } => {
                assert_eq!(context.method(method).name.as_ref(), "add");
            }
            FrontendOutcome::Faulted { .. } => panic!("expected a successful generation"),
        }
    }
}
