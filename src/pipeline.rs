//! Ordered IR-to-IR passes applied to the kernel context before code
//! generation.
//!
//! Intrinsic specialization is scheduled first and is special: it is three
//! fixed stages (`LowerThreadIntrinsics`, `IntrinsicResolver`,
//! `IntrinsicSpecializer`) iterated to a fixpoint rather than run once,
//! since resolving one intrinsic call can expose another. User-supplied
//! transformers run once, afterwards, in registration order: the same
//! "ordered list of passes over one mutable context" shape as Cranelift's
//! `cranelift-codegen::Context::compile` pass sequence.
//!
//! When [`CompilerOptions::verify_after_each_pass`] is set, every pass
//! (fixed and user-supplied alike) is followed by a structural check of
//! block reachability and phi arity. When it is unset, that check is
//! skipped and debug-only [`ValueKind::DebugAssert`] nodes are eliminated
//! once at the end of the run instead.

use rustc_hash::FxHashMap;

use crate::error::{CompileError, CompileResult};
use crate::ir::{BlockId, IrContext, MethodId, ValueId, ValueKind};
use crate::platform::CompilerOptions;

/// One IR-to-IR rewrite pass.
///
/// Implementations mutate the reachable subgraph rooted at `kernel_method`
/// in place and report how many value sites they rewrote, which
/// [`TransformerPipeline::run`] uses to decide whether another intrinsic-
/// specialization pass is worth running.
pub trait Transformer: Send + Sync {
    /// A short, stable name used only for logging.
    fn name(&self) -> &str;

    /// Apply this pass to every method reachable from `kernel_method` in
    /// `ctx`, returning the number of value sites rewritten.
    fn run(&self, ctx: &mut IrContext, kernel_method: MethodId) -> CompileResult<usize>;
}

fn rewrite_values(
    ctx: &mut IrContext,
    kernel_method: MethodId,
    mut decide: impl FnMut(&IrContext, MethodId, ValueId) -> Option<ValueKind>,
) -> usize {
    let reachable = ctx.reachable_from(kernel_method);
    let mut total = 0usize;
    for method_id in reachable {
        let value_ids: Vec<ValueId> = ctx.method(method_id).value_ids().collect();
        let mut changes = Vec::new();
        for value_id in value_ids {
            if let Some(new_kind) = decide(ctx, method_id, value_id) {
                changes.push((value_id, new_kind));
            }
        }
        if changes.is_empty() {
            continue;
        }
        let method = ctx.method_mut(method_id);
        for (value_id, new_kind) in changes {
            method.value_mut(value_id).kind = new_kind;
            total += 1;
        }
    }
    total
}

/// A table of zero-argument intrinsic method names known to correspond
/// directly to a dedicated IR node, rather than needing a backend-specific
/// emission rule.
const THREAD_INTRINSIC_NAMES: &[(&str, ThreadIntrinsic)] = &[
    ("gridIndexX", ThreadIntrinsic::Grid(crate::ir::IndexAxis::X)),
    ("gridIndexY", ThreadIntrinsic::Grid(crate::ir::IndexAxis::Y)),
    ("gridIndexZ", ThreadIntrinsic::Grid(crate::ir::IndexAxis::Z)),
    ("groupIndexX", ThreadIntrinsic::Group(crate::ir::IndexAxis::X)),
    ("groupIndexY", ThreadIntrinsic::Group(crate::ir::IndexAxis::Y)),
    ("groupIndexZ", ThreadIntrinsic::Group(crate::ir::IndexAxis::Z)),
    ("warpLaneIndex", ThreadIntrinsic::Warp),
    ("groupBarrier", ThreadIntrinsic::Barrier),
    (
        "dynamicSharedMemoryLength",
        ThreadIntrinsic::DynamicSharedMemoryLength,
    ),
];

#[derive(Debug, Clone, Copy)]
enum ThreadIntrinsic {
    Grid(crate::ir::IndexAxis),
    Group(crate::ir::IndexAxis),
    Warp,
    Barrier,
    DynamicSharedMemoryLength,
}

impl ThreadIntrinsic {
    fn into_kind(self) -> ValueKind {
        match self {
            Self::Grid(axis) => ValueKind::GridIndex(axis),
            Self::Group(axis) => ValueKind::GroupIndex(axis),
            Self::Warp => ValueKind::WarpIndex,
            Self::Barrier => ValueKind::Barrier,
            Self::DynamicSharedMemoryLength => ValueKind::DynamicSharedMemoryLength,
        }
    }
}

/// Rewrites calls to a handful of well-known, zero-argument intrinsic
/// methods (grid/group/warp index queries, the group barrier, the dynamic
/// shared-memory-length query) into their dedicated [`ValueKind`] directly,
/// so the code generator never has to special-case these by method name.
#[derive(Debug, Default, Clone, Copy)]
pub struct LowerThreadIntrinsics;

impl Transformer for LowerThreadIntrinsics {
    fn name(&self) -> &str {
        "lower_thread_intrinsics"
    }

    fn run(&self, ctx: &mut IrContext, kernel_method: MethodId) -> CompileResult<usize> {
        let count = rewrite_values(ctx, kernel_method, |ctx, _owner, value_id| {
            let data = ctx.method(_owner).value(value_id);
            let (callee, args) = data.kind.as_call()?;
            if !args.is_empty() {
                return None;
            }
            let callee_name = ctx.method(callee).name.clone();
            THREAD_INTRINSIC_NAMES
                .iter()
                .find(|(name, _)| *name == callee_name.as_ref())
                .map(|(_, intrinsic)| intrinsic.into_kind())
        });
        log::debug!("lower_thread_intrinsics: {count} call sites rewritten");
        Ok(count)
    }
}

/// Short-circuits trampoline calls: a call to an intrinsic method whose name
/// carries an `alias$<canonical>` marker is redirected to the canonical
/// method directly, so later passes (and the final
/// [`crate::backend_context::BackendContext`] coverage check) see only the
/// real intrinsic, not the alias hop.
#[derive(Debug, Default, Clone, Copy)]
pub struct IntrinsicResolver;

impl Transformer for IntrinsicResolver {
    fn name(&self) -> &str {
        "intrinsic_resolver"
    }

    fn run(&self, ctx: &mut IrContext, kernel_method: MethodId) -> CompileResult<usize> {
        const ALIAS_MARKER: &str = "alias$";
        let reachable = ctx.reachable_from(kernel_method);
        let mut redirects: Vec<(MethodId, ValueId, MethodId)> = Vec::new();
        for &method_id in &reachable {
            for value_id in ctx.method(method_id).value_ids().collect::<Vec<_>>() {
                let Some((callee, _)) = ctx.method(method_id).value(value_id).kind.as_call() else {
                    continue;
                };
                let callee_name = ctx.method(callee).name.clone();
                let Some(canonical_name) = callee_name.strip_prefix(ALIAS_MARKER) else {
                    continue;
                };
                if let Some(canonical_id) = ctx.method_by_name(canonical_name) {
                    redirects.push((method_id, value_id, canonical_id));
                }
            }
        }
        let count = redirects.len();
        for (owner, value_id, canonical_id) in redirects {
            let method = ctx.method_mut(owner);
            if let ValueKind::Call(target, args) = method.value(value_id).kind.clone() {
                let _ = target;
                method.value_mut(value_id).kind = ValueKind::Call(canonical_id, args);
            }
        }
        log::debug!("intrinsic_resolver: {count} alias call sites redirected");
        Ok(count)
    }
}

/// Eliminates the node kinds the kernel code generator refuses to see: view
/// casts and constructions collapse to a bit-preserving [`ValueKind::Cast`]
/// of their underlying pointer operand, a statically-known view length
/// folds to a constant, `OutputWrite` lowers to a plain `Store`, and
/// `AcceleratorType`/`Undefined` resolve to a null constant.
///
/// `Handle` is deliberately left unresolved: a real accelerator-resource
/// handle has no generic representation this core can synthesize, so a
/// kernel that still references one after this pass fails at code-gen time
/// with `InvalidCodeGeneration`, same as the one node kind this pass cannot
/// make a reasonable unilateral decision about.
#[derive(Debug, Default, Clone, Copy)]
pub struct IntrinsicSpecializer;

impl Transformer for IntrinsicSpecializer {
    fn name(&self) -> &str {
        "intrinsic_specializer"
    }

    fn run(&self, ctx: &mut IrContext, kernel_method: MethodId) -> CompileResult<usize> {
        let count = rewrite_values(ctx, kernel_method, |ctx, owner, value_id| {
            let method = ctx.method(owner);
            let kind = &method.value(value_id).kind;
            match kind {
                ValueKind::OutputWrite(ptr, value) => Some(ValueKind::Store(*ptr, *value)),
                ValueKind::AcceleratorType | ValueKind::Undefined => Some(ValueKind::ConstNull),
                ValueKind::Length(view) => fold_static_length(method, *view),
                ValueKind::ViewCast(inner) => Some(ValueKind::Cast(*inner)),
                ValueKind::SubView(base, _offset) => Some(ValueKind::Cast(*base)),
                ValueKind::NewView(ptr, _len) => Some(ValueKind::Cast(*ptr)),
                _ => None,
            }
        });
        log::debug!("intrinsic_specializer: {count} value sites rewritten");
        Ok(count)
    }
}

/// Checks the two structural invariants a well-formed kernel body must
/// satisfy after a rewrite: every non-entry block is reachable by at least
/// one CFG edge, and every phi's incoming list has exactly one entry per
/// predecessor edge of its block (duplicated edges, e.g. a switch whose
/// default equals a case target, count once per edge, not once per distinct
/// predecessor block).
fn verify_structural_invariants(ctx: &IrContext, kernel_method: MethodId) -> CompileResult<()> {
    for method_id in ctx.reachable_from(kernel_method) {
        let method = ctx.method(method_id);
        if method.is_intrinsic {
            continue;
        }
        let mut predecessor_edges: FxHashMap<BlockId, usize> = FxHashMap::default();
        for block in method.blocks() {
            for succ in method.block(block).terminator.successors() {
                *predecessor_edges.entry(succ).or_insert(0) += 1;
            }
        }

        for block in method.blocks() {
            if block != method.entry_block && !predecessor_edges.contains_key(&block) {
                return Err(CompileError::InvalidCodeGeneration(format!(
                    "method `{}`: block {block} is unreachable",
                    method.name
                )));
            }
            let edges = predecessor_edges.get(&block).copied().unwrap_or(0);
            for &phi in &method.phis_of(block) {
                let ValueKind::Phi(incoming) = &method.value(phi).kind else {
                    unreachable!("phis_of only returns Phi values")
                };
                if incoming.len() != edges {
                    return Err(CompileError::InvalidCodeGeneration(format!(
                        "method `{}`: phi {phi} in block {block} has {} incoming value(s) but the block has {edges} predecessor edge(s)",
                        method.name,
                        incoming.len()
                    )));
                }
            }
        }
    }
    Ok(())
}

/// Eliminates [`ValueKind::DebugAssert`] nodes, run only under the lean
/// (`verify_after_each_pass = false`) profile: a release embedding that
/// skips structural verification also has no use for debug-only assertions
/// surviving to code generation.
fn strip_debug_asserts(ctx: &mut IrContext, kernel_method: MethodId) -> usize {
    let count = rewrite_values(ctx, kernel_method, |ctx, owner, value_id| {
        matches!(ctx.method(owner).value(value_id).kind, ValueKind::DebugAssert(_))
            .then_some(ValueKind::ConstNull)
    });
    log::debug!("debug_assert_stripper: {count} debug assertions eliminated");
    count
}

fn fold_static_length(method: &crate::ir::Method, view: ValueId) -> Option<ValueKind> {
    let ValueKind::NewView(_, len) = &method.value(view).kind else {
        return None;
    };
    let ValueKind::ConstInt(n) = &method.value(*len).kind else {
        return None;
    };
    Some(ValueKind::ConstInt(*n))
}

/// Accumulates user-supplied transformers and runs the fixed intrinsic-
/// specialization stages to a fixpoint ahead of them.
#[derive(Default)]
pub struct TransformerPipeline {
    user_transformers: Vec<Box<dyn Transformer>>,
}

impl TransformerPipeline {
    /// An empty pipeline: intrinsic specialization still runs, just no
    /// user-supplied passes follow it.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a user-supplied transformer, run once after the intrinsic-
    /// specialization fixpoint, in the order transformers were added.
    pub fn with_transformer(mut self, transformer: impl Transformer + 'static) -> Self {
        self.user_transformers.push(Box::new(transformer));
        self
    }

    /// Run the full pipeline against the subgraph reachable from
    /// `kernel_method` in `ctx`.
    ///
    /// Intrinsic specialization iterates `(LowerThreadIntrinsics,
    /// IntrinsicResolver, IntrinsicSpecializer)` until a round rewrites
    /// nothing, always running at least twice (a fresh intrinsic call can be
    /// introduced by specialization itself), capped at
    /// `options.max_intrinsic_passes`.
    pub fn run(
        &self,
        ctx: &mut IrContext,
        kernel_method: MethodId,
        options: &CompilerOptions,
    ) -> CompileResult<()> {
        let lower = LowerThreadIntrinsics;
        let resolve = IntrinsicResolver;
        let specialize = IntrinsicSpecializer;

        let mut pass = 0u32;
        loop {
            let mut rewrites = 0usize;
            rewrites += lower.run(ctx, kernel_method)?;
            rewrites += resolve.run(ctx, kernel_method)?;
            rewrites += specialize.run(ctx, kernel_method)?;
            pass += 1;
            log::debug!("intrinsic specialization pass {pass}: {rewrites} total rewrites");
            if options.verify_after_each_pass {
                verify_structural_invariants(ctx, kernel_method)?;
            }
            if pass >= options.max_intrinsic_passes {
                break;
            }
            if pass >= 2 && rewrites == 0 {
                break;
            }
        }

        for transformer in &self.user_transformers {
            let rewrites = transformer.run(ctx, kernel_method)?;
            log::debug!(
                "user transformer `{}`: {rewrites} value sites rewritten",
                transformer.name()
            );
            if options.verify_after_each_pass {
                verify_structural_invariants(ctx, kernel_method)?;
            }
        }

        if !options.verify_after_each_pass {
            strip_debug_asserts(ctx, kernel_method);
        }
        Ok(())
    }

    /// Structural dedup helper exposed for tests asserting determinism: runs
    /// the pipeline twice against independently imported copies of the same
    /// graph and compares value-id-keyed kind snapshots.
    #[cfg(test)]
    fn snapshot(ctx: &IrContext, kernel_method: MethodId) -> FxHashMap<(MethodId, ValueId), ValueKind> {
        let mut out = FxHashMap::default();
        for method_id in ctx.reachable_from(kernel_method) {
            let method = ctx.method(method_id);
            for value_id in method.value_ids() {
                out.insert((method_id, value_id), method.value(value_id).kind.clone());
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{IndexAxis, Method, Operands, Terminator};
    use crate::types::TypeNode;
    use smallvec::smallvec;

    fn options() -> CompilerOptions {
        CompilerOptions {
            max_intrinsic_passes: 8,
            ..CompilerOptions::default()
        }
    }

    #[test]
    fn lower_thread_intrinsics_rewrites_known_call_names() {
        let mut ctx = IrContext::new();
        let grid_x = ctx.declare_method(Method::new_intrinsic(
            "gridIndexX",
            vec![],
            TypeNode::primitive(crate::types::BasicValueType::Int32),
        ));

        let mut kernel = Method::new("kernel", vec![], TypeNode::Void);
        let entry = kernel.entry_block;
        let call = kernel.build(
            entry,
            TypeNode::primitive(crate::types::BasicValueType::Int32),
            ValueKind::Call(grid_x, Operands::new()),
        );
        kernel.set_terminator(entry, Terminator::Return(None));
        let kernel_id = ctx.declare_method(kernel);

        let rewritten = LowerThreadIntrinsics.run(&mut ctx, kernel_id).unwrap();
        assert_eq!(rewritten, 1);
        assert_eq!(
            ctx.method(kernel_id).value(call).kind,
            ValueKind::GridIndex(IndexAxis::X)
        );
    }

    #[test]
    fn intrinsic_resolver_redirects_alias_calls() {
        let mut ctx = IrContext::new();
        let real = ctx.declare_method(Method::new_intrinsic("warpBroadcast", vec![], TypeNode::Void));
        let alias = ctx.declare_method(Method::new_intrinsic(
            "alias$warpBroadcast",
            vec![],
            TypeNode::Void,
        ));

        let mut kernel = Method::new("kernel", vec![], TypeNode::Void);
        let entry = kernel.entry_block;
        let call = kernel.build(entry, TypeNode::Void, ValueKind::Call(alias, Operands::new()));
        kernel.set_terminator(entry, Terminator::Return(None));
        let kernel_id = ctx.declare_method(kernel);

        let rewritten = IntrinsicResolver.run(&mut ctx, kernel_id).unwrap();
        assert_eq!(rewritten, 1);
        let (callee, _) = ctx.method(kernel_id).value(call).kind.as_call().unwrap();
        assert_eq!(callee, real);
    }

    #[test]
    fn intrinsic_specializer_lowers_output_write_to_store() {
        let mut ctx = IrContext::new();
        let mut kernel = Method::new(
            "kernel",
            vec![TypeNode::pointer(
                TypeNode::primitive(crate::types::BasicValueType::Float32),
                crate::types::AddressSpace::Generic,
            )],
            TypeNode::Void,
        );
        let entry = kernel.entry_block;
        let ptr = kernel.build(
            entry,
            TypeNode::pointer(
                TypeNode::primitive(crate::types::BasicValueType::Float32),
                crate::types::AddressSpace::Generic,
            ),
            ValueKind::Param(0),
        );
        let value = kernel.build(
            entry,
            TypeNode::primitive(crate::types::BasicValueType::Float32),
            ValueKind::ConstFloat(1.0),
        );
        let write = kernel.build(entry, TypeNode::Void, ValueKind::OutputWrite(ptr, value));
        kernel.set_terminator(entry, Terminator::Return(None));
        let kernel_id = ctx.declare_method(kernel);

        IntrinsicSpecializer.run(&mut ctx, kernel_id).unwrap();
        assert_eq!(
            ctx.method(kernel_id).value(write).kind,
            ValueKind::Store(ptr, value)
        );
        assert!(!ctx.method(kernel_id).value(write).kind.must_be_eliminated());
    }

    #[test]
    fn intrinsic_specializer_folds_static_view_length() {
        let mut ctx = IrContext::new();
        let mut kernel = Method::new("kernel", vec![], TypeNode::Void);
        let entry = kernel.entry_block;
        let ptr = kernel.build(
            entry,
            TypeNode::pointer(
                TypeNode::primitive(crate::types::BasicValueType::Float32),
                crate::types::AddressSpace::Generic,
            ),
            ValueKind::ConstNull,
        );
        let len_const = kernel.build(
            entry,
            TypeNode::primitive(crate::types::BasicValueType::Int32),
            ValueKind::ConstInt(64),
        );
        let view = kernel.build(
            entry,
            TypeNode::view(
                TypeNode::primitive(crate::types::BasicValueType::Float32),
                crate::types::AddressSpace::Generic,
            ),
            ValueKind::NewView(ptr, len_const),
        );
        let length = kernel.build(
            entry,
            TypeNode::primitive(crate::types::BasicValueType::Int32),
            ValueKind::Length(view),
        );
        kernel.set_terminator(entry, Terminator::Return(None));
        let kernel_id = ctx.declare_method(kernel);

        IntrinsicSpecializer.run(&mut ctx, kernel_id).unwrap();
        assert_eq!(ctx.method(kernel_id).value(length).kind, ValueKind::ConstInt(64));
    }

    #[test]
    fn pipeline_runs_at_least_twice_even_with_nothing_to_rewrite() {
        let mut ctx = IrContext::new();
        let kernel = Method::new("kernel", vec![], TypeNode::Void);
        let kernel_id = ctx.declare_method(kernel);
        let pipeline = TransformerPipeline::new();
        // No assertion on pass count directly (internal), but this must not
        // panic or loop forever, and should leave the trivial graph alone.
        pipeline.run(&mut ctx, kernel_id, &options()).unwrap();
        assert_eq!(ctx.method(kernel_id).block_count(), 1);
    }

    #[test]
    fn pipeline_is_deterministic_across_independent_imports() {
        let mut src = IrContext::new();
        let grid_x = src.declare_method(Method::new_intrinsic(
            "gridIndexX",
            vec![],
            TypeNode::primitive(crate::types::BasicValueType::Int32),
        ));
        let mut kernel = Method::new("kernel", vec![], TypeNode::Void);
        let entry = kernel.entry_block;
        kernel.build(
            entry,
            TypeNode::primitive(crate::types::BasicValueType::Int32),
            ValueKind::Call(grid_x, Operands::new()),
        );
        kernel.set_terminator(entry, Terminator::Return(None));
        let root_id = src.declare_method(kernel);

        let (mut ctx_a, root_a) = src.import(root_id);
        let (mut ctx_b, root_b) = src.import(root_id);

        let pipeline = TransformerPipeline::new();
        pipeline.run(&mut ctx_a, root_a, &options()).unwrap();
        pipeline.run(&mut ctx_b, root_b, &options()).unwrap();

        let snap_a = TransformerPipeline::snapshot(&ctx_a, root_a);
        let snap_b = TransformerPipeline::snapshot(&ctx_b, root_b);
        let kinds_a: Vec<_> = snap_a.values().collect();
        let kinds_b: Vec<_> = snap_b.values().collect();
        assert_eq!(kinds_a.len(), kinds_b.len());
        for kind in kinds_a {
            assert!(kinds_b.contains(&kind));
        }
    }

    #[test]
    fn verify_passes_a_well_formed_branch_and_merge() {
        let mut ctx = IrContext::new();
        let mut kernel = Method::new("kernel", vec![], TypeNode::Void);
        let entry = kernel.entry_block;
        let merge = kernel.create_block(Terminator::Return(None));
        let cond = kernel.build(
            entry,
            TypeNode::primitive(crate::types::BasicValueType::Int1),
            ValueKind::ConstInt(1),
        );
        kernel.set_terminator(
            entry,
            Terminator::Branch {
                condition: cond,
                if_true: merge,
                if_false: merge,
            },
        );
        kernel.build(
            merge,
            TypeNode::primitive(crate::types::BasicValueType::Int32),
            ValueKind::Phi(smallvec![(entry, cond), (entry, cond)]),
        );
        let kernel_id = ctx.declare_method(kernel);

        assert!(verify_structural_invariants(&ctx, kernel_id).is_ok());
    }

    #[test]
    fn verify_rejects_a_phi_with_the_wrong_arity() {
        let mut ctx = IrContext::new();
        let mut kernel = Method::new("kernel", vec![], TypeNode::Void);
        let entry = kernel.entry_block;
        let merge = kernel.create_block(Terminator::Return(None));
        kernel.set_terminator(entry, Terminator::Jump(merge));
        let const_val = kernel.build(
            entry,
            TypeNode::primitive(crate::types::BasicValueType::Int32),
            ValueKind::ConstInt(1),
        );
        // `merge` has exactly one predecessor edge, but the phi claims two.
        kernel.build(
            merge,
            TypeNode::primitive(crate::types::BasicValueType::Int32),
            ValueKind::Phi(smallvec![(entry, const_val), (entry, const_val)]),
        );
        let kernel_id = ctx.declare_method(kernel);

        let err = verify_structural_invariants(&ctx, kernel_id).unwrap_err();
        assert!(matches!(err, CompileError::InvalidCodeGeneration(_)));
    }

    #[test]
    fn verify_rejects_an_unreachable_block() {
        let mut ctx = IrContext::new();
        let mut kernel = Method::new("kernel", vec![], TypeNode::Void);
        let entry = kernel.entry_block;
        kernel.set_terminator(entry, Terminator::Return(None));
        // Created but never wired into any terminator's successor list.
        kernel.create_block(Terminator::Return(None));
        let kernel_id = ctx.declare_method(kernel);

        let err = verify_structural_invariants(&ctx, kernel_id).unwrap_err();
        assert!(matches!(err, CompileError::InvalidCodeGeneration(_)));
    }

    #[test]
    fn pipeline_run_fails_fast_when_verification_catches_a_malformed_phi() {
        let mut ctx = IrContext::new();
        let mut kernel = Method::new("kernel", vec![], TypeNode::Void);
        let entry = kernel.entry_block;
        let merge = kernel.create_block(Terminator::Return(None));
        kernel.set_terminator(entry, Terminator::Jump(merge));
        let const_val = kernel.build(
            entry,
            TypeNode::primitive(crate::types::BasicValueType::Int32),
            ValueKind::ConstInt(1),
        );
        kernel.build(
            merge,
            TypeNode::primitive(crate::types::BasicValueType::Int32),
            ValueKind::Phi(smallvec![(entry, const_val), (entry, const_val)]),
        );
        let kernel_id = ctx.declare_method(kernel);

        let pipeline = TransformerPipeline::new();
        let result = pipeline.run(&mut ctx, kernel_id, &options());
        assert!(matches!(result, Err(CompileError::InvalidCodeGeneration(_))));
    }

    #[test]
    fn disabling_verification_strips_debug_asserts_instead() {
        let mut ctx = IrContext::new();
        let mut kernel = Method::new("kernel", vec![], TypeNode::Void);
        let entry = kernel.entry_block;
        let cond = kernel.build(
            entry,
            TypeNode::primitive(crate::types::BasicValueType::Int1),
            ValueKind::ConstInt(1),
        );
        let assertion = kernel.build(entry, TypeNode::Void, ValueKind::DebugAssert(cond));
        kernel.set_terminator(entry, Terminator::Return(None));
        let kernel_id = ctx.declare_method(kernel);

        let lean_options = CompilerOptions {
            verify_after_each_pass: false,
            ..options()
        };
        let pipeline = TransformerPipeline::new();
        pipeline.run(&mut ctx, kernel_id, &lean_options).unwrap();
        assert_eq!(ctx.method(kernel_id).value(assertion).kind, ValueKind::ConstNull);
    }

    #[test]
    fn enabling_verification_retains_debug_asserts() {
        let mut ctx = IrContext::new();
        let mut kernel = Method::new("kernel", vec![], TypeNode::Void);
        let entry = kernel.entry_block;
        let cond = kernel.build(
            entry,
            TypeNode::primitive(crate::types::BasicValueType::Int1),
            ValueKind::ConstInt(1),
        );
        let assertion = kernel.build(entry, TypeNode::Void, ValueKind::DebugAssert(cond));
        kernel.set_terminator(entry, Terminator::Return(None));
        let kernel_id = ctx.declare_method(kernel);

        let pipeline = TransformerPipeline::new();
        pipeline.run(&mut ctx, kernel_id, &options()).unwrap();
        assert_eq!(
            ctx.method(kernel_id).value(assertion).kind,
            ValueKind::DebugAssert(cond)
        );
    }
}
