//! Per-block phi-copy scheduling.
//!
//! SSA form puts a phi's incoming values at the heads of its predecessors
//! conceptually; to actually materialize a phi's register, each predecessor
//! must execute a parallel copy into the phi's register on exit. A
//! predecessor that feeds more than one phi in a cycle (`p1 = phi(.., p2)`,
//! `p2 = phi(.., p1)` both fed from the same block) can't just emit the
//! copies in sequence without clobbering a source before it's read. This
//! module finds exactly which phis need a temporary to break that kind of
//! cycle, the same problem Cranelift's register-allocator move-resolution
//! (`cranelift-codegen::regalloc2` move scheduling) solves for parallel
//! copies in general.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::CompileResult;
use crate::ir::{BlockId, Method, ValueId, ValueKind};
use crate::regalloc::RegisterAllocator;

/// Per-block phi-copy schedule for one method.
pub struct PhiBindings {
    lhs_phis: FxHashMap<BlockId, FxHashSet<ValueId>>,
    intermediate_phis: FxHashMap<BlockId, FxHashSet<ValueId>>,
    bindings: FxHashMap<BlockId, Vec<(ValueId, ValueId)>>,
    max_num_intermediate_phis: usize,
}

impl PhiBindings {
    /// Build the phi-copy schedule for `method`, allocating a register for
    /// every phi value along the way via `allocator`.
    ///
    /// Builds the full binding list per predecessor block before flagging
    /// intermediate phis, rather than flagging incrementally as each
    /// binding is appended: a cycle like `p1 = phi(.., p2)`, `p2 = phi(..,
    /// p1)` needs *both* `p1` and `p2` recognized as needing a temporary
    /// (each is simultaneously a copy target and a copy source at the same
    /// predecessor exit), which only holds checking membership against the
    /// block's complete target set.
    pub fn build(method: &Method, allocator: &mut RegisterAllocator<'_>) -> CompileResult<Self> {
        for block in method.blocks() {
            for &phi in &method.phis_of(block) {
                let ty = method.value(phi).ty.clone();
                allocator.allocate(phi, &ty);
            }
        }

        let mut bindings: FxHashMap<BlockId, Vec<(ValueId, ValueId)>> = FxHashMap::default();
        let mut lhs_phis: FxHashMap<BlockId, FxHashSet<ValueId>> = FxHashMap::default();

        for block in method.blocks() {
            for &phi in &method.phis_of(block) {
                let incoming = match &method.value(phi).kind {
                    ValueKind::Phi(incoming) => incoming,
                    _ => unreachable!("phis_of only returns Phi values"),
                };
                for &(pred, value) in incoming.iter() {
                    bindings.entry(pred).or_default().push((phi, value));
                    lhs_phis.entry(pred).or_default().insert(phi);
                }
            }
        }

        let mut intermediate_phis: FxHashMap<BlockId, FxHashSet<ValueId>> = FxHashMap::default();
        for (&block, block_bindings) in &bindings {
            let targets = lhs_phis.get(&block);
            for &(_, value) in block_bindings {
                if targets.is_some_and(|t| t.contains(&value)) {
                    intermediate_phis.entry(block).or_default().insert(value);
                }
            }
        }

        let max_num_intermediate_phis = intermediate_phis
            .values()
            .map(|set| set.len())
            .max()
            .unwrap_or(0);

        log::debug!(
            "phi bindings for `{}`: {} blocks with bindings, {max_num_intermediate_phis} max intermediate phis",
            method.name,
            bindings.len(),
        );

        Ok(Self {
            lhs_phis,
            intermediate_phis,
            bindings,
            max_num_intermediate_phis,
        })
    }

    /// Phis that must be materialized on exit from `block`.
    pub fn lhs_phis(&self, block: BlockId) -> impl Iterator<Item = ValueId> + '_ {
        self.lhs_phis
            .get(&block)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    /// Phis on exit from `block` that participate in a copy cycle and
    /// therefore need a dedicated temporary register.
    pub fn intermediate_phis(&self, block: BlockId) -> impl Iterator<Item = ValueId> + '_ {
        self.intermediate_phis
            .get(&block)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    /// The `(phi, incoming value)` pairs to copy on exit from `block`, in
    /// the order they were discovered.
    pub fn bindings_for(&self, block: BlockId) -> &[(ValueId, ValueId)] {
        self.bindings.get(&block).map_or(&[], |v| v.as_slice())
    }

    /// The number of dedicated temporaries a code generator must
    /// pre-allocate to cover every block's intermediate phis.
    pub fn max_num_intermediate_phis(&self) -> usize {
        self.max_num_intermediate_phis
    }
}
