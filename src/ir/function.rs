//! A single method's SSA body: basic blocks, values, and the method-level
//! metadata (name, parameters, return type, intrinsic flag) the rest of the
//! backend needs.

use cranelift_entity::PrimaryMap;
use std::sync::Arc;

use super::entities::{BlockId, ValueId};
use super::value::{Terminator, ValueKind};
use crate::types::TypeNode;

/// One SSA value: its static type and defining operation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueData {
    /// The value's static type.
    pub ty: TypeNode,
    /// The operation that produces it.
    pub kind: ValueKind,
}

/// One basic block: an ordered value list (phis first, by convention, though
/// nothing in this crate relies on phis being contiguous) terminated by
/// exactly one [`Terminator`].
#[derive(Debug, Clone)]
pub struct BasicBlock {
    /// Values defined in this block, in program order.
    values: Vec<ValueId>,
    /// How this block transfers control.
    pub terminator: Terminator,
}

impl BasicBlock {
    /// An empty block with a placeholder terminator; callers must set a
    /// real terminator before the method is considered well-formed.
    pub fn new(terminator: Terminator) -> Self {
        Self {
            values: Vec::new(),
            terminator,
        }
    }

    /// Append a value to this block's program order.
    pub fn push_value(&mut self, value: ValueId) {
        self.values.push(value);
    }

    /// All values defined in this block, in program order.
    pub fn values(&self) -> &[ValueId] {
        &self.values
    }
}

/// One method's full SSA body, owned by an [`IrContext`](super::context::IrContext).
#[derive(Debug, Clone)]
pub struct Method {
    /// Declared name (also the key the intrinsic registry looks methods up
    /// by, via [`super::entities::MethodRef`]).
    pub name: Arc<str>,
    /// Ordered parameter types.
    pub params: Vec<TypeNode>,
    /// Return type (`TypeNode::Void` for a kernel entry method).
    pub return_type: TypeNode,
    /// Whether this method has no body and must be supplied by a backend's
    /// [`crate::intrinsic::IntrinsicProvider`].
    pub is_intrinsic: bool,
    /// The block execution begins in.
    pub entry_block: BlockId,
    blocks: PrimaryMap<BlockId, BasicBlock>,
    values: PrimaryMap<ValueId, ValueData>,
}

impl Method {
    /// Start building a method. The entry block is created empty with a
    /// `Return(None)` placeholder terminator; callers append to it before
    /// the method is handed to an [`IrContext`](super::context::IrContext).
    pub fn new(name: impl Into<Arc<str>>, params: Vec<TypeNode>, return_type: TypeNode) -> Self {
        let mut blocks = PrimaryMap::new();
        let entry_block = blocks.push(BasicBlock::new(Terminator::Return(None)));
        Self {
            name: name.into(),
            params,
            return_type,
            is_intrinsic: false,
            entry_block,
            blocks,
            values: PrimaryMap::new(),
        }
    }

    /// Build an intrinsic (bodiless) method declaration.
    pub fn new_intrinsic(name: impl Into<Arc<str>>, params: Vec<TypeNode>, return_type: TypeNode) -> Self {
        let mut m = Self::new(name, params, return_type);
        m.is_intrinsic = true;
        m
    }

    /// Allocate a new, empty block terminated by `terminator`.
    pub fn create_block(&mut self, terminator: Terminator) -> BlockId {
        self.blocks.push(BasicBlock::new(terminator))
    }

    /// Allocate a new SSA value in the method (not yet attached to any
    /// block's program order: call [`Method::append_to_block`] for that).
    pub fn create_value(&mut self, ty: TypeNode, kind: ValueKind) -> ValueId {
        self.values.push(ValueData { ty, kind })
    }

    /// Append an existing value to `block`'s program order.
    pub fn append_to_block(&mut self, block: BlockId, value: ValueId) {
        self.blocks[block].push_value(value);
    }

    /// Convenience: allocate a value and append it to `block` in one step.
    pub fn build(&mut self, block: BlockId, ty: TypeNode, kind: ValueKind) -> ValueId {
        let v = self.create_value(ty, kind);
        self.append_to_block(block, v);
        v
    }

    /// Set `block`'s terminator.
    pub fn set_terminator(&mut self, block: BlockId, terminator: Terminator) {
        self.blocks[block].terminator = terminator;
    }

    /// Look up a value's data.
    pub fn value(&self, id: ValueId) -> &ValueData {
        &self.values[id]
    }

    /// Look up a value's data, mutably. Used by
    /// [`crate::pipeline`] transformers to rewrite a value's kind in place
    /// without disturbing its id or position in the owning block.
    pub fn value_mut(&mut self, id: ValueId) -> &mut ValueData {
        &mut self.values[id]
    }

    /// Every value id declared in the method, in allocation order.
    pub fn value_ids(&self) -> impl Iterator<Item = ValueId> + '_ {
        self.values.keys()
    }

    /// Look up a block.
    pub fn block(&self, id: BlockId) -> &BasicBlock {
        &self.blocks[id]
    }

    /// Number of blocks in the method.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Iterate over blocks in allocation order. This is a stable structural
    /// traversal (not necessarily reverse-postorder), matching the
    /// "structural traversal" contract for the external
    /// IR; callers that need RPO build it themselves from the CFG
    /// ([`crate::backend_context`] does, for reachability).
    pub fn blocks(&self) -> impl Iterator<Item = BlockId> + '_ {
        self.blocks.keys()
    }

    /// Phi values defined at the head of `block`, in program order.
    pub fn phis_of(&self, block: BlockId) -> Vec<ValueId> {
        self.blocks[block]
            .values()
            .iter()
            .copied()
            .filter(|v| self.values[*v].kind.is_phi())
            .collect()
    }

    /// Every `Call` value in the method, as `(caller-local value id, callee)`.
    pub fn calls(&self) -> impl Iterator<Item = (ValueId, super::entities::MethodId)> + '_ {
        self.values.iter().filter_map(|(id, data)| {
            data.kind.as_call().map(|(callee, _args)| (id, callee))
        })
    }

    /// Every `Alloca` value in the method.
    pub fn allocas(
        &self,
    ) -> impl Iterator<Item = (ValueId, &TypeNode, super::value::AllocaKind, Option<u32>)> + '_ {
        self.values.iter().filter_map(|(id, data)| {
            data.kind
                .as_alloca()
                .map(|(kind, ty, count)| (id, ty, kind, count))
        })
    }

    /// Rewrite every `Call` target through `old_to_new`, used by
    /// [`super::context::IrContext::import`] after cloning a reachable
    /// subgraph into a fresh context with fresh [`super::entities::MethodId`]s.
    pub(crate) fn remap_calls(
        &mut self,
        old_to_new: &rustc_hash::FxHashMap<super::entities::MethodId, super::entities::MethodId>,
    ) {
        for data in self.values.values_mut() {
            if let ValueKind::Call(callee, _args) = &mut data.kind {
                if let Some(&new_id) = old_to_new.get(callee) {
                    *callee = new_id;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BasicValueType;

    #[test]
    fn fresh_method_has_one_block_and_no_values() {
        let m = Method::new("empty", vec![], TypeNode::Void);
        assert_eq!(m.block_count(), 1);
        assert!(m.phis_of(m.entry_block).is_empty());
    }

    #[test]
    fn build_appends_in_program_order() {
        let mut m = Method::new("f", vec![], TypeNode::primitive(BasicValueType::Int32));
        let entry = m.entry_block;
        let a = m.build(entry, TypeNode::primitive(BasicValueType::Int32), ValueKind::ConstInt(1));
        let b = m.build(entry, TypeNode::primitive(BasicValueType::Int32), ValueKind::ConstInt(2));
        assert_eq!(m.block(entry).values(), &[a, b]);
    }

    #[test]
    fn value_mut_rewrites_kind_in_place() {
        let mut m = Method::new("f", vec![], TypeNode::primitive(BasicValueType::Int32));
        let entry = m.entry_block;
        let v = m.build(entry, TypeNode::primitive(BasicValueType::Int32), ValueKind::ConstInt(1));
        m.value_mut(v).kind = ValueKind::ConstInt(2);
        assert_eq!(m.value(v).kind, ValueKind::ConstInt(2));
        assert_eq!(m.value_ids().count(), 1);
    }
}
