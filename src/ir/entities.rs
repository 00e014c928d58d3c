//! Opaque entity references into an [`IrContext`](super::context::IrContext).
//!
//! Instructions need to reference other entities in the method: other
//! blocks, other values. Rather than Rust references (awkward under the
//! graph's ownership, and twice the size of a `u32` index), each entity
//! reference is a newtype wrapping a dense `u32` index into a table owned by
//! the context, following the same convention as Cranelift's
//! `cranelift-codegen::ir::entities` (`Block`, `Value`, `Inst` are all
//! `entity_impl!`-generated wrappers over `u32`).

use cranelift_entity::entity_impl;
use std::fmt;
use std::sync::Arc;

/// A reference to a method declared in an [`IrContext`](super::context::IrContext).
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodId(u32);
entity_impl!(MethodId, "method");

/// A reference to a [basic block](https://en.wikipedia.org/wiki/Basic_block)
/// within one method.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(u32);
entity_impl!(BlockId, "block");

/// A reference to an SSA value within one method.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValueId(u32);
entity_impl!(ValueId, "v");

/// A name-based, context-independent handle to a method.
///
/// Entity ids ([`MethodId`]) are only meaningful within the
/// [`IrContext`](super::context::IrContext) that allocated them: importing a
/// method into a fresh context reassigns ids. Diagnostics and the intrinsic
/// registry need a handle that survives that reassignment, so they key on
/// the method's declared name instead.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct MethodRef(pub Arc<str>);

impl MethodRef {
    /// Build a reference from any string-like name.
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self(name.into())
    }

    /// The method's name.
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MethodRef({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cranelift_entity::EntityRef;

    #[test]
    fn entity_ids_round_trip_through_index() {
        let id = ValueId::new(42);
        assert_eq!(id.index(), 42);
    }

    #[test]
    fn method_ref_equality_is_name_based() {
        let a = MethodRef::new("warpBroadcast");
        let b = MethodRef::new("warpBroadcast");
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "warpBroadcast");
    }
}
