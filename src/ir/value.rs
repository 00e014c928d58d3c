//! The concrete value-node variants the kernel code generator dispatches
//! over, plus the handful of node kinds that a
//! well-formed transformer pipeline run must have eliminated before code
//! generation ever sees them.

use smallvec::SmallVec;
use std::sync::Arc;

use super::entities::{BlockId, MethodId, ValueId};
use crate::types::TypeNode;

/// Small vector of operand ids: most nodes have 0–2 operands, calls and
/// structure literals are the rare wide ones.
pub type Operands = SmallVec<[ValueId; 4]>;

/// Integer/float arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Rem,
    /// bitwise `&`
    And,
    /// bitwise `|`
    Or,
    /// bitwise `^`
    Xor,
    /// `<<`
    Shl,
    /// `>>`
    Shr,
    /// unary `-`
    Neg,
    /// unary `~`/`!`
    Not,
}

/// Comparison operators, producing an `Int1` predicate value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

/// Which index-space axis a grid/group/warp query reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexAxis {
    /// First dimension.
    X,
    /// Second dimension (2D/3D index spaces only).
    Y,
    /// Third dimension (3D index spaces only).
    Z,
}

/// Which address-space region an [`ValueKind::Alloca`] reserves storage in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AllocaKind {
    /// Per-thread local (stack-like) storage.
    Local,
    /// Statically-sized group-shared storage.
    SharedStatic,
    /// Dynamically-sized group-shared storage, whose element count is
    /// supplied at launch time rather than baked into the type.
    SharedDynamic,
}

/// One SSA value's defining operation.
///
/// Every variant here is either a node the kernel code generator (§4.11)
/// emits directly, or one of the eight node kinds the transformer pipeline
/// is obligated to eliminate before code generation (`ViewCast`, `SubView`,
/// `NewView`, `Length`, `Undefined`, `Handle`, `OutputWrite`,
/// `AcceleratorType`). Encountering one of those at code-gen time is always
/// [`crate::error::CompileError::InvalidCodeGeneration`].
#[derive(Debug, Clone, PartialEq)]
pub enum ValueKind {
    /// The `index`-th incoming parameter of the enclosing method.
    Param(u32),
    /// A signed/unsigned integer literal.
    ConstInt(i64),
    /// A floating-point literal.
    ConstFloat(f64),
    /// The null reference/pointer constant.
    ConstNull,
    /// A string literal (never marshalled: rejected by the argument
    /// mapper, kept only so frontends can emit debug-print payloads).
    ConstString(Arc<str>),
    /// An in-order aggregate literal assembling one value per field.
    StructureLiteral(Operands),
    /// A binary or unary arithmetic operation. Unary ops ignore the second
    /// operand, which is set to the same id as the first.
    Arithmetic(ArithOp, ValueId, ValueId),
    /// A comparison producing an `Int1` predicate.
    Compare(CompareOp, ValueId, ValueId),
    /// A numeric conversion (e.g. int-to-float) preserving value, changing
    /// representation.
    Convert(ValueId),
    /// A bit-preserving reinterpretation between same-width types.
    Cast(ValueId),
    /// Load through a pointer/view operand.
    Load(ValueId),
    /// Store `value` (second operand) through a pointer/view (first
    /// operand).
    Store(ValueId, ValueId),
    /// Compute the address of `index` field offsets from a base pointer.
    AddressOf(ValueId, u32),
    /// Reserve storage for `ty`. A `SharedDynamic` alloca carries `None` for
    /// its element count (the size is supplied at launch), everything else
    /// carries a known count.
    Alloca {
        /// Which address-space region this allocates in.
        kind: AllocaKind,
        /// Element type being allocated.
        ty: TypeNode,
        /// Element count, or `None` for a dynamically-sized shared alloca.
        count: Option<u32>,
    },
    /// Read field `index` out of an aggregate value.
    FieldGet(ValueId, u32),
    /// Produce a copy of an aggregate value with field `index` replaced.
    FieldSet(ValueId, u32, ValueId),
    /// The thread's position along `axis` in the global index space.
    GridIndex(IndexAxis),
    /// The thread's position along `axis` within its group (grouped index
    /// spaces only).
    GroupIndex(IndexAxis),
    /// The thread's lane id within its warp/wavefront.
    WarpIndex,
    /// The element count available in the kernel's dynamically-sized
    /// shared-memory region, supplied at launch.
    DynamicSharedMemoryLength,
    /// A group-wide execution barrier.
    Barrier,
    /// Broadcast `value` (first operand) from the lane identified by
    /// `source` (second operand) to every lane in the warp.
    Broadcast(ValueId, ValueId),
    /// Exchange `value` (first operand) with the lane at `offset` (second
    /// operand) within the warp.
    WarpShuffle(ValueId, ValueId),
    /// A debug-only assertion; eliminated under the `verify_after_each_pass
    /// = false` profile but otherwise retained through code generation.
    DebugAssert(ValueId),
    /// A debug trace print with a format string and argument list.
    DebugPrint(Arc<str>, Operands),
    /// An intra-context call to another method.
    Call(MethodId, Operands),
    /// A block-entry value selecting among predecessor values by the
    /// predecessor edge taken, one incoming value per CFG predecessor of
    /// the enclosing block.
    Phi(SmallVec<[(BlockId, ValueId); 4]>),

    // --- Node kinds the transformer pipeline MUST eliminate before code
    // generation; surviving one of these to code-gen time is always a bug
    // in the pipeline (see `CodeGenerator::must_be_eliminated`). ---
    /// Reinterpret a pointer as a view (pre-specialization only).
    ViewCast(ValueId),
    /// Narrow a view to a sub-range (pre-specialization only).
    SubView(ValueId, ValueId),
    /// Construct a view from a base pointer and length (pre-specialization
    /// only).
    NewView(ValueId, ValueId),
    /// Read a view's length (pre-specialization only; the length is folded
    /// into a constant or a dynamic-shared-memory-length query).
    Length(ValueId),
    /// A placeholder for a value the frontend could not materialize yet.
    Undefined,
    /// An opaque runtime handle value (e.g. an accelerator resource handle)
    /// that has no device-side representation.
    Handle,
    /// A write to an output buffer using the high-level runtime's output
    /// protocol, rewritten into a plain `Store` by the specializer.
    OutputWrite(ValueId, ValueId),
    /// A reference to the `AcceleratorType` metadata object, resolved to a
    /// constant by the specializer.
    AcceleratorType,
}

impl ValueKind {
    /// True for the eight node kinds the pipeline must eliminate before
    /// code generation.
    pub fn must_be_eliminated(&self) -> bool {
        matches!(
            self,
            Self::ViewCast(_)
                | Self::SubView(..)
                | Self::NewView(..)
                | Self::Length(_)
                | Self::Undefined
                | Self::Handle
                | Self::OutputWrite(..)
                | Self::AcceleratorType
        )
    }

    /// True if this is a [`ValueKind::Phi`].
    pub fn is_phi(&self) -> bool {
        matches!(self, Self::Phi(_))
    }

    /// True if this is a [`ValueKind::Call`].
    pub fn as_call(&self) -> Option<(MethodId, &[ValueId])> {
        match self {
            Self::Call(callee, args) => Some((*callee, args.as_slice())),
            _ => None,
        }
    }

    /// True if this is a [`ValueKind::Alloca`].
    pub fn as_alloca(&self) -> Option<(AllocaKind, &TypeNode, Option<u32>)> {
        match self {
            Self::Alloca { kind, ty, count } => Some((*kind, ty, *count)),
            _ => None,
        }
    }
}

/// The instruction that ends a basic block and determines its CFG
/// successors.
#[derive(Debug, Clone, PartialEq)]
pub enum Terminator {
    /// Return from the method, optionally with a value.
    Return(Option<ValueId>),
    /// Unconditional jump.
    Jump(BlockId),
    /// Two-way conditional branch.
    Branch {
        /// `Int1` predicate operand.
        condition: ValueId,
        /// Target taken when `condition` is true.
        if_true: BlockId,
        /// Target taken when `condition` is false.
        if_false: BlockId,
    },
    /// Multi-way dispatch over an integer value.
    Switch {
        /// The scrutinee.
        value: ValueId,
        /// `(case value, target block)` pairs.
        cases: Vec<(i64, BlockId)>,
        /// Target taken when no case matches.
        default: BlockId,
    },
}

impl Terminator {
    /// The blocks this terminator can transfer control to, in a stable
    /// order (duplicates are possible, e.g. a switch whose default equals a
    /// case target, and are preserved rather than deduplicated since phi
    /// binding scheduling cares about the predecessor *edge*, not just the
    /// predecessor block).
    pub fn successors(&self) -> SmallVec<[BlockId; 4]> {
        match self {
            Self::Return(_) => SmallVec::new(),
            Self::Jump(target) => SmallVec::from_slice(&[*target]),
            Self::Branch {
                if_true, if_false, ..
            } => SmallVec::from_slice(&[*if_true, *if_false]),
            Self::Switch { cases, default, .. } => {
                let mut out: SmallVec<[BlockId; 4]> = cases.iter().map(|(_, b)| *b).collect();
                out.push(*default);
                out
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn must_be_eliminated_flags_exactly_the_eight_kinds() {
        assert!(ValueKind::Undefined.must_be_eliminated());
        assert!(ValueKind::Handle.must_be_eliminated());
        assert!(ValueKind::AcceleratorType.must_be_eliminated());
        assert!(!ValueKind::ConstNull.must_be_eliminated());
        assert!(!ValueKind::Barrier.must_be_eliminated());
    }

    #[test]
    fn switch_successors_include_default() {
        let term = Terminator::Switch {
            value: ValueId::from_u32(0),
            cases: vec![(0, BlockId::from_u32(1)), (1, BlockId::from_u32(2))],
            default: BlockId::from_u32(3),
        };
        let succs = term.successors();
        assert_eq!(succs.as_slice(), &[BlockId::from_u32(1), BlockId::from_u32(2), BlockId::from_u32(3)]);
    }
}
