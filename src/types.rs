//! IR type nodes and primitive value types.
//!
//! `TypeNode` is the tagged union every other component in this crate walks:
//! the ABI (`crate::abi`) for layout, the register allocator
//! (`crate::regalloc`) for compound register shapes, and the argument mapper
//! (`crate::argument_mapper`) for host-parameter flattening.

use std::fmt;
use std::sync::Arc;

/// Scalar value kinds an IR `Value` can carry in a single hardware slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BasicValueType {
    /// Single-bit predicate/boolean.
    Int1,
    /// 8-bit integer.
    Int8,
    /// 16-bit integer.
    Int16,
    /// 32-bit integer.
    Int32,
    /// 64-bit integer.
    Int64,
    /// IEEE-754 binary16.
    Float16,
    /// IEEE-754 binary32.
    Float32,
    /// IEEE-754 binary64.
    Float64,
}

impl BasicValueType {
    /// Size in bytes of a single value of this primitive kind.
    pub fn size(self) -> u32 {
        match self {
            Self::Int1 | Self::Int8 => 1,
            Self::Int16 | Self::Float16 => 2,
            Self::Int32 | Self::Float32 => 4,
            Self::Int64 | Self::Float64 => 8,
        }
    }

    /// Natural alignment of this primitive kind, equal to its size.
    pub fn alignment(self) -> u32 {
        self.size()
    }

    /// Whether this is one of the integer kinds (as opposed to float).
    pub fn is_integer(self) -> bool {
        matches!(
            self,
            Self::Int1 | Self::Int8 | Self::Int16 | Self::Int32 | Self::Int64
        )
    }

    /// Whether this is one of the floating-point kinds.
    pub fn is_float(self) -> bool {
        !self.is_integer()
    }
}

impl fmt::Display for BasicValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Int1 => "i1",
            Self::Int8 => "i8",
            Self::Int16 => "i16",
            Self::Int32 => "i32",
            Self::Int64 => "i64",
            Self::Float16 => "f16",
            Self::Float32 => "f32",
            Self::Float64 => "f64",
        };
        f.write_str(name)
    }
}

/// The memory address space a pointer or view reaches into. Kept distinct
/// from the *kind* of region (local/shared-static/shared-dynamic) tracked by
/// [`crate::backend_context::Allocas`]: this is the IR-level tag carried on
/// the type, that one is the backend's bookkeeping of concrete allocations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressSpace {
    /// Per-thread generic/global memory.
    Generic,
    /// Group-shared memory.
    Shared,
    /// Per-thread local (stack-like) memory.
    Local,
    /// Constant/read-only memory.
    Constant,
}

/// A named, ordered field of a [`TypeNode::Structure`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Field {
    /// Declaration-order field name, used only for diagnostics.
    pub name: Arc<str>,
    /// The field's type.
    pub ty: TypeNode,
}

/// The tagged union of IR types this crate lowers.
///
/// `TypeNode` is deliberately cheap to clone (small variants, `Arc` for the
/// recursive ones) because the register allocator and ABI both walk it
/// recursively and memoize by structural identity, not by address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeNode {
    /// A single hardware-representable scalar.
    Primitive(BasicValueType),
    /// A raw pointer into an address space.
    Pointer(Arc<TypeNode>, AddressSpace),
    /// A `(pointer, length)` view into an address space.
    View(Arc<TypeNode>, AddressSpace),
    /// An aggregate of named, ordered fields.
    Structure(Arc<[Field]>),
    /// A fixed-length homogeneous array.
    Array(Arc<TypeNode>, u32),
    /// An immutable string (rejected everywhere except diagnostics:
    /// the argument mapper has no marshalling rule for it).
    String,
    /// The unit/no-value type.
    Void,
}

impl TypeNode {
    /// Construct a primitive type node.
    pub fn primitive(bvt: BasicValueType) -> Self {
        Self::Primitive(bvt)
    }

    /// Construct a structure type node from an ordered field list.
    pub fn structure(fields: impl IntoIterator<Item = Field>) -> Self {
        Self::Structure(fields.into_iter().collect())
    }

    /// Construct a pointer type node.
    pub fn pointer(elem: TypeNode, space: AddressSpace) -> Self {
        Self::Pointer(Arc::new(elem), space)
    }

    /// Construct a view type node.
    pub fn view(elem: TypeNode, space: AddressSpace) -> Self {
        Self::View(Arc::new(elem), space)
    }

    /// Construct a fixed-length array type node.
    pub fn array(elem: TypeNode, len: u32) -> Self {
        Self::Array(Arc::new(elem), len)
    }

    /// The ordered fields of a structure type, or an empty slice for any
    /// other type node (this lets callers treat non-structures as
    /// zero-field structures, which several of the recursive walks rely on).
    pub fn fields(&self) -> &[Field] {
        match self {
            Self::Structure(fields) => fields,
            _ => &[],
        }
    }

    /// True for [`TypeNode::Structure`] with no fields.
    pub fn is_empty_structure(&self) -> bool {
        matches!(self, Self::Structure(fields) if fields.is_empty())
    }

    /// True for [`TypeNode::View`].
    pub fn is_view(&self) -> bool {
        matches!(self, Self::View(..))
    }

    /// True for [`TypeNode::Pointer`].
    pub fn is_pointer(&self) -> bool {
        matches!(self, Self::Pointer(..))
    }
}

impl fmt::Display for TypeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive(bvt) => write!(f, "{bvt}"),
            Self::Pointer(elem, _) => write!(f, "ptr<{elem}>"),
            Self::View(elem, _) => write!(f, "view<{elem}>"),
            Self::Structure(fields) => {
                write!(f, "{{")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", field.name, field.ty)?;
                }
                write!(f, "}}")
            }
            Self::Array(elem, len) => write!(f, "[{elem}; {len}]"),
            Self::String => write!(f, "string"),
            Self::Void => write!(f, "void"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str, ty: TypeNode) -> Field {
        Field {
            name: Arc::from(name),
            ty,
        }
    }

    #[test]
    fn empty_structure_detection() {
        let empty = TypeNode::structure(vec![]);
        assert!(empty.is_empty_structure());

        let nonempty = TypeNode::structure(vec![field("x", TypeNode::primitive(BasicValueType::Int32))]);
        assert!(!nonempty.is_empty_structure());
    }

    #[test]
    fn display_roundtrips_structure_shape() {
        let ty = TypeNode::structure(vec![
            field("a", TypeNode::primitive(BasicValueType::Int8)),
            field("b", TypeNode::primitive(BasicValueType::Int64)),
        ]);
        assert_eq!(ty.to_string(), "{a: i8, b: i64}");
    }

    #[test]
    fn primitive_sizes() {
        assert_eq!(BasicValueType::Int1.size(), 1);
        assert_eq!(BasicValueType::Float64.size(), 8);
        assert_eq!(BasicValueType::Int32.alignment(), 4);
    }
}
