//! Hardware-register descriptors for IR values, including compound
//! (structure/array) registers composed of primitives, aliasing, and
//! scoped freeing.
//!
//! One allocator instance belongs to exactly one code generator
//! (single-threaded: one instance per code generator); the
//! parallel driver in [`crate::codegen`] constructs a fresh allocator per
//! task rather than sharing one.

use rustc_hash::FxHashMap;

use crate::abi::Abi;
use crate::error::{CompileError, CompileResult};
use crate::ir::ValueId;
use crate::types::{AddressSpace, BasicValueType, TypeNode};

/// Target-defined register bank. Three banks cover every scalar kind this
/// crate's IR produces; a concrete backend may have more physical banks but
/// always maps onto one of these three logical ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegisterKind {
    /// General-purpose integer bank.
    Int,
    /// Floating-point bank.
    Float,
    /// Single-bit predicate bank.
    Predicate,
}

/// The hardware register class a primitive value is allocated into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegisterDescription {
    /// The value's scalar type.
    pub basic_value_type: BasicValueType,
    /// Which bank it lives in.
    pub kind: RegisterKind,
}

impl RegisterDescription {
    /// The bank a scalar type defaults into: `Int1` predicates go to the
    /// predicate bank, other integers to the integer bank, floats to the
    /// float bank.
    pub fn default_for(bvt: BasicValueType) -> Self {
        let kind = if matches!(bvt, BasicValueType::Int1) {
            RegisterKind::Predicate
        } else if bvt.is_float() {
            RegisterKind::Float
        } else {
            RegisterKind::Int
        };
        Self {
            basic_value_type: bvt,
            kind,
        }
    }
}

/// A literal value carried inline by a [`Register::Constant`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConstantLiteral {
    /// An integer constant, reinterpreted to the target width at emission.
    Int(i64),
    /// A floating-point constant.
    Float(f64),
}

/// A hardware-register handle for one IR value.
///
/// `Primitive` occupies exactly one hardware slot. `Constant` carries a
/// literal inline: this crate's policy is to resolve constants to an inline
/// literal unconditionally at `load` time rather than materializing a
/// separate constant-pool slot. `Compound`
/// mirrors a structure or array type one child per field/element; the
/// invariant `children.len() == type.fields().len()` (or `== array len`) is
/// enforced at construction in [`RegisterAllocator::allocate`].
#[derive(Debug, Clone, PartialEq)]
pub enum Register {
    /// One hardware slot.
    Primitive {
        /// The slot's bank/type.
        description: RegisterDescription,
        /// A backend-opaque numbering of the slot, unique within one
        /// allocator instance per bank.
        register_value: u32,
    },
    /// An inline literal.
    Constant {
        /// The slot's bank/type, for emitters that need to know the
        /// literal's target representation.
        description: RegisterDescription,
        /// The literal payload.
        literal: ConstantLiteral,
    },
    /// An ordered sequence of child registers mirroring a structure or
    /// array type.
    Compound(Vec<Register>),
}

/// Backend-provided strategy for allocating a [`TypeNode::View`].
///
/// The concrete shape is left to "a backend-provided
/// policy"; the default below represents the common `(pointer, length)`
/// convention as a two-primitive compound, which is what every one of this
/// crate's supported targets (PTX, OpenCL, the IL stub) actually uses.
pub trait ViewRegisterPolicy {
    /// Allocate storage for a view over `element_type` in `space`, using
    /// `abi` for pointer width.
    fn allocate(&self, abi: &Abi, element_type: &TypeNode, space: AddressSpace) -> Register;
}

/// The `(pointer, length)` default view policy.
pub struct PointerLengthViewPolicy;

impl ViewRegisterPolicy for PointerLengthViewPolicy {
    fn allocate(&self, abi: &Abi, _element_type: &TypeNode, _space: AddressSpace) -> Register {
        let ptr_bits = abi.pointer_arithmetic_bits();
        let ptr_bvt = if ptr_bits == 64 {
            BasicValueType::Int64
        } else {
            BasicValueType::Int32
        };
        Register::Compound(vec![
            Register::Primitive {
                description: RegisterDescription::default_for(ptr_bvt),
                register_value: 0,
            },
            Register::Primitive {
                description: RegisterDescription::default_for(BasicValueType::Int32),
                register_value: 0,
            },
        ])
    }
}

/// Per-code-generator register allocator.
pub struct RegisterAllocator<'a> {
    abi: &'a Abi,
    view_policy: Box<dyn ViewRegisterPolicy + 'a>,
    bindings: FxHashMap<ValueId, Register>,
    aliases: FxHashMap<ValueId, ValueId>,
    next_slot: [u32; 3],
}

impl<'a> RegisterAllocator<'a> {
    /// Build an allocator bound to `abi`, using the default
    /// `(pointer, length)` view policy.
    pub fn new(abi: &'a Abi) -> Self {
        Self::with_view_policy(abi, PointerLengthViewPolicy)
    }

    /// Build an allocator with an explicit view-register policy.
    pub fn with_view_policy(abi: &'a Abi, view_policy: impl ViewRegisterPolicy + 'a) -> Self {
        Self {
            abi,
            view_policy: Box::new(view_policy),
            bindings: FxHashMap::default(),
            aliases: FxHashMap::default(),
            next_slot: [0; 3],
        }
    }

    fn fresh_slot(&mut self, kind: RegisterKind) -> u32 {
        let idx = kind as usize;
        let slot = self.next_slot[idx];
        self.next_slot[idx] += 1;
        slot
    }

    fn allocate_for_type(&mut self, ty: &TypeNode) -> Register {
        match ty {
            TypeNode::Primitive(bvt) => {
                let description = RegisterDescription::default_for(*bvt);
                let register_value = self.fresh_slot(description.kind);
                Register::Primitive {
                    description,
                    register_value,
                }
            }
            TypeNode::Pointer(_, _) | TypeNode::String => {
                let ptr_bits = self.abi.pointer_arithmetic_bits();
                let bvt = if ptr_bits == 64 {
                    BasicValueType::Int64
                } else {
                    BasicValueType::Int32
                };
                let description = RegisterDescription::default_for(bvt);
                let register_value = self.fresh_slot(description.kind);
                Register::Primitive {
                    description,
                    register_value,
                }
            }
            TypeNode::View(elem, space) => self.view_policy.allocate(self.abi, elem, *space),
            TypeNode::Structure(fields) => {
                let children = fields.iter().map(|f| self.allocate_for_type(&f.ty)).collect();
                Register::Compound(children)
            }
            TypeNode::Array(elem, len) => {
                let children = (0..*len).map(|_| self.allocate_for_type(elem)).collect();
                Register::Compound(children)
            }
            TypeNode::Void => Register::Compound(Vec::new()),
        }
    }

    /// Allocate a register for `value` of static type `ty`. Idempotent: a
    /// value that already has a binding (directly, or transitively through
    /// [`RegisterAllocator::alias`]) returns the existing register without
    /// allocating new hardware slots.
    pub fn allocate(&mut self, value: ValueId, ty: &TypeNode) -> Register {
        if let Ok(existing) = self.load(value) {
            return existing;
        }
        let register = self.allocate_for_type(ty);
        self.bindings.insert(value, register.clone());
        register
    }

    /// Allocate an explicit primitive register for `value`, overriding the
    /// type-driven bank selection (e.g. forcing an `Int1` into the integer
    /// bank rather than the predicate bank).
    pub fn allocate_with_description(
        &mut self,
        value: ValueId,
        description: RegisterDescription,
    ) -> Register {
        if let Ok(existing) = self.load(value) {
            return existing;
        }
        let register_value = self.fresh_slot(description.kind);
        let register = Register::Primitive {
            description,
            register_value,
        };
        self.bindings.insert(value, register.clone());
        register
    }

    /// Overwrite `value`'s binding with an explicit register, used during
    /// phi-binding lowering to pre-seed a phi's register ahead of the
    /// predecessor moves that populate it.
    pub fn bind(&mut self, value: ValueId, register: Register) {
        self.bindings.insert(value, register);
    }

    /// Record that `value` shares storage with `other`. Resolved to a fixed
    /// point at `load` time rather than eagerly, so `alias` calls may be
    /// issued in any order.
    pub fn alias(&mut self, value: ValueId, other: ValueId) {
        self.aliases.insert(value, other);
    }

    /// Resolve `value` through the alias chain to the value that actually
    /// holds a binding, detecting cycles.
    fn resolve_alias_root(&self, mut value: ValueId) -> CompileResult<ValueId> {
        let mut seen = FxHashMap::default();
        while !self.bindings.contains_key(&value) {
            if seen.insert(value, ()).is_some() {
                return Err(CompileError::InvalidCodeGeneration(format!(
                    "register alias cycle detected while resolving {value}"
                )));
            }
            match self.aliases.get(&value) {
                Some(&next) => value = next,
                None => {
                    return Err(CompileError::InvalidCodeGeneration(format!(
                        "value {value} has no register binding and no alias target"
                    )))
                }
            }
        }
        Ok(value)
    }

    /// Load the register bound to `value`, following alias chains to a
    /// fixed point. Fails with `InvalidCodeGeneration` if `value` is
    /// unbound and has no alias chain leading to a binding.
    pub fn load(&self, value: ValueId) -> CompileResult<Register> {
        let root = self.resolve_alias_root(value)?;
        Ok(self.bindings[&root].clone())
    }

    /// Load `value`'s register, asserting it is a [`Register::Primitive`]
    /// (or a bank-compatible [`Register::Constant`]) and returning its
    /// description and slot/literal payload. This is the concrete
    /// narrowing this crate's own code generator needs in place of a fully
    /// generic `loadAs<T>`, which has no meaning without a concrete
    /// backend-specific hardware register type to parameterize over.
    pub fn load_primitive(&self, value: ValueId) -> CompileResult<Register> {
        match self.load(value)? {
            reg @ (Register::Primitive { .. } | Register::Constant { .. }) => Ok(reg),
            Register::Compound(_) => Err(CompileError::InvalidCodeGeneration(format!(
                "value {value} is bound to a compound register, expected a primitive"
            ))),
        }
    }

    /// Load `value`'s register, asserting it is a [`Register::Compound`]
    /// and returning its children.
    pub fn load_compound(&self, value: ValueId) -> CompileResult<Vec<Register>> {
        match self.load(value)? {
            Register::Compound(children) => Ok(children),
            _ => Err(CompileError::InvalidCodeGeneration(format!(
                "value {value} is not bound to a compound register"
            ))),
        }
    }

    /// Release the hardware register(s) bound to `value`. Recursive over
    /// compounds in the sense that it accounts for every nested slot; this
    /// allocator does not reuse freed slot numbers (virtual registers are
    /// cheap and unbounded for every target this crate emits for), so
    /// freeing only drops the binding, making `value` eligible to be
    /// allocated again.
    pub fn free(&mut self, value: ValueId) {
        self.bindings.remove(&value);
        self.aliases.remove(&value);
    }

    /// Number of hardware slots of `kind` handed out so far.
    pub fn slots_used(&self, kind: RegisterKind) -> u32 {
        self.next_slot[kind as usize]
    }
}
