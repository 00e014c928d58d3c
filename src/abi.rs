//! Native size/alignment/field-offset resolution for IR types.
//!
//! The layout algorithm mirrors how Cranelift's ABI legalization walks a
//! parameter list in declared order (see `cranelift-codegen::abi`), but
//! instead of producing argument-assignment actions it produces the
//! struct-layout triple `(size, alignment, field offsets)` the rest of the
//! backend depends on for register shapes and argument marshalling.

use rustc_hash::FxHashMap;
use std::sync::Mutex;

use crate::platform::TargetPlatform;
use crate::types::TypeNode;

/// Resolved native layout of a type: size, alignment, and (for structures)
/// per-field byte offsets.
///
/// Invariants (asserted in debug builds, and exercised by this module's
/// tests): `fieldOffsets[i] % alignment(field_i) == 0`; `size % alignment ==
/// 0`; empty structures have `size == 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbiTypeInfo {
    /// Total size in bytes, padding included.
    pub size: u32,
    /// Required alignment in bytes.
    pub alignment: u32,
    /// Byte offset of each field, in declaration order. Empty for
    /// non-structure types.
    pub field_offsets: Vec<u32>,
}

/// Round `offset` up to the next multiple of `alignment`.
///
/// `alignment` must be a power of two; this is a programming-error
/// precondition, not a recoverable failure (ABI
/// layout failures outside the typed-error taxonomy: "invalid types are a
/// programming error").
pub fn align(offset: u32, alignment: u32) -> u32 {
    debug_assert!(alignment.is_power_of_two(), "alignment must be a power of two");
    (offset + alignment - 1) & !(alignment - 1)
}

/// Native size/alignment/offset resolver for a target platform.
///
/// One `Abi` is owned per [`crate::backend::Backend`] instance and shared,
/// read-only, across the parallel code-generation fork: the memoization
/// table is populated during the sequential pre-steps and only ever read
/// afterwards, guarded by a `Mutex` so a memoization *miss* triggered
/// concurrently doesn't race.
pub struct Abi {
    platform: TargetPlatform,
    cache: Mutex<FxHashMap<TypeNode, AbiTypeInfo>>,
}

impl Abi {
    /// Create a new, empty-cache ABI resolver for `platform`.
    pub fn new(platform: TargetPlatform) -> Self {
        Self {
            platform,
            cache: Mutex::new(FxHashMap::default()),
        }
    }

    /// The platform this resolver was constructed for.
    pub fn platform(&self) -> TargetPlatform {
        self.platform
    }

    /// The unsigned integer type used for pointer arithmetic on this
    /// platform (32-bit platforms use `UInt32`-equivalent arithmetic, 64-bit
    /// platforms use `UInt64`-equivalent).
    pub fn pointer_arithmetic_bits(&self) -> u32 {
        self.platform.pointer_size() * 8
    }

    /// Size in bytes of `ty` on this platform.
    pub fn size_of(&self, ty: &TypeNode) -> u32 {
        self.info_of(ty).size
    }

    /// Required alignment in bytes of `ty` on this platform.
    pub fn alignment_of(&self, ty: &TypeNode) -> u32 {
        self.info_of(ty).alignment
    }

    /// Field byte offsets of `ty` (empty for non-structures).
    pub fn offsets_of(&self, ty: &TypeNode) -> Vec<u32> {
        self.info_of(ty).field_offsets
    }

    /// Byte offset of field `index` within structure type `ty`.
    ///
    /// # Panics
    /// Panics if `index` is out of range for `ty`'s field list. An
    /// out-of-bounds field index is a caller bug, not a typed `CompileError`.
    pub fn offset_of(&self, ty: &TypeNode, index: usize) -> u32 {
        self.info_of(ty).field_offsets[index]
    }

    /// Round `offset` up to the alignment required by `ty`.
    pub fn align(&self, offset: u32, ty: &TypeNode) -> u32 {
        align(offset, self.alignment_of(ty))
    }

    /// Resolve (and memoize) the full layout triple for `ty`.
    pub fn info_of(&self, ty: &TypeNode) -> AbiTypeInfo {
        if let Some(hit) = self.cache.lock().unwrap().get(ty) {
            return hit.clone();
        }
        let computed = self.compute(ty);
        self.cache
            .lock()
            .unwrap()
            .insert(ty.clone(), computed.clone());
        computed
    }

    fn compute(&self, ty: &TypeNode) -> AbiTypeInfo {
        let info = match ty {
            TypeNode::Primitive(bvt) => AbiTypeInfo {
                size: bvt.size(),
                alignment: bvt.alignment(),
                field_offsets: Vec::new(),
            },
            TypeNode::Pointer(_, _) => {
                let size = self.platform.pointer_size();
                AbiTypeInfo {
                    size,
                    alignment: size,
                    field_offsets: Vec::new(),
                }
            }
            // A view is a (pointer, length) pair; the extra 4 bytes store the
            // element count alongside the pointer. Alignment follows the
            // pointer's, which is always the wider of the two fields.
            TypeNode::View(_, _) => {
                let ptr_size = self.platform.pointer_size();
                AbiTypeInfo {
                    size: align(ptr_size + 4, ptr_size),
                    alignment: ptr_size,
                    field_offsets: Vec::new(),
                }
            }
            TypeNode::Structure(fields) => {
                if fields.is_empty() {
                    return AbiTypeInfo {
                        size: 1,
                        alignment: 1,
                        field_offsets: Vec::new(),
                    };
                }
                let mut offset = 0u32;
                let mut max_align = 1u32;
                let mut field_offsets = Vec::with_capacity(fields.len());
                for field in fields.iter() {
                    let field_align = self.alignment_of(&field.ty);
                    let field_size = self.size_of(&field.ty);
                    let element_offset = align(offset, field_align);
                    field_offsets.push(element_offset);
                    offset = element_offset + field_size;
                    max_align = max_align.max(field_align);
                }
                AbiTypeInfo {
                    size: align(offset, max_align),
                    alignment: max_align,
                    field_offsets,
                }
            }
            TypeNode::Array(elem, len) => {
                let elem_align = self.alignment_of(elem);
                let elem_size = self.size_of(elem);
                let stride = align(elem_size, elem_align);
                AbiTypeInfo {
                    size: stride * (*len).max(1),
                    alignment: elem_align,
                    field_offsets: Vec::new(),
                }
            }
            TypeNode::String => {
                let size = self.platform.pointer_size();
                AbiTypeInfo {
                    size,
                    alignment: size,
                    field_offsets: Vec::new(),
                }
            }
            TypeNode::Void => AbiTypeInfo {
                size: 0,
                alignment: 1,
                field_offsets: Vec::new(),
            },
        };

        debug_assert!(
            info.alignment == 0 || info.size % info.alignment == 0,
            "layout size must be a multiple of its own alignment"
        );
        info
    }
}
