//! Kernel entry-point classification.
//!
//! Turns a method's flat parameter list into the shape a code generator
//! actually needs: which parameter is the index space, which remaining
//! ones are plain ("uniform") launch arguments, and which are shared-memory
//! buffers, with the index-type/shared-memory policy enforced here: the
//! one validation gate in this module is that shared memory is scoped to a
//! thread group, so only a grouped index space may declare any.

use std::sync::Arc;

use crate::abi::Abi;
use crate::error::{CompileError, CompileResult};
use crate::ir::Method;
use crate::platform::KernelSpecialization;
use crate::types::{BasicValueType, Field, TypeNode};

/// The kernel's index-space shape, classified from its first parameter.
///
/// Variant order matters: `is_grouped` relies on the grouped variants
/// sorting after the plain ones: `is_grouped` is exactly
/// `self >= IndexType::GroupedIndex1D`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IndexType {
    /// A single `Int32` index.
    Index1D,
    /// An `{x, y}` index pair.
    Index2D,
    /// An `{x, y, z}` index triple.
    Index3D,
    /// A `{grid, group}` pair of 1D indices (grouped launch).
    GroupedIndex1D,
    /// A `{grid, group}` pair of 2D indices.
    GroupedIndex2D,
    /// A `{grid, group}` pair of 3D indices.
    GroupedIndex3D,
}

impl IndexType {
    /// True for the three `Grouped*` variants.
    pub fn is_grouped(self) -> bool {
        self >= IndexType::GroupedIndex1D
    }

    /// Classify `ty` as an index-space type.
    ///
    /// Plain ranks follow the `Index1D`/`2D`/`3D` convention: a bare
    /// `Int32`, or a structure with fields named exactly `x, y` or `x, y,
    /// z`, all `Int32`. A grouped index is a two-field `{grid, group}`
    /// structure whose fields are both plain indices of the same rank.
    pub fn classify(ty: &TypeNode) -> CompileResult<Self> {
        if let Some(rank) = plain_rank(ty) {
            return Ok(rank.plain_index_type());
        }
        if let TypeNode::Structure(fields) = ty {
            if let [grid, group] = fields.as_ref() {
                if grid.name.as_ref() == "grid" && group.name.as_ref() == "group" {
                    if let (Some(grid_rank), Some(group_rank)) =
                        (plain_rank(&grid.ty), plain_rank(&group.ty))
                    {
                        if grid_rank == group_rank {
                            return Ok(grid_rank.grouped_index_type());
                        }
                    }
                }
            }
        }
        Err(CompileError::UnsupportedParameterType(ty.clone()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rank {
    One,
    Two,
    Three,
}

impl Rank {
    fn plain_index_type(self) -> IndexType {
        match self {
            Rank::One => IndexType::Index1D,
            Rank::Two => IndexType::Index2D,
            Rank::Three => IndexType::Index3D,
        }
    }

    fn grouped_index_type(self) -> IndexType {
        match self {
            Rank::One => IndexType::GroupedIndex1D,
            Rank::Two => IndexType::GroupedIndex2D,
            Rank::Three => IndexType::GroupedIndex3D,
        }
    }
}

fn plain_rank(ty: &TypeNode) -> Option<Rank> {
    match ty {
        TypeNode::Primitive(BasicValueType::Int32) => Some(Rank::One),
        TypeNode::Structure(fields) => {
            let all_i32 = fields
                .iter()
                .all(|f| matches!(f.ty, TypeNode::Primitive(BasicValueType::Int32)));
            if !all_i32 {
                return None;
            }
            let names: Vec<&str> = fields.iter().map(|f| f.name.as_ref()).collect();
            match names.as_slice() {
                ["x", "y"] => Some(Rank::Two),
                ["x", "y", "z"] => Some(Rank::Three),
                _ => None,
            }
        }
        _ => None,
    }
}

/// A plain (non-shared-memory) launch argument.
#[derive(Debug, Clone, PartialEq)]
pub struct UniformVar {
    /// Position in the method's full parameter list.
    pub index: u32,
    /// The parameter's static type.
    pub ty: TypeNode,
    /// Native size in bytes.
    pub size: u32,
}

/// A shared-memory kernel parameter, static or dynamically sized.
#[derive(Debug, Clone, PartialEq)]
pub struct SharedVar {
    /// Position in the method's full parameter list.
    pub index: u32,
    /// Contiguous index among only the *dynamically*-sized shared
    /// variables, assigned in declaration order; `None` for statically
    /// sized ones: a contiguous `shared_mem_index` is assigned only to
    /// dynamically-sized shared variables.
    pub shared_mem_index: Option<u32>,
    /// The parameter's declared type.
    pub ty: TypeNode,
    /// The element type backing this shared region.
    pub element_type: TypeNode,
    /// Whether this is a multi-element region (as opposed to a single
    /// shared instance).
    pub is_array: bool,
    /// Element count; `None` means the count is supplied at kernel launch.
    pub count: Option<u32>,
    /// Native size in bytes of one element.
    pub element_size: u32,
}

/// Frontend-supplied classification of one non-index kernel parameter,
/// carrying the annotation the bare IR type alone doesn't ("this parameter
/// is shared memory, with this static count") that a richer host-language
/// method descriptor would otherwise carry; this crate models it as an
/// explicit, minimal enum instead of re-purposing
/// `AddressSpace` tags, since a view's address space alone can't
/// distinguish "shared, statically sized N" from "shared, dynamically
/// sized".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterKind {
    /// An ordinary launch-time constant argument.
    Uniform,
    /// A shared-memory buffer. `count` pins a static element count; `None`
    /// means the element count is supplied at launch.
    SharedMemory {
        /// Static element count, if known ahead of launch.
        count: Option<u32>,
    },
}

/// The aggregate group-shared-memory footprint for one compilation:
/// produced by [`crate::backend_context::BackendContext::shared_memory_spec`]
/// from in-body allocas, then widened by [`EntryPoint::build`] to also
/// cover the kernel's shared-memory *parameters*, which are classified
/// separately from the body-local allocas the backend context walks, but
/// both contribute to the one launch-time shared-memory footprint).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SharedMemorySpec {
    /// Total statically-known shared-memory bytes required.
    pub shared_memory_size: u32,
    /// Whether any contributor's size is only known at launch time.
    pub has_dynamic: bool,
}

/// Classified kernel entry point.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryPoint {
    /// The kernel method's declared name.
    pub method_name: Arc<str>,
    /// The index-space shape of the kernel's first parameter.
    pub index_type: IndexType,
    /// Non-shared-memory parameters, in declaration order.
    pub uniform_variables: Vec<UniformVar>,
    /// Shared-memory parameters, in declaration order.
    pub shared_memory_variables: Vec<SharedVar>,
    /// Aggregate shared-memory footprint: the body-alloca contribution
    /// from [`crate::backend_context::BackendContext`] plus this entry
    /// point's own shared-memory parameters.
    pub shared_memory_spec: SharedMemorySpec,
    /// Launch-time hints passed through unchanged.
    pub specialization: KernelSpecialization,
}

impl EntryPoint {
    /// Classify `method`'s parameter list into an [`EntryPoint`].
    ///
    /// `kinds` must have one entry per parameter after the first (the
    /// index-space parameter carries no kind of its own). `backend_shared`
    /// is the body-alloca shared-memory contribution computed separately
    /// by [`crate::backend_context::BackendContext`]; this entry point's
    /// own shared-memory parameters are added on top of it.
    pub fn build(
        method: &Method,
        kinds: &[ParameterKind],
        abi: &Abi,
        backend_shared: SharedMemorySpec,
        specialization: KernelSpecialization,
    ) -> CompileResult<Self> {
        let index_ty = method.params.first().ok_or_else(|| {
            CompileError::InvalidCodeGeneration(format!(
                "kernel method `{}` has no parameters to classify an index type from",
                method.name
            ))
        })?;
        let index_type = IndexType::classify(index_ty)?;

        let rest = &method.params[1..];
        if rest.len() != kinds.len() {
            return Err(CompileError::InvalidCodeGeneration(format!(
                "kernel method `{}` has {} non-index parameters but {} parameter kinds were supplied",
                method.name,
                rest.len(),
                kinds.len()
            )));
        }

        let mut uniform_variables = Vec::new();
        let mut shared_memory_variables = Vec::new();
        let mut next_shared_mem_index = 0u32;

        for (offset, (ty, kind)) in rest.iter().zip(kinds.iter()).enumerate() {
            let index = (offset + 1) as u32;
            match kind {
                ParameterKind::Uniform => {
                    uniform_variables.push(UniformVar {
                        index,
                        ty: ty.clone(),
                        size: abi.size_of(ty),
                    });
                }
                ParameterKind::SharedMemory { count } => {
                    let shared = decode_shared_var(index, ty, *count, abi)?;
                    if shared.count.is_none() {
                        shared_memory_variables.push(SharedVar {
                            shared_mem_index: Some(next_shared_mem_index),
                            ..shared
                        });
                        next_shared_mem_index += 1;
                    } else {
                        shared_memory_variables.push(shared);
                    }
                }
            }
        }

        // Only grouped launches have a meaningful group-shared region;
        // an implicit (ungrouped) index space has no thread-group concept
        // for the shared variable to be scoped to.
        if !index_type.is_grouped() && !shared_memory_variables.is_empty() {
            return Err(CompileError::UnsupportedSharedMemoryUse);
        }

        let own_size: u32 = shared_memory_variables
            .iter()
            .map(|v| v.element_size * v.count.unwrap_or(1))
            .sum();
        let own_has_dynamic = shared_memory_variables.iter().any(|v| v.count.is_none());
        let shared_memory_spec = SharedMemorySpec {
            shared_memory_size: backend_shared.shared_memory_size + own_size,
            has_dynamic: backend_shared.has_dynamic || own_has_dynamic,
        };

        log::debug!(
            "entry point `{}`: index={index_type:?}, {} uniform, {} shared, {} bytes shared memory",
            method.name,
            uniform_variables.len(),
            shared_memory_variables.len(),
            shared_memory_spec.shared_memory_size,
        );

        Ok(Self {
            method_name: Arc::clone(&method.name),
            index_type,
            uniform_variables,
            shared_memory_variables,
            shared_memory_spec,
            specialization,
        })
    }
}

fn decode_shared_var(
    index: u32,
    ty: &TypeNode,
    requested_count: Option<u32>,
    abi: &Abi,
) -> CompileResult<SharedVar> {
    match ty {
        TypeNode::Array(elem, len) => Ok(SharedVar {
            index,
            shared_mem_index: None,
            ty: ty.clone(),
            element_type: (**elem).clone(),
            is_array: true,
            count: Some(*len),
            element_size: abi.size_of(elem),
        }),
        TypeNode::View(elem, _) => Ok(SharedVar {
            index,
            shared_mem_index: None,
            ty: ty.clone(),
            element_type: (**elem).clone(),
            is_array: requested_count != Some(1),
            count: requested_count,
            element_size: abi.size_of(elem),
        }),
        TypeNode::Pointer(elem, _) => Ok(SharedVar {
            index,
            shared_mem_index: None,
            ty: ty.clone(),
            element_type: (**elem).clone(),
            is_array: requested_count.is_none(),
            count: requested_count.or(Some(1)),
            element_size: abi.size_of(elem),
        }),
        TypeNode::Primitive(_) | TypeNode::Structure(_) => {
            let count = requested_count.or(Some(1));
            Ok(SharedVar {
                index,
                shared_mem_index: None,
                ty: ty.clone(),
                element_type: ty.clone(),
                is_array: count.is_none(),
                count,
                element_size: abi.size_of(ty),
            })
        }
        TypeNode::String | TypeNode::Void => Err(CompileError::UnsupportedParameterType(ty.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::TargetPlatform;
    use crate::types::AddressSpace;

    fn abi() -> Abi {
        Abi::new(TargetPlatform::Platform64Bit)
    }

    fn field(name: &str, ty: TypeNode) -> Field {
        Field {
            name: Arc::from(name),
            ty,
        }
    }

    #[test]
    fn classifies_bare_int32_as_index_1d() {
        let ty = TypeNode::primitive(BasicValueType::Int32);
        assert_eq!(IndexType::classify(&ty).unwrap(), IndexType::Index1D);
    }

    #[test]
    fn classifies_xy_structure_as_index_2d() {
        let ty = TypeNode::structure(vec![
            field("x", TypeNode::primitive(BasicValueType::Int32)),
            field("y", TypeNode::primitive(BasicValueType::Int32)),
        ]);
        assert_eq!(IndexType::classify(&ty).unwrap(), IndexType::Index2D);
    }

    #[test]
    fn classifies_grid_group_as_grouped() {
        let plain = TypeNode::structure(vec![
            field("x", TypeNode::primitive(BasicValueType::Int32)),
            field("y", TypeNode::primitive(BasicValueType::Int32)),
        ]);
        let grouped = TypeNode::structure(vec![
            field("grid", plain.clone()),
            field("group", plain),
        ]);
        let classified = IndexType::classify(&grouped).unwrap();
        assert_eq!(classified, IndexType::GroupedIndex2D);
        assert!(classified.is_grouped());
    }

    #[test]
    fn implicit_index_with_shared_memory_is_rejected() {
        let abi = abi();
        let m = Method::new(
            "k",
            vec![
                TypeNode::primitive(BasicValueType::Int32),
                TypeNode::array(TypeNode::primitive(BasicValueType::Float32), 16),
            ],
            TypeNode::Void,
        );
        let kinds = [ParameterKind::SharedMemory { count: Some(16) }];
        let result = EntryPoint::build(&m, &kinds, &abi, SharedMemorySpec::default(), KernelSpecialization::default());
        assert!(matches!(result, Err(CompileError::UnsupportedSharedMemoryUse)));
    }

    #[test]
    fn grouped_index_with_shared_memory_is_accepted() {
        let abi = abi();
        let plain = TypeNode::structure(vec![
            field("x", TypeNode::primitive(BasicValueType::Int32)),
        ]);
        let grouped = TypeNode::structure(vec![
            field("grid", plain.clone()),
            field("group", plain),
        ]);
        let m = Method::new(
            "k",
            vec![
                grouped,
                TypeNode::array(TypeNode::primitive(BasicValueType::Float32), 8),
            ],
            TypeNode::Void,
        );
        let kinds = [ParameterKind::SharedMemory { count: Some(8) }];
        let result = EntryPoint::build(&m, &kinds, &abi, SharedMemorySpec::default(), KernelSpecialization::default());
        assert!(result.is_ok());
    }

    #[test]
    fn dynamic_shared_variables_get_contiguous_indices() {
        let abi = abi();
        let grouped_index = TypeNode::structure(vec![
            field("grid", TypeNode::primitive(BasicValueType::Int32)),
            field("group", TypeNode::primitive(BasicValueType::Int32)),
        ]);
        let m = Method::new(
            "k",
            vec![
                grouped_index,
                TypeNode::view(TypeNode::primitive(BasicValueType::Float32), AddressSpace::Shared),
                TypeNode::view(TypeNode::primitive(BasicValueType::Int32), AddressSpace::Shared),
            ],
            TypeNode::Void,
        );
        let kinds = [
            ParameterKind::SharedMemory { count: None },
            ParameterKind::SharedMemory { count: None },
        ];
        let entry = EntryPoint::build(&m, &kinds, &abi, SharedMemorySpec::default(), KernelSpecialization::default()).unwrap();
        let indices: Vec<_> = entry
            .shared_memory_variables
            .iter()
            .map(|v| v.shared_mem_index)
            .collect();
        assert_eq!(indices, vec![Some(0), Some(1)]);
    }

    #[test]
    fn view_as_shared_with_a_static_count_is_a_static_array() {
        let abi = abi();
        let ty = TypeNode::view(TypeNode::primitive(BasicValueType::Float32), AddressSpace::Shared);
        let var = decode_shared_var(1, &ty, Some(256), &abi).unwrap();
        assert!(var.is_array);
        assert_eq!(var.count, Some(256));
        assert_eq!(var.element_size, 4);
        assert_eq!(var.element_size * var.count.unwrap(), 1024);
    }

    #[test]
    fn view_as_shared_with_count_one_is_a_single_instance() {
        let abi = abi();
        let ty = TypeNode::view(TypeNode::primitive(BasicValueType::Float32), AddressSpace::Shared);
        let var = decode_shared_var(1, &ty, Some(1), &abi).unwrap();
        assert!(!var.is_array);
        assert_eq!(var.count, Some(1));
    }
}
