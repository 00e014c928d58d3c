//! Host-parameter-to-device-slot flattening.
//!
//! Recursively decomposes a host-side parameter type into an ordered
//! sequence of [`Mapping`] entries a launch-time marshaller drives: "read
//! leaves in declared order, write to sequential target slots", the same
//! shape Cranelift's ABI legalizer assigns argument
//! locations in declaration order (`cranelift-codegen::isa::abi`), except
//! here the destination is a device argument buffer rather than a register
//! or stack slot.

use crate::error::{CompileError, CompileResult};
use crate::types::{BasicValueType, TypeNode};

/// One flattened argument slot.
#[derive(Debug, Clone, PartialEq)]
pub enum Mapping {
    /// Copy a scalar value directly into target slot `target_id`.
    Primitive {
        /// Position in the outbound (flattened) argument layout.
        target_id: u32,
        /// The scalar's type.
        basic_value_type: BasicValueType,
    },
    /// Marshal a view (pointer + length) into target slot `target_id`.
    View {
        /// Position in the outbound argument layout.
        target_id: u32,
        /// The view's element type.
        element_type: TypeNode,
    },
    /// A structure's fields, each mapped independently and in declared
    /// order. Carries no target slot of its own (its children do).
    Structure(Vec<Mapping>),
}

impl Mapping {
    /// The number of leaf (`Primitive`/`View`) slots this mapping expands
    /// to, used to size the outbound argument buffer.
    pub fn leaf_count(&self) -> usize {
        match self {
            Mapping::Primitive { .. } | Mapping::View { .. } => 1,
            Mapping::Structure(children) => children.iter().map(Mapping::leaf_count).sum(),
        }
    }
}

/// Flattens host-side parameter types into device-marshallable [`Mapping`]
/// plans.
///
/// Stateless aside from the running `target_id` counter threaded through
/// one [`ArgumentMapper::map`] call; a fresh counter starts at each call so
/// repeated calls for independent parameters are reproducible.
#[derive(Debug, Default)]
pub struct ArgumentMapper;

impl ArgumentMapper {
    /// Construct a mapper. Stateless: exists mainly to mirror an
    /// object-shaped contract and to give call sites a stable place to
    /// attach future configuration.
    pub fn new() -> Self {
        Self
    }

    /// Flatten `ty` into a `Mapping` plan, starting target ids at 0.
    pub fn map(&self, ty: &TypeNode) -> CompileResult<Mapping> {
        let mut next_target_id = 0u32;
        self.map_with(ty, &mut next_target_id)
    }

    fn map_with(&self, ty: &TypeNode, next_target_id: &mut u32) -> CompileResult<Mapping> {
        match ty {
            TypeNode::Primitive(bvt) => {
                let target_id = *next_target_id;
                *next_target_id += 1;
                Ok(Mapping::Primitive {
                    target_id,
                    basic_value_type: *bvt,
                })
            }
            TypeNode::View(elem, _) => {
                let target_id = *next_target_id;
                *next_target_id += 1;
                Ok(Mapping::View {
                    target_id,
                    element_type: (**elem).clone(),
                })
            }
            TypeNode::Structure(fields) => {
                let children = fields
                    .iter()
                    .map(|f| self.map_with(&f.ty, next_target_id))
                    .collect::<CompileResult<Vec<_>>>()?;
                Ok(Mapping::Structure(children))
            }
            TypeNode::Pointer(_, _)
            | TypeNode::Array(_, _)
            | TypeNode::String
            | TypeNode::Void => Err(CompileError::UnsupportedParameterType(ty.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AddressSpace, Field};
    use std::sync::Arc;

    fn field(name: &str, ty: TypeNode) -> Field {
        Field {
            name: Arc::from(name),
            ty,
        }
    }

    #[test]
    fn primitive_maps_to_a_single_slot() {
        let mapper = ArgumentMapper::new();
        let mapping = mapper.map(&TypeNode::primitive(BasicValueType::Int32)).unwrap();
        assert_eq!(
            mapping,
            Mapping::Primitive {
                target_id: 0,
                basic_value_type: BasicValueType::Int32
            }
        );
        assert_eq!(mapping.leaf_count(), 1);
    }

    #[test]
    fn view_maps_to_a_single_slot() {
        let mapper = ArgumentMapper::new();
        let elem = TypeNode::primitive(BasicValueType::Float32);
        let mapping = mapper.map(&TypeNode::view(elem.clone(), AddressSpace::Generic)).unwrap();
        assert_eq!(
            mapping,
            Mapping::View {
                target_id: 0,
                element_type: elem
            }
        );
    }

    #[test]
    fn structure_maps_fields_in_declared_order_with_sequential_ids() {
        let mapper = ArgumentMapper::new();
        let ty = TypeNode::structure(vec![
            field("a", TypeNode::primitive(BasicValueType::Int8)),
            field(
                "b",
                TypeNode::view(TypeNode::primitive(BasicValueType::Float32), AddressSpace::Generic),
            ),
            field("c", TypeNode::primitive(BasicValueType::Int64)),
        ]);
        let mapping = mapper.map(&ty).unwrap();
        match mapping {
            Mapping::Structure(children) => {
                assert_eq!(children.len(), 3);
                assert_eq!(
                    children[0],
                    Mapping::Primitive {
                        target_id: 0,
                        basic_value_type: BasicValueType::Int8
                    }
                );
                assert_eq!(
                    children[1],
                    Mapping::View {
                        target_id: 1,
                        element_type: TypeNode::primitive(BasicValueType::Float32)
                    }
                );
                assert_eq!(
                    children[2],
                    Mapping::Primitive {
                        target_id: 2,
                        basic_value_type: BasicValueType::Int64
                    }
                );
            }
            _ => panic!("expected a structure mapping"),
        }
    }

    #[test]
    fn empty_structure_maps_to_no_leaves() {
        let mapper = ArgumentMapper::new();
        let mapping = mapper.map(&TypeNode::structure(vec![])).unwrap();
        assert_eq!(mapping.leaf_count(), 0);
    }

    #[test]
    fn pointer_is_rejected() {
        let mapper = ArgumentMapper::new();
        let ty = TypeNode::pointer(TypeNode::primitive(BasicValueType::Int32), AddressSpace::Generic);
        let err = mapper.map(&ty).unwrap_err();
        assert!(matches!(err, CompileError::UnsupportedParameterType(_)));
    }

    #[test]
    fn array_is_rejected() {
        let mapper = ArgumentMapper::new();
        let ty = TypeNode::array(TypeNode::primitive(BasicValueType::Int32), 4);
        assert!(mapper.map(&ty).is_err());
    }

    #[test]
    fn string_and_void_are_rejected() {
        let mapper = ArgumentMapper::new();
        assert!(mapper.map(&TypeNode::String).is_err());
        assert!(mapper.map(&TypeNode::Void).is_err());
    }
}
