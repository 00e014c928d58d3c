//! Human-readable dumps of the structures most useful when a kernel fails
//! to compile or miscompiles: an entry point's parameter classification, its
//! shared-memory footprint, and a method's phi-copy schedule.
//!
//! These are `Display` impls, not a debugger: they exist for hook callbacks
//! and tests to render a stable, greppable snapshot, the same role
//! `cranelift-codegen::ir::Function`'s `Display` impl plays for dumping IR
//! between passes.

use std::fmt;

use crate::entry_point::{EntryPoint, SharedMemorySpec};
use crate::ir::Method;
use crate::phi::PhiBindings;

impl fmt::Display for SharedMemorySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.shared_memory_size == 0 && !self.has_dynamic {
            return write!(f, "shared memory: none");
        }
        write!(
            f,
            "shared memory: {} static bytes{}",
            self.shared_memory_size,
            if self.has_dynamic { " + dynamic" } else { "" }
        )
    }
}

impl fmt::Display for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "entry point `{}`", self.method_name)?;
        writeln!(f, "  index type: {:?}", self.index_type)?;
        writeln!(f, "  uniform variables:")?;
        for var in &self.uniform_variables {
            writeln!(f, "    [{}] {} ({} bytes)", var.index, var.ty, var.size)?;
        }
        writeln!(f, "  shared memory variables:")?;
        for var in &self.shared_memory_variables {
            let count = var
                .count
                .map(|c| c.to_string())
                .unwrap_or_else(|| "dynamic".to_string());
            writeln!(
                f,
                "    [{}] {} (shared_mem_index={:?}, count={count}, element_size={})",
                var.index, var.element_type, var.shared_mem_index, var.element_size
            )?;
        }
        write!(f, "  {}", self.shared_memory_spec)
    }
}

/// A renderable view of one method's per-block phi-copy schedule, produced
/// by [`report`].
pub struct PhiBindingsReport<'a> {
    method: &'a Method,
    bindings: &'a PhiBindings,
}

/// Build a [`Display`]-able report of `bindings`' per-block schedule over
/// `method`'s blocks, in block allocation order.
pub fn report<'a>(method: &'a Method, bindings: &'a PhiBindings) -> PhiBindingsReport<'a> {
    PhiBindingsReport { method, bindings }
}

impl fmt::Display for PhiBindingsReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "phi bindings for `{}` (max intermediate phis: {})",
            self.method.name,
            self.bindings.max_num_intermediate_phis()
        )?;
        for block in self.method.blocks() {
            let bindings_for_block = self.bindings.bindings_for(block);
            if bindings_for_block.is_empty() {
                continue;
            }
            writeln!(f, "  block {block}:")?;
            let intermediate: std::collections::HashSet<_> =
                self.bindings.intermediate_phis(block).collect();
            for &(phi, value) in bindings_for_block {
                let marker = if intermediate.contains(&phi) { "*" } else { "" };
                writeln!(f, "    {phi}{marker} <- {value}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::Abi;
    use crate::entry_point::{IndexType, UniformVar};
    use crate::ir::{Terminator, ValueId, ValueKind};
    use crate::platform::{KernelSpecialization, TargetPlatform};
    use crate::regalloc::RegisterAllocator;
    use crate::types::{BasicValueType, TypeNode};
    use smallvec::smallvec;
    use std::sync::Arc;

    #[test]
    fn shared_memory_spec_display_reports_none_when_empty() {
        assert_eq!(SharedMemorySpec::default().to_string(), "shared memory: none");
    }

    #[test]
    fn shared_memory_spec_display_reports_dynamic_suffix() {
        let spec = SharedMemorySpec {
            shared_memory_size: 64,
            has_dynamic: true,
        };
        assert_eq!(spec.to_string(), "shared memory: 64 static bytes + dynamic");
    }

    #[test]
    fn entry_point_display_lists_uniform_variables() {
        let entry = EntryPoint {
            method_name: Arc::from("add"),
            index_type: IndexType::Index1D,
            uniform_variables: vec![UniformVar {
                index: 1,
                ty: TypeNode::primitive(BasicValueType::Float32),
                size: 4,
            }],
            shared_memory_variables: vec![],
            shared_memory_spec: SharedMemorySpec::default(),
            specialization: KernelSpecialization::default(),
        };
        let rendered = entry.to_string();
        assert!(rendered.contains("entry point `add`"));
        assert!(rendered.contains("[1] f32 (4 bytes)"));
        assert!(rendered.contains("shared memory: none"));
    }

    #[test]
    fn phi_bindings_report_marks_intermediate_phis() {
        let mut m = crate::ir::Method::new("f", vec![], TypeNode::Void);
        let entry = m.entry_block;
        let pred = m.create_block(Terminator::Jump(entry));
        let merge = m.create_block(Terminator::Return(None));
        m.set_terminator(pred, Terminator::Jump(merge));

        let ty = TypeNode::primitive(BasicValueType::Int32);
        let phi1 = m.create_value(ty.clone(), ValueKind::Phi(smallvec![(pred, ValueId::from_u32(1))]));
        let phi2 = m.create_value(ty, ValueKind::Phi(smallvec![(pred, ValueId::from_u32(0))]));
        m.append_to_block(merge, phi1);
        m.append_to_block(merge, phi2);

        let abi = Abi::new(TargetPlatform::Platform64Bit);
        let mut allocator = RegisterAllocator::new(&abi);
        let bindings = PhiBindings::build(&m, &mut allocator).unwrap();

        let rendered = report(&m, &bindings).to_string();
        assert!(rendered.contains("max intermediate phis: 2"));
        assert!(rendered.contains('*'));
    }
}
