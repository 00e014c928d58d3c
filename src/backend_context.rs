//! Per-compilation snapshot of the kernel's reachable call graph.
//!
//! Built once, immediately after importing the kernel method into its own
//! [`IrContext`](crate::ir::IrContext), and read-only for the rest of the
//! compile: every reachable method's alloca usage, the aggregate
//! shared-memory footprint, and which reachable intrinsics still lack a
//! backend mapping. This mirrors how Cranelift's `Context` snapshots a
//! function's CFG/dominator-tree data once per compile and hands out
//! read-only views of it to the rest of the pipeline.

use rustc_hash::FxHashMap;

use crate::abi::Abi;
use crate::entry_point::SharedMemorySpec;
use crate::error::{CompileError, CompileResult};
use crate::intrinsic::IntrinsicProvider;
use crate::ir::{AllocaKind, IrContext, MethodId, MethodRef, ValueId};
use crate::types::TypeNode;

/// A per-thread local (stack-like) allocation.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalAlloca {
    /// The defining value.
    pub id: ValueId,
    /// Element type.
    pub ty: TypeNode,
    /// Total native size in bytes (`elementSize * count`).
    pub size: u32,
}

/// A group-shared allocation, static or dynamically sized.
#[derive(Debug, Clone, PartialEq)]
pub struct SharedAlloca {
    /// The defining value.
    pub id: ValueId,
    /// Element type.
    pub element_type: TypeNode,
    /// Element count; `None` for a dynamically-sized allocation.
    pub count: Option<u32>,
    /// Native size in bytes of one element.
    pub element_size: u32,
}

/// One method's alloca usage, partitioned by storage kind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Allocas {
    /// Per-thread local allocations.
    pub local: Vec<LocalAlloca>,
    /// Statically-sized group-shared allocations.
    pub static_shared: Vec<SharedAlloca>,
    /// Dynamically-sized group-shared allocations (count supplied at
    /// launch).
    pub dynamic_shared: Vec<SharedAlloca>,
}

impl Allocas {
    fn collect(abi: &Abi, method: &crate::ir::Method) -> Self {
        let mut allocas = Allocas::default();
        for (id, ty, kind, count) in method.allocas() {
            let element_size = abi.size_of(ty);
            match kind {
                AllocaKind::Local => {
                    let size = element_size * count.unwrap_or(1);
                    allocas.local.push(LocalAlloca {
                        id,
                        ty: ty.clone(),
                        size,
                    });
                }
                AllocaKind::SharedStatic => {
                    allocas.static_shared.push(SharedAlloca {
                        id,
                        element_type: ty.clone(),
                        count,
                        element_size,
                    });
                }
                AllocaKind::SharedDynamic => {
                    allocas.dynamic_shared.push(SharedAlloca {
                        id,
                        element_type: ty.clone(),
                        count: None,
                        element_size,
                    });
                }
            }
        }
        allocas
    }
}

/// The reachable-call-graph snapshot a code generator compiles against.
pub struct BackendContext<'a> {
    context: &'a IrContext,
    kernel_method: MethodId,
    reachable: Vec<MethodId>,
    alloca_map: FxHashMap<MethodId, Allocas>,
    shared_allocations: Vec<(MethodId, SharedAlloca)>,
    dynamic_shared_allocations: Vec<(MethodId, SharedAlloca)>,
    shared_memory_size: u32,
    not_implemented_intrinsics: Vec<MethodId>,
}

impl<'a> BackendContext<'a> {
    /// Walk the call graph reachable from `kernel_method` in `context`,
    /// collecting per-method alloca usage and validating that every
    /// reachable intrinsic has a mapping in `intrinsics`.
    pub fn build(
        context: &'a IrContext,
        kernel_method: MethodId,
        abi: &Abi,
        intrinsics: &IntrinsicProvider,
    ) -> CompileResult<Self> {
        let reachable = context.reachable_from(kernel_method);
        log::debug!(
            "backend context rooted at `{}`: {} reachable methods",
            context.method(kernel_method).name,
            reachable.len()
        );

        let mut alloca_map = FxHashMap::default();
        let mut shared_allocations = Vec::new();
        let mut dynamic_shared_allocations = Vec::new();
        let mut shared_memory_size = 0u32;
        let mut not_implemented_intrinsics = Vec::new();

        for &id in &reachable {
            let method = context.method(id);
            if method.is_intrinsic {
                not_implemented_intrinsics.push(id);
            }

            let allocas = Allocas::collect(abi, method);
            for shared in &allocas.static_shared {
                shared_memory_size += shared.element_size * shared.count.unwrap_or(1);
                shared_allocations.push((id, shared.clone()));
            }
            for shared in &allocas.dynamic_shared {
                dynamic_shared_allocations.push((id, shared.clone()));
            }
            alloca_map.insert(id, allocas);
        }

        for &id in &not_implemented_intrinsics {
            let method = context.method(id);
            let method_ref = MethodRef::new(std::sync::Arc::clone(&method.name));
            if intrinsics.try_get_mapping(&method_ref).is_none() {
                return Err(CompileError::NotSupportedIntrinsic(method_ref));
            }
        }

        Ok(Self {
            context,
            kernel_method,
            reachable,
            alloca_map,
            shared_allocations,
            dynamic_shared_allocations,
            shared_memory_size,
            not_implemented_intrinsics,
        })
    }

    /// The context this snapshot was built from.
    pub fn context(&self) -> &IrContext {
        self.context
    }

    /// The kernel method this context is rooted at.
    pub fn kernel_method(&self) -> MethodId {
        self.kernel_method
    }

    /// Every method reachable from the kernel method, kernel included, in
    /// discovery order.
    pub fn methods(&self) -> &[MethodId] {
        &self.reachable
    }

    /// Every reachable method *except* the kernel method, in discovery
    /// order: the iteration code generators use to build one function
    /// code generator per secondary method.
    pub fn secondary_methods(&self) -> impl Iterator<Item = MethodId> + '_ {
        self.reachable.iter().copied().filter(move |&id| id != self.kernel_method)
    }

    /// The alloca usage recorded for `method`.
    pub fn allocas_of(&self, method: MethodId) -> &Allocas {
        &self.alloca_map[&method]
    }

    /// Every static shared allocation across the reachable graph, tagged
    /// with its owning method.
    pub fn shared_allocations(&self) -> &[(MethodId, SharedAlloca)] {
        &self.shared_allocations
    }

    /// Every dynamically-sized shared allocation across the reachable
    /// graph, tagged with its owning method.
    pub fn dynamic_shared_allocations(&self) -> &[(MethodId, SharedAlloca)] {
        &self.dynamic_shared_allocations
    }

    /// Reachable intrinsic methods (validated, at construction time, to all
    /// have a mapping in the provider passed to [`BackendContext::build`]).
    pub fn not_implemented_intrinsics(&self) -> &[MethodId] {
        &self.not_implemented_intrinsics
    }

    /// Total static shared-memory footprint in bytes.
    pub fn shared_memory_size(&self) -> u32 {
        self.shared_memory_size
    }

    /// The aggregate shared-memory spec for this compilation, consumed by
    /// [`crate::entry_point::EntryPoint::build`].
    pub fn shared_memory_spec(&self) -> SharedMemorySpec {
        SharedMemorySpec {
            shared_memory_size: self.shared_memory_size,
            has_dynamic: !self.dynamic_shared_allocations.is_empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Method, Operands, Terminator, ValueKind};
    use crate::platform::TargetPlatform;
    use crate::types::BasicValueType;

    fn abi() -> Abi {
        Abi::new(TargetPlatform::Platform64Bit)
    }

    #[test]
    fn collects_allocas_across_reachable_methods() {
        let mut ctx = IrContext::new();
        let mut callee = Method::new_intrinsic("leaf", vec![], TypeNode::Void);
        let entry = callee.entry_block;
        callee.build(
            entry,
            TypeNode::Void,
            ValueKind::Alloca {
                kind: AllocaKind::SharedStatic,
                ty: TypeNode::primitive(BasicValueType::Float32),
                count: Some(256),
            },
        );
        let callee_id = ctx.declare_method(callee);

        let mut kernel = Method::new("kernel", vec![], TypeNode::Void);
        let k_entry = kernel.entry_block;
        kernel.build(k_entry, TypeNode::Void, ValueKind::Call(callee_id, Operands::new()));
        kernel.set_terminator(k_entry, Terminator::Return(None));
        let kernel_id = ctx.declare_method(kernel);

        let abi = abi();
        let intrinsics = IntrinsicProvider::empty()
            .with_mapping(MethodRef::new("leaf"), crate::intrinsic::IntrinsicImpl::new("noop"));
        let backend_ctx = BackendContext::build(&ctx, kernel_id, &abi, &intrinsics).unwrap();

        assert_eq!(backend_ctx.methods().len(), 2);
        assert_eq!(backend_ctx.shared_memory_size(), 256 * 4);
        assert_eq!(backend_ctx.shared_allocations().len(), 1);
        assert!(backend_ctx.dynamic_shared_allocations().is_empty());
        assert_eq!(backend_ctx.not_implemented_intrinsics(), &[callee_id]);
    }

    #[test]
    fn unmapped_intrinsic_fails_validation() {
        let mut ctx = IrContext::new();
        let callee = Method::new_intrinsic("warpBroadcast", vec![], TypeNode::Void);
        let callee_id = ctx.declare_method(callee);

        let mut kernel = Method::new("kernel", vec![], TypeNode::Void);
        let k_entry = kernel.entry_block;
        kernel.build(k_entry, TypeNode::Void, ValueKind::Call(callee_id, Operands::new()));
        kernel.set_terminator(k_entry, Terminator::Return(None));
        let kernel_id = ctx.declare_method(kernel);

        let abi = abi();
        let intrinsics = IntrinsicProvider::empty();
        let result = BackendContext::build(&ctx, kernel_id, &abi, &intrinsics);
        match result {
            Err(CompileError::NotSupportedIntrinsic(method_ref)) => {
                assert_eq!(method_ref.name(), "warpBroadcast");
            }
            other => panic!("expected NotSupportedIntrinsic, got {other:?}"),
        }
    }

    #[test]
    fn secondary_methods_excludes_kernel() {
        let mut ctx = IrContext::new();
        let callee = Method::new_intrinsic("leaf", vec![], TypeNode::Void);
        let callee_id = ctx.declare_method(callee);
        let mut kernel = Method::new("kernel", vec![], TypeNode::Void);
        let k_entry = kernel.entry_block;
        kernel.build(k_entry, TypeNode::Void, ValueKind::Call(callee_id, Operands::new()));
        kernel.set_terminator(k_entry, Terminator::Return(None));
        let kernel_id = ctx.declare_method(kernel);

        let abi = abi();
        let intrinsics = IntrinsicProvider::empty()
            .with_mapping(MethodRef::new("leaf"), crate::intrinsic::IntrinsicImpl::new("noop"));
        let backend_ctx = BackendContext::build(&ctx, kernel_id, &abi, &intrinsics).unwrap();

        let secondaries: Vec<_> = backend_ctx.secondary_methods().collect();
        assert_eq!(secondaries, vec![callee_id]);
    }
}
