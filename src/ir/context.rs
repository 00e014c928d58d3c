//! A scoped collection of methods.
//!
//! `IrContext` instances are cheap and short-lived: a main context holds
//! whatever the frontend produced, and [`IrContext::import`] deep-copies the
//! subgraph reachable from one method into a fresh context the backend owns
//! for the rest of the compilation ("create a
//! fresh kernel IR context; import the generated method"). This mirrors how
//! Cranelift's `Context` is a scoped, reusable holder for one function's
//! compilation-time data structures (`cranelift-codegen::context::Context`),
//! except ownership here is of a whole reachable method graph rather than a
//! single function.

use cranelift_entity::PrimaryMap;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::VecDeque;
use std::sync::Arc;

use super::entities::MethodId;
use super::function::Method;

/// An owned graph of methods, scoped to one compilation phase.
#[derive(Default)]
pub struct IrContext {
    methods: PrimaryMap<MethodId, Method>,
    by_name: FxHashMap<Arc<str>, MethodId>,
}

impl IrContext {
    /// An empty context.
    pub fn new() -> Self {
        Self {
            methods: PrimaryMap::new(),
            by_name: FxHashMap::default(),
        }
    }

    /// Declare a method, returning the id it was assigned. Re-declaring a
    /// name already present replaces the name index entry but leaves the
    /// earlier [`MethodId`] allocated (and unreachable by name). The
    /// frontend is expected to declare each name once per context.
    pub fn declare_method(&mut self, method: Method) -> MethodId {
        let name = Arc::clone(&method.name);
        let id = self.methods.push(method);
        self.by_name.insert(name, id);
        id
    }

    /// Look up a method by id.
    pub fn method(&self, id: MethodId) -> &Method {
        &self.methods[id]
    }

    /// Look up a method by id, mutably.
    pub fn method_mut(&mut self, id: MethodId) -> &mut Method {
        &mut self.methods[id]
    }

    /// Look up a method by its declared name.
    pub fn method_by_name(&self, name: &str) -> Option<MethodId> {
        self.by_name.get(name).copied()
    }

    /// Number of methods declared in this context.
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    /// True if no methods have been declared.
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// Breadth-first walk of the methods reachable from `root` via `Call`
    /// edges, `root` included, in discovery order. This is the traversal
    /// [`crate::backend_context::BackendContext::build`] uses, exposed here
    /// since [`IrContext::import`] needs the identical set to decide what to
    /// clone.
    pub fn reachable_from(&self, root: MethodId) -> Vec<MethodId> {
        let mut seen = FxHashSet::default();
        let mut order = Vec::new();
        let mut queue = VecDeque::new();
        queue.push_back(root);
        seen.insert(root);
        while let Some(id) = queue.pop_front() {
            order.push(id);
            for (_, callee) in self.methods[id].calls() {
                if seen.insert(callee) {
                    queue.push_back(callee);
                }
            }
        }
        order
    }

    /// Deep-copy the subgraph reachable from `root` into a fresh context,
    /// returning the new context and the root's id within it.
    ///
    /// Every cloned method's `Call` targets are rewritten to point at the
    /// corresponding id in the new context, so the returned graph is
    /// self-contained: exporting it and re-importing it again yields a
    /// graph isomorphic to this one (method-id stability modulo the
    /// `old_to_new` bijection: a round-trip property).
    pub fn import(&self, root: MethodId) -> (IrContext, MethodId) {
        let order = self.reachable_from(root);
        let mut fresh = IrContext::new();
        let mut old_to_new = FxHashMap::default();

        for &old_id in &order {
            let cloned = self.methods[old_id].clone();
            let new_id = fresh.declare_method(cloned);
            old_to_new.insert(old_id, new_id);
        }
        for &new_id in old_to_new.values() {
            fresh.methods[new_id].remap_calls(&old_to_new);
        }

        let new_root = old_to_new[&root];
        (fresh, new_root)
    }
}
