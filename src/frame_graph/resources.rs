//! Execute-time view of the resources a pass declared.

use super::handle::FrameGraphId;
use super::pass::PassNode;
use super::registry::{ResourceIndex, ResourceRegistry};
use super::resource::{ConcreteResource, Resource};
use crate::error::{FrameGraphError, FrameGraphResult};

/// Read-only accessor handed to a pass's execute closure.
///
/// Resolves the handles the pass declared during setup to the concrete
/// resources bound for this frame. Handles the pass did not declare are
/// rejected with [`FrameGraphError::UnboundAccess`], even if they are valid
/// elsewhere in the graph.
pub struct Resources<'a> {
    pass: &'a PassNode,
    registry: &'a ResourceRegistry,
    bindings: &'a [Option<ConcreteResource>],
}

impl<'a> Resources<'a> {
    pub(crate) fn new(
        pass: &'a PassNode,
        registry: &'a ResourceRegistry,
        bindings: &'a [Option<ConcreteResource>],
    ) -> Self {
        Self {
            pass,
            registry,
            bindings,
        }
    }

    /// Name of the executing pass.
    pub fn pass_name(&self) -> &str {
        &self.pass.name
    }

    /// Concrete resource bound to `handle`.
    pub fn get<R: Resource>(&self, handle: FrameGraphId<R>) -> FrameGraphResult<&'a R::Concrete> {
        let resource = self.resolve(handle)?;
        let bindings = self.bindings;
        let binding = bindings[resource.index()]
            .as_ref()
            .ok_or_else(|| self.unbound(handle))?;
        R::concrete(binding).ok_or(FrameGraphError::KindMismatch {
            expected: R::KIND,
            found: self.registry.resource(resource).kind(),
        })
    }

    /// Descriptor of the resource bound to `handle`.
    pub fn get_descriptor<R: Resource>(
        &self,
        handle: FrameGraphId<R>,
    ) -> FrameGraphResult<&'a R::Descriptor> {
        let registry = self.registry;
        let resource = registry.resource(self.resolve(handle)?);
        R::descriptor(&resource.descriptor).ok_or(FrameGraphError::KindMismatch {
            expected: R::KIND,
            found: resource.kind(),
        })
    }

    fn resolve<R: Resource>(&self, handle: FrameGraphId<R>) -> FrameGraphResult<ResourceIndex> {
        if !self.pass.declares(handle.handle()) {
            return Err(self.unbound(handle));
        }
        let node = self.registry.lookup_any(handle.handle())?;
        let resource = self.registry.resolved_resource(node);
        let found = self.registry.resource(resource).kind();
        if found != R::KIND {
            return Err(FrameGraphError::KindMismatch {
                expected: R::KIND,
                found,
            });
        }
        Ok(resource)
    }

    fn unbound<R: Resource>(&self, handle: FrameGraphId<R>) -> FrameGraphError {
        FrameGraphError::UnboundAccess {
            pass: self.pass.name.clone(),
            handle: handle.handle(),
        }
    }
}
