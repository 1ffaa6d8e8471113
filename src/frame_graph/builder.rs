//! Setup-time API handed to a pass while it declares its resource usage.

use super::handle::{FrameGraphId, Handle, PassId};
use super::pass::{PassNode, ReadEdge, WriteEdge};
use super::registry::{NodeIndex, ResourceRegistry};
use super::resource::{
    Creatable, Resource, ResourceDescriptor, SubresourceDescriptor, Texture, TextureSubresource,
};
use crate::error::{FrameGraphError, FrameGraphResult};

/// Declares the resources a pass creates, reads and writes.
///
/// A `Builder` only exists for the duration of a pass's setup closure. Every
/// `read` and `write` consumes the handle it is given and returns a new one;
/// passing a consumed handle again fails with
/// [`FrameGraphError::StaleHandle`].
///
/// Every error a builder method returns is also recorded on the owning graph,
/// so discarding the `Err` still leaves the graph unable to compile.
pub struct Builder<'g> {
    pass: &'g mut PassNode,
    registry: &'g mut ResourceRegistry,
    error: &'g mut Option<FrameGraphError>,
}

impl<'g> Builder<'g> {
    pub(crate) fn new(
        pass: &'g mut PassNode,
        registry: &'g mut ResourceRegistry,
        error: &'g mut Option<FrameGraphError>,
    ) -> Self {
        Self {
            pass,
            registry,
            error,
        }
    }

    /// Name of the pass being declared.
    pub fn name(&self) -> &str {
        &self.pass.name
    }

    /// Id of the pass being declared.
    pub fn pass_id(&self) -> PassId {
        self.pass.id
    }

    /// Create a virtual resource managed by the frame graph.
    ///
    /// The resource starts unreferenced; it is only allocated if a pass that
    /// survives culling uses it.
    pub fn create<R: Creatable>(
        &mut self,
        name: &str,
        desc: R::Descriptor,
    ) -> FrameGraphResult<FrameGraphId<R>> {
        let descriptor = R::wrap_descriptor(desc);
        let result = descriptor.validate(name);
        self.record(result)?;
        let handle = self.registry.create(name, descriptor, None, None);
        log::trace!("pass '{}': created {:?} '{}'", self.pass.name, handle, name);
        Ok(FrameGraphId::from_handle(handle))
    }

    /// Create a subresource view of a texture.
    ///
    /// The subresource keeps the parent version alive for as long as the
    /// subresource itself survives culling. `parent` is consumed and replaced
    /// in place with a fresh handle to the same version; copies of the old
    /// value become stale.
    pub fn create_subresource(
        &mut self,
        parent: &mut FrameGraphId<Texture>,
        name: &str,
        desc: SubresourceDescriptor,
    ) -> FrameGraphResult<FrameGraphId<TextureSubresource>> {
        let result = self.declare_subresource(parent, name, desc);
        self.record(result)
    }

    fn declare_subresource(
        &mut self,
        parent: &mut FrameGraphId<Texture>,
        name: &str,
        desc: SubresourceDescriptor,
    ) -> FrameGraphResult<FrameGraphId<TextureSubresource>> {
        let parent_node = lookup_typed::<Texture>(self.registry, parent.handle())?;
        let parent_resource = self.registry.resolved_resource(parent_node);
        let parent_desc = Texture::descriptor(&self.registry.resource(parent_resource).descriptor)
            .ok_or(FrameGraphError::KindMismatch {
                expected: Texture::KIND,
                found: self.registry.resource(parent_resource).kind(),
            })?;
        ResourceDescriptor::validate_subresource(name, &desc, parent_desc)?;

        self.registry.consume(parent.handle())?;
        *parent = FrameGraphId::from_handle(self.registry.issue(parent_node));

        let handle = self.registry.create(
            name,
            ResourceDescriptor::TextureSubresource(desc),
            None,
            Some(parent_node),
        );
        Ok(FrameGraphId::from_handle(handle))
    }

    /// Declare a read of `input` by this pass.
    ///
    /// Adds a reference from the pass to the resource version. The returned
    /// handle names the same version; `input` is no longer valid.
    pub fn read<R: Resource>(
        &mut self,
        input: FrameGraphId<R>,
        usage: R::Usage,
    ) -> FrameGraphResult<FrameGraphId<R>> {
        let result = self.declare_read(input, usage);
        self.record(result)
    }

    fn declare_read<R: Resource>(
        &mut self,
        input: FrameGraphId<R>,
        usage: R::Usage,
    ) -> FrameGraphResult<FrameGraphId<R>> {
        let node = lookup_typed::<R>(self.registry, input.handle())?;
        self.registry.consume(input.handle())?;

        let pass_id = self.pass.id;
        let target = self.registry.node_mut(node);
        target.readers.push(pass_id);
        target.ref_count += 1;

        let handle = self.registry.issue(node);
        self.pass.reads.push(ReadEdge {
            handle,
            node,
            usage: usage.into(),
        });
        Ok(FrameGraphId::from_handle(handle))
    }

    /// Declare a write of `input` by this pass.
    ///
    /// Produces a new version of the resource whose producer is this pass.
    /// The pass is kept alive only while something references that version.
    /// Writing to an imported resource counts as an external reference.
    pub fn write<R: Resource>(
        &mut self,
        input: FrameGraphId<R>,
        usage: R::Usage,
    ) -> FrameGraphResult<FrameGraphId<R>> {
        let result = self.declare_write(input, usage);
        self.record(result)
    }

    fn declare_write<R: Resource>(
        &mut self,
        input: FrameGraphId<R>,
        usage: R::Usage,
    ) -> FrameGraphResult<FrameGraphId<R>> {
        let node = lookup_typed::<R>(self.registry, input.handle())?;
        self.registry.consume(input.handle())?;

        let new_node = self.registry.new_version(node, self.pass.id);
        if self
            .registry
            .is_external(self.registry.resolved_resource(new_node))
        {
            self.registry.node_mut(new_node).ref_count += 1;
        }
        self.pass.ref_count += 1;

        let handle = self.registry.issue(new_node);
        self.pass.writes.push(WriteEdge {
            input: input.handle(),
            output: handle,
            node: new_node,
            usage: usage.into(),
        });
        Ok(FrameGraphId::from_handle(handle))
    }

    /// Mark this pass as having an effect outside the graph so it is never
    /// culled.
    pub fn side_effect(&mut self) {
        self.pass.side_effect = true;
    }

    /// Descriptor of the resource `handle` refers to.
    pub fn get_descriptor<R: Resource>(
        &mut self,
        handle: FrameGraphId<R>,
    ) -> FrameGraphResult<&R::Descriptor> {
        let registry: &ResourceRegistry = self.registry;
        let result = lookup_typed::<R>(registry, handle.handle()).and_then(|node| {
            let resource = registry.resource(registry.resolved_resource(node));
            R::descriptor(&resource.descriptor).ok_or(FrameGraphError::KindMismatch {
                expected: R::KIND,
                found: resource.kind(),
            })
        });
        if let Err(error) = &result {
            poison(self.error, &self.pass.name, error);
        }
        result
    }

    fn record<T>(&mut self, result: FrameGraphResult<T>) -> FrameGraphResult<T> {
        if let Err(error) = &result {
            poison(self.error, &self.pass.name, error);
        }
        result
    }
}

/// Keep the first error raised while declaring passes.
fn poison(slot: &mut Option<FrameGraphError>, pass: &str, error: &FrameGraphError) {
    log::error!("pass '{}': {}", pass, error);
    if slot.is_none() {
        *slot = Some(error.clone());
    }
}

fn lookup_typed<R: Resource>(
    registry: &ResourceRegistry,
    handle: Handle,
) -> FrameGraphResult<NodeIndex> {
    let node = registry.lookup(handle)?;
    let found = registry.kind_of(node);
    if found != R::KIND {
        return Err(FrameGraphError::KindMismatch {
            expected: R::KIND,
            found,
        });
    }
    Ok(node)
}
