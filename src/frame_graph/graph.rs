//! Frame-level API: declare passes, then compile, then execute.

use super::builder::Builder;
use super::compiler::{self, ResourceLifetime, Schedule};
use super::executor;
use super::handle::{FrameGraphId, Handle, PassId};
use super::pass::{PassPayload, PassRegistry};
use super::registry::ResourceRegistry;
use super::resource::{
    Importable, RenderTargetHandle, Resource, ResourceDescriptor, ResourceKind,
    SubresourceBinding, SubresourceDescriptor, TextureSubresource,
};
use super::resources::Resources;
use crate::allocator::ResourceAllocator;
use crate::config::FrameGraphConfig;
use crate::error::{FrameGraphError, FrameGraphResult};

/// A pass added to a [`FrameGraph`], with the data its setup returned.
#[derive(Debug, Clone)]
pub struct FrameGraphPass<T> {
    id: PassId,
    data: T,
}

impl<T> FrameGraphPass<T> {
    pub fn id(&self) -> PassId {
        self.id
    }

    pub fn data(&self) -> &T {
        &self.data
    }

    pub fn into_data(self) -> T {
        self.data
    }
}

/// One frame's render graph while it is being declared.
///
/// `D` is the driver handed to every pass at execution time, typically a
/// command encoder. The graph borrows the allocator that will back its
/// textures for as long as the frame lives.
///
/// The first usage error raised by any method is kept; [`compile`](Self::compile)
/// returns it instead of a plan.
pub struct FrameGraph<'a, D> {
    config: FrameGraphConfig,
    allocator: &'a mut dyn ResourceAllocator,
    passes: PassRegistry<D>,
    registry: ResourceRegistry,
    error: Option<FrameGraphError>,
}

impl<'a, D> FrameGraph<'a, D> {
    /// Create an empty graph with the default configuration.
    pub fn new(allocator: &'a mut dyn ResourceAllocator) -> Self {
        Self::with_config(allocator, FrameGraphConfig::default())
    }

    pub fn with_config(
        allocator: &'a mut dyn ResourceAllocator,
        config: FrameGraphConfig,
    ) -> Self {
        Self {
            config,
            allocator,
            passes: PassRegistry::new(),
            registry: ResourceRegistry::new(),
            error: None,
        }
    }

    pub fn config(&self) -> &FrameGraphConfig {
        &self.config
    }

    /// Declare a pass.
    ///
    /// `setup` runs immediately and declares the pass's resource usage
    /// through the [`Builder`]. Its result is stored and handed to `execute`
    /// when the compiled graph runs, unless the pass is culled, in which case
    /// `execute` is dropped without being called.
    pub fn add_pass<T, S, E>(
        &mut self,
        name: &str,
        setup: S,
        execute: E,
    ) -> FrameGraphResult<FrameGraphPass<T>>
    where
        T: Clone + Send + 'static,
        S: FnOnce(&mut Builder<'_>) -> FrameGraphResult<T>,
        E: FnOnce(&Resources<'_>, &T, &mut D) + Send + 'static,
    {
        let id = self.passes.push(name);
        let result = {
            let mut builder =
                Builder::new(self.passes.node_mut(id), &mut self.registry, &mut self.error);
            setup(&mut builder)
        };
        let data = self.record(result)?;

        self.passes.set_executor(
            id,
            Box::new(PassPayload {
                data: data.clone(),
                execute,
            }),
        );
        log::trace!("[{}] added pass '{}' as {:?}", self.config.label, name, id);
        Ok(FrameGraphPass { id, data })
    }

    /// Keep the version `handle` refers to, and everything producing it,
    /// alive through culling.
    pub fn present(&mut self, handle: impl Into<Handle>) -> FrameGraphResult<()> {
        let handle = handle.into();
        let result = self.registry.lookup(handle);
        let node = self.record(result)?;
        self.registry.node_mut(node).ref_count += 1;
        log::trace!("[{}] presenting {:?}", self.config.label, handle);
        Ok(())
    }

    /// Register a caller-owned resource.
    ///
    /// The graph tracks dependencies on it like any other resource but never
    /// asks the allocator to acquire or release it. Writes to an imported
    /// resource are visible outside the graph, so passes writing it are not
    /// culled.
    pub fn import<R: Importable>(
        &mut self,
        name: &str,
        desc: R::Descriptor,
        resource: R::Concrete,
    ) -> FrameGraphResult<FrameGraphId<R>> {
        let descriptor = R::wrap_descriptor(desc);
        let result = descriptor.validate(name);
        self.record(result)?;

        let handle = self
            .registry
            .create(name, descriptor, Some(R::wrap_concrete(resource)), None);
        log::trace!("[{}] imported '{}' as {:?}", self.config.label, name, handle);
        Ok(FrameGraphId::from_handle(handle))
    }

    /// Import a caller-owned render target as a texture subresource.
    pub fn import_render_target(
        &mut self,
        name: &str,
        desc: SubresourceDescriptor,
        target: RenderTargetHandle,
    ) -> FrameGraphResult<FrameGraphId<TextureSubresource>> {
        self.import::<TextureSubresource>(name, desc, SubresourceBinding::RenderTarget(target))
    }

    /// Alias `to` onto the resource `from` refers to.
    ///
    /// Every version of `to`'s resource, past and future, resolves to
    /// `from`'s resource after compilation. Passes that wrote `to` lose the
    /// reference their write held, so they are culled unless something else
    /// keeps them. `from` is consumed; `to` stays usable.
    ///
    /// Moving a resource onto itself is a no-op and consumes nothing.
    pub fn move_resource<R: Resource>(
        &mut self,
        from: FrameGraphId<R>,
        to: FrameGraphId<R>,
    ) -> FrameGraphResult<()> {
        let result = self.move_handles(from.handle(), to.handle(), R::KIND);
        self.record(result)
    }

    fn move_handles(
        &mut self,
        from: Handle,
        to: Handle,
        kind: ResourceKind,
    ) -> FrameGraphResult<()> {
        let from_node = self.registry.lookup(from)?;
        let to_node = self.registry.lookup(to)?;
        for node in [from_node, to_node] {
            let found = self.registry.kind_of(node);
            if found != kind {
                return Err(FrameGraphError::KindMismatch {
                    expected: kind,
                    found,
                });
            }
        }
        let from_resource = self.registry.resolved_resource(from_node);
        let to_resource = self.registry.resolved_resource(to_node);
        if from_resource == to_resource {
            return Ok(());
        }
        self.registry.consume(from)?;

        let nodes = self.registry.resource(to_resource).nodes.clone();
        let redirected_readers: usize = nodes
            .iter()
            .map(|&node| self.registry.node(node).readers.len())
            .sum();
        for node in nodes {
            let target = self.registry.node_mut(node);
            target.forward = Some(from_node);
            if let Some(producer) = target.producer.take() {
                let pass = self.passes.node_mut(producer);
                pass.ref_count = pass.ref_count.saturating_sub(1);
            }
            self.registry.node_mut(from_node).ref_count += 1;
        }
        self.registry.redirect(to_resource, from_resource);

        log::trace!(
            "[{}] moved '{}' onto '{}' ({} readers redirected)",
            self.config.label,
            self.registry.resource(to_resource).name,
            self.registry.resource(from_resource).name,
            redirected_readers
        );
        Ok(())
    }

    /// Re-type an untyped handle, checking the kind of the resource it names.
    pub fn typed<R: Resource>(&mut self, handle: Handle) -> FrameGraphResult<FrameGraphId<R>> {
        let result = self.registry.lookup(handle).and_then(|node| {
            let found = self.registry.kind_of(node);
            if found == R::KIND {
                Ok(FrameGraphId::from_handle(handle))
            } else {
                Err(FrameGraphError::KindMismatch {
                    expected: R::KIND,
                    found,
                })
            }
        });
        self.record(result)
    }

    /// Descriptor of the resource `handle` refers to.
    pub fn get_descriptor<R: Resource>(
        &self,
        handle: FrameGraphId<R>,
    ) -> FrameGraphResult<&R::Descriptor> {
        let node = self.registry.lookup_any(handle.handle())?;
        let resource = self.registry.resource(self.registry.resolved_resource(node));
        R::descriptor(&resource.descriptor).ok_or(FrameGraphError::KindMismatch {
            expected: R::KIND,
            found: resource.kind(),
        })
    }

    pub fn pass_count(&self) -> usize {
        self.passes.len()
    }

    pub fn resource_count(&self) -> usize {
        self.registry.resource_count()
    }

    /// First usage error recorded on this graph, if any.
    pub fn error(&self) -> Option<&FrameGraphError> {
        self.error.as_ref()
    }

    /// Cull unreferenced passes and resolve resource lifetimes.
    pub fn compile(self) -> FrameGraphResult<CompiledFrameGraph<'a, D>> {
        if let Some(error) = self.error {
            log::error!(
                "[{}] refusing to compile a malformed frame graph",
                self.config.label
            );
            return Err(error);
        }

        let schedule = compiler::compile(&self.passes.nodes, &self.registry, self.config.culling);

        let allocated = schedule
            .lifetimes
            .iter()
            .zip(self.registry.resources())
            .filter(|(lifetime, resource)| {
                lifetime.is_some()
                    && resource.imported.is_none()
                    && matches!(resource.descriptor, ResourceDescriptor::Texture(_))
            })
            .count();
        let culled_versions = schedule.node_culled.iter().filter(|&&culled| culled).count();
        log::debug!(
            "[{}] compiled: {} passes declared, {} culled, {} scheduled, {} of {} resource versions culled, {} of {} resources allocated",
            self.config.label,
            self.passes.len(),
            schedule.culled_pass_count(),
            schedule.pass_order.len(),
            culled_versions,
            self.registry.nodes().len(),
            allocated,
            self.registry.resource_count()
        );

        Ok(CompiledFrameGraph {
            config: self.config,
            allocator: self.allocator,
            passes: self.passes,
            registry: self.registry,
            schedule,
        })
    }

    fn record<T>(&mut self, result: FrameGraphResult<T>) -> FrameGraphResult<T> {
        if let Err(error) = &result {
            log::error!("[{}] {}", self.config.label, error);
            if self.error.is_none() {
                self.error = Some(error.clone());
            }
        }
        result
    }
}

static_assertions::assert_impl_all!(FrameGraph<'static, ()>: Send);

/// A culled and scheduled frame graph, ready to run once.
pub struct CompiledFrameGraph<'a, D> {
    config: FrameGraphConfig,
    allocator: &'a mut dyn ResourceAllocator,
    passes: PassRegistry<D>,
    registry: ResourceRegistry,
    schedule: Schedule,
}

static_assertions::assert_impl_all!(CompiledFrameGraph<'static, ()>: Send);

impl<'a, D> CompiledFrameGraph<'a, D> {
    /// Surviving passes in execution order.
    pub fn pass_order(&self) -> &[PassId] {
        &self.schedule.pass_order
    }

    pub fn is_culled(&self, pass: PassId) -> bool {
        self.schedule
            .pass_culled
            .get(pass.index())
            .copied()
            .unwrap_or(true)
    }

    pub fn pass_name(&self, pass: PassId) -> Option<&str> {
        self.passes
            .nodes
            .get(pass.index())
            .map(|node| node.name.as_str())
    }

    pub fn culled_pass_count(&self) -> usize {
        self.schedule.culled_pass_count()
    }

    /// Steps during which the resource behind `handle` is bound.
    ///
    /// `None` if no surviving pass uses it or the handle is unknown.
    pub fn lifetime(&self, handle: impl Into<Handle>) -> Option<ResourceLifetime> {
        let node = self.registry.lookup_any(handle.into()).ok()?;
        let resource = self.registry.resolved_resource(node);
        self.schedule.lifetimes[resource.index()]
    }

    /// Whether the resource behind `handle` was culled away entirely.
    pub fn is_resource_culled(&self, handle: impl Into<Handle>) -> bool {
        self.lifetime(handle).is_none()
    }

    /// Run every surviving pass in order against `driver`.
    pub fn execute(self, driver: &mut D) {
        let CompiledFrameGraph {
            config,
            allocator,
            mut passes,
            registry,
            schedule,
        } = self;

        log::debug!(
            "[{}] executing {} passes",
            config.label,
            schedule.pass_order.len()
        );
        executor::execute(
            &schedule,
            &registry,
            &mut passes,
            allocator,
            driver,
            &config.label,
        );
    }
}
