//! Frame graph execution.
//!
//! Walks a [`Schedule`] step by step: binds every resource whose lifetime
//! starts at the step, runs the pass, then releases every resource whose
//! lifetime ends there.

use super::compiler::Schedule;
use super::pass::PassRegistry;
use super::registry::{ResourceIndex, ResourceRegistry};
use super::resource::{ConcreteResource, ResourceDescriptor, SubresourceBinding};
use super::resources::Resources;
use crate::allocator::ResourceAllocator;
use crate::frame_graph::TextureHandle;

/// Concrete bindings of one execution.
struct Bindings<'r> {
    registry: &'r ResourceRegistry,
    schedule: &'r Schedule,
    concrete: Vec<Option<ConcreteResource>>,
    /// Textures obtained from the allocator, to be released.
    acquired: Vec<Option<TextureHandle>>,
}

impl<'r> Bindings<'r> {
    fn new(registry: &'r ResourceRegistry, schedule: &'r Schedule) -> Self {
        let count = registry.resource_count();
        Self {
            registry,
            schedule,
            concrete: vec![None; count],
            acquired: vec![None; count],
        }
    }

    fn bind(&mut self, index: ResourceIndex, allocator: &mut dyn ResourceAllocator) {
        if self.concrete[index.index()].is_some() {
            return;
        }
        let registry = self.registry;
        let resource = registry.resource(index);

        let binding = if let Some(imported) = resource.imported {
            imported
        } else {
            match &resource.descriptor {
                ResourceDescriptor::Texture(desc) => {
                    let usage = self.schedule.usages[index.index()];
                    let texture = allocator.acquire_texture(&resource.name, desc, usage);
                    self.acquired[index.index()] = Some(texture);
                    ConcreteResource::Texture(texture)
                }
                ResourceDescriptor::TextureSubresource(desc) => {
                    let Some(parent) = resource.parent else {
                        log::error!("subresource '{}' has no parent to bind from", resource.name);
                        return;
                    };
                    let parent = registry.resolved_resource(parent);
                    self.bind(parent, allocator);
                    match self.concrete[parent.index()] {
                        Some(ConcreteResource::Texture(texture)) => {
                            ConcreteResource::TextureSubresource(SubresourceBinding::View {
                                texture,
                                level: desc.level,
                                layer: desc.layer,
                            })
                        }
                        _ => {
                            log::error!(
                                "parent of subresource '{}' is not bound to a texture",
                                resource.name
                            );
                            return;
                        }
                    }
                }
            }
        };

        self.concrete[index.index()] = Some(binding);
    }

    fn release(&mut self, index: ResourceIndex, allocator: &mut dyn ResourceAllocator) {
        self.concrete[index.index()] = None;
        if let Some(texture) = self.acquired[index.index()].take() {
            allocator.release_texture(texture);
        }
    }
}

/// Run every scheduled pass against `driver`.
///
/// Each pass's execute payload is consumed; a pass can run at most once.
pub(crate) fn execute<D>(
    schedule: &Schedule,
    registry: &ResourceRegistry,
    passes: &mut PassRegistry<D>,
    allocator: &mut dyn ResourceAllocator,
    driver: &mut D,
    label: &str,
) {
    let mut bindings = Bindings::new(registry, schedule);

    for (step, &id) in schedule.pass_order.iter().enumerate() {
        for &resource in &schedule.devirtualize[step] {
            bindings.bind(resource, allocator);
        }

        match passes.take_executor(id) {
            Some(executor) => {
                let node = passes.node(id);
                log::trace!("[{}] executing pass '{}' (step {})", label, node.name, step);
                let resources = Resources::new(node, registry, &bindings.concrete);
                executor.execute(&resources, driver);
            }
            None => log::warn!("[{}] pass {:?} has nothing to execute", label, id),
        }

        for &resource in &schedule.destroy[step] {
            bindings.release(resource, allocator);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::{AllocatorEvent, DummyAllocator};
    use crate::frame_graph::builder::Builder;
    use crate::frame_graph::compiler::compile;
    use crate::frame_graph::pass::PassPayload;
    use crate::frame_graph::resource::{Texture, TextureDescriptor, TextureUsage};
    use crate::frame_graph::FrameGraphId;

    fn sample(resources: &Resources<'_>, input: &FrameGraphId<Texture>, driver: &mut Vec<String>) {
        let texture = resources.get(*input).unwrap();
        driver.push(format!("{}:{}", resources.pass_name(), texture.raw()));
    }

    fn noop(_: &Resources<'_>, _: &(), driver: &mut Vec<String>) {
        driver.push("noop".to_string());
    }

    #[test]
    fn test_execute_binds_and_releases_around_passes() {
        let mut passes = PassRegistry::<Vec<String>>::new();
        let mut registry = ResourceRegistry::new();
        let mut error = None;

        let producer = passes.push("producer");
        let color = {
            let mut builder = Builder::new(passes.node_mut(producer), &mut registry, &mut error);
            let color = builder
                .create::<Texture>("color", TextureDescriptor::default())
                .unwrap();
            builder.write(color, TextureUsage::COLOR_ATTACHMENT).unwrap()
        };
        passes.set_executor(producer, Box::new(PassPayload { data: (), execute: noop }));

        let consumer = passes.push("consumer");
        let input = {
            let mut builder = Builder::new(passes.node_mut(consumer), &mut registry, &mut error);
            builder.side_effect();
            builder.read(color, TextureUsage::SAMPLEABLE).unwrap()
        };
        passes.set_executor(
            consumer,
            Box::new(PassPayload {
                data: input,
                execute: sample,
            }),
        );

        let schedule = compile(&passes.nodes, &registry, true);
        let mut allocator = DummyAllocator::new();
        let mut driver = Vec::new();
        execute(&schedule, &registry, &mut passes, &mut allocator, &mut driver, "test");

        assert_eq!(driver, vec!["noop".to_string(), "consumer:1".to_string()]);
        assert_eq!(
            allocator.events(),
            &[
                AllocatorEvent::Acquire {
                    name: "color".to_string(),
                    texture: TextureHandle::new(1),
                    usage: TextureUsage::COLOR_ATTACHMENT | TextureUsage::SAMPLEABLE,
                },
                AllocatorEvent::Release {
                    texture: TextureHandle::new(1)
                },
            ]
        );
        assert_eq!(allocator.live_count(), 0);
        assert!(passes.take_executor(producer).is_none());
    }
}
