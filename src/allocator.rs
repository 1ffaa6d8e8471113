//! Boundary to the owner of concrete GPU memory.
//!
//! The frame graph never creates textures itself. At the first step a
//! surviving pass uses a graph-managed texture, the executor asks a
//! [`ResourceAllocator`] for one; after the last such step it hands it back.
//! Each acquired texture is released exactly once per execution, and
//! imported resources are never passed to the allocator.

use std::collections::HashSet;

use crate::frame_graph::{TextureDescriptor, TextureHandle, TextureUsage};

/// Supplier of concrete textures for the frame graph.
///
/// Implementations are free to pool and alias memory between calls; the
/// frame graph only guarantees it will not use a texture after releasing it.
pub trait ResourceAllocator: Send {
    /// Provide a texture matching `descriptor` that supports every flag in
    /// `usage`.
    fn acquire_texture(
        &mut self,
        name: &str,
        descriptor: &TextureDescriptor,
        usage: TextureUsage,
    ) -> TextureHandle;

    /// Take back a texture returned by [`acquire_texture`](Self::acquire_texture).
    fn release_texture(&mut self, texture: TextureHandle);
}

/// One call made on a [`DummyAllocator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllocatorEvent {
    Acquire {
        name: String,
        texture: TextureHandle,
        usage: TextureUsage,
    },
    Release {
        texture: TextureHandle,
    },
}

/// Allocator that hands out sequential handles and records every call.
///
/// Useful for tests and for running a graph without a GPU.
#[derive(Debug, Default)]
pub struct DummyAllocator {
    next: u64,
    live: HashSet<TextureHandle>,
    events: Vec<AllocatorEvent>,
}

impl DummyAllocator {
    /// Create a new dummy allocator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every acquire and release, in call order.
    pub fn events(&self) -> &[AllocatorEvent] {
        &self.events
    }

    /// Number of textures acquired and not yet released.
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn acquire_count(&self) -> usize {
        self.events
            .iter()
            .filter(|event| matches!(event, AllocatorEvent::Acquire { .. }))
            .count()
    }

    pub fn release_count(&self) -> usize {
        self.events
            .iter()
            .filter(|event| matches!(event, AllocatorEvent::Release { .. }))
            .count()
    }

    /// Forget recorded events. Live textures stay live.
    pub fn clear_events(&mut self) {
        self.events.clear();
    }
}

static_assertions::assert_impl_all!(DummyAllocator: Send, Sync);

impl ResourceAllocator for DummyAllocator {
    fn acquire_texture(
        &mut self,
        name: &str,
        descriptor: &TextureDescriptor,
        usage: TextureUsage,
    ) -> TextureHandle {
        self.next += 1;
        let texture = TextureHandle::new(self.next);
        log::trace!(
            "DummyAllocator: acquiring texture '{}' ({}x{}x{}, {:?}, {:?}) as {:?}",
            name,
            descriptor.width,
            descriptor.height,
            descriptor.depth,
            descriptor.format,
            usage,
            texture
        );
        self.live.insert(texture);
        self.events.push(AllocatorEvent::Acquire {
            name: name.to_string(),
            texture,
            usage,
        });
        texture
    }

    fn release_texture(&mut self, texture: TextureHandle) {
        log::trace!("DummyAllocator: releasing {:?}", texture);
        if !self.live.remove(&texture) {
            log::warn!("DummyAllocator: release of unknown texture {:?}", texture);
        }
        self.events.push(AllocatorEvent::Release { texture });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_release_bookkeeping() {
        let mut allocator = DummyAllocator::new();
        let a = allocator.acquire_texture(
            "a",
            &TextureDescriptor::default(),
            TextureUsage::SAMPLEABLE,
        );
        let b = allocator.acquire_texture(
            "b",
            &TextureDescriptor::default(),
            TextureUsage::COLOR_ATTACHMENT,
        );
        assert_ne!(a, b);
        assert_eq!(allocator.live_count(), 2);

        allocator.release_texture(a);
        assert_eq!(allocator.live_count(), 1);
        assert_eq!(allocator.acquire_count(), 2);
        assert_eq!(allocator.release_count(), 1);
        assert_eq!(
            allocator.events().last(),
            Some(&AllocatorEvent::Release { texture: a })
        );

        allocator.clear_events();
        assert!(allocator.events().is_empty());
        assert_eq!(allocator.live_count(), 1);
    }
}
