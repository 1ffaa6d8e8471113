//! Common utilities for frame graph integration tests.
//!
//! Provides a shared [`Timeline`] that both the allocator and the pass
//! closures append to, so tests can check the relative order of
//! acquire, execute and release calls.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use redlilium_framegraph::{
    Builder, DummyAllocator, FrameGraphId, FrameGraphResult, ResourceAllocator, Texture,
    TextureDescriptor, TextureFormat, TextureHandle, TextureUsage,
};

/// Initialize logging for tests.
pub fn init_logging() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Trace)
        .is_test(true)
        .try_init();
}

// ============================================================================
// Timeline
// ============================================================================

/// Ordered log of everything that happened during an execution.
#[derive(Debug, Clone, Default)]
pub struct Timeline(Arc<Mutex<Vec<String>>>);

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    /// Position of `entry`, panicking if it was never recorded.
    pub fn position(&self, entry: &str) -> usize {
        let entries = self.entries();
        entries
            .iter()
            .position(|e| e == entry)
            .unwrap_or_else(|| panic!("'{}' not found in {:?}", entry, entries))
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.entries().iter().any(|e| e == entry)
    }
}

// ============================================================================
// Allocator
// ============================================================================

/// Allocator that writes `acquire <name>` / `release <name>` to a timeline
/// and otherwise behaves like [`DummyAllocator`].
#[derive(Debug)]
pub struct TimelineAllocator {
    pub inner: DummyAllocator,
    timeline: Timeline,
    names: HashMap<TextureHandle, String>,
}

impl TimelineAllocator {
    pub fn new(timeline: Timeline) -> Self {
        Self {
            inner: DummyAllocator::new(),
            timeline,
            names: HashMap::new(),
        }
    }
}

impl ResourceAllocator for TimelineAllocator {
    fn acquire_texture(
        &mut self,
        name: &str,
        descriptor: &TextureDescriptor,
        usage: TextureUsage,
    ) -> TextureHandle {
        let texture = self.inner.acquire_texture(name, descriptor, usage);
        self.names.insert(texture, name.to_string());
        self.timeline.push(format!("acquire {}", name));
        texture
    }

    fn release_texture(&mut self, texture: TextureHandle) {
        self.inner.release_texture(texture);
        let name = self.names.remove(&texture).unwrap_or_default();
        self.timeline.push(format!("release {}", name));
    }
}

// ============================================================================
// Graph helpers
// ============================================================================

/// A small HDR color target.
pub fn color_desc() -> TextureDescriptor {
    TextureDescriptor::new_2d(320, 240, TextureFormat::Rgba16Float)
}

/// Create a texture and write it in one go.
pub fn create_written(
    builder: &mut Builder<'_>,
    name: &str,
) -> FrameGraphResult<FrameGraphId<Texture>> {
    let texture = builder.create::<Texture>(name, color_desc())?;
    builder.write(texture, TextureUsage::COLOR_ATTACHMENT)
}
