//! # RedLilium Frame Graph
//!
//! Per-frame render graph with reference-counted pass culling and
//! just-in-time resource lifetimes.
//!
//! ## Overview
//!
//! This crate provides:
//! - [`FrameGraph`] - Declare passes and the virtual resources they use
//! - [`CompiledFrameGraph`] - Culled, scheduled graph ready to execute once
//! - [`ResourceAllocator`] - Trait for the owner of concrete textures
//! - [`DummyAllocator`] - Recording allocator for tests and headless runs
//!
//! ## Example
//!
//! ```
//! use redlilium_framegraph::{
//!     DummyAllocator, FrameGraph, Texture, TextureDescriptor, TextureFormat, TextureUsage,
//! };
//!
//! let mut allocator = DummyAllocator::new();
//! let mut graph = FrameGraph::<Vec<String>>::new(&mut allocator);
//!
//! let gbuffer = graph
//!     .add_pass(
//!         "gbuffer",
//!         |builder| {
//!             let albedo = builder.create::<Texture>(
//!                 "albedo",
//!                 TextureDescriptor::new_2d(1280, 720, TextureFormat::Rgba8Unorm),
//!             )?;
//!             builder.write(albedo, TextureUsage::COLOR_ATTACHMENT)
//!         },
//!         |_, _, commands| commands.push("draw scene".to_string()),
//!     )
//!     .unwrap();
//!
//! graph
//!     .add_pass(
//!         "lighting",
//!         |builder| {
//!             builder.side_effect();
//!             builder.read(*gbuffer.data(), TextureUsage::SAMPLEABLE)
//!         },
//!         |resources, albedo, commands| {
//!             let texture = resources.get(*albedo).unwrap();
//!             commands.push(format!("shade with {:?}", texture));
//!         },
//!     )
//!     .unwrap();
//!
//! let mut commands = Vec::new();
//! graph.compile().unwrap().execute(&mut commands);
//! assert_eq!(commands.len(), 2);
//! ```

pub mod allocator;
pub mod config;
pub mod error;
pub mod frame_graph;

// Re-export main types for convenience
pub use allocator::{AllocatorEvent, DummyAllocator, ResourceAllocator};
pub use config::FrameGraphConfig;
pub use error::{FrameGraphError, FrameGraphResult};
pub use frame_graph::{
    Builder, CompiledFrameGraph, ConcreteResource, Creatable, FrameGraph, FrameGraphId,
    FrameGraphPass, Handle, Importable, PassId, RenderTargetHandle, Resource, ResourceDescriptor,
    ResourceKind, ResourceLifetime, Resources, SamplerType, SubresourceBinding,
    SubresourceDescriptor, Texture, TextureDescriptor, TextureFormat, TextureHandle,
    TextureSubresource, TextureUsage,
};

/// Frame graph library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the frame graph library.
///
/// Only logs the version; the library never installs a logger itself.
pub fn init() {
    log::info!("RedLilium Frame Graph v{} initialized", VERSION);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_empty_graph_executes() {
        init();
        let mut allocator = DummyAllocator::new();
        let graph = FrameGraph::<()>::new(&mut allocator);
        let compiled = graph.compile().unwrap();
        assert!(compiled.pass_order().is_empty());
        compiled.execute(&mut ());
        assert!(allocator.events().is_empty());
    }
}
