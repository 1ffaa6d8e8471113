//! Frame Graph
//!
//! A per-frame graph of render passes and the virtual resources they use.
//! Passes are declared with [`FrameGraph::add_pass`]; each pass's setup
//! closure tells a [`Builder`] what it creates, reads and writes, and its
//! execute closure is deferred until the graph runs.
//!
//! Compilation culls every pass whose output nobody needs and works out
//! when each resource must be backed. Execution asks a
//! [`ResourceAllocator`](crate::ResourceAllocator) for textures just before
//! their first use and releases them right after their last.

mod builder;
mod compiler;
mod executor;
mod graph;
mod handle;
mod pass;
mod registry;
mod resource;
mod resources;

pub use builder::Builder;
pub use compiler::ResourceLifetime;
pub use graph::{CompiledFrameGraph, FrameGraph, FrameGraphPass};
pub use handle::{FrameGraphId, Handle, PassId};
pub use resource::{
    ConcreteResource, Creatable, Importable, RenderTargetHandle, Resource, ResourceDescriptor,
    ResourceKind, SamplerType, SubresourceBinding, SubresourceDescriptor, Texture,
    TextureDescriptor, TextureFormat, TextureHandle, TextureSubresource, TextureUsage,
};
pub use resources::Resources;
