//! Virtual resource registry.
//!
//! Three dense, append-only tables back every resource in a frame:
//!
//! - `resources`: one entry per created or imported resource
//! - `nodes`: one entry per *version* of a resource; a write appends a node
//! - `slots`: one entry per issued [`Handle`]; a handle is its slot index
//!
//! Nodes and slots are never removed, so a handle always names exactly the
//! version it was issued for. Consumption is tracked per slot. Every registry
//! carries a process-unique id stamped into the handles it issues, so a handle
//! from another frame graph is rejected instead of naming an unrelated slot.

use std::sync::atomic::{AtomicU32, Ordering};

use super::handle::{Handle, PassId};
use super::resource::{ConcreteResource, ResourceDescriptor, ResourceKind};
use crate::error::{FrameGraphError, FrameGraphResult};

/// Index of a virtual resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct ResourceIndex(pub(crate) u32);

impl ResourceIndex {
    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Index of a resource version node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct NodeIndex(pub(crate) u32);

impl NodeIndex {
    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// A logical resource, independent of version.
#[derive(Debug)]
pub(crate) struct VirtualResource {
    /// Debug name.
    pub name: String,
    pub descriptor: ResourceDescriptor,
    /// Caller-supplied backing; `None` for graph-managed resources.
    pub imported: Option<ConcreteResource>,
    /// Version node of the parent texture this subresource was created from.
    pub parent: Option<NodeIndex>,
    /// Every version node of this resource, oldest first.
    pub nodes: Vec<NodeIndex>,
}

impl VirtualResource {
    pub fn kind(&self) -> ResourceKind {
        self.descriptor.kind()
    }
}

/// One version of a resource.
#[derive(Debug)]
pub(crate) struct ResourceNode {
    pub resource: ResourceIndex,
    pub version: u32,
    /// Pass whose write created this version.
    pub producer: Option<PassId>,
    /// Passes that declared a read of this version.
    pub readers: Vec<PassId>,
    /// Version of another resource this node was redirected to by a move.
    pub forward: Option<NodeIndex>,
    /// Readers plus every other reference keeping this version alive.
    pub ref_count: u32,
}

#[derive(Debug, Clone, Copy)]
struct HandleSlot {
    node: NodeIndex,
    consumed: bool,
}

static NEXT_GRAPH_ID: AtomicU32 = AtomicU32::new(0);

/// Owner of all virtual resources of one frame.
#[derive(Debug)]
pub(crate) struct ResourceRegistry {
    id: u32,
    resources: Vec<VirtualResource>,
    nodes: Vec<ResourceNode>,
    slots: Vec<HandleSlot>,
    /// `redirects[r]` is the resource `r` was moved onto, or `r` itself.
    redirects: Vec<ResourceIndex>,
}

impl Default for ResourceRegistry {
    fn default() -> Self {
        Self {
            id: NEXT_GRAPH_ID.fetch_add(1, Ordering::Relaxed),
            resources: Vec::new(),
            nodes: Vec::new(),
            slots: Vec::new(),
            redirects: Vec::new(),
        }
    }
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id stamped into every handle this registry issues.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Register a resource and return a handle to its initial version.
    pub fn create(
        &mut self,
        name: &str,
        descriptor: ResourceDescriptor,
        imported: Option<ConcreteResource>,
        parent: Option<NodeIndex>,
    ) -> Handle {
        let resource = ResourceIndex(self.resources.len() as u32);
        let node = NodeIndex(self.nodes.len() as u32);

        self.resources.push(VirtualResource {
            name: name.to_string(),
            descriptor,
            imported,
            parent,
            nodes: vec![node],
        });
        self.redirects.push(resource);
        self.nodes.push(ResourceNode {
            resource,
            version: 0,
            producer: None,
            readers: Vec::new(),
            forward: None,
            ref_count: 0,
        });

        if let Some(parent) = parent {
            self.nodes[parent.index()].ref_count += 1;
        }

        self.issue(node)
    }

    /// Resolve a live handle to its version node.
    pub fn lookup(&self, handle: Handle) -> FrameGraphResult<NodeIndex> {
        let slot = self.slot(handle)?;
        if slot.consumed {
            return Err(FrameGraphError::StaleHandle { handle });
        }
        Ok(slot.node)
    }

    /// Resolve a handle whether or not it was consumed since.
    ///
    /// Used at execution time, where a pass still refers to handles that
    /// later passes have consumed.
    pub fn lookup_any(&self, handle: Handle) -> FrameGraphResult<NodeIndex> {
        self.slot(handle).map(|slot| slot.node)
    }

    fn slot(&self, handle: Handle) -> FrameGraphResult<&HandleSlot> {
        if handle.graph != self.id {
            return Err(FrameGraphError::InvalidHandle { handle });
        }
        let slot = self
            .slots
            .get(handle.slot())
            .ok_or(FrameGraphError::InvalidHandle { handle })?;
        if self.nodes[slot.node.index()].version != handle.version {
            return Err(FrameGraphError::InvalidHandle { handle });
        }
        Ok(slot)
    }

    /// Resolve a live handle and invalidate it.
    pub fn consume(&mut self, handle: Handle) -> FrameGraphResult<NodeIndex> {
        let node = self.lookup(handle)?;
        self.slots[handle.slot()].consumed = true;
        Ok(node)
    }

    /// Issue a fresh handle for an existing version node.
    pub fn issue(&mut self, node: NodeIndex) -> Handle {
        let index = self.slots.len() as u32;
        self.slots.push(HandleSlot {
            node,
            consumed: false,
        });
        Handle::new(self.id, index, self.nodes[node.index()].version)
    }

    /// Append a new version of the resource `node` belongs to.
    pub fn new_version(&mut self, node: NodeIndex, producer: PassId) -> NodeIndex {
        let resource = self.nodes[node.index()].resource;
        let version = self.resources[resource.index()]
            .nodes
            .last()
            .map_or(0, |&latest| self.nodes[latest.index()].version + 1);
        let new_node = NodeIndex(self.nodes.len() as u32);

        self.nodes.push(ResourceNode {
            resource,
            version,
            producer: Some(producer),
            readers: Vec::new(),
            forward: None,
            ref_count: 0,
        });
        self.resources[resource.index()].nodes.push(new_node);
        new_node
    }

    /// Follow move redirections to the resource that actually backs `resource`.
    pub fn resolve(&self, mut resource: ResourceIndex) -> ResourceIndex {
        loop {
            let target = self.redirects[resource.index()];
            if target == resource {
                return resource;
            }
            resource = target;
        }
    }

    /// Redirect `from` so it resolves to `to` from now on.
    pub fn redirect(&mut self, from: ResourceIndex, to: ResourceIndex) {
        self.redirects[from.index()] = to;
    }

    /// Resource backing `node` after move redirections.
    pub fn resolved_resource(&self, node: NodeIndex) -> ResourceIndex {
        self.resolve(self.nodes[node.index()].resource)
    }

    /// Whether writes to this resource are visible outside the graph.
    pub fn is_external(&self, resource: ResourceIndex) -> bool {
        let resource = &self.resources[resource.index()];
        if resource.imported.is_some() {
            return true;
        }
        resource
            .parent
            .is_some_and(|parent| self.is_external(self.resolved_resource(parent)))
    }

    pub fn kind_of(&self, node: NodeIndex) -> ResourceKind {
        self.resource(self.node(node).resource).kind()
    }

    pub fn resource(&self, index: ResourceIndex) -> &VirtualResource {
        &self.resources[index.index()]
    }

    pub fn node(&self, index: NodeIndex) -> &ResourceNode {
        &self.nodes[index.index()]
    }

    pub fn node_mut(&mut self, index: NodeIndex) -> &mut ResourceNode {
        &mut self.nodes[index.index()]
    }

    pub fn resources(&self) -> &[VirtualResource] {
        &self.resources
    }

    pub fn nodes(&self) -> &[ResourceNode] {
        &self.nodes
    }

    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame_graph::resource::TextureDescriptor;

    fn texture() -> ResourceDescriptor {
        ResourceDescriptor::Texture(TextureDescriptor::default())
    }

    #[test]
    fn test_create_issues_version_zero() {
        let mut registry = ResourceRegistry::new();
        let handle = registry.create("color", texture(), None, None);
        assert_eq!(handle.version(), 0);
        assert_eq!(registry.resource_count(), 1);
        assert_eq!(registry.nodes().len(), 1);
        assert!(registry.lookup(handle).is_ok());
    }

    #[test]
    fn test_consume_makes_handle_stale() {
        let mut registry = ResourceRegistry::new();
        let handle = registry.create("color", texture(), None, None);
        let node = registry.consume(handle).unwrap();

        assert_eq!(
            registry.lookup(handle),
            Err(FrameGraphError::StaleHandle { handle })
        );
        assert_eq!(registry.consume(handle), Err(FrameGraphError::StaleHandle { handle }));
        // Execution-time lookup still sees it.
        assert_eq!(registry.lookup_any(handle), Ok(node));
    }

    #[test]
    fn test_unknown_handle_is_invalid() {
        let registry = ResourceRegistry::new();
        let handle = Handle::new(registry.id(), 9, 0);
        assert_eq!(
            registry.lookup(handle),
            Err(FrameGraphError::InvalidHandle { handle })
        );
    }

    #[test]
    fn test_version_mismatch_is_invalid() {
        let mut registry = ResourceRegistry::new();
        let handle = registry.create("color", texture(), None, None);
        let forged = Handle::new(registry.id(), handle.index(), 5);
        assert_eq!(
            registry.lookup(forged),
            Err(FrameGraphError::InvalidHandle { handle: forged })
        );
    }

    #[test]
    fn test_handle_from_other_registry_is_invalid() {
        let mut first = ResourceRegistry::new();
        let mut second = ResourceRegistry::new();
        assert_ne!(first.id(), second.id());

        let foreign = first.create("color", texture(), None, None);
        second.create("depth", texture(), None, None);
        assert_eq!(
            second.lookup(foreign),
            Err(FrameGraphError::InvalidHandle { handle: foreign })
        );
        assert_eq!(
            second.lookup_any(foreign),
            Err(FrameGraphError::InvalidHandle { handle: foreign })
        );
        assert!(first.lookup(foreign).is_ok());
    }

    #[test]
    fn test_new_version_appends_node() {
        let mut registry = ResourceRegistry::new();
        let handle = registry.create("color", texture(), None, None);
        let v0 = registry.consume(handle).unwrap();
        let v1 = registry.new_version(v0, PassId(0));
        let v2 = registry.new_version(v1, PassId(1));

        assert_eq!(registry.node(v1).version, 1);
        assert_eq!(registry.node(v2).version, 2);
        assert_eq!(registry.node(v2).producer, Some(PassId(1)));
        assert_eq!(registry.resource(ResourceIndex(0)).nodes, vec![v0, v1, v2]);

        let h2 = registry.issue(v2);
        assert_eq!(h2.version(), 2);
    }

    #[test]
    fn test_subresource_references_parent() {
        let mut registry = ResourceRegistry::new();
        let parent = registry.create("shadow", texture(), None, None);
        let parent_node = registry.lookup(parent).unwrap();
        registry.create(
            "shadow.cascade0",
            ResourceDescriptor::TextureSubresource(Default::default()),
            None,
            Some(parent_node),
        );
        assert_eq!(registry.node(parent_node).ref_count, 1);
    }

    #[test]
    fn test_resolve_follows_redirect_chain() {
        let mut registry = ResourceRegistry::new();
        registry.create("a", texture(), None, None);
        registry.create("b", texture(), None, None);
        registry.create("c", texture(), None, None);

        registry.redirect(ResourceIndex(2), ResourceIndex(1));
        registry.redirect(ResourceIndex(1), ResourceIndex(0));

        assert_eq!(registry.resolve(ResourceIndex(2)), ResourceIndex(0));
        assert_eq!(registry.resolve(ResourceIndex(0)), ResourceIndex(0));
    }

    #[test]
    fn test_external_through_parent() {
        let mut registry = ResourceRegistry::new();
        let imported = registry.create(
            "swapchain",
            texture(),
            Some(ConcreteResource::Texture(
                crate::frame_graph::TextureHandle::new(1),
            )),
            None,
        );
        let parent_node = registry.lookup(imported).unwrap();
        let sub = registry.create(
            "swapchain.level0",
            ResourceDescriptor::TextureSubresource(Default::default()),
            None,
            Some(parent_node),
        );
        let sub_node = registry.lookup(sub).unwrap();
        assert!(registry.is_external(registry.resolved_resource(sub_node)));
    }
}
