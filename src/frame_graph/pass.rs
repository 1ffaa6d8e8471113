//! Pass nodes and their deferred execute payloads.

use super::handle::{Handle, PassId};
use super::registry::NodeIndex;
use super::resource::TextureUsage;
use super::resources::Resources;

/// A declared read of one resource version.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ReadEdge {
    /// Handle returned to the pass by the read.
    pub handle: Handle,
    pub node: NodeIndex,
    pub usage: TextureUsage,
}

/// A declared write producing a new resource version.
#[derive(Debug, Clone, Copy)]
pub(crate) struct WriteEdge {
    /// Handle the write consumed.
    pub input: Handle,
    /// Handle to the version produced by the write.
    pub output: Handle,
    /// Node of the produced version.
    pub node: NodeIndex,
    pub usage: TextureUsage,
}

/// Metadata about a pass in the graph.
#[derive(Debug)]
pub(crate) struct PassNode {
    pub id: PassId,
    pub name: String,
    pub reads: Vec<ReadEdge>,
    pub writes: Vec<WriteEdge>,
    /// Never culled when set.
    pub side_effect: bool,
    /// One reference per connected write.
    pub ref_count: u32,
}

impl PassNode {
    pub fn new(id: PassId, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            reads: Vec::new(),
            writes: Vec::new(),
            side_effect: false,
            ref_count: 0,
        }
    }

    /// Whether `handle` was declared by this pass and may be resolved while
    /// it executes.
    pub fn declares(&self, handle: Handle) -> bool {
        self.reads.iter().any(|r| r.handle == handle)
            || self
                .writes
                .iter()
                .any(|w| w.input == handle || w.output == handle)
    }
}

/// Type-erased execute step of a pass, captured at declaration time and
/// invoked at most once.
pub(crate) trait PassExecutor<D>: Send {
    fn execute(self: Box<Self>, resources: &Resources<'_>, driver: &mut D);
}

/// Pass data plus the closure that consumes it.
pub(crate) struct PassPayload<T, E> {
    pub data: T,
    pub execute: E,
}

impl<D, T, E> PassExecutor<D> for PassPayload<T, E>
where
    T: Send,
    E: FnOnce(&Resources<'_>, &T, &mut D) + Send,
{
    fn execute(self: Box<Self>, resources: &Resources<'_>, driver: &mut D) {
        let PassPayload { data, execute } = *self;
        execute(resources, &data, driver);
    }
}

/// Owner of all passes of one frame, in declaration order.
pub(crate) struct PassRegistry<D> {
    pub nodes: Vec<PassNode>,
    pub executors: Vec<Option<Box<dyn PassExecutor<D>>>>,
}

impl<D> Default for PassRegistry<D> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            executors: Vec::new(),
        }
    }
}

impl<D> PassRegistry<D> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a pass without an execute payload yet.
    pub fn push(&mut self, name: &str) -> PassId {
        let id = PassId(self.nodes.len() as u32);
        self.nodes.push(PassNode::new(id, name));
        self.executors.push(None);
        id
    }

    pub fn node(&self, id: PassId) -> &PassNode {
        &self.nodes[id.index()]
    }

    pub fn node_mut(&mut self, id: PassId) -> &mut PassNode {
        &mut self.nodes[id.index()]
    }

    pub fn set_executor(&mut self, id: PassId, executor: Box<dyn PassExecutor<D>>) {
        self.executors[id.index()] = Some(executor);
    }

    pub fn take_executor(&mut self, id: PassId) -> Option<Box<dyn PassExecutor<D>>> {
        self.executors[id.index()].take()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_assigns_declaration_order() {
        let mut passes = PassRegistry::<()>::new();
        let a = passes.push("shadow");
        let b = passes.push("lighting");
        assert_eq!(a, PassId(0));
        assert_eq!(b, PassId(1));
        assert_eq!(passes.node(b).name, "lighting");
        assert_eq!(passes.len(), 2);
    }

    #[test]
    fn test_declares_reads_and_both_write_handles() {
        let mut node = PassNode::new(PassId(0), "blur");
        node.reads.push(ReadEdge {
            handle: Handle::new(0, 1, 0),
            node: NodeIndex(0),
            usage: TextureUsage::SAMPLEABLE,
        });
        node.writes.push(WriteEdge {
            input: Handle::new(0, 2, 0),
            output: Handle::new(0, 3, 1),
            node: NodeIndex(2),
            usage: TextureUsage::COLOR_ATTACHMENT,
        });

        assert!(node.declares(Handle::new(0, 1, 0)));
        assert!(node.declares(Handle::new(0, 2, 0)));
        assert!(node.declares(Handle::new(0, 3, 1)));
        assert!(!node.declares(Handle::new(0, 4, 0)));
    }

    fn record(_: &Resources<'_>, data: &u32, driver: &mut Vec<u32>) {
        driver.push(*data);
    }

    #[test]
    fn test_executor_runs_once() {
        let mut passes = PassRegistry::<Vec<u32>>::new();
        let id = passes.push("count");
        passes.set_executor(
            id,
            Box::new(PassPayload {
                data: 7u32,
                execute: record,
            }),
        );

        assert!(passes.take_executor(id).is_some());
        assert!(passes.take_executor(id).is_none());
    }
}
