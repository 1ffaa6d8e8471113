//! Frame graph compilation.
//!
//! Compilation turns the declared passes and resource versions into an
//! execution plan. It performs:
//!
//! 1. **Culling** - reference-counted mark and sweep. A pass is referenced
//!    once per write it makes (plus once if it has a side effect); a resource
//!    version is referenced once per reader, per `present`, per subresource
//!    created from it, and per external write. Unreferenced versions release
//!    their producer, unreferenced passes release what they read, and so on
//!    until nothing changes.
//! 2. **Scheduling** - surviving passes run in declaration order. Declaration
//!    order already respects every dependency because a pass can only use
//!    handles produced by earlier setup calls.
//! 3. **Lifetime resolution** - for each resource, the first and last step
//!    of the schedule that touches it. Subresource use extends the parent's
//!    lifetime. The executor acquires at the first step and releases after
//!    the last.
//!
//! Compilation never adds or removes nodes.

use super::handle::PassId;
use super::pass::PassNode;
use super::registry::{NodeIndex, ResourceIndex, ResourceRegistry};
use super::resource::TextureUsage;

/// Span of schedule steps during which a resource must be backed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceLifetime {
    /// Step of the first surviving pass that uses the resource.
    pub first_use: usize,
    /// Step of the last surviving pass that uses the resource.
    pub last_use: usize,
}

impl ResourceLifetime {
    /// Check if the resource is alive at a given execution step.
    pub fn contains(&self, step: usize) -> bool {
        step >= self.first_use && step <= self.last_use
    }

    fn extend(&mut self, step: usize) {
        self.first_use = self.first_use.min(step);
        self.last_use = self.last_use.max(step);
    }
}

/// Output of [`compile`]: which passes run, in what order, and when each
/// resource is bound and released.
#[derive(Debug, Default)]
pub(crate) struct Schedule {
    /// Surviving passes in execution order.
    pub pass_order: Vec<PassId>,
    /// Indexed by pass.
    pub pass_culled: Vec<bool>,
    /// Indexed by resource version node.
    pub node_culled: Vec<bool>,
    /// Indexed by resource. `None` for culled or redirected resources.
    pub lifetimes: Vec<Option<ResourceLifetime>>,
    /// Union of declared usages, indexed by resource.
    pub usages: Vec<TextureUsage>,
    /// Resources to bind before each step, in ascending resource order.
    pub devirtualize: Vec<Vec<ResourceIndex>>,
    /// Resources to release after each step.
    pub destroy: Vec<Vec<ResourceIndex>>,
}

impl Schedule {
    pub fn culled_pass_count(&self) -> usize {
        self.pass_culled.iter().filter(|&&culled| culled).count()
    }
}

/// Compile passes and resources into a [`Schedule`].
///
/// With `culling` disabled every declared pass survives.
pub(crate) fn compile(
    passes: &[PassNode],
    registry: &ResourceRegistry,
    culling: bool,
) -> Schedule {
    let mut schedule = Schedule {
        pass_culled: vec![false; passes.len()],
        node_culled: vec![false; registry.nodes().len()],
        ..Schedule::default()
    };

    if culling {
        let mut culler = Culler::new(passes, registry);
        culler.run();
        schedule.pass_culled = culler.pass_culled;
        schedule.node_culled = culler.node_culled;
    }

    schedule.pass_order = passes
        .iter()
        .filter(|pass| !schedule.pass_culled[pass.id.index()])
        .map(|pass| pass.id)
        .collect();

    resolve_lifetimes(passes, registry, &mut schedule);
    schedule
}

/// Working state of the reference-counted sweep.
struct Culler<'a> {
    passes: &'a [PassNode],
    registry: &'a ResourceRegistry,
    pass_refs: Vec<u32>,
    node_refs: Vec<u32>,
    /// Versions of each resource not yet culled.
    live_nodes: Vec<usize>,
    pass_culled: Vec<bool>,
    node_culled: Vec<bool>,
    stack: Vec<NodeIndex>,
}

impl<'a> Culler<'a> {
    fn new(passes: &'a [PassNode], registry: &'a ResourceRegistry) -> Self {
        Self {
            passes,
            registry,
            pass_refs: passes
                .iter()
                .map(|pass| pass.ref_count + u32::from(pass.side_effect))
                .collect(),
            node_refs: registry.nodes().iter().map(|node| node.ref_count).collect(),
            live_nodes: registry
                .resources()
                .iter()
                .map(|resource| resource.nodes.len())
                .collect(),
            pass_culled: vec![false; passes.len()],
            node_culled: vec![false; registry.nodes().len()],
            stack: Vec::new(),
        }
    }

    fn run(&mut self) {
        // Seed with every version nothing refers to.
        for (index, &refs) in self.node_refs.iter().enumerate().rev() {
            if refs == 0 {
                self.stack.push(NodeIndex(index as u32));
            }
        }

        // Passes nothing refers to are dead on arrival.
        let passes = self.passes;
        for pass in passes.iter().rev() {
            if self.pass_refs[pass.id.index()] == 0 {
                self.cull_pass(pass.id);
            }
        }

        while let Some(node) = self.stack.pop() {
            self.cull_node(node);
        }
    }

    fn cull_pass(&mut self, id: PassId) {
        if self.pass_culled[id.index()] {
            return;
        }
        self.pass_culled[id.index()] = true;

        let passes = self.passes;
        for read in &passes[id.index()].reads {
            self.unreference(read.node);
        }
    }

    fn cull_node(&mut self, index: NodeIndex) {
        self.node_culled[index.index()] = true;
        let registry = self.registry;
        let node = registry.node(index);

        if let Some(producer) = node.producer {
            let refs = &mut self.pass_refs[producer.index()];
            if !self.pass_culled[producer.index()] && *refs > 0 {
                *refs -= 1;
                if *refs == 0 {
                    self.cull_pass(producer);
                }
            }
        }

        if let Some(forward) = node.forward {
            self.unreference(forward);
        }

        let live = &mut self.live_nodes[node.resource.index()];
        *live -= 1;
        if *live == 0 {
            if let Some(parent) = registry.resource(node.resource).parent {
                self.unreference(parent);
            }
        }
    }

    fn unreference(&mut self, node: NodeIndex) {
        let refs = &mut self.node_refs[node.index()];
        if *refs == 0 {
            return;
        }
        *refs -= 1;
        if *refs == 0 {
            self.stack.push(node);
        }
    }
}

fn resolve_lifetimes(passes: &[PassNode], registry: &ResourceRegistry, schedule: &mut Schedule) {
    let resource_count = registry.resource_count();
    schedule.lifetimes = vec![None; resource_count];
    schedule.usages = vec![TextureUsage::empty(); resource_count];

    for (step, &id) in schedule.pass_order.iter().enumerate() {
        let pass = &passes[id.index()];

        for read in &pass.reads {
            let node = registry.node(read.node);
            let resource = registry.resource(node.resource);
            if node.producer.is_none()
                && node.forward.is_none()
                && resource.parent.is_none()
                && !registry.is_external(registry.resolve(node.resource))
            {
                log::warn!(
                    "pass '{}' reads '{}' before any pass writes it",
                    pass.name,
                    resource.name
                );
            }
        }

        let edges = pass
            .reads
            .iter()
            .map(|read| (read.node, read.usage))
            .chain(pass.writes.iter().map(|write| (write.node, write.usage)));

        for (node, usage) in edges {
            let mut resource = registry.resolved_resource(node);
            loop {
                schedule.lifetimes[resource.index()]
                    .get_or_insert(ResourceLifetime {
                        first_use: step,
                        last_use: step,
                    })
                    .extend(step);
                schedule.usages[resource.index()] |= usage;

                match registry.resource(resource).parent {
                    Some(parent) => resource = registry.resolved_resource(parent),
                    None => break,
                }
            }
        }
    }

    schedule.devirtualize = vec![Vec::new(); schedule.pass_order.len()];
    schedule.destroy = vec![Vec::new(); schedule.pass_order.len()];
    for (index, lifetime) in schedule.lifetimes.iter().enumerate() {
        if let Some(lifetime) = lifetime {
            let resource = ResourceIndex(index as u32);
            schedule.devirtualize[lifetime.first_use].push(resource);
            schedule.destroy[lifetime.last_use].push(resource);
        }
    }
}
