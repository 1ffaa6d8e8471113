//! Versioned handles to virtual resources.
//!
//! A [`Handle`] names one resource at one point of its write history. Every
//! `read` and `write` issued through the builder consumes its input handle and
//! hands back a fresh one, so a handle can never silently start referring to a
//! later version of the resource.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// Untyped handle to a virtual resource version.
///
/// `graph` identifies the frame graph that issued the handle, `index`
/// addresses that graph's append-only handle table and `version` is the write
/// version of the resource the handle was issued for.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle {
    pub(crate) graph: u32,
    pub(crate) index: u32,
    pub(crate) version: u32,
}

impl Handle {
    #[inline]
    pub(crate) fn new(graph: u32, index: u32, version: u32) -> Self {
        Self {
            graph,
            index,
            version,
        }
    }

    /// Slot of this handle in the graph's handle table.
    #[inline]
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Write version of the resource this handle refers to.
    #[inline]
    pub fn version(&self) -> u32 {
        self.version
    }

    #[inline]
    pub(crate) fn slot(&self) -> usize {
        self.index as usize
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({}.v{})", self.index, self.version)
    }
}

/// Handle typed by the kind of resource it refers to.
///
/// The type parameter lets the API reject, at compile time, a texture handle
/// passed where a subresource is expected and vice versa.
pub struct FrameGraphId<R> {
    handle: Handle,
    _marker: PhantomData<fn() -> R>,
}

impl<R> FrameGraphId<R> {
    #[inline]
    pub(crate) fn from_handle(handle: Handle) -> Self {
        Self {
            handle,
            _marker: PhantomData,
        }
    }

    /// Erase the resource type.
    #[inline]
    pub fn handle(&self) -> Handle {
        self.handle
    }
}

impl<R> Clone for FrameGraphId<R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R> Copy for FrameGraphId<R> {}

impl<R> PartialEq for FrameGraphId<R> {
    fn eq(&self, other: &Self) -> bool {
        self.handle == other.handle
    }
}

impl<R> Eq for FrameGraphId<R> {}

impl<R> Hash for FrameGraphId<R> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.handle.hash(state);
    }
}

impl<R> fmt::Debug for FrameGraphId<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FrameGraphId<{}>({}.v{})",
            short_type_name::<R>(),
            self.handle.index,
            self.handle.version
        )
    }
}

impl<R> From<FrameGraphId<R>> for Handle {
    fn from(id: FrameGraphId<R>) -> Self {
        id.handle
    }
}

fn short_type_name<R>() -> &'static str {
    let full = std::any::type_name::<R>();
    full.rsplit("::").next().unwrap_or(full)
}

/// Identifier of a pass in the frame graph.
///
/// Pass ids are assigned in declaration order, which is also the order
/// surviving passes are executed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PassId(pub(crate) u32);

impl PassId {
    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}
