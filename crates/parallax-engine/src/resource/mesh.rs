use crate::gpu::{Topology, VertexStateId};

/// Uploaded geometry as seen by the renderer: a vertex state to bind and what to draw
/// from it.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Mesh {
    vertex_state: VertexStateId,
    vertex_count: u32,
    topology: Topology,
}

impl Mesh {
    pub fn new(vertex_state: VertexStateId, vertex_count: u32, topology: Topology) -> Self {
        Self {
            vertex_state,
            vertex_count,
            topology,
        }
    }

    #[inline]
    pub fn vertex_state(&self) -> VertexStateId {
        self.vertex_state
    }

    #[inline]
    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    #[inline]
    pub fn topology(&self) -> Topology {
        self.topology
    }
}
