// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::*;

pub trait Location {}

impl Location for VertexId {}
impl Location for FaceId {}
impl Location for HalfEdgeId {}

/// A broken link found while walking the mesh. A well-formed mesh never
/// produces these, so they usually point to a bug in mesh construction.
#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TraversalError {
    #[error("vertex {0:?} has no halfedge")]
    VertexHasNoHalfedge(VertexId),
    #[error("face {0:?} has no halfedge")]
    FaceHasNoHalfedge(FaceId),
    #[error("halfedge {0:?} has no next")]
    HalfEdgeHasNoNext(HalfEdgeId),
    #[error("halfedge {0:?} has no twin")]
    HalfEdgeHasNoTwin(HalfEdgeId),
    #[error("halfedge {0:?} has no vertex")]
    HalfEdgeHasNoVertex(HalfEdgeId),
    #[error("halfedge {0:?} has no face")]
    HalfEdgeHasNoFace(HalfEdgeId),
    #[error("halfedge loop starting at {0:?} does not close")]
    HalfedgeBadLoop(HalfEdgeId),
}

#[derive(Clone, Copy)]
pub struct ValidTraversal<'a, L>
where
    L: Location,
{
    inner: &'a MeshConnectivity,
    location: L,
}

pub type Traversal<'a, L> = Result<ValidTraversal<'a, L>, TraversalError>;

/// Moves a valid traversal to the location returned by `step`, propagating
/// any previous error.
fn step<'a, L: Location + Copy, M: Location>(
    t: &Traversal<'a, L>,
    f: impl FnOnce(&'a MeshConnectivity, L) -> Result<M, TraversalError>,
) -> Traversal<'a, M> {
    let valid = (*t)?;
    Ok(ValidTraversal {
        inner: valid.inner,
        location: f(valid.inner, valid.location)?,
    })
}

/* ===================== */
/* Traversal on vertices */
/* ===================== */

pub trait VertexTraversal<'a> {
    fn halfedge(&self) -> Traversal<'a, HalfEdgeId>;
}

impl<'a> VertexTraversal<'a> for Traversal<'a, VertexId> {
    fn halfedge(&self) -> Traversal<'a, HalfEdgeId> {
        step(self, |conn, v| {
            conn[v].halfedge.ok_or(TraversalError::VertexHasNoHalfedge(v))
        })
    }
}

/* ================== */
/* Traversal on faces */
/* ================== */

pub trait FaceTraversal<'a> {
    fn halfedge(&self) -> Traversal<'a, HalfEdgeId>;
}

impl<'a> FaceTraversal<'a> for Traversal<'a, FaceId> {
    fn halfedge(&self) -> Traversal<'a, HalfEdgeId> {
        step(self, |conn, f| {
            conn[f].halfedge.ok_or(TraversalError::FaceHasNoHalfedge(f))
        })
    }
}

/* ====================== */
/* Traversal on halfedges */
/* ====================== */

pub trait HalfEdgeTraversal<'a> {
    fn twin(&self) -> Traversal<'a, HalfEdgeId>;
    fn next(&self) -> Traversal<'a, HalfEdgeId>;
    fn face(&self) -> Traversal<'a, FaceId>;
    fn vertex(&self) -> Traversal<'a, VertexId>;
    fn face_or_boundary(&self) -> Result<Option<FaceId>, TraversalError>;
}

impl<'a> HalfEdgeTraversal<'a> for Traversal<'a, HalfEdgeId> {
    fn twin(&self) -> Traversal<'a, HalfEdgeId> {
        step(self, |conn, h| {
            conn[h].twin.ok_or(TraversalError::HalfEdgeHasNoTwin(h))
        })
    }

    fn next(&self) -> Traversal<'a, HalfEdgeId> {
        step(self, |conn, h| {
            conn[h].next.ok_or(TraversalError::HalfEdgeHasNoNext(h))
        })
    }

    fn face(&self) -> Traversal<'a, FaceId> {
        step(self, |conn, h| {
            conn[h].face.ok_or(TraversalError::HalfEdgeHasNoFace(h))
        })
    }

    fn vertex(&self) -> Traversal<'a, VertexId> {
        step(self, |conn, h| {
            conn[h].vertex.ok_or(TraversalError::HalfEdgeHasNoVertex(h))
        })
    }

    fn face_or_boundary(&self) -> Result<Option<FaceId>, TraversalError> {
        let valid = (*self)?;
        Ok(valid.inner[valid.location].face)
    }
}

/* =================== */
/*  Generic traversal  */
/* =================== */

pub trait AnyTraversal<L> {
    /// Returns the final location, or the first broken link found on the way.
    fn try_end(&self) -> Result<L, TraversalError>;
}

impl<'a, L> AnyTraversal<L> for Traversal<'a, L>
where
    L: Location + Copy,
{
    fn try_end(&self) -> Result<L, TraversalError> {
        self.map(|valid| valid.location)
    }
}

/* ============ */
/*  Initiators  */
/* ============ */

impl MeshConnectivity {
    pub fn at_halfedge(&self, halfedge_id: HalfEdgeId) -> Traversal<'_, HalfEdgeId> {
        Ok(ValidTraversal {
            inner: self,
            location: halfedge_id,
        })
    }

    pub fn at_face(&self, face_id: FaceId) -> Traversal<'_, FaceId> {
        Ok(ValidTraversal {
            inner: self,
            location: face_id,
        })
    }

    pub fn at_vertex(&self, vertex_id: VertexId) -> Traversal<'_, VertexId> {
        Ok(ValidTraversal {
            inner: self,
            location: vertex_id,
        })
    }
}

/* ================ */
/*  Vertex Helpers  */
/* ================ */

pub trait VertexTraversalHelpers<'a> {
    fn outgoing_halfedges(&self) -> Result<SVec<HalfEdgeId>, TraversalError>;
    fn adjacent_faces(&self) -> Result<SVec<FaceId>, TraversalError>;
}

impl<'a> VertexTraversalHelpers<'a> for Traversal<'a, VertexId> {
    fn outgoing_halfedges(&self) -> Result<SVec<HalfEdgeId>, TraversalError> {
        let valid = (*self)?;
        let mut halfedges = SVec::new();
        // Could be a disconnected vertex. Return an empty list in that case.
        if let Some(h0) = valid.inner[valid.location].halfedge {
            let mut h = h0;
            loop {
                if halfedges.len() > MAX_LOOP_ITERATIONS {
                    return Err(TraversalError::HalfedgeBadLoop(h0));
                }
                halfedges.push(h);
                h = valid.inner.at_halfedge(h).cycle_around_fan().try_end()?;
                if h == h0 {
                    break;
                }
            }
        }
        Ok(halfedges)
    }

    /// Returns the polygon fan around this vertex.
    fn adjacent_faces(&self) -> Result<SVec<FaceId>, TraversalError> {
        let valid = (*self)?;
        Ok(self
            .outgoing_halfedges()?
            .into_iter()
            // NOTE: Halfedges on the boundary have no face
            .filter_map(|h| valid.inner[h].face)
            .collect())
    }
}

/* ============== */
/*  Face Helpers  */
/* ============== */

pub trait FaceTraversalHelpers<'a> {
    fn halfedges(&self) -> Result<SVec<HalfEdgeId>, TraversalError>;
    fn vertices(&self) -> Result<SVec<VertexId>, TraversalError>;
    fn neighbor_faces(&self) -> Result<SVec<FaceId>, TraversalError>;
}

impl<'a> FaceTraversalHelpers<'a> for Traversal<'a, FaceId> {
    fn halfedges(&self) -> Result<SVec<HalfEdgeId>, TraversalError> {
        let valid = (*self)?;
        let mut halfedges = SVec::new();
        let h0 = self.halfedge().try_end()?;
        let mut h = h0;
        loop {
            if halfedges.len() > MAX_LOOP_ITERATIONS {
                return Err(TraversalError::HalfedgeBadLoop(h0));
            }
            halfedges.push(h);
            h = valid.inner.at_halfedge(h).next().try_end()?;
            if h == h0 {
                break;
            }
        }
        Ok(halfedges)
    }

    fn vertices(&self) -> Result<SVec<VertexId>, TraversalError> {
        let valid = (*self)?;
        self.halfedges()?
            .iter()
            .map(|h| valid.inner.at_halfedge(*h).vertex().try_end())
            .collect()
    }

    /// Returns the distinct faces sharing at least one edge with this face,
    /// excluding the face itself. Ordered by the face's halfedge loop.
    fn neighbor_faces(&self) -> Result<SVec<FaceId>, TraversalError> {
        let valid = (*self)?;
        let mut neighbors = SVec::new();
        for h in self.halfedges()? {
            if let Some(other) = valid.inner.at_halfedge(h).twin().face_or_boundary()? {
                if other != valid.location {
                    neighbors.push_unique(other);
                }
            }
        }
        Ok(neighbors)
    }
}

/* ================== */
/*  Halfedge Helpers  */
/* ================== */

pub trait HalfedgeTraversalHelpers<'a> {
    fn cycle_around_fan(&self) -> Traversal<'a, HalfEdgeId>;
    fn dst_vertex(&self) -> Traversal<'a, VertexId>;
    fn previous(&self) -> Traversal<'a, HalfEdgeId>;
    fn is_boundary(&self) -> Result<bool, TraversalError>;
}

impl<'a> HalfedgeTraversalHelpers<'a> for Traversal<'a, HalfEdgeId> {
    fn cycle_around_fan(&self) -> Traversal<'a, HalfEdgeId> {
        self.twin().next()
    }

    fn dst_vertex(&self) -> Traversal<'a, VertexId> {
        self.next().vertex()
    }

    /// Walks the halfedge loop until the halfedge pointing to this one.
    fn previous(&self) -> Traversal<'a, HalfEdgeId> {
        let valid = (*self)?;
        let h0 = valid.location;
        let mut h = h0;
        for _ in 0..MAX_LOOP_ITERATIONS {
            let next = valid.inner.at_halfedge(h).next().try_end()?;
            if next == h0 {
                return valid.inner.at_halfedge(h);
            }
            h = next;
        }
        Err(TraversalError::HalfedgeBadLoop(h0))
    }

    fn is_boundary(&self) -> Result<bool, TraversalError> {
        Ok(self.face_or_boundary()?.is_none())
    }
}
