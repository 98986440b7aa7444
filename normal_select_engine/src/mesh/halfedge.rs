// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::{
    prelude::*,
    sync::{BorrowedRef, InteriorMutable, MutableRef},
};

use slotmap::{SecondaryMap, SlotMap};

/// Implements indexing traits so the mesh data structure can be used to access
/// vertex, face or halfedge information using ids as indices.
pub mod mesh_index_impls;

/// Type-safe wrappers over the internal allocator indices used as pointers
pub mod id_types;
pub use id_types::*;

/// An API to represent type-safe and error-handled graph traversals over a mesh
pub mod traversals;
pub use traversals::*;

/// Primitive shapes, like boxes, grids or spheres
pub mod primitives;

/// Attribute-level edits: normals and face selection. These never change the
/// mesh topology.
pub mod edit_ops;

/// Types to represent a selection of a subset of faces.
pub mod selection;

/// Named per-element attribute storage.
pub mod channels;
pub use channels::*;

/// Dense index mappings for the sparse element ids.
pub mod mappings;
use mappings::MeshMapping;

/// HalfEdge meshes are a type of linked list. This means it is sometimes
/// impossible to ensure some algorithms will terminate when the mesh is
/// malformed. To ensure the code never goes into an infinite loop, this max
/// number of iterations will be performed before giving an error. This error
/// should be large enough, as faces with a very large number of vertices may
/// trigger it.
pub const MAX_LOOP_ITERATIONS: usize = 8196;

#[derive(Debug, Default, Clone)]
pub struct HalfEdge {
    twin: Option<HalfEdgeId>,
    next: Option<HalfEdgeId>,
    vertex: Option<VertexId>,
    face: Option<FaceId>,
}

#[derive(Debug, Clone)]
pub struct Vertex {
    halfedge: Option<HalfEdgeId>,
}

#[derive(Debug, Clone)]
pub struct Face {
    halfedge: Option<HalfEdgeId>,
}

#[derive(Debug, Clone, Default)]
pub struct MeshConnectivity {
    vertices: SlotMap<VertexId, Vertex>,
    faces: SlotMap<FaceId, Face>,
    halfedges: SlotMap<HalfEdgeId, HalfEdge>,
}

#[derive(Debug)]
#[cfg_attr(not(feature = "sync"), derive(Clone))]
pub struct HalfEdgeMesh {
    connectivity: InteriorMutable<MeshConnectivity>,
    pub channels: MeshChannels,
    default_channels: DefaultChannels,
}

#[cfg(feature = "sync")]
impl Clone for HalfEdgeMesh {
    fn clone(&self) -> Self {
        HalfEdgeMesh {
            connectivity: InteriorMutable::new(self.connectivity.borrow().clone()),
            channels: self.channels.clone(),
            default_channels: self.default_channels.clone(),
        }
    }
}

pub type Positions = Channel<VertexId, Vec3>;

impl MeshConnectivity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn face_vertices(&self, face_id: FaceId) -> Result<SVec<VertexId>> {
        Ok(self.at_face(face_id).vertices()?)
    }

    /// Given a `self` in an inconsistent state, where some halfedges have no
    /// `twin` (because they're in the boundary), this method adds twin
    /// halfedges forming a loop across the boundaries of the mesh. The new
    /// halfedges will be marked as boundary with a None face.
    fn add_boundary_halfedges(&mut self) -> Result<()> {
        let halfedges: Vec<HalfEdgeId> = self.iter_halfedges().map(|(h, _)| h).collect();

        for &h0 in halfedges.iter() {
            if self[h0].twin.is_some() {
                continue;
            }
            let mut boundary_halfedges = Vec::<HalfEdgeId>::new();
            let mut h_it = h0;
            loop {
                if boundary_halfedges.len() > MAX_LOOP_ITERATIONS {
                    bail!("Max number of iterations reached. Is the mesh malformed?");
                }
                let t = self.alloc_halfedge(HalfEdge::default());
                boundary_halfedges.push(t);
                self[h_it].twin = Some(t);
                self[t].twin = Some(h_it);
                self[t].vertex = Some(self.at_halfedge(h_it).dst_vertex().try_end()?);

                // Look for the next outgoing halfedge for this vertex
                // that's in the boundary
                h_it = self.at_halfedge(h_it).next().try_end()?;
                while h_it != h0 && self[h_it].twin.is_some() {
                    // Twin-next cycles around the outgoing halfedges of a vertex
                    h_it = self.at_halfedge(h_it).cycle_around_fan().try_end()?;
                }

                if h_it == h0 {
                    break;
                }
            }

            for (&b_h, &b_h_next) in boundary_halfedges.iter().rev().circular_tuple_windows() {
                self[b_h].next = Some(b_h_next);
            }
        }
        Ok(())
    }

    pub fn iter_vertices(&self) -> impl Iterator<Item = (VertexId, &Vertex)> {
        self.vertices.iter()
    }

    pub fn iter_faces(&self) -> impl Iterator<Item = (FaceId, &Face)> {
        self.faces.iter()
    }

    pub fn iter_halfedges(&self) -> impl Iterator<Item = (HalfEdgeId, &HalfEdge)> {
        self.halfedges.iter()
    }

    /// Adds a new vertex to the mesh, disconnected from everything else. Returns its handle.
    fn alloc_vertex(
        &mut self,
        positions: &mut Positions,
        position: Vec3,
        halfedge: Option<HalfEdgeId>,
    ) -> VertexId {
        let v = self.vertices.insert(Vertex { halfedge });
        positions[v] = position;
        v
    }

    /// Adds a new face to the mesh, disconnected from everything else. Returns its handle.
    fn alloc_face(&mut self, halfedge: Option<HalfEdgeId>) -> FaceId {
        self.faces.insert(Face { halfedge })
    }

    /// Adds a new halfedge to the mesh, disconnected from everything else. Returns its handle.
    fn alloc_halfedge(&mut self, halfedge: HalfEdge) -> HalfEdgeId {
        self.halfedges.insert(halfedge)
    }

    /// Returns the normal of the face. The first three vertices are used to
    /// compute the normal. If the vertices of the face are not coplanar,
    /// the result will not be correct. Faces with less than three vertices,
    /// or whose first three vertices are collinear, have no normal.
    pub fn face_normal(&self, positions: &Positions, face: FaceId) -> Option<Vec3> {
        let verts = self.face_vertices(face).ok()?;
        if verts.len() >= 3 {
            let v01 = positions[verts[0]] - positions[verts[1]];
            let v12 = positions[verts[1]] - positions[verts[2]];
            v01.cross(v12).try_normalize()
        } else {
            None
        }
    }

    pub fn num_halfedges(&self) -> usize {
        self.halfedges.len()
    }

    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    /// Returns the dense `0..num_faces` index of every face. This is the face
    /// index used by selection expressions and by the face graph.
    pub fn face_mapping(&self) -> MeshMapping<FaceId> {
        MeshMapping::new(&self.faces)
    }

    /// Returns the dense `0..num_vertices` index of every vertex.
    pub fn vertex_mapping(&self) -> MeshMapping<VertexId> {
        MeshMapping::new(&self.vertices)
    }

    /// Returns the face ids sorted by their dense index.
    pub fn face_ids(&self) -> Vec<FaceId> {
        self.faces.keys().collect()
    }
}

impl HalfEdgeMesh {
    pub fn new() -> Self {
        let mut channels = MeshChannels::default();
        let default_channels = DefaultChannels::with_position(&mut channels);
        Self {
            channels,
            default_channels,
            connectivity: InteriorMutable::new(MeshConnectivity::new()),
        }
    }

    pub fn read_connectivity(&self) -> BorrowedRef<'_, MeshConnectivity> {
        self.connectivity.borrow()
    }

    pub fn write_connectivity(&self) -> MutableRef<'_, MeshConnectivity> {
        self.connectivity.borrow_mut()
    }

    pub fn read_positions(&self) -> BorrowedRef<'_, Positions> {
        self.channels
            .read_channel(self.default_channels.position)
            .expect("Could not read positions")
    }

    pub fn write_positions(&self) -> MutableRef<'_, Positions> {
        self.channels
            .write_channel(self.default_channels.position)
            .expect("Could not write positions")
    }

    /// Returns the face normals channel, if normals have been computed for
    /// this mesh. See [`edit_ops::set_flat_normals`].
    pub fn read_face_normals(&self) -> Option<BorrowedRef<'_, Channel<FaceId, Vec3>>> {
        self.default_channels
            .face_normals
            .or_else(|| self.channels.channel_id(FACE_NORMAL_CHANNEL))
            .map(|ch_id| {
                self.channels
                    .read_channel(ch_id)
                    .expect("Could not read face normals")
            })
    }

    /// Returns the id of the face selection channel, creating it when missing.
    pub fn ensure_selection_channel(&mut self) -> ChannelId<FaceId, bool> {
        self.channels.ensure_channel(SELECTION_CHANNEL)
    }

    /// Builds this mesh from a list of vertices, and a list of polygons,
    /// containing indices that reference those vertices.
    ///
    /// - Generic over Index: Use as much precision as you need / want.
    /// - Generic over Polygon: Use whatever input layout you want.
    ///
    /// If unsure, you can pass `Vec<Vec<u32>>` as `polygons`. You can also use
    /// `[[u32;3]]` or `&[&[u32]]`. Same for `u8`, `u16` or `usize` indices.
    ///
    /// Faces are allocated in `polygons` order, so the dense face index of
    /// the i-th polygon is `i`.
    #[profiling::function]
    pub fn build_from_polygons<Index, Polygon>(
        positions: &[Vec3],
        polygons: &[Polygon],
    ) -> Result<Self>
    where
        Index: num_traits::AsPrimitive<usize> + 'static + Eq + PartialEq + core::hash::Hash + Copy,
        Polygon: AsRef<[Index]>,
    {
        let mesh = Self::new();
        let mut conn = mesh.write_connectivity();
        let mut positions_ch = mesh.write_positions();

        // Maps indices from the `polygons` array to the allocated vertices in
        // the newly created halfedge mesh.
        let mut index_to_vertex = HashMap::<Index, VertexId>::new();

        // Number of polygons each vertex is part of. Used for the manifold
        // check at the end.
        let mut vertex_degree = SecondaryMap::<VertexId, u32>::new();

        for polygon in polygons.iter().map(|p| p.as_ref()) {
            if polygon.len() < 3 {
                bail!("Cannot build meshes where polygons have less than three vertices.")
            }
            if polygon.iter().duplicates().next().is_some() {
                bail!("Cannot build meshes where a polygon has duplicate vertices")
            }

            for index in polygon {
                let position = positions.get(index.as_()).ok_or_else(|| {
                    anyhow!("Out-of-bounds index in the polygon array {}", index.as_())
                })?;
                let v_id = *index_to_vertex
                    .entry(*index)
                    .or_insert_with(|| conn.alloc_vertex(&mut positions_ch, *position, None));

                if let Some(degree) = vertex_degree.entry(v_id) {
                    *degree.or_insert(0) += 1;
                }
            }
        }

        // Maps pairs of indices to mesh halfedges
        let mut pair_to_halfedge = HashMap::<(Index, Index), HalfEdgeId>::new();

        for polygon in polygons.iter().map(|p| p.as_ref()) {
            // Cyclically ordered list of the half edge ids of this face.
            let mut half_edges_in_face = SVec::new();

            let face = conn.alloc_face(None);

            for (&a, &b) in polygon.iter().circular_tuple_windows() {
                if pair_to_halfedge.contains_key(&(a, b)) {
                    bail!(
                        "Found multiple oriented edges with the same indices. \
                         This means either (i) surface is non-manifold or (ii) faces \
                         are not oriented in the same direction"
                    )
                }

                let h = conn.alloc_halfedge(HalfEdge::default());
                conn[h].face = Some(face);
                conn[face].halfedge = Some(h);

                let v_a = index_to_vertex[&a];
                conn[h].vertex = Some(v_a);
                conn[v_a].halfedge = Some(h);

                half_edges_in_face.push(h);

                pair_to_halfedge.insert((a, b), h);

                if let Some(&other) = pair_to_halfedge.get(&(b, a)) {
                    conn[h].twin = Some(other);
                    conn[other].twin = Some(h);
                }
            }

            for (&h1, &h2) in half_edges_in_face.iter().circular_tuple_windows() {
                conn[h1].next = Some(h2);
            }
        }

        // Close the boundary: every halfedge without a twin gets a twin with
        // no face, and those twins are linked in a loop around each hole, so
        // traversals can always rely on twins being present.
        conn.add_boundary_halfedges()?;

        // Check that the number of faces around each vertex fan matches the
        // number of polygons referencing that vertex. Otherwise the vertex is
        // not a single polygon fan, but some non-manifold structure.
        for (v, _) in conn.iter_vertices() {
            let mut count = 0;
            for h in conn.at_vertex(v).outgoing_halfedges()? {
                if !conn.at_halfedge(h).is_boundary()? {
                    count += 1;
                }
            }
            if count != vertex_degree[v] {
                bail!("At least one of the vertices is not a polygon fan, but some other nonmanifold structure instead.")
            }
        }

        drop(conn);
        drop(positions_ch);
        Ok(mesh)
    }
}

impl Default for HalfEdgeMesh {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn two_triangles() -> HalfEdgeMesh {
        // 2---3
        // | / |
        // 0---1
        HalfEdgeMesh::build_from_polygons(
            &[
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
                Vec3::new(1.0, 1.0, 0.0),
            ],
            &[[0u32, 1, 3], [0, 3, 2]],
        )
        .unwrap()
    }

    #[test]
    pub fn test_build_counts() {
        let mesh = two_triangles();
        let conn = mesh.read_connectivity();
        assert_eq!(conn.num_vertices(), 4);
        assert_eq!(conn.num_faces(), 2);
        // 6 inner halfedges, 4 boundary halfedges closing the outer loop
        assert_eq!(conn.num_halfedges(), 10);

        for (h, _) in conn.iter_halfedges() {
            assert!(conn.at_halfedge(h).twin().try_end().is_ok());
            assert!(conn.at_halfedge(h).next().try_end().is_ok());
        }
    }

    #[test]
    pub fn test_face_normal() {
        let mesh = two_triangles();
        let conn = mesh.read_connectivity();
        let positions = mesh.read_positions();
        for (f, _) in conn.iter_faces() {
            let n = conn.face_normal(&positions, f).unwrap();
            assert!((n - Vec3::Z).length() < 1e-6, "{n:?}");
        }
    }

    #[test]
    pub fn test_face_mapping_follows_polygon_order() {
        let mesh = two_triangles();
        let conn = mesh.read_connectivity();
        let mapping = conn.face_mapping();
        let ids = conn.face_ids();
        assert_eq!(mapping.len(), 2);
        assert!(!mapping.is_empty());
        assert_eq!(mapping.map_seq(&ids), vec![0, 1]);
    }

    #[test]
    pub fn test_build_errors() {
        let positions = [Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::Z];

        // Degenerate polygon
        assert!(HalfEdgeMesh::build_from_polygons(&positions, &[[0u32, 1]]).is_err());
        // Repeated vertex
        assert!(HalfEdgeMesh::build_from_polygons(&positions, &[[0u32, 1, 1]]).is_err());
        // Out of bounds
        assert!(HalfEdgeMesh::build_from_polygons(&positions, &[[0u32, 1, 9]]).is_err());
        // Inconsistent orientation: both triangles traverse 0 -> 1
        assert!(HalfEdgeMesh::build_from_polygons(&positions, &[[0u32, 1, 2], [0, 1, 3]]).is_err());
    }
}
