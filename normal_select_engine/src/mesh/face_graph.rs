// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The face-level view of a mesh that region growing works on: per-face
//! normals, edge adjacency and a selection flag, all addressed by dense face
//! index.

use crate::prelude::*;

/// Dense index of a face, in `0..num_faces`. For a [`HalfEdgeMesh`] this is
/// the index given by [`MeshConnectivity::face_mapping`].
pub type FaceIndex = u32;

pub trait FaceGraph {
    fn num_faces(&self) -> usize;

    /// The unit normal of `face`. May be zero for degenerate faces.
    fn face_normal(&self, face: FaceIndex) -> Vec3;

    /// The distinct faces sharing at least one edge with `face`, never
    /// including `face` itself.
    fn connected_faces(&self, face: FaceIndex) -> SVec<FaceIndex>;

    fn is_selected(&self, face: FaceIndex) -> bool;

    /// Marks `face` as selected. There is no way to deselect a face.
    fn select_face(&mut self, face: FaceIndex);

    /// The selected faces, in ascending index order.
    fn selected_faces(&self) -> Vec<FaceIndex> {
        (0..self.num_faces() as FaceIndex)
            .filter(|f| self.is_selected(*f))
            .collect()
    }
}

/// Returns the faces that share an edge with `face`.
pub fn connected_faces<G: FaceGraph + ?Sized>(graph: &G, face: FaceIndex) -> SVec<FaceIndex> {
    graph.connected_faces(face)
}

/// A compact, array-backed [`FaceGraph`]. Snapshot of a mesh's faces taken
/// at construction time: later edits to the mesh are not reflected, and the
/// selection is only written back through [`FaceAdjacency::write_selection`].
#[derive(Debug, Clone, Default)]
pub struct FaceAdjacency {
    normals: Vec<Vec3>,
    neighbors: Vec<SVec<FaceIndex>>,
    selected: Vec<bool>,
}

impl FaceAdjacency {
    /// Reads the faces of `mesh`. Normals come from the `face_normal` channel
    /// when the mesh has one, and are computed flat otherwise. Selection
    /// flags come from the `selected` channel.
    #[profiling::function]
    pub fn from_halfedge(mesh: &HalfEdgeMesh) -> Result<Self> {
        let conn = mesh.read_connectivity();
        let positions = mesh.read_positions();
        let face_normals = mesh.read_face_normals();
        let selection = match mesh.channels.channel_id::<FaceId, bool>(SELECTION_CHANNEL) {
            Some(ch_id) => Some(mesh.channels.read_channel(ch_id)?),
            None => None,
        };
        let mapping = conn.face_mapping();

        let num_faces = conn.num_faces();
        let mut adjacency = Self {
            normals: Vec::with_capacity(num_faces),
            neighbors: Vec::with_capacity(num_faces),
            selected: Vec::with_capacity(num_faces),
        };

        for (face, _) in conn.iter_faces() {
            let normal = match &face_normals {
                Some(normals) => normals[face],
                None => conn.face_normal(&positions, face).unwrap_or(Vec3::ZERO),
            };
            let neighbors: SVec<FaceIndex> = conn
                .at_face(face)
                .neighbor_faces()?
                .iter()
                .map(|f| mapping[*f])
                .collect();

            adjacency.normals.push(normal);
            adjacency.neighbors.push(neighbors);
            adjacency
                .selected
                .push(selection.as_ref().map(|ch| ch[face]).unwrap_or(false));
        }

        Ok(adjacency)
    }

    /// Builds the adjacency of a plain list of polygons, given as indices
    /// into a shared vertex list, and their normals. Two faces are connected
    /// when they have an edge in common, regardless of its orientation. Edges
    /// shared by more than two faces connect all of them.
    ///
    /// Nothing is selected initially.
    pub fn from_polygons<Polygon>(normals: &[Vec3], polygons: &[Polygon]) -> Result<Self>
    where
        Polygon: AsRef<[u32]>,
    {
        if normals.len() != polygons.len() {
            bail!(
                "Got {} normals for {} polygons",
                normals.len(),
                polygons.len()
            );
        }

        fn edges(polygon: &[u32]) -> impl Iterator<Item = (u32, u32)> + '_ {
            let edge_count = if polygon.len() < 2 { 0 } else { polygon.len() };
            polygon
                .iter()
                .copied()
                .circular_tuple_windows()
                .take(edge_count)
                .map(|(a, b)| (a.min(b), a.max(b)))
        }

        let mut edge_to_faces = HashMap::<(u32, u32), SVec<FaceIndex>>::new();
        for (face, polygon) in polygons.iter().enumerate() {
            for edge in edges(polygon.as_ref()) {
                edge_to_faces
                    .entry(edge)
                    .or_default()
                    .push_unique(face as FaceIndex);
            }
        }

        let neighbors = polygons
            .iter()
            .enumerate()
            .map(|(face, polygon)| {
                let mut neighbors = SVec::new();
                for edge in edges(polygon.as_ref()) {
                    for other in edge_to_faces[&edge].iter_cpy() {
                        if other != face as FaceIndex {
                            neighbors.push_unique(other);
                        }
                    }
                }
                neighbors
            })
            .collect();

        Ok(Self {
            normals: normals.to_vec(),
            neighbors,
            selected: vec![false; polygons.len()],
        })
    }

    /// Copies the selection flags back into the `selected` channel of `mesh`.
    /// The mesh must still have the faces this adjacency was built from.
    pub fn write_selection(&self, mesh: &mut HalfEdgeMesh) -> Result<()> {
        let ch_id = mesh.ensure_selection_channel();
        let conn = mesh.read_connectivity();
        if conn.num_faces() != self.selected.len() {
            bail!(
                "The mesh has {} faces, but the selection has {}. Was the mesh edited?",
                conn.num_faces(),
                self.selected.len()
            );
        }

        let mut selection = mesh.channels.write_channel(ch_id)?;
        for ((face, _), selected) in conn.iter_faces().zip(self.selected.iter_cpy()) {
            selection[face] = selected;
        }
        Ok(())
    }
}

impl FaceGraph for FaceAdjacency {
    fn num_faces(&self) -> usize {
        self.normals.len()
    }

    fn face_normal(&self, face: FaceIndex) -> Vec3 {
        self.normals[face as usize]
    }

    fn connected_faces(&self, face: FaceIndex) -> SVec<FaceIndex> {
        self.neighbors[face as usize].clone()
    }

    fn is_selected(&self, face: FaceIndex) -> bool {
        self.selected[face as usize]
    }

    fn select_face(&mut self, face: FaceIndex) {
        self.selected[face as usize] = true;
    }
}
