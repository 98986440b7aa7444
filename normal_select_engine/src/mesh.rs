// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/// The HalfEdge data structure, with topological traversals and attribute
/// channels.
pub mod halfedge;

/// A minimal face adjacency interface, decoupling the region growing
/// algorithm from any concrete mesh representation.
pub mod face_graph;

/// Grows connected regions of faces with similar normals, starting at a set
/// of seed faces.
pub mod region_growing;
