// Copyright (C) 2022 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

slotmap::new_key_type! {
    /// Handle to a halfedge. Boundary halfedges are regular halfedges with no face.
    pub struct HalfEdgeId;
}
slotmap::new_key_type! { pub struct VertexId; }
slotmap::new_key_type! {
    /// Handle to a face. Stable across attribute edits, but not a dense
    /// index. See [`MeshMapping`](super::mappings::MeshMapping) for that.
    pub struct FaceId;
}
