// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::*;

/// Generates, for one kind of mesh element:
/// - `Index` / `IndexMut` on the connectivity, panicking on stale ids.
/// - A fallible getter returning `None` on stale ids.
macro_rules! impl_arena_access {
    ($id_type:ty, $output_type:ty, $arena:ident, $getter:ident) => {
        impl std::ops::Index<$id_type> for MeshConnectivity {
            type Output = $output_type;

            fn index(&self, index: $id_type) -> &Self::Output {
                self.$arena
                    .get(index)
                    .unwrap_or_else(|| stale_id_panic(stringify!($id_type), &index))
            }
        }

        impl std::ops::IndexMut<$id_type> for MeshConnectivity {
            fn index_mut(&mut self, index: $id_type) -> &mut Self::Output {
                self.$arena
                    .get_mut(index)
                    .unwrap_or_else(|| stale_id_panic(stringify!($id_type), &index))
            }
        }

        impl MeshConnectivity {
            /// Returns the element data, or `None` if the id is not part of
            /// this mesh (anymore).
            pub fn $getter(&self, id: $id_type) -> Option<&$output_type> {
                self.$arena.get(id)
            }
        }
    };
}

#[cold]
fn stale_id_panic(kind: &str, id: &dyn std::fmt::Debug) -> ! {
    panic!("{kind} index error for {id:?}. Has the value been deleted?")
}

impl_arena_access!(VertexId, Vertex, vertices, vertex);
impl_arena_access!(FaceId, Face, faces, face);
impl_arena_access!(HalfEdgeId, HalfEdge, halfedges, halfedge);
