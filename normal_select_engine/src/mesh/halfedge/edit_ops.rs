// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::selection::SelectionExpression;
use super::*;

/// Generates a flat normal for every face of the mesh.
pub fn generate_flat_normals_channel(mesh: &HalfEdgeMesh) -> Result<Channel<FaceId, Vec3>> {
    let positions = mesh.read_positions();
    let conn = mesh.read_connectivity();
    let mut normals = Channel::<FaceId, Vec3>::new();

    for (face, _) in conn.iter_faces() {
        // NOTE: Degenerate faces get a zero normal.
        normals[face] = conn.face_normal(&positions, face).unwrap_or(Vec3::ZERO);
    }

    Ok(normals)
}

/// Computes the flat normal channel for this mesh and registers it as the
/// `face_normal` channel, replacing any previous normals.
pub fn set_flat_normals(mesh: &mut HalfEdgeMesh) -> Result<()> {
    let normals = generate_flat_normals_channel(mesh)?;
    let normals_ch_id = mesh
        .channels
        .replace_or_create_channel(FACE_NORMAL_CHANNEL, normals)?;

    mesh.default_channels.face_normals = Some(normals_ch_id);

    Ok(())
}

/// Marks every face matched by `expression` as selected. Faces that were
/// already selected stay selected.
pub fn select_faces(mesh: &mut HalfEdgeMesh, expression: &SelectionExpression) -> Result<()> {
    let faces = mesh.resolve_face_selection_full(expression)?;
    let ch_id = mesh.ensure_selection_channel();
    let mut selected = mesh.channels.write_channel(ch_id)?;
    for face in faces {
        selected[face] = true;
    }
    Ok(())
}

/// Deselects every face of the mesh.
pub fn clear_face_selection(mesh: &mut HalfEdgeMesh) -> Result<()> {
    let ch_id = mesh.ensure_selection_channel();
    mesh.channels.write_channel(ch_id)?.clear();
    Ok(())
}

/// Returns the selected faces, in face index order.
pub fn selected_face_ids(mesh: &HalfEdgeMesh) -> Result<Vec<FaceId>> {
    let conn = mesh.read_connectivity();
    let Some(ch_id) = mesh.channels.channel_id::<FaceId, bool>(SELECTION_CHANNEL) else {
        return Ok(vec![]);
    };
    let selected = mesh.channels.read_channel(ch_id)?;
    Ok(conn
        .iter_faces()
        .map(|(f, _)| f)
        .filter(|f| selected[*f])
        .collect())
}

/// Returns the face indices of the selected faces, in ascending order.
pub fn selected_face_indices(mesh: &HalfEdgeMesh) -> Result<Vec<u32>> {
    let mapping = mesh.read_connectivity().face_mapping();
    Ok(mapping.map_seq(&selected_face_ids(mesh)?))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    pub fn test_flat_normals() {
        let mut mesh = primitives::Box::build(Vec3::ZERO, Vec3::ONE).unwrap();
        assert!(mesh.read_face_normals().is_none());
        set_flat_normals(&mut mesh).unwrap();

        let conn = mesh.read_connectivity();
        let normals = mesh.read_face_normals().unwrap();
        let positions = mesh.read_positions();
        for (f, _) in conn.iter_faces() {
            assert_eq!(Some(normals[f]), conn.face_normal(&positions, f));
            assert!((normals[f].length() - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    pub fn test_select_is_additive() {
        let mut mesh = primitives::Grid::build(Vec3::ZERO, 4, 1, 1.0).unwrap();
        assert_eq!(selected_face_indices(&mesh).unwrap(), Vec::<u32>::new());

        select_faces(&mut mesh, &SelectionExpression::parse("0, 2").unwrap()).unwrap();
        select_faces(&mut mesh, &SelectionExpression::parse("3").unwrap()).unwrap();
        assert_eq!(selected_face_indices(&mesh).unwrap(), vec![0, 2, 3]);

        // Selecting with a group that refers to the selection itself is a no-op
        select_faces(&mut mesh, &SelectionExpression::parse("@selected").unwrap()).unwrap();
        assert_eq!(selected_face_indices(&mesh).unwrap(), vec![0, 2, 3]);

        clear_face_selection(&mut mesh).unwrap();
        assert!(selected_face_ids(&mesh).unwrap().is_empty());
    }
}
