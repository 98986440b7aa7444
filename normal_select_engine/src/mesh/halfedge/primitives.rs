// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::f32::consts::PI;

use super::*;

pub struct Box;

impl Box {
    pub fn build(center: Vec3, size: Vec3) -> Result<HalfEdgeMesh> {
        let hsize = size * 0.5;

        let v1 = center + Vec3::new(-hsize.x, -hsize.y, -hsize.z);
        let v2 = center + Vec3::new(hsize.x, -hsize.y, -hsize.z);
        let v3 = center + Vec3::new(hsize.x, -hsize.y, hsize.z);
        let v4 = center + Vec3::new(-hsize.x, -hsize.y, hsize.z);

        let v5 = center + Vec3::new(-hsize.x, hsize.y, -hsize.z);
        let v6 = center + Vec3::new(-hsize.x, hsize.y, hsize.z);
        let v7 = center + Vec3::new(hsize.x, hsize.y, hsize.z);
        let v8 = center + Vec3::new(hsize.x, hsize.y, -hsize.z);

        // Bottom, top, front, back, left, right
        HalfEdgeMesh::build_from_polygons(
            &[v1, v2, v3, v4, v5, v6, v7, v8],
            &[
                [0u32, 1, 2, 3],
                [4, 5, 6, 7],
                [4, 7, 1, 0],
                [3, 2, 6, 5],
                [5, 4, 0, 3],
                [6, 2, 1, 7],
            ],
        )
        .context("Box construction failed")
    }
}

pub struct Quad;
impl Quad {
    pub fn build(center: Vec3, normal: Vec3, right: Vec3, size: Vec2) -> Result<HalfEdgeMesh> {
        let normal = normal.normalize();
        let right = right.normalize();
        let forward = normal.cross(right);

        let hsize = size * 0.5;

        let v1 = center + hsize.x * right + hsize.y * forward;
        let v2 = center - hsize.x * right + hsize.y * forward;
        let v3 = center - hsize.x * right - hsize.y * forward;
        let v4 = center + hsize.x * right - hsize.y * forward;

        HalfEdgeMesh::build_from_polygons(&[v1, v2, v3, v4], &[[0u32, 1, 2, 3]])
            .context("Quad construction failed")
    }
}

/// A plane on the XZ axes, facing +Y, subdivided in `cells_x` by `cells_z`
/// quads. The face at column `x` and row `z` has index `z * cells_x + x`.
pub struct Grid;
impl Grid {
    pub fn build(center: Vec3, cells_x: u32, cells_z: u32, spacing: f32) -> Result<HalfEdgeMesh> {
        let offset = center
            - Vec3::new(cells_x as f32 * spacing, 0.0, cells_z as f32 * spacing) * 0.5;
        Self::build_displaced(cells_x, cells_z, |x, z| {
            offset + Vec3::new(x as f32 * spacing, 0.0, z as f32 * spacing)
        })
    }

    /// Same topology as [`Grid::build`], but the position of the vertex at
    /// grid coordinates `(x, z)` is given by `position`. Useful to bend or
    /// fold the plane.
    pub fn build_displaced(
        cells_x: u32,
        cells_z: u32,
        position: impl Fn(u32, u32) -> Vec3,
    ) -> Result<HalfEdgeMesh> {
        if cells_x == 0 || cells_z == 0 {
            bail!("A grid needs at least one cell in each direction");
        }
        let row = cells_x + 1;
        let vertices = (0..=cells_z)
            .flat_map(|z| (0..=cells_x).map(move |x| (x, z)))
            .map(|(x, z)| position(x, z))
            .collect_vec();

        let mut polygons = Vec::<[u32; 4]>::new();
        for z in 0..cells_z {
            for x in 0..cells_x {
                let i0 = z * row + x;
                let i1 = (z + 1) * row + x;
                let i2 = (z + 1) * row + x + 1;
                let i3 = z * row + x + 1;
                polygons.push([i0, i1, i2, i3]);
            }
        }

        HalfEdgeMesh::build_from_polygons(&vertices, &polygons).context("Grid construction failed")
    }
}

pub struct UVSphere;
impl UVSphere {
    pub fn build(center: Vec3, segments: u32, rings: u32, radius: f32) -> Result<HalfEdgeMesh> {
        if segments < 3 || rings < 2 {
            bail!("A sphere needs at least 3 segments and 2 rings");
        }
        let mut vertices = Vec::<Vec3>::new();
        let mut polygons = Vec::<SVec<u32>>::new();

        let top_vertex = 0;
        vertices.push(center + Vec3::Y * radius);

        for i in 0..rings - 1 {
            let phi = PI * (i + 1) as f32 / rings as f32;
            for j in 0..segments {
                let theta = 2.0 * PI * j as f32 / segments as f32;
                let x = phi.sin() * theta.cos() * radius;
                let y = phi.cos() * radius;
                let z = phi.sin() * theta.sin() * radius;
                vertices.push(center + Vec3::new(x, y, z));
            }
        }

        let bottom_vertex = vertices.len() as u32;
        vertices.push(center - Vec3::Y * radius);

        // Top triangles
        for i in 0..segments {
            let i0 = i + 1;
            let i1 = (i + 1) % segments + 1;
            polygons.push(smallvec::smallvec![top_vertex, i1, i0]);
        }
        // Bottom triangles
        for i in 0..segments {
            let i0 = i + segments * (rings - 2) + 1;
            let i1 = (i + 1) % segments + segments * (rings - 2) + 1;
            polygons.push(smallvec::smallvec![bottom_vertex, i0, i1]);
        }
        // Middle quads
        for j in 0..rings - 2 {
            let j0 = j * segments + 1;
            let j1 = (j + 1) * segments + 1;
            for i in 0..segments {
                let i0 = j0 + i;
                let i1 = j0 + (i + 1) % segments;
                let i2 = j1 + (i + 1) % segments;
                let i3 = j1 + i;
                polygons.push(smallvec::smallvec![i0, i1, i2, i3]);
            }
        }

        HalfEdgeMesh::build_from_polygons(&vertices, &polygons)
            .context("Sphere construction failed")
    }
}
