// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Grows regions of connected faces with a similar orientation, starting
//! from a set of seed faces.
//!
//! A neighbor `nb` of a face `curr` already in the region is accepted when:
//! - The angle between the normals of `curr` and `nb` is below
//!   [`RegionGrowSettings::angle_limit`], and
//! - The angle between the normal of `curr` and the average normal of the
//!   region so far is below [`RegionGrowSettings::group_angle_limit`].
//!
//! Note the second test measures `curr`, not `nb`, against the region.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::prelude::*;

/// 20 degrees, in radians.
pub const DEFAULT_ANGLE_LIMIT: f32 = 0.349066;

/// The two thresholds of the acceptance test. Both are angles in radians.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionGrowSettings {
    /// Max angle between the normals of two adjacent faces.
    pub angle_limit: f32,
    /// Max angle between a face's normal and the region's average normal.
    pub group_angle_limit: f32,
}

impl Default for RegionGrowSettings {
    fn default() -> Self {
        Self {
            angle_limit: DEFAULT_ANGLE_LIMIT,
            group_angle_limit: DEFAULT_ANGLE_LIMIT,
        }
    }
}

impl RegionGrowSettings {
    pub fn new(angle_limit: f32, group_angle_limit: f32) -> Self {
        Self {
            angle_limit,
            group_angle_limit,
        }
    }

    /// Returns a copy where negative or NaN limits are raised to zero. There
    /// is no upper bound: limits of π or more make the corresponding test
    /// accept everything.
    pub fn clamped(self) -> Self {
        // NOTE: f32::max returns the non-NaN operand
        Self {
            angle_limit: self.angle_limit.max(0.0),
            group_angle_limit: self.group_angle_limit.max(0.0),
        }
    }

    fn accepts(&self, curr: Vec3, nb: Vec3, group_average: Vec3) -> bool {
        let below = |a: Vec3, b: Vec3, limit: f32| {
            try_angle_between(a, b).map_or(false, |angle| angle < limit)
        };
        below(curr, nb, self.angle_limit) && below(curr, group_average, self.group_angle_limit)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RegionError {
    #[error("No faces selected")]
    NoSelection,
}

/// Faces already assigned to a region. A claimed face is never claimed
/// again, so it can't end up in two regions nor seed a second one.
#[derive(Debug, Clone)]
pub struct ClaimedSet {
    claimed: Vec<bool>,
}

impl ClaimedSet {
    pub fn new(num_faces: usize) -> Self {
        Self {
            claimed: vec![false; num_faces],
        }
    }

    pub fn is_claimed(&self, face: FaceIndex) -> bool {
        self.claimed[face as usize]
    }

    /// Marks `face` as claimed. Returns false if it already was.
    pub fn claim(&mut self, face: FaceIndex) -> bool {
        !std::mem::replace(&mut self.claimed[face as usize], true)
    }

    pub fn num_claimed(&self) -> usize {
        self.claimed.iter().filter(|c| **c).count()
    }
}

/// A connected set of faces, in the order they were accepted. The seed always
/// comes first.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    faces: Vec<FaceIndex>,
    normal_sum: Vec3,
}

impl Region {
    fn new(seed: FaceIndex, normal: Vec3) -> Self {
        Self {
            faces: vec![seed],
            normal_sum: normal,
        }
    }

    fn push(&mut self, face: FaceIndex, normal: Vec3) {
        self.faces.push(face);
        self.normal_sum += normal;
    }

    pub fn seed(&self) -> FaceIndex {
        self.faces[0]
    }

    pub fn faces(&self) -> &[FaceIndex] {
        &self.faces
    }

    pub fn len(&self) -> usize {
        self.faces.len()
    }

    /// Regions always contain their seed. Provided for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Linear search. Use [`Region::faces`] to build a set for repeated
    /// queries.
    pub fn contains(&self, face: FaceIndex) -> bool {
        self.faces.contains(&face)
    }

    /// The sum of member normals divided by the member count. Not normalized.
    pub fn average_normal(&self) -> Vec3 {
        self.normal_sum / self.faces.len() as f32
    }
}

/// Grows a region from `seed` with a breadth-first traversal over the face
/// graph. The seed is claimed on entry, along with every accepted face.
/// Faces that were already claimed are never considered.
///
/// Each face is expanded at most once, so the traversal always terminates.
pub fn grow_region<G: FaceGraph + ?Sized>(
    graph: &G,
    seed: FaceIndex,
    claimed: &mut ClaimedSet,
    settings: &RegionGrowSettings,
) -> Region {
    claimed.claim(seed);
    let mut region = Region::new(seed, graph.face_normal(seed));
    let mut queue = VecDeque::from([seed]);

    while let Some(curr) = queue.pop_front() {
        let curr_normal = graph.face_normal(curr);
        for nb in graph.connected_faces(curr) {
            if claimed.is_claimed(nb) {
                continue;
            }
            let nb_normal = graph.face_normal(nb);
            if settings.accepts(curr_normal, nb_normal, region.average_normal()) {
                claimed.claim(nb);
                region.push(nb, nb_normal);
                queue.push_back(nb);
            }
        }
    }

    region
}

/// Grows one region for every seed, in order, skipping seeds that an earlier
/// region already swallowed. Every face of every region is then selected in
/// `graph`. Faces outside the regions keep their selection state.
///
/// Fails with [`RegionError::NoSelection`] when `seeds` is empty, without
/// touching the graph.
///
/// Panics if a seed is not a valid face index of `graph`.
#[profiling::function]
pub fn select_regions<G: FaceGraph + ?Sized>(
    graph: &mut G,
    seeds: &[FaceIndex],
    settings: &RegionGrowSettings,
) -> Result<Vec<Region>, RegionError> {
    if seeds.is_empty() {
        return Err(RegionError::NoSelection);
    }

    let mut claimed = ClaimedSet::new(graph.num_faces());
    let mut regions = vec![];
    for seed in seeds.iter_cpy() {
        if claimed.is_claimed(seed) {
            log::trace!("Seed face {seed} already belongs to a region");
            continue;
        }
        let region = grow_region(&*graph, seed, &mut claimed, settings);
        log::debug!(
            "Grew region from seed face {seed} with {} faces",
            region.len()
        );
        regions.push(region);
    }

    for face in regions.iter().flat_map(|r| r.faces().iter_cpy()) {
        graph.select_face(face);
    }

    Ok(regions)
}

#[cfg(test)]
mod test {
    use std::cell::Cell;
    use std::f32::consts::PI;

    use glam::Quat;

    use super::*;
    use crate::mesh::halfedge::primitives::{Grid, UVSphere};

    /// A strip of faces in a row, face `i` adjacent to `i - 1` and `i + 1`.
    fn strip(normals: &[Vec3]) -> FaceAdjacency {
        let polygons = (0..normals.len() as u32)
            .map(|i| [2 * i, 2 * i + 1, 2 * i + 3, 2 * i + 2])
            .collect_vec();
        FaceAdjacency::from_polygons(normals, &polygons).unwrap()
    }

    fn tilted(degrees: f32) -> Vec3 {
        Quat::from_rotation_x(deg_to_rad(degrees)) * Vec3::Y
    }

    /// Counts how many times each face is expanded.
    struct CountingGraph {
        inner: FaceAdjacency,
        expansions: Vec<Cell<u32>>,
    }

    impl FaceGraph for CountingGraph {
        fn num_faces(&self) -> usize {
            self.inner.num_faces()
        }
        fn face_normal(&self, face: FaceIndex) -> Vec3 {
            self.inner.face_normal(face)
        }
        fn connected_faces(&self, face: FaceIndex) -> SVec<FaceIndex> {
            let count = &self.expansions[face as usize];
            count.set(count.get() + 1);
            self.inner.connected_faces(face)
        }
        fn is_selected(&self, face: FaceIndex) -> bool {
            self.inner.is_selected(face)
        }
        fn select_face(&mut self, face: FaceIndex) {
            self.inner.select_face(face)
        }
    }

    #[test]
    pub fn test_settings() {
        let settings = RegionGrowSettings::default();
        assert_eq!(settings.angle_limit, 0.349066);
        assert_eq!(settings.group_angle_limit, 0.349066);

        let clamped = RegionGrowSettings::new(-1.0, f32::NAN).clamped();
        assert_eq!(clamped, RegionGrowSettings::new(0.0, 0.0));
        assert_eq!(RegionGrowSettings::new(7.0, 0.1).clamped(), RegionGrowSettings::new(7.0, 0.1));
    }

    #[test]
    pub fn test_claimed_set() {
        let mut claimed = ClaimedSet::new(3);
        assert!(!claimed.is_claimed(1));
        assert!(claimed.claim(1));
        assert!(!claimed.claim(1));
        assert!(claimed.is_claimed(1));
        assert_eq!(claimed.num_claimed(), 1);
    }

    #[test]
    pub fn test_flat_grid_selects_everything() {
        let mut graph =
            FaceAdjacency::from_halfedge(&Grid::build(Vec3::ZERO, 4, 4, 1.0).unwrap()).unwrap();
        let regions =
            select_regions(&mut graph, &[0], &RegionGrowSettings::new(1e-3, 1e-3)).unwrap();
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].seed(), 0);
        assert_eq!(regions[0].len(), 16);
        assert_eq!(graph.selected_faces(), (0..16).collect_vec());
        // BFS order: the seed's direct neighbors come right after it
        assert_eq!(regions[0].faces()[1..3].iter().sorted().collect_vec(), vec![&1, &4]);
    }

    #[test]
    pub fn test_zero_thresholds_keep_only_the_seed() {
        let mut graph = strip(&[Vec3::Y, Vec3::Y, Vec3::Y]);
        let regions = select_regions(&mut graph, &[1], &RegionGrowSettings::new(0.0, 0.0)).unwrap();
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].faces(), &[1]);
        assert_eq!(graph.selected_faces(), vec![1]);
    }

    #[test]
    pub fn test_angle_limit_stops_at_crease() {
        // 0 1 2 are flat, 3 4 are bent 30 degrees
        let normals = [Vec3::Y, Vec3::Y, Vec3::Y, tilted(30.0), tilted(30.0)];
        let mut graph = strip(&normals);
        let regions = select_regions(&mut graph, &[0], &RegionGrowSettings::default()).unwrap();
        assert_eq!(regions[0].faces(), &[0, 1, 2]);

        let mut graph = strip(&normals);
        let settings = RegionGrowSettings::new(deg_to_rad(45.0), PI);
        let regions = select_regions(&mut graph, &[0], &settings).unwrap();
        assert_eq!(regions[0].faces(), &[0, 1, 2, 3, 4]);
    }

    #[test]
    pub fn test_group_angle_measures_current_face() {
        // Every step turns 15 degrees, so the angle limit alone never stops
        // the traversal.
        let normals = (0..6).map(|i| tilted(15.0 * i as f32)).collect_vec();
        let settings = RegionGrowSettings::new(deg_to_rad(20.0), deg_to_rad(20.0));
        let mut graph = strip(&normals);
        let regions = select_regions(&mut graph, &[0], &settings).unwrap();

        // Expanding 0: avg = n0, group diff 0 -> accept 1.
        // Expanding 1: avg at 7.5 deg, curr at 15 -> 7.5 < 20, accept 2.
        // Expanding 2: avg at 15 deg, curr at 30 -> 15 < 20, accept 3.
        // Expanding 3: avg at 22.5 deg, curr at 45 -> 22.5 >= 20, reject 4.
        // A test against the candidate's normal would have rejected 3.
        assert_eq!(regions[0].faces(), &[0, 1, 2, 3]);
        let average = regions[0].average_normal();
        assert!(angle_between(average, tilted(22.5)) < 1e-3);
    }

    #[test]
    pub fn test_disconnected_seeds() {
        let polygons = [[0u32, 1, 2, 3], [1, 4, 5, 2], [10, 11, 12, 13], [11, 14, 15, 12]];
        let mut graph = FaceAdjacency::from_polygons(&[Vec3::Z; 4], &polygons).unwrap();
        let regions = select_regions(&mut graph, &[0, 3], &RegionGrowSettings::default()).unwrap();
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].faces(), &[0, 1]);
        assert_eq!(regions[1].faces(), &[3, 2]);
    }

    #[test]
    pub fn test_overlapping_seeds_make_one_region() {
        let mut graph = strip(&[Vec3::Y; 4]);
        let regions =
            select_regions(&mut graph, &[1, 2, 3], &RegionGrowSettings::default()).unwrap();
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].seed(), 1);
        assert_eq!(regions[0].faces(), &[1, 0, 2, 3]);
    }

    #[test]
    pub fn test_no_seeds() {
        let mut graph = strip(&[Vec3::Y; 2]);
        graph.select_face(1);
        let err = select_regions(&mut graph, &[], &RegionGrowSettings::default()).unwrap_err();
        assert_eq!(err, RegionError::NoSelection);
        assert_eq!(err.to_string(), "No faces selected");
        assert_eq!(graph.selected_faces(), vec![1]);
    }

    #[test]
    pub fn test_selection_is_additive() {
        let normals = [Vec3::Y, Vec3::Y, Vec3::X, Vec3::X];
        let mut graph = strip(&normals);
        graph.select_face(3);
        let regions = select_regions(&mut graph, &[0], &RegionGrowSettings::default()).unwrap();
        assert_eq!(regions[0].faces(), &[0, 1]);
        assert_eq!(graph.selected_faces(), vec![0, 1, 3]);
    }

    #[test]
    pub fn test_degenerate_normals_are_never_accepted() {
        let mut graph = strip(&[Vec3::Y, Vec3::ZERO, Vec3::Y]);
        let regions = select_regions(&mut graph, &[0, 1], &RegionGrowSettings::new(PI, PI)).unwrap();
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].faces(), &[0]);
        // A degenerate seed has no defined average, so it can't grow either
        assert_eq!(regions[1].faces(), &[1]);
    }

    #[test]
    pub fn test_each_face_expanded_once() {
        let mesh = UVSphere::build(Vec3::ZERO, 8, 6, 1.0).unwrap();
        let inner = FaceAdjacency::from_halfedge(&mesh).unwrap();
        let num_faces = inner.num_faces();
        let mut graph = CountingGraph {
            inner,
            expansions: (0..num_faces).map(|_| Cell::new(0)).collect(),
        };
        let seeds = (0..num_faces as FaceIndex).collect_vec();
        let regions = select_regions(&mut graph, &seeds, &RegionGrowSettings::new(PI, PI)).unwrap();

        assert!(graph.expansions.iter().all(|c| c.get() == 1));
        let total: usize = regions.iter().map(|r| r.len()).sum();
        assert_eq!(total, num_faces);
    }

    #[test]
    pub fn test_regions_are_disjoint() {
        let mesh = UVSphere::build(Vec3::ZERO, 12, 8, 1.0).unwrap();
        let mut graph = FaceAdjacency::from_halfedge(&mesh).unwrap();
        let seeds = (0..graph.num_faces() as FaceIndex).step_by(5).collect_vec();
        let regions = select_regions(&mut graph, &seeds, &RegionGrowSettings::default()).unwrap();

        let mut seen = HashSet::new();
        for region in &regions {
            assert!(seeds.contains(&region.seed()));
            for face in region.faces() {
                assert!(seen.insert(*face), "face {face} in two regions");
            }
        }
        assert_eq!(graph.selected_faces(), seen.into_iter().sorted().collect_vec());
    }

    #[test]
    pub fn test_larger_angle_limit_never_shrinks() {
        let mesh = Grid::build_displaced(6, 6, |x, z| {
            Vec3::new(x as f32, (x as f32 * 0.7).sin() + (z as f32 * 0.4).cos(), z as f32)
        })
        .unwrap();
        let base = FaceAdjacency::from_halfedge(&mesh).unwrap();

        let mut previous: Option<HashSet<FaceIndex>> = None;
        for limit in [0.0, 0.1, 0.3, 0.6, 1.0, 2.0, PI + 0.1] {
            let mut graph = base.clone();
            let regions =
                select_regions(&mut graph, &[0, 20], &RegionGrowSettings::new(limit, PI + 0.1))
                    .unwrap();
            let faces: HashSet<FaceIndex> = regions
                .iter()
                .flat_map(|r| r.faces().iter_cpy())
                .collect();
            if let Some(previous) = &previous {
                assert!(previous.is_subset(&faces), "shrank at limit {limit}");
            }
            previous = Some(faces);
        }
        assert_eq!(previous.map(|p| p.len()), Some(36));
    }

    #[test]
    pub fn test_larger_group_limit_never_shrinks() {
        let mesh = Grid::build_displaced(6, 6, |x, z| {
            Vec3::new(x as f32, (x as f32 * 0.7).sin() + (z as f32 * 0.4).cos(), z as f32)
        })
        .unwrap();
        let base = FaceAdjacency::from_halfedge(&mesh).unwrap();

        for angle_limit in [0.3, 0.6, 1.0] {
            let mut previous: Option<HashSet<FaceIndex>> = None;
            for group_limit in [0.0, 0.05, 0.1, 0.2, 0.3, 0.45, 0.6, 1.0, 2.0, PI + 0.1] {
                let mut graph = base.clone();
                let settings = RegionGrowSettings::new(angle_limit, group_limit);
                let regions = select_regions(&mut graph, &[0, 20], &settings).unwrap();
                let faces: HashSet<FaceIndex> = regions
                    .iter()
                    .flat_map(|r| r.faces().iter_cpy())
                    .collect();
                if let Some(previous) = &previous {
                    assert!(
                        previous.is_subset(&faces),
                        "shrank at group limit {group_limit} (angle limit {angle_limit})"
                    );
                }
                previous = Some(faces);
            }
        }
    }
}
