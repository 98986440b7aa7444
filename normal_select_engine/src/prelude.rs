pub use anyhow::{anyhow, bail, Context, Result};

pub use glam::{Vec2, Vec3};

pub use itertools::Itertools;
pub use std::collections::{HashMap, HashSet};

pub use crate::mesh::halfedge::*;
pub use crate::mesh::halfedge;

pub use crate::mesh::face_graph::{FaceAdjacency, FaceGraph, FaceIndex};
pub use crate::mesh::region_growing::{Region, RegionError, RegionGrowSettings};

pub use normal_select_commons::math::*;
pub use normal_select_commons::utils::*;
