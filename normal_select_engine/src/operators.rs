// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::Path;

use crate::mesh::region_growing::select_regions;
use crate::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditMode {
    Object,
    Edit,
}

/// The mesh being edited, as seen by operators.
#[derive(Debug)]
pub struct EditContext {
    pub mode: EditMode,
    pub mesh: HalfEdgeMesh,
    revision: u64,
}

impl EditContext {
    pub fn new(mesh: HalfEdgeMesh, mode: EditMode) -> Self {
        Self {
            mode,
            mesh,
            revision: 0,
        }
    }

    /// Bumped every time an operator asks the host to refresh the mesh.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn request_update(&mut self) {
        self.revision += 1;
    }
}

/// Reasons for an operator to do nothing. These are reported to the user,
/// they are not failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum OperatorError {
    #[error("Only works in Edit Mode")]
    NotInEditMode,
    #[error("No faces selected")]
    NoFacesSelected,
}

impl From<RegionError> for OperatorError {
    fn from(err: RegionError) -> Self {
        match err {
            RegionError::NoSelection => OperatorError::NoFacesSelected,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorStatus {
    Finished { regions: usize },
    Cancelled(OperatorError),
}

/// Extends the current face selection to the connected faces with a similar
/// orientation. See [`crate::mesh::region_growing`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SelectConnectedByNormals {
    pub settings: RegionGrowSettings,
}

impl SelectConnectedByNormals {
    pub const LABEL: &'static str = "Select Connected Faces by Normals";
    pub const ID: &'static str = "select.connected_faces_by_normals";

    pub fn new(settings: RegionGrowSettings) -> Self {
        Self { settings }
    }

    /// Reads the settings from a RON string, e.g. `(angle_limit: 0.5)`.
    /// Missing fields take their default value.
    pub fn from_ron_str(ron_str: &str) -> Result<Self> {
        let settings: RegionGrowSettings =
            ron::from_str(ron_str).context("Could not parse region growing settings")?;
        Ok(Self::new(settings))
    }

    /// Same as [`Self::from_ron_str`], reading from a file.
    pub fn load_settings(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let reader = std::io::BufReader::new(
            std::fs::File::open(path)
                .with_context(|| format!("Could not open settings file {}", path.display()))?,
        );
        let settings: RegionGrowSettings = ron::de::from_reader(reader)
            .with_context(|| format!("Could not parse settings file {}", path.display()))?;
        Ok(Self::new(settings))
    }

    /// Grows a region from every selected face and selects the result. Does
    /// nothing outside of edit mode, or when no face is selected.
    ///
    /// Errors are only returned when the mesh itself is malformed.
    pub fn execute(&self, ctx: &mut EditContext) -> Result<OperatorStatus> {
        if ctx.mode != EditMode::Edit {
            return Ok(self.cancel(OperatorError::NotInEditMode));
        }

        let mut graph = FaceAdjacency::from_halfedge(&ctx.mesh)?;
        let seeds = graph.selected_faces();
        let regions = match select_regions(&mut graph, &seeds, &self.settings.clamped()) {
            Ok(regions) => regions,
            Err(err) => return Ok(self.cancel(err.into())),
        };

        graph.write_selection(&mut ctx.mesh)?;
        ctx.request_update();

        Ok(OperatorStatus::Finished {
            regions: regions.len(),
        })
    }

    fn cancel(&self, err: OperatorError) -> OperatorStatus {
        log::error!("{}: {err}", Self::LABEL);
        OperatorStatus::Cancelled(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mesh::halfedge::{edit_ops, primitives, selection::SelectionExpression};

    fn box_context(seeds: &str, mode: EditMode) -> EditContext {
        let mut mesh = primitives::Box::build(Vec3::ZERO, Vec3::ONE).unwrap();
        edit_ops::set_flat_normals(&mut mesh).unwrap();
        edit_ops::select_faces(&mut mesh, &SelectionExpression::parse(seeds).unwrap()).unwrap();
        EditContext::new(mesh, mode)
    }

    #[test]
    pub fn test_requires_edit_mode() {
        let mut ctx = box_context("0", EditMode::Object);
        let status = SelectConnectedByNormals::default().execute(&mut ctx).unwrap();
        assert_eq!(status, OperatorStatus::Cancelled(OperatorError::NotInEditMode));
        assert_eq!(ctx.revision(), 0);
    }

    #[test]
    pub fn test_requires_selection() {
        let mut ctx = box_context("", EditMode::Edit);
        let status = SelectConnectedByNormals::default().execute(&mut ctx).unwrap();
        assert_eq!(status, OperatorStatus::Cancelled(OperatorError::NoFacesSelected));
        assert_eq!(ctx.revision(), 0);
        assert!(edit_ops::selected_face_ids(&ctx.mesh).unwrap().is_empty());
    }

    #[test]
    pub fn test_box_faces_stay_apart() {
        // Adjacent box faces are 90 degrees apart
        let mut ctx = box_context("0, 1", EditMode::Edit);
        let status = SelectConnectedByNormals::default().execute(&mut ctx).unwrap();
        assert_eq!(status, OperatorStatus::Finished { regions: 2 });
        assert_eq!(ctx.revision(), 1);
        assert_eq!(edit_ops::selected_face_indices(&ctx.mesh).unwrap(), vec![0, 1]);
    }

    #[test]
    pub fn test_wide_limits_select_whole_box() {
        let mut ctx = box_context("3", EditMode::Edit);
        let op = SelectConnectedByNormals::new(RegionGrowSettings::new(2.0, 2.0));
        let status = op.execute(&mut ctx).unwrap();
        assert_eq!(status, OperatorStatus::Finished { regions: 1 });
        assert_eq!(
            edit_ops::selected_face_indices(&ctx.mesh).unwrap(),
            (0..6).collect_vec()
        );
    }

    #[test]
    pub fn test_negative_limits_are_clamped() {
        let mut ctx = box_context("2", EditMode::Edit);
        let op = SelectConnectedByNormals::new(RegionGrowSettings::new(-1.0, -1.0));
        let status = op.execute(&mut ctx).unwrap();
        assert_eq!(status, OperatorStatus::Finished { regions: 1 });
        assert_eq!(edit_ops::selected_face_indices(&ctx.mesh).unwrap(), vec![2]);
    }

    #[test]
    pub fn test_settings_from_ron() {
        let op = SelectConnectedByNormals::from_ron_str("(angle_limit: 0.5)").unwrap();
        assert_eq!(op.settings.angle_limit, 0.5);
        assert_eq!(op.settings.group_angle_limit, 0.349066);

        let op = SelectConnectedByNormals::from_ron_str("()").unwrap();
        assert_eq!(op, SelectConnectedByNormals::default());

        assert!(SelectConnectedByNormals::from_ron_str("(angle_limit: \"wide\")").is_err());
        assert!(SelectConnectedByNormals::load_settings("/nonexistent/settings.ron").is_err());
    }

    #[test]
    pub fn test_load_settings_file() {
        let path = std::env::temp_dir().join(format!(
            "normal_select_test_load_settings_file_{}.ron",
            std::process::id()
        ));
        std::fs::write(&path, "(angle_limit: 0.1, group_angle_limit: 1.5)").unwrap();
        let op = SelectConnectedByNormals::load_settings(&path).unwrap();
        assert_eq!(op.settings, RegionGrowSettings::new(0.1, 1.5));
        std::fs::remove_file(&path).unwrap();
    }
}
