// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use anyhow::Result;
use glam::{Vec2, Vec3};

use normal_select_engine::mesh::halfedge::{
    edit_ops, primitives, selection::SelectionExpression, HalfEdgeMesh,
};
use normal_select_engine::operators::{
    EditContext, EditMode, OperatorStatus, SelectConnectedByNormals,
};

/// Command line arguments
mod cli_args;
use cli_args::{Args, Shape, CLI_ARGS};

#[profiling::function]
fn build_mesh(args: &Args) -> Result<HalfEdgeMesh> {
    let n = args.grid_size;
    match args.shape {
        Shape::Box => primitives::Box::build(Vec3::ZERO, Vec3::ONE),
        Shape::Quad => primitives::Quad::build(Vec3::ZERO, Vec3::Y, Vec3::X, Vec2::ONE),
        Shape::Grid => primitives::Grid::build(Vec3::ZERO, n, n, 1.0),
        Shape::Sphere => primitives::UVSphere::build(Vec3::ZERO, 4 * n, 2 * n, 1.0),
    }
}

/// Settings come from the settings file, if any. Explicit flags win.
fn operator(args: &Args) -> Result<SelectConnectedByNormals> {
    let mut op = match &args.settings {
        Some(path) => SelectConnectedByNormals::load_settings(path)?,
        None => SelectConnectedByNormals::default(),
    };
    if let Some(angle_limit) = args.angle_limit {
        op.settings.angle_limit = angle_limit;
    }
    if let Some(group_angle_limit) = args.group_angle_limit {
        op.settings.group_angle_limit = group_angle_limit;
    }
    Ok(op)
}

fn main() -> Result<()> {
    // Setup logging
    env_logger::init();

    let args = &*CLI_ARGS;
    let op = operator(args)?;

    let mut mesh = build_mesh(args)?;
    edit_ops::set_flat_normals(&mut mesh)?;
    edit_ops::select_faces(&mut mesh, &SelectionExpression::parse(&args.seeds)?)?;

    let mode = if args.object_mode {
        EditMode::Object
    } else {
        EditMode::Edit
    };
    let mut ctx = EditContext::new(mesh, mode);

    log::info!(
        "{} ({}) with {:?}",
        SelectConnectedByNormals::LABEL,
        SelectConnectedByNormals::ID,
        op.settings
    );
    match op.execute(&mut ctx)? {
        OperatorStatus::Finished { regions } => println!("Finished: {regions} region(s)"),
        OperatorStatus::Cancelled(err) => println!("Cancelled: {err}"),
    }

    let selected = edit_ops::selected_face_indices(&ctx.mesh)?;
    println!(
        "Selected {} of {} faces: {}",
        selected.len(),
        ctx.mesh.read_connectivity().num_faces(),
        SelectionExpression::from_indices(selected).unparse()
    );

    Ok(())
}
