// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use once_cell::sync::Lazy;

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shape {
    Box,
    Quad,
    Grid,
    Sphere,
}

/// Grows the selected faces of a primitive shape into regions of similar
/// orientation, and prints the resulting selection.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// The mesh to run on
    #[arg(long, value_enum, default_value_t = Shape::Grid)]
    pub shape: Shape,

    /// Cells per side for the grid. The sphere uses 4x this many segments and
    /// 2x this many rings.
    #[arg(long, default_value_t = 4)]
    pub grid_size: u32,

    /// The initially selected faces, e.g. `0, 3..5`
    #[arg(long, default_value = "0")]
    pub seeds: String,

    /// Max angle between adjacent faces, in radians
    #[arg(long, allow_negative_numbers = true)]
    pub angle_limit: Option<f32>,

    /// Max angle between a face and its region's average, in radians
    #[arg(long, allow_negative_numbers = true)]
    pub group_angle_limit: Option<f32>,

    /// Reads both limits from a `.ron` file. Explicit limits take precedence.
    #[arg(long)]
    pub settings: Option<PathBuf>,

    /// Runs the operator as if the mesh was not in edit mode
    #[arg(long)]
    pub object_mode: bool,
}

/// CLI args are stored in a lazy static variable so they're accessible from
/// everywhere. Arguments are parsed on first access.
pub static CLI_ARGS: Lazy<Args> = Lazy::new(Args::parse);

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    pub fn test_defaults() {
        let args = Args::try_parse_from(["normal_select"]).unwrap();
        assert_eq!(args.shape, Shape::Grid);
        assert_eq!(args.grid_size, 4);
        assert_eq!(args.seeds, "0");
        assert_eq!(args.angle_limit, None);
        assert!(!args.object_mode);
    }

    #[test]
    pub fn test_flags() {
        let args = Args::try_parse_from([
            "normal_select",
            "--shape",
            "sphere",
            "--seeds",
            "0..4, 9",
            "--angle-limit",
            "-0.5",
            "--group-angle-limit",
            "1.2",
            "--object-mode",
        ])
        .unwrap();
        assert_eq!(args.shape, Shape::Sphere);
        assert_eq!(args.seeds, "0..4, 9");
        assert_eq!(args.angle_limit, Some(-0.5));
        assert_eq!(args.group_angle_limit, Some(1.2));
        assert!(args.object_mode);

        assert!(Args::try_parse_from(["normal_select", "--shape", "torus"]).is_err());
    }
}
