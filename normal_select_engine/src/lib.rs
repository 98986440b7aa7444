// Copyright (C) 2022 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/// Some useful re-exports
pub mod prelude;

/// The halfedge graph data structure, the face graph abstraction and the
/// region growing algorithm.
pub mod mesh;

/// Host-side operators that run on a mesh being edited.
pub mod operators;

/// Conditional `Send + Sync` indirection types.
pub mod sync;
