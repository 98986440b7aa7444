// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/// Vector math helpers shared by the engine and the host.
pub mod math;

/// Small collection and iterator utilities.
pub mod utils;
