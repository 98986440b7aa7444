// Copyright (C) 2022 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::ops::Index;

use slotmap::{SecondaryMap, SlotMap};

/// Maps the sparse slotmap keys of a mesh element to dense indices in the
/// `0..len` range, following the slotmap's iteration order.
///
/// The indices are stable for as long as no element of that kind is inserted
/// or removed.
#[derive(Debug, Clone)]
pub struct MeshMapping<K: slotmap::Key>(pub SecondaryMap<K, u32>);

impl<K: slotmap::Key> Index<K> for MeshMapping<K> {
    type Output = u32;
    fn index(&self, index: K) -> &Self::Output {
        &self.0[index]
    }
}

impl<K: slotmap::Key> MeshMapping<K> {
    pub fn new<V>(arena: &SlotMap<K, V>) -> Self {
        let mut mapping = SecondaryMap::with_capacity(arena.capacity());
        for (idx, (id, _)) in arena.iter().enumerate() {
            mapping.insert(id, idx as u32);
        }
        Self(mapping)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn map_seq(&self, seq: &[K]) -> Vec<u32> {
        seq.iter().map(|x| self[*x]).collect()
    }
}
