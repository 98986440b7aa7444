// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use smallvec::SmallVec;

/// Most polygons have four or fewer sides, so per-face lists rarely spill.
pub type SVec<T> = SmallVec<[T; 4]>;

pub trait IteratorUtils: Iterator {
    fn collect_svec(self) -> SVec<Self::Item>
    where
        Self: Sized,
    {
        self.collect()
    }
}

impl<T: ?Sized> IteratorUtils for T where T: Iterator {}

pub trait SliceUtils<T> {
    /// Same as .iter().copied(), but doesn't trigger rustfmt line breaks
    fn iter_cpy(&self) -> std::iter::Copied<std::slice::Iter<'_, T>>;
}

impl<T: Copy> SliceUtils<T> for [T] {
    fn iter_cpy(&self) -> std::iter::Copied<std::slice::Iter<'_, T>> {
        self.iter().copied()
    }
}

pub trait SVecUtils<T> {
    /// Pushes `value` unless an equal element is already present. Returns
    /// whether the value was inserted. Linear time, meant for short lists.
    fn push_unique(&mut self, value: T) -> bool;
}

impl<T: PartialEq> SVecUtils<T> for SVec<T> {
    fn push_unique(&mut self, value: T) -> bool {
        if self.contains(&value) {
            false
        } else {
            self.push(value);
            true
        }
    }
}

#[test]
pub fn test() {
    let mut v: SVec<u32> = [3, 1, 2].iter_cpy().collect_svec();
    assert!(!v.push_unique(1));
    assert!(v.push_unique(7));
    assert_eq!(v.as_slice(), &[3, 1, 2, 7]);
}
