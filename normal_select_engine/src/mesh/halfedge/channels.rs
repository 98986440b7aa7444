// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::{any::Any, fmt::Debug, marker::PhantomData};

use crate::sync::{BorrowedRef, InteriorMutable, MaybeSync, MutableRef, RefCounted};
use glam::Vec3;

use super::*;

/// Name of the well-known face normals channel.
pub const FACE_NORMAL_CHANNEL: &str = "face_normal";
/// Name of the bool face channel holding the user's face selection.
pub const SELECTION_CHANNEL: &str = "selected";

/// The key of a channel is the type of element the channel is attaching data
/// to. It can be Vertices, HalfEdges or Faces, and the `ChannelKey` is the
/// corresponding id type.
pub trait ChannelKey: slotmap::Key + Default + Debug + Clone + Copy + Sized + MaybeSync + 'static {
    fn key_type() -> ChannelKeyType;
    fn name() -> &'static str;
}
macro_rules! impl_channel_key {
    ($t:ident) => {
        impl ChannelKey for $t {
            fn key_type() -> ChannelKeyType {
                ChannelKeyType::$t
            }
            fn name() -> &'static str {
                stringify!($t)
            }
        }
        impl MaybeSync for $t {}
    };
}
impl_channel_key!(VertexId);
impl_channel_key!(FaceId);

/// The value of a channel is the data that is associated to a specific key.
/// Values can be flags (bool) or vectors (Vec3).
pub trait ChannelValue: Default + Debug + Clone + Copy + Sized + MaybeSync + 'static {
    fn value_type() -> ChannelValueType;
    fn name() -> &'static str;
}
macro_rules! impl_channel_value {
    ($t:ident) => {
        impl ChannelValue for $t {
            fn value_type() -> ChannelValueType {
                ChannelValueType::$t
            }
            fn name() -> &'static str {
                stringify!($t)
            }
        }
        impl MaybeSync for $t {}
    };
}
impl_channel_value!(Vec3);
impl_channel_value!(bool);

/// Runtime tag for the [`ChannelKey`] implementors. An ad-hoc replacement for
/// `TypeId` that can be matched on.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
#[rustfmt::skip]
pub enum ChannelKeyType { VertexId, FaceId }

/// Same as [`ChannelKeyType`], but for the [`ChannelValue`] trait instead.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
#[rustfmt::skip]
#[allow(non_camel_case_types)]
pub enum ChannelValueType { Vec3, bool }

/// A channel associates a value to every element of one kind in a mesh, like
/// the `position` of each vertex or the `selected` flag of each face.
///
/// A channel behaves as an infinite map: keys that were never written read
/// as the channel's default value, and writing to any live key never fails.
///
/// Using keys from a different mesh is a logic error. It is not UB but will
/// not behave as expected.
#[derive(Clone, Debug)]
pub struct Channel<K: ChannelKey, V: ChannelValue> {
    inner: slotmap::SecondaryMap<K, V>,
    default: V,
}

slotmap::new_key_type! {
    /// Id of a channel inside its [`ChannelGroup`]. Wrapped by the typed
    /// [`ChannelId`].
    pub struct RawChannelId;
}

/// A typed wrapper over a `RawChannelId`, so a channel can't be read back
/// with the wrong key or value types.
pub struct ChannelId<K: ChannelKey, V: ChannelValue> {
    raw: RawChannelId,
    _phantom: PhantomData<(K, V)>,
}
impl<K: ChannelKey, V: ChannelValue> ChannelId<K, V> {
    pub fn new(raw: RawChannelId) -> Self {
        Self {
            raw,
            _phantom: Default::default(),
        }
    }
}

/// All the channels of a mesh sharing the same key and value types, indexed
/// by name and by id.
///
/// Channels are stored behind shared ownership and interior mutability so
/// that several channels can be borrowed at the same time, e.g. reading
/// normals while writing the selection.
#[derive(Debug)]
pub struct ChannelGroup<K: ChannelKey, V: ChannelValue> {
    channel_names: bimap::BiMap<String, ChannelId<K, V>>,
    channels: SlotMap<RawChannelId, RefCounted<InteriorMutable<Channel<K, V>>>>,
}

impl<K: ChannelKey, V: ChannelValue> MaybeSync for ChannelGroup<K, V> {}

/// The attribute storage of a [`HalfEdgeMesh`]: one [`ChannelGroup`] for
/// each key and value type combination in use.
#[derive(Default, Debug, Clone)]
pub struct MeshChannels {
    channels: HashMap<(ChannelKeyType, ChannelValueType), Box<dyn DynChannelGroup>>,
}

/// Ids of the "well-known" channels of a mesh. Avoids string lookups for the
/// channels every algorithm touches.
#[derive(Debug, Clone)]
pub struct DefaultChannels {
    pub position: ChannelId<VertexId, Vec3>,
    pub face_normals: Option<ChannelId<FaceId, Vec3>>,
}

impl<K: ChannelKey, V: ChannelValue> std::ops::Index<K> for Channel<K, V> {
    type Output = V;

    fn index(&self, index: K) -> &Self::Output {
        // Will return the default value for never-accessed keys.
        self.inner.get(index).unwrap_or(&self.default)
    }
}
impl<K: ChannelKey, V: ChannelValue> std::ops::IndexMut<K> for Channel<K, V> {
    fn index_mut(&mut self, index: K) -> &mut Self::Output {
        self.inner
            .entry(index)
            // From the `entry` documentation in slotmap: May return None if the
            // key was removed from the originating slot map.
            .expect("Error indexing channel. Key was removed from the originating slotmap.")
            // Will insert the default value for never-accessed keys.
            .or_insert(self.default)
    }
}
impl<K: ChannelKey, V: ChannelValue> Channel<K, V> {
    /// Constructs a new channel without adding it to a mesh.
    pub fn new() -> Self {
        Self::new_with_default(V::default())
    }

    /// Constructs a new channel without adding it to a mesh. This allows
    /// setting the `default` value of this channel.
    pub fn new_with_default(default: V) -> Self {
        Self {
            inner: SecondaryMap::new(),
            default,
        }
    }

    /// Resets every key back to the default value
    pub fn clear(&mut self) {
        self.inner.clear();
    }
}

impl<K: ChannelKey, V: ChannelValue> ChannelGroup<K, V> {
    /// Creates a new channel with a given `name`. If the channel with `name`
    /// already exists in the group, this operation is ignored.
    pub fn ensure_channel(&mut self, name: &str) -> ChannelId<K, V> {
        match self.channel_names.get_by_left(name) {
            Some(id) => *id,
            None => {
                let ch_id = ChannelId::new(self.channels.insert(Default::default()));
                self.channel_names.insert(name.into(), ch_id);
                ch_id
            }
        }
    }

    /// Creates a new channel with a given `name`. If the channel with `name`
    /// already exists, returns an error.
    pub fn create_channel(&mut self, name: &str) -> Result<ChannelId<K, V>> {
        if self.channel_names.contains_left(name) {
            bail!("The channel named {name} already exists in mesh");
        } else {
            Ok(self.ensure_channel(name))
        }
    }

    /// Returns the channel id for a channel with given `name`, or `None` if it
    /// doesn't exist.
    pub fn channel_id(&self, name: &str) -> Option<ChannelId<K, V>> {
        self.channel_names.get_by_left(name).copied()
    }

    /// Accesses a channel immutably. Fails if that channel is currently
    /// borrowed mutably.
    pub fn read_channel(&self, ch_id: ChannelId<K, V>) -> Result<BorrowedRef<'_, Channel<K, V>>> {
        self.channels
            .get(ch_id.raw)
            .ok_or_else(|| anyhow!("Channel {ch_id:?} does not exist for this mesh"))?
            .try_borrow()
            .map_err(|err| anyhow!("Channel {ch_id:?} could not be borrowed: {err}"))
    }

    /// Accesses a channel mutably. Fails if that channel is currently
    /// borrowed.
    pub fn write_channel(&self, ch_id: ChannelId<K, V>) -> Result<MutableRef<'_, Channel<K, V>>> {
        self.channels
            .get(ch_id.raw)
            .ok_or_else(|| anyhow!("Channel {ch_id:?} does not exist for this mesh"))?
            .try_borrow_mut()
            .map_err(|err| anyhow!("Channel {ch_id:?} could not be borrowed: {err}"))
    }
}

/// The type-erased interface of a [`ChannelGroup`], so groups with different
/// type parameters can live in the same map.
pub trait DynChannelGroup: Any + Debug + dyn_clone::DynClone + MaybeSync {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    /// Returns the names of the channels present in this group
    fn channel_names(&self) -> Box<dyn Iterator<Item = &str> + '_>;
}

impl<K: ChannelKey, V: ChannelValue> Clone for ChannelGroup<K, V> {
    fn clone(&self) -> Self {
        // NOTE: Deep copy. A derived clone would share the Rcs between both
        // meshes. Cloning a mesh while one of its channels is mutably
        // borrowed panics.
        let mut channels = self.channels.clone();
        for (_, ch) in channels.iter_mut() {
            let contents: Channel<K, V> = ch.borrow().clone();
            *ch = RefCounted::new(InteriorMutable::new(contents));
        }
        Self {
            channel_names: self.channel_names.clone(),
            channels,
        }
    }
}

dyn_clone::clone_trait_object!(DynChannelGroup);

impl<K: ChannelKey, V: ChannelValue> DynChannelGroup for ChannelGroup<K, V> {
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
    fn channel_names(&self) -> Box<dyn Iterator<Item = &str> + '_> {
        Box::new(self.channel_names.iter().map(|(l, _)| l.as_str()))
    }
}

impl MeshChannels {
    fn key_of<K: ChannelKey, V: ChannelValue>() -> (ChannelKeyType, ChannelValueType) {
        (K::key_type(), V::value_type())
    }

    fn downcast<K: ChannelKey, V: ChannelValue>(group: &dyn Any) -> &ChannelGroup<K, V> {
        match group.downcast_ref::<ChannelGroup<K, V>>() {
            Some(typed_group) => typed_group,
            None => unreachable!("Groups are always stored under their own type key"),
        }
    }

    fn downcast_mut<K: ChannelKey, V: ChannelValue>(group: &mut dyn Any) -> &mut ChannelGroup<K, V> {
        match group.downcast_mut::<ChannelGroup<K, V>>() {
            Some(typed_group) => typed_group,
            None => unreachable!("Groups are always stored under their own type key"),
        }
    }

    fn group<K: ChannelKey, V: ChannelValue>(&self) -> Result<&ChannelGroup<K, V>> {
        Ok(Self::downcast(
            self.channels
                .get(&Self::key_of::<K, V>())
                .ok_or_else(|| anyhow!("There is no channel for {} -> {}", K::name(), V::name()))?
                .as_any(),
        ))
    }

    fn group_or_default<K: ChannelKey, V: ChannelValue>(&mut self) -> &mut ChannelGroup<K, V> {
        Self::downcast_mut(
            self.channels
                .entry(Self::key_of::<K, V>())
                .or_insert_with(|| Box::<ChannelGroup<K, V>>::default())
                .as_any_mut(),
        )
    }

    /// Calls `ensure_channel` for the channel group with key and value type
    pub fn ensure_channel<K: ChannelKey, V: ChannelValue>(&mut self, name: &str) -> ChannelId<K, V> {
        self.group_or_default().ensure_channel(name)
    }

    /// Calls `create_channel` for the channel group with key and value type
    pub fn create_channel<K: ChannelKey, V: ChannelValue>(
        &mut self,
        name: &str,
    ) -> Result<ChannelId<K, V>> {
        self.group_or_default().create_channel(name)
    }

    /// Returns the id of the channel called `name`, if it exists.
    pub fn channel_id<K: ChannelKey, V: ChannelValue>(&self, name: &str) -> Option<ChannelId<K, V>> {
        self.group::<K, V>().ok()?.channel_id(name)
    }

    /// Returns the names of all channels with the given key and value types.
    pub fn channel_names<K: ChannelKey, V: ChannelValue>(&self) -> Vec<String> {
        self.channels
            .get(&Self::key_of::<K, V>())
            .map(|g| g.channel_names().map(|n| n.to_owned()).sorted().collect())
            .unwrap_or_default()
    }

    /// Calls `read_channel` for the channel group with key and value type
    pub fn read_channel<K: ChannelKey, V: ChannelValue>(
        &self,
        ch_id: ChannelId<K, V>,
    ) -> Result<BorrowedRef<'_, Channel<K, V>>> {
        self.group()?.read_channel(ch_id)
    }

    /// Calls `read_channel` for the channel group with key and value type. Uses
    /// the channel name instead of its id.
    pub fn read_channel_by_name<K: ChannelKey, V: ChannelValue>(
        &self,
        name: &str,
    ) -> Result<BorrowedRef<'_, Channel<K, V>>> {
        let group = self.group()?;
        group.read_channel(
            group
                .channel_id(name)
                .ok_or_else(|| anyhow!("Channel named {name} does not exist"))?,
        )
    }

    /// Calls `write_channel` for the channel group with key and value type
    pub fn write_channel<K: ChannelKey, V: ChannelValue>(
        &self,
        ch_id: ChannelId<K, V>,
    ) -> Result<MutableRef<'_, Channel<K, V>>> {
        self.group()?.write_channel(ch_id)
    }

    /// Calls `write_channel` for the channel group with key and value type. Uses
    /// the channel name instead of its id.
    pub fn write_channel_by_name<K: ChannelKey, V: ChannelValue>(
        &self,
        name: &str,
    ) -> Result<MutableRef<'_, Channel<K, V>>> {
        let group = self.group()?;
        group.write_channel(
            group
                .channel_id(name)
                .ok_or_else(|| anyhow!("Channel named {name} does not exist"))?,
        )
    }

    /// Sets a channel directly, by name. If the channel doesn't exist, it is
    /// created, otherwise its contents are dropped and the new channel data is
    /// used. Returns the id of the channel that was created.
    pub fn replace_or_create_channel<K: ChannelKey, V: ChannelValue>(
        &mut self,
        name: &str,
        ch: Channel<K, V>,
    ) -> Result<ChannelId<K, V>> {
        let ch_id = self.group_or_default().ensure_channel(name);
        *self.write_channel(ch_id)? = ch;
        Ok(ch_id)
    }
}

impl DefaultChannels {
    pub fn with_position(channels: &mut MeshChannels) -> Self {
        let position = channels.ensure_channel::<VertexId, Vec3>("position");
        Self {
            position,
            face_normals: None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    pub fn test_face_channels() {
        let mut faces: slotmap::SlotMap<FaceId, ()> = slotmap::SlotMap::with_key();
        let f1 = faces.insert(());
        let f2 = faces.insert(());

        let mut mesh_channels = MeshChannels::default();
        let selected = mesh_channels
            .create_channel::<FaceId, bool>(SELECTION_CHANNEL)
            .unwrap();
        let normals = mesh_channels
            .create_channel::<FaceId, Vec3>(FACE_NORMAL_CHANNEL)
            .unwrap();

        assert!(mesh_channels.channel_id::<FaceId, bool>(SELECTION_CHANNEL) == Some(selected));
        assert!(mesh_channels.channel_id::<FaceId, Vec3>(SELECTION_CHANNEL).is_none());
        assert!(mesh_channels
            .create_channel::<FaceId, bool>(SELECTION_CHANNEL)
            .is_err());

        {
            let mut sel = mesh_channels.write_channel(selected).unwrap();
            // Both channels live in different cells, so they can be borrowed
            // at the same time.
            let mut nrm = mesh_channels.write_channel(normals).unwrap();
            sel[f2] = true;
            nrm[f1] = Vec3::Z;

            // Re-borrowing the selection channel should fail now
            assert!(mesh_channels.read_channel(selected).is_err());
        }

        let sel = mesh_channels.read_channel(selected).unwrap();
        let nrm = mesh_channels.read_channel(normals).unwrap();
        // Never written keys read as the default value
        assert!(!sel[f1]);
        assert!(sel[f2]);
        assert_eq!(nrm[f1], Vec3::Z);
        assert_eq!(nrm[f2], Vec3::ZERO);

        // Reading twice is fine, but writing while read is not
        assert!(mesh_channels.read_channel(selected).is_ok());
        assert!(mesh_channels.write_channel(selected).is_err());
    }

    #[test]
    pub fn test_ensure_and_replace() {
        let mut mesh_channels = MeshChannels::default();

        let position = mesh_channels
            .create_channel::<VertexId, Vec3>("position")
            .unwrap();
        assert_eq!(
            position,
            mesh_channels.ensure_channel::<VertexId, Vec3>("position")
        );

        let marks = Channel::<FaceId, bool>::new_with_default(true);
        let id = mesh_channels
            .replace_or_create_channel("marks", marks)
            .unwrap();
        assert_eq!(mesh_channels.channel_id::<FaceId, bool>("marks"), Some(id));
        assert_eq!(
            mesh_channels.channel_names::<FaceId, bool>(),
            vec!["marks".to_string()]
        );
    }

    #[test]
    pub fn test_cloned_channels_are_independent() {
        let mut faces: slotmap::SlotMap<FaceId, ()> = slotmap::SlotMap::with_key();
        let f = faces.insert(());

        let mut a = MeshChannels::default();
        let id = a.ensure_channel::<FaceId, bool>(SELECTION_CHANNEL);
        let b = a.clone();
        a.write_channel(id).unwrap()[f] = true;

        assert!(a.read_channel(id).unwrap()[f]);
        assert!(!b.read_channel(id).unwrap()[f]);
    }
}

// ------------- Boilerplate zone ------------

// NOTE: PhantomData makes std derives add bounds on K and V, so these are
// implemented by hand.

impl<K: ChannelKey, V: ChannelValue> Clone for ChannelId<K, V> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<K: ChannelKey, V: ChannelValue> Copy for ChannelId<K, V> {}
impl<K: ChannelKey, V: ChannelValue> PartialEq for ChannelId<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}
impl<K: ChannelKey, V: ChannelValue> Eq for ChannelId<K, V> {}
impl<K: ChannelKey, V: ChannelValue> std::hash::Hash for ChannelId<K, V> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}
impl<K: ChannelKey, V: ChannelValue> Debug for ChannelId<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelId")
            .field("data", &self.raw)
            .finish()
    }
}

impl<K: ChannelKey, V: ChannelValue> Default for Channel<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: ChannelKey, V: ChannelValue> Default for ChannelGroup<K, V> {
    fn default() -> Self {
        Self {
            channel_names: Default::default(),
            channels: Default::default(),
        }
    }
}
