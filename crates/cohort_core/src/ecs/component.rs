//! # Components
//!
//! Components are pure data containers with no behavior and no identity of
//! their own: a component is named by its entity plus its type.
//!
//! Each registry numbers the component types it sees with a dense
//! [`ComponentTypeId`], assigned on first use. Those ids index the per-entity
//! [`ComponentMask`] and the store table.

use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::fmt::Debug;

use bytemuck::{Pod, Zeroable};

/// Marker trait for component types.
///
/// Components must be:
/// - `Pod`: plain old data, bitwise copyable
/// - `Zeroable`: can be safely zeroed
/// - `Default`: the value a slot is reset to when the component goes away
///
/// # Example
///
/// ```rust
/// use bytemuck::{Pod, Zeroable};
/// use cohort_core::Component;
///
/// #[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
/// #[repr(C)]
/// struct Position {
///     x: f32,
///     y: f32,
/// }
///
/// impl Component for Position {}
/// ```
pub trait Component: Pod + Zeroable + Default + Debug + 'static {}

/// Dense per-registry number for a component type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct ComponentTypeId(u32);

impl ComponentTypeId {
    #[inline]
    pub(crate) const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the id as a table index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Assigns [`ComponentTypeId`]s in first-seen order.
#[derive(Debug, Default)]
pub(crate) struct ComponentTypes {
    ids: HashMap<TypeId, ComponentTypeId>,
    names: Vec<&'static str>,
}

impl ComponentTypes {
    /// Returns the id for `C`, registering it if unseen.
    ///
    /// The second value is `true` when the type was registered by this call.
    pub(crate) fn register<C: Component>(&mut self) -> (ComponentTypeId, bool) {
        if let Some(&id) = self.ids.get(&TypeId::of::<C>()) {
            return (id, false);
        }
        let raw = u32::try_from(self.names.len())
            .expect("fewer than u32::MAX component types are registered");
        let id = ComponentTypeId::new(raw);
        self.ids.insert(TypeId::of::<C>(), id);
        self.names.push(type_name::<C>());
        (id, true)
    }

    /// Returns the id for `C` if it was registered.
    #[inline]
    pub(crate) fn get<C: Component>(&self) -> Option<ComponentTypeId> {
        self.ids.get(&TypeId::of::<C>()).copied()
    }

    /// Returns the type name recorded for `id`.
    pub(crate) fn name(&self, id: ComponentTypeId) -> &'static str {
        self.names.get(id.index()).copied().unwrap_or("<unregistered>")
    }

    pub(crate) fn len(&self) -> usize {
        self.names.len()
    }
}

/// Set of component types, one bit per [`ComponentTypeId`].
///
/// Grows on demand, so the number of component types is open-ended.
/// Trailing zero words are never significant: two masks with the same bits
/// set compare equal regardless of their allocated length.
#[derive(Clone, Debug, Default)]
pub struct ComponentMask {
    /// 64 component types per word.
    bits: Vec<u64>,
}

impl ComponentMask {
    /// Creates an empty mask.
    #[must_use]
    pub const fn new() -> Self {
        Self { bits: Vec::new() }
    }

    /// Adds a type. Returns `false` if it was already present.
    pub fn insert(&mut self, id: ComponentTypeId) -> bool {
        let (word, mask) = Self::locate(id);
        if word >= self.bits.len() {
            self.bits.resize(word + 1, 0);
        }
        let was_set = self.bits[word] & mask != 0;
        self.bits[word] |= mask;
        !was_set
    }

    /// Removes a type. Returns `false` if it was not present.
    pub fn remove(&mut self, id: ComponentTypeId) -> bool {
        let (word, mask) = Self::locate(id);
        match self.bits.get_mut(word) {
            Some(bits) if *bits & mask != 0 => {
                *bits &= !mask;
                true
            }
            _ => false,
        }
    }

    /// Checks if a type is present.
    #[inline]
    #[must_use]
    pub fn contains(&self, id: ComponentTypeId) -> bool {
        let (word, mask) = Self::locate(id);
        self.bits.get(word).is_some_and(|bits| bits & mask != 0)
    }

    /// Checks if every type in `other` is also in `self`.
    #[inline]
    #[must_use]
    pub fn is_superset(&self, other: &Self) -> bool {
        other.bits.iter().enumerate().all(|(word, &required)| {
            let have = self.bits.get(word).copied().unwrap_or(0);
            have & required == required
        })
    }

    /// Number of types present.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bits.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Checks if no type is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bits.iter().all(|&w| w == 0)
    }

    /// Iterates over the present type ids in increasing order.
    pub fn iter(&self) -> impl Iterator<Item = ComponentTypeId> + '_ {
        self.bits.iter().enumerate().flat_map(|(word_idx, &word)| {
            let mut remaining = word;
            std::iter::from_fn(move || {
                if remaining == 0 {
                    return None;
                }
                let bit = remaining.trailing_zeros();
                // Clear the lowest set bit
                remaining &= remaining - 1;
                let raw = u32::try_from(word_idx * 64).ok()? + bit;
                Some(ComponentTypeId::new(raw))
            })
        })
    }

    #[inline]
    const fn locate(id: ComponentTypeId) -> (usize, u64) {
        (id.index() / 64, 1u64 << (id.0 % 64))
    }
}

impl PartialEq for ComponentMask {
    fn eq(&self, other: &Self) -> bool {
        let len = self.bits.len().max(other.bits.len());
        (0..len).all(|i| {
            self.bits.get(i).copied().unwrap_or(0) == other.bits.get(i).copied().unwrap_or(0)
        })
    }
}

impl Eq for ComponentMask {}

impl FromIterator<ComponentTypeId> for ComponentMask {
    fn from_iter<I: IntoIterator<Item = ComponentTypeId>>(iter: I) -> Self {
        let mut mask = Self::new();
        for id in iter {
            mask.insert(id);
        }
        mask
    }
}
