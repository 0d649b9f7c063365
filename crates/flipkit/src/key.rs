use std::any::Any;
use std::fmt;
use std::hash::Hash;
use std::rc::Rc;

/// Stable identity of one rendered item within a group.
pub type Key = Rc<str>;

/// One entry of the host's requested sequence: a stable key plus whatever
/// payload the host renders from. The engine never inspects the payload.
#[derive(Clone)]
pub struct KeyedItem {
    pub key: Key,
    pub data: Rc<dyn Any>,
}

impl KeyedItem {
    pub fn new(key: impl Into<Key>, data: impl Any) -> Self {
        Self {
            key: key.into(),
            data: Rc::new(data),
        }
    }

    pub fn bare(key: impl Into<Key>) -> Self {
        Self::new(key, ())
    }

    pub fn data_as<T: Any>(&self) -> Option<&T> {
        self.data.downcast_ref()
    }
}

impl fmt::Debug for KeyedItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyedItem").field("key", &self.key).finish()
    }
}

/// Opaque token gating transition sessions: a session only runs when the
/// change key differs from the previous one, so unrelated host re-renders
/// batch without re-triggering measurement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChangeKey(u64);

// Fixed seeds: equal inputs must map to equal change keys across group
// instances and process runs.
const CHANGE_KEY_SEEDS: (u64, u64, u64, u64) = (
    0x6c62_272e_07bb_0142,
    0x517c_c1b7_2722_0a95,
    0x2545_f491_4f6c_dd1d,
    0x9e37_79b9_7f4a_7c15,
);

/// Collapses any hashable value into a [`ChangeKey`]. Equality of the input
/// values implies equality of the keys.
pub fn change_key<K: Hash + ?Sized>(value: &K) -> ChangeKey {
    let (k0, k1, k2, k3) = CHANGE_KEY_SEEDS;
    let state = ahash::RandomState::with_seeds(k0, k1, k2, k3);
    ChangeKey(state.hash_one(value))
}
