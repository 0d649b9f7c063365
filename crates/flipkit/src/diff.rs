use crate::collections::map::HashSet;
use crate::error::FlipError;
use crate::key::{Key, KeyedItem};

/// Verdict for an item present in the previous render but absent from the
/// next one.
pub enum LeaveVerdict {
    /// Keep the item in the merged sequence so its leave transition can run.
    Keep,
    /// Drop it immediately, no leave transition.
    Drop,
}

/// Merges the previously rendered sequence with the newly requested one.
///
/// Items present in both keep their previous position but take the new
/// payload. Items only in `prev` are offered to `on_leave`; kept ones stay at
/// their previous position. Items only in `next` are inserted after the
/// nearest preceding `next` neighbour already placed in the result, so new
/// items land where the host put them relative to survivors.
pub fn merge_diff(
    prev: &[KeyedItem],
    next: &[KeyedItem],
    mut on_leave: impl FnMut(&KeyedItem) -> LeaveVerdict,
    mut on_enter: impl FnMut(&KeyedItem),
) -> Result<Vec<KeyedItem>, FlipError> {
    let mut next_keys: HashSet<Key> = HashSet::default();
    for item in next {
        if !next_keys.insert(item.key.clone()) {
            return Err(FlipError::DuplicateKey {
                key: item.key.clone(),
            });
        }
    }

    let mut prev_keys: HashSet<Key> = HashSet::default();
    for item in prev {
        prev_keys.insert(item.key.clone());
    }

    // Walk prev as the base order.
    let mut merged: Vec<KeyedItem> = Vec::with_capacity(prev.len().max(next.len()));
    for item in prev {
        if next_keys.contains(&item.key) {
            let fresh = next
                .iter()
                .find(|n| n.key == item.key)
                .cloned()
                .unwrap_or_else(|| item.clone());
            merged.push(fresh);
        } else if matches!(on_leave(item), LeaveVerdict::Keep) {
            merged.push(item.clone());
        }
    }

    // Insert newcomers anchored to their preceding next-neighbour.
    for (idx, item) in next.iter().enumerate() {
        if prev_keys.contains(&item.key) {
            continue;
        }
        on_enter(item);
        let anchor = next[..idx]
            .iter()
            .rev()
            .find_map(|n| merged.iter().position(|m| m.key == n.key));
        let at = match anchor {
            Some(pos) => pos + 1,
            None => 0,
        };
        merged.insert(at, item.clone());
    }

    Ok(merged)
}
