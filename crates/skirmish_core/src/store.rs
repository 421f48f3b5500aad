//! # Versioned Property Store
//!
//! Each property carries its own sequence number. An incoming value only
//! replaces the current one if its sequence number is strictly greater, so
//! updates that arrive late or twice are dropped per property:
//!
//! ```text
//! arrives:   POS@3   POS@1   POS@3   POS@5
//! applied:    yes     no      no      yes
//! ```
//!
//! Because every property keeps its own high-water mark, merging the same
//! set of updates in any arrival order converges on the same state.

use skirmish_shared::{Prop, PropertyBag, PropertyValue, SeqNum};
use std::collections::HashMap;

/// A value and the sequence number it was applied at.
#[derive(Clone, Debug, PartialEq)]
struct Versioned {
    /// Current value. `None` once removed.
    value: Option<PropertyValue>,
    /// Highest sequence number applied. `None` until first sequenced.
    seq: Option<SeqNum>,
}

/// Per-entity map of versioned properties.
#[derive(Clone, Debug, Default)]
pub struct PropertyStore {
    props: HashMap<Prop, Versioned>,
    last_seq: SeqNum,
}

impl PropertyStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `prop` currently holds a value.
    #[inline]
    #[must_use]
    pub fn has(&self, prop: Prop) -> bool {
        self.props.get(&prop).is_some_and(|v| v.value.is_some())
    }

    /// Current value of `prop`, if present.
    #[inline]
    #[must_use]
    pub fn get(&self, prop: Prop) -> Option<&PropertyValue> {
        self.props.get(&prop).and_then(|v| v.value.as_ref())
    }

    /// Sequence number `prop` was last applied at, 0 if never.
    #[inline]
    #[must_use]
    pub fn seq_num(&self, prop: Prop) -> SeqNum {
        self.props.get(&prop).and_then(|v| v.seq).unwrap_or(0)
    }

    /// Highest sequence number accepted for any property.
    #[inline]
    #[must_use]
    pub fn last_seq_num(&self) -> SeqNum {
        self.last_seq
    }

    /// Merges a bag.
    ///
    /// With `Some(seq)`, each property is applied only if it has never been
    /// sequenced or `seq` is strictly greater than its last sequence number.
    /// With `None` the write is local and always applied, without touching
    /// any sequence number.
    ///
    /// Returns how many properties were applied.
    pub fn set_data(&mut self, bag: PropertyBag, seq: Option<SeqNum>) -> usize {
        let mut applied = 0;
        for (prop, value) in bag {
            match seq {
                Some(seq) => {
                    let slot = self.props.entry(prop).or_insert(Versioned { value: None, seq: None });
                    if let Some(current) = slot.seq {
                        if seq <= current {
                            tracing::trace!(prop = prop.0, seq, current, "dropping stale property");
                            continue;
                        }
                    }
                    slot.value = Some(value);
                    slot.seq = Some(seq);
                    self.last_seq = self.last_seq.max(seq);
                }
                None => {
                    self.props.entry(prop).or_insert(Versioned { value: None, seq: None }).value =
                        Some(value);
                }
            }
            applied += 1;
        }
        applied
    }

    /// Removes a value, keeping its sequence number so older updates stay
    /// rejected.
    pub fn remove(&mut self, prop: Prop) -> Option<PropertyValue> {
        self.props.get_mut(&prop).and_then(|v| v.value.take())
    }

    /// Snapshot of every present property.
    #[must_use]
    pub fn data(&self) -> PropertyBag {
        self.props
            .iter()
            .filter_map(|(prop, v)| v.value.clone().map(|value| (*prop, value)))
            .collect()
    }

    /// Number of present properties.
    #[must_use]
    pub fn len(&self) -> usize {
        self.props.values().filter(|v| v.value.is_some()).count()
    }

    /// Whether no property is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
