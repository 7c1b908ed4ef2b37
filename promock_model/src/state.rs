use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use promock_core::SeriesKey;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// What a series last emitted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesState {
    pub value: f64,
    pub last_emitted_at: DateTime<Utc>,
}

impl SeriesState {
    pub fn new(value: f64, last_emitted_at: DateTime<Utc>) -> Self {
        Self {
            value,
            last_emitted_at,
        }
    }
}

/// Per-series state slots, one lock each.
///
/// The key set is fixed when the table is built, so lookups never need a
/// table-wide lock: scrapes of one series serialize on its slot while other
/// series proceed in parallel. A fresh table starts every slot empty.
#[derive(Debug, Default)]
pub struct StateTable {
    slots: HashMap<SeriesKey, Mutex<Option<SeriesState>>>,
}

impl StateTable {
    pub fn new<'a, I>(keys: I) -> Self
    where
        I: IntoIterator<Item = &'a SeriesKey>,
    {
        Self {
            slots: keys
                .into_iter()
                .map(|key| (key.clone(), Mutex::new(None)))
                .collect(),
        }
    }

    /// Run `f` with exclusive access to the series' state slot.
    pub fn with_state<T>(
        &self,
        key: &SeriesKey,
        f: impl FnOnce(&mut Option<SeriesState>) -> T,
    ) -> Option<T> {
        let slot = self.slots.get(key)?;
        let mut guard = slot.lock();
        Some(f(&mut guard))
    }

    pub fn get(&self, key: &SeriesKey) -> Option<SeriesState> {
        self.slots.get(key).and_then(|slot| *slot.lock())
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slots_start_empty() {
        let keys = vec![SeriesKey::bare("a"), SeriesKey::bare("b")];
        let table = StateTable::new(&keys);

        assert_eq!(table.len(), 2);
        assert!(table.get(&keys[0]).is_none());
    }

    #[test]
    fn test_with_state_updates_slot() {
        let keys = vec![SeriesKey::bare("a")];
        let table = StateTable::new(&keys);
        let now = Utc::now();

        table.with_state(&keys[0], |state| *state = Some(SeriesState::new(4.0, now)));

        assert_eq!(table.get(&keys[0]), Some(SeriesState::new(4.0, now)));
        assert!(table.with_state(&SeriesKey::bare("missing"), |_| ()).is_none());
    }

    #[test]
    fn test_with_state_serializes_threads() {
        let keys = vec![SeriesKey::bare("a")];
        let table = StateTable::new(&keys);
        let now = Utc::now();

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    for _ in 0..1000 {
                        table.with_state(&keys[0], |state| {
                            let value = state.map_or(0.0, |s| s.value);
                            *state = Some(SeriesState::new(value + 1.0, now));
                        });
                    }
                });
            }
        });

        assert_eq!(table.get(&keys[0]).unwrap().value, 8000.0);
    }
}
