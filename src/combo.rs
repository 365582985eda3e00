//! Combo colour and number assignment
//!
//! Combo metadata is computed in one forward pass over the map. The pass can
//! run on a background thread: entries are committed in map order into a
//! write-once table and published through a ready count, so readers only
//! ever see fully written entries.

use crate::beatmap::HitObject;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComboInfo {
    /// Index into the skin's combo colours
    pub color_index: usize,
    /// Number drawn on the circle, 1-indexed within the combo
    pub number: u32,
}

/// Running combo state, stepped once per hit object in map order
#[derive(Debug, Clone)]
pub struct ComboCounter {
    color_count: usize,
    color_index: usize,
    number: u32,
}

impl ComboCounter {
    pub fn new(color_count: usize) -> Self {
        Self {
            color_count: color_count.max(1),
            color_index: 0,
            number: 1,
        }
    }

    pub fn step(&mut self, object: &HitObject) -> ComboInfo {
        // The first object always starts a combo, so colours effectively start at 1
        if object.new_combo {
            self.color_index = (self.color_index + 1) % self.color_count;
            self.number = 1;
        }

        let info = ComboInfo {
            color_index: self.color_index,
            number: self.number,
        };

        if !object.is_spinner() {
            self.number += 1;
        }

        info
    }
}

/// Write-once combo metadata, indexed like the map's hit objects
#[derive(Debug)]
pub struct ComboTable {
    entries: Vec<OnceLock<ComboInfo>>,
    ready: AtomicUsize,
    cancelled: AtomicBool,
}

impl ComboTable {
    pub fn new(len: usize) -> Self {
        Self {
            entries: (0..len).map(|_| OnceLock::new()).collect(),
            ready: AtomicUsize::new(0),
            cancelled: AtomicBool::new(false),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of leading entries that are committed
    pub fn ready(&self) -> usize {
        self.ready.load(Ordering::Acquire)
    }

    pub fn is_complete(&self) -> bool {
        self.ready() == self.len()
    }

    pub fn get(&self, index: usize) -> Option<ComboInfo> {
        if index < self.ready() {
            self.entries[index].get().copied()
        } else {
            None
        }
    }

    /// Ask a running fill to stop after its current object
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Run the combo pass over `objects`, committing entries in order.
    /// Entries that are already committed are kept as they are.
    /// Returns false if the fill was cancelled before finishing.
    pub fn fill(&self, objects: &[HitObject], color_count: usize) -> bool {
        let mut counter = ComboCounter::new(color_count);
        let committed = self.ready();

        for (index, object) in objects.iter().enumerate().take(self.len()) {
            if self.is_cancelled() {
                return false;
            }

            // Stepped even for committed entries so the counter stays in sync
            let info = counter.step(object);
            if index < committed {
                continue;
            }

            if self.entries[index].set(info).is_err() {
                log::warn!("Combo entry {} was already written", index);
            }
            self.ready.fetch_max(index + 1, Ordering::Release);
        }

        true
    }
}

/// Fill a fresh table on a worker thread. Falls back to filling on the
/// calling thread if the worker can't be spawned.
pub fn spawn_combo_loader(objects: Arc<[HitObject]>, color_count: usize) -> Arc<ComboTable> {
    let table = Arc::new(ComboTable::new(objects.len()));
    let worker_table = Arc::clone(&table);
    let worker_objects = Arc::clone(&objects);

    let spawned = thread::Builder::new()
        .name("combo-loader".to_string())
        .spawn(move || {
            if worker_table.fill(&worker_objects, color_count) {
                log::debug!("Combo metadata ready for {} objects", worker_objects.len());
            } else {
                log::debug!(
                    "Combo loader abandoned after {} of {} objects",
                    worker_table.ready(),
                    worker_objects.len()
                );
            }
        });

    if let Err(e) = spawned {
        log::warn!("Failed to spawn combo loader, loading inline: {}", e);
        table.fill(&objects, color_count);
    }

    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::beatmap::Position;

    fn circles(flags: &[bool]) -> Vec<HitObject> {
        flags
            .iter()
            .enumerate()
            .map(|(i, &new_combo)| HitObject::circle(i as i64 * 100, Position::default(), new_combo))
            .collect()
    }

    #[test]
    fn colours_and_numbers_follow_new_combo_flags() {
        let objects = circles(&[true, false, false, true, false]);
        let mut counter = ComboCounter::new(4);
        let infos: Vec<_> = objects.iter().map(|o| counter.step(o)).collect();

        let colours: Vec<_> = infos.iter().map(|i| i.color_index).collect();
        let numbers: Vec<_> = infos.iter().map(|i| i.number).collect();
        assert_eq!(colours, [1, 1, 1, 2, 2]);
        assert_eq!(numbers, [1, 2, 3, 1, 2]);
    }

    #[test]
    fn colours_wrap_around() {
        let objects = circles(&[true, true, true]);
        let mut counter = ComboCounter::new(2);
        let colours: Vec<_> = objects.iter().map(|o| counter.step(o).color_index).collect();

        assert_eq!(colours, [1, 0, 1]);
    }

    #[test]
    fn spinners_do_not_advance_the_number() {
        let objects = vec![
            HitObject::circle(0, Position::default(), true),
            HitObject::spinner(100, 500, false),
            HitObject::circle(600, Position::default(), false),
        ];
        let mut counter = ComboCounter::new(4);
        let numbers: Vec<_> = objects.iter().map(|o| counter.step(o).number).collect();

        assert_eq!(numbers, [1, 2, 2]);
    }

    #[test]
    fn table_hides_uncommitted_entries() {
        let table = ComboTable::new(3);
        assert_eq!(table.ready(), 0);
        assert_eq!(table.get(0), None);

        assert!(table.fill(&circles(&[true, false, false]), 4));
        assert!(table.is_complete());
        assert_eq!(table.get(2), Some(ComboInfo { color_index: 1, number: 3 }));
        assert_eq!(table.get(3), None);
    }

    #[test]
    fn second_fill_keeps_committed_entries() {
        let table = ComboTable::new(3);
        assert!(table.fill(&circles(&[true, false, true]), 4));
        let first: Vec<_> = (0..3).map(|i| table.get(i)).collect();

        // A different colour count would give different colours if rewritten
        assert!(table.fill(&circles(&[true, false, true]), 1));
        assert_eq!(table.ready(), 3);
        assert_eq!((0..3).map(|i| table.get(i)).collect::<Vec<_>>(), first);
    }

    #[test]
    fn cancelled_fill_stops_quietly() {
        let table = ComboTable::new(3);
        table.cancel();

        assert!(!table.fill(&circles(&[true, false, false]), 4));
        assert_eq!(table.ready(), 0);
    }

    #[test]
    fn background_loader_matches_inline_pass() {
        let objects: Arc<[HitObject]> = circles(&[true, false, true, false, false, true]).into();
        let table = spawn_combo_loader(Arc::clone(&objects), 3);

        while !table.is_complete() {
            thread::yield_now();
        }

        let mut counter = ComboCounter::new(3);
        for (index, object) in objects.iter().enumerate() {
            assert_eq!(table.get(index), Some(counter.step(object)));
        }
    }
}
