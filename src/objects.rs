//! Hit object windowing: which objects are on screen at a given offset,
//! and how far into their fade and approach they are

use crate::beatmap::HitObject;
use crate::combo::{spawn_combo_loader, ComboInfo, ComboTable};
use crate::error::MapError;
use crate::resolution::ResolutionManager;
use egui::Pos2;
use std::sync::Arc;

/// Opacity of a fully faded-in object
pub const MAX_OPACITY: u8 = 255;

/// Visibility timing derived from the approach rate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimingWindow {
    /// How long before its hit time an object appears (ms)
    pub preempt: f64,
    /// How long an object takes to reach full opacity once it appears (ms)
    pub fade_in: f64,
}

impl TimingWindow {
    pub fn from_approach_rate(approach_rate: f32) -> Self {
        let ar = f64::from(approach_rate);

        if ar < 5.0 {
            Self {
                preempt: 1200.0 + 600.0 * (5.0 - ar) / 5.0,
                fade_in: 800.0 + 400.0 * (5.0 - ar) / 5.0,
            }
        } else {
            Self {
                preempt: 1200.0 - 750.0 * (ar - 5.0) / 5.0,
                fade_in: 800.0 - 500.0 * (ar - 5.0) / 5.0,
            }
        }
    }

    /// Offset at which `object` starts being drawn
    pub fn opens_at(&self, object: &HitObject) -> f64 {
        object.time as f64 - self.preempt
    }
}

/// Owns the hit objects of the loaded map and answers per-frame queries
/// about them.
///
/// Objects are referred to by their index in map order.
pub struct ObjectManager {
    hit_objects: Arc<[HitObject]>,
    timing: TimingWindow,
    combos: Arc<ComboTable>,
    /// Everything before this index has ended
    sweep_cursor: usize,
}

impl ObjectManager {
    /// Build the manager and run the combo pass before returning
    pub fn new(hit_objects: Vec<HitObject>, approach_rate: f32, combo_color_count: usize) -> Self {
        let hit_objects: Arc<[HitObject]> = hit_objects.into();
        let combos = Arc::new(ComboTable::new(hit_objects.len()));
        combos.fill(&hit_objects, combo_color_count);

        Self::with_table(hit_objects, approach_rate, combos)
    }

    /// Build the manager and run the combo pass on a worker thread.
    /// Objects whose metadata isn't committed yet are held back from
    /// [`visible_objects`](Self::visible_objects).
    pub fn with_background_load(
        hit_objects: Vec<HitObject>,
        approach_rate: f32,
        combo_color_count: usize,
    ) -> Self {
        let hit_objects: Arc<[HitObject]> = hit_objects.into();
        let combos = spawn_combo_loader(Arc::clone(&hit_objects), combo_color_count);

        Self::with_table(hit_objects, approach_rate, combos)
    }

    fn with_table(hit_objects: Arc<[HitObject]>, approach_rate: f32, combos: Arc<ComboTable>) -> Self {
        Self {
            hit_objects,
            timing: TimingWindow::from_approach_rate(approach_rate),
            combos,
            sweep_cursor: 0,
        }
    }

    pub fn timing(&self) -> TimingWindow {
        self.timing
    }

    pub fn preempt(&self) -> f64 {
        self.timing.preempt
    }

    pub fn fade_in(&self) -> f64 {
        self.timing.fade_in
    }

    pub fn hit_objects(&self) -> &[HitObject] {
        &self.hit_objects
    }

    pub fn object(&self, index: usize) -> &HitObject {
        &self.hit_objects[index]
    }

    pub fn combo(&self, index: usize) -> Option<ComboInfo> {
        self.combos.get(index)
    }

    pub fn metadata_ready(&self) -> bool {
        self.combos.is_complete()
    }

    /// True once every object has ended
    pub fn is_finished(&self) -> bool {
        self.sweep_cursor == self.hit_objects.len()
    }

    /// Indices of the objects on screen at `offset`, latest-starting first.
    ///
    /// Offsets must not decrease between calls for the same map: objects
    /// that ended before an earlier offset are never looked at again.
    pub fn visible_objects(&mut self, offset: i64) -> Vec<usize> {
        let now = offset as f64;
        let ready = self.combos.ready();
        let mut visible = Vec::new();

        while self.sweep_cursor < self.hit_objects.len()
            && self.hit_objects[self.sweep_cursor].end_time() < offset
        {
            self.sweep_cursor += 1;
        }

        for index in self.sweep_cursor..self.hit_objects.len() {
            let object = &self.hit_objects[index];

            // Sorted by time, so nothing after this has opened either
            if self.timing.opens_at(object) > now {
                break;
            }
            if index >= ready {
                break;
            }
            if object.end_time() >= offset {
                visible.push(index);
            }
        }

        visible.reverse();
        visible
    }

    /// Opacity of a visible object, ramping up over the fade-in
    pub fn opacity(&self, object: &HitObject, offset: i64) -> u8 {
        let clear = self.timing.opens_at(object) + self.timing.fade_in;
        let now = offset as f64;

        if now >= clear {
            MAX_OPACITY
        } else {
            let max = f64::from(MAX_OPACITY);
            let fading = ((clear - now) / self.timing.fade_in * max).round();
            (max - fading).clamp(0.0, max) as u8
        }
    }

    /// Approach circle size relative to the hit circle: 3x when the object
    /// appears, 1x at its hit time
    pub fn approach_multiplier(&self, object: &HitObject, offset: i64) -> f64 {
        (object.time - offset) as f64 / self.timing.preempt * 2.0 + 1.0
    }

    /// Index into a slider's curve for the ball at `offset`
    pub fn slider_ball_index(offset: i64, object: &HitObject) -> Result<usize, MapError> {
        let curve = object.curve().unwrap_or(&[]);
        let end_time = object.end_time();

        if end_time <= object.time {
            return Err(MapError::ZeroLengthSlider {
                time: object.time,
                end_time,
            });
        }
        if curve.is_empty() {
            return Err(MapError::EmptyCurve { time: object.time });
        }

        let progress = (offset - object.time) as f64 / (end_time - object.time) as f64;
        let index = (progress * curve.len() as f64).floor().max(0.0) as usize;

        Ok(index.min(curve.len() - 1))
    }

    /// Top-left pixel of the slider ball at `offset`
    pub fn slider_ball_position(
        &self,
        offset: i64,
        object: &HitObject,
        resolution: &ResolutionManager,
    ) -> Result<Pos2, MapError> {
        let index = Self::slider_ball_index(offset, object)?;
        let curve = object.curve().unwrap_or(&[]);

        Ok(resolution.hitcircle_position(object.stacked(curve[index])))
    }
}

impl Drop for ObjectManager {
    fn drop(&mut self) {
        // Lets an unfinished combo loader exit early
        self.combos.cancel();
    }
}
