//! Gameplay clock and map-level state

use crate::beatmap::HitObject;
use egui::Vec2;

/// Lead-in before the first object during which skipping is allowed (ms)
pub const SKIP_LEAD_IN: i64 = 3000;
/// Where a skip lands, relative to the first object (ms)
pub const SKIP_TARGET: i64 = 2500;

/// Background opacity once the fade has finished
pub const BACKGROUND_DIM: u8 = 50;
/// How long the background takes to dim before the first object (ms)
const BACKGROUND_FADE_MS: f64 = 500.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameMode {
    NoMapLoaded,
    Playing,
    MapEnded,
}

/// First object start and last object end of the loaded map
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct MapTiming {
    first_time: i64,
    last_end_time: i64,
}

/// Owns the current offset for the loaded map
#[derive(Debug, Clone)]
pub struct GameStateManager {
    timing: Option<MapTiming>,
    /// Milliseconds since the start of the map, negative during the lead-in
    pub current_offset: i64,
    /// Cursor position relative to the actual playfield, in pixels
    pub cursor_pos: Vec2,
    background_fading: bool,
}

impl Default for GameStateManager {
    fn default() -> Self {
        Self::new()
    }
}

impl GameStateManager {
    pub fn new() -> Self {
        Self {
            timing: None,
            current_offset: 0,
            cursor_pos: Vec2::ZERO,
            background_fading: true,
        }
    }

    /// Start a map. The offset starts early enough that the first object
    /// gets its full approach plus the skippable lead-in.
    pub fn initialize(&mut self, hit_objects: &[HitObject], preempt: f64) {
        let (Some(first), Some(last)) = (hit_objects.first(), hit_objects.last()) else {
            log::debug!("Ignoring initialize with no hit objects");
            self.reset();
            return;
        };

        let lead_in = (first.time as f64 - preempt - SKIP_LEAD_IN as f64).floor() as i64;

        self.timing = Some(MapTiming {
            first_time: first.time,
            last_end_time: last.end_time(),
        });
        self.current_offset = lead_in.min(0);
        self.background_fading = true;
    }

    /// Forget the loaded map
    pub fn reset(&mut self) {
        *self = Self {
            cursor_pos: self.cursor_pos,
            ..Self::new()
        };
    }

    pub fn mode(&self) -> GameMode {
        match self.timing {
            None => GameMode::NoMapLoaded,
            Some(_) if self.map_ended() => GameMode::MapEnded,
            Some(_) => GameMode::Playing,
        }
    }

    pub fn advance(&mut self, delta_ms: i64) {
        if self.timing.is_none() {
            log::debug!("Ignoring advance of {}ms with no map loaded", delta_ms);
            return;
        }
        self.current_offset += delta_ms;
    }

    pub fn can_skip(&self) -> bool {
        self.timing
            .is_some_and(|t| self.current_offset < t.first_time - SKIP_LEAD_IN)
    }

    /// Jump to shortly before the first object
    pub fn skip(&mut self) {
        match self.timing {
            Some(t) if self.can_skip() => self.current_offset = t.first_time - SKIP_TARGET,
            _ => log::debug!("Ignoring skip at offset {}", self.current_offset),
        }
    }

    pub fn map_ended(&self) -> bool {
        self.timing
            .is_some_and(|t| self.current_offset > t.last_end_time)
    }

    pub fn is_background_fading(&self) -> bool {
        self.background_fading
    }

    /// Background opacity while it dims towards the first object.
    /// Reaching the dim level ends the fade for the rest of the map.
    pub fn background_fade_opacity(&mut self) -> u8 {
        let Some(t) = self.timing else {
            return u8::MAX;
        };

        let remaining = (t.first_time - self.current_offset) as f64;
        let opacity = (255.0 * remaining / BACKGROUND_FADE_MS)
            .clamp(f64::from(BACKGROUND_DIM), 255.0)
            .round() as u8;

        if opacity <= BACKGROUND_DIM {
            self.background_fading = false;
        }
        opacity
    }

    /// Background opacity for this frame
    pub fn background_opacity(&mut self) -> u8 {
        if self.background_fading {
            self.background_fade_opacity()
        } else {
            BACKGROUND_DIM
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::beatmap::Position;
    use crate::objects::{ObjectManager, TimingWindow};

    fn map(first: i64, last: i64) -> Vec<HitObject> {
        vec![
            HitObject::circle(first, Position::default(), true),
            HitObject::circle(last, Position::default(), false),
        ]
    }

    #[test]
    fn starts_with_no_map() {
        let mut state = GameStateManager::new();

        assert_eq!(state.mode(), GameMode::NoMapLoaded);
        assert!(!state.can_skip());
        assert!(!state.map_ended());

        state.advance(16);
        state.skip();
        assert_eq!(state.current_offset, 0);
    }

    #[test]
    fn initial_offset_is_capped_at_zero() {
        let mut state = GameStateManager::new();
        let preempt = TimingWindow::from_approach_rate(9.8).preempt;

        state.initialize(&map(5000, 9000), preempt);
        assert_eq!(state.current_offset, 0);
    }

    #[test]
    fn early_first_object_starts_negative() {
        let mut state = GameStateManager::new();

        state.initialize(&map(1000, 2000), 1200.0);
        assert_eq!(state.current_offset, -3200);

        // Floors rather than truncating
        state.initialize(&map(1000, 2000), 1200.5);
        assert_eq!(state.current_offset, -3201);
    }

    #[test]
    fn first_object_appears_before_its_time() {
        let objects = map(5000, 9000);
        let mut manager = ObjectManager::new(objects.clone(), 9.8, 4);
        let mut state = GameStateManager::new();
        state.initialize(&objects, manager.preempt());

        let mut seen_at = None;
        while state.current_offset <= 5000 {
            if manager.visible_objects(state.current_offset).contains(&0) {
                seen_at = Some(state.current_offset);
                break;
            }
            state.advance(16);
        }

        assert!(seen_at.is_some_and(|offset| offset < 5000));
    }

    #[test]
    fn skip_window() {
        let mut state = GameStateManager::new();
        state.initialize(&map(5000, 9000), 450.0);

        assert!(state.can_skip());
        state.advance(1999);
        assert!(state.can_skip());
        state.advance(1);
        assert!(!state.can_skip());

        // No-op once past the lead-in
        state.skip();
        assert_eq!(state.current_offset, 2000);
    }

    #[test]
    fn skip_jumps_to_target() {
        let mut state = GameStateManager::new();
        state.initialize(&map(5000, 9000), 450.0);

        state.skip();
        assert_eq!(state.current_offset, 2500);
        assert!(!state.can_skip());
    }

    #[test]
    fn map_ends_after_last_object() {
        let mut state = GameStateManager::new();
        state.initialize(&map(5000, 9000), 450.0);

        state.advance(9000);
        assert_eq!(state.mode(), GameMode::Playing);
        state.advance(1);
        assert_eq!(state.mode(), GameMode::MapEnded);

        state.reset();
        assert_eq!(state.mode(), GameMode::NoMapLoaded);
    }

    #[test]
    fn background_fades_then_latches() {
        let mut state = GameStateManager::new();
        state.initialize(&map(5000, 9000), 450.0);

        assert_eq!(state.background_opacity(), 255);
        state.current_offset = 4750;
        assert_eq!(state.background_opacity(), 128);
        assert!(state.is_background_fading());

        state.current_offset = 4950;
        assert_eq!(state.background_opacity(), BACKGROUND_DIM);
        assert!(!state.is_background_fading());

        // Stays dim even if the fade formula would say otherwise
        state.current_offset = 0;
        assert_eq!(state.background_opacity(), BACKGROUND_DIM);
    }
}
