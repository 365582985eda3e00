//! Per-frame driver: advances the clock, queries the object manager and
//! issues draw calls in z-order

use crate::audio::{AudioChannel, AudioSync};
use crate::beatmap::{Beatmap, HitObject, HitObjectKind};
use crate::combo::ComboInfo;
use crate::library::MapLibrary;
use crate::objects::ObjectManager;
use crate::resolution::ResolutionManager;
use crate::settings::{DebugMode, Settings};
use crate::skin::{animation_frame, Skin, SLIDER_BALL_FRAMES, SLIDER_BALL_FRAME_DELAY};
use crate::state::{GameMode, GameStateManager};
use egui::{Color32, Pos2, Rect, Vec2};
use rand::Rng;
use std::path::Path;
use std::time::{Duration, Instant};

pub const START_PROMPT: &str = "Press R to select a random map.";
pub const NO_MAPS: &str = "No maps found. Load maps first.";
pub const SKIP_PROMPT: &str = "Press Space to skip.";

/// How long the volume overlay stays up after a change (ms)
const VOLUME_OVERLAY_MS: i64 = 750;
/// Volume change per scroll step
const VOLUME_STEP: f64 = 0.01;

/// What to draw for one hit object
#[derive(Debug, Clone, PartialEq)]
pub enum SpriteShape {
    Circle,
    Slider {
        /// Top-left pixels along the path, head first
        path: Vec<Pos2>,
        /// Top-left pixel of the ball, once the slider has started
        ball: Option<Pos2>,
        ball_frame: usize,
    },
    Spinner {
        /// 0.0 at the spinner's start, 1.0 at its end
        progress: f32,
    },
}

/// One visible hit object, fully resolved to screen space
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectSprite {
    pub index: usize,
    /// Top-left pixel of the hit circle
    pub position: Pos2,
    /// Hit circle diameter in pixels
    pub size: f32,
    pub opacity: u8,
    pub color: Color32,
    pub combo: ComboInfo,
    /// Approach circle size relative to `size`
    pub approach_scale: f32,
    pub shape: SpriteShape,
}

impl ObjectSprite {
    pub fn centre(&self) -> Pos2 {
        centre_of(self.position, self.size)
    }
}

/// Centre of a hit-object-sized square at `top_left`
pub fn centre_of(top_left: Pos2, size: f32) -> Pos2 {
    top_left + Vec2::splat(size / 2.0)
}

/// Receives draw calls for one frame, back to front
pub trait DrawSink {
    fn background(&mut self, path: &Path, opacity: u8);
    fn hit_object(&mut self, sprite: &ObjectSprite);
    fn cursor(&mut self, pos: Pos2);
    fn status(&mut self, text: &str);
    fn debug_text(&mut self, lines: &[String]);
    fn playfield_outline(&mut self, visual: Rect, actual: Rect);
    /// 0.0 to 1.0
    fn volume(&mut self, volume: f64);
}

/// Everything that lives for as long as one map is being played
struct Session {
    beatmap: Beatmap,
    objects: ObjectManager,
    state: GameStateManager,
    audio_sync: AudioSync,
    skin: Skin,
}

pub struct FrameDriver {
    settings: Settings,
    resolution: ResolutionManager,
    audio: Box<dyn AudioChannel>,
    session: Option<Session>,
    status: String,
    debug_mode: DebugMode,
    /// Wall-clock milliseconds since the driver was created
    ticks: i64,
    volume_changed_at: Option<i64>,
    cursor_pos: Vec2,
}

impl FrameDriver {
    pub fn new(settings: Settings, mut audio: Box<dyn AudioChannel>) -> Self {
        audio.set_volume(settings.volume);

        Self {
            resolution: ResolutionManager::new(settings.screen_size),
            debug_mode: settings.debug_mode,
            settings,
            audio,
            session: None,
            status: START_PROMPT.to_string(),
            ticks: 0,
            volume_changed_at: None,
            cursor_pos: Vec2::ZERO,
        }
    }

    pub fn resolution(&self) -> &ResolutionManager {
        &self.resolution
    }

    pub fn is_playing(&self) -> bool {
        self.session.is_some()
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn current_offset(&self) -> Option<i64> {
        self.session.as_ref().map(|s| s.state.current_offset)
    }

    pub fn current_beatmap(&self) -> Option<&Beatmap> {
        self.session.as_ref().map(|s| &s.beatmap)
    }

    pub fn debug_mode(&self) -> DebugMode {
        self.debug_mode
    }

    /// Start playing `beatmap` from its lead-in
    pub fn load_map(&mut self, beatmap: Beatmap) {
        if self.session.is_some() {
            self.end_map();
        }

        self.resolution.load_size(beatmap.circle_size);
        let skin = Skin::for_beatmap(&beatmap);

        let objects = if self.settings.background_load {
            ObjectManager::with_background_load(
                beatmap.hit_objects.clone(),
                beatmap.approach_rate,
                skin.combo_color_count(),
            )
        } else {
            ObjectManager::new(
                beatmap.hit_objects.clone(),
                beatmap.approach_rate,
                skin.combo_color_count(),
            )
        };

        let mut state = GameStateManager::new();
        state.initialize(objects.hit_objects(), objects.preempt());
        state.cursor_pos = self.cursor_pos;

        log::info!(
            "Playing {} ({} objects, starting at {}ms)",
            beatmap.display_name(),
            beatmap.hit_objects.len(),
            state.current_offset
        );

        self.session = Some(Session {
            beatmap,
            objects,
            state,
            audio_sync: AudioSync::new(),
            skin,
        });
    }

    /// Pick and load a random map. Only works from the start screen.
    /// Returns true if a map was loaded.
    pub fn select_random_map<R: Rng + ?Sized>(&mut self, library: &MapLibrary, rng: &mut R) -> bool {
        if self.session.is_some() {
            log::debug!("Ignoring map selection while playing");
            return false;
        }

        match library.random_map(rng) {
            Some(beatmap) => {
                self.load_map(beatmap.clone());
                true
            }
            None => {
                self.status = NO_MAPS.to_string();
                false
            }
        }
    }

    pub fn skip(&mut self) {
        let Some(session) = &mut self.session else {
            log::debug!("Ignoring skip with no map loaded");
            return;
        };

        let before = session.state.current_offset;
        session.state.skip();
        if session.state.current_offset != before {
            session
                .audio_sync
                .seek(session.state.current_offset, self.audio.as_mut());
        }
    }

    /// Stop the map and go back to the start screen
    pub fn force_end(&mut self) {
        if self.session.is_some() {
            log::info!("Map ended early");
            self.end_map();
        }
    }

    fn end_map(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.audio_sync.stop(self.audio.as_mut());
        }
        self.status = START_PROMPT.to_string();
    }

    pub fn toggle_debug(&mut self) {
        self.debug_mode = match (self.debug_mode, self.settings.debug_mode) {
            (DebugMode::None, DebugMode::None) => DebugMode::Few,
            (DebugMode::None, configured) => configured,
            (_, _) => DebugMode::None,
        };
    }

    /// Change the volume by `steps` percent
    pub fn change_volume(&mut self, steps: i32) {
        let volume = (self.audio.volume() + f64::from(steps) * VOLUME_STEP).clamp(0.0, 1.0);
        self.audio.set_volume(volume);
        self.volume_changed_at = Some(self.ticks);
    }

    /// Pointer position in screen pixels
    pub fn set_cursor(&mut self, screen_pos: Pos2) {
        self.cursor_pos = screen_pos - self.resolution.actual_placement_offset.to_pos2();
        if let Some(session) = &mut self.session {
            session.state.cursor_pos = self.cursor_pos;
        }
    }

    /// Run one frame that took `delta_ms` since the previous one
    pub fn tick(&mut self, delta_ms: i64, sink: &mut dyn DrawSink) {
        self.ticks += delta_ms;

        match self.session.as_mut() {
            None => sink.status(&self.status),
            Some(session) => {
                let offset = session.state.current_offset;
                session
                    .audio_sync
                    .update(offset, &session.beatmap.audio_path, self.audio.as_mut());

                if self.settings.background_enabled {
                    let opacity = session.state.background_opacity();
                    sink.background(&session.beatmap.background_path, opacity);
                }

                let visible = session.objects.visible_objects(offset);
                for &index in &visible {
                    let sprite = build_sprite(session, &self.resolution, index, offset);
                    sink.hit_object(&sprite);
                }

                sink.cursor(self.resolution.cursor_position(session.state.cursor_pos));

                if session.state.can_skip() {
                    sink.status(SKIP_PROMPT);
                }

                if self.debug_mode != DebugMode::None {
                    sink.debug_text(&debug_lines(session, self.debug_mode, visible.len(), self.ticks));
                    sink.playfield_outline(
                        self.resolution.playfield_rect(),
                        self.resolution.actual_playfield_rect(),
                    );
                }

                if session.state.mode() == GameMode::MapEnded {
                    log::info!("Finished {}", session.beatmap.display_name());
                    self.end_map();
                } else {
                    session.state.advance(delta_ms);
                }
            }
        }

        if let Some(changed_at) = self.volume_changed_at {
            if self.ticks - changed_at <= VOLUME_OVERLAY_MS {
                sink.volume(self.audio.volume());
            } else {
                self.volume_changed_at = None;
            }
        }
    }
}

fn build_sprite(session: &Session, resolution: &ResolutionManager, index: usize, offset: i64) -> ObjectSprite {
    let objects = &session.objects;
    let object = objects.object(index);
    // Visible objects always have committed combo metadata
    let combo = objects.combo(index).unwrap_or(ComboInfo {
        color_index: 0,
        number: 1,
    });

    ObjectSprite {
        index,
        position: resolution.hitcircle_position(object.stacked_position()),
        size: resolution.object_size as f32,
        opacity: objects.opacity(object, offset),
        color: session.skin.combo_color(combo.color_index),
        combo,
        approach_scale: objects.approach_multiplier(object, offset) as f32,
        shape: sprite_shape(objects, resolution, object, offset),
    }
}

fn sprite_shape(
    objects: &ObjectManager,
    resolution: &ResolutionManager,
    object: &HitObject,
    offset: i64,
) -> SpriteShape {
    match &object.kind {
        HitObjectKind::Circle | HitObjectKind::HoldNote { .. } => SpriteShape::Circle,
        HitObjectKind::Slider { curve, .. } => {
            let ball = if offset >= object.time {
                match objects.slider_ball_position(offset, object, resolution) {
                    Ok(pos) => Some(pos),
                    Err(e) => {
                        log::debug!("No slider ball: {}", e);
                        None
                    }
                }
            } else {
                None
            };

            SpriteShape::Slider {
                path: curve
                    .iter()
                    .map(|&p| resolution.hitcircle_position(object.stacked(p)))
                    .collect(),
                ball,
                ball_frame: animation_frame(object.time, offset, SLIDER_BALL_FRAMES, SLIDER_BALL_FRAME_DELAY),
            }
        }
        HitObjectKind::Spinner { end_time } => {
            let length = (*end_time - object.time).max(1) as f32;
            SpriteShape::Spinner {
                progress: ((offset - object.time) as f32 / length).clamp(0.0, 1.0),
            }
        }
    }
}

fn debug_lines(session: &Session, mode: DebugMode, visible: usize, ticks: i64) -> Vec<String> {
    let map = &session.beatmap;
    let mut lines = vec![format!(
        "{} by {} | AR {} CS {}",
        map.display_name(),
        map.creator,
        map.approach_rate,
        map.circle_size
    )];

    if mode == DebugMode::Full {
        lines.push(format!("Offset: {}ms", session.state.current_offset));
        lines.push(format!("Ticks: {}ms", ticks));
        lines.push(format!("Visible objects: {}", visible));
        if !session.objects.metadata_ready() {
            lines.push("Loading combo colours...".to_string());
        }
    }

    lines
}

/// Turns wall-clock frame times into whole-millisecond deltas without
/// losing the sub-millisecond remainder
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Instant,
    carry: Duration,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock {
    pub fn new() -> Self {
        Self {
            last: Instant::now(),
            carry: Duration::ZERO,
        }
    }

    /// Start measuring from now, dropping any time already elapsed
    pub fn reset(&mut self) {
        self.last = Instant::now();
        self.carry = Duration::ZERO;
    }

    /// Whole milliseconds since the previous tick
    pub fn tick(&mut self) -> i64 {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last);
        self.last = now;
        self.accumulate(elapsed)
    }

    pub fn accumulate(&mut self, elapsed: Duration) -> i64 {
        let total = self.carry + elapsed;
        let whole = total.as_millis();
        self.carry = total - Duration::from_millis(whole as u64);
        whole as i64
    }
}
