//! Beatmap wrapper with playback-ready hit objects

use crate::error::MapError;
use crate::objects::TimingWindow;
use crate::stacking::apply_stacking;
use rosu_map::section::hit_objects::{CurveBuffers, HitObjectKind as ParsedKind};
use std::path::{Path, PathBuf};

/// osu! standard playfield dimensions
pub const PLAYFIELD_WIDTH: f32 = 512.0;
pub const PLAYFIELD_HEIGHT: f32 = 384.0;

/// A point in osu!pixels
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Position) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Maps older than this format version are not stacked
const STACKING_FORMAT_VERSION: i32 = 6;

#[derive(Debug, Clone, PartialEq)]
pub enum HitObjectKind {
    Circle,
    Slider {
        end_time: i64,
        /// Interpolated path points in osu!pixels, head first
        curve: Vec<Position>,
    },
    Spinner {
        end_time: i64,
    },
    HoldNote {
        end_time: i64,
    },
}

/// A single hit object, timed in whole milliseconds from the start of the map
#[derive(Debug, Clone, PartialEq)]
pub struct HitObject {
    pub time: i64,
    pub position: Position,
    pub new_combo: bool,
    pub kind: HitObjectKind,
    /// Diagonal shift in osu!pixels from stacking, 0 when not stacked
    pub stack_offset: f32,
}

impl HitObject {
    pub fn circle(time: i64, position: Position, new_combo: bool) -> Self {
        Self {
            time,
            position,
            new_combo,
            kind: HitObjectKind::Circle,
            stack_offset: 0.0,
        }
    }

    pub fn slider(
        time: i64,
        end_time: i64,
        position: Position,
        new_combo: bool,
        curve: Vec<Position>,
    ) -> Self {
        Self {
            time,
            position,
            new_combo,
            kind: HitObjectKind::Slider { end_time, curve },
            stack_offset: 0.0,
        }
    }

    pub fn spinner(time: i64, end_time: i64, new_combo: bool) -> Self {
        Self {
            time,
            position: Position::new(PLAYFIELD_WIDTH / 2.0, PLAYFIELD_HEIGHT / 2.0),
            new_combo,
            kind: HitObjectKind::Spinner { end_time },
            stack_offset: 0.0,
        }
    }

    /// Last millisecond at which the object is still on screen.
    /// Circles end where they start.
    pub fn end_time(&self) -> i64 {
        match self.kind {
            HitObjectKind::Circle => self.time,
            HitObjectKind::Slider { end_time, .. }
            | HitObjectKind::Spinner { end_time }
            | HitObjectKind::HoldNote { end_time } => end_time,
        }
    }

    /// `pos` moved by this object's stack offset
    pub fn stacked(&self, pos: Position) -> Position {
        Position::new(pos.x + self.stack_offset, pos.y + self.stack_offset)
    }

    /// Where the object is drawn
    pub fn stacked_position(&self) -> Position {
        self.stacked(self.position)
    }

    pub fn is_spinner(&self) -> bool {
        matches!(self.kind, HitObjectKind::Spinner { .. })
    }

    pub fn curve(&self) -> Option<&[Position]> {
        match &self.kind {
            HitObjectKind::Slider { curve, .. } => Some(curve),
            HitObjectKind::Circle
            | HitObjectKind::Spinner { .. }
            | HitObjectKind::HoldNote { .. } => None,
        }
    }
}

/// A validated beatmap ready for playback
#[derive(Debug, Clone)]
pub struct Beatmap {
    /// Path of the .osu file
    pub path: PathBuf,
    pub artist: String,
    pub title: String,
    pub version: String,
    pub creator: String,
    pub approach_rate: f32,
    pub circle_size: f32,
    /// Audio track, resolved against the map's folder
    pub audio_path: PathBuf,
    /// Background image, resolved against the map's folder
    pub background_path: PathBuf,
    /// Custom combo colours, empty if the map uses the skin's
    pub combo_colors: Vec<[u8; 3]>,
    /// Hit objects in non-decreasing time order
    pub hit_objects: Vec<HitObject>,
}

impl Beatmap {
    /// Parse and validate a .osu file
    pub fn from_path(path: &Path) -> Result<Self, MapError> {
        let parsed: rosu_map::Beatmap = rosu_map::from_path(path).map_err(|e| MapError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        Self::from_parsed(parsed, path)
    }

    /// Convert an already parsed beatmap. Relative asset paths are resolved
    /// against the parent of `path`.
    pub fn from_parsed(mut parsed: rosu_map::Beatmap, path: &Path) -> Result<Self, MapError> {
        if parsed.background_file.is_empty() {
            return Err(MapError::MissingBackground);
        }

        let approach_rate = check_difficulty("ApproachRate", parsed.approach_rate)?;
        let circle_size = check_difficulty("CircleSize", parsed.circle_size)?;

        let mut hit_objects = Vec::with_capacity(parsed.hit_objects.len());
        let mut end_positions = Vec::with_capacity(parsed.hit_objects.len());
        let mut curve_buffers = CurveBuffers::default();

        for hit_object in parsed.hit_objects.iter_mut() {
            let time = hit_object.start_time.round() as i64;
            let mut tail = None;

            let converted = match &mut hit_object.kind {
                ParsedKind::Circle(circle) => {
                    HitObject::circle(time, Position::new(circle.pos.x, circle.pos.y), circle.new_combo)
                }
                ParsedKind::Slider(slider) => {
                    // curve.path() is relative to the head
                    let head = Position::new(slider.pos.x, slider.pos.y);
                    let curve: Vec<Position> = {
                        let curve = slider.path.curve_with_bufs(&mut curve_buffers);
                        curve
                            .path()
                            .iter()
                            .map(|pos| Position::new(head.x + pos.x, head.y + pos.y))
                            .collect()
                    };

                    let duration = slider.duration_with_bufs(&mut curve_buffers);
                    let span_count = slider.span_count();
                    let end_time = (hit_object.start_time + duration * span_count as f64).round() as i64;
                    if span_count % 2 == 1 {
                        tail = curve.last().copied();
                    }

                    if end_time <= time {
                        return Err(MapError::ZeroLengthSlider { time, end_time });
                    }
                    if curve.is_empty() {
                        return Err(MapError::EmptyCurve { time });
                    }

                    HitObject::slider(time, end_time, head, slider.new_combo, curve)
                }
                ParsedKind::Spinner(spinner) => {
                    let end_time = (hit_object.start_time + spinner.duration).round() as i64;
                    HitObject::spinner(time, end_time, spinner.new_combo)
                }
                ParsedKind::Hold(hold) => HitObject {
                    time,
                    position: Position::new(hold.pos_x, PLAYFIELD_HEIGHT / 2.0),
                    new_combo: false,
                    kind: HitObjectKind::HoldNote {
                        end_time: (hit_object.start_time + hold.duration).round() as i64,
                    },
                    stack_offset: 0.0,
                },
            };

            if let Some(previous) = hit_objects.last().map(|o: &HitObject| o.time) {
                if converted.time < previous {
                    return Err(MapError::Unsorted {
                        time: converted.time,
                        previous,
                    });
                }
            }

            end_positions.push(tail.unwrap_or(converted.position));
            hit_objects.push(converted);
        }

        if hit_objects.is_empty() {
            return Err(MapError::NoHitObjects);
        }

        if parsed.format_version >= STACKING_FORMAT_VERSION {
            let preempt = TimingWindow::from_approach_rate(approach_rate).preempt;
            let stack_threshold = preempt * f64::from(parsed.stack_leniency);
            apply_stacking(&mut hit_objects, &end_positions, stack_threshold, circle_size);
        }

        let folder = path.parent().unwrap_or_else(|| Path::new(""));
        let combo_colors = parsed
            .custom_combo_colors
            .iter()
            .map(|c| [c.red(), c.green(), c.blue()])
            .collect();

        Ok(Self {
            path: path.to_path_buf(),
            artist: parsed.artist,
            title: parsed.title,
            version: parsed.version,
            creator: parsed.creator,
            approach_rate,
            circle_size,
            audio_path: folder.join(&parsed.audio_file),
            background_path: folder.join(&parsed.background_file),
            combo_colors,
            hit_objects,
        })
    }

    /// "Artist - Title [Version]"
    pub fn display_name(&self) -> String {
        format!("{} - {} [{}]", self.artist, self.title, self.version)
    }
}

fn check_difficulty(field: &'static str, value: f32) -> Result<f32, MapError> {
    if value.is_finite() && (0.0..=10.0).contains(&value) {
        Ok(value)
    } else {
        Err(MapError::InvalidDifficulty { field, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAP: &str = "osu file format v14

[General]
AudioFilename: audio.mp3

[Metadata]
Title:Test Song
Artist:Someone
Creator:Mapper
Version:Hard

[Difficulty]
HPDrainRate:5
CircleSize:4
OverallDifficulty:8
ApproachRate:9
SliderMultiplier:1.4
SliderTickRate:1

[Events]
0,0,\"bg.jpg\",0,0

[TimingPoints]
0,500,4,2,0,50,1,0

[HitObjects]
256,192,1000,5,0,0:0:0:0:
300,200,1500,1,0,0:0:0:0:
";

    fn parse(content: &str) -> rosu_map::Beatmap {
        rosu_map::from_str(content).expect("test map parses")
    }

    #[test]
    fn converts_circles() {
        let map = Beatmap::from_parsed(parse(MAP), Path::new("songs/set/map.osu")).unwrap();

        assert_eq!(map.hit_objects.len(), 2);
        assert_eq!(map.hit_objects[0].time, 1000);
        assert!(map.hit_objects[0].new_combo);
        assert!(!map.hit_objects[1].new_combo);
        assert_eq!(map.hit_objects[1].position, Position::new(300.0, 200.0));
        assert_eq!(map.approach_rate, 9.0);
        assert_eq!(map.circle_size, 4.0);
        assert_eq!(map.audio_path, Path::new("songs/set/audio.mp3"));
        assert_eq!(map.background_path, Path::new("songs/set/bg.jpg"));
        assert_eq!(map.display_name(), "Someone - Test Song [Hard]");
    }

    #[test]
    fn overlapping_circles_are_stacked() {
        let content = MAP.replace("300,200,1500,1,0,0:0:0:0:", "256,192,1200,1,0,0:0:0:0:");
        let map = Beatmap::from_parsed(parse(&content), Path::new("map.osu")).unwrap();

        assert!(map.hit_objects[0].stack_offset < 0.0);
        assert_eq!(map.hit_objects[1].stack_offset, 0.0);
        assert_eq!(map.hit_objects[0].position, Position::new(256.0, 192.0));
        assert!(map.hit_objects[0].stacked_position().x < 256.0);
    }

    #[test]
    fn missing_background_is_rejected() {
        let content = MAP.replace("0,0,\"bg.jpg\",0,0", "");
        let err = Beatmap::from_parsed(parse(&content), Path::new("map.osu")).unwrap_err();
        assert!(matches!(err, MapError::MissingBackground));
    }

    #[test]
    fn empty_map_is_rejected() {
        let content = MAP
            .replace("256,192,1000,5,0,0:0:0:0:", "")
            .replace("300,200,1500,1,0,0:0:0:0:", "");
        let err = Beatmap::from_parsed(parse(&content), Path::new("map.osu")).unwrap_err();
        assert!(matches!(err, MapError::NoHitObjects));
    }

    #[test]
    fn difficulty_out_of_range_is_rejected() {
        assert!(check_difficulty("ApproachRate", 10.0).is_ok());
        assert!(check_difficulty("ApproachRate", 0.0).is_ok());
        assert!(matches!(
            check_difficulty("ApproachRate", 11.0),
            Err(MapError::InvalidDifficulty { field: "ApproachRate", .. })
        ));
        assert!(check_difficulty("CircleSize", f32::NAN).is_err());
    }

    #[test]
    fn end_time_by_kind() {
        let circle = HitObject::circle(100, Position::default(), false);
        let slider = HitObject::slider(100, 400, Position::default(), false, vec![Position::default()]);
        let spinner = HitObject::spinner(100, 900, true);

        assert_eq!(circle.end_time(), 100);
        assert_eq!(slider.end_time(), 400);
        assert_eq!(spinner.end_time(), 900);
        assert!(spinner.is_spinner());
        assert!(circle.curve().is_none());
        assert_eq!(slider.curve().map(<[Position]>::len), Some(1));
    }
}
