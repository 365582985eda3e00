//! Combo colours and animation timing

use crate::beatmap::Beatmap;
use egui::Color32;

/// osu!'s default combo colours
pub const DEFAULT_COMBO_COLORS: [[u8; 3]; 4] = [
    [255, 192, 0],
    [0, 202, 0],
    [18, 124, 255],
    [242, 24, 57],
];

/// Slider ball animation: frames shown per object and ms per frame
pub const SLIDER_BALL_FRAMES: usize = 10;
pub const SLIDER_BALL_FRAME_DELAY: f64 = 16.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Skin {
    combo_colors: Vec<Color32>,
}

impl Default for Skin {
    fn default() -> Self {
        Self::from_rgb(&DEFAULT_COMBO_COLORS)
    }
}

impl Skin {
    fn from_rgb(colors: &[[u8; 3]]) -> Self {
        Self {
            combo_colors: colors
                .iter()
                .map(|&[r, g, b]| Color32::from_rgb(r, g, b))
                .collect(),
        }
    }

    /// The beatmap's own combo colours if it has any
    pub fn for_beatmap(beatmap: &Beatmap) -> Self {
        if beatmap.combo_colors.is_empty() {
            Self::default()
        } else {
            Self::from_rgb(&beatmap.combo_colors)
        }
    }

    pub fn combo_color_count(&self) -> usize {
        self.combo_colors.len()
    }

    pub fn combo_color(&self, index: usize) -> Color32 {
        self.combo_colors[index % self.combo_colors.len()]
    }
}

/// Frame to show `offset - start` ms into an animation, holding the
/// first frame before it starts and looping afterwards
pub fn animation_frame(start: i64, offset: i64, frame_count: usize, frame_delay: f64) -> usize {
    if frame_count == 0 || offset <= start || frame_delay <= 0.0 {
        return 0;
    }

    let elapsed = (offset - start) as f64;
    (elapsed / frame_delay).floor() as usize % frame_count
}
