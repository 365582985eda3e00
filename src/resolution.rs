//! Screen geometry: fits the osu! playfield into an arbitrary window

use crate::beatmap::{Position, PLAYFIELD_HEIGHT, PLAYFIELD_WIDTH};
use egui::{Pos2, Rect, Vec2};

/// Logical window the visual playfield is scaled from
pub const OSU_PIXEL_WINDOW: Vec2 = Vec2::new(640.0, 480.0);

/// Share of the screen the visual playfield may occupy on each axis
const PLAYFIELD_SCREEN_SHARE: f32 = 0.8;

/// Maps osu!pixels onto screen pixels for one window size.
///
/// Two playfields are tracked: the visual one (4:3, 80% of the screen) and
/// the 512x384 one all hit objects are placed in. Object and cursor
/// positions always use the latter.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolutionManager {
    pub screen_size: Vec2,
    /// Visual playfield size, rounded to whole pixels
    pub playfield_size: Vec2,
    pub placement_offset: Vec2,
    pub osu_pixel_multiplier: f32,
    pub actual_playfield_size: Vec2,
    pub actual_placement_offset: Vec2,
    /// Hit circle diameter in pixels, zero until a map is loaded
    pub object_size: i32,
}

impl ResolutionManager {
    pub fn new(screen_size: Vec2) -> Self {
        let w = screen_size.x * PLAYFIELD_SCREEN_SHARE;
        let h = screen_size.y * PLAYFIELD_SCREEN_SHARE;

        let width_bound_height = w / OSU_PIXEL_WINDOW.x * OSU_PIXEL_WINDOW.y;
        let playfield_size = if width_bound_height > h {
            Vec2::new(h / OSU_PIXEL_WINDOW.y * OSU_PIXEL_WINDOW.x, h)
        } else {
            Vec2::new(w, width_bound_height)
        }
        .round();

        let osu_pixel_multiplier = playfield_size.x / OSU_PIXEL_WINDOW.x;
        let actual_playfield_size = Vec2::new(
            PLAYFIELD_WIDTH * osu_pixel_multiplier,
            PLAYFIELD_HEIGHT * osu_pixel_multiplier,
        );

        Self {
            screen_size,
            playfield_size,
            placement_offset: centre_in(screen_size, playfield_size),
            osu_pixel_multiplier,
            actual_playfield_size,
            actual_placement_offset: centre_in(screen_size, actual_playfield_size),
            object_size: 0,
        }
    }

    /// Size hit objects for a map's circle size
    pub fn load_size(&mut self, circle_size: f32) {
        self.object_size = object_size(circle_size, self.osu_pixel_multiplier);
    }

    pub fn playfield_rect(&self) -> Rect {
        Rect::from_min_size(self.placement_offset.to_pos2(), self.playfield_size)
    }

    pub fn actual_playfield_rect(&self) -> Rect {
        Rect::from_min_size(self.actual_placement_offset.to_pos2(), self.actual_playfield_size)
    }

    /// Top-left pixel of a hit circle centred on `pos`
    pub fn hitcircle_position(&self, pos: Position) -> Pos2 {
        let half = (self.object_size / 2) as f32;
        Pos2::new(
            (pos.x * self.osu_pixel_multiplier + self.actual_placement_offset.x - half).round(),
            (pos.y * self.osu_pixel_multiplier + self.actual_placement_offset.y - half).round(),
        )
    }

    /// Cursor positions are already in pixels relative to the playfield
    pub fn cursor_position(&self, pos: Vec2) -> Pos2 {
        (self.actual_placement_offset + pos).to_pos2()
    }
}

/// Hit circle diameter in pixels for a circle size
pub fn object_size(circle_size: f32, osu_pixel_multiplier: f32) -> i32 {
    ((54.4 - 4.48 * circle_size) * 2.0 * osu_pixel_multiplier).round() as i32
}

fn centre_in(outer: Vec2, inner: Vec2) -> Vec2 {
    ((outer - inner) / 2.0).round()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fits_width_on_4_3_screen() {
        let res = ResolutionManager::new(Vec2::new(640.0, 480.0));

        assert_eq!(res.playfield_size, Vec2::new(512.0, 384.0));
        assert_eq!(res.placement_offset, Vec2::new(64.0, 48.0));
        assert!((res.osu_pixel_multiplier - 0.8).abs() < 1e-6);
        assert_eq!(res.actual_placement_offset, Vec2::new(115.0, 86.0));
    }

    #[test]
    fn fits_height_on_wide_screen() {
        let res = ResolutionManager::new(Vec2::new(1920.0, 1080.0));

        assert_eq!(res.playfield_size, Vec2::new(1152.0, 864.0));
        assert_eq!(res.placement_offset, Vec2::new(384.0, 108.0));
        assert!((res.osu_pixel_multiplier - 1.8).abs() < 1e-6);
        assert!((res.actual_playfield_size.x - 921.6).abs() < 1e-3);
        assert!((res.actual_playfield_size.y - 691.2).abs() < 1e-3);
        assert_eq!(res.actual_placement_offset, Vec2::new(499.0, 194.0));
    }

    #[test]
    fn object_size_matches_circle_size_formula() {
        assert_eq!(object_size(4.0, 0.8), 58);
        assert_eq!(object_size(4.0, 1.8), 131);
        assert_eq!(object_size(0.0, 1.0), 109);
        assert_eq!(object_size(10.0, 1.0), 19);
    }

    #[test]
    fn hitcircle_position_is_recentred() {
        let mut res = ResolutionManager::new(Vec2::new(1920.0, 1080.0));
        res.load_size(4.0);

        assert_eq!(res.object_size, 131);
        assert_eq!(res.hitcircle_position(Position::new(256.0, 192.0)), Pos2::new(895.0, 475.0));
        assert_eq!(res.hitcircle_position(Position::new(0.0, 0.0)), Pos2::new(434.0, 129.0));
    }

    #[test]
    fn cursor_position_only_translates() {
        let res = ResolutionManager::new(Vec2::new(640.0, 480.0));
        assert_eq!(res.cursor_position(Vec2::new(10.0, 20.0)), Pos2::new(125.0, 106.0));
    }

    #[test]
    fn debug_rects() {
        let res = ResolutionManager::new(Vec2::new(640.0, 480.0));
        assert_eq!(
            res.playfield_rect(),
            Rect::from_min_size(Pos2::new(64.0, 48.0), Vec2::new(512.0, 384.0))
        );
        assert_eq!(res.actual_playfield_rect().min, Pos2::new(115.0, 86.0));
    }
}
