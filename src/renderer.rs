//! Draws frames onto an egui painter

use crate::frame::{centre_of, DrawSink, ObjectSprite, SpriteShape};
use crate::skin::SLIDER_BALL_FRAMES;
use anyhow::{Context, Result};
use egui::{epaint::Vertex, Color32, FontId, Mesh, Pos2, Rect, Stroke, TextureHandle, Vec2};
use std::path::{Path, PathBuf};

const CIRCLE_SEGMENTS: usize = 32;
const BORDER_WIDTH: f32 = 3.0;
/// Slider paths are thinned to roughly one point per this many pixels
const SLIDER_POINT_SPACING: f32 = 3.0;

fn with_alpha(color: Color32, alpha: u8) -> Color32 {
    Color32::from_rgba_unmultiplied(color.r(), color.g(), color.b(), alpha)
}

fn darken(color: Color32, factor: f32) -> Color32 {
    let scale = |c: u8| (c as f32 * factor) as u8;
    Color32::from_rgb(scale(color.r()), scale(color.g()), scale(color.b()))
}

/// The current map's background texture, loaded on first use
#[derive(Default)]
pub struct BackgroundCache {
    path: Option<PathBuf>,
    texture: Option<TextureHandle>,
}

impl BackgroundCache {
    /// Texture for `path`, decoding it if it isn't the cached one.
    /// A background that fails to load is only reported once.
    pub fn get(&mut self, ctx: &egui::Context, path: &Path) -> Option<&TextureHandle> {
        if self.path.as_deref() != Some(path) {
            self.path = Some(path.to_path_buf());
            self.texture = match load_texture(ctx, path) {
                Ok(texture) => Some(texture),
                Err(e) => {
                    log::warn!("{:#}", e);
                    None
                }
            };
        }
        self.texture.as_ref()
    }

    pub fn clear(&mut self) {
        self.path = None;
        self.texture = None;
    }
}

fn load_texture(ctx: &egui::Context, path: &Path) -> Result<TextureHandle> {
    let image = image::open(path)
        .with_context(|| format!("Failed to load background {}", path.display()))?
        .to_rgba8();
    let size = [image.width() as usize, image.height() as usize];
    let pixels = egui::ColorImage::from_rgba_unmultiplied(size, image.as_raw());

    Ok(ctx.load_texture(path.to_string_lossy(), pixels, egui::TextureOptions::LINEAR))
}

/// Draw sink for one egui frame
pub struct PlayfieldRenderer<'a> {
    painter: &'a egui::Painter,
    backgrounds: &'a mut BackgroundCache,
    screen: Rect,
    /// Object placement area, spinners are centred on it
    actual_playfield: Rect,
}

impl<'a> PlayfieldRenderer<'a> {
    pub fn new(
        painter: &'a egui::Painter,
        backgrounds: &'a mut BackgroundCache,
        screen: Rect,
        actual_playfield: Rect,
    ) -> Self {
        Self {
            painter,
            backgrounds,
            screen,
            actual_playfield,
        }
    }

    fn draw_circle(&self, centre: Pos2, radius: f32, fill: Color32, border: Color32) {
        let inner = radius - BORDER_WIDTH;
        self.painter.add(filled_circle_mesh(centre, inner, fill));
        self.painter.add(ring_mesh(centre, radius, inner, border));
    }

    fn draw_combo_number(&self, centre: Pos2, radius: f32, number: u32, alpha: u8) {
        self.painter.text(
            centre,
            egui::Align2::CENTER_CENTER,
            number.to_string(),
            FontId::proportional((radius * 0.8).max(12.0)),
            with_alpha(Color32::WHITE, alpha),
        );
    }

    fn draw_approach_circle(&self, sprite: &ObjectSprite, radius: f32) {
        if sprite.approach_scale <= 1.0 {
            return;
        }
        self.painter.circle_stroke(
            sprite.centre(),
            radius * sprite.approach_scale,
            Stroke::new(2.0, with_alpha(sprite.color, sprite.opacity)),
        );
    }

    fn draw_slider(&self, sprite: &ObjectSprite, path: &[Pos2], ball: Option<Pos2>, ball_frame: usize) {
        let radius = sprite.size / 2.0;
        let alpha = sprite.opacity;
        let body = with_alpha(darken(sprite.color, 0.35), alpha);
        let border = with_alpha(Color32::WHITE, alpha);

        let centres = thin_path(path, sprite.size);
        if centres.len() >= 2 {
            let (body_mesh, border_mesh) = slider_body_mesh(&centres, radius, body, border);
            self.painter.add(body_mesh);
            self.painter.add(border_mesh);
        }
        if let Some(&tail) = centres.last() {
            self.draw_circle(tail, radius, body, border);
        }

        let head = sprite.centre();
        self.draw_circle(head, radius, with_alpha(sprite.color, alpha), border);
        self.draw_combo_number(head, radius, sprite.combo.number, alpha);

        if let Some(ball) = ball {
            let centre = centre_of(ball, sprite.size);
            self.painter.circle_filled(centre, radius * 0.8, with_alpha(Color32::WHITE, alpha));

            let angle = ball_frame as f32 / SLIDER_BALL_FRAMES as f32 * std::f32::consts::TAU;
            let mark = centre + Vec2::angled(angle) * radius * 0.6;
            self.painter.line_segment(
                [centre, mark],
                Stroke::new(3.0, with_alpha(sprite.color, alpha)),
            );

            // Follow circle
            self.painter.circle_stroke(
                centre,
                radius,
                Stroke::new(3.0, with_alpha(Color32::from_rgb(255, 200, 80), alpha)),
            );
        }

        self.draw_approach_circle(sprite, radius);
    }

    fn draw_spinner(&self, sprite: &ObjectSprite, progress: f32) {
        let centre = self.actual_playfield.center();
        let stroke = Stroke::new(2.0, with_alpha(Color32::WHITE, sprite.opacity));
        let max_radius = self.actual_playfield.height() * 0.45;

        for ring in 1..=3 {
            self.painter.circle_stroke(centre, max_radius * ring as f32 / 3.0, stroke);
        }

        let fill = (f32::from(sprite.opacity) * progress) as u8;
        self.painter.circle_filled(
            centre,
            max_radius * 0.2 * progress,
            with_alpha(Color32::WHITE, fill),
        );

        let angle = progress * std::f32::consts::TAU * 8.0;
        self.painter.line_segment([centre, centre + Vec2::angled(angle) * max_radius], stroke);
    }
}

impl DrawSink for PlayfieldRenderer<'_> {
    fn background(&mut self, path: &Path, opacity: u8) {
        let Some(texture) = self.backgrounds.get(self.painter.ctx(), path) else {
            return;
        };

        // Scale to cover the whole window, cropping the overflow
        let image_size = texture.size_vec2();
        let scale = (self.screen.width() / image_size.x).max(self.screen.height() / image_size.y);
        let rect = Rect::from_center_size(self.screen.center(), image_size * scale);

        self.painter.image(
            texture.id(),
            rect,
            Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0)),
            Color32::from_white_alpha(opacity),
        );
    }

    fn hit_object(&mut self, sprite: &ObjectSprite) {
        match &sprite.shape {
            SpriteShape::Circle => {
                let radius = sprite.size / 2.0;
                let centre = sprite.centre();
                self.draw_circle(
                    centre,
                    radius,
                    with_alpha(sprite.color, sprite.opacity),
                    with_alpha(Color32::WHITE, sprite.opacity),
                );
                self.draw_combo_number(centre, radius, sprite.combo.number, sprite.opacity);
                self.draw_approach_circle(sprite, radius);
            }
            SpriteShape::Slider { path, ball, ball_frame } => {
                self.draw_slider(sprite, path, *ball, *ball_frame);
            }
            SpriteShape::Spinner { progress } => self.draw_spinner(sprite, *progress),
        }
    }

    fn cursor(&mut self, pos: Pos2) {
        self.painter.circle_filled(pos, 8.0, Color32::from_rgb(255, 220, 80));
        self.painter.circle_stroke(pos, 8.0, Stroke::new(2.0, Color32::WHITE));
    }

    fn status(&mut self, text: &str) {
        let pos = Pos2::new(self.screen.center().x, self.screen.max.y - 40.0);
        self.painter.text(
            pos + Vec2::splat(2.0),
            egui::Align2::CENTER_CENTER,
            text,
            FontId::proportional(20.0),
            Color32::from_black_alpha(160),
        );
        self.painter.text(
            pos,
            egui::Align2::CENTER_CENTER,
            text,
            FontId::proportional(20.0),
            Color32::WHITE,
        );
    }

    fn debug_text(&mut self, lines: &[String]) {
        let mut pos = self.screen.min + Vec2::new(8.0, 8.0);
        for line in lines {
            self.painter.text(
                pos,
                egui::Align2::LEFT_TOP,
                line,
                FontId::monospace(12.0),
                Color32::from_rgb(200, 255, 200),
            );
            pos.y += 15.0;
        }
    }

    fn playfield_outline(&mut self, visual: Rect, actual: Rect) {
        self.painter.rect_stroke(visual, 0.0, Stroke::new(1.0, Color32::from_rgb(80, 80, 255)));
        self.painter.rect_stroke(actual, 0.0, Stroke::new(1.0, Color32::from_rgb(255, 80, 80)));
    }

    fn volume(&mut self, volume: f64) {
        let size = Vec2::new(160.0, 36.0);
        let rect = Rect::from_min_size(self.screen.max - size - Vec2::new(10.0, 40.0), size);
        self.painter.rect_filled(rect, 4.0, Color32::from_rgba_unmultiplied(0, 0, 0, 180));

        self.painter.text(
            rect.min + Vec2::new(8.0, 4.0),
            egui::Align2::LEFT_TOP,
            format!("Volume: {:.0}%", volume * 100.0),
            FontId::proportional(12.0),
            Color32::WHITE,
        );

        let bar = Rect::from_min_size(rect.min + Vec2::new(8.0, 22.0), Vec2::new(size.x - 16.0, 6.0));
        let fill = Rect::from_min_size(bar.min, Vec2::new(bar.width() * volume as f32, bar.height()));
        self.painter.rect_filled(bar, 3.0, Color32::from_rgb(40, 40, 40));
        self.painter.rect_filled(fill, 3.0, Color32::WHITE);
    }
}

/// Centres along a slider path, thinned so long sliders stay cheap to mesh.
/// The tail point is always kept.
fn thin_path(path: &[Pos2], size: f32) -> Vec<Pos2> {
    let Some(&last) = path.last() else {
        return Vec::new();
    };

    let length: f32 = path.windows(2).map(|w| w[0].distance(w[1])).sum();
    let target = ((length / SLIDER_POINT_SPACING) as usize).clamp(2, 500);
    let step = (path.len() / target).max(1);

    path.iter()
        .step_by(step)
        .chain(std::iter::once(&last))
        .map(|&p| centre_of(p, size))
        .collect()
}

fn push_quad(mesh: &mut Mesh, corners: [Pos2; 4], color: Color32) {
    let base = mesh.vertices.len() as u32;
    for pos in corners {
        mesh.vertices.push(Vertex {
            pos,
            uv: egui::epaint::WHITE_UV,
            color,
        });
    }
    mesh.indices
        .extend_from_slice(&[base, base + 1, base + 2, base + 1, base + 3, base + 2]);
}

/// Body fill and the two border strips along a slider path
fn slider_body_mesh(centres: &[Pos2], radius: f32, body: Color32, border: Color32) -> (Mesh, Mesh) {
    let inner = radius - BORDER_WIDTH;
    let last = centres.len() - 1;

    let normals: Vec<Vec2> = (0..centres.len())
        .map(|i| {
            let prev = centres[i.saturating_sub(1)];
            let next = centres[(i + 1).min(last)];
            let tangent = (next - prev).normalized();
            Vec2::new(-tangent.y, tangent.x)
        })
        .collect();

    let mut body_mesh = Mesh::default();
    let mut border_mesh = Mesh::default();

    for i in 0..last {
        let (a, b) = (centres[i], centres[i + 1]);
        let (na, nb) = (normals[i], normals[i + 1]);

        push_quad(
            &mut body_mesh,
            [a + na * inner, a - na * inner, b + nb * inner, b - nb * inner],
            body,
        );
        push_quad(
            &mut border_mesh,
            [a + na * radius, a + na * inner, b + nb * radius, b + nb * inner],
            border,
        );
        push_quad(
            &mut border_mesh,
            [a - na * inner, a - na * radius, b - nb * inner, b - nb * radius],
            border,
        );
    }

    (body_mesh, border_mesh)
}

fn filled_circle_mesh(centre: Pos2, radius: f32, color: Color32) -> Mesh {
    let mut mesh = Mesh::default();
    mesh.colored_vertex(centre, color);

    for i in 0..=CIRCLE_SEGMENTS {
        let angle = i as f32 / CIRCLE_SEGMENTS as f32 * std::f32::consts::TAU;
        mesh.colored_vertex(centre + Vec2::angled(angle) * radius, color);
    }
    for i in 0..CIRCLE_SEGMENTS as u32 {
        mesh.add_triangle(0, i + 1, i + 2);
    }

    mesh
}

fn ring_mesh(centre: Pos2, outer: f32, inner: f32, color: Color32) -> Mesh {
    let mut mesh = Mesh::default();

    for i in 0..=CIRCLE_SEGMENTS {
        let direction = Vec2::angled(i as f32 / CIRCLE_SEGMENTS as f32 * std::f32::consts::TAU);
        mesh.colored_vertex(centre + direction * outer, color);
        mesh.colored_vertex(centre + direction * inner, color);
    }
    for i in 0..CIRCLE_SEGMENTS as u32 {
        let base = i * 2;
        mesh.add_triangle(base, base + 1, base + 2);
        mesh.add_triangle(base + 1, base + 3, base + 2);
    }

    mesh
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thin_path_keeps_tail_and_centres_points() {
        let path: Vec<Pos2> = (0..1000).map(|i| Pos2::new(i as f32, 0.0)).collect();
        let centres = thin_path(&path, 20.0);

        assert_eq!(centres.first(), Some(&Pos2::new(10.0, 10.0)));
        assert_eq!(centres.last(), Some(&Pos2::new(1009.0, 10.0)));
        assert!(centres.len() < path.len());
    }

    #[test]
    fn thin_path_of_nothing() {
        assert!(thin_path(&[], 20.0).is_empty());
    }

    #[test]
    fn slider_mesh_has_a_quad_per_segment() {
        let centres = [Pos2::new(0.0, 0.0), Pos2::new(10.0, 0.0), Pos2::new(20.0, 0.0)];
        let (body, border) = slider_body_mesh(&centres, 10.0, Color32::GRAY, Color32::WHITE);

        assert_eq!(body.indices.len(), 2 * 6);
        assert_eq!(border.indices.len(), 2 * 2 * 6);
        // Straight path: body edges sit at the inner radius
        assert_eq!(body.vertices[0].pos, Pos2::new(0.0, 10.0 - BORDER_WIDTH));
    }

    #[test]
    fn circle_meshes_close_the_loop() {
        let fill = filled_circle_mesh(Pos2::ZERO, 10.0, Color32::WHITE);
        let ring = ring_mesh(Pos2::ZERO, 10.0, 7.0, Color32::WHITE);

        assert_eq!(fill.vertices.len(), CIRCLE_SEGMENTS + 2);
        assert_eq!(ring.vertices.len(), (CIRCLE_SEGMENTS + 1) * 2);
        assert!(fill.is_valid());
        assert!(ring.is_valid());
    }

    #[test]
    fn colour_helpers() {
        assert_eq!(darken(Color32::from_rgb(200, 100, 50), 0.5), Color32::from_rgb(100, 50, 25));
        assert_eq!(with_alpha(Color32::from_rgb(1, 2, 3), 255), Color32::from_rgb(1, 2, 3));
    }
}
