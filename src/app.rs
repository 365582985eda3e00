//! Main application implementing eframe::App

use crate::audio::AudioChannel;
use crate::frame::{FrameClock, FrameDriver};
use crate::library::MapLibrary;
use crate::renderer::{BackgroundCache, PlayfieldRenderer};
use crate::settings::{DebugMode, Settings};
use egui::{Color32, Key, Pos2, Rect, Stroke, Vec2};
use rand::rngs::ThreadRng;
use std::collections::VecDeque;
use std::time::Duration;

const FRAMETIME_HISTORY_SIZE: usize = 120;

/// Input collected from one egui frame
#[derive(Debug, Default)]
struct FrameInput {
    random_map: bool,
    toggle_debug: bool,
    skip: bool,
    force_end: bool,
    quit: bool,
    volume_steps: i32,
    pointer: Option<Pos2>,
}

pub struct SimulationApp {
    driver: FrameDriver,
    library: MapLibrary,
    rng: ThreadRng,
    clock: FrameClock,
    backgrounds: BackgroundCache,
    /// Time between repaints for the fps cap
    frame_interval: Duration,
    /// Frame time history for graph (in milliseconds)
    frametime_history: VecDeque<f32>,
}

impl SimulationApp {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        settings: Settings,
        library: MapLibrary,
        audio: Box<dyn AudioChannel>,
    ) -> Self {
        let frame_interval = Duration::from_secs_f64(1.0 / f64::from(settings.fps));

        Self {
            driver: FrameDriver::new(settings, audio),
            library,
            rng: rand::rng(),
            clock: FrameClock::new(),
            backgrounds: BackgroundCache::default(),
            frame_interval,
            frametime_history: VecDeque::with_capacity(FRAMETIME_HISTORY_SIZE),
        }
    }

    fn read_input(ctx: &egui::Context) -> FrameInput {
        ctx.input(|input| {
            let scroll = input.raw_scroll_delta.y;

            FrameInput {
                random_map: input.key_pressed(Key::R),
                toggle_debug: input.key_pressed(Key::D),
                skip: input.key_pressed(Key::Space),
                force_end: input.key_pressed(Key::F),
                quit: input.key_pressed(Key::Escape),
                volume_steps: if scroll > 0.0 {
                    1
                } else if scroll < 0.0 {
                    -1
                } else {
                    0
                },
                pointer: input.pointer.hover_pos(),
            }
        })
    }

    fn handle_input(&mut self, ctx: &egui::Context) {
        let input = Self::read_input(ctx);

        if input.quit {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }
        if input.random_map && self.driver.select_random_map(&self.library, &mut self.rng) {
            // Keep the load time out of the first frame
            self.clock.reset();
        }
        if input.toggle_debug {
            self.driver.toggle_debug();
        }
        if input.skip {
            self.driver.skip();
        }
        if input.force_end {
            self.driver.force_end();
        }
        if input.volume_steps != 0 {
            self.driver.change_volume(input.volume_steps);
        }
        if let Some(pos) = input.pointer {
            self.driver.set_cursor(pos);
        }
    }

    fn record_frametime(&mut self, frametime_ms: f32) {
        if self.frametime_history.len() >= FRAMETIME_HISTORY_SIZE {
            self.frametime_history.pop_front();
        }
        self.frametime_history.push_back(frametime_ms);
    }

    fn average_frametime(&self) -> Option<f32> {
        if self.frametime_history.is_empty() {
            return None;
        }
        Some(self.frametime_history.iter().sum::<f32>() / self.frametime_history.len() as f32)
    }

    fn draw_fps(&self, painter: &egui::Painter, screen: Rect) {
        let Some(avg_ft) = self.average_frametime() else {
            return;
        };
        let fps = if avg_ft > 0.0 { 1000.0 / avg_ft } else { 0.0 };

        painter.text(
            screen.max - Vec2::new(8.0, 8.0),
            egui::Align2::RIGHT_BOTTOM,
            format!("{:.0} fps", fps),
            egui::FontId::monospace(12.0),
            Color32::from_rgb(180, 180, 180),
        );
    }

    /// Draw frametime graph
    fn draw_frametime_graph(&self, painter: &egui::Painter, rect: Rect) {
        if self.frametime_history.is_empty() {
            return;
        }

        painter.rect_filled(rect, 4.0, Color32::from_rgba_unmultiplied(0, 0, 0, 180));
        painter.rect_stroke(rect, 4.0, Stroke::new(1.0, Color32::from_rgb(60, 60, 80)));

        // Scale to at least 33ms so a steady 60fps sits mid-graph
        let scale_max = self.frametime_history.iter().copied().fold(33.3f32, f32::max);
        let target_ms = self.frame_interval.as_secs_f32() * 1000.0;
        let target_y = rect.max.y - (target_ms / scale_max) * rect.height();

        if target_y > rect.min.y {
            painter.line_segment(
                [Pos2::new(rect.min.x, target_y), Pos2::new(rect.max.x, target_y)],
                Stroke::new(1.0, Color32::from_rgba_unmultiplied(0, 255, 0, 100)),
            );
        }

        let bar_width = rect.width() / FRAMETIME_HISTORY_SIZE as f32;
        for (i, &ft) in self.frametime_history.iter().enumerate() {
            let x = rect.min.x + i as f32 * bar_width;
            let y = rect.max.y - (ft / scale_max) * rect.height();

            let color = if ft <= target_ms + 1.0 {
                Color32::from_rgb(0, 255, 100)
            } else if ft <= target_ms * 2.0 {
                Color32::from_rgb(255, 255, 0)
            } else {
                Color32::from_rgb(255, 80, 80)
            };

            let bar_rect = Rect::from_min_max(Pos2::new(x, y), Pos2::new(x + bar_width.max(1.0), rect.max.y));
            painter.rect_filled(bar_rect, 0.0, color);
        }

        if let Some(&current_ft) = self.frametime_history.back() {
            painter.text(
                Pos2::new(rect.min.x + 4.0, rect.min.y + 2.0),
                egui::Align2::LEFT_TOP,
                format!("{:.0}ms", current_ft),
                egui::FontId::monospace(10.0),
                Color32::WHITE,
            );
        }
    }
}

impl eframe::App for SimulationApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let delta_ms = self.clock.tick();
        self.record_frametime(delta_ms as f32);

        self.handle_input(ctx);

        egui::CentralPanel::default()
            .frame(egui::Frame::none().fill(Color32::BLACK))
            .show(ctx, |ui| {
                let screen = ui.max_rect();
                let painter = ui.painter_at(screen);
                let actual_playfield = self.driver.resolution().actual_playfield_rect();

                let mut renderer = PlayfieldRenderer::new(&painter, &mut self.backgrounds, screen, actual_playfield);
                self.driver.tick(delta_ms, &mut renderer);

                if self.driver.debug_mode() == DebugMode::Full {
                    let graph_rect = Rect::from_min_size(
                        Pos2::new(screen.max.x - 210.0, screen.min.y + 10.0),
                        Vec2::new(200.0, 60.0),
                    );
                    self.draw_frametime_graph(&painter, graph_rect);
                }
                self.draw_fps(&painter, screen);

                ui.allocate_rect(screen, egui::Sense::hover());
            });

        if !self.driver.is_playing() {
            self.backgrounds.clear();
        }

        ctx.request_repaint_after(self.frame_interval);
    }
}
