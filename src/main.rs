//! osu-simulation: plays random beatmaps from a songs folder
//!
//! Usage: osu-simulation [--songs <folder>] [--width <px>] [--height <px>]

use anyhow::Result;
use clap::Parser;
use osu_simulation::app::SimulationApp;
use osu_simulation::audio;
use osu_simulation::library::MapLibrary;
use osu_simulation::settings::{Args, Settings};

fn main() -> Result<()> {
    env_logger::init();

    let settings = Settings::from(Args::parse());

    let library = match MapLibrary::scan(&settings.songs_dir) {
        Ok(library) => library,
        Err(e) => {
            log::warn!("{:#}", e);
            MapLibrary::default()
        }
    };

    let audio = audio::open_channel(settings.audio_enabled, settings.volume);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([settings.screen_size.x, settings.screen_size.y])
            .with_resizable(false)
            .with_decorations(!settings.borderless)
            .with_title("osu-simulation"),
        vsync: true,
        ..Default::default()
    };

    eframe::run_native(
        "osu-simulation",
        options,
        Box::new(move |cc| Ok(Box::new(SimulationApp::new(cc, settings, library, audio)))),
    )
    .map_err(|e| anyhow::anyhow!("Failed to run application: {}", e))
}
