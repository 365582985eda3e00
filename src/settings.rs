//! Command line arguments and the read-only settings built from them

use clap::{Parser, ValueEnum};
use egui::Vec2;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum DebugMode {
    /// No debug overlay
    #[default]
    None,
    /// Map line and playfield outlines
    Few,
    /// Also the current offset and clock ticks
    Full,
}

#[derive(Parser, Debug)]
#[command(name = "osu-simulation")]
#[command(about = "osu! beatmap playback with hit object windowing")]
pub struct Args {
    /// Folder with one subfolder per mapset
    #[arg(long, short, default_value = "maps")]
    pub songs: PathBuf,

    /// Window width in pixels
    #[arg(long, default_value_t = 640)]
    pub width: u32,

    /// Window height in pixels
    #[arg(long, default_value_t = 480)]
    pub height: u32,

    /// Frame rate cap
    #[arg(long, short, default_value_t = 60)]
    pub fps: u32,

    /// Music volume, 0-100
    #[arg(long, short, default_value_t = 25, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub volume: u8,

    /// Debug overlay detail
    #[arg(long, short, value_enum, default_value_t = DebugMode::None)]
    pub debug_mode: DebugMode,

    /// Open the window without decorations
    #[arg(long, short)]
    pub borderless: bool,

    /// Don't draw map backgrounds
    #[arg(long)]
    pub no_background: bool,

    /// Don't play any audio
    #[arg(long)]
    pub no_audio: bool,

    /// Assign combo colours on the main thread before playback starts
    #[arg(long)]
    pub eager_load: bool,
}

/// Settings for one run. Built once at startup and never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub songs_dir: PathBuf,
    pub screen_size: Vec2,
    pub fps: u32,
    /// 0.0 to 1.0
    pub volume: f64,
    pub debug_mode: DebugMode,
    pub borderless: bool,
    pub background_enabled: bool,
    pub audio_enabled: bool,
    pub background_load: bool,
}

impl From<Args> for Settings {
    fn from(args: Args) -> Self {
        Self {
            songs_dir: args.songs,
            screen_size: Vec2::new(args.width.max(1) as f32, args.height.max(1) as f32),
            fps: args.fps.max(1),
            volume: f64::from(args.volume) / 100.0,
            debug_mode: args.debug_mode,
            borderless: args.borderless,
            background_enabled: !args.no_background,
            audio_enabled: !args.no_audio,
            background_load: !args.eager_load,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            songs_dir: PathBuf::from("maps"),
            screen_size: Vec2::new(640.0, 480.0),
            fps: 60,
            volume: 0.25,
            debug_mode: DebugMode::None,
            borderless: false,
            background_enabled: true,
            audio_enabled: true,
            background_load: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_classic_window() {
        let args = Args::try_parse_from(["osu-simulation"]).unwrap();
        let settings = Settings::from(args);

        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn flags_are_inverted_into_settings() {
        let args = Args::try_parse_from([
            "osu-simulation",
            "--songs",
            "/tmp/songs",
            "--width",
            "1920",
            "--height",
            "1080",
            "--volume",
            "50",
            "--debug-mode",
            "full",
            "--no-audio",
            "--no-background",
            "--eager-load",
        ])
        .unwrap();
        let settings = Settings::from(args);

        assert_eq!(settings.songs_dir, PathBuf::from("/tmp/songs"));
        assert_eq!(settings.screen_size, Vec2::new(1920.0, 1080.0));
        assert_eq!(settings.volume, 0.5);
        assert_eq!(settings.debug_mode, DebugMode::Full);
        assert!(!settings.audio_enabled);
        assert!(!settings.background_enabled);
        assert!(!settings.background_load);
    }

    #[test]
    fn volume_above_100_is_rejected() {
        assert!(Args::try_parse_from(["osu-simulation", "--volume", "101"]).is_err());
    }
}
