//! osu! beatmap playback: hit object windowing, gameplay clock and an
//! egui front end

pub mod app;
pub mod audio;
pub mod beatmap;
pub mod combo;
pub mod error;
pub mod frame;
pub mod library;
pub mod objects;
pub mod renderer;
pub mod resolution;
pub mod settings;
pub mod skin;
pub mod stacking;
pub mod state;
