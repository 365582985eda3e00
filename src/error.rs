//! Per-map data errors

use std::path::PathBuf;
use thiserror::Error;

/// A problem with a single beatmap. Fatal to that map only: the library
/// drops the map and keeps going.
#[derive(Error, Debug)]
pub enum MapError {
    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("no background event")]
    MissingBackground,

    #[error("beatmap has no hit objects")]
    NoHitObjects,

    #[error("invalid {field}: {value}")]
    InvalidDifficulty { field: &'static str, value: f32 },

    #[error("slider at {time}ms has zero length (ends at {end_time}ms)")]
    ZeroLengthSlider { time: i64, end_time: i64 },

    #[error("slider at {time}ms has no curve points")]
    EmptyCurve { time: i64 },

    #[error("hit object at {time}ms is out of order (previous at {previous}ms)")]
    Unsorted { time: i64, previous: i64 },
}
