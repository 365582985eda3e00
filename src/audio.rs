//! Audio playback using kira, and keeping it in step with the gameplay clock

use anyhow::{Context, Result};
use kira::{
    sound::static_sound::{StaticSoundData, StaticSoundHandle},
    AudioManager, AudioManagerSettings, Decibels, DefaultBackend, Tween,
};
use std::path::Path;

/// Where the frame driver sends audio commands
pub trait AudioChannel {
    /// Start playing `path` from `offset_ms`. The beatmap track replaces
    /// whatever track was playing before.
    fn load_and_play(&mut self, path: &Path, offset_ms: i64, is_beatmap_track: bool) -> Result<()>;

    fn stop(&mut self);

    /// Move the beatmap track to `offset_ms`
    fn seek(&mut self, offset_ms: i64);

    /// 0.0 to 1.0
    fn volume(&self) -> f64;

    fn set_volume(&mut self, volume: f64);

    fn is_playing(&self) -> bool;
}

/// Convert amplitude (0-1) to decibels: dB = 20 * log10(amplitude)
fn amplitude_to_decibels(volume: f64) -> Decibels {
    if volume <= 0.001 {
        Decibels::SILENCE
    } else {
        Decibels(20.0 * (volume as f32).log10())
    }
}

/// Audio channel backed by the system output device
pub struct KiraAudio {
    manager: AudioManager<DefaultBackend>,
    track: Option<StaticSoundHandle>,
    volume: f64,
}

impl KiraAudio {
    pub fn new(volume: f64) -> Result<Self> {
        let manager = AudioManager::<DefaultBackend>::new(AudioManagerSettings::default())
            .context("Failed to create audio manager")?;

        Ok(Self {
            manager,
            track: None,
            volume: volume.clamp(0.0, 1.0),
        })
    }
}

impl AudioChannel for KiraAudio {
    fn load_and_play(&mut self, path: &Path, offset_ms: i64, is_beatmap_track: bool) -> Result<()> {
        let sound_data = StaticSoundData::from_file(path)
            .with_context(|| format!("Failed to load audio file {}", path.display()))?
            .volume(amplitude_to_decibels(self.volume));

        if is_beatmap_track {
            self.stop();
        }

        let mut handle = self.manager.play(sound_data).context("Failed to play audio")?;
        if offset_ms > 0 {
            handle.seek_to(offset_ms as f64 / 1000.0);
        }

        if is_beatmap_track {
            self.track = Some(handle);
        }
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(mut handle) = self.track.take() {
            handle.stop(Tween::default());
        }
    }

    fn seek(&mut self, offset_ms: i64) {
        if let Some(handle) = &mut self.track {
            handle.seek_to(offset_ms.max(0) as f64 / 1000.0);
        }
    }

    fn volume(&self) -> f64 {
        self.volume
    }

    fn set_volume(&mut self, volume: f64) {
        self.volume = volume.clamp(0.0, 1.0);
        if let Some(handle) = &mut self.track {
            handle.set_volume(amplitude_to_decibels(self.volume), Tween::default());
        }
    }

    fn is_playing(&self) -> bool {
        self.track
            .as_ref()
            .map(|h| h.state() == kira::sound::PlaybackState::Playing)
            .unwrap_or(false)
    }
}

/// Audio channel for `--no-audio` or when no output device is available.
/// Remembers the volume so the overlay still works.
#[derive(Debug, Default)]
pub struct DisabledAudio {
    volume: f64,
}

impl DisabledAudio {
    pub fn new(volume: f64) -> Self {
        Self {
            volume: volume.clamp(0.0, 1.0),
        }
    }
}

impl AudioChannel for DisabledAudio {
    fn load_and_play(&mut self, _path: &Path, _offset_ms: i64, _is_beatmap_track: bool) -> Result<()> {
        Ok(())
    }

    fn stop(&mut self) {}

    fn seek(&mut self, _offset_ms: i64) {}

    fn volume(&self) -> f64 {
        self.volume
    }

    fn set_volume(&mut self, volume: f64) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    fn is_playing(&self) -> bool {
        false
    }
}

/// Open the output device, falling back to silence if that fails
pub fn open_channel(enabled: bool, volume: f64) -> Box<dyn AudioChannel> {
    if !enabled {
        return Box::new(DisabledAudio::new(volume));
    }

    match KiraAudio::new(volume) {
        Ok(audio) => Box::new(audio),
        Err(e) => {
            log::warn!("Audio disabled: {:#}", e);
            Box::new(DisabledAudio::new(volume))
        }
    }
}

/// Starts the map's track once, on the first frame with a non-negative offset
#[derive(Debug, Default)]
pub struct AudioSync {
    started: bool,
}

impl AudioSync {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_started(&self) -> bool {
        self.started
    }

    pub fn update(&mut self, offset: i64, track: &Path, channel: &mut dyn AudioChannel) {
        if self.started || offset < 0 {
            return;
        }
        self.started = true;

        if let Err(e) = channel.load_and_play(track, offset, true) {
            log::warn!("{:#}", e);
        }
    }

    /// Keep a started track in step after the offset jumped
    pub fn seek(&mut self, offset: i64, channel: &mut dyn AudioChannel) {
        if self.started {
            channel.seek(offset);
        }
    }

    pub fn stop(&mut self, channel: &mut dyn AudioChannel) {
        if self.started {
            channel.stop();
        }
    }
}
