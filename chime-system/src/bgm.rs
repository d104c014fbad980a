//! The single looping background-music channel and its fade state machine.

use chime_engine::AudioEngine;
use tracing::debug;

use crate::clamp;
use crate::voice::Voice;

/// Linear volume fade from a captured start level toward a target.
struct Fade {
    start_volume: f32,
    target_volume: f32,
    elapsed: f32,
    duration: f32,
}

/// Singleton BGM slot. `fade` may be `Some` only while a track is loaded;
/// replacing or unloading the track clears it.
pub(crate) struct BgmChannel {
    voice: Option<Voice>,
    fade: Option<Fade>,
}

impl BgmChannel {
    pub fn new() -> Self {
        Self {
            voice: None,
            fade: None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.voice.is_some()
    }

    pub fn is_fading(&self) -> bool {
        self.fade.is_some()
    }

    /// Replace whatever is loaded with a new looping track at `volume`.
    /// The old track is torn down before the new one is constructed; if
    /// construction fails the channel is left unloaded.
    pub fn play(&mut self, engine: &mut dyn AudioEngine, bytes: &[u8], volume: f32) {
        if let Some(old) = self.voice.take() {
            old.release(engine);
        }
        self.fade = None;

        let Some(voice) = Voice::create(engine, bytes) else {
            return;
        };
        engine.set_looping(voice.handle(), true);
        engine.set_volume(voice.handle(), volume);
        engine.start(voice.handle());
        debug!(bytes = bytes.len(), "bgm: playing new track");
        self.voice = Some(voice);
    }

    /// Stop and rewind to frame 0, so the next start plays from the top.
    pub fn stop(&mut self, engine: &mut dyn AudioEngine) {
        if let Some(voice) = &self.voice {
            engine.stop(voice.handle());
            engine.seek_to_start(voice.handle());
        }
    }

    /// Stop without rewinding; position is preserved for `resume`.
    pub fn pause(&mut self, engine: &mut dyn AudioEngine) {
        if let Some(voice) = &self.voice {
            engine.stop(voice.handle());
        }
    }

    pub fn resume(&mut self, engine: &mut dyn AudioEngine) {
        if let Some(voice) = &self.voice {
            engine.start(voice.handle());
        }
    }

    /// Apply a stored global volume to the track. An active fade owns the
    /// audible level; while it runs this is a no-op and the value only takes
    /// effect through a later explicit call.
    pub fn apply_volume(&mut self, engine: &mut dyn AudioEngine, volume: f32) {
        if self.fade.is_some() {
            return;
        }
        if let Some(voice) = &self.voice {
            engine.set_volume(voice.handle(), volume);
        }
    }

    /// Begin a fade from the track's current audible volume toward `target`.
    /// Returns the clamped target when a fade actually starts, so the caller
    /// can store it as the new global BGM volume right away.
    pub fn begin_fade(
        &mut self,
        engine: &mut dyn AudioEngine,
        target: f32,
        duration: f32,
    ) -> Option<f32> {
        let voice = self.voice.as_ref()?;
        let start_volume = engine.volume(voice.handle());
        let target_volume = clamp(target, 0.0, 1.0);
        debug!(
            start = start_volume,
            target = target_volume,
            duration, "bgm: fade started"
        );
        self.fade = Some(Fade {
            start_volume,
            target_volume,
            elapsed: 0.0,
            duration,
        });
        Some(target_volume)
    }

    /// Advance an active fade by `dt` seconds and apply the interpolated
    /// volume. Completion lands exactly on the target; a non-positive
    /// duration completes on the first tick.
    pub fn tick(&mut self, engine: &mut dyn AudioEngine, dt: f32) {
        let Some(voice) = &self.voice else {
            return;
        };
        let Some(fade) = &mut self.fade else {
            return;
        };

        fade.elapsed += dt;
        let t = if fade.duration <= 0.0 {
            1.0
        } else {
            (fade.elapsed / fade.duration).min(1.0)
        };

        if t >= 1.0 {
            engine.set_volume(voice.handle(), fade.target_volume);
            debug!(volume = fade.target_volume, "bgm: fade complete");
            self.fade = None;
        } else {
            let volume = fade.start_volume + (fade.target_volume - fade.start_volume) * t;
            engine.set_volume(voice.handle(), volume);
        }
    }

    /// Tear down the loaded track, if any, and any fade with it.
    pub fn unload(&mut self, engine: &mut dyn AudioEngine) {
        self.fade = None;
        if let Some(voice) = self.voice.take() {
            voice.release(engine);
        }
    }
}
