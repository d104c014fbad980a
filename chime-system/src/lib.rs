//! Real-time BGM/SFX playback core.
//!
//! One looping background-music channel with time-based volume fades, plus a
//! fixed round-robin pool of one-shot sound-effect voices with per-play
//! volume and stereo pan. Decoding and output mixing are delegated to a
//! [`chime_engine::AudioEngine`] collaborator; this crate owns lifecycle and
//! state only.
//!
//! Everything lives in one [`AudioSystem`] context object with explicit
//! lifecycle. All operations are synchronous and must run on one thread; the
//! host drives fades by calling [`AudioSystem::update`] once per frame tick
//! with the elapsed time.
//!
//! Failures never escalate: a playback call before [`AudioSystem::init`]
//! succeeds, or with undecodable bytes, degrades to a no-op plus a log line,
//! leaving prior state untouched.

use chime_engine::{create_engine, AudioEngine};
use tracing::{debug, error, info};

mod bgm;
mod sfx;
mod voice;

use bgm::BgmChannel;
use sfx::SfxPool;
pub use sfx::SFX_POOL_SIZE;

/// Clamp `v` to the closed range [`min`, `max`].
pub(crate) fn clamp(v: f32, min: f32, max: f32) -> f32 {
    if v < min {
        min
    } else if v > max {
        max
    } else {
        v
    }
}

/// The playback context: engine handle, BGM channel, SFX pool, and the two
/// global volumes. Independent instances are fully isolated, which is what
/// the tests rely on; a host typically owns exactly one.
pub struct AudioSystem {
    engine: Option<Box<dyn AudioEngine>>,
    bgm: BgmChannel,
    sfx: SfxPool,
    bgm_volume: f32,
    sfx_volume: f32,
}

impl AudioSystem {
    /// An uninitialized system. Playback calls are no-ops until `init` (or
    /// `init_with_engine`) succeeds; the volume setters already work and
    /// their values apply to later voices.
    pub fn new() -> Self {
        Self {
            engine: None,
            bgm: BgmChannel::new(),
            sfx: SfxPool::new(),
            bgm_volume: 1.0,
            sfx_volume: 1.0,
        }
    }

    /// Create the process-wide playback engine. Idempotent; on engine
    /// failure the error is logged and the system stays uninitialized, so
    /// every later playback call is a silent no-op.
    pub fn init(&mut self) {
        if self.engine.is_some() {
            return;
        }
        match create_engine() {
            Ok(engine) => {
                self.engine = Some(engine);
                info!("playback engine initialized");
            }
            Err(err) => error!(error = %err, "failed to initialize playback engine"),
        }
    }

    /// Initialize with a caller-supplied engine instead of the default one.
    /// Ignored when already initialized.
    pub fn init_with_engine(&mut self, engine: Box<dyn AudioEngine>) {
        if self.engine.is_some() {
            debug!("init_with_engine: already initialized");
            return;
        }
        self.engine = Some(engine);
        info!("playback engine initialized");
    }

    pub fn is_initialized(&self) -> bool {
        self.engine.is_some()
    }

    /// Start looping playback of `bytes`, replacing any current track. The
    /// old track is torn down first; if the new bytes fail to decode the
    /// channel is left unloaded.
    pub fn play_bgm(&mut self, bytes: &[u8]) {
        let Some(engine) = self.engine.as_deref_mut() else {
            debug!("play_bgm: not initialized");
            return;
        };
        self.bgm.play(engine, bytes, self.bgm_volume);
    }

    /// Stop the track and rewind it, so a later `resume_bgm` or `play_bgm`
    /// starts from the beginning.
    pub fn stop_bgm(&mut self) {
        if let Some(engine) = self.engine.as_deref_mut() {
            self.bgm.stop(engine);
        }
    }

    /// Stop the track, keeping its position for `resume_bgm`.
    pub fn pause_bgm(&mut self) {
        if let Some(engine) = self.engine.as_deref_mut() {
            self.bgm.pause(engine);
        }
    }

    pub fn resume_bgm(&mut self) {
        if let Some(engine) = self.engine.as_deref_mut() {
            self.bgm.resume(engine);
        }
    }

    /// Store the global BGM volume (clamped to [0, 1]) and apply it to the
    /// loaded track — unless a fade is running, which keeps ownership of the
    /// audible level; the stored value then only takes effect through a
    /// later explicit call.
    pub fn set_bgm_volume(&mut self, volume: f32) {
        self.bgm_volume = clamp(volume, 0.0, 1.0);
        if let Some(engine) = self.engine.as_deref_mut() {
            self.bgm.apply_volume(engine, self.bgm_volume);
        }
    }

    /// Fade the loaded track from its current audible volume to `target`
    /// (clamped to [0, 1]) over `duration` seconds. No-op when nothing is
    /// loaded. The clamped target immediately becomes the stored global BGM
    /// volume, so the setting already reflects where the fade is headed.
    pub fn fade_bgm(&mut self, target: f32, duration: f32) {
        let Some(engine) = self.engine.as_deref_mut() else {
            return;
        };
        if let Some(target) = self.bgm.begin_fade(engine, target, duration) {
            self.bgm_volume = target;
        }
    }

    /// Fire-and-forget playback of a sound effect with stereo pan in
    /// [-1, 1] (clamped). Reuses the next pool slot, cutting off whatever
    /// still occupies it.
    pub fn play_sfx(&mut self, bytes: &[u8], pan: f32) {
        let Some(engine) = self.engine.as_deref_mut() else {
            debug!("play_sfx: not initialized");
            return;
        };
        self.sfx.play(engine, bytes, self.sfx_volume, pan);
    }

    /// Store the global SFX volume (clamped to [0, 1]) and apply it to every
    /// currently active pool voice.
    pub fn set_sfx_volume(&mut self, volume: f32) {
        self.sfx_volume = clamp(volume, 0.0, 1.0);
        if let Some(engine) = self.engine.as_deref_mut() {
            self.sfx.apply_volume(engine, self.sfx_volume);
        }
    }

    /// Advance the BGM fade by `dt` seconds. Call once per host frame tick;
    /// SFX voices never fade.
    pub fn update(&mut self, dt: f32) {
        if let Some(engine) = self.engine.as_deref_mut() {
            self.bgm.tick(engine, dt);
        }
    }

    pub fn bgm_volume(&self) -> f32 {
        self.bgm_volume
    }

    pub fn sfx_volume(&self) -> f32 {
        self.sfx_volume
    }

    pub fn is_bgm_loaded(&self) -> bool {
        self.bgm.is_loaded()
    }

    pub fn is_bgm_fading(&self) -> bool {
        self.bgm.is_fading()
    }

    /// Release the BGM track, then every SFX voice, then the engine handle.
    /// The order is load-bearing: no voice may outlive the engine. No-op
    /// when never initialized; also runs on drop.
    pub fn shutdown(&mut self) {
        let Some(mut engine) = self.engine.take() else {
            return;
        };
        self.bgm.unload(engine.as_mut());
        self.sfx.clear(engine.as_mut());
        drop(engine);
        info!("audio system shut down");
    }
}

impl Default for AudioSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for AudioSystem {
    fn drop(&mut self) {
        self.shutdown();
    }
}
