//! Fixed-capacity round-robin pool of one-shot sound-effect voices.

use chime_engine::AudioEngine;
use tracing::debug;

use crate::clamp;
use crate::voice::Voice;

/// Number of concurrent SFX voices before the oldest slot is reused.
pub const SFX_POOL_SIZE: usize = 8;

/// Ring of voice slots. The cursor always names the next slot to (re)use
/// and advances exactly once per play call, whether or not construction
/// succeeds. Occupied slots are evicted eagerly; a sound still playing in
/// the reused slot is cut off, which is the accepted pool behavior.
pub(crate) struct SfxPool {
    slots: [Option<Voice>; SFX_POOL_SIZE],
    cursor: usize,
}

impl SfxPool {
    pub fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| None),
            cursor: 0,
        }
    }

    pub fn play(&mut self, engine: &mut dyn AudioEngine, bytes: &[u8], volume: f32, pan: f32) {
        let slot = self.cursor;
        self.cursor = (self.cursor + 1) % SFX_POOL_SIZE;

        if let Some(old) = self.slots[slot].take() {
            old.release(engine);
        }

        let Some(voice) = Voice::create(engine, bytes) else {
            return;
        };
        engine.set_volume(voice.handle(), volume);
        engine.set_pan(voice.handle(), clamp(pan, -1.0, 1.0));
        engine.start(voice.handle());
        debug!(slot, bytes = bytes.len(), "sfx: playing");
        self.slots[slot] = Some(voice);
    }

    /// Retroactively apply a global SFX volume to every active voice.
    pub fn apply_volume(&mut self, engine: &mut dyn AudioEngine, volume: f32) {
        for voice in self.slots.iter().flatten() {
            engine.set_volume(voice.handle(), volume);
        }
    }

    /// Release every active slot. The cursor is left where it is; the pool
    /// stays usable if playback continues after a partial teardown.
    pub fn clear(&mut self, engine: &mut dyn AudioEngine) {
        for slot in &mut self.slots {
            if let Some(voice) = slot.take() {
                voice.release(engine);
            }
        }
    }

    #[cfg(test)]
    pub fn active_count(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    #[cfg(test)]
    pub fn cursor(&self) -> usize {
        self.cursor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chime_engine::mock_engine::MockEngine;

    #[test]
    fn cursor_advances_once_per_play_even_on_failure() {
        let mut engine = MockEngine::new();
        let probe = engine.probe();
        let mut pool = SfxPool::new();

        pool.play(&mut engine, b"clip", 1.0, 0.0);
        assert_eq!(pool.cursor(), 1);

        probe.set_fail_decoders(true);
        pool.play(&mut engine, b"clip", 1.0, 0.0);
        assert_eq!(pool.cursor(), 2);
        assert_eq!(pool.active_count(), 1);
    }

    #[test]
    fn cursor_wraps_at_pool_size() {
        let mut engine = MockEngine::new();
        let mut pool = SfxPool::new();

        for _ in 0..SFX_POOL_SIZE {
            pool.play(&mut engine, b"clip", 1.0, 0.0);
        }
        assert_eq!(pool.cursor(), 0);
        assert_eq!(pool.active_count(), SFX_POOL_SIZE);
    }

    #[test]
    fn clear_releases_all_slots() {
        let mut engine = MockEngine::new();
        let probe = engine.probe();
        let mut pool = SfxPool::new();

        for _ in 0..3 {
            pool.play(&mut engine, b"clip", 1.0, 0.0);
        }
        pool.clear(&mut engine);
        assert_eq!(pool.active_count(), 0);
        assert_eq!(probe.live_voices(), 0);
        assert_eq!(probe.live_decoders(), 0);
    }
}
