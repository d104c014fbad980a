//! One playable sound instance: a private copy of the caller's encoded
//! bytes plus the decoder and voice handles bound to it.

use std::sync::Arc;

use chime_engine::{AudioEngine, DecoderId, VoiceId};
use tracing::{debug, warn};

/// A voice exists only fully constructed: buffer copied, decoder created,
/// voice handle bound. Any partial construction is unwound before the
/// constructor returns, so a slot holding `Some(Voice)` always holds a
/// playable instance.
pub(crate) struct Voice {
    data: Arc<[u8]>,
    decoder: DecoderId,
    handle: VoiceId,
}

impl Voice {
    /// Copy `bytes` and run the two-stage construction. On failure the
    /// stages already acquired are released and `None` is returned; the
    /// engine is back in its prior state.
    pub fn create(engine: &mut dyn AudioEngine, bytes: &[u8]) -> Option<Voice> {
        let data: Arc<[u8]> = Arc::from(bytes);

        let decoder = match engine.create_decoder(Arc::clone(&data)) {
            Ok(decoder) => decoder,
            Err(err) => {
                warn!(error = %err, bytes = data.len(), "voice: decoder construction failed");
                return None;
            }
        };
        let handle = match engine.create_voice(decoder) {
            Ok(handle) => handle,
            Err(err) => {
                engine.destroy_decoder(decoder);
                warn!(error = %err, "voice: playback handle construction failed");
                return None;
            }
        };

        Some(Voice {
            data,
            decoder,
            handle,
        })
    }

    pub fn handle(&self) -> VoiceId {
        self.handle
    }

    /// Release in reverse acquisition order: voice handle, decoder, then the
    /// buffer when `self` drops.
    pub fn release(self, engine: &mut dyn AudioEngine) {
        engine.destroy_voice(self.handle);
        engine.destroy_decoder(self.decoder);
        debug!(bytes = self.data.len(), "voice: released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chime_engine::mock_engine::MockEngine;

    #[test]
    fn create_then_release_leaves_no_resources() {
        let mut engine = MockEngine::new();
        let probe = engine.probe();

        let voice = Voice::create(&mut engine, b"clip").expect("voice");
        assert_eq!(probe.live_decoders(), 1);
        assert_eq!(probe.live_voices(), 1);

        voice.release(&mut engine);
        assert_eq!(probe.live_decoders(), 0);
        assert_eq!(probe.live_voices(), 0);
    }

    #[test]
    fn decoder_failure_acquires_nothing() {
        let mut engine = MockEngine::new();
        let probe = engine.probe();
        probe.set_fail_decoders(true);

        assert!(Voice::create(&mut engine, b"clip").is_none());
        assert_eq!(probe.decoders_created(), 0);
        assert_eq!(probe.voices_created(), 0);
    }

    #[test]
    fn handle_failure_unwinds_the_decoder() {
        let mut engine = MockEngine::new();
        let probe = engine.probe();
        probe.set_fail_voices(true);

        assert!(Voice::create(&mut engine, b"clip").is_none());
        assert_eq!(probe.decoders_created(), 1);
        assert_eq!(probe.decoders_destroyed(), 1);
        assert_eq!(probe.live_decoders(), 0);
        assert_eq!(probe.voices_created(), 0);
    }
}
