//! Table-driven mock engine for tests and headless environments.
//!
//! Tracks every decoder and voice with create/destroy accounting and keeps
//! per-voice parameter state, so tests can assert resource balance and
//! observe what the core applied. A [`MockProbe`] shares the state table and
//! stays valid after the engine itself is dropped, which lets teardown
//! ordering be verified. Construction failures can be injected per stage.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::{AudioEngine, DecoderId, EngineError, VoiceId};

#[derive(Default)]
struct MockState {
    decoders: HashMap<DecoderId, MockDecoder>,
    voices: HashMap<VoiceId, MockVoice>,
    // Creation order of live voices, for tests that need "the newest voice".
    voice_order: Vec<VoiceId>,
    decoders_created: u32,
    decoders_destroyed: u32,
    voices_created: u32,
    voices_destroyed: u32,
    fail_decoders: bool,
    fail_voices: bool,
    next_decoder: u32,
    next_voice: u32,
}

struct MockDecoder {
    data: Arc<[u8]>,
}

struct MockVoice {
    volume: f32,
    pan: f32,
    looping: bool,
    playing: bool,
    position: u64,
}

pub struct MockEngine {
    state: Arc<Mutex<MockState>>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Inspection handle sharing this engine's state table.
    pub fn probe(&self) -> MockProbe {
        MockProbe {
            state: self.state.clone(),
        }
    }
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioEngine for MockEngine {
    fn create_decoder(&mut self, data: Arc<[u8]>) -> Result<DecoderId, EngineError> {
        let mut state = self.state.lock();
        if state.fail_decoders {
            return Err(EngineError::Decode("injected decoder failure".to_string()));
        }
        if data.is_empty() {
            return Err(EngineError::Decode("empty buffer".to_string()));
        }
        let id = DecoderId(state.next_decoder);
        state.next_decoder += 1;
        state.decoders.insert(id, MockDecoder { data });
        state.decoders_created += 1;
        Ok(id)
    }

    fn destroy_decoder(&mut self, id: DecoderId) {
        let mut state = self.state.lock();
        if state.decoders.remove(&id).is_some() {
            state.decoders_destroyed += 1;
        }
    }

    fn create_voice(&mut self, decoder: DecoderId) -> Result<VoiceId, EngineError> {
        let mut state = self.state.lock();
        if state.fail_voices {
            return Err(EngineError::Other("injected voice failure".to_string()));
        }
        if !state.decoders.contains_key(&decoder) {
            return Err(EngineError::UnknownDecoder(decoder));
        }
        let id = VoiceId(state.next_voice);
        state.next_voice += 1;
        state.voices.insert(
            id,
            MockVoice {
                volume: 1.0,
                pan: 0.0,
                looping: false,
                playing: false,
                position: 0,
            },
        );
        state.voice_order.push(id);
        state.voices_created += 1;
        Ok(id)
    }

    fn destroy_voice(&mut self, id: VoiceId) {
        let mut state = self.state.lock();
        if state.voices.remove(&id).is_some() {
            state.voice_order.retain(|&v| v != id);
            state.voices_destroyed += 1;
        }
    }

    fn start(&mut self, id: VoiceId) {
        if let Some(voice) = self.state.lock().voices.get_mut(&id) {
            voice.playing = true;
        }
    }

    fn stop(&mut self, id: VoiceId) {
        if let Some(voice) = self.state.lock().voices.get_mut(&id) {
            voice.playing = false;
        }
    }

    fn seek_to_start(&mut self, id: VoiceId) {
        if let Some(voice) = self.state.lock().voices.get_mut(&id) {
            voice.position = 0;
        }
    }

    fn set_volume(&mut self, id: VoiceId, volume: f32) {
        if let Some(voice) = self.state.lock().voices.get_mut(&id) {
            voice.volume = volume;
        }
    }

    fn volume(&self, id: VoiceId) -> f32 {
        self.state
            .lock()
            .voices
            .get(&id)
            .map(|v| v.volume)
            .unwrap_or(0.0)
    }

    fn set_pan(&mut self, id: VoiceId, pan: f32) {
        if let Some(voice) = self.state.lock().voices.get_mut(&id) {
            voice.pan = pan;
        }
    }

    fn set_looping(&mut self, id: VoiceId, looping: bool) {
        if let Some(voice) = self.state.lock().voices.get_mut(&id) {
            voice.looping = looping;
        }
    }
}

/// Shared view into a [`MockEngine`]'s state table.
#[derive(Clone)]
pub struct MockProbe {
    state: Arc<Mutex<MockState>>,
}

impl MockProbe {
    pub fn live_decoders(&self) -> usize {
        self.state.lock().decoders.len()
    }

    pub fn live_voices(&self) -> usize {
        self.state.lock().voices.len()
    }

    pub fn decoders_created(&self) -> u32 {
        self.state.lock().decoders_created
    }

    pub fn decoders_destroyed(&self) -> u32 {
        self.state.lock().decoders_destroyed
    }

    pub fn voices_created(&self) -> u32 {
        self.state.lock().voices_created
    }

    pub fn voices_destroyed(&self) -> u32 {
        self.state.lock().voices_destroyed
    }

    /// Live voices in creation order.
    pub fn live_voice_ids(&self) -> Vec<VoiceId> {
        self.state.lock().voice_order.clone()
    }

    /// Newest live voice, if any.
    pub fn newest_voice(&self) -> Option<VoiceId> {
        self.state.lock().voice_order.last().copied()
    }

    pub fn volume_of(&self, id: VoiceId) -> Option<f32> {
        self.state.lock().voices.get(&id).map(|v| v.volume)
    }

    pub fn pan_of(&self, id: VoiceId) -> Option<f32> {
        self.state.lock().voices.get(&id).map(|v| v.pan)
    }

    pub fn is_playing(&self, id: VoiceId) -> Option<bool> {
        self.state.lock().voices.get(&id).map(|v| v.playing)
    }

    pub fn is_looping(&self, id: VoiceId) -> Option<bool> {
        self.state.lock().voices.get(&id).map(|v| v.looping)
    }

    pub fn position_of(&self, id: VoiceId) -> Option<u64> {
        self.state.lock().voices.get(&id).map(|v| v.position)
    }

    /// Byte length of the private buffer a decoder holds.
    pub fn decoder_bytes(&self, id: DecoderId) -> Option<usize> {
        self.state.lock().decoders.get(&id).map(|d| d.data.len())
    }

    /// Simulate playback progress so position-sensitive transport can be
    /// asserted (stop rewinds, pause does not).
    pub fn set_position(&self, id: VoiceId, frames: u64) {
        if let Some(voice) = self.state.lock().voices.get_mut(&id) {
            voice.position = frames;
        }
    }

    pub fn set_fail_decoders(&self, fail: bool) {
        self.state.lock().fail_decoders = fail;
    }

    pub fn set_fail_voices(&self, fail: bool) {
        self.state.lock().fail_voices = fail;
    }
}
