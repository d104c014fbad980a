//! Playback-engine seam for the chime audio core.
//!
//! The core (`chime-system`) never touches an audio device or a codec
//! directly; everything renders through an [`AudioEngine`] implementation.
//! Two are provided: a real cpal-backed engine and a table-driven mock for
//! tests and headless environments.

use std::fmt;
use std::sync::Arc;

pub mod cpal_engine;
mod decode;
pub mod mock_engine;

/// Handle to a decode state bound to one private byte buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DecoderId(pub(crate) u32);

/// Handle to one playable voice rendering through the engine output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VoiceId(pub(crate) u32);

/// A specialized error type for engine failures.
#[derive(Debug)]
pub enum EngineError {
    DeviceNotFound,
    UnsupportedFormat(String),
    StreamCreationFailed(String),
    Decode(String),
    UnknownDecoder(DecoderId),
    Other(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::DeviceNotFound => write!(f, "no output device available"),
            EngineError::UnsupportedFormat(s) => write!(f, "unsupported output format: {}", s),
            EngineError::StreamCreationFailed(s) => write!(f, "output stream creation failed: {}", s),
            EngineError::Decode(s) => write!(f, "decode failed: {}", s),
            EngineError::UnknownDecoder(id) => write!(f, "unknown decoder handle {:?}", id),
            EngineError::Other(s) => write!(f, "{}", s),
        }
    }
}

impl std::error::Error for EngineError {}

/// The contract every playback engine implementation honors.
///
/// Construction is two-stage, mirroring decoder/voice pairing: a decoder is
/// created from a private copy of encoded bytes, then a voice is bound to
/// that decoder. Each stage fails synchronously; the caller unwinds whatever
/// it already acquired. Transport and parameter calls on unknown handles are
/// ignored rather than escalated — the core gates them by its own slot
/// bookkeeping.
pub trait AudioEngine {
    /// Create a decode state over `data`. The engine keeps its own reference
    /// to the buffer; the caller's clone stays the voice's owned copy.
    fn create_decoder(&mut self, data: Arc<[u8]>) -> Result<DecoderId, EngineError>;
    fn destroy_decoder(&mut self, id: DecoderId);

    /// Bind a voice to a previously created decoder. The voice starts
    /// stopped, at frame 0, volume 1.0, centered, not looping.
    fn create_voice(&mut self, decoder: DecoderId) -> Result<VoiceId, EngineError>;
    fn destroy_voice(&mut self, id: VoiceId);

    fn start(&mut self, id: VoiceId);
    /// Stop output without resetting position; a later `start` resumes.
    fn stop(&mut self, id: VoiceId);
    fn seek_to_start(&mut self, id: VoiceId);

    fn set_volume(&mut self, id: VoiceId, volume: f32);
    /// Current audible volume of the voice; 0.0 for unknown handles.
    fn volume(&self, id: VoiceId) -> f32;
    /// Stereo balance in [-1, 1]; callers clamp before handing it over.
    fn set_pan(&mut self, id: VoiceId, pan: f32);
    fn set_looping(&mut self, id: VoiceId, looping: bool);
}

/// Runtime check for whether `create_engine` returns the mock.
pub fn is_mock_engine_enabled() -> bool {
    cfg!(feature = "mock-audio")
}

#[cfg(not(feature = "mock-audio"))]
pub fn create_engine() -> Result<Box<dyn AudioEngine>, EngineError> {
    let engine = cpal_engine::CpalEngine::new()?;
    tracing::info!(
        sample_rate = engine.sample_rate(),
        channels = engine.channels(),
        "create_engine: using cpal output"
    );
    Ok(Box::new(engine))
}

#[cfg(feature = "mock-audio")]
pub fn create_engine() -> Result<Box<dyn AudioEngine>, EngineError> {
    tracing::info!("create_engine: using mock output");
    Ok(Box::new(mock_engine::MockEngine::new()))
}
