//! cpal-backed playback engine.
//!
//! The `cpal::Stream` is not `Send`, so a worker thread owns the device and
//! stream; the engine handle only keeps a control channel to it plus the
//! voice table the output callback mixes from. Dropping the engine shuts the
//! worker down.

use std::collections::HashMap;
use std::sync::Arc;
use std::thread;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, StreamConfig};
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::decode::{self, DecodedClip};
use crate::{AudioEngine, DecoderId, EngineError, VoiceId};

pub struct CpalEngine {
    shared: Arc<Shared>,
    ctrl_tx: Sender<CtrlMsg>,
    // Decoded clips live on the control side; voices hold their own Arc to
    // the sample data, so destroying a decoder never cuts a playing voice.
    clips: HashMap<DecoderId, DecodedClip>,
    next_decoder: u32,
    next_voice: u32,
    sample_rate: u32,
    channels: u16,
}

struct Shared {
    voices: Mutex<HashMap<VoiceId, VoiceState>>,
}

struct VoiceState {
    samples: Arc<Vec<f32>>,
    frame: usize,
    volume: f32,
    pan: f32,
    looping: bool,
    playing: bool,
}

enum CtrlMsg {
    Shutdown,
}

impl CpalEngine {
    pub fn new() -> Result<Self, EngineError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(EngineError::DeviceNotFound)?;
        let config = pick_output_config(&device)?;

        let shared = Arc::new(Shared {
            voices: Mutex::new(HashMap::new()),
        });
        let (ctrl_tx, ctrl_rx) = unbounded::<CtrlMsg>();

        let sample_rate = config.sample_rate.0;
        let channels = config.channels;
        let shared_worker = shared.clone();
        thread::spawn(move || worker_loop(device, config, ctrl_rx, shared_worker));

        Ok(Self {
            shared,
            ctrl_tx,
            clips: HashMap::new(),
            next_decoder: 0,
            next_voice: 0,
            sample_rate,
            channels,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }
}

impl Drop for CpalEngine {
    fn drop(&mut self) {
        let _ = self.ctrl_tx.send(CtrlMsg::Shutdown);
    }
}

/// Prefer an f32 output config; the mixer writes f32 samples directly.
fn pick_output_config(device: &Device) -> Result<StreamConfig, EngineError> {
    let supported = device
        .supported_output_configs()
        .map_err(|e| EngineError::Other(e.to_string()))?
        .filter(|c| c.sample_format() == SampleFormat::F32 && c.channels() >= 1)
        .collect::<Vec<_>>();

    let chosen = supported
        .into_iter()
        .next_back()
        .ok_or_else(|| EngineError::UnsupportedFormat("no f32 output config".to_string()))?;

    Ok(chosen.with_max_sample_rate().config())
}

fn worker_loop(device: Device, config: StreamConfig, rx: Receiver<CtrlMsg>, shared: Arc<Shared>) {
    let out_channels = config.channels as usize;

    let shared_cb = shared.clone();
    let data_cb = move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
        for s in data.iter_mut() {
            *s = 0.0;
        }
        if out_channels == 0 {
            return;
        }
        let frames = data.len() / out_channels;
        let mut voices = shared_cb.voices.lock();
        for voice in voices.values_mut() {
            mix_voice(voice, data, out_channels, frames);
        }
    };
    let err_cb = |err| {
        warn!("output stream error: {}", err);
    };

    let stream = match device.build_output_stream(&config, data_cb, err_cb, None) {
        Ok(stream) => stream,
        Err(e) => {
            warn!("failed to build output stream: {}", e);
            return;
        }
    };
    if let Err(e) = stream.play() {
        warn!("failed to start output stream: {}", e);
        return;
    }

    // Block until shutdown is requested or the engine handle drops; the
    // stream dies with this frame.
    let _ = rx.recv();
}

/// Mix one voice into an interleaved output buffer. Looping voices wrap at
/// end of clip; one-shot voices park themselves stopped.
fn mix_voice(voice: &mut VoiceState, out: &mut [f32], out_channels: usize, frames: usize) {
    if !voice.playing {
        return;
    }
    let clip_frames = voice.samples.len() / 2;
    if clip_frames == 0 {
        voice.playing = false;
        return;
    }
    let (left_gain, right_gain) = pan_gains(voice.pan);

    for i in 0..frames {
        if voice.frame >= clip_frames {
            if voice.looping {
                voice.frame = 0;
            } else {
                voice.playing = false;
                break;
            }
        }
        let left = voice.samples[2 * voice.frame] * voice.volume * left_gain;
        let right = voice.samples[2 * voice.frame + 1] * voice.volume * right_gain;
        let base = i * out_channels;
        if out_channels == 1 {
            out[base] += 0.5 * (left + right);
        } else {
            out[base] += left;
            out[base + 1] += right;
        }
        voice.frame += 1;
    }
}

/// Balance-style pan: panning off-center only attenuates the far channel.
fn pan_gains(pan: f32) -> (f32, f32) {
    if pan < 0.0 {
        (1.0, 1.0 + pan)
    } else {
        (1.0 - pan, 1.0)
    }
}

impl AudioEngine for CpalEngine {
    fn create_decoder(&mut self, data: Arc<[u8]>) -> Result<DecoderId, EngineError> {
        let clip = decode::decode_to_stereo(&data)?;
        let id = DecoderId(self.next_decoder);
        self.next_decoder = self.next_decoder.wrapping_add(1);
        debug!(
            bytes = data.len(),
            frames = clip.frames(),
            sample_rate = clip.sample_rate,
            "decoded clip"
        );
        self.clips.insert(id, clip);
        Ok(id)
    }

    fn destroy_decoder(&mut self, id: DecoderId) {
        self.clips.remove(&id);
    }

    fn create_voice(&mut self, decoder: DecoderId) -> Result<VoiceId, EngineError> {
        let clip = self
            .clips
            .get(&decoder)
            .ok_or(EngineError::UnknownDecoder(decoder))?;
        let id = VoiceId(self.next_voice);
        self.next_voice = self.next_voice.wrapping_add(1);
        self.shared.voices.lock().insert(
            id,
            VoiceState {
                samples: clip.samples.clone(),
                frame: 0,
                volume: 1.0,
                pan: 0.0,
                looping: false,
                playing: false,
            },
        );
        Ok(id)
    }

    fn destroy_voice(&mut self, id: VoiceId) {
        self.shared.voices.lock().remove(&id);
    }

    fn start(&mut self, id: VoiceId) {
        if let Some(voice) = self.shared.voices.lock().get_mut(&id) {
            // A one-shot restarted after running to the end replays from 0.
            if !voice.looping && voice.frame >= voice.samples.len() / 2 {
                voice.frame = 0;
            }
            voice.playing = true;
        }
    }

    fn stop(&mut self, id: VoiceId) {
        if let Some(voice) = self.shared.voices.lock().get_mut(&id) {
            voice.playing = false;
        }
    }

    fn seek_to_start(&mut self, id: VoiceId) {
        if let Some(voice) = self.shared.voices.lock().get_mut(&id) {
            voice.frame = 0;
        }
    }

    fn set_volume(&mut self, id: VoiceId, volume: f32) {
        if let Some(voice) = self.shared.voices.lock().get_mut(&id) {
            voice.volume = volume;
        }
    }

    fn volume(&self, id: VoiceId) -> f32 {
        self.shared
            .voices
            .lock()
            .get(&id)
            .map(|v| v.volume)
            .unwrap_or(0.0)
    }

    fn set_pan(&mut self, id: VoiceId, pan: f32) {
        if let Some(voice) = self.shared.voices.lock().get_mut(&id) {
            voice.pan = pan;
        }
    }

    fn set_looping(&mut self, id: VoiceId, looping: bool) {
        if let Some(voice) = self.shared.voices.lock().get_mut(&id) {
            voice.looping = looping;
        }
    }
}
