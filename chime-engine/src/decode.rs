//! In-memory decode of encoded audio buffers via symphonia.
//!
//! Every clip is decoded in full, synchronously, at decoder-creation time;
//! malformed input is reported to the caller before any voice exists. Output
//! is interleaved stereo f32 at the clip's native rate (no resampling).

use std::io::Cursor;
use std::sync::Arc;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::warn;

use crate::EngineError;

/// A fully decoded clip: interleaved stereo f32 frames.
#[derive(Debug)]
pub(crate) struct DecodedClip {
    pub samples: Arc<Vec<f32>>,
    pub sample_rate: u32,
}

impl DecodedClip {
    pub fn frames(&self) -> usize {
        self.samples.len() / 2
    }
}

/// Decode `data` end-to-end. Fails when the container cannot be probed, no
/// audio track exists, or no frame decodes cleanly.
pub(crate) fn decode_to_stereo(data: &[u8]) -> Result<DecodedClip, EngineError> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(data.to_vec())), Default::default());

    let probed = symphonia::default::get_probe()
        .format(
            &Hint::new(),
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| EngineError::Decode(format!("failed to probe format: {}", e)))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| EngineError::Decode("no audio track found".to_string()))?;
    let track_id = track.id;

    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| EngineError::Decode("sample rate not declared".to_string()))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| EngineError::Decode(format!("failed to create decoder: {}", e)))?;

    let mut samples: Vec<f32> = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;
    let mut channels = 0usize;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => {
                warn!("error reading packet: {}", e);
                break;
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(e) => {
                warn!("decode error: {}", e);
                continue;
            }
        };

        if sample_buf.is_none() {
            let spec = *decoded.spec();
            channels = spec.channels.count();
            sample_buf = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
        }
        if let Some(buf) = sample_buf.as_mut() {
            buf.copy_interleaved_ref(decoded);
            push_stereo(buf.samples(), channels, &mut samples);
        }
    }

    if samples.is_empty() {
        return Err(EngineError::Decode("no decodable audio frames".to_string()));
    }

    Ok(DecodedClip {
        samples: Arc::new(samples),
        sample_rate,
    })
}

/// Fold an interleaved source frame into stereo: mono is duplicated, wider
/// layouts keep their first two channels.
fn push_stereo(interleaved: &[f32], channels: usize, out: &mut Vec<f32>) {
    if channels == 0 {
        return;
    }
    for frame in interleaved.chunks_exact(channels) {
        let left = frame[0];
        let right = if channels > 1 { frame[1] } else { frame[0] };
        out.push(left);
        out.push(right);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_bytes_fail_to_probe() {
        let err = decode_to_stereo(&[0x13, 0x37, 0x00, 0xff]).unwrap_err();
        assert!(matches!(err, EngineError::Decode(_)));
    }

    #[test]
    fn empty_buffer_fails_to_probe() {
        assert!(decode_to_stereo(&[]).is_err());
    }

    #[test]
    fn mono_frames_are_duplicated_to_stereo() {
        let mut out = Vec::new();
        push_stereo(&[0.25, -0.5], 1, &mut out);
        assert_eq!(out, vec![0.25, 0.25, -0.5, -0.5]);
    }

    #[test]
    fn wide_layouts_keep_first_two_channels() {
        let mut out = Vec::new();
        push_stereo(&[0.1, 0.2, 0.3, 0.4, 0.5, 0.6], 3, &mut out);
        assert_eq!(out, vec![0.1, 0.2, 0.4, 0.5]);
    }
}
