//! Built-in local engine backend.
//!
//! Renders a deterministic WAV tone in place of a real acoustic model: the
//! duration tracks the word count and rate, the pitch comes from the voice
//! style, and the amplitude from the volume. It keeps the service runnable
//! end to end without any platform voice drivers installed.

use std::io::Cursor;

use super::{EngineFactory, SynthesisEngine};
use crate::error::{Error, Result};
use crate::voice::VoiceStyle;

const SAMPLE_RATE: u32 = 22_050;
/// Approximate speaking pace at rate 1.0, words per second.
const WORDS_PER_SEC: f32 = 2.5;
const MAX_DURATION_SECS: f32 = 120.0;

/// Deterministic placeholder synthesis engine.
pub struct ToneEngine;

impl ToneEngine {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ToneEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SynthesisEngine for ToneEngine {
    fn synthesize(
        &mut self,
        text: &str,
        voice: &VoiceStyle,
        rate: f32,
        volume: f32,
    ) -> Result<Vec<u8>> {
        let words = text.split_whitespace().count().max(1) as f32;
        let duration = (words / (WORDS_PER_SEC * rate.max(0.1))).min(MAX_DURATION_SECS);
        let num_samples = (duration * SAMPLE_RATE as f32) as u32;
        let amplitude = volume.clamp(0.0, 1.0) * 0.4 * i16::MAX as f32;

        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: SAMPLE_RATE,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut cursor = Cursor::new(Vec::new());
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .map_err(|e| Error::SynthesisFailure(format!("wav header: {}", e)))?;

        for n in 0..num_samples {
            let t = n as f32 / SAMPLE_RATE as f32;
            let sample = (t * voice.pitch_hz * 2.0 * std::f32::consts::PI).sin() * amplitude;
            writer
                .write_sample(sample as i16)
                .map_err(|e| Error::SynthesisFailure(format!("wav sample: {}", e)))?;
        }

        writer
            .finalize()
            .map_err(|e| Error::SynthesisFailure(format!("wav finalize: {}", e)))?;

        Ok(cursor.into_inner())
    }
}

/// Factory for [`ToneEngine`] instances. Construction never fails.
pub struct ToneEngineFactory;

impl EngineFactory for ToneEngineFactory {
    fn create(&self) -> Result<Box<dyn SynthesisEngine>> {
        Ok(Box::new(ToneEngine::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voice() -> VoiceStyle {
        VoiceStyle {
            id: "en-us".into(),
            language: "en-US".into(),
            engine_voice: "english-us".into(),
            pitch_hz: 180.0,
        }
    }

    #[test]
    fn produces_a_riff_wav() {
        let mut engine = ToneEngine::new();
        let bytes = engine.synthesize("hello world", &voice(), 1.0, 1.0).unwrap();
        assert_eq!(&bytes[..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");
    }

    #[test]
    fn output_is_deterministic() {
        let mut engine = ToneEngine::new();
        let a = engine.synthesize("same input", &voice(), 1.0, 0.8).unwrap();
        let b = engine.synthesize("same input", &voice(), 1.0, 0.8).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn longer_text_and_slower_rate_yield_more_audio() {
        let mut engine = ToneEngine::new();
        let short = engine.synthesize("one two", &voice(), 1.0, 1.0).unwrap();
        let long = engine
            .synthesize("one two three four five six", &voice(), 1.0, 1.0)
            .unwrap();
        let slow = engine.synthesize("one two", &voice(), 0.5, 1.0).unwrap();
        assert!(long.len() > short.len());
        assert!(slow.len() > short.len());
    }
}
