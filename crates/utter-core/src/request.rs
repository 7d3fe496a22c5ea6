//! Synthesis request values and deterministic fingerprinting.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// Bounds applied to the speaking-rate multiplier.
pub const RATE_RANGE: (f32, f32) = (0.25, 4.0);
/// Bounds applied to the output volume.
pub const VOLUME_RANGE: (f32, f32) = (0.0, 1.0);

/// An immutable request for speech synthesis.
///
/// Two requests with identical fields are considered equivalent: they share
/// a fingerprint, and the scheduler will run at most one synthesis for them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisRequest {
    /// Text to synthesize.
    pub text: String,
    /// Catalog voice id (e.g. `en-us`).
    pub voice_id: String,
    /// Speaking rate multiplier, 1.0 = normal.
    #[serde(default = "default_rate")]
    pub rate: f32,
    /// Output volume, 0.0..=1.0.
    #[serde(default = "default_volume")]
    pub volume: f32,
}

fn default_rate() -> f32 {
    1.0
}

fn default_volume() -> f32 {
    1.0
}

impl SynthesisRequest {
    /// Create a request with default rate and volume.
    pub fn new(text: impl Into<String>, voice_id: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            voice_id: voice_id.into(),
            rate: default_rate(),
            volume: default_volume(),
        }
    }

    /// Set the speaking rate.
    pub fn with_rate(mut self, rate: f32) -> Self {
        self.rate = rate;
        self
    }

    /// Set the output volume.
    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = volume;
        self
    }

    /// Reject requests that should never reach the scheduler.
    pub fn validate(&self) -> Result<()> {
        if self.text.trim().is_empty() {
            return Err(Error::InvalidRequest("text must not be empty".into()));
        }
        if !self.rate.is_finite() || !self.volume.is_finite() {
            return Err(Error::InvalidRequest(
                "rate and volume must be finite".into(),
            ));
        }
        Ok(())
    }

    /// Clamp rate and volume into their supported ranges.
    ///
    /// Normalization happens before fingerprinting so that out-of-range
    /// parameters dedup against their clamped equivalents.
    pub fn normalized(mut self) -> Self {
        self.rate = self.rate.clamp(RATE_RANGE.0, RATE_RANGE.1);
        self.volume = self.volume.clamp(VOLUME_RANGE.0, VOLUME_RANGE.1);
        self
    }

    /// Deterministic fingerprint over all semantic fields.
    ///
    /// The same text with different voice parameters fingerprints
    /// differently; floats contribute their exact bit patterns.
    pub fn fingerprint(&self) -> Fingerprint {
        let mut hasher = Sha256::new();
        hasher.update(self.text.as_bytes());
        hasher.update([0xff]);
        hasher.update(self.voice_id.as_bytes());
        hasher.update([0xff]);
        hasher.update(self.rate.to_bits().to_le_bytes());
        hasher.update(self.volume.to_bits().to_le_bytes());
        Fingerprint(hasher.finalize().into())
    }
}

/// SHA-256 digest identifying equivalent requests.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Full lowercase hex form.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short prefix for log lines.
    pub fn short(&self) -> String {
        hex::encode(&self.0[..8])
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.short())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.short())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_deterministic() {
        let a = SynthesisRequest::new("hello", "en-us");
        let b = a.clone();
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn fingerprint_covers_all_fields() {
        let base = SynthesisRequest::new("hello", "en-us");
        let other_text = SynthesisRequest::new("goodbye", "en-us");
        let other_voice = SynthesisRequest::new("hello", "en-gb");
        let other_rate = base.clone().with_rate(1.5);
        let other_volume = base.clone().with_volume(0.5);

        let fp = base.fingerprint();
        assert_ne!(fp, other_text.fingerprint());
        assert_ne!(fp, other_voice.fingerprint());
        assert_ne!(fp, other_rate.fingerprint());
        assert_ne!(fp, other_volume.fingerprint());
    }

    #[test]
    fn normalization_clamps_out_of_range_params() {
        let req = SynthesisRequest::new("hi", "en-us")
            .with_rate(10.0)
            .with_volume(-1.0)
            .normalized();
        assert_eq!(req.rate, RATE_RANGE.1);
        assert_eq!(req.volume, VOLUME_RANGE.0);

        // A clamped request dedups against its in-range equivalent.
        let in_range = SynthesisRequest::new("hi", "en-us")
            .with_rate(RATE_RANGE.1)
            .with_volume(VOLUME_RANGE.0);
        assert_eq!(req.fingerprint(), in_range.fingerprint());
    }

    #[test]
    fn empty_text_is_rejected() {
        assert_eq!(
            SynthesisRequest::new("   ", "en-us").validate(),
            Err(Error::InvalidRequest("text must not be empty".into()))
        );
    }
}
