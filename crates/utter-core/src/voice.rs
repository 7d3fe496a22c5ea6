//! Voice catalog: maps public voice ids to engine-specific parameters.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Engine-facing parameters for one catalog voice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceStyle {
    /// Public voice id, e.g. `en-us`.
    pub id: String,
    /// BCP-47 language tag.
    pub language: String,
    /// Name the underlying engine knows this voice by.
    pub engine_voice: String,
    /// Base pitch in Hz, used by engines without a named-voice concept.
    #[serde(default = "default_pitch")]
    pub pitch_hz: f32,
}

fn default_pitch() -> f32 {
    180.0
}

/// Catalog of voices the service accepts.
#[derive(Debug, Clone)]
pub struct VoiceCatalog {
    voices: HashMap<String, VoiceStyle>,
}

impl VoiceCatalog {
    /// Build a catalog from explicit entries. Later duplicates win.
    pub fn new(entries: Vec<VoiceStyle>) -> Self {
        let voices = entries.into_iter().map(|v| (v.id.clone(), v)).collect();
        Self { voices }
    }

    /// Resolve a voice id, rejecting unknown ids before any job is created.
    pub fn resolve(&self, voice_id: &str) -> Result<&VoiceStyle> {
        self.voices
            .get(voice_id)
            .ok_or_else(|| Error::UnknownVoice(voice_id.to_string()))
    }

    /// All voices, sorted by id for stable listings.
    pub fn list(&self) -> Vec<&VoiceStyle> {
        let mut voices: Vec<_> = self.voices.values().collect();
        voices.sort_by(|a, b| a.id.cmp(&b.id));
        voices
    }

    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }
}

impl Default for VoiceCatalog {
    /// Built-in voices, available without any configuration.
    fn default() -> Self {
        Self::new(vec![
            VoiceStyle {
                id: "en-us".into(),
                language: "en-US".into(),
                engine_voice: "english-us".into(),
                pitch_hz: 180.0,
            },
            VoiceStyle {
                id: "en-gb".into(),
                language: "en-GB".into(),
                engine_voice: "english-gb".into(),
                pitch_hz: 165.0,
            },
            VoiceStyle {
                id: "de-de".into(),
                language: "de-DE".into(),
                engine_voice: "german".into(),
                pitch_hz: 150.0,
            },
            VoiceStyle {
                id: "fr-fr".into(),
                language: "fr-FR".into(),
                engine_voice: "french".into(),
                pitch_hz: 190.0,
            },
        ])
    }
}
