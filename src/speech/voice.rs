//! Voice selection for synthesis

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Pitch used when an explicit voice name overrides the profile
const OVERRIDE_PITCH: f32 = 2.0;

/// Speaking rate used when an explicit voice name overrides the profile
const OVERRIDE_RATE: f32 = 0.95;

/// Preset voice character
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoiceProfile {
    /// High-pitched, slightly slow voice
    #[default]
    Robot,
    Male,
    Female,
}

impl FromStr for VoiceProfile {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "robot" | "robo" | "robô" => Ok(Self::Robot),
            "male" | "masculina" => Ok(Self::Male),
            "female" | "feminina" => Ok(Self::Female),
            other => Err(Error::Config(format!("unknown voice profile: {other}"))),
        }
    }
}

/// Voice configuration as given by the user
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceConfig {
    pub profile: VoiceProfile,
    /// Provider voice name replacing the profile's (e.g. "pt-BR-Wavenet-C")
    pub name_override: Option<String>,
    /// BCP-47 language code
    pub language_code: String,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            profile: VoiceProfile::default(),
            name_override: None,
            language_code: "pt-BR".to_string(),
        }
    }
}

/// Concrete parameters sent to the synthesis provider
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceParams {
    pub name: String,
    pub language_code: String,
    pub pitch: f32,
    pub speaking_rate: f32,
}

impl VoiceParams {
    /// Stable identifier of these parameters, used in cache fingerprints
    #[must_use]
    pub fn identifier(&self) -> String {
        format!(
            "{}|{}|{}|{}",
            self.name, self.language_code, self.pitch, self.speaking_rate
        )
    }
}

impl VoiceConfig {
    /// Resolve the profile (or override) into provider parameters
    #[must_use]
    pub fn resolve(&self) -> VoiceParams {
        if let Some(name) = self.name_override.as_deref().filter(|n| !n.is_empty()) {
            return VoiceParams {
                name: name.to_string(),
                language_code: self.language_code.clone(),
                pitch: OVERRIDE_PITCH,
                speaking_rate: OVERRIDE_RATE,
            };
        }

        let (name, pitch, speaking_rate) = match self.profile {
            VoiceProfile::Robot => ("pt-BR-Wavenet-B", 4.0, 0.85),
            VoiceProfile::Male => ("pt-BR-Wavenet-B", 0.0, 1.0),
            VoiceProfile::Female => ("pt-BR-Wavenet-A", 0.0, 1.0),
        };

        VoiceParams {
            name: name.to_string(),
            language_code: self.language_code.clone(),
            pitch,
            speaking_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profiles_resolve_to_distinct_identifiers() {
        let ids: Vec<String> = [VoiceProfile::Robot, VoiceProfile::Male, VoiceProfile::Female]
            .into_iter()
            .map(|profile| {
                VoiceConfig {
                    profile,
                    ..VoiceConfig::default()
                }
                .resolve()
                .identifier()
            })
            .collect();

        assert_ne!(ids[0], ids[1]);
        assert_ne!(ids[1], ids[2]);
        assert_ne!(ids[0], ids[2]);
    }

    #[test]
    fn override_replaces_profile_parameters() {
        let params = VoiceConfig {
            name_override: Some("pt-BR-Neural2-C".to_string()),
            ..VoiceConfig::default()
        }
        .resolve();

        assert_eq!(params.name, "pt-BR-Neural2-C");
        assert!((params.pitch - OVERRIDE_PITCH).abs() < f32::EPSILON);
        assert!((params.speaking_rate - OVERRIDE_RATE).abs() < f32::EPSILON);
    }

    #[test]
    fn empty_override_is_ignored() {
        let params = VoiceConfig {
            name_override: Some(String::new()),
            ..VoiceConfig::default()
        }
        .resolve();
        assert_eq!(params.name, "pt-BR-Wavenet-B");
    }
}
