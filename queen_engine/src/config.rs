use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Default text speed; speech waits divide by a third of this.
pub const DEFAULT_TALK_SPEED: u16 = 21;

/// Width, in characters, a dialogue option may use before it wraps.
pub const DEFAULT_OPTION_WIDTH: usize = 36;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub talk_speed: u16,
    pub speech: bool,
    pub subtitles: bool,
    pub option_width: usize,
    pub seed: u64,
    pub quirks: Quirks,
    pub costumes: Costumes,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            talk_speed: DEFAULT_TALK_SPEED,
            speech: true,
            subtitles: true,
            option_width: DEFAULT_OPTION_WIDTH,
            seed: 0x5155_4545_4e00_0001,
            quirks: Quirks::default(),
            costumes: Costumes::default(),
        }
    }
}

impl EngineConfig {
    /// Reads a JSON config; a missing path yields the defaults.
    pub fn from_json_file(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse config json: {}", path.display()))
    }

    /// Divisor applied to text lengths when no voice is playing.
    pub fn talk_divisor(&self) -> u32 {
        u32::from(self.talk_speed / 3).max(1)
    }
}

/// Shipped-data defects that are reproduced or corrected on purpose.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Quirks {
    /// Command rules that are never executed. The shipped table carries one
    /// rule whose walk-off box is disabled when it fires.
    pub skipped_rules: Vec<u16>,
    /// Object copies whose source id is off by one in the shipped data.
    pub copy_corrections: Vec<CopyCorrection>,
}

impl Default for Quirks {
    fn default() -> Self {
        Self {
            skipped_rules: vec![469],
            copy_corrections: vec![CopyCorrection {
                target: 337,
                source: 340,
                corrected: 339,
            }],
        }
    }
}

impl Quirks {
    pub fn is_skipped(&self, rule: u16) -> bool {
        self.skipped_rules.contains(&rule)
    }

    pub fn copy_source(&self, target: u16, source: u16) -> u16 {
        self.copy_corrections
            .iter()
            .find(|fix| fix.target == target && fix.source == source)
            .map(|fix| fix.corrected)
            .unwrap_or(source)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyCorrection {
    pub target: u16,
    pub source: u16,
    pub corrected: u16,
}

/// Ids used by the costume-change special sections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Costumes {
    pub dressing_slot: u16,
    pub dress_item: u16,
    pub clothes_item: u16,
    pub dress_cutscene: String,
    pub undress_cutscene: String,
    pub clothes_cutscene: String,
}

impl Default for Costumes {
    fn default() -> Self {
        Self {
            dressing_slot: 19,
            dress_item: 58,
            clothes_item: 56,
            dress_cutscene: "CDRES.CUT".into(),
            undress_cutscene: "CUDRS.CUT".into(),
            clothes_cutscene: "CDCLO.CUT".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_path_gives_defaults() {
        let config = EngineConfig::from_json_file(None).unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.talk_divisor(), 7);
    }

    #[test]
    fn partial_json_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"talk_speed": 9, "quirks": {{"skipped_rules": [3]}}}}"#).unwrap();
        let config = EngineConfig::from_json_file(Some(file.path())).unwrap();
        assert_eq!(config.talk_speed, 9);
        assert_eq!(config.talk_divisor(), 3);
        assert!(config.quirks.is_skipped(3));
        assert!(!config.quirks.is_skipped(469));
        assert_eq!(config.quirks.copy_corrections.len(), 1);
        assert!(config.speech);
    }

    #[test]
    fn slow_talk_speed_never_divides_by_zero() {
        let config = EngineConfig {
            talk_speed: 1,
            ..EngineConfig::default()
        };
        assert_eq!(config.talk_divisor(), 1);
    }

    #[test]
    fn copy_corrections_only_match_exact_pair() {
        let quirks = Quirks::default();
        assert_eq!(quirks.copy_source(337, 340), 339);
        assert_eq!(quirks.copy_source(337, 12), 12);
        assert_eq!(quirks.copy_source(1, 340), 340);
    }
}
