use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

use crate::reader::ByteReader;
use crate::writer::ByteWriter;

/// Number of dialogue session slots kept in a save.
pub const TALK_SELECTED_COUNT: usize = 86;

/// Persistent per-character dialogue state, indexed by the tree's unique key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TalkSelected {
    pub has_talked_to: bool,
    /// Level-1 child overrides: >0 replaces the head id, -1 blanks the child.
    pub values: [i16; 4],
}

impl Default for TalkSelected {
    fn default() -> Self {
        Self {
            has_talked_to: false,
            values: [0; 4],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TalkSelectedTable {
    pub entries: Vec<TalkSelected>,
}

impl Default for TalkSelectedTable {
    fn default() -> Self {
        Self {
            entries: vec![TalkSelected::default(); TALK_SELECTED_COUNT],
        }
    }
}

impl TalkSelectedTable {
    pub fn get(&self, key: usize) -> Option<&TalkSelected> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: usize) -> Option<&mut TalkSelected> {
        self.entries.get_mut(key)
    }

    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut reader = ByteReader::new(data);
        let count = reader.read_u16().context("reading session count")? as usize;
        ensure!(
            count <= TALK_SELECTED_COUNT,
            "save holds {count} dialogue sessions (limit {TALK_SELECTED_COUNT})"
        );
        let mut table = Self::default();
        for (index, entry) in table.entries.iter_mut().take(count).enumerate() {
            let [a, b, c, d, flag] = reader
                .read_i16_array::<5>()
                .with_context(|| format!("reading dialogue session {index}"))?;
            *entry = TalkSelected {
                has_talked_to: flag != 0,
                values: [a, b, c, d],
            };
        }
        Ok(table)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = ByteWriter::new();
        w.u16(self.entries.len() as u16);
        for entry in &self.entries {
            w.i16s(&entry.values).i16(entry.has_talked_to as i16);
        }
        w.into_inner()
    }
}
