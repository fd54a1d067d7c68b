//! Save and restore of the dialogue-session table, the only conversation
//! state that outlives a session.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use queen_formats::TalkSelectedTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionFormat {
    Json,
    Binary,
}

impl SessionFormat {
    /// `.json` files are JSON; anything else uses the save-game layout.
    pub fn from_path(path: &Path) -> Self {
        let json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if json {
            SessionFormat::Json
        } else {
            SessionFormat::Binary
        }
    }
}

pub fn save_sessions(table: &TalkSelectedTable, path: &Path) -> Result<()> {
    let bytes = match SessionFormat::from_path(path) {
        SessionFormat::Json => serde_json::to_vec_pretty(table)
            .context("serializing dialogue sessions to JSON")?,
        SessionFormat::Binary => table.to_bytes(),
    };
    fs::write(path, bytes)
        .with_context(|| format!("writing dialogue sessions to {}", path.display()))
}

pub fn load_sessions(path: &Path) -> Result<TalkSelectedTable> {
    let data = fs::read(path)
        .with_context(|| format!("reading dialogue sessions from {}", path.display()))?;
    match SessionFormat::from_path(path) {
        SessionFormat::Json => serde_json::from_slice(&data)
            .with_context(|| format!("parsing dialogue sessions json: {}", path.display())),
        SessionFormat::Binary => TalkSelectedTable::parse(&data)
            .with_context(|| format!("parsing dialogue sessions: {}", path.display())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TalkSelectedTable {
        let mut table = TalkSelectedTable::default();
        let entry = table.get_mut(7).unwrap();
        entry.has_talked_to = true;
        entry.values = [12, -1, 0, 3];
        table
    }

    #[test]
    fn both_formats_restore_the_table() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["sessions.json", "sessions.sav"] {
            let path = dir.path().join(name);
            save_sessions(&sample(), &path).unwrap();
            assert_eq!(load_sessions(&path).unwrap(), sample());
        }
        let json = fs::read_to_string(dir.path().join("sessions.json")).unwrap();
        assert!(json.contains("has_talked_to"));
    }

    #[test]
    fn format_follows_extension() {
        assert_eq!(
            SessionFormat::from_path(Path::new("a/SAVE.JSON")),
            SessionFormat::Json
        );
        assert_eq!(
            SessionFormat::from_path(Path::new("a/save.dat")),
            SessionFormat::Binary
        );
    }
}
