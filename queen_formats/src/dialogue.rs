//! Dialogue tree (`.dog`) parsing.

use anyhow::{Context, Result, ensure};
use serde::Serialize;

use crate::reader::ByteReader;
use crate::writer::ByteWriter;

const HEADER_SIZE: usize = 32;
const NODES_PER_LEVEL: usize = 6;
const NODE_FIELDS: usize = 8;
const LEVEL_SIZE: usize = NODES_PER_LEVEL * NODE_FIELDS * 2;
pub const MAX_LEVELS: usize = 20;
pub const MAX_LINES: usize = 60;
pub const LINE_ALIGN: usize = 4;

/// One node of a level: slot 0 is the level root, 1..=5 its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DialogueNode {
    pub head: i16,
    /// -1 ends the conversation.
    pub branch: i16,
    /// Positive slots are prerequisites that must hold `gamestate_value`.
    pub gamestate_slot: i16,
    pub gamestate_value: i16,
}

pub type DialogueLevel = [DialogueNode; NODES_PER_LEVEL];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct EndPatch {
    pub slot: i16,
    pub value: i16,
    /// Positive inserts, negative removes `|item|`.
    pub item: i16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DialogueLine {
    pub id: i16,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DialogueCutscene {
    pub head: i16,
    pub file: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DialogueTree {
    pub abort_allowed: bool,
    pub unique_key: i16,
    pub voice_key: i16,
    pub end_patches: [EndPatch; 2],
    /// Index 0 is an empty sentinel level.
    pub levels: Vec<DialogueLevel>,
    pub player_lines: Vec<DialogueLine>,
    pub npc_lines: Vec<DialogueLine>,
    pub greetings: Vec<DialogueLine>,
    pub cutscenes: Vec<DialogueCutscene>,
}

fn find_line(lines: &[DialogueLine], id: i16) -> Option<&str> {
    lines
        .iter()
        .find(|line| line.id == id)
        .map(|line| line.text.as_str())
}

impl DialogueTree {
    pub fn parse(data: &[u8]) -> Result<Self> {
        ensure!(
            data.len() >= HEADER_SIZE,
            "dialogue buffer is {} bytes, too small for a header",
            data.len()
        );
        let mut header = ByteReader::new(data);
        let level_field = header.read_i16()?;
        let unique_key = header.read_i16()?;
        let voice_key = header.read_i16()?;
        let player_count = header.read_i16()?;
        let npc_count = header.read_i16()?;
        let mut end_patches = [EndPatch::default(); 2];
        for patch in end_patches.iter_mut() {
            let [slot, value, item] = header.read_i16_array::<3>()?;
            *patch = EndPatch { slot, value, item };
        }
        let npc_offset = header.read_u16()? as usize;
        let cutscene_offset = header.read_u16()? as usize;
        let greeting_offset = header.read_u16()? as usize;

        let level_count = level_field.unsigned_abs() as usize;
        ensure!(
            level_count <= MAX_LEVELS,
            "dialogue declares {level_count} levels (limit {MAX_LEVELS})"
        );
        for (what, count) in [("player", player_count), ("npc", npc_count)] {
            ensure!(
                (0..=MAX_LINES as i16).contains(&count),
                "dialogue declares {count} {what} lines"
            );
        }

        let mut nodes = ByteReader::at(data, HEADER_SIZE).context("node block")?;
        let mut levels = Vec::with_capacity(level_count + 1);
        levels.push(DialogueLevel::default());
        for level in 1..=level_count {
            let mut record = DialogueLevel::default();
            for node in record.iter_mut() {
                let [_, head, _, branch, _, slot, _, value] = nodes
                    .read_i16_array::<NODE_FIELDS>()
                    .with_context(|| format!("reading level {level}"))?;
                *node = DialogueNode {
                    head,
                    branch,
                    gamestate_slot: slot,
                    gamestate_value: value,
                };
            }
            levels.push(record);
        }

        let player_offset = HEADER_SIZE + level_count * LEVEL_SIZE;
        let player_lines = read_lines(data, player_offset, player_count as usize)
            .context("reading player lines")?;
        let npc_lines =
            read_lines(data, npc_offset, npc_count as usize).context("reading npc lines")?;
        let greetings = read_lines(data, greeting_offset, npc_count as usize)
            .context("reading greeting lines")?;
        let cutscenes = read_cutscenes(data, cutscene_offset).context("reading cutscene table")?;

        Ok(DialogueTree {
            abort_allowed: level_field >= 0,
            unique_key,
            voice_key,
            end_patches,
            levels,
            player_lines,
            npc_lines,
            greetings,
            cutscenes,
        })
    }

    pub fn level_count(&self) -> usize {
        self.levels.len() - 1
    }

    pub fn player_line(&self, id: i16) -> Option<&str> {
        find_line(&self.player_lines, id)
    }

    pub fn npc_line(&self, id: i16) -> Option<&str> {
        find_line(&self.npc_lines, id)
    }

    pub fn greeting(&self, id: i16) -> Option<&str> {
        find_line(&self.greetings, id)
    }

    pub fn cutscene_for(&self, head: i16) -> Option<&str> {
        self.cutscenes
            .iter()
            .find(|entry| entry.head == head)
            .map(|entry| entry.file.as_str())
    }
}

fn read_lines(data: &[u8], offset: usize, count: usize) -> Result<Vec<DialogueLine>> {
    let mut reader = ByteReader::at(data, offset)?;
    let mut lines = Vec::with_capacity(count);
    for index in 0..count {
        reader.skip(2)?;
        let id = reader.read_i16()?;
        let text = reader
            .read_pascal(LINE_ALIGN)
            .with_context(|| format!("line {index}"))?;
        lines.push(DialogueLine { id, text });
    }
    Ok(lines)
}

fn read_cutscenes(data: &[u8], offset: usize) -> Result<Vec<DialogueCutscene>> {
    let mut reader = ByteReader::at(data, offset)?;
    let count = reader.read_i16()?;
    ensure!(count >= 0, "negative cutscene count {count}");
    let mut entries = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let head = reader.read_i16()?;
        let file = reader.read_pascal(2)?;
        entries.push(DialogueCutscene { head, file });
    }
    Ok(entries)
}

/// Builds dialogue buffers for tools and fixtures.
#[derive(Debug, Clone, Default)]
pub struct DialogueBuilder {
    pub abort_allowed: bool,
    pub unique_key: i16,
    pub voice_key: i16,
    pub end_patches: [EndPatch; 2],
    pub levels: Vec<DialogueLevel>,
    pub player_lines: Vec<(i16, String)>,
    /// NPC lines and greetings share one count; greetings are padded with
    /// blank entries when shorter.
    pub npc_lines: Vec<(i16, String)>,
    pub greetings: Vec<(i16, String)>,
    pub cutscenes: Vec<(i16, String)>,
}

impl DialogueBuilder {
    pub fn new(unique_key: i16) -> Self {
        Self {
            abort_allowed: true,
            unique_key,
            ..Self::default()
        }
    }

    pub fn level(&mut self, nodes: DialogueLevel) -> &mut Self {
        self.levels.push(nodes);
        self
    }

    pub fn player(&mut self, id: i16, text: &str) -> &mut Self {
        self.player_lines.push((id, text.to_string()));
        self
    }

    pub fn npc(&mut self, id: i16, text: &str) -> &mut Self {
        self.npc_lines.push((id, text.to_string()));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        fn lines(w: &mut ByteWriter, entries: &[(i16, String)], count: usize) {
            for index in 0..count {
                let (id, text) = entries
                    .get(index)
                    .map(|(id, text)| (*id, text.as_str()))
                    .unwrap_or((0, ""));
                w.i16(0).i16(id).pascal(text, LINE_ALIGN);
            }
        }

        let npc_count = self.npc_lines.len().max(self.greetings.len());
        let levels = self.levels.len() as i16;
        let mut w = ByteWriter::new();
        w.i16(if self.abort_allowed { levels } else { -levels })
            .i16(self.unique_key)
            .i16(self.voice_key)
            .i16(self.player_lines.len() as i16)
            .i16(npc_count as i16);
        for patch in &self.end_patches {
            w.i16s(&[patch.slot, patch.value, patch.item]);
        }
        w.u16(0).u16(0).u16(0).pad_to(HEADER_SIZE);

        for level in &self.levels {
            for node in level {
                w.i16s(&[
                    0,
                    node.head,
                    0,
                    node.branch,
                    0,
                    node.gamestate_slot,
                    0,
                    node.gamestate_value,
                ]);
            }
        }
        lines(&mut w, &self.player_lines, self.player_lines.len());

        w.pad_to(w.len().div_ceil(LINE_ALIGN) * LINE_ALIGN);
        let npc_offset = w.len();
        lines(&mut w, &self.npc_lines, npc_count);

        w.pad_to(w.len().div_ceil(2) * 2);
        let cutscene_offset = w.len();
        w.i16(self.cutscenes.len() as i16);
        for (head, file) in &self.cutscenes {
            w.i16(*head).pascal(file, 2);
        }

        w.pad_to(w.len().div_ceil(LINE_ALIGN) * LINE_ALIGN);
        let greeting_offset = w.len();
        lines(&mut w, &self.greetings, npc_count);

        w.patch_u16(22, npc_offset as u16)
            .patch_u16(24, cutscene_offset as u16)
            .patch_u16(26, greeting_offset as u16);
        w.into_inner()
    }
}

/// Shorthand for a node in fixtures and tools.
pub fn node(head: i16, branch: i16) -> DialogueNode {
    DialogueNode {
        head,
        branch,
        ..DialogueNode::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DialogueBuilder {
        let mut builder = DialogueBuilder::new(7);
        builder.voice_key = 3;
        builder.end_patches[0] = EndPatch {
            slot: 5,
            value: 1,
            item: -9,
        };
        builder.level([
            node(1, 0),
            node(2, 3),
            node(4, -1),
            DialogueNode {
                head: 5,
                branch: 3,
                gamestate_slot: 12,
                gamestate_value: 2,
            },
            node(0, 0),
            node(0, 0),
        ]);
        builder.level([node(3, 0), node(6, 1), node(0, 0), node(0, 0), node(0, 0), node(0, 0)]);
        builder
            .player(2, "Who are you?")
            .player(4, "Bye.")
            .player(5, "")
            .player(6, "Thanks")
            .npc(1, "Hello, stranger.")
            .npc(3, "I'm the ferryman.");
        builder.greetings.push((1, "You again?".into()));
        builder.cutscenes.push((6, "C9.CUT".into()));
        builder
    }

    #[test]
    fn parses_built_tree() {
        let tree = DialogueTree::parse(&sample().build()).expect("parse dialogue");
        assert!(tree.abort_allowed);
        assert_eq!(tree.unique_key, 7);
        assert_eq!(tree.voice_key, 3);
        assert_eq!(tree.level_count(), 2);
        assert_eq!(tree.levels[1][3].gamestate_slot, 12);
        assert_eq!(tree.levels[2][0].head, 3);
        assert_eq!(tree.end_patches[0].item, -9);
        assert_eq!(tree.player_line(2), Some("Who are you?"));
        assert_eq!(tree.player_line(5), Some(""));
        assert_eq!(tree.player_line(6), Some("Thanks"));
        assert_eq!(tree.npc_line(3), Some("I'm the ferryman."));
        assert_eq!(tree.greeting(1), Some("You again?"));
        assert_eq!(tree.greeting(3), None);
        assert_eq!(tree.cutscene_for(6), Some("C9.CUT"));
    }

    #[test]
    fn first_matching_line_wins() {
        let mut builder = sample();
        builder.player(2, "Shadowed");
        let tree = DialogueTree::parse(&builder.build()).unwrap();
        assert_eq!(tree.player_line(2), Some("Who are you?"));
    }

    #[test]
    fn negative_level_count_disables_abort() {
        let mut builder = sample();
        builder.abort_allowed = false;
        let tree = DialogueTree::parse(&builder.build()).unwrap();
        assert!(!tree.abort_allowed);
        assert_eq!(tree.level_count(), 2);
    }

    #[test]
    fn too_many_levels_is_fatal() {
        let mut data = sample().build();
        data[0] = 0;
        data[1] = 99;
        assert!(DialogueTree::parse(&data).is_err());
    }
}
