//! Dialogue interpreter: walks a `.dog` conversation tree, offering the
//! player up to four lines per level and remembering per character which
//! level-1 lines were rerouted or used up.

pub mod menu;

use std::collections::BTreeMap;

use anyhow::{bail, Context, Result};
use log::{info, warn};
use queen_formats::{DialogueLevel, DialogueNode, DialogueTree, TalkSelected};
use serde::Serialize;

use crate::context::ScriptContext;
use crate::error::EngineError;
use crate::host::{Speaker, Suspend};
use crate::pump::{AbortScope, Flow};
use crate::scheduler::ScriptRef;
use crate::speech;

use menu::{MenuAction, MenuLayout};

/// The line the player says when walking out of a conversation.
pub const RESPONSE_TALK_ABORT: u16 = 24;
const CHOICES: std::ops::RangeInclusive<usize> = 1..=4;
/// Turns in a row taken without showing a menu before the tree is treated
/// as a cycle the player cannot leave.
const MAX_AUTO_TURNS: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DialogueOutcome {
    pub file: String,
    pub person: u16,
    /// False when the person was not in view and nothing was said.
    pub started: bool,
    pub aborted: bool,
    /// Heads of the player lines chosen, in order.
    pub chosen: Vec<i16>,
    pub next: Option<ScriptRef>,
}

/// Head-to-level lookups, built once per loaded tree. The first level in
/// scan order wins when a head appears more than once.
#[derive(Debug, Clone, Default)]
pub struct LevelIndex {
    roots: BTreeMap<i16, usize>,
    nodes: BTreeMap<i16, usize>,
}

impl LevelIndex {
    pub fn build(levels: &[DialogueLevel]) -> Self {
        let mut index = LevelIndex::default();
        for (level, nodes) in levels.iter().enumerate().skip(1) {
            if nodes[0].head > 0 {
                index.roots.entry(nodes[0].head).or_insert(level);
            }
            for node in nodes.iter().filter(|node| node.head > 0) {
                index.nodes.entry(node.head).or_insert(level);
            }
        }
        index
    }

    pub fn level_with_root(&self, head: i16) -> Option<usize> {
        self.roots.get(&head).copied()
    }

    pub fn level_with_node(&self, head: i16) -> Option<usize> {
        self.nodes.get(&head).copied()
    }
}

pub fn load(ctx: &ScriptContext<'_>, file: &str) -> Result<DialogueTree> {
    let data = ctx
        .resources
        .read(file)
        .with_context(|| format!("loading dialogue {file}"))?;
    DialogueTree::parse(&data).with_context(|| format!("parsing dialogue {file}"))
}

/// Applies the saved level-1 overrides: a positive value replaces the
/// child's head, -1 removes the child.
pub fn apply_session_overrides(levels: &mut [DialogueLevel], session: &TalkSelected) {
    let Some(level) = levels.get_mut(1) else {
        return;
    };
    for (slot, &value) in CHOICES.zip(session.values.iter()) {
        let node = &mut level[slot];
        if value > 0 {
            node.head = value;
        } else if value == -1 {
            *node = DialogueNode {
                head: -1,
                branch: -1,
                gamestate_slot: 0,
                gamestate_value: 0,
            };
        }
    }
}

/// Remembers the single session value changed during a conversation so an
/// abort can put it back.
#[derive(Debug, Clone, Copy, Default)]
struct SavedSelection {
    slot: Option<usize>,
    value: i16,
}

struct Conversation<'t> {
    file: &'t str,
    tree: DialogueTree,
    index: LevelIndex,
    person: u16,
    key: usize,
    has_talked_to: bool,
    scope: AbortScope,
    saved: SavedSelection,
    chosen: Vec<i16>,
    next: Option<ScriptRef>,
}

pub fn talk(ctx: &mut ScriptContext<'_>, file: &str, person: u16) -> Result<DialogueOutcome> {
    let mut outcome = DialogueOutcome {
        file: file.to_string(),
        person,
        started: false,
        aborted: false,
        chosen: Vec::new(),
        next: None,
    };
    let visible = ctx.world.object(person).is_ok_and(|object| object.name > 0);
    if !visible {
        ctx.log_event(format!("dialogue.skip {file} {person}"));
        return Ok(outcome);
    }

    let mut tree = load(ctx, file)?;
    let key = tree.unique_key;
    let session = *ctx
        .world
        .talk_selected()
        .get(key.max(0) as usize)
        .filter(|_| key >= 0)
        .ok_or(EngineError::UnknownDialogue(key))?;
    let index = LevelIndex::build(&tree.levels);
    if session.has_talked_to {
        apply_session_overrides(&mut tree.levels, &session);
    }
    info!(
        "dialogue {file}: key {key}, {} levels, talked before: {}",
        tree.level_count(),
        session.has_talked_to
    );
    ctx.log_event(format!("dialogue.start {file} {person}"));

    let scope = if tree.abort_allowed {
        AbortScope::Dialogue
    } else {
        AbortScope::None
    };
    let mut conversation = Conversation {
        file,
        tree,
        index,
        person,
        key: key as usize,
        has_talked_to: session.has_talked_to,
        scope,
        saved: SavedSelection::default(),
        chosen: Vec::new(),
        next: None,
    };

    let flow = conversation.run(ctx)?;
    outcome.started = true;
    outcome.chosen = std::mem::take(&mut conversation.chosen);
    if flow.is_aborted() {
        conversation.abort(ctx)?;
        outcome.aborted = true;
    } else {
        conversation.finish(ctx)?;
        outcome.next = conversation.next.take();
    }
    Ok(outcome)
}

impl Conversation<'_> {
    fn session_mut<'w>(&self, ctx: &'w mut ScriptContext<'_>) -> Result<&'w mut TalkSelected> {
        Ok(ctx
            .world
            .talk_selected_mut()
            .get_mut(self.key)
            .ok_or(EngineError::UnknownDialogue(self.key as i16))?)
    }

    fn voice(&self, head: i16, who: char) -> String {
        format!("{:02}{:04x}{who}", self.tree.voice_key, head)
    }

    fn npc_says(&self, ctx: &mut ScriptContext<'_>, text: &str, voice: &str) -> Flow {
        if text.is_empty() {
            return Flow::Continue;
        }
        speech::speak(
            ctx,
            Speaker::Object(self.person),
            text,
            Some(voice),
            self.scope,
        )
    }

    /// Player text for each selectable child, blank when it is not on offer.
    fn offered(&self, ctx: &ScriptContext<'_>, level: usize) -> [Option<String>; 4] {
        let mut offered: [Option<String>; 4] = Default::default();
        for slot in CHOICES {
            let node = self.tree.levels[level][slot];
            if node.head <= 0 {
                continue;
            }
            let Some(text) = self.tree.player_line(node.head).filter(|t| !t.is_empty()) else {
                continue;
            };
            if node.gamestate_slot > 0 {
                let held = ctx.world.gamestate(node.gamestate_slot as u16).ok();
                if held != Some(node.gamestate_value) {
                    continue;
                }
            }
            offered[slot - 1] = Some(text.to_string());
        }
        offered
    }

    fn run(&mut self, ctx: &mut ScriptContext<'_>) -> Result<Flow> {
        if self.tree.level_count() == 0 {
            warn!("dialogue {} has no levels", self.file);
            return Ok(Flow::Continue);
        }
        let mut level = 1;
        let mut pending = self.tree.levels[1][0].head;
        let mut greeting = self.has_talked_to;
        let mut auto_turns = 0;

        loop {
            let (text, voice) = match self.tree.greeting(pending).filter(|_| greeting) {
                Some(text) => (text.to_string(), format!("{:02}XXXXP", self.tree.voice_key)),
                None => (
                    self.tree.npc_line(pending).unwrap_or("").to_string(),
                    self.voice(pending, 'P'),
                ),
            };
            greeting = false;
            if self.npc_says(ctx, &text, &voice).is_aborted() {
                return Ok(Flow::Aborted);
            }

            let offered = self.offered(ctx, level);
            let mut available = CHOICES.filter(|slot| offered[slot - 1].is_some());
            let choice = match (available.next(), available.next()) {
                (None, _) => {
                    warn!("dialogue {} level {level} offers nothing", self.file);
                    return Ok(Flow::Continue);
                }
                (Some(only), None) => {
                    auto_turns += 1;
                    if auto_turns > MAX_AUTO_TURNS {
                        bail!(
                            "dialogue {} cycles through level {level} without a choice",
                            self.file
                        );
                    }
                    only
                }
                (Some(_), Some(_)) => {
                    auto_turns = 0;
                    let options = CHOICES
                        .filter_map(|slot| offered[slot - 1].as_deref().map(|text| (slot, text)));
                    let layout = MenuLayout::new(options, ctx.config.option_width);
                    match self.select(ctx, layout) {
                        Some(choice) => choice,
                        None => return Ok(Flow::Aborted),
                    }
                }
            };

            let node = self.tree.levels[level][choice];
            self.chosen.push(node.head);
            ctx.log_event(format!("dialogue.choose {} {}", self.file, node.head));
            let line = offered[choice - 1].clone().unwrap_or_default();
            let voice = self.voice(node.head, 'J');
            if speech::speak(ctx, Speaker::Player, &line, Some(&voice), self.scope).is_aborted() {
                return Ok(Flow::Aborted);
            }
            if node.gamestate_slot < 0 {
                ctx.world
                    .set_gamestate(node.gamestate_slot.unsigned_abs(), node.gamestate_value)?;
            }
            if let Some(file) = self.tree.cutscene_for(node.head) {
                self.next = Some(
                    ScriptRef::from_description(file, self.person)
                        .unwrap_or_else(|| ScriptRef::cutscene(file)),
                );
            }

            if node.branch == -1 {
                let closing = self.tree.npc_line(node.head).unwrap_or("").to_string();
                let voice = self.voice(node.head, 'P');
                return Ok(self.npc_says(ctx, &closing, &voice));
            }
            let Some(next) = self.transition(ctx, level, choice)? else {
                return Ok(Flow::Continue);
            };
            level = next;
            pending = node.branch;
        }
    }

    /// Moves to the level the chosen line branches to. Returns `None` when
    /// no level holds the branch target.
    fn transition(
        &mut self,
        ctx: &mut ScriptContext<'_>,
        level: usize,
        choice: usize,
    ) -> Result<Option<usize>> {
        let target = self.tree.levels[level][choice].branch;
        if let Some(next) = self.index.level_with_root(target) {
            let root = self.tree.levels[next][0];
            if root.branch > 0 {
                if level == 1 {
                    self.store_selection(ctx, choice, root.branch)?;
                }
                self.tree.levels[level][choice].head = root.branch;
                self.tree.levels[next][0].branch = -1;
                ctx.log_event(format!("dialogue.reroute {} {}", choice, root.branch));
            }
            if root.gamestate_slot < 0 {
                ctx.world
                    .set_gamestate(root.gamestate_slot.unsigned_abs(), root.gamestate_value)?;
            }
            return Ok(Some(next));
        }

        let next = self.index.level_with_node(target);
        self.disable(ctx, level, choice)?;
        Ok(next)
    }

    /// Takes the chosen line off the menu for the rest of this conversation
    /// and, on the first level, for later ones too.
    fn disable(&mut self, ctx: &mut ScriptContext<'_>, level: usize, choice: usize) -> Result<()> {
        let node = &mut self.tree.levels[level][choice];
        let exit = node.branch == -1;
        node.head = -1;
        node.branch = -1;
        if level == 1 && !exit {
            self.store_selection(ctx, choice, -1)?;
        }
        ctx.log_event(format!("dialogue.disable {level} {choice}"));
        Ok(())
    }

    fn store_selection(&mut self, ctx: &mut ScriptContext<'_>, choice: usize, value: i16) -> Result<()> {
        let session = self.session_mut(ctx)?;
        let old = session.values[choice - 1];
        session.values[choice - 1] = value;
        self.saved = SavedSelection {
            slot: Some(choice - 1),
            value: old,
        };
        Ok(())
    }

    /// Blocks on the option menu. `None` means the conversation was quit.
    fn select(&self, ctx: &mut ScriptContext<'_>, mut layout: MenuLayout) -> Option<usize> {
        ctx.host.show_menu(&layout);
        loop {
            let tick = ctx.pump(Suspend::Menu, self.scope);
            if tick.aborted {
                ctx.host.hide_menu();
                return None;
            }
            match layout.handle(&tick.input) {
                MenuAction::Select(choice) => {
                    ctx.host.hide_menu();
                    return Some(choice);
                }
                MenuAction::Redraw => ctx.host.show_menu(&layout),
                MenuAction::None => {}
            }
        }
    }

    fn finish(&mut self, ctx: &mut ScriptContext<'_>) -> Result<()> {
        for patch in self.tree.end_patches {
            if patch.slot <= 0 || patch.item == 0 {
                continue;
            }
            if ctx.world.gamestate(patch.slot as u16)? != patch.value {
                continue;
            }
            let item = patch.item.unsigned_abs();
            if patch.item > 0 {
                ctx.world.insert_item(item)?;
                ctx.log_event(format!("inventory.insert {item}"));
            } else {
                ctx.world.delete_item(item)?;
                ctx.log_event(format!("inventory.delete {item}"));
            }
        }
        self.session_mut(ctx)?.has_talked_to = true;
        ctx.log_event(format!("dialogue.end {}", self.file));
        Ok(())
    }

    fn abort(&mut self, ctx: &mut ScriptContext<'_>) -> Result<()> {
        ctx.host.clear_quit();
        if let Some(slot) = self.saved.slot {
            self.session_mut(ctx)?.values[slot] = self.saved.value;
        }
        ctx.log_event(format!("dialogue.abort {}", self.file));
        speech::player_response(ctx, RESPONSE_TALK_ABORT);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use queen_formats::dialogue::node;

    fn level(nodes: [(i16, i16); 6]) -> DialogueLevel {
        nodes.map(|(head, branch)| node(head, branch))
    }

    #[test]
    fn index_keeps_first_level_for_repeated_heads() {
        let levels = vec![
            DialogueLevel::default(),
            level([(1, 0), (2, 3), (4, -1), (0, 0), (0, 0), (0, 0)]),
            level([(3, 0), (2, -1), (0, 0), (0, 0), (0, 0), (0, 0)]),
            level([(3, 0), (9, -1), (0, 0), (0, 0), (0, 0), (0, 0)]),
        ];
        let index = LevelIndex::build(&levels);
        assert_eq!(index.level_with_root(3), Some(2));
        assert_eq!(index.level_with_node(2), Some(1));
        assert_eq!(index.level_with_node(9), Some(3));
        assert_eq!(index.level_with_root(2), None);
    }

    #[test]
    fn overrides_touch_only_level_one_children() {
        let mut levels = vec![
            DialogueLevel::default(),
            level([(1, 0), (2, 3), (4, -1), (5, 2), (6, 2), (7, 2)]),
        ];
        let session = TalkSelected {
            has_talked_to: true,
            values: [12, -1, 0, 0],
        };
        apply_session_overrides(&mut levels, &session);
        assert_eq!(levels[1][0].head, 1);
        assert_eq!(levels[1][1].head, 12);
        assert_eq!(levels[1][2].head, -1);
        assert_eq!(levels[1][2].branch, -1);
        assert_eq!(levels[1][3].head, 5);
    }
}
