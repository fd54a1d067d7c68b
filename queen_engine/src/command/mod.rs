//! Command resolver: turns verb/noun clicks into a [`Command`], matches it
//! against the rule table and applies the winning rule's effects.

pub mod fallback;
pub mod text;

use anyhow::Result;
use queen_formats::{ObjectPatch, PatchSource, Subject, Toggle, Verb};
use serde::Serialize;

use crate::config::Quirks;
use crate::context::ScriptContext;
use crate::host::{Hotspot, InputState, KeyPress, MouseButton};
use crate::scheduler::{self, ScriptRef};
use crate::speech;
use crate::tables::ScriptTables;
use crate::world::{Costume, WorldState, PLAYER_BOB};

use fallback::Reply;
pub use text::CommandText;

pub const SPECIAL_JOURNAL: i16 = 1;
pub const SPECIAL_DRESS: i16 = 2;
pub const SPECIAL_CLOTHES: i16 = 3;
pub const SPECIAL_UNDERWEAR: i16 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Command {
    pub verb: Verb,
    pub subject1: Subject,
    pub subject2: Subject,
}

impl Command {
    pub fn new(verb: Verb, subject1: Subject, subject2: Subject) -> Self {
        Self {
            verb,
            subject1,
            subject2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Idle,
    Pending,
    Confirmed(Command),
    OpenJournal,
}

/// The command being assembled from clicks. Reset on every new command.
#[derive(Debug, Clone, Serialize)]
pub struct CommandSession {
    verb: Verb,
    action: Verb,
    subjects: [Subject; 2],
    level: u8,
    hover: Hotspot,
    text: CommandText,
}

impl Default for CommandSession {
    fn default() -> Self {
        Self {
            verb: Verb::None,
            action: Verb::None,
            subjects: [Subject::None; 2],
            level: 1,
            hover: Hotspot::None,
            text: CommandText::default(),
        }
    }
}

pub fn subject_name(world: &WorldState, tables: &ScriptTables, subject: Subject) -> String {
    let name = match subject {
        Subject::Object(id) => world.object(id).map(|o| o.name).unwrap_or(0),
        Subject::Item(id) => world.item(id).map(|i| i.name).unwrap_or(0),
        Subject::None => 0,
    };
    tables.object_name(name.unsigned_abs()).to_string()
}

fn needs_second_subject(world: &WorldState, verb: Verb, subject: Subject) -> bool {
    match verb {
        Verb::Give => true,
        Verb::Use => !world
            .subject_state(subject)
            .is_some_and(|state| state.uses_directly()),
        _ => false,
    }
}

impl CommandSession {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn level(&self) -> u8 {
        self.level
    }

    pub fn action(&self) -> Verb {
        self.action
    }

    pub fn subjects(&self) -> [Subject; 2] {
        self.subjects
    }

    fn select_verb(&mut self, verb: Verb) {
        self.reset();
        self.verb = verb;
        self.action = verb;
        self.text = CommandText::new(verb);
    }

    /// Command line text, with the hovered noun previewed in the next slot.
    pub fn display_text(&self, world: &WorldState, tables: &ScriptTables) -> String {
        let hover = match self.hover {
            Hotspot::Object(id) => Some(subject_name(world, tables, Subject::Object(id))),
            Hotspot::Item(id) => Some(subject_name(world, tables, Subject::Item(id))),
            Hotspot::None | Hotspot::Verb(_) => None,
        };
        self.text.render_with(hover.as_deref())
    }

    /// Folds one input poll into the session.
    pub fn sample(
        &mut self,
        input: &InputState,
        world: &WorldState,
        tables: &ScriptTables,
    ) -> Selection {
        match input.key {
            Some(KeyPress::Verb(verb)) => {
                self.select_verb(verb);
                return Selection::Pending;
            }
            Some(KeyPress::Journal) => {
                self.reset();
                return Selection::OpenJournal;
            }
            _ => {}
        }

        self.hover = input.hover;
        let Some(button) = input.button else {
            return self.idle_or_pending();
        };
        match input.hover {
            Hotspot::Verb(verb) => {
                self.select_verb(verb);
                Selection::Pending
            }
            Hotspot::Object(id) => self.grab(Subject::Object(id), button, world, tables),
            Hotspot::Item(id) => self.grab(Subject::Item(id), button, world, tables),
            Hotspot::None if self.level == 1 && matches!(self.action, Verb::None | Verb::WalkTo) => {
                self.reset();
                Selection::Confirmed(Command::new(Verb::WalkTo, Subject::None, Subject::None))
            }
            Hotspot::None => self.idle_or_pending(),
        }
    }

    fn idle_or_pending(&self) -> Selection {
        if self.action == Verb::None && self.subjects[0].is_none() {
            Selection::Idle
        } else {
            Selection::Pending
        }
    }

    fn grab(
        &mut self,
        subject: Subject,
        button: MouseButton,
        world: &WorldState,
        tables: &ScriptTables,
    ) -> Selection {
        let name = subject_name(world, tables, subject);
        if self.level == 1 {
            if self.action == Verb::None {
                let fallback = match subject {
                    Subject::Item(_) => Verb::LookAt,
                    _ => Verb::WalkTo,
                };
                let default_verb = world
                    .subject_state(subject)
                    .map(|state| state.default_verb())
                    .unwrap_or(Verb::None);
                self.action = match (button, default_verb) {
                    (MouseButton::Right, verb) if verb != Verb::None => verb,
                    _ => fallback,
                };
                self.text = CommandText::new(self.action);
            }
            self.subjects[0] = subject;
            self.text.set_first(&name);
            if needs_second_subject(world, self.action, subject) {
                self.level = 2;
                self.text.link();
                return Selection::Pending;
            }
        } else {
            if subject == self.subjects[0] {
                return Selection::Pending;
            }
            self.subjects[1] = subject;
            self.text.set_second(&name);
        }
        let command = Command::new(self.action, self.subjects[0], self.subjects[1]);
        self.reset();
        Selection::Confirmed(command)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    NoMatch,
    /// `writes` are the chain's unconditional sets; `speak` is the speak
    /// value of the last of them.
    Matched {
        rule: u16,
        writes: Vec<(u16, i16)>,
        speak: i16,
    },
    /// The last candidate failed a test. `speak` is that test's positive
    /// speak value, if any.
    Failed { rule: u16, speak: Option<u16> },
}

enum ChainResult {
    Passed { writes: Vec<(u16, i16)>, speak: i16 },
    FailedAt { speak: i16 },
}

fn evaluate_chain(tables: &ScriptTables, gamestate: &[i16], rule: u16) -> ChainResult {
    let mut writes = Vec::new();
    let mut speak = 0;
    for condition in tables.conditions_for(rule) {
        match condition.op {
            queen_formats::GameStateOp::Test { slot, value } => {
                if gamestate.get(slot as usize) != Some(&value) {
                    return ChainResult::FailedAt {
                        speak: condition.speak_value,
                    };
                }
            }
            queen_formats::GameStateOp::Set { slot, value } => {
                writes.push((slot, value));
                speak = condition.speak_value;
            }
        }
    }
    ChainResult::Passed { writes, speak }
}

/// Picks the rule for a command. Candidates are every rule with the same
/// verb and subjects, in id order; a candidate whose tests fail is passed
/// over unless it is the last one, which fails the whole command.
pub fn resolve(
    tables: &ScriptTables,
    gamestate: &[i16],
    command: &Command,
    quirks: &Quirks,
) -> Resolution {
    let candidates: Vec<_> = tables
        .rules()
        .filter(|rule| rule.matches(command.verb, command.subject1, command.subject2))
        // the shipped table has a rule that breaks the walkbox when run
        .filter(|rule| !quirks.is_skipped(rule.id))
        .collect();

    for (index, rule) in candidates.iter().enumerate() {
        let last = index + 1 == candidates.len();
        let chain = if rule.set_conditions {
            evaluate_chain(tables, gamestate, rule.id)
        } else {
            ChainResult::Passed {
                writes: Vec::new(),
                speak: 0,
            }
        };
        match chain {
            ChainResult::Passed { writes, speak } => {
                return Resolution::Matched {
                    rule: rule.id,
                    writes,
                    speak,
                }
            }
            ChainResult::FailedAt { speak } if last => {
                return Resolution::Failed {
                    rule: rule.id,
                    speak: (speak > 0).then_some(speak as u16),
                }
            }
            ChainResult::FailedAt { .. } => {}
        }
    }
    Resolution::NoMatch
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CommandOutcome {
    /// A two-subject verb is still waiting for its second subject.
    NotReady,
    /// The command was dropped before matching.
    Ended,
    /// No rule matched; a canned reply was given.
    Fallback,
    Executed { rule: u16 },
    Failed { rule: u16 },
    /// The rule's result named a script, which ran instead of the effects.
    Script { rule: u16, script: ScriptRef },
}

/// Runs a confirmed command to completion.
pub fn execute(ctx: &mut ScriptContext<'_>, command: Command) -> Result<CommandOutcome> {
    let Command {
        mut verb,
        subject1,
        subject2,
    } = command;

    if subject2.is_none() && needs_second_subject(ctx.world, verb, subject1) {
        return Ok(CommandOutcome::NotReady);
    }
    if matches!(verb, Verb::None | Verb::WalkTo) && subject1.is_none() {
        ctx.log_event("command.walk");
        return Ok(CommandOutcome::Ended);
    }
    for subject in [subject1, subject2] {
        if let Subject::Object(id) = subject {
            if ctx.world.object(id)?.name <= 0 {
                ctx.log_event(format!("command.hidden_subject {id}"));
                return Ok(CommandOutcome::Ended);
            }
        }
    }
    if let Subject::Object(id) = subject1 {
        let object = *ctx.world.object(id)?;
        if verb == Verb::Use && object.entry_obj > 0 {
            verb = Verb::WalkTo;
        }
        if verb == Verb::WalkTo {
            ctx.host.walk_to(PLAYER_BOB, object.x as i16, object.y as i16);
        }
    }

    let command = Command::new(verb, subject1, subject2);
    let resolution = resolve(
        ctx.tables,
        ctx.world.gamestate_slots(),
        &command,
        &ctx.config.quirks,
    );
    match resolution {
        Resolution::NoMatch => {
            ctx.log_event(format!("command.fallback {verb:?}"));
            speak_fallback(ctx, &command);
            Ok(CommandOutcome::Fallback)
        }
        Resolution::Failed { rule, speak } => {
            ctx.log_event(format!("command.failed {rule}"));
            match speak {
                Some(id) => {
                    let person = person_for(subject1);
                    if let Some(script) = ScriptRef::from_description(ctx.tables.response(id), person)
                    {
                        scheduler::run_chain(ctx, script.clone())?;
                        return Ok(CommandOutcome::Script { rule, script });
                    }
                    speech::player_response(ctx, id);
                }
                None => speak_fallback(ctx, &command),
            }
            Ok(CommandOutcome::Failed { rule })
        }
        Resolution::Matched {
            rule,
            writes,
            speak,
        } => {
            for (slot, value) in writes {
                ctx.world.set_gamestate(slot, value)?;
            }
            ctx.log_event(format!("command.execute {rule}"));
            execute_rule(ctx, rule, &command, speak)
        }
    }
}

fn person_for(subject: Subject) -> u16 {
    match subject {
        Subject::Object(id) => id,
        _ => 0,
    }
}

fn speak_reply(ctx: &mut ScriptContext<'_>, reply: Reply) {
    match reply {
        Reply::Response(id) => speech::player_response(ctx, id),
        Reply::Description(id) => speech::player_description(ctx, id),
    };
}

fn speak_fallback(ctx: &mut ScriptContext<'_>, command: &Command) {
    let reply = fallback::stock_reply(
        ctx.world,
        ctx.rng,
        command.verb,
        command.subject1,
        command.subject2,
    );
    if let Some(reply) = reply {
        speak_reply(ctx, reply);
    }
}

fn look_at(ctx: &mut ScriptContext<'_>, subject: Subject) {
    if let Some(id) = fallback::describe(ctx.world, ctx.rng, subject) {
        speech::player_description(ctx, id);
    }
}

fn execute_rule(
    ctx: &mut ScriptContext<'_>,
    rule_id: u16,
    command: &Command,
    speak: i16,
) -> Result<CommandOutcome> {
    let Some(rule) = ctx.tables.rule(rule_id).copied() else {
        return Ok(CommandOutcome::Ended);
    };
    let verb = command.verb;

    if rule.set_areas {
        let toggles: Vec<_> = ctx.tables.areas_for(rule.id).copied().collect();
        for toggle in toggles {
            match toggle.area {
                Toggle::On(area) => ctx.world.set_area(toggle.room, area, true)?,
                Toggle::Off(area) => ctx.world.set_area(toggle.room, area, false)?,
                Toggle::None => {}
            }
        }
    }

    if speak > 0 {
        let description = ctx.tables.response(speak as u16);
        if let Some(script) = ScriptRef::from_description(description, person_for(command.subject1))
        {
            scheduler::run_chain(ctx, script.clone())?;
            return Ok(CommandOutcome::Script {
                rule: rule.id,
                script,
            });
        }
    }

    let plays_song = !matches!(verb, Verb::Open | Verb::Close);
    if rule.song > 0 && plays_song {
        ctx.host.play_song(rule.song as u16);
    }
    if rule.set_objects {
        set_objects(ctx, rule.id, command.subject1)?;
    }
    if rule.set_items {
        set_items(ctx, rule.id)?;
    }
    if rule.image_order != 0 {
        if let Subject::Object(id) = command.subject1 {
            if rule.image_order < 0 {
                ctx.world.turn_image_off(id)?;
            } else {
                ctx.world.object_mut(id)?.image = rule.image_order;
            }
            ctx.host.refresh_object(id);
        }
    }
    if rule.song < 0 && plays_song {
        ctx.host.play_song(rule.song.unsigned_abs());
    }

    match rule.special_section {
        SPECIAL_JOURNAL => {
            ctx.log_event("command.journal");
            ctx.host.open_journal();
            return Ok(CommandOutcome::Executed { rule: rule.id });
        }
        SPECIAL_DRESS => use_dress(ctx, true)?,
        SPECIAL_CLOTHES => use_clothes(ctx, true)?,
        SPECIAL_UNDERWEAR => use_underwear(ctx)?,
        _ => {}
    }

    if let Subject::Object(id) = command.subject1 {
        change_object_state(ctx, verb, id, rule.song)?;
    }

    if speak > 0 {
        speech::player_response(ctx, speak as u16);
    } else if verb == Verb::LookAt {
        look_at(ctx, command.subject1);
    }
    Ok(CommandOutcome::Executed { rule: rule.id })
}

fn set_objects(ctx: &mut ScriptContext<'_>, rule: u16, subject1: Subject) -> Result<()> {
    let patches: Vec<ObjectPatch> = ctx.tables.objects_for(rule).copied().collect();
    let room = ctx.world.current_room();
    for patch in patches {
        match patch.target {
            Toggle::On(target) => {
                let object = ctx.world.object_mut(target)?;
                object.name = object.name.abs();
                if patch.source == PatchSource::Delete && object.name != 0 {
                    object.name = 0;
                    let (in_room, person) = (object.room == room, object.is_person());
                    // the selected object's image is handled by the rule's image order
                    if in_room && subject1 != Subject::Object(target) && !person {
                        ctx.world.turn_image_off(target)?;
                    }
                }
                if let PatchSource::CopyFrom(source) = patch.source {
                    let source = ctx.config.quirks.copy_source(target, source);
                    ctx.world.copy_object(source, target)?;
                }
                ctx.host.refresh_object(target);
            }
            Toggle::Off(target) => {
                let object = *ctx.world.object(target)?;
                if object.name > 0 {
                    ctx.world.hide_object(target)?;
                    if object.room == room && subject1 != Subject::Object(target) {
                        ctx.world.clear_object_bob(target);
                    }
                }
            }
            Toggle::None => {}
        }
    }
    Ok(())
}

fn set_items(ctx: &mut ScriptContext<'_>, rule: u16) -> Result<()> {
    let patches: Vec<_> = ctx.tables.items_for(rule).copied().collect();
    for patch in patches {
        match patch.target {
            Toggle::On(target) => {
                if let Some(source) = patch.source {
                    ctx.world.copy_item(source, target)?;
                }
                ctx.world.insert_item(target)?;
                ctx.log_event(format!("inventory.insert {target}"));
            }
            Toggle::Off(target) => {
                if ctx.world.item(target)?.name > 0 {
                    ctx.world.delete_item(target)?;
                    ctx.log_event(format!("inventory.delete {target}"));
                }
            }
            Toggle::None => {}
        }
    }
    Ok(())
}

fn change_object_state(ctx: &mut ScriptContext<'_>, verb: Verb, id: u16, song: i16) -> Result<()> {
    let object = *ctx.world.object(id)?;
    let opening = match verb {
        Verb::Open => true,
        Verb::Close => false,
        Verb::Move => {
            let target = ctx.world.object_mut(id)?;
            target.state = target.state.with_on(!object.state.is_on());
            return Ok(());
        }
        _ => return Ok(()),
    };

    if object.state.is_on() == opening {
        let already = if opening {
            fallback::RESPONSE_ALREADY_OPEN
        } else {
            fallback::RESPONSE_ALREADY_CLOSED
        };
        speech::player_response(ctx, already);
        return Ok(());
    }

    let next_verb = if opening { Verb::Close } else { Verb::Open };
    let target = ctx.world.object_mut(id)?;
    target.state = target.state.with_on(opening).with_default_verb(next_verb);
    ctx.log_event(format!(
        "object.{} {id}",
        if opening { "open" } else { "close" }
    ));
    if song != 0 {
        ctx.host.play_song(song.unsigned_abs());
    }
    if object.entry_obj != 0 {
        let linked = object.entry_obj.unsigned_abs();
        toggle_linked_door(ctx, verb, linked)?;
        let target = ctx.world.object_mut(id)?;
        target.entry_obj = if opening {
            linked as i16
        } else {
            -(linked as i16)
        };
    }
    Ok(())
}

/// Opens or closes the other side of a door through the first OPEN/CLOSE
/// rule for it whose tests currently hold.
fn toggle_linked_door(ctx: &mut ScriptContext<'_>, verb: Verb, other: u16) -> Result<()> {
    let gamestate = ctx.world.gamestate_slots();
    let rule = ctx
        .tables
        .rules()
        .filter(|rule| rule.matches(verb, Subject::Object(other), Subject::None))
        .find(|rule| {
            !rule.set_conditions
                || ctx.tables.conditions_for(rule.id).all(|cond| match cond.op {
                    queen_formats::GameStateOp::Test { slot, value } => {
                        gamestate.get(slot as usize) == Some(&value)
                    }
                    queen_formats::GameStateOp::Set { .. } => true,
                })
        })
        .copied();
    let Some(rule) = rule else {
        return Ok(());
    };

    let opening = verb == Verb::Open;
    let object = ctx.world.object_mut(other)?;
    if rule.image_order != 0 {
        object.image = rule.image_order;
    }
    if object.state.is_on() != opening {
        let next_verb = if opening { Verb::Close } else { Verb::Open };
        object.state = object.state.with_on(opening).with_default_verb(next_verb);
        let magnitude = object.entry_obj.abs();
        object.entry_obj = if opening { magnitude } else { -magnitude };
    }
    ctx.log_event(format!("object.linked {other} via {}", rule.id));
    ctx.host.refresh_object(other);
    Ok(())
}

fn set_costume(ctx: &mut ScriptContext<'_>, costume: Costume) {
    ctx.world.player.costume = costume;
    ctx.host.load_player_banks(costume);
    ctx.log_event(format!("costume.change {costume:?}"));
}

/// Puts the dress on, playing the dressing cutscene when asked to.
pub fn use_dress(ctx: &mut ScriptContext<'_>, show_cut: bool) -> Result<()> {
    let costumes = ctx.config.costumes.clone();
    if show_cut {
        if ctx.world.gamestate(costumes.dressing_slot)? == 0 {
            scheduler::run_chain(ctx, ScriptRef::cutscene(&costumes.dress_cutscene))?;
            ctx.world.insert_item(costumes.clothes_item)?;
        } else {
            scheduler::run_chain(ctx, ScriptRef::cutscene(&costumes.undress_cutscene))?;
        }
    }
    set_costume(ctx, Costume::Dress);
    ctx.world.delete_item(costumes.dress_item)?;
    ctx.world.set_gamestate(costumes.dressing_slot, 2)?;
    Ok(())
}

pub fn use_clothes(ctx: &mut ScriptContext<'_>, show_cut: bool) -> Result<()> {
    let costumes = ctx.config.costumes.clone();
    if show_cut {
        scheduler::run_chain(ctx, ScriptRef::cutscene(&costumes.clothes_cutscene))?;
        ctx.world.insert_item(costumes.dress_item)?;
    }
    set_costume(ctx, Costume::Normal);
    ctx.world.delete_item(costumes.clothes_item)?;
    ctx.world.set_gamestate(costumes.dressing_slot, 0)?;
    Ok(())
}

pub fn use_underwear(ctx: &mut ScriptContext<'_>) -> Result<()> {
    set_costume(ctx, Costume::Underwear);
    ctx.world.set_gamestate(ctx.config.costumes.dressing_slot, 1)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use queen_formats::{CommandRule, ConditionRule, GameStateOp, LogicFile, ObjectState};

    fn rule(id: u16, verb: Verb, s1: Subject, s2: Subject, conditions: bool) -> CommandRule {
        CommandRule {
            id,
            verb,
            subject1: s1,
            subject2: s2,
            set_conditions: conditions,
            ..CommandRule::default()
        }
    }

    fn test(rule_id: u16, slot: u16, value: i16, speak: i16) -> ConditionRule {
        ConditionRule {
            rule_id,
            op: GameStateOp::Test { slot, value },
            speak_value: speak,
        }
    }

    fn set(rule_id: u16, slot: u16, value: i16, speak: i16) -> ConditionRule {
        ConditionRule {
            rule_id,
            op: GameStateOp::Set { slot, value },
            speak_value: speak,
        }
    }

    fn tables(commands: Vec<CommandRule>, conditions: Vec<ConditionRule>) -> ScriptTables {
        let mut all_commands = vec![CommandRule::default()];
        all_commands.extend(commands);
        let mut all_conditions = vec![ConditionRule::default()];
        all_conditions.extend(conditions);
        ScriptTables::from_logic(&LogicFile {
            commands: all_commands,
            command_conditions: all_conditions,
            ..LogicFile::default()
        })
    }

    const DOOR: Subject = Subject::Object(42);

    #[test]
    fn first_passing_candidate_wins() {
        let tables = tables(
            vec![
                rule(1, Verb::Open, DOOR, Subject::None, true),
                rule(2, Verb::Open, DOOR, Subject::None, true),
                rule(3, Verb::Open, DOOR, Subject::None, false),
            ],
            vec![test(1, 1, 5, 0), test(2, 1, 0, 0), set(2, 2, 7, 30)],
        );
        let command = Command::new(Verb::Open, DOOR, Subject::None);
        let resolution = resolve(&tables, &[0; 4], &command, &Quirks::default());
        assert_eq!(
            resolution,
            Resolution::Matched {
                rule: 2,
                writes: vec![(2, 7)],
                speak: 30
            }
        );
    }

    #[test]
    fn failing_last_candidate_fails_the_command() {
        let tables = tables(
            vec![
                rule(1, Verb::Open, DOOR, Subject::None, true),
                rule(2, Verb::Open, DOOR, Subject::None, true),
            ],
            vec![test(1, 1, 5, 0), test(2, 1, 6, 14)],
        );
        let command = Command::new(Verb::Open, DOOR, Subject::None);
        let gamestate = [0; 4];
        assert_eq!(
            resolve(&tables, &gamestate, &command, &Quirks::default()),
            Resolution::Failed {
                rule: 2,
                speak: Some(14)
            }
        );

        let silent = self::tables(
            vec![rule(1, Verb::Open, DOOR, Subject::None, true)],
            vec![test(1, 1, 5, -1)],
        );
        assert_eq!(
            resolve(&silent, &gamestate, &command, &Quirks::default()),
            Resolution::Failed {
                rule: 1,
                speak: None
            }
        );
    }

    #[test]
    fn unmatched_and_skipped_rules_give_no_match() {
        let tables = tables(vec![rule(469, Verb::Move, DOOR, Subject::None, false)], vec![]);
        let moving = Command::new(Verb::Move, DOOR, Subject::None);
        assert_eq!(
            resolve(&tables, &[0], &moving, &Quirks::default()),
            Resolution::NoMatch
        );
        let closing = Command::new(Verb::Close, DOOR, Subject::None);
        assert_eq!(
            resolve(&tables, &[0], &closing, &Quirks::default()),
            Resolution::NoMatch
        );
    }

    #[test]
    fn writes_wait_for_the_whole_chain() {
        let tables = tables(
            vec![rule(1, Verb::Use, Subject::Item(3), DOOR, true)],
            vec![set(1, 2, 9, 0), test(1, 1, 1, 0)],
        );
        let command = Command::new(Verb::Use, Subject::Item(3), DOOR);
        assert_eq!(
            resolve(&tables, &[0, 0, 0], &command, &Quirks::default()),
            Resolution::Failed {
                rule: 1,
                speak: None
            }
        );
    }

    fn session_world() -> (WorldState, ScriptTables) {
        use crate::world::tests::sample_logic;
        let mut logic = sample_logic();
        logic.objects[1].state = ObjectState::default().with_default_verb(Verb::Open);
        logic.items[1].state = ObjectState(0);
        logic.object_names = vec![String::new(), "Door".into(), "Guard".into()];
        (WorldState::from_logic(&logic), ScriptTables::from_logic(&logic))
    }

    #[test]
    fn right_click_uses_default_verb() {
        let (world, tables) = session_world();
        let mut session = CommandSession::default();
        let input = InputState::click(Hotspot::Object(1), MouseButton::Right);
        assert_eq!(
            session.sample(&input, &world, &tables),
            Selection::Confirmed(Command::new(Verb::Open, Subject::Object(1), Subject::None))
        );
        let left = InputState::click(Hotspot::Object(2), MouseButton::Left);
        assert_eq!(
            session.sample(&left, &world, &tables),
            Selection::Confirmed(Command::new(Verb::WalkTo, Subject::Object(2), Subject::None))
        );
    }

    #[test]
    fn use_waits_for_second_subject_with_link_word() {
        let (world, tables) = session_world();
        let mut session = CommandSession::default();
        let verb = InputState::click(Hotspot::Verb(Verb::Use), MouseButton::Left);
        assert_eq!(session.sample(&verb, &world, &tables), Selection::Pending);
        let item = InputState::click(Hotspot::Item(1), MouseButton::Left);
        assert_eq!(session.sample(&item, &world, &tables), Selection::Pending);
        assert_eq!(session.level(), 2);

        let hover = InputState {
            hover: Hotspot::Object(1),
            ..InputState::default()
        };
        assert_eq!(session.sample(&hover, &world, &tables), Selection::Pending);
        assert_eq!(session.display_text(&world, &tables), "Use Door with Door");

        let target = InputState::click(Hotspot::Object(2), MouseButton::Left);
        assert_eq!(
            session.sample(&target, &world, &tables),
            Selection::Confirmed(Command::new(Verb::Use, Subject::Item(1), Subject::Object(2)))
        );
        assert_eq!(session.level(), 1);
    }

    #[test]
    fn journal_key_resets_the_session() {
        let (world, tables) = session_world();
        let mut session = CommandSession::default();
        session.sample(
            &InputState::key(KeyPress::Verb(Verb::Give)),
            &world,
            &tables,
        );
        assert_eq!(session.action(), Verb::Give);
        assert_eq!(
            session.sample(&InputState::key(KeyPress::Journal), &world, &tables),
            Selection::OpenJournal
        );
        assert_eq!(session.action(), Verb::None);
    }
}
