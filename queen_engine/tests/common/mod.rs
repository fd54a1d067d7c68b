#![allow(dead_code)]

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use queen_engine::{Engine, EngineConfig, MemoryResources, RecordingHost};
use queen_formats::cutaway::OBJECT_TEXT_SPEAK;
use queen_formats::dialogue::node;
use queen_formats::{
    Area, CommandRule, ConditionRule, CutawayBuilder, DialogueBuilder, DialogueNode,
    GameStateOp, GameStatePatch, GraphicData, InventoryPatch, ItemData, LogicFile, ObjectData,
    ObjectPatch, Subject, Toggle, Verb, LOGIC_FILE_NAME,
};

pub const DOOR: u16 = 42;
pub const OTHER_SIDE: u16 = 43;
pub const KANE: u16 = 5;
pub const VASE: u16 = 6;
pub const CRATE: u16 = 7;
pub const CUPBOARD: u16 = 10;

pub const VASE_SLOT: u16 = 3;
pub const CUTSCENE_SLOT: u16 = 4;
pub const TALKED_SLOT: u16 = 8;
pub const LOCKED_SLOT: u16 = 9;

pub const DOOR_SONG: i16 = 7;
pub const KANE_KEY: usize = 3;

pub const INTRO_NARRATION: &str = "The fog rolls in over the jungle river.";

fn rule(id: u16, verb: Verb, subject1: Subject) -> CommandRule {
    CommandRule {
        id,
        verb,
        subject1,
        ..CommandRule::default()
    }
}

/// Room 1 holds objects 1..=42, room 2 holds 43 and 44.
pub fn logic() -> LogicFile {
    let mut objects = vec![ObjectData::default()];
    for id in 1..=44u16 {
        objects.push(ObjectData {
            name: id as i16,
            x: 10 + id * 5,
            y: 100,
            description: id,
            room: if id <= 42 { 1 } else { 2 },
            ..ObjectData::default()
        });
    }
    objects[KANE as usize].image = -3;
    objects[VASE as usize].image = 1;
    objects[CRATE as usize].name = -(CRATE as i16);
    objects[DOOR as usize].entry_obj = -(OTHER_SIDE as i16);
    objects[OTHER_SIDE as usize].entry_obj = -(DOOR as i16);

    let mut object_names: Vec<String> = (0..=44).map(|id| format!("thing {id}")).collect();
    object_names[DOOR as usize] = "door".into();
    object_names[VASE as usize] = "vase".into();
    object_names[KANE as usize] = "Kane".into();
    let mut responses: Vec<String> = (0..=30).map(|id| format!("Response {id}.")).collect();
    responses[0].clear();
    responses[30] = "c3.cut".into();

    LogicFile {
        commands: vec![
            CommandRule::default(),
            CommandRule {
                song: DOOR_SONG,
                ..rule(1, Verb::Open, Subject::Object(DOOR))
            },
            rule(2, Verb::Open, Subject::Object(OTHER_SIDE)),
            CommandRule {
                set_objects: true,
                set_items: true,
                set_conditions: true,
                ..rule(3, Verb::PickUp, Subject::Object(VASE))
            },
            CommandRule {
                set_conditions: true,
                ..rule(4, Verb::TalkTo, Subject::Object(KANE))
            },
        ],
        command_objects: vec![
            ObjectPatch::default(),
            ObjectPatch {
                rule_id: 3,
                target: Toggle::Off(VASE),
                ..ObjectPatch::default()
            },
        ],
        command_items: vec![
            InventoryPatch::default(),
            InventoryPatch {
                rule_id: 3,
                target: Toggle::On(1),
                source: None,
            },
        ],
        command_conditions: vec![
            ConditionRule::default(),
            ConditionRule {
                rule_id: 3,
                op: GameStateOp::Test {
                    slot: VASE_SLOT,
                    value: 1,
                },
                speak_value: 2,
            },
            ConditionRule {
                rule_id: 4,
                op: GameStateOp::Set {
                    slot: TALKED_SLOT,
                    value: 1,
                },
                speak_value: 30,
            },
        ],
        objects,
        items: vec![
            ItemData::default(),
            ItemData {
                name: -1,
                description: 1,
                ..ItemData::default()
            },
            ItemData {
                name: 2,
                description: 2,
                ..ItemData::default()
            },
        ],
        room_data: vec![0, 0, 42, 44],
        areas: vec![
            vec![Area::default()],
            vec![Area::default()],
            vec![Area::default()],
        ],
        graphics: vec![GraphicData::default(), GraphicData::default()],
        gamestate_slots: 20,
        object_names,
        object_descriptions: (0..=44).map(|id| format!("Description {id}.")).collect(),
        responses,
        ..LogicFile::default()
    }
}

/// Narration that ignores its animation list, a hide, then a gamestate
/// block that reveals the crate. Ends in room 2.
pub fn intro_cutscene() -> Vec<u8> {
    let mut builder = CutawayBuilder::new();
    builder.final_room = -2;
    let mut narration = CutawayBuilder::directive(OBJECT_TEXT_SPEAK, INTRO_NARRATION);
    narration.anim_list = 5;
    builder
        .push(narration)
        .push(CutawayBuilder::directive(-(VASE as i16), ""));
    builder.gamestate_patches.push(GameStatePatch {
        slot: -(CUTSCENE_SLOT as i16),
        value: 1,
        object: CRATE as i16,
        area_room: 0,
        area: 0,
        copy_from: 0,
    });
    builder.build()
}

/// A short narration that leads into the conversation with Kane.
pub fn talk_cutscene() -> Vec<u8> {
    let mut builder = CutawayBuilder::new();
    builder.talk_file = Some("kane.dog".into());
    builder.talk_to = KANE as i16;
    builder.push(CutawayBuilder::directive(-4, "Kane looks up."));
    builder.build()
}

pub fn outro_cutscene() -> Vec<u8> {
    let mut builder = CutawayBuilder::new();
    builder.push(CutawayBuilder::directive(-3, "Later that day..."));
    builder.build()
}

/// Level 1 offers "Who are you?" and "Bye."; the first reroutes to the
/// river question and leads to level 2, where three of four lines wait on
/// `LOCKED_SLOT`.
pub fn kane_dialogue() -> Vec<u8> {
    let locked = |head: i16| DialogueNode {
        head,
        branch: -1,
        gamestate_slot: LOCKED_SLOT as i16,
        gamestate_value: 1,
    };
    let mut builder = DialogueBuilder::new(KANE_KEY as i16);
    builder.voice_key = 2;
    builder.level([
        node(1, 0),
        node(2, 3),
        node(4, -1),
        node(0, 0),
        node(0, 0),
        node(0, 0),
    ]);
    builder.level([
        DialogueNode {
            head: 3,
            branch: 8,
            gamestate_slot: -(TALKED_SLOT as i16),
            gamestate_value: 2,
        },
        locked(10),
        locked(11),
        locked(12),
        node(13, -1),
        node(0, 0),
    ]);
    builder
        .player(2, "Who are you?")
        .player(4, "Bye.")
        .player(8, "Tell me about the river.")
        .player(10, "Can I borrow the boat?")
        .player(11, "Seen a plane?")
        .player(12, "Nice hat.")
        .player(13, "See you around.")
        .npc(1, "Hello there, stranger.")
        .npc(3, "Name's Kane.")
        .npc(4, "Mind the crocodiles.")
        .npc(13, "Bye then.");
    builder.greetings.push((1, "Back again?".into()));
    builder.cutscenes.push((13, "c4.cut".into()));
    builder.build()
}

pub fn resources() -> MemoryResources {
    let mut resources = MemoryResources::new();
    resources
        .insert(LOGIC_FILE_NAME, logic().to_bytes())
        .insert("c1.cut", intro_cutscene())
        .insert("c2.cut", talk_cutscene())
        .insert("c3.cut", outro_cutscene())
        .insert("c4.cut", outro_cutscene())
        .insert("kane.dog", kane_dialogue());
    resources
}

/// Writes the same data set as loose files for the command-line tool.
pub fn write_data_dir(dir: &Path) -> Result<()> {
    let files = [
        (LOGIC_FILE_NAME, logic().to_bytes()),
        ("C1.CUT", intro_cutscene()),
        ("C2.CUT", talk_cutscene()),
        ("C3.CUT", outro_cutscene()),
        ("C4.CUT", outro_cutscene()),
        ("KANE.DOG", kane_dialogue()),
    ];
    for (name, data) in files {
        let path = dir.join(name);
        fs::write(&path, data).with_context(|| format!("writing {}", path.display()))?;
    }
    Ok(())
}

pub fn engine_with(host: RecordingHost) -> Engine<RecordingHost, MemoryResources> {
    let mut engine = Engine::load(host, resources(), EngineConfig::default())
        .expect("fixture logic file loads");
    engine.enter_room(1).expect("room 1 exists");
    engine
}

pub fn engine() -> Engine<RecordingHost, MemoryResources> {
    engine_with(RecordingHost::new())
}
