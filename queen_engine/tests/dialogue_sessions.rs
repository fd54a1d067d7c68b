mod common;

use anyhow::Result;
use queen_engine::host::{AudioLayer, InputLayer, Presentation, Suspend};
use queen_engine::{
    Engine, EngineConfig, Host, HostEvent, InputState, RecordingHost, ScriptRef, WorldState,
};
use queen_formats::dialogue::node;
use queen_formats::DialogueBuilder;

use common::*;

#[test]
fn lone_valid_child_is_taken_without_a_menu() -> Result<()> {
    let mut host = RecordingHost::new();
    host.push_choices([1]);
    let mut engine = engine_with(host);
    let scripts = engine.talk("kane.dog", KANE)?;

    assert_eq!(
        scripts,
        vec![
            ScriptRef::dialogue("kane.dog", KANE),
            ScriptRef::cutscene("c4.cut"),
        ]
    );
    assert_eq!(engine.host().menus_shown(), 1, "only level 1 needs a menu");
    assert_eq!(
        engine.host().speech_lines(),
        vec![
            "Hello there, stranger.",
            "Who are you?",
            "Name's Kane.",
            "See you around.",
            "Bye then.",
        ]
    );
    Ok(())
}

#[test]
fn reroute_is_remembered_for_the_next_visit() -> Result<()> {
    let mut host = RecordingHost::new();
    host.push_choices([1]);
    let mut engine = engine_with(host);
    engine.talk("kane.dog", KANE)?;

    let session = engine.world().talk_selected().get(KANE_KEY).copied();
    let session = session.expect("kane has a session slot");
    assert!(session.has_talked_to);
    assert_eq!(session.values, [8, 0, 0, 0]);
    assert_eq!(
        engine.world().gamestate(TALKED_SLOT)?,
        2,
        "entering level 2 sets its root's gamestate"
    );

    engine.host_mut().take_events();
    engine.host_mut().push_choices([2]);
    engine.talk("kane.dog", KANE)?;

    let menu = HostEvent::Menu {
        options: vec!["Tell me about the river.".into(), "Bye.".into()],
    };
    assert_eq!(engine.host().count(|event| *event == menu), 1);
    assert_eq!(
        engine.host().speech_lines(),
        vec!["Back again?", "Bye.", "Mind the crocodiles."]
    );
    let greeting = HostEvent::Voice {
        file: "02XXXXP.SB".into(),
        played: false,
    };
    assert_eq!(engine.host().count(|event| *event == greeting), 1);
    Ok(())
}

#[test]
fn quitting_restores_the_changed_selection() -> Result<()> {
    let mut host = RecordingHost::new();
    host.push_choices([1]);
    let mut engine = engine_with(host);
    engine.world_mut().set_gamestate(LOCKED_SLOT, 1)?;

    let scripts = engine.talk("kane.dog", KANE)?;
    assert_eq!(scripts, vec![ScriptRef::dialogue("kane.dog", KANE)]);
    assert_eq!(engine.host().menus_shown(), 2);
    assert!(engine
        .events()
        .iter()
        .any(|event| event == "dialogue.abort kane.dog"));

    let session = engine.world().talk_selected().get(KANE_KEY).copied();
    let session = session.expect("kane has a session slot");
    assert!(!session.has_talked_to);
    assert_eq!(session.values, [0, 0, 0, 0]);
    assert_eq!(engine.host().speech_lines().last(), Some(&"Response 24."));
    Ok(())
}

#[test]
fn hidden_person_is_not_spoken_to() -> Result<()> {
    let mut engine = engine();
    engine.world_mut().hide_object(KANE)?;
    let scripts = engine.talk("kane.dog", KANE)?;
    assert_eq!(scripts, vec![ScriptRef::dialogue("kane.dog", KANE)]);
    assert!(engine.host().speech_lines().is_empty());
    assert!(!engine
        .world()
        .talk_selected()
        .get(KANE_KEY)
        .is_some_and(|session| session.has_talked_to));
    Ok(())
}

/// A player who never touches the menu and walks away after a while.
#[derive(Default)]
struct IdleHost {
    ticks: u32,
}

impl Presentation for IdleHost {}
impl AudioLayer for IdleHost {}

impl InputLayer for IdleHost {
    fn poll(&mut self) -> InputState {
        InputState {
            talk_quit: self.ticks > 6000,
            ..InputState::default()
        }
    }
}

impl Host for IdleHost {
    fn update(&mut self, world: &mut WorldState, _reason: Suspend) {
        self.ticks += 1;
        world.step_bobs();
    }
}

#[test]
fn menu_waits_for_the_player() -> Result<()> {
    let mut engine = Engine::load(IdleHost::default(), resources(), EngineConfig::default())?;
    engine.enter_room(1)?;
    engine.talk("kane.dog", KANE)?;

    assert!(engine.host().ticks > 6000);
    assert!(engine
        .events()
        .iter()
        .any(|event| event == "dialogue.abort kane.dog"));
    assert!(!engine
        .events()
        .iter()
        .any(|event| event.starts_with("dialogue.choose")));
    let session = engine.world().talk_selected().get(KANE_KEY).copied();
    let session = session.expect("kane has a session slot");
    assert!(!session.has_talked_to);
    assert_eq!(session.values, [0, 0, 0, 0]);
    Ok(())
}

#[test]
fn menuless_cycle_is_an_error() -> Result<()> {
    let mut builder = DialogueBuilder::new(4);
    builder.level([
        node(1, 0),
        node(2, 1),
        node(0, 0),
        node(0, 0),
        node(0, 0),
        node(0, 0),
    ]);
    builder.player(2, "Again.").npc(1, "Round we go.");
    let mut resources = resources();
    resources.insert("loop.dog", builder.build());
    let mut engine = Engine::load(RecordingHost::new(), resources, EngineConfig::default())?;
    engine.enter_room(1)?;

    let err = engine.talk("loop.dog", KANE).unwrap_err();
    assert!(err.to_string().contains("without a choice"), "{err:#}");
    assert!(!engine
        .world()
        .talk_selected()
        .get(4)
        .is_some_and(|session| session.has_talked_to));
    Ok(())
}
