mod common;

use anyhow::Result;
use queen_engine::{Command, CommandOutcome, HostEvent, ScriptRef};
use queen_formats::{Subject, Verb};

use common::*;

fn command(verb: Verb, subject: u16) -> Command {
    Command::new(verb, Subject::Object(subject), Subject::None)
}

#[test]
fn opening_a_closed_door_swings_both_sides() -> Result<()> {
    let mut engine = engine();
    let outcome = engine.execute_command(command(Verb::Open, DOOR))?;
    assert_eq!(outcome, CommandOutcome::Executed { rule: 1 });

    let door = engine.world().object(DOOR)?;
    assert!(door.state.is_on());
    assert_eq!(door.state.default_verb(), Verb::Close);
    assert_eq!(door.entry_obj, OTHER_SIDE as i16);

    let other = engine.world().object(OTHER_SIDE)?;
    assert!(other.state.is_on());
    assert_eq!(other.entry_obj, DOOR as i16);

    let songs = engine
        .host()
        .count(|event| *event == HostEvent::Song { song: DOOR_SONG as u16 });
    assert_eq!(songs, 1, "the rule's song plays once");
    assert!(
        engine.host().speech_lines().is_empty(),
        "no invalid-action line for a valid open"
    );
    assert!(engine
        .events()
        .iter()
        .any(|event| event == &format!("object.linked {OTHER_SIDE} via 2")));
    Ok(())
}

#[test]
fn opening_an_open_door_says_so() -> Result<()> {
    let mut engine = engine();
    engine.execute_command(command(Verb::Open, DOOR))?;
    let outcome = engine.execute_command(command(Verb::Open, DOOR))?;
    assert_eq!(outcome, CommandOutcome::Executed { rule: 1 });
    assert_eq!(engine.host().speech_lines(), vec!["Response 9."]);
    Ok(())
}

#[test]
fn failed_test_speaks_its_line_until_the_state_changes() -> Result<()> {
    let mut engine = engine();
    let outcome = engine.execute_command(command(Verb::PickUp, VASE))?;
    assert_eq!(outcome, CommandOutcome::Failed { rule: 3 });
    assert_eq!(engine.host().speech_lines(), vec!["Response 2."]);
    assert!(engine.world().inventory().is_empty());

    engine.world_mut().set_gamestate(VASE_SLOT, 1)?;
    let outcome = engine.execute_command(command(Verb::PickUp, VASE))?;
    assert_eq!(outcome, CommandOutcome::Executed { rule: 3 });
    assert_eq!(engine.world().inventory(), &[1]);
    assert!(engine.world().item(1)?.name > 0);
    assert!(engine.world().object(VASE)?.name < 0);
    assert!(engine.events().iter().any(|event| event == "inventory.insert 1"));
    Ok(())
}

#[test]
fn script_named_by_the_result_runs_instead_of_speech() -> Result<()> {
    let mut engine = engine();
    let outcome = engine.execute_command(command(Verb::TalkTo, KANE))?;
    assert_eq!(
        outcome,
        CommandOutcome::Script {
            rule: 4,
            script: ScriptRef::cutscene("c3.cut"),
        }
    );
    assert_eq!(engine.world().gamestate(TALKED_SLOT)?, 1);
    assert!(engine
        .events()
        .iter()
        .any(|event| event == "cutscene.end c3.cut"));
    assert!(!engine
        .host()
        .speech_lines()
        .iter()
        .any(|line| line.contains("c3.cut")));
    Ok(())
}

#[test]
fn unmatched_commands_fall_back_to_stock_replies() -> Result<()> {
    let mut engine = engine();
    let outcome = engine.execute_command(command(Verb::Open, CUPBOARD))?;
    assert_eq!(outcome, CommandOutcome::Fallback);
    assert_eq!(engine.host().speech_lines(), vec!["Response 1."]);
    Ok(())
}

#[test]
fn walking_to_an_object_moves_the_player_silently() -> Result<()> {
    let mut engine = engine();
    let outcome = engine.execute_command(command(Verb::WalkTo, VASE))?;
    assert_eq!(outcome, CommandOutcome::Fallback);
    let walk = HostEvent::WalkTo {
        bob: 0,
        x: 40,
        y: 100,
    };
    assert_eq!(engine.host().count(|event| *event == walk), 1);
    assert!(engine.host().speech_lines().is_empty());
    Ok(())
}

#[test]
fn hidden_subjects_end_the_command() -> Result<()> {
    let mut engine = engine();
    let outcome = engine.execute_command(command(Verb::Open, CRATE))?;
    assert_eq!(outcome, CommandOutcome::Ended);
    assert!(engine.host().speech_lines().is_empty());
    Ok(())
}
