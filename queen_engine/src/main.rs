use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use queen_engine::persistence::{load_sessions, save_sessions};
use queen_engine::{
    CommandOutcome, Engine, EngineConfig, HostEvent, RecordingHost, ResourceCollection,
    ResourceSource, ScriptRef,
};
use queen_formats::{CutawayScript, DialogueTree};
use serde::Serialize;

mod cli;
use cli::{Action, Command, DumpArgs, DumpTarget, RunArgs};

#[derive(Serialize)]
struct EventLog<'a> {
    events: &'a [String],
    host_events: &'a [HostEvent],
    scripts: &'a [ScriptRef],
    command: Option<&'a CommandOutcome>,
}

fn main() -> Result<()> {
    let (command, verbose) = cli::parse()?;
    let default_filter = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    match command {
        Command::Dump(args) => dump(args),
        Command::Run(args) => run(args),
    }
}

fn dump(args: DumpArgs) -> Result<()> {
    let resources = ResourceCollection::load_from_dir(&args.data_root)
        .with_context(|| format!("loading resources from {}", args.data_root.display()))?;
    let json = match &args.target {
        DumpTarget::Cutscene(file) => {
            let script = CutawayScript::parse(&resources.read(file)?)
                .with_context(|| format!("parsing cutscene {file}"))?;
            serde_json::to_string_pretty(&script)?
        }
        DumpTarget::Dialogue(file) => {
            let tree = DialogueTree::parse(&resources.read(file)?)
                .with_context(|| format!("parsing dialogue {file}"))?;
            serde_json::to_string_pretty(&tree)?
        }
    };
    println!("{json}");
    Ok(())
}

fn run(args: RunArgs) -> Result<()> {
    let config = EngineConfig::from_json_file(args.config.as_deref()).context("loading config")?;
    let resources = ResourceCollection::load_from_dir(&args.data_root)
        .with_context(|| format!("loading resources from {}", args.data_root.display()))?;

    let mut host = RecordingHost::new();
    host.push_choices(args.choices.iter().copied());
    if let Some(ticks) = args.abort_after {
        host.abort_cutscene_after(ticks);
        host.abort_talk_after(ticks);
    }
    let mut engine = Engine::load(host, resources, config)?;
    if let Some(path) = args.load_sessions.as_deref() {
        engine.world_mut().set_talk_selected(load_sessions(path)?);
    }
    if let Some(room) = args.room {
        engine.enter_room(room)?;
    }

    let mut scripts = Vec::new();
    let mut outcome = None;
    match args.action {
        Some(Action::Cutscene(file)) => {
            scripts = engine.play_cutscene(&file)?;
            println!("Played {} script(s) starting at {file}", scripts.len());
        }
        Some(Action::Talk { file, person }) => {
            scripts = engine.talk(&file, person)?;
            println!("Ran {} script(s) starting at {file}", scripts.len());
        }
        Some(Action::Command(command)) => {
            let result = engine.execute_command(command)?;
            println!("Command {command:?} -> {result:?}");
            outcome = Some(result);
        }
        None => println!(
            "Loaded {} rules; nothing to run",
            engine.tables().rules().count()
        ),
    }
    println!(
        "Room {} | inventory {:?} | {} host events",
        engine.world().current_room(),
        engine.world().inventory(),
        engine.host().events().len()
    );

    if let Some(path) = args.event_log_json.as_deref() {
        write_event_log(&engine, &scripts, outcome.as_ref(), path)?;
        println!("Saved event log to {}", path.display());
    }
    if let Some(path) = args.save_sessions.as_deref() {
        save_sessions(engine.world().talk_selected(), path)?;
        println!("Saved dialogue sessions to {}", path.display());
    }
    Ok(())
}

fn write_event_log(
    engine: &Engine<RecordingHost, ResourceCollection>,
    scripts: &[ScriptRef],
    command: Option<&CommandOutcome>,
    path: &Path,
) -> Result<()> {
    let log = EventLog {
        events: engine.events(),
        host_events: engine.host().events(),
        scripts,
        command,
    };
    let json = serde_json::to_string_pretty(&log).context("serializing event log to JSON")?;
    fs::write(path, json).with_context(|| format!("writing event log to {}", path.display()))
}
