use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use queen_formats::{Subject, Verb};

use queen_engine::command::Command as GameCommand;

#[derive(Parser, Debug)]
#[command(
    about = "Runs cutscenes, conversations and commands against extracted game data",
    version
)]
pub struct Args {
    /// Directory holding the game's .qra archives and/or loose resources
    #[arg(long, default_value = "data")]
    pub data_root: PathBuf,

    /// Optional JSON engine config (talk speed, quirks, seed)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Room to enter before running anything
    #[arg(long)]
    pub room: Option<u16>,

    /// Parse a cutscene resource and print it as JSON
    #[arg(long, value_name = "FILE")]
    pub dump_cutscene: Option<String>,

    /// Parse a dialogue resource and print it as JSON
    #[arg(long, value_name = "FILE")]
    pub dump_dialogue: Option<String>,

    /// Play a cutscene (and anything it chains to)
    #[arg(long, value_name = "FILE")]
    pub play_cutscene: Option<String>,

    /// Start a conversation from a dialogue file (requires --person)
    #[arg(long, value_name = "FILE")]
    pub talk: Option<String>,

    /// Object id of the person spoken to
    #[arg(long)]
    pub person: Option<u16>,

    /// Execute a command given as VERB:S1[:S2]; positive subjects are
    /// objects, negative ones inventory items
    #[arg(long, value_name = "VERB:S1[:S2]")]
    pub command: Option<String>,

    /// Menu choices to feed conversations, e.g. 2,1,1
    #[arg(long, value_delimiter = ',')]
    pub choices: Vec<u8>,

    /// Raise the quit flags after this many ticks
    #[arg(long)]
    pub abort_after: Option<u32>,

    /// Path to write the engine and host event logs as JSON
    #[arg(long)]
    pub event_log_json: Option<PathBuf>,

    /// Write the dialogue sessions here afterwards (.json or save layout)
    #[arg(long)]
    pub save_sessions: Option<PathBuf>,

    /// Restore dialogue sessions before running
    #[arg(long)]
    pub load_sessions: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(long)]
    pub verbose: bool,
}

#[derive(Debug)]
pub enum Command {
    Dump(DumpArgs),
    Run(RunArgs),
}

#[derive(Debug)]
pub enum DumpTarget {
    Cutscene(String),
    Dialogue(String),
}

#[derive(Debug)]
pub struct DumpArgs {
    pub data_root: PathBuf,
    pub target: DumpTarget,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Cutscene(String),
    Talk { file: String, person: u16 },
    Command(GameCommand),
}

#[derive(Debug)]
pub struct RunArgs {
    pub data_root: PathBuf,
    pub config: Option<PathBuf>,
    pub room: Option<u16>,
    pub action: Option<Action>,
    pub choices: Vec<u8>,
    pub abort_after: Option<u32>,
    pub event_log_json: Option<PathBuf>,
    pub save_sessions: Option<PathBuf>,
    pub load_sessions: Option<PathBuf>,
}

pub fn parse() -> Result<(Command, bool)> {
    let args = Args::parse();
    let verbose = args.verbose;
    Ok((args.into_command()?, verbose))
}

/// Accepts a verb code or a name such as `open`, `pick_up` or `Look at`.
pub fn parse_verb(text: &str) -> Result<Verb> {
    if let Ok(code) = text.parse::<i16>() {
        return Verb::from_code(code);
    }
    let key: String = text
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect();
    Ok(match key.as_str() {
        "open" => Verb::Open,
        "close" => Verb::Close,
        "move" => Verb::Move,
        "give" => Verb::Give,
        "use" => Verb::Use,
        "pickup" => Verb::PickUp,
        "talkto" | "talk" => Verb::TalkTo,
        "lookat" | "look" => Verb::LookAt,
        "walkto" | "walk" => Verb::WalkTo,
        _ => bail!("unknown verb {text:?}"),
    })
}

pub fn parse_command(text: &str) -> Result<GameCommand> {
    let mut parts = text.split(':');
    let verb = parse_verb(parts.next().unwrap_or(""))?;
    let mut subject = |what: &str| -> Result<Subject> {
        match parts.next() {
            Some(raw) => {
                let raw: i16 = raw
                    .trim()
                    .parse()
                    .with_context(|| format!("{what} subject {raw:?} is not a number"))?;
                Ok(Subject::from_raw(raw))
            }
            None => Ok(Subject::None),
        }
    };
    let subject1 = subject("first")?;
    let subject2 = subject("second")?;
    if parts.next().is_some() {
        bail!("command {text:?} has more than two subjects");
    }
    Ok(GameCommand::new(verb, subject1, subject2))
}

impl Args {
    fn into_command(self) -> Result<Command> {
        let dumps = [&self.dump_cutscene, &self.dump_dialogue]
            .iter()
            .filter(|d| d.is_some())
            .count();
        let actions = [
            self.play_cutscene.is_some(),
            self.talk.is_some(),
            self.command.is_some(),
        ]
        .iter()
        .filter(|&&set| set)
        .count();
        if dumps + actions > 1 {
            bail!("choose one of --dump-cutscene, --dump-dialogue, --play-cutscene, --talk, --command");
        }
        if self.talk.is_some() && self.person.is_none() {
            bail!("--talk requires --person");
        }
        if self.person.is_some() && self.talk.is_none() {
            bail!("--person only applies to --talk");
        }

        if let Some(file) = self.dump_cutscene {
            return Ok(Command::Dump(DumpArgs {
                data_root: self.data_root,
                target: DumpTarget::Cutscene(file),
            }));
        }
        if let Some(file) = self.dump_dialogue {
            return Ok(Command::Dump(DumpArgs {
                data_root: self.data_root,
                target: DumpTarget::Dialogue(file),
            }));
        }

        let action = match (self.play_cutscene, self.talk, self.command) {
            (Some(file), _, _) => Some(Action::Cutscene(file)),
            (_, Some(file), _) => Some(Action::Talk {
                file,
                person: self.person.unwrap_or_default(),
            }),
            (_, _, Some(text)) => Some(Action::Command(parse_command(&text)?)),
            (None, None, None) => None,
        };
        Ok(Command::Run(RunArgs {
            data_root: self.data_root,
            config: self.config,
            room: self.room,
            action,
            choices: self.choices,
            abort_after: self.abort_after,
            event_log_json: self.event_log_json,
            save_sessions: self.save_sessions,
            load_sessions: self.load_sessions,
        }))
    }
}
