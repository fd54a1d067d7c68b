use anyhow::{Context, Result};
use log::info;
use queen_formats::{LogicFile, LOGIC_FILE_NAME};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::command::{self, Command, CommandOutcome, CommandSession, Selection};
use crate::config::EngineConfig;
use crate::context::ScriptContext;
use crate::host::{Host, InputState, Suspend};
use crate::resources::ResourceSource;
use crate::scheduler::{self, ScriptRef};
use crate::tables::ScriptTables;
use crate::world::WorldState;

/// Owns the world and lends it, with the host and tables, to whichever
/// interpreter is running. Scripts chained by one another run back to back.
pub struct Engine<H: Host, R: ResourceSource> {
    world: WorldState,
    tables: ScriptTables,
    host: H,
    resources: R,
    config: EngineConfig,
    rng: ChaCha8Rng,
    events: Vec<String>,
    session: CommandSession,
}

impl<H: Host, R: ResourceSource> Engine<H, R> {
    /// Reads the logic file from `resources` and builds a fresh world.
    pub fn load(host: H, resources: R, config: EngineConfig) -> Result<Self> {
        let data = resources
            .read(LOGIC_FILE_NAME)
            .context("loading logic file")?;
        let logic = LogicFile::parse(&data).context("parsing logic file")?;
        info!(
            "logic: {} rules, {} objects, {} items, {} rooms",
            logic.commands.len().saturating_sub(1),
            logic.objects.len().saturating_sub(1),
            logic.items.len().saturating_sub(1),
            logic.room_count()
        );
        Ok(Self::from_logic(&logic, host, resources, config))
    }

    pub fn from_logic(logic: &LogicFile, host: H, resources: R, config: EngineConfig) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        Engine {
            world: WorldState::from_logic(logic),
            tables: ScriptTables::from_logic(logic),
            host,
            resources,
            config,
            rng,
            events: Vec::new(),
            session: CommandSession::default(),
        }
    }

    fn context(&mut self) -> ScriptContext<'_> {
        ScriptContext {
            world: &mut self.world,
            host: &mut self.host,
            tables: &self.tables,
            resources: &self.resources,
            config: &self.config,
            rng: &mut self.rng,
            events: &mut self.events,
        }
    }

    pub fn enter_room(&mut self, room: u16) -> Result<()> {
        self.world.enter_room(room)?;
        self.host.display_room(room, true);
        self.events.push(format!("room.enter {room}"));
        Ok(())
    }

    /// Folds one input poll into the command being assembled and refreshes
    /// the command line.
    pub fn sample_selection(&mut self, input: &InputState) -> Selection {
        let selection = self.session.sample(input, &self.world, &self.tables);
        let text = self.session.display_text(&self.world, &self.tables);
        self.host.set_command_text(&text);
        if selection == Selection::OpenJournal {
            self.events.push("command.journal".to_string());
            self.host.open_journal();
        }
        selection
    }

    pub fn execute_command(&mut self, command: Command) -> Result<CommandOutcome> {
        let mut ctx = self.context();
        ctx.log_event(format!(
            "command.start {:?} {} {}",
            command.verb,
            command.subject1.raw(),
            command.subject2.raw()
        ));
        command::execute(&mut ctx, command)
    }

    /// One idle frame: pump, poll, and run a command if the input confirmed one.
    pub fn frame(&mut self) -> Result<Option<CommandOutcome>> {
        self.host.update(&mut self.world, Suspend::Ticks);
        let input = self.host.poll();
        match self.sample_selection(&input) {
            Selection::Confirmed(command) => self.execute_command(command).map(Some),
            _ => Ok(None),
        }
    }

    pub fn play_cutscene(&mut self, file: &str) -> Result<Vec<ScriptRef>> {
        scheduler::run_chain(&mut self.context(), ScriptRef::cutscene(file))
    }

    pub fn talk(&mut self, file: &str, person: u16) -> Result<Vec<ScriptRef>> {
        scheduler::run_chain(&mut self.context(), ScriptRef::dialogue(file, person))
    }

    pub fn events(&self) -> &[String] {
        &self.events
    }

    pub fn world(&self) -> &WorldState {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut WorldState {
        &mut self.world
    }

    pub fn tables(&self) -> &ScriptTables {
        &self.tables
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn resources(&self) -> &R {
        &self.resources
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{Hotspot, MouseButton, RecordingHost};
    use crate::resources::MemoryResources;
    use crate::world::tests::sample_logic;

    #[test]
    fn load_reads_the_logic_file() {
        let mut resources = MemoryResources::new();
        resources.insert(LOGIC_FILE_NAME, sample_logic().to_bytes());
        let engine = Engine::load(RecordingHost::new(), resources, EngineConfig::default()).unwrap();
        assert_eq!(engine.world().room_count(), 2);
        assert!(engine.tables().rule(1).is_none());
    }

    #[test]
    fn missing_logic_file_is_an_error() {
        let result = Engine::load(
            RecordingHost::new(),
            MemoryResources::new(),
            EngineConfig::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn walking_to_nothing_ends_quietly() {
        let mut engine = Engine::from_logic(
            &sample_logic(),
            RecordingHost::new(),
            MemoryResources::new(),
            EngineConfig::default(),
        );
        engine.enter_room(1).unwrap();
        let input = InputState::click(Hotspot::None, MouseButton::Left);
        let Selection::Confirmed(command) = engine.sample_selection(&input) else {
            panic!("expected a confirmed walk");
        };
        assert_eq!(
            engine.execute_command(command).unwrap(),
            CommandOutcome::Ended
        );
        assert!(engine.events().iter().any(|event| event == "command.walk"));
    }
}
