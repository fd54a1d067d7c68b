use log::debug;
use rand_chacha::ChaCha8Rng;

use crate::config::EngineConfig;
use crate::host::Host;
use crate::resources::ResourceSource;
use crate::tables::ScriptTables;
use crate::world::WorldState;

/// Everything one interpreter invocation may touch. The engine lends its
/// fields out for the duration of a command, cutscene or conversation.
pub struct ScriptContext<'a> {
    pub world: &'a mut WorldState,
    pub host: &'a mut dyn Host,
    pub tables: &'a ScriptTables,
    pub resources: &'a dyn ResourceSource,
    pub config: &'a EngineConfig,
    pub rng: &'a mut ChaCha8Rng,
    pub events: &'a mut Vec<String>,
}

impl ScriptContext<'_> {
    pub fn log_event<S: Into<String>>(&mut self, event: S) {
        let event = event.into();
        debug!("{event}");
        self.events.push(event);
    }

    /// Name of the object or item as shown in the command line.
    pub fn object_name(&self, id: u16) -> &str {
        self.world
            .object(id)
            .ok()
            .map(|object| self.tables.object_name(object.name.unsigned_abs()))
            .unwrap_or("")
    }

    pub fn item_name(&self, id: u16) -> &str {
        self.world
            .item(id)
            .ok()
            .map(|item| self.tables.object_name(item.name.unsigned_abs()))
            .unwrap_or("")
    }
}
