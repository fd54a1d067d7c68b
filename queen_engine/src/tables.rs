use queen_formats::{
    AreaToggle, CommandRule, ConditionRule, InventoryPatch, LogicFile, ObjectPatch,
};
use serde::Serialize;

/// The immutable half of the logic file: command rules and text tables.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScriptTables {
    commands: Vec<CommandRule>,
    command_areas: Vec<AreaToggle>,
    command_objects: Vec<ObjectPatch>,
    command_items: Vec<InventoryPatch>,
    command_conditions: Vec<ConditionRule>,
    object_names: Vec<String>,
    object_descriptions: Vec<String>,
    responses: Vec<String>,
}

fn text(table: &[String], id: u16) -> &str {
    table.get(id as usize).map(String::as_str).unwrap_or("")
}

impl ScriptTables {
    pub fn from_logic(logic: &LogicFile) -> Self {
        Self {
            commands: logic.commands.clone(),
            command_areas: logic.command_areas.clone(),
            command_objects: logic.command_objects.clone(),
            command_items: logic.command_items.clone(),
            command_conditions: logic.command_conditions.clone(),
            object_names: logic.object_names.clone(),
            object_descriptions: logic.object_descriptions.clone(),
            responses: logic.responses.clone(),
        }
    }

    /// Rules 1..=N in ascending id order.
    pub fn rules(&self) -> impl Iterator<Item = &CommandRule> {
        self.commands.iter().skip(1)
    }

    pub fn rule(&self, id: u16) -> Option<&CommandRule> {
        self.commands.get(id as usize).filter(|_| id > 0)
    }

    pub fn areas_for(&self, rule: u16) -> impl Iterator<Item = &AreaToggle> {
        self.command_areas
            .iter()
            .skip(1)
            .filter(move |entry| entry.rule_id == rule)
    }

    pub fn objects_for(&self, rule: u16) -> impl Iterator<Item = &ObjectPatch> {
        self.command_objects
            .iter()
            .skip(1)
            .filter(move |entry| entry.rule_id == rule)
    }

    pub fn items_for(&self, rule: u16) -> impl Iterator<Item = &InventoryPatch> {
        self.command_items
            .iter()
            .skip(1)
            .filter(move |entry| entry.rule_id == rule)
    }

    pub fn conditions_for(&self, rule: u16) -> impl Iterator<Item = &ConditionRule> {
        self.command_conditions
            .iter()
            .skip(1)
            .filter(move |entry| entry.rule_id == rule)
    }

    pub fn object_name(&self, id: u16) -> &str {
        text(&self.object_names, id)
    }

    pub fn description(&self, id: u16) -> &str {
        text(&self.object_descriptions, id)
    }

    pub fn response(&self, id: u16) -> &str {
        text(&self.responses, id)
    }
}
