//! Parser for the logic file (`QUEEN.JAS`): the command rule tables plus the
//! initial object, item, area and text tables the interpreters mutate.
//!
//! Every section starts with a big-endian record count and index 0 of each
//! table is a synthesised sentinel, so ids can index the vectors directly.

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

use crate::reader::ByteReader;
use crate::verb::{ObjectState, Verb};
use crate::writer::ByteWriter;

pub const LOGIC_FILE_NAME: &str = "QUEEN.JAS";

/// Command subject: positive raw ids are room objects, negative raw ids are
/// inventory items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Subject {
    #[default]
    None,
    Object(u16),
    Item(u16),
}

impl Subject {
    pub fn from_raw(raw: i16) -> Self {
        match raw {
            0 => Subject::None,
            v if v > 0 => Subject::Object(v as u16),
            v => Subject::Item(v.unsigned_abs()),
        }
    }

    pub fn raw(self) -> i16 {
        match self {
            Subject::None => 0,
            Subject::Object(id) => id as i16,
            Subject::Item(id) => -(id as i16),
        }
    }

    pub fn is_none(self) -> bool {
        matches!(self, Subject::None)
    }
}

/// Signed show/hide (or on/off) reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Toggle {
    #[default]
    None,
    On(u16),
    Off(u16),
}

impl Toggle {
    pub fn from_raw(raw: i16) -> Self {
        match raw {
            0 => Toggle::None,
            v if v > 0 => Toggle::On(v as u16),
            v => Toggle::Off(v.unsigned_abs()),
        }
    }

    pub fn raw(self) -> i16 {
        match self {
            Toggle::None => 0,
            Toggle::On(id) => id as i16,
            Toggle::Off(id) => -(id as i16),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum PatchSource {
    #[default]
    None,
    Delete,
    CopyFrom(u16),
}

impl PatchSource {
    pub fn from_raw(raw: i16) -> Self {
        match raw {
            -1 => PatchSource::Delete,
            v if v > 0 => PatchSource::CopyFrom(v as u16),
            _ => PatchSource::None,
        }
    }

    pub fn raw(self) -> i16 {
        match self {
            PatchSource::None => 0,
            PatchSource::Delete => -1,
            PatchSource::CopyFrom(id) => id as i16,
        }
    }
}

/// A gamestate access in a condition chain: positive raw slots are tests,
/// the rest are unconditional writes to `|slot|`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GameStateOp {
    Test { slot: u16, value: i16 },
    Set { slot: u16, value: i16 },
}

impl Default for GameStateOp {
    fn default() -> Self {
        GameStateOp::Test { slot: 0, value: 0 }
    }
}

impl GameStateOp {
    pub fn from_raw(slot: i16, value: i16) -> Self {
        if slot > 0 {
            GameStateOp::Test {
                slot: slot as u16,
                value,
            }
        } else {
            GameStateOp::Set {
                slot: slot.unsigned_abs(),
                value,
            }
        }
    }

    fn raw(self) -> (i16, i16) {
        match self {
            GameStateOp::Test { slot, value } => (slot as i16, value),
            GameStateOp::Set { slot, value } => (-(slot as i16), value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CommandRule {
    pub id: u16,
    pub verb: Verb,
    pub subject1: Subject,
    pub subject2: Subject,
    pub song: i16,
    pub set_areas: bool,
    pub set_objects: bool,
    pub set_items: bool,
    pub set_conditions: bool,
    pub image_order: i16,
    pub special_section: i16,
}

impl CommandRule {
    pub fn matches(&self, verb: Verb, subject1: Subject, subject2: Subject) -> bool {
        self.verb == verb && self.subject1 == subject1 && self.subject2 == subject2
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AreaToggle {
    pub rule_id: u16,
    pub area: Toggle,
    pub room: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ObjectPatch {
    pub rule_id: u16,
    pub target: Toggle,
    pub source: PatchSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InventoryPatch {
    pub rule_id: u16,
    pub target: Toggle,
    pub source: Option<u16>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConditionRule {
    pub rule_id: u16,
    pub op: GameStateOp,
    pub speak_value: i16,
}

/// Image code of a person that is drawn through the person banks.
pub const PERSON_IMAGES: [i16; 2] = [-3, -4];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ObjectData {
    /// >0 visible, <0 hidden, 0 deleted.
    pub name: i16,
    pub x: u16,
    pub y: u16,
    pub description: u16,
    /// Linked door: >0 open, <0 closed.
    pub entry_obj: i16,
    pub room: u16,
    pub state: ObjectState,
    pub image: i16,
}

impl ObjectData {
    pub fn is_person(&self) -> bool {
        PERSON_IMAGES.contains(&self.image)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ItemData {
    pub name: i16,
    pub image: i16,
    pub frame: u16,
    pub description: u16,
    pub sfx_description: i16,
    pub state: ObjectState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Area {
    /// Sign encodes on (>0) / off (<0).
    pub map_neighbours: i16,
    pub x1: i16,
    pub y1: i16,
    pub x2: i16,
    pub y2: i16,
}

impl Area {
    pub fn is_on(&self) -> bool {
        self.map_neighbours > 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GraphicData {
    pub x: u16,
    pub y: u16,
    pub first_frame: i16,
    pub last_frame: i16,
}

impl GraphicData {
    pub fn frame_count(&self) -> i16 {
        if self.last_frame > 0 {
            self.last_frame - self.first_frame + 1
        } else {
            1
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesKind {
    /// First look shows the first line, later looks pick at random.
    #[default]
    RandomAfterFirst,
    Random,
    Looping,
    Clamped,
}

impl SeriesKind {
    fn from_code(code: i16) -> Result<Self> {
        Ok(match code {
            0 => SeriesKind::RandomAfterFirst,
            1 => SeriesKind::Random,
            2 => SeriesKind::Looping,
            3 => SeriesKind::Clamped,
            other => anyhow::bail!("unknown description series type {other}"),
        })
    }

    fn code(self) -> i16 {
        match self {
            SeriesKind::RandomAfterFirst => 0,
            SeriesKind::Random => 1,
            SeriesKind::Looping => 2,
            SeriesKind::Clamped => 3,
        }
    }
}

/// Several LOOK AT lines for one subject, cycled per `kind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DescriptionSeries {
    pub subject: Subject,
    pub kind: SeriesKind,
    pub last_description: u16,
    pub last_seen: u16,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogicFile {
    pub commands: Vec<CommandRule>,
    pub command_areas: Vec<AreaToggle>,
    pub command_objects: Vec<ObjectPatch>,
    pub command_items: Vec<InventoryPatch>,
    pub command_conditions: Vec<ConditionRule>,
    pub objects: Vec<ObjectData>,
    pub items: Vec<ItemData>,
    /// `room_data[r] + 1 ..= room_data[r + 1]` are the objects of room `r`.
    pub room_data: Vec<u16>,
    /// Indexed `[room][area]`, both with sentinels.
    pub areas: Vec<Vec<Area>>,
    pub graphics: Vec<GraphicData>,
    pub description_series: Vec<DescriptionSeries>,
    pub gamestate_slots: u16,
    pub object_names: Vec<String>,
    pub object_descriptions: Vec<String>,
    pub responses: Vec<String>,
}

fn read_records<T: Default>(
    reader: &mut ByteReader<'_>,
    what: &str,
    mut parse: impl FnMut(&mut ByteReader<'_>, u16) -> Result<T>,
) -> Result<Vec<T>> {
    let count = reader
        .read_u16()
        .with_context(|| format!("reading {what} count"))?;
    let mut records = Vec::with_capacity(count as usize + 1);
    records.push(T::default());
    for index in 1..=count {
        let record = parse(reader, index).with_context(|| format!("reading {what} {index}"))?;
        records.push(record);
    }
    Ok(records)
}

fn read_strings(reader: &mut ByteReader<'_>, what: &str) -> Result<Vec<String>> {
    read_records(reader, what, |r, _| r.read_pascal(2))
}

impl LogicFile {
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut reader = ByteReader::new(data);
        let r = &mut reader;

        let commands = read_records(r, "command", |r, id| {
            let [verb, s1, s2, song, areas, objects, items, conditions, image, special] =
                r.read_i16_array::<10>()?;
            Ok(CommandRule {
                id,
                verb: Verb::from_code(verb)?,
                subject1: Subject::from_raw(s1),
                subject2: Subject::from_raw(s2),
                song,
                set_areas: areas != 0,
                set_objects: objects != 0,
                set_items: items != 0,
                set_conditions: conditions != 0,
                image_order: image,
                special_section: special,
            })
        })?;
        let command_areas = read_records(r, "command area", |r, _| {
            let [rule_id, area, room] = r.read_i16_array::<3>()?;
            Ok(AreaToggle {
                rule_id: rule_id as u16,
                area: Toggle::from_raw(area),
                room: room as u16,
            })
        })?;
        let command_objects = read_records(r, "command object", |r, _| {
            let [rule_id, dst, src] = r.read_i16_array::<3>()?;
            Ok(ObjectPatch {
                rule_id: rule_id as u16,
                target: Toggle::from_raw(dst),
                source: PatchSource::from_raw(src),
            })
        })?;
        let command_items = read_records(r, "command inventory", |r, _| {
            let [rule_id, dst, src] = r.read_i16_array::<3>()?;
            Ok(InventoryPatch {
                rule_id: rule_id as u16,
                target: Toggle::from_raw(dst),
                source: (src > 0).then_some(src as u16),
            })
        })?;
        let command_conditions = read_records(r, "command gamestate", |r, _| {
            let [rule_id, slot, value, speak] = r.read_i16_array::<4>()?;
            Ok(ConditionRule {
                rule_id: rule_id as u16,
                op: GameStateOp::from_raw(slot, value),
                speak_value: speak,
            })
        })?;
        let objects = read_records(r, "object", |r, _| {
            let [name, x, y, description, entry_obj, room, state, image] =
                r.read_i16_array::<8>()?;
            Ok(ObjectData {
                name,
                x: x as u16,
                y: y as u16,
                description: description as u16,
                entry_obj,
                room: room as u16,
                state: ObjectState(state as u16),
                image,
            })
        })?;
        let items = read_records(r, "item", |r, _| {
            let [name, image, frame, description, sfx, state] = r.read_i16_array::<6>()?;
            Ok(ItemData {
                name,
                image,
                frame: frame as u16,
                description: description as u16,
                sfx_description: sfx,
                state: ObjectState(state as u16),
            })
        })?;

        let room_count = r.read_u16().context("reading room count")?;
        let mut room_data = Vec::with_capacity(room_count as usize + 2);
        room_data.push(0);
        for _ in 0..=room_count {
            room_data.push(r.read_u16().context("reading room data")?);
        }
        ensure!(
            room_data.windows(2).skip(1).all(|w| w[0] <= w[1]),
            "room data is not ascending"
        );

        let area_rooms = r.read_u16().context("reading area room count")?;
        let mut areas = Vec::with_capacity(area_rooms as usize + 1);
        areas.push(vec![Area::default()]);
        for room in 1..=area_rooms {
            let room_areas = read_records(r, "area", |r, _| {
                let [map_neighbours, x1, y1, x2, y2] = r.read_i16_array::<5>()?;
                Ok(Area {
                    map_neighbours,
                    x1,
                    y1,
                    x2,
                    y2,
                })
            })
            .with_context(|| format!("reading areas of room {room}"))?;
            areas.push(room_areas);
        }

        let graphics = read_records(r, "graphic", |r, _| {
            let [x, y, first_frame, last_frame] = r.read_i16_array::<4>()?;
            Ok(GraphicData {
                x: x as u16,
                y: y as u16,
                first_frame,
                last_frame,
            })
        })?;
        let description_series = read_records(r, "description series", |r, _| {
            let [subject, kind, last_description, last_seen] = r.read_i16_array::<4>()?;
            Ok(DescriptionSeries {
                subject: Subject::from_raw(subject),
                kind: SeriesKind::from_code(kind)?,
                last_description: last_description as u16,
                last_seen: last_seen as u16,
            })
        })?;
        let gamestate_slots = r.read_u16().context("reading gamestate slot count")?;

        let object_names = read_strings(r, "object name")?;
        let object_descriptions = read_strings(r, "object description")?;
        let responses = read_strings(r, "response")?;

        let logic = LogicFile {
            commands,
            command_areas,
            command_objects,
            command_items,
            command_conditions,
            objects,
            items,
            room_data,
            areas,
            graphics,
            description_series,
            gamestate_slots,
            object_names,
            object_descriptions,
            responses,
        };
        logic.validate()?;
        Ok(logic)
    }

    fn validate(&self) -> Result<()> {
        let last_object = *self.room_data.last().unwrap_or(&0) as usize;
        ensure!(
            last_object < self.objects.len(),
            "room data references object {last_object} but only {} exist",
            self.objects.len() - 1
        );
        for rule in self.commands.iter().skip(1) {
            for subject in [rule.subject1, rule.subject2] {
                match subject {
                    Subject::Object(id) => ensure!(
                        (id as usize) < self.objects.len(),
                        "command {} references unknown object {id}",
                        rule.id
                    ),
                    Subject::Item(id) => ensure!(
                        (id as usize) < self.items.len(),
                        "command {} references unknown item {id}",
                        rule.id
                    ),
                    Subject::None => {}
                }
            }
        }
        for cond in self.command_conditions.iter().skip(1) {
            let slot = match cond.op {
                GameStateOp::Test { slot, .. } | GameStateOp::Set { slot, .. } => slot,
            };
            ensure!(
                slot < self.gamestate_slots.max(1),
                "condition for command {} uses slot {slot} beyond {}",
                cond.rule_id,
                self.gamestate_slots
            );
        }
        Ok(())
    }

    pub fn room_count(&self) -> u16 {
        self.room_data.len().saturating_sub(2) as u16
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        fn records<T>(w: &mut ByteWriter, table: &[T], mut put: impl FnMut(&mut ByteWriter, &T)) {
            w.u16(table.len().saturating_sub(1) as u16);
            for record in table.iter().skip(1) {
                put(w, record);
            }
        }

        let mut w = ByteWriter::new();
        records(&mut w, &self.commands, |w, c| {
            w.i16s(&[
                c.verb.code(),
                c.subject1.raw(),
                c.subject2.raw(),
                c.song,
                c.set_areas as i16,
                c.set_objects as i16,
                c.set_items as i16,
                c.set_conditions as i16,
                c.image_order,
                c.special_section,
            ]);
        });
        records(&mut w, &self.command_areas, |w, a| {
            w.i16s(&[a.rule_id as i16, a.area.raw(), a.room as i16]);
        });
        records(&mut w, &self.command_objects, |w, o| {
            w.i16s(&[o.rule_id as i16, o.target.raw(), o.source.raw()]);
        });
        records(&mut w, &self.command_items, |w, i| {
            w.i16s(&[
                i.rule_id as i16,
                i.target.raw(),
                i.source.map(|s| s as i16).unwrap_or(0),
            ]);
        });
        records(&mut w, &self.command_conditions, |w, c| {
            let (slot, value) = c.op.raw();
            w.i16s(&[c.rule_id as i16, slot, value, c.speak_value]);
        });
        records(&mut w, &self.objects, |w, o| {
            w.i16s(&[
                o.name,
                o.x as i16,
                o.y as i16,
                o.description as i16,
                o.entry_obj,
                o.room as i16,
                o.state.0 as i16,
                o.image,
            ]);
        });
        records(&mut w, &self.items, |w, i| {
            w.i16s(&[
                i.name,
                i.image,
                i.frame as i16,
                i.description as i16,
                i.sfx_description,
                i.state.0 as i16,
            ]);
        });
        w.u16(self.room_count());
        for &value in self.room_data.iter().skip(1) {
            w.u16(value);
        }
        w.u16(self.areas.len().saturating_sub(1) as u16);
        for room in self.areas.iter().skip(1) {
            records(&mut w, room, |w, a| {
                w.i16s(&[a.map_neighbours, a.x1, a.y1, a.x2, a.y2]);
            });
        }
        records(&mut w, &self.graphics, |w, g| {
            w.i16s(&[g.x as i16, g.y as i16, g.first_frame, g.last_frame]);
        });
        records(&mut w, &self.description_series, |w, d| {
            w.i16s(&[
                d.subject.raw(),
                d.kind.code(),
                d.last_description as i16,
                d.last_seen as i16,
            ]);
        });
        w.u16(self.gamestate_slots);
        for table in [
            &self.object_names,
            &self.object_descriptions,
            &self.responses,
        ] {
            records(&mut w, table, |w, s| {
                w.pascal(s, 2);
            });
        }
        w.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> LogicFile {
        LogicFile {
            commands: vec![
                CommandRule::default(),
                CommandRule {
                    id: 1,
                    verb: Verb::Use,
                    subject1: Subject::Item(2),
                    subject2: Subject::Object(1),
                    song: -4,
                    set_objects: true,
                    set_conditions: true,
                    image_order: -1,
                    ..CommandRule::default()
                },
            ],
            command_areas: vec![AreaToggle::default()],
            command_objects: vec![
                ObjectPatch::default(),
                ObjectPatch {
                    rule_id: 1,
                    target: Toggle::Off(1),
                    source: PatchSource::Delete,
                },
            ],
            command_items: vec![InventoryPatch::default()],
            command_conditions: vec![
                ConditionRule::default(),
                ConditionRule {
                    rule_id: 1,
                    op: GameStateOp::Set { slot: 3, value: 7 },
                    speak_value: 12,
                },
            ],
            objects: vec![
                ObjectData::default(),
                ObjectData {
                    name: 1,
                    room: 1,
                    image: -3,
                    ..ObjectData::default()
                },
            ],
            items: vec![ItemData::default(); 3],
            room_data: vec![0, 0, 1],
            areas: vec![vec![Area::default()], vec![Area::default(), Area {
                map_neighbours: -2,
                ..Area::default()
            }]],
            graphics: vec![GraphicData::default()],
            description_series: vec![DescriptionSeries::default()],
            gamestate_slots: 10,
            object_names: vec![String::new(), "Door".into()],
            object_descriptions: vec![String::new(), "A door.".into()],
            responses: vec![String::new(), "It won't open.".into()],
        }
    }

    #[test]
    fn parses_encoded_logic_file() {
        let bytes = sample().to_bytes();
        let logic = LogicFile::parse(&bytes).expect("parse logic file");
        assert_eq!(logic.commands.len(), 2);
        let rule = &logic.commands[1];
        assert_eq!(rule.id, 1);
        assert_eq!(rule.subject1, Subject::Item(2));
        assert!(rule.set_objects && !rule.set_areas);
        assert_eq!(
            logic.command_conditions[1].op,
            GameStateOp::Set { slot: 3, value: 7 }
        );
        assert_eq!(logic.command_objects[1].source, PatchSource::Delete);
        assert!(logic.objects[1].is_person());
        assert_eq!(logic.room_count(), 1);
        assert!(!logic.areas[1][1].is_on());
        assert_eq!(logic.object_names[1], "Door");
        assert_eq!(logic.responses[1], "It won't open.");
    }

    #[test]
    fn empty_tables_keep_sentinel() {
        let mut empty = sample();
        empty.commands.truncate(1);
        empty.command_conditions.truncate(1);
        empty.command_objects.truncate(1);
        let logic = LogicFile::parse(&empty.to_bytes()).unwrap();
        assert_eq!(logic.commands.len(), 1);
        assert_eq!(logic.commands[0].verb, Verb::None);
    }

    #[test]
    fn rejects_unknown_subject() {
        let mut bad = sample();
        bad.commands[1].subject2 = Subject::Object(40);
        let err = LogicFile::parse(&bad.to_bytes()).unwrap_err();
        assert!(format!("{err:#}").contains("unknown object 40"));
    }

    #[test]
    fn truncated_file_reports_section() {
        let bytes = sample().to_bytes();
        let err = LogicFile::parse(&bytes[..30]).unwrap_err();
        assert!(format!("{err:#}").contains("command"));
    }

    #[test]
    fn signed_fields_become_tags() {
        assert_eq!(Subject::from_raw(-5), Subject::Item(5));
        assert_eq!(Toggle::from_raw(-2), Toggle::Off(2));
        assert_eq!(PatchSource::from_raw(-1), PatchSource::Delete);
        assert_eq!(PatchSource::from_raw(-3), PatchSource::None);
        assert_eq!(
            GameStateOp::from_raw(0, 4),
            GameStateOp::Set { slot: 0, value: 4 }
        );
    }
}
