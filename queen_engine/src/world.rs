use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use log::warn;
use queen_formats::cutaway::ClipBox;
use queen_formats::{
    Area, DescriptionSeries, GraphicData, ItemData, LogicFile, ObjectData, Subject,
    TalkSelectedTable,
};
use serde::Serialize;

use crate::error::EngineError;

pub const PLAYER_BOB: usize = 0;
/// Frame slot the player's current image is unpacked into.
pub const PLAYER_FRAME: u16 = 31;
const PERSON_BOBS: RangeInclusive<usize> = 1..=3;
const FIRST_OBJECT_BOB: usize = 5;
pub const MAX_BOBS: usize = 21;
const OBJECT_FRAME_BASE: u16 = 40;
pub const SCREEN_WIDTH: i16 = 320;
pub const SCREEN_HEIGHT: i16 = 200;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BobSlot {
    pub active: bool,
    pub x: i16,
    pub y: i16,
    pub frame: u16,
    pub flip: bool,
    pub scale: i16,
    pub moving: bool,
    pub dest_x: i16,
    pub dest_y: i16,
    pub speed: i16,
    pub limit: Option<ClipBox>,
    pub animating: bool,
}

impl BobSlot {
    pub fn move_to(&mut self, x: i16, y: i16, speed: i16) {
        self.dest_x = x;
        self.dest_y = y;
        self.speed = speed.max(1);
        self.moving = (x, y) != (self.x, self.y);
    }

    /// Advances one pump tick towards the move destination.
    pub fn step(&mut self) {
        if !self.moving {
            return;
        }
        let step = |from: i16, to: i16, speed: i16| -> i16 {
            if from < to {
                (from + speed).min(to)
            } else {
                (from - speed).max(to)
            }
        };
        self.x = step(self.x, self.dest_x, self.speed);
        self.y = step(self.y, self.dest_y, self.speed);
        if (self.x, self.y) == (self.dest_x, self.dest_y) {
            self.moving = false;
        }
    }

    pub fn clear(&mut self) {
        *self = BobSlot::default();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Costume {
    #[default]
    Normal,
    Underwear,
    Dress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PlayerState {
    pub x: i16,
    pub y: i16,
    pub costume: Costume,
}

/// Mutable game tables shared by the three interpreters.
#[derive(Debug, Clone, Serialize)]
pub struct WorldState {
    objects: Vec<ObjectData>,
    items: Vec<ItemData>,
    areas: Vec<Vec<Area>>,
    room_data: Vec<u16>,
    graphics: Vec<GraphicData>,
    description_series: Vec<DescriptionSeries>,
    gamestate: Vec<i16>,
    inventory: Vec<u16>,
    current_room: u16,
    bobs: Vec<BobSlot>,
    bob_map: BTreeMap<u16, (usize, u16)>,
    frames_in_use: u16,
    talk_selected: TalkSelectedTable,
    pub player: PlayerState,
    pub current_song: u16,
}

impl WorldState {
    pub fn from_logic(logic: &LogicFile) -> Self {
        Self {
            objects: logic.objects.clone(),
            items: logic.items.clone(),
            areas: logic.areas.clone(),
            room_data: logic.room_data.clone(),
            graphics: logic.graphics.clone(),
            description_series: logic.description_series.clone(),
            gamestate: vec![0; logic.gamestate_slots.max(1) as usize],
            inventory: Vec::new(),
            current_room: 0,
            bobs: vec![BobSlot::default(); MAX_BOBS],
            bob_map: BTreeMap::new(),
            frames_in_use: OBJECT_FRAME_BASE,
            talk_selected: TalkSelectedTable::default(),
            player: PlayerState::default(),
            current_song: 0,
        }
    }

    pub fn object(&self, id: u16) -> Result<&ObjectData, EngineError> {
        self.objects
            .get(id as usize)
            .ok_or(EngineError::UnknownObject(id))
    }

    pub fn object_mut(&mut self, id: u16) -> Result<&mut ObjectData, EngineError> {
        self.objects
            .get_mut(id as usize)
            .ok_or(EngineError::UnknownObject(id))
    }

    pub fn object_count(&self) -> usize {
        self.objects.len() - 1
    }

    pub fn item(&self, id: u16) -> Result<&ItemData, EngineError> {
        self.items.get(id as usize).ok_or(EngineError::UnknownItem(id))
    }

    pub fn item_mut(&mut self, id: u16) -> Result<&mut ItemData, EngineError> {
        self.items
            .get_mut(id as usize)
            .ok_or(EngineError::UnknownItem(id))
    }

    pub fn area(&self, room: u16, area: u16) -> Result<&Area, EngineError> {
        self.areas
            .get(room as usize)
            .and_then(|areas| areas.get(area as usize))
            .ok_or(EngineError::UnknownArea { room, area })
    }

    /// Turns an area on or off by flipping the sign of its neighbour count.
    pub fn set_area(&mut self, room: u16, area: u16, on: bool) -> Result<(), EngineError> {
        let entry = self
            .areas
            .get_mut(room as usize)
            .and_then(|areas| areas.get_mut(area as usize))
            .ok_or(EngineError::UnknownArea { room, area })?;
        let magnitude = entry.map_neighbours.abs();
        entry.map_neighbours = if on { magnitude } else { -magnitude };
        Ok(())
    }

    pub fn graphic(&self, id: u16) -> Option<&GraphicData> {
        self.graphics.get(id as usize)
    }

    pub fn gamestate(&self, slot: u16) -> Result<i16, EngineError> {
        self.gamestate
            .get(slot as usize)
            .copied()
            .ok_or(EngineError::UnknownSlot(slot))
    }

    pub fn set_gamestate(&mut self, slot: u16, value: i16) -> Result<(), EngineError> {
        let entry = self
            .gamestate
            .get_mut(slot as usize)
            .ok_or(EngineError::UnknownSlot(slot))?;
        *entry = value;
        Ok(())
    }

    pub fn gamestate_slots(&self) -> &[i16] {
        &self.gamestate
    }

    pub fn current_room(&self) -> u16 {
        self.current_room
    }

    pub fn room_count(&self) -> u16 {
        self.room_data.len().saturating_sub(2) as u16
    }

    pub fn room_objects(&self, room: u16) -> Result<RangeInclusive<u16>, EngineError> {
        let room_index = room as usize;
        if room == 0 || room_index + 1 >= self.room_data.len() {
            return Err(EngineError::UnknownRoom(room));
        }
        Ok(self.room_data[room_index] + 1..=self.room_data[room_index + 1])
    }

    /// Switches room and hands out bob slots to the room's objects. People
    /// take the three person bobs, imaged objects the rest in id order.
    pub fn enter_room(&mut self, room: u16) -> Result<(), EngineError> {
        let objects = self.room_objects(room)?;
        self.current_room = room;
        self.bob_map.clear();
        for bob in self.bobs.iter_mut().skip(1) {
            bob.clear();
        }

        let mut persons = PERSON_BOBS;
        let mut next_bob = FIRST_OBJECT_BOB;
        for id in objects {
            let Some(&data) = self.objects.get(id as usize) else {
                warn!("room {room} lists missing object {id}");
                continue;
            };
            if data.name == 0 {
                continue;
            }
            let slot = if data.is_person() {
                persons.next().map(|bob| (bob, PLAYER_FRAME + bob as u16))
            } else if data.image > 0 && next_bob < MAX_BOBS {
                let bob = next_bob;
                next_bob += 1;
                Some((bob, OBJECT_FRAME_BASE + bob as u16))
            } else {
                None
            };
            if let Some((bob, frame)) = slot {
                self.bob_map.insert(id, (bob, frame));
                let slot = &mut self.bobs[bob];
                slot.active = data.name > 0;
                slot.x = data.x as i16;
                slot.y = data.y as i16;
                slot.frame = frame;
            }
        }
        self.frames_in_use = OBJECT_FRAME_BASE + next_bob as u16;
        Ok(())
    }

    pub fn find_bob(&self, object: u16) -> Option<usize> {
        if object == 0 {
            return Some(PLAYER_BOB);
        }
        self.bob_map.get(&object).map(|&(bob, _)| bob)
    }

    pub fn find_frame(&self, object: u16) -> Option<u16> {
        if object == 0 {
            return Some(PLAYER_FRAME);
        }
        self.bob_map.get(&object).map(|&(_, frame)| frame)
    }

    pub fn bob(&self, index: usize) -> Option<&BobSlot> {
        self.bobs.get(index)
    }

    pub fn bob_mut(&mut self, index: usize) -> Option<&mut BobSlot> {
        self.bobs.get_mut(index)
    }

    pub fn bobs(&self) -> &[BobSlot] {
        &self.bobs
    }

    pub fn step_bobs(&mut self) {
        for bob in &mut self.bobs {
            bob.step();
        }
    }

    /// Highest frame slot handed out so far; complex animations unpack above it.
    pub fn frames_in_use(&self) -> u16 {
        self.frames_in_use
    }

    pub fn set_frames_in_use(&mut self, frames: u16) {
        self.frames_in_use = frames;
    }

    pub fn show_object(&mut self, id: u16) -> Result<(), EngineError> {
        let object = self.object_mut(id)?;
        object.name = object.name.abs();
        self.sync_bob(id);
        Ok(())
    }

    pub fn hide_object(&mut self, id: u16) -> Result<(), EngineError> {
        let object = self.object_mut(id)?;
        object.name = -object.name.abs();
        self.sync_bob(id);
        Ok(())
    }

    /// Marks a turned-on image as off using the `-(image + 10)` encoding.
    pub fn turn_image_off(&mut self, id: u16) -> Result<(), EngineError> {
        let object = self.object_mut(id)?;
        if object.image > 0 {
            object.image = -(object.image + 10);
        }
        Ok(())
    }

    /// Matches the object's bob visibility to the sign of its name.
    pub fn sync_bob(&mut self, id: u16) {
        if let Some(&(bob, _)) = self.bob_map.get(&id) {
            let visible = self.objects[id as usize].name > 0;
            self.bobs[bob].active = visible;
        }
    }

    pub fn clear_object_bob(&mut self, id: u16) {
        if let Some(&(bob, _)) = self.bob_map.get(&id) {
            self.bobs[bob].clear();
        }
    }

    /// Copies a dummy object over a real one. When the dummy animates over
    /// more frames than the original the two swap, so the dummy keeps the
    /// real object's old data.
    pub fn copy_object(&mut self, source: u16, target: u16) -> Result<(), EngineError> {
        let dummy = *self.object(source)?;
        let real = *self.object(target)?;
        let hidden_source = dummy.name < 0;

        let mut frames_real = 1;
        let mut frames_dummy = 1;
        if real.image > 0 {
            if let Some(graphic) = self.graphic(strip_animated(real.image)) {
                frames_real = graphic.frame_count();
            }
            if dummy.image > 0 {
                if let Some(graphic) = self.graphic(strip_animated(dummy.image)) {
                    frames_dummy = graphic.frame_count();
                }
            }
        }

        self.objects[target as usize] = dummy;
        if frames_dummy > frames_real {
            self.objects[source as usize] = real;
        }
        let target_data = &mut self.objects[target as usize];
        target_data.name = target_data.name.abs();
        if hidden_source {
            let source_data = &mut self.objects[source as usize];
            source_data.name = -source_data.name.abs();
        }
        Ok(())
    }

    pub fn inventory(&self) -> &[u16] {
        &self.inventory
    }

    pub fn copy_item(&mut self, source: u16, target: u16) -> Result<(), EngineError> {
        let data = *self.item(source)?;
        *self.item_mut(target)? = data;
        Ok(())
    }

    pub fn insert_item(&mut self, id: u16) -> Result<(), EngineError> {
        let item = self.item_mut(id)?;
        item.name = item.name.abs();
        if !self.inventory.contains(&id) {
            self.inventory.push(id);
        }
        Ok(())
    }

    pub fn delete_item(&mut self, id: u16) -> Result<(), EngineError> {
        let item = self.item_mut(id)?;
        item.name = -item.name.abs();
        self.inventory.retain(|&held| held != id);
        Ok(())
    }

    pub fn subject_state(&self, subject: Subject) -> Option<queen_formats::ObjectState> {
        match subject {
            Subject::Object(id) => self.object(id).ok().map(|o| o.state),
            Subject::Item(id) => self.item(id).ok().map(|i| i.state),
            Subject::None => None,
        }
    }

    pub fn description_series_mut(&mut self, subject: Subject) -> Option<&mut DescriptionSeries> {
        self.description_series
            .iter_mut()
            .skip(1)
            .find(|series| series.subject == subject)
    }

    pub fn talk_selected(&self) -> &TalkSelectedTable {
        &self.talk_selected
    }

    pub fn talk_selected_mut(&mut self) -> &mut TalkSelectedTable {
        &mut self.talk_selected
    }

    pub fn set_talk_selected(&mut self, table: TalkSelectedTable) {
        self.talk_selected = table;
    }

    /// Clamps a clip box to the screen and stores it as the bob's limit.
    pub fn clamp_bob_limit(&mut self, bob: usize, limit: ClipBox) {
        let Some(slot) = self.bobs.get_mut(bob) else {
            warn!("no bob slot {bob} for clip box");
            return;
        };
        if limit.is_empty() {
            slot.limit = None;
            return;
        }
        let clamp_x = |v: i16| v.clamp(0, SCREEN_WIDTH - 1);
        let clamp_y = |v: i16| v.clamp(0, SCREEN_HEIGHT - 1);
        let (x1, x2) = (clamp_x(limit.x1), clamp_x(limit.x2));
        let (y1, y2) = (clamp_y(limit.y1), clamp_y(limit.y2));
        slot.limit = Some(ClipBox {
            x1: x1.min(x2),
            y1: y1.min(y2),
            x2: x1.max(x2),
            y2: y1.max(y2),
        });
    }
}

fn strip_animated(image: i16) -> u16 {
    let image = if image > 5000 { image - 5000 } else { image };
    image.max(0) as u16
}
