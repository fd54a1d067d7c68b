//! Cutscene (`.cut`) script parsing.
//!
//! A script is a 12-byte header, a run of 17-field directives (each optionally
//! followed by a person list and an inline animation frame list), then three
//! blocks located by the header offsets: gamestate patches, sentences and bank
//! names.

use anyhow::{Context, Result, bail, ensure};
use serde::Serialize;

use crate::reader::ByteReader;
use crate::writer::ByteWriter;

const HEADER_SIZE: usize = 12;
const FRAME_LIST_END: i16 = -2;
const MAX_FRAME_HEADER: i16 = 1000;
pub const MAX_DIRECTIVES: usize = 100;

pub const OBJECT_ROOM_FADE: i16 = -1;
pub const OBJECT_TEXT_SPEAK: i16 = -2;
pub const OBJECT_TEXT_DISPLAY_AND_SPEAK: i16 = -3;
pub const OBJECT_TEXT_DISPLAY: i16 = -4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "room", rename_all = "snake_case")]
pub enum FinalRoom {
    /// Return to the room the cutscene started in.
    Previous,
    Room(u16),
    /// The first sentence names another cutscene to run afterwards.
    Chain,
}

impl FinalRoom {
    fn from_raw(raw: i16) -> Self {
        match raw {
            v if v < 0 => FinalRoom::Room(v.unsigned_abs()),
            1 => FinalRoom::Chain,
            _ => FinalRoom::Previous,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectiveKind {
    Animation,
    Person,
    NoAnimation,
    SpeakOnly,
    SpeakAndDisplay,
    DisplayOnly,
}

impl DirectiveKind {
    pub fn is_text(self) -> bool {
        matches!(
            self,
            DirectiveKind::SpeakOnly | DirectiveKind::SpeakAndDisplay | DirectiveKind::DisplayOnly
        )
    }
}

/// Picks the dispatch kind for a directive. Text codes win over everything,
/// then a copy source, then the presence of an animation list.
pub fn classify(object_number: i16, no_anim_list: bool, has_from_object: bool) -> DirectiveKind {
    match object_number {
        OBJECT_TEXT_SPEAK => DirectiveKind::SpeakOnly,
        OBJECT_TEXT_DISPLAY_AND_SPEAK => DirectiveKind::SpeakAndDisplay,
        OBJECT_TEXT_DISPLAY => DirectiveKind::DisplayOnly,
        _ if has_from_object => DirectiveKind::NoAnimation,
        n if n >= OBJECT_ROOM_FADE && no_anim_list => DirectiveKind::Person,
        n if n >= OBJECT_ROOM_FADE => DirectiveKind::Animation,
        _ => DirectiveKind::NoAnimation,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimType {
    Normal,
    Complex,
    Unpacked,
}

impl AnimType {
    fn from_raw(raw: i16) -> Self {
        match raw {
            1 => AnimType::Complex,
            2 => AnimType::Unpacked,
            _ => AnimType::Normal,
        }
    }

    fn raw(self) -> i16 {
        match self {
            AnimType::Normal => 0,
            AnimType::Complex => 1,
            AnimType::Unpacked => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "index", rename_all = "snake_case")]
pub enum FrameBank {
    Room,
    Player,
    /// 1-based index into the script's bank name table.
    Named(u16),
}

impl FrameBank {
    fn from_raw(raw: i16) -> Result<Self> {
        Ok(match raw {
            0 => FrameBank::Room,
            13 => FrameBank::Player,
            v if v > 0 => FrameBank::Named(v as u16),
            v => bail!("negative frame bank {v}"),
        })
    }

    fn raw(self) -> i16 {
        match self {
            FrameBank::Room => 0,
            FrameBank::Player => 13,
            FrameBank::Named(index) => index as i16,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AnimFrame {
    /// 0 is the player, anything else an object id.
    pub object: u16,
    pub unpack_frame: u16,
    pub flip: bool,
    pub speed: i16,
    pub bank: FrameBank,
    pub move_x: i16,
    pub move_y: i16,
    pub x: i16,
    pub y: i16,
    pub scale: i16,
    pub song: i16,
}

impl AnimFrame {
    /// Pump ticks spent on this frame.
    pub fn ticks(&self) -> u32 {
        (self.speed / 3 + 1).max(0) as u32
    }

    pub fn has_move(&self) -> bool {
        self.move_x != 0 || self.move_y != 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ClipBox {
    pub x1: i16,
    pub y1: i16,
    pub x2: i16,
    pub y2: i16,
}

impl ClipBox {
    pub fn is_empty(&self) -> bool {
        self.x1 == 0 && self.y1 == 0 && self.x2 == 0 && self.y2 == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CutsceneDirective {
    /// 1-based position in the script, used for voice file names.
    pub index: usize,
    pub object_number: i16,
    pub move_x: i16,
    pub move_y: i16,
    pub bank: i16,
    pub anim_list: i16,
    pub execute: i16,
    pub limit: ClipBox,
    pub special_move: i16,
    pub anim_type: AnimType,
    pub from_object: i16,
    pub start_x: i16,
    pub start_y: i16,
    /// 0 means the current room.
    pub room: u16,
    pub scale: i16,
    pub song: u16,
    pub persons: Vec<i16>,
    pub frames: Vec<AnimFrame>,
    pub sentence: String,
}

impl CutsceneDirective {
    pub fn kind(&self) -> DirectiveKind {
        classify(self.object_number, self.anim_list == 0, self.from_object > 0)
    }

    pub fn has_move_target(&self) -> bool {
        self.move_x != 0 || self.move_y != 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GameStatePatch {
    /// Positive: test, negative: unconditional set of `|slot|`.
    pub slot: i16,
    pub value: i16,
    /// Positive shows, negative hides.
    pub object: i16,
    pub area_room: i16,
    /// Positive turns the area on, otherwise off.
    pub area: i16,
    pub copy_from: i16,
}

#[derive(Debug, Clone, Serialize)]
pub struct CutawayScript {
    pub panel_mode: i16,
    pub abort_allowed: bool,
    pub final_room: FinalRoom,
    pub directives: Vec<CutsceneDirective>,
    pub next_cutscene: Option<String>,
    pub bank_names: Vec<String>,
    pub talk_file: Option<String>,
    pub talk_to: i16,
    pub gamestate_patches: Vec<GameStatePatch>,
}

impl CutawayScript {
    pub fn parse(data: &[u8]) -> Result<Self> {
        ensure!(
            data.len() >= HEADER_SIZE,
            "cutscene buffer is {} bytes, too small for a header",
            data.len()
        );
        let mut reader = ByteReader::new(data);
        let panel_mode = reader.read_i16()?;
        let object_count = reader.read_i16()?;
        let final_field = reader.read_i16()?;
        let gamestate_offset = reader.read_u16()? as usize;
        let sentence_offset = reader.read_u16()? as usize;
        let bank_name_offset = reader.read_u16()? as usize;

        let count = object_count.unsigned_abs() as usize;
        ensure!(
            count <= MAX_DIRECTIVES,
            "cutscene declares {count} directives (limit {MAX_DIRECTIVES})"
        );
        let final_room = FinalRoom::from_raw(final_field);

        let mut sentences = ByteReader::at(data, sentence_offset).context("sentence block")?;
        let next_cutscene = if final_room == FinalRoom::Chain {
            let name = sentences.read_pascal(2).context("reading chained cutscene name")?;
            (!name.is_empty()).then_some(name)
        } else {
            None
        };

        let mut directives = Vec::with_capacity(count);
        for index in 1..=count {
            let directive = read_directive(&mut reader, &mut sentences, index)
                .with_context(|| format!("reading cutscene directive {index}"))?;
            directives.push(directive);
        }

        let (bank_names, talk_file, talk_to) =
            read_bank_names(data, bank_name_offset).context("reading bank name table")?;
        let gamestate_patches =
            read_gamestate_patches(data, gamestate_offset).context("reading gamestate block")?;

        Ok(CutawayScript {
            panel_mode,
            abort_allowed: object_count >= 0,
            final_room,
            directives,
            next_cutscene,
            bank_names,
            talk_file,
            talk_to,
            gamestate_patches,
        })
    }
}

fn read_directive(
    reader: &mut ByteReader<'_>,
    sentences: &mut ByteReader<'_>,
    index: usize,
) -> Result<CutsceneDirective> {
    let [
        object_number,
        move_x,
        move_y,
        bank,
        anim_list,
        execute,
        limit_x1,
        limit_y1,
        limit_x2,
        limit_y2,
        special_move,
        anim_type,
        from_object,
        start_x,
        start_y,
        room,
        scale,
    ] = reader.read_i16_array::<17>()?;

    let mut limit = ClipBox {
        x1: limit_x1,
        y1: limit_y1,
        x2: limit_x2,
        y2: limit_y2,
    };
    let mut song = 0;
    if limit.x1 < 0 {
        song = limit.x1.unsigned_abs();
        limit.x1 = 0;
    }
    let mut persons = Vec::new();
    if limit.x2 < 0 {
        let person_count = limit.x2.unsigned_abs();
        limit.x2 = 0;
        for _ in 0..person_count {
            persons.push(reader.read_i16().context("reading person list")?);
        }
    }

    let mut directive = CutsceneDirective {
        index,
        object_number,
        move_x,
        move_y,
        bank,
        anim_list,
        execute,
        limit,
        special_move,
        anim_type: AnimType::from_raw(anim_type),
        from_object,
        start_x,
        start_y,
        room: room.max(0) as u16,
        scale,
        song,
        persons,
        frames: Vec::new(),
        sentence: String::new(),
    };

    if directive.kind() == DirectiveKind::Animation {
        directive.frames = read_frames(reader)?;
    }
    directive.sentence = sentences.read_pascal(2).context("reading sentence")?;
    Ok(directive)
}

fn read_frames(reader: &mut ByteReader<'_>) -> Result<Vec<AnimFrame>> {
    let mut frames = Vec::new();
    loop {
        let header = reader.read_i16().context("reading frame header")?;
        if header == FRAME_LIST_END {
            break;
        }
        ensure!(
            header <= MAX_FRAME_HEADER,
            "frame header {header} is larger than {MAX_FRAME_HEADER}"
        );
        let [unpack, speed, bank, move_x, move_y, x, y, scale, song] =
            reader.read_i16_array::<9>()?;
        frames.push(AnimFrame {
            object: header.max(0) as u16,
            unpack_frame: unpack.unsigned_abs(),
            flip: unpack < 0,
            speed,
            bank: FrameBank::from_raw(bank)?,
            move_x,
            move_y,
            x,
            y,
            scale,
            song,
        });
    }
    Ok(frames)
}

fn read_bank_names(data: &[u8], offset: usize) -> Result<(Vec<String>, Option<String>, i16)> {
    let mut reader = ByteReader::at(data, offset)?;
    let count = reader.read_u16()?;
    let mut names = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let name = reader.read_pascal(2)?;
        if !name.is_empty() {
            names.push(name);
        }
    }
    let talk_file = reader.read_pascal(2)?;
    let talk_to = reader.read_i16()?;
    Ok((names, (!talk_file.is_empty()).then_some(talk_file), talk_to))
}

fn read_gamestate_patches(data: &[u8], offset: usize) -> Result<Vec<GameStatePatch>> {
    let mut reader = ByteReader::at(data, offset)?;
    let count = reader.read_i16()?;
    ensure!(count >= 0, "negative gamestate patch count {count}");
    let mut patches = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let [slot, value, object, area_room, area, copy_from] = reader.read_i16_array::<6>()?;
        patches.push(GameStatePatch {
            slot,
            value,
            object,
            area_room,
            area,
            copy_from,
        });
    }
    Ok(patches)
}

/// Builds cutscene buffers; used by tools and fixtures.
#[derive(Debug, Clone, Default)]
pub struct CutawayBuilder {
    pub panel_mode: i16,
    pub abort_allowed: bool,
    pub final_room: i16,
    pub next_cutscene: Option<String>,
    pub directives: Vec<CutsceneDirective>,
    pub bank_names: Vec<String>,
    pub talk_file: Option<String>,
    pub talk_to: i16,
    pub gamestate_patches: Vec<GameStatePatch>,
}

impl CutawayBuilder {
    pub fn new() -> Self {
        Self {
            abort_allowed: true,
            ..Self::default()
        }
    }

    /// A directive with every field zeroed apart from the object and text.
    pub fn directive(object_number: i16, sentence: &str) -> CutsceneDirective {
        CutsceneDirective {
            index: 0,
            object_number,
            move_x: 0,
            move_y: 0,
            bank: 0,
            anim_list: 0,
            execute: 0,
            limit: ClipBox::default(),
            special_move: 0,
            anim_type: AnimType::Normal,
            from_object: 0,
            start_x: 0,
            start_y: 0,
            room: 0,
            scale: 0,
            song: 0,
            persons: Vec::new(),
            frames: Vec::new(),
            sentence: sentence.to_string(),
        }
    }

    pub fn push(&mut self, directive: CutsceneDirective) -> &mut Self {
        self.directives.push(directive);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut w = ByteWriter::new();
        let count = self.directives.len() as i16;
        w.i16(self.panel_mode)
            .i16(if self.abort_allowed { count } else { -count })
            .i16(self.final_room)
            .u16(0)
            .u16(0)
            .u16(0);

        for d in &self.directives {
            let limit_x1 = if d.song > 0 { -(d.song as i16) } else { d.limit.x1 };
            let limit_x2 = if d.persons.is_empty() {
                d.limit.x2
            } else {
                -(d.persons.len() as i16)
            };
            w.i16s(&[
                d.object_number,
                d.move_x,
                d.move_y,
                d.bank,
                d.anim_list,
                d.execute,
                limit_x1,
                d.limit.y1,
                limit_x2,
                d.limit.y2,
                d.special_move,
                d.anim_type.raw(),
                d.from_object,
                d.start_x,
                d.start_y,
                d.room as i16,
                d.scale,
            ]);
            w.i16s(&d.persons);
            if d.kind() == DirectiveKind::Animation {
                for f in &d.frames {
                    let unpack = if f.flip {
                        -(f.unpack_frame as i16)
                    } else {
                        f.unpack_frame as i16
                    };
                    w.i16s(&[
                        f.object as i16,
                        unpack,
                        f.speed,
                        f.bank.raw(),
                        f.move_x,
                        f.move_y,
                        f.x,
                        f.y,
                        f.scale,
                        f.song,
                    ]);
                }
                w.i16(FRAME_LIST_END);
            }
        }

        let gamestate_offset = w.len();
        w.i16(self.gamestate_patches.len() as i16);
        for p in &self.gamestate_patches {
            w.i16s(&[p.slot, p.value, p.object, p.area_room, p.area, p.copy_from]);
        }

        let sentence_offset = w.len();
        if self.final_room == 1 {
            w.pascal(self.next_cutscene.as_deref().unwrap_or(""), 2);
        }
        for d in &self.directives {
            w.pascal(&d.sentence, 2);
        }
        w.pad_to(w.len().div_ceil(2) * 2);

        let bank_name_offset = w.len();
        w.u16(self.bank_names.len() as u16);
        for name in &self.bank_names {
            w.pascal(name, 2);
        }
        w.pascal(self.talk_file.as_deref().unwrap_or(""), 2);
        w.i16(self.talk_to);

        w.patch_u16(6, gamestate_offset as u16)
            .patch_u16(8, sentence_offset as u16)
            .patch_u16(10, bank_name_offset as u16);
        w.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(object: u16, unpack: u16, flip: bool) -> AnimFrame {
        AnimFrame {
            object,
            unpack_frame: unpack,
            flip,
            speed: 6,
            bank: FrameBank::Named(1),
            move_x: 0,
            move_y: 0,
            x: 100,
            y: 80,
            scale: 100,
            song: 0,
        }
    }

    #[test]
    fn classifier_gives_text_codes_priority() {
        assert_eq!(classify(-2, false, true), DirectiveKind::SpeakOnly);
        assert_eq!(classify(-2, true, false), DirectiveKind::SpeakOnly);
        assert_eq!(classify(-3, false, false), DirectiveKind::SpeakAndDisplay);
        assert_eq!(classify(-4, true, true), DirectiveKind::DisplayOnly);
        assert_eq!(classify(12, true, true), DirectiveKind::NoAnimation);
        assert_eq!(classify(12, true, false), DirectiveKind::Person);
        assert_eq!(classify(0, true, false), DirectiveKind::Person);
        assert_eq!(classify(-1, false, false), DirectiveKind::Animation);
        assert_eq!(classify(-7, true, false), DirectiveKind::NoAnimation);
    }

    #[test]
    fn parses_built_script() {
        let mut builder = CutawayBuilder::new();
        builder.final_room = -5;
        builder.bank_names = vec!["", "ANIM1.BBK"].into_iter().map(String::from).collect();
        builder.talk_file = Some("PERSON.DOG".into());
        builder.talk_to = 22;
        builder.gamestate_patches.push(GameStatePatch {
            slot: -14,
            value: 1,
            object: 30,
            area_room: 2,
            area: -1,
            copy_from: 0,
        });

        let mut speak = CutawayBuilder::directive(-2, "Hello there.");
        speak.song = 9;
        builder.push(speak);

        let mut anim = CutawayBuilder::directive(31, "*");
        anim.anim_list = 1;
        anim.persons = vec![40, -41];
        anim.frames = vec![frame(31, 3, false), frame(31, 4, true)];
        builder.push(anim);

        let script = CutawayScript::parse(&builder.build()).expect("parse cutscene");
        assert!(script.abort_allowed);
        assert_eq!(script.final_room, FinalRoom::Room(5));
        assert_eq!(script.directives.len(), 2);
        assert_eq!(script.bank_names, vec!["ANIM1.BBK".to_string()]);
        assert_eq!(script.talk_file.as_deref(), Some("PERSON.DOG"));
        assert_eq!(script.talk_to, 22);
        assert_eq!(script.gamestate_patches.len(), 1);

        let first = &script.directives[0];
        assert_eq!(first.index, 1);
        assert_eq!(first.kind(), DirectiveKind::SpeakOnly);
        assert_eq!(first.song, 9);
        assert_eq!(first.limit.x1, 0);
        assert_eq!(first.sentence, "Hello there.");

        let second = &script.directives[1];
        assert_eq!(second.kind(), DirectiveKind::Animation);
        assert_eq!(second.persons, vec![40, -41]);
        assert_eq!(second.frames.len(), 2);
        assert!(second.frames[1].flip);
        assert_eq!(second.frames[1].unpack_frame, 4);
        assert_eq!(second.frames[0].ticks(), 3);
        assert_eq!(second.sentence, "*");
    }

    #[test]
    fn chained_script_reads_name_before_sentences() {
        let mut builder = CutawayBuilder::new();
        builder.final_room = 1;
        builder.abort_allowed = false;
        builder.next_cutscene = Some("C2.CUT".into());
        builder.push(CutawayBuilder::directive(-4, "THE END"));
        let script = CutawayScript::parse(&builder.build()).unwrap();
        assert!(!script.abort_allowed);
        assert_eq!(script.final_room, FinalRoom::Chain);
        assert_eq!(script.next_cutscene.as_deref(), Some("C2.CUT"));
        assert_eq!(script.directives[0].sentence, "THE END");
    }

    #[test]
    fn oversized_frame_header_is_fatal() {
        let mut builder = CutawayBuilder::new();
        let mut anim = CutawayBuilder::directive(3, "");
        anim.anim_list = 1;
        anim.frames = vec![frame(1001, 1, false)];
        builder.push(anim);
        let err = CutawayScript::parse(&builder.build()).unwrap_err();
        assert!(format!("{err:#}").contains("larger than 1000"));
    }

    #[test]
    fn short_buffer_is_rejected() {
        assert!(CutawayScript::parse(&[0, 1, 0]).is_err());
    }
}
