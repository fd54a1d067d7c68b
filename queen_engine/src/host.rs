use std::collections::{BTreeSet, VecDeque};

use queen_formats::{FrameBank, Verb};
use serde::Serialize;

use crate::dialogue::menu::MenuLayout;
use crate::world::{Costume, WorldState};

/// Why an interpreter handed control back to the host pump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Suspend {
    Ticks,
    Speech,
    Movement,
    Menu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "object", rename_all = "snake_case")]
pub enum Speaker {
    Player,
    Object(u16),
    Narrator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Hotspot {
    #[default]
    None,
    Object(u16),
    Item(u16),
    Verb(Verb),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MouseButton {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum KeyPress {
    Verb(Verb),
    Journal,
    SkipText,
    Digit(u8),
    ScrollUp,
    ScrollDown,
}

/// One poll of the input layer. The quit flags stay raised until the
/// interpreter that honours them calls [`InputLayer::clear_quit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct InputState {
    pub pointer: (i16, i16),
    pub hover: Hotspot,
    pub button: Option<MouseButton>,
    pub key: Option<KeyPress>,
    pub cutscene_quit: bool,
    pub talk_quit: bool,
}

impl InputState {
    pub fn click(hover: Hotspot, button: MouseButton) -> Self {
        Self {
            hover,
            button: Some(button),
            ..Self::default()
        }
    }

    pub fn key(key: KeyPress) -> Self {
        Self {
            key: Some(key),
            ..Self::default()
        }
    }
}

/// Sprite, text and overlay calls. Rendering itself lives elsewhere.
pub trait Presentation {
    fn display_room(&mut self, _room: u16, _fade: bool) {}
    fn panel_mode(&mut self, _mode: i16) {}
    fn refresh_object(&mut self, _object: u16) {}
    fn unpack_frame(&mut self, _source: u16, _dest: u16, _bank: FrameBank) {}
    fn load_bank(&mut self, _name: &str) {}
    /// Starts a looping bob animation as `(frame, ticks)` steps.
    fn set_bob_animation(&mut self, _bob: usize, _flip: bool, _steps: &[(u16, u32)]) {}
    fn show_text(&mut self, _text: &str, _centred: bool) {}
    fn clear_texts(&mut self) {}
    fn set_command_text(&mut self, _text: &str) {}
    fn show_speech(&mut self, _speaker: Speaker, _text: &str) {}
    fn show_menu(&mut self, _menu: &MenuLayout) {}
    fn hide_menu(&mut self) {}
    fn open_journal(&mut self) {}
    fn load_player_banks(&mut self, _costume: Costume) {}
    fn special_move(&mut self, _id: i16) {}
    fn start_credits(&mut self, _name: &str) {}
    fn walk_to(&mut self, _bob: usize, _x: i16, _y: i16) {}
}

pub trait AudioLayer {
    fn play_song(&mut self, _song: u16) {}
    /// Returns false when the voice could not be started.
    fn play_speech(&mut self, _file: &str) -> bool {
        false
    }
    fn play_sfx(&mut self, _sfx: u16) {}
    fn speech_active(&self) -> bool {
        false
    }
    fn stop_speech(&mut self) {}
}

pub trait InputLayer {
    fn poll(&mut self) -> InputState {
        InputState::default()
    }
    fn clear_quit(&mut self) {}
}

/// Everything the interpreters talk to, plus the per-tick pump.
pub trait Host: Presentation + AudioLayer + InputLayer {
    fn update(&mut self, world: &mut WorldState, reason: Suspend) {
        let _ = reason;
        world.step_bobs();
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HostEvent {
    DisplayRoom { room: u16, fade: bool },
    PanelMode { mode: i16 },
    RefreshObject { object: u16 },
    UnpackFrame { source: u16, dest: u16, bank: FrameBank },
    LoadBank { name: String },
    BobAnimation { bob: usize, flip: bool, steps: Vec<(u16, u32)> },
    Text { text: String, centred: bool },
    ClearTexts,
    CommandText { text: String },
    Speech { speaker: Speaker, text: String },
    Menu { options: Vec<String> },
    HideMenu,
    Journal,
    PlayerBanks { costume: Costume },
    SpecialMove { id: i16 },
    Credits { name: String },
    WalkTo { bob: usize, x: i16, y: i16 },
    Song { song: u16 },
    Voice { file: String, played: bool },
    Sfx { sfx: u16 },
    StopSpeech,
}

/// Host used by tests and the CLI: records every call and feeds scripted
/// menu input. When the scripted menu input runs out the conversation is
/// aborted rather than blocking forever.
#[derive(Debug, Default)]
pub struct RecordingHost {
    events: Vec<HostEvent>,
    menu_inputs: VecDeque<InputState>,
    voices: BTreeSet<String>,
    speech_ticks: u32,
    speech_remaining: u32,
    ticks: u32,
    last_reason: Option<Suspend>,
    cutscene_quit_at: Option<u32>,
    talk_quit_at: Option<u32>,
    quit_cleared: bool,
    menu_exhausted: bool,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self {
            speech_ticks: 5,
            ..Self::default()
        }
    }

    pub fn events(&self) -> &[HostEvent] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<HostEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn ticks(&self) -> u32 {
        self.ticks
    }

    pub fn push_menu_input(&mut self, input: InputState) {
        self.menu_inputs.push_back(input);
    }

    /// Queues a digit key for each dialogue choice.
    pub fn push_choices<I: IntoIterator<Item = u8>>(&mut self, choices: I) {
        for choice in choices {
            self.push_menu_input(InputState::key(KeyPress::Digit(choice)));
        }
    }

    /// Registers a voice file the audio layer can start.
    pub fn add_voice(&mut self, file: &str) {
        self.voices.insert(file.to_ascii_uppercase());
    }

    pub fn set_speech_ticks(&mut self, ticks: u32) {
        self.speech_ticks = ticks;
    }

    /// Raises the cutscene quit flag once `ticks` more pumps have run.
    pub fn abort_cutscene_after(&mut self, ticks: u32) {
        self.cutscene_quit_at = Some(self.ticks + ticks);
        self.quit_cleared = false;
    }

    pub fn abort_talk_after(&mut self, ticks: u32) {
        self.talk_quit_at = Some(self.ticks + ticks);
        self.quit_cleared = false;
    }

    pub fn count<F: Fn(&HostEvent) -> bool>(&self, predicate: F) -> usize {
        self.events.iter().filter(|event| predicate(event)).count()
    }

    pub fn menus_shown(&self) -> usize {
        self.count(|event| matches!(event, HostEvent::Menu { .. }))
    }

    pub fn speech_lines(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|event| match event {
                HostEvent::Speech { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    fn quit_raised(&self, at: Option<u32>) -> bool {
        !self.quit_cleared && at.is_some_and(|at| self.ticks >= at)
    }
}

impl Presentation for RecordingHost {
    fn display_room(&mut self, room: u16, fade: bool) {
        self.events.push(HostEvent::DisplayRoom { room, fade });
    }

    fn panel_mode(&mut self, mode: i16) {
        self.events.push(HostEvent::PanelMode { mode });
    }

    fn refresh_object(&mut self, object: u16) {
        self.events.push(HostEvent::RefreshObject { object });
    }

    fn unpack_frame(&mut self, source: u16, dest: u16, bank: FrameBank) {
        self.events
            .push(HostEvent::UnpackFrame { source, dest, bank });
    }

    fn load_bank(&mut self, name: &str) {
        self.events.push(HostEvent::LoadBank {
            name: name.to_string(),
        });
    }

    fn set_bob_animation(&mut self, bob: usize, flip: bool, steps: &[(u16, u32)]) {
        self.events.push(HostEvent::BobAnimation {
            bob,
            flip,
            steps: steps.to_vec(),
        });
    }

    fn show_text(&mut self, text: &str, centred: bool) {
        self.events.push(HostEvent::Text {
            text: text.to_string(),
            centred,
        });
    }

    fn clear_texts(&mut self) {
        self.events.push(HostEvent::ClearTexts);
    }

    fn set_command_text(&mut self, text: &str) {
        self.events.push(HostEvent::CommandText {
            text: text.to_string(),
        });
    }

    fn show_speech(&mut self, speaker: Speaker, text: &str) {
        self.events.push(HostEvent::Speech {
            speaker,
            text: text.to_string(),
        });
    }

    fn show_menu(&mut self, menu: &MenuLayout) {
        self.events.push(HostEvent::Menu {
            options: menu.visible_texts(),
        });
    }

    fn hide_menu(&mut self) {
        self.events.push(HostEvent::HideMenu);
    }

    fn open_journal(&mut self) {
        self.events.push(HostEvent::Journal);
    }

    fn load_player_banks(&mut self, costume: Costume) {
        self.events.push(HostEvent::PlayerBanks { costume });
    }

    fn special_move(&mut self, id: i16) {
        self.events.push(HostEvent::SpecialMove { id });
    }

    fn start_credits(&mut self, name: &str) {
        self.events.push(HostEvent::Credits {
            name: name.to_string(),
        });
    }

    fn walk_to(&mut self, bob: usize, x: i16, y: i16) {
        self.events.push(HostEvent::WalkTo { bob, x, y });
    }
}

impl AudioLayer for RecordingHost {
    fn play_song(&mut self, song: u16) {
        self.events.push(HostEvent::Song { song });
    }

    fn play_speech(&mut self, file: &str) -> bool {
        let played = self.voices.contains(&file.to_ascii_uppercase());
        if played {
            self.speech_remaining = self.speech_ticks;
        }
        self.events.push(HostEvent::Voice {
            file: file.to_string(),
            played,
        });
        played
    }

    fn play_sfx(&mut self, sfx: u16) {
        self.events.push(HostEvent::Sfx { sfx });
    }

    fn speech_active(&self) -> bool {
        self.speech_remaining > 0
    }

    fn stop_speech(&mut self) {
        self.speech_remaining = 0;
        self.events.push(HostEvent::StopSpeech);
    }
}

impl InputLayer for RecordingHost {
    fn poll(&mut self) -> InputState {
        let mut input = InputState::default();
        if self.last_reason == Some(Suspend::Menu) {
            match self.menu_inputs.pop_front() {
                Some(scripted) => input = scripted,
                None => self.menu_exhausted = true,
            }
        }
        input.cutscene_quit |= self.quit_raised(self.cutscene_quit_at);
        input.talk_quit |= self.menu_exhausted || self.quit_raised(self.talk_quit_at);
        input
    }

    fn clear_quit(&mut self) {
        self.quit_cleared = true;
        self.menu_exhausted = false;
        self.cutscene_quit_at = None;
        self.talk_quit_at = None;
    }
}

impl Host for RecordingHost {
    fn update(&mut self, world: &mut WorldState, reason: Suspend) {
        self.ticks += 1;
        self.last_reason = Some(reason);
        self.speech_remaining = self.speech_remaining.saturating_sub(1);
        world.step_bobs();
    }
}
