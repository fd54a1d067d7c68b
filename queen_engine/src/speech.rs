//! The speech path shared by commands, cutscenes and conversations.

use log::warn;

use crate::config::EngineConfig;
use crate::context::ScriptContext;
use crate::host::Speaker;
use crate::pump::{AbortScope, Flow};

/// Voice ids of object descriptions follow the stock responses.
pub const DESCRIPTION_VOICE_OFFSET: u16 = 40;

const MIN_SPEECH_LEN: usize = 10;

pub fn voice_file(voice: &str) -> String {
    format!("{voice}.SB")
}

/// Ticks a line stays up when no voice is playing.
pub fn text_ticks(config: &EngineConfig, len: usize, min_len: usize, factor: u32) -> u32 {
    let len = len.max(min_len) as u32;
    len * factor * 2 / config.talk_divisor()
}

fn start_voice(ctx: &mut ScriptContext<'_>, voice: Option<&str>) -> bool {
    match voice {
        Some(voice) if ctx.config.speech => ctx.host.play_speech(&voice_file(voice)),
        _ => false,
    }
}

/// Shows and voices one line, then blocks until it is done.
pub fn speak(
    ctx: &mut ScriptContext<'_>,
    speaker: Speaker,
    text: &str,
    voice: Option<&str>,
    scope: AbortScope,
) -> Flow {
    if text.is_empty() {
        warn!("skipping empty line for {speaker:?}");
        return Flow::Continue;
    }
    let voiced = start_voice(ctx, voice);
    if ctx.config.subtitles || !voiced {
        ctx.host.show_speech(speaker, text);
    }
    let ticks = text_ticks(ctx.config, text.chars().count(), MIN_SPEECH_LEN, 1);
    let flow = ctx.wait_speech(voiced, ticks, scope);
    ctx.host.clear_texts();
    flow
}

/// How a narrator line reaches the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Narration {
    /// Voiced, with the usual subtitle rules.
    Spoken,
    /// Voiced and always shown centred.
    Captioned,
    /// Centred text only; stays up three times as long.
    Displayed,
}

pub fn narrate(
    ctx: &mut ScriptContext<'_>,
    text: &str,
    voice: Option<&str>,
    style: Narration,
    scope: AbortScope,
) -> Flow {
    const MIN_NARRATION_LEN: usize = 50;
    if text.is_empty() {
        warn!("skipping empty narration");
        return Flow::Continue;
    }
    let voiced = style != Narration::Displayed && start_voice(ctx, voice);
    match style {
        Narration::Spoken if ctx.config.subtitles || !voiced => {
            ctx.host.show_speech(Speaker::Narrator, text)
        }
        Narration::Spoken => {}
        Narration::Captioned | Narration::Displayed => ctx.host.show_text(text, true),
    }
    let factor = if style == Narration::Displayed { 3 } else { 1 };
    let ticks = text_ticks(ctx.config, text.chars().count(), MIN_NARRATION_LEN, factor);
    let flow = ctx.wait_speech(voiced, ticks, scope);
    ctx.host.clear_texts();
    flow
}

/// The player says one of the stock responses.
pub fn player_response(ctx: &mut ScriptContext<'_>, id: u16) -> Flow {
    let text = ctx.tables.response(id).to_string();
    ctx.log_event(format!("speech.response {id}"));
    speak(
        ctx,
        Speaker::Player,
        &text,
        Some(&format!("JOE{id:04}")),
        AbortScope::None,
    )
}

/// The player reads out an object description.
pub fn player_description(ctx: &mut ScriptContext<'_>, id: u16) -> Flow {
    let text = ctx.tables.description(id).to_string();
    ctx.log_event(format!("speech.description {id}"));
    let voice = format!("JOE{:04}", id + DESCRIPTION_VOICE_OFFSET);
    speak(ctx, Speaker::Player, &text, Some(&voice), AbortScope::None)
}
