//! Cutscene interpreter: runs a `.cut` script's directives in order, then
//! applies its gamestate block and moves the player to the final room.
//!
//! A quit request is honoured only when the script allows it. The quit path
//! puts the object of the interrupted directive back as it was and resumes
//! the music. Directives that already finished keep their effects, and the
//! gamestate block and the room change still run.

pub mod anim;

use anyhow::{Context, Result};
use log::{info, warn};
use queen_formats::{CutawayScript, CutsceneDirective, DirectiveKind, FinalRoom, GameStatePatch};
use serde::Serialize;

use crate::context::ScriptContext;
use crate::host::Speaker;
use crate::pump::{AbortScope, Flow};
use crate::scheduler::ScriptRef;
use crate::speech::{self, Narration};
use crate::world::PLAYER_BOB;

const PERSON_WALK_SPEED: i16 = 4;
const SILENT_SENTENCE: &str = "*";
const CREDITS_PREFIX: char = '#';

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CutsceneOutcome {
    pub file: String,
    pub aborted: bool,
    pub final_room: u16,
    pub next: Option<ScriptRef>,
}

/// Visual state of a directive's object before the directive ran.
#[derive(Debug, Clone, Copy)]
struct ObjectSnapshot {
    object: u16,
    name: i16,
    image: i16,
}

impl ObjectSnapshot {
    fn take(ctx: &ScriptContext<'_>, directive: &CutsceneDirective) -> Option<Self> {
        let object = u16::try_from(directive.object_number).ok().filter(|&n| n > 0)?;
        let data = ctx.world.object(object).ok()?;
        Some(ObjectSnapshot {
            object,
            name: data.name,
            image: data.image,
        })
    }
}

/// Per-script state carried from one directive to the next.
#[derive(Debug, Default)]
struct Playback {
    /// Set by a fade directive; consumed by the next room display.
    fade_pending: bool,
}

pub fn load(ctx: &ScriptContext<'_>, file: &str) -> Result<CutawayScript> {
    let data = ctx
        .resources
        .read(file)
        .with_context(|| format!("loading cutscene {file}"))?;
    CutawayScript::parse(&data).with_context(|| format!("parsing cutscene {file}"))
}

/// Voice file stem: the script name without its extension.
fn voice_stem(file: &str) -> String {
    let name = file.rsplit(['/', '\\']).next().unwrap_or(file);
    let stem = name.split('.').next().unwrap_or(name);
    stem.to_ascii_uppercase()
}

pub fn play(ctx: &mut ScriptContext<'_>, file: &str) -> Result<CutsceneOutcome> {
    let script = load(ctx, file)?;
    ctx.log_event(format!("cutscene.start {file}"));
    info!(
        "cutscene {file}: {} directives, abort {}",
        script.directives.len(),
        if script.abort_allowed { "allowed" } else { "disallowed" }
    );

    let stem = voice_stem(file);
    let start_room = ctx.world.current_room();
    let song_before = ctx.world.current_song;
    let scope = if script.abort_allowed {
        AbortScope::Cutscene
    } else {
        AbortScope::None
    };
    ctx.host.panel_mode(script.panel_mode);

    let mut playback = Playback::default();
    let mut interrupted = None;
    for directive in &script.directives {
        let snapshot = ObjectSnapshot::take(ctx, directive);
        let flow = run_directive(ctx, &script, directive, &stem, scope, &mut playback)?;
        if flow.is_aborted() {
            interrupted = Some((directive, snapshot));
            break;
        }
    }

    let aborted = interrupted.is_some();
    if let Some((directive, snapshot)) = interrupted {
        quit(ctx, directive, snapshot, song_before)?;
    }
    apply_gamestate_patches(ctx, &script.gamestate_patches)?;
    let final_room = relocate(ctx, script.final_room, start_room)?;

    let next = match (&script.talk_file, &script.next_cutscene) {
        (Some(talk), _) => Some(ScriptRef::dialogue(talk, script.talk_to.max(0) as u16)),
        (None, Some(cutscene)) => Some(ScriptRef::cutscene(cutscene)),
        (None, None) => None,
    };
    ctx.log_event(format!(
        "cutscene.end {file}{}",
        if aborted { " aborted" } else { "" }
    ));
    Ok(CutsceneOutcome {
        file: file.to_string(),
        aborted,
        final_room,
        next,
    })
}

fn run_directive(
    ctx: &mut ScriptContext<'_>,
    script: &CutawayScript,
    directive: &CutsceneDirective,
    stem: &str,
    scope: AbortScope,
    playback: &mut Playback,
) -> Result<Flow> {
    let kind = directive.kind();
    ctx.log_event(format!("cutscene.directive {} {kind:?}", directive.index));

    if !directive.has_move_target() && directive.special_move > 0 && directive.object_number >= 0 {
        ctx.host.special_move(directive.special_move);
        ctx.log_event(format!("cutscene.special_move {}", directive.special_move));
    }

    if directive.object_number == queen_formats::cutaway::OBJECT_ROOM_FADE {
        playback.fade_pending = true;
        ctx.log_event("cutscene.fade");
    }
    if directive.room != 0 && directive.room != ctx.world.current_room() {
        ctx.world.enter_room(directive.room)?;
        let fade = std::mem::take(&mut playback.fade_pending);
        ctx.host.display_room(directive.room, fade);
        ctx.log_event(format!("room.enter {}", directive.room));
    }
    for &person in &directive.persons {
        let id = person.unsigned_abs();
        let toggled = if person > 0 {
            ctx.world.show_object(id)
        } else {
            ctx.world.hide_object(id)
        };
        match toggled {
            Ok(()) => ctx.host.refresh_object(id),
            Err(err) => warn!("cutscene person {person}: {err}"),
        }
    }

    // the fade object animates the player
    let object = match directive.object_number {
        n if n > 0 => n as u16,
        _ => 0,
    };
    if !kind.is_text() {
        if let Some(bob) = ctx.world.find_bob(object) {
            ctx.world.clamp_bob_limit(bob, directive.limit);
        }
    }
    if directive.song > 0 {
        ctx.host.play_song(directive.song);
        ctx.world.current_song = directive.song;
    }

    let flow = match kind {
        DirectiveKind::Animation => anim::run(ctx, directive, &script.bank_names, scope)?,
        DirectiveKind::Person => person(ctx, directive, object, stem, scope),
        DirectiveKind::NoAnimation => no_animation(ctx, directive, scope)?,
        DirectiveKind::SpeakOnly => text(ctx, directive, stem, Narration::Spoken, scope),
        DirectiveKind::SpeakAndDisplay => text(ctx, directive, stem, Narration::Captioned, scope),
        DirectiveKind::DisplayOnly => text(ctx, directive, stem, Narration::Displayed, scope),
    };
    Ok(flow)
}

/// The player or another person walks into place and says the sentence.
fn person(
    ctx: &mut ScriptContext<'_>,
    directive: &CutsceneDirective,
    object: u16,
    stem: &str,
    scope: AbortScope,
) -> Flow {
    let speaker = if object == 0 {
        Speaker::Player
    } else {
        Speaker::Object(object)
    };
    match ctx.world.find_bob(object) {
        Some(bob) => {
            if let Some(slot) = ctx.world.bob_mut(bob) {
                if bob != PLAYER_BOB && (directive.start_x > 0 || directive.start_y > 0) {
                    slot.x = directive.start_x;
                    slot.y = directive.start_y;
                }
                slot.active = true;
            }
            if directive.has_move_target() {
                ctx.host.walk_to(bob, directive.move_x, directive.move_y);
                if let Some(slot) = ctx.world.bob_mut(bob) {
                    slot.move_to(directive.move_x, directive.move_y, PERSON_WALK_SPEED);
                }
                if ctx.wait_movement(&[bob], scope).is_aborted() {
                    return Flow::Aborted;
                }
            }
        }
        None => warn!("cutscene person {object} has no bob in this room"),
    }

    let sentence = directive.sentence.as_str();
    if sentence.is_empty() || sentence == SILENT_SENTENCE {
        return Flow::Continue;
    }
    if let Some(name) = sentence.strip_prefix(CREDITS_PREFIX) {
        ctx.host.start_credits(name);
        ctx.log_event(format!("cutscene.credits {name}"));
        return Flow::Continue;
    }
    let voice = format!("{stem}{:02}", directive.index);
    speech::speak(ctx, speaker, sentence, Some(&voice), scope)
}

/// Object state changes with no frames: copies a source object over the
/// target, or hides the object a negative number names.
fn no_animation(
    ctx: &mut ScriptContext<'_>,
    directive: &CutsceneDirective,
    scope: AbortScope,
) -> Result<Flow> {
    let object = directive.object_number.unsigned_abs();
    if directive.from_object > 0 {
        let source = ctx
            .config
            .quirks
            .copy_source(object, directive.from_object as u16);
        ctx.world.copy_object(source, object)?;
        ctx.world.show_object(object)?;
        ctx.host.refresh_object(object);
        ctx.log_event(format!("cutscene.copy {source} {object}"));
    } else if directive.object_number < 0 {
        ctx.world.hide_object(object)?;
        ctx.world.clear_object_bob(object);
        ctx.host.refresh_object(object);
    }

    if directive.has_move_target() {
        if let Some(bob) = ctx.world.find_bob(object) {
            if let Some(slot) = ctx.world.bob_mut(bob) {
                slot.move_to(directive.move_x, directive.move_y, PERSON_WALK_SPEED);
            }
            return Ok(ctx.wait_movement(&[bob], scope));
        }
    }
    Ok(Flow::Continue)
}

fn text(
    ctx: &mut ScriptContext<'_>,
    directive: &CutsceneDirective,
    stem: &str,
    style: Narration,
    scope: AbortScope,
) -> Flow {
    let voice = format!("{stem}{:02}1", directive.index);
    speech::narrate(ctx, &directive.sentence, Some(&voice), style, scope)
}

fn quit(
    ctx: &mut ScriptContext<'_>,
    interrupted: &CutsceneDirective,
    snapshot: Option<ObjectSnapshot>,
    song_before: u16,
) -> Result<()> {
    ctx.log_event(format!("cutscene.quit {}", interrupted.index));
    ctx.host.clear_quit();
    ctx.host.stop_speech();
    ctx.host.clear_texts();
    if let Some(snapshot) = snapshot {
        let object = ctx.world.object_mut(snapshot.object)?;
        object.name = snapshot.name;
        object.image = snapshot.image;
        ctx.world.sync_bob(snapshot.object);
        ctx.host.refresh_object(snapshot.object);
    }
    if interrupted.special_move > 0 {
        ctx.host.special_move(interrupted.special_move);
    }
    if song_before != 0 {
        ctx.host.play_song(song_before);
        ctx.world.current_song = song_before;
    }
    Ok(())
}

fn apply_gamestate_patches(ctx: &mut ScriptContext<'_>, patches: &[GameStatePatch]) -> Result<()> {
    for patch in patches {
        let applies = match patch.slot {
            slot if slot < 0 => {
                ctx.world.set_gamestate(slot.unsigned_abs(), patch.value)?;
                true
            }
            slot if slot > 0 => ctx.world.gamestate(slot as u16)? == patch.value,
            _ => false,
        };
        if !applies {
            continue;
        }

        let object = patch.object.unsigned_abs();
        if patch.object > 0 {
            if patch.copy_from > 0 {
                let source = ctx.config.quirks.copy_source(object, patch.copy_from as u16);
                ctx.world.copy_object(source, object)?;
            }
            ctx.world.show_object(object)?;
            ctx.host.refresh_object(object);
        } else if patch.object < 0 {
            ctx.world.hide_object(object)?;
            ctx.host.refresh_object(object);
        }
        if patch.area_room > 0 && patch.area != 0 {
            ctx.world
                .set_area(patch.area_room as u16, patch.area.unsigned_abs(), patch.area > 0)?;
        }
        ctx.log_event(format!("cutscene.patch {} {}", patch.slot, patch.value));
    }
    Ok(())
}

fn relocate(ctx: &mut ScriptContext<'_>, final_room: FinalRoom, start_room: u16) -> Result<u16> {
    let target = match final_room {
        FinalRoom::Room(room) => room,
        FinalRoom::Previous => start_room,
        FinalRoom::Chain => ctx.world.current_room(),
    };
    if target != 0 && target != ctx.world.current_room() {
        ctx.world.enter_room(target)?;
        ctx.host.display_room(target, true);
        ctx.log_event(format!("room.enter {target}"));
    } else if target == 0 {
        warn!("cutscene ends with no room to return to");
    }
    Ok(ctx.world.current_room())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn voice_stem_drops_path_and_extension() {
        assert_eq!(voice_stem("c12a.cut"), "C12A");
        assert_eq!(voice_stem("scripts/CINTR.CUT"), "CINTR");
    }
}
