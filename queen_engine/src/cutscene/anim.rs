//! Inline animation frames attached to a cutscene directive.

use std::collections::BTreeSet;

use anyhow::Result;
use log::warn;
use queen_formats::{AnimFrame, AnimType, CutsceneDirective, FrameBank};

use crate::context::ScriptContext;
use crate::error::EngineError;
use crate::pump::{AbortScope, Flow};

/// Complex animations are built into a fixed-size frame table.
pub const MAX_COMPLEX_FRAMES: usize = 30;

const DEFAULT_MOVE_SPEED: i16 = 4;

/// Frame slots and timing for a complex animation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComplexPlan {
    /// `(source frame, destination slot, bank)`, one per distinct source.
    pub unpacks: Vec<(u16, u16, FrameBank)>,
    /// `(destination slot, ticks)` in frame order.
    pub steps: Vec<(u16, u32)>,
}

/// Renumbers the source frames by first appearance into consecutive slots
/// above `frames_in_use`, unpacking each distinct source once.
pub fn plan_complex(frames: &[AnimFrame], frames_in_use: u16) -> Result<ComplexPlan, EngineError> {
    if frames.len() >= MAX_COMPLEX_FRAMES {
        return Err(EngineError::ComplexAnimationTooLong(frames.len()));
    }
    let mut unpacks: Vec<(u16, u16, FrameBank)> = Vec::new();
    let mut steps = Vec::with_capacity(frames.len());
    for frame in frames {
        let dest = match unpacks
            .iter()
            .find(|(source, _, _)| *source == frame.unpack_frame)
        {
            Some(&(_, dest, _)) => dest,
            None => {
                let dest = frames_in_use + 1 + unpacks.len() as u16;
                unpacks.push((frame.unpack_frame, dest, frame.bank));
                dest
            }
        };
        steps.push((dest, frame.ticks()));
    }
    Ok(ComplexPlan { unpacks, steps })
}

/// Bob slot and frame slot an animation frame draws into.
fn frame_target(ctx: &ScriptContext<'_>, frame: &AnimFrame) -> Option<(usize, u16)> {
    let bob = ctx.world.find_bob(frame.object)?;
    let slot = ctx.world.find_frame(frame.object)?;
    Some((bob, slot))
}

fn load_banks(ctx: &mut ScriptContext<'_>, frames: &[AnimFrame], bank_names: &[String]) {
    let named: BTreeSet<u16> = frames
        .iter()
        .filter_map(|frame| match frame.bank {
            FrameBank::Named(index) => Some(index),
            _ => None,
        })
        .collect();
    for index in named {
        match index.checked_sub(1).and_then(|i| bank_names.get(i as usize)) {
            Some(name) => ctx.host.load_bank(name),
            None => warn!("animation uses bank {index} but only {} are named", bank_names.len()),
        }
    }
}

fn start_move(ctx: &mut ScriptContext<'_>, bob: usize, frame: &AnimFrame, speed: i16) {
    ctx.host.walk_to(bob, frame.move_x, frame.move_y);
    if let Some(slot) = ctx.world.bob_mut(bob) {
        slot.move_to(frame.move_x, frame.move_y, speed);
    }
}

/// Plays a directive's frame list, then waits for every bob it set moving.
pub fn run(
    ctx: &mut ScriptContext<'_>,
    directive: &CutsceneDirective,
    bank_names: &[String],
    scope: AbortScope,
) -> Result<Flow> {
    if directive.frames.is_empty() {
        warn!("directive {} has an empty frame list", directive.index);
        return Ok(Flow::Continue);
    }
    load_banks(ctx, &directive.frames, bank_names);
    let speed = if directive.special_move > 0 {
        directive.special_move
    } else {
        DEFAULT_MOVE_SPEED
    };

    let mut involved = Vec::new();
    let flow = match directive.anim_type {
        AnimType::Complex => run_complex(ctx, directive, speed, &mut involved)?,
        AnimType::Normal | AnimType::Unpacked => {
            run_frames(ctx, &directive.frames, speed, scope, &mut involved)
        }
    };
    if flow.is_aborted() {
        return Ok(flow);
    }
    Ok(ctx.wait_movement(&involved, scope))
}

fn run_complex(
    ctx: &mut ScriptContext<'_>,
    directive: &CutsceneDirective,
    speed: i16,
    involved: &mut Vec<usize>,
) -> Result<Flow> {
    let frames = &directive.frames;
    let plan = plan_complex(frames, ctx.world.frames_in_use())?;
    for &(source, dest, bank) in &plan.unpacks {
        ctx.host.unpack_frame(source, dest, bank);
    }

    let first = &frames[0];
    let Some((bob, _)) = frame_target(ctx, first) else {
        warn!("complex animation for object {} has no bob", first.object);
        return Ok(Flow::Continue);
    };
    ctx.host.set_bob_animation(bob, first.flip, &plan.steps);
    if let Some(slot) = ctx.world.bob_mut(bob) {
        slot.active = true;
        slot.animating = true;
        slot.flip = first.flip;
        if directive.start_x > 0 || directive.start_y > 0 {
            slot.x = directive.start_x;
            slot.y = directive.start_y;
        }
        if let Some(&(dest, _)) = plan.steps.first() {
            slot.frame = dest;
        }
    }
    for frame in frames.iter().filter(|frame| frame.has_move()) {
        if let Some((bob, _)) = frame_target(ctx, frame) {
            start_move(ctx, bob, frame, speed);
            involved.push(bob);
        }
    }
    Ok(Flow::Continue)
}

fn run_frames(
    ctx: &mut ScriptContext<'_>,
    frames: &[AnimFrame],
    speed: i16,
    scope: AbortScope,
    involved: &mut Vec<usize>,
) -> Flow {
    for frame in frames {
        let Some((bob, slot_frame)) = frame_target(ctx, frame) else {
            warn!("no bob for object {} in cutscene animation", frame.object);
            continue;
        };
        if frame.has_move() {
            start_move(ctx, bob, frame, speed);
            if !involved.contains(&bob) {
                involved.push(bob);
            }
        }
        if frame.unpack_frame == 0 {
            if let Some(slot) = ctx.world.bob_mut(bob) {
                slot.active = false;
            }
            continue;
        }

        let walking_person = (1..=3).contains(&bob)
            && ctx.world.bob(bob).is_some_and(|slot| slot.moving);
        if !walking_person {
            ctx.host.unpack_frame(frame.unpack_frame, slot_frame, frame.bank);
        }
        if let Some(slot) = ctx.world.bob_mut(bob) {
            slot.active = true;
            if frame.x > 0 || frame.y > 0 {
                slot.x = frame.x;
                slot.y = frame.y;
            }
            slot.flip = frame.flip;
            slot.frame = slot_frame;
            if frame.scale > 0 {
                slot.scale = frame.scale;
            }
        }
        if ctx.wait_ticks(frame.ticks(), scope).is_aborted() {
            return Flow::Aborted;
        }
        if frame.song > 0 {
            ctx.host.play_song(frame.song as u16);
        }
    }
    Flow::Continue
}
