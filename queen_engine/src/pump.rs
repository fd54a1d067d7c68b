//! Suspension points. Every blocking wait in the interpreters goes through
//! [`ScriptContext::pump`], which hands one tick to the host and then polls
//! input for the abort flag that applies to the running interpreter.

use log::warn;

use crate::context::ScriptContext;
use crate::host::{InputState, KeyPress, Suspend};

/// Upper bound on ticks spent waiting for bobs to arrive.
const MAX_MOVEMENT_TICKS: u32 = 2000;

/// Which quit flag, if any, the current wait honours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortScope {
    None,
    Cutscene,
    Dialogue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Aborted,
}

impl Flow {
    pub fn is_aborted(self) -> bool {
        self == Flow::Aborted
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Tick {
    pub input: InputState,
    pub aborted: bool,
}

impl ScriptContext<'_> {
    pub fn pump(&mut self, reason: Suspend, scope: AbortScope) -> Tick {
        self.host.update(self.world, reason);
        let input = self.host.poll();
        let aborted = match scope {
            AbortScope::None => false,
            AbortScope::Cutscene => input.cutscene_quit,
            AbortScope::Dialogue => input.talk_quit,
        };
        Tick { input, aborted }
    }

    pub fn wait_ticks(&mut self, ticks: u32, scope: AbortScope) -> Flow {
        for _ in 0..ticks {
            if self.pump(Suspend::Ticks, scope).aborted {
                return Flow::Aborted;
            }
        }
        Flow::Continue
    }

    /// Waits for a text line: until the voice ends when one is playing,
    /// otherwise for `ticks`. The skip-text key ends the wait early.
    pub fn wait_speech(&mut self, voiced: bool, ticks: u32, scope: AbortScope) -> Flow {
        let mut remaining = ticks;
        loop {
            let done = if voiced {
                !self.host.speech_active()
            } else {
                remaining == 0
            };
            if done {
                return Flow::Continue;
            }
            remaining = remaining.saturating_sub(1);
            let tick = self.pump(Suspend::Speech, scope);
            if tick.aborted {
                self.host.stop_speech();
                return Flow::Aborted;
            }
            if tick.input.key == Some(KeyPress::SkipText) {
                if voiced {
                    self.host.stop_speech();
                }
                return Flow::Continue;
            }
        }
    }

    /// Waits until none of `bobs` is still moving.
    pub fn wait_movement(&mut self, bobs: &[usize], scope: AbortScope) -> Flow {
        let moving = |ctx: &Self| {
            bobs.iter()
                .any(|&bob| ctx.world.bob(bob).is_some_and(|slot| slot.moving))
        };
        let mut ticks = 0;
        while moving(self) {
            if ticks == MAX_MOVEMENT_TICKS {
                warn!("bobs {bobs:?} still moving after {MAX_MOVEMENT_TICKS} ticks");
                return Flow::Continue;
            }
            ticks += 1;
            if self.pump(Suspend::Movement, scope).aborted {
                return Flow::Aborted;
            }
        }
        Flow::Continue
    }
}
