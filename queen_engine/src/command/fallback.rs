//! Canned replies for commands no rule handles, and LOOK AT descriptions.

use queen_formats::{DescriptionSeries, SeriesKind, Subject, Verb};
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::world::WorldState;

pub const RESPONSE_CANT_OPEN: u16 = 1;
pub const RESPONSE_CANT_CLOSE: u16 = 2;
pub const RESPONSE_CANT_MOVE: u16 = 3;
pub const RESPONSE_CANT_USE: u16 = 4;
pub const RESPONSE_ALREADY_OPEN: u16 = 9;
pub const RESPONSE_ALREADY_CLOSED: u16 = 10;
pub const RESPONSE_GIVE_ITEM: u16 = 11;
pub const RESPONSE_GIVE_OBJECT: u16 = 12;
pub const RESPONSE_PICK_UP_ITEM: u16 = 14;
pub const RESPONSE_MOVE_PERSON: u16 = 18;
pub const RESPONSE_PICK_UP_PERSON: u16 = 20;

/// Which text table a canned reply comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    Response(u16),
    Description(u16),
}

fn is_person(world: &WorldState, subject: Subject) -> bool {
    match subject {
        Subject::Object(id) => world.object(id).is_ok_and(|object| object.is_person()),
        _ => false,
    }
}

/// The reply for a verb/subject pair no rule matched.
pub fn stock_reply(
    world: &mut WorldState,
    rng: &mut ChaCha8Rng,
    verb: Verb,
    subject1: Subject,
    subject2: Subject,
) -> Option<Reply> {
    let reply = match verb {
        Verb::None | Verb::WalkTo => return None,
        Verb::LookAt => return describe(world, rng, subject1).map(Reply::Description),
        Verb::Open => Reply::Response(RESPONSE_CANT_OPEN),
        Verb::Close => Reply::Response(RESPONSE_CANT_CLOSE),
        Verb::Move if is_person(world, subject1) => Reply::Response(RESPONSE_MOVE_PERSON),
        Verb::Move => Reply::Response(RESPONSE_CANT_MOVE),
        Verb::Give => match (subject1, subject2) {
            (Subject::Item(_), target) if is_person(world, target) => {
                Reply::Response(rng.gen_range(27..=28))
            }
            (Subject::Item(_), _) => Reply::Response(RESPONSE_GIVE_ITEM),
            _ => Reply::Response(RESPONSE_GIVE_OBJECT),
        },
        Verb::Use => match subject1 {
            Subject::Item(id) => {
                let sfx = world.item(id).map(|item| item.sfx_description).unwrap_or(0);
                if sfx > 0 {
                    Reply::Description(sfx as u16)
                } else {
                    Reply::Response(RESPONSE_CANT_USE)
                }
            }
            _ => Reply::Response(RESPONSE_CANT_USE),
        },
        Verb::PickUp => match subject1 {
            Subject::Item(_) => Reply::Response(RESPONSE_PICK_UP_ITEM),
            s if is_person(world, s) => Reply::Response(RESPONSE_PICK_UP_PERSON),
            _ => Reply::Response(rng.gen_range(5..=8)),
        },
        Verb::TalkTo => Reply::Response(rng.gen_range(24..=25)),
    };
    Some(reply)
}

/// Picks the description to read for LOOK AT, advancing the subject's
/// description series if it has one. Hidden objects have none.
pub fn describe(world: &mut WorldState, rng: &mut ChaCha8Rng, subject: Subject) -> Option<u16> {
    let first = match subject {
        Subject::Object(id) => {
            let object = world.object(id).ok()?;
            if object.name <= 0 {
                return None;
            }
            object.description
        }
        Subject::Item(id) => world.item(id).ok()?.description,
        Subject::None => return None,
    };
    let description = match world.description_series_mut(subject) {
        Some(series) => next_description(series, first, rng),
        None => first,
    };
    (description > 0).then_some(description)
}

/// Advances a description series starting at `first`.
pub fn next_description(series: &mut DescriptionSeries, first: u16, rng: &mut ChaCha8Rng) -> u16 {
    let last = series.last_description.max(first);
    let random = |rng: &mut ChaCha8Rng, previous: u16| {
        if last == first {
            return first;
        }
        loop {
            let pick = rng.gen_range(first..=last);
            if pick != previous {
                return pick;
            }
        }
    };
    let next = match series.kind {
        SeriesKind::RandomAfterFirst if series.last_seen == 0 => first,
        SeriesKind::RandomAfterFirst | SeriesKind::Random => random(rng, series.last_seen),
        SeriesKind::Looping => {
            if series.last_seen < first || series.last_seen >= last {
                first
            } else {
                series.last_seen + 1
            }
        }
        SeriesKind::Clamped => {
            if series.last_seen < first {
                first
            } else if series.last_seen < last {
                series.last_seen + 1
            } else {
                last
            }
        }
    };
    series.last_seen = next;
    next
}
