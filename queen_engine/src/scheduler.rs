use std::collections::VecDeque;

use anyhow::Result;
use log::warn;
use serde::Serialize;

use crate::context::ScriptContext;
use crate::{cutscene, dialogue};

/// Chains longer than this are assumed to loop.
const MAX_CHAIN: usize = 32;

/// A script named by a cutscene, a conversation or a rule's result text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScriptRef {
    Cutscene { file: String },
    Dialogue { file: String, person: u16 },
}

impl ScriptRef {
    pub fn cutscene(file: &str) -> Self {
        ScriptRef::Cutscene {
            file: file.to_string(),
        }
    }

    pub fn dialogue(file: &str, person: u16) -> Self {
        ScriptRef::Dialogue {
            file: file.to_string(),
            person,
        }
    }

    /// Interprets a description string as a script file name. Anything not
    /// ending in `.cut` or `.dog` is ordinary text.
    pub fn from_description(text: &str, person: u16) -> Option<Self> {
        let text = text.trim();
        if text.len() <= 4 {
            return None;
        }
        let lower = text.to_ascii_lowercase();
        if lower.ends_with(".cut") {
            Some(Self::cutscene(text))
        } else if lower.ends_with(".dog") {
            Some(Self::dialogue(text, person))
        } else {
            None
        }
    }

    pub fn file(&self) -> &str {
        match self {
            ScriptRef::Cutscene { file } | ScriptRef::Dialogue { file, .. } => file,
        }
    }
}

/// Scripts waiting to run, in order, plus the ones already handed out.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScriptQueue {
    pending: VecDeque<ScriptRef>,
    history: Vec<ScriptRef>,
}

impl ScriptQueue {
    pub fn new<S>(scripts: S) -> Self
    where
        S: IntoIterator<Item = ScriptRef>,
    {
        ScriptQueue {
            pending: scripts.into_iter().collect(),
            history: Vec::new(),
        }
    }

    pub fn push(&mut self, script: ScriptRef) {
        self.pending.push_back(script);
    }

    pub fn next(&mut self) -> Option<ScriptRef> {
        let script = self.pending.pop_front()?;
        self.history.push(script.clone());
        Some(script)
    }

    pub fn peek(&self) -> Option<&ScriptRef> {
        self.pending.front()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn history(&self) -> &[ScriptRef] {
        &self.history
    }

    pub fn into_history(self) -> Vec<ScriptRef> {
        self.history
    }
}

/// Runs `first` and every script it chains to, one after another. Returns
/// the scripts that ran.
pub fn run_chain(ctx: &mut ScriptContext<'_>, first: ScriptRef) -> Result<Vec<ScriptRef>> {
    let mut queue = ScriptQueue::new([first]);
    while let Some(script) = queue.next() {
        if queue.history().len() > MAX_CHAIN {
            warn!("script chain stopped after {MAX_CHAIN} scripts at {}", script.file());
            break;
        }
        let next = match &script {
            ScriptRef::Cutscene { file } => cutscene::play(ctx, file)?.next,
            ScriptRef::Dialogue { file, person } => dialogue::talk(ctx, file, *person)?.next,
        };
        if let Some(next) = next {
            queue.push(next);
        }
    }
    Ok(queue.into_history())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptions_name_scripts_by_extension() {
        assert_eq!(
            ScriptRef::from_description("c44.CUT", 3),
            Some(ScriptRef::cutscene("c44.CUT"))
        );
        assert_eq!(
            ScriptRef::from_description("Kane.dog", 7),
            Some(ScriptRef::dialogue("Kane.dog", 7))
        );
        assert_eq!(ScriptRef::from_description(".cut", 0), None);
        assert_eq!(ScriptRef::from_description("It's a cut above.", 0), None);
    }

    #[test]
    fn queue_preserves_order() {
        let mut queue = ScriptQueue::new([ScriptRef::cutscene("a.cut")]);
        queue.push(ScriptRef::dialogue("b.dog", 2));
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.peek().map(ScriptRef::file), Some("a.cut"));
        queue.next().expect("first script present");
        queue.next().expect("second script present");
        assert!(queue.is_empty());
        assert_eq!(queue.history()[1].file(), "b.dog");
    }
}
