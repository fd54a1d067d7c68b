use queen_formats::Verb;
use serde::Serialize;

/// The sentence shown on the command line, e.g. "Use Key with Door".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommandText {
    verb: Verb,
    first: Option<String>,
    linked: bool,
    second: Option<String>,
}

impl CommandText {
    pub fn new(verb: Verb) -> Self {
        Self {
            verb,
            ..Self::default()
        }
    }

    pub fn set_first(&mut self, name: &str) {
        self.first = Some(name.to_string());
    }

    /// Appends the verb's link word and waits for the second noun.
    pub fn link(&mut self) {
        self.linked = self.verb.link_word().is_some();
    }

    pub fn set_second(&mut self, name: &str) {
        self.second = Some(name.to_string());
    }

    pub fn is_linked(&self) -> bool {
        self.linked
    }

    pub fn render(&self) -> String {
        self.render_with(None)
    }

    /// Renders with `hover` in the next free noun position.
    pub fn render_with(&self, hover: Option<&str>) -> String {
        let mut words: Vec<&str> = Vec::new();
        if self.verb != Verb::None {
            words.push(self.verb.label());
        }
        let first = self.first.as_deref();
        match first {
            Some(name) => words.push(name),
            None => words.extend(hover),
        }
        if self.linked {
            words.extend(self.verb.link_word());
            match self.second.as_deref() {
                Some(name) => words.push(name),
                None if first.is_some() => words.extend(hover),
                None => {}
            }
        }
        words.retain(|word| !word.is_empty());
        words.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_word_follows_the_verb() {
        let mut give = CommandText::new(Verb::Give);
        give.set_first("Banana");
        give.link();
        assert_eq!(give.render(), "Give Banana to");
        assert_eq!(give.render_with(Some("Monkey")), "Give Banana to Monkey");

        let mut open = CommandText::new(Verb::Open);
        open.link();
        assert!(!open.is_linked());
        assert_eq!(open.render_with(Some("Door")), "Open Door");
    }

    #[test]
    fn hover_fills_first_noun_before_selection() {
        let text = CommandText::new(Verb::Use);
        assert_eq!(text.render_with(Some("Lever")), "Use Lever");
        assert_eq!(CommandText::default().render_with(Some("Lever")), "Lever");
    }
}
