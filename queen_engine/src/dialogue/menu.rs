use serde::Serialize;

use crate::host::{InputState, KeyPress, MouseButton};

/// Screen row of the first option line.
pub const MENU_TOP: i16 = 151;
pub const ROW_HEIGHT: i16 = 10;
pub const MAX_ROWS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuOption {
    /// Child slot (1..=4) of the level this option stands for.
    pub choice: usize,
    pub lines: Vec<String>,
}

/// Click zone covering one visible option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MenuZone {
    pub choice: usize,
    pub top: i16,
    pub bottom: i16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    None,
    Redraw,
    Select(usize),
}

/// Player options laid out in the panel, scrolled one option at a time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuLayout {
    options: Vec<MenuOption>,
    first: usize,
}

/// Greedy word wrap. Words longer than `width` get a line of their own.
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let needed = if current.is_empty() {
            word.len()
        } else {
            current.len() + 1 + word.len()
        };
        if needed > width && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

impl MenuLayout {
    pub fn new<'a, I>(options: I, width: usize) -> Self
    where
        I: IntoIterator<Item = (usize, &'a str)>,
    {
        let options = options
            .into_iter()
            .map(|(choice, text)| MenuOption {
                choice,
                lines: wrap(text, width),
            })
            .collect();
        MenuLayout { options, first: 0 }
    }

    pub fn options(&self) -> &[MenuOption] {
        &self.options
    }

    /// Options that fit in the panel from the current scroll position. The
    /// first one is always shown even if it alone overflows.
    pub fn visible(&self) -> &[MenuOption] {
        let mut rows = 0;
        let mut end = self.first;
        for option in &self.options[self.first..] {
            let height = option.lines.len().max(1);
            if rows + height > MAX_ROWS && end > self.first {
                break;
            }
            rows += height;
            end += 1;
        }
        &self.options[self.first..end]
    }

    pub fn visible_texts(&self) -> Vec<String> {
        self.visible()
            .iter()
            .map(|option| option.lines.join(" "))
            .collect()
    }

    pub fn can_scroll_up(&self) -> bool {
        self.first > 0
    }

    pub fn can_scroll_down(&self) -> bool {
        self.first + self.visible().len() < self.options.len()
    }

    pub fn zones(&self) -> Vec<MenuZone> {
        let mut zones = Vec::new();
        let mut row = 0i16;
        for option in self.visible() {
            let height = option.lines.len().max(1) as i16;
            zones.push(MenuZone {
                choice: option.choice,
                top: MENU_TOP + row * ROW_HEIGHT,
                bottom: MENU_TOP + (row + height) * ROW_HEIGHT - 1,
            });
            row += height;
        }
        zones
    }

    pub fn handle(&mut self, input: &InputState) -> MenuAction {
        match input.key {
            Some(KeyPress::Digit(n)) if n >= 1 => {
                return match self.visible().get(n as usize - 1) {
                    Some(option) => MenuAction::Select(option.choice),
                    None => MenuAction::None,
                };
            }
            Some(KeyPress::ScrollUp) if self.can_scroll_up() => {
                self.first -= 1;
                return MenuAction::Redraw;
            }
            Some(KeyPress::ScrollDown) if self.can_scroll_down() => {
                self.first += 1;
                return MenuAction::Redraw;
            }
            _ => {}
        }
        if input.button == Some(MouseButton::Left) {
            let y = input.pointer.1;
            if let Some(zone) = self
                .zones()
                .into_iter()
                .find(|zone| (zone.top..=zone.bottom).contains(&y))
            {
                return MenuAction::Select(zone.choice);
            }
        }
        MenuAction::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> MenuLayout {
        MenuLayout::new(
            [
                (1, "Who are you?"),
                (2, "I was wondering whether you had seen a plane land anywhere nearby"),
                (3, "Nice hat."),
                (4, "Goodbye."),
            ],
            20,
        )
    }

    #[test]
    fn wraps_on_word_boundaries() {
        assert_eq!(
            wrap("one two three four", 9),
            vec!["one two", "three", "four"]
        );
        assert!(wrap("", 10).is_empty());
    }

    #[test]
    fn long_options_push_others_off_the_panel() {
        let mut menu = layout();
        assert_eq!(menu.visible().len(), 1);
        assert!(menu.can_scroll_down());
        assert!(!menu.can_scroll_up());

        let down = InputState::key(KeyPress::ScrollDown);
        assert_eq!(menu.handle(&down), MenuAction::Redraw);
        assert_eq!(menu.visible().len(), 1);
        assert_eq!(menu.handle(&down), MenuAction::Redraw);
        assert_eq!(menu.visible_texts(), vec!["Nice hat.", "Goodbye."]);
        assert!(!menu.can_scroll_down());
    }

    #[test]
    fn digits_pick_visible_options() {
        let mut menu = MenuLayout::new([(2, "Yes."), (4, "No.")], 36);
        assert_eq!(
            menu.handle(&InputState::key(KeyPress::Digit(2))),
            MenuAction::Select(4)
        );
        assert_eq!(
            menu.handle(&InputState::key(KeyPress::Digit(3))),
            MenuAction::None
        );
    }

    #[test]
    fn clicks_select_inside_zones() {
        let mut menu = MenuLayout::new([(1, "Yes."), (3, "No.")], 36);
        let mut click = InputState::click(crate::host::Hotspot::None, MouseButton::Left);
        click.pointer = (40, MENU_TOP + ROW_HEIGHT + 2);
        assert_eq!(menu.handle(&click), MenuAction::Select(3));
        click.pointer = (40, MENU_TOP - 5);
        assert_eq!(menu.handle(&click), MenuAction::None);
    }
}
