//! The message composer: input text, cursor and the emoji palette.

pub const EMOJI_PALETTE: &[&str] = &[
    "😀", "😃", "😄", "😁", "😆", "😅", "😂", "🤣",
    "😊", "😇", "🙂", "🙃", "😉", "😌", "😍", "😘",
    "😗", "😙", "😚", "😋", "😛", "😝", "😜", "🤪",
    "🤨", "🧐", "🤓", "😎", "🤩", "😏", "😒", "😞",
    "😔", "😟", "😕", "🙁", "☹️", "😣", "😖", "😫",
    "😩", "😤", "😠", "😡", "🤬", "🤯", "😳", "😱",
    "😨", "😰", "😥", "😢", "😭", "😪", "😴", "🤤",
    "👍", "👎", "👌", "✌️", "🤞", "🤟", "🤘", "🤙",
    "👈", "👉", "👆", "👇", "☝️", "✋", "🤚", "🖐️",
    "🖖", "👋", "🤝", "🙏", "✍️", "💪", "🦵", "🦶",
    "❤️", "🧡", "💛", "💚", "💙", "💜", "🖤", "🤍",
    "💔", "❣️", "💕", "💞", "💓", "💗", "💖", "💘",
    "💝", "💟", "☮️", "✝️", "☪️", "🕉️", "☸️", "✡️",
    "🔥", "⭐", "🌟", "✨", "⚡", "🌈", "🎉", "🎊",
    "🎈", "🎁", "🎂", "🎄", "🎃", "👻", "🎭", "🏆",
];

/// Input state. The cursor counts characters, not bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Composer {
    text: String,
    cursor: usize,
}

impl Composer {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Replace the whole input, cursor at the end.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.cursor = self.text.chars().count();
    }

    pub fn set_cursor(&mut self, cursor: usize) {
        self.cursor = cursor.min(self.text.chars().count());
    }

    pub fn insert_emoji(&mut self, emoji: &str) {
        let at = self.byte_offset(self.cursor);
        self.text.insert_str(at, emoji);
        self.cursor += emoji.chars().count();
    }

    /// Send is possible only while connected and with non-blank text.
    pub fn can_send(&self, connected: bool) -> bool {
        connected && !self.text.trim().is_empty()
    }

    /// Trimmed text for sending; clears the input. `None` when blank.
    pub fn take_text(&mut self) -> Option<String> {
        let text = self.text.trim().to_string();
        if text.is_empty() {
            return None;
        }
        self.clear();
        Some(text)
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.cursor = 0;
    }

    fn byte_offset(&self, chars: usize) -> usize {
        self.text
            .char_indices()
            .nth(chars)
            .map(|(i, _)| i)
            .unwrap_or(self.text.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette_shape() {
        assert_eq!(EMOJI_PALETTE.len(), 120);
        assert_eq!(EMOJI_PALETTE[0], "😀");
        assert_eq!(EMOJI_PALETTE[EMOJI_PALETTE.len() - 1], "🏆");
    }

    #[test]
    fn test_insert_emoji_at_cursor() {
        let mut c = Composer::default();
        c.set_text("héllo world");
        c.set_cursor(5);
        c.insert_emoji("🔥");
        assert_eq!(c.text(), "héllo🔥 world");
        assert_eq!(c.cursor(), 6);

        c.insert_emoji("❤️");
        assert_eq!(c.text(), "héllo🔥❤️ world");
        assert_eq!(c.cursor(), 8);
    }

    #[test]
    fn test_insert_into_empty() {
        let mut c = Composer::default();
        c.insert_emoji("👍");
        assert_eq!(c.text(), "👍");
        assert!(c.can_send(true));
        assert!(!c.can_send(false));
    }

    #[test]
    fn test_take_text_trims_and_clears() {
        let mut c = Composer::default();
        c.set_text("   ");
        assert!(!c.can_send(true));
        assert_eq!(c.take_text(), None);
        assert_eq!(c.text(), "   ");

        c.set_text("  hi there \n");
        assert_eq!(c.take_text().as_deref(), Some("hi there"));
        assert_eq!(c.text(), "");
        assert_eq!(c.cursor(), 0);
    }
}
