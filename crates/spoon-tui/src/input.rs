//! Input line editing.
//!
//! Owns the text buffer and cursor. Key routing (focus, sending, quitting)
//! lives in [`View`](crate::view::View); this module only edits text.

/// Key input events from the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyInput {
    /// Character input.
    Char(char),
    /// Enter/Return key.
    Enter,
    /// Backspace key.
    Backspace,
    /// Delete key.
    Delete,
    /// Tab key.
    Tab,
    /// Escape key.
    Esc,
    /// Left arrow.
    Left,
    /// Right arrow.
    Right,
    /// Up arrow.
    Up,
    /// Down arrow.
    Down,
    /// Home key.
    Home,
    /// End key.
    End,
    /// Ctrl-C.
    Interrupt,
}

/// Text input buffer with a cursor.
///
/// The cursor counts characters, not bytes, so multi-byte input edits
/// cleanly.
#[derive(Debug, Default)]
pub struct InputState {
    buffer: String,
    cursor: usize,
}

impl InputState {
    /// Create a new empty input state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current text in the input buffer.
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Cursor position in characters.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// True when the buffer holds only whitespace.
    pub fn is_blank(&self) -> bool {
        self.buffer.trim().is_empty()
    }

    /// Apply an editing key. Returns `true` if the buffer or cursor changed.
    ///
    /// Keys with no editing meaning are ignored.
    pub fn edit(&mut self, key: KeyInput) -> bool {
        let len = self.char_len();
        match key {
            KeyInput::Char(c) => {
                let at = self.byte_offset(self.cursor);
                self.buffer.insert(at, c);
                self.cursor += 1;
                true
            },
            KeyInput::Backspace if self.cursor > 0 => {
                self.cursor -= 1;
                let at = self.byte_offset(self.cursor);
                self.buffer.remove(at);
                true
            },
            KeyInput::Delete if self.cursor < len => {
                let at = self.byte_offset(self.cursor);
                self.buffer.remove(at);
                true
            },
            KeyInput::Left if self.cursor > 0 => {
                self.cursor -= 1;
                true
            },
            KeyInput::Right if self.cursor < len => {
                self.cursor += 1;
                true
            },
            KeyInput::Home if self.cursor > 0 => {
                self.cursor = 0;
                true
            },
            KeyInput::End if self.cursor < len => {
                self.cursor = len;
                true
            },
            _ => false,
        }
    }

    /// Take the buffer contents and reset the cursor.
    pub fn take(&mut self) -> String {
        self.cursor = 0;
        std::mem::take(&mut self.buffer)
    }

    fn char_len(&self) -> usize {
        self.buffer.chars().count()
    }

    fn byte_offset(&self, chars: usize) -> usize {
        self.buffer.char_indices().nth(chars).map_or(self.buffer.len(), |(i, _)| i)
    }
}
