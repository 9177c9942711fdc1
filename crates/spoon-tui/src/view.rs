//! UI-local state and key routing.
//!
//! Everything here is terminal-independent: the [`View`] turns [`KeyInput`]
//! into [`UiAction`]s against a [`Store`], and the runtime performs them.

use spoon_store::{Room, RoomId, Store, StoreState};

use crate::input::{InputState, KeyInput};

/// Which pane receives keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    /// Room list navigation.
    #[default]
    Rooms,
    /// Message composition.
    Input,
}

/// Work for the runtime after a key press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiAction {
    /// Redraw the screen.
    Render,
    /// Leave the UI and shut down.
    Quit,
    /// Send `body` to `room_id`.
    Send {
        /// Destination room.
        room_id: RoomId,
        /// Trimmed message text.
        body: String,
    },
}

/// Rooms in sidebar order: by display name, then by id.
pub fn sorted_rooms(state: &StoreState) -> Vec<&Room> {
    let mut rooms: Vec<&Room> = state.rooms().values().collect();
    rooms.sort_by(|a, b| a.display_name().cmp(b.display_name()).then_with(|| a.id.cmp(&b.id)));
    rooms
}

/// UI state that is not part of the shared store.
#[derive(Debug, Default)]
pub struct View {
    focus: Focus,
    cursor: usize,
    input: InputState,
    status: Option<String>,
}

impl View {
    /// Fresh view focused on the room list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Focused pane.
    pub fn focus(&self) -> Focus {
        self.focus
    }

    /// Room list cursor, clamped to `room_count`.
    pub fn cursor(&self, room_count: usize) -> usize {
        self.cursor.min(room_count.saturating_sub(1))
    }

    /// Input line state.
    pub fn input(&self) -> &InputState {
        &self.input
    }

    /// Transient status message, if any.
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// Show `message` in the status bar until the next key press.
    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status = Some(message.into());
    }

    /// Route one key press.
    pub fn handle_key(&mut self, key: KeyInput, store: &Store) -> Vec<UiAction> {
        if key == KeyInput::Interrupt {
            return vec![UiAction::Quit];
        }
        let had_status = self.status.take().is_some();

        let actions = match (self.focus, key) {
            (_, KeyInput::Tab) => {
                self.focus = match self.focus {
                    Focus::Rooms => Focus::Input,
                    Focus::Input => Focus::Rooms,
                };
                vec![UiAction::Render]
            },
            (Focus::Rooms, key) => self.handle_rooms_key(key, store),
            (Focus::Input, KeyInput::Esc) => {
                self.focus = Focus::Rooms;
                vec![UiAction::Render]
            },
            (Focus::Input, KeyInput::Enter) => self.handle_enter(store),
            (Focus::Input, key) => {
                if self.input.edit(key) {
                    vec![UiAction::Render]
                } else {
                    vec![]
                }
            },
        };

        if had_status && actions.is_empty() { vec![UiAction::Render] } else { actions }
    }

    fn handle_rooms_key(&mut self, key: KeyInput, store: &Store) -> Vec<UiAction> {
        let rooms: Vec<RoomId> =
            store.read(|state| sorted_rooms(state).into_iter().map(|room| room.id.clone()).collect());
        self.navigate_rooms(key, &rooms, store)
    }

    /// Act on a room-list key against `rooms`, the sidebar order read under
    /// one lock, so the cursor and the selected room agree.
    fn navigate_rooms(&mut self, key: KeyInput, rooms: &[RoomId], store: &Store) -> Vec<UiAction> {
        let last = rooms.len().saturating_sub(1);
        let cursor = self.cursor(rooms.len());

        let next = match key {
            KeyInput::Char('q') => return vec![UiAction::Quit],
            KeyInput::Enter => return self.select_room(rooms.get(cursor), store),
            KeyInput::Char('j') | KeyInput::Down => (cursor + 1).min(last),
            KeyInput::Char('k') | KeyInput::Up => cursor.saturating_sub(1),
            KeyInput::Char('g') | KeyInput::Home => 0,
            KeyInput::Char('G') | KeyInput::End => last,
            _ => return vec![],
        };

        if next == self.cursor {
            return vec![];
        }
        self.cursor = next;
        vec![UiAction::Render]
    }

    fn select_room(&mut self, room_id: Option<&RoomId>, store: &Store) -> Vec<UiAction> {
        let Some(room_id) = room_id else {
            return vec![];
        };

        if store.select_current_room(room_id) {
            tracing::debug!(room_id = %room_id, "room selected");
            self.focus = Focus::Input;
        }
        vec![UiAction::Render]
    }

    fn handle_enter(&mut self, store: &Store) -> Vec<UiAction> {
        if self.input.is_blank() {
            return vec![];
        }

        let Some(room_id) = store.current_room() else {
            self.set_status("No room selected");
            return vec![UiAction::Render];
        };

        let body = self.input.take().trim().to_owned();
        vec![UiAction::Send { room_id, body }, UiAction::Render]
    }
}
