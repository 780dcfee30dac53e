use std::collections::HashSet;

use super::types::{
    InputEvent, Key, KeyState, Modifiers, MouseButton, MouseButtonState, PointerButtonEvent,
    PointerMoveEvent,
};

/// Current input state of one window: held keys and buttons, pointer position.
#[derive(Debug, Default)]
pub struct InputState {
    pub modifiers: Modifiers,
    pub focused: bool,

    /// Pointer position in canvas pixels.
    pub pointer_pos: Option<(f32, f32)>,

    pub keys_down: HashSet<Key>,
    pub buttons_down: HashSet<MouseButton>,
}

impl InputState {
    /// Applies `ev`. Returns true for a key press that was not already held.
    pub fn apply_event(&mut self, ev: &InputEvent) -> bool {
        match ev {
            InputEvent::ModifiersChanged(m) => self.modifiers = *m,

            InputEvent::Focused(f) => {
                self.focused = *f;
                if !*f {
                    // Releases are not delivered to unfocused windows.
                    self.keys_down.clear();
                    self.buttons_down.clear();
                }
            }

            InputEvent::PointerMoved(PointerMoveEvent { x, y }) => self.pointer_pos = Some((*x, *y)),

            InputEvent::PointerLeft => self.pointer_pos = None,

            InputEvent::Key {
                key,
                state,
                modifiers,
                ..
            } => {
                self.modifiers = *modifiers;
                return match state {
                    KeyState::Pressed => self.keys_down.insert(*key),
                    KeyState::Released => {
                        self.keys_down.remove(key);
                        false
                    }
                };
            }

            InputEvent::PointerButton(PointerButtonEvent {
                button,
                state,
                x,
                y,
                modifiers,
            }) => {
                self.pointer_pos = Some((*x, *y));
                self.modifiers = *modifiers;
                match state {
                    MouseButtonState::Pressed => self.buttons_down.insert(*button),
                    MouseButtonState::Released => self.buttons_down.remove(button),
                };
            }

            InputEvent::MouseWheel { modifiers, .. } => self.modifiers = *modifiers,
        }
        false
    }

    pub fn key_down(&self, key: Key) -> bool {
        self.keys_down.contains(&key)
    }

    pub fn button_down(&self, btn: MouseButton) -> bool {
        self.buttons_down.contains(&btn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(key: Key, state: KeyState) -> InputEvent {
        InputEvent::Key {
            key,
            state,
            modifiers: Modifiers::default(),
            code: 0,
            repeat: false,
        }
    }

    #[test]
    fn key_press_reports_only_first_press() {
        let mut state = InputState::default();
        assert!(state.apply_event(&key(Key::F, KeyState::Pressed)));
        assert!(!state.apply_event(&key(Key::F, KeyState::Pressed)));
        assert!(state.key_down(Key::F));
        assert!(!state.apply_event(&key(Key::F, KeyState::Released)));
        assert!(!state.key_down(Key::F));
    }

    #[test]
    fn focus_loss_releases_everything() {
        let mut state = InputState::default();
        state.apply_event(&key(Key::Shift, KeyState::Pressed));
        state.apply_event(&InputEvent::PointerButton(PointerButtonEvent {
            button: MouseButton::Left,
            state: MouseButtonState::Pressed,
            x: 3.0,
            y: 4.0,
            modifiers: Modifiers::default(),
        }));
        assert!(state.button_down(MouseButton::Left));
        assert_eq!(state.pointer_pos, Some((3.0, 4.0)));

        state.apply_event(&InputEvent::Focused(false));
        assert!(state.keys_down.is_empty());
        assert!(state.buttons_down.is_empty());
    }

    #[test]
    fn digits_have_values() {
        assert_eq!(Key::Digit7.digit(), Some(7));
        assert_eq!(Key::F.digit(), None);
    }
}
