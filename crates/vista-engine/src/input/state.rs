use std::collections::HashSet;

use super::frame::InputFrame;
use super::types::{
    InputEvent,
    Key,
    KeyState,
    Modifiers,
    MouseButton,
    MouseButtonState,
    PointerButtonEvent,
    PointerMoveEvent,
};

/// Current input state for a single window.
///
/// Holds "is down" information and current pointer position.
/// Per-frame transitions are recorded into an `InputFrame`.
#[derive(Debug, Default)]
pub struct InputState {
    /// Current modifier state.
    pub modifiers: Modifiers,

    /// Whether the window is focused.
    pub focused: bool,

    /// Pointer position in physical pixels.
    pub pointer_pos: Option<(f32, f32)>,

    /// Set of currently held keys.
    pub keys_down: HashSet<Key>,

    /// Set of currently held mouse buttons.
    pub buttons_down: HashSet<MouseButton>,
}

impl InputState {
    /// Applies a platform-agnostic input event to the current state and writes deltas to `frame`.
    pub fn apply_event(&mut self, frame: &mut InputFrame, ev: InputEvent) {
        match &ev {
            InputEvent::ModifiersChanged(m) => {
                self.modifiers = *m;
            }

            InputEvent::Focused(f) => {
                self.focused = *f;
                if !*f {
                    // Avoid stuck keys/buttons when focus changes mid-press.
                    self.keys_down.clear();
                    self.buttons_down.clear();
                }
            }

            InputEvent::PointerMoved(PointerMoveEvent { x, y }) => {
                if let Some((px, py)) = self.pointer_pos {
                    frame.pointer_delta.0 += x - px;
                    frame.pointer_delta.1 += y - py;
                }
                self.pointer_pos = Some((*x, *y));
            }

            InputEvent::PointerLeft => {
                self.pointer_pos = None;
            }

            InputEvent::Key {
                key,
                state,
                modifiers,
                ..
            } => {
                self.modifiers = *modifiers;

                match state {
                    KeyState::Pressed => {
                        if self.keys_down.insert(*key) {
                            frame.keys_pressed.insert(*key);
                        }
                    }
                    KeyState::Released => {
                        if self.keys_down.remove(key) {
                            frame.keys_released.insert(*key);
                        }
                    }
                }
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
                    MouseButtonState::Pressed => {
                        if self.buttons_down.insert(*button) {
                            frame.buttons_pressed.insert(*button);
                        }
                    }
                    MouseButtonState::Released => {
                        if self.buttons_down.remove(button) {
                            frame.buttons_released.insert(*button);
                        }
                    }
                }
            }

            InputEvent::MouseWheel { delta, modifiers } => {
                self.modifiers = *modifiers;
                frame.scroll += delta.lines_y();
            }

            InputEvent::FileDropped(path) => {
                frame.dropped_files.push(path.clone());
            }
        }

        frame.push_event(ev);
    }

    /// Moves the tracked pointer without producing motion, after the runtime
    /// has warped the OS cursor.
    pub fn warp_pointer(&mut self, x: f32, y: f32) {
        self.pointer_pos = Some((x, y));
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
    use crate::input::MouseWheelDelta;
    use std::path::PathBuf;

    fn key(key: Key, state: KeyState) -> InputEvent {
        InputEvent::Key {
            key,
            state,
            modifiers: Modifiers::default(),
            code: 0,
            repeat: false,
        }
    }

    // ── keys ──────────────────────────────────────────────────────────────

    #[test]
    fn press_is_reported_once_while_held() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();
        state.apply_event(&mut frame, key(Key::Numpad7, KeyState::Pressed));
        state.apply_event(&mut frame, key(Key::Numpad7, KeyState::Pressed));
        assert!(frame.key_pressed(Key::Numpad7));
        assert!(state.key_down(Key::Numpad7));

        frame.clear();
        state.apply_event(&mut frame, key(Key::Numpad7, KeyState::Pressed));
        assert!(!frame.key_pressed(Key::Numpad7), "auto-repeat is not a new press");

        state.apply_event(&mut frame, key(Key::Numpad7, KeyState::Released));
        assert!(frame.keys_released.contains(&Key::Numpad7));
        assert!(!state.key_down(Key::Numpad7));
    }

    #[test]
    fn focus_loss_releases_everything() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();
        state.apply_event(&mut frame, key(Key::W, KeyState::Pressed));
        state.apply_event(
            &mut frame,
            InputEvent::PointerButton(PointerButtonEvent {
                button: MouseButton::Right,
                state: MouseButtonState::Pressed,
                x: 1.0,
                y: 1.0,
                modifiers: Modifiers::default(),
            }),
        );
        state.apply_event(&mut frame, InputEvent::Focused(false));
        assert!(state.keys_down.is_empty());
        assert!(state.buttons_down.is_empty());
    }

    // ── accumulation ──────────────────────────────────────────────────────

    #[test]
    fn wheel_and_pointer_motion_accumulate_per_frame() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();
        let wheel = |delta| InputEvent::MouseWheel {
            delta,
            modifiers: Modifiers::default(),
        };

        state.apply_event(&mut frame, wheel(MouseWheelDelta::Line { x: 0.0, y: 1.0 }));
        state.apply_event(&mut frame, wheel(MouseWheelDelta::Pixel { x: 0.0, y: 20.0 }));
        assert!((frame.scroll - 1.5).abs() < 1e-6);

        state.apply_event(&mut frame, InputEvent::PointerMoved(PointerMoveEvent { x: 10.0, y: 10.0 }));
        state.apply_event(&mut frame, InputEvent::PointerMoved(PointerMoveEvent { x: 13.0, y: 6.0 }));
        state.apply_event(&mut frame, InputEvent::PointerMoved(PointerMoveEvent { x: 15.0, y: 6.0 }));
        assert_eq!(frame.pointer_delta, (5.0, -4.0));

        frame.clear();
        assert_eq!(frame.scroll, 0.0);
        assert_eq!(frame.pointer_delta, (0.0, 0.0));
    }

    #[test]
    fn dropped_files_are_queued_in_order() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();
        state.apply_event(&mut frame, InputEvent::FileDropped(PathBuf::from("a.cube")));
        state.apply_event(&mut frame, InputEvent::FileDropped(PathBuf::from("b.cube")));
        assert_eq!(
            frame.dropped_files,
            vec![PathBuf::from("a.cube"), PathBuf::from("b.cube")]
        );
    }

    #[test]
    fn warp_moves_pointer_without_motion() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();
        state.apply_event(&mut frame, InputEvent::PointerMoved(PointerMoveEvent { x: 0.0, y: 5.0 }));
        state.warp_pointer(798.0, 5.0);
        state.apply_event(&mut frame, InputEvent::PointerMoved(PointerMoveEvent { x: 797.0, y: 5.0 }));
        assert_eq!(frame.pointer_delta, (-1.0, 0.0));
    }
}
