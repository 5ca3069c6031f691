use winit::event::{ElementState, MouseButton as WinitMouseButton, MouseScrollDelta, WindowEvent};
use winit::keyboard::{KeyCode, ModifiersState, PhysicalKey};

use crate::input::{
    InputEvent, InputState, Key, KeyState, Modifiers, MouseButton, MouseButtonState,
    MouseWheelDelta, PointerButtonEvent, PointerMoveEvent,
};

/// Translates a winit `WindowEvent` into an engine `InputEvent`.
///
/// Positions stay in physical pixels so they can be compared against the
/// framebuffer and fed back to `Window::set_cursor_position`.
/// Returns `None` for events not represented by the input subsystem.
pub fn translate_window_event(state: &InputState, event: &WindowEvent) -> Option<InputEvent> {
    match event {
        WindowEvent::ModifiersChanged(m) => {
            let ms: ModifiersState = m.state();
            Some(InputEvent::ModifiersChanged(map_modifiers(ms)))
        }

        WindowEvent::Focused(f) => Some(InputEvent::Focused(*f)),

        WindowEvent::CursorLeft { .. } => Some(InputEvent::PointerLeft),

        WindowEvent::CursorMoved { position, .. } => Some(InputEvent::PointerMoved(PointerMoveEvent {
            x: position.x as f32,
            y: position.y as f32,
        })),

        WindowEvent::MouseInput { state: st, button, .. } => {
            let st = match st {
                ElementState::Pressed => MouseButtonState::Pressed,
                ElementState::Released => MouseButtonState::Released,
            };

            // winit 0.30 has no cursor query; use the tracked position.
            let (x, y) = state.pointer_pos.unwrap_or((0.0, 0.0));

            Some(InputEvent::PointerButton(PointerButtonEvent {
                button: map_mouse_button(*button),
                state: st,
                x,
                y,
                modifiers: state.modifiers,
            }))
        }

        WindowEvent::MouseWheel { delta, .. } => {
            let delta = match delta {
                MouseScrollDelta::LineDelta(x, y) => MouseWheelDelta::Line { x: *x, y: *y },
                MouseScrollDelta::PixelDelta(p) => MouseWheelDelta::Pixel {
                    x: p.x as f32,
                    y: p.y as f32,
                },
            };
            Some(InputEvent::MouseWheel {
                delta,
                modifiers: state.modifiers,
            })
        }

        WindowEvent::KeyboardInput { event, .. } => {
            let st = match event.state {
                ElementState::Pressed => KeyState::Pressed,
                ElementState::Released => KeyState::Released,
            };

            let (key, code) = map_key(event.physical_key);

            Some(InputEvent::Key {
                key,
                state: st,
                modifiers: state.modifiers,
                code,
                repeat: event.repeat,
            })
        }

        WindowEvent::DroppedFile(path) => Some(InputEvent::FileDropped(path.clone())),

        _ => None,
    }
}

fn map_modifiers(m: ModifiersState) -> Modifiers {
    Modifiers {
        shift: m.shift_key(),
        ctrl: m.control_key(),
        alt: m.alt_key(),
        meta: m.super_key(),
    }
}

fn map_mouse_button(b: WinitMouseButton) -> MouseButton {
    match b {
        WinitMouseButton::Left => MouseButton::Left,
        WinitMouseButton::Right => MouseButton::Right,
        WinitMouseButton::Middle => MouseButton::Middle,
        WinitMouseButton::Back => MouseButton::Back,
        WinitMouseButton::Forward => MouseButton::Forward,
        WinitMouseButton::Other(v) => MouseButton::Other(v),
    }
}

fn map_key(pk: PhysicalKey) -> (Key, u32) {
    let PhysicalKey::Code(code) = pk else {
        // NativeKeyCode has no stable numeric form.
        return (Key::Unknown(0), 0);
    };

    const LETTERS: [(KeyCode, Key); 26] = [
        (KeyCode::KeyA, Key::A), (KeyCode::KeyB, Key::B), (KeyCode::KeyC, Key::C),
        (KeyCode::KeyD, Key::D), (KeyCode::KeyE, Key::E), (KeyCode::KeyF, Key::F),
        (KeyCode::KeyG, Key::G), (KeyCode::KeyH, Key::H), (KeyCode::KeyI, Key::I),
        (KeyCode::KeyJ, Key::J), (KeyCode::KeyK, Key::K), (KeyCode::KeyL, Key::L),
        (KeyCode::KeyM, Key::M), (KeyCode::KeyN, Key::N), (KeyCode::KeyO, Key::O),
        (KeyCode::KeyP, Key::P), (KeyCode::KeyQ, Key::Q), (KeyCode::KeyR, Key::R),
        (KeyCode::KeyS, Key::S), (KeyCode::KeyT, Key::T), (KeyCode::KeyU, Key::U),
        (KeyCode::KeyV, Key::V), (KeyCode::KeyW, Key::W), (KeyCode::KeyX, Key::X),
        (KeyCode::KeyY, Key::Y), (KeyCode::KeyZ, Key::Z),
    ];

    const DIGITS: [(KeyCode, Key); 20] = [
        (KeyCode::Digit0, Key::Digit0), (KeyCode::Digit1, Key::Digit1),
        (KeyCode::Digit2, Key::Digit2), (KeyCode::Digit3, Key::Digit3),
        (KeyCode::Digit4, Key::Digit4), (KeyCode::Digit5, Key::Digit5),
        (KeyCode::Digit6, Key::Digit6), (KeyCode::Digit7, Key::Digit7),
        (KeyCode::Digit8, Key::Digit8), (KeyCode::Digit9, Key::Digit9),
        (KeyCode::Numpad0, Key::Numpad0), (KeyCode::Numpad1, Key::Numpad1),
        (KeyCode::Numpad2, Key::Numpad2), (KeyCode::Numpad3, Key::Numpad3),
        (KeyCode::Numpad4, Key::Numpad4), (KeyCode::Numpad5, Key::Numpad5),
        (KeyCode::Numpad6, Key::Numpad6), (KeyCode::Numpad7, Key::Numpad7),
        (KeyCode::Numpad8, Key::Numpad8), (KeyCode::Numpad9, Key::Numpad9),
    ];

    let key = match code {
        KeyCode::Escape => Key::Escape,
        KeyCode::Enter | KeyCode::NumpadEnter => Key::Enter,
        KeyCode::Space => Key::Space,

        KeyCode::ShiftLeft | KeyCode::ShiftRight => Key::Shift,
        KeyCode::ControlLeft | KeyCode::ControlRight => Key::Control,
        KeyCode::AltLeft | KeyCode::AltRight => Key::Alt,
        KeyCode::SuperLeft | KeyCode::SuperRight => Key::Meta,

        other => LETTERS
            .iter()
            .chain(DIGITS.iter())
            .find(|(kc, _)| *kc == other)
            .map(|&(_, key)| key)
            .unwrap_or(Key::Unknown(other as u32)),
    };

    (key, code as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keypad_and_row_digits_are_distinct() {
        assert_eq!(map_key(PhysicalKey::Code(KeyCode::Numpad1)).0, Key::Numpad1);
        assert_eq!(map_key(PhysicalKey::Code(KeyCode::Digit1)).0, Key::Digit1);
        assert_eq!(map_key(PhysicalKey::Code(KeyCode::KeyW)).0, Key::W);
    }

    #[test]
    fn unmapped_keys_keep_their_code() {
        let (key, code) = map_key(PhysicalKey::Code(KeyCode::F5));
        assert_eq!(key, Key::Unknown(code));
    }
}
