//! Keyboard and mouse bindings.
//!
//! | input                 | action                               |
//! |-----------------------|--------------------------------------|
//! | `1` / `2` / `3`       | wireframe / solid / textured display |
//! | `F`                   | toggle walk mode                     |
//! | `G`                   | toggle grid                          |
//! | `Esc`                 | quit                                 |
//! | keypad `4` `6` `8` `2`| rotate (held)                        |
//! | keypad `5`            | reset to home view                   |
//! | keypad `1` `3` `7` `9`| front / right / top / isometric      |
//! | `Ctrl` + keypad       | back / left / bottom / inverse iso   |
//! | middle drag           | orbit; with `Shift`, pan             |
//! | wheel                 | zoom                                 |
//! | right drag (walk)     | look; `WASD` + `E`/`Q` move          |

use glam::Vec2;

use crate::camera::{CameraCommand, CameraInput, NavigationMode, OrbitPreset, WalkKeys};
use crate::input::{InputFrame, InputState, Key, MouseButton};
use crate::render::DisplayMode;

/// Viewer-level actions triggered by a key press.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ViewerAction {
    Exit,
    SetDisplayMode(DisplayMode),
    ToggleWalk,
    ToggleGrid,
}

const ACTION_KEYS: [(Key, ViewerAction); 6] = [
    (Key::Escape, ViewerAction::Exit),
    (Key::Digit1, ViewerAction::SetDisplayMode(DisplayMode::Wireframe)),
    (Key::Digit2, ViewerAction::SetDisplayMode(DisplayMode::Solid)),
    (Key::Digit3, ViewerAction::SetDisplayMode(DisplayMode::Texture)),
    (Key::F, ViewerAction::ToggleWalk),
    (Key::G, ViewerAction::ToggleGrid),
];

/// Keypad preset keys: (key, preset, preset with Ctrl).
const PRESET_KEYS: [(Key, OrbitPreset, OrbitPreset); 4] = [
    (Key::Numpad1, OrbitPreset::Front, OrbitPreset::Back),
    (Key::Numpad3, OrbitPreset::Right, OrbitPreset::Left),
    (Key::Numpad7, OrbitPreset::Top, OrbitPreset::Bottom),
    (Key::Numpad9, OrbitPreset::Isometric, OrbitPreset::InverseIsometric),
];

/// Keys that rotate every frame while held.
const HELD_ROTATE_KEYS: [(Key, CameraCommand); 4] = [
    (Key::Numpad4, CameraCommand::RotateLeft),
    (Key::Numpad6, CameraCommand::RotateRight),
    (Key::Numpad8, CameraCommand::RotateUp),
    (Key::Numpad2, CameraCommand::RotateDown),
];

/// Actions for keys pressed this frame, in binding order.
pub fn viewer_actions(frame: &InputFrame) -> Vec<ViewerAction> {
    ACTION_KEYS
        .iter()
        .filter(|(key, _)| frame.key_pressed(*key))
        .map(|&(_, action)| action)
        .collect()
}

/// Builds the camera's per-frame snapshot from window input.
pub fn camera_input(
    input: &InputState,
    frame: &InputFrame,
    mode: NavigationMode,
    viewport: (u32, u32),
) -> CameraInput {
    let mut commands: Vec<CameraCommand> = HELD_ROTATE_KEYS
        .iter()
        .filter(|(key, _)| input.key_down(*key))
        .map(|&(_, command)| command)
        .collect();

    if frame.key_pressed(Key::Numpad5) {
        commands.push(CameraCommand::ResetHome);
    }
    for (key, preset, ctrl_preset) in PRESET_KEYS {
        if frame.key_pressed(key) {
            let preset = if input.modifiers.ctrl { ctrl_preset } else { preset };
            commands.push(CameraCommand::Preset(preset));
        }
    }

    CameraInput {
        mode,
        commands,
        scroll: frame.scroll,
        cursor: input.pointer_pos.map(|(x, y)| Vec2::new(x, y)),
        viewport: Vec2::new(viewport.0 as f32, viewport.1 as f32),
        middle_down: input.button_down(MouseButton::Middle),
        right_down: input.button_down(MouseButton::Right),
        shift: input.modifiers.shift,
        walk: WalkKeys {
            forward: input.key_down(Key::W),
            back: input.key_down(Key::S),
            left: input.key_down(Key::A),
            right: input.key_down(Key::D),
            up: input.key_down(Key::E),
            down: input.key_down(Key::Q),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{InputEvent, KeyState, Modifiers};

    fn press(state: &mut InputState, frame: &mut InputFrame, key: Key, modifiers: Modifiers) {
        state.apply_event(
            frame,
            InputEvent::Key {
                key,
                state: KeyState::Pressed,
                modifiers,
                code: 0,
                repeat: false,
            },
        );
    }

    #[test]
    fn digit_keys_select_display_modes() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();
        press(&mut state, &mut frame, Key::Digit1, Modifiers::default());
        press(&mut state, &mut frame, Key::G, Modifiers::default());
        assert_eq!(
            viewer_actions(&frame),
            vec![
                ViewerAction::SetDisplayMode(DisplayMode::Wireframe),
                ViewerAction::ToggleGrid
            ]
        );
    }

    #[test]
    fn ctrl_selects_the_opposite_preset() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();
        let ctrl = Modifiers {
            ctrl: true,
            ..Default::default()
        };
        press(&mut state, &mut frame, Key::Numpad7, ctrl);
        let input = camera_input(&state, &frame, NavigationMode::Orbit, (800, 600));
        assert_eq!(input.commands, vec![CameraCommand::Preset(OrbitPreset::Bottom)]);
    }

    #[test]
    fn held_rotate_keys_repeat_but_presets_do_not() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();
        press(&mut state, &mut frame, Key::Numpad4, Modifiers::default());
        press(&mut state, &mut frame, Key::Numpad5, Modifiers::default());

        let first = camera_input(&state, &frame, NavigationMode::Orbit, (800, 600));
        assert_eq!(
            first.commands,
            vec![CameraCommand::RotateLeft, CameraCommand::ResetHome]
        );

        frame.clear();
        let second = camera_input(&state, &frame, NavigationMode::Orbit, (800, 600));
        assert_eq!(second.commands, vec![CameraCommand::RotateLeft]);
    }

    #[test]
    fn walk_keys_and_viewport_are_forwarded() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();
        press(&mut state, &mut frame, Key::W, Modifiers::default());
        press(&mut state, &mut frame, Key::Q, Modifiers::default());
        let input = camera_input(&state, &frame, NavigationMode::Walk, (1024, 768));
        assert!(input.walk.forward && input.walk.down);
        assert!(!input.walk.back);
        assert_eq!(input.viewport, Vec2::new(1024.0, 768.0));
        assert_eq!(input.mode, NavigationMode::Walk);
    }
}
