use crate::config::ModifierKey;
use crate::render::gizmo::GizmoMode;
use winit::keyboard::{KeyCode, PhysicalKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAction {
    None,
    SetGizmoMode(GizmoMode),
    /// Edge of the uniform-scale modifier: pressed or released.
    UniformScale(bool),
    OpenModel,
    Quit,
}

#[derive(Debug, Clone, Copy)]
pub struct InputState {
    uniform_key: ModifierKey,
    modifier_held: bool,
}

impl InputState {
    pub fn new(uniform_key: ModifierKey) -> Self {
        Self {
            uniform_key,
            modifier_held: false,
        }
    }

    /// Map a key event to an action. The modifier is tracked even while a
    /// text field has focus; shortcuts are not.
    pub fn handle_key(&mut self, key: PhysicalKey, pressed: bool, ui_has_focus: bool) -> InputAction {
        let PhysicalKey::Code(code) = key else {
            return InputAction::None;
        };
        if self.is_uniform_key(code) {
            if pressed == self.modifier_held {
                return InputAction::None;
            }
            self.modifier_held = pressed;
            return InputAction::UniformScale(pressed);
        }
        if !pressed || ui_has_focus {
            return InputAction::None;
        }
        match code {
            KeyCode::KeyG => InputAction::SetGizmoMode(GizmoMode::Translate),
            KeyCode::KeyR => InputAction::SetGizmoMode(GizmoMode::Rotate),
            KeyCode::KeyS => InputAction::SetGizmoMode(GizmoMode::Scale),
            KeyCode::KeyO => InputAction::OpenModel,
            KeyCode::Escape => InputAction::Quit,
            _ => InputAction::None,
        }
    }

    /// Forget held keys, e.g. when the window loses focus and the release
    /// would never arrive.
    pub fn release_all(&mut self) -> InputAction {
        if std::mem::take(&mut self.modifier_held) {
            InputAction::UniformScale(false)
        } else {
            InputAction::None
        }
    }

    fn is_uniform_key(&self, code: KeyCode) -> bool {
        match self.uniform_key {
            ModifierKey::Shift => matches!(code, KeyCode::ShiftLeft | KeyCode::ShiftRight),
            ModifierKey::Control => matches!(code, KeyCode::ControlLeft | KeyCode::ControlRight),
            ModifierKey::Alt => matches!(code, KeyCode::AltLeft | KeyCode::AltRight),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> PhysicalKey {
        PhysicalKey::Code(code)
    }

    #[test]
    fn mode_keys() {
        let mut input = InputState::new(ModifierKey::Shift);
        assert_eq!(
            input.handle_key(key(KeyCode::KeyG), true, false),
            InputAction::SetGizmoMode(GizmoMode::Translate)
        );
        assert_eq!(
            input.handle_key(key(KeyCode::KeyR), true, false),
            InputAction::SetGizmoMode(GizmoMode::Rotate)
        );
        assert_eq!(
            input.handle_key(key(KeyCode::KeyS), true, false),
            InputAction::SetGizmoMode(GizmoMode::Scale)
        );
        assert_eq!(input.handle_key(key(KeyCode::KeyS), false, false), InputAction::None);
        assert_eq!(input.handle_key(key(KeyCode::KeyO), true, false), InputAction::OpenModel);
        assert_eq!(input.handle_key(key(KeyCode::Escape), true, false), InputAction::Quit);
    }

    #[test]
    fn shortcuts_ignored_while_typing() {
        let mut input = InputState::new(ModifierKey::Shift);
        assert_eq!(input.handle_key(key(KeyCode::KeyS), true, true), InputAction::None);
        assert_eq!(input.handle_key(key(KeyCode::Escape), true, true), InputAction::None);
    }

    #[test]
    fn modifier_reports_edges_only() {
        let mut input = InputState::new(ModifierKey::Shift);
        assert_eq!(
            input.handle_key(key(KeyCode::ShiftLeft), true, true),
            InputAction::UniformScale(true)
        );
        // Key repeat.
        assert_eq!(input.handle_key(key(KeyCode::ShiftLeft), true, false), InputAction::None);
        assert_eq!(
            input.handle_key(key(KeyCode::ShiftLeft), false, false),
            InputAction::UniformScale(false)
        );
        assert_eq!(input.handle_key(key(KeyCode::ShiftLeft), false, false), InputAction::None);
    }

    #[test]
    fn configured_modifier() {
        let mut input = InputState::new(ModifierKey::Alt);
        assert_eq!(input.handle_key(key(KeyCode::ShiftLeft), true, false), InputAction::None);
        assert_eq!(
            input.handle_key(key(KeyCode::AltRight), true, false),
            InputAction::UniformScale(true)
        );
    }

    #[test]
    fn focus_loss_releases_modifier() {
        let mut input = InputState::new(ModifierKey::Control);
        input.handle_key(key(KeyCode::ControlLeft), true, false);
        assert_eq!(input.release_all(), InputAction::UniformScale(false));
        assert_eq!(input.release_all(), InputAction::None);
    }
}
