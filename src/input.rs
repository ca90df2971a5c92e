//! The live keyboard-edit contract.
//!
//! The mapping is fixed and part of the observable behavior: two keys per
//! parameter (increment, decrement), one key to arm recording, Escape to
//! request shutdown.

use crate::params::ParamKind;

/// Keys the display surface can deliver.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Key {
    /// Increment smoothing.
    A,
    /// Decrement smoothing.
    Z,
    /// Increment whitening.
    S,
    /// Decrement whitening.
    X,
    /// Increment face slimming.
    D,
    /// Decrement face slimming.
    C,
    /// Increment eye zoom.
    F,
    /// Decrement eye zoom.
    V,
    /// Increment lip tint.
    G,
    /// Decrement lip tint.
    B,
    /// Increment cheek tint.
    H,
    /// Decrement cheek tint.
    N,
    /// Arm output recording.
    Space,
    /// Request shutdown.
    Escape,
}

/// What a key press means to the driver loop.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InputAction {
    /// Apply a discrete parameter edit of the given delta in raw units.
    Adjust(ParamKind, f32),
    /// Start writing transformed frames to the output sink.
    ArmRecording,
    /// Close the session.
    Quit,
}

/// Raw units applied per key press.
const EDIT_STEP: f32 = 1.0;

/// Translate one key press into its action.
pub fn map_key(key: Key) -> InputAction {
    match key {
        Key::A => InputAction::Adjust(ParamKind::Smoothing, EDIT_STEP),
        Key::Z => InputAction::Adjust(ParamKind::Smoothing, -EDIT_STEP),
        Key::S => InputAction::Adjust(ParamKind::Whitening, EDIT_STEP),
        Key::X => InputAction::Adjust(ParamKind::Whitening, -EDIT_STEP),
        Key::D => InputAction::Adjust(ParamKind::FaceSlim, EDIT_STEP),
        Key::C => InputAction::Adjust(ParamKind::FaceSlim, -EDIT_STEP),
        Key::F => InputAction::Adjust(ParamKind::EyeZoom, EDIT_STEP),
        Key::V => InputAction::Adjust(ParamKind::EyeZoom, -EDIT_STEP),
        Key::G => InputAction::Adjust(ParamKind::Lipstick, EDIT_STEP),
        Key::B => InputAction::Adjust(ParamKind::Lipstick, -EDIT_STEP),
        Key::H => InputAction::Adjust(ParamKind::Blusher, EDIT_STEP),
        Key::N => InputAction::Adjust(ParamKind::Blusher, -EDIT_STEP),
        Key::Space => InputAction::ArmRecording,
        Key::Escape => InputAction::Quit,
    }
}
