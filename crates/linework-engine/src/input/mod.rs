//! Input events.
//!
//! Platform-agnostic; the window runtime translates winit events into
//! [`InputEvent`]s. Positions are canvas pixels with the origin top-left.

mod state;
mod types;

pub use state::InputState;
pub use types::{
    InputEvent, Key, KeyState, Modifiers, MouseButton, MouseButtonState, MouseWheelDelta,
    PointerButtonEvent, PointerMoveEvent,
};
