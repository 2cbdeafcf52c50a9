//! Generic pointer event types for cross-backend compatibility.

/// Pointer button identification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointerButton {
    /// Primary button, pen tip or touch contact (draws)
    #[default]
    Primary,
    /// Secondary button (ignored)
    Secondary,
    /// Middle button (ignored)
    Middle,
}

/// A pointer sample in device coordinates.
///
/// Backends map mouse, pen and touch input onto this one shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    /// Identifies the pointer for capture (one per finger/pen/mouse)
    pub pointer_id: i32,
    pub button: PointerButton,
    pub client_x: f64,
    pub client_y: f64,
    /// Device pressure in 0.0..=1.0 when the hardware reports it
    pub pressure: Option<f64>,
}

impl PointerEvent {
    /// Primary-button event without pressure information.
    pub fn at(pointer_id: i32, client_x: f64, client_y: f64) -> Self {
        Self {
            pointer_id,
            button: PointerButton::Primary,
            client_x,
            client_y,
            pressure: None,
        }
    }

    pub fn with_pressure(mut self, pressure: f64) -> Self {
        self.pressure = Some(pressure);
        self
    }
}
