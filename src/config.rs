use std::time::Duration;

use crate::types::SurfaceId;

/// Where the simulator window sits on screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Docking {
    /// Free-floating, initially centered near the bottom of the screen.
    Floating,
    /// Centered against the top of the visible screen area.
    DockedToTop,
    /// Centered against the bottom of the visible screen area.
    DockedToBottom,
}

/// Runtime settings for the simulator.
///
/// Built with chained setters:
///
/// ```
/// use std::time::Duration;
/// use simbar::{Docking, SimulatorConfig};
/// let config = SimulatorConfig::new()
///     .alpha(0.9)
///     .docking(Docking::DockedToBottom)
///     .open_timeout(Duration::from_secs(1));
/// assert_eq!(config.window_alpha, 0.9);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct SimulatorConfig {
    /// Surface to capture.  The Touch Bar is always 0.
    pub surface: SurfaceId,
    /// How long to wait for the capture stream to open.
    pub capture_open_timeout: Duration,
    /// Black border around the mirrored bar, in points.
    pub padding: f64,
    /// Window transparency, clamped to [0.5, 1.0].
    pub window_alpha: f64,
    ///
    pub docking: Docking,
    ///
    pub show_on_all_desktops: bool,
    /// Distance from the bottom of the screen for the first floating
    /// placement.
    pub floating_offset: f64,
}

impl Default for SimulatorConfig {
    fn default() -> SimulatorConfig {
        SimulatorConfig {
            surface: 0,
            capture_open_timeout: Duration::from_secs(2),
            padding: 5.0,
            window_alpha: 0.75,
            docking: Docking::Floating,
            show_on_all_desktops: false,
            floating_offset: 100.0,
        }
    }
}

impl SimulatorConfig {
    ///
    pub fn new() -> SimulatorConfig {
        SimulatorConfig::default()
    }
    ///
    pub fn surface(mut self, surface: SurfaceId) -> Self {
        self.surface = surface;
        self
    }
    ///
    pub fn open_timeout(mut self, timeout: Duration) -> Self {
        self.capture_open_timeout = timeout;
        self
    }
    ///
    pub fn padding(mut self, padding: f64) -> Self {
        self.padding = padding.max(0.0);
        self
    }
    ///
    pub fn alpha(mut self, alpha: f64) -> Self {
        self.window_alpha = alpha.max(0.5).min(1.0);
        self
    }
    ///
    pub fn docking(mut self, docking: Docking) -> Self {
        self.docking = docking;
        self
    }
    ///
    pub fn all_desktops(mut self, all: bool) -> Self {
        self.show_on_all_desktops = all;
        self
    }
    ///
    pub fn floating_offset(mut self, offset: f64) -> Self {
        self.floating_offset = offset;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let c = SimulatorConfig::new();
        assert_eq!(c.surface, 0);
        assert_eq!(c.padding, 5.0);
        assert_eq!(c.window_alpha, 0.75);
        assert_eq!(c.docking, Docking::Floating);
    }

    #[test]
    fn test_builder_clamps() {
        let c = SimulatorConfig::new().alpha(0.1).padding(-3.0);
        assert_eq!(c.window_alpha, 0.5);
        assert_eq!(c.padding, 0.0);
        assert_eq!(SimulatorConfig::new().alpha(4.0).window_alpha, 1.0);
    }
}
