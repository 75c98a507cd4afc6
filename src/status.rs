use std::sync::Arc;

use crate::interface::TVirtualDisplay;
use crate::types::VirtualSurfaceStatus;

/// Turns the virtual Touch Bar display on and off, remembering what it was
/// before we touched it.
pub struct StatusController {
    display: Arc<dyn TVirtualDisplay>,
    prior: Option<VirtualSurfaceStatus>,
    // Exact value behind `prior`; the enum does not keep every bit.
    prior_raw: Option<i32>,
}

impl StatusController {
    ///
    pub fn new(display: Arc<dyn TVirtualDisplay>) -> StatusController {
        StatusController { display: display, prior: None, prior_raw: None }
    }

    ///
    pub fn current_status(&self) -> VirtualSurfaceStatus {
        VirtualSurfaceStatus::from_raw(self.display.status())
    }

    /// Status captured by the first `enable()` since the last `disable()`.
    pub fn prior(&self) -> Option<VirtualSurfaceStatus> {
        self.prior
    }

    /// Enables the surface and returns the status it had before.  When the
    /// surface is already on this changes nothing and returns the current
    /// status.
    pub fn enable(&mut self) -> VirtualSurfaceStatus {
        let raw = self.display.status();
        let current = VirtualSurfaceStatus::from_raw(raw);
        if self.prior.is_none() {
            self.prior = Some(current);
            self.prior_raw = Some(raw);
        }
        if current.is_enabled() {
            debug!("virtual display already {:?}", current);
            return current;
        }
        info!("enabling virtual display (was {:?})", current);
        self.display.set_status(VirtualSurfaceStatus::Enabled.to_raw());
        current
    }

    /// Puts the surface back into `restore_to`.  When that is the status
    /// captured by `enable`, the raw value read then is written back as is.
    pub fn disable(&mut self, restore_to: VirtualSurfaceStatus) {
        let prior_raw = self.prior_raw.take();
        self.prior = None;
        let raw = match prior_raw {
            Some(raw) if VirtualSurfaceStatus::from_raw(raw) == restore_to => raw,
            _ => restore_to.to_raw(),
        };
        if self.display.status() == raw {
            debug!("virtual display already {:?} ({})", restore_to, raw);
            return;
        }
        info!("restoring virtual display to {:?} ({})", restore_to, raw);
        self.display.set_status(raw);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockPlatform;

    #[test]
    fn test_enable_from_disabled() {
        let platform = MockPlatform::new();
        let mut status = StatusController::new(platform.clone());
        assert_eq!(status.enable(), VirtualSurfaceStatus::Disabled);
        assert_eq!(status.current_status(), VirtualSurfaceStatus::Enabled);
        assert_eq!(status.prior(), Some(VirtualSurfaceStatus::Disabled));
    }

    #[test]
    fn test_enable_is_idempotent() {
        let platform = MockPlatform::new();
        let mut status = StatusController::new(platform.clone());
        status.enable();
        let first = status.current_status();
        let writes = platform.status_writes();
        assert_eq!(status.enable(), VirtualSurfaceStatus::Enabled);
        assert_eq!(status.current_status(), first);
        assert_eq!(status.prior(), Some(VirtualSurfaceStatus::Disabled));
        assert_eq!(platform.status_writes(), writes);
    }

    #[test]
    fn test_already_enabled_has_no_side_effects() {
        let platform = MockPlatform::new();
        platform.set_raw_status(1);
        let mut status = StatusController::new(platform.clone());
        assert_eq!(status.enable(), VirtualSurfaceStatus::EnabledAutomatically);
        assert_eq!(platform.status_writes(), 0);
    }

    #[test]
    fn test_disable_restores_exact_raw_value() {
        let platform = MockPlatform::new();
        platform.set_raw_status(3);
        let mut status = StatusController::new(platform.clone());
        let prior = status.enable();
        assert_eq!(prior, VirtualSurfaceStatus::EnabledAutomatically);
        // Someone else switched it off meanwhile.
        platform.set_raw_status(0);
        status.disable(prior);
        assert_eq!(platform.status(), 3);
        assert_eq!(platform.status_writes(), 1);
    }

    #[test]
    fn test_disable_restores_prior() {
        for raw in [0, 1, 2].iter() {
            let platform = MockPlatform::new();
            platform.set_raw_status(*raw);
            let mut status = StatusController::new(platform.clone());
            let before = status.current_status();
            let prior = status.enable();
            assert_eq!(prior, before);
            status.disable(prior);
            assert_eq!(status.current_status(), before);
            assert_eq!(status.prior(), None);
        }
    }
}
