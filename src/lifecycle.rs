//! Startup, steady state and teardown of the simulator.
//!
//! ```text
//! Idle -> Starting -> Running -> Stopping -> Idle
//!             \______________________/
//!               startup failure
//! ```

use std::fmt;
use std::sync::Arc;

use crate::capture::{FrameSink, FrameSourceAdapter, StreamHandle};
use crate::config::SimulatorConfig;
use crate::error::{Error, Result};
use crate::forward::InputForwarder;
use crate::interface::{TFrameSource, TInputInjector, TPanel, TVirtualDisplay};
use crate::presentation::PresentationSurface;
use crate::relay::FrameRelay;
use crate::status::StatusController;
use crate::types::{CapturedFrame, Point, PointerKind, SystemSignal, VirtualSurfaceStatus};

/// Attempts at re-opening the stream before giving up.
const RECOVERY_ATTEMPTS: usize = 2;

///
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleState {
    ///
    Idle,
    ///
    Starting,
    ///
    Running,
    ///
    Stopping,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Owns every piece of the pipeline and drives it through its states.
///
/// All methods are meant to be called from the UI thread.
pub struct LifecycleCoordinator {
    config: SimulatorConfig,
    display: Arc<dyn TVirtualDisplay>,
    status: StatusController,
    capture: FrameSourceAdapter,
    relay: Arc<FrameRelay>,
    forwarder: Arc<InputForwarder>,
    surface: PresentationSurface,
    state: LifecycleState,
    stream: Option<StreamHandle>,
    prior: Option<VirtualSurfaceStatus>,
    asleep: bool,
    reconfigure_pending: bool,
    last_error: Option<Error>,
}

impl LifecycleCoordinator {
    /// Wires the pipeline together.  Nothing touches the system until
    /// `start`.
    pub fn new(display: Arc<dyn TVirtualDisplay>,
               source: Arc<dyn TFrameSource>,
               injector: Arc<dyn TInputInjector>,
               panel: Box<dyn TPanel>,
               config: SimulatorConfig) -> LifecycleCoordinator {
        let relay = Arc::new(FrameRelay::new());
        let forwarder = Arc::new(InputForwarder::new(injector));
        let surface = PresentationSurface::new(panel, relay.clone(), forwarder.clone(), &config);
        LifecycleCoordinator {
            status: StatusController::new(display.clone()),
            capture: FrameSourceAdapter::new(source, config.capture_open_timeout),
            display: display,
            relay: relay,
            forwarder: forwarder,
            surface: surface,
            config: config,
            state: LifecycleState::Idle,
            stream: None,
            prior: None,
            asleep: false,
            reconfigure_pending: false,
            last_error: None,
        }
    }

    ///
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// The error that last ended or failed a run.
    pub fn last_error(&self) -> Option<&Error> {
        self.last_error.as_ref()
    }

    ///
    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    ///
    pub fn surface(&self) -> &PresentationSurface {
        &self.surface
    }

    ///
    pub fn surface_mut(&mut self) -> &mut PresentationSurface {
        &mut self.surface
    }

    ///
    pub fn relay(&self) -> &Arc<FrameRelay> {
        &self.relay
    }

    ///
    pub fn forwarder(&self) -> &Arc<InputForwarder> {
        &self.forwarder
    }

    /// Status of the virtual display as the system reports it now.
    pub fn current_status(&self) -> VirtualSurfaceStatus {
        self.status.current_status()
    }

    fn transition(&mut self, next: LifecycleState) {
        debug!("lifecycle {} -> {}", self.state, next);
        self.state = next;
    }

    /// Enables the virtual display, opens the capture stream and shows the
    /// window.  On failure everything done so far is undone, the window is
    /// never shown, and the error is returned.  Nothing is retried.
    pub fn start(&mut self) -> Result<()> {
        if self.state != LifecycleState::Idle {
            debug!("start ignored while {}", self.state);
            return Ok(());
        }
        self.transition(LifecycleState::Starting);
        self.last_error = None;
        self.prior = Some(self.status.enable());

        if let Err(e) = self.establish() {
            error!("startup failed: {}", e);
            self.last_error = Some(e.clone());
            self.teardown();
            return Err(e);
        }

        self.surface.show();
        self.transition(LifecycleState::Running);
        info!("Touch Bar simulator running");
        Ok(())
    }

    /// Opens a stream against the current native size.
    fn establish(&mut self) -> Result<()> {
        let native = self.display.screen_size();
        if native.is_empty() {
            return Err(Error::CaptureUnavailable(format!("surface reports size {}", native)));
        }
        let relay = self.relay.clone();
        // Frames still in flight when this stream is closed miss the epoch.
        let epoch = relay.epoch();
        let sink: FrameSink = Arc::new(move |frame: CapturedFrame| relay.submit_in(epoch, frame));
        let handle = self.capture.open(self.config.surface, sink)?;
        self.stream = Some(handle);
        self.surface.set_native_size(native);
        Ok(())
    }

    fn close_stream(&mut self) {
        if let Some(handle) = self.stream.take() {
            self.capture.close(handle);
        }
        self.relay.clear();
    }

    /// Stopping: every step runs regardless of how the others went.
    fn teardown(&mut self) {
        self.transition(LifecycleState::Stopping);
        self.close_stream();
        match self.prior.take() {
            Some(prior) => self.status.disable(prior),
            None => debug!("no prior status to restore"),
        }
        self.surface.hide();
        self.asleep = false;
        self.reconfigure_pending = false;
        self.transition(LifecycleState::Idle);
    }

    /// Tears everything down and restores the virtual display.
    pub fn stop(&mut self) {
        if self.state == LifecycleState::Idle {
            return;
        }
        info!("stopping Touch Bar simulator");
        self.teardown();
    }

    /// Reacts to a system event while running.  The window stays up while
    /// the stream is being replaced.
    ///
    /// If the stream can't be re-established after two attempts the run is
    /// torn down and `CaptureUnavailable` returned.
    pub fn handle_signal(&mut self, signal: SystemSignal) -> Result<()> {
        if self.state != LifecycleState::Running {
            debug!("{:?} ignored while {}", signal, self.state);
            return Ok(());
        }
        if self.asleep {
            match signal {
                SystemSignal::DidWake => {}
                _ => {
                    // Nothing to capture until wake, which re-queries anyway.
                    debug!("{:?} while asleep, deferred to wake", signal);
                    self.reconfigure_pending |= signal == SystemSignal::DisplayReconfigured;
                    return Ok(());
                }
            }
        }
        let interruption = Error::StreamInterrupted(format!("{:?}", signal));
        info!("{}", interruption);
        self.close_stream();
        if signal == SystemSignal::WillSleep {
            self.asleep = true;
            return Ok(());
        }
        if self.asleep && self.reconfigure_pending {
            info!("applying display reconfiguration deferred during sleep");
        }
        self.asleep = false;
        self.reconfigure_pending = false;

        let mut failure = interruption;
        for attempt in 1..RECOVERY_ATTEMPTS + 1 {
            match self.establish() {
                Ok(()) => {
                    info!("capture stream re-established after {:?}", signal);
                    return Ok(());
                }
                Err(e) => {
                    warn!("recovery attempt {} failed: {}", attempt, e);
                    failure = e;
                }
            }
        }

        let err = match failure {
            Error::CaptureUnavailable(_) => failure,
            other => Error::CaptureUnavailable(other.to_string()),
        };
        error!("giving up on capture: {}", err);
        self.last_error = Some(err.clone());
        self.teardown();
        Err(err)
    }

    /// True between `WillSleep` and the following wake.
    pub fn is_asleep(&self) -> bool {
        self.asleep
    }

    /// One pass of the UI loop: draws the newest frame and returns an
    /// injection denial if one is pending, once.
    pub fn tick(&mut self) -> Option<Error> {
        if self.state != LifecycleState::Running {
            return None;
        }
        self.surface.redraw();
        let denial = self.forwarder.take_denial();
        if let Some(ref e) = denial {
            error!("{}: Touch Bar input disabled until permission is granted", e);
        }
        denial
    }

    /// Pointer activity in the window, in content coordinates.
    pub fn pointer(&mut self, kind: PointerKind, point: Point) -> Result<bool> {
        if self.state != LifecycleState::Running {
            return Ok(false);
        }
        self.surface.pointer(kind, point)
    }

    /// Asks again for input permission; see `InputForwarder`.
    pub fn recheck_permission(&self) -> bool {
        self.forwarder.recheck_permission()
    }

    /// Posts the Touch Bar screenshot shortcut.
    pub fn capture_screenshot(&self) -> Result<()> {
        self.forwarder.capture_screenshot()
    }
}

impl Drop for LifecycleCoordinator {
    fn drop(&mut self) {
        self.stop();
    }
}
