//! # Simbar
//!
//! Simbar mirrors the Mac Touch Bar onto an ordinary display.  It turns on
//! the system's hidden virtual Touch Bar surface, streams its pixels into a
//! small floating window, and turns clicks and drags in that window back into
//! touches on the bar.  Apps that draw Touch Bar UI can then be used and
//! tested on Macs with no Touch Bar hardware.
//!
//! # Pipeline
//!
//! ```text
//!  StatusController ── enables ──> virtual surface
//!                                      │ frames (background thread)
//!  FrameSourceAdapter ── submit ──> FrameRelay ── latest ──> PresentationSurface
//!                                                                 │ pointer
//!                                   virtual surface <── post ── InputForwarder
//! ```
//!
//! `LifecycleCoordinator` owns all of it and drives startup, display
//! reconfiguration, sleep/wake and teardown.  The previous status of the
//! virtual surface is restored when the simulator stops, including when it
//! is dropped.
//!
//! # Private APIs
//!
//! The virtual surface is only reachable through **private** Apple
//! frameworks (DFRFoundation and SkyLight).  With the default `private_api`
//! feature on macOS those are linked directly; everywhere else a dummy
//! platform is used that reports `Error::CaptureUnavailable` on start.
//!
//! Capturing the surface needs the Screen Recording permission, and posting
//! input needs Accessibility access.  Without the latter the mirror still
//! draws, and `LifecycleCoordinator::tick` reports `Error::InjectionDenied`
//! once.
//!
//! # Execution Environment
//!
//! Like any AppKit window, the simulator must be created and driven from the
//! main thread of a process with an `NSApplication`.  The included demo uses
//! [fruitbasket](https://github.com/mrmekon/fruitbasket) to bundle itself
//! into an app at runtime:
//!
//! `$ cargo run --example simulator`
//!
#![deny(missing_docs)]

#[allow(unused_imports)]
#[macro_use]
extern crate log;

mod types;
pub use types::*;

mod error;
pub use error::{Error, Result};

#[allow(unused_variables)]
mod interface;
pub use interface::*;

mod config;
pub use config::{Docking, SimulatorConfig};

/// Console and file logging.
pub mod logging;

mod status;
pub use status::StatusController;

mod capture;
pub use capture::{FrameSink, FrameSourceAdapter, StreamHandle};

mod relay;
pub use relay::FrameRelay;

mod forward;
pub use forward::InputForwarder;

mod presentation;
pub use presentation::{PresentationGeometry, PresentationSurface};

mod lifecycle;
pub use lifecycle::{LifecycleCoordinator, LifecycleState};

#[cfg(test)]
mod mock;

//
// Mac+TouchBar imports
//
#[cfg(target_os = "macos")]
#[cfg(feature = "private_api")]
#[macro_use]
extern crate objc;

#[cfg(target_os = "macos")]
#[cfg(feature = "private_api")]
mod wrapper;

#[cfg(target_os = "macos")]
#[cfg(feature = "private_api")]
mod touchbar;

#[cfg(target_os = "macos")]
#[cfg(feature = "private_api")]
pub use touchbar::{DfrPlatform as Platform, SimulatorPanel as Panel, SystemSignals};

//
// Non-Mac/Dummy imports
//
#[cfg(not(all(target_os = "macos", feature = "private_api")))]
mod dummy;

#[cfg(not(all(target_os = "macos", feature = "private_api")))]
pub use dummy::{DummyPlatform as Platform, DummyPanel as Panel, SystemSignals};

/// Builds a simulator on this target's platform, with a window titled
/// `title`.  Nothing happens until `start`.
pub fn simulator(title: &str, config: SimulatorConfig) -> LifecycleCoordinator {
    let platform = Platform::new();
    LifecycleCoordinator::new(platform.clone(), platform.clone(), platform,
                              Box::new(Panel::new(title)), config)
}
