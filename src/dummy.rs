use std::sync::Arc;

use crate::error::{Error, Result};
use crate::interface::*;
use crate::types::{PointerKind, Point, Size, SurfaceId, SystemSignal};

/// Platform without a Touch Bar server.  Capture is never available.
pub struct DummyPlatform {}

impl DummyPlatform {
    ///
    pub fn new() -> Arc<DummyPlatform> {
        Arc::new(DummyPlatform {})
    }
}

impl TVirtualDisplay for DummyPlatform {
    fn screen_size(&self) -> Size { Size::default() }
    fn status(&self) -> i32 { 0 }
    fn set_status(&self, _status: i32) {}
}

impl TFrameSource for DummyPlatform {
    fn create_stream(&self, surface: SurfaceId, _on_frame: FrameCb) -> Result<StreamId> {
        Err(Error::CaptureUnavailable(
            format!("surface {}: no Touch Bar server on this platform", surface)))
    }
    fn stop_stream(&self, _stream: StreamId) {}
}

impl TInputInjector for DummyPlatform {
    fn is_permitted(&self) -> bool { false }
    fn post_mouse(&self, _kind: PointerKind, _point: Point) -> Result<()> {
        Err(Error::InjectionDenied)
    }
}

/// Window that is never shown.
pub struct DummyPanel {
    content_size: Size,
}

impl DummyPanel {
    ///
    pub fn new(_title: &str) -> DummyPanel {
        DummyPanel { content_size: Size::default() }
    }
}

impl TPanel for DummyPanel {
    fn set_content_size(&mut self, size: Size) { self.content_size = size; }
    fn content_size(&self) -> Size { self.content_size }
}

/// No notifications to observe here.
pub struct SystemSignals {}

impl SystemSignals {
    ///
    pub fn new() -> SystemSignals {
        SystemSignals {}
    }
    ///
    pub fn try_recv(&self) -> Option<SystemSignal> {
        None
    }
}
