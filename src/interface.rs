use crate::error::Result;
use crate::types::{CapturedFrame, Point, PointerKind, Rect, Size, SurfaceId};

/// Opaque id of a platform capture stream.
pub type StreamId = u64;
/// Called on a background thread for every completed frame.  The sequence
/// number of the frame is filled in by the caller of `create_stream`.
pub type FrameCb = Box<dyn Fn(CapturedFrame) + Send + Sync>;
/// Called on the UI thread for pointer activity inside the panel.  The point
/// is in panel content coordinates.
pub type PointerCb = Box<dyn Fn(PointerKind, Point)>;

/// Virtual Touch Bar display: size and on/off status.
pub trait TVirtualDisplay: Send + Sync {
    /// Native pixel size of the hidden surface.
    fn screen_size(&self) -> Size;
    /// Raw status as reported by the system.
    fn status(&self) -> i32;
    ///
    fn set_status(&self, status: i32);
}

/// Push-based capture of a display surface.
pub trait TFrameSource: Send + Sync {
    /// Starts streaming `surface`.  Must fail with `CaptureUnavailable` if the
    /// surface is missing or capture is not permitted.
    fn create_stream(&self, surface: SurfaceId, on_frame: FrameCb) -> Result<StreamId>;
    /// Stops a stream.  Frames may still be in flight when this returns.
    fn stop_stream(&self, stream: StreamId);
}

/// Synthetic input posting.
pub trait TInputInjector: Send + Sync {
    /// Whether the process may post events right now.
    fn is_permitted(&self) -> bool { true }
    /// Posts mouse activity at `point`, in hidden-surface pixels.
    fn post_mouse(&self, kind: PointerKind, point: Point) -> Result<()>;
    /// Posts a key down/up pair with modifier `flags` held.
    fn press_key(&self, _keycode: u16, _flags: u64) -> Result<()> { Ok(()) }
}

/// Host window that shows the mirrored bar.  Lives on the UI thread.
pub trait TPanel {
    /// Resizes the window so its content area is `size`.
    fn set_content_size(&mut self, size: Size) {}
    /// Current content size.
    fn content_size(&self) -> Size;
    /// Moves the window's bottom-left corner to `origin`, in screen points.
    fn set_origin(&mut self, origin: Point) {}
    /// Visible frame of the screen the panel is on.
    fn screen_frame(&self) -> Rect { Rect::default() }
    ///
    fn show(&mut self) {}
    ///
    fn hide(&mut self) {}
    ///
    fn is_visible(&self) -> bool { false }
    /// Re-applies the non-activating window properties.
    fn prevent_activation(&mut self) {}
    ///
    fn set_alpha(&mut self, alpha: f64) {}
    ///
    fn set_on_all_desktops(&mut self, all: bool) {}
    /// Displays `frame` inside `dest`, in content coordinates.
    fn draw(&mut self, frame: &CapturedFrame, dest: Rect) {}
    /// Installs the pointer handler.
    fn set_pointer_handler(&mut self, cb: PointerCb) {}
}
