use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// Identifier of a capturable display surface.  The Touch Bar surface is
/// display `0`.
pub type SurfaceId = i32;

/// Width and height, in points or pixels depending on context.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Size {
    ///
    pub width: f64,
    ///
    pub height: f64,
}

impl Size {
    ///
    pub fn new(width: f64, height: f64) -> Size {
        Size { width: width, height: height }
    }
    /// True if either dimension is zero, negative or NaN.
    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }
    /// Grows the size by `padding` on every side.
    pub fn padded(&self, padding: f64) -> Size {
        Size::new(self.width + padding * 2.0, self.height + padding * 2.0)
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A location in some 2D coordinate space.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Point {
    ///
    pub x: f64,
    ///
    pub y: f64,
}

impl Point {
    ///
    pub fn new(x: f64, y: f64) -> Point {
        Point { x: x, y: y }
    }
}

/// Axis-aligned rectangle.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Rect {
    ///
    pub origin: Point,
    ///
    pub size: Size,
}

impl Rect {
    ///
    pub fn new(origin: Point, size: Size) -> Rect {
        Rect { origin: origin, size: size }
    }
    /// Half-open containment: the far edges are outside.
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.origin.x && point.x < self.origin.x + self.size.width &&
            point.y >= self.origin.y && point.y < self.origin.y + self.size.height
    }
    /// Returns a rect of `size` centered inside `self`.
    pub fn centered(&self, size: Size) -> Rect {
        Rect::new(Point::new(self.origin.x + (self.size.width - size.width) / 2.0,
                             self.origin.y + (self.size.height - size.height) / 2.0),
                  size)
    }
    ///
    pub fn max_x(&self) -> f64 { self.origin.x + self.size.width }
    ///
    pub fn max_y(&self) -> f64 { self.origin.y + self.size.height }
    ///
    pub fn mid_x(&self) -> f64 { self.origin.x + self.size.width / 2.0 }
}

/// Mode of the system's virtual Touch Bar display.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VirtualSurfaceStatus {
    /// No virtual surface; nothing renders into it.
    Disabled,
    /// Enabled at our (or some other app's) explicit request.
    Enabled,
    /// Enabled by the system on its own, e.g. on hardware with a real bar.
    EnabledAutomatically,
}

impl VirtualSurfaceStatus {
    /// Decodes the raw value reported by the platform.  Bit 0 marks the
    /// system-managed mode; any other non-zero value is an explicit enable.
    pub fn from_raw(raw: i32) -> VirtualSurfaceStatus {
        match raw {
            0 => VirtualSurfaceStatus::Disabled,
            r if r & 0x01 != 0 => VirtualSurfaceStatus::EnabledAutomatically,
            _ => VirtualSurfaceStatus::Enabled,
        }
    }
    ///
    pub fn to_raw(&self) -> i32 {
        match *self {
            VirtualSurfaceStatus::Disabled => 0,
            VirtualSurfaceStatus::EnabledAutomatically => 1,
            VirtualSurfaceStatus::Enabled => 2,
        }
    }
    ///
    pub fn is_enabled(&self) -> bool {
        *self != VirtualSurfaceStatus::Disabled
    }
}

/// Platform image backing a frame.
///
/// On macOS this is a retained `IOSurfaceRef`, exposed as a raw handle in the
/// same way the rest of the crate passes Objective-C objects around.
pub trait TFrameImage: Send + Sync + fmt::Debug {
    /// Raw platform handle, or 0 if the image is CPU-side only.
    fn native_handle(&self) -> u64 { 0 }
    /// CPU-side pixels, if the image has them.
    fn bytes(&self) -> Option<&[u8]> { None }
}

/// Plain RGBA pixels.  Used by the dummy platform and in tests.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer(pub Vec<u8>);

impl TFrameImage for PixelBuffer {
    fn bytes(&self) -> Option<&[u8]> { Some(&self.0) }
}

/// One captured image of the hidden surface.
///
/// Cloning is cheap: the image is shared.
#[derive(Clone, Debug)]
pub struct CapturedFrame {
    ///
    pub image: Arc<dyn TFrameImage>,
    /// Pixel dimensions of `image`.
    pub size: Size,
    /// Strictly increasing across the life of a `FrameSourceAdapter`.
    pub sequence: u64,
}

impl CapturedFrame {
    ///
    pub fn new(image: Arc<dyn TFrameImage>, size: Size, sequence: u64) -> CapturedFrame {
        CapturedFrame { image: image, size: size, sequence: sequence }
    }
}

/// Kind of pointer activity, local or synthetic.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerKind {
    ///
    Press,
    ///
    Drag,
    ///
    Release,
}

/// An input event to post into the hidden surface.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SyntheticInputEvent {
    ///
    pub kind: PointerKind,
    /// In hidden-surface pixels.
    pub point: Point,
    /// When the local interaction happened.
    pub timestamp: Instant,
}

/// External signals the lifecycle reacts to while running.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SystemSignal {
    /// Screen parameters changed: displays added, removed or resized.
    DisplayReconfigured,
    /// The machine is about to sleep.
    WillSleep,
    /// The machine woke up.
    DidWake,
}
