//! The real thing: DFRFoundation and SkyLight for the virtual bar, AppKit and
//! Core Animation for the mirror window.

extern crate objc;
extern crate objc_foundation;
extern crate objc_id;
extern crate cocoa;
extern crate block;
extern crate core_graphics;
extern crate libc;

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use objc::runtime::{Class, Object, BOOL, YES, NO};
use self::objc_foundation::INSObject;
use self::objc_id::{Id, Shared};
use self::cocoa::base::{id, nil};
use self::cocoa::foundation::{NSString, NSRect, NSPoint, NSSize};
use self::block::{Block, ConcreteBlock};
use self::core_graphics::geometry::{CGPoint, CGSize};
use self::core_graphics::event::{CGEvent, CGEventFlags, CGEventTapLocation};
use self::core_graphics::event_source::{CGEventSource, CGEventSourceStateID};
use self::libc::c_void;

use super::error::{Error, Result};
use super::interface::*;
use super::types::{CapturedFrame, Point, PointerKind, Rect, Size, SurfaceId, SystemSignal,
                   TFrameImage};
use super::wrapper::{HandlerSlot, SignalSender};
use super::wrapper::{SimbarContentView, SimbarPanel, SimbarSignalObserver};

type IOSurfaceRef = *mut c_void;
type CGDisplayStreamRef = *mut c_void;
type CGDisplayStreamUpdateRef = *const c_void;
type DispatchQueue = *mut c_void;
type FrameHandler = Block<(i32, u64, IOSurfaceRef, CGDisplayStreamUpdateRef), ()>;

// CGDisplayStreamFrameStatus
const FRAME_COMPLETE: i32 = 0;
const FRAME_STOPPED: i32 = 3;

const QOS_CLASS_USER_INTERACTIVE: isize = 0x21;

// NSEventType
const LEFT_MOUSE_DOWN: u64 = 1;
const LEFT_MOUSE_UP: u64 = 2;
const LEFT_MOUSE_DRAGGED: u64 = 6;

// NSWindowStyleMask
const TITLED: u64 = 1 << 0;
const CLOSABLE: u64 = 1 << 1;
const NONACTIVATING_PANEL: u64 = 1 << 7;
const HUD_WINDOW: u64 = 1 << 13;

const BACKING_STORE_BUFFERED: u64 = 2;
const FLOATING_WINDOW_LEVEL: i64 = 3;

// NSWindowCollectionBehavior
const CAN_JOIN_ALL_SPACES: u64 = 1 << 0;
const MOVE_TO_ACTIVE_SPACE: u64 = 1 << 1;

#[link(name = "DFRFoundation", kind = "framework")]
extern {
    fn DFRGetScreenSize() -> CGSize;
    fn DFRGetStatus() -> i32;
    fn DFRSetStatus(status: i32);
    fn DFRFoundationPostEventWithMouseActivity(event_type: u64, point: CGPoint);
}

#[link(name = "SkyLight", kind = "framework")]
extern {
    fn SLSDFRDisplayStreamCreate(display: i32, queue: DispatchQueue,
                                 handler: &FrameHandler) -> CGDisplayStreamRef;
}

#[link(name = "CoreGraphics", kind = "framework")]
extern {
    fn CGDisplayStreamStart(stream: CGDisplayStreamRef) -> i32;
    fn CGDisplayStreamStop(stream: CGDisplayStreamRef) -> i32;
}

#[link(name = "CoreFoundation", kind = "framework")]
extern {
    fn CFRetain(cf: *const c_void) -> *const c_void;
    fn CFRelease(cf: *const c_void);
}

#[link(name = "IOSurface", kind = "framework")]
extern {
    fn IOSurfaceGetWidth(surface: IOSurfaceRef) -> usize;
    fn IOSurfaceGetHeight(surface: IOSurfaceRef) -> usize;
}

#[link(name = "ApplicationServices", kind = "framework")]
extern {
    fn AXIsProcessTrusted() -> bool;
}

extern {
    fn dispatch_get_global_queue(identifier: isize, flags: usize) -> DispatchQueue;
}

fn nsstring(s: &str) -> id {
    unsafe { NSString::alloc(nil).init_str(s) }
}

/// A retained `IOSurfaceRef`.
struct SurfaceImage(u64);

impl SurfaceImage {
    unsafe fn retain(surface: IOSurfaceRef) -> SurfaceImage {
        CFRetain(surface as *const c_void);
        SurfaceImage(surface as u64)
    }
}

impl fmt::Debug for SurfaceImage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "IOSurface <{:x}>", self.0)
    }
}

impl TFrameImage for SurfaceImage {
    fn native_handle(&self) -> u64 { self.0 }
}

impl Drop for SurfaceImage {
    fn drop(&mut self) {
        unsafe { CFRelease(self.0 as *const c_void) }
    }
}

/// The system's virtual Touch Bar: status, capture and input injection.
pub struct DfrPlatform {
    next_stream: AtomicU64,
    streams: Mutex<BTreeMap<StreamId, u64>>,
}

impl DfrPlatform {
    ///
    pub fn new() -> Arc<DfrPlatform> {
        Arc::new(DfrPlatform {
            next_stream: AtomicU64::new(0),
            streams: Mutex::new(BTreeMap::new()),
        })
    }
}

impl Drop for DfrPlatform {
    fn drop(&mut self) {
        let ids: Vec<StreamId> = self.streams.lock().keys().cloned().collect();
        for id in ids {
            self.stop_stream(id);
        }
    }
}

impl TVirtualDisplay for DfrPlatform {
    fn screen_size(&self) -> Size {
        let size = unsafe { DFRGetScreenSize() };
        Size::new(size.width, size.height)
    }
    fn status(&self) -> i32 {
        unsafe { DFRGetStatus() }
    }
    fn set_status(&self, status: i32) {
        debug!("DFRSetStatus({})", status);
        unsafe { DFRSetStatus(status) }
    }
}

impl TFrameSource for DfrPlatform {
    fn create_stream(&self, surface: SurfaceId, on_frame: FrameCb) -> Result<StreamId> {
        let handler = ConcreteBlock::new(move |status: i32, _time: u64, frame: IOSurfaceRef,
                                               _update: CGDisplayStreamUpdateRef| {
            match status {
                FRAME_COMPLETE if !frame.is_null() => {
                    let (image, size) = unsafe {
                        (SurfaceImage::retain(frame),
                         Size::new(IOSurfaceGetWidth(frame) as f64,
                                   IOSurfaceGetHeight(frame) as f64))
                    };
                    on_frame(CapturedFrame::new(Arc::new(image), size, 0));
                }
                FRAME_STOPPED => debug!("display stream stopped"),
                _ => {}
            }
        });
        let handler = handler.copy();
        let stream = unsafe {
            let queue = dispatch_get_global_queue(QOS_CLASS_USER_INTERACTIVE, 0);
            SLSDFRDisplayStreamCreate(surface, queue, &*handler)
        };
        if stream.is_null() {
            return Err(Error::CaptureUnavailable(format!(
                "no display stream for surface {} (is screen recording allowed?)", surface)));
        }
        let err = unsafe { CGDisplayStreamStart(stream) };
        if err != 0 {
            unsafe { CFRelease(stream as *const c_void) };
            return Err(Error::CaptureUnavailable(
                format!("CGDisplayStreamStart failed: {}", err)));
        }
        let id = self.next_stream.fetch_add(1, Ordering::SeqCst) + 1;
        self.streams.lock().insert(id, stream as u64);
        info!("display stream {} started on surface {} <{:x}>", id, surface, stream as u64);
        Ok(id)
    }

    fn stop_stream(&self, stream: StreamId) {
        let ptr = match self.streams.lock().remove(&stream) {
            Some(ptr) => ptr as CGDisplayStreamRef,
            None => return,
        };
        unsafe {
            let err = CGDisplayStreamStop(ptr);
            if err != 0 {
                warn!("CGDisplayStreamStop({}) failed: {}", stream, err);
            }
            CFRelease(ptr as *const c_void);
        }
        info!("display stream {} stopped", stream);
    }
}

impl TInputInjector for DfrPlatform {
    fn is_permitted(&self) -> bool {
        unsafe { AXIsProcessTrusted() }
    }
    fn post_mouse(&self, kind: PointerKind, point: Point) -> Result<()> {
        if !self.is_permitted() {
            return Err(Error::InjectionDenied);
        }
        let event_type = match kind {
            PointerKind::Press => LEFT_MOUSE_DOWN,
            PointerKind::Drag => LEFT_MOUSE_DRAGGED,
            PointerKind::Release => LEFT_MOUSE_UP,
        };
        unsafe {
            DFRFoundationPostEventWithMouseActivity(event_type, CGPoint::new(point.x, point.y));
        }
        Ok(())
    }
    fn press_key(&self, keycode: u16, flags: u64) -> Result<()> {
        if !self.is_permitted() {
            return Err(Error::InjectionDenied);
        }
        let source = CGEventSource::new(CGEventSourceStateID::HIDSystemState)
            .map_err(|_| Error::InjectionDenied)?;
        for &down in [true, false].iter() {
            let event = CGEvent::new_keyboard_event(source.clone(), keycode, down)
                .map_err(|_| Error::InjectionDenied)?;
            event.set_flags(CGEventFlags::from_bits_truncate(flags));
            event.post(CGEventTapLocation::HID);
        }
        Ok(())
    }
}

/// Floating, non-activating window that shows the mirrored bar.
///
/// Must be created and used on the main thread, after `NSApplication` has
/// been initialized.
pub struct SimulatorPanel {
    panel: Id<Object, Shared>,
    view: *mut Object,
    frame_layer: *mut Object,
    handler: Box<HandlerSlot>,
}

impl SimulatorPanel {
    ///
    pub fn new(title: &str) -> SimulatorPanel {
        unsafe {
            let rect = NSRect::new(NSPoint::new(0., 0.), NSSize::new(100., 30.));
            let mask = TITLED | CLOSABLE | NONACTIVATING_PANEL | HUD_WINDOW;
            let panel: *mut Object = msg_send![SimbarPanel::class(), alloc];
            let panel: *mut Object = msg_send![panel,
                                               initWithContentRect:rect
                                               styleMask:mask
                                               backing:BACKING_STORE_BUFFERED
                                               defer:NO];
            let ns_title = nsstring(title);
            let _: () = msg_send![panel, setTitle: ns_title];
            let _: () = msg_send![ns_title, release];
            let _: () = msg_send![panel, setReleasedWhenClosed: NO];
            let _: () = msg_send![panel, setHidesOnDeactivate: NO];
            let _: () = msg_send![panel, setFloatingPanel: YES];
            let _: () = msg_send![panel, setWorksWhenModal: YES];
            let _: () = msg_send![panel, setLevel: FLOATING_WINDOW_LEVEL];

            let view: *mut Object = msg_send![SimbarContentView::class(), alloc];
            let view: *mut Object = msg_send![view, initWithFrame: rect];
            let _: () = msg_send![view, setWantsLayer: YES];
            let _: () = msg_send![panel, setContentView: view];
            let _: () = msg_send![view, release];

            let cls = Class::get("CALayer").unwrap();
            let frame_layer: *mut Object = msg_send![cls, layer];
            let _: id = msg_send![frame_layer, retain];
            let gravity = nsstring("resize");
            let _: () = msg_send![frame_layer, setContentsGravity: gravity];
            let _: () = msg_send![gravity, release];
            let layer: *mut Object = msg_send![view, layer];
            let _: () = msg_send![layer, addSublayer: frame_layer];

            let handler: Box<HandlerSlot> = Box::new(RefCell::new(None));
            (*view).set_ivar("_rust_handler", &*handler as *const HandlerSlot as u64);
            info!("created panel <{:x}>", panel as u64);
            SimulatorPanel {
                panel: Id::from_retained_ptr(panel),
                view: view,
                frame_layer: frame_layer,
                handler: handler,
            }
        }
    }
}

impl Drop for SimulatorPanel {
    fn drop(&mut self) {
        unsafe {
            (*self.view).set_ivar("_rust_handler", 0u64);
            let _: () = msg_send![self.panel, orderOut: nil];
            let _: () = msg_send![self.frame_layer, removeFromSuperlayer];
            let _: () = msg_send![self.frame_layer, release];
        }
    }
}

impl TPanel for SimulatorPanel {
    fn set_content_size(&mut self, size: Size) {
        unsafe {
            let _: () = msg_send![self.panel, setContentSize: NSSize::new(size.width, size.height)];
        }
    }
    fn content_size(&self) -> Size {
        unsafe {
            let frame: NSRect = msg_send![self.view, frame];
            Size::new(frame.size.width, frame.size.height)
        }
    }
    fn set_origin(&mut self, origin: Point) {
        unsafe {
            let _: () = msg_send![self.panel, setFrameOrigin: NSPoint::new(origin.x, origin.y)];
        }
    }
    fn screen_frame(&self) -> Rect {
        unsafe {
            let mut screen: id = msg_send![self.panel, screen];
            if screen == nil {
                screen = msg_send![Class::get("NSScreen").unwrap(), mainScreen];
            }
            if screen == nil {
                return Rect::default();
            }
            let frame: NSRect = msg_send![screen, visibleFrame];
            Rect::new(Point::new(frame.origin.x, frame.origin.y),
                      Size::new(frame.size.width, frame.size.height))
        }
    }
    fn show(&mut self) {
        unsafe { let _: () = msg_send![self.panel, orderFront: nil]; }
    }
    fn hide(&mut self) {
        unsafe { let _: () = msg_send![self.panel, orderOut: nil]; }
    }
    fn is_visible(&self) -> bool {
        unsafe {
            let visible: BOOL = msg_send![self.panel, isVisible];
            visible == YES
        }
    }
    fn prevent_activation(&mut self) {
        unsafe {
            let responds: BOOL = msg_send![self.panel,
                                           respondsToSelector: sel!(_setPreventsActivation:)];
            if responds == YES {
                let _: () = msg_send![self.panel, _setPreventsActivation: YES];
            }
            else {
                warn!("window server does not support _setPreventsActivation:");
            }
        }
    }
    fn set_alpha(&mut self, alpha: f64) {
        unsafe { let _: () = msg_send![self.panel, setAlphaValue: alpha]; }
    }
    fn set_on_all_desktops(&mut self, all: bool) {
        let behavior = if all { CAN_JOIN_ALL_SPACES } else { MOVE_TO_ACTIVE_SPACE };
        unsafe { let _: () = msg_send![self.panel, setCollectionBehavior: behavior]; }
    }
    fn draw(&mut self, frame: &CapturedFrame, dest: Rect) {
        let contents = frame.image.native_handle() as id;
        if contents == nil {
            return;
        }
        let rect = NSRect::new(NSPoint::new(dest.origin.x, dest.origin.y),
                               NSSize::new(dest.size.width, dest.size.height));
        unsafe {
            let cls = Class::get("CATransaction").unwrap();
            let _: () = msg_send![cls, begin];
            let _: () = msg_send![cls, setDisableActions: YES];
            let _: () = msg_send![self.frame_layer, setFrame: rect];
            let _: () = msg_send![self.frame_layer, setContents: contents];
            let _: () = msg_send![cls, commit];
        }
    }
    fn set_pointer_handler(&mut self, cb: PointerCb) {
        match self.handler.try_borrow_mut() {
            Ok(mut slot) => *slot = Some(cb),
            Err(_) => warn!("pointer handler replaced from inside a pointer event; ignored"),
        }
    }
}

/// Screen reconfiguration and sleep/wake notifications, queued for polling
/// from the run loop.
pub struct SystemSignals {
    observer: *mut Object,
    // Pointed to by the observer's ivar.
    _sender: Box<SignalSender>,
    rx: flume::Receiver<SystemSignal>,
}

impl SystemSignals {
    /// Registers for notifications.  Main thread only.
    pub fn new() -> SystemSignals {
        let (tx, rx) = flume::unbounded();
        let sender = Box::new(tx);
        unsafe {
            let observer: *mut Object = msg_send![SimbarSignalObserver::class(), new];
            (*observer).set_ivar("_rust_sender", &*sender as *const SignalSender as u64);

            let center: id = msg_send![Class::get("NSNotificationCenter").unwrap(), defaultCenter];
            let name = nsstring("NSApplicationDidChangeScreenParametersNotification");
            let _: () = msg_send![center, addObserver:observer
                                  selector:sel!(screenParametersChanged:)
                                  name:name
                                  object:nil];
            let _: () = msg_send![name, release];

            let workspace: id = msg_send![Class::get("NSWorkspace").unwrap(), sharedWorkspace];
            let center: id = msg_send![workspace, notificationCenter];
            let name = nsstring("NSWorkspaceWillSleepNotification");
            let _: () = msg_send![center, addObserver:observer
                                  selector:sel!(willSleep:)
                                  name:name
                                  object:nil];
            let _: () = msg_send![name, release];
            let name = nsstring("NSWorkspaceDidWakeNotification");
            let _: () = msg_send![center, addObserver:observer
                                  selector:sel!(didWake:)
                                  name:name
                                  object:nil];
            let _: () = msg_send![name, release];

            SystemSignals {
                observer: observer,
                _sender: sender,
                rx: rx,
            }
        }
    }

    /// Next pending signal, without blocking.
    pub fn try_recv(&self) -> Option<SystemSignal> {
        self.rx.try_recv().ok()
    }
}

impl Drop for SystemSignals {
    fn drop(&mut self) {
        unsafe {
            let center: id = msg_send![Class::get("NSNotificationCenter").unwrap(), defaultCenter];
            let _: () = msg_send![center, removeObserver: self.observer];
            let workspace: id = msg_send![Class::get("NSWorkspace").unwrap(), sharedWorkspace];
            let center: id = msg_send![workspace, notificationCenter];
            let _: () = msg_send![center, removeObserver: self.observer];
            (*self.observer).set_ivar("_rust_sender", 0u64);
            let _: () = msg_send![self.observer, release];
        }
    }
}
