//! Recording stand-ins for the platform, used by the unit tests.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::interface::*;
use crate::types::*;

#[derive(Default)]
struct PlatformState {
    raw_status: i32,
    status_writes: usize,
    screen_size: Size,
    next_stream: StreamId,
    streams: BTreeMap<StreamId, Arc<FrameCb>>,
    stopped: Vec<Arc<FrameCb>>,
    stopped_on: Vec<(StreamId, ThreadId)>,
    keep_after_stop: bool,
    streams_created: usize,
    failing_opens: usize,
    open_delay: Duration,
    permitted: bool,
    post_delay: Duration,
    posted: Vec<(PointerKind, Point)>,
    keys: Vec<(u16, u64)>,
}

/// Virtual display, frame source and input injector in one.
pub struct MockPlatform {
    state: Mutex<PlatformState>,
}

impl MockPlatform {
    pub fn new() -> Arc<MockPlatform> {
        Arc::new(MockPlatform {
            state: Mutex::new(PlatformState {
                screen_size: Size::new(2170., 60.),
                next_stream: 1,
                permitted: true,
                ..Default::default()
            }),
        })
    }
    pub fn set_raw_status(&self, raw: i32) { self.state.lock().raw_status = raw; }
    pub fn status_writes(&self) -> usize { self.state.lock().status_writes }
    pub fn set_screen_size(&self, size: Size) { self.state.lock().screen_size = size; }
    pub fn open_streams(&self) -> usize { self.state.lock().streams.len() }
    pub fn streams_created(&self) -> usize { self.state.lock().streams_created }
    pub fn keep_callbacks_after_stop(&self, keep: bool) { self.state.lock().keep_after_stop = keep; }
    /// The next `count` opens fail as if the surface were missing.
    pub fn fail_opens(&self, count: usize) { self.state.lock().failing_opens = count; }
    pub fn set_open_delay(&self, delay: Duration) { self.state.lock().open_delay = delay; }
    pub fn set_permitted(&self, permitted: bool) { self.state.lock().permitted = permitted; }
    pub fn set_post_delay(&self, delay: Duration) { self.state.lock().post_delay = delay; }
    pub fn posted(&self) -> Vec<(PointerKind, Point)> { self.state.lock().posted.clone() }
    pub fn keys(&self) -> Vec<(u16, u64)> { self.state.lock().keys.clone() }
    /// Each stopped stream with the thread that stopped it.
    pub fn stopped_on(&self) -> Vec<(StreamId, ThreadId)> { self.state.lock().stopped_on.clone() }

    /// Pushes one frame through every open stream, and through stopped
    /// streams too when told to keep their callbacks.
    pub fn emit_frame(&self) {
        let (size, callbacks) = {
            let state = self.state.lock();
            let mut callbacks: Vec<Arc<FrameCb>> = state.streams.values().cloned().collect();
            if state.keep_after_stop {
                callbacks.extend(state.stopped.iter().cloned());
            }
            (state.screen_size, callbacks)
        };
        for cb in callbacks {
            let image = Arc::new(PixelBuffer(vec![0; 4]));
            cb(CapturedFrame::new(image, size, 0));
        }
    }
}

impl TVirtualDisplay for MockPlatform {
    fn screen_size(&self) -> Size { self.state.lock().screen_size }
    fn status(&self) -> i32 { self.state.lock().raw_status }
    fn set_status(&self, status: i32) {
        let mut state = self.state.lock();
        state.raw_status = status;
        state.status_writes += 1;
    }
}

impl TFrameSource for MockPlatform {
    fn create_stream(&self, _surface: SurfaceId, on_frame: FrameCb) -> Result<StreamId> {
        let delay = self.state.lock().open_delay;
        if delay > Duration::from_millis(0) {
            thread::sleep(delay);
        }
        let mut state = self.state.lock();
        if state.failing_opens > 0 {
            state.failing_opens -= 1;
            return Err(Error::CaptureUnavailable("no such surface".into()));
        }
        let id = state.next_stream;
        state.next_stream += 1;
        state.streams_created += 1;
        state.streams.insert(id, Arc::new(on_frame));
        Ok(id)
    }
    fn stop_stream(&self, stream: StreamId) {
        let mut state = self.state.lock();
        if let Some(cb) = state.streams.remove(&stream) {
            state.stopped.push(cb);
            state.stopped_on.push((stream, thread::current().id()));
        }
    }
}

impl TInputInjector for MockPlatform {
    fn is_permitted(&self) -> bool { self.state.lock().permitted }
    fn post_mouse(&self, kind: PointerKind, point: Point) -> Result<()> {
        let delay = {
            let state = self.state.lock();
            if !state.permitted {
                return Err(Error::InjectionDenied);
            }
            state.post_delay
        };
        if delay > Duration::from_millis(0) {
            thread::sleep(delay);
        }
        self.state.lock().posted.push((kind, point));
        Ok(())
    }
    fn press_key(&self, keycode: u16, flags: u64) -> Result<()> {
        let mut state = self.state.lock();
        if !state.permitted {
            return Err(Error::InjectionDenied);
        }
        state.keys.push((keycode, flags));
        Ok(())
    }
}

/// Observable panel state.
#[derive(Default)]
pub struct PanelState {
    pub content_size: Size,
    pub origin: Point,
    pub screen: Rect,
    pub visible: bool,
    pub ever_shown: bool,
    pub activation_guards: usize,
    pub alpha: f64,
    pub all_desktops: bool,
    pub drawn: Vec<(u64, Rect)>,
    pub pointer: Option<PointerCb>,
}

/// A `TPanel` whose state the test keeps a handle to.
pub struct MockPanel {
    pub state: Rc<RefCell<PanelState>>,
}

impl MockPanel {
    pub fn new() -> (MockPanel, Rc<RefCell<PanelState>>) {
        let state = Rc::new(RefCell::new(PanelState {
            screen: Rect::new(Point::new(0., 0.), Size::new(1440., 900.)),
            alpha: 1.0,
            ..Default::default()
        }));
        (MockPanel { state: state.clone() }, state)
    }
}

/// Feeds a pointer event through the handler the panel was given.
pub fn click(state: &Rc<RefCell<PanelState>>, kind: PointerKind, point: Point) {
    let cb = state.borrow_mut().pointer.take();
    if let Some(cb) = cb {
        cb(kind, point);
        state.borrow_mut().pointer = Some(cb);
    }
}

impl TPanel for MockPanel {
    fn set_content_size(&mut self, size: Size) { self.state.borrow_mut().content_size = size; }
    fn content_size(&self) -> Size { self.state.borrow().content_size }
    fn set_origin(&mut self, origin: Point) { self.state.borrow_mut().origin = origin; }
    fn screen_frame(&self) -> Rect { self.state.borrow().screen }
    fn show(&mut self) {
        let mut state = self.state.borrow_mut();
        state.visible = true;
        state.ever_shown = true;
    }
    fn hide(&mut self) { self.state.borrow_mut().visible = false; }
    fn is_visible(&self) -> bool { self.state.borrow().visible }
    fn prevent_activation(&mut self) { self.state.borrow_mut().activation_guards += 1; }
    fn set_alpha(&mut self, alpha: f64) { self.state.borrow_mut().alpha = alpha; }
    fn set_on_all_desktops(&mut self, all: bool) { self.state.borrow_mut().all_desktops = all; }
    fn draw(&mut self, frame: &CapturedFrame, dest: Rect) {
        self.state.borrow_mut().drawn.push((frame.sequence, dest));
    }
    fn set_pointer_handler(&mut self, cb: PointerCb) { self.state.borrow_mut().pointer = Some(cb); }
}
