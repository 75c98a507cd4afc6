extern crate objc;
extern crate objc_foundation;
extern crate cocoa;

use std::cell::RefCell;
use std::sync::Once;

use objc::Message;
use objc::declare::ClassDecl;
use objc::runtime::{Class, Object, Sel, BOOL, YES, NO};
use self::objc_foundation::INSObject;
use self::cocoa::base::{id, nil};
use self::cocoa::foundation::NSPoint;

use super::interface::PointerCb;
use super::types::{Point, PointerKind, SystemSignal};

/// What a `SimbarContentView`'s `_rust_handler` ivar points at.
pub type HandlerSlot = RefCell<Option<PointerCb>>;
/// What a `SimbarSignalObserver`'s `_rust_sender` ivar points at.
pub type SignalSender = flume::Sender<SystemSignal>;

macro_rules! subclass {
    ( $newclass:ident, $superclass:ident, $unique_newclass:ident,
      |$decl:ident| $body:block ) => {
        pub enum $newclass {}
        unsafe impl Message for $newclass { }
        static $unique_newclass: Once = Once::new();
        impl $newclass {
            fn str_name(this: &Object) -> String {
                let ptr = this as *const Object;
                format!("{}({:x})", stringify!($newclass), ptr as u64)
            }
        }
        impl INSObject for $newclass {
            fn class() -> &'static Class {
                $unique_newclass.call_once(|| {
                    let superclass = Class::get(stringify!($superclass)).unwrap();
                    let mut $decl = ClassDecl::new(stringify!($newclass), superclass).unwrap();
                    extern fn objc_dealloc(this: &mut Object, _cmd: Sel) {
                        unsafe {
                            info!("{} dealloc", $newclass::str_name(this));
                            let superclass = Class::get(stringify!($superclass)).unwrap();
                            let _: () = msg_send![super(this, superclass), dealloc];
                        }
                    }
                    unsafe {
                        let f: extern fn(&mut Object, Sel) = objc_dealloc;
                        $decl.add_method(sel!(dealloc), f);
                    }
                    $body
                    $decl.register();
                });
                Class::get(stringify!($newclass)).unwrap()
            }
        }
    };
}

// Panel that never takes key or main status, so clicking the mirror leaves
// focus with whatever app the user is driving.
subclass!(SimbarPanel, NSPanel, SIMBAR_PANEL_CLASS, |decl| {
    extern fn objc_can_become(_this: &Object, _cmd: Sel) -> BOOL { NO }
    unsafe {
        let f: extern fn(&Object, Sel) -> BOOL = objc_can_become;
        decl.add_method(sel!(canBecomeKeyWindow), f);
        let f: extern fn(&Object, Sel) -> BOOL = objc_can_become;
        decl.add_method(sel!(canBecomeMainWindow), f);
    }
});

// Content view.  Mouse activity is handed to the closure behind
// `_rust_handler`, in view coordinates (origin bottom-left).
subclass!(SimbarContentView, NSView, SIMBAR_VIEW_CLASS, |decl| {
    decl.add_ivar::<u64>("_rust_handler");

    fn dispatch(this: &Object, event: id, kind: PointerKind) {
        unsafe {
            let ptr: u64 = *this.get_ivar("_rust_handler");
            if ptr == 0 {
                return;
            }
            let loc: NSPoint = msg_send![event, locationInWindow];
            let local: NSPoint = msg_send![this, convertPoint:loc fromView:nil];
            let slot = &*(ptr as *const HandlerSlot);
            // A handler that re-enters the run loop can get here again.
            if let Ok(handler) = slot.try_borrow() {
                if let Some(ref cb) = *handler {
                    cb(kind, Point::new(local.x, local.y));
                }
            }
        }
    }
    extern fn objc_accepts_first_mouse(_this: &Object, _cmd: Sel, _event: id) -> BOOL { YES }
    extern fn objc_mouse_down(this: &Object, _cmd: Sel, event: id) {
        dispatch(this, event, PointerKind::Press);
    }
    extern fn objc_mouse_dragged(this: &Object, _cmd: Sel, event: id) {
        dispatch(this, event, PointerKind::Drag);
    }
    extern fn objc_mouse_up(this: &Object, _cmd: Sel, event: id) {
        dispatch(this, event, PointerKind::Release);
    }
    unsafe {
        let f: extern fn(&Object, Sel, id) -> BOOL = objc_accepts_first_mouse;
        decl.add_method(sel!(acceptsFirstMouse:), f);
        let f: extern fn(&Object, Sel, id) = objc_mouse_down;
        decl.add_method(sel!(mouseDown:), f);
        let f: extern fn(&Object, Sel, id) = objc_mouse_dragged;
        decl.add_method(sel!(mouseDragged:), f);
        let f: extern fn(&Object, Sel, id) = objc_mouse_up;
        decl.add_method(sel!(mouseUp:), f);
    }
});

// Notification target for screen and power changes.
subclass!(SimbarSignalObserver, NSObject, SIMBAR_OBSERVER_CLASS, |decl| {
    decl.add_ivar::<u64>("_rust_sender");

    fn send(this: &Object, signal: SystemSignal) {
        unsafe {
            let ptr: u64 = *this.get_ivar("_rust_sender");
            if ptr == 0 {
                return;
            }
            let sender = &*(ptr as *const SignalSender);
            debug!("system signal: {:?}", signal);
            let _ = sender.send(signal);
        }
    }
    extern fn objc_screen_parameters_changed(this: &Object, _cmd: Sel, _note: id) {
        send(this, SystemSignal::DisplayReconfigured);
    }
    extern fn objc_will_sleep(this: &Object, _cmd: Sel, _note: id) {
        send(this, SystemSignal::WillSleep);
    }
    extern fn objc_did_wake(this: &Object, _cmd: Sel, _note: id) {
        send(this, SystemSignal::DidWake);
    }
    unsafe {
        let f: extern fn(&Object, Sel, id) = objc_screen_parameters_changed;
        decl.add_method(sel!(screenParametersChanged:), f);
        let f: extern fn(&Object, Sel, id) = objc_will_sleep;
        decl.add_method(sel!(willSleep:), f);
        let f: extern fn(&Object, Sel, id) = objc_did_wake;
        decl.add_method(sel!(didWake:), f);
    }
});
