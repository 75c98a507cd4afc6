//! The floating window that shows the mirrored bar.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use crate::config::{Docking, SimulatorConfig};
use crate::error::{Error, Result};
use crate::forward::InputForwarder;
use crate::interface::TPanel;
use crate::relay::FrameRelay;
use crate::types::{CapturedFrame, Point, PointerKind, Rect, Size};

/// Where the frame is drawn inside the window, and how window points map to
/// hidden-surface pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PresentationGeometry {
    /// Bottom-left corner of the window on screen.
    pub origin: Point,
    /// Size of the window's content area.
    pub content: Size,
    /// Native pixel size of the hidden surface.
    pub native: Size,
    /// Where the frame is drawn, in content coordinates.
    pub frame: Rect,
    /// Hidden pixels per content point, per axis.  Always positive.
    pub ratio: Size,
}

impl PresentationGeometry {
    /// Fits `native` into `content` minus `padding` on each side, preserving
    /// aspect ratio.  None if there is nothing to draw into.
    pub fn new(content: Size, native: Size, padding: f64) -> Option<PresentationGeometry> {
        let available = Rect::new(Point::new(padding, padding),
                                  Size::new(content.width - padding * 2.0,
                                            content.height - padding * 2.0));
        if native.is_empty() || available.size.is_empty() {
            return None;
        }
        let scale = (available.size.width / native.width)
            .min(available.size.height / native.height);
        let drawn = Size::new(native.width * scale, native.height * scale);
        if drawn.is_empty() {
            return None;
        }
        Some(PresentationGeometry {
            origin: Point::default(),
            content: content,
            native: native,
            frame: available.centered(drawn),
            ratio: Size::new(native.width / drawn.width, native.height / drawn.height),
        })
    }

    /// Converts a content point to frame-local coordinates, or None if it
    /// falls in the padding around the frame.
    pub fn frame_local(&self, point: Point) -> Option<Point> {
        if !self.frame.contains(point) {
            return None;
        }
        Some(Point::new(point.x - self.frame.origin.x, point.y - self.frame.origin.y))
    }

    /// Like `frame_local`, but pins outside points to the frame edge.
    pub fn frame_local_clamped(&self, point: Point) -> Point {
        Point::new((point.x - self.frame.origin.x).max(0.0).min(self.frame.size.width),
                   (point.y - self.frame.origin.y).max(0.0).min(self.frame.size.height))
    }

    /// Scales a frame-local point to hidden-surface pixels, inside
    /// `[0, width) x [0, height)`.
    pub fn to_hidden(&self, local: Point) -> Point {
        Point::new(clamp_below(local.x * self.ratio.width, self.native.width),
                   clamp_below(local.y * self.ratio.height, self.native.height))
    }
}

/// Clamps to `[0, limit)`.
fn clamp_below(value: f64, limit: f64) -> f64 {
    if !(value > 0.0) {
        return 0.0;
    }
    if value < limit {
        return value;
    }
    // Largest float below a positive finite limit.
    f64::from_bits(limit.to_bits() - 1)
}

/// Pointer state shared with the panel's event handler.
struct Interaction {
    geometry: Option<PresentationGeometry>,
    pressed: bool,
    forwarder: Arc<InputForwarder>,
}

impl Interaction {
    /// Forwards pointer activity at content point `point`.  Returns whether
    /// anything was forwarded.
    fn handle(&mut self, kind: PointerKind, point: Point) -> Result<bool> {
        let geometry = match self.geometry {
            Some(g) => g,
            None => return Ok(false),
        };
        let local = match kind {
            PointerKind::Press => match geometry.frame_local(point) {
                Some(local) => {
                    self.pressed = true;
                    local
                }
                None => {
                    trace!("ignoring press outside frame at {:?}", point);
                    return Ok(false);
                }
            },
            PointerKind::Drag | PointerKind::Release => {
                if !self.pressed {
                    return Ok(false);
                }
                if kind == PointerKind::Release {
                    self.pressed = false;
                }
                geometry.frame_local_clamped(point)
            }
        };
        self.forwarder.forward(local, kind, &geometry)?;
        Ok(true)
    }
}

fn report(result: Result<bool>) {
    match result {
        Err(Error::InjectionDenied) => {
            error!("cannot post Touch Bar input: grant Accessibility access and re-check");
        }
        Err(e) => error!("pointer forwarding failed: {}", e),
        Ok(_) => {}
    }
}

/// Always-on-top, non-activating window mirroring the hidden surface.
pub struct PresentationSurface {
    panel: Box<dyn TPanel>,
    relay: Arc<FrameRelay>,
    interaction: Rc<RefCell<Interaction>>,
    padding: f64,
    docking: Docking,
    floating_offset: f64,
    placed: bool,
    last_drawn: Option<u64>,
}

impl PresentationSurface {
    /// Wraps `panel`, applying `config` and hooking its pointer events up to
    /// `forwarder`.  The panel stays hidden until `show`.
    pub fn new(mut panel: Box<dyn TPanel>, relay: Arc<FrameRelay>,
               forwarder: Arc<InputForwarder>, config: &SimulatorConfig) -> PresentationSurface {
        let interaction = Rc::new(RefCell::new(Interaction {
            geometry: None,
            pressed: false,
            forwarder: forwarder,
        }));
        let handler_state = interaction.clone();
        panel.set_pointer_handler(Box::new(move |kind: PointerKind, point: Point| {
            // Re-entrant events are dropped rather than panicking.
            let result = match handler_state.try_borrow_mut() {
                Ok(mut interaction) => interaction.handle(kind, point),
                Err(_) => Ok(false),
            };
            report(result);
        }));
        panel.set_alpha(config.window_alpha);
        panel.set_on_all_desktops(config.show_on_all_desktops);
        panel.prevent_activation();
        PresentationSurface {
            panel: panel,
            relay: relay,
            interaction: interaction,
            padding: config.padding,
            docking: config.docking,
            floating_offset: config.floating_offset,
            placed: false,
            last_drawn: None,
        }
    }

    ///
    pub fn geometry(&self) -> Option<PresentationGeometry> {
        self.interaction.borrow().geometry
    }

    /// Sizes the window around a hidden surface of `native` pixels.
    pub fn set_native_size(&mut self, native: Size) {
        if self.geometry().map(|g| g.native) == Some(native) {
            return;
        }
        info!("hidden surface is {}", native);
        let content = native.padded(self.padding);
        self.panel.set_content_size(content);
        self.relayout(content, native);
        if self.docking != Docking::Floating {
            self.place();
        }
    }

    /// The window's content area became `content`.
    pub fn resize(&mut self, content: Size) {
        let native = match self.geometry() {
            Some(g) => g.native,
            None => return,
        };
        self.panel.set_content_size(content);
        self.relayout(content, native);
        if self.docking != Docking::Floating {
            self.place();
        }
    }

    fn relayout(&mut self, content: Size, native: Size) {
        let mut geometry = PresentationGeometry::new(content, native, self.padding);
        let origin = self.geometry().map(|g| g.origin).unwrap_or_default();
        if let Some(ref mut g) = geometry {
            g.origin = origin;
        } else {
            warn!("no room to draw {} in {}", native, content);
        }
        self.interaction.borrow_mut().geometry = geometry;
        self.panel.prevent_activation();
        // Redraw the current frame at its new place.
        self.last_drawn = None;
    }

    /// Positions the window according to its docking mode.
    fn place(&mut self) {
        let screen = self.panel.screen_frame();
        let size = self.panel.content_size();
        let x = screen.mid_x() - size.width / 2.0;
        let y = match self.docking {
            Docking::Floating => screen.origin.y + self.floating_offset,
            Docking::DockedToTop => screen.max_y() - size.height,
            Docking::DockedToBottom => screen.origin.y,
        };
        let origin = Point::new(x, y);
        debug!("placing window at {:?} ({:?})", origin, self.docking);
        self.panel.set_origin(origin);
        if let Some(ref mut g) = self.interaction.borrow_mut().geometry {
            g.origin = origin;
        }
        self.placed = true;
    }

    ///
    pub fn set_docking(&mut self, docking: Docking) {
        self.docking = docking;
        self.place();
        self.panel.prevent_activation();
    }

    ///
    pub fn docking(&self) -> Docking {
        self.docking
    }

    ///
    pub fn set_alpha(&mut self, alpha: f64) {
        self.panel.set_alpha(alpha.max(0.5).min(1.0));
    }

    ///
    pub fn set_on_all_desktops(&mut self, all: bool) {
        self.panel.set_on_all_desktops(all);
    }

    /// Orders the window front without activating it.
    pub fn show(&mut self) {
        if !self.placed || self.docking != Docking::Floating {
            self.place();
        }
        self.panel.show();
        self.panel.prevent_activation();
    }

    ///
    pub fn hide(&mut self) {
        self.panel.hide();
        self.panel.prevent_activation();
    }

    ///
    pub fn is_visible(&self) -> bool {
        self.panel.is_visible()
    }

    /// Shows the window if hidden and vice versa.
    pub fn toggle(&mut self) {
        if self.is_visible() {
            self.hide();
        } else {
            self.show();
        }
    }

    /// Draws the newest frame if it hasn't been drawn yet.  Returns whether
    /// anything was drawn.
    pub fn redraw(&mut self) -> bool {
        let frame = match self.relay.take_newer(self.last_drawn) {
            Some(frame) => frame,
            None => return false,
        };
        self.draw(&frame)
    }

    /// The image is scaled into the frame rect whatever its pixel size; only
    /// `set_native_size` changes the layout.
    fn draw(&mut self, frame: &CapturedFrame) -> bool {
        let dest = match self.geometry() {
            Some(g) => g.frame,
            None => return false,
        };
        self.panel.draw(frame, dest);
        self.last_drawn = Some(frame.sequence);
        true
    }

    /// Handles pointer activity at `point`, in content coordinates.  This is
    /// what the panel's own event handler calls.
    pub fn pointer(&mut self, kind: PointerKind, point: Point) -> Result<bool> {
        self.interaction.borrow_mut().handle(kind, point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{click, MockPanel, MockPlatform};
    use crate::types::PixelBuffer;

    const BAR: Size = Size { width: 2170., height: 60. };

    fn frame(seq: u64, size: Size) -> CapturedFrame {
        CapturedFrame::new(Arc::new(PixelBuffer(vec![])), size, seq)
    }

    fn surface(config: &SimulatorConfig)
               -> (PresentationSurface, Rc<RefCell<crate::mock::PanelState>>,
                   Arc<FrameRelay>, Arc<MockPlatform>, Arc<InputForwarder>) {
        let platform = MockPlatform::new();
        let forwarder = Arc::new(InputForwarder::new(platform.clone()));
        let relay = Arc::new(FrameRelay::new());
        let (panel, state) = MockPanel::new();
        let surface = PresentationSurface::new(Box::new(panel), relay.clone(),
                                               forwarder.clone(), config);
        (surface, state, relay, platform, forwarder)
    }

    #[test]
    fn test_geometry_fits_and_centers() {
        let g = PresentationGeometry::new(Size::new(1095., 60.), Size::new(2170., 60.), 5.0)
            .unwrap();
        assert_eq!(g.frame.size, Size::new(1085., 30.));
        assert_eq!(g.frame.origin, Point::new(5., 15.));
        assert_eq!(g.ratio, Size::new(2., 2.));
    }

    #[test]
    fn test_geometry_degenerate() {
        assert!(PresentationGeometry::new(Size::new(10., 10.), Size::new(0., 60.), 0.).is_none());
        assert!(PresentationGeometry::new(Size::new(10., 10.), BAR, 5.).is_none());
    }

    #[test]
    fn test_mapping_matches_ratio() {
        let (w, h) = (1085., 30.);
        let g = PresentationGeometry::new(Size::new(w, h), BAR, 0.).unwrap();
        for &(x, y) in [(0., 0.), (10.5, 3.), (1000., 29.)].iter() {
            let p = g.to_hidden(Point::new(x, y));
            assert_eq!(p, Point::new(x * BAR.width / w, y * BAR.height / h));
        }
        let edge = g.to_hidden(Point::new(w, h));
        assert!(edge.x < BAR.width && edge.y < BAR.height);
    }

    #[test]
    fn test_native_size_sizes_window() {
        let (mut s, state, _, _, _) = surface(&SimulatorConfig::new());
        s.set_native_size(BAR);
        assert_eq!(state.borrow().content_size, Size::new(2180., 70.));
        let g = s.geometry().unwrap();
        assert_eq!(g.frame, Rect::new(Point::new(5., 5.), BAR));
        assert_eq!(g.ratio, Size::new(1., 1.));
    }

    #[test]
    fn test_redraws_only_new_frames() {
        let (mut s, state, relay, _, _) = surface(&SimulatorConfig::new());
        s.set_native_size(BAR);
        assert!(!s.redraw());
        relay.submit(frame(1, BAR));
        relay.submit(frame(2, BAR));
        assert!(s.redraw());
        assert!(!s.redraw());
        relay.submit(frame(3, BAR));
        assert!(s.redraw());
        let drawn: Vec<u64> = state.borrow().drawn.iter().map(|d| d.0).collect();
        assert_eq!(drawn, vec![2, 3]);
    }

    #[test]
    fn test_frame_pixels_do_not_change_layout() {
        let queried = Size::new(1085., 30.);
        let (mut s, state, relay, platform, forwarder) =
            surface(&SimulatorConfig::new().padding(0.));
        s.set_native_size(queried);
        // Backing store at twice the queried size.
        relay.submit(frame(1, BAR));
        assert!(s.redraw());
        assert_eq!(state.borrow().content_size, queried);
        assert_eq!(s.geometry().unwrap().native, queried);
        assert_eq!(state.borrow().drawn[0].1, Rect::new(Point::new(0., 0.), queried));

        click(&state, PointerKind::Press, Point::new(1000., 10.));
        click(&state, PointerKind::Drag, Point::new(2000., 10.));
        click(&state, PointerKind::Release, Point::new(2000., 10.));
        forwarder.flush();
        let posted = platform.posted();
        assert_eq!(posted.len(), 3);
        assert_eq!(posted[0], (PointerKind::Press, Point::new(1000., 10.)));
        for &(_, p) in posted.iter() {
            assert!(p.x >= 0. && p.x < queried.width);
            assert!(p.y >= 0. && p.y < queried.height);
        }
    }

    #[test]
    fn test_show_hide_keep_non_activating() {
        let (mut s, state, _, _, _) = surface(&SimulatorConfig::new());
        let base = state.borrow().activation_guards;
        s.set_native_size(BAR);
        s.show();
        s.resize(Size::new(1100., 40.));
        s.hide();
        assert!(state.borrow().activation_guards >= base + 4);
        assert!(!s.is_visible());
        s.toggle();
        assert!(s.is_visible());
    }

    #[test]
    fn test_floating_placement() {
        let (mut s, state, _, _, _) = surface(&SimulatorConfig::new().padding(0.));
        s.set_native_size(Size::new(1000., 30.));
        s.show();
        assert_eq!(state.borrow().origin, Point::new(220., 100.));
        s.set_docking(Docking::DockedToTop);
        assert_eq!(state.borrow().origin, Point::new(220., 870.));
        s.set_docking(Docking::DockedToBottom);
        assert_eq!(state.borrow().origin, Point::new(220., 0.));
        assert_eq!(s.geometry().unwrap().origin, Point::new(220., 0.));
    }

    #[test]
    fn test_pointer_forwarding_and_clipping() {
        let (mut s, state, _, platform, forwarder) = surface(&SimulatorConfig::new());
        s.set_native_size(BAR);
        // Padding: ignored.
        assert_eq!(s.pointer(PointerKind::Press, Point::new(2., 2.)), Ok(false));
        assert_eq!(s.pointer(PointerKind::Drag, Point::new(20., 20.)), Ok(false));
        // Through the panel's own handler.
        click(&state, PointerKind::Press, Point::new(15., 10.));
        click(&state, PointerKind::Drag, Point::new(3000., 10.));
        click(&state, PointerKind::Release, Point::new(3000., 10.));
        assert_eq!(s.pointer(PointerKind::Release, Point::new(30., 10.)), Ok(false));
        forwarder.flush();
        let posted = platform.posted();
        assert_eq!(posted.len(), 3);
        assert_eq!(posted[0], (PointerKind::Press, Point::new(10., 5.)));
        assert!(posted[1].1.x < BAR.width && posted[1].1.x > BAR.width - 1.);
        assert_eq!(posted[2].0, PointerKind::Release);
    }

    #[test]
    fn test_pointer_without_geometry() {
        let (mut s, _, _, platform, forwarder) = surface(&SimulatorConfig::new());
        assert_eq!(s.pointer(PointerKind::Press, Point::new(15., 10.)), Ok(false));
        forwarder.flush();
        assert!(platform.posted().is_empty());
    }

    #[test]
    fn test_config_applied() {
        let config = SimulatorConfig::new().alpha(0.6).all_desktops(true);
        let (_s, state, _, _, _) = surface(&config);
        assert_eq!(state.borrow().alpha, 0.6);
        assert!(state.borrow().all_desktops);
        assert!(!state.borrow().ever_shown);
    }
}
