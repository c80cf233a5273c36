use console_error_panic_hook::set_once;
use gloo_net::http::Request;
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use tracing::{debug, info, warn};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::{
    Document, EventTarget, HtmlElement, IntersectionObserver, IntersectionObserverEntry,
    IntersectionObserverInit, Window,
};

use formats::{CaseRecord, OutlineError, load_cases};
use globe::{
    ActivationGate, Capabilities, GlobeConfig, GlobeEngine, GlobeError, GlobeEvent, PanelVisibility,
};
use gpu::Viewport;

mod dom;
mod logging;
mod wgpu;

use dom::{GlobeView, show_fallback};
use wgpu::{WgpuContext, init_wgpu_from_canvas, release, render_frame, resize_wgpu};

type Shared = Rc<RefCell<Mount>>;

struct Listener {
    target: EventTarget,
    kind: &'static str,
    callback: Closure<dyn FnMut(web_sys::Event)>,
}

struct Mount {
    window: Window,
    document: Document,
    container: HtmlElement,
    view: Option<GlobeView>,
    gate: ActivationGate,
    config: GlobeConfig,
    records: Vec<CaseRecord>,
    engine: Option<GlobeEngine>,
    gpu: Option<WgpuContext>,
    observer: Option<IntersectionObserver>,
    observer_callback: Option<Closure<dyn FnMut(js_sys::Array)>>,
    listeners: Vec<Listener>,
    raf: Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>>,
    raf_id: Option<i32>,
    starting: bool,
    unmounted: bool,
}

impl Mount {
    fn viewport(&self) -> Viewport {
        Viewport::new(
            self.container.client_width() as f64,
            self.container.client_height() as f64,
            self.window.device_pixel_ratio(),
        )
    }

    fn size_canvas(&self, viewport: &Viewport) -> (u32, u32) {
        let (w, h) = viewport.physical_size();
        if let Some(view) = &self.view {
            view.canvas.set_width(w);
            view.canvas.set_height(h);
        }
        (w, h)
    }

    /// Builds the engine from the mount's inputs. Rejected config or case
    /// data gets one more attempt with defaults and no cases.
    fn build_engine(&mut self) -> Result<GlobeEngine, GlobeError> {
        let viewport = self.viewport();
        let records = std::mem::take(&mut self.records);
        match GlobeEngine::new(&self.gate, self.config.clone(), records, viewport) {
            Err(e) if e.recovers_with_defaults() => {
                warn!(error = %e, "mount.inputs_rejected");
                GlobeEngine::new(&self.gate, GlobeConfig::default(), Vec::new(), viewport)
            }
            built => built,
        }
    }

    /// No engine could be built: show the fallback. Only context failures
    /// mark the browser unsupported.
    fn fail(&mut self, error: &GlobeError) {
        if error.is_unsupported() {
            self.gate.on_context_failed(&error.to_string());
        } else {
            warn!(error = %error, "mount.engine_failed");
        }
        if let Some(view) = self.view.take() {
            view.remove();
        }
        self.gpu = None;
        self.engine = None;
        show_fallback(&self.document, &self.container);
    }

    fn teardown(&mut self) {
        if self.unmounted {
            return;
        }
        self.unmounted = true;
        if let Some(id) = self.raf_id.take() {
            let _ = self.window.cancel_animation_frame(id);
        }
        self.raf.borrow_mut().take();
        for l in self.listeners.drain(..) {
            let _ = l
                .target
                .remove_event_listener_with_callback(l.kind, l.callback.as_ref().unchecked_ref());
        }
        if let Some(observer) = self.observer.take() {
            observer.disconnect();
        }
        self.observer_callback = None;
        if let Some(engine) = self.engine.as_mut() {
            engine.teardown();
        }
        self.gpu = None;
        if let Some(view) = self.view.take() {
            view.remove();
        }
        info!("mount.unmounted");
    }
}

/// Handle returned to the host page.
#[wasm_bindgen]
pub struct GlobeMount {
    inner: Shared,
}

#[wasm_bindgen]
impl GlobeMount {
    /// `false` once the fallback message is showing.
    pub fn is_supported(&self) -> bool {
        self.inner.borrow().gate.is_supported()
    }

    pub fn skip_intro(&self) {
        if let Some(engine) = self.inner.borrow_mut().engine.as_mut() {
            engine.skip_intro();
        }
    }

    /// Stops the frame loop, removes every listener and releases all GPU and
    /// scene resources. Safe to call more than once.
    pub fn unmount(&self) {
        self.inner.borrow_mut().teardown();
    }
}

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    set_once();
    Ok(())
}

/// Mounts the globe into `container`. Never throws after the handle is
/// returned; failures show the fallback text and flip `is_supported`.
#[wasm_bindgen]
pub fn mount(
    container: HtmlElement,
    cases_json: &str,
    config_json: Option<String>,
) -> Result<GlobeMount, JsValue> {
    set_once();
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("window missing"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("document missing"))?;

    let mut config = load_config(config_json.as_deref());
    logging::init(&config.log_level);
    if prefers_reduced_motion(&window) {
        config.intro.enabled = false;
    }
    let records = load_cases(cases_json).unwrap_or_else(|e| {
        warn!(error = %e, "mount.cases_rejected");
        Vec::new()
    });

    let caps = probe(&window, &document);
    let gate = ActivationGate::evaluate(caps);
    let view = if gate.is_supported() {
        Some(GlobeView::build(&document, &container)?)
    } else {
        show_fallback(&document, &container);
        None
    };

    let shared: Shared = Rc::new(RefCell::new(Mount {
        window,
        document,
        container,
        view,
        gate,
        config,
        records,
        engine: None,
        gpu: None,
        observer: None,
        observer_callback: None,
        listeners: Vec::new(),
        raf: Rc::new(RefCell::new(None)),
        raf_id: None,
        starting: false,
        unmounted: false,
    }));

    let authorized = shared.borrow().gate.is_authorized();
    if authorized {
        start_engine(&shared);
    } else if shared.borrow().gate.is_supported() {
        observe(&shared)?;
    }

    Ok(GlobeMount { inner: shared })
}

fn load_config(payload: Option<&str>) -> GlobeConfig {
    let Some(payload) = payload else {
        return GlobeConfig::default();
    };
    match GlobeConfig::from_json_str(payload).and_then(|c| c.validate().map(|_| c)) {
        Ok(config) => config,
        Err(e) => {
            // Logging is not installed yet; go straight to the console.
            web_sys::console::warn_1(&JsValue::from_str(&format!(
                "globe config rejected, using defaults: {e}"
            )));
            GlobeConfig::default()
        }
    }
}

fn prefers_reduced_motion(window: &Window) -> bool {
    window
        .match_media("(prefers-reduced-motion: reduce)")
        .ok()
        .flatten()
        .is_some_and(|m| m.matches())
}

fn probe(window: &Window, document: &Document) -> Capabilities {
    let navigator = window.navigator();
    let webgpu = js_sys::Reflect::get(&navigator, &JsValue::from_str("gpu"))
        .map(|v| !v.is_undefined() && !v.is_null())
        .unwrap_or(false);
    let webgl2 = document
        .create_element("canvas")
        .ok()
        .and_then(|el| el.dyn_into::<web_sys::HtmlCanvasElement>().ok())
        .and_then(|canvas| canvas.get_context("webgl2").ok().flatten())
        .is_some();
    let intersection_observer =
        js_sys::Reflect::has(window, &JsValue::from_str("IntersectionObserver")).unwrap_or(false);
    Capabilities {
        webgpu,
        webgl2,
        intersection_observer,
    }
}

fn observe(shared: &Shared) -> Result<(), JsValue> {
    let weak = Rc::downgrade(shared);
    let callback = Closure::<dyn FnMut(js_sys::Array)>::new(move |entries: js_sys::Array| {
        let Some(shared) = weak.upgrade() else {
            return;
        };
        let visible = entries.iter().any(|entry| {
            entry
                .dyn_into::<IntersectionObserverEntry>()
                .is_ok_and(|e| e.is_intersecting())
        });
        let authorized = {
            let mut m = shared.borrow_mut();
            let authorized = !m.unmounted && m.gate.on_intersection(visible);
            if authorized {
                if let Some(observer) = &m.observer {
                    observer.disconnect();
                }
            }
            authorized
        };
        if authorized {
            debug!("activation.visible");
            start_engine(&shared);
        }
    });

    let mut m = shared.borrow_mut();
    let init = IntersectionObserverInit::new();
    init.set_root_margin(&m.config.activation.root_margin);
    let observer =
        IntersectionObserver::new_with_options(callback.as_ref().unchecked_ref(), &init)?;
    observer.observe(&m.container);
    m.observer = Some(observer);
    m.observer_callback = Some(callback);
    Ok(())
}

fn start_engine(shared: &Shared) {
    let canvas = {
        let mut m = shared.borrow_mut();
        if m.starting || m.unmounted {
            return;
        }
        m.starting = true;
        let viewport = m.viewport();
        m.size_canvas(&viewport);
        match &m.view {
            Some(view) => view.canvas.clone(),
            None => return,
        }
    };

    let shared = Rc::clone(shared);
    spawn_local(async move {
        let result = init_wgpu_from_canvas(canvas).await;
        let ready = {
            let mut guard = shared.borrow_mut();
            let m = &mut *guard;
            if m.unmounted {
                return;
            }
            let built = result
                .map_err(GlobeError::ContextInit)
                .and_then(|gpu| m.build_engine().map(|engine| (gpu, engine)));
            match built {
                Ok((gpu, engine)) => {
                    m.engine = Some(engine);
                    m.gpu = Some(gpu);
                    true
                }
                Err(e) => {
                    m.fail(&e);
                    false
                }
            }
        };
        if !ready {
            return;
        }
        if let Err(e) = wire_listeners(&shared) {
            warn!(error = ?e, "mount.listeners_failed");
        }
        fetch_outlines(&shared);
        start_loop(&shared);
    });
}

fn listen(
    shared: &Shared,
    target: EventTarget,
    kind: &'static str,
    mut handler: impl FnMut(&mut Mount, web_sys::Event) + 'static,
) -> Result<(), JsValue> {
    let weak: Weak<RefCell<Mount>> = Rc::downgrade(shared);
    let callback = Closure::<dyn FnMut(web_sys::Event)>::new(move |event: web_sys::Event| {
        if let Some(shared) = weak.upgrade() {
            let mut m = shared.borrow_mut();
            if !m.unmounted {
                handler(&mut m, event);
            }
        }
    });
    target.add_event_listener_with_callback(kind, callback.as_ref().unchecked_ref())?;
    shared.borrow_mut().listeners.push(Listener {
        target,
        kind,
        callback,
    });
    Ok(())
}

fn pointer_xy(event: &web_sys::Event) -> Option<(f64, f64)> {
    let event = event.dyn_ref::<web_sys::MouseEvent>()?;
    Some((event.offset_x() as f64, event.offset_y() as f64))
}

fn wire_listeners(shared: &Shared) -> Result<(), JsValue> {
    let (canvas, close, window): (EventTarget, EventTarget, EventTarget) = {
        let m = shared.borrow();
        let Some(view) = &m.view else {
            return Ok(());
        };
        (
            view.canvas.clone().into(),
            view.card.close_button().clone().into(),
            m.window.clone().into(),
        )
    };

    listen(shared, canvas.clone(), "pointerdown", |m, event| {
        let (Some((x, y)), Some(engine)) = (pointer_xy(&event), m.engine.as_mut()) else {
            return;
        };
        let outcome = engine.pointer_down(x, y);
        debug!(?outcome, x, y, "input.pointer_down");
    })?;
    listen(shared, canvas.clone(), "pointermove", |m, event| {
        if let (Some((x, y)), Some(engine)) = (pointer_xy(&event), m.engine.as_mut()) {
            engine.pointer_move(x, y);
        }
    })?;
    for kind in ["pointerup", "pointercancel", "pointerleave"] {
        listen(shared, canvas.clone(), kind, |m, _| {
            if let Some(engine) = m.engine.as_mut() {
                engine.pointer_up();
            }
        })?;
    }
    listen(shared, canvas, "wheel", |m, event| {
        let Some(wheel) = event.dyn_ref::<web_sys::WheelEvent>() else {
            return;
        };
        event.prevent_default();
        if let Some(engine) = m.engine.as_mut() {
            engine.wheel(wheel.delta_y());
        }
    })?;
    listen(shared, close, "click", |m, _| {
        if let Some(engine) = m.engine.as_mut() {
            engine.close();
        }
    })?;
    listen(shared, window.clone(), "keydown", |m, event| {
        let is_escape = event
            .dyn_ref::<web_sys::KeyboardEvent>()
            .is_some_and(|k| k.key() == "Escape");
        if is_escape {
            if let Some(engine) = m.engine.as_mut() {
                engine.escape();
            }
        }
    })?;
    listen(shared, window, "resize", |m, _| {
        let viewport = m.viewport();
        let (w, h) = m.size_canvas(&viewport);
        if let Some(gpu) = m.gpu.as_mut() {
            resize_wgpu(gpu, w, h);
        }
        if let Some(engine) = m.engine.as_mut() {
            engine.resize(viewport.width, viewport.height, viewport.pixel_ratio);
        }
    })?;
    Ok(())
}

async fn fetch_text(url: &str) -> Result<String, OutlineError> {
    let resp = Request::get(url)
        .send()
        .await
        .map_err(|e| OutlineError::Fetch(e.to_string()))?;
    if !resp.ok() {
        return Err(OutlineError::Fetch(format!("HTTP {}", resp.status())));
    }
    resp.text()
        .await
        .map_err(|e| OutlineError::Fetch(e.to_string()))
}

fn fetch_outlines(shared: &Shared) {
    let request = shared
        .borrow_mut()
        .engine
        .as_mut()
        .and_then(|e| e.begin_outline_load());
    let Some(request) = request else {
        return;
    };
    let weak = Rc::downgrade(shared);
    spawn_local(async move {
        let payload = fetch_text(&request.url).await;
        let Some(shared) = weak.upgrade() else {
            return;
        };
        let mut m = shared.borrow_mut();
        if let Some(engine) = m.engine.as_mut() {
            engine.deliver_outline(request.ticket, payload);
        }
    });
}

fn start_loop(shared: &Shared) {
    let weak = Rc::downgrade(shared);
    let slot = Rc::clone(&shared.borrow().raf);
    let callback = Closure::<dyn FnMut(f64)>::new(move |timestamp_ms: f64| {
        let Some(shared) = weak.upgrade() else {
            return;
        };
        if tick(&mut shared.borrow_mut(), timestamp_ms) {
            request_frame(&shared);
        }
    });
    *slot.borrow_mut() = Some(callback);
    request_frame(shared);
}

fn request_frame(shared: &Shared) {
    let (window, slot) = {
        let m = shared.borrow();
        (m.window.clone(), Rc::clone(&m.raf))
    };
    let id = slot
        .borrow()
        .as_ref()
        .and_then(|cb| window.request_animation_frame(cb.as_ref().unchecked_ref()).ok());
    shared.borrow_mut().raf_id = id;
}

/// One animation frame: place the card, step the engine, draw, then sync
/// the card DOM.
/// Returns `false` when the loop should stop.
fn tick(m: &mut Mount, timestamp_ms: f64) -> bool {
    if m.unmounted {
        return false;
    }
    let (Some(engine), Some(gpu)) = (m.engine.as_mut(), m.gpu.as_mut()) else {
        return false;
    };
    // The card only has a layout box while shown, so show it before reading
    // where the connector should end.
    if let Some(view) = &m.view {
        let panel = engine.panel();
        view.card.set_panel(panel);
        if panel != PanelVisibility::Hidden {
            let (x, y) = view.card.origin();
            engine.set_card_origin(x, y);
        }
    }
    if engine.frame(timestamp_ms).is_none() {
        return false;
    }
    let Some(output) = engine.output() else {
        return false;
    };
    release(gpu, &output.released);
    if let Err(e) = render_frame(gpu, engine.scene(), &output.render) {
        debug!(error = %e, "frame.render_skipped");
    }

    let Some(view) = &m.view else {
        return true;
    };
    view.card.set_connector(output.connector);
    view.card.set_panel(output.panel);

    for event in engine.drain_events() {
        match event.payload {
            GlobeEvent::CaseSelected { marker, .. } => {
                if let Some(record) = engine.markers().record(marker) {
                    view.card.show(record);
                }
            }
            GlobeEvent::IntroCompleted => info!("intro.complete"),
            GlobeEvent::OutlinesApplied { segments } => debug!(segments, "outlines.applied"),
            _ => {}
        }
    }
    true
}
