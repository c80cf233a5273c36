use formats::CaseRecord;
use globe::PanelVisibility;
use globe::overlay::ConnectorGeometry;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Document, Element, HtmlCanvasElement, HtmlElement};

pub const FALLBACK_MESSAGE: &str = "WebGPU is not supported in this browser. \
    Please use a recent Chromium-based browser to view the live globe.";

fn create_html(document: &Document, tag: &str, class: &str) -> Result<HtmlElement, JsValue> {
    let el = document.create_element(tag)?.dyn_into::<HtmlElement>()?;
    el.set_class_name(class);
    Ok(el)
}

/// Replaces the container's content with the static fallback text.
pub fn show_fallback(document: &Document, container: &HtmlElement) {
    container.set_text_content(None);
    match create_html(document, "p", "globe-fallback") {
        Ok(p) => {
            p.set_text_content(Some(FALLBACK_MESSAGE));
            let _ = container.append_child(&p);
        }
        Err(_) => container.set_text_content(Some(FALLBACK_MESSAGE)),
    }
}

/// Everything the mount adds to the host container.
pub struct GlobeView {
    pub canvas: HtmlCanvasElement,
    pub card: CardView,
}

impl GlobeView {
    pub fn build(document: &Document, container: &HtmlElement) -> Result<Self, JsValue> {
        let canvas = document
            .create_element("canvas")?
            .dyn_into::<HtmlCanvasElement>()?;
        canvas.set_class_name("globe-canvas");
        container.append_child(&canvas)?;
        let card = CardView::build(document, container)?;
        Ok(Self { canvas, card })
    }

    pub fn remove(&self) {
        self.canvas.remove();
        self.card.remove();
    }
}

/// Detail card plus the connector line drawn from the selected marker to it.
pub struct CardView {
    root: HtmlElement,
    title: Element,
    meta: Element,
    summary: Element,
    close: HtmlElement,
    connector: HtmlElement,
}

impl CardView {
    fn build(document: &Document, container: &HtmlElement) -> Result<Self, JsValue> {
        let connector = create_html(document, "div", "globe-connector")?;
        connector.set_hidden(true);
        let style = connector.style();
        style.set_property("position", "absolute")?;
        style.set_property("height", "1px")?;
        style.set_property("transform-origin", "0 50%")?;
        style.set_property("pointer-events", "none")?;

        let root = create_html(document, "aside", "globe-card")?;
        root.set_hidden(true);
        root.set_attribute("data-state", "hidden")?;
        let close = create_html(document, "button", "globe-card-close")?;
        close.set_attribute("type", "button")?;
        close.set_attribute("aria-label", "Close")?;
        close.set_text_content(Some("\u{00d7}"));
        let title = document.create_element("h3")?;
        let meta = document.create_element("p")?;
        meta.set_class_name("globe-card-meta");
        let summary = document.create_element("p")?;
        root.append_child(&close)?;
        root.append_child(&title)?;
        root.append_child(&meta)?;
        root.append_child(&summary)?;

        container.append_child(&connector)?;
        container.append_child(&root)?;

        Ok(Self {
            root,
            title,
            meta,
            summary,
            close,
            connector,
        })
    }

    pub fn close_button(&self) -> &HtmlElement {
        &self.close
    }

    /// Top-left of the card in container pixels.
    pub fn origin(&self) -> (f64, f64) {
        (self.root.offset_left() as f64, self.root.offset_top() as f64)
    }

    pub fn show(&self, record: &CaseRecord) {
        self.title.set_text_content(Some(&record.title));
        let meta = if record.location.is_empty() {
            record.date.clone()
        } else {
            format!("{} \u{00b7} {}", record.location, record.date)
        };
        self.meta.set_text_content(Some(&meta));
        self.summary.set_text_content(Some(&record.summary));
    }

    pub fn set_panel(&self, panel: PanelVisibility) {
        let state = match panel {
            PanelVisibility::Hidden => "hidden",
            PanelVisibility::Open => "open",
            PanelVisibility::Closing => "closing",
        };
        self.root.set_hidden(panel == PanelVisibility::Hidden);
        let _ = self.root.set_attribute("data-state", state);
    }

    pub fn set_connector(&self, connector: Option<ConnectorGeometry>) {
        let Some(c) = connector else {
            self.connector.set_hidden(true);
            return;
        };
        let style = self.connector.style();
        let _ = style.set_property("left", &format!("{:.1}px", c.marker_px.x));
        let _ = style.set_property("top", &format!("{:.1}px", c.marker_px.y));
        let _ = style.set_property("width", &format!("{:.1}px", c.length));
        let _ = style.set_property("transform", &format!("rotate({:.5}rad)", c.angle_rad));
        self.connector.set_hidden(false);
    }

    fn remove(&self) {
        self.connector.remove();
        self.root.remove();
    }
}
