use formats::{CaseRecord, OutlineError};
use foundation::math::Vec2;
use globe::intro::IntroState;
use globe::{
    ActivationGate, Capabilities, GlobeConfig, GlobeEngine, GlobeEvent, PanelVisibility,
    PointerOutcome,
};
use gpu::{RenderPass, Viewport};
use pretty_assertions::assert_eq;

const TOPOLOGY: &str = r#"{
  "type": "Topology",
  "transform": { "scale": [0.01, 0.01], "translate": [-20, -10] },
  "arcs": [
    [[0, 0], [1000, 0], [0, 1000], [-1000, 0], [0, -1000]],
    [[3000, 3000], [500, 0], [0, 500], [-500, -500]]
  ],
  "objects": { "countries": { "type": "GeometryCollection", "geometries": [
    { "type": "Polygon", "arcs": [[0]] },
    { "type": "MultiPolygon", "arcs": [[[1]]] },
    { "type": null }
  ] } }
}"#;

fn records() -> Vec<CaseRecord> {
    vec![
        CaseRecord::new("case-1", "Equator", 0.0, 0.0),
        CaseRecord::new("case-2", "North east", 10.0, 15.0),
        CaseRecord::new("case-3", "South west", -12.0, -20.0),
    ]
}

struct Harness {
    engine: GlobeEngine,
    now_ms: f64,
    events: Vec<GlobeEvent>,
}

impl Harness {
    fn new(config: GlobeConfig) -> Self {
        let gate = ActivationGate::evaluate(Capabilities {
            webgpu: true,
            webgl2: false,
            intersection_observer: false,
        });
        let engine = GlobeEngine::new(&gate, config, records(), Viewport::new(800.0, 600.0, 1.0))
            .expect("engine");
        Self {
            engine,
            now_ms: 0.0,
            events: Vec::new(),
        }
    }

    fn step(&mut self, dt_ms: f64) {
        self.engine.frame(self.now_ms);
        self.now_ms += dt_ms;
        self.collect();
    }

    fn collect(&mut self) {
        self.events
            .extend(self.engine.drain_events().into_iter().map(|e| e.payload));
    }

    fn run_for(&mut self, duration_ms: f64, dt_ms: f64) {
        let end = self.now_ms + duration_ms;
        while self.now_ms < end {
            self.step(dt_ms);
        }
    }

    fn finish_intro(&mut self) {
        for _ in 0..200 {
            if self.engine.intro_state() == IntroState::Complete {
                return;
            }
            self.step(100.0);
        }
        panic!("intro never completed");
    }

    fn click_marker(&mut self, index: usize) -> PointerOutcome {
        let at = self.engine.marker_screen_position(index).expect("on screen");
        let outcome = self.engine.pointer_down(at.x, at.y);
        self.engine.pointer_up();
        self.collect();
        outcome
    }

    fn click(&mut self, x: f64, y: f64) -> PointerOutcome {
        let outcome = self.engine.pointer_down(x, y);
        self.engine.pointer_up();
        self.collect();
        outcome
    }

    fn count(&self, event: &GlobeEvent) -> usize {
        self.events.iter().filter(|e| *e == event).count()
    }
}

#[test]
fn intro_completes_once_and_never_reverts() {
    let mut h = Harness::new(GlobeConfig::default());
    h.finish_intro();
    h.run_for(2000.0, 100.0);
    h.engine.skip_intro();
    h.run_for(500.0, 100.0);

    assert_eq!(h.count(&GlobeEvent::IntroCompleted), 1);
    assert_eq!(h.engine.intro_state(), IntroState::Complete);
    let camera = h.engine.camera().position;
    assert!((camera.length() - 3.6).abs() < 1e-6, "camera at {camera:?}");

    let output = h.engine.output().expect("frame");
    assert!(output.render.pass(RenderPass::Opaque).count() >= 4);
    let surface_opaque = output
        .render
        .pass(RenderPass::Opaque)
        .any(|c| c.node == h.engine.state().globe.surface);
    assert!(surface_opaque);
}

#[test]
fn pointer_is_ignored_during_intro() {
    let mut h = Harness::new(GlobeConfig::default());
    h.run_for(3000.0, 100.0);
    assert_eq!(h.engine.intro_state(), IntroState::Playing);
    assert_eq!(h.click(400.0, 300.0), PointerOutcome::Ignored);
    assert!(!h.engine.close());
    assert_eq!(h.engine.selection(), None);
}

#[test]
fn selecting_marker_two_then_clicking_empty_space() {
    let mut h = Harness::new(GlobeConfig::default());
    h.finish_intro();

    assert_eq!(h.click_marker(1), PointerOutcome::Selected(1));
    assert_eq!(h.engine.selected_record().map(|r| r.id.as_str()), Some("case-2"));
    assert_eq!(h.engine.panel(), PanelVisibility::Open);
    assert_eq!(
        h.count(&GlobeEvent::CaseSelected {
            marker: 1,
            id: "case-2".to_string()
        }),
        1
    );

    h.step(16.0);
    assert_eq!(h.click(5.0, 5.0), PointerOutcome::Closing);
    assert_eq!(h.engine.panel(), PanelVisibility::Closing);

    h.run_for(200.0, 16.0);
    assert_eq!(h.engine.selection(), Some(1));

    h.run_for(200.0, 16.0);
    assert_eq!(h.engine.selection(), None);
    assert_eq!(h.engine.panel(), PanelVisibility::Hidden);
    assert_eq!(h.count(&GlobeEvent::SelectionCleared { marker: 1 }), 1);
    assert!(h.engine.focus_angle().is_none());
}

#[test]
fn new_hit_during_close_delay_replaces_selection() {
    let mut h = Harness::new(GlobeConfig::default());
    h.finish_intro();

    assert_eq!(h.click_marker(0), PointerOutcome::Selected(0));
    h.step(16.0);
    assert_eq!(h.click(5.0, 5.0), PointerOutcome::Closing);
    h.run_for(100.0, 16.0);
    assert_eq!(h.click_marker(2), PointerOutcome::Selected(2));

    h.run_for(1000.0, 16.0);
    assert_eq!(h.engine.selection(), Some(2));
    assert_eq!(h.engine.panel(), PanelVisibility::Open);
    assert!(!h.events.iter().any(|e| matches!(e, GlobeEvent::SelectionCleared { .. })));
}

#[test]
fn repeated_close_restarts_the_delay() {
    let mut h = Harness::new(GlobeConfig::default());
    h.finish_intro();
    h.click_marker(1);
    h.step(16.0);

    assert!(h.engine.escape());
    h.run_for(160.0, 16.0);
    assert!(h.engine.close());
    h.run_for(160.0, 16.0);
    assert_eq!(h.engine.selection(), Some(1));
    h.run_for(200.0, 16.0);
    assert_eq!(h.engine.selection(), None);
    assert_eq!(h.count(&GlobeEvent::SelectionCleared { marker: 1 }), 1);
    assert_eq!(h.count(&GlobeEvent::SelectionClosing { marker: 1 }), 2);
}

#[test]
fn focus_turns_selected_marker_to_screen_centre() {
    let mut h = Harness::new(GlobeConfig::default());
    h.finish_intro();
    h.click_marker(2);

    let mut last = h.engine.focus_angle().expect("focus pending");
    for _ in 0..600 {
        h.step(16.0);
        match h.engine.focus_angle() {
            Some(angle) => {
                assert!(angle <= last + 1e-12, "focus moved away: {angle} > {last}");
                last = angle;
            }
            None => break,
        }
    }
    assert!(h.engine.focus_angle().is_none());
    assert_eq!(h.count(&GlobeEvent::FocusReached { marker: 2 }), 1);

    h.step(16.0);
    let at = h.engine.marker_screen_position(2).expect("on screen");
    assert!(at.x.is_finite());
    assert!((at - Vec2::new(400.0, 300.0)).length() < 0.5, "marker at {at:?}");
}

#[test]
fn connector_follows_card_and_resize() {
    let mut h = Harness::new(GlobeConfig::default());
    h.finish_intro();
    h.engine.set_card_origin(500.0, 100.0);
    h.click_marker(0);
    h.step(16.0);

    let connector = h.engine.output().and_then(|o| o.connector).expect("connector");
    assert_eq!(connector.anchor_px, Vec2::new(524.0, 140.0));
    assert!(connector.length > 0.0);

    h.engine.resize(1600.0, 600.0, 3.0);
    h.step(16.0);
    assert!(h.events.contains(&GlobeEvent::Resized {
        width: 1600.0,
        height: 600.0
    }));
    let wide = h.engine.output().and_then(|o| o.connector).expect("connector");
    let marker = h.engine.marker_screen_position(0).expect("on screen");
    assert!((wide.marker_px - marker).length() < 1e-9);
    assert!((h.engine.camera().aspect - 1600.0 / 600.0).abs() < 1e-12);

    h.click(5.0, 5.0);
    h.run_for(400.0, 16.0);
    assert!(h.engine.output().and_then(|o| o.connector).is_none());
}

#[test]
fn card_placed_after_opening_anchors_the_first_connector() {
    let mut h = Harness::new(GlobeConfig::default());
    h.finish_intro();
    assert_eq!(h.engine.panel(), PanelVisibility::Hidden);

    // A hidden card has no layout box, so the host only learns its origin
    // once the panel is open and before the next frame.
    assert_eq!(h.click_marker(0), PointerOutcome::Selected(0));
    assert_eq!(h.engine.panel(), PanelVisibility::Open);
    h.engine.set_card_origin(500.0, 100.0);
    h.step(16.0);
    let first = h.engine.output().and_then(|o| o.connector).expect("connector");
    assert_eq!(first.anchor_px, Vec2::new(524.0, 140.0));

    h.engine.set_card_origin(320.0, 260.0);
    h.step(16.0);
    let moved = h.engine.output().and_then(|o| o.connector).expect("connector");
    assert_eq!(moved.anchor_px, Vec2::new(344.0, 300.0));
}

#[test]
fn outlines_are_applied_on_a_later_frame() {
    let mut h = Harness::new(GlobeConfig::default());
    h.step(16.0);
    let request = h.engine.begin_outline_load().expect("request");
    assert_eq!(request.url, "/data/world-110m.json");
    assert!(h.engine.begin_outline_load().is_none());

    let nodes_before = h.engine.scene().node_count();
    assert!(h.engine.deliver_outline(request.ticket, Ok(TOPOLOGY.to_string())));
    assert_eq!(h.engine.scene().node_count(), nodes_before);

    h.step(16.0);
    assert_eq!(h.engine.scene().node_count(), nodes_before + 2);
    assert_eq!(h.engine.state().outline_nodes().len(), 2);
    assert!(h
        .events
        .iter()
        .any(|e| matches!(e, GlobeEvent::OutlinesApplied { segments } if *segments > 0)));

    h.finish_intro();
    let lines = h.engine.output().expect("frame").render.pass(RenderPass::Lines).count();
    assert_eq!(lines, 3);
}

#[test]
fn outline_failure_leaves_markers_working() {
    let mut h = Harness::new(GlobeConfig::default());
    let request = h.engine.begin_outline_load().expect("request");
    assert!(!h
        .engine
        .deliver_outline(request.ticket, Err(OutlineError::Fetch("404".to_string()))));
    assert!(h.events.is_empty());
    h.collect();
    assert!(h
        .events
        .iter()
        .any(|e| matches!(e, GlobeEvent::OutlinesUnavailable { .. })));

    h.finish_intro();
    assert_eq!(h.click_marker(1), PointerOutcome::Selected(1));
}

#[test]
fn teardown_is_idempotent_and_discards_late_results() {
    let mut h = Harness::new(GlobeConfig::default());
    h.step(16.0);
    let request = h.engine.begin_outline_load().expect("request");

    let report = h.engine.teardown().expect("first teardown");
    assert!(report.nodes > 0);
    assert!(report.geometries > 0);
    assert!(h.engine.teardown().is_none());
    assert!(h.engine.is_torn_down());
    assert!(h.engine.scene().is_empty());

    assert!(!h.engine.deliver_outline(request.ticket, Ok(TOPOLOGY.to_string())));
    assert!(h.engine.frame(h.now_ms + 16.0).is_none());
    assert!(h.engine.output().is_none());
    assert_eq!(h.engine.scene().node_count(), 0);
    assert_eq!(h.click(400.0, 300.0), PointerOutcome::Ignored);
    assert!(h.engine.begin_outline_load().is_none());

    h.collect();
    assert_eq!(h.count(&GlobeEvent::TornDown), 1);
    assert!(!h.events.iter().any(|e| matches!(e, GlobeEvent::OutlinesApplied { .. })));
}

#[test]
fn disabled_intro_is_interactive_after_first_frame() {
    let config =
        GlobeConfig::from_json_str(r#"{ "intro": { "enabled": false } }"#).expect("config");
    let mut h = Harness::new(config);
    h.step(16.0);
    assert_eq!(h.engine.intro_state(), IntroState::Complete);
    assert_eq!(h.events, vec![GlobeEvent::IntroCompleted]);
    assert_eq!(h.click_marker(0), PointerOutcome::Selected(0));
}

#[test]
fn slow_hosts_keep_wall_clock_timing() {
    let mut h = Harness::new(GlobeConfig::default());
    h.run_for(9_000.0, 250.0);
    assert_eq!(h.engine.intro_state(), IntroState::Playing);
    h.run_for(500.0, 250.0);
    assert_eq!(h.engine.intro_state(), IntroState::Complete);
    assert_eq!(h.count(&GlobeEvent::IntroCompleted), 1);

    assert_eq!(h.click_marker(1), PointerOutcome::Selected(1));
    h.step(250.0);
    assert_eq!(h.click(5.0, 5.0), PointerOutcome::Closing);
    h.step(250.0);
    assert_eq!(h.engine.selection(), Some(1));
    h.step(250.0);
    assert_eq!(h.engine.selection(), None);
    assert_eq!(h.count(&GlobeEvent::SelectionCleared { marker: 1 }), 1);
}
