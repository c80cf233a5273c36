use formats::{CaseRecord, OutlineError, validate_cases};
use foundation::math::{Quat, Vec2, Vec3};
use foundation::time::Time;
use gpu::{Camera3D, RenderFrame, Renderer, Viewport};
use runtime::{Event, EventBus, Frame, FrameClock, Job, Scheduler};
use scene::components::{Color, Geometry, Material};
use scene::prefabs::{
    GalaxyStyle, GlobePrefab, GlobeStyle, SolarSystemPrefab, SolarSystemStyle, StarfieldStyle,
    spawn_galaxy, spawn_globe, spawn_solar_system, spawn_starfield,
};
use scene::{DisposalReport, Fade, NodeId, Released, SceneError, SceneGraph, Source};
use tracing::{debug, info, warn};

use crate::activation::ActivationGate;
use crate::camera::{FocusAnimator, IntroCameraPath, OrbitController};
use crate::config::GlobeConfig;
use crate::error::GlobeError;
use crate::hit_test::HitTester;
use crate::intro::{IntroFrame, IntroSequencer, IntroState, IntroStep};
use crate::markers::MarkerRegistry;
use crate::outline_loader::{OutlineLoader, OutlineOutcome, OutlineTicket, outline_segments};
use crate::overlay::{ConnectorGeometry, OverlayProjector};
use crate::selection::{PanelVisibility, SelectionState};

#[derive(Debug, Clone, PartialEq)]
pub enum GlobeEvent {
    IntroCompleted,
    CaseSelected { marker: usize, id: String },
    SelectionClosing { marker: usize },
    SelectionCleared { marker: usize },
    FocusReached { marker: usize },
    OutlinesApplied { segments: usize },
    OutlinesUnavailable { reason: String },
    Resized { width: f64, height: f64 },
    TornDown,
}

/// Everything the host needs to present one frame.
#[derive(Debug, Clone)]
pub struct FrameOutput {
    pub frame: Frame,
    pub intro: IntroState,
    pub render: RenderFrame,
    pub connector: Option<ConnectorGeometry>,
    pub selection: Option<usize>,
    pub panel: PanelVisibility,
    /// Scene resources freed since the previous frame.
    pub released: Vec<Released>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PointerOutcome {
    /// Intro still playing or engine torn down.
    Ignored,
    Selected(usize),
    /// Empty space hit while a selection was active.
    Closing,
    Missed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineRequest {
    pub ticket: OutlineTicket,
    pub url: String,
}

/// Decorative layers that only exist during the intro, plus the starfield
/// that fades in with them and stays.
#[derive(Debug)]
struct IntroDecor {
    stars: Fade,
    galaxy: Option<(NodeId, Fade)>,
    solar: Option<(SolarSystemPrefab, Fade)>,
}

impl IntroDecor {
    fn apply(&self, scene: &mut SceneGraph, frame: &IntroFrame) {
        self.stars.apply(scene, frame.stars);
        if let Some((_, fade)) = &self.galaxy {
            fade.apply(scene, frame.galaxy);
        }
        if let Some((solar, fade)) = &self.solar {
            fade.apply(scene, frame.solar);
            solar.animate(scene, frame.elapsed_s);
        }
    }

    /// Drops the intro-only layers and leaves the stars at full strength.
    fn release(&mut self, scene: &mut SceneGraph) -> Result<DisposalReport, SceneError> {
        self.stars.apply(scene, 1.0);
        let mut report = DisposalReport::default();
        if let Some((node, _)) = self.galaxy.take() {
            report.merge(scene.remove_subtree(node)?);
        }
        if let Some((solar, _)) = self.solar.take() {
            report.merge(scene.remove_subtree(solar.group)?);
        }
        Ok(report)
    }
}

/// All mutable engine state, threaded through every per-frame job.
#[derive(Debug)]
pub struct EngineState {
    pub config: GlobeConfig,
    pub scene: SceneGraph,
    pub globe: GlobePrefab,
    pub markers: MarkerRegistry,
    pub intro: IntroSequencer,
    pub intro_path: IntroCameraPath,
    pub orbit: OrbitController,
    pub focus: FocusAnimator,
    pub selection: SelectionState,
    pub camera: Camera3D,
    pub viewport: Viewport,
    /// Top-left corner of the detail card, container-relative.
    pub card_origin: Vec2,
    pub connector: Option<ConnectorGeometry>,
    pub outlines: OutlineLoader,
    decor: IntroDecor,
    planet: Fade,
    planet_factor: f64,
    pending_outline: Option<Vec<[Vec3; 2]>>,
    outline_nodes: Vec<NodeId>,
    focus_marker: Option<usize>,
    now: Time,
}

impl EngineState {
    pub fn globe_rotation(&self) -> Quat {
        self.scene
            .node(self.globe.group)
            .map_or(Quat::IDENTITY, |n| n.transform.rotation)
    }

    fn set_globe_rotation(&mut self, rotation: Quat) {
        if let Some(n) = self.scene.node_mut(self.globe.group) {
            n.transform.rotation = rotation;
        }
    }

    pub fn card_anchor(&self) -> Vec2 {
        self.card_origin
            + Vec2::new(
                self.config.overlay.card_anchor_x,
                self.config.overlay.card_anchor_y,
            )
    }

    pub fn final_camera_position(&self) -> Vec3 {
        Vec3::new(0.0, 0.0, self.config.camera.final_distance)
    }

    pub fn outline_nodes(&self) -> &[NodeId] {
        &self.outline_nodes
    }

    /// One shared line geometry drawn twice: a faint glow and the line itself.
    fn spawn_outlines(&mut self, segments: Vec<[Vec3; 2]>) -> Result<(), SceneError> {
        let cfg = &self.config.outlines;
        let color = Color::from_hex(cfg.color);
        let passes = [
            ("outlines.glow", cfg.glow_opacity, 1),
            ("outlines.line", cfg.line_opacity, 2),
        ];
        let geometry = self.scene.add_shared_geometry(Geometry::LineSegments { segments });

        let mut nodes = Vec::with_capacity(passes.len());
        for (name, opacity, order) in passes {
            let node = self.scene.spawn_mesh(
                Some(self.globe.group),
                name,
                Source::Share(geometry),
                Source::Own(Material::line(color, opacity)),
            )?;
            if let Some(n) = self.scene.node_mut(node) {
                n.render_order = order;
            }
            nodes.push(node);
        }

        let fade = Fade::collect(&self.scene, &nodes);
        fade.apply(&mut self.scene, self.planet_factor);
        self.planet.merge(fade);
        self.outline_nodes = nodes;
        Ok(())
    }

    fn finish_intro(&mut self) {
        match self.decor.release(&mut self.scene) {
            Ok(report) => debug!(nodes = report.nodes, "intro.decor_released"),
            Err(e) => warn!(error = %e, "intro.decor_release_failed"),
        }
        self.planet.apply(&mut self.scene, 1.0);
        self.planet_factor = 1.0;

        let home = self.final_camera_position();
        self.camera.position = home;
        self.camera.target = Vec3::ZERO;
        self.orbit.set_position(home);
        self.orbit.set_enabled(true);
        info!("intro.complete");
    }
}

fn apply_outlines(state: &mut EngineState, frame: Frame, bus: &mut EventBus<GlobeEvent>) {
    let Some(segments) = state.pending_outline.take() else {
        return;
    };
    let count = segments.len();
    match state.spawn_outlines(segments) {
        Ok(()) => {
            debug!(segments = count, "outlines.applied");
            bus.emit(frame, GlobeEvent::OutlinesApplied { segments: count });
        }
        Err(e) => warn!(error = %e, "outlines.spawn_failed"),
    }
}

fn run_intro(state: &mut EngineState, frame: Frame, bus: &mut EventBus<GlobeEvent>) {
    match state.intro.advance(frame.wall.seconds()) {
        IntroStep::Playing(f) => {
            state.decor.apply(&mut state.scene, &f);
            state.planet.apply(&mut state.scene, f.planet);
            state.planet_factor = f.planet;
            state.camera.position = state.intro_path.position(f.overall);
        }
        IntroStep::JustCompleted => {
            state.finish_intro();
            bus.emit(frame, GlobeEvent::IntroCompleted);
        }
        IntroStep::Complete => {}
    }
}

fn run_selection(state: &mut EngineState, frame: Frame, bus: &mut EventBus<GlobeEvent>) {
    let Some(marker) = state.selection.tick(frame.wall) else {
        return;
    };
    state.focus.cancel();
    state.focus_marker = None;
    debug!(marker, "selection.cleared");
    bus.emit(frame, GlobeEvent::SelectionCleared { marker });
}

fn run_camera(state: &mut EngineState, frame: Frame, bus: &mut EventBus<GlobeEvent>) {
    state.camera.aspect = state.viewport.aspect();
    if !state.intro.is_complete() {
        return;
    }

    let rotation = state.globe_rotation();
    if let Some(step) = state.focus.step(rotation, frame.dt_s) {
        state.set_globe_rotation(step.rotation);
        if step.reached {
            if let Some(marker) = state.focus_marker {
                bus.emit(frame, GlobeEvent::FocusReached { marker });
            }
        }
    } else if state.selection.active().is_none() {
        let spin = Quat::from_rotation_y(state.config.motion.idle_spin_rad_per_s * frame.dt_s);
        state.set_globe_rotation((spin * rotation).normalize());
    }

    let free = state.selection.active().is_none() && !state.focus.is_pending();
    state.orbit.set_rotate_enabled(free);
    state.camera.position = state.orbit.update();
}

fn run_markers(state: &mut EngineState, frame: Frame, _bus: &mut EventBus<GlobeEvent>) {
    state.markers.pulse(&mut state.scene, frame.time.seconds());
}

fn run_overlay(state: &mut EngineState, _frame: Frame, _bus: &mut EventBus<GlobeEvent>) {
    let anchor = state.card_anchor();
    state.connector = state.selection.active().and_then(|index| {
        let node = state.markers.marker(index)?.node;
        let world = state.scene.world_position(node)?;
        OverlayProjector::project(&state.camera, world, &state.viewport, anchor)
    });
}

/// Owns the scene and runs it one host frame at a time.
///
/// Per frame: apply finished outline loads, advance the intro, settle the
/// selection timer, move the camera and globe, pulse markers, project the
/// overlay, then collect draw commands.
pub struct GlobeEngine {
    state: EngineState,
    scheduler: Scheduler<EngineState, GlobeEvent>,
    bus: EventBus<GlobeEvent>,
    clock: FrameClock,
    hit_tester: HitTester,
    output: Option<FrameOutput>,
    last_frame_index: u64,
    torn_down: bool,
}

impl GlobeEngine {
    pub fn new(
        gate: &ActivationGate,
        config: GlobeConfig,
        records: Vec<CaseRecord>,
        viewport: Viewport,
    ) -> Result<Self, GlobeError> {
        if !gate.is_supported() {
            return Err(GlobeError::Unsupported);
        }
        if !gate.is_authorized() {
            return Err(GlobeError::NotAuthorized);
        }
        config.validate()?;
        validate_cases(&records)?;

        let mut scene = SceneGraph::new();
        let globe = spawn_globe(
            &mut scene,
            &GlobeStyle {
                radius: config.globe.radius,
                segments: config.globe.segments,
                rotation_offset_rad: config.globe.rotation_offset_deg.to_radians(),
                wireframe_opacity: config.globe.wireframe_opacity,
                atmosphere_scale: config.globe.atmosphere_scale,
                atmosphere_opacity: config.globe.atmosphere_opacity,
                ..GlobeStyle::default()
            },
        )?;
        let markers = MarkerRegistry::build(
            &mut scene,
            globe.group,
            records,
            &config.markers,
            config.globe.radius,
        )?;

        let stars = spawn_starfield(
            &mut scene,
            None,
            &StarfieldStyle {
                count: config.decor.star_count,
                seed: config.decor.seed,
                ..StarfieldStyle::default()
            },
        )?;
        let galaxy = spawn_galaxy(
            &mut scene,
            None,
            &GalaxyStyle {
                count: config.decor.galaxy_count,
                seed: config.decor.seed.wrapping_add(6),
                ..GalaxyStyle::default()
            },
        )?;
        let solar = spawn_solar_system(&mut scene, None, &SolarSystemStyle::default())?;

        let mut decor = IntroDecor {
            stars: Fade::collect(&scene, &[stars]),
            galaxy: Some((galaxy, Fade::collect(&scene, &[galaxy]))),
            solar: {
                let fade = Fade::collect(&scene, &[solar.group]);
                Some((solar, fade))
            },
        };
        let planet = Fade::collect(&scene, &[globe.group]);

        let intro = IntroSequencer::from_config(&config.intro);
        let [sx, sy, sz] = config.intro.start_position;
        let home = Vec3::new(0.0, 0.0, config.camera.final_distance);
        let intro_path = IntroCameraPath::new(Vec3::new(sx, sy, sz), home);

        let planet_factor = if config.intro.enabled {
            decor.apply(&mut scene, &intro.timeline().sample(0.0));
            planet.apply(&mut scene, 0.0);
            0.0
        } else {
            decor.release(&mut scene)?;
            1.0
        };

        let start = if config.intro.enabled { intro_path.start } else { home };
        let camera = Camera3D::look_at(
            start,
            Vec3::ZERO,
            config.camera.fov_deg.to_radians(),
            config.camera.near,
            config.camera.far,
        )
        .with_aspect(viewport.aspect());

        let orbit = OrbitController::new(home, &config.camera);
        let focus = FocusAnimator::new(config.motion.focus_rate, config.motion.focus_epsilon_rad);
        let selection = SelectionState::new(config.close_delay_s());
        let outlines = OutlineLoader::new(config.outlines.object.clone());

        let mut scheduler = Scheduler::new();
        scheduler.add_job(Job::with_priority("outlines.apply", -10, apply_outlines));
        scheduler.add_job(Job::with_priority("intro", 0, run_intro));
        scheduler.add_job(Job::with_priority("selection", 5, run_selection));
        scheduler.add_job(Job::with_priority("camera", 10, run_camera));
        scheduler.add_job(Job::with_priority("markers.pulse", 20, run_markers));
        scheduler.add_job(Job::with_priority("overlay", 30, run_overlay));

        info!(
            markers = markers.len(),
            nodes = scene.node_count(),
            intro = config.intro.enabled,
            "engine.constructed"
        );

        Ok(Self {
            state: EngineState {
                config,
                scene,
                globe,
                markers,
                intro,
                intro_path,
                orbit,
                focus,
                selection,
                camera,
                viewport,
                card_origin: Vec2::default(),
                connector: None,
                outlines,
                decor,
                planet,
                planet_factor,
                pending_outline: None,
                outline_nodes: Vec::new(),
                focus_marker: None,
                now: Time(0.0),
            },
            scheduler,
            bus: EventBus::new(),
            clock: FrameClock::new(),
            hit_tester: HitTester::default(),
            output: None,
            last_frame_index: 0,
            torn_down: false,
        })
    }

    /// Advances one frame from a host timestamp in milliseconds. Returns
    /// `None` once torn down.
    pub fn frame(&mut self, timestamp_ms: f64) -> Option<&FrameOutput> {
        if self.torn_down {
            return None;
        }
        let frame = self.clock.tick(timestamp_ms);
        self.state.now = frame.wall;
        self.last_frame_index = frame.index;
        self.scheduler.run_frame(&mut self.state, frame, &mut self.bus);

        let render = Renderer::collect(&self.state.scene, &self.state.camera);
        self.output = Some(FrameOutput {
            frame,
            intro: self.state.intro.state(),
            render,
            connector: self.state.connector,
            selection: self.state.selection.active(),
            panel: self.state.selection.panel(),
            released: self.state.scene.drain_released(),
        });
        self.output.as_ref()
    }

    fn emit(&mut self, payload: GlobeEvent) {
        self.bus.emit_at(self.last_frame_index, payload);
    }

    fn accepts_input(&self) -> bool {
        !self.torn_down && self.state.intro.is_complete()
    }

    pub fn pointer_down(&mut self, x_px: f64, y_px: f64) -> PointerOutcome {
        if !self.accepts_input() {
            return PointerOutcome::Ignored;
        }
        self.state.orbit.drag_start(x_px, y_px);
        let hit = self.hit_tester.hit(
            &self.state.scene,
            &self.state.markers,
            &self.state.camera,
            &self.state.viewport,
            x_px,
            y_px,
        );
        match hit {
            Some(hit) => {
                self.select(hit.marker);
                PointerOutcome::Selected(hit.marker)
            }
            None if self.state.selection.active().is_some() => {
                self.begin_close();
                PointerOutcome::Closing
            }
            None => PointerOutcome::Missed,
        }
    }

    pub fn pointer_move(&mut self, x_px: f64, y_px: f64) {
        if self.accepts_input() {
            let height = self.state.viewport.height;
            self.state.orbit.drag(x_px, y_px, height);
        }
    }

    pub fn pointer_up(&mut self) {
        self.state.orbit.drag_end();
    }

    pub fn wheel(&mut self, delta_y: f64) {
        if self.accepts_input() {
            self.state.orbit.zoom(delta_y);
        }
    }

    /// Escape key.
    pub fn escape(&mut self) -> bool {
        self.close()
    }

    /// Card close button.
    pub fn close(&mut self) -> bool {
        self.accepts_input() && self.begin_close()
    }

    pub fn skip_intro(&mut self) {
        if !self.torn_down {
            self.state.intro.skip();
        }
    }

    pub fn resize(&mut self, width: f64, height: f64, pixel_ratio: f64) {
        if self.torn_down {
            return;
        }
        let viewport = Viewport::new(width, height, pixel_ratio);
        self.state.viewport = viewport;
        self.state.camera.aspect = viewport.aspect();
        self.emit(GlobeEvent::Resized {
            width: viewport.width,
            height: viewport.height,
        });
    }

    pub fn set_card_origin(&mut self, x_px: f64, y_px: f64) {
        self.state.card_origin = Vec2::new(x_px, y_px);
    }

    fn select(&mut self, marker: usize) {
        let state = &mut self.state;
        let Some(m) = state.markers.marker(marker).copied() else {
            return;
        };
        let previous = state.selection.open(marker);
        let rotation = state.globe_rotation();
        let toward = (state.camera.position - state.camera.target).normalize_or_zero();
        state.focus.begin(rotation, m.position, toward);
        state.focus_marker = Some(marker);
        state.orbit.set_rotate_enabled(false);
        let id = state
            .markers
            .record(marker)
            .map(|r| r.id.clone())
            .unwrap_or_default();
        debug!(marker, ?previous, id = %id, "selection.open");
        self.emit(GlobeEvent::CaseSelected { marker, id });
    }

    fn begin_close(&mut self) -> bool {
        let Some(marker) = self.state.selection.active() else {
            return false;
        };
        if !self.state.selection.begin_close(self.state.now) {
            return false;
        }
        debug!(marker, "selection.closing");
        self.emit(GlobeEvent::SelectionClosing { marker });
        true
    }

    /// Starts the outline fetch. The host performs the request and hands the
    /// result to [`GlobeEngine::deliver_outline`].
    pub fn begin_outline_load(&mut self) -> Option<OutlineRequest> {
        if self.torn_down || !self.state.config.outlines.enabled {
            return None;
        }
        let ticket = self.state.outlines.begin()?;
        Some(OutlineRequest {
            ticket,
            url: self.state.config.outlines.url.clone(),
        })
    }

    /// Hands over a finished fetch. Geometry is added on the next frame.
    /// Returns whether anything will be applied.
    pub fn deliver_outline(
        &mut self,
        ticket: OutlineTicket,
        payload: Result<String, OutlineError>,
    ) -> bool {
        match self.state.outlines.complete(ticket, payload) {
            OutlineOutcome::Decoded(rings) => {
                let radius = self.state.config.globe.radius + self.state.config.outlines.altitude;
                let segments = outline_segments(&rings.rings, radius);
                debug!(rings = rings.ring_count(), segments = segments.len(), "outlines.decoded");
                self.state.pending_outline = Some(segments);
                true
            }
            OutlineOutcome::Unavailable(e) => {
                warn!(error = %e, "outlines.unavailable");
                self.emit(GlobeEvent::OutlinesUnavailable {
                    reason: e.to_string(),
                });
                false
            }
            OutlineOutcome::Discarded => false,
        }
    }

    pub fn drain_events(&mut self) -> Vec<Event<GlobeEvent>> {
        self.bus.drain()
    }

    /// Releases every scene resource and stops all further work. The second
    /// and later calls return `None`.
    pub fn teardown(&mut self) -> Option<DisposalReport> {
        if self.torn_down {
            return None;
        }
        self.torn_down = true;
        self.state.outlines.dispose();
        self.state.pending_outline = None;
        self.state.selection.clear();
        self.state.focus.cancel();
        self.state.orbit.set_enabled(false);
        self.state.connector = None;
        self.state.outline_nodes.clear();
        self.scheduler.clear();
        self.output = None;

        let report = self.state.scene.dispose_all();
        self.state.scene.drain_released();
        info!(
            nodes = report.nodes,
            geometries = report.geometries,
            materials = report.materials,
            "engine.teardown"
        );
        self.emit(GlobeEvent::TornDown);
        Some(report)
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn output(&self) -> Option<&FrameOutput> {
        self.output.as_ref()
    }

    pub fn intro_state(&self) -> IntroState {
        self.state.intro.state()
    }

    pub fn selection(&self) -> Option<usize> {
        self.state.selection.active()
    }

    pub fn selected_record(&self) -> Option<&CaseRecord> {
        self.selection().and_then(|i| self.state.markers.record(i))
    }

    pub fn panel(&self) -> PanelVisibility {
        self.state.selection.panel()
    }

    pub fn camera(&self) -> &Camera3D {
        &self.state.camera
    }

    pub fn scene(&self) -> &SceneGraph {
        &self.state.scene
    }

    pub fn markers(&self) -> &MarkerRegistry {
        &self.state.markers
    }

    pub fn focus_angle(&self) -> Option<f64> {
        self.state.focus.angle_to_target(self.state.globe_rotation())
    }

    /// Where marker `index` currently appears, in container pixels.
    pub fn marker_screen_position(&self, index: usize) -> Option<Vec2> {
        let node = self.state.markers.marker(index)?.node;
        let world = self.state.scene.world_position(node)?;
        let ndc = self.state.camera.project(world)?;
        Some(self.state.viewport.to_pixels(Vec2::new(ndc.x, ndc.y)))
    }

    pub fn job_order(&mut self) -> Vec<&'static str> {
        self.scheduler.order()
    }
}
