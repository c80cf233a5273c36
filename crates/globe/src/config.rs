use serde::Deserialize;

/// Every tuning constant of the globe. Each section falls back to its
/// defaults field by field, so a host override only names what it changes.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GlobeConfig {
    pub globe: GlobeSection,
    pub markers: MarkerConfig,
    pub outlines: OutlineConfig,
    pub camera: CameraConfig,
    pub motion: MotionConfig,
    pub overlay: OverlayConfig,
    pub activation: ActivationConfig,
    pub intro: IntroConfig,
    pub decor: DecorConfig,
    /// `tracing` filter directive used by the web mount.
    pub log_level: String,
}

impl Default for GlobeConfig {
    fn default() -> Self {
        Self {
            globe: GlobeSection::default(),
            markers: MarkerConfig::default(),
            outlines: OutlineConfig::default(),
            camera: CameraConfig::default(),
            motion: MotionConfig::default(),
            overlay: OverlayConfig::default(),
            activation: ActivationConfig::default(),
            intro: IntroConfig::default(),
            decor: DecorConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GlobeSection {
    pub radius: f64,
    pub segments: u32,
    /// Fixed rotation of the globe group about +Y, in degrees.
    pub rotation_offset_deg: f64,
    pub wireframe_opacity: f32,
    pub atmosphere_scale: f64,
    pub atmosphere_opacity: f32,
}

impl Default for GlobeSection {
    fn default() -> Self {
        Self {
            radius: 1.55,
            segments: 96,
            rotation_offset_deg: -90.0,
            wireframe_opacity: 0.25,
            atmosphere_scale: 1.04,
            atmosphere_opacity: 0.18,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MarkerConfig {
    pub radius: f64,
    /// Height above the globe surface.
    pub altitude: f64,
    pub segments: u32,
    /// Pulse phase offset per record index, in radians.
    pub phase_step: f64,
    pub pulse_amplitude: f64,
    /// Radians per second.
    pub pulse_frequency: f64,
    pub color: u32,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            radius: 0.015,
            altitude: 0.02,
            segments: 16,
            phase_step: 0.7,
            pulse_amplitude: 0.25,
            pulse_frequency: 2.0,
            color: 0x60e4ff,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct OutlineConfig {
    pub enabled: bool,
    pub url: String,
    /// Topology object holding the country geometries.
    pub object: String,
    pub altitude: f64,
    pub color: u32,
    pub line_opacity: f32,
    pub glow_opacity: f32,
}

impl Default for OutlineConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: "/data/world-110m.json".to_string(),
            object: "countries".to_string(),
            altitude: 0.012,
            color: 0x60e4ff,
            line_opacity: 0.38,
            glow_opacity: 0.16,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub fov_deg: f64,
    pub near: f64,
    pub far: f64,
    /// Distance from the origin once the intro has finished.
    pub final_distance: f64,
    pub min_distance: f64,
    pub max_distance: f64,
    /// Fraction of the remaining orbit velocity consumed per update.
    pub damping: f64,
    pub rotate_speed: f64,
    pub zoom_speed: f64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_deg: 45.0,
            near: 0.1,
            far: 100.0,
            final_distance: 3.6,
            min_distance: 2.6,
            max_distance: 5.2,
            damping: 0.05,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Globe spin while idle, in radians per second.
    pub idle_spin_rad_per_s: f64,
    /// Slerp fraction per 60 Hz frame while focusing a marker.
    pub focus_rate: f64,
    pub focus_epsilon_rad: f64,
    pub close_delay_ms: f64,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            idle_spin_rad_per_s: 0.036,
            focus_rate: 0.08,
            focus_epsilon_rad: 0.001,
            close_delay_ms: 260.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Connector anchor relative to the card's top-left corner, in CSS pixels.
    pub card_anchor_x: f64,
    pub card_anchor_y: f64,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            card_anchor_x: 24.0,
            card_anchor_y: 40.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ActivationConfig {
    /// `IntersectionObserver` root margin.
    pub root_margin: String,
}

impl Default for ActivationConfig {
    fn default() -> Self {
        Self {
            root_margin: "200px".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct IntroConfig {
    pub enabled: bool,
    pub total_duration_s: f64,
    pub start_position: [f64; 3],
    pub phases: Vec<PhaseConfig>,
}

impl Default for IntroConfig {
    fn default() -> Self {
        let phase = |name: &str, start_s, duration_s| PhaseConfig {
            name: name.to_string(),
            start_s,
            duration_s,
            curve: Curve::EaseInOutCubic,
        };
        Self {
            enabled: true,
            total_duration_s: 9.0,
            start_position: [0.0, 6.0, 48.0],
            phases: vec![
                phase(PHASE_GALAXY_IN, 0.0, 1.5),
                phase(PHASE_GALAXY_OUT, 2.5, 1.5),
                phase(PHASE_SOLAR_IN, 3.0, 1.5),
                phase(PHASE_SOLAR_OUT, 5.5, 1.5),
                phase(PHASE_PLANET_IN, 6.0, 2.0),
            ],
        }
    }
}

pub const PHASE_GALAXY_IN: &str = "galaxy_in";
pub const PHASE_GALAXY_OUT: &str = "galaxy_out";
pub const PHASE_SOLAR_IN: &str = "solar_in";
pub const PHASE_SOLAR_OUT: &str = "solar_out";
pub const PHASE_PLANET_IN: &str = "planet_in";

/// Phase names the intro composes its layers from.
pub const REQUIRED_PHASES: [&str; 5] = [
    PHASE_GALAXY_IN,
    PHASE_GALAXY_OUT,
    PHASE_SOLAR_IN,
    PHASE_SOLAR_OUT,
    PHASE_PLANET_IN,
];

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PhaseConfig {
    pub name: String,
    pub start_s: f64,
    pub duration_s: f64,
    #[serde(default)]
    pub curve: Curve,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Curve {
    Linear,
    #[default]
    EaseInOutCubic,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DecorConfig {
    pub star_count: u32,
    pub galaxy_count: u32,
    pub seed: u32,
}

impl Default for DecorConfig {
    fn default() -> Self {
        Self {
            star_count: 600,
            galaxy_count: 4000,
            seed: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    Json(String),
    /// A value is out of its allowed range.
    Invalid { field: &'static str, reason: String },
    MissingPhase(&'static str),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Json(e) => write!(f, "config is not valid JSON: {e}"),
            ConfigError::Invalid { field, reason } => write!(f, "invalid {field}: {reason}"),
            ConfigError::MissingPhase(name) => write!(f, "intro phase table lacks {name}"),
        }
    }
}

impl std::error::Error for ConfigError {}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, format!("must be positive, got {value}")))
    }
}

impl GlobeConfig {
    /// Parses a host override and validates it. An empty or blank payload
    /// yields the defaults.
    pub fn from_json_str(payload: &str) -> Result<Self, ConfigError> {
        if payload.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self =
            serde_json::from_str(payload).map_err(|e| ConfigError::Json(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("globe.radius", self.globe.radius)?;
        if self.globe.segments < 3 {
            return Err(invalid("globe.segments", "needs at least 3"));
        }
        positive("markers.radius", self.markers.radius)?;
        if self.markers.altitude < 0.0 || self.outlines.altitude < 0.0 {
            return Err(invalid("altitude", "must not be negative"));
        }

        let cam = &self.camera;
        positive("camera.fov_deg", cam.fov_deg)?;
        if cam.fov_deg >= 180.0 {
            return Err(invalid("camera.fov_deg", "must be below 180"));
        }
        positive("camera.near", cam.near)?;
        if cam.far <= cam.near {
            return Err(invalid("camera.far", "must exceed near"));
        }
        if cam.min_distance <= self.globe.radius {
            return Err(invalid("camera.min_distance", "must keep the camera outside the globe"));
        }
        if !(cam.min_distance <= cam.final_distance && cam.final_distance <= cam.max_distance) {
            return Err(invalid(
                "camera.final_distance",
                format!(
                    "{} is outside [{}, {}]",
                    cam.final_distance, cam.min_distance, cam.max_distance
                ),
            ));
        }
        if !(0.0..1.0).contains(&cam.damping) {
            return Err(invalid("camera.damping", "must be in [0, 1)"));
        }

        let motion = &self.motion;
        if !(motion.focus_rate > 0.0 && motion.focus_rate <= 1.0) {
            return Err(invalid("motion.focus_rate", "must be in (0, 1]"));
        }
        positive("motion.focus_epsilon_rad", motion.focus_epsilon_rad)?;
        if motion.close_delay_ms < 0.0 {
            return Err(invalid("motion.close_delay_ms", "must not be negative"));
        }

        let intro = &self.intro;
        positive("intro.total_duration_s", intro.total_duration_s)?;
        for phase in &intro.phases {
            let end = phase.start_s + phase.duration_s;
            if phase.start_s < 0.0 || phase.duration_s < 0.0 || end > intro.total_duration_s {
                return Err(invalid(
                    "intro.phases",
                    format!("{} does not fit in {} s", phase.name, intro.total_duration_s),
                ));
            }
        }
        for name in REQUIRED_PHASES {
            if !intro.phases.iter().any(|p| p.name == name) {
                return Err(ConfigError::MissingPhase(name));
            }
        }
        Ok(())
    }

    pub fn close_delay_s(&self) -> f64 {
        self.motion.close_delay_ms / 1000.0
    }
}
