use serde_json::Value;

/// A longitude/latitude pair in degrees, in GeoJSON axis order.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GeoPoint {
    pub lon_deg: f64,
    pub lat_deg: f64,
}

impl GeoPoint {
    pub fn new(lon_deg: f64, lat_deg: f64) -> Self {
        Self { lon_deg, lat_deg }
    }
}

pub type Ring = Vec<GeoPoint>;

/// Country boundary rings, flattened out of their polygons. Interior rings
/// (holes) are kept; they are drawn like any other border.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutlineRings {
    pub rings: Vec<Ring>,
}

impl OutlineRings {
    /// Decodes either a TopoJSON `Topology` (reading `object`) or a GeoJSON
    /// `FeatureCollection`.
    pub fn from_json_str(payload: &str, object: &str) -> Result<Self, OutlineError> {
        let value: Value =
            serde_json::from_str(payload).map_err(|e| OutlineError::Json(e.to_string()))?;
        Self::from_json_value(&value, object)
    }

    pub fn from_json_value(value: &Value, object: &str) -> Result<Self, OutlineError> {
        let ty = value
            .get("type")
            .and_then(|v| v.as_str())
            .ok_or(OutlineError::UnsupportedDocument(None))?;
        match ty {
            "Topology" => crate::topology::decode_topology(value, object),
            "FeatureCollection" => crate::geojson::decode_feature_collection(value),
            other => Err(OutlineError::UnsupportedDocument(Some(other.to_string()))),
        }
    }

    pub fn ring_count(&self) -> usize {
        self.rings.len()
    }

    pub fn point_count(&self) -> usize {
        self.rings.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rings.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum OutlineError {
    /// Transport failure before any payload was read.
    Fetch(String),
    Json(String),
    UnsupportedDocument(Option<String>),
    MissingObject(String),
    InvalidArc { index: usize, reason: String },
    InvalidGeometry { index: usize, reason: String },
}

impl std::fmt::Display for OutlineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutlineError::Fetch(e) => write!(f, "outline fetch failed: {e}"),
            OutlineError::Json(e) => write!(f, "outline is not valid JSON: {e}"),
            OutlineError::UnsupportedDocument(Some(ty)) => {
                write!(f, "expected Topology or FeatureCollection, got {ty}")
            }
            OutlineError::UnsupportedDocument(None) => {
                write!(f, "expected Topology or FeatureCollection")
            }
            OutlineError::MissingObject(name) => write!(f, "topology has no object named {name}"),
            OutlineError::InvalidArc { index, reason } => {
                write!(f, "invalid arc at index {index}: {reason}")
            }
            OutlineError::InvalidGeometry { index, reason } => {
                write!(f, "invalid geometry at index {index}: {reason}")
            }
        }
    }
}

impl std::error::Error for OutlineError {}
