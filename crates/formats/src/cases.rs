use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Moderate,
    High,
    Critical,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CaseStatus {
    Unresolved,
    #[serde(rename = "Likely Explained")]
    LikelyExplained,
    Unknown,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseMedia {
    #[serde(rename = "type")]
    pub kind: MediaKind,
    pub src: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

/// One geolocated case file.
///
/// `coordinates` is `[latitude, longitude]` in degrees. Everything except the
/// id, title and coordinates is opaque to the globe engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseRecord {
    pub id: String,
    pub slug: String,
    pub title: String,
    /// ISO `YYYY-MM-DD`.
    pub date: String,
    pub location: String,
    pub coordinates: [f64; 2],
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_more: Option<String>,
    pub severity: Severity,
    pub status: CaseStatus,
    #[serde(default)]
    pub media: Vec<CaseMedia>,
}

impl CaseRecord {
    /// Minimal record; the remaining fields get neutral defaults.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        lat_deg: f64,
        lon_deg: f64,
    ) -> Self {
        let id = id.into();
        Self {
            slug: id.clone(),
            id,
            title: title.into(),
            date: "1970-01-01".to_string(),
            location: String::new(),
            coordinates: [lat_deg, lon_deg],
            summary: String::new(),
            read_more: None,
            severity: Severity::Low,
            status: CaseStatus::Unknown,
            media: Vec::new(),
        }
    }

    pub fn lat_deg(&self) -> f64 {
        self.coordinates[0]
    }

    pub fn lon_deg(&self) -> f64 {
        self.coordinates[1]
    }

    pub fn validate(&self) -> Result<(), CaseDataError> {
        let (lat, lon) = (self.lat_deg(), self.lon_deg());
        let lat_ok = lat.is_finite() && (-90.0..=90.0).contains(&lat);
        let lon_ok = lon.is_finite() && (-180.0..=180.0).contains(&lon);
        if !lat_ok || !lon_ok {
            return Err(CaseDataError::InvalidCoordinates {
                id: self.id.clone(),
                lat,
                lon,
            });
        }
        if !is_iso_date(&self.date) {
            return Err(CaseDataError::InvalidDate {
                id: self.id.clone(),
                date: self.date.clone(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CaseDataError {
    Json(String),
    InvalidCoordinates { id: String, lat: f64, lon: f64 },
    InvalidDate { id: String, date: String },
    DuplicateId(String),
}

impl std::fmt::Display for CaseDataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaseDataError::Json(e) => write!(f, "case data is not valid JSON: {e}"),
            CaseDataError::InvalidCoordinates { id, lat, lon } => {
                write!(f, "case {id} has out-of-range coordinates [{lat}, {lon}]")
            }
            CaseDataError::InvalidDate { id, date } => {
                write!(f, "case {id} has a non-ISO date: {date}")
            }
            CaseDataError::DuplicateId(id) => write!(f, "duplicate case id: {id}"),
        }
    }
}

impl std::error::Error for CaseDataError {}

/// Parses a JSON array of case records and rejects invalid or duplicate ones.
pub fn load_cases(payload: &str) -> Result<Vec<CaseRecord>, CaseDataError> {
    let cases: Vec<CaseRecord> =
        serde_json::from_str(payload).map_err(|e| CaseDataError::Json(e.to_string()))?;
    validate_cases(&cases)?;
    Ok(cases)
}

pub fn validate_cases(cases: &[CaseRecord]) -> Result<(), CaseDataError> {
    let mut seen: Vec<&str> = Vec::with_capacity(cases.len());
    for case in cases {
        case.validate()?;
        if seen.contains(&case.id.as_str()) {
            return Err(CaseDataError::DuplicateId(case.id.clone()));
        }
        seen.push(&case.id);
    }
    Ok(())
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

/// Stable sort by ISO date; equal dates keep their input order.
pub fn sort_by_date(cases: &[CaseRecord], direction: SortDirection) -> Vec<CaseRecord> {
    let mut out = cases.to_vec();
    match direction {
        SortDirection::Asc => out.sort_by(|a, b| a.date.cmp(&b.date)),
        SortDirection::Desc => out.sort_by(|a, b| b.date.cmp(&a.date)),
    }
    out
}

/// Keeps cases whose severity is in `severities`; an empty filter keeps all.
pub fn filter_by_severity(cases: &[CaseRecord], severities: &[Severity]) -> Vec<CaseRecord> {
    if severities.is_empty() {
        return cases.to_vec();
    }
    cases
        .iter()
        .filter(|c| severities.contains(&c.severity))
        .cloned()
        .collect()
}

/// Keeps cases whose status is in `statuses`; an empty filter keeps all.
pub fn filter_by_status(cases: &[CaseRecord], statuses: &[CaseStatus]) -> Vec<CaseRecord> {
    if statuses.is_empty() {
        return cases.to_vec();
    }
    cases
        .iter()
        .filter(|c| statuses.contains(&c.status))
        .cloned()
        .collect()
}

pub fn find_by_slug<'a>(cases: &'a [CaseRecord], slug: &str) -> Option<&'a CaseRecord> {
    cases.iter().find(|c| c.slug == slug)
}

fn is_iso_date(s: &str) -> bool {
    let b = s.as_bytes();
    if b.len() != 10 || b[4] != b'-' || b[7] != b'-' {
        return false;
    }
    let digits = b
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != 4 && *i != 7)
        .all(|(_, c)| c.is_ascii_digit());
    if !digits {
        return false;
    }
    let month = (b[5] - b'0') * 10 + (b[6] - b'0');
    let day = (b[8] - b'0') * 10 + (b[9] - b'0');
    (1..=12).contains(&month) && (1..=31).contains(&day)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = r#"[
      {
        "id": "case-001",
        "slug": "lake-lights",
        "title": "Lights over the lake",
        "date": "2021-06-14",
        "location": "Lake Tahoe, USA",
        "coordinates": [39.09, -120.03],
        "summary": "Three amber lights hovering.",
        "severity": "Moderate",
        "status": "Unresolved",
        "media": [{ "type": "image", "src": "/media/lake.jpg", "caption": "Still frame" }]
      },
      {
        "id": "case-002",
        "slug": "desert-streak",
        "title": "Desert streak",
        "date": "2023-02-01",
        "location": "Atacama, Chile",
        "coordinates": [-24.5, -69.25],
        "summary": "A fast streak at dusk.",
        "readMore": "Longer write-up.",
        "severity": "Critical",
        "status": "Likely Explained",
        "media": []
      }
    ]"#;

    #[test]
    fn loads_sample_records() {
        let cases = load_cases(SAMPLE).expect("load");
        assert_eq!(cases.len(), 2);
        assert_eq!(cases[0].lat_deg(), 39.09);
        assert_eq!(cases[0].lon_deg(), -120.03);
        assert_eq!(cases[0].media[0].kind, MediaKind::Image);
        assert_eq!(cases[1].status, CaseStatus::LikelyExplained);
        assert_eq!(cases[1].read_more.as_deref(), Some("Longer write-up."));
    }

    #[test]
    fn rejects_out_of_range_coordinates() {
        let bad = CaseRecord::new("x", "bad", 91.0, 0.0);
        assert_eq!(
            bad.validate(),
            Err(CaseDataError::InvalidCoordinates {
                id: "x".to_string(),
                lat: 91.0,
                lon: 0.0
            })
        );
        assert!(CaseRecord::new("y", "bad", 0.0, f64::NAN).validate().is_err());
        assert!(CaseRecord::new("z", "ok", -90.0, 180.0).validate().is_ok());
    }

    #[test]
    fn rejects_duplicates_and_bad_dates() {
        let a = CaseRecord::new("a", "A", 0.0, 0.0);
        assert_eq!(
            validate_cases(&[a.clone(), a.clone()]),
            Err(CaseDataError::DuplicateId("a".to_string()))
        );
        let mut dated = a;
        dated.date = "2021-13-01".to_string();
        assert!(matches!(dated.validate(), Err(CaseDataError::InvalidDate { .. })));
        assert!(matches!(load_cases("{"), Err(CaseDataError::Json(_))));
    }

    #[test]
    fn sorts_and_filters() {
        let cases = load_cases(SAMPLE).expect("load");
        let desc = sort_by_date(&cases, SortDirection::Desc);
        assert_eq!(desc[0].id, "case-002");
        let asc = sort_by_date(&cases, SortDirection::Asc);
        assert_eq!(asc[0].id, "case-001");

        assert_eq!(filter_by_severity(&cases, &[]).len(), 2);
        let critical = filter_by_severity(&cases, &[Severity::Critical, Severity::High]);
        assert_eq!(critical.len(), 1);
        assert_eq!(critical[0].id, "case-002");

        let open = filter_by_status(&cases, &[CaseStatus::Unresolved]);
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].id, "case-001");

        assert_eq!(
            find_by_slug(&cases, "desert-streak").map(|c| c.id.as_str()),
            Some("case-002")
        );
        assert!(find_by_slug(&cases, "missing").is_none());
    }
}
