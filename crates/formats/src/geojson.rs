use serde_json::Value;

use crate::outline::{GeoPoint, OutlineError, OutlineRings, Ring};

/// Collects every Polygon/MultiPolygon ring of a GeoJSON FeatureCollection.
///
/// Features with a `null` geometry or a non-areal geometry type are skipped.
pub fn decode_feature_collection(value: &Value) -> Result<OutlineRings, OutlineError> {
    let features = value
        .get("features")
        .and_then(|v| v.as_array())
        .ok_or(OutlineError::UnsupportedDocument(Some(
            "FeatureCollection without features".to_string(),
        )))?;

    let mut rings = Vec::new();
    for (index, feature) in features.iter().enumerate() {
        let geometry = match feature.get("geometry") {
            None | Some(Value::Null) => continue,
            Some(g) => g,
        };
        append_geometry(geometry, &mut rings)
            .map_err(|reason| OutlineError::InvalidGeometry { index, reason })?;
    }
    Ok(OutlineRings { rings })
}

fn append_geometry(geometry: &Value, rings: &mut Vec<Ring>) -> Result<(), String> {
    let obj = geometry
        .as_object()
        .ok_or("geometry must be an object".to_string())?;
    let ty = obj
        .get("type")
        .and_then(|v| v.as_str())
        .ok_or("geometry missing type".to_string())?;

    match ty {
        "Polygon" => {
            let coords = obj
                .get("coordinates")
                .ok_or("geometry missing coordinates".to_string())?;
            rings.extend(parse_polygon(coords)?);
        }
        "MultiPolygon" => {
            let coords = obj
                .get("coordinates")
                .ok_or("geometry missing coordinates".to_string())?;
            for polygon in parse_multi_polygon(coords)? {
                rings.extend(polygon);
            }
        }
        "GeometryCollection" => {
            let members = obj
                .get("geometries")
                .and_then(|v| v.as_array())
                .ok_or("GeometryCollection missing geometries".to_string())?;
            for member in members {
                append_geometry(member, rings)?;
            }
        }
        _ => {}
    }
    Ok(())
}

pub(crate) fn parse_position(coords: &Value) -> Result<GeoPoint, String> {
    let arr = coords
        .as_array()
        .ok_or("position must be an array".to_string())?;
    if arr.len() < 2 {
        return Err("position must have [lon, lat]".to_string());
    }
    let lon = arr[0].as_f64().ok_or("lon must be a number".to_string())?;
    let lat = arr[1].as_f64().ok_or("lat must be a number".to_string())?;
    Ok(GeoPoint::new(lon, lat))
}

fn parse_ring(coords: &Value) -> Result<Ring, String> {
    let arr = coords
        .as_array()
        .ok_or("ring must be an array of positions".to_string())?;
    let mut out = Vec::with_capacity(arr.len());
    for item in arr {
        out.push(parse_position(item)?);
    }
    Ok(out)
}

fn parse_polygon(coords: &Value) -> Result<Vec<Ring>, String> {
    let rings = coords
        .as_array()
        .ok_or("Polygon coordinates must be an array of rings".to_string())?;
    let mut out = Vec::with_capacity(rings.len());
    for ring in rings {
        out.push(parse_ring(ring)?);
    }
    Ok(out)
}

fn parse_multi_polygon(coords: &Value) -> Result<Vec<Vec<Ring>>, String> {
    let polys = coords
        .as_array()
        .ok_or("MultiPolygon coordinates must be an array of polygons".to_string())?;
    let mut out = Vec::with_capacity(polys.len());
    for poly in polys {
        out.push(parse_polygon(poly)?);
    }
    Ok(out)
}
