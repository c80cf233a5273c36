use serde_json::Value;

use crate::outline::{GeoPoint, OutlineError, OutlineRings, Ring};

/// Quantization transform of a TopoJSON document.
#[derive(Debug, Copy, Clone, PartialEq)]
struct Transform {
    scale: [f64; 2],
    translate: [f64; 2],
}

/// Decodes the areal geometries of `topology.objects[object]` into rings.
///
/// Arcs are delta-decoded when the topology is quantized. A negative arc index
/// `i` refers to arc `!i` traversed backwards. When arcs are stitched into a
/// ring, the first point of every arc after the first duplicates the previous
/// arc's last point and is dropped.
pub fn decode_topology(topology: &Value, object: &str) -> Result<OutlineRings, OutlineError> {
    let transform = parse_transform(topology.get("transform"))?;
    let arcs = decode_arcs(topology, transform)?;
    let root = topology
        .get("objects")
        .and_then(|o| o.get(object))
        .ok_or_else(|| OutlineError::MissingObject(object.to_string()))?;

    let mut rings = Vec::new();
    append_object(root, &arcs, 0, &mut rings)?;
    Ok(OutlineRings { rings })
}

fn parse_transform(value: Option<&Value>) -> Result<Option<Transform>, OutlineError> {
    let Some(value) = value else {
        return Ok(None);
    };
    let pair = |key: &str| -> Result<[f64; 2], OutlineError> {
        let arr = value
            .get(key)
            .and_then(|v| v.as_array())
            .filter(|a| a.len() == 2)
            .ok_or_else(|| OutlineError::InvalidArc {
                index: 0,
                reason: format!("transform.{key} must be a pair of numbers"),
            })?;
        let a = arr[0].as_f64();
        let b = arr[1].as_f64();
        match (a, b) {
            (Some(a), Some(b)) => Ok([a, b]),
            _ => Err(OutlineError::InvalidArc {
                index: 0,
                reason: format!("transform.{key} must be a pair of numbers"),
            }),
        }
    };
    Ok(Some(Transform {
        scale: pair("scale")?,
        translate: pair("translate")?,
    }))
}

fn decode_arcs(
    topology: &Value,
    transform: Option<Transform>,
) -> Result<Vec<Vec<GeoPoint>>, OutlineError> {
    let arcs = topology
        .get("arcs")
        .and_then(|v| v.as_array())
        .ok_or_else(|| OutlineError::InvalidArc {
            index: 0,
            reason: "topology missing arcs".to_string(),
        })?;

    let mut out = Vec::with_capacity(arcs.len());
    for (index, arc) in arcs.iter().enumerate() {
        let positions = arc.as_array().ok_or_else(|| OutlineError::InvalidArc {
            index,
            reason: "arc must be an array of positions".to_string(),
        })?;

        let mut points = Vec::with_capacity(positions.len());
        let (mut x, mut y) = (0.0, 0.0);
        for position in positions {
            let p = crate::geojson::parse_position(position)
                .map_err(|reason| OutlineError::InvalidArc { index, reason })?;
            let point = match transform {
                Some(t) => {
                    x += p.lon_deg;
                    y += p.lat_deg;
                    GeoPoint::new(x * t.scale[0] + t.translate[0], y * t.scale[1] + t.translate[1])
                }
                None => p,
            };
            points.push(point);
        }
        out.push(points);
    }
    Ok(out)
}

fn append_object(
    object: &Value,
    arcs: &[Vec<GeoPoint>],
    index: usize,
    rings: &mut Vec<Ring>,
) -> Result<(), OutlineError> {
    let invalid = |reason: &str| OutlineError::InvalidGeometry {
        index,
        reason: reason.to_string(),
    };
    let ty = match object.get("type") {
        Some(Value::String(s)) => s.as_str(),
        Some(Value::Null) | None => return Ok(()),
        Some(_) => return Err(invalid("geometry type must be a string")),
    };

    match ty {
        "GeometryCollection" => {
            let members = object
                .get("geometries")
                .and_then(|v| v.as_array())
                .ok_or_else(|| invalid("GeometryCollection missing geometries"))?;
            for (i, member) in members.iter().enumerate() {
                append_object(member, arcs, i, rings)?;
            }
        }
        "Polygon" => {
            let polygon = object
                .get("arcs")
                .ok_or_else(|| invalid("Polygon missing arcs"))?;
            append_polygon(polygon, arcs, index, rings)?;
        }
        "MultiPolygon" => {
            let polygons = object
                .get("arcs")
                .and_then(|v| v.as_array())
                .ok_or_else(|| invalid("MultiPolygon missing arcs"))?;
            for polygon in polygons {
                append_polygon(polygon, arcs, index, rings)?;
            }
        }
        _ => {}
    }
    Ok(())
}

fn append_polygon(
    polygon: &Value,
    arcs: &[Vec<GeoPoint>],
    index: usize,
    rings: &mut Vec<Ring>,
) -> Result<(), OutlineError> {
    let ring_refs = polygon
        .as_array()
        .ok_or_else(|| OutlineError::InvalidGeometry {
            index,
            reason: "polygon arcs must be an array of rings".to_string(),
        })?;
    for ring_ref in ring_refs {
        rings.push(stitch_ring(ring_ref, arcs, index)?);
    }
    Ok(())
}

fn stitch_ring(
    ring_ref: &Value,
    arcs: &[Vec<GeoPoint>],
    index: usize,
) -> Result<Ring, OutlineError> {
    let invalid = |reason: String| OutlineError::InvalidGeometry { index, reason };
    let refs = ring_ref
        .as_array()
        .ok_or_else(|| invalid("ring must be an array of arc indexes".to_string()))?;

    let mut ring: Ring = Vec::new();
    for r in refs {
        let i = r
            .as_i64()
            .ok_or_else(|| invalid("arc index must be an integer".to_string()))?;
        let (arc_index, reversed) = if i < 0 { (!i, true) } else { (i, false) };
        let arc = usize::try_from(arc_index)
            .ok()
            .and_then(|a| arcs.get(a))
            .ok_or_else(|| invalid(format!("arc index {i} out of range")))?;

        if !ring.is_empty() {
            ring.pop();
        }
        if reversed {
            ring.extend(arc.iter().rev().copied());
        } else {
            ring.extend(arc.iter().copied());
        }
    }
    Ok(ring)
}

#[cfg(test)]
mod tests {
    use super::decode_topology;
    use crate::outline::{GeoPoint, OutlineError};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn square_topology() -> serde_json::Value {
        // Two arcs forming a closed square: (0,0)->(10,0)->(10,10) and back.
        json!({
            "type": "Topology",
            "arcs": [
                [[0, 0], [10, 0], [10, 10]],
                [[0, 0], [0, 10], [10, 10]]
            ],
            "objects": {
                "countries": {
                    "type": "GeometryCollection",
                    "geometries": [
                        { "type": "Polygon", "arcs": [[0, -2]] },
                        { "type": null },
                        { "type": "MultiPolygon", "arcs": [[[1]], [[0]]] }
                    ]
                }
            }
        })
    }

    #[test]
    fn stitches_arcs_and_reverses_negative_indexes() {
        let rings = decode_topology(&square_topology(), "countries").expect("decode");
        assert_eq!(rings.ring_count(), 3);
        assert_eq!(
            rings.rings[0],
            vec![
                GeoPoint::new(0.0, 0.0),
                GeoPoint::new(10.0, 0.0),
                GeoPoint::new(10.0, 10.0),
                GeoPoint::new(0.0, 10.0),
                GeoPoint::new(0.0, 0.0),
            ]
        );
        assert_eq!(rings.rings[1].len(), 3);
    }

    #[test]
    fn applies_quantization_transform() {
        let doc = json!({
            "type": "Topology",
            "transform": { "scale": [0.5, 0.25], "translate": [-180, -90] },
            "arcs": [[[0, 0], [2, 4], [2, 0]]],
            "objects": { "land": { "type": "Polygon", "arcs": [[0]] } }
        });
        let rings = decode_topology(&doc, "land").expect("decode");
        assert_eq!(
            rings.rings[0],
            vec![
                GeoPoint::new(-180.0, -90.0),
                GeoPoint::new(-179.0, -89.0),
                GeoPoint::new(-178.0, -89.0),
            ]
        );
    }

    #[test]
    fn reports_missing_objects_and_bad_arcs() {
        assert_eq!(
            decode_topology(&square_topology(), "land"),
            Err(OutlineError::MissingObject("land".to_string()))
        );
        let doc = json!({
            "type": "Topology",
            "arcs": [[[0, 0], [1, 1]]],
            "objects": { "countries": { "type": "Polygon", "arcs": [[3]] } }
        });
        assert!(matches!(
            decode_topology(&doc, "countries"),
            Err(OutlineError::InvalidGeometry { .. })
        ));
    }
}
