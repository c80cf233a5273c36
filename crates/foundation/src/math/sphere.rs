use super::Vec3;

/// Maps a geographic coordinate onto a sphere of `radius` centred at the origin.
///
/// Polar angle comes from latitude (`90 - lat`), azimuth from longitude shifted
/// by 180 degrees so the reference meridian lands on `+X`. The globe group is
/// rotated by -90 degrees about `+Y` to bring that meridian to the front.
pub fn lat_lon_to_vec3(lat_deg: f64, lon_deg: f64, radius: f64) -> Vec3 {
    let phi = (90.0 - lat_deg).to_radians();
    let theta = (lon_deg + 180.0).to_radians();
    let (sin_phi, cos_phi) = phi.sin_cos();
    let (sin_theta, cos_theta) = theta.sin_cos();
    Vec3::new(
        -radius * sin_phi * cos_theta,
        radius * cos_phi,
        radius * sin_phi * sin_theta,
    )
}

#[cfg(test)]
mod tests {
    use super::lat_lon_to_vec3;
    use crate::math::Vec3;

    fn assert_vec_close(a: Vec3, b: Vec3) {
        assert!(a.distance(b) < 1e-12, "{a:?} != {b:?}");
    }

    #[test]
    fn every_point_lies_on_the_sphere() {
        for radius in [0.5, 1.55, 10.0] {
            let mut lat = -90.0;
            while lat <= 90.0 {
                let mut lon = -180.0;
                while lon <= 180.0 {
                    let p = lat_lon_to_vec3(lat, lon, radius);
                    assert!(
                        (p.length() - radius).abs() < 1e-9,
                        "lat={lat} lon={lon} r={radius} |p|={}",
                        p.length()
                    );
                    lon += 7.5;
                }
                lat += 7.5;
            }
        }
    }

    #[test]
    fn reference_points() {
        assert_vec_close(lat_lon_to_vec3(0.0, 0.0, 2.0), Vec3::new(2.0, 0.0, 0.0));
        assert_vec_close(lat_lon_to_vec3(90.0, 45.0, 1.0), Vec3::new(0.0, 1.0, 0.0));
        assert_vec_close(lat_lon_to_vec3(-90.0, 0.0, 1.0), Vec3::new(0.0, -1.0, 0.0));
        assert_vec_close(lat_lon_to_vec3(0.0, 90.0, 1.0), Vec3::new(0.0, 0.0, -1.0));
    }
}
