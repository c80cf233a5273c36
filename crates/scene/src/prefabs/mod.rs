pub mod globe;
pub mod solar;
pub mod starfield;

pub use globe::*;
pub use solar::*;
pub use starfield::*;

/// 32-bit integer mix, stable across platforms so decorative layouts are
/// reproducible from a seed.
pub(crate) fn hash_u32(x_in: u32) -> u32 {
    let mut x = x_in;
    x ^= x >> 16;
    x = x.wrapping_mul(0x7feb_352d);
    x ^= x >> 15;
    x = x.wrapping_mul(0x846c_a68b);
    x ^= x >> 16;
    x
}

/// Uniform value in [0, 1] for item `index` of stream `salt`.
pub(crate) fn hash01(seed: u32, salt: u32, index: u32) -> f64 {
    let h = hash_u32(index.wrapping_mul(0x9e37_79b9) ^ seed ^ salt);
    h as f64 / u32::MAX as f64
}

#[cfg(test)]
mod tests {
    use super::{hash01, hash_u32};

    #[test]
    fn hash_is_stable_and_in_range() {
        assert_eq!(hash_u32(0), 0);
        assert_eq!(hash_u32(1), hash_u32(1));
        assert_ne!(hash_u32(1), hash_u32(2));
        for i in 0..1000 {
            let v = hash01(7, 0x68bc_21eb, i);
            assert!((0.0..=1.0).contains(&v));
        }
    }
}
