/// sRGB colour with components in [0, 1].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const WHITE: Self = Self::rgb(1.0, 1.0, 1.0);

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// `0xRRGGBB`.
    pub fn from_hex(hex: u32) -> Self {
        let channel = |shift: u32| ((hex >> shift) & 0xff) as f32 / 255.0;
        Self::rgb(channel(16), channel(8), channel(0))
    }
}

/// How a material is shaded by the render backend.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Shading {
    /// Diffuse + emissive lighting from a single key light.
    Lit,
    /// Flat colour.
    Unlit,
    /// Flat colour, back faces only (atmosphere shells).
    BackFace,
    /// Line list.
    Line,
    /// Point sprites.
    Point,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Material {
    pub color: Color,
    pub emissive: Color,
    pub opacity: f32,
    pub transparent: bool,
    pub depth_write: bool,
    pub shading: Shading,
    /// Point size in pixels; ignored by other shadings.
    pub point_size: f32,
}

impl Material {
    pub fn lit(color: Color, emissive: Color) -> Self {
        Self {
            color,
            emissive,
            opacity: 1.0,
            transparent: false,
            depth_write: true,
            shading: Shading::Lit,
            point_size: 1.0,
        }
    }

    pub fn unlit(color: Color, opacity: f32) -> Self {
        Self {
            color,
            emissive: Color::rgb(0.0, 0.0, 0.0),
            opacity,
            transparent: opacity < 1.0,
            depth_write: opacity >= 1.0,
            shading: Shading::Unlit,
            point_size: 1.0,
        }
    }

    pub fn back_face(color: Color, opacity: f32) -> Self {
        Self {
            shading: Shading::BackFace,
            depth_write: false,
            transparent: true,
            ..Self::unlit(color, opacity)
        }
    }

    pub fn line(color: Color, opacity: f32) -> Self {
        Self {
            shading: Shading::Line,
            depth_write: false,
            transparent: true,
            ..Self::unlit(color, opacity)
        }
    }

    pub fn points(color: Color, opacity: f32, point_size: f32) -> Self {
        Self {
            shading: Shading::Point,
            depth_write: false,
            transparent: true,
            point_size,
            ..Self::unlit(color, opacity)
        }
    }

    /// Sets opacity, switching to blended rendering below 1.
    pub fn set_opacity(&mut self, opacity: f32) {
        self.opacity = opacity.clamp(0.0, 1.0);
        if matches!(self.shading, Shading::Lit | Shading::Unlit) {
            self.transparent = self.opacity < 1.0;
            self.depth_write = !self.transparent;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Color, Material, Shading};

    #[test]
    fn hex_colors() {
        let c = Color::from_hex(0x60e4ff);
        assert_eq!(c.r, 0x60 as f32 / 255.0);
        assert_eq!(c.g, 0xe4 as f32 / 255.0);
        assert_eq!(c.b, 1.0);
    }

    #[test]
    fn opacity_toggles_transparency_for_surfaces() {
        let mut m = Material::lit(Color::WHITE, Color::WHITE);
        m.set_opacity(0.3);
        assert!(m.transparent);
        assert!(!m.depth_write);
        m.set_opacity(2.0);
        assert_eq!(m.opacity, 1.0);
        assert!(!m.transparent);

        let mut line = Material::line(Color::WHITE, 0.38);
        line.set_opacity(1.0);
        assert!(line.transparent);
        assert_eq!(line.shading, Shading::Line);
    }
}
