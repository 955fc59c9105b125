use anyhow::{anyhow, Result};
use bytemuck::{Pod, Zeroable};
use glam::Vec4;
use serde::{Deserialize, Serialize};

/// RGBA color with components in `0.0..=1.0`.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Default, Pod, Zeroable, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0, 1.0);
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0, 1.0);
    pub const TRANSPARENT: Self = Self::new(0.0, 0.0, 0.0, 0.0);

    #[inline]
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    #[inline]
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self::new(r, g, b, 1.0)
    }

    /// Parses `#rrggbb` or `#rrggbbaa` (leading `#` optional).
    pub fn from_hex(value: &str) -> Result<Self> {
        let digits = value.trim().trim_start_matches('#');
        if !matches!(digits.len(), 6 | 8) {
            return Err(anyhow!("expected #rrggbb or #rrggbbaa, got {value:?}"));
        }
        let channel = |index: usize| -> Result<f32> {
            let byte = digits
                .get(index * 2..index * 2 + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| anyhow!("invalid hex color {value:?}"))?;
            Ok(byte as f32 / 255.0)
        };
        let alpha = if digits.len() == 8 { channel(3)? } else { 1.0 };
        Ok(Self::new(channel(0)?, channel(1)?, channel(2)?, alpha))
    }

    /// CSS `rgba(...)` notation, used to style host surfaces.
    pub fn to_css(self) -> String {
        let byte = |component: f32| (component.clamp(0.0, 1.0) * 255.0).round() as u8;
        format!(
            "rgba({}, {}, {}, {})",
            byte(self.r),
            byte(self.g),
            byte(self.b),
            self.a.clamp(0.0, 1.0)
        )
    }
}

impl From<Vec4> for Color {
    fn from(value: Vec4) -> Self {
        Self::new(value.x, value.y, value.z, value.w)
    }
}

impl From<Color> for Vec4 {
    fn from(value: Color) -> Self {
        Vec4::new(value.r, value.g, value.b, value.a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_with_and_without_alpha() {
        assert_eq!(Color::from_hex("#ff0000").unwrap(), Color::rgb(1.0, 0.0, 0.0));
        let translucent = Color::from_hex("00ff0080").unwrap();
        assert_eq!(translucent.g, 1.0);
        assert!((translucent.a - 128.0 / 255.0).abs() < f32::EPSILON);
        assert!(Color::from_hex("#12345").is_err());
        assert!(Color::from_hex("#zzzzzz").is_err());
    }

    #[test]
    fn css_notation_clamps_channels() {
        assert_eq!(Color::new(2.0, 0.5, 0.0, 1.0).to_css(), "rgba(255, 128, 0, 1)");
    }
}
