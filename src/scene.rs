use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::color::Color;

/// Type tag carried by every scene entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    #[default]
    Mesh,
    Camera,
    Light,
}

impl ObjectKind {
    /// Whether entities of this kind carry geometry the renderer can draw.
    pub fn is_drawable(self) -> bool {
        matches!(self, ObjectKind::Mesh)
    }

    pub fn name(self) -> &'static str {
        match self {
            ObjectKind::Mesh => "mesh",
            ObjectKind::Camera => "camera",
            ObjectKind::Light => "light",
        }
    }
}

/// Ordered sequence of 3-D points.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PointList(Vec<Vec3>);

impl PointList {
    pub fn new(points: Vec<Vec3>) -> Self {
        Self(points)
    }

    pub fn count(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[Vec3] {
        &self.0
    }

    /// Components laid out `x, y, z` per point.
    pub fn flatten(&self) -> &[f32] {
        bytemuck::cast_slice(&self.0)
    }
}

impl From<Vec<Vec3>> for PointList {
    fn from(points: Vec<Vec3>) -> Self {
        Self(points)
    }
}

impl FromIterator<Vec3> for PointList {
    fn from_iter<I: IntoIterator<Item = Vec3>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Ordered sequence of RGBA colors.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColorList(Vec<Color>);

impl ColorList {
    pub fn new(colors: Vec<Color>) -> Self {
        Self(colors)
    }

    /// `count` copies of a single color.
    pub fn uniform(color: Color, count: usize) -> Self {
        Self(vec![color; count])
    }

    pub fn count(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[Color] {
        &self.0
    }

    /// Components laid out `r, g, b, a` per color.
    pub fn flatten(&self) -> &[f32] {
        bytemuck::cast_slice(&self.0)
    }
}

impl From<Vec<Color>> for ColorList {
    fn from(colors: Vec<Color>) -> Self {
        Self(colors)
    }
}

impl FromIterator<Color> for ColorList {
    fn from_iter<I: IntoIterator<Item = Color>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Scene entity handed to the renderer.
///
/// Only [`ObjectKind::Mesh`] entities are accepted for drawing; the points are
/// drawn as a triangle strip in declaration order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SceneObject {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: ObjectKind,
    #[serde(default)]
    pub points: PointList,
    #[serde(default)]
    pub colors: ColorList,
    /// Object-level color; when present it overrides `colors`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
}

impl SceneObject {
    /// Creates a drawable mesh from a list of strip points.
    pub fn mesh(name: impl Into<String>, points: impl Into<PointList>) -> Self {
        Self {
            name: name.into(),
            kind: ObjectKind::Mesh,
            points: points.into(),
            ..Self::default()
        }
    }

    pub fn with_colors(mut self, colors: impl Into<ColorList>) -> Self {
        self.colors = colors.into();
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    pub fn points(&self) -> &PointList {
        &self.points
    }

    pub fn colors(&self) -> &ColorList {
        &self.colors
    }

    pub fn color(&self) -> Option<Color> {
        self.color
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flatten_keeps_component_order() {
        let points = PointList::new(vec![Vec3::new(1.0, 2.0, 3.0), Vec3::new(4.0, 5.0, 6.0)]);
        assert_eq!(points.flatten(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);

        let colors = ColorList::uniform(Color::new(0.1, 0.2, 0.3, 0.4), 2);
        assert_eq!(colors.flatten(), &[0.1, 0.2, 0.3, 0.4, 0.1, 0.2, 0.3, 0.4]);
    }

    #[test]
    fn only_meshes_are_drawable() {
        assert!(ObjectKind::Mesh.is_drawable());
        assert!(!ObjectKind::Camera.is_drawable());
        assert!(!ObjectKind::Light.is_drawable());
    }

    #[test]
    fn builder_sets_object_color() {
        let object = SceneObject::mesh("strip", vec![Vec3::ZERO]).with_color(Color::BLACK);
        assert_eq!(object.kind, ObjectKind::Mesh);
        assert_eq!(object.color(), Some(Color::BLACK));
        assert_eq!(object.points().count(), 1);
    }
}
