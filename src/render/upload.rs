use std::borrow::Cow;

use super::handle::GpuHandle;
use crate::backend::GraphicsContext;
use crate::color::Color;
use crate::error::{RendererError, Result};
use crate::scene::{ColorList, SceneObject};

/// Color used for every point when an object has neither an object-level
/// color nor one color per point.
pub const DEFAULT_COLOR: Color = Color::WHITE;

/// Picks the per-point colors uploaded for `object`.
///
/// An object-level color wins over per-point colors. Per-point colors are
/// used only when there is exactly one per point; otherwise every point gets
/// [`DEFAULT_COLOR`]. The object itself is never modified.
pub fn resolve_colors(object: &SceneObject) -> Cow<'_, ColorList> {
    let count = object.points().count();
    match object.color() {
        Some(color) => Cow::Owned(ColorList::uniform(color, count)),
        None if object.colors().count() == count => Cow::Borrowed(object.colors()),
        None => Cow::Owned(ColorList::uniform(DEFAULT_COLOR, count)),
    }
}

/// Allocates a buffer and uploads `data` as 32-bit floats.
pub fn upload_buffer<C: GraphicsContext>(
    context: &C,
    data: &[f32],
    components: u32,
) -> Result<GpuHandle<C::Buffer>> {
    let buffer = context
        .create_buffer()
        .map_err(|err| RendererError::ResourceAllocation(err.to_string()))?;
    context.bind_array_buffer(Some(&buffer));
    context.upload_array_buffer(data);
    let count = data.len() / components as usize;
    Ok(GpuHandle::new(buffer, count, components))
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;

    fn five_points() -> Vec<Vec3> {
        (0..5).map(|i| Vec3::splat(i as f32)).collect()
    }

    #[test]
    fn object_color_overrides_point_colors() {
        let red = Color::rgb(1.0, 0.0, 0.0);
        let object = SceneObject::mesh("strip", five_points())
            .with_colors(vec![Color::BLACK; 5])
            .with_color(red);
        let colors = resolve_colors(&object);
        assert_eq!(colors.count(), 5);
        assert!(colors.as_slice().iter().all(|color| *color == red));
    }

    #[test]
    fn matching_point_colors_are_used_verbatim() {
        let palette: Vec<Color> = (0..5).map(|i| Color::rgb(i as f32 / 4.0, 0.0, 0.0)).collect();
        let object = SceneObject::mesh("strip", five_points()).with_colors(palette.clone());
        let colors = resolve_colors(&object);
        assert!(matches!(colors, Cow::Borrowed(_)));
        assert_eq!(colors.as_slice(), palette.as_slice());
    }

    #[test]
    fn mismatched_point_colors_fall_back_to_white() {
        let object =
            SceneObject::mesh("strip", five_points()).with_colors(vec![Color::BLACK; 3]);
        let before = object.clone();
        let colors = resolve_colors(&object);
        assert_eq!(colors.count(), 5);
        assert!(colors.as_slice().iter().all(|color| *color == Color::WHITE));
        assert_eq!(object, before);
    }
}
