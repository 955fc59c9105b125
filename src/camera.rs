use glam::{Mat4, Vec3};

/// Number of spatial dimensions a renderer draws in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Dimension {
    Two,
    Three,
}

impl From<Dimension> for u8 {
    fn from(value: Dimension) -> Self {
        match value {
            Dimension::Two => 2,
            Dimension::Three => 3,
        }
    }
}

impl TryFrom<u8> for Dimension {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            2 => Ok(Dimension::Two),
            3 => Ok(Dimension::Three),
            other => Err(format!("unsupported dimension {other}; expected 2 or 3")),
        }
    }
}

/// Snapshot of the owning renderer a camera is built against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub dimension: Dimension,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn aspect(&self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }
}

const FOV_DEGREES: f32 = 45.0;
const NEAR: f32 = 0.1;
const FAR: f32 = 100.0;

/// Supplies the view and projection transforms used for every frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    view: Mat4,
    projection: Mat4,
    eye: Vec3,
    target: Vec3,
    up: Vec3,
}

impl Camera {
    /// 3-D: perspective looking at the origin from `+z`.
    /// 2-D: orthographic over the aspect-corrected unit square.
    pub fn new(viewport: Viewport) -> Self {
        let aspect = viewport.aspect().max(0.01);
        match viewport.dimension {
            Dimension::Three => {
                let eye = Vec3::new(0.0, 0.0, 5.0);
                Self {
                    view: Mat4::look_at_rh(eye, Vec3::ZERO, Vec3::Y),
                    projection: Mat4::perspective_rh_gl(
                        FOV_DEGREES.to_radians(),
                        aspect,
                        NEAR,
                        FAR,
                    ),
                    eye,
                    target: Vec3::ZERO,
                    up: Vec3::Y,
                }
            }
            Dimension::Two => Self {
                view: Mat4::IDENTITY,
                projection: Mat4::orthographic_rh_gl(-aspect, aspect, -1.0, 1.0, -1.0, 1.0),
                eye: Vec3::Z,
                target: Vec3::ZERO,
                up: Vec3::Y,
            },
        }
    }

    pub fn view(&self) -> Mat4 {
        self.view
    }

    pub fn perspective(&self) -> Mat4 {
        self.projection
    }

    pub fn eye(&self) -> Vec3 {
        self.eye
    }

    pub fn look_at(&mut self, eye: Vec3, target: Vec3, up: Vec3) {
        self.eye = eye;
        self.target = target;
        self.up = up;
        self.view = Mat4::look_at_rh(eye, target, up);
    }

    /// Rotates the eye around the target by `yaw` (about `up`) and `pitch`
    /// (about the camera's right axis), both in radians.
    pub fn orbit(&mut self, yaw: f32, pitch: f32) {
        let offset = self.eye - self.target;
        let right = offset.cross(self.up).normalize_or_zero();
        let rotation = Mat4::from_axis_angle(self.up.normalize_or_zero(), yaw)
            * if right == Vec3::ZERO {
                Mat4::IDENTITY
            } else {
                Mat4::from_axis_angle(right, pitch)
            };
        let eye = self.target + rotation.transform_vector3(offset);
        self.look_at(eye, self.target, self.up);
    }

    pub fn set_view(&mut self, view: Mat4) {
        self.view = view;
    }

    pub fn set_projection(&mut self, projection: Mat4) {
        self.projection = projection;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport(dimension: Dimension) -> Viewport {
        Viewport {
            dimension,
            width: 200,
            height: 100,
        }
    }

    #[test]
    fn perspective_camera_sees_origin_at_center() {
        let camera = Camera::new(viewport(Dimension::Three));
        let clip = (camera.perspective() * camera.view()).project_point3(Vec3::ZERO);
        assert!(clip.x.abs() < 1e-6);
        assert!(clip.y.abs() < 1e-6);
    }

    #[test]
    fn orthographic_camera_corrects_aspect() {
        let camera = Camera::new(viewport(Dimension::Two));
        assert_eq!(camera.view(), Mat4::IDENTITY);
        let edge = camera.perspective().project_point3(Vec3::new(2.0, 1.0, 0.0));
        assert!((edge.x - 1.0).abs() < 1e-6);
        assert!((edge.y - 1.0).abs() < 1e-6);
    }

    #[test]
    fn orbit_keeps_distance_to_target() {
        let mut camera = Camera::new(viewport(Dimension::Three));
        camera.orbit(0.7, 0.3);
        assert!((camera.eye().length() - 5.0).abs() < 1e-4);
        assert_ne!(camera.eye(), Vec3::new(0.0, 0.0, 5.0));
    }

    #[test]
    fn dimension_round_trips_through_integers() {
        assert_eq!(Dimension::try_from(2), Ok(Dimension::Two));
        assert_eq!(u8::from(Dimension::Three), 3);
        assert!(Dimension::try_from(4).is_err());
    }
}
