//! Interactive scene renderer.
//!
//! The crate owns the renderer core: surface and context lifecycle, one
//! linked shader program, a flat registry of uploaded objects and the
//! per-frame draw loop. Windowing and GPU access sit behind the traits in
//! [`backend`], so the same core drives a browser canvas on wasm32 and the
//! in-memory headless backend used by tools and tests.

pub mod backend;
pub mod camera;
pub mod color;
pub mod config;
pub mod error;
pub mod render;
pub mod scene;
#[cfg(target_arch = "wasm32")]
pub mod wasm;

pub use backend::{GraphicsContext, HeadlessHost, Host, Surface};
pub use camera::{Camera, Dimension, Viewport};
pub use color::Color;
pub use config::RendererConfig;
pub use error::{BackendError, RendererError, Result};
pub use render::{GpuHandle, ObjectId, Renderer, ShaderBindings};
pub use scene::{ColorList, ObjectKind, PointList, SceneObject};
