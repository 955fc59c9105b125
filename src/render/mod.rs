//! Scene renderer: surface lifecycle, shader program, object registry and
//! the per-frame draw loop.

mod handle;
mod registry;
mod shader;
mod upload;

use std::sync::Arc;

use glam::{IVec2, Mat4, Vec3};
use log::{debug, info, warn};

pub use handle::GpuHandle;
pub use registry::{ObjectId, ObjectRegistry, RegistryEntry};
pub use shader::{ShaderBindings, ShaderProgram, DEFAULT_FRAGMENT_SHADER, DEFAULT_VERTEX_SHADER};
pub use upload::{resolve_colors, DEFAULT_COLOR};

use crate::backend::{
    BufferOf, ClearTargets, DepthFunc, GraphicsContext, Host, Surface, Topology,
};
use crate::camera::{Camera, Dimension, Viewport};
use crate::color::Color;
use crate::config::RendererConfig;
use crate::error::{RendererError, Result};
use crate::scene::SceneObject;

/// State that exists only after [`Renderer::init`]; all three parts are
/// published together.
struct Live<H: Host> {
    surface: H::Surface,
    context: H::Context,
    camera: Camera,
}

/// Draws a flat registry of scene objects onto a host surface.
///
/// Typical use: construct, optionally pick a container, [`init`](Self::init),
/// [`add_shaders`](Self::add_shaders) once, [`add_object`](Self::add_object)
/// as needed, then call [`render`](Self::render) every frame.
pub struct Renderer<H: Host> {
    host: H,
    dimension: Dimension,
    width: u32,
    height: u32,
    background: Color,
    container: Option<H::Container>,
    bindings: ShaderBindings,
    live: Option<Live<H>>,
    program: Option<ShaderProgram<H::Context>>,
    registry: ObjectRegistry<BufferOf<H>>,
    last_id: Option<ObjectId>,
}

impl<H: Host> Renderer<H> {
    pub fn new(host: H, dimension: Dimension, width: u32, height: u32) -> Self {
        Self {
            host,
            dimension,
            width,
            height,
            background: Color::BLACK,
            container: None,
            bindings: ShaderBindings::default(),
            live: None,
            program: None,
            registry: ObjectRegistry::new(),
            last_id: None,
        }
    }

    /// Builds a renderer from `config`, resolving its container id if set.
    pub fn from_config(host: H, config: &RendererConfig) -> Result<Self> {
        let mut renderer = Self::new(host, config.dimension, config.width, config.height);
        renderer.background = config.background;
        renderer.bindings = config.bindings.clone();
        if let Some(id) = config.container_id.as_deref() {
            renderer.set_container_by_id(id)?;
        }
        Ok(renderer)
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn background(&self) -> Color {
        self.background
    }

    /// Stores the width and, once initialized, resizes the live surface.
    pub fn set_width(&mut self, width: u32) {
        self.width = width;
        if let Some(live) = self.live.as_mut() {
            live.surface.set_width(width);
            live.context.viewport(0, 0, self.width, self.height);
        }
    }

    /// Stores the height and, once initialized, resizes the live surface.
    pub fn set_height(&mut self, height: u32) {
        self.height = height;
        if let Some(live) = self.live.as_mut() {
            live.surface.set_height(height);
            live.context.viewport(0, 0, self.width, self.height);
        }
    }

    /// Stores the background and, once initialized, recolors the live surface.
    pub fn set_background(&mut self, color: Color) {
        self.background = color;
        if let Some(live) = self.live.as_mut() {
            live.surface.set_background(color);
        }
    }

    /// The container the surface is attached to, defaulting to the host's
    /// root element.
    pub fn container(&mut self) -> Result<&H::Container> {
        let container = match self.container.take() {
            Some(container) => container,
            None => self.host.root_container().ok_or_else(|| {
                RendererError::Configuration("document has no root element".to_string())
            })?,
        };
        Ok(self.container.insert(container))
    }

    pub fn set_container(&mut self, container: Option<H::Container>) -> Result<()> {
        let container = container.ok_or_else(|| {
            RendererError::Configuration("container element is missing".to_string())
        })?;
        self.container = Some(container);
        Ok(())
    }

    pub fn set_container_by_id(&mut self, id: &str) -> Result<()> {
        let container = self.host.container_by_id(id);
        self.set_container(container).map_err(|_| {
            RendererError::Configuration(format!("no container element with id `{id}`"))
        })
    }

    /// Creates the surface, acquires and configures its context, and builds
    /// the camera. Calling it again once initialized does nothing.
    pub fn init(&mut self) -> Result<()> {
        if self.live.is_some() {
            return Ok(());
        }

        let container = self.container()?.clone();
        let surface = self
            .host
            .create_surface(self.width, self.height, self.background, &container)
            .map_err(|err| {
                RendererError::Initialization(format!("failed to create surface: {err}"))
            })?;
        let context = match self.configure_context(&surface) {
            Ok(context) => context,
            Err(err) => {
                surface.detach();
                return Err(err);
            }
        };

        let camera = Camera::new(self.viewport());
        self.live = Some(Live {
            surface,
            context,
            camera,
        });
        info!(
            "renderer initialized ({}x{}, {}-D)",
            self.width,
            self.height,
            u8::from(self.dimension)
        );
        Ok(())
    }

    /// Compiles and links the shader pair and makes it the active program.
    ///
    /// A second call replaces the active program only if the new one links;
    /// the replaced program is released.
    pub fn add_shaders(&mut self, vertex_source: &str, fragment_source: &str) -> Result<()> {
        let live = self
            .live
            .as_ref()
            .ok_or_else(|| RendererError::not_initialized("add_shaders"))?;
        if vertex_source.trim().is_empty() || fragment_source.trim().is_empty() {
            return Err(RendererError::InvalidArgument(
                "both vertex and fragment shader sources are required".to_string(),
            ));
        }

        let context = &live.context;
        let program = match ShaderProgram::link(context, vertex_source, fragment_source, &self.bindings)
        {
            Ok(program) => program,
            Err(err) => {
                if let Some(previous) = self.program.as_ref() {
                    context.use_program(Some(previous.program()));
                }
                return Err(err);
            }
        };
        if let Some(previous) = self.program.replace(program) {
            warn!("replacing previously linked shader program");
            previous.release(context);
        }
        Ok(())
    }

    /// Uploads the object's points and resolved colors and registers it.
    ///
    /// Returns the identifier assigned to the object; identifiers start at 0
    /// and increase with every call.
    pub fn add_object(&mut self, object: Arc<SceneObject>) -> Result<ObjectId> {
        let live = self
            .live
            .as_ref()
            .ok_or_else(|| RendererError::not_initialized("add_object"))?;
        if !object.kind.is_drawable() {
            return Err(RendererError::InvalidArgument(format!(
                "`{}` is a {} and cannot be drawn",
                object.name,
                object.kind.name()
            )));
        }

        let id = next_object_id(self.last_id)?;
        let (vertices, colors) = upload_object(&live.context, &object)?;
        self.last_id = Some(id);

        let entry = RegistryEntry {
            object,
            vertices,
            colors,
        };
        if let Err(rejected) = self.registry.insert(id, entry) {
            release_entry(&live.context, rejected);
            return Err(RendererError::IdentifierCollision(id));
        }
        debug!("registered object {id}");
        Ok(id)
    }

    /// Unregisters an object and releases its buffers. Returns whether `id`
    /// was registered.
    pub fn remove_object(&mut self, id: ObjectId) -> bool {
        let Some(entry) = self.registry.remove(id) else {
            return false;
        };
        if let Some(live) = self.live.as_ref() {
            release_entry(&live.context, entry);
        }
        debug!("removed object {id}");
        true
    }

    /// Redraws every registered object with the camera's current matrices.
    pub fn render(&self) -> Result<()> {
        let live = self
            .live
            .as_ref()
            .ok_or_else(|| RendererError::not_initialized("render"))?;
        let program = self.program.as_ref().ok_or(RendererError::NotInitialized {
            operation: "render",
            requirement: "linked shaders",
        })?;
        let context = &live.context;
        if let Some(err) = context.take_error() {
            warn!("discarding context error raised before the frame: {err}");
        }

        context.clear(ClearTargets::COLOR_AND_DEPTH);
        let projection = live.camera.perspective().to_cols_array();
        let view = live.camera.view().to_cols_array();
        context.uniform_matrix4(program.projection_uniform(), &projection);
        context.uniform_matrix4(program.view_uniform(), &view);

        for (id, entry) in self.registry.iter() {
            draw_entry(context, program, entry)
                .map_err(|err| RendererError::Render(format!("object {id}: {err}")))?;
        }
        Ok(())
    }

    /// Projects a world-space point to integer pixel coordinates on the
    /// surface, with `y` growing downwards.
    pub fn world_to_display(&self, point: Vec3) -> Result<IVec2> {
        let camera = self
            .camera()
            .ok_or_else(|| RendererError::not_initialized("world_to_display"))?;
        let transform = camera.perspective() * camera.view() * Mat4::IDENTITY;
        let normalized = transform.project_point3(point);
        Ok(normalized_to_pixel(
            normalized.x,
            normalized.y,
            self.width,
            self.height,
        ))
    }

    pub fn is_initialized(&self) -> bool {
        self.live.is_some()
    }

    pub fn has_shaders(&self) -> bool {
        self.program.is_some()
    }

    pub fn camera(&self) -> Option<&Camera> {
        self.live.as_ref().map(|live| &live.camera)
    }

    pub fn camera_mut(&mut self) -> Option<&mut Camera> {
        self.live.as_mut().map(|live| &mut live.camera)
    }

    pub fn surface(&self) -> Option<&H::Surface> {
        self.live.as_ref().map(|live| &live.surface)
    }

    pub fn context(&self) -> Option<&H::Context> {
        self.live.as_ref().map(|live| &live.context)
    }

    pub fn object_count(&self) -> usize {
        self.registry.len()
    }

    pub fn contains_object(&self, id: ObjectId) -> bool {
        self.registry.contains(id)
    }

    pub fn object(&self, id: ObjectId) -> Option<&RegistryEntry<BufferOf<H>>> {
        self.registry.get(id)
    }

    /// Acquires the surface's context and applies the initial GL state.
    fn configure_context(&self, surface: &H::Surface) -> Result<H::Context> {
        let context = surface
            .request_context()
            .map_err(|err| {
                RendererError::Initialization(format!("failed to request context: {err}"))
            })?
            .ok_or_else(|| {
                RendererError::Initialization("surface has no GPU context support".to_string())
            })?;

        context.viewport(0, 0, self.width, self.height);
        // Transparent so the surface's own background shows through.
        context.clear_color(Color::TRANSPARENT);
        context.enable_depth_test(DepthFunc::LessOrEqual);
        context.clear(ClearTargets::COLOR_AND_DEPTH);
        if let Some(err) = context.take_error() {
            return Err(RendererError::Initialization(format!(
                "failed to configure context: {err}"
            )));
        }
        Ok(context)
    }

    fn viewport(&self) -> Viewport {
        Viewport {
            dimension: self.dimension,
            width: self.width,
            height: self.height,
        }
    }

    fn release_resources(&mut self) {
        let Some(live) = self.live.as_ref() else {
            return;
        };
        let entries = self.registry.drain();
        let released = entries.len();
        for entry in entries {
            release_entry(&live.context, entry);
        }
        if let Some(program) = self.program.take() {
            live.context.use_program(None);
            program.release(&live.context);
        }
        debug!("released {released} object(s) and shader program");
    }
}

impl<H: Host> Drop for Renderer<H> {
    fn drop(&mut self) {
        self.release_resources();
    }
}

type UploadedBuffers<C> = (
    GpuHandle<<C as GraphicsContext>::Buffer>,
    GpuHandle<<C as GraphicsContext>::Buffer>,
);

fn upload_object<C: GraphicsContext>(
    context: &C,
    object: &SceneObject,
) -> Result<UploadedBuffers<C>> {
    let resolved = resolve_colors(object);
    let vertices = upload::upload_buffer(
        context,
        object.points().flatten(),
        GpuHandle::<C::Buffer>::POSITION_COMPONENTS,
    )?;
    let colors = match upload::upload_buffer(
        context,
        resolved.flatten(),
        GpuHandle::<C::Buffer>::COLOR_COMPONENTS,
    ) {
        Ok(colors) => colors,
        Err(err) => {
            context.delete_buffer(vertices.buffer());
            return Err(err);
        }
    };
    Ok((vertices, colors))
}

fn draw_entry<C: GraphicsContext>(
    context: &C,
    program: &ShaderProgram<C>,
    entry: &RegistryEntry<C::Buffer>,
) -> std::result::Result<(), String> {
    let count = u32::try_from(entry.vertices.count())
        .map_err(|_| format!("{} points exceed a single draw call", entry.vertices.count()))?;

    context.bind_array_buffer(Some(entry.vertices.buffer()));
    context.vertex_attrib_pointer_f32(program.position_location(), entry.vertices.components());
    context.bind_array_buffer(Some(entry.colors.buffer()));
    context.vertex_attrib_pointer_f32(program.color_location(), entry.colors.components());
    context.draw_arrays(Topology::TriangleStrip, 0, count);

    match context.take_error() {
        Some(err) => Err(err.to_string()),
        None => Ok(()),
    }
}

fn release_entry<C: GraphicsContext>(context: &C, entry: RegistryEntry<C::Buffer>) {
    context.delete_buffer(entry.vertices.buffer());
    context.delete_buffer(entry.colors.buffer());
}

fn next_object_id(last: Option<ObjectId>) -> Result<ObjectId> {
    match last {
        None => Ok(ObjectId::new(0)),
        Some(last) => last.get().checked_add(1).map(ObjectId::new).ok_or_else(|| {
            RendererError::ResourceAllocation("object identifiers exhausted".to_string())
        }),
    }
}

/// Maps normalized device `x`/`y` in `[-1, 1]` to pixels, rounding halves up.
fn normalized_to_pixel(x: f32, y: f32, width: u32, height: u32) -> IVec2 {
    let round = |value: f32| (value + 0.5).floor() as i32;
    IVec2::new(
        round((x + 1.0) / 2.0 * width as f32),
        round((1.0 - y) / 2.0 * height as f32),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalized_corners_map_to_surface_corners() {
        assert_eq!(normalized_to_pixel(-1.0, 1.0, 640, 480), IVec2::new(0, 0));
        assert_eq!(normalized_to_pixel(1.0, -1.0, 640, 480), IVec2::new(640, 480));
        assert_eq!(normalized_to_pixel(0.0, 0.0, 640, 480), IVec2::new(320, 240));
    }

    #[test]
    fn identifiers_stop_at_u32_max() {
        assert_eq!(next_object_id(None).unwrap(), ObjectId::new(0));
        assert_eq!(
            next_object_id(Some(ObjectId::new(41))).unwrap(),
            ObjectId::new(42)
        );
        assert!(matches!(
            next_object_id(Some(ObjectId::new(u32::MAX))),
            Err(RendererError::ResourceAllocation(_))
        ));
    }

    #[test]
    fn halves_round_up() {
        assert_eq!(normalized_to_pixel(0.0, 0.0, 5, 3), IVec2::new(3, 2));
        // Off-screen points round towards positive infinity as well.
        assert_eq!(normalized_to_pixel(-1.5, 0.0, 2, 2), IVec2::new(0, 1));
    }
}
