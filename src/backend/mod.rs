//! Seams between the renderer and the platform it draws on.
//!
//! A [`Host`] resolves containers and creates drawable surfaces, a
//! [`Surface`] hands out a [`GraphicsContext`], and the context issues GL-style
//! commands. The renderer only ever talks to these traits, so the same core
//! drives a browser canvas on wasm32 and the in-memory headless backend.

use std::fmt;

use crate::color::Color;
use crate::error::BackendError;

pub mod headless;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use headless::{HeadlessContext, HeadlessFaults, HeadlessHost, HeadlessSurface};

/// Programmable pipeline stage a shader is compiled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// Buffers affected by a clear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClearTargets {
    pub color: bool,
    pub depth: bool,
}

impl ClearTargets {
    pub const COLOR_AND_DEPTH: Self = Self {
        color: true,
        depth: true,
    };
}

/// Depth comparison used when depth testing is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepthFunc {
    Less,
    LessOrEqual,
    Always,
}

/// Primitive assembly mode for a draw call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
    Points,
    LineStrip,
    Triangles,
    TriangleStrip,
}

/// Pending error flag reported by a context after a failed command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextError {
    InvalidEnum,
    InvalidValue,
    InvalidOperation,
    OutOfMemory,
    ContextLost,
    Other(u32),
}

impl ContextError {
    /// Maps a GL error code; `NO_ERROR` (0) maps to `None`.
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => None,
            0x0500 => Some(Self::InvalidEnum),
            0x0501 => Some(Self::InvalidValue),
            0x0502 => Some(Self::InvalidOperation),
            0x0505 => Some(Self::OutOfMemory),
            0x9242 => Some(Self::ContextLost),
            other => Some(Self::Other(other)),
        }
    }
}

impl fmt::Display for ContextError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextError::InvalidEnum => f.write_str("invalid enum"),
            ContextError::InvalidValue => f.write_str("invalid value"),
            ContextError::InvalidOperation => f.write_str("invalid operation"),
            ContextError::OutOfMemory => f.write_str("out of memory"),
            ContextError::ContextLost => f.write_str("context lost"),
            ContextError::Other(code) => write!(f, "error code {code:#06x}"),
        }
    }
}

/// GL-style command interface of a GPU context.
///
/// Commands that cannot fail synchronously return nothing; failures surface
/// through [`GraphicsContext::take_error`].
pub trait GraphicsContext {
    type Buffer: Clone + fmt::Debug;
    type Shader: fmt::Debug;
    type Program: Clone + fmt::Debug;
    type UniformLocation: fmt::Debug;

    fn viewport(&self, x: i32, y: i32, width: u32, height: u32);
    fn clear_color(&self, color: Color);
    fn enable_depth_test(&self, func: DepthFunc);
    fn clear(&self, targets: ClearTargets);
    /// Returns and resets the pending error flag.
    fn take_error(&self) -> Option<ContextError>;

    fn create_buffer(&self) -> Result<Self::Buffer, BackendError>;
    fn bind_array_buffer(&self, buffer: Option<&Self::Buffer>);
    /// Uploads `data` as static 32-bit floats into the bound array buffer.
    fn upload_array_buffer(&self, data: &[f32]);
    fn delete_buffer(&self, buffer: &Self::Buffer);

    fn create_shader(&self, stage: ShaderStage) -> Result<Self::Shader, BackendError>;
    /// Sets the source and compiles; the error carries the info log.
    fn compile_shader(&self, shader: &Self::Shader, source: &str) -> Result<(), String>;
    fn delete_shader(&self, shader: &Self::Shader);

    fn create_program(&self) -> Result<Self::Program, BackendError>;
    fn attach_shader(&self, program: &Self::Program, shader: &Self::Shader);
    /// Links; the error carries the info log.
    fn link_program(&self, program: &Self::Program) -> Result<(), String>;
    fn use_program(&self, program: Option<&Self::Program>);
    fn delete_program(&self, program: &Self::Program);

    fn attrib_location(&self, program: &Self::Program, name: &str) -> Option<u32>;
    fn uniform_location(&self, program: &Self::Program, name: &str)
        -> Option<Self::UniformLocation>;
    fn enable_vertex_attrib_array(&self, index: u32);
    /// Describes tightly packed f32 components of the bound buffer.
    fn vertex_attrib_pointer_f32(&self, index: u32, components: u32);
    fn uniform_matrix4(&self, location: Option<&Self::UniformLocation>, columns: &[f32; 16]);

    fn draw_arrays(&self, topology: Topology, first: u32, count: u32);
}

/// Drawable area attached to a host container.
pub trait Surface {
    type Context: GraphicsContext;

    fn set_width(&mut self, width: u32);
    fn set_height(&mut self, height: u32);
    fn set_background(&mut self, color: Color);
    /// `Ok(None)` means the surface has no GPU context support.
    fn request_context(&self) -> Result<Option<Self::Context>, BackendError>;
    /// Removes the surface from its container.
    fn detach(self);
}

/// Windowing layer the renderer attaches its surface to.
pub trait Host {
    type Container: Clone + fmt::Debug;
    type Context: GraphicsContext;
    type Surface: Surface<Context = Self::Context>;

    /// The document's root element, if there is one.
    fn root_container(&self) -> Option<Self::Container>;
    fn container_by_id(&self, id: &str) -> Option<Self::Container>;
    /// Creates a surface of the given size and background and attaches it to
    /// `container`.
    fn create_surface(
        &self,
        width: u32,
        height: u32,
        background: Color,
        container: &Self::Container,
    ) -> Result<Self::Surface, BackendError>;
}

/// Shorthand for the buffer type of a host's context.
pub type BufferOf<H> = <<H as Host>::Context as GraphicsContext>::Buffer;
