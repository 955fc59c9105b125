use log::debug;
use serde::{Deserialize, Serialize};

use crate::backend::{GraphicsContext, ShaderStage};
use crate::error::{RendererError, Result};

/// Names the renderer looks up in a linked program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShaderBindings {
    pub position_attribute: String,
    pub color_attribute: String,
    pub projection_uniform: String,
    pub view_uniform: String,
}

impl Default for ShaderBindings {
    fn default() -> Self {
        Self {
            position_attribute: "a_position".to_string(),
            color_attribute: "a_color".to_string(),
            projection_uniform: "u_projection".to_string(),
            view_uniform: "u_view".to_string(),
        }
    }
}

/// Vertex shader matching [`ShaderBindings::default`].
pub const DEFAULT_VERTEX_SHADER: &str = r#"
attribute vec3 a_position;
attribute vec4 a_color;

uniform mat4 u_view;
uniform mat4 u_projection;

varying lowp vec4 v_color;

void main(void) {
    gl_Position = u_projection * u_view * vec4(a_position, 1.0);
    v_color = a_color;
}
"#;

/// Fragment shader passing the interpolated vertex color through.
pub const DEFAULT_FRAGMENT_SHADER: &str = r#"
varying lowp vec4 v_color;

void main(void) {
    // TODO: modulate by a diffuse term once scene objects carry normals.
    gl_FragColor = v_color;
}
"#;

/// Linked program with the attribute and uniform slots the renderer feeds.
#[derive(Debug)]
pub struct ShaderProgram<C: GraphicsContext> {
    program: C::Program,
    position_location: u32,
    color_location: u32,
    projection_uniform: Option<C::UniformLocation>,
    view_uniform: Option<C::UniformLocation>,
}

impl<C: GraphicsContext> ShaderProgram<C> {
    /// Compiles both stages, links them, activates the program and enables
    /// the position and color attributes.
    pub fn link(
        context: &C,
        vertex_source: &str,
        fragment_source: &str,
        bindings: &ShaderBindings,
    ) -> Result<Self> {
        let fragment = compile(context, ShaderStage::Fragment, fragment_source)?;
        let vertex = match compile(context, ShaderStage::Vertex, vertex_source) {
            Ok(vertex) => vertex,
            Err(err) => {
                context.delete_shader(&fragment);
                return Err(err);
            }
        };

        let linked = link_program(context, &vertex, &fragment);
        // The program keeps its own reference to attached shaders.
        context.delete_shader(&vertex);
        context.delete_shader(&fragment);
        let program = linked?;

        context.use_program(Some(&program));
        let locate = |name: &str| {
            context.attrib_location(&program, name).ok_or_else(|| {
                RendererError::ShaderLink(format!("attribute `{name}` is not active"))
            })
        };
        let locations = locate(&bindings.position_attribute)
            .and_then(|position| Ok((position, locate(&bindings.color_attribute)?)));
        let (position_location, color_location) = match locations {
            Ok(locations) => locations,
            Err(err) => {
                context.use_program(None);
                context.delete_program(&program);
                return Err(err);
            }
        };
        context.enable_vertex_attrib_array(position_location);
        context.enable_vertex_attrib_array(color_location);

        let projection_uniform = context.uniform_location(&program, &bindings.projection_uniform);
        let view_uniform = context.uniform_location(&program, &bindings.view_uniform);
        debug!(
            "linked shader program {program:?} (position={position_location}, color={color_location})"
        );

        Ok(Self {
            program,
            position_location,
            color_location,
            projection_uniform,
            view_uniform,
        })
    }

    pub fn program(&self) -> &C::Program {
        &self.program
    }

    pub fn position_location(&self) -> u32 {
        self.position_location
    }

    pub fn color_location(&self) -> u32 {
        self.color_location
    }

    pub fn projection_uniform(&self) -> Option<&C::UniformLocation> {
        self.projection_uniform.as_ref()
    }

    pub fn view_uniform(&self) -> Option<&C::UniformLocation> {
        self.view_uniform.as_ref()
    }

    /// Deletes the program from the context.
    pub fn release(self, context: &C) {
        context.delete_program(&self.program);
    }
}

fn compile<C: GraphicsContext>(context: &C, stage: ShaderStage, source: &str) -> Result<C::Shader> {
    let shader = context
        .create_shader(stage)
        .map_err(|err| RendererError::ShaderCompilation {
            stage,
            log: err.to_string(),
        })?;
    match context.compile_shader(&shader, source) {
        Ok(()) => Ok(shader),
        Err(log) => {
            context.delete_shader(&shader);
            Err(RendererError::ShaderCompilation { stage, log })
        }
    }
}

fn link_program<C: GraphicsContext>(
    context: &C,
    vertex: &C::Shader,
    fragment: &C::Shader,
) -> Result<C::Program> {
    let program = context
        .create_program()
        .map_err(|err| RendererError::ShaderLink(err.to_string()))?;
    context.attach_shader(&program, vertex);
    context.attach_shader(&program, fragment);
    match context.link_program(&program) {
        Ok(()) => Ok(program),
        Err(log) => {
            context.delete_program(&program);
            Err(RendererError::ShaderLink(log))
        }
    }
}
