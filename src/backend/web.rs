use log::warn;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{
    Document, Element, HtmlCanvasElement, WebGl2RenderingContext as Gl, WebGlBuffer, WebGlProgram,
    WebGlShader, WebGlUniformLocation,
};

use super::{
    ClearTargets, ContextError, DepthFunc, GraphicsContext, Host, ShaderStage, Surface, Topology,
};
use crate::color::Color;
use crate::error::BackendError;

fn js_error(err: JsValue) -> BackendError {
    BackendError::new(err.as_string().unwrap_or_else(|| format!("{err:?}")))
}

/// Browser document hosting canvases.
#[derive(Debug, Clone)]
pub struct WebHost {
    document: Document,
}

impl WebHost {
    pub fn new() -> Result<Self, BackendError> {
        let document = web_sys::window()
            .and_then(|window| window.document())
            .ok_or_else(|| BackendError::new("document not available"))?;
        Ok(Self { document })
    }
}

impl Host for WebHost {
    type Container = Element;
    type Context = WebContext;
    type Surface = WebSurface;

    fn root_container(&self) -> Option<Element> {
        self.document.body().map(Element::from)
    }

    fn container_by_id(&self, id: &str) -> Option<Element> {
        self.document.get_element_by_id(id)
    }

    fn create_surface(
        &self,
        width: u32,
        height: u32,
        background: Color,
        container: &Element,
    ) -> Result<WebSurface, BackendError> {
        let canvas = self
            .document
            .create_element("canvas")
            .map_err(js_error)?
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|_| BackendError::new("created element is not a canvas"))?;
        let mut surface = WebSurface { canvas };
        surface.set_width(width);
        surface.set_height(height);
        surface.set_background(background);
        container.append_child(&surface.canvas).map_err(js_error)?;
        Ok(surface)
    }
}

/// Canvas element the renderer draws into.
#[derive(Debug)]
pub struct WebSurface {
    canvas: HtmlCanvasElement,
}

impl WebSurface {
    pub fn canvas(&self) -> &HtmlCanvasElement {
        &self.canvas
    }

    fn restyle(&self, property: &str, value: &str) {
        if let Err(err) = self.canvas.style().set_property(property, value) {
            warn!("failed to set canvas {property}: {}", js_error(err));
        }
    }
}

impl Surface for WebSurface {
    type Context = WebContext;

    fn set_width(&mut self, width: u32) {
        self.canvas.set_width(width);
        self.restyle("width", &format!("{width}px"));
    }

    fn set_height(&mut self, height: u32) {
        self.canvas.set_height(height);
        self.restyle("height", &format!("{height}px"));
    }

    fn set_background(&mut self, color: Color) {
        self.restyle("background-color", &color.to_css());
    }

    fn request_context(&self) -> Result<Option<WebContext>, BackendError> {
        let Some(context) = self.canvas.get_context("webgl2").map_err(js_error)? else {
            return Ok(None);
        };
        let gl = context
            .dyn_into::<Gl>()
            .map_err(|_| BackendError::new("canvas context is not WebGL2"))?;
        Ok(Some(WebContext { gl }))
    }

    fn detach(self) {
        self.canvas.remove();
    }
}

/// WebGL2 context.
#[derive(Debug, Clone)]
pub struct WebContext {
    gl: Gl,
}

impl WebContext {
    pub fn gl(&self) -> &Gl {
        &self.gl
    }
}

impl GraphicsContext for WebContext {
    type Buffer = WebGlBuffer;
    type Shader = WebGlShader;
    type Program = WebGlProgram;
    type UniformLocation = WebGlUniformLocation;

    fn viewport(&self, x: i32, y: i32, width: u32, height: u32) {
        self.gl.viewport(x, y, width as i32, height as i32);
    }

    fn clear_color(&self, color: Color) {
        self.gl.clear_color(color.r, color.g, color.b, color.a);
    }

    fn enable_depth_test(&self, func: DepthFunc) {
        self.gl.enable(Gl::DEPTH_TEST);
        self.gl.depth_func(match func {
            DepthFunc::Less => Gl::LESS,
            DepthFunc::LessOrEqual => Gl::LEQUAL,
            DepthFunc::Always => Gl::ALWAYS,
        });
    }

    fn clear(&self, targets: ClearTargets) {
        let mut mask = 0;
        if targets.color {
            mask |= Gl::COLOR_BUFFER_BIT;
        }
        if targets.depth {
            mask |= Gl::DEPTH_BUFFER_BIT;
        }
        self.gl.clear(mask);
    }

    fn take_error(&self) -> Option<ContextError> {
        ContextError::from_code(self.gl.get_error())
    }

    fn create_buffer(&self) -> Result<WebGlBuffer, BackendError> {
        self.gl
            .create_buffer()
            .ok_or_else(|| BackendError::new("unable to create buffer"))
    }

    fn bind_array_buffer(&self, buffer: Option<&WebGlBuffer>) {
        self.gl.bind_buffer(Gl::ARRAY_BUFFER, buffer);
    }

    fn upload_array_buffer(&self, data: &[f32]) {
        self.gl.buffer_data_with_u8_array(
            Gl::ARRAY_BUFFER,
            bytemuck::cast_slice(data),
            Gl::STATIC_DRAW,
        );
    }

    fn delete_buffer(&self, buffer: &WebGlBuffer) {
        self.gl.delete_buffer(Some(buffer));
    }

    fn create_shader(&self, stage: ShaderStage) -> Result<WebGlShader, BackendError> {
        let kind = match stage {
            ShaderStage::Vertex => Gl::VERTEX_SHADER,
            ShaderStage::Fragment => Gl::FRAGMENT_SHADER,
        };
        self.gl
            .create_shader(kind)
            .ok_or_else(|| BackendError::new(format!("unable to create {stage} shader")))
    }

    fn compile_shader(&self, shader: &WebGlShader, source: &str) -> Result<(), String> {
        self.gl.shader_source(shader, source);
        self.gl.compile_shader(shader);
        let compiled = self
            .gl
            .get_shader_parameter(shader, Gl::COMPILE_STATUS)
            .as_bool()
            .unwrap_or(false);
        if compiled {
            Ok(())
        } else {
            Err(self
                .gl
                .get_shader_info_log(shader)
                .unwrap_or_else(|| "unknown compile error".to_string()))
        }
    }

    fn delete_shader(&self, shader: &WebGlShader) {
        self.gl.delete_shader(Some(shader));
    }

    fn create_program(&self) -> Result<WebGlProgram, BackendError> {
        self.gl
            .create_program()
            .ok_or_else(|| BackendError::new("unable to create program"))
    }

    fn attach_shader(&self, program: &WebGlProgram, shader: &WebGlShader) {
        self.gl.attach_shader(program, shader);
    }

    fn link_program(&self, program: &WebGlProgram) -> Result<(), String> {
        self.gl.link_program(program);
        let linked = self
            .gl
            .get_program_parameter(program, Gl::LINK_STATUS)
            .as_bool()
            .unwrap_or(false);
        if linked {
            Ok(())
        } else {
            Err(self
                .gl
                .get_program_info_log(program)
                .unwrap_or_else(|| "unknown link error".to_string()))
        }
    }

    fn use_program(&self, program: Option<&WebGlProgram>) {
        self.gl.use_program(program);
    }

    fn delete_program(&self, program: &WebGlProgram) {
        self.gl.delete_program(Some(program));
    }

    fn attrib_location(&self, program: &WebGlProgram, name: &str) -> Option<u32> {
        // -1 marks an inactive attribute.
        u32::try_from(self.gl.get_attrib_location(program, name)).ok()
    }

    fn uniform_location(&self, program: &WebGlProgram, name: &str) -> Option<WebGlUniformLocation> {
        self.gl.get_uniform_location(program, name)
    }

    fn enable_vertex_attrib_array(&self, index: u32) {
        self.gl.enable_vertex_attrib_array(index);
    }

    fn vertex_attrib_pointer_f32(&self, index: u32, components: u32) {
        self.gl
            .vertex_attrib_pointer_with_i32(index, components as i32, Gl::FLOAT, false, 0, 0);
    }

    fn uniform_matrix4(&self, location: Option<&WebGlUniformLocation>, columns: &[f32; 16]) {
        self.gl
            .uniform_matrix4fv_with_f32_array(location, false, columns);
    }

    fn draw_arrays(&self, topology: Topology, first: u32, count: u32) {
        let mode = match topology {
            Topology::Points => Gl::POINTS,
            Topology::LineStrip => Gl::LINE_STRIP,
            Topology::Triangles => Gl::TRIANGLES,
            Topology::TriangleStrip => Gl::TRIANGLE_STRIP,
        };
        self.gl.draw_arrays(mode, first as i32, count as i32);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    fn surface_in_body(host: &WebHost) -> WebSurface {
        let body = host.root_container().unwrap();
        host.create_surface(120, 80, Color::rgb(1.0, 0.0, 0.0), &body)
            .unwrap()
    }

    #[wasm_bindgen_test]
    fn live_restyle_updates_canvas() {
        let host = WebHost::new().unwrap();
        let mut surface = surface_in_body(&host);
        surface.set_width(200);
        surface.set_background(Color::WHITE);

        let style = surface.canvas().style();
        assert_eq!(surface.canvas().width(), 200);
        assert_eq!(style.get_property_value("width").unwrap(), "200px");
        assert_eq!(style.get_property_value("height").unwrap(), "80px");
        assert_eq!(
            style.get_property_value("background-color").unwrap(),
            "rgb(255, 255, 255)"
        );
        surface.detach();
    }

    #[wasm_bindgen_test]
    fn detached_canvas_leaves_container() {
        let host = WebHost::new().unwrap();
        let surface = surface_in_body(&host);
        let canvas = surface.canvas().clone();
        assert!(canvas.parent_node().is_some());
        surface.detach();
        assert!(canvas.parent_node().is_none());
    }
}
