//! In-memory backend that records every command instead of talking to a GPU.
//!
//! The headless host keeps a small simulated document (an optional root body
//! plus elements registered by id), the canvases created on it, and a GL-like
//! context. Clones share state, so a caller can hand one clone to a renderer
//! and inspect the other.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use parking_lot::Mutex;

use super::{
    ClearTargets, ContextError, DepthFunc, GraphicsContext, Host, ShaderStage, Surface, Topology,
};
use crate::color::Color;
use crate::error::BackendError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShaderId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramId(pub u32);

/// Uniform slot of a linked program, addressed by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformSlot {
    pub program: ProgramId,
    pub name: String,
}

/// Command issued against a [`HeadlessContext`], in call order.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Viewport {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
    },
    ClearColor(Color),
    EnableDepthTest(DepthFunc),
    Clear(ClearTargets),
    CreateBuffer(BufferId),
    BindArrayBuffer(Option<BufferId>),
    UploadArrayBuffer {
        buffer: Option<BufferId>,
        len: usize,
    },
    DeleteBuffer(BufferId),
    CreateShader(ShaderId, ShaderStage),
    CompileShader {
        shader: ShaderId,
        ok: bool,
    },
    DeleteShader(ShaderId),
    CreateProgram(ProgramId),
    AttachShader {
        program: ProgramId,
        shader: ShaderId,
    },
    LinkProgram {
        program: ProgramId,
        ok: bool,
    },
    UseProgram(Option<ProgramId>),
    DeleteProgram(ProgramId),
    EnableVertexAttribArray(u32),
    VertexAttribPointer {
        index: u32,
        components: u32,
        buffer: Option<BufferId>,
    },
    UniformMatrix4 {
        name: Option<String>,
        columns: [f32; 16],
    },
    DrawArrays {
        topology: Topology,
        first: u32,
        count: u32,
    },
}

/// Failures the headless backend can be told to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HeadlessFaults {
    /// Surfaces report no GPU context support.
    pub context_unavailable: bool,
    /// `viewport` raises an error flag.
    pub reject_configuration: bool,
    pub reject_buffer_allocation: bool,
    pub reject_link: bool,
    /// Every draw call raises an error flag.
    pub reject_draw: bool,
}

#[derive(Debug)]
struct ShaderRecord {
    stage: ShaderStage,
    source: String,
    compiled: bool,
}

#[derive(Debug, Default)]
struct ProgramRecord {
    shaders: Vec<ShaderId>,
    linked: bool,
    attributes: Vec<String>,
    uniforms: Vec<String>,
}

#[derive(Debug, Default)]
struct GlState {
    faults: HeadlessFaults,
    commands: Vec<Command>,
    next_name: u32,
    buffers: HashMap<BufferId, Vec<f32>>,
    shaders: HashMap<ShaderId, ShaderRecord>,
    programs: HashMap<ProgramId, ProgramRecord>,
    bound_buffer: Option<BufferId>,
    current_program: Option<ProgramId>,
    enabled_attributes: BTreeSet<u32>,
    attribute_pointers: HashMap<u32, (BufferId, u32)>,
    pending_error: Option<ContextError>,
}

impl GlState {
    fn allocate_name(&mut self) -> u32 {
        self.next_name += 1;
        self.next_name
    }

    fn raise(&mut self, error: ContextError) {
        // GL keeps the first error until it is read.
        if self.pending_error.is_none() {
            self.pending_error = Some(error);
        }
    }

    fn validate_draw(&self, first: u32, count: u32) -> Result<(), ContextError> {
        let program = self
            .current_program
            .and_then(|id| self.programs.get(&id))
            .ok_or(ContextError::InvalidOperation)?;
        if !program.linked {
            return Err(ContextError::InvalidOperation);
        }
        let end = first as usize + count as usize;
        for index in &self.enabled_attributes {
            let (buffer, components) = self
                .attribute_pointers
                .get(index)
                .ok_or(ContextError::InvalidOperation)?;
            let len = self
                .buffers
                .get(buffer)
                .map(Vec::len)
                .ok_or(ContextError::InvalidOperation)?;
            if len < end * *components as usize {
                return Err(ContextError::InvalidOperation);
            }
        }
        Ok(())
    }
}

/// Recording GL context. Clones observe the same state.
#[derive(Debug, Clone)]
pub struct HeadlessContext {
    gl: Arc<Mutex<GlState>>,
}

impl HeadlessContext {
    /// Every command issued so far.
    pub fn commands(&self) -> Vec<Command> {
        self.gl.lock().commands.clone()
    }

    pub fn clear_commands(&self) {
        self.gl.lock().commands.clear();
    }

    /// `(topology, first, count)` of every draw call issued so far.
    pub fn draw_calls(&self) -> Vec<(Topology, u32, u32)> {
        self.gl
            .lock()
            .commands
            .iter()
            .filter_map(|command| match command {
                Command::DrawArrays {
                    topology,
                    first,
                    count,
                } => Some((*topology, *first, *count)),
                _ => None,
            })
            .collect()
    }

    /// Contents last uploaded into a live buffer.
    pub fn buffer_data(&self, buffer: BufferId) -> Option<Vec<f32>> {
        self.gl.lock().buffers.get(&buffer).cloned()
    }

    pub fn live_buffer_count(&self) -> usize {
        self.gl.lock().buffers.len()
    }

    pub fn live_program_count(&self) -> usize {
        self.gl.lock().programs.len()
    }

    pub fn live_shader_count(&self) -> usize {
        self.gl.lock().shaders.len()
    }

    pub fn current_program(&self) -> Option<ProgramId> {
        self.gl.lock().current_program
    }

    pub fn set_faults(&self, faults: HeadlessFaults) {
        self.gl.lock().faults = faults;
    }

    fn record(&self, command: Command) {
        self.gl.lock().commands.push(command);
    }
}

impl GraphicsContext for HeadlessContext {
    type Buffer = BufferId;
    type Shader = ShaderId;
    type Program = ProgramId;
    type UniformLocation = UniformSlot;

    fn viewport(&self, x: i32, y: i32, width: u32, height: u32) {
        let mut gl = self.gl.lock();
        if gl.faults.reject_configuration {
            gl.raise(ContextError::InvalidValue);
        }
        gl.commands.push(Command::Viewport {
            x,
            y,
            width,
            height,
        });
    }

    fn clear_color(&self, color: Color) {
        self.record(Command::ClearColor(color));
    }

    fn enable_depth_test(&self, func: DepthFunc) {
        self.record(Command::EnableDepthTest(func));
    }

    fn clear(&self, targets: ClearTargets) {
        self.record(Command::Clear(targets));
    }

    fn take_error(&self) -> Option<ContextError> {
        self.gl.lock().pending_error.take()
    }

    fn create_buffer(&self) -> Result<BufferId, BackendError> {
        let mut gl = self.gl.lock();
        if gl.faults.reject_buffer_allocation {
            return Err(BackendError::new("buffer allocation rejected"));
        }
        let id = BufferId(gl.allocate_name());
        gl.buffers.insert(id, Vec::new());
        gl.commands.push(Command::CreateBuffer(id));
        Ok(id)
    }

    fn bind_array_buffer(&self, buffer: Option<&BufferId>) {
        let mut gl = self.gl.lock();
        match buffer {
            Some(id) if !gl.buffers.contains_key(id) => gl.raise(ContextError::InvalidOperation),
            _ => gl.bound_buffer = buffer.copied(),
        }
        gl.commands.push(Command::BindArrayBuffer(buffer.copied()));
    }

    fn upload_array_buffer(&self, data: &[f32]) {
        let mut gl = self.gl.lock();
        let bound = gl.bound_buffer;
        let stored = match bound {
            Some(id) => gl.buffers.get_mut(&id).map(|contents| *contents = data.to_vec()),
            None => None,
        };
        if stored.is_none() {
            gl.raise(ContextError::InvalidOperation);
        }
        gl.commands.push(Command::UploadArrayBuffer {
            buffer: bound,
            len: data.len(),
        });
    }

    fn delete_buffer(&self, buffer: &BufferId) {
        let mut gl = self.gl.lock();
        gl.buffers.remove(buffer);
        if gl.bound_buffer == Some(*buffer) {
            gl.bound_buffer = None;
        }
        gl.attribute_pointers.retain(|_, (id, _)| *id != *buffer);
        gl.commands.push(Command::DeleteBuffer(*buffer));
    }

    fn create_shader(&self, stage: ShaderStage) -> Result<ShaderId, BackendError> {
        let mut gl = self.gl.lock();
        let id = ShaderId(gl.allocate_name());
        gl.shaders.insert(
            id,
            ShaderRecord {
                stage,
                source: String::new(),
                compiled: false,
            },
        );
        gl.commands.push(Command::CreateShader(id, stage));
        Ok(id)
    }

    fn compile_shader(&self, shader: &ShaderId, source: &str) -> Result<(), String> {
        let mut gl = self.gl.lock();
        let Some(record) = gl.shaders.get_mut(shader) else {
            gl.raise(ContextError::InvalidValue);
            return Err(format!("shader {} does not exist", shader.0));
        };
        record.source = source.to_string();
        record.compiled = declares_main(source);
        let ok = record.compiled;
        gl.commands.push(Command::CompileShader {
            shader: *shader,
            ok,
        });
        if ok {
            Ok(())
        } else {
            Err("ERROR: 0:1: 'main' : function not defined".to_string())
        }
    }

    fn delete_shader(&self, shader: &ShaderId) {
        let mut gl = self.gl.lock();
        gl.shaders.remove(shader);
        gl.commands.push(Command::DeleteShader(*shader));
    }

    fn create_program(&self) -> Result<ProgramId, BackendError> {
        let mut gl = self.gl.lock();
        let id = ProgramId(gl.allocate_name());
        gl.programs.insert(id, ProgramRecord::default());
        gl.commands.push(Command::CreateProgram(id));
        Ok(id)
    }

    fn attach_shader(&self, program: &ProgramId, shader: &ShaderId) {
        let mut gl = self.gl.lock();
        match gl.programs.get_mut(program) {
            Some(record) => record.shaders.push(*shader),
            None => gl.raise(ContextError::InvalidValue),
        }
        gl.commands.push(Command::AttachShader {
            program: *program,
            shader: *shader,
        });
    }

    fn link_program(&self, program: &ProgramId) -> Result<(), String> {
        let mut gl = self.gl.lock();
        let outcome = if gl.faults.reject_link {
            Err("link rejected by driver".to_string())
        } else {
            link_attached(&gl, program)
        };
        let ok = match (&outcome, gl.programs.get_mut(program)) {
            (Ok((attributes, uniforms)), Some(record)) => {
                record.linked = true;
                record.attributes = attributes.clone();
                record.uniforms = uniforms.clone();
                true
            }
            _ => false,
        };
        gl.commands.push(Command::LinkProgram {
            program: *program,
            ok,
        });
        outcome.map(|_| ())
    }

    fn use_program(&self, program: Option<&ProgramId>) {
        let mut gl = self.gl.lock();
        match program {
            Some(id) if !gl.programs.get(id).is_some_and(|record| record.linked) => {
                gl.raise(ContextError::InvalidOperation)
            }
            _ => gl.current_program = program.copied(),
        }
        gl.commands.push(Command::UseProgram(program.copied()));
    }

    fn delete_program(&self, program: &ProgramId) {
        let mut gl = self.gl.lock();
        gl.programs.remove(program);
        if gl.current_program == Some(*program) {
            gl.current_program = None;
        }
        gl.commands.push(Command::DeleteProgram(*program));
    }

    fn attrib_location(&self, program: &ProgramId, name: &str) -> Option<u32> {
        let gl = self.gl.lock();
        let record = gl.programs.get(program).filter(|record| record.linked)?;
        record
            .attributes
            .iter()
            .position(|attribute| attribute == name)
            .map(|index| index as u32)
    }

    fn uniform_location(&self, program: &ProgramId, name: &str) -> Option<UniformSlot> {
        let gl = self.gl.lock();
        let record = gl.programs.get(program).filter(|record| record.linked)?;
        record
            .uniforms
            .iter()
            .any(|uniform| uniform == name)
            .then(|| UniformSlot {
                program: *program,
                name: name.to_string(),
            })
    }

    fn enable_vertex_attrib_array(&self, index: u32) {
        let mut gl = self.gl.lock();
        gl.enabled_attributes.insert(index);
        gl.commands.push(Command::EnableVertexAttribArray(index));
    }

    fn vertex_attrib_pointer_f32(&self, index: u32, components: u32) {
        let mut gl = self.gl.lock();
        let bound = gl.bound_buffer;
        match bound {
            Some(buffer) if (1..=4).contains(&components) => {
                gl.attribute_pointers.insert(index, (buffer, components));
            }
            _ => gl.raise(ContextError::InvalidOperation),
        }
        gl.commands.push(Command::VertexAttribPointer {
            index,
            components,
            buffer: bound,
        });
    }

    fn uniform_matrix4(&self, location: Option<&UniformSlot>, columns: &[f32; 16]) {
        let mut gl = self.gl.lock();
        if let Some(slot) = location {
            if gl.current_program != Some(slot.program) {
                gl.raise(ContextError::InvalidOperation);
            }
        }
        gl.commands.push(Command::UniformMatrix4 {
            name: location.map(|slot| slot.name.clone()),
            columns: *columns,
        });
    }

    fn draw_arrays(&self, topology: Topology, first: u32, count: u32) {
        let mut gl = self.gl.lock();
        if gl.faults.reject_draw {
            gl.raise(ContextError::OutOfMemory);
        } else if let Err(error) = gl.validate_draw(first, count) {
            gl.raise(error);
        }
        gl.commands.push(Command::DrawArrays {
            topology,
            first,
            count,
        });
    }
}

/// Resolves the attribute and uniform names of a program about to link.
fn link_attached(
    gl: &GlState,
    program: &ProgramId,
) -> Result<(Vec<String>, Vec<String>), String> {
    let record = gl
        .programs
        .get(program)
        .ok_or_else(|| format!("program {} does not exist", program.0))?;
    let shader = |stage: ShaderStage| {
        record
            .shaders
            .iter()
            .filter_map(|id| gl.shaders.get(id))
            .find(|shader| shader.stage == stage && shader.compiled)
    };
    let (Some(vertex), Some(fragment)) = (shader(ShaderStage::Vertex), shader(ShaderStage::Fragment))
    else {
        return Err("a compiled vertex and fragment shader must be attached".to_string());
    };

    let attributes = declared_names(&vertex.source, &["attribute", "in"]);
    let mut uniforms = declared_names(&vertex.source, &["uniform"]);
    for name in declared_names(&fragment.source, &["uniform"]) {
        if !uniforms.contains(&name) {
            uniforms.push(name);
        }
    }
    Ok((attributes, uniforms))
}

fn strip_line_comments(source: &str) -> String {
    source
        .lines()
        .map(|line| line.split("//").next().unwrap_or_default())
        .collect::<Vec<_>>()
        .join("\n")
}

fn declares_main(source: &str) -> bool {
    let cleaned = strip_line_comments(source);
    let mut tokens = cleaned.split_whitespace().peekable();
    while let Some(token) = tokens.next() {
        if token == "void" {
            if let Some(next) = tokens.peek() {
                if *next == "main" || next.starts_with("main(") {
                    return true;
                }
            }
        }
    }
    false
}

/// Names declared by top-level statements starting with one of `qualifiers`,
/// e.g. `attribute vec3 a_position;`.
fn declared_names(source: &str, qualifiers: &[&str]) -> Vec<String> {
    strip_line_comments(source)
        .split(';')
        .filter_map(|statement| {
            let tokens: Vec<&str> = statement.split_whitespace().collect();
            let first = tokens.first()?;
            if tokens.len() < 3 || !qualifiers.contains(first) {
                return None;
            }
            let name = *tokens.last()?;
            Some(name.split('[').next().unwrap_or(name).to_string())
        })
        .collect()
}

/// Element of the simulated document; used as a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadlessElement {
    pub index: usize,
    pub tag: String,
    pub id: Option<String>,
}

/// Observable state of a canvas created by the headless host.
#[derive(Debug, Clone, PartialEq)]
pub struct CanvasState {
    pub width: u32,
    pub height: u32,
    pub background: Color,
    pub container: HeadlessElement,
}

#[derive(Debug, Default)]
struct DocumentState {
    elements: Vec<HeadlessElement>,
    body: Option<usize>,
    canvases: Vec<Arc<Mutex<CanvasState>>>,
}

impl DocumentState {
    fn push_element(&mut self, tag: &str, id: Option<String>) -> HeadlessElement {
        let element = HeadlessElement {
            index: self.elements.len(),
            tag: tag.to_string(),
            id,
        };
        self.elements.push(element.clone());
        element
    }
}

/// Canvas on the simulated document.
#[derive(Debug)]
pub struct HeadlessSurface {
    canvas: Arc<Mutex<CanvasState>>,
    document: Arc<Mutex<DocumentState>>,
    gl: Arc<Mutex<GlState>>,
}

impl HeadlessSurface {
    pub fn state(&self) -> CanvasState {
        self.canvas.lock().clone()
    }
}

impl Surface for HeadlessSurface {
    type Context = HeadlessContext;

    fn set_width(&mut self, width: u32) {
        self.canvas.lock().width = width;
    }

    fn set_height(&mut self, height: u32) {
        self.canvas.lock().height = height;
    }

    fn set_background(&mut self, color: Color) {
        self.canvas.lock().background = color;
    }

    fn request_context(&self) -> Result<Option<HeadlessContext>, BackendError> {
        if self.gl.lock().faults.context_unavailable {
            return Ok(None);
        }
        Ok(Some(HeadlessContext {
            gl: Arc::clone(&self.gl),
        }))
    }

    fn detach(self) {
        self.document
            .lock()
            .canvases
            .retain(|canvas| !Arc::ptr_eq(canvas, &self.canvas));
    }
}

/// Simulated document and GPU. Clones share state.
#[derive(Debug, Clone)]
pub struct HeadlessHost {
    document: Arc<Mutex<DocumentState>>,
    gl: Arc<Mutex<GlState>>,
}

impl Default for HeadlessHost {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessHost {
    /// Document with a root body element.
    pub fn new() -> Self {
        let host = Self::without_body();
        {
            let mut document = host.document.lock();
            let body = document.push_element("body", None);
            document.body = Some(body.index);
        }
        host
    }

    /// Document without a root body element.
    pub fn without_body() -> Self {
        Self {
            document: Arc::new(Mutex::new(DocumentState::default())),
            gl: Arc::new(Mutex::new(GlState::default())),
        }
    }

    pub fn with_faults(self, faults: HeadlessFaults) -> Self {
        self.gl.lock().faults = faults;
        self
    }

    /// Adds a `div` with the given id to the document.
    pub fn add_element(&self, id: &str) -> HeadlessElement {
        self.document.lock().push_element("div", Some(id.to_string()))
    }

    /// Snapshots of every canvas created so far.
    pub fn canvases(&self) -> Vec<CanvasState> {
        self.document
            .lock()
            .canvases
            .iter()
            .map(|canvas| canvas.lock().clone())
            .collect()
    }

    /// Context handle sharing the host's GPU state, for inspection.
    pub fn context(&self) -> HeadlessContext {
        HeadlessContext {
            gl: Arc::clone(&self.gl),
        }
    }
}

impl Host for HeadlessHost {
    type Container = HeadlessElement;
    type Context = HeadlessContext;
    type Surface = HeadlessSurface;

    fn root_container(&self) -> Option<HeadlessElement> {
        let document = self.document.lock();
        document
            .body
            .and_then(|index| document.elements.get(index).cloned())
    }

    fn container_by_id(&self, id: &str) -> Option<HeadlessElement> {
        self.document
            .lock()
            .elements
            .iter()
            .find(|element| element.id.as_deref() == Some(id))
            .cloned()
    }

    fn create_surface(
        &self,
        width: u32,
        height: u32,
        background: Color,
        container: &HeadlessElement,
    ) -> Result<HeadlessSurface, BackendError> {
        let mut document = self.document.lock();
        if document.elements.get(container.index) != Some(container) {
            return Err(BackendError::new(format!(
                "container <{}> is not part of the document",
                container.tag
            )));
        }
        let canvas = Arc::new(Mutex::new(CanvasState {
            width,
            height,
            background,
            container: container.clone(),
        }));
        document.canvases.push(Arc::clone(&canvas));
        Ok(HeadlessSurface {
            canvas,
            document: Arc::clone(&self.document),
            gl: Arc::clone(&self.gl),
        })
    }
}
