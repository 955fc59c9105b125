/// GPU buffer plus the metadata a draw call needs to describe it.
///
/// The buffer identifier is owned by the graphics context; the handle only
/// records it.
#[derive(Debug, Clone, PartialEq)]
pub struct GpuHandle<B> {
    buffer: B,
    count: usize,
    components: u32,
}

impl<B> GpuHandle<B> {
    /// Components per point in a vertex buffer.
    pub const POSITION_COMPONENTS: u32 = 3;
    /// Components per RGBA color in a color buffer.
    pub const COLOR_COMPONENTS: u32 = 4;

    pub fn new(buffer: B, count: usize, components: u32) -> Self {
        Self {
            buffer,
            count,
            components,
        }
    }

    pub fn buffer(&self) -> &B {
        &self.buffer
    }

    /// Number of elements stored in the buffer.
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn components(&self) -> u32 {
        self.components
    }

    pub fn into_buffer(self) -> B {
        self.buffer
    }
}
