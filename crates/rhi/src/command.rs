//! Command buffer recording.
//!
//! This module provides the CPU-side recorder each frame resource owns.
//!
//! # Overview
//!
//! - [`Command`] is one recorded GPU command
//! - [`CommandBuffer`] records commands between [`begin`](CommandBuffer::begin)
//!   and [`end`](CommandBuffer::end) and is handed to a
//!   [`CommandQueue`](crate::queue::CommandQueue) for submission
//!
//! A command buffer's storage may only be reset once the GPU has finished
//! executing its previous submission; the frame ring enforces this by
//! waiting on the slot's fence before handing the buffer out again.
//!
//! # Example
//!
//! ```
//! use frameflight_rhi::command::{CommandBuffer, PipelineHandle};
//! use frameflight_rhi::vk;
//!
//! # fn example() -> Result<(), frameflight_rhi::RhiError> {
//! let mut cmd = CommandBuffer::new("frame 0");
//! cmd.reset()?;
//! cmd.begin()?;
//! cmd.set_pipeline(PipelineHandle::new(0));
//! cmd.set_primitive_topology(vk::PrimitiveTopology::TRIANGLE_LIST);
//! cmd.draw_indexed(36, 0, 0);
//! cmd.end()?;
//! assert_eq!(cmd.draw_count(), 1);
//! # Ok(())
//! # }
//! ```

use ash::vk;

use crate::buffer::{BufferView, GpuAddress};
use crate::error::{RhiError, RhiResult};

/// Opaque identity of a compiled pipeline state object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PipelineHandle(u32);

impl PipelineHandle {
    /// Wraps a raw pipeline index.
    #[inline]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw pipeline index.
    #[inline]
    pub const fn index(self) -> u32 {
        self.0
    }
}

/// A single recorded command.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Clear the render target to an RGBA colour and reset depth.
    Clear([f32; 4]),
    /// Switch pipeline state.
    SetPipeline(PipelineHandle),
    /// Bind the pass-global constant block.
    BindPassConstants(GpuAddress),
    /// Bind one object's constants.
    BindObjectConstants(GpuAddress),
    /// Bind one material's constants.
    BindMaterialConstants(GpuAddress),
    /// Bind the diffuse texture at a descriptor-heap slot.
    BindTexture(u32),
    /// Bind the vertex buffer.
    BindVertexBuffer(BufferView),
    /// Bind the index buffer.
    BindIndexBuffer(BufferView),
    /// Set the input-assembler topology.
    SetPrimitiveTopology(vk::PrimitiveTopology),
    /// Indexed draw.
    DrawIndexed {
        /// Number of indices to draw.
        index_count: u32,
        /// First index in the bound index buffer.
        first_index: u32,
        /// Value added to each index before fetching a vertex.
        vertex_offset: i32,
    },
}

/// Recording state of a [`CommandBuffer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandBufferState {
    /// Reset and ready to begin.
    Initial,
    /// Between `begin` and `end`.
    Recording,
    /// Closed and ready for submission.
    Executable,
}

/// Command recorder with its own backing storage.
///
/// # Thread Safety
///
/// The buffer is owned by a single frame resource and only touched by the
/// frame loop thread. Queues copy the recorded commands at submission.
#[derive(Debug)]
pub struct CommandBuffer {
    label: String,
    commands: Vec<Command>,
    state: CommandBufferState,
    resets: u64,
}

impl CommandBuffer {
    /// Creates an empty command buffer in the initial state.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            commands: Vec::new(),
            state: CommandBufferState::Initial,
            resets: 0,
        }
    }

    /// Discards recorded commands, keeping the allocation.
    ///
    /// The caller must guarantee the GPU finished the last submission of
    /// this buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer is still recording.
    pub fn reset(&mut self) -> RhiResult<()> {
        if self.state == CommandBufferState::Recording {
            return Err(RhiError::InvalidState(format!(
                "command buffer '{}' reset while recording",
                self.label
            )));
        }
        self.commands.clear();
        self.state = CommandBufferState::Initial;
        self.resets += 1;
        Ok(())
    }

    /// Begins recording.
    ///
    /// # Errors
    ///
    /// Returns an error unless the buffer is in the initial state.
    pub fn begin(&mut self) -> RhiResult<()> {
        if self.state != CommandBufferState::Initial {
            return Err(RhiError::InvalidState(format!(
                "command buffer '{}' begin in state {:?}",
                self.label, self.state
            )));
        }
        self.state = CommandBufferState::Recording;
        Ok(())
    }

    /// Ends recording.
    ///
    /// # Errors
    ///
    /// Returns an error unless the buffer is recording.
    pub fn end(&mut self) -> RhiResult<()> {
        if self.state != CommandBufferState::Recording {
            return Err(RhiError::InvalidState(format!(
                "command buffer '{}' end in state {:?}",
                self.label, self.state
            )));
        }
        self.state = CommandBufferState::Executable;
        Ok(())
    }

    fn record(&mut self, command: Command) {
        debug_assert_eq!(
            self.state,
            CommandBufferState::Recording,
            "command recorded outside begin/end"
        );
        self.commands.push(command);
    }

    /// Clears colour and depth.
    pub fn clear(&mut self, color: [f32; 4]) {
        self.record(Command::Clear(color));
    }

    /// Binds a pipeline.
    pub fn set_pipeline(&mut self, pipeline: PipelineHandle) {
        self.record(Command::SetPipeline(pipeline));
    }

    /// Binds the pass constant block.
    pub fn bind_pass_constants(&mut self, address: GpuAddress) {
        self.record(Command::BindPassConstants(address));
    }

    /// Binds one object's constants.
    pub fn bind_object_constants(&mut self, address: GpuAddress) {
        self.record(Command::BindObjectConstants(address));
    }

    /// Binds one material's constants.
    pub fn bind_material_constants(&mut self, address: GpuAddress) {
        self.record(Command::BindMaterialConstants(address));
    }

    /// Binds a texture by descriptor-heap slot.
    pub fn bind_texture(&mut self, heap_index: u32) {
        self.record(Command::BindTexture(heap_index));
    }

    /// Binds a vertex buffer.
    pub fn bind_vertex_buffer(&mut self, view: BufferView) {
        self.record(Command::BindVertexBuffer(view));
    }

    /// Binds an index buffer.
    pub fn bind_index_buffer(&mut self, view: BufferView) {
        self.record(Command::BindIndexBuffer(view));
    }

    /// Sets the primitive topology.
    pub fn set_primitive_topology(&mut self, topology: vk::PrimitiveTopology) {
        self.record(Command::SetPrimitiveTopology(topology));
    }

    /// Records an indexed draw.
    pub fn draw_indexed(&mut self, index_count: u32, first_index: u32, vertex_offset: i32) {
        self.record(Command::DrawIndexed {
            index_count,
            first_index,
            vertex_offset,
        });
    }

    /// Returns the recorded commands.
    #[inline]
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Number of recorded draw commands.
    pub fn draw_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, Command::DrawIndexed { .. }))
            .count()
    }

    /// Returns the current recording state.
    #[inline]
    pub fn state(&self) -> CommandBufferState {
        self.state
    }

    /// Returns the label given at creation.
    #[inline]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Number of times the buffer has been reset.
    #[inline]
    pub fn reset_count(&self) -> u64 {
        self.resets
    }
}
