use std::collections::VecDeque;
use std::sync::Arc;

use lumen_gpu::{Backend, BindGroupEntry, Profiler, TextureHandle};
use tracing::{debug, trace};

use crate::codec::ByteReader;
use crate::error::DecodeError;
use crate::instruction::Instruction;
use crate::opcode::Opcode;
use crate::side::SidePayload;
use crate::stream::DrawStream;

impl DrawStream {
    /// Replays every recorded instruction against `backend`, in recording
    /// order, consuming side payloads as their instructions are reached.
    ///
    /// Embedded and reserved sub-streams run in place. Pages stay allocated
    /// until [`DrawStream::reset`] or drop.
    ///
    /// # Panics
    ///
    /// Panics if the stream has already been executed.
    pub fn run<B: Backend + ?Sized>(&mut self, backend: &mut B) {
        assert!(!self.executed, "draw stream executed twice");
        self.executed = true;

        let mut replay = Replay {
            backend,
            profiler: self.ctx.profiler(),
            side: &mut self.side,
            textures: Vec::new(),
            entries: Vec::new(),
            executed: 0,
        };
        for (index, page) in self.pages.iter().enumerate() {
            let mut reader = ByteReader::new(page.bytes());
            loop {
                match Instruction::decode(&mut reader) {
                    Ok(Some(instruction)) => replay.execute(instruction),
                    Ok(None) => break,
                    Err(err) => panic!("corrupt draw stream on page {index}: {err}"),
                }
            }
        }

        let executed = replay.executed;
        debug_assert!(
            self.side.is_empty(),
            "{} side payloads left after replay",
            self.side.len()
        );
        debug!(pages = self.pages.len(), instructions = executed, "draw stream executed");
    }
}

struct Replay<'r, B: ?Sized> {
    backend: &'r mut B,
    profiler: &'r dyn Profiler,
    side: &'r mut VecDeque<SidePayload>,
    textures: Vec<TextureHandle>,
    entries: Vec<BindGroupEntry>,
    executed: usize,
}

impl<B: Backend + ?Sized> Replay<'_, B> {
    fn pop(&mut self, opcode: Opcode) -> SidePayload {
        match self.side.pop_front() {
            Some(payload) => payload,
            None => panic!("corrupt draw stream: {}", DecodeError::MissingSidePayload(opcode)),
        }
    }

    fn pop_data(&mut self, opcode: Opcode) -> Arc<[u8]> {
        match self.pop(opcode) {
            SidePayload::Data(data) => data,
            other => mismatch(opcode, &other),
        }
    }

    fn execute(&mut self, instruction: Instruction<'_>) {
        let opcode = instruction.opcode();
        trace!(?opcode, "replay");
        self.executed += 1;

        let backend = &mut *self.backend;
        match instruction {
            Instruction::Bind(cache) => cache.replay(backend),
            Instruction::DirtyCache(update) => update.replay(backend),

            Instruction::CreateTexture {
                handle,
                desc,
                debug_name,
            } => backend.create_texture(handle, &desc, debug_name),
            Instruction::CreateBuffer {
                handle,
                flags,
                size,
                has_data,
                debug_name,
            } => {
                if has_data {
                    let data = self.pop_data(opcode);
                    self.backend
                        .create_buffer(handle, flags, size, Some(&data[..]), debug_name);
                } else {
                    backend.create_buffer(handle, flags, size, None, debug_name);
                }
            }
            Instruction::CreateProgram(handle) => match self.pop(opcode) {
                SidePayload::Program(desc) => self.backend.create_program(handle, &desc),
                other => mismatch(opcode, &other),
            },
            Instruction::CreateBindGroup { handle, entries } => {
                self.entries.clear();
                self.entries.extend(entries.iter());
                backend.create_bind_group(handle, &self.entries);
            }
            Instruction::CreateTextureView {
                view,
                texture,
                layer,
                mip,
            } => backend.create_texture_view(view, texture, layer, mip),
            Instruction::DestroyTexture(handle) => backend.destroy_texture(handle),
            Instruction::DestroyBuffer(handle) => backend.destroy_buffer(handle),
            Instruction::DestroyProgram(handle) => backend.destroy_program(handle),
            Instruction::DestroyBindGroup(handle) => backend.destroy_bind_group(handle),
            Instruction::SetTextureDebugName { texture, name } => {
                backend.set_debug_name(texture, name)
            }

            Instruction::BindUniformBuffer {
                index,
                buffer,
                offset,
                size,
            } => backend.bind_uniform_buffer(index, buffer, offset, size),
            Instruction::BindShaderBuffer {
                buffer,
                binding,
                flags,
            } => backend.bind_shader_buffer(buffer, binding, flags),
            Instruction::BindImageTexture { texture, unit } => {
                backend.bind_image_texture(texture, unit)
            }
            Instruction::BindTextures { offset, textures } => {
                textures.copy_into(&mut self.textures);
                backend.bind_textures(offset, &self.textures);
            }

            Instruction::DrawArrays { offset, count } => backend.draw_arrays(offset, count),
            Instruction::DrawIndexed {
                offset,
                count,
                index_type,
            } => backend.draw_indexed(offset, count, index_type),
            Instruction::DrawArraysInstanced {
                indices_count,
                instances_count,
            } => backend.draw_arrays_instanced(indices_count, instances_count),
            Instruction::DrawIndexedInstanced {
                indices_count,
                instances_count,
                index_type,
            } => backend.draw_indexed_instanced(indices_count, instances_count, index_type),
            Instruction::DrawIndirect {
                index_type,
                indirect_buffer_offset,
            } => backend.draw_indirect(index_type, indirect_buffer_offset),
            Instruction::Dispatch {
                groups_x,
                groups_y,
                groups_z,
            } => backend.dispatch(groups_x, groups_y, groups_z),

            Instruction::Clear {
                flags,
                color,
                depth,
            } => backend.clear(flags, color, depth),
            Instruction::SetFramebuffer {
                attachments,
                depth_stencil,
                flags,
            } => {
                attachments.copy_into(&mut self.textures);
                backend.set_framebuffer(&self.textures, depth_stencil, flags);
            }
            Instruction::SetFramebufferCube { cube, face, mip } => {
                backend.set_framebuffer_cube(cube, face, mip)
            }
            Instruction::Viewport {
                x,
                y,
                width,
                height,
            } => backend.viewport(x, y, width, height),
            Instruction::Scissor {
                x,
                y,
                width,
                height,
            } => backend.scissor(x, y, width, height),

            Instruction::CopyTexture {
                dst,
                src,
                dst_x,
                dst_y,
            } => backend.copy_texture(dst, src, dst_x, dst_y),
            Instruction::CopyBuffer {
                dst,
                src,
                dst_offset,
                src_offset,
                size,
            } => backend.copy_buffer(dst, src, dst_offset, src_offset, size),
            Instruction::CopyTextureToBuffer { dst, src } => {
                backend.copy_texture_to_buffer(dst, src)
            }
            Instruction::ReadTexture(texture) => match self.pop(opcode) {
                SidePayload::ReadCallback(callback) => {
                    self.backend.read_texture(texture, callback)
                }
                other => mismatch(opcode, &other),
            },
            Instruction::GenerateMipmaps(texture) => backend.generate_mipmaps(texture),
            Instruction::UpdateTexture {
                texture,
                region,
                format,
            } => {
                let data = self.pop_data(opcode);
                self.backend.update_texture(texture, &region, format, &data);
            }
            Instruction::UpdateBuffer(buffer) => {
                let data = self.pop_data(opcode);
                self.backend.update_buffer(buffer, &data);
            }

            Instruction::MemoryBarrier(buffer) => backend.memory_barrier_buffer(buffer),
            Instruction::MemoryBarrierTexture(texture) => backend.memory_barrier_texture(texture),
            Instruction::Barrier { buffer, ty } => backend.barrier_buffer(buffer, ty),
            Instruction::BarrierTexture { texture, ty } => backend.barrier_texture(texture, ty),

            Instruction::PushDebugGroup(label) => backend.push_debug_group(label),
            Instruction::PopDebugGroup => backend.pop_debug_group(),
            Instruction::StartCapture => backend.start_capture(),
            Instruction::StopCapture => backend.stop_capture(),
            Instruction::BeginProfileBlock { name, link } => self.profiler.begin_block(name, link),
            Instruction::EndProfileBlock => self.profiler.end_block(),

            Instruction::FreeMemory | Instruction::FreeAlignedMemory => match self.pop(opcode) {
                SidePayload::Free { block, allocator } => {
                    if opcode == Opcode::FreeAlignedMemory {
                        allocator.deallocate_aligned(block);
                    } else {
                        allocator.deallocate(block);
                    }
                }
                other => mismatch(opcode, &other),
            },
            Instruction::UserAlloc(_) => {}
            Instruction::Function(payload) => match self.pop(opcode) {
                SidePayload::Function(f) => f(payload),
                other => mismatch(opcode, &other),
            },
            Instruction::Substream => match self.pop(opcode) {
                SidePayload::Substream(mut child) => child.run(&mut *self.backend),
                SidePayload::Deferred(slot) => {
                    let mut child = slot.lock();
                    child.run(&mut *self.backend);
                    child.release_pages();
                }
                other => mismatch(opcode, &other),
            },
        }
    }
}

fn mismatch(opcode: Opcode, payload: &SidePayload) -> ! {
    panic!(
        "corrupt draw stream: {opcode:?} found a {} side payload",
        payload.kind()
    )
}
