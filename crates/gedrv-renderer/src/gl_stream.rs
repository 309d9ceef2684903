// gl_stream.rs -- vertex submission strategies
//
// The driver picks one of two ways to get cache vertices to the GPU, once,
// at init: streaming the whole cache into a reused buffer object and
// drawing ranges out of it, or walking the vertices through the legacy
// immediate-mode entry points. Both produce the same draws.

use std::mem::size_of;

use crate::gl_pcache::{MiscVertex, WorldVertex};
use crate::qgl::*;

/// One flush's worth of vertex traffic for a cache. `begin_*` publishes
/// the full vertex block, `draw_*` issues one triangle fan over a
/// `first`/`count` range of it, `end_*` restores untouched state.
pub trait VertexStream {
    fn begin_misc(&mut self, gl: &mut dyn Gl, verts: &[MiscVertex]);
    fn draw_misc(&mut self, gl: &mut dyn Gl, verts: &[MiscVertex], first: u32, count: u32);
    fn end_misc(&mut self, gl: &mut dyn Gl);

    fn begin_world(&mut self, gl: &mut dyn Gl, verts: &[WorldVertex]);
    fn draw_world(&mut self, gl: &mut dyn Gl, verts: &[WorldVertex], first: u32, count: u32);
    fn end_world(&mut self, gl: &mut dyn Gl);

    fn shutdown(&mut self, gl: &mut dyn Gl);
}

// ============================================================
// Buffered path (ARB_vertex_buffer_object)
// ============================================================

/// Streams each flush into one of two process-lifetime buffer objects.
/// Every upload overwrites the buffer's full contents, so a flush must
/// never overlap a pending GPU read of the same buffer; the single-threaded
/// frame loop guarantees that.
pub struct BufferedStream {
    misc_buffer: GLuint,
    world_buffer: GLuint,
}

impl BufferedStream {
    pub fn new(gl: &mut dyn Gl) -> Self {
        BufferedStream {
            misc_buffer: gl.gen_buffer(),
            world_buffer: gl.gen_buffer(),
        }
    }
}

impl VertexStream for BufferedStream {
    fn begin_misc(&mut self, gl: &mut dyn Gl, verts: &[MiscVertex]) {
        gl.bind_array_buffer(self.misc_buffer);
        gl.buffer_stream_data(bytemuck::cast_slice(verts));

        let stride = size_of::<MiscVertex>() as GLsizei;
        let mut loc = 0;

        gl.enable_client_state(GL_VERTEX_ARRAY);
        gl.vertex_pointer(3, stride, loc);

        loc += size_of::<f32>() * 3;
        gl.enable_client_state(GL_TEXTURE_COORD_ARRAY);
        gl.tex_coord_pointer(4, stride, loc);

        loc += size_of::<f32>() * 4;
        gl.enable_client_state(GL_COLOR_ARRAY);
        gl.color_pointer(4, stride, loc);
    }

    fn draw_misc(&mut self, gl: &mut dyn Gl, _verts: &[MiscVertex], first: u32, count: u32) {
        gl.draw_arrays(GL_TRIANGLE_FAN, first as GLint, count as GLsizei);
    }

    fn end_misc(&mut self, gl: &mut dyn Gl) {
        gl.disable_client_state(GL_COLOR_ARRAY);
        gl.disable_client_state(GL_TEXTURE_COORD_ARRAY);
        gl.disable_client_state(GL_VERTEX_ARRAY);
        gl.bind_array_buffer(0);
    }

    fn begin_world(&mut self, gl: &mut dyn Gl, verts: &[WorldVertex]) {
        gl.bind_array_buffer(self.world_buffer);
        gl.buffer_stream_data(bytemuck::cast_slice(verts));

        let stride = size_of::<WorldVertex>() as GLsizei;
        let mut loc = 0;

        gl.enable_client_state(GL_VERTEX_ARRAY);
        gl.vertex_pointer(3, stride, loc);

        loc += size_of::<f32>() * 3;
        gl.active_texture(GL_TEXTURE0);
        gl.client_active_texture(GL_TEXTURE0);
        gl.enable_client_state(GL_TEXTURE_COORD_ARRAY);
        gl.tex_coord_pointer(4, stride, loc);

        loc += size_of::<f32>() * 4;
        gl.active_texture(GL_TEXTURE1);
        gl.client_active_texture(GL_TEXTURE1);
        gl.enable_client_state(GL_TEXTURE_COORD_ARRAY);
        gl.tex_coord_pointer(4, stride, loc);

        loc += size_of::<f32>() * 4;
        gl.enable_client_state(GL_COLOR_ARRAY);
        gl.color_pointer(4, stride, loc);
    }

    fn draw_world(&mut self, gl: &mut dyn Gl, _verts: &[WorldVertex], first: u32, count: u32) {
        gl.draw_arrays(GL_TRIANGLE_FAN, first as GLint, count as GLsizei);
    }

    fn end_world(&mut self, gl: &mut dyn Gl) {
        gl.disable_client_state(GL_COLOR_ARRAY);
        gl.active_texture(GL_TEXTURE1);
        gl.client_active_texture(GL_TEXTURE1);
        gl.disable_client_state(GL_TEXTURE_COORD_ARRAY);
        gl.active_texture(GL_TEXTURE0);
        gl.client_active_texture(GL_TEXTURE0);
        gl.disable_client_state(GL_TEXTURE_COORD_ARRAY);
        gl.disable_client_state(GL_VERTEX_ARRAY);
        gl.bind_array_buffer(0);
    }

    fn shutdown(&mut self, gl: &mut dyn Gl) {
        gl.delete_buffer(self.misc_buffer);
        gl.delete_buffer(self.world_buffer);
    }
}

// ============================================================
// Immediate path (no buffer objects)
// ============================================================

/// Per-vertex fallback for drivers without `GL_ARB_vertex_buffer_object`.
/// Submits the exact bytes the cache stores, so output matches the
/// buffered path draw for draw.
pub struct ImmediateStream;

impl VertexStream for ImmediateStream {
    fn begin_misc(&mut self, _gl: &mut dyn Gl, _verts: &[MiscVertex]) {}

    fn draw_misc(&mut self, gl: &mut dyn Gl, verts: &[MiscVertex], first: u32, count: u32) {
        gl.begin(GL_TRIANGLE_FAN);
        for v in &verts[first as usize..(first + count) as usize] {
            gl.tex_coord4f(v.u, v.v, v.s, v.t);
            gl.color4ub(v.r, v.g, v.b, v.a);
            gl.vertex3f(v.x, v.y, v.z);
        }
        gl.end();
    }

    fn end_misc(&mut self, _gl: &mut dyn Gl) {}

    fn begin_world(&mut self, _gl: &mut dyn Gl, _verts: &[WorldVertex]) {}

    fn draw_world(&mut self, gl: &mut dyn Gl, verts: &[WorldVertex], first: u32, count: u32) {
        gl.begin(GL_TRIANGLE_FAN);
        for v in &verts[first as usize..(first + count) as usize] {
            gl.multi_tex_coord4f(GL_TEXTURE0, v.uv[0], v.uv[1], v.uv[2], v.uv[3]);
            gl.multi_tex_coord4f(GL_TEXTURE1, v.luv[0], v.luv[1], v.luv[2], v.luv[3]);
            gl.color4ub(v.color[0], v.color[1], v.color[2], v.color[3]);
            gl.vertex3f(v.pos[0], v.pos[1], v.pos[2]);
        }
        gl.end();
    }

    fn end_world(&mut self, _gl: &mut dyn Gl) {}

    fn shutdown(&mut self, _gl: &mut dyn Gl) {}
}
