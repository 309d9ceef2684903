// test_support.rs -- recording doubles for the GL boundary and the host
// callbacks, used to assert on draw-call order and state traffic.

use std::cell::Cell;
use std::rc::Rc;

use gedrv_common::dcommon::Rect;

use crate::gl_thandle::{DriverHost, LInfo, LInfoRef, THandle, THandleRef};
use crate::qgl::*;

#[derive(Debug, Clone, PartialEq)]
pub enum GlCall {
    Enable(GLenum),
    Disable(GLenum),
    BlendFunc(GLenum, GLenum),
    DepthMask(bool),
    ActiveTexture(GLenum),
    ClientActiveTexture(GLenum),
    /// `unit` is the active texture unit at bind time.
    BindTexture { unit: GLenum, texture: GLuint },
    TexParameterI(GLenum, GLint),
    TexEnvI(GLenum, GLint),
    GenBuffer(GLuint),
    DeleteBuffer(GLuint),
    BindArrayBuffer(GLuint),
    BufferStreamData { len: usize },
    EnableClientState(GLenum),
    DisableClientState(GLenum),
    VertexPointer { size: GLint, stride: GLsizei, offset: usize },
    /// `unit` is the client-active texture unit at call time.
    TexCoordPointer { unit: GLenum, size: GLint, stride: GLsizei, offset: usize },
    ColorPointer { size: GLint, stride: GLsizei, offset: usize },
    DrawArrays { mode: GLenum, first: GLint, count: GLsizei },
    Begin(GLenum),
    End,
    TexCoord4f([f32; 4]),
    MultiTexCoord4f(GLenum, [f32; 4]),
    Color4ub([u8; 4]),
    Vertex3f([f32; 3]),
}

pub struct RecordingGl {
    pub calls: Vec<GlCall>,
    extensions: Vec<&'static str>,
    active_unit: GLenum,
    client_unit: GLenum,
    next_buffer: GLuint,
}

impl RecordingGl {
    pub fn with_vbo() -> Self {
        Self::with_extensions(vec![VBO_EXTENSION])
    }

    pub fn immediate() -> Self {
        Self::with_extensions(Vec::new())
    }

    fn with_extensions(extensions: Vec<&'static str>) -> Self {
        RecordingGl {
            calls: Vec::new(),
            extensions,
            active_unit: GL_TEXTURE0,
            client_unit: GL_TEXTURE0,
            next_buffer: 1,
        }
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }

    /// Texture names bound while `unit` was active, in call order.
    pub fn texture_binds(&self, unit: GLenum) -> Vec<GLuint> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                GlCall::BindTexture { unit: u, texture } if *u == unit => Some(*texture),
                _ => None,
            })
            .collect()
    }

    /// Number of draw submissions (buffered ranges or immediate fans).
    pub fn draw_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, GlCall::DrawArrays { .. } | GlCall::Begin(_)))
            .count()
    }
}

impl Gl for RecordingGl {
    fn has_extension(&self, name: &str) -> bool {
        self.extensions.contains(&name)
    }

    fn enable(&mut self, cap: GLenum) {
        self.calls.push(GlCall::Enable(cap));
    }

    fn disable(&mut self, cap: GLenum) {
        self.calls.push(GlCall::Disable(cap));
    }

    fn blend_func(&mut self, sfactor: GLenum, dfactor: GLenum) {
        self.calls.push(GlCall::BlendFunc(sfactor, dfactor));
    }

    fn depth_mask(&mut self, flag: bool) {
        self.calls.push(GlCall::DepthMask(flag));
    }

    fn active_texture(&mut self, unit: GLenum) {
        self.active_unit = unit;
        self.calls.push(GlCall::ActiveTexture(unit));
    }

    fn client_active_texture(&mut self, unit: GLenum) {
        self.client_unit = unit;
        self.calls.push(GlCall::ClientActiveTexture(unit));
    }

    fn bind_texture_2d(&mut self, texture: GLuint) {
        self.calls.push(GlCall::BindTexture {
            unit: self.active_unit,
            texture,
        });
    }

    fn tex_parameter_i(&mut self, pname: GLenum, param: GLint) {
        self.calls.push(GlCall::TexParameterI(pname, param));
    }

    fn tex_env_i(&mut self, pname: GLenum, param: GLint) {
        self.calls.push(GlCall::TexEnvI(pname, param));
    }

    fn gen_buffer(&mut self) -> GLuint {
        let buffer = self.next_buffer;
        self.next_buffer += 1;
        self.calls.push(GlCall::GenBuffer(buffer));
        buffer
    }

    fn delete_buffer(&mut self, buffer: GLuint) {
        self.calls.push(GlCall::DeleteBuffer(buffer));
    }

    fn bind_array_buffer(&mut self, buffer: GLuint) {
        self.calls.push(GlCall::BindArrayBuffer(buffer));
    }

    fn buffer_stream_data(&mut self, data: &[u8]) {
        self.calls.push(GlCall::BufferStreamData { len: data.len() });
    }

    fn enable_client_state(&mut self, array: GLenum) {
        self.calls.push(GlCall::EnableClientState(array));
    }

    fn disable_client_state(&mut self, array: GLenum) {
        self.calls.push(GlCall::DisableClientState(array));
    }

    fn vertex_pointer(&mut self, size: GLint, stride: GLsizei, offset: usize) {
        self.calls.push(GlCall::VertexPointer { size, stride, offset });
    }

    fn tex_coord_pointer(&mut self, size: GLint, stride: GLsizei, offset: usize) {
        self.calls.push(GlCall::TexCoordPointer {
            unit: self.client_unit,
            size,
            stride,
            offset,
        });
    }

    fn color_pointer(&mut self, size: GLint, stride: GLsizei, offset: usize) {
        self.calls.push(GlCall::ColorPointer { size, stride, offset });
    }

    fn draw_arrays(&mut self, mode: GLenum, first: GLint, count: GLsizei) {
        self.calls.push(GlCall::DrawArrays { mode, first, count });
    }

    fn begin(&mut self, mode: GLenum) {
        self.calls.push(GlCall::Begin(mode));
    }

    fn end(&mut self) {
        self.calls.push(GlCall::End);
    }

    fn tex_coord4f(&mut self, s: f32, t: f32, r: f32, q: f32) {
        self.calls.push(GlCall::TexCoord4f([s, t, r, q]));
    }

    fn multi_tex_coord4f(&mut self, unit: GLenum, s: f32, t: f32, r: f32, q: f32) {
        self.calls.push(GlCall::MultiTexCoord4f(unit, [s, t, r, q]));
    }

    fn color4ub(&mut self, r: u8, g: u8, b: u8, a: u8) {
        self.calls.push(GlCall::Color4ub([r, g, b, a]));
    }

    fn vertex3f(&mut self, x: f32, y: f32, z: f32) {
        self.calls.push(GlCall::Vertex3f([x, y, z]));
    }
}

// ============================================================
// Host double
// ============================================================

#[derive(Debug, Clone, PartialEq)]
pub enum HostCall {
    UpdateTexture(GLuint),
    SetupLightmap(GLuint),
    DownloadLightmap(GLuint),
    DrawDecal { texture: GLuint, src: Option<Rect>, x: i32, y: i32 },
}

#[derive(Default)]
pub struct RecordingHost {
    pub calls: Vec<HostCall>,
    /// One entry per `add_rendered_polys` call, i.e. per non-empty flush.
    pub flush_batches: Vec<u32>,
    pub rendered_polys: u32,
    /// What `setup_lightmap` reports for every lightmap.
    pub dynamic_lightmaps: bool,
}

impl DriverHost for RecordingHost {
    fn update_texture(&mut self, _gl: &mut dyn Gl, handle: &THandle) {
        self.calls.push(HostCall::UpdateTexture(handle.texture_id));
    }

    fn setup_lightmap(&mut self, _gl: &mut dyn Gl, linfo: &LInfo) -> bool {
        self.calls.push(HostCall::SetupLightmap(linfo.thandle.texture_id));
        self.dynamic_lightmaps
    }

    fn download_lightmap(&mut self, _gl: &mut dyn Gl, linfo: &LInfo) {
        self.calls.push(HostCall::DownloadLightmap(linfo.thandle.texture_id));
    }

    fn draw_decal(
        &mut self,
        _gl: &mut dyn Gl,
        handle: &THandle,
        src: Option<&Rect>,
        x: i32,
        y: i32,
    ) {
        self.calls.push(HostCall::DrawDecal {
            texture: handle.texture_id,
            src: src.copied(),
            x,
            y,
        });
    }

    fn add_rendered_polys(&mut self, count: u32) {
        self.flush_batches.push(count);
        self.rendered_polys += count;
    }
}

// ============================================================
// Fixture helpers
// ============================================================

pub fn thandle(texture_id: GLuint) -> THandleRef {
    thandle_scaled(texture_id, 1.0)
}

pub fn thandle_scaled(texture_id: GLuint, inv_scale: f32) -> THandleRef {
    Rc::new(THandle {
        texture_id,
        inv_scale,
        flags: Cell::new(0),
    })
}

pub fn linfo(texture_id: GLuint, min_u: i32, min_v: i32) -> LInfoRef {
    Rc::new(LInfo {
        thandle: thandle(texture_id),
        min_u,
        min_v,
    })
}
