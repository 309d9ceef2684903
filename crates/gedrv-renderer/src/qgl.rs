// qgl.rs -- fixed-function GL boundary: type aliases, constants, the Gl
// trait the driver renders through, and the loaded-function-pointer backend.
//
// Context creation and entry-point resolution stay outside the driver; the
// backend is handed a loader closure and resolves everything it needs once.

use std::ffi::CStr;
use std::os::raw::c_void;

use thiserror::Error;

// Legacy type aliases
pub type GLenum = u32;
pub type GLboolean = u8;
pub type GLint = i32;
pub type GLubyte = u8;
pub type GLuint = u32;
pub type GLsizei = i32;
pub type GLfloat = f32;
pub type GLsizeiptr = isize;

// ==============================
// Constants
// ==============================

pub const GL_FALSE: GLboolean = 0;
pub const GL_TRUE: GLboolean = 1;

// Primitive types
pub const GL_TRIANGLE_FAN: GLenum = 0x0006;

// Blending factors
pub const GL_SRC_ALPHA: GLenum = 0x0302;
pub const GL_ONE_MINUS_SRC_ALPHA: GLenum = 0x0303;

// Enable/disable caps
pub const GL_TEXTURE_2D: GLenum = 0x0DE1;
pub const GL_BLEND: GLenum = 0x0BE2;
pub const GL_DEPTH_TEST: GLenum = 0x0B71;
pub const GL_MULTISAMPLE: GLenum = 0x809D;

// Texture parameters
pub const GL_TEXTURE_MIN_FILTER: GLenum = 0x2801;
pub const GL_TEXTURE_MAG_FILTER: GLenum = 0x2800;
pub const GL_TEXTURE_WRAP_S: GLenum = 0x2802;
pub const GL_TEXTURE_WRAP_T: GLenum = 0x2803;
pub const GL_TEXTURE_ENV: GLenum = 0x2300;
pub const GL_TEXTURE_ENV_MODE: GLenum = 0x2200;

// Texture filter modes
pub const GL_NEAREST: GLenum = 0x2600;
pub const GL_LINEAR: GLenum = 0x2601;

// Texture wrap modes
pub const GL_REPEAT: GLenum = 0x2901;
pub const GL_CLAMP: GLenum = 0x2900;
pub const GL_CLAMP_TO_EDGE: GLenum = 0x812F;

// Texture env modes
pub const GL_MODULATE: GLenum = 0x2100;

// Texture units
pub const GL_TEXTURE0: GLenum = 0x84C0;
pub const GL_TEXTURE1: GLenum = 0x84C1;

// Client-state arrays
pub const GL_VERTEX_ARRAY: GLenum = 0x8074;
pub const GL_COLOR_ARRAY: GLenum = 0x8076;
pub const GL_TEXTURE_COORD_ARRAY: GLenum = 0x8078;

// Buffer objects
pub const GL_ARRAY_BUFFER: GLenum = 0x8892;
pub const GL_STREAM_DRAW: GLenum = 0x88E0;

// Data types
pub const GL_UNSIGNED_BYTE: GLenum = 0x1401;
pub const GL_FLOAT: GLenum = 0x1406;

// String names
pub const GL_EXTENSIONS: GLenum = 0x1F03;

pub const VBO_EXTENSION: &str = "GL_ARB_vertex_buffer_object";

// ==============================
// The driver's view of GL
// ==============================

/// The fixed-function calls the polygon caches issue while flushing.
///
/// Vertex/texcoord arrays are always float, colors always unsigned byte,
/// texture binds always target `GL_TEXTURE_2D`; those parameters are folded
/// into the methods. Array pointers are byte offsets into the bound array
/// buffer, so only the buffered path may use them.
pub trait Gl {
    fn has_extension(&self, name: &str) -> bool;

    fn enable(&mut self, cap: GLenum);
    fn disable(&mut self, cap: GLenum);
    fn blend_func(&mut self, sfactor: GLenum, dfactor: GLenum);
    fn depth_mask(&mut self, flag: bool);

    fn active_texture(&mut self, unit: GLenum);
    fn client_active_texture(&mut self, unit: GLenum);
    fn bind_texture_2d(&mut self, texture: GLuint);
    fn tex_parameter_i(&mut self, pname: GLenum, param: GLint);
    fn tex_env_i(&mut self, pname: GLenum, param: GLint);

    fn gen_buffer(&mut self) -> GLuint;
    fn delete_buffer(&mut self, buffer: GLuint);
    fn bind_array_buffer(&mut self, buffer: GLuint);
    /// Full-buffer `GL_STREAM_DRAW` upload to the bound array buffer.
    fn buffer_stream_data(&mut self, data: &[u8]);

    fn enable_client_state(&mut self, array: GLenum);
    fn disable_client_state(&mut self, array: GLenum);
    fn vertex_pointer(&mut self, size: GLint, stride: GLsizei, offset: usize);
    fn tex_coord_pointer(&mut self, size: GLint, stride: GLsizei, offset: usize);
    fn color_pointer(&mut self, size: GLint, stride: GLsizei, offset: usize);

    fn draw_arrays(&mut self, mode: GLenum, first: GLint, count: GLsizei);

    // Immediate-mode path
    fn begin(&mut self, mode: GLenum);
    fn end(&mut self);
    fn tex_coord4f(&mut self, s: f32, t: f32, r: f32, q: f32);
    fn multi_tex_coord4f(&mut self, unit: GLenum, s: f32, t: f32, r: f32, q: f32);
    fn color4ub(&mut self, r: u8, g: u8, b: u8, a: u8);
    fn vertex3f(&mut self, x: f32, y: f32, z: f32);
}

#[derive(Debug, Error)]
pub enum GlLoadError {
    #[error("missing GL entry point: {0}")]
    MissingEntryPoint(&'static str),
}

// ==============================
// Loaded-function-pointer backend
// ==============================

/// Function-pointer table resolved once at context creation.
pub struct RawGl {
    extensions: String,
    vbo_supported: bool,

    enable: unsafe extern "system" fn(GLenum),
    disable: unsafe extern "system" fn(GLenum),
    blend_func: unsafe extern "system" fn(GLenum, GLenum),
    depth_mask: unsafe extern "system" fn(GLboolean),
    bind_texture: unsafe extern "system" fn(GLenum, GLuint),
    tex_parameteri: unsafe extern "system" fn(GLenum, GLenum, GLint),
    tex_envi: unsafe extern "system" fn(GLenum, GLenum, GLint),
    enable_client_state: unsafe extern "system" fn(GLenum),
    disable_client_state: unsafe extern "system" fn(GLenum),
    vertex_pointer: unsafe extern "system" fn(GLint, GLenum, GLsizei, *const c_void),
    tex_coord_pointer: unsafe extern "system" fn(GLint, GLenum, GLsizei, *const c_void),
    color_pointer: unsafe extern "system" fn(GLint, GLenum, GLsizei, *const c_void),
    draw_arrays: unsafe extern "system" fn(GLenum, GLint, GLsizei),
    begin: unsafe extern "system" fn(GLenum),
    end: unsafe extern "system" fn(),
    tex_coord4f: unsafe extern "system" fn(GLfloat, GLfloat, GLfloat, GLfloat),
    color4ub: unsafe extern "system" fn(GLubyte, GLubyte, GLubyte, GLubyte),
    vertex3f: unsafe extern "system" fn(GLfloat, GLfloat, GLfloat),

    // Multitexture (ARB_multitexture, core since 1.3)
    active_texture: unsafe extern "system" fn(GLenum),
    client_active_texture: unsafe extern "system" fn(GLenum),
    multi_tex_coord4f: unsafe extern "system" fn(GLenum, GLfloat, GLfloat, GLfloat, GLfloat),

    // ARB_vertex_buffer_object, absent on old drivers
    gen_buffers: Option<unsafe extern "system" fn(GLsizei, *mut GLuint)>,
    delete_buffers: Option<unsafe extern "system" fn(GLsizei, *const GLuint)>,
    bind_buffer: Option<unsafe extern "system" fn(GLenum, GLuint)>,
    buffer_data: Option<unsafe extern "system" fn(GLenum, GLsizeiptr, *const c_void, GLenum)>,
}

impl RawGl {
    /// Resolve every entry point through `get_proc`.
    ///
    /// # Safety
    /// `get_proc` must return valid entry points of the current GL context
    /// (or null). It must resolve core 1.1 exports as well as extension
    /// functions; on Windows `wglGetProcAddress` alone does not return core
    /// functions, so the loader has to fall back to the opengl32 exports.
    pub unsafe fn load(
        mut get_proc: impl FnMut(&str) -> *const c_void,
    ) -> Result<Self, GlLoadError> {
        macro_rules! required {
            ($name:literal) => {{
                let ptr = get_proc($name);
                if ptr.is_null() {
                    return Err(GlLoadError::MissingEntryPoint($name));
                }
                std::mem::transmute(ptr)
            }};
        }
        macro_rules! optional {
            ($name:literal) => {{
                let ptr = get_proc($name);
                if ptr.is_null() {
                    None
                } else {
                    Some(std::mem::transmute(ptr))
                }
            }};
        }

        let get_string: unsafe extern "system" fn(GLenum) -> *const GLubyte =
            required!("glGetString");
        let ext_ptr = get_string(GL_EXTENSIONS);
        let extensions = if ext_ptr.is_null() {
            String::new()
        } else {
            CStr::from_ptr(ext_ptr.cast()).to_string_lossy().into_owned()
        };

        let gen_buffers = optional!("glGenBuffers");
        let delete_buffers = optional!("glDeleteBuffers");
        let bind_buffer = optional!("glBindBuffer");
        let buffer_data = optional!("glBufferData");
        let vbo_supported = extensions.split_whitespace().any(|e| e == VBO_EXTENSION)
            && gen_buffers.is_some()
            && delete_buffers.is_some()
            && bind_buffer.is_some()
            && buffer_data.is_some();

        Ok(RawGl {
            extensions,
            vbo_supported,
            enable: required!("glEnable"),
            disable: required!("glDisable"),
            blend_func: required!("glBlendFunc"),
            depth_mask: required!("glDepthMask"),
            bind_texture: required!("glBindTexture"),
            tex_parameteri: required!("glTexParameteri"),
            tex_envi: required!("glTexEnvi"),
            enable_client_state: required!("glEnableClientState"),
            disable_client_state: required!("glDisableClientState"),
            vertex_pointer: required!("glVertexPointer"),
            tex_coord_pointer: required!("glTexCoordPointer"),
            color_pointer: required!("glColorPointer"),
            draw_arrays: required!("glDrawArrays"),
            begin: required!("glBegin"),
            end: required!("glEnd"),
            tex_coord4f: required!("glTexCoord4f"),
            color4ub: required!("glColor4ub"),
            vertex3f: required!("glVertex3f"),
            active_texture: required!("glActiveTexture"),
            client_active_texture: required!("glClientActiveTexture"),
            multi_tex_coord4f: required!("glMultiTexCoord4f"),
            gen_buffers,
            delete_buffers,
            bind_buffer,
            buffer_data,
        })
    }
}

impl Gl for RawGl {
    fn has_extension(&self, name: &str) -> bool {
        if name == VBO_EXTENSION {
            return self.vbo_supported;
        }
        self.extensions.split_whitespace().any(|e| e == name)
    }

    fn enable(&mut self, cap: GLenum) {
        unsafe { (self.enable)(cap) }
    }

    fn disable(&mut self, cap: GLenum) {
        unsafe { (self.disable)(cap) }
    }

    fn blend_func(&mut self, sfactor: GLenum, dfactor: GLenum) {
        unsafe { (self.blend_func)(sfactor, dfactor) }
    }

    fn depth_mask(&mut self, flag: bool) {
        unsafe { (self.depth_mask)(if flag { GL_TRUE } else { GL_FALSE }) }
    }

    fn active_texture(&mut self, unit: GLenum) {
        unsafe { (self.active_texture)(unit) }
    }

    fn client_active_texture(&mut self, unit: GLenum) {
        unsafe { (self.client_active_texture)(unit) }
    }

    fn bind_texture_2d(&mut self, texture: GLuint) {
        unsafe { (self.bind_texture)(GL_TEXTURE_2D, texture) }
    }

    fn tex_parameter_i(&mut self, pname: GLenum, param: GLint) {
        unsafe { (self.tex_parameteri)(GL_TEXTURE_2D, pname, param) }
    }

    fn tex_env_i(&mut self, pname: GLenum, param: GLint) {
        unsafe { (self.tex_envi)(GL_TEXTURE_ENV, pname, param) }
    }

    fn gen_buffer(&mut self) -> GLuint {
        let mut buffer = 0;
        if let Some(gen_buffers) = self.gen_buffers {
            unsafe { gen_buffers(1, &mut buffer) }
        }
        buffer
    }

    fn delete_buffer(&mut self, buffer: GLuint) {
        if let Some(delete_buffers) = self.delete_buffers {
            unsafe { delete_buffers(1, &buffer) }
        }
    }

    fn bind_array_buffer(&mut self, buffer: GLuint) {
        if let Some(bind_buffer) = self.bind_buffer {
            unsafe { bind_buffer(GL_ARRAY_BUFFER, buffer) }
        }
    }

    fn buffer_stream_data(&mut self, data: &[u8]) {
        if let Some(buffer_data) = self.buffer_data {
            unsafe {
                buffer_data(
                    GL_ARRAY_BUFFER,
                    data.len() as GLsizeiptr,
                    data.as_ptr().cast(),
                    GL_STREAM_DRAW,
                )
            }
        }
    }

    fn enable_client_state(&mut self, array: GLenum) {
        unsafe { (self.enable_client_state)(array) }
    }

    fn disable_client_state(&mut self, array: GLenum) {
        unsafe { (self.disable_client_state)(array) }
    }

    fn vertex_pointer(&mut self, size: GLint, stride: GLsizei, offset: usize) {
        unsafe { (self.vertex_pointer)(size, GL_FLOAT, stride, offset as *const c_void) }
    }

    fn tex_coord_pointer(&mut self, size: GLint, stride: GLsizei, offset: usize) {
        unsafe { (self.tex_coord_pointer)(size, GL_FLOAT, stride, offset as *const c_void) }
    }

    fn color_pointer(&mut self, size: GLint, stride: GLsizei, offset: usize) {
        unsafe { (self.color_pointer)(size, GL_UNSIGNED_BYTE, stride, offset as *const c_void) }
    }

    fn draw_arrays(&mut self, mode: GLenum, first: GLint, count: GLsizei) {
        unsafe { (self.draw_arrays)(mode, first, count) }
    }

    fn begin(&mut self, mode: GLenum) {
        unsafe { (self.begin)(mode) }
    }

    fn end(&mut self) {
        unsafe { (self.end)() }
    }

    fn tex_coord4f(&mut self, s: f32, t: f32, r: f32, q: f32) {
        unsafe { (self.tex_coord4f)(s, t, r, q) }
    }

    fn multi_tex_coord4f(&mut self, unit: GLenum, s: f32, t: f32, r: f32, q: f32) {
        unsafe { (self.multi_tex_coord4f)(unit, s, t, r, q) }
    }

    fn color4ub(&mut self, r: u8, g: u8, b: u8, a: u8) {
        unsafe { (self.color4ub)(r, g, b, a) }
    }

    fn vertex3f(&mut self, x: f32, y: f32, z: f32) {
        unsafe { (self.vertex3f)(x, y, z) }
    }
}
