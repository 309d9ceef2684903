// gl_thandle.rs -- driver texture handles and the host callbacks the
// polygon caches reach back through while flushing.

use std::cell::Cell;
use std::rc::Rc;

use gedrv_common::dcommon::Rect;

use crate::qgl::{Gl, GLuint};

// ============================================================
// THandle flags
// ============================================================

/// Texel data is stale and must be re-uploaded before the next draw.
pub const THANDLE_UPDATE: u32 = 1 << 0;
/// Lightmap texels are stale (set on lightmap handles only).
pub const THANDLE_UPDATE_LM: u32 = 1 << 1;

// ============================================================
// geRDriver_THandle
// ============================================================

/// geRDriver_THandle — a GPU texture owned by the resource manager.
///
/// The caches hold these across inserts and clear/set the staleness flags
/// during flush, so the flags live in a `Cell` behind a shared handle.
/// The subsystem is single-threaded by contract.
pub struct THandle {
    /// GL texture object name.
    pub texture_id: GLuint,
    /// Reciprocal of the texture's uploaded size, used to normalize the
    /// texel-space UVs the engine submits.
    pub inv_scale: f32,
    /// THANDLE_* flags.
    pub flags: Cell<u32>,
}

pub type THandleRef = Rc<THandle>;

impl THandle {
    pub fn has_flag(&self, flag: u32) -> bool {
        self.flags.get() & flag != 0
    }

    pub fn set_flag(&self, flag: u32) {
        self.flags.set(self.flags.get() | flag);
    }

    pub fn clear_flag(&self, flag: u32) {
        self.flags.set(self.flags.get() & !flag);
    }
}

// ============================================================
// DRV_LInfo
// ============================================================

/// DRV_LInfo — lightmap placement for one world polygon. `min_u`/`min_v`
/// are the texel-space bounds the lightmap was packed against.
pub struct LInfo {
    pub thandle: THandleRef,
    pub min_u: i32,
    pub min_v: i32,
}

pub type LInfoRef = Rc<LInfo>;

// ============================================================
// Host callbacks
// ============================================================

/// Services the surrounding driver provides to the polygon caches.
/// Texture and lightmap uploads belong to the resource manager; decal
/// blitting belongs to the 2D path; the rendered-polygon counter is a
/// write-only diagnostic.
pub trait DriverHost {
    /// Re-synchronize a stale texture to the GPU (`THANDLE_UPDATE`).
    fn update_texture(&mut self, gl: &mut dyn Gl, handle: &THandle);

    /// Prepare a lightmap for sampling. Returns true when the lightmap is
    /// dynamically recomputed this frame and must be re-downloaded
    /// regardless of its staleness flag.
    fn setup_lightmap(&mut self, gl: &mut dyn Gl, linfo: &LInfo) -> bool;

    /// Download lightmap texels into the bound layer-1 texture.
    fn download_lightmap(&mut self, gl: &mut dyn Gl, linfo: &LInfo);

    /// Draw one screen-space decal. `src` of `None` means the whole texture.
    fn draw_decal(
        &mut self,
        gl: &mut dyn Gl,
        handle: &THandle,
        src: Option<&Rect>,
        x: i32,
        y: i32,
    );

    /// Accumulate the frame's rendered-polygon total.
    fn add_rendered_polys(&mut self, count: u32);
}
