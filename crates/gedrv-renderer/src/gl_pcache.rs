// gl_pcache.rs -- polygon rasterization caches
//
// Three fixed-capacity caches collect a frame's drawable geometry: lit
// world polygons (diffuse + lightmap layers), misc/UI polygons, and
// screen-space decal rectangles. Inserting past capacity flushes the cache
// first; a flush streams the vertex block to the GPU and issues one
// triangle fan per polygon with that polygon's texture and depth state
// applied, then resets occupancy. Storage is preallocated once and indexed
// by first/count ranges, so the hot path never allocates.

use std::rc::Rc;

use bytemuck::{Pod, Zeroable};
use log::{info, trace};
use thiserror::Error;

use gedrv_common::dcommon::{
    Rect, TexInfo, TlVertex, DRV_RENDER_ALPHA, DRV_RENDER_CLAMP_UV, DRV_RENDER_NO_ZMASK,
    DRV_RENDER_NO_ZWRITE,
};

use crate::gl_stream::{BufferedStream, ImmediateStream, VertexStream};
use crate::gl_thandle::{
    DriverHost, LInfoRef, THandleRef, THANDLE_UPDATE, THANDLE_UPDATE_LM,
};
use crate::qgl::*;

// ============================================================
// Capacities
// ============================================================

pub const MAX_WORLD_POLYS: usize = 2048;
pub const MAX_WORLD_POLY_VERTS: usize = 8192;

pub const MAX_MISC_POLYS: usize = 2048;
pub const MAX_MISC_POLY_VERTS: usize = 8192;

pub const MAX_DECAL_RECTS: usize = 256;

/// Texel bias aligning lightmap sample positions with packed texel centers.
const LIGHTMAP_SHIFT_BIAS: f32 = 8.0;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CacheError {
    /// A single polygon larger than the whole vertex store can never be
    /// admitted, flushed or not.
    #[error("polygon has {verts} vertices but the cache holds at most {capacity}")]
    PolyTooLarge { verts: usize, capacity: usize },
}

// ============================================================
// Cache vertex formats
// ============================================================

/// Misc-cache vertex. `z` holds `-1 + 1/z`; `u`/`v` are pre-multiplied by
/// `1/z` with the reciprocal kept in `t` so interpolation stays
/// perspective-correct and the divide can be undone at sample time.
#[derive(Debug, Clone, Copy, Default, Pod, Zeroable)]
#[repr(C)]
pub struct MiscVertex {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub u: f32,
    pub v: f32,
    pub s: f32,
    pub t: f32,
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

/// World-cache vertex: position, two 4-component texcoord layers (diffuse
/// and lightmap, each carrying `1/z` in its 4th component), byte color.
#[derive(Debug, Clone, Copy, Default, Pod, Zeroable)]
#[repr(C)]
pub struct WorldVertex {
    pub pos: [f32; 3],
    pub uv: [f32; 4],
    pub luv: [f32; 4],
    pub color: [u8; 4],
}

// ============================================================
// Polygon records
// ============================================================

struct MiscPoly {
    first_vert: u32,
    num_verts: u32,
    flags: u32,
    thandle: THandleRef,
}

struct WorldPoly {
    thandle: THandleRef,
    linfo: Option<LInfoRef>,
    flags: u32,
    shift_u: f32,
    shift_v: f32,
    scale_u: f32,
    scale_v: f32,
    shift_u2: f32,
    shift_v2: f32,
    first_vert: u32,
    num_verts: u32,
}

struct DecalRect {
    thandle: THandleRef,
    src: Option<Rect>,
    x: i32,
    y: i32,
}

// ============================================================
// Cache containers
// ============================================================
// Vecs are preallocated to capacity at init and only ever push up to that
// capacity before a flush clears them, so the backing storage never moves.

struct MiscCache {
    polys: Vec<MiscPoly>,
    verts: Vec<MiscVertex>,
}

struct WorldCache {
    polys: Vec<WorldPoly>,
    verts: Vec<WorldVertex>,
}

struct DecalCache {
    decals: Vec<DecalRect>,
}

// ============================================================
// Geometry transform
// ============================================================

/// Transform one submitted vertex into misc-cache form. The caller
/// guarantees positive view depth; `1/z` diverges otherwise.
fn misc_vertex(src: &TlVertex, alpha: u8) -> MiscVertex {
    debug_assert!(src.z > 0.0, "vertex depth must be positive");
    let z_recip = 1.0 / src.z;

    MiscVertex {
        x: src.x,
        y: src.y,
        z: -1.0 + z_recip,
        u: src.u * z_recip,
        v: src.v * z_recip,
        s: 0.0,
        t: z_recip,
        r: src.r as u8,
        g: src.g as u8,
        b: src.b as u8,
        a: alpha,
    }
}

/// Transform one submitted vertex into world-cache form, applying the
/// polygon's diffuse UV remap and, when a lightmap is present, the
/// lightmap remap. `inv_scale` comes from the diffuse handle and
/// normalizes both layers.
fn world_vertex(src: &TlVertex, poly: &WorldPoly, inv_scale: f32, alpha: u8) -> WorldVertex {
    debug_assert!(src.z > 0.0, "vertex depth must be positive");
    let z_recip = 1.0 / src.z;

    let tu = src.u * poly.scale_u + poly.shift_u;
    let tv = src.v * poly.scale_v + poly.shift_v;

    let mut luv = [0.0; 4];
    if poly.linfo.is_some() {
        let lu = src.u - poly.shift_u2;
        let lv = src.v - poly.shift_v2;
        luv = [lu * inv_scale * z_recip, lv * inv_scale * z_recip, 0.0, z_recip];
    }

    WorldVertex {
        pos: [src.x, src.y, -1.0 + z_recip],
        uv: [tu * inv_scale * z_recip, tv * inv_scale * z_recip, 0.0, z_recip],
        luv,
        color: [
            src.r.round() as u8,
            src.g.round() as u8,
            src.b.round() as u8,
            alpha,
        ],
    }
}

// ============================================================
// PolyCache
// ============================================================

/// The driver's polygon batching state. Created at driver init, shut down
/// explicitly; owned by the rendering thread that owns the GL context.
pub struct PolyCache {
    decals: DecalCache,
    misc: MiscCache,
    world: WorldCache,
    stream: Box<dyn VertexStream>,
}

impl PolyCache {
    pub fn new(gl: &mut dyn Gl) -> Self {
        let stream: Box<dyn VertexStream> = if gl.has_extension(VBO_EXTENSION) {
            info!("vertex buffer objects supported, streaming through GL buffers");
            Box::new(BufferedStream::new(gl))
        } else {
            info!("vertex buffer objects unavailable, using immediate mode");
            Box::new(ImmediateStream)
        };

        PolyCache {
            decals: DecalCache { decals: Vec::with_capacity(MAX_DECAL_RECTS) },
            misc: MiscCache {
                polys: Vec::with_capacity(MAX_MISC_POLYS),
                verts: Vec::with_capacity(MAX_MISC_POLY_VERTS),
            },
            world: WorldCache {
                polys: Vec::with_capacity(MAX_WORLD_POLYS),
                verts: Vec::with_capacity(MAX_WORLD_POLY_VERTS),
            },
            stream,
        }
    }

    /// Release GPU-side buffers. Pending cache contents are dropped, not
    /// drawn; callers flush first if the frame should complete.
    pub fn shutdown(&mut self, gl: &mut dyn Gl) {
        self.stream.shutdown(gl);
    }

    /// Drain every cache, decals last so they composite over 3D content.
    pub fn flush_all(&mut self, gl: &mut dyn Gl, host: &mut dyn DriverHost) {
        self.flush_world_polys(gl, host);
        self.flush_misc_polys(gl, host);
        self.flush_decals(gl, host);
    }

    // ============================================================
    // Decal cache
    // ============================================================

    pub fn insert_decal(
        &mut self,
        gl: &mut dyn Gl,
        host: &mut dyn DriverHost,
        thandle: &THandleRef,
        src: Option<Rect>,
        x: i32,
        y: i32,
    ) {
        if self.decals.decals.len() >= MAX_DECAL_RECTS {
            self.flush_decals(gl, host);
        }

        self.decals.decals.push(DecalRect {
            thandle: Rc::clone(thandle),
            src,
            x,
            y,
        });
    }

    /// Draw cached decals in insertion order; later decals composite over
    /// earlier ones, so no texture sorting here.
    pub fn flush_decals(&mut self, gl: &mut dyn Gl, host: &mut dyn DriverHost) {
        if self.decals.decals.is_empty() {
            return;
        }

        for decal in &self.decals.decals {
            host.draw_decal(gl, &decal.thandle, decal.src.as_ref(), decal.x, decal.y);
        }

        trace!("flushed {} decals", self.decals.decals.len());
        self.decals.decals.clear();
    }

    // ============================================================
    // Misc polygon cache
    // ============================================================

    pub fn insert_misc_poly(
        &mut self,
        gl: &mut dyn Gl,
        host: &mut dyn DriverHost,
        verts: &[TlVertex],
        thandle: &THandleRef,
        flags: u32,
    ) -> Result<(), CacheError> {
        if verts.len() > MAX_MISC_POLY_VERTS {
            return Err(CacheError::PolyTooLarge {
                verts: verts.len(),
                capacity: MAX_MISC_POLY_VERTS,
            });
        }
        if verts.is_empty() {
            return Ok(());
        }

        if self.misc.polys.len() + 1 > MAX_MISC_POLYS
            || self.misc.verts.len() + verts.len() > MAX_MISC_POLY_VERTS
        {
            self.flush_misc_polys(gl, host);
        }

        let alpha = if flags & DRV_RENDER_ALPHA != 0 {
            verts[0].a as u8
        } else {
            255
        };

        let first_vert = self.misc.verts.len() as u32;
        for v in verts {
            self.misc.verts.push(misc_vertex(v, alpha));
        }

        self.misc.polys.push(MiscPoly {
            first_vert,
            num_verts: verts.len() as u32,
            flags,
            thandle: Rc::clone(thandle),
        });

        Ok(())
    }

    /// Drain the misc cache. Polygons draw in storage order with the
    /// texture rebound only on change; depth-state changes are scoped to
    /// the single polygon's draw.
    pub fn flush_misc_polys(&mut self, gl: &mut dyn Gl, host: &mut dyn DriverHost) {
        if self.misc.polys.is_empty() {
            return;
        }

        self.stream.begin_misc(gl, &self.misc.verts);

        gl.enable(GL_TEXTURE_2D);
        gl.enable(GL_BLEND);
        gl.blend_func(GL_SRC_ALPHA, GL_ONE_MINUS_SRC_ALPHA);
        gl.enable(GL_MULTISAMPLE);

        let mut bound_texture = 0;

        for poly in &self.misc.polys {
            if bound_texture != poly.thandle.texture_id {
                gl.bind_texture_2d(poly.thandle.texture_id);
                bound_texture = poly.thandle.texture_id;
            }

            if poly.thandle.has_flag(THANDLE_UPDATE) {
                host.update_texture(gl, &poly.thandle);
            }

            if poly.flags & DRV_RENDER_NO_ZMASK != 0 {
                gl.disable(GL_DEPTH_TEST);
            }
            if poly.flags & DRV_RENDER_NO_ZWRITE != 0 {
                gl.depth_mask(false);
            }

            gl.tex_parameter_i(GL_TEXTURE_MIN_FILTER, GL_LINEAR as GLint);
            gl.tex_parameter_i(GL_TEXTURE_MAG_FILTER, GL_LINEAR as GLint);

            let wrap = if poly.flags & DRV_RENDER_CLAMP_UV != 0 {
                GL_CLAMP_TO_EDGE
            } else {
                GL_REPEAT
            };
            gl.tex_parameter_i(GL_TEXTURE_WRAP_S, wrap as GLint);
            gl.tex_parameter_i(GL_TEXTURE_WRAP_T, wrap as GLint);

            self.stream
                .draw_misc(gl, &self.misc.verts, poly.first_vert, poly.num_verts);

            if poly.flags & DRV_RENDER_NO_ZMASK != 0 {
                gl.enable(GL_DEPTH_TEST);
            }
            if poly.flags & DRV_RENDER_NO_ZWRITE != 0 {
                gl.depth_mask(true);
            }
        }

        gl.disable(GL_MULTISAMPLE);
        self.stream.end_misc(gl);

        host.add_rendered_polys(self.misc.polys.len() as u32);
        trace!(
            "flushed {} misc polys ({} verts)",
            self.misc.polys.len(),
            self.misc.verts.len()
        );

        self.misc.polys.clear();
        self.misc.verts.clear();
    }

    // ============================================================
    // World polygon cache
    // ============================================================

    pub fn insert_world_poly(
        &mut self,
        gl: &mut dyn Gl,
        host: &mut dyn DriverHost,
        verts: &[TlVertex],
        thandle: &THandleRef,
        texinfo: &TexInfo,
        linfo: Option<&LInfoRef>,
        flags: u32,
    ) -> Result<(), CacheError> {
        if verts.len() > MAX_WORLD_POLY_VERTS {
            return Err(CacheError::PolyTooLarge {
                verts: verts.len(),
                capacity: MAX_WORLD_POLY_VERTS,
            });
        }
        if verts.is_empty() {
            return Ok(());
        }

        if self.world.verts.len() + verts.len() > MAX_WORLD_POLY_VERTS
            || self.world.polys.len() + 1 > MAX_WORLD_POLYS
        {
            self.flush_world_polys(gl, host);
        }

        let mut poly = WorldPoly {
            thandle: Rc::clone(thandle),
            linfo: linfo.cloned(),
            flags,
            shift_u: texinfo.shift_u,
            shift_v: texinfo.shift_v,
            scale_u: 1.0 / texinfo.draw_scale_u,
            scale_v: 1.0 / texinfo.draw_scale_v,
            shift_u2: 0.0,
            shift_v2: 0.0,
            first_vert: self.world.verts.len() as u32,
            num_verts: verts.len() as u32,
        };

        if let Some(linfo) = &poly.linfo {
            poly.shift_u2 = linfo.min_u as f32 - LIGHTMAP_SHIFT_BIAS;
            poly.shift_v2 = linfo.min_v as f32 - LIGHTMAP_SHIFT_BIAS;
        }

        let alpha = if flags & DRV_RENDER_ALPHA != 0 {
            verts[0].a.round() as u8
        } else {
            255
        };

        for v in verts {
            self.world.verts.push(world_vertex(v, &poly, thandle.inv_scale, alpha));
        }
        self.world.polys.push(poly);

        Ok(())
    }

    /// Drain the world cache. Both texture layers track their bound
    /// texture and rebind only on change; adjacent polygons usually share
    /// materials, which is what makes the cache worth keeping sorted at
    /// submission time.
    pub fn flush_world_polys(&mut self, gl: &mut dyn Gl, host: &mut dyn DriverHost) {
        if self.world.polys.is_empty() {
            return;
        }

        self.stream.begin_world(gl, &self.world.verts);

        gl.enable(GL_MULTISAMPLE);

        gl.active_texture(GL_TEXTURE0);
        gl.client_active_texture(GL_TEXTURE0);
        gl.tex_env_i(GL_TEXTURE_ENV_MODE, GL_MODULATE as GLint);

        let mut bound_texture = 0;
        let mut bound_lightmap = 0;

        for poly in &self.world.polys {
            if poly.flags & DRV_RENDER_NO_ZMASK != 0 {
                gl.disable(GL_DEPTH_TEST);
            }
            if poly.flags & DRV_RENDER_NO_ZWRITE != 0 {
                gl.depth_mask(false);
            }

            gl.active_texture(GL_TEXTURE0);
            gl.client_active_texture(GL_TEXTURE0);
            gl.enable(GL_TEXTURE_2D);

            if bound_texture != poly.thandle.texture_id {
                gl.bind_texture_2d(poly.thandle.texture_id);
                bound_texture = poly.thandle.texture_id;
            }

            let wrap = if poly.flags & DRV_RENDER_CLAMP_UV != 0 {
                GL_CLAMP
            } else {
                GL_REPEAT
            };
            gl.tex_parameter_i(GL_TEXTURE_WRAP_S, wrap as GLint);
            gl.tex_parameter_i(GL_TEXTURE_WRAP_T, wrap as GLint);

            if poly.thandle.has_flag(THANDLE_UPDATE) {
                host.update_texture(gl, &poly.thandle);
            }

            match &poly.linfo {
                Some(linfo) => {
                    let lm = &linfo.thandle;

                    // A preceding lightmap-less polygon disabled layer 1,
                    // so re-enable it even when the binding is unchanged.
                    gl.active_texture(GL_TEXTURE1);
                    gl.client_active_texture(GL_TEXTURE1);
                    gl.enable(GL_TEXTURE_2D);

                    if bound_lightmap != lm.texture_id {
                        bound_lightmap = lm.texture_id;
                        gl.bind_texture_2d(lm.texture_id);

                        // Dynamic lightmaps are regenerated every frame and
                        // re-downloaded on every bind; static ones only when
                        // flagged stale.
                        let dynamic = host.setup_lightmap(gl, linfo);
                        if dynamic || lm.has_flag(THANDLE_UPDATE_LM) {
                            host.download_lightmap(gl, linfo);
                            if dynamic {
                                lm.set_flag(THANDLE_UPDATE_LM);
                            } else {
                                lm.clear_flag(THANDLE_UPDATE_LM);
                            }
                        }
                    }

                    if lm.has_flag(THANDLE_UPDATE) {
                        host.update_texture(gl, lm);
                    }

                    gl.active_texture(GL_TEXTURE0);
                    gl.client_active_texture(GL_TEXTURE0);
                }
                None => {
                    gl.active_texture(GL_TEXTURE1);
                    gl.client_active_texture(GL_TEXTURE1);
                    gl.disable(GL_TEXTURE_2D);

                    gl.active_texture(GL_TEXTURE0);
                    gl.client_active_texture(GL_TEXTURE0);
                }
            }

            self.stream
                .draw_world(gl, &self.world.verts, poly.first_vert, poly.num_verts);

            if poly.flags & DRV_RENDER_NO_ZMASK != 0 {
                gl.enable(GL_DEPTH_TEST);
            }
            if poly.flags & DRV_RENDER_NO_ZWRITE != 0 {
                gl.depth_mask(true);
            }
        }

        gl.disable(GL_MULTISAMPLE);
        self.stream.end_world(gl);

        gl.active_texture(GL_TEXTURE1);
        gl.client_active_texture(GL_TEXTURE1);
        gl.disable(GL_TEXTURE_2D);
        gl.active_texture(GL_TEXTURE0);
        gl.client_active_texture(GL_TEXTURE0);

        host.add_rendered_polys(self.world.polys.len() as u32);
        trace!(
            "flushed {} world polys ({} verts)",
            self.world.polys.len(),
            self.world.verts.len()
        );

        self.world.polys.clear();
        self.world.verts.clear();
    }

    // Occupancy accessors, used by the frame loop for stats overlays.

    pub fn misc_occupancy(&self) -> (usize, usize) {
        (self.misc.polys.len(), self.misc.verts.len())
    }

    pub fn world_occupancy(&self) -> (usize, usize) {
        (self.world.polys.len(), self.world.verts.len())
    }

    pub fn decal_occupancy(&self) -> usize {
        self.decals.decals.len()
    }
}
