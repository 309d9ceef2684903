// dcommon.rs — types shared between the engine and its render drivers

// ============================================================
// Per-polygon render flags
// ============================================================

/// DRV_RENDER_ALPHA — alpha-blend the polygon; the first vertex's alpha
/// applies to the whole polygon.
pub const DRV_RENDER_ALPHA: u32 = 1 << 0;
/// DRV_RENDER_CLAMP_UV — clamp texture coordinates instead of wrapping.
pub const DRV_RENDER_CLAMP_UV: u32 = 1 << 1;
/// DRV_RENDER_NO_ZMASK — draw without depth testing.
pub const DRV_RENDER_NO_ZMASK: u32 = 1 << 2;
/// DRV_RENDER_NO_ZWRITE — draw without writing depth.
pub const DRV_RENDER_NO_ZWRITE: u32 = 1 << 3;

// ============================================================
// Vertex / texture parameter blocks
// ============================================================

/// DRV_TLVertex — a transformed-and-lit vertex as the engine submits it.
/// Position is perspective space with z still positive view depth; color
/// channels are 0.0–255.0.
#[derive(Debug, Clone, Copy, Default)]
#[repr(C)]
pub struct TlVertex {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub u: f32,
    pub v: f32,
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

/// DRV_TexInfo — per-face texture mapping parameters. Draw scales are the
/// world-units-per-texel values the driver inverts into UV scales.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct TexInfo {
    pub shift_u: f32,
    pub shift_v: f32,
    pub draw_scale_u: f32,
    pub draw_scale_v: f32,
}

impl Default for TexInfo {
    fn default() -> Self {
        TexInfo {
            shift_u: 0.0,
            shift_v: 0.0,
            draw_scale_u: 1.0,
            draw_scale_v: 1.0,
        }
    }
}

/// Screen-space pixel rectangle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(C)]
pub struct Rect {
    pub left: i32,
    pub right: i32,
    pub top: i32,
    pub bottom: i32,
}
