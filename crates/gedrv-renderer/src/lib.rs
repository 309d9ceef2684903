// gedrv-renderer -- fixed-function OpenGL render driver core: polygon
// batching caches, vertex streaming strategies, and the GL boundary.
//
// Window/context creation, display-mode handling, and texture resource
// management live outside this crate; the driver consumes them through the
// `Gl` and `DriverHost` traits.

#![allow(clippy::too_many_arguments)]

pub mod qgl;
pub mod gl_thandle;
pub mod gl_stream;
pub mod gl_pcache;

#[cfg(test)]
pub(crate) mod test_support;
