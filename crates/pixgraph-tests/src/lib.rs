//! Integration tests for pixgraph crates.
//!
//! End-to-end checks of graphs that combine resize, depth conversion and
//! the basic filters, plus the helpers they share with the benchmarks.
//!
//! - `pipeline` - scratch sizing, tiling determinism, round trips, error
//!   propagation
//! - `golden` - output hashes compared across implementations and tiles

use pixgraph_core::{ImageFrame, ImageGeometry, PixelType, Result};
use pixgraph_graph::FilterGraph;
use sha2::{Digest, Sha256};

#[cfg(test)]
mod golden;
#[cfg(test)]
mod pipeline;

/// Deterministic frame: a smooth ramp with a small hashed ripple, scaled to
/// `depth` bits for integer types and to `[0, 1]` for floats.
pub fn test_pattern(geom: ImageGeometry, depth: u32) -> Result<ImageFrame> {
    let mut frame = ImageFrame::new(geom)?;
    let max = ((1u64 << depth.min(32)) - 1) as f64;

    for p in geom.planes() {
        let (w, h) = (geom.plane_width(p), geom.plane_height(p));
        for y in 0..h {
            let value = |x: u32| -> f64 {
                let ramp = (x as f64 / w as f64 + y as f64 / h as f64) * 0.4 + 0.1;
                let ripple = ((x * 31 + y * 17 + p as u32 * 7) % 13) as f64 / 130.0;
                ramp + ripple
            };
            match geom.pixel_type {
                PixelType::Byte => {
                    for (x, v) in frame.row_mut::<u8>(p, y).iter_mut().enumerate() {
                        *v = (value(x as u32) * max).round() as u8;
                    }
                }
                PixelType::Word => {
                    for (x, v) in frame.row_mut::<u16>(p, y).iter_mut().enumerate() {
                        *v = (value(x as u32) * max).round() as u16;
                    }
                }
                PixelType::Half => {
                    for (x, v) in frame.row_mut::<half::f16>(p, y).iter_mut().enumerate() {
                        *v = half::f16::from_f64(value(x as u32));
                    }
                }
                PixelType::Float => {
                    for (x, v) in frame.row_mut::<f32>(p, y).iter_mut().enumerate() {
                        *v = value(x as u32) as f32;
                    }
                }
            }
        }
    }
    Ok(frame)
}

/// Runs `graph` on `src` into a new frame of `dst_geom`, with a scratch
/// arena of exactly [`FilterGraph::tmp_size`] bytes.
pub fn run_graph(graph: &FilterGraph, src: &ImageFrame, dst_geom: ImageGeometry) -> Result<ImageFrame> {
    let mut dst = ImageFrame::new(dst_geom)?;
    let mut tmp = vec![0u8; graph.tmp_size()];
    graph.process(&src.as_read_buffer(), &dst.as_write_buffer(), &mut tmp, None, None)?;
    Ok(dst)
}

/// Lowercase hex SHA-256 over the rows of every plane, padding excluded.
pub fn frame_hash(frame: &ImageFrame) -> String {
    let geom = frame.geometry();
    let mut hasher = Sha256::new();
    for p in geom.planes() {
        let row_size = geom.row_size(p);
        let data = frame.plane_data(p);
        for y in 0..geom.plane_height(p) as usize {
            let start = y * frame.stride(p);
            hasher.update(&data[start..start + row_size]);
        }
    }
    format!("{:x}", hasher.finalize())
}
