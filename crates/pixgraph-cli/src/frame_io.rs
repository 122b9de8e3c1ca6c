//! Reading and writing frames of raw files through filter graphs.
//!
//! Planar files are handed to the graph as linear descriptors, one per
//! file plane. YUY2 files are unpacked and packed row by row through
//! callbacks into a single-row [`LineBuffer`]. Type and range changes
//! between the file and the in-memory frame run as depth conversions
//! inside the same graph.

use std::io;

use anyhow::{Result, bail};
use pixgraph_core::{
    BUFFER_MAX, BufferDescriptor, CpuClass, ImageBuffer, ImageFrame, ImageGeometry, LineBuffer, PixelFormat, PixelType,
};
use pixgraph_depth::DepthConversion;
use pixgraph_graph::{FilterGraph, GraphBuilder};
use tracing::trace;

use crate::pathspec::{FileFormat, Packing};

/// Attaches luma and chroma depth conversions for `geom`.
///
/// Chroma planes of YUV formats use the centered chroma range.
pub fn attach_depth(
    builder: &mut GraphBuilder,
    geom: &ImageGeometry,
    mut pixel_in: PixelFormat,
    mut pixel_out: PixelFormat,
    yuv: bool,
    cpu: CpuClass,
) -> Result<()> {
    let luma = DepthConversion::new(geom.width, geom.height)
        .set_pixel_in(pixel_in)
        .set_pixel_out(pixel_out)
        .set_cpu(cpu)
        .create()?;
    builder.attach_filter(luma)?;

    if geom.color {
        pixel_in.chroma = yuv;
        pixel_out.chroma = yuv;
        let uv = DepthConversion::new(geom.plane_width(1), geom.plane_height(1))
            .set_pixel_in(pixel_in)
            .set_pixel_out(pixel_out)
            .set_cpu(cpu)
            .create()?;
        builder.attach_filter_uv(uv)?;
    }
    Ok(())
}

fn conversion_graph(
    geom: ImageGeometry,
    convert: Option<(PixelFormat, PixelFormat)>,
    yuv: bool,
    cpu: CpuClass,
) -> Result<FilterGraph> {
    let mut builder = GraphBuilder::new(geom)?;
    if let Some((pixel_in, pixel_out)) = convert {
        attach_depth(&mut builder, &geom, pixel_in, pixel_out, yuv, cpu)?;
    }
    Ok(builder.complete()?)
}

/// Byte offset of each file plane within a frame.
fn plane_offsets(format: &FileFormat, width: u32, height: u32) -> Vec<(usize, usize)> {
    let mut offset = 0;
    format
        .plane_layout(width, height)
        .into_iter()
        .map(|(row, rows)| {
            let start = offset;
            offset += row * rows;
            (start, row * rows)
        })
        .collect()
}

fn even_bounds(left: u32, right: u32) -> (usize, usize) {
    ((left & !1) as usize, (right + (right & 1)) as usize)
}

/// Decodes one frame into a `pixel_type` frame.
pub fn read_frame(
    format: &FileFormat,
    data: &[u8],
    width: u32,
    height: u32,
    pixel_type: PixelType,
    fullrange: bool,
    cpu: CpuClass,
) -> Result<ImageFrame> {
    let file_geom = format.geometry(width, height, format.pixel_type);
    let convert = (pixel_type != format.pixel_type).then(|| {
        (
            PixelFormat::new(format.pixel_type).with_fullrange(fullrange),
            PixelFormat::new(pixel_type).with_fullrange(fullrange),
        )
    });
    let graph = conversion_graph(file_geom, convert, format.yuv, cpu)?;
    let mut tmp = vec![0u8; graph.tmp_size()];
    let mut out = ImageFrame::new(format.geometry(width, height, pixel_type))?;
    trace!(format = format.name, width, height, %pixel_type, "read frame");

    match format.packing {
        Packing::Planar => {
            let layout = format.plane_layout(width, height);
            let offsets = plane_offsets(format, width, height);
            let mut src = ImageBuffer::new();
            for (p, &(row, _)) in layout.iter().enumerate() {
                let (start, size) = offsets[format.plane_order[p]];
                src[p] = BufferDescriptor::from_slice(&data[start..start + size], row, BUFFER_MAX);
            }
            graph.process(&src, &out.as_write_buffer(), &mut tmp, None, None)?;
        }
        Packing::Yuy2 => {
            let line = LineBuffer::new(file_geom, 0)?;
            let linesize = width as usize * 2;
            let mut unpack = |i: u32, left: u32, right: u32| -> io::Result<()> {
                let (left, right) = even_bounds(left, right);
                let base = &data[i as usize * linesize..][..linesize];
                // SAFETY: the graph does not read the line buffer while a
                // callback runs, and the three planes are distinct.
                let (y, u, v) = unsafe { (line.row_mut::<u8>(0, i), line.row_mut::<u8>(1, i), line.row_mut::<u8>(2, i)) };
                for j in (left..right).step_by(2) {
                    y[j] = base[j * 2];
                    y[j + 1] = base[j * 2 + 2];
                    u[j / 2] = base[j * 2 + 1];
                    v[j / 2] = base[j * 2 + 3];
                }
                Ok(())
            };
            graph.process(&line.as_image_buffer(), &out.as_write_buffer(), &mut tmp, Some(&mut unpack), None)?;
        }
    }
    Ok(out)
}

/// Encodes `frame` into one frame of `data`.
///
/// `depth_in` is the number of significant bits in an integer frame.
/// Samples are converted whenever the file type or depth differs.
pub fn write_frame(
    frame: &ImageFrame,
    format: &FileFormat,
    data: &mut [u8],
    depth_in: u32,
    fullrange: bool,
    cpu: CpuClass,
) -> Result<()> {
    let geom = *frame.geometry();
    let planes = if geom.color { 3 } else { 1 };
    if planes != format.planes {
        bail!("incompatible plane count in format {}: frame has {planes}", format.name);
    }
    if geom.color && (geom.subsample_w != format.subsample_w || geom.subsample_h != format.subsample_h) {
        bail!("incompatible subsampling in format {}", format.name);
    }

    let native = geom.pixel_type.native_depth();
    let convert = (geom.pixel_type != format.pixel_type || depth_in != native).then(|| {
        (
            PixelFormat::new(geom.pixel_type).with_depth(depth_in).with_fullrange(fullrange),
            PixelFormat::new(format.pixel_type).with_fullrange(fullrange),
        )
    });
    let graph = conversion_graph(geom, convert, format.yuv, cpu)?;
    let mut tmp = vec![0u8; graph.tmp_size()];
    trace!(format = format.name, width = geom.width, height = geom.height, "write frame");

    match format.packing {
        Packing::Planar => {
            let layout = format.plane_layout(geom.width, geom.height);
            let mut file_planes: Vec<Option<&mut [u8]>> = Vec::with_capacity(layout.len());
            let mut rest = data;
            for &(row, rows) in &layout {
                let (plane, tail) = std::mem::take(&mut rest).split_at_mut(row * rows);
                file_planes.push(Some(plane));
                rest = tail;
            }

            let mut dst = ImageBuffer::new();
            for (p, &(row, _)) in layout.iter().enumerate() {
                let Some(plane) = file_planes[format.plane_order[p]].take() else {
                    bail!("format {} maps two planes to one file plane", format.name);
                };
                dst[p] = BufferDescriptor::from_slice_mut(plane, row, BUFFER_MAX);
            }
            graph.process(&frame.as_read_buffer(), &dst, &mut tmp, None, None)?;
        }
        Packing::Yuy2 => {
            let line = LineBuffer::new(format.geometry(geom.width, geom.height, PixelType::Byte), 0)?;
            let linesize = geom.width as usize * 2;
            let mut pack = |i: u32, left: u32, right: u32| -> io::Result<()> {
                let (left, right) = even_bounds(left, right);
                let base = &mut data[i as usize * linesize..][..linesize];
                // SAFETY: the graph does not write the line buffer while a
                // callback runs.
                let (y, u, v) = unsafe { (line.row::<u8>(0, i), line.row::<u8>(1, i), line.row::<u8>(2, i)) };
                for j in (left..right).step_by(2) {
                    base[j * 2] = y[j];
                    base[j * 2 + 1] = u[j / 2];
                    base[j * 2 + 2] = y[j + 1];
                    base[j * 2 + 3] = v[j / 2];
                }
                Ok(())
            };
            graph.process(&frame.as_read_buffer(), &line.as_image_buffer(), &mut tmp, None, Some(&mut pack))?;
        }
    }
    Ok(())
}
