//! Resize command
//!
//! Decodes each frame into the working sample type, runs the luma and
//! chroma resize chains in one graph, and encodes the result in the
//! output format.

use anyhow::Result;
use pixgraph_core::{CpuClass, ImageFrame, PixelType};
use pixgraph_graph::{FilterGraph, GraphBuilder};
use pixgraph_resize::{Kernel, ResizeConversion};
use tracing::{debug, info};

use crate::ResizeArgs;
use crate::frame_io::{read_frame, write_frame};
use crate::pathspec::FileFormat;

/// Default working type: integer files resize as words.
fn working_type(file_type: PixelType) -> PixelType {
    match file_type {
        PixelType::Byte | PixelType::Word => PixelType::Word,
        other => other,
    }
}

/// Resize chain for one plane class. Chroma planes see dimensions, shifts
/// and windows scaled by the subsampling factors.
fn plane_resize<'k>(
    args: &ResizeArgs,
    kernel: &'k dyn Kernel,
    pixel_type: PixelType,
    dst: (u32, u32),
    subsample: (u32, u32),
) -> ResizeConversion<'k> {
    let (ssw, ssh) = subsample;
    let (sw, sh) = ((1u32 << ssw) as f64, (1u32 << ssh) as f64);
    let mut conv = ResizeConversion::new(args.io.width >> ssw, args.io.height >> ssh, pixel_type)
        .set_filter(kernel)
        .set_dst_width(dst.0 >> ssw)
        .set_dst_height(dst.1 >> ssh)
        .set_shift_w(args.shift_w / sw)
        .set_shift_h(args.shift_h / sh)
        .set_cpu(args.io.cpu);
    if pixel_type == PixelType::Word {
        conv = conv.set_depth(16);
    }
    if let Some(sub) = args.sub_width {
        conv = conv.set_subwidth(sub / sw);
    }
    if let Some(sub) = args.sub_height {
        conv = conv.set_subheight(sub / sh);
    }
    conv
}

fn build_graph(args: &ResizeArgs, format: &FileFormat, pixel_type: PixelType, dst: (u32, u32)) -> Result<FilterGraph> {
    let kernel = args.filter.create(args.taps)?;
    let geom = format.geometry(args.io.width, args.io.height, pixel_type);

    let mut builder = GraphBuilder::new(geom)?;
    builder.set_tile_width(args.tile_width);
    for f in plane_resize(args, kernel.as_ref(), pixel_type, dst, (0, 0)).create()?.into_vec() {
        builder.attach_filter(f)?;
    }
    if geom.color {
        let chroma = plane_resize(args, kernel.as_ref(), pixel_type, dst, (geom.subsample_w, geom.subsample_h));
        for f in chroma.create()?.into_vec() {
            builder.attach_filter_uv(f)?;
        }
    }
    Ok(builder.complete()?)
}

pub fn run(args: ResizeArgs, verbose: u8) -> Result<()> {
    let (input, output) = super::parse_specs(&args.io)?;
    let format = input.format;
    let (width, height) = (args.io.width, args.io.height);
    let dst = (args.dst_width.unwrap_or(width), args.dst_height.unwrap_or(height));
    let pixel_type = args.pixel_type.unwrap_or_else(|| working_type(format.pixel_type));
    let cpu: CpuClass = args.io.cpu;

    let graph = build_graph(&args, &format, pixel_type, dst)?;
    let dst_geom = format.geometry(dst.0, dst.1, pixel_type);
    debug!(
        filters = ?graph.filter_names(),
        tmp_size = graph.tmp_size(),
        tile_width = graph.tile_width(),
        "resize graph ready"
    );

    if verbose > 0 {
        println!(
            "Resizing {}x{} -> {}x{} ({}, {} frame(s), {})",
            width, height, dst.0, dst.1, args.filter, args.io.frames, pixel_type
        );
    }

    super::for_each_frame(&args.io, &input, &output, dst, |src, out| {
        let frame = read_frame(&format, src, width, height, pixel_type, args.fullrange, cpu)?;
        let mut resized = ImageFrame::new(dst_geom)?;
        let mut tmp = vec![0u8; graph.tmp_size()];
        graph.process(&frame.as_read_buffer(), &resized.as_write_buffer(), &mut tmp, None, None)?;
        if let Some(out) = out {
            write_frame(&resized, &output.format, out, pixel_type.native_depth(), args.fullrange, cpu)?;
        }
        Ok(())
    })?;

    info!(output = %output.path.display(), "resize done");
    if verbose > 0 {
        println!("Done.");
    }
    Ok(())
}
