//! Convert command
//!
//! Changes sample type, significant bits and range between two raw
//! layouts with the same plane structure.

use anyhow::{Result, bail};
use pixgraph_core::{ImageFrame, PixelFormat};
use pixgraph_graph::{FilterGraph, GraphBuilder};
use tracing::debug;

use crate::ConvertArgs;
use crate::frame_io::{attach_depth, read_frame, write_frame};
use crate::pathspec::FileFormat;

fn build_graph(args: &ConvertArgs, input: &FileFormat, output: &FileFormat) -> Result<FilterGraph> {
    if input.planes != output.planes
        || (input.is_color() && (input.subsample_w, input.subsample_h) != (output.subsample_w, output.subsample_h))
    {
        bail!("cannot convert {} to {}: plane layouts differ", input.name, output.name);
    }

    let pixel_in = PixelFormat::new(input.pixel_type)
        .with_depth(args.depth_in.unwrap_or(input.pixel_type.native_depth()))
        .with_fullrange(args.fullrange_in);
    let pixel_out = PixelFormat::new(output.pixel_type)
        .with_depth(args.depth_out.unwrap_or(output.pixel_type.native_depth()))
        .with_fullrange(args.fullrange_out);

    let geom = input.geometry(args.io.width, args.io.height, input.pixel_type);
    let mut builder = GraphBuilder::new(geom)?;
    builder.set_tile_width(args.tile_width);
    attach_depth(&mut builder, &geom, pixel_in, pixel_out, input.yuv, args.io.cpu)?;
    Ok(builder.complete()?)
}

pub fn run(args: ConvertArgs, verbose: u8) -> Result<()> {
    let (input, output) = super::parse_specs(&args.io)?;
    let (fin, fout) = (input.format, output.format);
    let (width, height) = (args.io.width, args.io.height);
    let cpu = args.io.cpu;

    let graph = build_graph(&args, &fin, &fout)?;
    let dst_geom = fout.geometry(width, height, fout.pixel_type);
    debug!(filters = ?graph.filter_names(), tmp_size = graph.tmp_size(), "convert graph ready");

    if verbose > 0 {
        println!("Converting {} -> {} ({}x{}, {} frame(s))", fin.name, fout.name, width, height, args.io.frames);
    }

    super::for_each_frame(&args.io, &input, &output, (width, height), |src, out| {
        let frame = read_frame(&fin, src, width, height, fin.pixel_type, args.fullrange_in, cpu)?;
        let mut converted = ImageFrame::new(dst_geom)?;
        let mut tmp = vec![0u8; graph.tmp_size()];
        graph.process(&frame.as_read_buffer(), &converted.as_write_buffer(), &mut tmp, None, None)?;
        if let Some(out) = out {
            // Samples already carry the requested depth; store them as is.
            write_frame(&converted, &fout, out, fout.pixel_type.native_depth(), args.fullrange_out, cpu)?;
        }
        Ok(())
    })?;

    if verbose > 0 {
        println!("Done.");
    }
    Ok(())
}
