//! Whole-graph behavior: scratch sizing, tiling, round trips, callbacks.

use approx::assert_abs_diff_eq;
use pixgraph_core::{
    CpuClass, Error, ImageFrame, ImageGeometry, LineBuffer, PixelFormat, PixelType, select_buffer_mask,
};
use pixgraph_depth::DepthConversion;
use pixgraph_graph::validation::snr_db;
use pixgraph_graph::{
    FillValue, FilterGraph, GraphBuilder, PremultiplyFilter, UnpremultiplyFilter, ValueInitializeFilter,
};
use pixgraph_resize::ResizeConversion;
use pixgraph_resize::kernel::{BilinearKernel, Spline36Kernel};

use crate::{frame_hash, run_graph, test_pattern};

const I420: (u32, u32) = (1, 1);

fn geometry(w: u32, h: u32, t: PixelType, color: bool) -> ImageGeometry {
    let geom = ImageGeometry::new(w, h, t);
    if color { geom.with_color(I420.0, I420.1) } else { geom }
}

/// Appends a depth conversion to every present plane.
fn attach_depth(builder: &mut GraphBuilder, w: u32, h: u32, pixel_in: PixelFormat, pixel_out: PixelFormat) {
    let luma = DepthConversion::new(w, h).set_pixel_in(pixel_in).set_pixel_out(pixel_out);
    builder.attach_filter(luma.create().unwrap()).unwrap();
    if builder.geometry().color {
        let chroma = DepthConversion::new(w >> I420.0, h >> I420.1)
            .set_pixel_in(pixel_in.with_chroma(true))
            .set_pixel_out(pixel_out.with_chroma(true));
        builder.attach_filter_uv(chroma.create().unwrap()).unwrap();
    }
}

/// Appends a spline36 resize to every present plane.
fn attach_resize(builder: &mut GraphBuilder, t: PixelType, src: (u32, u32), dst: (u32, u32)) {
    let kernel = Spline36Kernel;
    let plane = |ss: (u32, u32)| {
        let mut conv = ResizeConversion::new(src.0 >> ss.0, src.1 >> ss.1, t)
            .set_filter(&kernel)
            .set_dst_width(dst.0 >> ss.0)
            .set_dst_height(dst.1 >> ss.1);
        if t == PixelType::Word {
            conv = conv.set_depth(16);
        }
        conv.create().unwrap()
    };
    for f in plane((0, 0)).into_vec() {
        builder.attach_filter(f).unwrap();
    }
    if builder.geometry().color {
        for f in plane(I420).into_vec() {
            builder.attach_filter_uv(f).unwrap();
        }
    }
}

/// 8-bit source promoted to 16 bits, resized, and converted back to 8 bits.
fn byte_chain(color: bool, src: (u32, u32), dst: (u32, u32), tile_width: Option<u32>) -> FilterGraph {
    let byte = PixelFormat::new(PixelType::Byte);
    let word = PixelFormat::new(PixelType::Word).with_depth(16);

    let mut builder = GraphBuilder::new(geometry(src.0, src.1, PixelType::Byte, color)).unwrap();
    builder.set_tile_width(tile_width);
    attach_depth(&mut builder, src.0, src.1, byte, word);
    attach_resize(&mut builder, PixelType::Word, src, dst);
    attach_depth(&mut builder, dst.0, dst.1, word, byte);
    builder.complete().unwrap()
}

fn assert_scratch_is_exact(graph: &FilterGraph, src: &ImageFrame, dst_geom: ImageGeometry) {
    run_graph(graph, src, dst_geom).unwrap();
    if graph.tmp_size() == 0 {
        return;
    }
    let mut dst = ImageFrame::new(dst_geom).unwrap();
    let mut tmp = vec![0u8; graph.tmp_size() - 1];
    let err = graph
        .process(&src.as_read_buffer(), &dst.as_write_buffer(), &mut tmp, None, None)
        .unwrap_err();
    assert!(matches!(err, Error::ScratchTooSmall { .. }), "{err}");
}

#[test]
fn test_tmp_size_is_sufficient() {
    let (src, dst) = ((64, 48), (40, 100));
    for color in [false, true] {
        // Resize only.
        let geom = geometry(src.0, src.1, PixelType::Float, color);
        let mut builder = GraphBuilder::new(geom).unwrap();
        attach_resize(&mut builder, PixelType::Float, src, dst);
        let graph = builder.complete().unwrap();
        let frame = test_pattern(geom, 32).unwrap();
        assert_scratch_is_exact(&graph, &frame, geom.with_dimensions(dst.0, dst.1));

        // Depth only.
        let geom = geometry(src.0, src.1, PixelType::Byte, color);
        let mut builder = GraphBuilder::new(geom).unwrap();
        attach_depth(
            &mut builder,
            src.0,
            src.1,
            PixelFormat::new(PixelType::Byte),
            PixelFormat::new(PixelType::Float),
        );
        let graph = builder.complete().unwrap();
        let frame = test_pattern(geom, 8).unwrap();
        assert_scratch_is_exact(&graph, &frame, geom.with_pixel_type(PixelType::Float));

        // Both.
        let graph = byte_chain(color, src, dst, None);
        assert_scratch_is_exact(&graph, &frame, geom.with_dimensions(dst.0, dst.1));
    }
}

#[test]
fn test_tiling_is_deterministic() {
    let (src, dst) = ((96, 32), (144, 24));
    let geom = geometry(src.0, src.1, PixelType::Byte, true);
    let frame = test_pattern(geom, 8).unwrap();
    let dst_geom = geom.with_dimensions(dst.0, dst.1);

    let reference = frame_hash(&run_graph(&byte_chain(true, src, dst, None), &frame, dst_geom).unwrap());
    for tile in [16, 40, 64, 1000] {
        let graph = byte_chain(true, src, dst, Some(tile));
        let out = run_graph(&graph, &frame, dst_geom).unwrap();
        assert_eq!(frame_hash(&out), reference, "tile width {tile}");
    }
}

#[test]
fn test_byte_float_round_trip() {
    let geom = geometry(32, 16, PixelType::Byte, true);
    let frame = test_pattern(geom, 8).unwrap();
    let byte = PixelFormat::new(PixelType::Byte);
    let float = PixelFormat::new(PixelType::Float);

    let mut builder = GraphBuilder::new(geom).unwrap();
    attach_depth(&mut builder, 32, 16, byte, float);
    attach_depth(&mut builder, 32, 16, float, byte);
    let graph = builder.complete().unwrap();
    assert_eq!(graph.filter_names().len(), 6);

    let out = run_graph(&graph, &frame, geom).unwrap();
    assert_eq!(frame_hash(&out), frame_hash(&frame));
}

#[test]
fn test_resize_up_down_snr() {
    let geom = ImageGeometry::new(64, 48, PixelType::Float);
    let mut frame = ImageFrame::new(geom).unwrap();
    for y in 0..48 {
        for (x, v) in frame.row_mut::<f32>(0, y).iter_mut().enumerate() {
            let (fx, fy) = (x as f32 / 32.0, y as f32 / 24.0);
            *v = 0.5 + 0.25 * (fx * std::f32::consts::TAU).sin() * (fy * std::f32::consts::TAU).cos();
        }
    }

    let mut builder = GraphBuilder::new(geom).unwrap();
    attach_resize(&mut builder, PixelType::Float, (64, 48), (128, 96));
    attach_resize(&mut builder, PixelType::Float, (128, 96), (64, 48));
    let graph = builder.complete().unwrap();
    assert_eq!(graph.filter_names().len(), 4);

    let out = run_graph(&graph, &frame, geom).unwrap();
    assert!(snr_db(&frame, &out) > 30.0);
}

#[test]
fn test_premultiply_round_trip() {
    let geom = ImageGeometry::new(8, 2, PixelType::Float).with_alpha();
    let mut frame = ImageFrame::new(geom).unwrap();
    let alpha = [0.0f32, 0.25, 0.5, 1.0, 0.75, 0.0, 1.0, 0.1];
    for y in 0..2 {
        frame.row_mut::<f32>(3, y).copy_from_slice(&alpha);
        for (x, v) in frame.row_mut::<f32>(0, y).iter_mut().enumerate() {
            *v = 0.2 + x as f32 * 0.1;
        }
    }

    let mut builder = GraphBuilder::new(geom).unwrap();
    builder.attach_filter(Box::new(PremultiplyFilter::new(8, 2))).unwrap();
    let premultiplied = run_graph(&builder.complete().unwrap(), &frame, geom).unwrap();
    assert_abs_diff_eq!(premultiplied.row::<f32>(0, 1)[2], 0.4 * 0.5, epsilon = 1e-6);
    assert_eq!(premultiplied.row::<f32>(3, 1), &alpha);

    let mut builder = GraphBuilder::new(geom).unwrap();
    builder.attach_filter(Box::new(PremultiplyFilter::new(8, 2))).unwrap();
    builder.attach_filter(Box::new(UnpremultiplyFilter::new(8, 2))).unwrap();
    let out = run_graph(&builder.complete().unwrap(), &frame, geom).unwrap();

    for y in 0..2 {
        let (orig, row) = (frame.row::<f32>(0, y), out.row::<f32>(0, y));
        for x in 0..8 {
            if alpha[x] == 0.0 {
                assert_eq!(row[x], 0.0);
            } else {
                assert_abs_diff_eq!(row[x], orig[x], epsilon = 1e-5);
            }
        }
    }
}

#[test]
fn test_fill_tiled() {
    let geom = ImageGeometry::new(100, 1, PixelType::Byte);
    let mut builder = GraphBuilder::new(geom).unwrap();
    builder.set_tile_width(Some(50));
    let fill = ValueInitializeFilter::new(100, 1, PixelType::Byte, FillValue::Byte(37)).unwrap();
    builder.attach_filter(Box::new(fill)).unwrap();
    let graph = builder.complete().unwrap();
    assert_eq!(graph.tile_width(), 50);

    let src = ImageFrame::new(geom).unwrap();
    let out = run_graph(&graph, &src, geom).unwrap();
    assert!(out.row::<u8>(0, 0).iter().all(|&v| v == 37));
}

fn vertical_resize() -> FilterGraph {
    let geom = ImageGeometry::new(16, 16, PixelType::Float);
    let conv = ResizeConversion::new(16, 16, PixelType::Float)
        .set_filter(&BilinearKernel)
        .set_dst_height(8)
        .set_cpu(CpuClass::None);
    let mut builder = GraphBuilder::new(geom).unwrap();
    for f in conv.create().unwrap().into_vec() {
        builder.attach_filter(f).unwrap();
    }
    builder.complete().unwrap()
}

#[test]
fn test_unpack_error_propagates() {
    let graph = vertical_resize();
    assert!(graph.input_buffering() > 1);

    let mask = select_buffer_mask(graph.input_buffering());
    let line = LineBuffer::new(ImageGeometry::new(16, 16, PixelType::Float), mask).unwrap();
    let mut dst = ImageFrame::new(ImageGeometry::new(16, 8, PixelType::Float)).unwrap();
    let mut unpack = |row: u32, _: u32, _: u32| -> std::io::Result<()> {
        if row >= 4 {
            return Err(std::io::Error::other("source exhausted"));
        }
        Ok(())
    };
    let mut tmp = vec![0u8; graph.tmp_size()];
    let err = graph
        .process(&line.as_image_buffer(), &dst.as_write_buffer(), &mut tmp, Some(&mut unpack), None)
        .unwrap_err();
    assert!(matches!(err, Error::Callback { stage: "unpack", .. }), "{err}");
    assert!(err.is_io());
}

#[test]
fn test_small_line_buffer_rejected() {
    let graph = vertical_resize();
    let line = LineBuffer::new(ImageGeometry::new(16, 16, PixelType::Float), 0).unwrap();
    let mut dst = ImageFrame::new(ImageGeometry::new(16, 8, PixelType::Float)).unwrap();
    let mut tmp = vec![0u8; graph.tmp_size()];
    let err = graph
        .process(&line.as_image_buffer(), &dst.as_write_buffer(), &mut tmp, None, None)
        .unwrap_err();
    assert!(matches!(err, Error::InsufficientBuffering { plane: 0, provided: 1, .. }), "{err}");
}
