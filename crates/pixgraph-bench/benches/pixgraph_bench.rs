//! Benchmarks for pixgraph filter graphs.
//!
//! Run with: `cargo bench`

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};

use pixgraph_core::{CpuClass, ImageFrame, ImageGeometry, PixelFormat, PixelType};
use pixgraph_depth::DepthConversion;
use pixgraph_graph::{FilterGraph, GraphBuilder};
use pixgraph_resize::{KernelKind, ResizeConversion};

const SRC: (u32, u32) = (1920, 1080);

/// 1080p luma plane with a diagonal ramp.
fn source(t: PixelType) -> ImageFrame {
    let mut frame = ImageFrame::new(ImageGeometry::new(SRC.0, SRC.1, t)).unwrap();
    for y in 0..SRC.1 {
        let y = y as usize;
        match t {
            PixelType::Byte => {
                for (x, v) in frame.row_mut::<u8>(0, y as u32).iter_mut().enumerate() {
                    *v = ((x + y) & 0xff) as u8;
                }
            }
            PixelType::Word => {
                for (x, v) in frame.row_mut::<u16>(0, y as u32).iter_mut().enumerate() {
                    *v = ((x * 7 + y) & 0x3ff) as u16;
                }
            }
            PixelType::Float => {
                for (x, v) in frame.row_mut::<f32>(0, y as u32).iter_mut().enumerate() {
                    *v = (x + y) as f32 / (SRC.0 + SRC.1) as f32;
                }
            }
            PixelType::Half => unimplemented!("no half sources in these benchmarks"),
        }
    }
    frame
}

fn run(graph: &FilterGraph, src: &ImageFrame, dst: &mut ImageFrame, tmp: &mut [u8]) {
    graph
        .process(&src.as_read_buffer(), &dst.as_write_buffer(), tmp, None, None)
        .unwrap();
}

fn resize_graph(t: PixelType, kind: KernelKind, dst: (u32, u32), cpu: CpuClass) -> FilterGraph {
    let kernel = kind.create(3).unwrap();
    let mut conv = ResizeConversion::new(SRC.0, SRC.1, t)
        .set_filter(kernel.as_ref())
        .set_dst_width(dst.0)
        .set_dst_height(dst.1)
        .set_cpu(cpu);
    if t == PixelType::Word {
        conv = conv.set_depth(10);
    }
    let mut builder = GraphBuilder::new(ImageGeometry::new(SRC.0, SRC.1, t)).unwrap();
    for f in conv.create().unwrap().into_vec() {
        builder.attach_filter(f).unwrap();
    }
    builder.complete().unwrap()
}

/// Benchmark 1080p -> 720p resize per kernel and instruction set class.
fn bench_resize(c: &mut Criterion) {
    let mut group = c.benchmark_group("resize");
    group.sample_size(20);
    let dst = (1280, 720);
    group.throughput(Throughput::Elements(dst.0 as u64 * dst.1 as u64));

    for t in [PixelType::Word, PixelType::Float] {
        let src = source(t);
        let mut out = ImageFrame::new(ImageGeometry::new(dst.0, dst.1, t)).unwrap();
        for kind in [KernelKind::Bilinear, KernelKind::Bicubic, KernelKind::Lanczos] {
            for cpu in [CpuClass::None, CpuClass::Auto] {
                let graph = resize_graph(t, kind, dst, cpu);
                let mut tmp = vec![0u8; graph.tmp_size()];
                let id = BenchmarkId::new(format!("{t}_{kind}"), cpu);
                group.bench_function(id, |b| b.iter(|| run(black_box(&graph), &src, &mut out, &mut tmp)));
            }
        }
    }

    group.finish();
}

fn depth_graph(pixel_in: PixelFormat, pixel_out: PixelFormat, cpu: CpuClass) -> FilterGraph {
    let filter = DepthConversion::new(SRC.0, SRC.1)
        .set_pixel_in(pixel_in)
        .set_pixel_out(pixel_out)
        .set_cpu(cpu)
        .create()
        .unwrap();
    let mut builder = GraphBuilder::new(ImageGeometry::new(SRC.0, SRC.1, pixel_in.pixel_type)).unwrap();
    builder.attach_filter(filter).unwrap();
    builder.complete().unwrap()
}

/// Benchmark depth conversion across the left-shift and general paths.
fn bench_depth(c: &mut Criterion) {
    let mut group = c.benchmark_group("depth");
    group.throughput(Throughput::Elements(SRC.0 as u64 * SRC.1 as u64));

    let byte = PixelFormat::new(PixelType::Byte);
    let word10 = PixelFormat::new(PixelType::Word).with_depth(10);
    let word16 = PixelFormat::new(PixelType::Word).with_depth(16);
    let float = PixelFormat::new(PixelType::Float);

    let cases = [
        ("byte_to_word16", byte, word16),
        ("byte_to_float", byte, float),
        ("word10_to_float", word10, float),
        ("float_to_word10", float, word10),
        ("word16_to_byte", word16, byte),
    ];

    for (name, pixel_in, pixel_out) in cases {
        let src = source(pixel_in.pixel_type);
        let mut out = ImageFrame::new(ImageGeometry::new(SRC.0, SRC.1, pixel_out.pixel_type)).unwrap();
        for cpu in [CpuClass::None, CpuClass::Auto] {
            let graph = depth_graph(pixel_in, pixel_out, cpu);
            let mut tmp = vec![0u8; graph.tmp_size()];
            group.bench_with_input(BenchmarkId::new(name, cpu), &graph, |b, g| {
                b.iter(|| run(black_box(g), &src, &mut out, &mut tmp))
            });
        }
    }

    group.finish();
}

/// Benchmark the effect of column tiling on a two-pass resize.
fn bench_tiling(c: &mut Criterion) {
    let mut group = c.benchmark_group("tiling");
    group.sample_size(20);
    let dst = (2880, 1620);
    let src = source(PixelType::Float);
    let mut out = ImageFrame::new(ImageGeometry::new(dst.0, dst.1, PixelType::Float)).unwrap();

    for tile in [None, Some(128), Some(512), Some(dst.0)] {
        let kernel = KernelKind::Spline36.create(3).unwrap();
        let conv = ResizeConversion::new(SRC.0, SRC.1, PixelType::Float)
            .set_filter(kernel.as_ref())
            .set_dst_width(dst.0)
            .set_dst_height(dst.1);
        let mut builder = GraphBuilder::new(ImageGeometry::new(SRC.0, SRC.1, PixelType::Float)).unwrap();
        builder.set_tile_width(tile);
        for f in conv.create().unwrap().into_vec() {
            builder.attach_filter(f).unwrap();
        }
        let graph = builder.complete().unwrap();
        let mut tmp = vec![0u8; graph.tmp_size()];

        let label = tile.map_or_else(|| "auto".to_string(), |w| w.to_string());
        group.bench_function(BenchmarkId::new("spline36_1.5x", label), |b| {
            b.iter(|| run(black_box(&graph), &src, &mut out, &mut tmp))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_resize, bench_depth, bench_tiling);
criterion_main!(benches);
