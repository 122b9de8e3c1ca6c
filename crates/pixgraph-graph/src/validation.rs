//! Randomized filter validation.
//!
//! [`FilterValidation`] feeds a filter deterministic pseudo-random input,
//! then checks that:
//!
//! - processing the full width at once and in narrow column tiles gives
//!   byte-identical output;
//! - the SHA-256 of the output matches a recorded value, when one is given;
//! - the output is close to that of a reference filter, measured as a
//!   signal-to-noise ratio in dB. An infinite threshold demands identical
//!   bytes.
//!
//! Failures panic, so the harness is meant for tests.
//!
//! ```rust
//! use pixgraph_core::{PixelFormat, PixelType};
//! use pixgraph_graph::CopyFilter;
//! use pixgraph_graph::validation::FilterValidation;
//!
//! let filter = CopyFilter::new(64, 8, 2);
//! let reference = CopyFilter::new(64, 8, 2);
//! let report = FilterValidation::new(&filter, 64, 8, PixelFormat::new(PixelType::Word).with_depth(10))
//!     .set_reference(&reference, f64::INFINITY)
//!     .run();
//! assert_eq!(report.sha256.len(), 64);
//! ```

use half::f16;
use pixgraph_core::{ImageFrame, ImageGeometry, PixelFormat, PixelType};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sha2::{Digest, Sha256};

use crate::filter::Filter;

const DEFAULT_SEED: u64 = 0x5eed_1234_abcd_0001;

/// Outcome of a successful validation.
#[derive(Debug, Clone)]
pub struct ValidationReport {
    /// Lowercase hex SHA-256 of the output rows.
    pub sha256: String,
    /// Measured SNR against the reference, if one was set.
    pub snr: Option<f64>,
}

/// Validation harness for a single filter.
pub struct FilterValidation<'a> {
    filter: &'a dyn Filter,
    src_width: u32,
    src_height: u32,
    src_format: PixelFormat,
    dst_format: PixelFormat,
    sha256: Option<&'a str>,
    reference: Option<(&'a dyn Filter, f64)>,
    seed: u64,
}

impl<'a> FilterValidation<'a> {
    /// Validates `filter` on a `src_width` x `src_height` input.
    pub fn new(filter: &'a dyn Filter, src_width: u32, src_height: u32, src_format: PixelFormat) -> Self {
        Self {
            filter,
            src_width,
            src_height,
            src_format,
            dst_format: src_format,
            sha256: None,
            reference: None,
            seed: DEFAULT_SEED,
        }
    }

    /// Output interpretation when it differs from the input.
    pub fn set_output_format(mut self, format: PixelFormat) -> Self {
        self.dst_format = format;
        self
    }

    /// Expected output hash.
    pub fn set_sha256(mut self, sha256: &'a str) -> Self {
        self.sha256 = Some(sha256);
        self
    }

    /// Reference filter and minimum SNR in dB.
    pub fn set_reference(mut self, reference: &'a dyn Filter, snr_threshold: f64) -> Self {
        self.reference = Some((reference, snr_threshold));
        self
    }

    /// Seed of the input generator.
    pub fn set_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Runs every check. Panics on the first failure.
    pub fn run(&self) -> ValidationReport {
        let desc = self.filter.descriptor();
        assert_eq!(
            desc.format.bytes_per_sample as usize,
            self.dst_format.pixel_type.size(),
            "{}: output sample size does not match {}",
            self.filter.name(),
            self.dst_format.pixel_type
        );

        let mut rng = StdRng::seed_from_u64(self.seed);
        let inputs: Vec<ImageFrame> = (0..desc.num_deps)
            .map(|k| {
                // A second input is an alpha plane.
                let format = if k == 0 { self.src_format } else { PixelFormat::new(PixelType::Float) };
                random_plane(&mut rng, self.src_width, self.src_height, format)
            })
            .collect();

        let full = run_filter(self.filter, &inputs, self.dst_format.pixel_type, desc.format.width);
        for tile in tile_widths(desc.format.width) {
            let tiled = run_filter(self.filter, &inputs, self.dst_format.pixel_type, tile);
            assert!(
                planes_equal(&full, &tiled),
                "{}: output differs between full width and {tile}-column tiles",
                self.filter.name()
            );
        }

        let sha256 = hash_plane(&full);
        if let Some(expected) = self.sha256 {
            assert_eq!(sha256, expected, "{}: output hash mismatch", self.filter.name());
        }

        let snr = self.reference.map(|(reference, threshold)| {
            assert_eq!(
                reference.descriptor().format,
                desc.format,
                "reference {} has a different output shape",
                reference.name()
            );
            let expected = run_filter(reference, &inputs, self.dst_format.pixel_type, desc.format.width);
            let snr = snr_db(&expected, &full);
            if threshold.is_infinite() {
                assert!(
                    planes_equal(&expected, &full),
                    "{} differs from reference {} (SNR {snr:.2} dB)",
                    self.filter.name(),
                    reference.name()
                );
            } else {
                assert!(
                    snr >= threshold,
                    "{}: SNR {snr:.2} dB against {} below {threshold} dB",
                    self.filter.name(),
                    reference.name()
                );
            }
            snr
        });

        ValidationReport { sha256, snr }
    }
}

/// Frame of random samples inside the nominal range of `format`.
pub fn random_plane(rng: &mut StdRng, width: u32, height: u32, format: PixelFormat) -> ImageFrame {
    let geom = ImageGeometry::new(width, height, format.pixel_type);
    let mut frame = match ImageFrame::new(geom) {
        Ok(frame) => frame,
        Err(e) => panic!("cannot allocate {width}x{height} test plane: {e}"),
    };
    let (lo, hi) = if format.chroma { (-0.5f32, 0.5f32) } else { (0.0, 1.0) };

    for y in 0..height {
        match format.pixel_type {
            PixelType::Byte => {
                let max = format.max_value() as u8;
                frame.row_mut::<u8>(0, y).iter_mut().for_each(|v| *v = rng.gen_range(0..=max));
            }
            PixelType::Word => {
                let max = format.max_value() as u16;
                frame.row_mut::<u16>(0, y).iter_mut().for_each(|v| *v = rng.gen_range(0..=max));
            }
            PixelType::Half => {
                frame
                    .row_mut::<f16>(0, y)
                    .iter_mut()
                    .for_each(|v| *v = f16::from_f32(rng.gen_range(lo..=hi)));
            }
            PixelType::Float => {
                frame.row_mut::<f32>(0, y).iter_mut().for_each(|v| *v = rng.gen_range(lo..=hi));
            }
        }
    }
    frame
}

/// Runs a filter over its whole output in column tiles of `tile` samples.
fn run_filter(filter: &dyn Filter, inputs: &[ImageFrame], dst_type: PixelType, tile: u32) -> ImageFrame {
    let desc = filter.descriptor();
    let (width, height) = (desc.format.width, desc.format.height);
    let mut out = match ImageFrame::new(ImageGeometry::new(width, height, dst_type)) {
        Ok(frame) => frame,
        Err(e) => panic!("cannot allocate {width}x{height} output: {e}"),
    };

    let srcs: Vec<_> = inputs.iter().map(|f| f.as_read_plane(0)).collect();
    let dst = out.as_write_buffer();
    let mut left = 0;
    while left < width {
        let right = (left + tile).min(width);
        let mut i = 0;
        while i < height {
            filter.process(&srcs, &dst[0], i, left, right);
            i += desc.step;
        }
        left = right;
    }
    out
}

fn tile_widths(width: u32) -> Vec<u32> {
    let mut tiles = vec![width.div_ceil(3).max(1)];
    if width > 7 {
        tiles.push(7);
    }
    tiles
}

fn row_bytes(frame: &ImageFrame, y: u32) -> &[u8] {
    let start = y as usize * frame.stride(0);
    &frame.plane_data(0)[start..start + frame.geometry().row_size(0)]
}

fn planes_equal(a: &ImageFrame, b: &ImageFrame) -> bool {
    (0..a.height(0)).all(|y| row_bytes(a, y) == row_bytes(b, y))
}

/// Lowercase hex SHA-256 of a plane's rows, padding excluded.
pub fn hash_plane(frame: &ImageFrame) -> String {
    let mut hasher = Sha256::new();
    for y in 0..frame.height(0) {
        hasher.update(row_bytes(frame, y));
    }
    hasher.finalize().iter().map(|b| format!("{b:02x}")).collect()
}

fn samples_f64(frame: &ImageFrame, y: u32) -> Vec<f64> {
    match frame.geometry().pixel_type {
        PixelType::Byte => frame.row::<u8>(0, y).iter().map(|&v| v as f64).collect(),
        PixelType::Word => frame.row::<u16>(0, y).iter().map(|&v| v as f64).collect(),
        PixelType::Half => frame.row::<f16>(0, y).iter().map(|&v| v.to_f64()).collect(),
        PixelType::Float => frame.row::<f32>(0, y).iter().map(|&v| v as f64).collect(),
    }
}

/// Signal-to-noise ratio of `test` against `reference` in dB.
///
/// Identical planes give `f64::INFINITY`.
pub fn snr_db(reference: &ImageFrame, test: &ImageFrame) -> f64 {
    let mut signal = 0.0f64;
    let mut noise = 0.0f64;
    for y in 0..reference.height(0) {
        let r = samples_f64(reference, y);
        let t = samples_f64(test, y);
        for (a, b) in r.iter().zip(&t) {
            signal += a * a;
            noise += (a - b) * (a - b);
        }
    }
    if noise == 0.0 {
        f64::INFINITY
    } else {
        10.0 * (signal / noise).log10()
    }
}
