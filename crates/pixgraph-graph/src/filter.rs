//! The filter contract.
//!
//! A [`Filter`] is an elementary image transformation that produces the
//! rows of one output plane from zero, one or two input planes. Filters are
//! pure with respect to the graph: they see only buffer descriptors and a
//! row/column range, never allocate while processing, and must produce
//! identical output for any split of the column range.
//!
//! The graph queries [`Filter::row_deps`] and [`Filter::col_deps`] to know
//! which input rows must be resident and which input columns must be
//! computed before calling [`Filter::process`].

use pixgraph_core::BufferDescriptor;

/// Output plane shape of a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterFormat {
    /// Output width in samples.
    pub width: u32,
    /// Output height in rows.
    pub height: u32,
    /// Bytes per output sample.
    pub bytes_per_sample: u32,
}

impl FilterFormat {
    /// Bytes in one unpadded output row.
    #[inline]
    pub fn row_size(&self) -> usize {
        self.width as usize * self.bytes_per_sample as usize
    }
}

/// Scheduling hints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterFlags {
    /// Output row `i` may overwrite input row `i` of the first dependency.
    pub in_place: bool,
}

/// Static description of a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterDescriptor {
    /// Output plane shape.
    pub format: FilterFormat,
    /// Input planes read per invocation: 0, 1 or 2.
    pub num_deps: u32,
    /// Planes processed together. The graph only accepts 1.
    pub num_planes: u32,
    /// Output rows produced by one invocation.
    pub step: u32,
    /// Scheduling hints.
    pub flags: FilterFlags,
}

impl FilterDescriptor {
    /// One input, one plane, one row per call.
    pub const fn new(width: u32, height: u32, bytes_per_sample: u32) -> Self {
        Self {
            format: FilterFormat {
                width,
                height,
                bytes_per_sample,
            },
            num_deps: 1,
            num_planes: 1,
            step: 1,
            flags: FilterFlags { in_place: false },
        }
    }

    /// Sets the dependency count.
    pub const fn with_deps(mut self, num_deps: u32) -> Self {
        self.num_deps = num_deps;
        self
    }

    /// Sets the row step.
    pub const fn with_step(mut self, step: u32) -> Self {
        self.step = step;
        self
    }

    /// Marks the filter as in-place capable.
    pub const fn with_in_place(mut self) -> Self {
        self.flags.in_place = true;
        self
    }
}

/// An elementary image transformation.
///
/// # Contract
///
/// - `process(inputs, output, i, left, right)` writes columns
///   `[left, right)` of output rows `i .. i + step`, and nothing else.
/// - Before the call, input rows `row_deps(i)` and input columns
///   `col_deps(left, right)` are resident in every input.
/// - `process` never fails and never allocates. Out-of-contract calls are
///   caught by debug assertions only.
pub trait Filter: Send + Sync {
    /// Static description.
    fn descriptor(&self) -> &FilterDescriptor;

    /// Half-open range of input rows needed for output row `i`.
    fn row_deps(&self, i: u32) -> (u32, u32) {
        (i, i + self.descriptor().step)
    }

    /// Half-open range of input columns needed for output columns
    /// `[left, right)`.
    fn col_deps(&self, left: u32, right: u32) -> (u32, u32) {
        (left, right)
    }

    /// Produces output rows starting at `i`.
    fn process(&self, inputs: &[BufferDescriptor<'_>], output: &BufferDescriptor<'_>, i: u32, left: u32, right: u32);

    /// Implementation name, for logs and parity tests.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

impl std::fmt::Debug for dyn Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Filter")
            .field("name", &self.name())
            .field("descriptor", self.descriptor())
            .finish()
    }
}
