//! Filter graph construction and tiled execution.
//!
//! A graph chains [`Filter`]s per plane: plane 0 (luma), planes 1 and 2
//! (chroma, fed by one shared filter instance per attach) and plane 3
//! (alpha). Two-input filters attached to a color chain read the current
//! alpha head as their second input, so the graph is a DAG with nodes in
//! topological order by construction.
//!
//! ```text
//!  src[0] ── f0 ── f1 ────────────── dst[0]
//!  src[1] ── g ──────────────────── dst[1]
//!  src[2] ── g ──────────────────── dst[2]
//!  src[3] ── copy ───────────────── dst[3]
//! ```
//!
//! # Lifecycle
//!
//! [`GraphBuilder`] accepts filters until [`GraphBuilder::complete`]
//! consumes it and returns an immutable [`FilterGraph`]. Completion runs
//! the scheduler once without touching memory to measure how many rows of
//! every intermediate buffer are live at the same time, then sizes each
//! buffer as a circular window of the next power of two (or a full-height
//! linear buffer when the window reaches the plane height) and lays all of
//! them out in one scratch arena of [`FilterGraph::tmp_size`] bytes.
//!
//! # Execution
//!
//! [`FilterGraph::process`] splits the output into column tiles. For every
//! tile it propagates column ranges from the sinks back to the sources,
//! then walks bands of `1 << subsample_h` output rows and pulls each sink.
//! Pulling a node first pulls the input rows its filter depends on, so
//! every node produces rows in increasing order. When the source must
//! advance, the unpack callback (if any) materializes one band of source
//! rows; after every output band, the pack callback (if any) drains it.
//!
//! ```rust
//! use pixgraph_core::{ImageFrame, ImageGeometry, PixelType};
//! use pixgraph_graph::{FillValue, GraphBuilder, ValueInitializeFilter};
//!
//! let geom = ImageGeometry::new(64, 8, PixelType::Byte);
//! let mut builder = GraphBuilder::new(geom).unwrap();
//! builder
//!     .attach_filter(Box::new(ValueInitializeFilter::new(64, 8, PixelType::Byte, FillValue::Byte(9)).unwrap()))
//!     .unwrap();
//! let graph = builder.complete().unwrap();
//!
//! let src = ImageFrame::new(geom).unwrap();
//! let mut dst = ImageFrame::new(geom).unwrap();
//! let mut tmp = vec![0u8; graph.tmp_size()];
//! graph.process(&src.as_read_buffer(), &dst.as_write_buffer(), &mut tmp, None, None).unwrap();
//! assert!(dst.row::<u8>(0, 7).iter().all(|&v| v == 9));
//! ```

use std::sync::Arc;

use pixgraph_core::{
    ALIGNMENT, ALPHA_PLANE, BUFFER_MAX, BufferDescriptor, Error, ImageBuffer, ImageGeometry, PLANE_MAX, Result, align,
    mask_rows, select_buffer_mask,
};
use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::basic::CopyFilter;
use crate::filter::{Filter, FilterFormat};

/// Maximum number of nodes (sources included) in a graph.
pub const NODE_MAX: usize = 32;

/// Scratch budget above which the default tile width shrinks.
const TILE_CACHE_BYTES: usize = 1 << 20;

/// Smallest automatic tile width.
const TILE_WIDTH_MIN: u32 = 128;

/// Row materialization callback.
///
/// Called with a luma row index and a half-open luma column range. Unpack
/// callbacks must fill that band of the source buffer; pack callbacks
/// consume that band of the destination buffer. An error aborts
/// [`FilterGraph::process`].
pub trait RowCallback {
    /// Handles one band.
    fn call(&mut self, row: u32, left: u32, right: u32) -> std::io::Result<()>;
}

impl<F> RowCallback for F
where
    F: FnMut(u32, u32, u32) -> std::io::Result<()>,
{
    fn call(&mut self, row: u32, left: u32, right: u32) -> std::io::Result<()> {
        self(row, left, right)
    }
}

#[derive(Clone)]
enum NodeKind {
    Source,
    Filter {
        filter: Arc<dyn Filter>,
        deps: [usize; 2],
        num_deps: usize,
    },
}

#[derive(Clone)]
struct Node {
    kind: NodeKind,
    plane: usize,
    format: FilterFormat,
    step: u32,
}

impl Node {
    fn deps(&self) -> &[usize] {
        match &self.kind {
            NodeKind::Source => &[],
            NodeKind::Filter { deps, num_deps, .. } => &deps[..*num_deps],
        }
    }

    fn name(&self) -> &'static str {
        match &self.kind {
            NodeKind::Source => "source",
            NodeKind::Filter { filter, .. } => filter.name(),
        }
    }
}

/// Node list plus the plane endpoints, shared by the builder's dry run and
/// the finished graph.
#[derive(Clone)]
struct Topology {
    geometry: ImageGeometry,
    nodes: Vec<Node>,
    consumers: Vec<SmallVec<[usize; 4]>>,
    sources: [Option<usize>; PLANE_MAX],
    sinks: [Option<usize>; PLANE_MAX],
    subsample_w: u32,
    subsample_h: u32,
}

impl Topology {
    #[inline]
    fn shift_w(&self, plane: usize) -> u32 {
        if plane == 1 || plane == 2 { self.subsample_w } else { 0 }
    }

    #[inline]
    fn shift_h(&self, plane: usize) -> u32 {
        if plane == 1 || plane == 2 { self.subsample_h } else { 0 }
    }

    fn sink_format(&self, plane: usize) -> Option<FilterFormat> {
        self.sinks[plane].map(|s| self.nodes[s].format)
    }
}

/// Accumulates filters per plane.
pub struct GraphBuilder {
    geometry: ImageGeometry,
    nodes: Vec<Node>,
    heads: [Option<usize>; PLANE_MAX],
    tile_width: Option<u32>,
}

impl GraphBuilder {
    /// Starts a graph whose source has the given geometry.
    pub fn new(geometry: ImageGeometry) -> Result<Self> {
        geometry.validate()?;

        let mut nodes = Vec::with_capacity(NODE_MAX);
        let mut heads = [None; PLANE_MAX];
        for p in geometry.planes() {
            heads[p] = Some(nodes.len());
            nodes.push(Node {
                kind: NodeKind::Source,
                plane: p,
                format: FilterFormat {
                    width: geometry.plane_width(p),
                    height: geometry.plane_height(p),
                    bytes_per_sample: geometry.pixel_type.size() as u32,
                },
                step: 1,
            });
        }

        Ok(Self {
            geometry,
            nodes,
            heads,
            tile_width: None,
        })
    }

    /// Source geometry.
    pub fn geometry(&self) -> &ImageGeometry {
        &self.geometry
    }

    /// Format currently produced at the head of a plane's chain.
    pub fn head_format(&self, plane: usize) -> Option<FilterFormat> {
        self.heads[plane].map(|h| self.nodes[h].format)
    }

    /// Fixes the column tile width. `None` picks one from the scratch size.
    pub fn set_tile_width(&mut self, tile_width: Option<u32>) -> &mut Self {
        self.tile_width = tile_width;
        self
    }

    /// Appends a filter to the luma chain.
    pub fn attach_filter(&mut self, filter: Box<dyn Filter>) -> Result<&mut Self> {
        self.check_capacity(1)?;
        self.attach(0, Arc::from(filter))?;
        Ok(self)
    }

    /// Appends one filter instance to both chroma chains. Ignored when the
    /// image has no chroma planes.
    pub fn attach_filter_uv(&mut self, filter: Box<dyn Filter>) -> Result<&mut Self> {
        if !self.geometry.color {
            trace!(filter = filter.name(), "no chroma planes, filter ignored");
            return Ok(self);
        }
        self.check_capacity(2)?;
        let filter: Arc<dyn Filter> = Arc::from(filter);
        self.attach(1, Arc::clone(&filter))?;
        self.attach(2, filter)?;
        Ok(self)
    }

    /// Appends a filter to the alpha chain. Ignored when the image has no
    /// alpha plane.
    pub fn attach_filter_alpha(&mut self, filter: Box<dyn Filter>) -> Result<&mut Self> {
        if !self.geometry.alpha {
            trace!(filter = filter.name(), "no alpha plane, filter ignored");
            return Ok(self);
        }
        self.check_capacity(1)?;
        self.attach(ALPHA_PLANE, Arc::from(filter))?;
        Ok(self)
    }

    fn check_capacity(&self, count: usize) -> Result<()> {
        if self.nodes.len() + count > NODE_MAX {
            return Err(Error::TooManyNodes { limit: NODE_MAX });
        }
        Ok(())
    }

    fn attach(&mut self, plane: usize, filter: Arc<dyn Filter>) -> Result<()> {
        let desc = *filter.descriptor();
        let name = filter.name();

        if desc.num_planes != 1 {
            return Err(Error::incompatible(format!(
                "{name}: {} planes per filter, graph supports 1",
                desc.num_planes
            )));
        }
        if desc.step == 0 || desc.format.width == 0 || desc.format.height == 0 {
            return Err(Error::incompatible(format!("{name}: empty output or zero step")));
        }

        let head = self.heads[plane].ok_or_else(|| Error::incompatible(format!("plane {plane} not present")))?;
        let mut deps = [head, head];
        let num_deps = match desc.num_deps {
            0 => 0,
            1 => 1,
            2 => {
                if plane == ALPHA_PLANE {
                    return Err(Error::incompatible(format!("{name}: two-input filter on the alpha plane")));
                }
                let alpha = self.heads[ALPHA_PLANE]
                    .ok_or_else(|| Error::incompatible(format!("{name}: two-input filter needs an alpha plane")))?;
                let (color_fmt, alpha_fmt) = (self.nodes[head].format, self.nodes[alpha].format);
                if color_fmt.width != alpha_fmt.width || color_fmt.height != alpha_fmt.height {
                    return Err(Error::incompatible(format!(
                        "{name}: plane {plane} is {}x{} but alpha is {}x{}",
                        color_fmt.width, color_fmt.height, alpha_fmt.width, alpha_fmt.height
                    )));
                }
                deps[1] = alpha;
                2
            }
            n => return Err(Error::incompatible(format!("{name}: {n} inputs, graph supports at most 2"))),
        };

        for &d in &deps[..num_deps] {
            check_dependencies(filter.as_ref(), &self.nodes[d].format)?;
        }

        let id = self.nodes.len();
        trace!(id, plane, filter = name, width = desc.format.width, height = desc.format.height, "attach");
        self.nodes.push(Node {
            kind: NodeKind::Filter { filter, deps, num_deps },
            plane,
            format: desc.format,
            step: desc.step,
        });
        self.heads[plane] = Some(id);
        Ok(())
    }

    /// Finalizes the graph: inserts copies for untouched planes, checks the
    /// output geometry and sizes all intermediate buffers.
    pub fn complete(mut self) -> Result<FilterGraph> {
        for p in self.geometry.planes() {
            let Some(h) = self.heads[p] else { continue };
            if matches!(self.nodes[h].kind, NodeKind::Source) {
                let fmt = self.nodes[h].format;
                self.check_capacity(1)?;
                self.attach(p, Arc::new(CopyFilter::new(fmt.width, fmt.height, fmt.bytes_per_sample)))?;
            }
        }

        let (subsample_w, subsample_h) = if self.geometry.color {
            (self.geometry.subsample_w, self.geometry.subsample_h)
        } else {
            (0, 0)
        };

        let mut consumers: Vec<SmallVec<[usize; 4]>> = vec![SmallVec::new(); self.nodes.len()];
        for (id, node) in self.nodes.iter().enumerate() {
            for &d in node.deps() {
                consumers[d].push(id);
            }
        }

        let mut sources = [None; PLANE_MAX];
        for (id, node) in self.nodes.iter().enumerate() {
            if matches!(node.kind, NodeKind::Source) && !consumers[id].is_empty() {
                sources[node.plane] = Some(id);
            }
        }

        let topo = Topology {
            geometry: self.geometry,
            nodes: self.nodes,
            consumers,
            sources,
            sinks: self.heads,
            subsample_w,
            subsample_h,
        };
        check_output_geometry(&topo)?;

        FilterGraph::layout(topo, self.tile_width)
    }
}

impl std::fmt::Debug for GraphBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<_> = self.nodes.iter().map(Node::name).collect();
        f.debug_struct("GraphBuilder")
            .field("geometry", &self.geometry)
            .field("nodes", &names)
            .finish()
    }
}

/// Verifies that a filter's row and column dependencies stay inside its
/// input and never move backwards.
fn check_dependencies(filter: &dyn Filter, input: &FilterFormat) -> Result<()> {
    let desc = filter.descriptor();
    let name = filter.name();

    let mut prev = (0u32, 0u32);
    let mut i = 0;
    while i < desc.format.height {
        let (first, last) = filter.row_deps(i);
        if first > last || last > input.height {
            return Err(Error::incompatible(format!(
                "{name}: row {i} depends on rows {first}..{last} of a {}-row input",
                input.height
            )));
        }
        if first < prev.0 || last < prev.1 {
            return Err(Error::incompatible(format!("{name}: row dependencies are not monotonic at row {i}")));
        }
        prev = (first, last);
        i += desc.step;
    }

    let (left, right) = filter.col_deps(0, desc.format.width);
    if left > right || right > input.width {
        return Err(Error::incompatible(format!(
            "{name}: columns depend on {left}..{right} of a {}-column input",
            input.width
        )));
    }
    Ok(())
}

/// Chroma and alpha outputs must agree with the luma output.
fn check_output_geometry(topo: &Topology) -> Result<()> {
    let luma = topo.sink_format(0).ok_or_else(|| Error::incompatible("no luma output"))?;

    for p in [1, 2] {
        if let Some(fmt) = topo.sink_format(p) {
            let (sw, sh) = (topo.subsample_w, topo.subsample_h);
            let divisible = luma.width % (1 << sw) == 0 && luma.height % (1 << sh) == 0;
            if !divisible || fmt.width != luma.width >> sw || fmt.height != luma.height >> sh {
                return Err(Error::incompatible(format!(
                    "plane {p} output {}x{} does not match luma {}x{} with subsampling {sw}x{sh}",
                    fmt.width, fmt.height, luma.width, luma.height
                )));
            }
        }
    }
    if let Some(fmt) = topo.sink_format(ALPHA_PLANE) {
        if fmt.width != luma.width || fmt.height != luma.height {
            return Err(Error::incompatible(format!(
                "alpha output {}x{} does not match luma {}x{}",
                fmt.width, fmt.height, luma.width, luma.height
            )));
        }
    }
    Ok(())
}

/// Where a node's rows live during execution.
#[derive(Debug, Clone, Copy)]
enum BufferSlot {
    Source(usize),
    Sink(usize),
    Scratch { offset: usize, size: usize, stride: usize, mask: u32 },
}

/// A finalized, immutable filter graph.
///
/// `FilterGraph` is `Send + Sync`: several threads may run
/// [`process`](Self::process) concurrently, each with its own buffers and
/// scratch arena.
#[derive(Clone)]
pub struct FilterGraph {
    topo: Topology,
    slots: Vec<BufferSlot>,
    owner: Vec<usize>,
    tmp_size: usize,
    source_rows: [u32; PLANE_MAX],
    sink_rows: [u32; PLANE_MAX],
    tile_width: u32,
}

impl FilterGraph {
    fn layout(topo: Topology, tile_width: Option<u32>) -> Result<Self> {
        let n = topo.nodes.len();

        // In-place sharing: a filter may take over its first input's buffer
        // when it is that input's only consumer and neither end is external.
        let mut owner: Vec<usize> = (0..n).collect();
        for (id, node) in topo.nodes.iter().enumerate() {
            let NodeKind::Filter { filter, deps, num_deps } = &node.kind else {
                continue;
            };
            let d = deps[0];
            let is_sink = topo.sinks[node.plane] == Some(id);
            if *num_deps >= 1
                && filter.descriptor().flags.in_place
                && !is_sink
                && matches!(topo.nodes[d].kind, NodeKind::Filter { .. })
                && topo.consumers[d].len() == 1
                && topo.nodes[d].format.row_size() == node.format.row_size()
                && topo.nodes[d].format.height == node.format.height
            {
                owner[id] = owner[d];
            }
        }

        let mut tracker = LiveTracker::new(&topo, owner.clone());
        {
            let mut sched = Scheduler::new(&topo, None, Some(&mut tracker));
            sched.run_tile(0, topo.sink_format(0).map_or(0, |f| f.width), &mut None, &mut None)?;
        }

        let mut slots: Vec<BufferSlot> = vec![BufferSlot::Source(0); n];
        let mut source_rows = [0u32; PLANE_MAX];
        let mut sink_rows = [0u32; PLANE_MAX];
        let mut offset = 0usize;

        for id in 0..n {
            let node = &topo.nodes[id];
            let plane = node.plane;
            if matches!(node.kind, NodeKind::Source) {
                slots[id] = BufferSlot::Source(plane);
                source_rows[plane] = tracker.live[id].min(node.format.height);
                continue;
            }
            if topo.sinks[plane] == Some(id) {
                slots[id] = BufferSlot::Sink(plane);
                sink_rows[plane] = tracker.live[id].min(node.format.height);
                continue;
            }
            if owner[id] != id {
                slots[id] = slots[owner[id]];
                continue;
            }

            let members: SmallVec<[usize; 4]> = (id..n).filter(|&m| owner[m] == id).collect();
            let height = members.iter().map(|&m| topo.nodes[m].format.height).max().unwrap_or(1);
            let row_size = members.iter().map(|&m| topo.nodes[m].format.row_size()).max().unwrap_or(0);
            let live = tracker.live[id].max(1);

            let (mask, rows) = if live >= height {
                (BUFFER_MAX, height)
            } else {
                let mask = select_buffer_mask(live);
                if mask_rows(mask) >= height { (BUFFER_MAX, height) } else { (mask, mask_rows(mask)) }
            };
            let stride = align(row_size, ALIGNMENT);
            let size = stride * rows as usize;
            slots[id] = BufferSlot::Scratch {
                offset,
                size,
                stride,
                mask,
            };
            trace!(id, filter = node.name(), live, rows, stride, "scratch buffer");
            offset += size;
        }

        let tmp_size = if offset == 0 { 0 } else { offset + ALIGNMENT };

        let out_width = topo.sink_format(0).map_or(0, |f| f.width);
        let tile_align = 1u32 << topo.subsample_w;
        let tile_width = match tile_width {
            Some(w) => w.max(1),
            None if tmp_size > TILE_CACHE_BYTES => {
                let scaled = (out_width as u64 * TILE_CACHE_BYTES as u64 / tmp_size as u64) as u32;
                scaled.max(TILE_WIDTH_MIN)
            }
            None => out_width,
        };
        let tile_width = tile_width.div_ceil(tile_align) * tile_align;

        let graph = Self {
            topo,
            slots,
            owner,
            tmp_size,
            source_rows,
            sink_rows,
            tile_width,
        };

        debug!(
            nodes = graph.topo.nodes.len(),
            filters = ?graph.filter_names(),
            tmp_size = graph.tmp_size,
            input_buffering = graph.input_buffering(),
            output_buffering = graph.output_buffering(),
            tile_width = graph.tile_width,
            "filter graph complete"
        );
        Ok(graph)
    }

    /// Scratch bytes [`process`](Self::process) needs, including alignment slack.
    pub fn tmp_size(&self) -> usize {
        self.tmp_size
    }

    /// Luma rows a source buffer must hold at once.
    ///
    /// Source descriptors with a mask window smaller than this are rejected.
    pub fn input_buffering(&self) -> u32 {
        (0..PLANE_MAX)
            .map(|p| self.source_rows[p] << self.topo.shift_h(p))
            .max()
            .unwrap_or(0)
    }

    /// Luma rows a destination buffer must hold at once.
    pub fn output_buffering(&self) -> u32 {
        (0..PLANE_MAX)
            .map(|p| self.sink_rows[p] << self.topo.shift_h(p))
            .max()
            .unwrap_or(0)
    }

    /// Source geometry.
    pub fn input_geometry(&self) -> &ImageGeometry {
        &self.topo.geometry
    }

    /// Output shape of a plane, if present.
    pub fn output_format(&self, plane: usize) -> Option<FilterFormat> {
        self.topo.sink_format(plane)
    }

    /// Luma output width.
    pub fn output_width(&self) -> u32 {
        self.topo.sink_format(0).map_or(0, |f| f.width)
    }

    /// Luma output height.
    pub fn output_height(&self) -> u32 {
        self.topo.sink_format(0).map_or(0, |f| f.height)
    }

    /// Column tile width used by [`process`](Self::process).
    pub fn tile_width(&self) -> u32 {
        self.tile_width
    }

    /// Filter names in node order, sources excluded.
    pub fn filter_names(&self) -> Vec<&'static str> {
        self.topo
            .nodes
            .iter()
            .filter(|n| matches!(n.kind, NodeKind::Filter { .. }))
            .map(Node::name)
            .collect()
    }

    /// Runs the graph.
    ///
    /// `src` must provide every source plane some filter reads, and `dst`
    /// every output plane, each with a mask window of at least
    /// [`input_buffering`](Self::input_buffering) /
    /// [`output_buffering`](Self::output_buffering) rows. `tmp` must hold
    /// [`tmp_size`](Self::tmp_size) bytes.
    ///
    /// On error the destination contents are unspecified.
    pub fn process(
        &self,
        src: &ImageBuffer<'_>,
        dst: &ImageBuffer<'_>,
        tmp: &mut [u8],
        mut unpack: Option<&mut dyn RowCallback>,
        mut pack: Option<&mut dyn RowCallback>,
    ) -> Result<()> {
        if tmp.len() < self.tmp_size {
            return Err(Error::ScratchTooSmall {
                required: self.tmp_size,
                provided: tmp.len(),
            });
        }

        for p in 0..PLANE_MAX {
            if self.topo.sources[p].is_some() {
                check_buffer("src", p, &src[p], self.source_rows[p])?;
            }
            if self.topo.sinks[p].is_some() {
                check_buffer("dst", p, &dst[p], self.sink_rows[p])?;
                debug_assert!(dst[p].is_writable(), "destination plane {p} is read-only");
            }
        }

        let mut scratch: SmallVec<[BufferDescriptor<'_>; NODE_MAX]> =
            SmallVec::from_elem(BufferDescriptor::null(), self.slots.len());
        {
            let pad = tmp.as_ptr().align_offset(ALIGNMENT).min(tmp.len());
            let mut rest = &mut tmp[pad..];
            for (id, slot) in self.slots.iter().enumerate() {
                if let BufferSlot::Scratch { size, stride, mask, .. } = *slot {
                    if self.owner[id] != id {
                        continue;
                    }
                    let (region, tail) = std::mem::take(&mut rest).split_at_mut(size);
                    scratch[id] = BufferDescriptor::from_slice_mut(region, stride, mask);
                    rest = tail;
                }
            }
        }

        let mut buffers: SmallVec<[BufferDescriptor<'_>; NODE_MAX]> = SmallVec::with_capacity(self.slots.len());
        for (id, slot) in self.slots.iter().enumerate() {
            buffers.push(match *slot {
                BufferSlot::Source(p) => src[p],
                BufferSlot::Sink(p) => dst[p],
                BufferSlot::Scratch { .. } => scratch[self.owner[id]],
            });
        }

        let mut sched = Scheduler::new(&self.topo, Some(buffers), None);
        let width = self.output_width();
        let mut left = 0;
        while left < width {
            let right = left.saturating_add(self.tile_width).min(width);
            sched.run_tile(left, right, &mut unpack, &mut pack)?;
            left = right;
        }
        Ok(())
    }
}

fn check_buffer(stage: &'static str, plane: usize, desc: &BufferDescriptor<'_>, required: u32) -> Result<()> {
    if desc.is_null() {
        return Err(Error::invalid_parameter("buffer", format!("{stage} plane {plane} is missing")));
    }
    let mask = desc.mask();
    if mask != BUFFER_MAX && !mask_rows(mask).is_power_of_two() {
        return Err(Error::invalid_parameter(
            "mask",
            format!("{stage} plane {plane} mask {mask:#x} is not 2^k - 1"),
        ));
    }
    if desc.buffered_rows() < required {
        return Err(Error::InsufficientBuffering {
            plane,
            required,
            provided: desc.buffered_rows(),
        });
    }
    Ok(())
}

impl std::fmt::Debug for FilterGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterGraph")
            .field("filters", &self.filter_names())
            .field("tmp_size", &self.tmp_size)
            .field("tile_width", &self.tile_width)
            .finish()
    }
}

/// Per-node cursor and column range for the current tile.
#[derive(Debug, Clone, Copy, Default)]
struct NodeState {
    cursor: u32,
    left: u32,
    right: u32,
}

/// Records, during a dry run, the widest window of simultaneously live
/// rows per buffer owner.
struct LiveTracker {
    owner: Vec<usize>,
    /// `low[d][c]`: first row of `d` consumer `c` still needs.
    low: Vec<Vec<u32>>,
    /// First sink row not yet handed to the pack stage.
    sink_low: Vec<u32>,
    live: Vec<u32>,
}

impl LiveTracker {
    fn new(topo: &Topology, owner: Vec<usize>) -> Self {
        let n = topo.nodes.len();
        Self {
            owner,
            low: vec![vec![0; n]; n],
            sink_low: vec![0; n],
            live: vec![0; n],
        }
    }

    fn measure(&mut self, topo: &Topology, state: &[NodeState], id: usize) {
        let o = self.owner[id];
        let mut hi = 0u32;
        let mut lo = u32::MAX;

        for m in (0..state.len()).filter(|&m| self.owner[m] == o) {
            hi = hi.max(state[m].cursor);
            for &c in &topo.consumers[m] {
                lo = lo.min(self.low[m][c]);
            }
            if topo.sinks[topo.nodes[m].plane] == Some(m) {
                lo = lo.min(self.sink_low[m]);
            }
        }
        if lo != u32::MAX {
            self.live[o] = self.live[o].max(hi.saturating_sub(lo));
        }
    }
}

/// Pull-based row scheduler for one graph execution.
struct Scheduler<'g, 'b, 't> {
    topo: &'g Topology,
    state: SmallVec<[NodeState; NODE_MAX]>,
    source_cursor: u32,
    unpack_range: (u32, u32),
    buffers: Option<SmallVec<[BufferDescriptor<'b>; NODE_MAX]>>,
    tracker: Option<&'t mut LiveTracker>,
}

impl<'g, 'b, 't> Scheduler<'g, 'b, 't> {
    fn new(
        topo: &'g Topology,
        buffers: Option<SmallVec<[BufferDescriptor<'b>; NODE_MAX]>>,
        tracker: Option<&'t mut LiveTracker>,
    ) -> Self {
        Self {
            topo,
            state: SmallVec::from_elem(NodeState::default(), topo.nodes.len()),
            source_cursor: 0,
            unpack_range: (0, 0),
            buffers,
            tracker,
        }
    }

    /// Resets cursors and propagates the tile's column range to every node.
    fn reset(&mut self, left: u32, right: u32) {
        let topo = self.topo;
        for st in self.state.iter_mut() {
            *st = NodeState {
                cursor: 0,
                left: u32::MAX,
                right: 0,
            };
        }
        self.source_cursor = 0;

        for p in 0..PLANE_MAX {
            if let Some(s) = topo.sinks[p] {
                let shift = topo.shift_w(p);
                self.state[s].left = left >> shift;
                self.state[s].right = right >> shift;
            }
        }

        for id in (0..topo.nodes.len()).rev() {
            let NodeKind::Filter { filter, deps, num_deps } = &topo.nodes[id].kind else {
                continue;
            };
            let st = self.state[id];
            if st.left >= st.right {
                continue;
            }
            let (dl, dr) = if *num_deps > 0 { filter.col_deps(st.left, st.right) } else { (0, 0) };
            for &d in &deps[..*num_deps] {
                self.state[d].left = self.state[d].left.min(dl);
                self.state[d].right = self.state[d].right.max(dr);
            }
        }

        let mut range = (u32::MAX, 0u32);
        for p in 0..PLANE_MAX {
            if let Some(s) = topo.sources[p] {
                let st = self.state[s];
                if st.left < st.right {
                    let shift = topo.shift_w(p);
                    range.0 = range.0.min(st.left << shift);
                    range.1 = range.1.max(st.right << shift);
                }
            }
        }
        self.unpack_range = if range.0 < range.1 {
            (range.0, range.1.min(topo.geometry.width))
        } else {
            (0, 0)
        };
    }

    fn run_tile(
        &mut self,
        left: u32,
        right: u32,
        unpack: &mut Option<&mut dyn RowCallback>,
        pack: &mut Option<&mut dyn RowCallback>,
    ) -> Result<()> {
        self.reset(left, right);

        let topo = self.topo;
        let height = topo.sink_format(0).map_or(0, |f| f.height);
        let band = 1u32 << topo.subsample_h;

        let mut row = 0;
        while row < height {
            let band_end = (row + band).min(height);
            for p in 0..PLANE_MAX {
                let Some(s) = topo.sinks[p] else { continue };
                let shift = topo.shift_h(p);
                if let Some(t) = self.tracker.as_deref_mut() {
                    t.sink_low[s] = row >> shift;
                }
                self.pull(s, band_end >> shift, unpack)?;
            }

            if let (Some(_), Some(cb)) = (&self.buffers, pack.as_deref_mut()) {
                cb.call(row, left, right)
                    .map_err(|source| Error::Callback { stage: "pack", row, source })?;
            }
            row = band_end;
        }
        Ok(())
    }

    /// Produces rows of `id` until rows `..last` are available.
    fn pull(&mut self, id: usize, last: u32, unpack: &mut Option<&mut dyn RowCallback>) -> Result<()> {
        let topo = self.topo;
        let node = &topo.nodes[id];
        let last = last.min(node.format.height);

        let NodeKind::Filter { filter, deps, num_deps } = &node.kind else {
            return self.pull_source(node.plane, last, unpack);
        };
        let deps = &deps[..*num_deps];

        while self.state[id].cursor < last {
            let i = self.state[id].cursor;

            if !deps.is_empty() {
                let (first, dep_last) = filter.row_deps(i);
                for &d in deps {
                    if let Some(t) = self.tracker.as_deref_mut() {
                        t.low[d][id] = first;
                    }
                    self.pull(d, dep_last, unpack)?;
                }
            }

            let st = self.state[id];
            if let Some(buffers) = self.buffers.as_ref().filter(|_| st.left < st.right) {
                let mut inputs = [BufferDescriptor::null(); 2];
                for (k, &d) in deps.iter().enumerate() {
                    inputs[k] = buffers[d];
                }
                filter.process(&inputs[..deps.len()], &buffers[id], i, st.left, st.right);
            }

            self.state[id].cursor = (i + node.step).min(node.format.height);
            if let Some(t) = self.tracker.as_deref_mut() {
                t.measure(topo, &self.state, id);
            }
        }
        Ok(())
    }

    /// Advances the shared source cursor one band at a time.
    fn pull_source(&mut self, plane: usize, last: u32, unpack: &mut Option<&mut dyn RowCallback>) -> Result<()> {
        let topo = self.topo;
        let height = topo.geometry.height;
        let band = 1u32 << topo.subsample_h;
        let needed = (last << topo.shift_h(plane)).min(height);

        while self.source_cursor < needed {
            let row = self.source_cursor;

            if let (Some(_), Some(cb)) = (&self.buffers, unpack.as_deref_mut()) {
                let (l, r) = self.unpack_range;
                cb.call(row, l, r)
                    .map_err(|source| Error::Callback { stage: "unpack", row, source })?;
            }

            self.source_cursor = (row + band).min(height);
            for p in 0..PLANE_MAX {
                if let Some(s) = topo.sources[p] {
                    self.state[s].cursor = self.source_cursor >> topo.shift_h(p);
                    if let Some(t) = self.tracker.as_deref_mut() {
                        t.measure(topo, &self.state, s);
                    }
                }
            }
        }
        Ok(())
    }
}
