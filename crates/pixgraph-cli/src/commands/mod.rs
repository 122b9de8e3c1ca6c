//! CLI command implementations

pub mod convert;
pub mod cpuinfo;
pub mod resize;

use anyhow::{Context, Result, bail};
use rayon::prelude::*;
use tracing::debug;

use crate::FrameArgs;
use crate::mmap::{MappedInput, MappedOutput};
use crate::pathspec::PathSpec;

/// Input format assumed when a specifier has no `format@` prefix.
pub const ASSUMED_INPUT: &str = "i420";

/// Parses the input and output specifiers. The output assumes the input's
/// format.
pub fn parse_specs(args: &FrameArgs) -> Result<(PathSpec, PathSpec)> {
    let input = PathSpec::parse(&args.input, ASSUMED_INPUT)?;
    let output = PathSpec::parse(&args.output, input.format.name)?;
    Ok((input, output))
}

/// Maps the input and output files and runs `process` on every frame.
///
/// Frames are independent and run in parallel on the rayon pool. The
/// output slice is `None` when writing to the null device.
pub fn for_each_frame<F>(args: &FrameArgs, input: &PathSpec, output: &PathSpec, dst_dims: (u32, u32), process: F) -> Result<()>
where
    F: Fn(&[u8], Option<&mut [u8]>) -> Result<()> + Sync + Send,
{
    if args.frames == 0 {
        bail!("--frames must be at least 1");
    }
    let in_size = input.format.frame_size(args.width, args.height);
    let out_size = output.format.frame_size(dst_dims.0, dst_dims.1);
    debug!(in_size, out_size, frames = args.frames, "frame sizes");

    let src = MappedInput::open(&input.path, in_size * args.frames)?;
    let frames = src.as_slice().par_chunks(in_size).enumerate();

    if output.is_null_device() {
        frames.try_for_each(|(n, frame)| process(frame, None).with_context(|| format!("Frame {n} failed")))
    } else {
        let mut dst = MappedOutput::create(&output.path, out_size * args.frames)?;
        frames
            .zip(dst.as_mut_slice().par_chunks_mut(out_size))
            .try_for_each(|((n, frame), out)| process(frame, Some(out)).with_context(|| format!("Frame {n} failed")))?;
        dst.flush()
    }
}
