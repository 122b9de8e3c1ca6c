//! Cpuinfo command
//!
//! Prints instruction set detection and the class `auto` resolves to.

use anyhow::Result;
use pixgraph_core::cpu::describe_cpu;
use pixgraph_core::{CpuCapabilities, CpuClass};

pub fn run(verbose: u8) -> Result<()> {
    print!("{}", describe_cpu());
    println!("auto: {}", CpuClass::Auto.resolve());
    if verbose > 0 {
        println!("{:#?}", CpuCapabilities::get());
    }
    Ok(())
}
