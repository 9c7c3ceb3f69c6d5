use std::error::Error;

use log::info;
use rclk::ClockNode;
use sun4i_pll2::rate::{RATE_22M, RATE_24M};

/// Power-on value of the PLL2 control word: N=79, pre=21, post=4, disabled.
const PLL2_RESET: u32 = (4 << 26) | (79 << 8) | 21;

const OUTPUT_NAMES: [&str; 4] = ["pll2", "pll2x2", "pll2x4", "pll2x8"];

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .init();

    // No hardware here: a heap word stands in for the mapped register.
    let reg = Box::leak(Box::new(PLL2_RESET)) as *mut u32 as usize;

    rclk::init();
    rclk::declare(sun4i_pll2::declare());
    rclk::edit(|m| m.register_fixed("osc24M", 24_000_000))?;

    // SAFETY: `reg` is a leaked allocation, valid for the whole program.
    let node = unsafe { ClockNode::new("pll2@1c20008", sun4i_pll2::COMPATIBLE, reg) }
        .with_parent("osc24M")
        .with_output_names(&OUTPUT_NAMES);
    rclk::probe(&[node])?;

    let mut ids = Vec::new();
    for name in OUTPUT_NAMES {
        let id = rclk::lookup(name).ok_or(rclk::ClkError::NotFound(name.into()))?;
        info!("{name} {id:?}: {} Hz", rclk::get_rate(id)?);
        ids.push(id);
    }
    let (x1, x8) = (ids[0], ids[3]);

    for rate in [RATE_22M, RATE_24M] {
        let got = rclk::set_rate(x1, rate)?;
        info!("pll2 -> {got} Hz, pll2x8 at {} Hz", rclk::get_rate(x8)?);
    }

    if let Err(e) = rclk::set_rate(x1, 12_288_000) {
        info!("12.288 MHz refused: {e}");
    }

    rclk::enable(x8)?;
    info!("pll2 enabled: {}", rclk::read(|m| m.is_enabled(x1))?);
    info!("register {:#010x}", unsafe { *(reg as *const u32) });

    Ok(())
}
