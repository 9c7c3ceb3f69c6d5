//! Driver for the PLL2 (audio PLL) of the Allwinner A10.
//!
//! One control word drives four outputs: `1x` (gated, programmable), and
//! `2x`, `4x`, `8x`, which follow `1x` and forward rate requests to it.

#![no_std]

extern crate alloc;

use alloc::{boxed::Box, string::ToString, vec::Vec};

use log::{debug, warn};
use rdif_clk::{
    ClkDeclare, ClkError, ClkFlags, ClockId, ClockNode, CompositeInit, ErrorBase, Registry,
};

mod gate;
pub mod rate;
mod reg;
mod tap;

pub use gate::Pll2Gate;
pub use reg::{Pll2Field, Pll2Reg};
pub use tap::*;

pub const COMPATIBLE: &str = "allwinner,sun4i-a10-b-pll2-clk";

/// Number of outputs, in provider index order: 1x, 2x, 4x, 8x.
pub const OUTPUTS: usize = 4;

pub fn declare() -> ClkDeclare {
    ClkDeclare {
        name: "sun4i-pll2",
        compatibles: &[COMPATIBLE],
        setup: probe,
    }
}

fn probe(registry: &mut dyn Registry, node: &ClockNode) -> Result<(), ClkError> {
    setup(registry, node).map(|_| ())
}

/// Registers the four outputs of the PLL2 described by `node`.
///
/// Either all four clocks and the provider are registered, or nothing is.
pub fn setup(
    registry: &mut dyn Registry,
    node: &ClockNode,
) -> Result<[ClockId; OUTPUTS], ClkError> {
    let names = output_names(node)?;

    let mut table = Vec::new();
    table.try_reserve_exact(OUTPUTS).map_err(|_| ErrorBase::NoMem)?;

    // SAFETY: a `ClockNode` only carries a register address its creator
    // guaranteed to be mapped.
    let pll2 = Pll2::new(unsafe { Pll2Reg::map(node.reg()) }?);

    let parent = names[0].to_string();
    let inits = [
        CompositeInit {
            name: names[0].to_string(),
            parent: node.parent.clone(),
            hw: Box::new(pll2.x1()),
            gate: Some(Box::new(pll2.gate())),
            flags: ClkFlags::empty(),
        },
        CompositeInit {
            name: names[1].to_string(),
            parent: Some(parent.clone()),
            hw: Box::new(pll2.x2()),
            gate: None,
            flags: ClkFlags::SET_RATE_PARENT,
        },
        CompositeInit {
            name: names[2].to_string(),
            parent: Some(parent.clone()),
            hw: Box::new(pll2.x4()),
            gate: None,
            flags: ClkFlags::SET_RATE_PARENT,
        },
        CompositeInit {
            name: names[3].to_string(),
            parent: Some(parent),
            hw: Box::new(pll2.x8()),
            gate: None,
            flags: ClkFlags::SET_RATE_PARENT,
        },
    ];

    let mut ids = [ClockId::default(); OUTPUTS];
    for (i, init) in inits.into_iter().enumerate() {
        match registry.register_composite(init) {
            Ok(id) => ids[i] = id,
            Err(e) => {
                warn!("[{}] register `{}` fail: {e}", node.name, names[i]);
                rollback(registry, &ids[..i]);
                return Err(e);
            }
        }
    }

    table.extend_from_slice(&ids);
    if let Err(e) = registry.add_provider(&node.name, table) {
        warn!("[{}] add provider fail: {e}", node.name);
        rollback(registry, &ids);
        return Err(e);
    }

    debug!("[{}] outputs {:?}", node.name, ids);
    Ok(ids)
}

fn output_names(node: &ClockNode) -> Result<[&str; OUTPUTS], ClkError> {
    let mut names = [""; OUTPUTS];
    for (i, name) in names.iter_mut().enumerate() {
        *name = node
            .output_name(i)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| ErrorBase::InvalidArg {
                name: "clock-output-names",
                val: node.output_names.len().to_string(),
            })?;
    }
    Ok(names)
}

/// Children first, so no clock ever loses its parent while registered.
fn rollback(registry: &mut dyn Registry, ids: &[ClockId]) {
    for &id in ids.iter().rev() {
        if let Err(e) = registry.unregister(id) {
            warn!("unregister {id:?} fail: {e}");
        }
    }
}


#[cfg(test)]
mod tests {
    use alloc::{string::String, vec};

    use rclk::Manager;

    use super::*;
    use crate::testing::leak_word;

    const OSC: u64 = 24_000_000;
    const NAMES: [&str; OUTPUTS] = ["pll2", "pll2x2", "pll2x4", "pll2x8"];

    fn node(reg: usize) -> ClockNode {
        unsafe { ClockNode::new("pll2@1c20008", COMPATIBLE, reg) }
            .with_parent("osc24M")
            .with_output_names(&NAMES)
    }

    fn manager() -> Manager {
        let mut m = Manager::new();
        m.register_fixed("osc24M", OSC).unwrap();
        m
    }

    #[test]
    fn test_setup_registers_all() {
        let mut m = manager();
        let ids = setup(&mut m, &node(leak_word(0))).unwrap();

        for (i, name) in NAMES.iter().enumerate() {
            assert_eq!(m.lookup(name), Some(ids[i]));
            assert_eq!(m.provider_get("pll2@1c20008", i), Some(ids[i]));
        }
        assert_eq!(m.parent(ids[0]), m.lookup("osc24M"));
        for id in &ids[1..] {
            assert_eq!(m.parent(*id), Some(ids[0]));
        }
    }

    #[test]
    fn test_end_to_end() {
        let mut m = manager();
        let reg = leak_word((4 << 26) | (79 << 8) | 21);
        let [x1, x2, x4, x8] = setup(&mut m, &node(reg)).unwrap();

        assert_eq!(m.get_rate(x1), Ok(OSC * 79 / 21 / 4));
        assert_eq!(m.get_rate(x1), Ok(22_571_428));
        assert_eq!(m.get_rate(x8), Ok(22_571_428 * 2 * 79 / 21));
        assert_eq!(m.get_rate(x4), Ok(22_571_428 / 2 * 2 * 79 / 21));
        assert_eq!(m.get_rate(x2), Ok(22_571_428 / 4 * 2 * 79 / 21));

        assert_eq!(m.is_enabled(x1), Ok(false));
        m.enable(x1).unwrap();
        assert_eq!(m.is_enabled(x1), Ok(true));
        assert_eq!(unsafe { *(reg as *const u32) } >> 31, 1);
    }

    #[test]
    fn test_set_rate_through_tree() {
        let mut m = manager();
        let [x1, _, _, x8] = setup(&mut m, &node(leak_word(0))).unwrap();

        assert_eq!(m.set_rate(x1, 23_000_000), Ok(OSC * 79 / 21 / 4));
        assert_eq!(
            m.set_rate(x1, 20_000_000),
            Err(ClkError::RateNotSupported(20_000_000))
        );

        // 8x asks 1x for twice its rate, which 1x snaps to 24.576 MHz
        let x8_rate = m.set_rate(x8, rate::RATE_22M * 4).unwrap();
        let x1_rate = OSC * 86 / 21 / 4;
        assert_eq!(m.get_rate(x1), Ok(x1_rate));
        assert_eq!(x8_rate, x1_rate * 2 * 86 / 21);
    }

    fn n_field(reg: usize) -> u32 {
        (unsafe { *(reg as *const u32) } >> 8) & 0x7f
    }

    #[test]
    fn test_set_rate_x4_through_tree() {
        let mut m = manager();
        let reg = leak_word(0);
        let [x1, _, x4, _] = setup(&mut m, &node(reg)).unwrap();

        // 4x asks 1x for 180.6336 MHz, which 1x snaps to 24.576 MHz
        let x4_rate = m.set_rate(x4, rate::RATE_22M * 2).unwrap();
        let x1_rate = OSC * 86 / 21 / 4;
        assert_eq!(n_field(reg), 86);
        assert_eq!(m.get_rate(x1), Ok(x1_rate));
        assert_eq!(x4_rate, x1_rate / 2 * 2 * 86 / 21);
    }

    #[test]
    fn test_set_rate_x2_through_tree() {
        let mut m = manager();
        let reg = leak_word(0);
        let [x1, x2, _, _] = setup(&mut m, &node(reg)).unwrap();

        // 2x asks 1x for eight times its rate
        let x2_rate = m.set_rate(x2, rate::RATE_22M / 8).unwrap();
        let x1_rate = OSC * 79 / 21 / 4;
        assert_eq!(n_field(reg), 79);
        assert_eq!(m.get_rate(x1), Ok(x1_rate));
        assert_eq!(x2_rate, x1_rate / 4 * 2 * 79 / 21);
    }

    #[test]
    fn test_set_rate_refused_by_1x() {
        let mut m = manager();
        let init = (4 << 26) | (86 << 8) | 21;
        let reg = leak_word(init);
        let [_, x2, _, x8] = setup(&mut m, &node(reg)).unwrap();

        assert_eq!(
            m.round_rate(x2, 1_000),
            Err(ClkError::RateNotSupported(8_000))
        );
        assert_eq!(
            m.set_rate(x2, 1_000),
            Err(ClkError::RateNotSupported(8_000))
        );
        assert_eq!(
            m.set_rate(x8, 1_000),
            Err(ClkError::RateNotSupported(2_000))
        );
        assert_eq!(unsafe { *(reg as *const u32) }, init);
    }

    #[test]
    fn test_round_rate_through_tree() {
        let mut m = manager();
        let reg = leak_word(0);
        let [x1, x2, x4, x8] = setup(&mut m, &node(reg)).unwrap();

        assert_eq!(m.round_rate(x1, 23_000_000), Ok(rate::RATE_22M));
        // derived taps report the request once 1x accepts the forwarded rate
        assert_eq!(m.round_rate(x8, 90_316_800), Ok(90_316_800));
        assert_eq!(m.round_rate(x4, 45_158_400), Ok(45_158_400));
        assert_eq!(m.round_rate(x2, 22_579_200), Ok(22_579_200));
        assert_eq!(unsafe { *(reg as *const u32) }, 0);
    }

    #[test]
    fn test_derived_enable_opens_gate() {
        let mut m = manager();
        let reg = leak_word(0);
        let [x1, x2, _, _] = setup(&mut m, &node(reg)).unwrap();

        m.enable(x2).unwrap();
        assert_eq!(m.is_enabled(x1), Ok(true));
        assert_eq!(m.is_enabled(x2), Ok(true));

        m.disable(x2).unwrap();
        assert_eq!(m.is_enabled(x2), Ok(false));
        assert_eq!(unsafe { *(reg as *const u32) }, 0);
    }

    #[test]
    fn test_bad_reg() {
        let mut m = manager();
        assert_eq!(
            setup(&mut m, &node(0)),
            Err(ClkError::ResourceUnavailable(ErrorBase::BadAddr(0)))
        );
        assert!(m.lookup("pll2").is_none());
    }

    #[test]
    fn test_missing_output_names() {
        let mut m = manager();
        let node = node(leak_word(0)).with_output_names(&NAMES[..3]);
        assert_eq!(
            setup(&mut m, &node),
            Err(ClkError::ResourceUnavailable(ErrorBase::InvalidArg {
                name: "clock-output-names",
                val: String::from("3"),
            }))
        );
        assert_eq!(m.clock_count(), 1);
    }

    #[test]
    fn test_partial_failure_rolls_back() {
        let mut m = manager();
        // steal the 4x name so the third registration fails
        m.register_fixed("pll2x4", 1).unwrap();

        assert_eq!(
            setup(&mut m, &node(leak_word(0))),
            Err(ClkError::NameInUse(String::from("pll2x4")))
        );
        assert!(m.lookup("pll2").is_none());
        assert!(m.lookup("pll2x2").is_none());
        assert_eq!(m.clock_count(), 2);
        assert_eq!(m.provider_get("pll2@1c20008", 0), None);
    }

    #[test]
    fn test_provider_failure_rolls_back() {
        let mut m = manager();
        m.add_provider("pll2@1c20008", vec![]).unwrap();

        assert!(setup(&mut m, &node(leak_word(0))).is_err());
        assert_eq!(m.clock_count(), 1);
    }

    #[test]
    fn test_missing_parent() {
        let mut m = Manager::new();
        assert_eq!(
            setup(&mut m, &node(leak_word(0))),
            Err(ClkError::NotFound(String::from("osc24M")))
        );
        assert_eq!(m.clock_count(), 0);
    }

    #[test]
    fn test_declare_probe() {
        let mut m = manager();
        m.declare(declare());
        m.probe(&[node(leak_word(0))]).unwrap();
        assert!(m.lookup("pll2x8").is_some());
    }
}
