use alloc::string::String;

use rdif_clk::{ClkError, ClkFlags, ClockId, GateHardware, Hardware, Interface, RoundedRate};

pub(crate) struct ClockCore {
    pub name: String,
    pub parent: Option<ClockId>,
    pub hw: Hardware,
    pub gate: Option<GateHardware>,
    pub flags: ClkFlags,
    pub enable_count: usize,
}

/// Root clock with a constant rate, e.g. a crystal oscillator.
pub struct FixedRate {
    rate: u64,
}

impl FixedRate {
    pub fn new(rate: u64) -> Self {
        Self { rate }
    }
}

impl Interface for FixedRate {
    fn recalc_rate(&self, _parent_rate: u64) -> u64 {
        self.rate
    }

    fn round_rate(&self, _rate: u64, parent_rate: u64) -> Result<RoundedRate, ClkError> {
        Ok(RoundedRate {
            rate: self.rate,
            parent_rate,
        })
    }
}
