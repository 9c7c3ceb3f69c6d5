use alloc::sync::Arc;

use rdif_clk::Gate;

use crate::reg::{Pll2Field, Pll2Reg};

/// Enable bit of PLL2, only attached to the 1x output.
pub struct Pll2Gate {
    reg: Arc<Pll2Reg>,
}

impl Pll2Gate {
    pub(crate) fn new(reg: Arc<Pll2Reg>) -> Self {
        Self { reg }
    }
}

impl Gate for Pll2Gate {
    fn enable(&mut self) {
        self.reg.write_fields(&[(Pll2Field::Enable, 1)]);
    }

    fn disable(&mut self) {
        self.reg.write_fields(&[(Pll2Field::Enable, 0)]);
    }

    fn is_enabled(&self) -> bool {
        self.reg.read_field(Pll2Field::Enable) != 0
    }
}
