use alloc::sync::Arc;

use log::debug;
use rdif_clk::{ClkError, Interface, RateControl, RoundedRate};

use crate::{
    Pll2Gate,
    rate::{self, Dividers},
    reg::{Pll2Field, Pll2Reg},
};

/// The PLL itself: owns the control word that all four outputs derive from.
#[derive(Clone)]
pub struct Pll2 {
    reg: Arc<Pll2Reg>,
}

impl Pll2 {
    pub fn new(reg: Pll2Reg) -> Self {
        Self { reg: Arc::new(reg) }
    }

    pub fn dividers(&self) -> Dividers {
        self.reg.dividers()
    }

    /// Programs one of the two audio rates. Anything else leaves the register
    /// untouched.
    pub fn set_audio_rate(&self, rate: u64) -> Result<(), ClkError> {
        let n = rate::n_for_rate(rate).ok_or(ClkError::RateNotSupported(rate))?;

        self.reg.write_fields(&[
            (Pll2Field::N, n),
            (Pll2Field::PreDiv, rate::PRE_DIV),
            (Pll2Field::PostDiv, rate::POST_DIV),
        ]);
        debug!("pll2: rate {rate} Hz, n={n}");
        Ok(())
    }

    pub fn gate(&self) -> Pll2Gate {
        Pll2Gate::new(self.reg.clone())
    }

    pub fn x1(&self) -> Pll2x1 {
        Pll2x1(self.clone())
    }

    pub fn x2(&self) -> Pll2x2 {
        Pll2x2(self.clone())
    }

    pub fn x4(&self) -> Pll2x4 {
        Pll2x4(self.clone())
    }

    pub fn x8(&self) -> Pll2x8 {
        Pll2x8(self.clone())
    }
}

/// PLL2 main output, the only one that can be programmed.
pub struct Pll2x1(Pll2);

impl Interface for Pll2x1 {
    fn recalc_rate(&self, parent_rate: u64) -> u64 {
        rate::recalc_1x(self.0.dividers(), parent_rate)
    }

    fn round_rate(&self, rate: u64, parent_rate: u64) -> Result<RoundedRate, ClkError> {
        Ok(RoundedRate {
            rate: rate::round_1x(rate)?,
            parent_rate,
        })
    }

    fn rate_control(&mut self) -> Option<&mut dyn RateControl> {
        Some(self)
    }
}

impl RateControl for Pll2x1 {
    fn set_rate(&mut self, rate: u64, _parent_rate: u64) -> Result<(), ClkError> {
        self.0.set_audio_rate(rate)
    }
}

macro_rules! derived_tap {
    ($(#[$meta:meta])* $name:ident, $recalc:path, $round:path) => {
        $(#[$meta])*
        pub struct $name(Pll2);

        impl Interface for $name {
            fn recalc_rate(&self, parent_rate: u64) -> u64 {
                $recalc(self.0.dividers(), parent_rate)
            }

            fn round_rate(&self, rate: u64, _parent_rate: u64) -> Result<RoundedRate, ClkError> {
                $round(rate)
            }
        }
    };
}

derived_tap!(
    /// A quarter of [`Pll2x8`].
    Pll2x2,
    rate::recalc_2x,
    rate::round_2x
);
derived_tap!(
    /// Half of [`Pll2x8`].
    Pll2x4,
    rate::recalc_4x,
    rate::round_4x
);
derived_tap!(
    /// Twice PLL2 without the post-divider.
    Pll2x8,
    rate::recalc_8x,
    rate::round_8x
);
