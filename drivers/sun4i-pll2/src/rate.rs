//! Output rates of the four PLL2 taps.
//!
//! All four taps are views of the same `N`, pre-divider and post-divider
//! fields. Every function here is pure: the caller snapshots the fields with
//! [`Pll2Reg::dividers`](crate::Pll2Reg::dividers) and passes them in.

use rdif_clk::{ClkError, RoundedRate};

/// 44.1 kHz family, 512 fs.
pub const RATE_22M: u64 = 22_579_200;
/// 48 kHz family, 512 fs.
pub const RATE_24M: u64 = 24_576_000;

/// The only pre-divider that gives usable audio accuracy.
pub const PRE_DIV: u32 = 21;
/// The only post-divider that gives usable audio accuracy.
pub const POST_DIV: u32 = 4;

const N_22M: u32 = 79;
const N_24M: u32 = 86;

/// Raw divider fields of the control word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Dividers {
    pub n: u32,
    pub pre: u32,
    pub post: u32,
}

impl Dividers {
    /// Hardware treats 0 in any of the fields as 1.
    pub fn effective(self) -> Self {
        Self {
            n: self.n.max(1),
            pre: self.pre.max(1),
            post: self.post.max(1),
        }
    }
}

pub fn recalc_1x(div: Dividers, parent_rate: u64) -> u64 {
    let div = div.effective();
    parent_rate * div.n as u64 / div.pre as u64 / div.post as u64
}

/// The post-divider is bypassed on this output.
pub fn recalc_8x(div: Dividers, parent_rate: u64) -> u64 {
    let div = div.effective();
    parent_rate * (2 * div.n as u64) / div.pre as u64
}

pub fn recalc_4x(div: Dividers, parent_rate: u64) -> u64 {
    recalc_8x(div, parent_rate / 2)
}

pub fn recalc_2x(div: Dividers, parent_rate: u64) -> u64 {
    recalc_8x(div, parent_rate / 4)
}

/// Snaps a request to one of the two audio rates.
pub fn round_1x(rate: u64) -> Result<u64, ClkError> {
    if rate < RATE_22M {
        return Err(ClkError::RateNotSupported(rate));
    }

    if rate < RATE_24M {
        Ok(RATE_22M)
    } else {
        Ok(RATE_24M)
    }
}

/// Keeps the request and asks the parent for the rate that produces it.
///
/// The usable configurations always run the post-divider at 4, which this
/// output skips, and this output doubles the rate on top.
pub fn round_8x(rate: u64) -> Result<RoundedRate, ClkError> {
    let parent_rate = rate
        .checked_mul(POST_DIV as u64)
        .ok_or(ClkError::RateNotSupported(rate))?
        / 2;
    Ok(RoundedRate { rate, parent_rate })
}

pub fn round_4x(rate: u64) -> Result<RoundedRate, ClkError> {
    scaled_round_8x(rate, 2)
}

pub fn round_2x(rate: u64) -> Result<RoundedRate, ClkError> {
    scaled_round_8x(rate, 4)
}

fn scaled_round_8x(rate: u64, factor: u64) -> Result<RoundedRate, ClkError> {
    let rate_8x = rate
        .checked_mul(factor)
        .ok_or(ClkError::RateNotSupported(rate))?;
    let rounded = round_8x(rate_8x).map_err(|_| ClkError::RateNotSupported(rate))?;
    Ok(RoundedRate {
        rate,
        parent_rate: rounded.parent_rate,
    })
}

/// Multiplier for an audio rate, with [`PRE_DIV`] and [`POST_DIV`].
pub fn n_for_rate(rate: u64) -> Option<u32> {
    match rate {
        RATE_22M => Some(N_22M),
        RATE_24M => Some(N_24M),
        _ => None,
    }
}
