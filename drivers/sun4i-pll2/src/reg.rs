use core::ptr::NonNull;

use rdif_clk::ErrorBase;
use tock_registers::{
    fields::Field,
    interfaces::{ReadWriteable, Readable},
    register_bitfields,
    registers::ReadWrite,
};

use crate::rate::Dividers;

register_bitfields![u32,
    PLL2_CFG [
        PRE_DIV OFFSET(0) NUMBITS(5) [],
        N OFFSET(8) NUMBITS(7) [],
        POST_DIV OFFSET(26) NUMBITS(4) [],
        ENABLE OFFSET(31) NUMBITS(1) []
    ]
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pll2Field {
    N,
    PreDiv,
    PostDiv,
    Enable,
}

impl Pll2Field {
    fn field(self) -> Field<u32, PLL2_CFG::Register> {
        match self {
            Self::N => PLL2_CFG::N,
            Self::PreDiv => PLL2_CFG::PRE_DIV,
            Self::PostDiv => PLL2_CFG::POST_DIV,
            Self::Enable => PLL2_CFG::ENABLE,
        }
    }
}

/// Handle to the PLL2 control word.
///
/// Not `Clone`: there is exactly one handle per register, the outputs share it
/// through an `Arc`.
pub struct Pll2Reg {
    reg: NonNull<ReadWrite<u32, PLL2_CFG::Register>>,
}

unsafe impl Send for Pll2Reg {}
unsafe impl Sync for Pll2Reg {}

impl Pll2Reg {
    /// # Safety
    /// `addr` must point to the PLL2 control register and stay mapped for the
    /// lifetime of the returned handle.
    pub unsafe fn new(addr: NonNull<u8>) -> Self {
        Self { reg: addr.cast() }
    }

    /// Like [`Pll2Reg::new`], rejecting null and misaligned addresses.
    ///
    /// # Safety
    /// See [`Pll2Reg::new`].
    pub unsafe fn map(addr: usize) -> Result<Self, ErrorBase> {
        if addr % align_of::<u32>() != 0 {
            return Err(ErrorBase::BadAddr(addr));
        }
        let ptr = NonNull::new(addr as *mut u8).ok_or(ErrorBase::BadAddr(addr))?;
        Ok(unsafe { Self::new(ptr) })
    }

    fn regs(&self) -> &ReadWrite<u32, PLL2_CFG::Register> {
        unsafe { self.reg.as_ref() }
    }

    pub fn raw(&self) -> u32 {
        self.regs().get()
    }

    pub fn read_field(&self, field: Pll2Field) -> u32 {
        self.regs().read(field.field())
    }

    /// Applies all `updates` in a single read-modify-write of the word.
    ///
    /// Values are truncated to their field width.
    pub fn write_fields(&self, updates: &[(Pll2Field, u32)]) {
        let Some(value) = updates
            .iter()
            .map(|&(field, val)| field.field().val(val))
            .reduce(|acc, v| acc + v)
        else {
            return;
        };
        self.regs().modify(value);
    }

    /// Raw divider fields, taken from one read of the word.
    pub fn dividers(&self) -> Dividers {
        let word = self.regs().extract();
        Dividers {
            n: word.read(PLL2_CFG::N),
            pre: word.read(PLL2_CFG::PRE_DIV),
            post: word.read(PLL2_CFG::POST_DIV),
        }
    }
}
