#![no_std]

extern crate alloc;

use alloc::{string::String, vec::Vec};

pub use alloc::boxed::Box;
pub use rdif_base::ErrorBase;
use rdif_base::custom_type;

custom_type!(ClockId, usize, "{:#x}");

pub type Hardware = Box<dyn Interface>;
pub type GateHardware = Box<dyn Gate>;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ClkError {
    #[error("rate {0} Hz not supported")]
    RateNotSupported(u64),
    #[error("resource unavailable: {0}")]
    ResourceUnavailable(#[from] ErrorBase),
    #[error("clock `{0}` not found")]
    NotFound(String),
    #[error("clock name `{0}` already in use")]
    NameInUse(String),
    #[error("operation not supported")]
    Unsupported,
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ClkFlags: u32 {
        /// Forward rate changes this node cannot make alone to its parent.
        const SET_RATE_PARENT = 1 << 0;
    }
}

/// Outcome of rounding a rate request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundedRate {
    /// Rate the node would actually run at.
    pub rate: u64,
    /// Parent rate the node needs to reach `rate`.
    pub parent_rate: u64,
}

/// Rate operations of a clock node.
pub trait Interface: Send {
    /// Output rate given the current parent rate.
    fn recalc_rate(&self, parent_rate: u64) -> u64;

    /// Closest rate this node accepts for `rate`, together with the parent rate
    /// it needs for it.
    fn round_rate(&self, rate: u64, parent_rate: u64) -> Result<RoundedRate, ClkError>;

    /// Nodes that can reprogram their own hardware return `Some`.
    fn rate_control(&mut self) -> Option<&mut dyn RateControl> {
        None
    }
}

pub trait RateControl {
    /// Program `rate`, which must be a value returned by
    /// [`Interface::round_rate`].
    fn set_rate(&mut self, rate: u64, parent_rate: u64) -> Result<(), ClkError>;
}

/// Enable bit of a clock node.
pub trait Gate: Send {
    fn enable(&mut self);
    fn disable(&mut self);
    fn is_enabled(&self) -> bool;
}

/// Everything the framework needs to register one composite node.
pub struct CompositeInit {
    pub name: String,
    pub parent: Option<String>,
    pub hw: Hardware,
    pub gate: Option<GateHardware>,
    pub flags: ClkFlags,
}

/// Description of a clock controller node, handed to setup functions.
#[derive(Debug, Clone)]
pub struct ClockNode {
    pub name: String,
    pub compatible: String,
    reg: usize,
    pub parent: Option<String>,
    /// `clock-output-names`, in output index order.
    pub output_names: Vec<String>,
}

impl ClockNode {
    /// # Safety
    /// `reg` must be the virtual address of the node's control register, mapped
    /// for as long as any clock built from this node is registered.
    pub unsafe fn new(name: &str, compatible: &str, reg: usize) -> Self {
        Self {
            name: name.into(),
            compatible: compatible.into(),
            reg,
            parent: None,
            output_names: Vec::new(),
        }
    }

    pub fn with_parent(mut self, parent: &str) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_output_names(mut self, names: &[&str]) -> Self {
        self.output_names = names.iter().map(|&n| n.into()).collect();
        self
    }

    pub fn reg(&self) -> usize {
        self.reg
    }

    pub fn output_name(&self, index: usize) -> Option<&str> {
        self.output_names.get(index).map(|s| s.as_str())
    }
}

pub type FnSetup = fn(registry: &mut dyn Registry, node: &ClockNode) -> Result<(), ClkError>;

/// Binds a setup function to the controllers it handles.
#[derive(Clone)]
pub struct ClkDeclare {
    pub name: &'static str,
    pub compatibles: &'static [&'static str],
    pub setup: FnSetup,
}

/// The clock-tree side used by drivers while attaching their outputs.
pub trait Registry {
    fn register_composite(&mut self, init: CompositeInit) -> Result<ClockId, ClkError>;

    fn unregister(&mut self, id: ClockId) -> Result<(), ClkError>;

    /// Publish `clocks` so consumers can look them up by `(name, index)`.
    fn add_provider(&mut self, name: &str, clocks: Vec<ClockId>) -> Result<(), ClkError>;
}
