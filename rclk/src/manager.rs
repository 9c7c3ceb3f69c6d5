use alloc::{
    boxed::Box,
    collections::btree_map::BTreeMap,
    format,
    string::{String, ToString},
    vec::Vec,
};

use log::{debug, warn};
use rdif_clk::{
    ClkDeclare, ClkError, ClkFlags, ClockId, ClockNode, CompositeInit, ErrorBase, Registry,
};

use crate::{
    clock::{ClockCore, FixedRate},
    declare::DeclareContainer,
};

#[derive(Default)]
pub struct Manager {
    id_iter: usize,
    clocks: BTreeMap<ClockId, ClockCore>,
    providers: BTreeMap<String, Vec<ClockId>>,
    pub declares: DeclareContainer,
}

impl Manager {
    pub const fn new() -> Self {
        Self {
            id_iter: 0,
            clocks: BTreeMap::new(),
            providers: BTreeMap::new(),
            declares: DeclareContainer::new(),
        }
    }

    pub fn declare(&mut self, declare: ClkDeclare) {
        self.declares.add(declare);
    }

    /// Runs every matching declaration on each node not probed yet.
    pub fn probe(&mut self, nodes: &[ClockNode]) -> Result<(), ClkError> {
        for node in nodes {
            if self.declares.is_probed(node) {
                continue;
            }

            for declare in self.declares.matching(node) {
                debug!("Probe [{}]->[{}]", node.name, declare.name);
                (declare.setup)(self, node)?;
                self.declares.set_probed(node);
            }
        }
        Ok(())
    }

    pub fn register_fixed(&mut self, name: &str, rate: u64) -> Result<ClockId, ClkError> {
        self.register_composite(CompositeInit {
            name: name.to_string(),
            parent: None,
            hw: Box::new(FixedRate::new(rate)),
            gate: None,
            flags: ClkFlags::empty(),
        })
    }

    pub fn lookup(&self, name: &str) -> Option<ClockId> {
        self.clocks
            .iter()
            .find(|(_, c)| c.name == name)
            .map(|(id, _)| *id)
    }

    pub fn name(&self, id: ClockId) -> Option<&str> {
        self.clocks.get(&id).map(|c| c.name.as_str())
    }

    pub fn parent(&self, id: ClockId) -> Option<ClockId> {
        self.clocks.get(&id).and_then(|c| c.parent)
    }

    pub fn clock_count(&self) -> usize {
        self.clocks.len()
    }

    pub fn provider_get(&self, name: &str, index: usize) -> Option<ClockId> {
        self.providers.get(name)?.get(index).copied()
    }

    fn core(&self, id: ClockId) -> Result<&ClockCore, ClkError> {
        self.clocks
            .get(&id)
            .ok_or_else(|| ClkError::NotFound(format!("{id:?}")))
    }

    fn core_mut(&mut self, id: ClockId) -> Result<&mut ClockCore, ClkError> {
        self.clocks
            .get_mut(&id)
            .ok_or_else(|| ClkError::NotFound(format!("{id:?}")))
    }

    fn parent_rate(&self, core: &ClockCore) -> Result<u64, ClkError> {
        match core.parent {
            Some(parent) => self.get_rate(parent),
            None => Ok(0),
        }
    }

    /// Current rate, recalculated from the root down.
    pub fn get_rate(&self, id: ClockId) -> Result<u64, ClkError> {
        let core = self.core(id)?;
        let parent_rate = self.parent_rate(core)?;
        Ok(core.hw.recalc_rate(parent_rate))
    }

    /// Rate the clock would accept for `rate`.
    ///
    /// For `SET_RATE_PARENT` clocks the parent is rounded first and the clock
    /// rounds again against the rate its parent would really take.
    pub fn round_rate(&self, id: ClockId, rate: u64) -> Result<u64, ClkError> {
        let core = self.core(id)?;
        let parent_rate = self.parent_rate(core)?;
        let rounded = core.hw.round_rate(rate, parent_rate)?;

        if let Some(parent) = core.parent
            && core.flags.contains(ClkFlags::SET_RATE_PARENT)
            && rounded.parent_rate != parent_rate
        {
            let parent_rate = self.round_rate(parent, rounded.parent_rate)?;
            return Ok(core.hw.round_rate(rate, parent_rate)?.rate);
        }
        Ok(rounded.rate)
    }

    /// Changes the rate of `id`, retuning its parent first when the clock
    /// forwards requests. Returns the resulting rate.
    pub fn set_rate(&mut self, id: ClockId, rate: u64) -> Result<u64, ClkError> {
        let core = self.core(id)?;
        let parent = core.parent;
        let forward = core.flags.contains(ClkFlags::SET_RATE_PARENT);
        let parent_rate = self.parent_rate(core)?;
        let rounded = core.hw.round_rate(rate, parent_rate)?;

        let mut forwarded = false;
        if let Some(parent) = parent
            && forward
            && rounded.parent_rate != parent_rate
        {
            debug!(
                "[{}] forward rate {} to parent {parent:?}",
                core.name, rounded.parent_rate
            );
            self.set_rate(parent, rounded.parent_rate)?;
            forwarded = true;
        }

        let parent_rate = self.parent_rate(self.core(id)?)?;
        let core = self.core_mut(id)?;
        let rounded = if forwarded {
            core.hw.round_rate(rate, parent_rate)?
        } else {
            rounded
        };
        let current = core.hw.recalc_rate(parent_rate);
        match core.hw.rate_control() {
            Some(ctrl) => {
                debug!("[{}] set rate {}", core.name, rounded.rate);
                if let Err(e) = ctrl.set_rate(rounded.rate, parent_rate) {
                    // the parent keeps its new rate
                    if forwarded {
                        warn!("[{}] set rate fail after parent retune: {e}", core.name);
                    }
                    return Err(e);
                }
            }
            None => {
                if !forwarded && current != rounded.rate {
                    warn!("[{}] can not change rate to {}", core.name, rounded.rate);
                    return Err(ClkError::Unsupported);
                }
            }
        }

        self.get_rate(id)
    }

    /// Enables `id` and, on first use, its parent chain.
    pub fn enable(&mut self, id: ClockId) -> Result<(), ClkError> {
        let core = self.core(id)?;
        if core.enable_count == 0 {
            if let Some(parent) = core.parent {
                self.enable(parent)?;
            }
            if let Some(gate) = self.core_mut(id)?.gate.as_mut() {
                gate.enable();
            }
        }
        self.core_mut(id)?.enable_count += 1;
        Ok(())
    }

    pub fn disable(&mut self, id: ClockId) -> Result<(), ClkError> {
        let core = self.core_mut(id)?;
        if core.enable_count == 0 {
            warn!("[{}] disable unused clock", core.name);
            return Err(ClkError::Unsupported);
        }

        core.enable_count -= 1;
        if core.enable_count > 0 {
            return Ok(());
        }

        let parent = core.parent;
        if let Some(gate) = core.gate.as_mut() {
            gate.disable();
        }
        match parent {
            Some(parent) => self.disable(parent),
            None => Ok(()),
        }
    }

    /// Gated clocks report their gate, others follow their parent.
    pub fn is_enabled(&self, id: ClockId) -> Result<bool, ClkError> {
        let core = self.core(id)?;
        match (&core.gate, core.parent) {
            (Some(gate), _) => Ok(gate.is_enabled()),
            (None, Some(parent)) => self.is_enabled(parent),
            (None, None) => Ok(true),
        }
    }
}

impl Registry for Manager {
    fn register_composite(&mut self, init: CompositeInit) -> Result<ClockId, ClkError> {
        if self.lookup(&init.name).is_some() {
            return Err(ClkError::NameInUse(init.name));
        }

        let parent = match init.parent {
            Some(name) => Some(self.lookup(&name).ok_or(ClkError::NotFound(name))?),
            None => None,
        };

        self.id_iter += 1;
        let id = ClockId(self.id_iter);
        debug!("register clk [{}] -> {id:?}", init.name);

        self.clocks.insert(
            id,
            ClockCore {
                name: init.name,
                parent,
                hw: init.hw,
                gate: init.gate,
                flags: init.flags,
                enable_count: 0,
            },
        );
        Ok(id)
    }

    fn unregister(&mut self, id: ClockId) -> Result<(), ClkError> {
        self.core(id)?;
        if self.clocks.values().any(|c| c.parent == Some(id)) {
            return Err(ErrorBase::Busy.into());
        }

        if let Some(core) = self.clocks.remove(&id) {
            debug!("unregister clk [{}]", core.name);
        }
        self.providers.retain(|_, clocks| !clocks.contains(&id));
        Ok(())
    }

    fn add_provider(&mut self, name: &str, clocks: Vec<ClockId>) -> Result<(), ClkError> {
        if self.providers.contains_key(name) {
            return Err(ClkError::NameInUse(name.to_string()));
        }
        for &id in &clocks {
            self.core(id)?;
        }

        self.providers.insert(name.to_string(), clocks);
        Ok(())
    }
}
