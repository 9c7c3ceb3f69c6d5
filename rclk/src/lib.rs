#![no_std]

extern crate alloc;

use spin::Mutex;

mod clock;
mod declare;
mod manager;

pub use clock::FixedRate;
pub use declare::DeclareContainer;
pub use manager::*;
pub use rdif_clk::*;

static MANAGER: Mutex<Option<Manager>> = Mutex::new(None);

/// Creates the global clock tree. Calling it again drops the previous tree.
pub fn init() {
    MANAGER.lock().replace(Manager::new());
}

pub fn edit<F, T>(f: F) -> T
where
    F: FnOnce(&mut Manager) -> T,
{
    let mut g = MANAGER.lock();
    f(g.as_mut().expect("clock manager not init"))
}

pub fn read<F, T>(f: F) -> T
where
    F: FnOnce(&Manager) -> T,
{
    let g = MANAGER.lock();
    f(g.as_ref().expect("clock manager not init"))
}

pub fn declare(declare: ClkDeclare) {
    edit(|manager| manager.declare(declare))
}

pub fn declare_append(declares: &[ClkDeclare]) {
    edit(|manager| {
        for one in declares {
            manager.declare(one.clone());
        }
    })
}

pub fn probe(nodes: &[ClockNode]) -> Result<(), ClkError> {
    edit(|manager| manager.probe(nodes))
}

pub fn lookup(name: &str) -> Option<ClockId> {
    read(|manager| manager.lookup(name))
}

pub fn get_rate(id: ClockId) -> Result<u64, ClkError> {
    read(|manager| manager.get_rate(id))
}

pub fn set_rate(id: ClockId, rate: u64) -> Result<u64, ClkError> {
    edit(|manager| manager.set_rate(id, rate))
}

pub fn enable(id: ClockId) -> Result<(), ClkError> {
    edit(|manager| manager.enable(id))
}

pub fn disable(id: ClockId) -> Result<(), ClkError> {
    edit(|manager| manager.disable(id))
}
