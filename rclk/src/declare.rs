use alloc::{collections::btree_set::BTreeSet, string::String, vec::Vec};

use rdif_clk::{ClkDeclare, ClockNode};

/// Setup declarations and the nodes they have already been run on.
#[derive(Default)]
pub struct DeclareContainer {
    declares: Vec<ClkDeclare>,
    probed: BTreeSet<String>,
}

impl DeclareContainer {
    pub const fn new() -> Self {
        Self {
            declares: Vec::new(),
            probed: BTreeSet::new(),
        }
    }

    pub fn add(&mut self, declare: ClkDeclare) {
        self.declares.push(declare);
    }

    pub fn set_probed(&mut self, node: &ClockNode) {
        self.probed.insert(node.name.clone());
    }

    pub fn is_probed(&self, node: &ClockNode) -> bool {
        self.probed.contains(&node.name)
    }

    /// Declarations whose compatibles include the node's.
    pub fn matching(&self, node: &ClockNode) -> Vec<ClkDeclare> {
        self.declares
            .iter()
            .filter(|d| d.compatibles.contains(&node.compatible.as_str()))
            .cloned()
            .collect()
    }
}
