use std::collections::VecDeque;

use log::trace;

use super::narrower::narrow;
use crate::error::Result;
use crate::game::scheduler::StepMeter;
use crate::model::{NodeId, RuleGraph};

/// Whether `id` narrows to exactly its solution column.
pub fn is_derivable(graph: &RuleGraph, id: NodeId, meter: &StepMeter) -> Result<bool> {
    let column = graph.node(id).solution_column;
    Ok(narrow(graph, id, meter)?.singleton() == Some(column))
}

/// Outcome of one [`SoundnessSweep::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepStatus {
    Pending,
    Sound,
    Unsound(NodeId),
}

/// A soundness check split into one narrowing per step, so a caller can
/// yield between nodes.
#[derive(Debug, Clone)]
pub struct SoundnessSweep {
    pending: VecDeque<NodeId>,
}

impl SoundnessSweep {
    pub fn new(graph: &RuleGraph) -> Self {
        Self {
            pending: graph.non_fixed_ids().into(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.pending.len()
    }

    /// Checks the next node of `graph`, which must not change mid-sweep.
    pub fn step(&mut self, graph: &RuleGraph, meter: &StepMeter) -> Result<SweepStatus> {
        let Some(id) = self.pending.pop_front() else {
            return Ok(SweepStatus::Sound);
        };
        if !is_derivable(graph, id, meter)? {
            trace!(target: "narrower", "{:?} is not derivable", id);
            return Ok(SweepStatus::Unsound(id));
        }
        if self.pending.is_empty() {
            Ok(SweepStatus::Sound)
        } else {
            Ok(SweepStatus::Pending)
        }
    }
}

/// The first non-fixed node that does not narrow to its solution column.
pub fn first_unsound_node(graph: &RuleGraph, meter: &StepMeter) -> Result<Option<NodeId>> {
    let mut sweep = SoundnessSweep::new(graph);
    loop {
        match sweep.step(graph, meter)? {
            SweepStatus::Pending => (),
            SweepStatus::Sound => return Ok(None),
            SweepStatus::Unsound(id) => return Ok(Some(id)),
        }
    }
}

pub fn is_sound(graph: &RuleGraph, meter: &StepMeter) -> Result<bool> {
    Ok(first_unsound_node(graph, meter)?.is_none())
}
