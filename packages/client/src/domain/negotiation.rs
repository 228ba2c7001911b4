//! Bookkeeping for setup messages seen while negotiating.
//!
//! Every poll returns the whole filtered log, so the same answer and
//! candidates show up again and again. Candidates are applied once each, and
//! those that arrive before the remote description are held back until it is
//! applied.

use std::{collections::HashSet, hash::Hash};

/// What to do with a candidate read from the relay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateAction {
    Apply,
    /// Remote description not applied yet
    Buffer,
    Duplicate,
}

#[derive(Debug, Clone)]
pub struct CandidateLedger<C> {
    seen: HashSet<C>,
    pending: Vec<C>,
    remote_ready: bool,
}

impl<C> Default for CandidateLedger<C> {
    fn default() -> Self {
        Self {
            seen: HashSet::new(),
            pending: Vec::new(),
            remote_ready: false,
        }
    }
}

impl<C: Clone + Eq + Hash> CandidateLedger<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `candidate` and decide whether it can be applied now
    pub fn accept(&mut self, candidate: C) -> CandidateAction {
        if !self.seen.insert(candidate.clone()) {
            return CandidateAction::Duplicate;
        }
        if self.remote_ready {
            CandidateAction::Apply
        } else {
            self.pending.push(candidate);
            CandidateAction::Buffer
        }
    }

    /// Mark the remote description as applied and hand back the buffered
    /// candidates in arrival order
    pub fn remote_applied(&mut self) -> Vec<C> {
        self.remote_ready = true;
        std::mem::take(&mut self.pending)
    }

    pub fn is_remote_ready(&self) -> bool {
        self.remote_ready
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Forget everything (full teardown)
    pub fn reset(&mut self) {
        self.seen.clear();
        self.pending.clear();
        self.remote_ready = false;
    }
}
