use std::{
    sync::atomic::{AtomicBool, Ordering},
    time::Instant,
};

use crate::timemgmt::SearchLimit;

/// Per-search bookkeeping: the budget, the node counter, the shared stop
/// flag written by the protocol thread, and the interrupt latch that
/// unwinds the recursion once stopping has been decided.
pub struct SearchInfo<'a> {
    pub limit: SearchLimit,
    pub start_time: Instant,
    pub nodes: u64,
    pub stopped: &'a AtomicBool,
    /// Set once the stop predicate trips; every caller of a recursive
    /// search step must test this before trusting the returned score.
    pub interrupted: bool,
}

impl<'a> SearchInfo<'a> {
    /// The clock is only consulted every 2^11 nodes; loading the stop flag
    /// is cheap enough to do at every node.
    const TIME_CHECK_MASK: u64 = 0x7FF;

    pub fn new(stopped: &'a AtomicBool, limit: SearchLimit) -> Self {
        Self {
            limit,
            start_time: Instant::now(),
            nodes: 0,
            stopped,
            interrupted: false,
        }
    }

    pub fn elapsed_millis(&self) -> u64 {
        #![allow(clippy::cast_possible_truncation)]
        self.start_time.elapsed().as_millis() as u64
    }

    /// Tests the stop predicate and latches `interrupted` when it trips.
    pub fn check_up(&mut self) {
        match self.limit {
            SearchLimit::Nodes(max_nodes) if self.nodes >= max_nodes => {
                self.stopped.store(true, Ordering::Relaxed);
            }
            SearchLimit::Time(window) if self.nodes & Self::TIME_CHECK_MASK == 0 => {
                if self.elapsed_millis() >= window {
                    self.stopped.store(true, Ordering::Relaxed);
                }
            }
            _ => {}
        }
        if self.stopped.load(Ordering::Relaxed) {
            self.interrupted = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_budget_trips_the_flag() {
        let stopped = AtomicBool::new(false);
        let mut info = SearchInfo::new(&stopped, SearchLimit::Nodes(100));
        info.nodes = 99;
        info.check_up();
        assert!(!info.interrupted);
        info.nodes = 100;
        info.check_up();
        assert!(info.interrupted);
        assert!(stopped.load(Ordering::Relaxed));
    }

    #[test]
    fn external_stop_is_latched() {
        let stopped = AtomicBool::new(false);
        let mut info = SearchInfo::new(&stopped, SearchLimit::Infinite);
        info.check_up();
        assert!(!info.interrupted);
        stopped.store(true, Ordering::Relaxed);
        info.check_up();
        assert!(info.interrupted);
    }

    #[test]
    fn expired_time_window_trips_the_flag() {
        let stopped = AtomicBool::new(false);
        let mut info = SearchInfo::new(&stopped, SearchLimit::Time(0));
        // node count of zero passes the gating mask.
        info.check_up();
        assert!(info.interrupted);
    }
}
