/// How a search is told to stop.
#[derive(PartialEq, Eq, Clone, Copy, Debug, Default)]
pub enum SearchLimit {
    /// Runs until the stop flag is raised.
    #[default]
    Infinite,
    /// Completes the given iteration depth, then stops.
    Depth(i32),
    /// Stops once this many nodes have been visited.
    Nodes(u64),
    /// Stops after this many milliseconds.
    Time(u64),
}

impl SearchLimit {
    /// Turns protocol clock information into a move-time budget: a slice of
    /// the remaining clock plus the increment, less a safety overhead.
    pub fn from_clock(our_clock: u64, our_inc: u64, moves_to_go: Option<u64>) -> Self {
        const MOVE_OVERHEAD: u64 = 30;
        let window = our_clock / moves_to_go.unwrap_or(30).max(1) + our_inc;
        let window = window.saturating_sub(MOVE_OVERHEAD).clamp(1, our_clock.max(1));
        Self::Time(window)
    }
}

mod tests {
    #[test]
    fn clock_windows_stay_within_the_clock() {
        use super::SearchLimit;
        let SearchLimit::Time(window) = SearchLimit::from_clock(1000, 0, None) else {
            panic!("expected a time limit");
        };
        assert!(window <= 1000);
        assert!(window >= 1);

        // nearly flagged: still leaves a positive window.
        let SearchLimit::Time(window) = SearchLimit::from_clock(10, 0, None) else {
            panic!("expected a time limit");
        };
        assert_eq!(window, 1);

        // dividing by moves-to-go spends more per move.
        let SearchLimit::Time(fast) = SearchLimit::from_clock(60_000, 0, None) else {
            panic!();
        };
        let SearchLimit::Time(slow) = SearchLimit::from_clock(60_000, 0, Some(5)) else {
            panic!();
        };
        assert!(slow > fast);
    }
}
