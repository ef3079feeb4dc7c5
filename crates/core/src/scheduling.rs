//! Job and task state machines.
//!
//! Status IDs match the 1-based seed data of the `job_statuses` and
//! `task_statuses` lookup tables. The machines are duplicated here rather
//! than importing the `db` enums because `core` has zero internal deps.

/// Transitions for the `jobs` table.
///
/// Pending=1, Running=2, Completed=3, Failed=4, Cancelled=5.
/// Terminal states return an empty slice.
pub mod job_state {
    /// Valid target status IDs reachable from `from_status`.
    pub fn valid_transitions(from_status: i16) -> &'static [i16] {
        match from_status {
            // Pending -> Running, Cancelled
            1 => &[2, 5],
            // Running -> Completed, Failed, Cancelled
            2 => &[3, 4, 5],
            // Terminal: Completed, Failed, Cancelled
            3 | 4 | 5 => &[],
            _ => &[],
        }
    }

    /// Check whether a transition from `from` to `to` is valid.
    pub fn can_transition(from: i16, to: i16) -> bool {
        valid_transitions(from).contains(&to)
    }
}

/// Transitions for the `tasks` table.
///
/// Pending=1, Running=2, Completed=3, Failed=4. A retry resets a running
/// task back to pending; terminal states are sinks.
pub mod task_state {
    /// Valid target status IDs reachable from `from_status`.
    pub fn valid_transitions(from_status: i16) -> &'static [i16] {
        match from_status {
            // Pending -> Running, Failed (cancelled before starting)
            1 => &[2, 4],
            // Running -> Pending (retry), Completed, Failed
            2 => &[1, 3, 4],
            // Terminal: Completed, Failed
            3 | 4 => &[],
            _ => &[],
        }
    }

    /// Check whether a transition from `from` to `to` is valid.
    pub fn can_transition(from: i16, to: i16) -> bool {
        valid_transitions(from).contains(&to)
    }
}
