//! Job progress derivation.

/// Percentage of terminal tasks, rounded to one decimal place.
///
/// Always derived, never stored. A zero-task job reports 0.0.
pub fn progress_percentage(completed_tasks: i32, failed_tasks: i32, total_tasks: i32) -> f64 {
    if total_tasks <= 0 {
        return 0.0;
    }
    let done = (completed_tasks + failed_tasks) as f64;
    (done / total_tasks as f64 * 1000.0).round() / 10.0
}
