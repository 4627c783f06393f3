mod check;
mod diff;

pub use check::{run_check, CheckArgs};
pub use diff::{run_diff, DiffArgs};
