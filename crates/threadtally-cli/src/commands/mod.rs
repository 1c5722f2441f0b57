pub mod report;
pub mod timezones;

pub use report::{run_report, InputFormat, ReportArgs};
pub use timezones::run_timezones;
