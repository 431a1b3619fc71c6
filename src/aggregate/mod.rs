pub mod evolution;
pub mod laps;
pub mod pitstops;
pub mod results;
pub mod standings;
#[cfg(test)]
pub(crate) mod test_support;

pub use evolution::build_evolution;
pub use laps::build_lap_report;
pub use pitstops::{merge_events, PitStopResources};
pub use results::{qualifying_results, session_results};
pub use standings::current_standings;
