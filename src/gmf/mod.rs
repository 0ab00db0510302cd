pub mod search;
pub mod statistics;
pub mod xcorr;

pub use search::{xcorr_echo_search, SearchOptions};
pub use statistics::PulseStatistics;
pub use xcorr::DopplerGrid;
