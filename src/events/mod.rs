pub mod assemble;
pub mod cluster;
pub mod criteria;
pub mod event;
pub mod search;

pub use cluster::EventSpan;
pub use criteria::{default_battery, CandidateSet, CriteriaContext, Criterion};
pub use event::{Event, EventKind};
pub use search::{search, SearchOutcome};
