// Plan module
// Song blueprint data model and the acceptance rules applied to backend plans

pub mod models;
pub mod revision;

pub use models::{Clef, InstrumentSpec, InstrumentStatus, Plan, SongInfo, SongSection, Track};
pub use revision::{accept_plan, carry_forward, validate_track, PlanError};
