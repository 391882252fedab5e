// Library root: the domain model, recorder state machine, analytics, and
// persistence layers shared by the app orchestrator and the console binary.

pub mod analytics;
pub mod backend;
pub mod config;
pub mod db;
pub mod model;
pub mod passes;
pub mod picker;
pub mod records;
pub mod recorder;
pub mod roster;
pub mod tally;
