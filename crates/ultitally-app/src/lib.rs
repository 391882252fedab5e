pub mod app;
pub mod clock;
pub mod dashboard;
pub mod protocol;
pub mod save;
pub mod session;
