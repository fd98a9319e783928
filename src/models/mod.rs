// Core data model for schedule generation and reconciliation

pub mod activity;
pub mod day;
pub mod metrics;
pub mod session;
pub mod target;
pub mod user;

pub use activity::*;
pub use day::*;
pub use metrics::*;
pub use session::*;
pub use target::*;
pub use user::*;
