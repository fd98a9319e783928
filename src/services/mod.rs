// Schedule generation and reconciliation engine

pub mod metrics_service;
pub mod pipeline;
pub mod prompts;
pub mod reconcile_service;
pub mod schedule_service;
pub mod target_service;

pub use metrics_service::MetricsService;
pub use pipeline::{Trigger, TrainingPipeline};
pub use reconcile_service::ReconcileService;
pub use schedule_service::{force_incomplete, standardize_week, ScheduleService};
pub use target_service::TargetService;
