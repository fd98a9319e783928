// Collaborator boundary: traits the pipeline depends on, plus the concrete
// Strava / OpenAI-compatible / Postgres / SMTP implementations.

pub mod activity_source;
pub mod generative;
pub mod notifier;
pub mod store;

pub use activity_source::{AccessTokens, ActivitySource, SourceError, StravaSource};
pub use generative::{generate_structured, GenerateError, GenerativeClient, OpenAiClient};
pub use notifier::{EmailNotifier, Notifier, NotifyError};
pub use store::{PostgresStore, StoreError, TrainingStore};
