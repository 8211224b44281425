//! Deep research engine: transport, server contract and effect execution.
mod api;
mod effects;
mod orchestrator;
mod settings;
mod transport;
mod types;

pub use api::{parse_status, HttpResearchApi, ResearchApi};
pub use orchestrator::Orchestrator;
pub use reqwest::Method;
pub use settings::{ClientSettings, Endpoints};
pub use transport::{Transport, CSRF_HEADER};
pub use types::{SubmitError, TransportError, TransportErrorKind};
