//! DISPATCH: Tool-augmented task dispatcher
//!
//! Credential gate → request classifier → task runner → report formatter,
//! composed by [`Dispatcher`] into one pipeline per request.

use thiserror::Error;

pub mod classifier;
pub mod descriptor;
pub mod dispatcher;
pub mod envelope;
pub mod gate;
pub mod invoker;
pub mod providers;
pub mod registry;
pub mod report;
pub mod runner;
pub mod synthesizer;

pub use classifier::{
    Classification, ClassificationFallback, RequestClassifier, RequestKind, RequestSpec, Route,
    RoutingTable, RunPolicy,
};
pub use descriptor::{BindError, Constraint, ParamSpec, ParamType, ProviderDescriptor};
pub use dispatcher::{Dispatcher, Phase};
pub use envelope::{ResultEnvelope, Status};
pub use gate::CredentialGate;
pub use invoker::ProviderInvoker;
pub use providers::{builtin_registry, register_builtin_providers};
pub use registry::{CapabilityProvider, ProviderRegistry, SharedProvider};
pub use report::{Report, ReportFormatter};
pub use runner::TaskRunner;
pub use synthesizer::Synthesizer;

pub use taskwire_config::Credentials;

/// Error type providers return; anything goes, the invoker normalizes it
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Parameter bag passed between classifier, runner and providers
pub type Parameters = serde_json::Map<String, serde_json::Value>;

/// Programmer errors only; provider failures never surface here
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("◆ ROUTE FOR '{kind}' NAMES UNREGISTERED PROVIDER '{provider_id}'")]
    UnknownProvider { kind: String, provider_id: String },

    #[error("◆ ROUTE FOR '{0}' HAS NO CANDIDATES")]
    EmptyRoute(String),

    #[error("◆ NO ROUTE FOR '{0}'")]
    MissingRoute(String),
}

pub type Result<T> = std::result::Result<T, DispatchError>;
