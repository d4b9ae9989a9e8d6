pub mod container;
pub mod context;
pub mod echo;
pub mod env;
pub mod record;
pub mod registry;

pub use container::{BuildStepContainer, EndpointReference, SELECTABLE_SERVER_NAME};
pub use context::{BufferSink, ExecutionContext, OutputSink, StdoutSink, LOG_PREFIX};
pub use echo::EchoStep;
pub use env::EnvVars;
pub use record::{ContainerRecord, StepRecord, StepConfig};
pub use registry::{BuildStep, BuildStepRegistry};
