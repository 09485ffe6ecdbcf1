//! Tool descriptors, registry, validation, and command rendering

pub mod catalog;
pub mod command;
pub mod descriptor;
pub mod registry;
pub mod validate;

pub use catalog::builtin_tools;
pub use command::{build_invocation, invocation_timeout, ArtifactPaths, Invocation};
pub use descriptor::{OptionSpec, OptionType, OptionValue, ToolCategory, ToolConfig, ToolDescriptor};
pub use registry::{ExecProber, ProbeStatus, Prober, ToolRegistry};
pub use validate::validate;
