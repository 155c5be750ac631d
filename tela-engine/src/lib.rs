//! Incremental page compilation: isolated page modules, immutable compiled
//! snapshots, and the watch/recompile/hot-swap loop.

pub mod compiled;
pub mod engine;
pub mod error;
pub mod module;
pub mod pipeline;
pub mod plan;
pub mod provider;
pub mod snapshot;
pub mod watch;

pub use compiled::{CompiledPage, DependencyTimes};
pub use engine::{BatchReport, Engine, EngineConfig, WorkItem};
pub use error::EngineError;
pub use module::{ModuleError, PageModule};
pub use pipeline::{
    CompilerConfig, PageCompiler, RetryPolicy, TelaCompiler, route_from_path, route_slug,
};
pub use plan::{BatchPlan, plan_batch};
pub use provider::{DiskProvider, MemoryProvider, SourceEntry, SourceProvider};
pub use snapshot::{PagesSnapshot, SharedPages};
