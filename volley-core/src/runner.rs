mod context;
mod run;
mod scenario;

pub use context::RunContext;
pub use run::run_local;
pub use scenario::{
    InvocationContext, InvokeFuture, Outcome, Scenario, ScenarioFactory, ScenarioRegistry,
    TestCase,
};
