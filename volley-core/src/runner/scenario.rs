use std::collections::BTreeMap;
use std::fmt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;

use futures_util::FutureExt as _;

use crate::error::{Error, Result};
use crate::sink::{Reporter, RunStatus};

pub type InvokeFuture<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

/// What a scenario invocation can see about where it runs.
#[derive(Debug, Clone)]
pub struct InvocationContext {
    pub status: RunStatus,
    pub worker_id: Option<Arc<str>>,
}

impl InvocationContext {
    pub fn current_cycle(&self) -> u64 {
        self.status.current_cycle
    }

    pub fn current_user(&self) -> u64 {
        self.status.current_user
    }

    pub fn worker_id(&self) -> Option<&str> {
        self.worker_id.as_deref()
    }
}

/// A unit of load. One call to `invoke` is one invocation and must report exactly one outcome
/// through `reporter`, bracketed by `start_test`/`stop_test`.
pub trait Scenario: Send + Sync {
    fn name(&self) -> &str;

    fn invoke(&self, ctx: InvocationContext, reporter: Arc<dyn Reporter>) -> InvokeFuture<'_>;
}

/// Non-success outcome of a [`TestCase`] body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// An expected condition did not hold.
    Failure(String),
    /// Something unexpected went wrong.
    Error(String),
}

impl Outcome {
    pub fn failure(msg: impl Into<String>) -> Self {
        Self::Failure(msg.into())
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self::Error(msg.into())
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failure(msg) => write!(f, "failure: {msg}"),
            Self::Error(msg) => write!(f, "error: {msg}"),
        }
    }
}

/// Turns an async body into a [`Scenario`] that handles the reporting bracket.
pub struct TestCase<F> {
    name: String,
    body: F,
}

impl<F, Fut> TestCase<F>
where
    F: Fn(InvocationContext, Arc<dyn Reporter>) -> Fut + Send + Sync,
    Fut: Future<Output = std::result::Result<(), Outcome>> + Send,
{
    pub fn new(name: impl Into<String>, body: F) -> Self {
        Self {
            name: name.into(),
            body,
        }
    }
}

impl<F, Fut> Scenario for TestCase<F>
where
    F: Fn(InvocationContext, Arc<dyn Reporter>) -> Fut + Send + Sync,
    Fut: Future<Output = std::result::Result<(), Outcome>> + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn invoke(&self, ctx: InvocationContext, reporter: Arc<dyn Reporter>) -> InvokeFuture<'_> {
        Box::pin(async move {
            let status = ctx.status;
            let worker_id = ctx.worker_id.clone();
            let worker_id = worker_id.as_deref();

            reporter.start_test(&self.name, status, worker_id);
            // A panicking body is one errored invocation, not a dead virtual user.
            let body = AssertUnwindSafe(async { (self.body)(ctx, reporter.clone()).await });
            let outcome = body
                .catch_unwind()
                .await
                .unwrap_or_else(|payload| Err(Outcome::Error(panic_message(payload.as_ref()))));
            match outcome {
                Ok(()) => reporter.add_success(&self.name, status, worker_id),
                Err(Outcome::Failure(msg)) => {
                    reporter.add_failure(&self.name, &msg, status, worker_id)
                }
                Err(Outcome::Error(msg)) => reporter.add_error(&self.name, &msg, status, worker_id),
            }
            reporter.stop_test(&self.name, status, worker_id);
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    let msg = payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic payload");
    format!("panicked: {msg}")
}

pub type ScenarioFactory = Arc<dyn Fn() -> Arc<dyn Scenario> + Send + Sync>;

/// Scenario identifiers mapped to constructors, filled by explicit registration.
#[derive(Clone, Default)]
pub struct ScenarioRegistry {
    factories: BTreeMap<String, ScenarioFactory>,
}

impl ScenarioRegistry {
    pub fn register<F>(&mut self, id: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> Arc<dyn Scenario> + Send + Sync + 'static,
    {
        self.factories.insert(id.into(), Arc::new(factory));
        self
    }

    pub fn resolve(&self, id: &str) -> Result<Arc<dyn Scenario>> {
        self.factories
            .get(id)
            .map(|factory| factory())
            .ok_or_else(|| Error::UnknownScenario(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.factories.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

impl fmt::Debug for ScenarioRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.factories.keys()).finish()
    }
}
