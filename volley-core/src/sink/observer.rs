use super::event::ResultEvent;

pub type ObserverError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Receives every mutating sink event, after the sink committed it.
///
/// Observers run while the sink holds its lock; they must not call back into the sink.
pub trait Observer: Send + Sync {
    fn push(&self, event: &ResultEvent) -> Result<(), ObserverError>;
}

impl<F> Observer for F
where
    F: Fn(&ResultEvent) -> Result<(), ObserverError> + Send + Sync,
{
    fn push(&self, event: &ResultEvent) -> Result<(), ObserverError> {
        (self)(event)
    }
}
