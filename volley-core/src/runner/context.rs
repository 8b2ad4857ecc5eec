use std::sync::Arc;

use crate::error::Result;
use crate::sink::{Observer, ResultSink};
use crate::stream::ResultStream;

/// Everything one run owns: the sink, the active stream and the worker identity.
pub struct RunContext {
    sink: Arc<ResultSink>,
    stream: Arc<dyn ResultStream>,
    worker_id: Option<Arc<str>>,
}

impl RunContext {
    /// The stream becomes the sink's first observer.
    pub fn new(stream: Arc<dyn ResultStream>, worker_id: Option<String>) -> Self {
        let sink = Arc::new(ResultSink::new());
        sink.add_observer(stream.clone() as Arc<dyn Observer>);
        Self {
            sink,
            stream,
            worker_id: worker_id.map(Arc::from),
        }
    }

    pub fn sink(&self) -> &Arc<ResultSink> {
        &self.sink
    }

    pub fn stream(&self) -> &Arc<dyn ResultStream> {
        &self.stream
    }

    pub fn worker_id(&self) -> Option<&str> {
        self.worker_id.as_deref()
    }

    pub(crate) fn shared_worker_id(&self) -> Option<Arc<str>> {
        self.worker_id.clone()
    }

    pub async fn close(&self) -> Result<()> {
        self.stream.close().await
    }
}

impl std::fmt::Debug for RunContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunContext")
            .field("stream", &self.stream.name())
            .field("worker_id", &self.worker_id)
            .finish()
    }
}
