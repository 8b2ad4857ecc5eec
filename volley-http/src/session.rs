use std::sync::Arc;

use tracing::debug;
use volley_core::{Hit, InvocationContext, Reporter, RunStatus};

use super::{HttpClient, Request, Response, Result};

/// An [`HttpClient`] bound to one scenario invocation.
///
/// Each exchange is bracketed by `socket_open`/`socket_close`, so the sink's socket gauge counts
/// requests in flight. A completed exchange is recorded as a hit plus a `socket_message` carrying
/// the bytes received. Transport failures are returned to the caller and leave no hit behind.
pub struct Session {
    client: HttpClient,
    reporter: Arc<dyn Reporter>,
    status: RunStatus,
    worker_id: Option<Arc<str>>,
}

impl Session {
    pub fn new(client: HttpClient, reporter: Arc<dyn Reporter>, ctx: &InvocationContext) -> Self {
        Self {
            client,
            reporter,
            status: ctx.status,
            worker_id: ctx.worker_id.clone(),
        }
    }

    pub async fn send(&self, req: Request) -> Result<Response> {
        let url = req.url.clone();
        let method = req.method.to_string();

        let worker_id = self.worker_id.as_deref();
        self.reporter.socket_open(self.status, worker_id);
        let res = self.client.send(req).await;
        let res = match res {
            Ok(res) => res,
            Err(err) => {
                self.reporter.socket_close(self.status, worker_id);
                return Err(err);
            }
        };
        debug!(%url, %method, status = res.status, elapsed = ?res.elapsed, "hit");

        self.reporter.add_hit(Hit {
            url,
            method,
            http_status: res.status,
            started: res.started,
            elapsed: res.elapsed,
            status: self.status,
            worker_id: worker_id.map(str::to_string),
        });
        self.reporter
            .socket_message(self.status, res.bytes_received, worker_id);
        self.reporter.socket_close(self.status, worker_id);
        Ok(res)
    }

    pub async fn get(&self, url: &str) -> Result<Response> {
        self.send(Request::get(url)).await
    }
}
