use std::time::Duration;

use parking_lot::Mutex;
use tokio::io::{AsyncWriteExt as _, BufWriter};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use super::{CloseFuture, ResultStream};
use crate::endpoint::Endpoint;
use crate::error::{Error, Result};
use crate::sink::{Observer, ObserverError, ResultEvent};

/// Pushes every event as one JSON line to a coordinator.
///
/// Serialization happens in `push`, so a line is queued in commit order; a writer task owns the
/// socket.
pub struct RemoteStream {
    endpoint: Endpoint,
    tx: Mutex<Option<mpsc::UnboundedSender<String>>>,
    writer: Mutex<Option<JoinHandle<Result<()>>>>,
}

impl RemoteStream {
    pub async fn connect(endpoint: &Endpoint, timeout: Duration) -> Result<Self> {
        let connect_err = |source| Error::Connect {
            endpoint: endpoint.to_string(),
            source,
        };

        let socket = match tokio::time::timeout(timeout, TcpStream::connect(endpoint.authority()))
            .await
        {
            Ok(res) => res.map_err(connect_err)?,
            Err(_) => {
                return Err(connect_err(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    format!("no connection after {timeout:?}"),
                )));
            }
        };
        socket.set_nodelay(true)?;
        debug!(%endpoint, "remote stream connected");

        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        let writer = tokio::spawn(async move {
            let mut out = BufWriter::new(socket);
            while let Some(line) = rx.recv().await {
                out.write_all(line.as_bytes()).await?;
                // Drain what is already queued before paying for a flush.
                while let Ok(line) = rx.try_recv() {
                    out.write_all(line.as_bytes()).await?;
                }
                out.flush().await?;
            }
            out.shutdown().await?;
            Ok(())
        });

        Ok(Self {
            endpoint: endpoint.clone(),
            tx: Mutex::new(Some(tx)),
            writer: Mutex::new(Some(writer)),
        })
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }
}

impl Observer for RemoteStream {
    fn push(&self, event: &ResultEvent) -> std::result::Result<(), ObserverError> {
        let line = event.to_json_line()?;
        let tx = self.tx.lock();
        let Some(tx) = tx.as_ref() else {
            return Err("remote stream already closed".into());
        };
        tx.send(line)
            .map_err(|_| format!("connection to {} is gone", self.endpoint))?;
        Ok(())
    }
}

impl ResultStream for RemoteStream {
    fn name(&self) -> &'static str {
        "remote"
    }

    fn close(&self) -> CloseFuture<'_> {
        Box::pin(async move {
            // Dropping the sender ends the writer loop once the queue is drained.
            drop(self.tx.lock().take());
            let writer = self.writer.lock().take();
            if let Some(writer) = writer {
                writer.await??;
            }
            debug!(endpoint = %self.endpoint, "remote stream closed");
            Ok(())
        })
    }
}
