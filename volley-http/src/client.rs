use std::time::{Duration, Instant, SystemTime};

use bytes::Bytes;
use http_body_util::{BodyExt as _, Full};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;

use super::estimate::response_head_bytes;
use super::{Error, Request, Response, Result};

/// Pooled HTTP/1.1 client over plain TCP or rustls.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
}

impl Default for HttpClient {
    fn default() -> Self {
        // Unreachable hosts otherwise wait for the OS connect timeout.
        Self::new(Some(Duration::from_secs(3)))
    }
}

impl HttpClient {
    #[must_use]
    pub fn new(connect_timeout: Option<Duration>) -> Self {
        let mut http = HttpConnector::new();
        http.enforce_http(false);
        http.set_connect_timeout(connect_timeout);
        http.set_nodelay(true);

        let https = HttpsConnectorBuilder::new()
            .with_webpki_roots()
            .https_or_http()
            .enable_http1()
            .wrap_connector(http);

        Self {
            inner: Client::builder(TokioExecutor::new()).build(https),
        }
    }

    pub async fn send(&self, req: Request) -> Result<Response> {
        let parsed = url::Url::parse(&req.url).map_err(|_| Error::InvalidUrl(req.url.clone()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::UnsupportedScheme(req.url));
        }
        let uri: hyper::Uri = req
            .url
            .parse()
            .map_err(|_| Error::InvalidUrl(req.url.clone()))?;

        let mut builder = hyper::Request::builder().method(req.method).uri(uri);
        for (name, value) in &req.headers {
            builder = builder.header(
                http::header::HeaderName::from_bytes(name.as_bytes())?,
                http::header::HeaderValue::from_str(value)?,
            );
        }
        let request = builder.body(Full::new(req.body))?;

        let started = SystemTime::now();
        let clock = Instant::now();
        let exchange = async {
            let res = self.inner.request(request).await?;
            let (parts, body) = res.into_parts();
            let body = body.collect().await?.to_bytes();
            Ok::<_, Error>((parts, body))
        };
        let (parts, body) = match req.timeout {
            Some(timeout) => tokio::time::timeout(timeout, exchange)
                .await
                .map_err(|_| Error::Timeout(timeout))??,
            None => exchange.await?,
        };
        let elapsed = clock.elapsed();

        let bytes_received = response_head_bytes(parts.version, parts.status, &parts.headers)
            .saturating_add(body.len() as u64);

        Ok(Response {
            status: parts.status.as_u16(),
            body,
            headers: parts.headers,
            started,
            elapsed,
            bytes_received,
        })
    }

    pub async fn get(&self, url: &str) -> Result<Response> {
        self.send(Request::get(url)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[tokio::test]
    async fn unreachable_host_fails_fast() {
        let client = HttpClient::new(Some(Duration::from_millis(200)));

        let started = Instant::now();
        let res = client.get("http://192.0.2.1:81/").await;
        let elapsed = started.elapsed();

        assert!(res.is_err());
        assert!(
            elapsed < Duration::from_secs(2),
            "expected fast failure, elapsed={elapsed:?}"
        );
    }

    #[tokio::test]
    async fn rejects_non_http_urls() {
        let client = HttpClient::default();
        let err = match client.get("ftp://example.com/").await {
            Ok(_) => panic!("ftp must be rejected"),
            Err(err) => err,
        };
        assert_eq!(err.kind(), ErrorKind::UnsupportedScheme);

        let err = match client.get("not a url").await {
            Ok(_) => panic!("garbage must be rejected"),
            Err(err) => err,
        };
        assert_eq!(err.kind(), ErrorKind::InvalidUrl);
    }
}
