//! HTTP snapshot endpoint client
//!
//! `GET <quote_url>?symbol=<SYM>&token=<KEY>` returning a JSON object whose
//! `c` field holds the current price. Other fields are ignored.

use super::{BootstrapError, QuoteSource};
use crate::config::ApiConfig;
use crate::feed::price_from_value;
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde_json::Value;
use std::time::Duration;

/// Quote source backed by the REST snapshot endpoint
pub struct HttpQuoteSource {
    client: Client,
    url: String,
    token: String,
}

impl HttpQuoteSource {
    /// Create a client; `timeout` of None waits on each request indefinitely
    pub fn new(
        url: impl Into<String>,
        token: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, BootstrapError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| BootstrapError::Client(e.to_string()))?;

        Ok(Self {
            client,
            url: url.into(),
            token: token.into(),
        })
    }

    pub fn from_config(config: &ApiConfig) -> Result<Self, BootstrapError> {
        Self::new(
            config.quote_url.clone(),
            config.token.clone(),
            config.request_timeout(),
        )
    }
}

#[async_trait]
impl QuoteSource for HttpQuoteSource {
    async fn fetch_price(&self, symbol: &str) -> Result<Decimal, BootstrapError> {
        tracing::debug!(symbol = %symbol, "Requesting quote snapshot");

        let response = self
            .client
            .get(&self.url)
            .query(&[("symbol", symbol), ("token", self.token.as_str())])
            .send()
            .await
            .map_err(request_error)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(BootstrapError::Status { status, body });
        }

        let body = response.bytes().await.map_err(request_error)?;

        parse_quote_body(&body)
    }
}

/// The request URL carries the token, so it is stripped from the error
fn request_error(e: reqwest::Error) -> BootstrapError {
    BootstrapError::Request(e.without_url().to_string())
}

/// Extract the current price from a snapshot response body
pub(crate) fn parse_quote_body(body: &[u8]) -> Result<Decimal, BootstrapError> {
    let value: Value =
        serde_json::from_slice(body).map_err(|e| BootstrapError::Decode(e.to_string()))?;

    match value.get("c") {
        None | Some(Value::Null) => Err(BootstrapError::MissingPrice),
        Some(raw) => price_from_value(raw).ok_or_else(|| BootstrapError::InvalidPrice(raw.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP response and hand back the request line
    async fn serve_once(status: &'static str, body: &'static str) -> (String, tokio::sync::oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = tokio::sync::oneshot::channel();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let request = String::from_utf8_lossy(&request).to_string();
            let _ = tx.send(request.lines().next().unwrap_or_default().to_string());

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        });

        (format!("http://{}/api/v1/quote", addr), rx)
    }

    #[test]
    fn test_parse_quote_body() {
        let body = br#"{"c":261.74,"d":-2.1,"dp":-0.8,"h":263.3,"l":260.68,"o":261.07,"pc":263.84,"t":1700000000}"#;
        assert_eq!(parse_quote_body(body).unwrap(), dec!(261.74));
    }

    #[test]
    fn test_parse_quote_body_integer_price() {
        assert_eq!(parse_quote_body(br#"{"c":100}"#).unwrap(), dec!(100));
    }

    #[test]
    fn test_parse_quote_body_missing_price() {
        assert!(matches!(
            parse_quote_body(br#"{"d":1.0}"#),
            Err(BootstrapError::MissingPrice)
        ));
        assert!(matches!(
            parse_quote_body(br#"{"c":null}"#),
            Err(BootstrapError::MissingPrice)
        ));
    }

    #[test]
    fn test_parse_quote_body_non_numeric_price() {
        assert!(matches!(
            parse_quote_body(br#"{"c":"abc"}"#),
            Err(BootstrapError::InvalidPrice(_))
        ));
    }

    #[test]
    fn test_parse_quote_body_malformed() {
        assert!(matches!(
            parse_quote_body(b"<html>"),
            Err(BootstrapError::Decode(_))
        ));
        assert!(matches!(
            parse_quote_body(b"[1,2]"),
            Err(BootstrapError::MissingPrice)
        ));
    }

    #[tokio::test]
    async fn test_fetch_price_sends_symbol_and_token() {
        let (url, request_line) = serve_once("200 OK", r#"{"c":64000.5}"#).await;
        let source = HttpQuoteSource::new(url, "secret", Some(Duration::from_secs(5))).unwrap();

        let price = source.fetch_price("BINANCE:BTCUSDT").await.unwrap();
        assert_eq!(price, dec!(64000.5));

        let line = request_line.await.unwrap();
        assert!(line.starts_with("GET /api/v1/quote?"), "{}", line);
        assert!(line.contains("symbol=BINANCE%3ABTCUSDT"), "{}", line);
        assert!(line.contains("token=secret"), "{}", line);
    }

    #[tokio::test]
    async fn test_transport_error_hides_token() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let source = HttpQuoteSource::new(
            format!("http://{}/api/v1/quote", addr),
            "SUPERSECRET",
            Some(Duration::from_secs(5)),
        )
        .unwrap();

        let err = source.fetch_price("AAPL").await.unwrap_err();
        assert!(matches!(err, BootstrapError::Request(_)));
        assert!(!err.to_string().contains("SUPERSECRET"), "{}", err);
    }

    #[tokio::test]
    async fn test_fetch_price_non_success_status() {
        let (url, _) = serve_once("429 Too Many Requests", r#"{"error":"limit"}"#).await;
        let source = HttpQuoteSource::new(url, "secret", Some(Duration::from_secs(5))).unwrap();

        match source.fetch_price("AAPL").await {
            Err(BootstrapError::Status { status, body }) => {
                assert_eq!(status, 429);
                assert!(body.contains("limit"));
            }
            other => panic!("expected status error, got {:?}", other),
        }
    }
}
