//! SSRF-safe HTTP tool executor (§4.10). No pack example implements
//! dial-time IP filtering — the closest analogue (a web-fetch tool in one of
//! the secondary example repos) performs no SSRF protection at all. Built
//! net-new against `reqwest`'s `dns::Resolve` trait: every hostname is
//! resolved up front and any candidate address in a private/loopback/
//! link-local range is rejected before the connection is ever dialed, so a
//! DNS-rebinding attacker can't swap in a private address after the check.

use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use super::executor::{ToolError, ToolExecutor, ToolResult};
use super::ToolCall;

const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

fn is_forbidden(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_forbidden_v4(v4),
        IpAddr::V6(v6) => is_forbidden_v6(v6),
    }
}

fn is_forbidden_v4(ip: Ipv4Addr) -> bool {
    ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local()
        || ip.is_broadcast()
        || ip.is_documentation()
        || ip.is_unspecified()
        || ip.octets()[0] == 169 && ip.octets()[1] == 254 // link-local, redundant with is_link_local but explicit
}

fn is_forbidden_v6(ip: Ipv6Addr) -> bool {
    ip.is_loopback() || ip.is_unspecified() || ip.is_unique_local() || (ip.segments()[0] & 0xffc0) == 0xfe80
}

/// A `reqwest::dns::Resolve` implementation that resolves via the system
/// resolver, then rejects the whole lookup if any candidate address falls in
/// a private/loopback/link-local range.
#[derive(Debug, Clone, Default)]
struct SsrfSafeResolver;

impl Resolve for SsrfSafeResolver {
    fn resolve(&self, name: Name) -> Resolving {
        Box::pin(async move {
            let host = name.as_str().to_string();
            let lookup = tokio::net::lookup_host((host.as_str(), 0))
                .await
                .map_err(|e| -> Box<dyn std::error::Error + Send + Sync> { Box::new(e) })?;
            let addrs: Vec<SocketAddr> = lookup.collect();
            if addrs.is_empty() {
                return Err(format!("no addresses resolved for {host}").into());
            }
            if addrs.iter().any(|a| is_forbidden(a.ip())) {
                return Err(format!("{host} resolves to a forbidden address range").into());
            }
            let boxed: Addrs = Box::new(addrs.into_iter());
            Ok(boxed)
        })
    }
}

#[derive(Debug, Deserialize)]
struct HttpCallArgs {
    method: Option<String>,
    url: String,
    #[serde(default)]
    headers: BTreeMap<String, String>,
    body: Option<Value>,
}

pub struct HttpToolExecutor {
    client: Client,
}

impl HttpToolExecutor {
    pub fn new() -> Result<Self, ToolError> {
        let client = Client::builder()
            .dns_resolver(Arc::new(SsrfSafeResolver))
            .build()
            .map_err(|e| ToolError::Other(format!("failed to build hardened HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl Default for HttpToolExecutor {
    fn default() -> Self {
        Self::new().expect("reqwest client construction should not fail with no TLS/proxy overrides")
    }
}

#[async_trait]
impl ToolExecutor for HttpToolExecutor {
    async fn execute(&self, call: &ToolCall) -> ToolResult {
        let args: HttpCallArgs = serde_json::from_value(call.arguments.clone()).map_err(|e| ToolError::Other(format!("invalid http tool arguments: {e}")))?;
        let method = args.method.unwrap_or_else(|| "GET".to_string()).to_uppercase();
        let method = reqwest::Method::from_bytes(method.as_bytes()).map_err(|e| ToolError::Other(format!("invalid HTTP method: {e}")))?;

        let mut request = self.client.request(method, args.url.as_str());
        for (key, value) in &args.headers {
            request = request.header(key, value);
        }
        if let Some(body) = &args.body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_connect() || e.to_string().contains("forbidden address range") {
                ToolError::SsrfBlocked { host: args.url.clone() }
            } else {
                ToolError::Other(format!("http request failed: {e}"))
            }
        })?;

        let mut body = Vec::new();
        let mut truncated = false;
        let mut stream = response;
        loop {
            match stream.chunk().await {
                Ok(Some(chunk)) => {
                    if body.len() + chunk.len() > MAX_BODY_BYTES {
                        let remaining = MAX_BODY_BYTES - body.len();
                        body.extend_from_slice(&chunk[..remaining]);
                        truncated = true;
                        break;
                    }
                    body.extend_from_slice(&chunk);
                }
                Ok(None) => break,
                Err(e) => return Err(ToolError::Other(format!("error reading response body: {e}"))),
            }
        }

        let mut text = String::from_utf8_lossy(&body).to_string();
        if truncated {
            text.push_str(&format!("\n[truncated: response exceeded {MAX_BODY_BYTES} bytes]"));
        }
        Ok(text)
    }
}
