//! ---
//! fls_section: "06-trusted-time"
//! fls_subsection: "module"
//! fls_type: "source"
//! fls_scope: "code"
//! fls_description: "SNTP packet codec and failover client."
//! fls_version: "v0.0.0-prealpha"
//! fls_owner: "tbd"
//! ---
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use fls_common::config::TimeConfig;
use tokio::net::{lookup_host, UdpSocket};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::error::SntpError;
use crate::packet::{client_request, parse_transmit_time};

/// Standard NTP port.
pub const DEFAULT_PORT: u16 = 123;
/// Upper bound for each resolve, connect, send, and receive step.
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_millis(500);

const RECEIVE_BUFFER: usize = 512;

/// Queries an ordered list of time servers, moving to the next host on any
/// failure.
#[derive(Debug, Clone)]
pub struct SntpClient {
    hosts: Vec<String>,
    port: u16,
    attempt_timeout: Duration,
}

impl SntpClient {
    pub fn new<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            hosts: hosts.into_iter().map(Into::into).collect(),
            port: DEFAULT_PORT,
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
        }
    }

    pub fn from_config(config: &TimeConfig) -> Self {
        Self::new(config.ntp_hosts.iter().cloned())
            .with_port(config.port)
            .with_attempt_timeout(config.attempt_timeout)
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_attempt_timeout(mut self, attempt_timeout: Duration) -> Self {
        self.attempt_timeout = attempt_timeout;
        self
    }

    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    /// Try each host once, in order. `None` once the list is exhausted.
    pub async fn get_date(&self) -> Option<DateTime<Utc>> {
        for (index, host) in self.hosts.iter().enumerate() {
            match self.query_host(host).await {
                Ok(instant) => {
                    debug!(host = %host, index, %instant, "trusted time received");
                    return Some(instant);
                }
                Err(err) => warn!(host = %host, index, error = %err, "time server attempt failed"),
            }
        }
        None
    }

    /// Run [`SntpClient::get_date`] in the background and report through
    /// exactly one of the two callbacks.
    ///
    /// Must be called from within a tokio runtime.
    pub fn begin_get_date<S, F>(&self, on_success: S, on_failure: F) -> JoinHandle<()>
    where
        S: FnOnce(DateTime<Utc>) + Send + 'static,
        F: FnOnce() + Send + 'static,
    {
        let client = self.clone();
        tokio::spawn(async move {
            match client.get_date().await {
                Some(instant) => on_success(instant),
                None => on_failure(),
            }
        })
    }

    /// One resolve/send/receive round trip against `host`.
    pub async fn query_host(&self, host: &str) -> Result<DateTime<Utc>, SntpError> {
        let address = self
            .step("resolve", lookup_host((host, self.port)))
            .await?
            .map_err(|source| SntpError::Resolve {
                host: host.to_owned(),
                source,
            })?
            .next()
            .ok_or_else(|| SntpError::NoAddress(host.to_owned()))?;

        let socket = self.step("bind", UdpSocket::bind(unspecified_for(address))).await??;
        self.step("connect", socket.connect(address)).await??;
        self.step("send", socket.send(&client_request())).await??;

        let mut buffer = [0u8; RECEIVE_BUFFER];
        let received = self.step("receive", socket.recv(&mut buffer)).await??;
        parse_transmit_time(&buffer[..received])
    }

    async fn step<F: Future>(&self, stage: &'static str, future: F) -> Result<F::Output, SntpError> {
        timeout(self.attempt_timeout, future)
            .await
            .map_err(|_| SntpError::Timeout(stage))
    }
}

fn unspecified_for(address: SocketAddr) -> SocketAddr {
    match address {
        SocketAddr::V4(_) => SocketAddr::from(([0, 0, 0, 0], 0)),
        SocketAddr::V6(_) => SocketAddr::from(([0u16; 8], 0)),
    }
}
