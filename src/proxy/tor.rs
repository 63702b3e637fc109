//! Exit-node rotation through the Tor control protocol

use super::ProxyRotator;
use crate::config::TorControlConfig;
use crate::error::FetchError;
use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

/// Upper bound for one control-port conversation
const CONTROL_TIMEOUT: Duration = Duration::from_secs(10);

/// Requests a fresh Tor circuit (`SIGNAL NEWNYM`) before every fetch
///
/// The fetch itself goes through Tor's SOCKS port, so the rotator yields the
/// configured SOCKS URL once the control port has acknowledged the signal.
pub struct TorRotator {
    config: TorControlConfig,
}

impl TorRotator {
    /// Create a rotator for the given control port
    pub fn new(config: TorControlConfig) -> Self {
        Self { config }
    }

    async fn signal_newnym(&self) -> Result<(), String> {
        let stream = TcpStream::connect(self.config.control_address)
            .await
            .map_err(|e| format!("cannot reach control port: {e}"))?;
        let (read_half, mut write_half) = stream.into_split();
        let mut lines = BufReader::new(read_half).lines();

        let auth = match &self.config.password {
            Some(password) => format!("AUTHENTICATE \"{}\"\r\n", quote(password)),
            None => "AUTHENTICATE\r\n".to_string(),
        };

        for command in [auth.as_str(), "SIGNAL NEWNYM\r\n"] {
            write_half
                .write_all(command.as_bytes())
                .await
                .map_err(|e| format!("control port write failed: {e}"))?;

            let reply = lines
                .next_line()
                .await
                .map_err(|e| format!("control port read failed: {e}"))?
                .ok_or_else(|| "control port closed the connection".to_string())?;

            if !reply.starts_with("250") {
                let verb = command.split_whitespace().next().unwrap_or_default();
                return Err(format!("{verb} rejected: {reply}"));
            }
        }

        // Best effort; the signal has already been accepted
        write_half.write_all(b"QUIT\r\n").await.ok();
        Ok(())
    }
}

/// Escape a value for a Tor control-protocol quoted string
fn quote(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[async_trait]
impl ProxyRotator for TorRotator {
    async fn next_proxy(&self) -> crate::Result<Option<String>> {
        let outcome = tokio::time::timeout(CONTROL_TIMEOUT, self.signal_newnym())
            .await
            .unwrap_or_else(|_| Err("control port did not answer in time".to_string()));

        match outcome {
            Ok(()) => {
                tracing::debug!(control = %self.config.control_address, "requested new Tor circuit");
                Ok(Some(self.config.socks_url.clone()))
            }
            Err(reason) => Err(FetchError::ProxyRotation { reason }.into()),
        }
    }

    fn name(&self) -> &'static str {
        "tor"
    }
}
