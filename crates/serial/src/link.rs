use std::io;
use std::pin::Pin;
use std::sync::Arc;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info};

use crate::config::SerialConfig;

type BoxedWriter = Pin<Box<dyn AsyncWrite + Send>>;

#[derive(Debug, thiserror::Error)]
pub enum SerialError {
    #[error("failed to open serial port {port}: {source}")]
    Open {
        port: String,
        #[source]
        source: tokio_serial::Error,
    },
    #[error("serial write failed: {0}")]
    Write(#[from] io::Error),
}

/// Long-lived handle to the serial device.
///
/// Clones share the same underlying port. Writes hold the lock for the whole
/// line, so concurrent callers never interleave bytes. The port is never
/// reopened: after a failure every later write is expected to fail as well.
#[derive(Clone)]
pub struct SerialLink {
    label: Arc<str>,
    writer: Arc<Mutex<BoxedWriter>>,
}

impl std::fmt::Debug for SerialLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialLink").field("label", &self.label).finish()
    }
}

impl SerialLink {
    pub fn open(config: &SerialConfig) -> Result<Self, SerialError> {
        let port = tokio_serial::new(&config.port, config.baud_rate)
            .timeout(config.timeout)
            .open_native_async()
            .map_err(|source| SerialError::Open { port: config.port.clone(), source })?;
        info!(port = %config.port, baud = config.baud_rate, "Serial port opened");
        Ok(Self::with_label(config.port.as_str(), port))
    }

    /// Wraps any async writer, e.g. a pty or an in-memory sink.
    pub fn from_writer<W>(writer: W) -> Self
    where
        W: AsyncWrite + Send + 'static,
    {
        Self::with_label("writer", writer)
    }

    fn with_label<W>(label: &str, writer: W) -> Self
    where
        W: AsyncWrite + Send + 'static,
    {
        let writer: BoxedWriter = Box::pin(writer);
        Self {
            label: Arc::from(label),
            writer: Arc::new(Mutex::new(writer)),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub async fn write_line(&self, line: &str) -> Result<(), SerialError> {
        let mut writer = self.writer.lock().await;
        writer.write_all(line.as_bytes()).await?;
        writer.flush().await?;
        debug!(port = %self.label, bytes = line.len(), "Serial line written");
        Ok(())
    }
}
