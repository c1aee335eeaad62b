//! Axpert/Voltronic protocol connector
//!
//! Talks the vendor's ASCII request/response protocol over a character
//! device (usually `/dev/hidrawN`). Every exchange is one request frame
//! followed by one reply frame terminated by `\r`, bounded by the
//! configured read deadline. A failed exchange surfaces as a device I/O
//! error and is not retried. After a failure the line is drained before the
//! next request so a late reply cannot be taken for the next answer.

use crate::connector::{Connector, GeneralStatus, ParallelInfo, RatingInfo, Warning, WriteRequest};
use crate::error::{GatewayError, Result};
use crate::logging::{StructuredLogger, get_logger};
use std::any::Any;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;

pub mod codec;
pub mod parse;

/// HID output reports carry at most this many bytes
const HID_REPORT_SIZE: usize = 8;

/// Connector for a single inverter over any byte stream
pub struct AxpertConnector<T = tokio::fs::File> {
    transport: T,
    path: String,
    read_timeout: Duration,
    /// Set when an exchange was abandoned and a reply may still be in flight
    desynced: bool,
    logger: StructuredLogger,
}

impl AxpertConnector<tokio::fs::File> {
    /// Open a device node for exclusive read/write use
    pub async fn open(path: &str, read_timeout: Duration) -> Result<Self> {
        let file = tokio::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .await
            .map_err(|e| GatewayError::device_io(format!("cannot open {}: {}", path, e)))?;
        Ok(Self::new(file, path, read_timeout))
    }
}

impl<T> AxpertConnector<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    pub fn new(transport: T, path: &str, read_timeout: Duration) -> Self {
        Self {
            transport,
            path: path.to_string(),
            read_timeout,
            desynced: false,
            logger: get_logger("axpert"),
        }
    }

    /// Send one command and return the decoded reply payload
    pub async fn query(&mut self, command: &str) -> Result<String> {
        if self.desynced {
            self.resync().await?;
        }
        self.logger
            .trace(&format!("Sending {} to {}", command, self.path));

        match timeout(self.read_timeout, self.exchange(command)).await {
            Ok(Ok(payload)) => {
                self.logger
                    .trace(&format!("{} replied '{}'", command, payload));
                if payload == "NAK" {
                    return Err(GatewayError::device_io(format!(
                        "{} rejected by inverter (NAK)",
                        command
                    )));
                }
                Ok(payload)
            }
            Ok(Err(e)) => {
                self.desynced = true;
                self.logger
                    .debug(&format!("{} on {} failed: {}", command, self.path, e));
                Err(e)
            }
            Err(_) => {
                self.desynced = true;
                let error_msg = format!(
                    "{} on {} timed out after {} ms",
                    command,
                    self.path,
                    self.read_timeout.as_millis()
                );
                self.logger.debug(&error_msg);
                Err(GatewayError::timeout(error_msg))
            }
        }
    }

    async fn exchange(&mut self, command: &str) -> Result<String> {
        let frame = codec::encode_request(command);
        for chunk in frame.chunks(HID_REPORT_SIZE) {
            self.transport.write_all(chunk).await.map_err(io_error)?;
        }
        self.transport.flush().await.map_err(io_error)?;

        let mut reply = Vec::with_capacity(128);
        let mut buf = [0u8; 64];
        loop {
            let n = self.transport.read(&mut buf).await.map_err(io_error)?;
            if n == 0 {
                return Err(GatewayError::device_io("device closed the stream"));
            }
            let mut chunk = &buf[..n];
            if reply.is_empty() {
                // Padding of an earlier HID report, never part of a frame
                let start = chunk.iter().position(|&b| b != 0).unwrap_or(n);
                chunk = &chunk[start..];
            }
            reply.extend_from_slice(chunk);
            // Zero bytes after the terminator are report padding, inside
            // the frame they can be CRC bytes
            if let Some(end) = reply.iter().position(|&b| b == b'\r') {
                reply.truncate(end + 1);
                break;
            }
            if reply.len() > codec::MAX_FRAME_LEN {
                return Err(GatewayError::device_io(format!(
                    "reply exceeds {} bytes without terminator",
                    codec::MAX_FRAME_LEN
                )));
            }
        }
        codec::decode_response(&reply)
    }

    /// Throw away input until the device has been quiet for a full read deadline
    async fn resync(&mut self) -> Result<()> {
        let mut buf = [0u8; 64];
        let mut discarded = 0usize;
        loop {
            match timeout(self.read_timeout, self.transport.read(&mut buf)).await {
                Err(_) => break,
                Ok(Ok(0)) => return Err(GatewayError::device_io("device closed the stream")),
                Ok(Ok(n)) => discarded += n,
                Ok(Err(e)) => return Err(io_error(e)),
            }
            if discarded > 4 * codec::MAX_FRAME_LEN {
                return Err(GatewayError::device_io(format!(
                    "{} keeps sending without being asked",
                    self.path
                )));
            }
        }
        if discarded > 0 {
            self.logger.debug(&format!(
                "Discarded {} stale byte(s) from {}",
                discarded, self.path
            ));
        }
        self.desynced = false;
        Ok(())
    }

    async fn command(&mut self, command: &str) -> Result<()> {
        let payload = self.query(command).await?;
        if payload == "ACK" {
            self.logger.info(&format!("{} acknowledged", command));
            Ok(())
        } else {
            Err(GatewayError::device_io(format!(
                "unexpected reply to {}: '{}'",
                command, payload
            )))
        }
    }
}

fn io_error(e: std::io::Error) -> GatewayError {
    GatewayError::device_io(e.to_string())
}

/// Wire form of a validated write
pub fn write_command(request: WriteRequest) -> String {
    match request {
        WriteRequest::OutputSourcePriority(code) => format!("POP{:02}", code),
        WriteRequest::ChargerSourcePriority(code) => format!("PCP{:02}", code),
        WriteRequest::BatteryRechargeVoltage(v) => format!("PBCV{:04.1}", v),
        WriteRequest::BatteryRedischargeVoltage(v) => format!("PBDV{:04.1}", v),
    }
}

#[async_trait::async_trait]
impl<T> Connector for AxpertConnector<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn describe(&self) -> String {
        self.path.clone()
    }

    async fn serial_number(&mut self) -> Result<String> {
        let payload = self.query("QID").await?;
        parse::parse_serial_number(&payload)
    }

    async fn general_status(&mut self) -> Result<GeneralStatus> {
        let payload = self.query("QPIGS").await?;
        parse::parse_general_status(&payload)
    }

    async fn parallel_info(&mut self, unit: u8) -> Result<ParallelInfo> {
        let payload = self.query(&format!("QPGS{}", unit)).await?;
        parse::parse_parallel_info(&payload)
    }

    async fn rating_info(&mut self) -> Result<RatingInfo> {
        let payload = self.query("QPIRI").await?;
        parse::parse_rating_info(&payload)
    }

    async fn warning_status(&mut self) -> Result<Vec<Warning>> {
        let payload = self.query("QPIWS").await?;
        parse::parse_warnings(&payload)
    }

    async fn device_mode(&mut self) -> Result<char> {
        let payload = self.query("QMOD").await?;
        parse::parse_device_mode(&payload)
    }

    async fn output_mode(&mut self) -> Result<u8> {
        let payload = self.query("QOPM").await?;
        parse::parse_output_mode(&payload)
    }

    async fn write(&mut self, request: WriteRequest) -> Result<()> {
        self.command(&write_command(request)).await
    }
}
