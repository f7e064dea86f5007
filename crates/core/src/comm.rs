//! Command dispatch: frame a request, exchange it, decode the response.

use crate::decode::{decode, DecodeSpec, Decoded};
use crate::error::{Error, Result};
use crate::protocol::{cmd, Frame, MAX_ARGS};
use crate::transport::HidTransport;
use std::time::Duration;
use tracing::trace;

/// How long to wait for a response report before giving up.
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_millis(1000);

/// Owns a transport and issues one command at a time.
///
/// Every method takes `&mut self`: a command cannot be issued while
/// another is still waiting for its response.
pub struct Dispatcher<T: HidTransport> {
    transport: T,
    timeout: Duration,
}

impl<T: HidTransport> Dispatcher<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            timeout: DEFAULT_RESPONSE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_inner(self) -> T {
        self.transport
    }

    /// Send `command` with `args` and decode the single response per `spec`.
    ///
    /// Fails with `ArgsTooLarge` before touching the device if `args`
    /// exceeds one frame.
    pub fn send(&mut self, command: u8, args: &[u8], spec: &DecodeSpec) -> Result<Decoded> {
        let frame = Frame::new(command, args)?;
        trace!(
            cmd = cmd::name(command),
            report_hex = format_args!("{:02X?}", frame.as_bytes()),
            "VIA TX"
        );

        let raw = self.transport.send_report(&frame, self.timeout)?;
        trace!(report_hex = format_args!("{:02X?}", raw), "VIA RX");

        decode(&raw, spec)
    }

    /// Send a Vial subcommand behind the Vial prefix.
    pub fn send_vial(&mut self, subcmd: u8, args: &[u8], spec: &DecodeSpec) -> Result<Decoded> {
        if args.len() + 1 > MAX_ARGS {
            return Err(Error::ArgsTooLarge {
                len: args.len() + 1,
                max: MAX_ARGS,
            });
        }
        let mut vial_args = Vec::with_capacity(args.len() + 1);
        vial_args.push(subcmd);
        vial_args.extend_from_slice(args);
        self.send(cmd::VIAL_PREFIX, &vial_args, spec)
    }

    /// Send and return the raw response bytes.
    pub fn send_raw(&mut self, command: u8, args: &[u8]) -> Result<Vec<u8>> {
        self.send(command, args, &DecodeSpec::Raw)
            .map(|d| d.into_bytes().unwrap_or_default())
    }

    /// Send and decode a single scalar (byte, u16 or u32 spec).
    pub fn send_scalar(&mut self, command: u8, args: &[u8], spec: &DecodeSpec) -> Result<u64> {
        let decoded = self.send(command, args, spec)?;
        scalar(decoded)
    }

    /// Vial variant of [`Self::send_scalar`].
    pub fn send_vial_scalar(&mut self, subcmd: u8, args: &[u8], spec: &DecodeSpec) -> Result<u64> {
        let decoded = self.send_vial(subcmd, args, spec)?;
        scalar(decoded)
    }

    /// Vial subcommand decoded with an unpack format.
    pub fn send_vial_fields(&mut self, subcmd: u8, args: &[u8], format: &str) -> Result<Vec<u64>> {
        let spec = DecodeSpec::unpack(format)?;
        let decoded = self.send_vial(subcmd, args, &spec)?;
        decoded
            .into_fields()
            .ok_or_else(|| Error::Protocol("unpack produced no fields".into()))
    }
}

fn scalar(decoded: Decoded) -> Result<u64> {
    decoded
        .as_u64()
        .ok_or_else(|| Error::Protocol(format!("expected a scalar response, got {decoded:?}")))
}
