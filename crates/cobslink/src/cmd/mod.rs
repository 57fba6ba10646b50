use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::{ArgGroup, Args, Subcommand};
use cobslink_device::json::message_from_json;
use cobslink_frame::Message;
use cobslink_transport::{LinkStream, SerialConfig, SerialPort, UnixDomainSocket, DEFAULT_BAUD_RATE};
use tracing::info;

use crate::exit::{transport_error, CliError, CliResult, INTERNAL};
use crate::output::OutputFormat;

pub mod decode;
pub mod encode;
pub mod listen;
pub mod mock;
pub mod send;
pub mod version;

const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a mock device that answers commands from a table.
    Mock(MockArgs),
    /// Send one message and optionally wait for the reply.
    Send(SendArgs),
    /// Print every frame received on a link.
    Listen(ListenArgs),
    /// Print the wire frame for a message.
    Encode(EncodeArgs),
    /// Decode frames from hex.
    Decode(DecodeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Mock(args) => mock::run(args),
        Command::Send(args) => send::run(args, format),
        Command::Listen(args) => listen::run(args, format),
        Command::Encode(args) => encode::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("link").required(true).args(["serial", "socket"])))]
pub struct LinkArgs {
    /// Serial device path (e.g. /dev/ttyUSB0).
    #[arg(long, value_name = "DEV")]
    pub serial: Option<PathBuf>,
    /// Unix socket path.
    #[arg(long, value_name = "PATH")]
    pub socket: Option<PathBuf>,
    /// Serial baud rate. Default: 115200.
    #[arg(long, value_name = "N")]
    pub baud: Option<u32>,
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("payload").required(true).args(["text", "json"])))]
pub struct PayloadArgs {
    /// Text message.
    #[arg(long)]
    pub text: Option<String>,
    /// Message given as JSON.
    #[arg(long)]
    pub json: Option<String>,
}

#[derive(Args, Debug)]
pub struct MockArgs {
    #[command(flatten)]
    pub link: LinkArgs,
    /// JSON command table. Default: the built-in bench rig table.
    #[arg(long, value_name = "FILE")]
    pub table: Option<PathBuf>,
    /// Delay before each reply (e.g. 500ms, 0).
    #[arg(long, default_value = "500ms")]
    pub response_delay: String,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    #[command(flatten)]
    pub link: LinkArgs,
    #[command(flatten)]
    pub payload: PayloadArgs,
    /// Wait for one reply and print it.
    #[arg(long)]
    pub wait: bool,
    /// Maximum time to wait for the reply when --wait is set (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub wait_timeout: String,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    #[command(flatten)]
    pub link: LinkArgs,
    /// Exit after receiving N messages.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    #[command(flatten)]
    pub payload: PayloadArgs,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Wire bytes as hex; whitespace is ignored.
    pub hex: Vec<String>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

impl PayloadArgs {
    pub fn message(&self) -> CliResult<Message> {
        if let Some(text) = &self.text {
            return Ok(Message::from(text.as_str()));
        }
        if let Some(json) = &self.json {
            let value: serde_json::Value = serde_json::from_str(json)
                .map_err(|err| CliError::usage(format!("--json is not valid JSON: {err}")))?;
            return Ok(message_from_json(&value));
        }
        Err(CliError::usage("one of --text or --json is required"))
    }
}

impl LinkArgs {
    fn serial_config(&self) -> SerialConfig {
        SerialConfig {
            baud_rate: self.baud.unwrap_or(DEFAULT_BAUD_RATE),
            ..SerialConfig::default()
        }
    }

    fn check_baud(&self) -> CliResult<()> {
        if self.baud.is_some() && self.serial.is_none() {
            return Err(CliError::usage("--baud only applies to --serial"));
        }
        Ok(())
    }

    /// Open the link as the host side: serial port, or connect to a socket.
    pub fn connect(&self) -> CliResult<LinkStream> {
        self.check_baud()?;
        if let Some(path) = &self.serial {
            return SerialPort::open_stream(path, &self.serial_config())
                .map_err(|err| transport_error("open failed", err));
        }
        match &self.socket {
            Some(path) => {
                UnixDomainSocket::connect(path).map_err(|err| transport_error("connect failed", err))
            }
            None => Err(CliError::usage("one of --serial or --socket is required")),
        }
    }

    /// Run `session` on every link this side accepts until `stop` is set.
    ///
    /// A serial port is one session. A socket is bound and each connecting
    /// peer gets its own session, one at a time.
    pub fn serve<F>(&self, stop: &AtomicBool, mut session: F) -> CliResult<()>
    where
        F: FnMut(LinkStream) -> CliResult<bool>,
    {
        self.check_baud()?;
        if self.serial.is_some() {
            let link = self.connect()?;
            session(link)?;
            return Ok(());
        }
        let Some(path) = &self.socket else {
            return Err(CliError::usage("one of --serial or --socket is required"));
        };

        let listener =
            UnixDomainSocket::bind(path).map_err(|err| transport_error("bind failed", err))?;
        info!(path = %path.display(), "listening");

        while !stop.load(Ordering::SeqCst) {
            let link = match listener.try_accept() {
                Ok(Some(link)) => link,
                Ok(None) => {
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                    continue;
                }
                Err(err) => return Err(transport_error("accept failed", err)),
            };
            if !session(link)? {
                break;
            }
        }
        Ok(())
    }
}

/// Parse `500ms`, `2s` or `3` (seconds).
pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let duration = parse_duration_allow_zero(input)?;
    if duration.is_zero() {
        return Err(CliError::usage("duration must be greater than zero"));
    }
    Ok(duration)
}

pub fn parse_duration_allow_zero(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::usage("duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::usage(format!("invalid duration value: {input}")))?;

    if millis {
        Ok(Duration::from_millis(value))
    } else {
        Ok(Duration::from_secs(value))
    }
}

/// Returns a flag that is set on Ctrl-C.
pub fn install_ctrlc_handler() -> CliResult<Arc<AtomicBool>> {
    let stop = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&stop);
    ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))?;
    Ok(stop)
}
