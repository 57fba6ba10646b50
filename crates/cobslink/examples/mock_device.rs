//! Mock bench device on a Unix socket, answering from the built-in table.
//!
//! Run with:
//!   cargo run --example mock_device
//!
//! In another terminal:
//!   cargo run --features cli -- send --socket /tmp/cobslink-mock-example.sock \
//!     --text "PING CHIP" --wait --wait-timeout 3

use std::sync::atomic::AtomicBool;
use std::time::Duration;

use cobslink::device::{CommandTable, DeviceConfig, MockDevice};
use cobslink::transport::UnixDomainSocket;

const SOCKET_PATH: &str = "/tmp/cobslink-mock-example.sock";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let listener = UnixDomainSocket::bind(SOCKET_PATH)?;
    eprintln!("Listening on {}", listener.path().display());

    let config = DeviceConfig {
        response_delay: Duration::from_millis(100),
        ..DeviceConfig::default()
    };
    let mut device = MockDevice::with_config(CommandTable::builtin(), config);
    let stop = AtomicBool::new(false);

    // One host at a time, until the process is killed.
    loop {
        let link = listener.accept()?;
        eprintln!("Host connected");
        let stats = device.serve_link(link, &stop)?;
        eprintln!(
            "Host disconnected: {} received, {} replied, {} rejected",
            stats.received,
            stats.replied,
            stats.rejected()
        );
    }
}
