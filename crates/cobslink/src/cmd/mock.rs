use std::sync::atomic::Ordering;

use cobslink_device::{CommandTable, DeviceConfig, MockDevice};
use tracing::info;

use crate::cmd::{install_ctrlc_handler, parse_duration_allow_zero, MockArgs};
use crate::exit::{device_error, CliResult, SUCCESS};

pub fn run(args: MockArgs) -> CliResult<i32> {
    let response_delay = parse_duration_allow_zero(&args.response_delay)?;
    let table = match &args.table {
        Some(path) => {
            CommandTable::from_path(path).map_err(|err| device_error("table load failed", err))?
        }
        None => CommandTable::builtin(),
    };
    info!(commands = table.len(), ?response_delay, "mock device ready");

    let config = DeviceConfig {
        response_delay,
        ..DeviceConfig::default()
    };
    let mut device = MockDevice::with_config(table, config);
    let stop = install_ctrlc_handler()?;

    args.link.serve(&stop, |link| {
        let stats = device
            .serve_link(link, &stop)
            .map_err(|err| device_error("session failed", err))?;
        info!(
            received = stats.received,
            replied = stats.replied,
            rejected = stats.rejected(),
            "session ended"
        );
        Ok(!stop.load(Ordering::SeqCst))
    })?;

    Ok(SUCCESS)
}
