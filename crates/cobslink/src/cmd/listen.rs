use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use cobslink_frame::{FrameConfig, FrameError, FrameReader};
use cobslink_transport::LinkStream;
use tracing::{info, warn};

use crate::cmd::{install_ctrlc_handler, ListenArgs};
use crate::exit::{frame_error, CliResult, SUCCESS};
use crate::output::{print_message, print_rejected, OutputFormat};

const READ_POLL: Duration = Duration::from_millis(500);

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let stop = install_ctrlc_handler()?;
    let mut printed = 0usize;

    args.link.serve(&stop, |link| {
        let done = listen_on(link, &stop, format, &mut printed, args.count)?;
        Ok(!done)
    })?;

    Ok(SUCCESS)
}

/// Print messages from one link. Returns true once `count` is reached.
fn listen_on(
    link: LinkStream,
    stop: &AtomicBool,
    format: OutputFormat,
    printed: &mut usize,
    count: Option<usize>,
) -> CliResult<bool> {
    let kind = link.kind();
    let config = FrameConfig {
        read_timeout: Some(READ_POLL),
        ..FrameConfig::default()
    };
    let mut reader = FrameReader::with_config_link(link, config)
        .map_err(|err| frame_error("link setup failed", err))?;
    info!(link = kind, "listening for frames");

    while !stop.load(Ordering::SeqCst) {
        match reader.read_message() {
            Ok(message) => {
                print_message(&message, kind, format);
                *printed = printed.saturating_add(1);
                if count.is_some_and(|count| *printed >= count) {
                    return Ok(true);
                }
            }
            Err(FrameError::Timeout) => continue,
            Err(FrameError::ConnectionClosed) => {
                info!(link = kind, "link closed");
                return Ok(false);
            }
            Err(err) if err.is_recoverable() => {
                warn!(kind = err.kind().as_str(), error = %err, "dropped bad frame");
                print_rejected(&err, kind, format);
            }
            Err(err) => return Err(frame_error("receive failed", err)),
        }
    }
    Ok(false)
}
