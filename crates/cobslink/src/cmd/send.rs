use std::time::Duration;

use cobslink_device::{request, split_link};
use cobslink_frame::FrameConfig;

use crate::cmd::{parse_duration, SendArgs};
use crate::exit::{device_error, frame_error, CliResult, SUCCESS};
use crate::output::{print_message, OutputFormat};

const READ_POLL: Duration = Duration::from_millis(250);

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let wait_timeout = parse_duration(&args.wait_timeout)?;
    let message = args.payload.message()?;

    let link = args.link.connect()?;
    let kind = link.kind();
    let config = FrameConfig {
        read_timeout: Some(wait_timeout.min(READ_POLL)),
        write_timeout: Some(wait_timeout),
        ..FrameConfig::default()
    };
    let (mut reader, mut writer) =
        split_link(link, &config).map_err(|err| device_error("link setup failed", err))?;

    if !args.wait {
        writer
            .send(&message)
            .map_err(|err| frame_error("send failed", err))?;
        return Ok(SUCCESS);
    }

    let reply = request(&mut reader, &mut writer, &message, wait_timeout)
        .map_err(|err| device_error("request failed", err))?;
    print_message(&reply, kind, format);
    Ok(SUCCESS)
}
