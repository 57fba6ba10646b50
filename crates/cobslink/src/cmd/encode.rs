use bytes::BytesMut;
use cobslink_frame::encode_frame;

use crate::cmd::EncodeArgs;
use crate::exit::{frame_error, CliResult, SUCCESS};
use crate::output::{print_frame_bytes, OutputFormat};

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let message = args.payload.message()?;
    let mut frame = BytesMut::new();
    encode_frame(&message, &mut frame).map_err(|err| frame_error("encode failed", err))?;
    print_frame_bytes(&message, &frame, format);
    Ok(SUCCESS)
}
