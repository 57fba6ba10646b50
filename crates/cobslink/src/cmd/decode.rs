use cobslink_frame::{decode_all, SENTINEL};

use crate::cmd::DecodeArgs;
use crate::exit::{CliError, CliResult, DATA_INVALID, SUCCESS, USAGE};
use crate::output::{print_message, print_rejected, OutputFormat};

const LINK: &str = "hex";

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let wire = parse_hex(&args.hex)?;
    let results = decode_all(&wire);
    if results.is_empty() {
        return Err(CliError::new(DATA_INVALID, "no complete frame in input"));
    }

    let mut rejected = 0usize;
    for result in &results {
        match result {
            Ok(message) => print_message(message, LINK, format),
            Err(err) => {
                rejected += 1;
                print_rejected(err, LINK, format);
            }
        }
    }

    if rejected > 0 {
        return Ok(DATA_INVALID);
    }
    Ok(SUCCESS)
}

/// Join the arguments, drop whitespace, and decode as hex. A missing
/// closing sentinel is added so a single frame can be pasted without it.
fn parse_hex(parts: &[String]) -> CliResult<Vec<u8>> {
    let joined: String = parts
        .iter()
        .flat_map(|part| part.chars())
        .filter(|c| !c.is_whitespace())
        .collect();
    if joined.is_empty() {
        return Err(CliError::new(USAGE, "no hex input given"));
    }
    let mut wire = hex::decode(&joined)
        .map_err(|err| CliError::new(USAGE, format!("invalid hex input: {err}")))?;
    if wire.last() != Some(&SENTINEL) {
        wire.push(SENTINEL);
    }
    Ok(wire)
}
