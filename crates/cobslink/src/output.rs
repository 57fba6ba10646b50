use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use cobslink_device::json::message_to_json;
use cobslink_frame::{FrameError, Message};
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct MessageOutput<'a> {
    event: &'a str,
    link: &'a str,
    r#type: &'a str,
    message: serde_json::Value,
    diagnostic: String,
    timestamp: String,
}

#[derive(Serialize)]
struct RejectOutput<'a> {
    event: &'a str,
    link: &'a str,
    kind: &'a str,
    error: String,
    timestamp: String,
}

#[derive(Serialize)]
struct FrameBytesOutput<'a> {
    message: serde_json::Value,
    frame: &'a str,
    len: usize,
}

/// Print one decoded message received on `link`.
pub fn print_message(message: &Message, link: &str, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = MessageOutput {
                event: "message",
                link,
                r#type: message.type_name(),
                message: message_to_json(message),
                diagnostic: message.to_string(),
                timestamp: now_unix_seconds(),
            };
            print_json_line(&out);
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["LINK", "TYPE", "MESSAGE"])
                .add_row(vec![
                    link.to_string(),
                    message.type_name().to_string(),
                    message.to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("link={} type={} message={}", link, message.type_name(), message);
        }
        OutputFormat::Raw => print_raw(&raw_bytes(message)),
    }
}

/// Print a frame that was dropped. Raw output prints nothing.
pub fn print_rejected(err: &FrameError, link: &str, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = RejectOutput {
                event: "rejected",
                link,
                kind: err.kind().as_str(),
                error: err.to_string(),
                timestamp: now_unix_seconds(),
            };
            print_json_line(&out);
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["LINK", "REJECTED", "ERROR"])
                .add_row(vec![
                    link.to_string(),
                    err.kind().as_str().to_string(),
                    err.to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("link={} rejected={} error={}", link, err.kind().as_str(), err);
        }
        OutputFormat::Raw => {}
    }
}

/// Print an encoded frame for `message`.
pub fn print_frame_bytes(message: &Message, frame: &[u8], format: OutputFormat) {
    let hex = hex::encode(frame);
    match format {
        OutputFormat::Json => {
            let out = FrameBytesOutput {
                message: message_to_json(message),
                frame: &hex,
                len: frame.len(),
            };
            print_json_line(&out);
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["MESSAGE", "LEN", "FRAME"])
                .add_row(vec![message.to_string(), frame.len().to_string(), hex]);
            println!("{table}");
        }
        OutputFormat::Pretty => println!("{hex}"),
        OutputFormat::Raw => print_raw(frame),
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

/// Text and byte strings print as their contents, anything else in
/// diagnostic notation.
fn raw_bytes(message: &Message) -> Vec<u8> {
    match message {
        Message::Text(text) => text.as_bytes().to_vec(),
        Message::Bytes(bytes) => bytes.clone(),
        other => other.to_string().into_bytes(),
    }
}

fn print_json_line<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
