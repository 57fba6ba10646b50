use std::collections::BTreeMap;
use std::path::Path;

use cobslink_frame::Message;
use serde::Deserialize;
use tracing::debug;

use crate::error::{DeviceError, Result};
use crate::json::message_from_json;
use crate::responder::Responder;

/// Reply for requests with no table entry.
pub const DEFAULT_FALLBACK: &str = "Unknown command";

/// Power supply, controller and chip commands a bench test rig sends.
const BUILTIN_COMMANDS: &[(&str, &str)] = &[
    // power supply
    ("SET VOLTAGE 5", "Voltage Set: OK"),
    ("SET CURRENT 0.5", "Current Set: OK"),
    ("SET OUTPUT OFF", "Output Set: OFF"),
    ("SET OUTPUT ON", "Output Set: ON"),
    ("GET POWER CONSUMTION", "0.2"),
    // controller
    ("START", "started: true"),
    ("DUT INSERTED", "inserted: true"),
    ("GET 5V", "5"),
    ("GET 3V", "3.3"),
    ("GET LED brightness ON", "0.3"),
    ("GET LED brightness OFF", "0"),
    ("GET IR LED brightness ON", "2"),
    ("GET IR LED brightness OFF", "0"),
    ("SEND IR COMMAND", "ir command sent"),
    // chip
    ("GET MAC", "mac: FF:02:AF:9F:4C:00"),
    ("PING CHIP", "ping received"),
    ("GET TOUCH SENSOR DATA", "touch sensor data: OK"),
    ("GET RT410 CONNETION STATUS", "rt410 status: OK"),
    ("PERFORM DISPLAY SOCKET TEST", "socket test: passed"),
    ("TURN ON LED", "led status: ON"),
    ("TURN OFF LED", "led status: OFF"),
    ("TURN ON IR LEDS", "IR LEDS: ON"),
    ("TURN OFF IR LEDS", "IR LEDS: OFF"),
    ("GET IR SENSOR STATUS", "ir command received"),
    ("ENCRYPT CHIP", "chip encrypted"),
    ("GET ENCRYPTION STATUS", "encryption status: OK"),
    // wifi rssi
    ("{0:[24]}", "-50"),
];

/// Text command → reply lookup.
///
/// Only text requests are looked up; every other message shape gets the
/// fallback reply.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandTable {
    commands: BTreeMap<String, Message>,
    fallback: Message,
}

#[derive(Deserialize)]
struct TableFile {
    #[serde(default)]
    fallback: Option<serde_json::Value>,
    commands: BTreeMap<String, serde_json::Value>,
}

impl CommandTable {
    /// An empty table answering everything with [`DEFAULT_FALLBACK`].
    pub fn new() -> Self {
        Self {
            commands: BTreeMap::new(),
            fallback: Message::from(DEFAULT_FALLBACK),
        }
    }

    /// The bench rig command set.
    pub fn builtin() -> Self {
        let mut table = Self::new();
        for (command, reply) in BUILTIN_COMMANDS {
            table.insert(*command, *reply);
        }
        table
    }

    /// Parse a table from JSON:
    ///
    /// ```json
    /// { "fallback": "Unknown command", "commands": { "PING CHIP": "ping received" } }
    /// ```
    ///
    /// Reply values may be any JSON value.
    pub fn from_json_str(input: &str) -> Result<Self> {
        let file: TableFile = serde_json::from_str(input)?;
        let mut table = Self::new();
        if let Some(fallback) = &file.fallback {
            table.fallback = message_from_json(fallback);
        }
        for (command, reply) in &file.commands {
            table.insert(command.as_str(), message_from_json(reply));
        }
        Ok(table)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path).map_err(|e| DeviceError::TableRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let table = Self::from_json_str(&input)?;
        debug!(?path, commands = table.len(), "loaded command table");
        Ok(table)
    }

    pub fn insert(&mut self, command: impl Into<String>, reply: impl Into<Message>) {
        self.commands.insert(command.into(), reply.into());
    }

    pub fn with_fallback(mut self, fallback: impl Into<Message>) -> Self {
        self.fallback = fallback.into();
        self
    }

    /// The reply for `request`, or the fallback.
    pub fn lookup(&self, request: &Message) -> &Message {
        request
            .as_text()
            .and_then(|command| self.commands.get(command))
            .unwrap_or(&self.fallback)
    }

    pub fn fallback(&self) -> &Message {
        &self.fallback
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Commands and replies in sorted command order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Message)> {
        self.commands.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl Default for CommandTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Responder for CommandTable {
    fn respond(&mut self, request: &Message) -> Message {
        self.lookup(request).clone()
    }
}
