//! Delivery of tracks to consumers outside the bridge

pub mod mqtt;

use std::{
    fs::OpenOptions,
    io::{self, Write},
    path::Path,
};

use thiserror::Error;

use crate::domain::track::Track;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("unable to serialize track: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("unable to write track: {0}")]
    Io(#[from] io::Error),

    #[error("unable to send track to the mqtt broker: {0}")]
    Mqtt(#[from] rumqttc::ClientError),

    #[error("no mqtt broker configured")]
    MissingBroker,

    #[error("invalid mqtt broker address '{0}'")]
    InvalidBroker(String),

    #[error("no mqtt topic configured")]
    MissingTopic,

    #[error("invalid mqtt client id '{0}'")]
    InvalidClientId(String),

    #[error("invalid mqtt qos {0}, expected 0, 1 or 2")]
    InvalidQos(u8),
}

pub trait Publisher {
    fn publish(&mut self, track: &Track) -> Result<(), PublishError>;
}

/// Writes each track as a JSON document followed by a newline, the local
/// sink used when no broker is configured
pub struct JsonPublisher<W: Write> {
    writer: W,
    pretty: bool,
}

impl<W: Write> JsonPublisher<W> {
    pub fn new(writer: W, pretty: bool) -> Self {
        Self { writer, pretty }
    }
}

impl JsonPublisher<Box<dyn Write + Send>> {
    /// Publishes to stdout, or appends to the file at `path`
    pub fn open(path: Option<&Path>, pretty: bool) -> Result<Self, PublishError> {
        let writer: Box<dyn Write + Send> = match path {
            Some(path) => Box::new(OpenOptions::new().create(true).append(true).open(path)?),
            None => Box::new(io::stdout()),
        };
        Ok(Self::new(writer, pretty))
    }
}

impl<W: Write> Publisher for JsonPublisher<W> {
    fn publish(&mut self, track: &Track) -> Result<(), PublishError> {
        if self.pretty {
            serde_json::to_writer_pretty(&mut self.writer, track)?;
        } else {
            serde_json::to_writer(&mut self.writer, track)?;
        }
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;

        log::debug!("published track '{}' by '{}'", track.title, track.artist);
        Ok(())
    }
}
