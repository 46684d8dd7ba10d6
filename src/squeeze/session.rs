use std::{
    io::{BufRead, BufReader, ErrorKind, Read, Write},
    net::TcpStream,
    time::Duration,
};

use log::debug;

use crate::{
    domain::player::PlayerId,
    squeeze::{decode, error::SqueezeError, field::Field},
};

/// Byte stream a session talks over
pub trait Transport: Read + Write + Send {}

impl<T: Read + Write + Send> Transport for T {}

/// One connection used for request/response field queries
pub struct Session {
    stream: BufReader<Box<dyn Transport>>,
}

impl Session {
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self {
            stream: BufReader::new(Box::new(transport)),
        }
    }

    /// Opens a TCP session. The timeout applies to every read and write.
    pub fn connect(address: &str, timeout: Option<Duration>) -> Result<Self, SqueezeError> {
        let connection_error = |source| SqueezeError::Connection {
            address: address.to_string(),
            source,
        };

        let stream = TcpStream::connect(address).map_err(connection_error)?;
        stream.set_read_timeout(timeout).map_err(connection_error)?;
        stream.set_write_timeout(timeout).map_err(connection_error)?;

        Ok(Self::new(stream))
    }

    /// Sends `<player> <field> ?` and returns the response line without its terminator.
    pub fn query(&mut self, field: Field, player: &PlayerId) -> Result<String, SqueezeError> {
        let writer = self.stream.get_mut();
        write!(writer, "{} {} ?\r\n", player.as_str(), field.as_str())?;
        writer.flush()?;

        let mut line = String::new();
        if self.stream.read_line(&mut line)? == 0 {
            return Err(SqueezeError::Io(ErrorKind::UnexpectedEof.into()));
        }

        let line = line.trim_end_matches(['\r', '\n']).to_string();
        debug!("{field} response: '{line}'");
        Ok(line)
    }

    pub fn query_text(&mut self, field: Field, player: &PlayerId) -> Result<String, SqueezeError> {
        let line = self.query(field, player)?;
        decode::decode_text(field, &line)
    }

    pub fn query_int(&mut self, field: Field, player: &PlayerId) -> Result<i32, SqueezeError> {
        let line = self.query(field, player)?;
        decode::decode_int(field, &line)
    }

    pub fn query_float(&mut self, field: Field, player: &PlayerId) -> Result<f64, SqueezeError> {
        let line = self.query(field, player)?;
        decode::decode_float(field, &line)
    }
}
