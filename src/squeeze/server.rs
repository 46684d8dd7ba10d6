use std::{
    io::{BufRead, BufReader, ErrorKind, Write},
    net::TcpStream,
    sync::{Mutex, PoisonError},
    time::Duration,
};

use crossbeam_channel::{Receiver, SendTimeoutError, Sender, bounded};
use log::{debug, error, info, trace, warn};

use crate::{
    config::{ChannelConfig, ServerConfig},
    domain::{player::PlayerId, track::Track},
    squeeze::{
        error::SqueezeError,
        field::Field,
        metadata::{MetadataParser, parser_for},
        notification::Notification,
        session::Session,
    },
};

/// Client of one media server.
///
/// [`Server::listen`] follows the server notifications and pushes the track of
/// every player whose song changes on the stream returned by [`Server::tracks`].
pub struct Server {
    pub config: ServerConfig,
    push_timeout: Duration,
    sender: Mutex<Option<Sender<Track>>>,
    receiver: Mutex<Option<Receiver<Track>>>,
}

impl Server {
    pub fn new(config: ServerConfig, channel: ChannelConfig) -> Self {
        let (sender, receiver) = bounded(channel.capacity);
        Self {
            config,
            push_timeout: channel.push_timeout(),
            sender: Mutex::new(Some(sender)),
            receiver: Mutex::new(Some(receiver)),
        }
    }

    /// Stream of tracks, ends once the server is closed and drained.
    ///
    /// The stream is handed out once, clone it to share it between consumers.
    /// Once every clone is dropped the listener stops.
    pub fn tracks(&self) -> Option<Receiver<Track>> {
        self.receiver
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Stops accepting tracks. Pushes already waiting on a full stream still complete.
    pub fn close(&self) {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if sender.is_some() {
            debug!("track stream of {} closed", self.config.address);
        }
    }

    /// Follows server notifications until the connection is closed by the
    /// server or the track stream is closed.
    pub fn listen(&self) -> Result<(), SqueezeError> {
        let address = &self.config.address;
        let connection_error = |source| SqueezeError::Connection {
            address: address.clone(),
            source,
        };

        let stream = TcpStream::connect(address).map_err(connection_error)?;
        let mut writer = stream.try_clone().map_err(connection_error)?;
        writer
            .write_all(b"listen 1\n")
            .map_err(connection_error)?;
        info!("listening to events of {address}");

        self.follow(BufReader::new(stream))
    }

    /// Handles every notification line read from `reader` until end of stream
    fn follow(&self, mut reader: impl BufRead) -> Result<(), SqueezeError> {
        let address = &self.config.address;
        let mut buf = Vec::new();
        loop {
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => {
                    debug!("connection to server {address} closed");
                    return Ok(());
                }
                Ok(_) => {}
                // Bytes read before the error stay in `buf`
                Err(e) if is_transient(&e) => {
                    error!("unable to read event: {e}");
                    continue;
                }
                Err(source) => {
                    return Err(SqueezeError::Connection {
                        address: address.clone(),
                        source,
                    });
                }
            }

            let line = String::from_utf8_lossy(&buf).into_owned();
            buf.clear();
            let line = line.trim_end_matches(['\r', '\n']);
            if let Err(SqueezeError::Closed) = self.process_event_line(line) {
                info!("track stream closed, stop listening to {address}");
                return Ok(());
            }
        }
    }

    fn process_event_line(&self, line: &str) -> Result<(), SqueezeError> {
        info!("new event: {line}");
        let Some(notification) = Notification::parse(line) else {
            trace!("not a track change, event ignored");
            return Ok(());
        };
        debug!("{:?} on player {}", notification.kind, notification.player);

        match self.current_track(&notification.player) {
            Ok(track) => self.push(track),
            Err(e) => {
                error!(
                    "unable to extract current track metadata for player {}: {e}",
                    notification.player
                );
                Ok(())
            }
        }
    }

    fn push(&self, track: Track) -> Result<(), SqueezeError> {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(SqueezeError::Closed)?;

        match sender.send_timeout(track, self.push_timeout) {
            Ok(()) => Ok(()),
            Err(SendTimeoutError::Timeout(track)) => {
                warn!(
                    "track stream full for {:?}, track dropped: {track:?}",
                    self.push_timeout
                );
                Ok(())
            }
            Err(SendTimeoutError::Disconnected(_)) => Err(SqueezeError::Closed),
        }
    }

    /// Reads the track currently played by `id` over a dedicated connection.
    ///
    /// Fails only when the server can't be reached, unreadable fields are left
    /// empty.
    pub fn current_track(&self, id: &PlayerId) -> Result<Track, SqueezeError> {
        let mut session = Session::connect(&self.config.address, self.config.query_timeout())?;

        let current_title = session
            .query_text(Field::CurrentTitle, id)
            .unwrap_or_else(|e| {
                warn!("unable to read current_title field: {e}");
                String::new()
            });
        let parser = parser_for(&current_title);

        Ok(assemble(parser.as_ref(), &mut session, id))
    }
}

/// Collects every track field, a failing field keeps its zero value
pub fn assemble(parser: &dyn MetadataParser, session: &mut Session, id: &PlayerId) -> Track {
    let (album, year) = parser.album_and_year(session, id);

    Track {
        artist: or_default(Field::Artist, parser.artist(session, id)),
        album: or_default(Field::Album, album),
        title: or_default(Field::Title, parser.title(session, id)),
        genre: or_default(Field::Genre, parser.genre(session, id)),
        year: or_default(Field::Year, year),
        elapsed_time: or_default(Field::Time, parser.elapsed_time(session, id)),
        duration: or_default(Field::Duration, parser.duration(session, id)),
    }
}

fn or_default<T: Default>(field: Field, value: Result<T, SqueezeError>) -> T {
    value.unwrap_or_else(|e| {
        warn!("unable to read {field} field: {e}");
        T::default()
    })
}

fn is_transient(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        ErrorKind::Interrupted | ErrorKind::WouldBlock | ErrorKind::TimedOut
    )
}
