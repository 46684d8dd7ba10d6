//! Test doubles for the squeeze protocol: an in-memory transport and a
//! local TCP server answering queries from a raw track fixture.

use std::{
    collections::VecDeque,
    io::{self, BufRead, BufReader, Cursor, Read, Write},
    net::{Shutdown, TcpListener, TcpStream},
    sync::{Arc, Mutex},
    thread,
};

/// Transport replaying a fixed input and recording what is written
pub struct ScriptedTransport {
    input: Cursor<Vec<u8>>,
    output: Written,
}

#[derive(Clone, Default)]
pub struct Written(Arc<Mutex<Vec<u8>>>);

impl Written {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl ScriptedTransport {
    pub fn new(input: &str) -> Self {
        Self {
            input: Cursor::new(input.as_bytes().to_vec()),
            output: Written::default(),
        }
    }

    pub fn written(&self) -> Written {
        self.output.clone()
    }
}

impl Read for ScriptedTransport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.input.read(buf)
    }
}

impl Write for ScriptedTransport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.output.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Reader returning one scripted chunk or error per read, then end of stream
pub struct ChunkedReader {
    chunks: VecDeque<io::Result<Vec<u8>>>,
}

impl ChunkedReader {
    pub fn new(chunks: Vec<io::Result<Vec<u8>>>) -> Self {
        Self {
            chunks: chunks.into(),
        }
    }
}

impl Read for ChunkedReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.chunks.pop_front() {
            None => Ok(0),
            Some(Err(e)) => Err(e),
            Some(Ok(mut chunk)) => {
                let n = chunk.len().min(buf.len());
                buf[..n].copy_from_slice(&chunk[..n]);
                if n < chunk.len() {
                    self.chunks.push_front(Ok(chunk.split_off(n)));
                }
                Ok(n)
            }
        }
    }
}

/// Percent-encoded field values served by [`MockServer`]
#[derive(Debug, Clone, Default)]
pub struct RawTrack {
    pub current_title: String,
    pub artist: String,
    pub album: String,
    pub title: String,
    pub genre: String,
    pub year: String,
    pub time: String,
    pub duration: String,
}

#[derive(Default)]
struct MockState {
    track: RawTrack,
    queries: Vec<String>,
    notifications: Vec<String>,
}

impl MockState {
    fn respond(&mut self, player: &str, action: &str) -> String {
        self.queries.push(action.to_string());
        let value = match action {
            "current_title" => self.track.current_title.as_str(),
            "artist" => self.track.artist.as_str(),
            "album" => self.track.album.as_str(),
            "title" => self.track.title.as_str(),
            "genre" => self.track.genre.as_str(),
            "year" => self.track.year.as_str(),
            "time" => self.track.time.as_str(),
            "duration" => self.track.duration.as_str(),
            _ => "",
        };
        format!("{player} {action} {value}\r\n")
    }
}

/// Media server double listening on an ephemeral local port.
///
/// A `listen 1` connection receives the scripted notifications then is closed
/// by the server; any other connection is served field queries.
pub struct MockServer {
    addr: String,
    state: Arc<Mutex<MockState>>,
}

impl MockServer {
    pub fn start() -> io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let addr = listener.local_addr()?.to_string();
        let state = Arc::new(Mutex::new(MockState::default()));

        let shared = state.clone();
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                let state = shared.clone();
                thread::spawn(move || {
                    if let Err(e) = Self::handle_connection(stream, &state) {
                        log::info!("mock connection closed: {e}");
                    }
                });
            }
        });

        Ok(Self { addr, state })
    }

    pub fn addr(&self) -> String {
        self.addr.clone()
    }

    pub fn set_raw_track(&self, track: RawTrack) {
        self.state.lock().unwrap().track = track;
    }

    pub fn set_notifications(&self, lines: &[&str]) {
        self.state.lock().unwrap().notifications = lines.iter().map(|l| l.to_string()).collect();
    }

    /// Field names queried so far, in order
    pub fn queries(&self) -> Vec<String> {
        self.state.lock().unwrap().queries.clone()
    }

    fn handle_connection(stream: TcpStream, state: &Mutex<MockState>) -> io::Result<()> {
        let mut reader = BufReader::new(stream.try_clone()?);
        let mut writer = stream;
        let mut line = String::new();

        loop {
            line.clear();
            if reader.read_line(&mut line)? == 0 {
                return Ok(());
            }
            let request = line.trim_end();

            if request == "listen 1" {
                let notifications = state.lock().unwrap().notifications.clone();
                for notification in notifications {
                    writer.write_all(format!("{notification}\r\n").as_bytes())?;
                }
                writer.flush()?;
                return writer.shutdown(Shutdown::Both);
            }

            let mut args = request.split(' ');
            let player = args.next().unwrap_or_default();
            let action = args.next().unwrap_or_default();
            let response = state.lock().unwrap().respond(player, action);
            writer.write_all(response.as_bytes())?;
            writer.flush()?;
        }
    }
}
