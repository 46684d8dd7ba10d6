use std::fmt::Display;

/// Attributes of the playing track that can be queried on a player
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Artist,
    Album,
    Title,
    Genre,
    Year,
    Duration,
    /// Elapsed time of the playing track
    Time,
    /// Title of the stream or file being played
    CurrentTitle,
}

impl Field {
    /// Command word used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Artist => "artist",
            Field::Album => "album",
            Field::Title => "title",
            Field::Genre => "genre",
            Field::Year => "year",
            Field::Duration => "duration",
            Field::Time => "time",
            Field::CurrentTitle => "current_title",
        }
    }
}

impl Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
