//! Strategies extracting track metadata from a player.
//!
//! Most sources fill every field as expected. Radio France streams (FIP and
//! its webradios) leave `year` unset and append it to the album instead,
//! e.g. `Innervisions / 1973`.

use log::{debug, warn};

use crate::{
    domain::player::PlayerId,
    squeeze::{error::SqueezeError, field::Field, session::Session},
};

/// Prefix of the current title of streams handled by [`StationParser`]
pub const STATION_MARKER: &str = "fip";

const ALBUM_YEAR_SEPARATOR: char = '/';

/// Reads each metadata field of the playing track, one query per field
pub trait MetadataParser {
    fn artist(&self, session: &mut Session, id: &PlayerId) -> Result<String, SqueezeError> {
        session.query_text(Field::Artist, id)
    }

    fn album(&self, session: &mut Session, id: &PlayerId) -> Result<String, SqueezeError> {
        session.query_text(Field::Album, id)
    }

    fn title(&self, session: &mut Session, id: &PlayerId) -> Result<String, SqueezeError> {
        session.query_text(Field::Title, id)
    }

    fn genre(&self, session: &mut Session, id: &PlayerId) -> Result<String, SqueezeError> {
        session.query_text(Field::Genre, id)
    }

    fn year(&self, session: &mut Session, id: &PlayerId) -> Result<i32, SqueezeError> {
        session.query_int(Field::Year, id)
    }

    fn duration(&self, session: &mut Session, id: &PlayerId) -> Result<f64, SqueezeError> {
        session.query_float(Field::Duration, id)
    }

    fn elapsed_time(&self, session: &mut Session, id: &PlayerId) -> Result<f64, SqueezeError> {
        session.query_float(Field::Time, id)
    }

    /// Album and year together, for parsers where they depend on each other
    fn album_and_year(
        &self,
        session: &mut Session,
        id: &PlayerId,
    ) -> (Result<String, SqueezeError>, Result<i32, SqueezeError>) {
        let album = self.album(session, id);
        let year = self.year(session, id);
        (album, year)
    }
}

/// Each field is read from its own query
#[derive(Debug, Default)]
pub struct GenericParser;

impl MetadataParser for GenericParser {}

/// Recovers the year embedded at the end of the album field
#[derive(Debug, Default)]
pub struct StationParser;

impl StationParser {
    fn year_from_album(
        &self,
        session: &mut Session,
        id: &PlayerId,
        album: &str,
    ) -> Result<i32, SqueezeError> {
        debug!("search year in album metadata '{album}'");
        match split_album_year(album) {
            (_, Some(year)) => {
                debug!("find year value '{year}'");
                Ok(year)
            }
            _ => {
                debug!("no year found in album line, search it in default fields");
                session.query_int(Field::Year, id)
            }
        }
    }
}

impl MetadataParser for StationParser {
    fn album(&self, session: &mut Session, id: &PlayerId) -> Result<String, SqueezeError> {
        let line = session.query_text(Field::Album, id)?;
        let (album, _) = split_album_year(&line);
        debug!("find album '{album}'");
        Ok(album)
    }

    fn year(&self, session: &mut Session, id: &PlayerId) -> Result<i32, SqueezeError> {
        let line = session.query_text(Field::Album, id)?;
        self.year_from_album(session, id, &line)
    }

    fn album_and_year(
        &self,
        session: &mut Session,
        id: &PlayerId,
    ) -> (Result<String, SqueezeError>, Result<i32, SqueezeError>) {
        match session.query_text(Field::Album, id) {
            Ok(line) => {
                let (album, _) = split_album_year(&line);
                (Ok(album), self.year_from_album(session, id, &line))
            }
            Err(e) => {
                let year = session.query_int(Field::Year, id);
                (Err(e), year)
            }
        }
    }
}

/// Splits `name / year` on the last separator.
///
/// The name is the whole trimmed value when there is no separator. The year is
/// `None` when the last segment isn't a number.
pub fn split_album_year(value: &str) -> (String, Option<i32>) {
    match value.rsplit_once(ALBUM_YEAR_SEPARATOR) {
        Some((name, year)) => {
            let year = year.trim().parse().ok();
            if year.is_none() {
                warn!("unable to parse year in album value \"{value}\"");
            }
            (name.trim().to_string(), year)
        }
        None => (value.trim().to_string(), None),
    }
}

/// Selects the parser matching the stream described by `current_title`
pub fn parser_for(current_title: &str) -> Box<dyn MetadataParser> {
    let is_station = current_title
        .get(..STATION_MARKER.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(STATION_MARKER));

    if is_station {
        debug!("'{current_title}' is a radio station stream");
        Box::new(StationParser)
    } else {
        Box::new(GenericParser)
    }
}
