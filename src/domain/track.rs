use serde::{Deserialize, Serialize};

/// Metadata of the track currently played by a player.
///
/// Unknown fields keep their zero value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Track {
    pub artist: String,
    pub album: String,
    pub title: String,
    pub genre: String,
    pub year: i32,
    /// Elapsed time in seconds
    #[serde(rename = "CurrentTime")]
    pub elapsed_time: f64,
    /// Duration in seconds
    pub duration: f64,
}
