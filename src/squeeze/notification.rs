use crate::domain::player::PlayerId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    /// Metadata of the current stream changed, e.g. a new song on a radio
    NewMetadata,
    /// The player moved to another playlist entry
    NewSong,
}

/// Change notification pushed by the server once `listen` mode is on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub player: PlayerId,
    pub kind: NotificationKind,
}

impl Notification {
    /// Parses `<player> ... newmetadata` or `<player> playlist newsong ...`.
    /// Any other line isn't a track change.
    pub fn parse(line: &str) -> Option<Self> {
        let mut tokens = line.split_whitespace();
        let player = tokens.next()?;
        let kind = tokens.find_map(|token| match token {
            "newmetadata" => Some(NotificationKind::NewMetadata),
            "newsong" => Some(NotificationKind::NewSong),
            _ => None,
        })?;

        Some(Self {
            player: PlayerId::from(player),
            kind,
        })
    }
}
