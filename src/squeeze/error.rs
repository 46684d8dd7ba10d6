use thiserror::Error;

use crate::squeeze::field::Field;

#[derive(Debug, Error)]
pub enum SqueezeError {
    #[error("unable to connect to {address}: {source}")]
    Connection {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unable to unescape {field} value \"{raw}\"")]
    Decode { field: Field, raw: String },

    #[error("track stream is closed")]
    Closed,
}
