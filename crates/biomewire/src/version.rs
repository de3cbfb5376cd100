use std::fmt;

/// Version id reported by remote world generators.
pub const REMOTE_VERSION_ID: &str = "REMOTE";

/// The game version a world generation backend was matched against.
///
/// A remote generator runs out of process, so no version can be
/// recognised for it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RecognisedVersion {
    #[default]
    Unknown,
    Known(String),
}

impl fmt::Display for RecognisedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => f.write_str("unknown"),
            Self::Known(name) => f.write_str(name),
        }
    }
}
