use std::fmt::Display;

/// Lossless audio codecs the audio track can be re-encoded to.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum AudioCodec {
    #[default]
    Flac,
    Alac,
}

impl AudioCodec {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "flac" => Some(AudioCodec::Flac),
            "alac" => Some(AudioCodec::Alac),
            _ => None,
        }
    }

    /// Value passed to ffmpeg's `-c:a`.
    pub fn ca_parameter(&self) -> &'static str {
        match self {
            AudioCodec::Flac => "flac",
            AudioCodec::Alac => "alac",
        }
    }
}

impl Display for AudioCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.ca_parameter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str() {
        assert_eq!(AudioCodec::from_str("flac"), Some(AudioCodec::Flac));
        assert_eq!(AudioCodec::from_str("ALAC"), Some(AudioCodec::Alac));
        assert_eq!(AudioCodec::from_str("aac"), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", AudioCodec::default()), "flac");
        assert_eq!(format!("{}", AudioCodec::Alac), "alac");
    }
}
