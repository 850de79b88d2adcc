use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Expression class reported by the detection source, used as the song filter key
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Happy,
    Sad,
    Angry,
    Fearful,
    Disgusted,
    Surprised,
    Neutral,
}

impl Mood {
    /// All moods in detection-model order
    pub const ALL: [Mood; 7] = [
        Mood::Happy,
        Mood::Sad,
        Mood::Angry,
        Mood::Fearful,
        Mood::Disgusted,
        Mood::Surprised,
        Mood::Neutral,
    ];

    /// Lower-case name, also used as the catalog lookup key
    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Happy => "happy",
            Mood::Sad => "sad",
            Mood::Angry => "angry",
            Mood::Fearful => "fearful",
            Mood::Disgusted => "disgusted",
            Mood::Surprised => "surprised",
            Mood::Neutral => "neutral",
        }
    }

    /// Heading shown above the recommendation list for this mood
    pub fn caption(&self) -> &'static str {
        match self {
            Mood::Happy => "Upbeat picks",
            Mood::Sad => "Sad picks",
            Mood::Angry => "Gangsta picks",
            Mood::Fearful => "Scary picks",
            Mood::Disgusted => "Disgusted picks",
            Mood::Surprised => "Surprised picks",
            Mood::Neutral => "Discover New",
        }
    }
}

/// Caption for an optional mood ("Mood-based picks" when nothing was detected)
pub fn mood_caption(mood: Option<Mood>) -> &'static str {
    mood.map(|m| m.caption()).unwrap_or("Mood-based picks")
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error type for invalid mood strings
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseMoodError(pub String);

impl fmt::Display for ParseMoodError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid mood value '{}'", self.0)
    }
}

impl std::error::Error for ParseMoodError {}

impl FromStr for Mood {
    type Err = ParseMoodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_key(s).as_str() {
            "happy" => Ok(Mood::Happy),
            "sad" => Ok(Mood::Sad),
            "angry" => Ok(Mood::Angry),
            "fearful" => Ok(Mood::Fearful),
            "disgusted" => Ok(Mood::Disgusted),
            "surprised" => Ok(Mood::Surprised),
            "neutral" => Ok(Mood::Neutral),
            _ => Err(ParseMoodError(s.to_string())),
        }
    }
}

/// Normalization for lookup keys (lowercase, trim whitespace)
pub fn normalize_key(input: &str) -> String {
    input.trim().to_lowercase()
}

/// Stable song identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SongId(String);

impl SongId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SongId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SongId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for SongId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A playable song as known to the catalog
///
/// Records coming from the catalog service carry their identifier as `_id`,
/// locally built ones may use `id`. Both land in the single `id` field so
/// identity checks never depend on which spelling a record used.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Song {
    #[serde(rename = "_id", alias = "id")]
    pub id: SongId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub artist: String,
    pub mood: Mood,
    #[serde(rename = "audio", alias = "audioUrl")]
    pub audio_url: String,
    #[serde(rename = "cover", alias = "coverUrl", default)]
    pub cover_url: String,
}

impl Song {
    /// Identity check used by every queue and catalog lookup
    pub fn matches(&self, id: &SongId) -> bool {
        &self.id == id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mood_from_str() {
        assert_eq!("happy".parse::<Mood>().unwrap(), Mood::Happy);
        assert_eq!("  Surprised ".parse::<Mood>().unwrap(), Mood::Surprised);
        assert_eq!("NEUTRAL".parse::<Mood>().unwrap(), Mood::Neutral);
        assert!("bored".parse::<Mood>().is_err());
    }

    #[test]
    fn test_mood_round_trips_through_as_str() {
        for mood in Mood::ALL {
            assert_eq!(mood.as_str().parse::<Mood>().unwrap(), mood);
        }
    }

    #[test]
    fn test_mood_caption() {
        assert_eq!(mood_caption(Some(Mood::Happy)), "Upbeat picks");
        assert_eq!(mood_caption(Some(Mood::Neutral)), "Discover New");
        assert_eq!(mood_caption(None), "Mood-based picks");
    }

    #[test]
    fn test_song_accepts_either_identifier_field() {
        let from_server = r#"{
            "_id": "65f0c1",
            "title": "Omw",
            "artist": "FKJ",
            "mood": "happy",
            "audio": "https://cdn.example/songs/omw.mp3",
            "cover": "https://cdn.example/covers/omw.jpg",
            "__v": 0
        }"#;
        let local = r#"{
            "id": "4",
            "title": "Omw",
            "artist": "FKJ",
            "mood": "happy",
            "audioUrl": "https://cdn.example/songs/omw.mp3",
            "coverUrl": "https://cdn.example/covers/omw.jpg"
        }"#;

        let a: Song = serde_json::from_str(from_server).unwrap();
        let b: Song = serde_json::from_str(local).unwrap();

        assert_eq!(a.id, SongId::from("65f0c1"));
        assert_eq!(b.id, SongId::from("4"));
        assert_eq!(a.audio_url, b.audio_url);
        assert_eq!(a.cover_url, b.cover_url);
    }

    #[test]
    fn test_song_serializes_with_wire_names() {
        let song = Song {
            id: SongId::from("7"),
            title: "3 Drags".to_string(),
            artist: "Vichaar".to_string(),
            mood: Mood::Happy,
            audio_url: "https://cdn.example/a.mp3".to_string(),
            cover_url: "https://cdn.example/c.jpg".to_string(),
        };

        let value = serde_json::to_value(&song).unwrap();
        assert_eq!(value["_id"], "7");
        assert_eq!(value["mood"], "happy");
        assert_eq!(value["audio"], "https://cdn.example/a.mp3");
        assert_eq!(value["cover"], "https://cdn.example/c.jpg");
    }

    #[test]
    fn test_matches_compares_only_the_identifier() {
        // A record with a non-empty id must not match every other id
        let song = Song {
            id: SongId::from("1"),
            title: "Dangerous".to_string(),
            artist: "Michael Jackson".to_string(),
            mood: Mood::Happy,
            audio_url: String::new(),
            cover_url: String::new(),
        };

        assert!(song.matches(&SongId::from("1")));
        assert!(!song.matches(&SongId::from("2")));
        assert!(!song.matches(&SongId::from("")));
    }
}
