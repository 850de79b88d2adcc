use moodplay_core::{Detection, ExpressionScores, Mood, SongId};
use moodplay_player::{SessionCommand, SessionSnapshot, ViewState};

/// One parsed line of the terminal front end
#[derive(Debug, Clone, PartialEq)]
pub enum ReplAction {
    Detect(Option<Detection>),
    Command(SessionCommand),
    /// Select by 1-based position in the shown queue
    SelectPosition(usize),
    Status,
    Queue,
    Help,
    Quit,
}

pub const HELP: &str = "\
Commands:
  detect <mood> [confidence]   report a detection (happy, sad, angry, fearful,
                               disgusted, surprised, neutral)
  scores <json>                report raw scores, e.g. {\"happy\":0.7,\"sad\":0.1}
  noface                       report a frame without a face
  queue                        list the current queue
  select <#n|id>               play a song by queue position or id
  toggle | play | pause        transport
  next | prev                  move through the queue
  seek <seconds>               jump within the track
  volume <0..1>                set the output volume
  rescan                       resolve the current mood again
  clear                        drop the mood filter
  close                        close the player
  status                       show session state
  quit                         stop the session";

/// Parse a command line; `Ok(None)` for blank input
pub fn parse_line(line: &str) -> Result<Option<ReplAction>, String> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let action = match word.to_lowercase().as_str() {
        "" => return Ok(None),
        "detect" => {
            let mut parts = rest.split_whitespace();
            let mood: Mood = parts
                .next()
                .ok_or("usage: detect <mood> [confidence]")?
                .parse()
                .map_err(|e: moodplay_core::ParseMoodError| e.to_string())?;
            let confidence = match parts.next() {
                Some(value) => parse_confidence(value)?,
                None => 1.0,
            };
            ReplAction::Detect(Some(Detection::new(mood, confidence)))
        }
        "scores" => {
            let scores: ExpressionScores =
                serde_json::from_str(rest).map_err(|e| format!("invalid scores: {}", e))?;
            ReplAction::Detect(scores.dominant())
        }
        "noface" => ReplAction::Detect(None),
        "queue" | "songs" => ReplAction::Queue,
        "select" | "play-song" => {
            if rest.is_empty() {
                return Err("usage: select <#n|id>".to_string());
            }
            match rest.strip_prefix('#') {
                Some(n) => {
                    let n: usize = n.parse().map_err(|_| format!("invalid position: {}", n))?;
                    if n == 0 {
                        return Err("positions start at 1".to_string());
                    }
                    ReplAction::SelectPosition(n)
                }
                None => ReplAction::Command(SessionCommand::Select(SongId::from(rest))),
            }
        }
        "toggle" => ReplAction::Command(SessionCommand::Toggle),
        "play" => ReplAction::Command(SessionCommand::Play),
        "pause" => ReplAction::Command(SessionCommand::Pause),
        "next" => ReplAction::Command(SessionCommand::Next),
        "prev" | "previous" => ReplAction::Command(SessionCommand::Previous),
        "seek" => {
            let seconds: f64 = rest
                .parse()
                .map_err(|_| "usage: seek <seconds>".to_string())?;
            ReplAction::Command(SessionCommand::Seek(seconds))
        }
        "volume" | "vol" => {
            let volume: f32 = rest
                .parse()
                .map_err(|_| "usage: volume <0..1>".to_string())?;
            ReplAction::Command(SessionCommand::SetVolume(volume))
        }
        "rescan" => ReplAction::Command(SessionCommand::Rescan),
        "clear" => ReplAction::Command(SessionCommand::ClearFilter),
        "close" => ReplAction::Command(SessionCommand::Close),
        "status" => ReplAction::Status,
        "help" | "?" => ReplAction::Help,
        "quit" | "exit" => ReplAction::Quit,
        other => return Err(format!("unknown command '{}', try 'help'", other)),
    };

    Ok(Some(action))
}

/// Confidence as a fraction or a percentage ("0.8", "80%")
fn parse_confidence(value: &str) -> Result<f32, String> {
    let (number, scale) = match value.strip_suffix('%') {
        Some(n) => (n, 100.0),
        None => (value, 1.0),
    };

    number
        .parse::<f32>()
        .map(|v| v / scale)
        .map_err(|_| format!("invalid confidence: {}", value))
}

fn format_time(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

pub fn render_status(snapshot: &SessionSnapshot) -> String {
    let mut out = String::new();

    let view = match snapshot.view {
        ViewState::Detecting => "detecting",
        ViewState::MoodResolved => "mood resolved",
        ViewState::PlayerOpen => "player open",
    };
    out.push_str(&format!("[{}] {}", view, snapshot.caption));
    if let Some(d) = &snapshot.last_detection {
        out.push_str(&format!(" (last: {} {})", d.expression, d.percentage()));
    }
    if snapshot.resolving {
        out.push_str(" - loading songs...");
    }

    if let Some(song) = &snapshot.current_song {
        let t = &snapshot.transport;
        out.push_str(&format!(
            "\n{} {} - {}  {} / {}  vol {:.0}%",
            if t.is_playing { ">" } else { "||" },
            song.artist,
            song.title,
            format_time(t.current_time_secs),
            t.duration_secs.map_or_else(|| "--:--".to_string(), format_time),
            t.volume * 100.0
        ));
    }

    if let Some(error) = &snapshot.last_error {
        out.push_str(&format!("\nlast error: {}", error));
    }

    out
}

pub fn render_queue(snapshot: &SessionSnapshot) -> String {
    if snapshot.queue.is_empty() {
        return "Queue is empty".to_string();
    }

    snapshot
        .queue
        .iter()
        .enumerate()
        .map(|(i, song)| {
            let marker = if snapshot.current_index == Some(i) { "*" } else { " " };
            format!(
                "{} #{:<3} {} - {} [{}] ({})",
                marker,
                i + 1,
                song.artist,
                song.title,
                song.mood,
                song.id
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_detect() {
        assert_eq!(
            parse_line("detect Happy 80%").unwrap(),
            Some(ReplAction::Detect(Some(Detection::new(Mood::Happy, 0.8))))
        );
        assert_eq!(
            parse_line("detect sad").unwrap(),
            Some(ReplAction::Detect(Some(Detection::new(Mood::Sad, 1.0))))
        );
        assert!(parse_line("detect bored").is_err());
        assert!(parse_line("detect").is_err());
    }

    #[test]
    fn test_parse_scores_uses_dominant_expression() {
        let action = parse_line(r#"scores {"happy":0.1,"surprised":0.7}"#).unwrap();
        assert_eq!(
            action,
            Some(ReplAction::Detect(Some(Detection::new(Mood::Surprised, 0.7))))
        );

        assert_eq!(parse_line("scores {}").unwrap(), Some(ReplAction::Detect(None)));
    }

    #[test]
    fn test_parse_select() {
        assert_eq!(
            parse_line("select #2").unwrap(),
            Some(ReplAction::SelectPosition(2))
        );
        assert_eq!(
            parse_line("select 6795a1").unwrap(),
            Some(ReplAction::Command(SessionCommand::Select(SongId::from("6795a1"))))
        );
        assert!(parse_line("select #0").is_err());
        assert!(parse_line("select").is_err());
    }

    #[test]
    fn test_parse_transport() {
        assert_eq!(
            parse_line("  seek 42.5 ").unwrap(),
            Some(ReplAction::Command(SessionCommand::Seek(42.5)))
        );
        assert_eq!(
            parse_line("vol 0.3").unwrap(),
            Some(ReplAction::Command(SessionCommand::SetVolume(0.3)))
        );
        assert_eq!(
            parse_line("PREV").unwrap(),
            Some(ReplAction::Command(SessionCommand::Previous))
        );
        assert_eq!(parse_line("").unwrap(), None);
        assert!(parse_line("dance").is_err());
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0.0), "0:00");
        assert_eq!(format_time(65.9), "1:05");
        assert_eq!(format_time(-3.0), "0:00");
    }
}
