// Score Assembler - Merge generated tracks into one ABC notation document
// Pure and deterministic: the same song info and tracks always give the same text

use crate::plan::{SongInfo, Track};

/// Reference number written in the `X:` field
pub const REFERENCE_NUMBER: u32 = 1;

/// Title used when the plan has none
pub const DEFAULT_TITLE: &str = "Untitled";

/// Meter used when the plan has none
pub const DEFAULT_TIME_SIGNATURE: &str = "4/4";

/// Quarter notes per minute used when the plan tempo is unset
pub const DEFAULT_TEMPO: u32 = 70;

/// Assemble a multi-voice notation document
///
/// Voice `i` is `tracks[i]`, in generation order. Returns an empty string
/// when there are no tracks; callers must skip rendering and export then.
pub fn assemble(song: &SongInfo, tracks: &[Track]) -> String {
    if tracks.is_empty() {
        return String::new();
    }

    let voices: Vec<String> = tracks
        .iter()
        .enumerate()
        .map(|(index, track)| voice_block(index, track))
        .collect();

    let mut document = header(song);
    document.push_str(&voices.join("\n"));
    document
}

/// Tune header: reference number, title, meter and tempo
fn header(song: &SongInfo) -> String {
    let title = single_line(&song.title);
    let title = if title.is_empty() { DEFAULT_TITLE.to_string() } else { title };

    let meter = single_line(&song.time_signature);
    let meter = if meter.is_empty() { DEFAULT_TIME_SIGNATURE.to_string() } else { meter };

    let tempo = if song.bpm == 0 { DEFAULT_TEMPO } else { song.bpm };

    format!(
        "X: {}\nT: {}\nM: {}\nQ: 1/4={}\n",
        REFERENCE_NUMBER, title, meter, tempo
    )
}

fn voice_block(index: usize, track: &Track) -> String {
    // Quotes would terminate the name attribute
    let name = single_line(&track.instrument_name).replace('"', "'");
    format!(
        "V: {} name=\"{}\" clef={}\n%%MIDI program {}\n{}",
        index,
        name,
        track.clef.as_str(),
        track.midi_program,
        normalize_body(&track.notation)
    )
}

/// Trim a notation body and drop its blank lines
///
/// A blank line ends a tune in ABC, so one inside a voice body would split
/// the combined document.
pub fn normalize_body(body: &str) -> String {
    body.replace("\r\n", "\n")
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::Clef;

    fn song(title: &str, time_signature: &str, bpm: u32) -> SongInfo {
        SongInfo {
            title: title.to_string(),
            mood: Vec::new(),
            genre: "pop".to_string(),
            bpm,
            key: "C".to_string(),
            time_signature: time_signature.to_string(),
            duration_seconds: 60.0,
        }
    }

    fn track(name: &str, clef: Clef, program: u8, notation: &str) -> Track {
        Track {
            instrument_name: name.to_string(),
            notation: notation.to_string(),
            clef,
            midi_program: program,
        }
    }

    #[test]
    fn test_empty_tracks_give_empty_document() {
        let doc = assemble(&song("Rain", "4/4", 70), &[]);
        assert!(doc.is_empty());
    }

    #[test]
    fn test_single_voice_document() {
        let tracks = vec![track("Piano", Clef::Treble, 0, "\n  C D E F | G4 |\n")];
        let doc = assemble(&song("Rain", "3/4", 96), &tracks);

        assert_eq!(
            doc,
            "X: 1\nT: Rain\nM: 3/4\nQ: 1/4=96\nV: 0 name=\"Piano\" clef=treble\n%%MIDI program 0\nC D E F | G4 |"
        );
    }

    #[test]
    fn test_voices_follow_track_order() {
        let tracks = vec![
            track("Piano", Clef::Treble, 0, "C4 |"),
            track("Bass", Clef::Bass, 33, "C,4 |"),
            track("Drums", Clef::Percussion, 0, "C,, D,, |"),
        ];
        let doc = assemble(&song("Rain", "4/4", 70), &tracks);

        let piano = doc.find("V: 0 name=\"Piano\" clef=treble").unwrap();
        let bass = doc.find("V: 1 name=\"Bass\" clef=bass").unwrap();
        let drums = doc.find("V: 2 name=\"Drums\" clef=perc").unwrap();
        assert!(piano < bass && bass < drums);
        assert!(doc.contains("%%MIDI program 33\nC,4 |"));
        assert!(doc.starts_with("X: 1\n"));
    }

    #[test]
    fn test_header_defaults() {
        let tracks = vec![track("Piano", Clef::Treble, 0, "C4 |")];
        let doc = assemble(&song("  ", "", 0), &tracks);
        assert!(doc.starts_with("X: 1\nT: Untitled\nM: 4/4\nQ: 1/4=70\n"));
    }

    #[test]
    fn test_header_fields_stay_on_one_line() {
        let tracks = vec![track("Piano", Clef::Treble, 0, "C4 |")];
        let doc = assemble(&song("Rain\nFall", "4/4\n\nX: 2", 70), &tracks);

        assert!(doc.starts_with("X: 1\nT: Rain Fall\nM: 4/4 X: 2\nQ: 1/4=70\n"));
        assert!(!doc.contains("\n\n"));
        assert_eq!(doc.lines().filter(|l| l.starts_with("X:")).count(), 1);
    }

    #[test]
    fn test_blank_lines_are_removed_from_bodies() {
        let body = "% Verse 1\nC D E F |\n\n\nG A B c |\r\n\r\n% Chorus\n   \nc4 |\n\n";
        assert_eq!(
            normalize_body(body),
            "% Verse 1\nC D E F |\nG A B c |\n% Chorus\nc4 |"
        );

        let tracks = vec![track("Piano", Clef::Treble, 0, body)];
        let doc = assemble(&song("Rain", "4/4", 70), &tracks);
        assert!(!doc.contains("\n\n"));
    }

    #[test]
    fn test_name_quotes_are_replaced() {
        let tracks = vec![track("\"Honky\" Piano", Clef::Treble, 3, "C4 |")];
        let doc = assemble(&song("Rain", "4/4", 70), &tracks);
        assert!(doc.contains("V: 0 name=\"'Honky' Piano\" clef=treble"));
    }

    #[test]
    fn test_assemble_is_deterministic() {
        let info = song("Rain", "6/8", 120);
        let tracks = vec![
            track("Piano", Clef::Treble, 0, "C D E |\n\nF G A |"),
            track("Cello", Clef::Bass, 42, "C,3 |"),
        ];
        assert_eq!(assemble(&info, &tracks), assemble(&info, &tracks));
    }
}
