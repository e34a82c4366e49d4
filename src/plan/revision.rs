// Plan acceptance and revision policy
// Every plan coming back from the backend passes through here before it replaces state

use std::collections::HashSet;
use thiserror::Error;

use super::models::{InstrumentStatus, Plan, Track};

/// Highest valid General MIDI program number
pub const MAX_MIDI_PROGRAM: u8 = 127;

#[derive(Debug, Error, PartialEq)]
pub enum PlanError {
    #[error("Plan has no instruments")]
    NoInstruments,

    #[error("Plan tempo must be positive")]
    InvalidTempo,

    #[error("Plan duration must be a positive number of seconds")]
    InvalidDuration,

    #[error("Instrument #{0} has an empty name")]
    UnnamedInstrument(usize),

    #[error("MIDI program {program} for '{instrument}' is out of range (0-127)")]
    ProgramOutOfRange { instrument: String, program: u8 },
}

/// Validate a backend plan and normalize it for use as the current plan
///
/// Statuses supplied by the backend are discarded: every instrument starts
/// `pending`. Duplicate instrument names get a numeric suffix so that each
/// name is unique within the plan.
pub fn accept_plan(mut plan: Plan) -> Result<Plan, PlanError> {
    if plan.instrumentation.is_empty() {
        return Err(PlanError::NoInstruments);
    }
    if plan.song_info.bpm == 0 {
        return Err(PlanError::InvalidTempo);
    }
    let duration = plan.song_info.duration_seconds;
    if duration.is_nan() || duration <= 0.0 {
        return Err(PlanError::InvalidDuration);
    }

    for (index, instrument) in plan.instrumentation.iter_mut().enumerate() {
        instrument.instrument_name = instrument.instrument_name.trim().to_string();
        if instrument.instrument_name.is_empty() {
            return Err(PlanError::UnnamedInstrument(index));
        }
        if instrument.midi_program > MAX_MIDI_PROGRAM {
            return Err(PlanError::ProgramOutOfRange {
                instrument: instrument.instrument_name.clone(),
                program: instrument.midi_program,
            });
        }
        instrument.status = InstrumentStatus::Pending;
    }

    disambiguate_names(&mut plan);
    Ok(plan)
}

fn disambiguate_names(plan: &mut Plan) {
    let taken: HashSet<String> = plan
        .instrumentation
        .iter()
        .map(|i| i.instrument_name.clone())
        .collect();
    let mut seen: HashSet<String> = HashSet::new();

    for instrument in plan.instrumentation.iter_mut() {
        if seen.contains(&instrument.instrument_name) {
            let base = instrument.instrument_name.clone();
            let mut n = 2;
            let renamed = loop {
                let candidate = format!("{} {}", base, n);
                if !taken.contains(&candidate) && !seen.contains(&candidate) {
                    break candidate;
                }
                n += 1;
            };
            log::warn!("Duplicate instrument '{}' renamed to '{}'", base, renamed);
            instrument.instrument_name = renamed;
        }
        seen.insert(instrument.instrument_name.clone());
    }
}

/// Carry already generated tracks forward into a revised plan
///
/// Walks the new instrumentation in order and keeps track `i` while the
/// instrument at index `i` has the same name. The kept prefix is marked
/// `generated`; the return value is its length, and tracks past it must be
/// discarded by the caller.
pub fn carry_forward(plan: &mut Plan, tracks: &[Track]) -> usize {
    let mut kept = 0;
    for (instrument, track) in plan.instrumentation.iter_mut().zip(tracks) {
        if instrument.instrument_name != track.instrument_name {
            break;
        }
        instrument.status = InstrumentStatus::Generated;
        kept += 1;
    }
    kept
}

/// Check a backend track before it is stored
pub fn validate_track(track: &Track) -> Result<(), PlanError> {
    if track.midi_program > MAX_MIDI_PROGRAM {
        return Err(PlanError::ProgramOutOfRange {
            instrument: track.instrument_name.clone(),
            program: track.midi_program,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::models::{Clef, InstrumentSpec, SongInfo};

    fn song_info() -> SongInfo {
        SongInfo {
            title: "Rain".to_string(),
            mood: vec!["calm".to_string()],
            genre: "ballad".to_string(),
            bpm: 70,
            key: "C Minor".to_string(),
            time_signature: "4/4".to_string(),
            duration_seconds: 90.0,
        }
    }

    fn plan_with(names: &[&str]) -> Plan {
        Plan {
            song_info: song_info(),
            instrumentation: names
                .iter()
                .map(|n| InstrumentSpec::new(*n, 0, "part"))
                .collect(),
            song_structure: Vec::new(),
        }
    }

    fn track(name: &str) -> Track {
        Track {
            instrument_name: name.to_string(),
            notation: "C D E F |".to_string(),
            clef: Clef::Treble,
            midi_program: 0,
        }
    }

    #[test]
    fn test_accept_resets_backend_statuses() {
        let mut plan = plan_with(&["Piano", "Bass"]);
        plan.instrumentation[0].status = InstrumentStatus::Generated;
        plan.instrumentation[1].status = InstrumentStatus::Generating;

        let accepted = accept_plan(plan).unwrap();
        assert!(accepted
            .instrumentation
            .iter()
            .all(|i| i.status == InstrumentStatus::Pending));
    }

    #[test]
    fn test_accept_rejects_empty_instrumentation() {
        let plan = plan_with(&[]);
        assert_eq!(accept_plan(plan), Err(PlanError::NoInstruments));
    }

    #[test]
    fn test_accept_rejects_zero_tempo() {
        let mut plan = plan_with(&["Piano"]);
        plan.song_info.bpm = 0;
        assert_eq!(accept_plan(plan), Err(PlanError::InvalidTempo));
    }

    #[test]
    fn test_accept_rejects_nonpositive_duration() {
        for duration in [0.0, -5.0, f64::NAN] {
            let mut plan = plan_with(&["Piano"]);
            plan.song_info.duration_seconds = duration;
            assert_eq!(accept_plan(plan), Err(PlanError::InvalidDuration));
        }

        let mut plan = plan_with(&["Piano"]);
        plan.song_info.duration_seconds = 0.5;
        assert!(accept_plan(plan).is_ok());
    }

    #[test]
    fn test_accept_rejects_out_of_range_program() {
        let mut plan = plan_with(&["Piano"]);
        plan.instrumentation[0].midi_program = 200;
        assert!(matches!(
            accept_plan(plan),
            Err(PlanError::ProgramOutOfRange { program: 200, .. })
        ));
    }

    #[test]
    fn test_accept_rejects_blank_name() {
        let plan = plan_with(&["Piano", "   "]);
        assert_eq!(accept_plan(plan), Err(PlanError::UnnamedInstrument(1)));
    }

    #[test]
    fn test_duplicate_names_are_disambiguated() {
        let plan = plan_with(&["Violin", "Violin", "Violin 2", "Violin"]);
        let accepted = accept_plan(plan).unwrap();
        let names: Vec<&str> = accepted
            .instrumentation
            .iter()
            .map(|i| i.instrument_name.as_str())
            .collect();
        assert_eq!(names, vec!["Violin", "Violin 3", "Violin 2", "Violin 4"]);
    }

    #[test]
    fn test_carry_forward_keeps_matching_prefix() {
        let mut plan = plan_with(&["Piano", "Bass", "Drums"]);
        let tracks = vec![track("Piano"), track("Bass")];

        let kept = carry_forward(&mut plan, &tracks);
        assert_eq!(kept, 2);
        assert_eq!(plan.instrumentation[0].status, InstrumentStatus::Generated);
        assert_eq!(plan.instrumentation[1].status, InstrumentStatus::Generated);
        assert_eq!(plan.instrumentation[2].status, InstrumentStatus::Pending);
    }

    #[test]
    fn test_carry_forward_stops_at_first_mismatch() {
        let mut plan = plan_with(&["Piano", "Strings", "Bass"]);
        let tracks = vec![track("Piano"), track("Bass")];

        let kept = carry_forward(&mut plan, &tracks);
        assert_eq!(kept, 1);
        assert_eq!(plan.count_with_status(InstrumentStatus::Generated), 1);
        assert_eq!(plan.instrumentation[2].status, InstrumentStatus::Pending);
    }

    #[test]
    fn test_carry_forward_with_shorter_plan() {
        let mut plan = plan_with(&["Piano"]);
        let tracks = vec![track("Piano"), track("Bass")];
        assert_eq!(carry_forward(&mut plan, &tracks), 1);
    }

    #[test]
    fn test_validate_track_program_range() {
        let mut t = track("Piano");
        assert!(validate_track(&t).is_ok());
        t.midi_program = 128;
        assert!(validate_track(&t).is_err());
    }
}
