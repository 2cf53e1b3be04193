use crate::parser::pitch::{Pitch, NOTE_LETTERS, REST_MARKER};
use crate::BeepError;
use nom::branch::alt;
use nom::bytes::complete::take_while;
use nom::character::complete::{char, one_of};
use nom::combinator::{all_consuming, opt, recognize};
use nom::multi::many0;
use nom::sequence::preceded;
use nom::{IResult, Parser};
use std::num::NonZeroUsize;
use std::ops::{Bound, RangeBounds};

/// Lengthens a note by one quarter
pub const EXTEND: char = '-';
/// Halves a note
pub const SHORTEN: char = '/';
pub const DOT: char = '.';
/// Joins two notes of the same pitch
pub const TIE: char = '+';
pub const BAR_SEPARATOR: char = '|';

/// Pitch spelling (`C4`, `Eb3`, `F#5`) or the rest marker
fn parse_pitch(i: &str) -> IResult<&str, &str> {
    alt((
        recognize((
            one_of("ABCDEFG"),
            opt(one_of("b#")),
            one_of("012345678"),
        )),
        recognize(char(REST_MARKER)),
    ))
    .parse(i)
}

fn parse_modifiers(i: &str) -> IResult<&str, &str> {
    take_while(|c: char| c == EXTEND || c == SHORTEN || c == DOT).parse(i)
}

/// One note without ties, e.g. `C4-.`
fn parse_note_part(i: &str) -> IResult<&str, &str> {
    recognize((parse_pitch, parse_modifiers)).parse(i)
}

/// A complete token, possibly made of tied parts
fn parse_note_token(i: &str) -> IResult<&str, Vec<&str>> {
    all_consuming((parse_note_part, many0(preceded(char(TIE), parse_note_part))))
        .map(|(first, rest)| {
            let mut parts = Vec::with_capacity(rest.len() + 1);
            parts.push(first);
            parts.extend(rest);
            parts
        })
        .parse(i)
}

fn ensure_note_valid(token: &str) -> Result<(), BeepError> {
    parse_note_token(token)
        .map(|_| ())
        .map_err(|_| BeepError::MalformedNote(token.to_string()))
}

/// Pitch spelling at the start of a token already matching the grammar
fn pitch_spelling(token: &str) -> Result<&str, BeepError> {
    parse_pitch(token)
        .map(|(_, spelling)| spelling)
        .map_err(|_| BeepError::MalformedNote(token.to_string()))
}

/// Group raw characters into one token per note.
/// A note letter opens a new token unless it follows a tie.
fn split_to_notes(raw_track: &str) -> Vec<String> {
    let mut notes = Vec::new();
    let mut current = String::new();
    for c in raw_track.chars() {
        if c.is_whitespace() || c == BAR_SEPARATOR {
            continue;
        }
        if NOTE_LETTERS.contains(&c) && !current.is_empty() && !current.ends_with(TIE) {
            notes.push(std::mem::take(&mut current));
        }
        current.push(c);
    }
    if !current.is_empty() {
        notes.push(current);
    }
    notes
}

/// Note value of a token in quarter notes.
fn quarter_count(token: &str) -> Result<f64, BeepError> {
    if token.contains(TIE) {
        let first = token.split(TIE).next().unwrap_or_default();
        let spelling = pitch_spelling(first)?;
        let mut total = 0.0;
        for part in token.split(TIE) {
            if !part.starts_with(spelling) {
                return Err(BeepError::MalformedNote(token.to_string()));
            }
            total += quarter_count(part)?;
        }
        return Ok(total);
    }

    let extend = token.matches(EXTEND).count() as i32;
    let shorten = token.matches(SHORTEN).count() as i32;
    let dots = token.matches(DOT).count() as i32;
    // eighths cannot be halves at the same time
    if extend > 0 && shorten > 0 {
        return Err(BeepError::MalformedNote(token.to_string()));
    }

    let dotted = 2.0 - 0.5_f64.powi(dots);
    let value = if extend > 0 {
        let quarters = extend + 1;
        if dots == 0 {
            f64::from(quarters)
        } else if quarters % 4 == 0 {
            // dotted whole notes
            f64::from(quarters) * dotted
        } else if quarters % 2 == 0 {
            // dotted half notes
            f64::from(quarters / 4 * 4) + f64::from(quarters % 4) * dotted
        } else {
            f64::from(quarters - quarters % 2) + f64::from(quarters % 2) * dotted
        }
    } else {
        0.5_f64.powi(shorten) * dotted
    };
    Ok(value)
}

/// Single note to be synthesized
#[derive(Debug, Clone, PartialEq)]
pub struct NoteEvent {
    pub pitch: Pitch,
    /// Fraction of a whole note, a quarter note being 0.25
    pub value: f64,
}

impl NoteEvent {
    pub fn from_token(token: &str) -> Result<Self, BeepError> {
        let value = quarter_count(token)? / 4.0;
        let pitch = Pitch::parse(pitch_spelling(token)?)?;
        Ok(Self { pitch, value })
    }
}

/// Note tokens of a single track, validated against the notation grammar.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Track {
    notes: Vec<String>,
}

impl Track {
    pub fn parse(raw_track: &str) -> Result<Self, BeepError> {
        let notes = split_to_notes(raw_track);
        for note in &notes {
            ensure_note_valid(note)?;
        }
        log::debug!("Parsed track with {} notes", notes.len());
        Ok(Self { notes })
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Raw note tokens with separators removed
    pub fn tokens(&self) -> &[String] {
        &self.notes
    }

    /// Fresh lazy iteration over the notes of the track.
    pub fn iter(&self) -> Notes<'_> {
        Notes {
            tokens: self.notes.iter(),
        }
    }

    /// Bounded iteration similar to slicing with start, stop and step.
    pub fn iter_slice<R>(&self, range: R, step: NonZeroUsize) -> std::iter::StepBy<Notes<'_>>
    where
        R: RangeBounds<usize>,
    {
        let start = match range.start_bound() {
            Bound::Included(&s) => s,
            Bound::Excluded(&s) => s.saturating_add(1),
            Bound::Unbounded => 0,
        };
        let end = match range.end_bound() {
            Bound::Included(&e) => e.saturating_add(1),
            Bound::Excluded(&e) => e,
            Bound::Unbounded => usize::MAX,
        };
        let end = end.min(self.notes.len());
        let start = start.min(end);
        Notes {
            tokens: self.notes[start..end].iter(),
        }
        .step_by(step.get())
    }

    /// Evaluate every note once, returning the total note value.
    pub fn validate(&self) -> Result<f64, BeepError> {
        self.iter().try_fold(0.0, |total, note| Ok(total + note?.value))
    }
}

impl<'a> IntoIterator for &'a Track {
    type Item = Result<NoteEvent, BeepError>;
    type IntoIter = Notes<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Notes of a track, evaluated on demand.
#[derive(Debug, Clone)]
pub struct Notes<'a> {
    tokens: std::slice::Iter<'a, String>,
}

impl Iterator for Notes<'_> {
    type Item = Result<NoteEvent, BeepError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.tokens.next().map(|token| NoteEvent::from_token(token))
    }

    fn nth(&mut self, n: usize) -> Option<Self::Item> {
        // skipped tokens are never evaluated
        self.tokens.nth(n).map(|token| NoteEvent::from_token(token))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.tokens.size_hint()
    }
}

impl ExactSizeIterator for Notes<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(raw_track: &str) -> Vec<f64> {
        Track::parse(raw_track)
            .unwrap()
            .iter()
            .map(|note| note.unwrap().value)
            .collect()
    }

    fn step(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn test_scale() {
        let track = Track::parse("C4D4E4F4G4A4B4").unwrap();
        assert_eq!(track.len(), 7);
        let notes: Vec<NoteEvent> = track.iter().map(Result::unwrap).collect();
        assert_eq!(notes.len(), 7);
        for note in &notes {
            assert_eq!(note.value, 0.25);
            assert!(!note.pitch.is_rest());
        }
        assert_eq!(notes[0].pitch.to_string(), "C4");
        assert_eq!(notes[6].pitch.to_string(), "B4");
    }

    #[test]
    fn test_iterations_are_independent() {
        let track = Track::parse("C4 D4 E4").unwrap();
        let mut first = track.iter();
        first.next();
        let second: Vec<_> = track.iter().collect();
        assert_eq!(second.len(), 3);
        assert_eq!(first.count(), 2);
    }

    #[test]
    fn test_note_values() {
        let expected = [0.5, 1.0, 0.5, 0.25, 1.5, 0.875, 0.75, 0.375, 0.125, 0.1875];
        let actual = values("C4+C4 C4--- C4- C4 C4---. C4--. C4-. C4. C4/ C4/.");
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_long_dotted_notes() {
        // two whole notes, dotted
        assert_eq!(values("C4-------."), vec![3.0]);
        // whole note plus dotted half
        assert_eq!(values("C4-----."), vec![1.75]);
        // whole note plus dotted quarter
        assert_eq!(values("C4----."), vec![1.375]);
        assert_eq!(values("C4--.."), vec![0.9375]);
    }

    #[test]
    fn test_separators_and_rests() {
        let track = Track::parse("C4- | X- |\nE4/ X/.").unwrap();
        assert_eq!(track.tokens(), ["C4-", "X-", "E4/", "X/."]);
        let notes: Vec<NoteEvent> = track.iter().map(Result::unwrap).collect();
        assert!(notes[1].pitch.is_rest());
        assert_eq!(notes[1].value, 0.5);
        assert_eq!(notes[3].value, 0.1875);
    }

    #[test]
    fn test_ties_across_separators() {
        let track = Track::parse("Eb4- | + Eb4 D#4").unwrap();
        assert_eq!(track.tokens(), ["Eb4-+Eb4", "D#4"]);
        assert_eq!(values("Eb4- | + Eb4 D#4"), vec![0.75, 0.25]);
        assert_eq!(values("X+X/"), vec![0.375]);
    }

    #[test]
    fn test_invalid_note() {
        let err = Track::parse("An invalid note").unwrap_err();
        assert!(matches!(&err, BeepError::MalformedNote(n) if n == "Aninvalidnote"));
        assert_eq!(err.to_string(), "Invalid note: Aninvalidnote");

        assert!(matches!(Track::parse("C9"), Err(BeepError::MalformedNote(n)) if n == "C9"));
        assert!(matches!(Track::parse("4C4"), Err(BeepError::MalformedNote(n)) if n == "4"));
        assert!(matches!(Track::parse("X4"), Err(BeepError::MalformedNote(n)) if n == "X4"));
        assert!(matches!(
            Track::parse("C4 Db4+x"),
            Err(BeepError::MalformedNote(n)) if n == "Db4+x"
        ));
    }

    #[test]
    fn test_extend_and_shorten_conflict() {
        let track = Track::parse("C4-/").unwrap();
        let err = track.iter().collect::<Result<Vec<_>, _>>().unwrap_err();
        assert_eq!(err.to_string(), "Invalid note: C4-/");
        assert!(track.validate().is_err());
    }

    #[test]
    fn test_tie_pitch_mismatch() {
        let track = Track::parse("C4+C5").unwrap();
        let err = track.iter().collect::<Result<Vec<_>, _>>().unwrap_err();
        assert!(matches!(err, BeepError::MalformedNote(n) if n == "C4+C5"));

        let track = Track::parse("C4 C#4+C4-").unwrap();
        let err = track.validate().unwrap_err();
        assert!(matches!(err, BeepError::MalformedNote(n) if n == "C#4+C4-"));
    }

    #[test]
    fn test_iter_slice() {
        let track = Track::parse("C4D4E4F4G4A4B4").unwrap();
        assert_eq!(track.iter_slice(.., step(1)).count(), 7);
        assert_eq!(track.iter_slice(..3, step(1)).count(), 3);
        assert_eq!(track.iter_slice(..5, step(1)).count(), 5);
        assert_eq!(track.iter_slice(.., step(2)).count(), 4);
        assert_eq!(track.iter_slice(1..3, step(1)).count(), 2);
        assert_eq!(track.iter_slice(1.., step(2)).count(), 3);
        assert_eq!(track.iter_slice(..5, step(2)).count(), 3);
        assert_eq!(track.iter_slice(1..5, step(2)).count(), 2);
        assert_eq!(track.iter_slice(5..100, step(1)).count(), 2);

        let picked: Vec<String> = track
            .iter_slice(1..5, step(2))
            .map(|note| note.unwrap().pitch.to_string())
            .collect();
        assert_eq!(picked, ["D4", "F4"]);
    }

    #[test]
    fn test_validate_total() {
        let track = Track::parse("C4- D4 E4/ E4/").unwrap();
        assert_eq!(track.validate().unwrap(), 1.0);
        assert_eq!(Track::parse("").unwrap().validate().unwrap(), 0.0);
    }
}
