use crate::BeepError;
use std::fmt;

/// Marker used in place of a pitch for rests
pub const REST_MARKER: char = 'X';

/// Letters starting a new note in a track
pub const NOTE_LETTERS: [char; 8] = ['C', 'D', 'E', 'F', 'G', 'A', 'B', REST_MARKER];

pub const MIN_OCTAVE: i32 = 0;
pub const MAX_OCTAVE: i32 = 8;

/// A4
const REFERENCE_MIDI: i32 = 69;
const REFERENCE_FREQUENCY: f64 = 440.0;

/// Spellings present in the frequency table, C0 being MIDI note 12.
pub const TABLE_SPELLINGS: [&str; 12] = [
    "C", "C#", "D", "Eb", "E", "F", "F#", "G", "Ab", "A", "Bb", "B",
];

/// Enharmonic aliases: (spelling, table spelling, octave shift)
const ALIASES: [(&str, &str, i32); 9] = [
    ("Db", "C#", 0),
    ("D#", "Eb", 0),
    ("Gb", "F#", 0),
    ("G#", "Ab", 0),
    ("A#", "Bb", 0),
    ("Fb", "E", 0),
    ("E#", "F", 0),
    ("Cb", "B", -1),
    ("B#", "C", 1),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pitch {
    Rest,
    Tone { spelling: String, midi: u8 },
}

impl Pitch {
    /// Resolve a spelling such as `C#4`, `Db4` or `X`.
    pub fn parse(spelling: &str) -> Result<Self, BeepError> {
        if spelling.len() == 1 && spelling.starts_with(REST_MARKER) {
            return Ok(Self::Rest);
        }
        let malformed = || BeepError::MalformedNote(spelling.to_string());
        let mut chars = spelling.chars();
        let octave = chars
            .next_back()
            .and_then(|c| c.to_digit(10))
            .ok_or_else(malformed)? as i32;
        let name = chars.as_str();

        let (index, octave) = match TABLE_SPELLINGS.iter().position(|s| *s == name) {
            Some(index) => (index as i32, octave),
            None => {
                let (_, target, shift) = ALIASES
                    .iter()
                    .find(|(alias, _, _)| *alias == name)
                    .ok_or_else(malformed)?;
                log::debug!("Resolved alias {name} -> {target}");
                let index = TABLE_SPELLINGS
                    .iter()
                    .position(|s| s == target)
                    .ok_or_else(malformed)?;
                (index as i32, octave + shift)
            }
        };
        if !(MIN_OCTAVE..=MAX_OCTAVE).contains(&octave) {
            return Err(malformed());
        }
        let midi = index + 12 * (octave + 1);
        Ok(Self::Tone {
            spelling: spelling.to_string(),
            midi: midi as u8,
        })
    }

    pub const fn is_rest(&self) -> bool {
        matches!(self, Self::Rest)
    }

    pub const fn midi(&self) -> Option<u8> {
        match self {
            Self::Rest => None,
            Self::Tone { midi, .. } => Some(*midi),
        }
    }

    /// Frequency in Hz, 0 for rests.
    pub fn frequency(&self) -> f64 {
        match self {
            Self::Rest => 0.0,
            Self::Tone { midi, .. } => {
                let semitones = f64::from(i32::from(*midi) - REFERENCE_MIDI);
                REFERENCE_FREQUENCY * 2.0_f64.powf(semitones / 12.0)
            }
        }
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rest => write!(f, "{REST_MARKER}"),
            Self::Tone { spelling, .. } => write!(f, "{spelling}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{a} != {b}");
    }

    #[test]
    fn test_reference_pitch() {
        let a4 = Pitch::parse("A4").unwrap();
        assert_eq!(a4.midi(), Some(69));
        assert_close(a4.frequency(), 440.0);
        assert_close(Pitch::parse("A5").unwrap().frequency(), 880.0);
        assert_eq!(Pitch::parse("C0").unwrap().midi(), Some(12));
        assert_eq!(Pitch::parse("B8").unwrap().midi(), Some(119));
    }

    #[test]
    fn test_rest() {
        let rest = Pitch::parse("X").unwrap();
        assert!(rest.is_rest());
        assert_eq!(rest.frequency(), 0.0);
        assert_eq!(rest.to_string(), "X");
    }

    #[test]
    fn test_aliases() {
        let pairs = [
            ("Db4", "C#4"),
            ("D#3", "Eb3"),
            ("Gb5", "F#5"),
            ("G#2", "Ab2"),
            ("A#4", "Bb4"),
            ("Fb4", "E4"),
            ("E#4", "F4"),
            ("Cb4", "B3"),
            ("B#3", "C4"),
        ];
        for (alias, spelling) in pairs {
            let alias = Pitch::parse(alias).unwrap();
            let spelling = Pitch::parse(spelling).unwrap();
            assert_eq!(alias.midi(), spelling.midi());
        }
        // keeps the written spelling
        assert_eq!(Pitch::parse("Db4").unwrap().to_string(), "Db4");
    }

    #[test]
    fn test_out_of_table() {
        assert!(matches!(Pitch::parse("Cb0"), Err(BeepError::MalformedNote(n)) if n == "Cb0"));
        assert!(Pitch::parse("B#8").is_err());
        assert!(Pitch::parse("H4").is_err());
        assert!(Pitch::parse("C").is_err());
    }
}
