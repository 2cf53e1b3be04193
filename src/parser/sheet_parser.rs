use crate::parser::note_parser::Track;
use crate::BeepError;
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

/// Sheet holding a single tempo, time signature and set of tracks.
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleSheet {
    pub bpm: f64,
    pub numerator: u32,
    pub denominator: u32,
    pub tracks: Vec<Track>,
}

impl SimpleSheet {
    pub fn new(
        bpm: f64,
        numerator: u32,
        denominator: u32,
        tracks: Vec<Track>,
    ) -> Result<Self, BeepError> {
        if !(bpm.is_finite() && bpm > 0.0) {
            return Err(BeepError::SheetError(format!("Invalid bpm {bpm}")));
        }
        if numerator == 0 || denominator == 0 {
            return Err(BeepError::SheetError(format!(
                "Invalid time signature {numerator}/{denominator}"
            )));
        }
        if tracks.is_empty() {
            return Err(BeepError::SheetError("Sheet without tracks".to_string()));
        }
        // surface note errors at load time rather than during playback
        for track in &tracks {
            track.validate()?;
        }
        Ok(Self {
            bpm,
            numerator,
            denominator,
            tracks,
        })
    }

    /// Duration of a beat in seconds
    pub fn beat_duration(&self) -> f64 {
        60.0 / self.bpm
    }

    /// Duration of a bar in seconds
    pub fn bar_duration(&self) -> f64 {
        self.beat_duration() * f64::from(self.numerator)
    }
}

/// Either a plain sheet or an ordered list of subsheets, decided once at load.
#[derive(Debug, Clone, PartialEq)]
pub enum Sheet {
    Simple(Arc<SimpleSheet>),
    Composite(Vec<Arc<SimpleSheet>>),
}

impl Sheet {
    pub fn from_path(path: &Path) -> Result<Self, BeepError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let raw: RawSheet = serde_json::from_reader(reader).map_err(|err| {
            BeepError::SheetError(format!("Could not read sheet {}: {err}", path.display()))
        })?;
        raw.into_sheet()
    }

    pub fn from_json_str(json: &str) -> Result<Self, BeepError> {
        let raw: RawSheet = serde_json::from_str(json)
            .map_err(|err| BeepError::SheetError(format!("Could not read sheet: {err}")))?;
        raw.into_sheet()
    }

    pub const fn is_composite(&self) -> bool {
        matches!(self, Self::Composite(_))
    }

    /// Keep subsheets `start..end` of a composite sheet.
    pub fn select_subsheets(self, start: usize, end: usize) -> Result<Self, BeepError> {
        match self {
            Self::Simple(sheet) => {
                log::warn!("Ignoring range {start},{end} for a sheet without subsheets");
                Ok(Self::Simple(sheet))
            }
            Self::Composite(subsheets) => {
                if start >= end || end > subsheets.len() {
                    return Err(BeepError::SheetError(format!(
                        "Invalid subsheet range {start},{end} for {} subsheets",
                        subsheets.len()
                    )));
                }
                Ok(Self::Composite(subsheets[start..end].to_vec()))
            }
        }
    }
}

/// Track written either as one string or as a list of lines
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawTrack {
    Line(String),
    Lines(Vec<String>),
}

impl RawTrack {
    fn to_track(&self) -> Result<Track, BeepError> {
        match self {
            Self::Line(line) => Track::parse(line),
            Self::Lines(lines) => Track::parse(&lines.concat()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawSimpleSheet {
    bpm: f64,
    time_signature: String,
    tracks: Vec<RawTrack>,
}

impl RawSimpleSheet {
    fn into_sheet(self) -> Result<SimpleSheet, BeepError> {
        let (numerator, denominator) = parse_time_signature(&self.time_signature)?;
        let tracks = self
            .tracks
            .iter()
            .map(RawTrack::to_track)
            .collect::<Result<Vec<_>, _>>()?;
        SimpleSheet::new(self.bpm, numerator, denominator, tracks)
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawSheet {
    Simple(RawSimpleSheet),
    Composite { subsheets: Vec<RawSimpleSheet> },
}

impl RawSheet {
    fn into_sheet(self) -> Result<Sheet, BeepError> {
        match self {
            Self::Simple(raw) => Ok(Sheet::Simple(Arc::new(raw.into_sheet()?))),
            Self::Composite { subsheets } => {
                if subsheets.is_empty() {
                    return Err(BeepError::SheetError("Sheet without subsheets".to_string()));
                }
                let subsheets = subsheets
                    .into_iter()
                    .map(|raw| raw.into_sheet().map(Arc::new))
                    .collect::<Result<Vec<_>, _>>()?;
                log::debug!("Loaded {} subsheets", subsheets.len());
                Ok(Sheet::Composite(subsheets))
            }
        }
    }
}

/// Parse a time signature such as `3/4`
pub fn parse_time_signature(time_signature: &str) -> Result<(u32, u32), BeepError> {
    let invalid = || BeepError::SheetError(format!("Invalid time signature {time_signature}"));
    let (numerator, denominator) = time_signature.split_once('/').ok_or_else(invalid)?;
    let numerator = numerator.trim().parse().map_err(|_| invalid())?;
    let denominator = denominator.trim().parse().map_err(|_| invalid())?;
    Ok((numerator, denominator))
}
