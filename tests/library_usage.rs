//! Integration tests for text2beep library usage.
//!
//! These tests verify that the library can be used as a dependency
//! from external projects.

use std::path::Path;
use std::thread;
use text2beep::{
    AudioChunk, AudioParams, AudioSink, BeepError, MemorySink, Player, Sheet, SynthesisReport,
    Synthesizer, SynthesizerHub, Track, SAMPLE_RATE,
};

const BAR_SAMPLES: usize = 2 * SAMPLE_RATE as usize;

fn init_logger() {
    env_logger::builder()
        .is_test(true)
        .try_init()
        .unwrap_or_default();
}

/// Test that all major types are accessible from the library.
#[test]
fn test_types_accessible() {
    // If any re-export is missing, this test will fail to compile.
    fn _assert_types() {
        let _: fn(&Path) -> Result<Sheet, BeepError> = Sheet::from_path;
        let _: fn(&str) -> Result<Track, BeepError> = Track::parse;
        let _: u32 = SAMPLE_RATE;
    }

    fn _assert_sink<S: AudioSink>(_: &S) {}
    _assert_sink(&MemorySink::default());
}

/// Test loading and playing a sheet from the test-files directory.
#[test]
fn test_play_simple_sheet() {
    init_logger();
    let sheet = Sheet::from_path(Path::new("test-files/four_tracks.json"))
        .expect("Failed to load test sheet");
    assert!(!sheet.is_composite());

    let mut sink = MemorySink::default();
    Player::new(sheet, AudioParams::default())
        .play(&mut sink)
        .expect("Failed to play test sheet");

    // two full bars and the half bar of the longest tracks
    assert_eq!(sink.samples.len(), BAR_SAMPLES * 5 / 2);
    assert_eq!(sink.writes, 3);
    assert!(sink.finished);
}

/// Test playing a subset of the subsheets through the hub.
#[test]
fn test_play_subsheet_range() {
    init_logger();
    let sheet = Sheet::from_path(Path::new("test-files/subsheets.json"))
        .expect("Failed to load test sheet")
        .select_subsheets(1, 3)
        .expect("Invalid range");

    let mut sink = MemorySink::default();
    Player::new(sheet, AudioParams::default())
        .play(&mut sink)
        .expect("Failed to play test sheet");
    assert_eq!(sink.samples.len(), 2 * BAR_SAMPLES * 5 / 2);
}

/// Test driving a synthesizer directly, as the player does.
#[test]
fn test_synthesizer_report() {
    let Sheet::Simple(sheet) = Sheet::from_path(Path::new("test-files/four_tracks.json")).unwrap()
    else {
        panic!("expected a sheet without subsheets");
    };
    let (synthesizer, mut receiver) = Synthesizer::new(sheet, AudioParams::default());
    let worker = thread::spawn(move || synthesizer.synthesize());

    let mut chunks = Vec::new();
    while let Some(chunk) = receiver.blocking_recv() {
        chunks.push(chunk);
    }
    let report: SynthesisReport = worker.join().unwrap().unwrap();

    assert_eq!(chunks.last(), Some(&AudioChunk::EndOfStream));
    assert_eq!(report.note_value_totals, vec![2.5, 2.5, 2.5, 2.0]);
    assert!(!report.is_matching());
}

/// Test that the hub ends its stream once per run.
#[test]
fn test_hub_single_end_of_stream() {
    let Sheet::Composite(subsheets) =
        Sheet::from_path(Path::new("test-files/subsheets.json")).unwrap()
    else {
        panic!("expected a sheet with subsheets");
    };
    assert_eq!(subsheets.len(), 3);
    let (hub, mut receiver) = SynthesizerHub::new(subsheets, AudioParams::default());
    let worker = thread::spawn(move || hub.synthesize());

    let mut end_of_streams = 0;
    while let Some(chunk) = receiver.blocking_recv() {
        if chunk.is_end_of_stream() {
            end_of_streams += 1;
        }
    }
    assert_eq!(worker.join().unwrap().unwrap().len(), 3);
    assert_eq!(end_of_streams, 1);
}

/// Test error handling for invalid sheets.
#[test]
fn test_load_errors() {
    let err = Sheet::from_path(Path::new("test-files/invalid_note.json")).unwrap_err();
    assert!(matches!(err, BeepError::MalformedNote(ref note) if note == "C9"));
    assert_eq!(err.to_string(), "Invalid note: C9");

    let err = Sheet::from_path(Path::new("test-files/missing.json")).unwrap_err();
    assert!(matches!(err, BeepError::IoError(_)));

    // ranges only apply to sheets with subsheets
    let simple = Sheet::from_path(Path::new("test-files/four_tracks.json"))
        .unwrap()
        .select_subsheets(0, 1);
    assert!(matches!(simple, Ok(Sheet::Simple(_))));

    let err = Sheet::from_path(Path::new("test-files/subsheets.json"))
        .unwrap()
        .select_subsheets(2, 5)
        .unwrap_err();
    assert!(matches!(err, BeepError::SheetError(_)));
}

/// Test the demo sheet tracks line up.
#[test]
fn test_demo_sheet_matching() {
    let Sheet::Simple(sheet) = Sheet::from_path(Path::new("demos/Am-F-G-C.json")).unwrap() else {
        panic!("expected a sheet without subsheets");
    };
    let totals: Vec<f64> = sheet
        .tracks
        .iter()
        .map(|track| track.validate().unwrap())
        .collect();
    assert_eq!(totals, vec![4.0, 4.0, 4.0]);
}
