pub mod note_parser;
pub mod pitch;
pub mod sheet_parser;
