//! dbcfile is a library that reads, checks and writes CAN database (dbc) files.
//!
//! A dbc file describes the messages on a CAN bus: the nodes, every message with its id,
//! length and sender, and the signals inside each message with their bit layout and scaling.
//! Comments and value descriptions from the file are attached to the messages and signals.
//!
//! Lines that are not understood are skipped, so files containing directives that are not
//! supported (attributes, multiplexing, environment variables, ...) can still be loaded.
//! Numbers inside a recognized directive must be valid, otherwise loading fails.
//!
//! # Features
//!
//! - `check`: perform a consistency check on the data

#[cfg(feature = "check")]
mod checker;
mod database;
mod export;
mod itemlist;
mod loader;
mod parser;
mod tokenizer;
mod writer;

pub use database::{ByteOrder, Database, Message, Signal, ValueTable, ValueType};
pub use itemlist::ItemList;
pub use parser::ParserError;
use parser::ParserState;
use std::convert::AsRef;
use std::path::Path;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DbcError {
    /// `FileOpenError`: An `IoError` that occurred while loading a file
    #[error("Failed to load {filename}: {ioerror}")]
    FileOpenError {
        filename: PathBuf,
        ioerror: std::io::Error,
    },

    /// `FileReadError`: An `IoError` that occurred while reading from a file
    #[error("Could not read from {filename}: {ioerror}")]
    FileReadError {
        filename: PathBuf,
        ioerror: std::io::Error,
    },

    /// `ParserError`: Invalid data, the file could not be parsed
    #[error("Parser error: {parser_error}")]
    ParserError { parser_error: ParserError },

    /// `FileWriteError`: An `IoError` that occurred while writing to a file
    #[error("Could not write to {filename}: {ioerror}")]
    FileWriteError {
        filename: PathBuf,
        ioerror: std::io::Error,
    },

    /// `CrossReferenceError`: A reference to a non-existent item was found
    #[error(
        "Cross-reference error: {source_type} {source_name} on line {source_line} references a non-existent {target_type} {target_name}"
    )]
    CrossReferenceError {
        source_type: String,
        source_name: String,
        source_line: u32,
        target_type: String,
        target_name: String,
    },

    /// `LimitCheckError`: The given limits are outside of the limits that the raw value can represent
    #[error(
        "Limit check error: {blockname} {item_name} on line {line} has limits {lower_limit} .. {upper_limit}, but the calculated limits are {calculated_lower_limit} .. {calculated_upper_limit}"
    )]
    LimitCheckError {
        item_name: String,
        blockname: String,
        line: u32,
        lower_limit: f64,
        upper_limit: f64,
        calculated_lower_limit: f64,
        calculated_upper_limit: f64,
    },

    /// `ContentError`: A message or signal contains invalid content of some description
    #[error("Content error: {blockname} {item_name} on line {line}: {description}")]
    ContentError {
        item_name: String,
        blockname: String,
        line: u32,
        description: String,
    },
}

/// items in an [`ItemList`] are identified by a numeric id
pub trait DbcObjectId {
    /// get the id of the item, e.g. the CAN id of a [`Message`]
    ///
    /// The id must not change while the item is stored in an [`ItemList`].
    fn get_id(&self) -> u64;
}

/**
Load a dbc file

`strict_parsing` toggles strict parsing: If strict parsing is enabled, all warnings become errors.

The returned `Vec<DbcError>` contains the warnings generated during parsing, e.g. for
comments that refer to messages which do not exist.

# Example
```
# use dbcfile::DbcError;
match dbcfile::load("example.dbc", false) {
    Ok((database, log_messages)) => {/* do something with it*/},
    Err(error_message) => println!("{error_message}")
}
```

# Errors

A `DbcError` provides detailed information if loading the file fails.
 */
pub fn load<P: AsRef<Path>>(
    path: P,
    strict_parsing: bool,
) -> Result<(Database, Vec<DbcError>), DbcError> {
    let pathref = path.as_ref();
    let filedata = loader::load(pathref)?;
    load_impl(pathref, &filedata, strict_parsing)
}

/**
load dbc data stored in a string

`dbcdata` contains the text of a dbc file.

`strict_parsing` toggles strict parsing: If strict parsing is enabled, all warnings become errors.

# Example

```rust
# use dbcfile::DbcError;
# fn main() -> Result<(), DbcError> {
let text = r#"
BU_: ECU1 ECU2
BO_ 500 SpeedData: 8 ECU1
 SG_ Speed : 0|16@1+ (0.01,0) [0|655.35] "km/h" ECU2
"#;
let (database, log_msgs) = dbcfile::load_from_string(text, true)?;
assert_eq!(database.messages[0].signals[0].name, "Speed");
assert!(log_msgs.is_empty());
# Ok(())
# }
```

# Errors

A `DbcError` provides detailed information if loading the data fails.
 */
pub fn load_from_string(
    dbcdata: &str,
    strict_parsing: bool,
) -> Result<(Database, Vec<DbcError>), DbcError> {
    load_impl(Path::new(""), dbcdata, strict_parsing)
}

fn load_impl(
    path: &Path,
    filedata: &str,
    strict_parsing: bool,
) -> Result<(Database, Vec<DbcError>), DbcError> {
    let mut log_msgs = Vec::<DbcError>::new();
    let filename = path.to_string_lossy();

    // split the input into classified lines
    let lines = tokenizer::tokenize(filedata);

    // build the database from the lines; the parser state is local to this call
    let mut parser = ParserState::new(&lines, &filename, &mut log_msgs, strict_parsing);
    let database = parser
        .parse_file()
        .map_err(|parser_error| DbcError::ParserError { parser_error })?;

    Ok((database, log_msgs))
}

impl Database {
    /// write this `Database` to the given file in dbc format
    ///
    /// # Errors
    ///
    /// [`DbcError::FileWriteError`] if writing the file fails.
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<(), DbcError> {
        let file_text = self.write_to_string();

        std::fs::write(&path, file_text).map_err(|ioerror| DbcError::FileWriteError {
            filename: path.as_ref().to_path_buf(),
            ioerror,
        })?;

        Ok(())
    }

    #[cfg(feature = "check")]
    /// perform a consistency check on the data.
    #[must_use]
    pub fn check(&self) -> Vec<DbcError> {
        checker::check(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const SPEED_DBC: &str = r#"
BU_: ECU1 ECU2
BO_ 500 SpeedData: 8 ECU1
 SG_ Speed : 0|16@1+ (0.01,0) [0|655.35] "km/h" ECU2,ECU3
CM_ SG_ 500 Speed "vehicle speed";
VAL_ 500 Speed 0 "Stopped" 1 "Moving" ;
"#;

    #[test]
    fn load_empty_string() {
        let (database, log_msgs) = load_from_string("", true).unwrap();
        assert!(database.messages.is_empty());
        assert!(database.ecus.is_empty());
        assert_eq!(database.version, "");
        assert!(log_msgs.is_empty());
    }

    #[test]
    fn test_load_file() {
        let dir = tempdir().unwrap();

        // create a file in a temp directory and load it
        let path = dir.path().join("test.dbc");
        std::fs::write(&path, SPEED_DBC).unwrap();

        let (database, _) = load(&path, false).unwrap();
        assert_eq!(database.messages[0].name, "SpeedData");

        // try to load a file that does not exist
        let nonexistent_path = dir.path().join("nonexistent.dbc");
        let result = load(&nonexistent_path, false);
        assert!(matches!(result, Err(DbcError::FileOpenError { .. })));
    }

    #[test]
    fn error_contains_filename() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.dbc");
        std::fs::write(&path, "BO_ 1 Msg: 8 ECU\n SG_ S : 0|8@1+ (1,0) [0|x] \"\" ECU\n").unwrap();

        let error = load(&path, false).unwrap_err();
        assert!(matches!(
            error,
            DbcError::ParserError {
                parser_error: ParserError::MalformedNumber { error_line: 2, .. }
            }
        ));
        assert!(error.to_string().contains("broken.dbc:2"));
    }

    #[test]
    fn strict_parsing() {
        let text = "BO_ 1 Msg: 8 ECU\nCM_ BO_ 2 \"nothing\";\n";

        // strict parsing off - warning only
        let (database, log_msgs) = load_from_string(text, false).unwrap();
        assert_eq!(database.messages.len(), 1);
        assert_eq!(log_msgs.len(), 1);

        // strict parsing on - error
        let result = load_from_string(text, true);
        assert!(matches!(
            result,
            Err(DbcError::ParserError {
                parser_error: ParserError::UnresolvedComment { .. }
            })
        ));
    }

    #[test]
    fn write_nonexistent_file() {
        let (database, _) = load_from_string(SPEED_DBC, false).unwrap();
        let result = database.write("__NONEXISTENT__/__FILE__/__PATH__/test.dbc");
        assert!(matches!(result, Err(DbcError::FileWriteError { .. })));
    }

    #[test]
    fn write_and_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.dbc");

        let (database, _) = load_from_string(SPEED_DBC, false).unwrap();
        database.write(&path).unwrap();
        let (reloaded, log_msgs) = load(&path, true).unwrap();
        assert_eq!(database, reloaded);
        assert!(log_msgs.is_empty());
    }
}
