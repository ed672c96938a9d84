use fnv::FnvHashMap;
use std::collections::BTreeMap;
use std::str::FromStr;
use thiserror::Error;

use crate::database::{ByteOrder, Database, Message, Signal, ValueTable, ValueType};
use crate::tokenizer::{DbcLine, Directive, SignalFields, scan_value_pairs};
use crate::{DbcError, ItemList};

pub(crate) struct ParserState<'a> {
    lines: &'a [DbcLine<'a>],
    filename: &'a str,
    log_msgs: &'a mut Vec<DbcError>,
    strict: bool,
}

/// intermediate data that is collected while the passes over the input run
///
/// A new builder is created for every parse. It is passed to each pass and finally
/// converted into the immutable [`Database`].
#[derive(Debug, Default)]
pub(crate) struct DbcBuilder {
    messages: ItemList<Message>,
    ecus: Vec<String>,
    value_tables: BTreeMap<String, ValueTable>,
    comments: FnvHashMap<CommentTarget, PendingComment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum CommentTarget {
    Message(u64),
    Signal(u64, String),
}

#[derive(Debug)]
struct PendingComment {
    text: String,
    line: u32,
}

// states of the message block parser
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockState {
    // looking for the next BO_ line
    Scanning,
    // signals are added to the message with this id
    InBlock(u64),
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ParserError {
    #[error("{filename}:{error_line}: string \"{numstr}\" in {directive} could not be interpreted as a number")]
    MalformedNumber {
        filename: String,
        error_line: u32,
        directive: String,
        numstr: String,
    },

    #[error("{filename}:{error_line}: message {can_id} was already declared on line {previous_line}; the earlier declaration is discarded")]
    DuplicateMessage {
        filename: String,
        error_line: u32,
        can_id: u64,
        previous_line: u32,
    },

    #[error("{filename}:{error_line}: additional node list is ignored, nodes were already declared on line {previous_line}")]
    DuplicateNodeList {
        filename: String,
        error_line: u32,
        previous_line: u32,
    },

    #[error("{filename}:{error_line}: comment refers to {target}, which does not exist")]
    UnresolvedComment {
        filename: String,
        error_line: u32,
        target: String,
    },

    #[error("{filename}:{error_line}: value descriptions refer to signal {signal} of message {can_id}, which does not exist")]
    UnresolvedValueDescription {
        filename: String,
        error_line: u32,
        can_id: String,
        signal: String,
    },

    #[error("{filename}:{error_line}: unsupported signal definition \"{text}\" ends message {can_id}")]
    UnsupportedSignal {
        filename: String,
        error_line: u32,
        can_id: u64,
        text: String,
    },

    #[error("{filename}:{error_line}: signal {signal} does not belong to any message")]
    OrphanSignal {
        filename: String,
        error_line: u32,
        signal: String,
    },
}

impl<'a> ParserState<'a> {
    pub(crate) fn new(
        lines: &'a [DbcLine<'a>],
        filename: &'a str,
        log_msgs: &'a mut Vec<DbcError>,
        strict: bool,
    ) -> Self {
        Self {
            lines,
            filename,
            log_msgs,
            strict,
        }
    }

    pub(crate) fn parse_file(&mut self) -> Result<Database, ParserError> {
        let mut builder = DbcBuilder::default();

        self.parse_node_list(&mut builder)?;
        self.parse_value_tables(&mut builder)?;
        self.parse_messages(&mut builder)?;
        self.parse_comments(&mut builder)?;
        self.parse_signal_values(&mut builder)?;

        self.assemble(builder)
    }

    pub(crate) fn log_warning(&mut self, parse_error: ParserError) {
        self.log_msgs.push(DbcError::ParserError {
            parser_error: parse_error,
        });
    }

    pub(crate) fn error_or_log(&mut self, err: ParserError) -> Result<(), ParserError> {
        if self.strict {
            Err(err)
        } else {
            self.log_warning(err);
            Ok(())
        }
    }

    // parse_node_list()
    // only the first BU_ line is used
    fn parse_node_list(&mut self, builder: &mut DbcBuilder) -> Result<(), ParserError> {
        let mut node_list_line = None;
        for dbcline in self.lines {
            if let Directive::NodeList { nodes } = &dbcline.directive {
                if let Some(previous_line) = node_list_line {
                    self.error_or_log(ParserError::DuplicateNodeList {
                        filename: self.filename.to_string(),
                        error_line: dbcline.line,
                        previous_line,
                    })?;
                } else {
                    builder.ecus = nodes.iter().map(|node| (*node).to_string()).collect();
                    node_list_line = Some(dbcline.line);
                }
            }
        }
        Ok(())
    }

    // parse_value_tables()
    // a later VAL_TABLE_ with the same name replaces the earlier one
    fn parse_value_tables(&mut self, builder: &mut DbcBuilder) -> Result<(), ParserError> {
        for dbcline in self.lines {
            if let Directive::ValueTable { name, pairs } = &dbcline.directive {
                let table = self.get_value_table(dbcline, "VAL_TABLE_", pairs)?;
                builder.value_tables.insert((*name).to_string(), table);
            }
        }
        Ok(())
    }

    // parse_messages()
    // Each BO_ line opens a block, which contains all directly following SG_ lines.
    // The first line that is not a signal ends the block; it is not consumed and is
    // checked again in the Scanning state, because it may open the next block.
    fn parse_messages(&mut self, builder: &mut DbcBuilder) -> Result<(), ParserError> {
        let lines = self.lines;
        let mut state = BlockState::Scanning;
        let mut pos = 0;

        while pos < lines.len() {
            let dbcline = &lines[pos];
            match (state, &dbcline.directive) {
                (
                    BlockState::Scanning,
                    Directive::Message {
                        id,
                        name,
                        dlc,
                        sender,
                    },
                ) => {
                    let can_id = self.get_integer(dbcline, "BO_", id)?;
                    let mut message = Message::new(
                        can_id,
                        (*name).to_string(),
                        self.get_integer(dbcline, "BO_", dlc)?,
                        (*sender).to_string(),
                    );
                    message.line = dbcline.line;
                    if let Some(previous) = builder.messages.push(message) {
                        self.error_or_log(ParserError::DuplicateMessage {
                            filename: self.filename.to_string(),
                            error_line: dbcline.line,
                            can_id,
                            previous_line: previous.line,
                        })?;
                    }
                    state = BlockState::InBlock(can_id);
                    pos += 1;
                }
                (BlockState::Scanning, Directive::Signal(fields)) => {
                    self.error_or_log(ParserError::OrphanSignal {
                        filename: self.filename.to_string(),
                        error_line: dbcline.line,
                        signal: fields.name.to_string(),
                    })?;
                    pos += 1;
                }
                (BlockState::Scanning, _) => {
                    pos += 1;
                }
                (BlockState::InBlock(can_id), Directive::Signal(fields)) => {
                    let signal = self.get_signal(dbcline, fields)?;
                    if let Some(message) = builder.messages.get_mut(can_id) {
                        message.signals.push(signal);
                    }
                    pos += 1;
                }
                (BlockState::InBlock(can_id), directive) => {
                    if matches!(directive, Directive::UnsupportedSignal) {
                        self.error_or_log(ParserError::UnsupportedSignal {
                            filename: self.filename.to_string(),
                            error_line: dbcline.line,
                            can_id,
                            text: dbcline.text.to_string(),
                        })?;
                    }
                    // end of block; the same line is examined again
                    state = BlockState::Scanning;
                }
            }
        }

        Ok(())
    }

    fn get_signal(&self, dbcline: &DbcLine, fields: &SignalFields) -> Result<Signal, ParserError> {
        let byte_order = if fields.byte_order == b'1' {
            ByteOrder::Little
        } else {
            ByteOrder::Big
        };
        let value_type = if fields.value_type == b'-' {
            ValueType::Signed
        } else {
            ValueType::Unsigned
        };

        let mut signal = Signal::new(
            fields.name.to_string(),
            self.get_integer(dbcline, "SG_", fields.start_bit)?,
            self.get_integer(dbcline, "SG_", fields.bit_length)?,
            byte_order,
            value_type,
        );
        signal.factor = self.get_double(dbcline, "SG_", fields.factor)?;
        signal.offset = self.get_double(dbcline, "SG_", fields.offset)?;
        signal.minimum = self.get_double(dbcline, "SG_", fields.minimum)?;
        signal.maximum = self.get_double(dbcline, "SG_", fields.maximum)?;
        signal.unit = fields.unit.to_string();
        signal.receivers = fields
            .receivers
            .split(',')
            .map(str::trim)
            .filter(|receiver| !receiver.is_empty())
            .map(str::to_string)
            .collect();
        signal.line = dbcline.line;

        Ok(signal)
    }

    // parse_comments()
    // later comments for the same message or signal replace earlier ones
    fn parse_comments(&mut self, builder: &mut DbcBuilder) -> Result<(), ParserError> {
        for dbcline in self.lines {
            let (target, text) = match &dbcline.directive {
                Directive::MessageComment { id, text } => match parse_message_id(id) {
                    Some(can_id) => (CommentTarget::Message(can_id), text),
                    None => {
                        self.unresolved_comment(dbcline, format!("message {id}"))?;
                        continue;
                    }
                },
                Directive::SignalComment { id, signal, text } => match parse_message_id(id) {
                    Some(can_id) => (CommentTarget::Signal(can_id, (*signal).to_string()), text),
                    None => {
                        self.unresolved_comment(dbcline, format!("signal {signal} of message {id}"))?;
                        continue;
                    }
                },
                _ => continue,
            };
            builder.comments.insert(
                target,
                PendingComment {
                    text: (*text).to_string(),
                    line: dbcline.line,
                },
            );
        }
        Ok(())
    }

    fn unresolved_comment(&mut self, dbcline: &DbcLine, target: String) -> Result<(), ParserError> {
        self.error_or_log(ParserError::UnresolvedComment {
            filename: self.filename.to_string(),
            error_line: dbcline.line,
            target,
        })
    }

    // parse_signal_values()
    // VAL_ lines attach a value table to a signal of a message that was declared in the file
    fn parse_signal_values(&mut self, builder: &mut DbcBuilder) -> Result<(), ParserError> {
        for dbcline in self.lines {
            if let Directive::SignalValues { id, signal, pairs } = &dbcline.directive {
                let table = self.get_value_table(dbcline, "VAL_", pairs)?;

                let target = parse_message_id(id)
                    .and_then(|can_id| builder.messages.get_mut(can_id))
                    .and_then(|message| message.get_signal_mut(signal));
                if let Some(target_signal) = target {
                    target_signal.value_table = Some(table);
                } else {
                    self.error_or_log(ParserError::UnresolvedValueDescription {
                        filename: self.filename.to_string(),
                        error_line: dbcline.line,
                        can_id: (*id).to_string(),
                        signal: (*signal).to_string(),
                    })?;
                }
            }
        }
        Ok(())
    }

    // assemble()
    // attach the comments and build the final database
    fn assemble(&mut self, builder: DbcBuilder) -> Result<Database, ParserError> {
        let DbcBuilder {
            mut messages,
            ecus,
            value_tables,
            comments,
        } = builder;

        // sorted by line, so that warnings appear in file order
        let mut comments: Vec<(CommentTarget, PendingComment)> = comments.into_iter().collect();
        comments.sort_by_key(|(_, comment)| comment.line);

        for (target, comment) in comments {
            let destination = match &target {
                CommentTarget::Message(can_id) => messages
                    .get_mut(*can_id)
                    .map(|message| &mut message.comment),
                CommentTarget::Signal(can_id, signal_name) => messages
                    .get_mut(*can_id)
                    .and_then(|message| message.get_signal_mut(signal_name))
                    .map(|signal| &mut signal.comment),
            };
            if let Some(destination) = destination {
                *destination = comment.text;
            } else {
                self.error_or_log(ParserError::UnresolvedComment {
                    filename: self.filename.to_string(),
                    error_line: comment.line,
                    target: target.to_string(),
                })?;
            }
        }

        let version = self
            .lines
            .iter()
            .find_map(|dbcline| match dbcline.directive {
                Directive::Version { text } => Some(text.to_string()),
                _ => None,
            })
            .unwrap_or_default();

        Ok(Database {
            messages,
            ecus,
            version,
            value_tables,
        })
    }

    fn get_value_table(
        &self,
        dbcline: &DbcLine,
        directive: &str,
        pairs: &str,
    ) -> Result<ValueTable, ParserError> {
        let mut table = ValueTable::new();
        for (number, label) in scan_value_pairs(pairs) {
            let raw = self.get_integer(dbcline, directive, number)?;
            table.insert(raw, label.to_string());
        }
        Ok(table)
    }

    // get_integer()
    // the tokenizer only guarantees that the text consists of digits; it may still be out of range
    fn get_integer<T: FromStr>(
        &self,
        dbcline: &DbcLine,
        directive: &str,
        text: &str,
    ) -> Result<T, ParserError> {
        text.parse()
            .map_err(|_| ParserError::malformed_number(self, dbcline, directive, text))
    }

    // get_double()
    // the tokenizer accepts any text in the places where floating point values are expected.
    // "inf" and "NaN" are accepted by str::parse, but they are not numbers in a dbc file.
    fn get_double(&self, dbcline: &DbcLine, directive: &str, text: &str) -> Result<f64, ParserError> {
        text.trim()
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .ok_or_else(|| ParserError::malformed_number(self, dbcline, directive, text))
    }
}

// parse_message_id()
// id of a message referenced by CM_ or VAL_. The tokenizer only accepts digits here, so a
// failure means that the id is too large to belong to any message.
fn parse_message_id(text: &str) -> Option<u64> {
    text.parse().ok()
}

impl ParserError {
    pub(crate) fn malformed_number(
        parser: &ParserState,
        dbcline: &DbcLine,
        directive: &str,
        numstr: &str,
    ) -> Self {
        Self::MalformedNumber {
            filename: parser.filename.to_string(),
            error_line: dbcline.line,
            directive: directive.to_string(),
            numstr: numstr.to_owned(),
        }
    }
}

impl std::fmt::Display for CommentTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommentTarget::Message(can_id) => write!(f, "message {can_id}"),
            CommentTarget::Signal(can_id, signal) => {
                write!(f, "signal {signal} of message {can_id}")
            }
        }
    }
}
