use std::fmt::Write;

use crate::database::{Database, Message, Signal, ValueTable};

// sender of messages that have no sender
const NO_NODE: &str = "Vector__XXX";

#[derive(Debug)]
pub(crate) struct Writer {
    indent: usize,
    outstring: String,
}

impl Writer {
    pub(crate) fn new(indent: usize) -> Self {
        Self {
            indent,
            outstring: String::with_capacity(1024),
        }
    }

    // add a string to the output and prefix it with whitespace
    pub(crate) fn add_str(&mut self, text: &str, offset: u32) {
        self.add_whitespace(offset);
        self.outstring.push_str(text);
    }

    // add a string directly after the previous item, without any separation
    pub(crate) fn add_str_raw(&mut self, text: &str) {
        self.outstring.push_str(text);
    }

    // Strings in dbc files have no escape sequences. Double quotes end most strings, so they
    // are replaced; line breaks would split the directive.
    pub(crate) fn add_quoted_string(&mut self, value: &str, offset: u32) {
        self.add_whitespace(offset);
        self.outstring.push('"');
        if value.contains(['"', '\r', '\n']) {
            for c in value.chars() {
                match c {
                    '"' => self.outstring.push('\''),
                    '\r' | '\n' => self.outstring.push(' '),
                    _ => self.outstring.push(c),
                }
            }
        } else {
            self.outstring.push_str(value);
        }
        self.outstring.push('"');
    }

    // comment text ends at the last double quote of the line, so quotes can be kept
    pub(crate) fn add_comment_string(&mut self, value: &str, offset: u32) {
        self.add_whitespace(offset);
        self.outstring.push('"');
        for c in value.chars() {
            match c {
                '\r' | '\n' => self.outstring.push(' '),
                _ => self.outstring.push(c),
            }
        }
        self.outstring.push('"');
    }

    pub(crate) fn add_integer<T>(&mut self, value: T, offset: u32)
    where
        T: std::fmt::Display,
    {
        self.add_whitespace(offset);
        let _ = write!(self.outstring, "{value}");
    }

    pub(crate) fn add_value_pairs(&mut self, table: &ValueTable) {
        for (raw, label) in table {
            self.add_integer(raw, 0);
            self.add_quoted_string(label, 0);
        }
    }

    fn add_whitespace(&mut self, offset: u32) {
        if self.outstring.is_empty() {
            // nothing to separate from
        } else if offset == 0 {
            self.outstring.push(' ');
        } else {
            for _ in 0..offset {
                self.outstring.push('\n');
            }
            for _ in 0..self.indent {
                self.outstring.push(' ');
            }
        }
    }

    pub(crate) fn finish(mut self) -> String {
        if !self.outstring.is_empty() {
            self.outstring.push('\n');
        }
        self.outstring
    }
}

// very large and very small values are written in scientific notation.
// Both forms are read back to the identical value.
pub(crate) fn format_float(value: f64) -> String {
    if value == 0f64 {
        "0".to_string()
    } else if value < -1e+10 || (-0.0001 < value && value < 0.0001) || 1e+10 < value {
        format!("{value:e}")
    } else {
        format!("{value}")
    }
}

impl Database {
    /// write the database in dbc format and return the text
    ///
    /// Loading the text again results in a database that is equal to this one, as long as
    /// all names are valid identifiers and no two signals of a message share a name.
    #[must_use]
    pub fn write_to_string(&self) -> String {
        let mut writer = Writer::new(0);

        writer.add_str("VERSION", 0);
        writer.add_quoted_string(&self.version, 0);

        writer.add_str("NS_ :", 2);
        writer.add_str("BS_:", 2);

        writer.add_str("BU_:", 2);
        for ecu in &self.ecus {
            writer.add_str(ecu, 0);
        }
        if !self.value_tables.is_empty() {
            writer.add_str("", 1);
        }
        for (name, table) in &self.value_tables {
            writer.add_str("VAL_TABLE_", 1);
            writer.add_str(name, 0);
            writer.add_value_pairs(table);
            writer.add_str(";", 0);
        }

        for message in &self.messages {
            write_message(&mut writer, message);
        }

        writer.add_str("", 1);
        for message in &self.messages {
            if !message.comment.is_empty() {
                writer.add_str("CM_ BO_", 1);
                writer.add_integer(message.can_id, 0);
                writer.add_comment_string(&message.comment, 0);
                writer.add_str_raw(";");
            }
            for signal in message.signals.iter().filter(|sig| !sig.comment.is_empty()) {
                writer.add_str("CM_ SG_", 1);
                writer.add_integer(message.can_id, 0);
                writer.add_str(&signal.name, 0);
                writer.add_comment_string(&signal.comment, 0);
                writer.add_str_raw(";");
            }
        }

        for message in &self.messages {
            for signal in &message.signals {
                if let Some(table) = &signal.value_table {
                    writer.add_str("VAL_", 1);
                    writer.add_integer(message.can_id, 0);
                    writer.add_str(&signal.name, 0);
                    writer.add_value_pairs(table);
                    writer.add_str(";", 0);
                }
            }
        }

        writer.finish()
    }
}

fn write_message(writer: &mut Writer, message: &Message) {
    let sender = if message.sender.is_empty() {
        NO_NODE
    } else {
        message.sender.as_str()
    };

    writer.add_str("BO_", 2);
    writer.add_integer(message.can_id, 0);
    writer.add_str(&message.name, 0);
    writer.add_str_raw(":");
    writer.add_integer(message.dlc, 0);
    writer.add_str(sender, 0);

    writer.indent += 1;
    for signal in &message.signals {
        write_signal(writer, signal);
    }
    writer.indent -= 1;
}

// SG_ <name> : <start>|<length>@<endian><sign> (<factor>,<offset>) [<min>|<max>] "<unit>" <receivers>
fn write_signal(writer: &mut Writer, signal: &Signal) {
    writer.add_str("SG_", 1);
    writer.add_str(&signal.name, 0);
    writer.add_str(":", 0);
    writer.add_integer(signal.start_bit, 0);
    writer.add_str_raw("|");
    writer.add_str_raw(&signal.bit_length.to_string());
    writer.add_str_raw("@");
    writer.add_str_raw(&signal.byte_order.to_dbc_char().to_string());
    writer.add_str_raw(&signal.value_type.to_dbc_char().to_string());
    writer.add_str("(", 0);
    writer.add_str_raw(&format_float(signal.factor));
    writer.add_str_raw(",");
    writer.add_str_raw(&format_float(signal.offset));
    writer.add_str_raw(")");
    writer.add_str("[", 0);
    writer.add_str_raw(&format_float(signal.minimum));
    writer.add_str_raw("|");
    writer.add_str_raw(&format_float(signal.maximum));
    writer.add_str_raw("]");
    writer.add_quoted_string(&signal.unit, 0);
    if !signal.receivers.is_empty() {
        writer.add_str(&signal.receivers.join(","), 0);
    }
}
