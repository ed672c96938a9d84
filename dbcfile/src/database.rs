use crate::export;
use crate::{DbcObjectId, ItemList};
use serde::Serialize;
use std::collections::BTreeMap;

/// mapping from a raw signal value to its description
///
/// Raw values of 64 bit signals may use the full signed and unsigned 64 bit range.
pub type ValueTable = BTreeMap<i128, String>;

/// the content of a dbc file
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Database {
    /// all messages. The list contains each CAN id only once
    pub messages: ItemList<Message>,
    /// the nodes (ECUs) named in the `BU_` line
    pub ecus: Vec<String>,
    /// free text from the `VERSION` line, empty if there is none
    pub version: String,
    /// global value tables from `VAL_TABLE_` lines
    ///
    /// These are kept for reference only; signals receive their value table from `VAL_` lines.
    #[serde(skip)]
    pub value_tables: BTreeMap<String, ValueTable>,
}

/// one CAN frame, declared by a `BO_` line
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    #[serde(rename = "id", serialize_with = "export::serialize_can_id")]
    pub can_id: u64,
    pub name: String,
    pub dlc: u32,
    pub sender: String,
    pub comment: String,
    pub signals: Vec<Signal>,
    /// line of the `BO_` declaration, 0 for messages that were not loaded from a file
    #[serde(skip)]
    pub line: u32,
}

/// a bit field inside a message, declared by an `SG_` line
#[derive(Debug, Clone, Serialize)]
pub struct Signal {
    pub name: String,
    pub start_bit: u32,
    pub bit_length: u32,
    pub byte_order: ByteOrder,
    pub value_type: ValueType,
    pub factor: f64,
    pub offset: f64,
    #[serde(rename = "min")]
    pub minimum: f64,
    #[serde(rename = "max")]
    pub maximum: f64,
    pub unit: String,
    pub receivers: Vec<String>,
    pub comment: String,
    /// value descriptions from a `VAL_` line, None if there is no such line
    #[serde(serialize_with = "export::serialize_value_table")]
    pub value_table: Option<ValueTable>,
    /// line of the `SG_` declaration, 0 for signals that were not loaded from a file
    #[serde(skip)]
    pub line: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ByteOrder {
    /// `@1`: Intel, least significant byte first
    Little,
    /// `@0`: Motorola, most significant byte first
    Big,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    /// `-`
    Signed,
    /// `+`
    Unsigned,
}

impl Database {
    /// get a message by its CAN id
    #[must_use]
    pub fn get_message(&self, can_id: u64) -> Option<&Message> {
        self.messages.get(can_id)
    }
}

impl Message {
    #[must_use]
    pub fn new(can_id: u64, name: String, dlc: u32, sender: String) -> Self {
        Self {
            can_id,
            name,
            dlc,
            sender,
            comment: String::new(),
            signals: Vec::new(),
            line: 0,
        }
    }

    /// get the first signal with the given name. Names are case sensitive
    #[must_use]
    pub fn get_signal(&self, name: &str) -> Option<&Signal> {
        self.signals.iter().find(|signal| signal.name == name)
    }

    pub(crate) fn get_signal_mut(&mut self, name: &str) -> Option<&mut Signal> {
        self.signals.iter_mut().find(|signal| signal.name == name)
    }
}

impl DbcObjectId for Message {
    fn get_id(&self) -> u64 {
        self.can_id
    }
}

// the source line is not part of the content; equality ignores it
impl PartialEq for Message {
    fn eq(&self, other: &Self) -> bool {
        (self.can_id == other.can_id)
            && (self.name == other.name)
            && (self.dlc == other.dlc)
            && (self.sender == other.sender)
            && (self.comment == other.comment)
            && (self.signals == other.signals)
    }
}

impl Signal {
    /// create a signal with factor 1, offset 0, no limits and no receivers
    #[must_use]
    pub fn new(
        name: String,
        start_bit: u32,
        bit_length: u32,
        byte_order: ByteOrder,
        value_type: ValueType,
    ) -> Self {
        Self {
            name,
            start_bit,
            bit_length,
            byte_order,
            value_type,
            factor: 1.0,
            offset: 0.0,
            minimum: 0.0,
            maximum: 0.0,
            unit: String::new(),
            receivers: Vec::new(),
            comment: String::new(),
            value_table: None,
            line: 0,
        }
    }
}

impl PartialEq for Signal {
    fn eq(&self, other: &Self) -> bool {
        (self.name == other.name)
            && (self.start_bit == other.start_bit)
            && (self.bit_length == other.bit_length)
            && (self.byte_order == other.byte_order)
            && (self.value_type == other.value_type)
            && (self.factor == other.factor)
            && (self.offset == other.offset)
            && (self.minimum == other.minimum)
            && (self.maximum == other.maximum)
            && (self.unit == other.unit)
            && (self.receivers == other.receivers)
            && (self.comment == other.comment)
            && (self.value_table == other.value_table)
    }
}

impl ByteOrder {
    /// the digit used after `@` in a signal definition
    pub(crate) fn to_dbc_char(self) -> char {
        match self {
            ByteOrder::Little => '1',
            ByteOrder::Big => '0',
        }
    }
}

impl ValueType {
    /// the sign character used in a signal definition
    pub(crate) fn to_dbc_char(self) -> char {
        match self {
            ValueType::Signed => '-',
            ValueType::Unsigned => '+',
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_ignores_line() {
        let mut msg_a = Message::new(100, "Msg".to_string(), 8, "ECU".to_string());
        let mut msg_b = msg_a.clone();
        msg_a.line = 10;
        msg_b.line = 20;
        assert_eq!(msg_a, msg_b);

        let mut sig_a = Signal::new("Sig".to_string(), 0, 8, ByteOrder::Little, ValueType::Unsigned);
        let mut sig_b = sig_a.clone();
        sig_a.line = 11;
        sig_b.line = 12;
        assert_eq!(sig_a, sig_b);

        msg_a.signals.push(sig_a);
        assert_ne!(msg_a, msg_b);
        msg_b.signals.push(sig_b);
        assert_eq!(msg_a, msg_b);

        msg_b.comment = "different".to_string();
        assert_ne!(msg_a, msg_b);
    }

    #[test]
    fn signal_lookup() {
        let mut message = Message::new(1, "Msg".to_string(), 8, "ECU".to_string());
        message.signals.push(Signal::new(
            "Speed".to_string(),
            0,
            16,
            ByteOrder::Little,
            ValueType::Unsigned,
        ));
        assert!(message.get_signal("Speed").is_some());
        assert!(message.get_signal("speed").is_none());

        let mut database = Database::default();
        database.messages.push(message);
        assert!(database.get_message(1).is_some());
        assert!(database.get_message(2).is_none());
    }
}
