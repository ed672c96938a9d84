//! Conversion of a [`Database`] into plain nested data (JSON)
//!
//! The structure is
//! ```text
//! { "messages": [ { "id": "1F4", "name", "dlc", "sender", "comment",
//!                   "signals": [ { "name", "start_bit", "bit_length", "byte_order",
//!                                  "value_type", "factor", "offset", "min", "max",
//!                                  "unit", "receivers", "comment", "value_table" } ] } ],
//!   "ecus": [ ... ],
//!   "version": "..." }
//! ```
//! The message id is written as uppercase hex with at least three digits. Value tables
//! are objects with the raw value as decimal string key; a signal without a value table
//! has an empty object.

use crate::database::{Database, ValueTable};
use serde::ser::SerializeMap;
use serde::Serializer;

impl Database {
    /// convert the database into a `serde_json::Value`
    ///
    /// # Errors
    ///
    /// Only fails if `serde_json` rejects the data, which does not happen for well-formed strings.
    pub fn to_json_value(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }

    /// convert the database into a JSON string, optionally pretty printed
    ///
    /// # Errors
    ///
    /// Only fails if `serde_json` rejects the data, which does not happen for well-formed strings.
    pub fn to_json_string(&self, pretty: bool) -> serde_json::Result<String> {
        if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        }
    }
}

pub(crate) fn format_can_id(can_id: u64) -> String {
    format!("{can_id:03X}")
}

pub(crate) fn serialize_can_id<S: Serializer>(can_id: &u64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_can_id(*can_id))
}

pub(crate) fn serialize_value_table<S: Serializer>(
    value_table: &Option<ValueTable>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value_table {
        Some(table) => serializer.collect_map(table.iter().map(|(raw, label)| (raw.to_string(), label))),
        None => serializer.serialize_map(Some(0))?.end(),
    }
}
