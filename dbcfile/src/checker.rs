use crate::DbcError;
use crate::database::{ByteOrder, Database, Message, Signal, ValueType};
use crate::export::format_can_id;
use fnv::FnvHashSet;

// placeholder node name used by dbc editors for "no node"
const NO_NODE: &str = "Vector__XXX";

// check the content of the database: references to nodes, signal layout and signal limits
pub(crate) fn check(database: &Database) -> Vec<DbcError> {
    let mut results = Vec::new();
    let nodes: FnvHashSet<&str> = database.ecus.iter().map(String::as_str).collect();

    for message in &database.messages {
        check_message(message, &nodes, &mut results);
    }

    results
}

fn check_message(message: &Message, nodes: &FnvHashSet<&str>, log_msgs: &mut Vec<DbcError>) {
    if message.sender != NO_NODE && !nodes.contains(message.sender.as_str()) {
        log_msgs.push(DbcError::CrossReferenceError {
            source_type: "BO_".to_string(),
            source_name: format!("{} ({})", message.name, format_can_id(message.can_id)),
            source_line: message.line,
            target_type: "node".to_string(),
            target_name: message.sender.clone(),
        });
    }

    let mut signal_names = FnvHashSet::<&str>::default();
    for signal in &message.signals {
        let blockname = format!("SG_ of BO_ {}", message.name);
        if !signal_names.insert(signal.name.as_str()) {
            log_msgs.push(DbcError::ContentError {
                item_name: signal.name.clone(),
                blockname: blockname.clone(),
                line: signal.line,
                description: "a signal with this name already exists in the message".to_string(),
            });
        }

        for receiver in &signal.receivers {
            if receiver != NO_NODE && !nodes.contains(receiver.as_str()) {
                log_msgs.push(DbcError::CrossReferenceError {
                    source_type: blockname.clone(),
                    source_name: signal.name.clone(),
                    source_line: signal.line,
                    target_type: "node".to_string(),
                    target_name: receiver.clone(),
                });
            }
        }

        check_signal(signal, message.dlc, &blockname, log_msgs);
    }
}

fn check_signal(signal: &Signal, dlc: u32, blockname: &str, log_msgs: &mut Vec<DbcError>) {
    if signal.bit_length == 0 || signal.bit_length > 64 {
        log_msgs.push(DbcError::ContentError {
            item_name: signal.name.clone(),
            blockname: blockname.to_string(),
            line: signal.line,
            description: format!(
                "bit length {} is outside of the range 1 .. 64",
                signal.bit_length
            ),
        });
        // layout and limits can't be calculated
        return;
    }

    let available_bits = u64::from(dlc) * 8;
    let end_bit = signal_end_bit(signal);
    if end_bit > available_bits {
        log_msgs.push(DbcError::ContentError {
            item_name: signal.name.clone(),
            blockname: blockname.to_string(),
            line: signal.line,
            description: format!(
                "the signal needs {end_bit} bits, but the message only contains {available_bits} bits"
            ),
        });
    }

    // [0|0] is commonly used to state that there are no limits
    if signal.minimum == 0.0 && signal.maximum == 0.0 {
        return;
    }
    let calculated_limits = calc_signal_limits(signal);
    let existing_limits = (signal.minimum, signal.maximum);
    if !check_limits_valid(existing_limits, calculated_limits) {
        log_msgs.push(DbcError::LimitCheckError {
            item_name: signal.name.clone(),
            blockname: blockname.to_string(),
            line: signal.line,
            lower_limit: signal.minimum,
            upper_limit: signal.maximum,
            calculated_lower_limit: calculated_limits.0,
            calculated_upper_limit: calculated_limits.1,
        });
    }
}

// signal_end_bit()
// The number of bits of the message that are needed to hold the signal.
// For little endian signals the start bit is the least significant bit and the signal
// extends towards higher bit numbers.
// For big endian signals the start bit is the most significant bit. Bits are numbered
// 7..0 in the first byte, 15..8 in the second byte and so on ("sawtooth"), and the signal
// extends towards bit 0 of the start byte and then continues with bit 7 of the next byte.
fn signal_end_bit(signal: &Signal) -> u64 {
    let start_bit = u64::from(signal.start_bit);
    let bit_length = u64::from(signal.bit_length);
    match signal.byte_order {
        ByteOrder::Little => start_bit + bit_length,
        ByteOrder::Big => {
            // position of the start bit when counting from the msb of byte 0
            let msb_position = (start_bit / 8) * 8 + (7 - start_bit % 8);
            msb_position + bit_length
        }
    }
}

// calc_signal_limits()
// physical range of the signal: the raw range of the bit field, converted with factor and offset
fn calc_signal_limits(signal: &Signal) -> (f64, f64) {
    let (raw_min, raw_max) = get_raw_limits(signal.bit_length, signal.value_type);
    let lower = raw_min * signal.factor + signal.offset;
    let upper = raw_max * signal.factor + signal.offset;
    if lower <= upper {
        (lower, upper)
    } else {
        (upper, lower)
    }
}

fn get_raw_limits(bit_length: u32, value_type: ValueType) -> (f64, f64) {
    let bits = i32::try_from(bit_length).unwrap_or(64);
    match value_type {
        ValueType::Unsigned => (0.0, 2f64.powi(bits) - 1.0),
        ValueType::Signed => (-(2f64.powi(bits - 1)), 2f64.powi(bits - 1) - 1.0),
    }
}

// Compare the existing limits with the calculated limits
// Returns true if the existing limits are inside the calculated limits
//
// Limits in dbc files are often rounded, so a small tolerance is allowed.
fn check_limits_valid(existing: (f64, f64), calculated: (f64, f64)) -> bool {
    let epsilon_lower = (calculated.0 * 1E-6).abs();
    let epsilon_upper = (calculated.1 * 1E-6).abs();
    (calculated.0 - existing.0) <= epsilon_lower && (existing.1 - calculated.1) <= epsilon_upper
}
