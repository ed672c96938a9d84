#[cfg(test)]
mod test {
    use dbcfile::*;
    use serde_json::json;
    use tempfile::tempdir;

    static DBC_TEXT: &str = r#"VERSION "1.2"

NS_ :
    NS_DESC_
    CM_
    BA_DEF_

BS_:

BU_: ECU1 ECU2 ECU3

VAL_TABLE_ GearTable 0 "Park" 1 "Drive" ;

BO_ 500 SpeedData: 8 ECU1
 SG_ Speed : 0|16@1+ (0.01,0) [0|655.35] "km/h" ECU2,ECU3
 SG_ Direction : 16|2@1+ (1,0) [0|3] "" ECU2

BO_ 1000 EngineData: 8 ECU2
 SG_ Rpm : 7|16@0+ (0.25,0) [0|16383.75] "rpm" ECU1
 SG_ Temp : 23|8@0- (1,-40) [-168|87] "degC" ECU1

BO_TX_BU_ 500 : ECU1,ECU2;

CM_ "network comment";
CM_ BU_ ECU1 "node comment";
CM_ BO_ 1000 "engine values";
CM_ SG_ 500 Speed "vehicle speed";
BA_DEF_ BO_ "GenMsgCycleTime" INT 0 10000;
BA_ "GenMsgCycleTime" BO_ 500 100;
VAL_ 500 Speed 0 "Stopped" 1 "Moving" ;
VAL_ 500 Direction 0 "Forward" 1 "Reverse" 2 "Neutral" ;
"#;

    #[test]
    fn full_load() {
        let (database, log_msgs) = load_from_string(DBC_TEXT, true).unwrap();
        assert!(log_msgs.is_empty());

        assert_eq!(database.version, "1.2");
        assert_eq!(database.ecus, vec!["ECU1", "ECU2", "ECU3"]);
        assert_eq!(database.value_tables["GearTable"][&1], "Drive");
        assert_eq!(database.messages.len(), 2);

        let speed_data = database.get_message(500).unwrap();
        assert_eq!(speed_data.name, "SpeedData");
        assert_eq!(speed_data.comment, "");
        assert_eq!(speed_data.signals.len(), 2);
        let speed = speed_data.get_signal("Speed").unwrap();
        assert_eq!(speed.comment, "vehicle speed");
        assert_eq!(speed.receivers, vec!["ECU2", "ECU3"]);
        let direction = speed_data.get_signal("Direction").unwrap();
        assert_eq!(direction.value_table.as_ref().unwrap()[&2], "Neutral");

        let engine_data = database.get_message(1000).unwrap();
        assert_eq!(engine_data.comment, "engine values");
        let temp = engine_data.get_signal("Temp").unwrap();
        assert_eq!(temp.byte_order, ByteOrder::Big);
        assert_eq!(temp.value_type, ValueType::Signed);
        assert_eq!(temp.offset, -40.0);
        assert!(temp.value_table.is_none());
    }

    #[test]
    fn json_export() {
        let text = r#"
BU_: ECU1 ECU2
BO_ 500 SpeedData: 8 ECU1
 SG_ Speed : 0|16@1+ (0.01,0) [0|655.35] "km/h" ECU2,ECU3
CM_ SG_ 500 Speed "vehicle speed";
VAL_ 500 Speed 0 "Stopped" 1 "Moving" ;
"#;
        let (database, _) = load_from_string(text, false).unwrap();
        let value = database.to_json_value().unwrap();
        assert_eq!(
            value,
            json!({
                "messages": [{
                    "id": "1F4",
                    "name": "SpeedData",
                    "dlc": 8,
                    "sender": "ECU1",
                    "comment": "",
                    "signals": [{
                        "name": "Speed",
                        "start_bit": 0,
                        "bit_length": 16,
                        "byte_order": "little",
                        "value_type": "unsigned",
                        "factor": 0.01,
                        "offset": 0.0,
                        "min": 0.0,
                        "max": 655.35,
                        "unit": "km/h",
                        "receivers": ["ECU2", "ECU3"],
                        "comment": "vehicle speed",
                        "value_table": {"0": "Stopped", "1": "Moving"}
                    }]
                }],
                "ecus": ["ECU1", "ECU2"],
                "version": ""
            })
        );
    }

    #[test]
    fn unknown_lines_are_ignored() {
        let (plain, _) = load_from_string("BO_ 1 Msg: 8 ECU\n", true).unwrap();
        let (with_noise, _) = load_from_string(
            "BA_DEF_ \"x\" INT 0 1;\nBO_ 1 Msg: 8 ECU\nSIG_GROUP_ 1 G 1 : A;\nEV_ E: 0 [0|1] \"\" 0 1 DUMMY_NODE_VECTOR0 Vector__XXX;\n",
            true,
        )
        .unwrap();
        assert_eq!(plain, with_noise);
    }

    #[test]
    fn dangling_references_are_tolerated() {
        let text = r#"
BO_ 1 Msg: 8 ECU
CM_ BO_ 2 "no such message";
CM_ SG_ 1 NoSignal "no such signal";
VAL_ 3 Sig 0 "x" ;
"#;
        let (database, log_msgs) = load_from_string(text, false).unwrap();
        assert_eq!(database.messages.len(), 1);
        assert_eq!(database.messages[0].comment, "");
        assert_eq!(log_msgs.len(), 3);

        let result = load_from_string(text, true);
        assert!(result.is_err());
    }

    #[test]
    fn malformed_number_is_fatal() {
        let result = load_from_string("BO_ 1 Msg: 8 ECU\n SG_ S : 0|8@1+ (1,zero) [0|1] \"\" ECU\n", false);
        assert!(matches!(
            result,
            Err(DbcError::ParserError {
                parser_error: ParserError::MalformedNumber { .. }
            })
        ));

        // infinite and NaN factors can not be represented in the json output
        let result = load_from_string("BO_ 1 Msg: 8 ECU\n SG_ S : 0|8@1+ (inf,0) [0|1] \"\" ECU\n", false);
        assert!(matches!(
            result,
            Err(DbcError::ParserError {
                parser_error: ParserError::MalformedNumber { error_line: 2, .. }
            })
        ));
        let result = load_from_string("BO_ 1 Msg: 8 ECU\n SG_ S : 0|8@1+ (1,0) [NaN|1] \"\" ECU\n", false);
        assert!(result.is_err());
    }

    #[test]
    fn full_range_values_and_ids() {
        let text = r#"
BO_ 2147483648 Counter64: 8 ECU
 SG_ Counter : 0|64@1+ (1,0) [0|0] "" ECU
CM_ BO_ 4294967296 "dangling";
CM_ SG_ 18446744073709551616 Counter "dangling";
VAL_ 2147483648 Counter 18446744073709551615 "SNA" 0 "zero" ;
"#;
        let (database, log_msgs) = load_from_string(text, false).unwrap();
        let message = database.get_message(2147483648).unwrap();
        assert_eq!(message.comment, "");
        let table = message.signals[0].value_table.as_ref().unwrap();
        assert_eq!(table[&18446744073709551615_i128], "SNA");
        // both comments refer to messages that do not exist
        assert_eq!(log_msgs.len(), 2);

        let value = database.to_json_value().unwrap();
        assert_eq!(value["messages"][0]["id"], "80000000");
        assert_eq!(
            value["messages"][0]["signals"][0]["value_table"],
            json!({"0": "zero", "18446744073709551615": "SNA"})
        );

        // the written file can be read again
        let (reloaded, _) = load_from_string(&database.write_to_string(), true).unwrap();
        assert_eq!(database, reloaded);
    }

    #[test]
    fn redeclared_message_replaces_earlier() {
        let text = r#"
BO_ 100 A: 8 ECU
BO_ 200 B: 8 ECU
BO_ 100 C: 8 ECU
"#;
        let (database, log_msgs) = load_from_string(text, false).unwrap();
        let names: Vec<&str> = database.messages.iter().map(|msg| msg.name.as_str()).collect();
        assert_eq!(names, vec!["B", "C"]);
        assert_eq!(log_msgs.len(), 1);
    }

    #[test]
    fn round_trip() {
        let (database, _) = load_from_string(DBC_TEXT, true).unwrap();
        let text = database.write_to_string();
        let (reloaded, log_msgs) = load_from_string(&text, true).unwrap();
        assert!(log_msgs.is_empty());
        assert_eq!(database, reloaded);
        // writing again produces identical text
        assert_eq!(text, reloaded.write_to_string());
    }

    #[test]
    fn load_and_write_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("input.dbc");
        // UTF-8 with byte order mark
        let mut data = vec![0xef, 0xbb, 0xbf];
        data.extend_from_slice(DBC_TEXT.as_bytes());
        std::fs::write(&path, data).unwrap();

        let (database, _) = load(&path, true).unwrap();
        assert_eq!(database.version, "1.2");

        let out_path = dir.path().join("output.dbc");
        database.write(&out_path).unwrap();
        let (reloaded, _) = load(&out_path, true).unwrap();
        assert_eq!(database, reloaded);
    }

    #[cfg(feature = "check")]
    #[test]
    fn check_loaded_file() {
        let (database, _) = load_from_string(DBC_TEXT, true).unwrap();
        let log_msgs = database.check();
        assert!(log_msgs.is_empty(), "{log_msgs:?}");

        let (database, _) =
            load_from_string("BU_: A\nBO_ 1 Msg: 1 B\n SG_ S : 0|16@1+ (1,0) [0|1] \"\" A\n", true).unwrap();
        let log_msgs = database.check();
        // unknown sender, signal does not fit into 8 bits
        assert_eq!(log_msgs.len(), 2);
    }
}
