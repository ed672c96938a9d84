// The dbc format is line oriented: every directive that is understood here starts at the
// beginning of a (trimmed) line and ends on the same line.
// The tokenizer splits the input into lines once and classifies each of them. It only
// checks the shape of a line: fields that should contain numbers are captured as text and
// converted later by the parser, which reports malformed numbers as errors.

/// one line of the input, together with its classification
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DbcLine<'a> {
    pub(crate) line: u32,
    pub(crate) text: &'a str,
    pub(crate) directive: Directive<'a>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Directive<'a> {
    /// `VERSION "<text>"`
    Version { text: &'a str },
    /// `BU_: <node> <node> ...`
    NodeList { nodes: Vec<&'a str> },
    /// `VAL_TABLE_ <name> <pairs> ;`
    ValueTable { name: &'a str, pairs: &'a str },
    /// `BO_ <id> <name>: <dlc> <sender>`
    Message {
        id: &'a str,
        name: &'a str,
        dlc: &'a str,
        sender: &'a str,
    },
    /// `SG_ <name> : <start>|<length>@<endian><sign> (<factor>,<offset>) [<min>|<max>] "<unit>" <receivers>`
    Signal(SignalFields<'a>),
    /// `CM_ BO_ <id> "<text>";`
    MessageComment { id: &'a str, text: &'a str },
    /// `CM_ SG_ <id> <signal> "<text>";`
    SignalComment {
        id: &'a str,
        signal: &'a str,
        text: &'a str,
    },
    /// `VAL_ <id> <signal> <pairs> ;`
    SignalValues {
        id: &'a str,
        signal: &'a str,
        pairs: &'a str,
    },
    /// an `SG_` line that does not have the plain signal shape, e.g. a multiplexed signal
    UnsupportedSignal,
    Unrecognized,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SignalFields<'a> {
    pub(crate) name: &'a str,
    pub(crate) start_bit: &'a str,
    pub(crate) bit_length: &'a str,
    pub(crate) byte_order: u8,
    pub(crate) value_type: u8,
    pub(crate) factor: &'a str,
    pub(crate) offset: &'a str,
    pub(crate) minimum: &'a str,
    pub(crate) maximum: &'a str,
    pub(crate) unit: &'a str,
    pub(crate) receivers: &'a str,
}

// tokenize()
// Build the line corpus: split the text into lines and classify each one
pub(crate) fn tokenize(filetext: &str) -> Vec<DbcLine<'_>> {
    filetext
        .lines()
        .enumerate()
        .map(|(idx, rawline)| {
            let text = rawline.trim();
            DbcLine {
                line: u32::try_from(idx + 1).unwrap_or(u32::MAX),
                text,
                directive: classify(text),
            }
        })
        .collect()
}

fn classify(text: &str) -> Directive<'_> {
    let mut scanner = LineScanner::new(text);
    let directive = if scanner.keyword("VERSION") {
        classify_version(&mut scanner)
    } else if scanner.keyword_colon("BU_") {
        Some(Directive::NodeList {
            nodes: scanner.rest().split_whitespace().collect(),
        })
    } else if scanner.keyword("VAL_TABLE_") {
        classify_value_table(&mut scanner)
    } else if scanner.keyword("BO_") {
        classify_message(&mut scanner)
    } else if scanner.keyword("SG_") {
        Some(classify_signal(&mut scanner).unwrap_or(Directive::UnsupportedSignal))
    } else if scanner.keyword("CM_") {
        classify_comment(&mut scanner)
    } else if scanner.keyword("VAL_") {
        classify_signal_values(&mut scanner)
    } else {
        None
    };

    directive.unwrap_or(Directive::Unrecognized)
}

fn classify_version<'a>(scanner: &mut LineScanner<'a>) -> Option<Directive<'a>> {
    let text = scanner.quoted()?;
    Some(Directive::Version { text })
}

fn classify_value_table<'a>(scanner: &mut LineScanner<'a>) -> Option<Directive<'a>> {
    let name = scanner.identifier()?;
    scanner.whitespace()?;
    let pairs = scanner.until_last(';')?;
    Some(Directive::ValueTable { name, pairs })
}

fn classify_message<'a>(scanner: &mut LineScanner<'a>) -> Option<Directive<'a>> {
    let id = scanner.digits()?;
    scanner.whitespace()?;
    let name = scanner.identifier()?;
    scanner.skip_whitespace();
    scanner.expect(':')?;
    scanner.skip_whitespace();
    let dlc = scanner.digits()?;
    scanner.whitespace()?;
    let sender = scanner.identifier()?;
    Some(Directive::Message {
        id,
        name,
        dlc,
        sender,
    })
}

fn classify_signal<'a>(scanner: &mut LineScanner<'a>) -> Option<Directive<'a>> {
    let name = scanner.identifier()?;
    scanner.skip_whitespace();
    scanner.expect(':')?;
    scanner.skip_whitespace();
    let start_bit = scanner.digits()?;
    scanner.expect('|')?;
    let bit_length = scanner.digits()?;
    scanner.expect('@')?;
    let byte_order = scanner.one_of(b"01")?;
    let value_type = scanner.one_of(b"+-")?;
    scanner.skip_whitespace();
    scanner.expect('(')?;
    let factor = scanner.until(b',')?;
    scanner.expect(',')?;
    let offset = scanner.until(b')')?;
    scanner.expect(')')?;
    scanner.skip_whitespace();
    scanner.expect('[')?;
    let minimum = scanner.until(b'|')?;
    scanner.expect('|')?;
    let maximum = scanner.until(b']')?;
    scanner.expect(']')?;
    scanner.skip_whitespace();
    let unit = scanner.quoted()?;
    scanner.skip_whitespace();
    let receivers = scanner.rest();

    Some(Directive::Signal(SignalFields {
        name,
        start_bit,
        bit_length,
        byte_order,
        value_type,
        factor,
        offset,
        minimum,
        maximum,
        unit,
        receivers,
    }))
}

fn classify_comment<'a>(scanner: &mut LineScanner<'a>) -> Option<Directive<'a>> {
    if scanner.keyword("BO_") {
        let id = scanner.digits()?;
        scanner.whitespace()?;
        let text = scanner.quoted_until_semicolon()?;
        Some(Directive::MessageComment { id, text })
    } else if scanner.keyword("SG_") {
        let id = scanner.digits()?;
        scanner.whitespace()?;
        let signal = scanner.identifier()?;
        scanner.whitespace()?;
        let text = scanner.quoted_until_semicolon()?;
        Some(Directive::SignalComment { id, signal, text })
    } else {
        // comments on nodes, environment variables and the network as a whole are not used
        None
    }
}

fn classify_signal_values<'a>(scanner: &mut LineScanner<'a>) -> Option<Directive<'a>> {
    let id = scanner.digits()?;
    scanner.whitespace()?;
    let signal = scanner.identifier()?;
    scanner.whitespace()?;
    let pairs = scanner.until_last(';')?;
    Some(Directive::SignalValues { id, signal, pairs })
}

// scan_value_pairs()
// find every `<integer> "<label>"` pair in the text. Anything between the pairs is skipped.
// The integer is returned as text; it is converted by the caller.
pub(crate) fn scan_value_pairs(text: &str) -> Vec<(&str, &str)> {
    let bytes = text.as_bytes();
    let mut pairs = Vec::new();
    let mut bytepos = 0;

    while bytepos < bytes.len() {
        if let Some((number, label, endpos)) = match_value_pair(text, bytepos) {
            pairs.push((number, label));
            bytepos = endpos;
        } else {
            bytepos += 1;
        }
    }

    pairs
}

fn match_value_pair(text: &str, startpos: usize) -> Option<(&str, &str, usize)> {
    let bytes = text.as_bytes();
    let mut bytepos = startpos;
    if bytes[bytepos] == b'-' {
        bytepos += 1;
    }
    let digits_start = bytepos;
    while bytepos < bytes.len() && bytes[bytepos].is_ascii_digit() {
        bytepos += 1;
    }
    if bytepos == digits_start {
        return None;
    }
    let number = &text[startpos..bytepos];

    let ws_start = bytepos;
    while bytepos < bytes.len() && bytes[bytepos].is_ascii_whitespace() {
        bytepos += 1;
    }
    if bytepos == ws_start || bytepos >= bytes.len() || bytes[bytepos] != b'"' {
        return None;
    }
    let label_start = bytepos + 1;
    let label_len = text[label_start..].find('"')?;
    let label = &text[label_start..label_start + label_len];

    Some((number, label, label_start + label_len + 1))
}

// A minimal cursor over the bytes of one line.
// Every matching function returns None if the text at the current position does not have the
// required shape; the line is then treated as unrecognized, so the position does not need to be restored.
struct LineScanner<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> LineScanner<'a> {
    fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    fn peek(&self) -> Option<u8> {
        self.text.as_bytes().get(self.pos).copied()
    }

    fn take_while<F: Fn(u8) -> bool>(&mut self, pred: F) -> &'a str {
        let text = self.text;
        let startpos = self.pos;
        while self.peek().is_some_and(&pred) {
            self.pos += 1;
        }
        &text[startpos..self.pos]
    }

    fn skip_whitespace(&mut self) {
        self.take_while(|c| c.is_ascii_whitespace());
    }

    // at least one whitespace character is required
    fn whitespace(&mut self) -> Option<()> {
        if self.take_while(|c| c.is_ascii_whitespace()).is_empty() {
            None
        } else {
            Some(())
        }
    }

    // a keyword must be followed by whitespace; "BO_" does not match "BO_TX_BU_"
    fn keyword(&mut self, keyword: &str) -> bool {
        let rest = &self.text[self.pos..];
        if rest.starts_with(keyword)
            && rest.as_bytes().get(keyword.len()).is_some_and(u8::is_ascii_whitespace)
        {
            self.pos += keyword.len();
            self.skip_whitespace();
            true
        } else {
            false
        }
    }

    // a keyword that is followed by optional whitespace and a colon, e.g. "BU_:"
    fn keyword_colon(&mut self, keyword: &str) -> bool {
        let startpos = self.pos;
        if self.text[self.pos..].starts_with(keyword) {
            self.pos += keyword.len();
            self.skip_whitespace();
            if self.expect(':').is_some() {
                return true;
            }
        }
        self.pos = startpos;
        false
    }

    fn expect(&mut self, c: char) -> Option<()> {
        if self.text[self.pos..].starts_with(c) {
            self.pos += c.len_utf8();
            Some(())
        } else {
            None
        }
    }

    fn one_of(&mut self, choices: &[u8]) -> Option<u8> {
        let c = self.peek().filter(|c| choices.contains(c))?;
        self.pos += 1;
        Some(c)
    }

    fn identifier(&mut self) -> Option<&'a str> {
        let ident = self.take_while(|c| c.is_ascii_alphanumeric() || c == b'_');
        (!ident.is_empty()).then_some(ident)
    }

    fn digits(&mut self) -> Option<&'a str> {
        let digits = self.take_while(|c| c.is_ascii_digit());
        (!digits.is_empty()).then_some(digits)
    }

    // all text up to (not including) the terminator, which must be present. The text may be empty.
    fn until(&mut self, terminator: u8) -> Option<&'a str> {
        let text = self.take_while(|c| c != terminator);
        self.peek().is_some().then_some(text)
    }

    // all remaining text up to the last occurrence of the terminator, which is consumed
    fn until_last(&mut self, terminator: char) -> Option<&'a str> {
        let text = self.text;
        let rest = &text[self.pos..];
        let endpos = rest.rfind(terminator)?;
        self.pos += endpos + terminator.len_utf8();
        Some(&rest[..endpos])
    }

    // a string in double quotes; quotes inside the string are not possible
    fn quoted(&mut self) -> Option<&'a str> {
        self.expect('"')?;
        let text = self.until(b'"')?;
        self.pos += 1;
        Some(text)
    }

    // a string in double quotes that is followed by a semicolon at the end of the line.
    // The last double quote on the line ends the string, so the text may contain quotes.
    fn quoted_until_semicolon(&mut self) -> Option<&'a str> {
        self.expect('"')?;
        let text = self.text;
        let rest = &text[self.pos..];
        let endquote = rest.rfind('"')?;
        if rest[endquote + 1..].trim() != ";" {
            return None;
        }
        self.pos = self.text.len();
        Some(&rest[..endquote])
    }

    fn rest(&mut self) -> &'a str {
        let text = self.text;
        let rest = &text[self.pos..];
        self.pos = self.text.len();
        rest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify_one(text: &str) -> Directive<'_> {
        classify(text.trim())
    }

    #[test]
    fn tokenize_lines() {
        let tokens = tokenize("VERSION \"\"\r\n\r\n  BU_: A\n");
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0].line, 1);
        assert_eq!(tokens[0].directive, Directive::Version { text: "" });
        assert_eq!(tokens[1].directive, Directive::Unrecognized);
        assert_eq!(tokens[2].line, 3);
        assert_eq!(tokens[2].text, "BU_: A");
        assert_eq!(tokens[2].directive, Directive::NodeList { nodes: vec!["A"] });

        let tokens = tokenize("");
        assert!(tokens.is_empty());
    }

    #[test]
    fn classify_version() {
        assert_eq!(
            classify_one(r#"VERSION "1.2.3""#),
            Directive::Version { text: "1.2.3" }
        );
        assert_eq!(classify_one("VERSION 1.2.3"), Directive::Unrecognized);
        assert_eq!(classify_one(r#"VERSION "unterminated"#), Directive::Unrecognized);
    }

    #[test]
    fn classify_node_list() {
        assert_eq!(
            classify_one("BU_: ECU1  ECU2\tECU3"),
            Directive::NodeList {
                nodes: vec!["ECU1", "ECU2", "ECU3"]
            }
        );
        assert_eq!(
            classify_one("BU_ :"),
            Directive::NodeList { nodes: vec![] }
        );
        // other directives that begin with the same letters
        assert_eq!(classify_one("BU_SG_REL_ ECU1 ;"), Directive::Unrecognized);
        assert_eq!(classify_one("BU_BO_REL_ ECU1 ;"), Directive::Unrecognized);
    }

    #[test]
    fn classify_value_table() {
        assert_eq!(
            classify_one(r#"VAL_TABLE_ Gear 0 "Park" 1 "Drive" ;"#),
            Directive::ValueTable {
                name: "Gear",
                pairs: r#"0 "Park" 1 "Drive" "#
            }
        );
        assert_eq!(
            classify_one(r#"VAL_TABLE_ Gear 0 "Park""#),
            Directive::Unrecognized
        );
    }

    #[test]
    fn classify_message() {
        assert_eq!(
            classify_one("BO_ 500 SpeedData: 8 ECU1"),
            Directive::Message {
                id: "500",
                name: "SpeedData",
                dlc: "8",
                sender: "ECU1"
            }
        );
        assert_eq!(
            classify_one("BO_ 500 SpeedData : 8 ECU1"),
            Directive::Message {
                id: "500",
                name: "SpeedData",
                dlc: "8",
                sender: "ECU1"
            }
        );
        assert_eq!(classify_one("BO_ 0x1F4 SpeedData: 8 ECU1"), Directive::Unrecognized);
        assert_eq!(classify_one("BO_ 500 SpeedData: 8"), Directive::Unrecognized);
        assert_eq!(classify_one("BO_TX_BU_ 500 : ECU1;"), Directive::Unrecognized);
    }

    #[test]
    fn classify_signal() {
        let directive =
            classify_one(r#" SG_ Speed : 0|16@1+ (0.01,0) [0|655.35] "km/h" ECU2,ECU3"#);
        assert_eq!(
            directive,
            Directive::Signal(SignalFields {
                name: "Speed",
                start_bit: "0",
                bit_length: "16",
                byte_order: b'1',
                value_type: b'+',
                factor: "0.01",
                offset: "0",
                minimum: "0",
                maximum: "655.35",
                unit: "km/h",
                receivers: "ECU2,ECU3",
            })
        );

        // the shape of numbers is not checked here
        let directive = classify_one(r#"SG_ Temp : 7|8@0- (abc,-40) [x|y] "" "#);
        let Directive::Signal(fields) = directive else {
            panic!("signal was not recognized");
        };
        assert_eq!(fields.factor, "abc");
        assert_eq!(fields.minimum, "x");
        assert_eq!(fields.byte_order, b'0');
        assert_eq!(fields.value_type, b'-');
        assert_eq!(fields.receivers, "");

        // multiplexed signals are not supported
        assert_eq!(
            classify_one(r#"SG_ Mux M : 0|8@1+ (1,0) [0|255] "" ECU2"#),
            Directive::UnsupportedSignal
        );
        assert_eq!(
            classify_one(r#"SG_ Speed : 0|16@2+ (1,0) [0|1] "" ECU2"#),
            Directive::UnsupportedSignal
        );
        // other keywords starting with SG_ are not signals at all
        assert_eq!(
            classify_one("SG_MUL_VAL_ 100 Sub Mux 0-0;"),
            Directive::Unrecognized
        );
        assert_eq!(classify_one("SG_"), Directive::Unrecognized);
    }

    #[test]
    fn classify_comments() {
        assert_eq!(
            classify_one(r#"CM_ BO_ 500 "speed message";"#),
            Directive::MessageComment {
                id: "500",
                text: "speed message"
            }
        );
        assert_eq!(
            classify_one(r#"CM_ SG_ 500 Speed "vehicle "speed"" ;"#),
            Directive::SignalComment {
                id: "500",
                signal: "Speed",
                text: r#"vehicle "speed""#
            }
        );
        assert_eq!(classify_one(r#"CM_ BU_ ECU1 "node";"#), Directive::Unrecognized);
        assert_eq!(
            classify_one(r#"CM_ BO_ 500 "first line of a longer comment"#),
            Directive::Unrecognized
        );
    }

    #[test]
    fn classify_signal_values() {
        assert_eq!(
            classify_one(r#"VAL_ 500 Speed 0 "Stopped" 1 "Moving" ;"#),
            Directive::SignalValues {
                id: "500",
                signal: "Speed",
                pairs: r#"0 "Stopped" 1 "Moving" "#
            }
        );
        // value descriptions for environment variables have no message id
        assert_eq!(
            classify_one(r#"VAL_ EnvVar 0 "Off" ;"#),
            Directive::Unrecognized
        );
    }

    #[test]
    fn value_pairs() {
        let pairs = scan_value_pairs(r#"0 "Stopped" 1 "Moving" -1 "Error" "#);
        assert_eq!(
            pairs,
            vec![("0", "Stopped"), ("1", "Moving"), ("-1", "Error")]
        );

        // labels may contain digits and whitespace, junk between pairs is skipped
        let pairs = scan_value_pairs(r#" junk 3 "Gear 3"  x 4  "" "#);
        assert_eq!(pairs, vec![("3", "Gear 3"), ("4", "")]);

        assert!(scan_value_pairs("").is_empty());
        assert!(scan_value_pairs(r#"5"no whitespace""#).is_empty());
    }
}
