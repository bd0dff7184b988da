use std::fmt;

use chrono::NaiveDateTime;
use thiserror::Error;

/// Grammar failure: the alternative that was expected and the byte offset of
/// the text that did not match it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("expected {expected} at byte {offset}, found {found:?}")]
pub struct GrammarError {
    pub expected: &'static str,
    pub offset: usize,
    pub found: String,
}

/// One decoded argument or sub-value from a trace line.
///
/// Alternation order is fixed: timestamp, pointer, cast, bit-or'd
/// integers/symbols, byte string, struct, list. A timestamp must win over
/// three `|`-joined integers, and a hex literal must win over a cast, so the
/// order matters where prefixes overlap.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Decimal integer; a leading zero followed by more digits is octal
    /// (`0644` is 420), a bare `0` is just zero.
    Integer(i64),
    /// `0x`-prefixed hex address.
    Pointer(u64),
    /// Double-quoted byte string, escapes decoded. `truncated` is set when
    /// the literal carried a trailing `...` marker.
    Bytes { data: Vec<u8>, truncated: bool },
    /// Bare identifier standing for a platform constant (`O_RDONLY`).
    Symbol(String),
    /// `|`-joined flags combination, source order preserved.
    BitOr(Vec<Value>),
    /// `name(args...)` wrapper such as `htons(80)` or `inet_addr("1.2.3.4")`.
    Cast { name: String, args: Vec<Value> },
    /// `YYYY/MM/DD-HH:MM:SS` literal.
    Timestamp(NaiveDateTime),
    /// `{...}` aggregate, named or anonymous.
    Struct(StructBody),
    /// `[...]` bracketed values.
    List(Vec<Value>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum StructBody {
    /// `key=value` / `key:value` fields in source order. A trailing `...`
    /// inside the braces means strace elided further fields; it is consumed
    /// and dropped, never stored.
    Named(Vec<(String, Value)>),
    Anonymous(Vec<Value>),
}

impl Value {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Human-readable text of a byte string or symbol, for labeling handles.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Value::Bytes { data, .. } => Some(String::from_utf8_lossy(data).into_owned()),
            Value::Symbol(s) => Some(s.clone()),
            _ => None,
        }
    }

    /// Look up a field of a named struct.
    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Struct(StructBody::Named(fields)) => {
                fields.iter().find(|(k, _)| k == name).map(|(_, v)| v)
            }
            _ => None,
        }
    }

    /// Index into an anonymous struct, list, or cast argument list.
    pub fn item(&self, idx: usize) -> Option<&Value> {
        match self {
            Value::Struct(StructBody::Anonymous(values)) | Value::List(values) => values.get(idx),
            Value::Cast { args, .. } => args.get(idx),
            _ => None,
        }
    }
}

/// Parse a complete string as exactly one value.
pub fn parse_value(input: &str) -> Result<Value, GrammarError> {
    let mut cursor = Cursor::new(input);
    cursor.skip_ws();
    let value = cursor.value()?;
    cursor.skip_ws();
    if !cursor.at_end() {
        return Err(cursor.error("end of input"));
    }
    Ok(value)
}

const TIMESTAMP_FORMAT: &str = "%Y/%m/%d-%H:%M:%S";

/// Byte cursor over one trace line. Positions are byte offsets; the grammar
/// itself is ASCII, non-ASCII bytes only occur inside quoted strings.
pub(crate) struct Cursor<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(input: &'a str) -> Self {
        Cursor { input, pos: 0 }
    }

    pub(crate) fn pos(&self) -> usize {
        self.pos
    }

    pub(crate) fn set_pos(&mut self, pos: usize) {
        self.pos = pos;
    }

    pub(crate) fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    pub(crate) fn peek(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }

    pub(crate) fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b' ') | Some(b'\t')) {
            self.pos += 1;
        }
    }

    pub(crate) fn eat(&mut self, byte: u8) -> bool {
        if self.peek() == Some(byte) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    pub(crate) fn eat_str(&mut self, s: &str) -> bool {
        if self.rest().starts_with(s) {
            self.pos += s.len();
            true
        } else {
            false
        }
    }

    pub(crate) fn expect(&mut self, byte: u8, expected: &'static str) -> Result<(), GrammarError> {
        if self.eat(byte) {
            Ok(())
        } else {
            Err(self.error(expected))
        }
    }

    pub(crate) fn error(&self, expected: &'static str) -> GrammarError {
        GrammarError {
            expected,
            offset: self.pos,
            found: self.rest().chars().take(24).collect(),
        }
    }

    pub(crate) fn ident(&mut self) -> Result<String, GrammarError> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == b'_') {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.error("identifier"));
        }
        Ok(self.input[start..self.pos].to_string())
    }

    /// Signed integer with the leading-zero octal rule. Negative numbers are
    /// always decimal (`-0644` is minus six hundred forty-four).
    pub(crate) fn integer(&mut self) -> Result<i64, GrammarError> {
        let start = self.pos;
        let negative = self.eat(b'-');
        let digits_start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.pos == digits_start {
            self.pos = start;
            return Err(self.error("integer"));
        }
        let digits = &self.input[digits_start..self.pos];
        match decode_int(digits, negative) {
            Some(v) => Ok(v),
            None => {
                self.pos = start;
                Err(self.error("integer"))
            }
        }
    }

    /// One value, dispatched on the fixed alternation order.
    pub(crate) fn value(&mut self) -> Result<Value, GrammarError> {
        self.skip_ws();
        if self.timestamp_shape_ahead() {
            return self.timestamp();
        }
        if self.pointer_ahead() {
            return self.pointer();
        }
        match self.peek() {
            Some(b'"') => self.byte_string(),
            Some(b'{') => self.struct_value(),
            Some(b'[') => self.list(),
            Some(b'-') => self.atom_chain(),
            Some(c) if c.is_ascii_alphanumeric() || c == b'_' => self.atom_chain(),
            _ => Err(self.error("value")),
        }
    }

    /// Comma-delimited values up to (not including) a closing delimiter.
    pub(crate) fn comma_values(&mut self) -> Result<Vec<Value>, GrammarError> {
        let mut values = Vec::new();
        self.skip_ws();
        if matches!(self.peek(), Some(b')') | Some(b']') | Some(b'}') | None) {
            return Ok(values);
        }
        loop {
            values.push(self.value()?);
            self.skip_ws();
            if !self.eat(b',') {
                return Ok(values);
            }
        }
    }

    fn timestamp_shape_ahead(&self) -> bool {
        let bytes = self.rest().as_bytes();
        if bytes.len() < 19 {
            return false;
        }
        let digit = |i: usize| bytes[i].is_ascii_digit();
        (0..4).all(digit)
            && bytes[4] == b'/'
            && (5..7).all(digit)
            && bytes[7] == b'/'
            && (8..10).all(digit)
            && bytes[10] == b'-'
            && (11..13).all(digit)
            && bytes[13] == b':'
            && (14..16).all(digit)
            && bytes[16] == b':'
            && (17..19).all(digit)
    }

    fn timestamp(&mut self) -> Result<Value, GrammarError> {
        let literal = &self.rest()[..19];
        match NaiveDateTime::parse_from_str(literal, TIMESTAMP_FORMAT) {
            Ok(ts) => {
                self.pos += 19;
                Ok(Value::Timestamp(ts))
            }
            Err(_) => Err(self.error("timestamp")),
        }
    }

    fn pointer_ahead(&self) -> bool {
        let bytes = self.rest().as_bytes();
        bytes.len() > 2
            && bytes[0] == b'0'
            && bytes[1] == b'x'
            && bytes[2].is_ascii_hexdigit()
    }

    fn pointer(&mut self) -> Result<Value, GrammarError> {
        self.pos += 2;
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_hexdigit()) {
            self.pos += 1;
        }
        match u64::from_str_radix(&self.input[start..self.pos], 16) {
            Ok(addr) => Ok(Value::Pointer(addr)),
            Err(_) => Err(self.error("hex pointer")),
        }
    }

    /// Integer/symbol atom, possibly a cast, possibly the head of a `|`
    /// chain. Casts are recognized before plain symbols so `htons(80)` does
    /// not stop at `htons`; numbers never start a cast.
    fn atom_chain(&mut self) -> Result<Value, GrammarError> {
        let first = self.atom(true)?;
        if matches!(first, Value::Cast { .. }) || self.peek() != Some(b'|') {
            return Ok(first);
        }
        let mut parts = vec![first];
        while self.eat(b'|') {
            parts.push(self.atom(false)?);
        }
        Ok(Value::BitOr(parts))
    }

    fn atom(&mut self, allow_cast: bool) -> Result<Value, GrammarError> {
        self.skip_ws();
        let start = self.pos;
        let negative = self.eat(b'-');
        let word_start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == b'_') {
            self.pos += 1;
        }
        if self.pos == word_start {
            self.pos = start;
            return Err(self.error("integer or symbol"));
        }
        let word = &self.input[word_start..self.pos];
        if word.bytes().all(|b| b.is_ascii_digit()) {
            match decode_int(word, negative) {
                Some(v) => Ok(Value::Integer(v)),
                None => {
                    self.pos = start;
                    Err(self.error("integer"))
                }
            }
        } else if negative {
            self.pos = start;
            Err(self.error("integer"))
        } else if allow_cast && self.peek() == Some(b'(') {
            let name = word.to_string();
            self.pos += 1;
            let args = self.comma_values()?;
            if args.is_empty() {
                return Err(self.error("cast argument"));
            }
            self.expect(b')', "`)` closing cast")?;
            Ok(Value::Cast { name, args })
        } else {
            Ok(Value::Symbol(word.to_string()))
        }
    }

    fn byte_string(&mut self) -> Result<Value, GrammarError> {
        self.expect(b'"', "`\"`")?;
        let mut data = Vec::new();
        loop {
            match self.peek() {
                None => return Err(self.error("closing `\"`")),
                Some(b'"') => {
                    self.pos += 1;
                    break;
                }
                Some(b'\\') => {
                    self.pos += 1;
                    self.escape(&mut data)?;
                }
                Some(byte) => {
                    data.push(byte);
                    self.pos += 1;
                }
            }
        }
        let truncated = self.eat_str("...");
        Ok(Value::Bytes { data, truncated })
    }

    fn escape(&mut self, out: &mut Vec<u8>) -> Result<(), GrammarError> {
        let byte = match self.peek() {
            Some(b) => b,
            None => return Err(self.error("escape sequence")),
        };
        self.pos += 1;
        match byte {
            b'n' => out.push(b'\n'),
            b't' => out.push(b'\t'),
            b'r' => out.push(b'\r'),
            b'f' => out.push(0x0c),
            b'v' => out.push(0x0b),
            b'a' => out.push(0x07),
            b'b' => out.push(0x08),
            b'\\' => out.push(b'\\'),
            b'"' => out.push(b'"'),
            b'\'' => out.push(b'\''),
            b'x' => {
                let mut value: u32 = 0;
                let mut digits = 0;
                while digits < 2 {
                    let digit = match self.peek() {
                        Some(c @ b'0'..=b'9') => u32::from(c - b'0'),
                        Some(c @ b'a'..=b'f') => u32::from(c - b'a' + 10),
                        Some(c @ b'A'..=b'F') => u32::from(c - b'A' + 10),
                        _ => break,
                    };
                    value = value * 16 + digit;
                    self.pos += 1;
                    digits += 1;
                }
                if digits == 0 {
                    return Err(self.error("hex escape"));
                }
                out.push(value as u8);
            }
            b'0'..=b'7' => {
                let mut value = u32::from(byte - b'0');
                let mut digits = 1;
                while digits < 3 {
                    match self.peek() {
                        Some(c @ b'0'..=b'7') if value * 8 + u32::from(c - b'0') <= 0xff => {
                            value = value * 8 + u32::from(c - b'0');
                            self.pos += 1;
                            digits += 1;
                        }
                        _ => break,
                    }
                }
                out.push(value as u8);
            }
            _ => return Err(self.error("escape sequence")),
        }
        Ok(())
    }

    fn struct_value(&mut self) -> Result<Value, GrammarError> {
        self.expect(b'{', "`{`")?;
        self.skip_ws();
        if self.eat(b'}') {
            return Ok(Value::Struct(StructBody::Anonymous(Vec::new())));
        }
        // Named fields first, anonymous values as the fallback.
        let save = self.pos;
        match self.named_fields() {
            Ok(fields) => Ok(Value::Struct(StructBody::Named(fields))),
            Err(_) => {
                self.pos = save;
                let values = self.comma_values()?;
                self.expect(b'}', "`}`")?;
                Ok(Value::Struct(StructBody::Anonymous(values)))
            }
        }
    }

    /// Field list of a named struct, consuming the closing brace.
    pub(crate) fn named_fields(&mut self) -> Result<Vec<(String, Value)>, GrammarError> {
        let mut fields = Vec::new();
        loop {
            self.skip_ws();
            if self.eat_str("...") {
                // elided fields marker, dropped
            } else {
                let key = self.ident()?;
                self.skip_ws();
                if !(self.eat(b'=') || self.eat(b':')) {
                    return Err(self.error("`=` or `:` after field name"));
                }
                let value = self.value()?;
                fields.push((key, value));
            }
            self.skip_ws();
            if self.eat(b',') {
                continue;
            }
            self.expect(b'}', "`}`")?;
            return Ok(fields);
        }
    }

    fn list(&mut self) -> Result<Value, GrammarError> {
        self.expect(b'[', "`[`")?;
        let values = self.comma_values()?;
        self.expect(b']', "`]`")?;
        Ok(Value::List(values))
    }
}

fn decode_int(digits: &str, negative: bool) -> Option<i64> {
    let value = if !negative && digits.len() > 1 && digits.starts_with('0') {
        i64::from_str_radix(&digits[1..], 8).ok()?
    } else {
        digits.parse::<i64>().ok()?
    };
    Some(if negative { -value } else { value })
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(v) => write!(f, "{v}"),
            Value::Pointer(addr) => write!(f, "0x{addr:x}"),
            Value::Bytes { data, truncated } => {
                write!(f, "\"")?;
                for &byte in data {
                    match byte {
                        b'"' => write!(f, "\\\"")?,
                        b'\\' => write!(f, "\\\\")?,
                        b'\n' => write!(f, "\\n")?,
                        b'\t' => write!(f, "\\t")?,
                        b'\r' => write!(f, "\\r")?,
                        0x20..=0x7e => write!(f, "{}", byte as char)?,
                        _ => write!(f, "\\{byte:03o}")?,
                    }
                }
                write!(f, "\"")?;
                if *truncated {
                    write!(f, "...")?;
                }
                Ok(())
            }
            Value::Symbol(name) => write!(f, "{name}"),
            Value::BitOr(parts) => {
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        write!(f, "|")?;
                    }
                    write!(f, "{part}")?;
                }
                Ok(())
            }
            Value::Cast { name, args } => {
                write!(f, "{name}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
            Value::Timestamp(ts) => write!(f, "{}", ts.format(TIMESTAMP_FORMAT)),
            Value::Struct(StructBody::Named(fields)) => {
                write!(f, "{{")?;
                for (i, (key, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}={value}")?;
                }
                write!(f, "}}")
            }
            Value::Struct(StructBody::Anonymous(values)) => {
                write!(f, "{{")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{value}")?;
                }
                write!(f, "}}")
            }
            Value::List(values) => {
                write!(f, "[")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{value}")?;
                }
                write!(f, "]")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(input: &str) -> Value {
        let first = parse_value(input).unwrap_or_else(|e| panic!("parse {input:?}: {e}"));
        let rendered = first.to_string();
        let second =
            parse_value(&rendered).unwrap_or_else(|e| panic!("reparse {rendered:?}: {e}"));
        assert_eq!(first, second, "round-trip of {input:?} via {rendered:?}");
        first
    }

    #[test]
    fn test_plain_integers() {
        assert_eq!(roundtrip("1234"), Value::Integer(1234));
        assert_eq!(roundtrip("0"), Value::Integer(0));
        assert_eq!(roundtrip("-1"), Value::Integer(-1));
    }

    #[test]
    fn test_leading_zero_is_octal() {
        assert_eq!(parse_value("0644"), Ok(Value::Integer(420)));
        assert_eq!(parse_value("0555"), Ok(Value::Integer(365)));
        assert_eq!(parse_value("0"), Ok(Value::Integer(0)));
        // Negative numbers stay decimal.
        assert_eq!(parse_value("-0644"), Ok(Value::Integer(-644)));
    }

    #[test]
    fn test_bad_octal_digit_is_an_error() {
        assert!(parse_value("0998").is_err(), "9 is not an octal digit");
    }

    #[test]
    fn test_pointer() {
        assert_eq!(roundtrip("0x13"), Value::Pointer(0x13));
        assert_eq!(roundtrip("0xb42ffb90"), Value::Pointer(0xb42f_fb90));
    }

    #[test]
    fn test_symbol() {
        assert_eq!(
            roundtrip("FUTEX_WAKE_OP_PRIVATE"),
            Value::Symbol("FUTEX_WAKE_OP_PRIVATE".to_string())
        );
    }

    #[test]
    fn test_bitor_preserves_order() {
        let parsed = roundtrip("O_RDONLY|0644");
        assert_eq!(
            parsed,
            Value::BitOr(vec![
                Value::Symbol("O_RDONLY".to_string()),
                Value::Integer(420),
            ])
        );
    }

    #[test]
    fn test_single_element_bitor_degenerates() {
        assert_eq!(parse_value("POLLIN"), Ok(Value::Symbol("POLLIN".to_string())));
        assert_eq!(parse_value("7"), Ok(Value::Integer(7)));
    }

    #[test]
    fn test_cast() {
        let parsed = roundtrip("htons(1234)");
        assert_eq!(
            parsed,
            Value::Cast {
                name: "htons".to_string(),
                args: vec![Value::Integer(1234)],
            }
        );
    }

    #[test]
    fn test_cast_with_string_argument() {
        let parsed = roundtrip("inet_addr(\"127.0.0.1\")");
        match parsed {
            Value::Cast { ref name, ref args } => {
                assert_eq!(name, "inet_addr");
                assert_eq!(args[0].as_text().as_deref(), Some("127.0.0.1"));
            }
            other => panic!("expected cast, got {other:?}"),
        }
    }

    #[test]
    fn test_hex_is_not_a_cast() {
        // `0x13` must not be read as symbol `0x13` or a cast head.
        assert_eq!(parse_value("0x13"), Ok(Value::Pointer(0x13)));
    }

    #[test]
    fn test_timestamp_wins_over_arithmetic() {
        let parsed = roundtrip("2010/04/22-10:57:45");
        match parsed {
            Value::Timestamp(ts) => {
                assert_eq!(ts.format("%Y-%m-%d %H:%M:%S").to_string(), "2010-04-22 10:57:45");
            }
            other => panic!("expected timestamp, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_string() {
        assert_eq!(
            parse_value("\"\""),
            Ok(Value::Bytes { data: Vec::new(), truncated: false })
        );
    }

    #[test]
    fn test_truncated_string() {
        assert_eq!(
            roundtrip("\"\"..."),
            Value::Bytes { data: Vec::new(), truncated: true }
        );
    }

    #[test]
    fn test_string_escapes() {
        let parsed = parse_value(r#""$\7\1\0&\0\2\0|\0\0\0""#).expect("escaped string");
        assert_eq!(
            parsed,
            Value::Bytes {
                data: vec![b'$', 7, 1, 0, b'&', 0, 2, 0, b'|', 0, 0, 0],
                truncated: false,
            }
        );
        // Re-rendering uses three-digit octal, which must reparse equal.
        let again = parse_value(&parsed.to_string()).expect("reparse");
        assert_eq!(parsed, again);
    }

    #[test]
    fn test_anonymous_struct() {
        assert_eq!(
            roundtrip("{1234, 0x1234}"),
            Value::Struct(StructBody::Anonymous(vec![
                Value::Integer(1234),
                Value::Pointer(0x1234),
            ]))
        );
    }

    #[test]
    fn test_empty_struct_is_anonymous() {
        assert_eq!(
            parse_value("{}"),
            Ok(Value::Struct(StructBody::Anonymous(Vec::new())))
        );
    }

    #[test]
    fn test_named_struct() {
        assert_eq!(
            roundtrip("{fd=1, events=POLLIN|POLLPRI}"),
            Value::Struct(StructBody::Named(vec![
                ("fd".to_string(), Value::Integer(1)),
                (
                    "events".to_string(),
                    Value::BitOr(vec![
                        Value::Symbol("POLLIN".to_string()),
                        Value::Symbol("POLLPRI".to_string()),
                    ])
                ),
            ]))
        );
    }

    #[test]
    fn test_named_struct_with_colons() {
        let parsed = parse_value("{entry_number:6, base_addr:0xb42ffb90, limit:1048575}")
            .expect("colon-separated struct");
        assert_eq!(
            parsed.field("entry_number").and_then(Value::as_int),
            Some(6)
        );
        assert_eq!(parsed.field("limit").and_then(Value::as_int), Some(1048575));
    }

    #[test]
    fn test_named_struct_drops_ellipsis() {
        let parsed = parse_value("{st_mode=S_IFREG|0644, st_size=1997, ...}")
            .expect("struct with elided tail");
        match parsed {
            Value::Struct(StructBody::Named(ref fields)) => {
                assert_eq!(fields.len(), 2, "ellipsis must not become a field");
                assert_eq!(fields[1].0, "st_size");
            }
            other => panic!("expected named struct, got {other:?}"),
        }
    }

    #[test]
    fn test_struct_with_truncated_string_falls_back_to_anonymous() {
        assert_eq!(
            roundtrip("{\"\"..., 0}"),
            Value::Struct(StructBody::Anonymous(vec![
                Value::Bytes { data: Vec::new(), truncated: true },
                Value::Integer(0),
            ]))
        );
    }

    #[test]
    fn test_list() {
        assert_eq!(roundtrip("[0]"), Value::List(vec![Value::Integer(0)]));
        assert_eq!(parse_value("[]"), Ok(Value::List(Vec::new())));
    }

    #[test]
    fn test_nested_list_and_struct() {
        let parsed = roundtrip("[0, {fd=1}]");
        assert_eq!(
            parsed,
            Value::List(vec![
                Value::Integer(0),
                Value::Struct(StructBody::Named(vec![(
                    "fd".to_string(),
                    Value::Integer(1)
                )])),
            ])
        );
    }

    #[test]
    fn test_deep_nesting() {
        let parsed = roundtrip("[3, {st_mode=S_IFREG|0644, st_size=1997}]");
        assert_eq!(parsed.item(0).and_then(Value::as_int), Some(3));
        let inner = parsed.item(1).expect("struct element");
        assert_eq!(inner.field("st_size").and_then(Value::as_int), Some(1997));
    }

    #[test]
    fn test_grammar_error_carries_offset() {
        let err = parse_value("{fd=}").expect_err("dangling field value");
        assert!(err.offset > 0);
        assert!(!err.expected.is_empty());
    }
}
