use crate::value::{Cursor, GrammarError, Value};

/// One fully parsed trace line: `name(args) = retval [ERRCONST] [(note)]`.
#[derive(Debug, Clone, PartialEq)]
pub struct CallRecord {
    pub func: String,
    pub args: CallArgs,
    pub return_value: i64,
    pub error_symbol: Option<String>,
    pub annotation: Option<Annotation>,
}

/// Arguments are named only when every top-level argument is a `key=value`
/// pair or a named struct; anything else makes the whole list positional.
#[derive(Debug, Clone, PartialEq)]
pub enum CallArgs {
    Positional(Vec<Value>),
    Named(Vec<(String, Value)>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    In,
    Out,
}

/// Parenthesized suffix after the return value. Select/poll-style lines
/// carry a bracketed ready-descriptor list, optionally tagged `in`/`out`;
/// errno lines carry a plain explanatory phrase.
#[derive(Debug, Clone, PartialEq)]
pub enum Annotation {
    Directional {
        dir: Option<Direction>,
        values: Vec<Value>,
    },
    FreeText(String),
}

impl CallRecord {
    /// Positional argument by index; `None` for named argument lists.
    pub fn arg(&self, idx: usize) -> Option<&Value> {
        match &self.args {
            CallArgs::Positional(values) => values.get(idx),
            CallArgs::Named(_) => None,
        }
    }
}

/// Parse one complete trace line. Any mismatch fails the whole line.
pub fn parse_record(line: &str) -> Result<CallRecord, GrammarError> {
    let mut cursor = Cursor::new(line);
    cursor.skip_ws();
    let func = cursor.ident()?;
    cursor.expect(b'(', "`(` after call name")?;
    let args = call_args(&mut cursor)?;
    cursor.expect(b')', "`)` closing arguments")?;
    cursor.skip_ws();
    cursor.expect(b'=', "`=` before return value")?;
    cursor.skip_ws();
    let return_value = cursor.integer()?;
    cursor.skip_ws();

    let error_symbol = match cursor.peek() {
        Some(c) if c.is_ascii_alphanumeric() || c == b'_' => Some(cursor.ident()?),
        _ => None,
    };
    cursor.skip_ws();

    let annotation = if cursor.eat(b'(') {
        Some(annotation(&mut cursor)?)
    } else {
        None
    };
    cursor.skip_ws();
    if !cursor.at_end() {
        return Err(cursor.error("end of line"));
    }

    Ok(CallRecord {
        func,
        args,
        return_value,
        error_symbol,
        annotation,
    })
}

/// Named pairs first; if that grammar does not consume the whole argument
/// list, reparse as plain comma-delimited values.
fn call_args(cursor: &mut Cursor) -> Result<CallArgs, GrammarError> {
    cursor.skip_ws();
    if cursor.peek() == Some(b')') {
        return Ok(CallArgs::Positional(Vec::new()));
    }
    let save = cursor.pos();
    if let Ok(named) = named_args(cursor) {
        cursor.skip_ws();
        if cursor.peek() == Some(b')') {
            return Ok(CallArgs::Named(named));
        }
    }
    cursor.set_pos(save);
    Ok(CallArgs::Positional(cursor.comma_values()?))
}

fn named_args(cursor: &mut Cursor) -> Result<Vec<(String, Value)>, GrammarError> {
    let mut pairs = Vec::new();
    loop {
        cursor.skip_ws();
        if cursor.eat(b'{') {
            // A bare named struct among named args keeps its first field's
            // name as the key for the whole aggregate.
            let fields = cursor.named_fields()?;
            let key = match fields.first() {
                Some((name, _)) => name.clone(),
                None => return Err(cursor.error("named struct field")),
            };
            pairs.push((key, Value::Struct(crate::value::StructBody::Named(fields))));
        } else {
            let key = cursor.ident()?;
            cursor.skip_ws();
            if !(cursor.eat(b'=') || cursor.eat(b':')) {
                return Err(cursor.error("`=` or `:` after argument name"));
            }
            let value = cursor.value()?;
            pairs.push((key, value));
        }
        cursor.skip_ws();
        if !cursor.eat(b',') {
            return Ok(pairs);
        }
    }
}

fn annotation(cursor: &mut Cursor) -> Result<Annotation, GrammarError> {
    cursor.skip_ws();
    let save = cursor.pos();
    if let Ok(ann) = directional(cursor) {
        return Ok(ann);
    }
    cursor.set_pos(save);
    free_text(cursor)
}

fn directional(cursor: &mut Cursor) -> Result<Annotation, GrammarError> {
    let dir = if cursor.eat_str("in ") || cursor.eat_str("in[") {
        cursor.set_pos(cursor.pos() - 1);
        Some(Direction::In)
    } else if cursor.eat_str("out ") || cursor.eat_str("out[") {
        cursor.set_pos(cursor.pos() - 1);
        Some(Direction::Out)
    } else {
        None
    };
    cursor.skip_ws();
    cursor.expect(b'[', "`[` opening descriptor list")?;
    let values = cursor.comma_values()?;
    cursor.expect(b']', "`]` closing descriptor list")?;
    cursor.skip_ws();
    cursor.expect(b')', "`)` closing annotation")?;
    Ok(Annotation::Directional { dir, values })
}

fn free_text(cursor: &mut Cursor) -> Result<Annotation, GrammarError> {
    let mut text = String::new();
    while let Some(byte) = cursor.peek() {
        if byte.is_ascii_alphabetic() || byte == b' ' {
            text.push(byte as char);
            cursor.set_pos(cursor.pos() + 1);
        } else {
            break;
        }
    }
    if text.is_empty() {
        return Err(cursor.error("annotation text"));
    }
    cursor.expect(b')', "`)` closing annotation")?;
    Ok(Annotation::FreeText(text))
}
