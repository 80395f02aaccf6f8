//! Recursive-descent reader and writer for the XML-RPC subset this node
//! needs: method name, flat parameter arrays and the int/bool/double/
//! string/base64/struct/array/dateTime value union. Structured as an
//! explicit cursor over a bounded text buffer rather than a DOM, matching
//! the way the rest of this workspace favours an explicit state machine
//! over pulling in a general-purpose parser for a narrow wire subset.

use crate::{
    base64,
    error::{XmlRpcError, XmlRpcResult},
    value::{MethodCall, Value},
};

struct Cursor<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn skip_ws(&mut self) {
        let skipped = self.rest().len() - self.rest().trim_start().len();
        self.pos += skipped;
    }

    /// True if the next non-whitespace token is `<name>` (open, not close).
    fn peek_open(&self, name: &str) -> bool {
        self.rest().starts_with(&format!("<{name}>")) || self.rest().starts_with(&format!("<{name} "))
    }

    fn peek_any_open(&self) -> Option<&'a str> {
        let rest = self.rest();
        if !rest.starts_with('<') || rest.starts_with("</") {
            return None;
        }
        let end = rest.find('>')?;
        let raw = &rest[1..end];
        Some(raw.split_whitespace().next().unwrap_or(raw))
    }

    fn consume_open(&mut self, name: &str) -> XmlRpcResult<()> {
        self.skip_ws();
        let rest = self.rest();
        if !rest.starts_with('<') {
            return Err(XmlRpcError::UnexpectedTag { expected: name.to_owned(), got: "<eof>".to_owned() });
        }
        let end = rest
            .find('>')
            .ok_or_else(|| XmlRpcError::Malformed(format!("unterminated tag near {rest:.20}")))?;
        let tag_body = &rest[1..end];
        let tag_name = tag_body.split_whitespace().next().unwrap_or(tag_body);
        if tag_name != name {
            return Err(XmlRpcError::UnexpectedTag { expected: name.to_owned(), got: tag_name.to_owned() });
        }
        self.pos += end + 1;
        Ok(())
    }

    fn try_consume_open(&mut self, name: &str) -> bool {
        self.skip_ws();
        if self.peek_open(name) {
            self.consume_open(name).expect("peek_open guaranteed this tag");
            true
        } else {
            false
        }
    }

    fn consume_close(&mut self, name: &str) -> XmlRpcResult<()> {
        self.skip_ws();
        let expected = format!("</{name}>");
        if !self.rest().starts_with(&expected) {
            let got: String = self.rest().chars().take(expected.len().max(8)).collect();
            return Err(XmlRpcError::UnexpectedTag { expected, got });
        }
        self.pos += expected.len();
        Ok(())
    }

    /// Raw text up to (not including) the next `<`.
    fn read_text(&mut self) -> &'a str {
        let rest = self.rest();
        let end = rest.find('<').unwrap_or(rest.len());
        self.pos += end;
        &rest[..end]
    }
}

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&apos;", "'")
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn parse_value(cursor: &mut Cursor<'_>) -> XmlRpcResult<Value> {
    cursor.consume_open("value")?;
    cursor.skip_ws();

    let value = match cursor.peek_any_open() {
        Some("int") => {
            cursor.consume_open("int")?;
            let text = cursor.read_text();
            cursor.consume_close("int")?;
            Value::Int(parse_int(text)?)
        }
        Some("i4") => {
            cursor.consume_open("i4")?;
            let text = cursor.read_text();
            cursor.consume_close("i4")?;
            Value::Int(parse_int(text)?)
        }
        Some("boolean") => {
            cursor.consume_open("boolean")?;
            let text = cursor.read_text();
            cursor.consume_close("boolean")?;
            Value::Bool(text.trim() == "1")
        }
        Some("double") => {
            cursor.consume_open("double")?;
            let text = cursor.read_text();
            cursor.consume_close("double")?;
            Value::Double(
                text.trim().parse().map_err(|_| XmlRpcError::ValueRange(text.to_owned()))?,
            )
        }
        Some("string") => {
            cursor.consume_open("string")?;
            let text = unescape(cursor.read_text());
            cursor.consume_close("string")?;
            Value::Str(text)
        }
        Some("base64") => {
            cursor.consume_open("base64")?;
            let text = cursor.read_text();
            cursor.consume_close("base64")?;
            Value::Base64(
                base64::decode(text).ok_or_else(|| XmlRpcError::ValueRange("bad base64".to_owned()))?,
            )
        }
        Some("dateTime.iso8601") => {
            cursor.consume_open("dateTime.iso8601")?;
            let text = cursor.read_text().to_owned();
            cursor.consume_close("dateTime.iso8601")?;
            Value::DateTime(text)
        }
        Some("struct") => parse_struct(cursor)?,
        Some("array") => parse_array(cursor)?,
        Some(other) => {
            return Err(XmlRpcError::UnexpectedTag {
                expected: "a value tag".to_owned(),
                got: other.to_owned(),
            })
        }
        None => {
            // Implicit string: bare text with no inner tag.
            Value::Str(unescape(cursor.read_text()))
        }
    };

    cursor.skip_ws();
    cursor.consume_close("value")?;
    Ok(value)
}

fn parse_int(text: &str) -> XmlRpcResult<i32> {
    text.trim().parse().map_err(|_| XmlRpcError::ValueRange(text.to_owned()))
}

fn parse_struct(cursor: &mut Cursor<'_>) -> XmlRpcResult<Value> {
    cursor.consume_open("struct")?;
    let mut members = Vec::new();
    while cursor.try_consume_open("member") {
        cursor.skip_ws();
        cursor.consume_open("name")?;
        let name = unescape(cursor.read_text());
        cursor.consume_close("name")?;
        cursor.skip_ws();
        let value = parse_value(cursor)?;
        cursor.consume_close("member")?;
        members.push((name, value));
    }
    cursor.consume_close("struct")?;
    Ok(Value::Struct(members))
}

fn parse_array(cursor: &mut Cursor<'_>) -> XmlRpcResult<Value> {
    cursor.consume_open("array")?;
    cursor.skip_ws();
    cursor.consume_open("data")?;
    let mut items = Vec::new();
    cursor.skip_ws();
    while cursor.peek_open("value") {
        items.push(parse_value(cursor)?);
        cursor.skip_ws();
    }
    cursor.consume_close("data")?;
    cursor.consume_close("array")?;
    Ok(Value::Array(items))
}

pub fn parse_method_call(body: &str) -> XmlRpcResult<MethodCall> {
    let mut cursor = Cursor::new(body);
    cursor.consume_open("methodCall")?;
    cursor.skip_ws();
    cursor.consume_open("methodName")?;
    let name = cursor.read_text().to_owned();
    cursor.consume_close("methodName")?;
    cursor.skip_ws();

    let mut params = Vec::new();
    if cursor.try_consume_open("params") {
        cursor.skip_ws();
        while cursor.try_consume_open("param") {
            cursor.skip_ws();
            params.push(parse_value(&mut cursor)?);
            cursor.consume_close("param")?;
            cursor.skip_ws();
        }
        cursor.consume_close("params")?;
    }
    cursor.skip_ws();
    cursor.consume_close("methodCall")?;
    Ok(MethodCall { name, params })
}

/// A `<methodResponse>` always carries exactly one `<param><value>`.
pub fn parse_method_response(body: &str) -> XmlRpcResult<Value> {
    let mut cursor = Cursor::new(body);
    cursor.consume_open("methodResponse")?;
    cursor.skip_ws();
    cursor.consume_open("params")?;
    cursor.skip_ws();
    cursor.consume_open("param")?;
    cursor.skip_ws();
    let value = parse_value(&mut cursor)?;
    cursor.skip_ws();
    cursor.consume_close("param")?;
    cursor.skip_ws();
    cursor.consume_close("params")?;
    cursor.skip_ws();
    cursor.consume_close("methodResponse")?;
    Ok(value)
}

fn write_value(out: &mut String, value: &Value) {
    out.push_str("<value>");
    match value {
        Value::Int(i) => out.push_str(&format!("<int>{i}</int>")),
        Value::Bool(b) => out.push_str(&format!("<boolean>{}</boolean>", if *b { 1 } else { 0 })),
        Value::Double(d) => out.push_str(&format!("<double>{d}</double>")),
        Value::Str(s) => out.push_str(&format!("<string>{}</string>", escape(s))),
        Value::Base64(bytes) => out.push_str(&format!("<base64>{}</base64>", base64::encode(bytes))),
        Value::DateTime(s) => out.push_str(&format!("<dateTime.iso8601>{s}</dateTime.iso8601>")),
        Value::Struct(members) => {
            out.push_str("<struct>");
            for (name, value) in members {
                out.push_str("<member>");
                out.push_str(&format!("<name>{}</name>", escape(name)));
                write_value(out, value);
                out.push_str("</member>");
            }
            out.push_str("</struct>");
        }
        Value::Array(items) => {
            out.push_str("<array><data>");
            for item in items {
                write_value(out, item);
            }
            out.push_str("</data></array>");
        }
    }
    out.push_str("</value>");
}

pub fn write_method_call(call: &MethodCall) -> String {
    let mut out = String::from("<?xml version=\"1.0\"?><methodCall>");
    out.push_str(&format!("<methodName>{}</methodName>", escape(&call.name)));
    out.push_str("<params>");
    for param in &call.params {
        out.push_str("<param>");
        write_value(&mut out, param);
        out.push_str("</param>");
    }
    out.push_str("</params></methodCall>");
    out
}

pub fn write_method_response(value: &Value) -> String {
    let mut out = String::from("<?xml version=\"1.0\"?><methodResponse><params><param>");
    write_value(&mut out, value);
    out.push_str("</param></params></methodResponse>");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_call_round_trips() {
        let call = MethodCall::new(
            "requestTopic",
            vec![Value::Str("/node".into()), Value::Str("/chatter".into()), Value::Array(vec![Value::Array(vec![Value::Str("TCPROS".into())])])],
        );
        let xml = write_method_call(&call);
        let parsed = parse_method_call(&xml).unwrap();
        assert_eq!(parsed, call);
    }

    #[test]
    fn method_response_round_trips_three_element_array() {
        let value = Value::Array(vec![
            Value::Int(1),
            Value::Str("ok".into()),
            Value::Array(vec![Value::Str("TCPROS".into()), Value::Str("10.0.0.1".into()), Value::Int(9000)]),
        ]);
        let xml = write_method_response(&value);
        let parsed = parse_method_response(&xml).unwrap();
        assert_eq!(parsed, value);
    }

    #[test]
    fn struct_values_round_trip() {
        let value = Value::Struct(vec![("a".into(), Value::Int(1)), ("b".into(), Value::Bool(true))]);
        let mut out = String::new();
        write_value(&mut out, &value);
        let mut cursor = Cursor::new(&out);
        assert_eq!(parse_value(&mut cursor).unwrap(), value);
    }

    #[test]
    fn escapes_special_characters_in_strings() {
        let call = MethodCall::new("x", vec![Value::Str("<a> & \"b\"".into())]);
        let xml = write_method_call(&call);
        let parsed = parse_method_call(&xml).unwrap();
        assert_eq!(parsed.params[0], Value::Str("<a> & \"b\"".into()));
    }

    #[test]
    fn unexpected_tag_is_reported() {
        let bad = "<methodCall><methodName>x</methodName><params><param><value><int>1</int></value></bogus></param></params></methodCall>";
        let err = parse_method_call(bad).unwrap_err();
        assert!(matches!(err, XmlRpcError::UnexpectedTag { .. }));
    }
}
