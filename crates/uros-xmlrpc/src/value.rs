/// The small value tagged union XML-RPC needs for the Master/Slave APIs.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i32),
    Bool(bool),
    Double(f64),
    Str(String),
    Base64(Vec<u8>),
    Struct(Vec<(String, Value)>),
    Array(Vec<Value>),
    /// Stored as the raw ISO-8601 text; the engine never needs to do
    /// date arithmetic on it.
    DateTime(String),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_owned())
    }
}
impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}
impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i)
    }
}
impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}
impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

/// One XML-RPC `<methodCall>`: a method name and a flat parameter array.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCall {
    pub name: String,
    pub params: Vec<Value>,
}

impl MethodCall {
    pub fn new(name: impl Into<String>, params: Vec<Value>) -> Self {
        Self { name: name.into(), params }
    }
}

/// The three-element `[code, statusMessage, value]` shape every Slave
/// method and every Master call returns.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub code: i32,
    pub message: String,
    pub value: Value,
}

impl Reply {
    pub fn ok(message: impl Into<String>, value: Value) -> Self {
        Self { code: 1, message: message.into(), value }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self { code: 0, message: message.into(), value: Value::Int(0) }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { code: -1, message: message.into(), value: Value::Int(0) }
    }

    pub fn into_value(self) -> Value {
        Value::Array(vec![Value::Int(self.code), Value::Str(self.message), self.value])
    }

    pub fn from_value(value: Value) -> Option<Self> {
        let items = value.as_array()?;
        if items.len() != 3 {
            return None;
        }
        let code = items[0].as_int()?;
        let message = items[1].as_str()?.to_owned();
        Some(Reply { code, message, value: items[2].clone() })
    }
}
