use bytes::Bytes;

/// A value captured during a parse.
///
/// Words decode to [`Value::Number`]; `buffer` reads store the raw slice
/// as [`Value::Bytes`]. Numbers are `f64` because word decoding is done
/// by power-of-256 summation (see `binchain_wire::WordOp::decode`), so a
/// 64-bit word above 2^53 is already rounded by the time it lands here.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Number(f64),
    Bytes(Bytes),
}

impl Value {
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Bytes(_) => None,
        }
    }

    #[must_use]
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Value::Bytes(b) => Some(b),
            Value::Number(_) => None,
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<Bytes> for Value {
    fn from(b: Bytes) -> Self {
        Value::Bytes(b)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(Bytes::from(b))
    }
}
