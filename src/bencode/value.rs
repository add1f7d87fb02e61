use std::collections::BTreeMap;

/// Represents a bencoded value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BencodeValue {
    /// Integer: i<number>e
    Integer(i64),
    /// Byte string: <length>:<contents>
    Bytes(Vec<u8>),
    /// List: l<values>e
    List(Vec<BencodeValue>),
    /// Dictionary: d<key-value pairs>e
    Dict(BTreeMap<Vec<u8>, BencodeValue>),
}

impl BencodeValue {
    /// Try to get this value as an integer
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            BencodeValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to get this value as a byte string
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            BencodeValue::Bytes(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get this value as a dictionary
    pub fn as_dict(&self) -> Option<&BTreeMap<Vec<u8>, BencodeValue>> {
        match self {
            BencodeValue::Dict(d) => Some(d),
            _ => None,
        }
    }

    /// Short name of the variant, used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            BencodeValue::Integer(_) => "integer",
            BencodeValue::Bytes(_) => "byte string",
            BencodeValue::List(_) => "list",
            BencodeValue::Dict(_) => "dictionary",
        }
    }
}

/// Fixture helpers: building, encoding and loose lookups are only needed by tests
#[cfg(test)]
impl BencodeValue {
    /// Try to get this value as a UTF-8 string
    pub fn as_str(&self) -> Option<&str> {
        self.as_bytes()
            .and_then(|b| std::str::from_utf8(b).ok())
    }

    /// Try to get this value as a list
    pub fn as_list(&self) -> Option<&[BencodeValue]> {
        match self {
            BencodeValue::List(l) => Some(l),
            _ => None,
        }
    }

    /// Get a value from a dictionary by key
    pub fn dict_get(&self, key: &[u8]) -> Option<&BencodeValue> {
        self.as_dict()?.get(key)
    }

    /// Create a byte string value from a &str
    pub fn string(s: &str) -> Self {
        BencodeValue::Bytes(s.as_bytes().to_vec())
    }

    /// Create an empty dict
    pub fn dict() -> Self {
        BencodeValue::Dict(BTreeMap::new())
    }

    /// Insert a key-value pair into a dict (builder pattern)
    pub fn insert(mut self, key: &str, value: BencodeValue) -> Self {
        if let BencodeValue::Dict(ref mut dict) = self {
            dict.insert(key.as_bytes().to_vec(), value);
        }
        self
    }

    /// Encode to bencoded bytes
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.encode_into(&mut buf);
        buf
    }

    fn encode_into(&self, buf: &mut Vec<u8>) {
        fn put_bytes(bytes: &[u8], buf: &mut Vec<u8>) {
            buf.extend_from_slice(format!("{}:", bytes.len()).as_bytes());
            buf.extend_from_slice(bytes);
        }

        match self {
            BencodeValue::Integer(i) => buf.extend_from_slice(format!("i{}e", i).as_bytes()),
            BencodeValue::Bytes(bytes) => put_bytes(bytes, buf),
            BencodeValue::List(list) => {
                buf.push(b'l');
                list.iter().for_each(|item| item.encode_into(buf));
                buf.push(b'e');
            }
            BencodeValue::Dict(dict) => {
                buf.push(b'd');
                for (key, value) in dict {
                    put_bytes(key, buf);
                    value.encode_into(buf);
                }
                buf.push(b'e');
            }
        }
    }
}
