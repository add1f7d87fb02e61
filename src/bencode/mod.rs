mod decoder;
mod value;

pub use decoder::decode;
pub use value::BencodeValue;
