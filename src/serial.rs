use serde::{Serialize, Serializer};

use crate::error::Error;

/// A 10-byte ASCII device serial, as exchanged on the wire (dongle header,
/// embedded Modbus frame) and in device-hierarchy identifiers.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Serial([u8; 10]);

impl Serial {
    pub fn new(bytes: &[u8]) -> Result<Self, Error> {
        let arr: [u8; 10] = bytes
            .try_into()
            .map_err(|_| Error::validation("serial must be exactly 10 bytes"))?;
        Ok(Self(arr))
    }

    pub fn data(&self) -> [u8; 10] {
        self.0
    }

    pub fn as_bytes(&self) -> &[u8; 10] {
        &self.0
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_vec()
    }
}

impl From<[u8; 10]> for Serial {
    fn from(bytes: [u8; 10]) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for Serial {
    fn from(bytes: &[u8]) -> Self {
        let mut result = [0u8; 10];
        let n = std::cmp::min(bytes.len(), 10);
        result[..n].copy_from_slice(&bytes[..n]);
        Self(result)
    }
}

impl From<&str> for Serial {
    fn from(s: &str) -> Self {
        let mut result = [0u8; 10];
        let bytes = s.as_bytes();
        let n = std::cmp::min(bytes.len(), 10);
        result[..n].copy_from_slice(&bytes[..n]);
        Self(result)
    }
}

impl std::fmt::Display for Serial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0).trim_end_matches('\0'))
    }
}

impl std::fmt::Debug for Serial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)
    }
}

impl Serialize for Serial {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl std::str::FromStr for Serial {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 10 {
            return Err(Error::validation(format!(
                "serial {:?} must be exactly 10 characters",
                s
            )));
        }
        Ok(Self::from(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_display() {
        let s = Serial::from("CE12345678");
        assert_eq!(s.to_string(), "CE12345678");
    }

    #[test]
    fn rejects_wrong_length_from_str() {
        use std::str::FromStr;
        assert!(Serial::from_str("short").is_err());
    }

    #[test]
    fn pads_short_byte_slices_with_nulls() {
        let s = Serial::from(&b"AB"[..]);
        assert_eq!(s.to_string(), "AB");
    }
}
