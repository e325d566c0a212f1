use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessKind {
    Load,
    Store,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemRecord {
    pub kind: AccessKind,
    pub address: u64,
    // width of the access in bytes; the cache always moves whole blocks
    pub size: u64,
}

impl MemRecord {
    pub fn load(address: u64, size: u64) -> Self {
        MemRecord {
            kind: AccessKind::Load,
            address,
            size,
        }
    }

    pub fn store(address: u64, size: u64) -> Self {
        MemRecord {
            kind: AccessKind::Store,
            address,
            size,
        }
    }

    pub fn is_store(&self) -> bool {
        self.kind == AccessKind::Store
    }
}

impl fmt::Display for AccessKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessKind::Load => write!(f, "L"),
            AccessKind::Store => write!(f, "S"),
        }
    }
}

impl fmt::Display for MemRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:x},{}", self.kind, self.address, self.size)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    InvalidFormat(String),
    InvalidOperation(char),
    InvalidAddress(String),
    InvalidSize(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::InvalidFormat(line) => write!(f, "input format error: {:?}", line),
            ParseError::InvalidOperation(op) => write!(f, "invalid operator: {}", op),
            ParseError::InvalidAddress(addr) => write!(f, "invalid address: {}", addr),
            ParseError::InvalidSize(size) => write!(f, "invalid size: {}", size),
        }
    }
}

impl Error for ParseError {}

// <op> <hex address>,<size>, e.g. "L 7ff000388,8" or " S 0x10,4"
static TRACE_LINE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(\S)\s+(?:0[xX])?([0-9a-fA-F]+)\s*,\s*(0[xX][0-9a-fA-F]+|[0-9]+)\s*$")
        .expect("failed to compile regex")
});

fn parse_size(size: &str) -> Option<u64> {
    match size.strip_prefix("0x").or_else(|| size.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => size.parse().ok(),
    }
}

impl FromStr for MemRecord {
    type Err = ParseError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = TRACE_LINE_PATTERN
            .captures(s)
            .ok_or_else(|| ParseError::InvalidFormat(s.trim_end().to_string()))?;

        let kind = match &caps[1] {
            "L" => AccessKind::Load,
            "S" => AccessKind::Store,
            other => {
                return Err(ParseError::InvalidOperation(
                    other.chars().next().unwrap_or('?'),
                ));
            }
        };
        let address = u64::from_str_radix(&caps[2], 16)
            .map_err(|_| ParseError::InvalidAddress(caps[2].to_string()))?;
        let size =
            parse_size(&caps[3]).ok_or_else(|| ParseError::InvalidSize(caps[3].to_string()))?;

        Ok(MemRecord {
            kind,
            address,
            size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_load_and_store() {
        assert_eq!(
            "L 7ff000388,8".parse::<MemRecord>(),
            Ok(MemRecord::load(0x7ff000388, 8))
        );
        assert_eq!(
            " S 0x10,4\n".parse::<MemRecord>(),
            Ok(MemRecord::store(0x10, 4))
        );
    }

    #[test]
    fn parses_hex_size() {
        let rec: MemRecord = "S ff,0x10".parse().unwrap();
        assert_eq!(rec.size, 16);
        assert!(rec.is_store());
    }

    #[test]
    fn display_matches_trace_form() {
        let rec = MemRecord::store(0xdead, 2);
        assert_eq!(rec.to_string(), "S dead,2");
        assert_eq!(rec.to_string().parse::<MemRecord>(), Ok(rec));
    }

    #[test]
    fn rejects_unknown_operation() {
        assert_eq!(
            "M 10,4".parse::<MemRecord>(),
            Err(ParseError::InvalidOperation('M'))
        );
    }

    #[test]
    fn rejects_bad_layout() {
        assert!(matches!(
            "L 10".parse::<MemRecord>(),
            Err(ParseError::InvalidFormat(_))
        ));
        assert!(matches!(
            "L zz,4".parse::<MemRecord>(),
            Err(ParseError::InvalidFormat(_))
        ));
    }

    #[test]
    fn rejects_address_wider_than_64_bits() {
        assert!(matches!(
            "L 1ffffffffffffffff,1".parse::<MemRecord>(),
            Err(ParseError::InvalidAddress(_))
        ));
    }

    #[test]
    fn rejects_oversized_size() {
        assert!(matches!(
            "L 0,99999999999999999999999".parse::<MemRecord>(),
            Err(ParseError::InvalidSize(_))
        ));
    }
}
