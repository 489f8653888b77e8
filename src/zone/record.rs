use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use super::ZoneError;

/// Resource record types accepted in zone files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordType {
    A,
    AAAA,
    NS,
    CNAME,
    SOA,
    PTR,
    MX,
    TXT,
    SRV,
    CAA,
}

impl FromStr for RecordType {
    type Err = ZoneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "A" => Ok(Self::A),
            "AAAA" => Ok(Self::AAAA),
            "NS" => Ok(Self::NS),
            "CNAME" => Ok(Self::CNAME),
            "SOA" => Ok(Self::SOA),
            "PTR" => Ok(Self::PTR),
            "MX" => Ok(Self::MX),
            "TXT" => Ok(Self::TXT),
            "SRV" => Ok(Self::SRV),
            "CAA" => Ok(Self::CAA),
            _ => Err(ZoneError::InvalidRRType(s.to_string())),
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::A => "A",
            Self::AAAA => "AAAA",
            Self::NS => "NS",
            Self::CNAME => "CNAME",
            Self::SOA => "SOA",
            Self::PTR => "PTR",
            Self::MX => "MX",
            Self::TXT => "TXT",
            Self::SRV => "SRV",
            Self::CAA => "CAA",
        };
        f.write_str(name)
    }
}

/// Record class; zone files are almost always IN
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RecordClass {
    #[default]
    IN,
    CH,
    HS,
}

impl FromStr for RecordClass {
    type Err = ZoneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "IN" => Ok(Self::IN),
            "CH" => Ok(Self::CH),
            "HS" => Ok(Self::HS),
            _ => Err(ZoneError::ParseError(format!("Unknown class: {}", s))),
        }
    }
}

impl fmt::Display for RecordClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IN => f.write_str("IN"),
            Self::CH => f.write_str("CH"),
            Self::HS => f.write_str("HS"),
        }
    }
}

/// A single resource record as written in a zone file
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneRecord {
    /// Owner name (relative to zone origin or FQDN)
    pub name: String,
    /// Explicit TTL, if any
    pub ttl: Option<u32>,
    pub class: RecordClass,
    pub rtype: RecordType,
    /// Record data in presentation format
    pub rdata: String,
}

impl ZoneRecord {
    pub fn new(
        name: impl Into<String>,
        ttl: Option<u32>,
        class: RecordClass,
        rtype: RecordType,
        rdata: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            ttl,
            class,
            rtype,
            rdata: rdata.into(),
        }
    }

    /// TTL to serve this record with
    pub fn effective_ttl(&self, default_ttl: u32) -> u32 {
        self.ttl.unwrap_or(default_ttl)
    }

    /// Check that the rdata is well-formed for the record type
    pub fn validate_rdata(&self) -> Result<(), ZoneError> {
        let fields: Vec<&str> = self.rdata.split_whitespace().collect();
        let invalid = |what: &str| {
            ZoneError::InvalidRecord(format!(
                "{} {}: {} '{}'",
                self.name, self.rtype, what, self.rdata
            ))
        };

        match self.rtype {
            RecordType::A => {
                self.rdata
                    .trim()
                    .parse::<Ipv4Addr>()
                    .map_err(|_| invalid("invalid IPv4 address"))?;
            }
            RecordType::AAAA => {
                self.rdata
                    .trim()
                    .parse::<Ipv6Addr>()
                    .map_err(|_| invalid("invalid IPv6 address"))?;
            }
            RecordType::NS | RecordType::CNAME | RecordType::PTR => {
                if fields.len() != 1 {
                    return Err(invalid("expected a single domain name"));
                }
            }
            RecordType::MX => {
                if fields.len() != 2 || fields[0].parse::<u16>().is_err() {
                    return Err(invalid("expected '<preference> <exchange>'"));
                }
            }
            RecordType::SOA => {
                if fields.len() != 7 || fields[2..].iter().any(|f| f.parse::<u32>().is_err()) {
                    return Err(invalid(
                        "expected '<mname> <rname> <serial> <refresh> <retry> <expire> <minimum>'",
                    ));
                }
            }
            RecordType::SRV => {
                if fields.len() != 4 || fields[..3].iter().any(|f| f.parse::<u16>().is_err()) {
                    return Err(invalid("expected '<priority> <weight> <port> <target>'"));
                }
            }
            RecordType::CAA => {
                if fields.len() < 3 || fields[0].parse::<u8>().is_err() {
                    return Err(invalid("expected '<flags> <tag> <value>'"));
                }
            }
            RecordType::TXT => {
                if self.rdata.trim().is_empty() {
                    return Err(invalid("empty TXT data"));
                }
            }
        }

        Ok(())
    }

    /// SOA serial, if this is a well-formed SOA record
    pub fn soa_serial(&self) -> Option<u32> {
        if self.rtype != RecordType::SOA {
            return None;
        }
        self.rdata.split_whitespace().nth(2)?.parse().ok()
    }
}
