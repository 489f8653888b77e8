use super::{RecordClass, RecordType, Result, ZoneError, ZoneRecord};
use std::collections::HashMap;
use std::time::SystemTime;

/// A DNS zone: the payload published to zone observers
#[derive(Debug, Clone)]
pub struct Zone {
    /// Zone origin without trailing dot (e.g., "example.com")
    pub origin: String,
    /// Default TTL for records without explicit TTL
    pub default_ttl: u32,
    /// Zone serial number (from SOA when present)
    pub serial: u32,
    pub class: RecordClass,
    /// Zone file path (if loaded from file)
    pub file_path: Option<String>,
    pub last_modified: SystemTime,
    /// Records indexed by normalized owner name
    records: HashMap<String, Vec<ZoneRecord>>,
    soa_record: Option<ZoneRecord>,
}

impl Zone {
    /// Create a new empty zone
    pub fn new(origin: impl AsRef<str>, default_ttl: u32) -> Self {
        Self {
            origin: origin.as_ref().trim_end_matches('.').to_lowercase(),
            default_ttl,
            serial: Self::generate_serial(),
            class: RecordClass::IN,
            file_path: None,
            last_modified: SystemTime::now(),
            records: HashMap::new(),
            soa_record: None,
        }
    }

    /// Date-based serial (YYYYMMDD00)
    fn generate_serial() -> u32 {
        use chrono::{Datelike, Local};

        let now = Local::now();
        now.year() as u32 * 1_000_000 + now.month() * 10_000 + now.day() * 100
    }

    /// Add a record to the zone
    pub fn add_record(&mut self, record: ZoneRecord) -> Result<()> {
        if record.rtype == RecordType::SOA {
            if self.soa_record.is_some() {
                return Err(ZoneError::DuplicateSOA);
            }
            if let Some(serial) = record.soa_serial() {
                self.serial = serial;
            }
            self.soa_record = Some(record.clone());
        }

        let owner = self.normalize_name(&record.name)?;
        self.records.entry(owner).or_default().push(record);

        self.last_modified = SystemTime::now();
        Ok(())
    }

    /// All records at `name`, optionally filtered by type
    pub fn get_records(&self, name: &str, rtype: Option<RecordType>) -> Vec<&ZoneRecord> {
        let Ok(owner) = self.normalize_name(name) else {
            return Vec::new();
        };

        self.records
            .get(&owner)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| rtype.is_none_or(|t| r.rtype == t))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn get_soa(&self) -> Option<&ZoneRecord> {
        self.soa_record.as_ref()
    }

    pub fn get_ns_records(&self) -> Vec<&ZoneRecord> {
        self.get_records(&self.origin, Some(RecordType::NS))
    }

    /// Check if this zone is authoritative for a given name
    pub fn is_authoritative_for(&self, name: &str) -> bool {
        let name = name.trim_end_matches('.').to_lowercase();
        name == self.origin || name.ends_with(&format!(".{}", self.origin))
    }

    /// Validate the zone before it is published
    pub fn validate(&self) -> Result<()> {
        if self.soa_record.is_none() {
            return Err(ZoneError::MissingSOA);
        }

        if self.get_ns_records().is_empty() {
            return Err(ZoneError::ValidationError(
                "Zone must have at least one NS record".to_string(),
            ));
        }

        for record in self.records() {
            record.validate_rdata()?;
        }

        Ok(())
    }

    /// Iterate over all records in the zone
    pub fn records(&self) -> impl Iterator<Item = &ZoneRecord> {
        self.records.values().flatten()
    }

    pub fn record_count(&self) -> usize {
        self.records.values().map(Vec::len).sum()
    }

    /// All owner names present in the zone
    pub fn names(&self) -> Vec<&String> {
        self.records.keys().collect()
    }

    /// Normalize an owner name relative to the zone origin
    pub(crate) fn normalize_name(&self, name: &str) -> Result<String> {
        let name = name.trim();
        if name.contains("..") {
            return Err(ZoneError::InvalidDomainName(name.to_string()));
        }

        let lower = name.to_lowercase();

        if self.origin.is_empty() {
            return Ok(lower.trim_end_matches('.').to_string());
        }

        if name.is_empty() || name == "@" {
            Ok(self.origin.clone())
        } else if lower.ends_with('.') {
            Ok(lower.trim_end_matches('.').to_string())
        } else if lower == self.origin || lower.ends_with(&format!(".{}", self.origin)) {
            Ok(lower)
        } else {
            Ok(format!("{}.{}", lower, self.origin))
        }
    }

    pub fn stats(&self) -> ZoneStats {
        let mut stats = ZoneStats::default();

        for record in self.records() {
            stats.total_records += 1;
            match record.rtype {
                RecordType::A => stats.a_records += 1,
                RecordType::AAAA => stats.aaaa_records += 1,
                RecordType::NS => stats.ns_records += 1,
                RecordType::CNAME => stats.cname_records += 1,
                RecordType::MX => stats.mx_records += 1,
                RecordType::TXT => stats.txt_records += 1,
                RecordType::SOA => stats.soa_records += 1,
                _ => stats.other_records += 1,
            }
        }

        stats
    }
}

/// Zone statistics
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ZoneStats {
    pub total_records: usize,
    pub a_records: usize,
    pub aaaa_records: usize,
    pub ns_records: usize,
    pub cname_records: usize,
    pub mx_records: usize,
    pub txt_records: usize,
    pub soa_records: usize,
    pub other_records: usize,
}
