use super::{RecordClass, RecordType, Result, Zone, ZoneError, ZoneRecord, constants};
use std::path::Path;
use tracing::{debug, trace};

/// RFC 1035 master file parser
///
/// Supports `$ORIGIN`, `$TTL`, `@`, inherited owner names, parenthesized
/// multi-line records and TTL unit suffixes (`1h`, `30m`, `2d`, `1w`).
pub struct ZoneParser {
    /// Origin supplied by the caller, in effect until the first `$ORIGIN`
    base_origin: String,
    current_origin: String,
    /// Origin of the zone being built: the first `$ORIGIN` of the file
    zone_origin: Option<String>,
    current_ttl: Option<u32>,
    current_class: RecordClass,
    /// Owner of the previous record, used when a line starts with whitespace
    last_owner: Option<String>,
    line_number: usize,
}

impl Default for ZoneParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ZoneParser {
    pub fn new() -> Self {
        Self {
            base_origin: String::new(),
            current_origin: String::new(),
            zone_origin: None,
            current_ttl: None,
            current_class: RecordClass::IN,
            last_owner: None,
            line_number: 0,
        }
    }

    /// Parser for files that rely on an externally known origin
    pub fn with_origin(origin: &str) -> Self {
        Self {
            base_origin: origin.trim_end_matches('.').to_lowercase(),
            ..Self::new()
        }
    }

    /// Parse a zone file from path
    pub fn parse_file<P: AsRef<Path>>(&mut self, path: P) -> Result<Zone> {
        let path = path.as_ref();

        let metadata = std::fs::metadata(path)?;
        if metadata.len() > constants::MAX_ZONE_FILE_SIZE as u64 {
            return Err(ZoneError::FileTooLarge);
        }

        let contents = std::fs::read_to_string(path)?;
        let mut zone = self.parse(&contents)?;
        zone.file_path = Some(path.to_string_lossy().to_string());

        Ok(zone)
    }

    /// Parse zone file contents into a validated zone
    pub fn parse(&mut self, contents: &str) -> Result<Zone> {
        if contents.len() > constants::MAX_ZONE_FILE_SIZE {
            return Err(ZoneError::FileTooLarge);
        }

        self.line_number = 0;
        self.last_owner = None;
        self.current_origin = self.base_origin.clone();
        self.zone_origin = (!self.base_origin.is_empty()).then(|| self.base_origin.clone());

        let mut pending = Vec::new();
        let mut buffer = String::new();
        let mut depth = 0usize;
        let mut start_line = 0;

        for raw in contents.lines() {
            self.line_number += 1;
            let line = strip_comment(raw);

            if depth == 0 {
                if line.trim().is_empty() {
                    continue;
                }
                start_line = self.line_number;
                buffer.clear();
            } else {
                buffer.push(' ');
            }

            buffer.push_str(line);
            depth = paren_depth(&buffer).ok_or_else(|| {
                ZoneError::ParseError(format!("Line {}: unbalanced ')'", self.line_number))
            })?;
            if depth > 0 {
                continue;
            }

            trace!("Parsing line {}: {}", start_line, buffer);

            let entry = std::mem::take(&mut buffer);
            if entry.trim_start().starts_with('$') {
                self.parse_directive(&entry)?;
                continue;
            }

            let record = self.parse_record(&entry).map_err(|e| {
                if start_line == self.line_number {
                    ZoneError::ParseError(format!("Line {}: {}", start_line, e))
                } else {
                    ZoneError::ParseError(format!(
                        "Lines {}-{}: {}",
                        start_line, self.line_number, e
                    ))
                }
            })?;
            pending.push(record);
        }

        if depth > 0 {
            return Err(ZoneError::ParseError(format!(
                "Unclosed parentheses starting at line {}",
                start_line
            )));
        }

        let origin = self.zone_origin.clone().ok_or_else(|| {
            ZoneError::ParseError("Zone file missing $ORIGIN directive".to_string())
        })?;

        let mut zone = Zone::new(&origin, constants::DEFAULT_TTL);
        zone.class = self.current_class;
        if let Some(ttl) = self.current_ttl {
            zone.default_ttl = ttl;
        }

        for record in pending {
            zone.add_record(record)?;
        }

        zone.validate()?;

        debug!(
            "Parsed zone {} (serial {}) with {} records",
            zone.origin,
            zone.serial,
            zone.record_count()
        );

        Ok(zone)
    }

    fn parse_directive(&mut self, line: &str) -> Result<()> {
        let parts: Vec<&str> = line.split_whitespace().collect();

        match parts[0].to_uppercase().as_str() {
            "$ORIGIN" => {
                let origin = parts.get(1).ok_or_else(|| {
                    ZoneError::ParseError("$ORIGIN requires domain name".to_string())
                })?;
                self.current_origin = origin.trim_end_matches('.').to_lowercase();
                if self.zone_origin.is_none() {
                    self.zone_origin = Some(self.current_origin.clone());
                }
                debug!("Set origin to: {}", self.current_origin);
            }
            "$TTL" => {
                let value = parts
                    .get(1)
                    .ok_or_else(|| ZoneError::ParseError("$TTL requires value".to_string()))?;
                let ttl = parse_ttl(value)?;
                self.current_ttl = Some(ttl);
                debug!("Set default TTL to: {}", ttl);
            }
            other => {
                return Err(ZoneError::ParseError(format!(
                    "Line {}: unsupported directive {}",
                    self.line_number, other
                )));
            }
        }

        Ok(())
    }

    fn parse_record(&mut self, line: &str) -> Result<ZoneRecord> {
        let tokens = tokenize(line);
        let mut tokens = tokens.iter().map(String::as_str);

        let inherits_owner = line.starts_with(' ') || line.starts_with('\t');
        let name = if inherits_owner {
            self.last_owner
                .clone()
                .ok_or_else(|| ZoneError::ParseError("No previous owner name".to_string()))?
        } else {
            let owner = tokens
                .next()
                .ok_or_else(|| ZoneError::ParseError("Empty record line".to_string()))?;
            self.qualify(owner)?
        };

        let mut ttl = None;
        let mut class = None;
        let rtype = loop {
            let token = tokens.next().ok_or_else(|| {
                ZoneError::ParseError(format!("Missing record type for {}", name))
            })?;

            if ttl.is_none() && token.starts_with(|c: char| c.is_ascii_digit()) {
                ttl = Some(parse_ttl(token)?);
            } else if let (None, Ok(parsed)) = (class, token.parse::<RecordClass>()) {
                class = Some(parsed);
            } else {
                break token.parse::<RecordType>()?;
            }
        };

        let rdata = tokens.collect::<Vec<_>>().join(" ");
        if rdata.is_empty() {
            return Err(ZoneError::InvalidRecord(format!(
                "{} {} has no data",
                name, rtype
            )));
        }

        self.last_owner = Some(name.clone());

        Ok(ZoneRecord::new(
            name,
            ttl.or(self.current_ttl),
            class.unwrap_or(self.current_class),
            rtype,
            rdata,
        ))
    }

    /// Make an owner name absolute against the origin in effect on this line
    fn qualify(&self, owner: &str) -> Result<String> {
        if owner.ends_with('.') {
            return Ok(owner.to_lowercase());
        }
        if self.current_origin.is_empty() {
            return Err(ZoneError::InvalidDomainName(format!(
                "relative name '{}' before $ORIGIN",
                owner
            )));
        }
        if owner == "@" {
            Ok(format!("{}.", self.current_origin))
        } else {
            Ok(format!("{}.{}.", owner.to_lowercase(), self.current_origin))
        }
    }
}

/// Remove a trailing `;` comment, ignoring semicolons inside quotes
fn strip_comment(line: &str) -> &str {
    let mut in_quotes = false;
    for (i, ch) in line.char_indices() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => return &line[..i],
            _ => {}
        }
    }
    line
}

/// Open parenthesis count outside quotes, or `None` if a `)` has no match
fn paren_depth(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_quotes = false;
    for ch in text.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            '(' if !in_quotes => depth += 1,
            ')' if !in_quotes => depth = depth.checked_sub(1)?,
            _ => {}
        }
    }
    Some(depth)
}

/// Split on whitespace, keeping quoted strings intact and dropping parentheses
fn tokenize(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in line.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                current.push(ch);
            }
            '(' | ')' if !in_quotes => {}
            c if c.is_whitespace() && !in_quotes => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }

    if !current.is_empty() {
        tokens.push(current);
    }

    tokens
}

/// Parse a TTL with optional unit suffixes, e.g. "3600", "1h30m", "2D"
fn parse_ttl(value: &str) -> Result<u32> {
    let invalid = || ZoneError::InvalidTTL(value.to_string());

    if let Ok(ttl) = value.parse::<u32>() {
        return Ok(ttl);
    }

    let mut total: u32 = 0;
    let mut digits = String::new();
    for ch in value.chars() {
        if ch.is_ascii_digit() {
            digits.push(ch);
            continue;
        }
        let multiplier = match ch.to_ascii_lowercase() {
            's' => 1,
            'm' => 60,
            'h' => 3600,
            'd' => 86_400,
            'w' => 604_800,
            _ => return Err(invalid()),
        };
        let amount: u32 = digits.parse().map_err(|_| invalid())?;
        digits.clear();
        total = amount
            .checked_mul(multiplier)
            .and_then(|v| total.checked_add(v))
            .ok_or_else(invalid)?;
    }

    if !digits.is_empty() {
        return Err(invalid());
    }

    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ttl_units() {
        assert_eq!(parse_ttl("3600").unwrap(), 3600);
        assert_eq!(parse_ttl("1h").unwrap(), 3600);
        assert_eq!(parse_ttl("1h30m").unwrap(), 5400);
        assert_eq!(parse_ttl("2D").unwrap(), 172_800);
        assert!(parse_ttl("10x").is_err());
        assert!(parse_ttl("1h5").is_err());
    }

    #[test]
    fn test_strip_comment_respects_quotes() {
        assert_eq!(strip_comment("www A 1.2.3.4 ; web"), "www A 1.2.3.4 ");
        assert_eq!(strip_comment(r#"@ TXT "a;b""#), r#"@ TXT "a;b""#);
    }

    #[test]
    fn test_tokenize_quoted() {
        let tokens = tokenize(r#"@ IN TXT "hello world""#);
        assert_eq!(tokens, vec!["@", "IN", "TXT", "\"hello world\""]);
    }

    #[test]
    fn test_paren_depth() {
        assert_eq!(paren_depth("@ SOA ns1 admin ("), Some(1));
        assert_eq!(paren_depth("( 1 2 )"), Some(0));
        assert_eq!(paren_depth(")"), None);
    }
}
