//! Resolution of an [`ObjectBlock`] to exactly one supported object kind.
//!
//! | clause                                  | kind           |
//! |-----------------------------------------|----------------|
//! | `fqdn v4 <domain>`                      | [`ObjectKind::Fqdn`]         |
//! | `host <ipv4>`                           | [`ObjectKind::Host`]         |
//! | `subnet <ipv4> <mask>`                  | [`ObjectKind::Subnet`]       |
//! | `range <start> <end>`                   | [`ObjectKind::AddressRange`] |
//! | `service <tcp\|udp> destination eq <n>` | [`ObjectKind::Service`]      |
//!
//! A block with no recognized clause, with a clause that has no recognized
//! shape, or with a clause that does not fit its category is `Unrecognized`.
//! A block whose kind clauses have more than one shape is `Ambiguous`; when a
//! shape repeats, the first clause of that shape wins.

use std::fmt::{self, Display, Formatter};
use std::net::Ipv4Addr;

use serde::Serialize;
use thiserror::Error;

use crate::block::{Category, ObjectBlock};
use crate::lexer::RawStatement;

/// Transport protocol of a service object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
}

impl Protocol {
    pub fn as_str(self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
        }
    }

    fn parse(token: &str) -> Option<Self> {
        match token {
            "tcp" => Some(Protocol::Tcp),
            "udp" => Some(Protocol::Udp),
            _ => None,
        }
    }
}

impl Display for Protocol {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The kind-specific payload of a classified object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ObjectKind {
    Host {
        address: Ipv4Addr,
    },
    Subnet {
        address: Ipv4Addr,
        prefix: u8,
    },
    AddressRange {
        start: Ipv4Addr,
        end: Ipv4Addr,
    },
    Fqdn {
        domain: String,
    },
    Service {
        protocol: Protocol,
        destination_port: u16,
    },
}

impl ObjectKind {
    pub fn label(&self) -> &'static str {
        match self {
            ObjectKind::Host { .. } => "host",
            ObjectKind::Subnet { .. } => "subnet",
            ObjectKind::AddressRange { .. } => "range",
            ObjectKind::Fqdn { .. } => "fqdn",
            ObjectKind::Service { .. } => "service",
        }
    }
}

/// A block resolved to one kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassifiedObject {
    pub name: String,
    pub category: Category,
    pub line: usize,
    #[serde(flatten)]
    pub kind: ObjectKind,
}

/// Why a block could not be classified.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("object {category} '{name}' (line {line}): {kind}")]
pub struct ClassificationError {
    pub name: String,
    pub category: Category,
    /// Line of the offending clause, or of the header when no clause is at fault.
    pub line: usize,
    pub kind: ClassificationErrorKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassificationErrorKind {
    #[error("unrecognized definition: {0}")]
    Unrecognized(String),
    #[error("ambiguous definition: {0}")]
    Ambiguous(String),
    #[error("invalid IPv4 address '{0}'")]
    InvalidAddress(String),
    #[error("invalid subnet mask '{0}'")]
    InvalidMask(String),
    #[error("invalid port '{0}' (expected 1-65535)")]
    InvalidPort(String),
    #[error("range start {start} is greater than end {end}")]
    InvalidRange { start: Ipv4Addr, end: Ipv4Addr },
    #[error("invalid domain name '{0}'")]
    InvalidDomain(String),
}

type ClauseResult = Result<ObjectKind, ClassificationErrorKind>;

/// Classify one block.
pub fn classify(block: &ObjectBlock) -> Result<ClassifiedObject, ClassificationError> {
    let fail = |line: usize, kind: ClassificationErrorKind| ClassificationError {
        name: block.name.clone(),
        category: block.category,
        line,
        kind,
    };

    let mut matched: Option<(&RawStatement, ClauseResult)> = None;
    for clause in &block.clauses {
        let Some(result) = match_clause(block.category, clause) else {
            return Err(fail(
                clause.line,
                ClassificationErrorKind::Unrecognized(format!(
                    "'{}' is not a {} object clause",
                    clause.text, block.category
                )),
            ));
        };
        if let Some((first, _)) = &matched {
            if first.keyword() == clause.keyword() {
                continue;
            }
            return Err(fail(
                clause.line,
                ClassificationErrorKind::Ambiguous(format!(
                    "'{}' conflicts with '{}' on line {}",
                    clause.text, first.text, first.line
                )),
            ));
        }
        matched = Some((clause, result));
    }

    let Some((clause, result)) = matched else {
        return Err(fail(
            block.line,
            ClassificationErrorKind::Unrecognized("no host, subnet, range, fqdn or service clause".to_string()),
        ));
    };

    let kind = result.map_err(|kind| fail(clause.line, kind))?;
    Ok(ClassifiedObject {
        name: block.name.clone(),
        category: block.category,
        line: block.line,
        kind,
    })
}

/// Match one clause against the shapes allowed for `category`. `None` means
/// the clause has no recognized shape at all.
fn match_clause(category: Category, clause: &RawStatement) -> Option<ClauseResult> {
    let args: Vec<&str> = clause.tokens[1..].iter().map(String::as_str).collect();
    let result = match (category, clause.keyword(), args.as_slice()) {
        (Category::Network, "fqdn", ["v4", domain]) => fqdn(domain),
        (Category::Network, "host", [addr]) => host(addr),
        (Category::Network, "subnet", [addr, mask]) => subnet(addr, mask),
        (Category::Network, "range", [start, end]) => range(start, end),
        (Category::Service, "service", [proto, "destination", "eq", port]) => {
            let protocol = Protocol::parse(proto)?;
            service(protocol, port)
        }
        _ => return None,
    };
    Some(result)
}

fn fqdn(domain: &str) -> ClauseResult {
    if !is_valid_domain(domain) {
        return Err(ClassificationErrorKind::InvalidDomain(domain.to_string()));
    }
    Ok(ObjectKind::Fqdn {
        domain: domain.to_string(),
    })
}

fn host(addr: &str) -> ClauseResult {
    Ok(ObjectKind::Host {
        address: parse_ipv4(addr)?,
    })
}

fn subnet(addr: &str, mask: &str) -> ClauseResult {
    let address = parse_ipv4(addr)?;
    let mask_addr = parse_ipv4(mask)
        .map_err(|_| ClassificationErrorKind::InvalidMask(mask.to_string()))?;
    let prefix = mask_to_prefix(mask_addr)
        .ok_or_else(|| ClassificationErrorKind::InvalidMask(mask.to_string()))?;
    Ok(ObjectKind::Subnet { address, prefix })
}

fn range(start: &str, end: &str) -> ClauseResult {
    let start = parse_ipv4(start)?;
    let end = parse_ipv4(end)?;
    if u32::from(start) > u32::from(end) {
        return Err(ClassificationErrorKind::InvalidRange { start, end });
    }
    Ok(ObjectKind::AddressRange { start, end })
}

fn service(protocol: Protocol, port: &str) -> ClauseResult {
    let digits = !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit());
    let destination_port = port
        .parse::<u16>()
        .ok()
        .filter(|p| digits && *p != 0)
        .ok_or_else(|| ClassificationErrorKind::InvalidPort(port.to_string()))?;
    Ok(ObjectKind::Service {
        protocol,
        destination_port,
    })
}

/// Parse a dotted-quad IPv4 literal. Octets are plain decimal 0-255; leading
/// zeros are accepted the way device output writes them.
pub fn parse_ipv4(literal: &str) -> Result<Ipv4Addr, ClassificationErrorKind> {
    let invalid = || ClassificationErrorKind::InvalidAddress(literal.to_string());
    let mut octets = [0u8; 4];
    let mut parts = literal.split('.');
    for octet in &mut octets {
        let part = parts.next().ok_or_else(invalid)?;
        if part.is_empty() || part.len() > 3 || !part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        *octet = part.parse().map_err(|_| invalid())?;
    }
    if parts.next().is_some() {
        return Err(invalid());
    }
    Ok(Ipv4Addr::from(octets))
}

/// Convert a dotted mask to a prefix length. `None` unless the set bits form
/// one contiguous high-order run.
pub fn mask_to_prefix(mask: Ipv4Addr) -> Option<u8> {
    let bits = u32::from(mask);
    let prefix = bits.leading_ones();
    if bits.checked_shl(prefix).unwrap_or(0) != 0 {
        return None;
    }
    u8::try_from(prefix).ok()
}

fn is_valid_domain(domain: &str) -> bool {
    let name = domain.strip_suffix('.').unwrap_or(domain);
    if name.is_empty() || name.len() > 253 {
        return false;
    }
    name.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
    })
}
