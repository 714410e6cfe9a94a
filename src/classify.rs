// src/classify.rs
//! IP heuristics and subnet bucketing.
//!
//! These are textual approximations, not address parsing. In particular the
//! IPv6 bucket is built from the first four colon-separated groups as written,
//! so an address that uses `::` compression before its fourth group
//! (`fe80::1:2:3`) lands in a key that is not its real /64. That behaviour is
//! kept on purpose: switching to exact CIDR math would change the reported
//! aggregation.
use regex::Regex;
use std::sync::OnceLock;

pub const IPV6_OTHER: &str = "IPv6-Other";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpClass {
    pub is_ip: bool,
    pub subnet_key: Option<String>,
}

pub fn classify(value: &str) -> IpClass {
    if value.contains('.') {
        let parts: Vec<&str> = value.split('.').collect();
        let subnet_key = if parts.len() == 4 {
            Some(format!("{}.0/24", parts[..3].join(".")))
        } else {
            None
        };
        IpClass { is_ip: true, subnet_key }
    } else if value.contains(':') {
        let parts: Vec<&str> = value.split(':').collect();
        let subnet_key = if parts.len() >= 4 {
            format!("{}::/64", parts[..4].join(":"))
        } else {
            IPV6_OTHER.to_string()
        };
        IpClass { is_ip: true, subnet_key: Some(subnet_key) }
    } else {
        IpClass { is_ip: false, subnet_key: None }
    }
}

/// Shape filter for record values: only hex digits, dots and colons.
pub fn looks_like_ip(value: &str) -> bool {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^[0-9a-fA-F:.]+$").expect("static pattern"))
        .is_match(value)
}
