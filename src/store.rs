// src/store.rs
use crate::classify::{classify, looks_like_ip};
use crate::types::Record;
use crate::utils::natural_cmp;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractOptions {
    pub subdomains: bool,
    pub ips: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self { subdomains: true, ips: true }
    }
}

/// Findings of one harvest session.
///
/// Records are kept in retrieval order, duplicates included. Subdomains and
/// IPs are deduplicated by exact string equality and every unique IP adds one
/// to at most one subnet bucket.
#[derive(Debug, Default, Clone)]
pub struct FindingStore {
    records: Vec<Record>,
    subdomains: HashSet<String>,
    ips: HashSet<String>,
    subnets: HashMap<String, usize>,
}

impl FindingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ingest_record(&mut self, record: Record, options: ExtractOptions) {
        if options.subdomains {
            if let Some(subdomain) = record.subdomain.as_deref() {
                if !subdomain.is_empty() && !self.subdomains.contains(subdomain) {
                    self.subdomains.insert(subdomain.to_string());
                }
            }
        }

        if options.ips && Self::is_ip_candidate(&record) {
            self.add_ip(&record.value);
        }

        self.records.push(record);
    }

    fn is_ip_candidate(record: &Record) -> bool {
        matches!(record.record_type.as_str(), "A" | "AAAA") || looks_like_ip(&record.value)
    }

    fn add_ip(&mut self, value: &str) {
        let class = classify(value);
        if !class.is_ip || self.ips.contains(value) {
            return;
        }
        self.ips.insert(value.to_string());
        if let Some(key) = class.subnet_key {
            *self.subnets.entry(key).or_insert(0) += 1;
        }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    pub fn subdomain_count(&self) -> usize {
        self.subdomains.len()
    }

    pub fn ip_count(&self) -> usize {
        self.ips.len()
    }

    pub fn subnet_count(&self, key: &str) -> usize {
        self.subnets.get(key).copied().unwrap_or(0)
    }

    pub fn snapshot_subdomains(&self) -> Vec<String> {
        let mut subdomains: Vec<String> = self.subdomains.iter().cloned().collect();
        subdomains.sort();
        subdomains
    }

    pub fn snapshot_ips(&self) -> Vec<String> {
        let mut ips: Vec<String> = self.ips.iter().cloned().collect();
        ips.sort_by(|a, b| natural_cmp(a, b));
        ips
    }

    /// `"10.0.0.0/24: 3 IPs"` lines, sorted by subnet key.
    pub fn snapshot_stats(&self) -> Vec<String> {
        let mut keys: Vec<&String> = self.subnets.keys().collect();
        keys.sort();
        keys.into_iter()
            .map(|key| format!("{}: {} IPs", key, self.subnet_count(key)))
            .collect()
    }

    pub fn reset(&mut self) {
        self.records.clear();
        self.subdomains.clear();
        self.ips.clear();
        self.subnets.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::IPV6_OTHER;

    fn a(sub: &str, ip: &str) -> Record {
        Record::new(Some(sub), "A", ip)
    }

    #[test]
    fn test_ingest_is_idempotent_for_derived_sets() {
        let mut store = FindingStore::new();
        let record = a("www.example.com", "10.0.0.1");

        store.ingest_record(record.clone(), ExtractOptions::default());
        store.ingest_record(record, ExtractOptions::default());

        assert_eq!(store.record_count(), 2);
        assert_eq!(store.subdomain_count(), 1);
        assert_eq!(store.ip_count(), 1);
        assert_eq!(store.snapshot_stats(), vec!["10.0.0.0/24: 1 IPs"]);
    }

    #[test]
    fn test_extraction_flags_are_respected() {
        let mut store = FindingStore::new();
        let off = ExtractOptions { subdomains: false, ips: false };
        store.ingest_record(a("www.example.com", "10.0.0.1"), off);

        assert_eq!(store.record_count(), 1);
        assert_eq!(store.subdomain_count(), 0);
        assert_eq!(store.ip_count(), 0);
        assert!(store.snapshot_stats().is_empty());
    }

    #[test]
    fn test_cname_targets_are_not_ips() {
        let mut store = FindingStore::new();
        store.ingest_record(Record::new(Some("www.example.com"), "CNAME", "edge.cdn.net"), ExtractOptions::default());
        assert_eq!(store.ip_count(), 0);
        assert_eq!(store.subdomain_count(), 1);
    }

    #[test]
    fn test_ip_shaped_value_without_address_type() {
        let mut store = FindingStore::new();
        store.ingest_record(Record::new(None, "PTR", "192.0.2.7"), ExtractOptions::default());
        assert_eq!(store.snapshot_ips(), vec!["192.0.2.7"]);
        assert_eq!(store.subdomain_count(), 0);
    }

    #[test]
    fn test_a_record_without_ip_shape_is_skipped() {
        let mut store = FindingStore::new();
        store.ingest_record(Record::new(Some("x.example.com"), "A", "unknown"), ExtractOptions::default());
        assert_eq!(store.ip_count(), 0);
    }

    #[test]
    fn test_malformed_ipv4_has_no_subnet() {
        let mut store = FindingStore::new();
        store.ingest_record(a("x.example.com", "10.0.1"), ExtractOptions::default());
        assert_eq!(store.ip_count(), 1);
        assert!(store.snapshot_stats().is_empty());
    }

    #[test]
    fn test_empty_subdomain_is_ignored() {
        let mut store = FindingStore::new();
        store.ingest_record(a("", "10.0.0.1"), ExtractOptions::default());
        assert_eq!(store.subdomain_count(), 0);
    }

    #[test]
    fn test_snapshots_are_sorted() {
        let mut store = FindingStore::new();
        for (sub, ip) in [
            ("www.example.com", "10.0.0.10"),
            ("api.example.com", "10.0.0.9"),
            ("mail.example.com", "2001:db8:1:2::5"),
            ("b.example.com", "10.0.1.1"),
        ] {
            store.ingest_record(a(sub, ip), ExtractOptions::default());
        }

        assert_eq!(
            store.snapshot_subdomains(),
            vec!["api.example.com", "b.example.com", "mail.example.com", "www.example.com"]
        );
        assert_eq!(store.snapshot_ips(), vec!["10.0.0.9", "10.0.0.10", "10.0.1.1", "2001:db8:1:2::5"]);
        assert_eq!(
            store.snapshot_stats(),
            vec!["10.0.0.0/24: 2 IPs", "10.0.1.0/24: 1 IPs", "2001:db8:1:2::/64: 1 IPs"]
        );
    }

    #[test]
    fn test_ipv6_snapshot_order() {
        let mut store = FindingStore::new();
        for ip in ["2001:db8:1::1", "2001:db8::1", "::1", "10.0.0.1", "fe80::a", "FE80::9"] {
            store.ingest_record(Record::new(None, "AAAA", ip), ExtractOptions::default());
        }

        assert_eq!(
            store.snapshot_ips(),
            vec!["::1", "10.0.0.1", "2001:db8::1", "2001:db8:1::1", "FE80::9", "fe80::a"]
        );
        assert_eq!(store.subnet_count("10.0.0.0/24"), 1);
        assert_eq!(store.subnet_count(IPV6_OTHER), 3);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut store = FindingStore::new();
        store.ingest_record(a("www.example.com", "10.0.0.1"), ExtractOptions::default());
        store.reset();

        assert_eq!(store.record_count(), 0);
        assert_eq!(store.subdomain_count(), 0);
        assert_eq!(store.ip_count(), 0);
        assert_eq!(store.subnet_count("10.0.0.0/24"), 0);
    }
}
