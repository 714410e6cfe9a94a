// src/engine.rs
use crate::api::{normalize, PageFetcher};
use crate::store::{ExtractOptions, FindingStore};
use crate::types::{HarvestConfig, HarvestError, PageRequest, QueryMode, PAGE_SIZE};
use log::{debug, info};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Why a harvest stopped without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Running total reached `max_records`.
    CapReached,
    /// Page shorter than the page size.
    ShortPage,
    /// Page with zero records.
    EmptyPage,
    /// No known envelope in the response.
    NotFound,
    Cancelled,
    DeadlineExceeded,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StopReason::CapReached => "record cap reached",
            StopReason::ShortPage => "last page",
            StopReason::EmptyPage => "empty page",
            StopReason::NotFound => "no data found",
            StopReason::Cancelled => "cancelled",
            StopReason::DeadlineExceeded => "deadline exceeded",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestOutcome {
    pub stop_reason: StopReason,
    pub pages_fetched: u32,
    pub records_ingested: usize,
}

#[derive(Debug, Clone)]
pub struct HarvestOptions {
    pub page_size: usize,
    pub page_delay: Duration,
    pub deadline: Option<Duration>,
    pub extract: ExtractOptions,
}

impl Default for HarvestOptions {
    fn default() -> Self {
        Self {
            page_size: PAGE_SIZE,
            page_delay: Duration::from_millis(100),
            deadline: None,
            extract: ExtractOptions::default(),
        }
    }
}

impl From<&HarvestConfig> for HarvestOptions {
    fn from(config: &HarvestConfig) -> Self {
        Self {
            page_size: PAGE_SIZE,
            page_delay: config.page_delay,
            deadline: config.deadline,
            extract: ExtractOptions {
                subdomains: config.extract_subdomains,
                ips: config.extract_ips,
            },
        }
    }
}

/// Paginated harvest over a [`PageFetcher`].
///
/// Pages are requested one at a time; each page decides whether another one
/// is needed. Findings go into a caller-owned [`FindingStore`], so whatever
/// was ingested before an error is kept.
pub struct HarvestEngine<F: PageFetcher> {
    fetcher: F,
    options: HarvestOptions,
    cancelled: Arc<AtomicBool>,
}

impl<F: PageFetcher> HarvestEngine<F> {
    pub fn new(fetcher: F, options: HarvestOptions) -> Self {
        Self {
            fetcher,
            options,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Share a cancellation flag with other engines.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancelled = flag;
        self
    }

    /// Flag checked before each page request. Setting it stops the run
    /// with [`StopReason::Cancelled`].
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        self.cancelled.clone()
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub async fn run(
        &self,
        query: &str,
        type_filter: Option<&str>,
        max_records: usize,
        mode: QueryMode,
        store: &mut FindingStore,
    ) -> Result<HarvestOutcome, HarvestError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(HarvestError::EmptyQuery("please enter a keyword or query".to_string()));
        }

        let type_filter = match mode {
            QueryMode::Search => type_filter.map(str::trim).filter(|t| !t.is_empty()).map(str::to_string),
            QueryMode::Advanced => None,
        };

        info!("Starting {} harvest for {} (max {} records)", mode, query, max_records);
        let started = Instant::now();
        let mut page: u32 = 1;
        let mut total = 0usize;

        let stop_reason = loop {
            if self.cancelled.load(Ordering::SeqCst) {
                break StopReason::Cancelled;
            }
            if let Some(deadline) = self.options.deadline {
                if started.elapsed() >= deadline {
                    break StopReason::DeadlineExceeded;
                }
            }

            let request = PageRequest {
                mode,
                query: query.to_string(),
                page,
                page_size: self.options.page_size,
                type_filter: type_filter.clone(),
            };
            let raw = self.fetcher.fetch_page(&request).await?;

            let records = match normalize(&raw) {
                Some(records) => records,
                None => break StopReason::NotFound,
            };
            if records.is_empty() {
                break StopReason::EmptyPage;
            }

            let page_len = records.len();
            for record in records {
                store.ingest_record(record, self.options.extract);
            }
            total += page_len;
            debug!(
                "[{}] page {}: {} records ({} total, {} subdomains, {} IPs)",
                query,
                page,
                page_len,
                total,
                store.subdomain_count(),
                store.ip_count()
            );

            if total >= max_records {
                break StopReason::CapReached;
            }
            if page_len < self.options.page_size {
                break StopReason::ShortPage;
            }

            page += 1;
            if !self.options.page_delay.is_zero() {
                tokio::time::sleep(self.options.page_delay).await;
            }
        };

        let pages_fetched = match stop_reason {
            StopReason::Cancelled | StopReason::DeadlineExceeded => page - 1,
            _ => page,
        };
        info!(
            "Harvest for {} stopped ({}) after {} pages, {} records in {:.2}s",
            query,
            stop_reason,
            pages_fetched,
            total,
            started.elapsed().as_secs_f64()
        );

        Ok(HarvestOutcome {
            stop_reason,
            pages_fetched,
            records_ingested: total,
        })
    }
}
