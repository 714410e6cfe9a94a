use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "rapidharvest",
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_HASH"), ", built ", env!("BUILD_TIME"), ")"),
    about = "RapidDNS subdomain and IP harvester",
    long_about = "rapidharvest pages through the RapidDNS API, collects DNS records,\nextracts unique subdomains and IPs and summarises them per subnet.\nIt can also start and poll bulk export jobs."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Output file for records
    #[arg(short = 'o', long = "output", value_name = "FILE", global = true)]
    pub output_file: Option<String>,

    /// Write extracted subdomains to this file
    #[arg(long = "subdomains-out", value_name = "FILE", global = true)]
    pub subdomains_file: Option<String>,

    /// Write extracted IPs and subnet stats to this file
    #[arg(long = "ips-out", value_name = "FILE", global = true)]
    pub ips_file: Option<String>,

    /// Output in JSON format
    #[arg(long = "json", global = true)]
    pub json: bool,

    /// Output in CSV format
    #[arg(long = "csv", global = true, conflicts_with = "json")]
    pub csv: bool,

    /// Do not extract subdomains
    #[arg(long = "no-subdomains", global = true)]
    pub no_subdomains: bool,

    /// Do not extract IPs
    #[arg(long = "no-ips", global = true)]
    pub no_ips: bool,

    /// Send requests through the URL prefix proxy
    #[arg(long = "url-proxy", global = true)]
    pub url_proxy: bool,

    /// Silent mode (only output results)
    #[arg(long = "silent", global = true)]
    pub silent: bool,

    /// Verbose mode
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short = 'c', long = "config", global = true)]
    pub config_path: Option<String>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Keyword search (domain, IP or keyword)
    Search {
        /// Keyword(s) to search
        keyword: Vec<String>,

        /// File containing keywords, one per line
        #[arg(short = 'l', long = "list", value_name = "FILE")]
        list: Option<PathBuf>,

        /// Search type passed as search_type (e.g. subdomain, same_domain, ip_segment)
        #[arg(short = 't', long = "type")]
        search_type: Option<String>,

        /// Stop after at least this many records
        #[arg(short = 'm', long = "max")]
        max: Option<usize>,
    },
    /// Advanced query (e.g. "domain:example.com AND type:A")
    Query {
        query: String,

        /// Stop after at least this many records
        #[arg(short = 'm', long = "max")]
        max: Option<usize>,
    },
    /// Bulk export jobs
    Export {
        #[command(subcommand)]
        action: ExportAction,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ExportAction {
    /// Start an export job
    Submit {
        /// Query type (e.g. subdomain, same_domain, advanced)
        #[arg(short = 't', long = "type", default_value = "subdomain")]
        query_type: String,

        input: String,
    },
    /// Check an export job
    Status { id: String },
}

impl Args {
    /// Keywords come from stdin only when neither arguments nor a list file
    /// were given and stdin is piped.
    pub fn use_stdin(keywords: &[String], list: &Option<PathBuf>) -> bool {
        keywords.is_empty() && list.is_none() && !atty::is(atty::Stream::Stdin)
    }
}
