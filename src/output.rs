// src/output.rs
use crate::types::{ExportJob, HarvestError, HarvestReport, OutputConfig, OutputFormat, Record};
use crate::utils::suffixed_path;
use log::info;
use std::fs::File;
use std::io::Write;
use std::path::Path;

pub struct OutputManager {
    config: OutputConfig,
}

impl OutputManager {
    pub fn new(config: OutputConfig) -> Self {
        Self { config }
    }

    /// Write one report. With several reports and an output file, each report
    /// gets its own file suffixed with the query.
    pub fn write_report(&self, report: &HarvestReport, multiple: bool) -> Result<(), HarvestError> {
        match &self.config.file {
            Some(path) => {
                let path = if multiple { suffixed_path(path, &report.query) } else { path.clone() };
                let mut file = create_file(&path)?;
                write_records(&mut file, &report.records, self.config.format)?;
                info!("Results written to: {}", path);
            }
            None => {
                let stdout = std::io::stdout();
                let mut handle = stdout.lock();
                write_records(&mut handle, &report.records, self.config.format)?;
            }
        }

        if let Some(path) = &self.config.subdomains_file {
            let path = if multiple { suffixed_path(path, &report.query) } else { path.clone() };
            let mut file = create_file(&path)?;
            write_subdomains(&mut file, &report.subdomains)?;
            info!("Subdomains written to: {}", path);
        }

        if let Some(path) = &self.config.ips_file {
            let path = if multiple { suffixed_path(path, &report.query) } else { path.clone() };
            let mut file = create_file(&path)?;
            write_ips_and_stats(&mut file, &report.ips, &report.subnet_stats)?;
            info!("IPs and stats written to: {}", path);
        }

        if self.config.verbose {
            eprintln!(
                "[*] {} {} ({}): {} records, {} subdomains, {} IPs, stopped: {}",
                report.timestamp,
                report.query,
                report.mode,
                report.stats.total_records,
                report.stats.unique_subdomains,
                report.stats.unique_ips,
                report.stats.stop_reason
            );
            for line in &report.subnet_stats {
                eprintln!("    {}", line);
            }
        }

        Ok(())
    }

    pub fn write_export_job(&self, job: &ExportJob) -> Result<(), HarvestError> {
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        if self.config.format == OutputFormat::Json {
            let json = serde_json::to_string_pretty(job)
                .map_err(|e| HarvestError::OutputError(format!("Failed to serialize JSON: {}", e)))?;
            writeln!(handle, "{}", json).map_err(output_error)?;
            return Ok(());
        }
        writeln!(handle, "Export {}: {} ({}%)", job.id, job.status, job.progress_percent).map_err(output_error)?;
        if let Some(url) = &job.download_url {
            writeln!(handle, "Download: {}", url).map_err(output_error)?;
        }
        Ok(())
    }
}

fn output_error(e: std::io::Error) -> HarvestError {
    HarvestError::OutputError(e.to_string())
}

fn create_file(file_path: &str) -> Result<File, HarvestError> {
    if let Some(parent) = Path::new(file_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .map_err(|e| HarvestError::OutputError(format!("Failed to create directory: {}", e)))?;
        }
    }
    File::create(file_path).map_err(|e| HarvestError::OutputError(format!("Failed to create file: {}", e)))
}

pub fn write_records<W: Write>(writer: &mut W, records: &[Record], format: OutputFormat) -> Result<(), HarvestError> {
    match format {
        OutputFormat::Json => write_json(writer, records),
        OutputFormat::Csv => write_csv(writer, records),
        OutputFormat::Text => write_text(writer, records),
    }
}

fn write_json<W: Write>(writer: &mut W, records: &[Record]) -> Result<(), HarvestError> {
    let json = serde_json::to_string_pretty(records)
        .map_err(|e| HarvestError::OutputError(format!("Failed to serialize JSON: {}", e)))?;
    writeln!(writer, "{}", json).map_err(output_error)
}

fn write_csv<W: Write>(writer: &mut W, records: &[Record]) -> Result<(), HarvestError> {
    writeln!(writer, "Subdomain,Type,Value,Date").map_err(output_error)?;
    for record in records {
        writeln!(
            writer,
            "\"{}\",\"{}\",\"{}\",\"{}\"",
            record.subdomain.as_deref().unwrap_or(""),
            record.record_type,
            record.value,
            record.date.as_deref().unwrap_or("")
        )
        .map_err(output_error)?;
    }
    Ok(())
}

fn write_text<W: Write>(writer: &mut W, records: &[Record]) -> Result<(), HarvestError> {
    for record in records {
        writeln!(
            writer,
            "{}\t{}\t{}\t{}",
            record.subdomain.as_deref().unwrap_or(""),
            record.record_type,
            record.value,
            record.date.as_deref().unwrap_or("")
        )
        .map_err(output_error)?;
    }
    Ok(())
}

pub fn write_subdomains<W: Write>(writer: &mut W, subdomains: &[String]) -> Result<(), HarvestError> {
    for subdomain in subdomains {
        writeln!(writer, "{}", subdomain).map_err(output_error)?;
    }
    Ok(())
}

pub fn write_ips_and_stats<W: Write>(writer: &mut W, ips: &[String], stats: &[String]) -> Result<(), HarvestError> {
    write!(writer, "--- IPs ---\n{}\n\n--- Stats ---\n{}", ips.join("\n"), stats.join("\n")).map_err(output_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{HarvestStats, QueryMode};
    use std::time::Duration;

    fn records() -> Vec<Record> {
        vec![
            Record {
                date: Some("2024-05-01".to_string()),
                ..Record::new(Some("www.example.com"), "A", "10.0.0.1")
            },
            Record::new(None, "NS", "ns1.example.net"),
        ]
    }

    fn render(format: OutputFormat) -> String {
        let mut buf = Vec::new();
        write_records(&mut buf, &records(), format).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_csv_layout() {
        assert_eq!(
            render(OutputFormat::Csv),
            "Subdomain,Type,Value,Date\n\"www.example.com\",\"A\",\"10.0.0.1\",\"2024-05-01\"\n\"\",\"NS\",\"ns1.example.net\",\"\"\n"
        );
    }

    #[test]
    fn test_text_layout() {
        assert_eq!(
            render(OutputFormat::Text),
            "www.example.com\tA\t10.0.0.1\t2024-05-01\n\tNS\tns1.example.net\t\n"
        );
    }

    #[test]
    fn test_json_layout() {
        let parsed: Vec<Record> = serde_json::from_str(&render(OutputFormat::Json)).unwrap();
        assert_eq!(parsed, records());
    }

    #[test]
    fn test_ips_and_stats_layout() {
        let mut buf = Vec::new();
        write_ips_and_stats(
            &mut buf,
            &["10.0.0.1".to_string(), "10.0.0.2".to_string()],
            &["10.0.0.0/24: 2 IPs".to_string()],
        )
        .unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "--- IPs ---\n10.0.0.1\n10.0.0.2\n\n--- Stats ---\n10.0.0.0/24: 2 IPs"
        );
    }

    #[test]
    fn test_write_report_to_files() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested/results.csv");
        let subs = dir.path().join("subdomains.txt");
        let ips = dir.path().join("ips.txt");

        let manager = OutputManager::new(OutputConfig {
            format: OutputFormat::Csv,
            file: Some(out.to_string_lossy().into_owned()),
            subdomains_file: Some(subs.to_string_lossy().into_owned()),
            ips_file: Some(ips.to_string_lossy().into_owned()),
            verbose: false,
        });
        let report = HarvestReport {
            query: "example.com".to_string(),
            mode: QueryMode::Search,
            records: records(),
            subdomains: vec!["www.example.com".to_string()],
            ips: vec!["10.0.0.1".to_string()],
            subnet_stats: vec!["10.0.0.0/24: 1 IPs".to_string()],
            stats: HarvestStats {
                total_records: 2,
                unique_subdomains: 1,
                unique_ips: 1,
                pages_fetched: 1,
                stop_reason: "last page".to_string(),
                duration: Duration::from_millis(5),
            },
            timestamp: "2024-05-01T00:00:00Z".to_string(),
        };

        manager.write_report(&report, false).unwrap();

        assert!(std::fs::read_to_string(&out).unwrap().starts_with("Subdomain,Type,Value,Date\n"));
        assert_eq!(std::fs::read_to_string(&subs).unwrap(), "www.example.com\n");
        assert!(std::fs::read_to_string(&ips).unwrap().ends_with("10.0.0.0/24: 1 IPs"));

        manager.write_report(&report, true).unwrap();
        assert!(dir.path().join("nested/results_example.com.csv").exists());
    }
}
