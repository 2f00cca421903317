use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::debug;

use crate::error::Result;
use crate::models::{FetchStats, ScrapeResult};

/// One CSV line: a model split into brand and name
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct CsvRow {
    #[serde(rename = "Processor")]
    pub processor: String,
    #[serde(rename = "Brand")]
    pub brand: String,
    #[serde(rename = "Model")]
    pub model: String,
    #[serde(rename = "Full_Name")]
    pub full_name: String,
}

/// Rows for one processor, deduplicated and sorted by brand then model
pub fn csv_rows(processor: &str, models: &[String]) -> Vec<CsvRow> {
    let mut rows: Vec<CsvRow> = models
        .iter()
        .map(|full_name| {
            let (brand, model) = match full_name.split_once(' ') {
                Some((brand, rest)) => (brand.to_string(), rest.to_string()),
                None => (full_name.clone(), full_name.clone()),
            };
            CsvRow {
                processor: processor.to_string(),
                brand,
                model,
                full_name: full_name.clone(),
            }
        })
        .collect();

    rows.sort_by(|a, b| (&a.brand, &a.model).cmp(&(&b.brand, &b.model)));
    rows.dedup();
    rows
}

/// Write every processor's models as CSV. Returns the number of data rows.
pub fn export_to_csv<P: AsRef<Path>>(result: &ScrapeResult, path: P) -> Result<usize> {
    let mut writer = csv::Writer::from_path(path.as_ref())?;
    let mut written = 0;

    for (processor, models) in result.iter() {
        for row in csv_rows(processor, models) {
            writer.serialize(&row)?;
            written += 1;
        }
    }

    // The header comes from the first serialized row; write it explicitly for empty results
    if written == 0 {
        writer.write_record(["Processor", "Brand", "Model", "Full_Name"])?;
    }
    writer.flush()?;

    debug!("Wrote {} CSV rows to {}", written, path.as_ref().display());
    Ok(written)
}

/// Save the processor -> models mapping as pretty JSON
pub fn save_to_json<P: AsRef<Path>>(result: &ScrapeResult, path: P) -> Result<()> {
    let json = serde_json::to_string_pretty(&result.to_map())?;
    let mut file = File::create(path)?;
    file.write_all(json.as_bytes())?;
    Ok(())
}

/// Results table, totals, request statistics and the top processors
pub fn format_summary(result: &ScrapeResult, stats: &FetchStats) -> String {
    let mut output = String::new();

    output.push_str(&"=".repeat(80));
    output.push_str("\nRESULTS SUMMARY\n");
    output.push_str(&"=".repeat(80));
    output.push('\n');

    let mut by_count: Vec<(&str, &[String])> = result.iter().collect();
    by_count.sort_by(|a, b| b.1.len().cmp(&a.1.len()));

    output.push_str(&format!("{:<30} {:>8}  {}\n", "Processor", "Models", "Sample Models"));
    output.push_str(&"-".repeat(80));
    output.push('\n');
    for (processor, models) in &by_count {
        output.push_str(&format!(
            "{:<30} {:>8}  {}\n",
            processor,
            models.len(),
            sample_models(models, 3)
        ));
    }

    let total = result.total();
    let average = if result.is_empty() {
        0.0
    } else {
        total as f64 / result.processor_count() as f64
    };

    output.push_str("\nSTATISTICS\n");
    output.push_str(&format!("  Total Processors: {}\n", result.processor_count()));
    output.push_str(&format!("  Total Phone Models: {}\n", total));
    output.push_str(&format!("  Average Models per Processor: {:.1}\n", average));

    output.push_str("\nREQUEST STATISTICS\n");
    output.push_str(&format!("  Total Requests: {}\n", stats.total_requests));
    output.push_str(&format!("  Pages Fetched: {}\n", stats.pages_fetched));
    output.push_str(&format!("  Rate Limited: {}\n", stats.rate_limited));

    if !by_count.is_empty() {
        output.push_str("\nTOP PROCESSORS\n");
        for (rank, (processor, models)) in by_count.iter().take(5).enumerate() {
            output.push_str(&format!(
                "  {}. {}: {} models\n",
                rank + 1,
                processor,
                models.len()
            ));
        }
    }

    output
}

/// Every processor's models, alphabetically, numbered
pub fn format_detailed(result: &ScrapeResult) -> String {
    let mut output = String::new();

    for (processor, models) in result.iter() {
        if models.is_empty() {
            continue;
        }

        output.push_str(&format!("\n[{}]\n", processor));
        let mut sorted: Vec<&String> = models.iter().collect();
        sorted.sort();
        for (i, model) in sorted.iter().enumerate() {
            output.push_str(&format!("{:>3}. {}\n", i + 1, model));
        }
    }

    output
}

fn sample_models(models: &[String], n: usize) -> String {
    let mut sample = models
        .iter()
        .take(n)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    if models.len() > n {
        sample.push_str(&format!("... (+{} more)", models.len() - n));
    }
    sample
}
