use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use rayon::prelude::*;
use serde::Deserialize;
use std::fs::File;
use std::path::PathBuf;

use timeseries_reader::{
    read_with_progress, ColumnKeySchema, ReadReport, ReadRequest, Resolution,
};

#[derive(Parser)]
#[command(name = "timeseries_reader")]
#[command(about = "Harmonize grid operator time-series files into UTC-indexed datasets")]
struct Args {
    /// Base directory holding <source>/<series>/<container>/<file> trees
    #[arg(long, default_value = "original_data")]
    out_path: PathBuf,

    /// Source name (e.g. "TenneT"); ignored when --manifest is given
    #[arg(long)]
    source: Option<String>,

    /// Logical series id (e.g. "wind"); ignored when --manifest is given
    #[arg(long)]
    series: Option<String>,

    /// Source URL recorded in the column keys
    #[arg(long, default_value = "")]
    url: String,

    /// Series resolution, 15min or 60min
    #[arg(long, default_value = "60min")]
    resolution: String,

    /// CSV manifest of jobs with columns source,series,url,resolution
    #[arg(long)]
    manifest: Option<PathBuf>,

    /// Start of the period to keep (YYYY-MM-DD, local civil date)
    #[arg(long)]
    start: Option<String>,

    /// End of the period to keep (YYYY-MM-DD, local civil date)
    #[arg(long)]
    end: Option<String>,

    /// Directory for the harmonized CSV and column-listing JSON
    #[arg(long, default_value = "harmonized")]
    output_dir: PathBuf,
}

#[derive(Debug, Deserialize)]
struct ManifestRow {
    source: String,
    series: String,
    url: String,
    resolution: String,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    rayon::ThreadPoolBuilder::new()
        .num_threads(num_cpus::get())
        .build_global()
        .ok();

    let start = args
        .start
        .as_deref()
        .map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .transpose()
        .context("cannot parse --start")?;
    let end = args
        .end
        .as_deref()
        .map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .transpose()
        .context("cannot parse --end")?;

    let jobs = collect_jobs(&args, start, end)?;
    if jobs.is_empty() {
        anyhow::bail!("nothing to do: pass --source/--series or --manifest");
    }

    std::fs::create_dir_all(&args.output_dir)?;
    info!("processing {} jobs", jobs.len());

    // Each job's pipeline is sequential; jobs are independent and run in
    // parallel.
    let results: Vec<Result<()>> = jobs
        .par_iter()
        .map(|request| process_job(request, &args.output_dir))
        .collect();

    let mut failed = 0;
    for (request, result) in jobs.iter().zip(results) {
        if let Err(e) = result {
            eprintln!("{} - {}: {e:#}", request.source, request.series);
            failed += 1;
        }
    }
    if failed > 0 {
        anyhow::bail!("{failed} of {} jobs failed", jobs.len());
    }
    println!("✅ {} jobs completed", jobs.len());
    Ok(())
}

fn collect_jobs(
    args: &Args,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<Vec<ReadRequest>> {
    let mut jobs = Vec::new();

    if let Some(manifest) = &args.manifest {
        let mut reader = csv::Reader::from_path(manifest)
            .with_context(|| format!("cannot open manifest {}", manifest.display()))?;
        for row in reader.deserialize() {
            let row: ManifestRow = row.context("malformed manifest row")?;
            jobs.push(ReadRequest {
                source: row.source,
                series: row.series,
                url: row.url,
                resolution: Resolution::from_key(&row.resolution)?,
                schema: ColumnKeySchema::default(),
                out_path: args.out_path.clone(),
                start,
                end,
            });
        }
    } else if let (Some(source), Some(series)) = (&args.source, &args.series) {
        jobs.push(ReadRequest {
            source: source.clone(),
            series: series.clone(),
            url: args.url.clone(),
            resolution: Resolution::from_key(&args.resolution)?,
            schema: ColumnKeySchema::default(),
            out_path: args.out_path.clone(),
            start,
            end,
        });
    }

    Ok(jobs)
}

fn process_job(request: &ReadRequest, output_dir: &std::path::Path) -> Result<()> {
    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} files {msg}")
            .unwrap(),
    );
    bar.set_message(format!("{} - {}", request.source, request.series));

    let report = read_with_progress(request, &mut |progress| {
        bar.set_length(progress.total as u64);
        bar.set_position(progress.done as u64);
    })?;
    bar.finish();

    for warning in &report.warnings {
        eprintln!("⚠️  {warning}");
    }
    for failure in &report.failures {
        eprintln!("❌ {}: {}", failure.path.display(), failure.error);
    }

    let base = format!(
        "{}_{}_{}",
        request.source.replace([' ', '/'], "-"),
        request.series,
        request.resolution.as_str()
    );
    write_frame_csv(&report, output_dir.join(format!("{base}.csv")))?;
    write_columns_json(&report, request, output_dir.join(format!("{base}_columns.json")))?;

    println!(
        "{} - {}: {} rows, {} columns ({}/{} files)",
        request.source,
        request.series,
        report.frame.len(),
        report.frame.columns().len(),
        report.files_read,
        report.files_total
    );
    Ok(())
}

/// Export the harmonized frame: UTC timestamps, flattened column labels,
/// empty string as the missing-value marker.
fn write_frame_csv(report: &ReadReport, path: PathBuf) -> Result<()> {
    let mut writer = csv::Writer::from_writer(File::create(&path)?);

    let mut header = vec!["utc_timestamp".to_string()];
    header.extend(report.frame.column_keys().map(|key| key.field_name()));
    writer.write_record(&header)?;

    for (row, ts) in report.frame.index().iter().enumerate() {
        let mut record = vec![ts.format("%Y-%m-%dT%H%M%SZ").to_string()];
        for column in report.frame.columns() {
            record.push(
                column.values[row]
                    .map(|v| v.to_string())
                    .unwrap_or_default(),
            );
        }
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Export the column listing the metadata generator consumes.
fn write_columns_json(report: &ReadReport, request: &ReadRequest, path: PathBuf) -> Result<()> {
    let descriptions = report.describe_columns(&request.schema);
    let json = serde_json::to_string_pretty(&descriptions)?;
    std::fs::write(path, json)?;
    Ok(())
}
