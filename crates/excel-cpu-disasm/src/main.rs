use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing_subscriber::EnvFilter;

use excel_cpu_disasm::{load_grid, render_listing, trace, Header, ListingFlags, ListingOptions, Report};
use excel_cpu_rs::isa::ecpu16::Ecpu16Decoder;
use excel_cpu_rs::AddressStyle;

#[derive(Parser, Debug)]
#[command(author, version, about = "Excel CPU ROM disassembler", long_about = None)]
struct Cli {
    /// ROM grid: .xlsx workbook (first sheet), .csv/.tsv text or .json array of rows
    #[arg(value_name = "INPUT")]
    input: PathBuf,
    /// Write output to file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,
    /// Address style in the output, labels included
    #[arg(short = 's', long, value_enum, default_value_t = AddressStyle::Hex)]
    address_style: AddressStyle,
    /// Comment each instruction with its address
    #[arg(short = 'a', long)]
    include_address: bool,
    /// Comment each instruction with its raw word(s)
    #[arg(short = 'd', long)]
    include_data: bool,
    /// Decode .DATA words and operand words as instructions in comments
    #[arg(short = 'A', long)]
    decode_all: bool,
    /// Do not output warnings
    #[arg(short = 'n', long)]
    no_warnings: bool,
    /// Output format: text listing or JSON trace report
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat { Text, Json }

impl Cli {
    fn listing_options(&self) -> ListingOptions {
        let mut flags = ListingFlags::empty();
        flags.set(ListingFlags::INCLUDE_ADDRESS, self.include_address);
        flags.set(ListingFlags::INCLUDE_DATA, self.include_data);
        flags.set(ListingFlags::DECODE_ALL, self.decode_all);
        flags.set(ListingFlags::NO_WARNINGS, self.no_warnings);
        ListingOptions { style: self.address_style, flags }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let image = load_grid(&cli.input)?;
    let program = trace(image, Ecpu16Decoder::new(), cli.address_style);

    let text = match cli.format {
        OutputFormat::Json => serde_json::to_string_pretty(&Report::from_program(&program))? + "\n",
        OutputFormat::Text => {
            let header = cli.output.as_ref().map(|_| Header {
                source: cli.input.display().to_string(),
                generated: utc_timestamp(SystemTime::now()),
            });
            render_listing(&program, Ecpu16Decoder::new(), cli.listing_options(), header.as_ref())
        }
    };

    if let Some(path) = &cli.output {
        std::fs::write(path, text).with_context(|| format!("writing {}", path.display()))?;
    } else {
        print!("{}", text);
    }
    Ok(())
}

/// `YYYY-MM-DD HH:MM:SS` in UTC.
fn utc_timestamp(t: SystemTime) -> String {
    let secs = t.duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0);
    let (days, rem) = ((secs / 86_400) as i64, secs % 86_400);
    let (y, m, d) = civil_from_days(days);
    format!("{y:04}-{m:02}-{d:02} {:02}:{:02}:{:02}", rem / 3600, rem % 3600 / 60, rem % 60)
}

// Days since 1970-01-01 to a proleptic Gregorian date.
fn civil_from_days(z: i64) -> (i64, u32, u32) {
    let z = z + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let m = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    let y = yoe + era * 400 + i64::from(m <= 2);
    (y, m, d)
}
