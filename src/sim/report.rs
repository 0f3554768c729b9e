use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::error::SimResult;
use crate::sim::config::{ReceiverSpec, SweepConfig};
use crate::sim::link::BerPoint;

/// BER curve and runtime of one receiver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiverReport {
    pub label: String,
    pub receiver: ReceiverSpec,
    /// Wall-clock time spent on the whole SNR grid
    pub elapsed_secs: f64,
    pub points: Vec<BerPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepReport {
    pub config: SweepConfig,
    /// Sweep was cut short; the last points may hold fewer bits than requested
    pub interrupted: bool,
    pub receivers: Vec<ReceiverReport>,
}

impl SweepReport {
    /// Pretty JSON to `path`, or stdout for `None` / `-`
    pub fn write_json(&self, path: Option<&Path>) -> SimResult<()> {
        let mut dst: Box<dyn Write> = match path {
            Some(p) if p.as_os_str() == "-" => Box::new(io::stdout()),
            Some(p) => Box::new(BufWriter::new(File::create(p)?)),
            None => Box::new(io::stdout()),
        };
        serde_json::to_writer_pretty(&mut dst, self)?;
        writeln!(dst)?;
        dst.flush()?;
        Ok(())
    }

    /// BER table, one row per SNR point and one column per receiver
    pub fn table(&self) -> String {
        let mut out = format!("{:>8}", "SNR(dB)");
        for r in &self.receivers {
            out.push_str(&format!(" {:>12}", r.label));
        }
        out.push('\n');

        for (i, snr) in self.config.snr_db.iter().enumerate() {
            out.push_str(&format!("{:>8.1}", snr));
            for r in &self.receivers {
                match r.points.get(i) {
                    Some(p) => out.push_str(&format!(" {:>12.3e}", p.ber)),
                    None => out.push_str(&format!(" {:>12}", "-")),
                }
            }
            out.push('\n');
        }

        out.push_str(&format!("{:>8}", "time(s)"));
        for r in &self.receivers {
            out.push_str(&format!(" {:>12.2}", r.elapsed_secs));
        }
        out.push('\n');
        out
    }
}
