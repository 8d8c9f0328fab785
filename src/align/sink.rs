use std::io::Write;

use chrono::{DateTime, FixedOffset, Utc};
use tracing::debug;

use crate::core::UnixTime;
use crate::error::{HistoryError, HistoryResult};

use super::export::{AlignedTable, ExportOutcome};

/// Consumer of an aligned export table, one implementation per output kind.
pub trait ResultSink {
    fn write_table(&mut self, table: &AlignedTable) -> HistoryResult<()>;

    /// Writes a table, or reports [`HistoryError::NoDataEver`] instead of
    /// producing a row-less output.
    fn write_outcome(&mut self, outcome: &ExportOutcome) -> HistoryResult<()> {
        match outcome {
            ExportOutcome::Table(table) => self.write_table(table),
            ExportOutcome::NoData => Err(HistoryError::NoDataEver),
        }
    }
}

/// Formats a value like C's `%g`: six significant digits, trailing zeros
/// removed, exponent form below `1e-4` or from `1e6`.
#[must_use]
pub fn format_g(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_owned();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_owned();
    }
    if value == 0.0 {
        return "0".to_owned();
    }

    let scientific = format!("{value:.5e}");
    let (mantissa, exponent) = scientific
        .split_once('e')
        .unwrap_or((scientific.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    if !(-4..6).contains(&exponent) {
        let sign = if exponent < 0 { '-' } else { '+' };
        return format!("{}e{sign}{:02}", trim_fraction(mantissa), exponent.abs());
    }

    let decimals = (5 - exponent).max(0) as usize;
    trim_fraction(&format!("{value:.decimals$}")).to_owned()
}

fn trim_fraction(text: &str) -> &str {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text
    }
}

fn escape_field(value: &str, separator: char) -> String {
    let needs_quotes =
        value.contains(separator) || value.contains('"') || value.contains('\n');
    if needs_quotes {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_owned()
    }
}

/// Local date-time string used in the export's first column.
#[must_use]
pub fn format_local_time(time: UnixTime, offset: FixedOffset) -> String {
    DateTime::<Utc>::from_timestamp(time, 0).map_or_else(
        || time.to_string(),
        |utc| {
            utc.with_timezone(&offset)
                .format("%Y/%m/%d %H:%M:%S")
                .to_string()
        },
    )
}

/// Row-oriented text table:
/// `Time,Timestamp[,Run,Run State],<var1>,<var2>,...`.
#[derive(Debug)]
pub struct CsvSink<W> {
    writer: W,
    offset: FixedOffset,
    separator: char,
}

impl<W: Write> CsvSink<W> {
    #[must_use]
    pub fn new(writer: W, offset: FixedOffset) -> Self {
        Self {
            writer,
            offset,
            separator: ',',
        }
    }

    #[must_use]
    pub fn with_separator(mut self, separator: char) -> Self {
        self.separator = separator;
        self
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_line(&mut self, fields: &[String]) -> HistoryResult<()> {
        let line = fields
            .iter()
            .map(|field| escape_field(field, self.separator))
            .collect::<Vec<_>>()
            .join(&self.separator.to_string());
        writeln!(self.writer, "{line}")?;
        Ok(())
    }
}

impl<W: Write> ResultSink for CsvSink<W> {
    fn write_table(&mut self, table: &AlignedTable) -> HistoryResult<()> {
        let mut header = vec!["Time".to_owned(), "Timestamp".to_owned()];
        if table.run_markers {
            header.push("Run".to_owned());
            header.push("Run State".to_owned());
        }
        header.extend(table.columns.iter().map(|column| column.name.clone()));
        self.write_line(&header)?;

        for row in &table.rows {
            let mut fields = Vec::with_capacity(header.len());
            fields.push(format_local_time(row.time, self.offset));
            fields.push(row.time.to_string());
            if table.run_markers {
                let run = row.run.unwrap_or_default();
                fields.push(
                    run.number
                        .map(|number| number.to_string())
                        .unwrap_or_default(),
                );
                fields.push(run.state.map(|state| state.name()).unwrap_or_default());
            }
            fields.extend(
                row.values
                    .iter()
                    .map(|value| value.map(format_g).unwrap_or_default()),
            );
            self.write_line(&fields)?;
        }

        self.writer.flush()?;
        debug!(rows = table.rows.len(), "csv export written");
        Ok(())
    }
}

/// Writes the aligned table as one JSON document.
#[derive(Debug)]
pub struct JsonSink<W> {
    writer: W,
    pretty: bool,
}

impl<W: Write> JsonSink<W> {
    #[must_use]
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            pretty: false,
        }
    }

    #[must_use]
    pub fn pretty(mut self) -> Self {
        self.pretty = true;
        self
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> ResultSink for JsonSink<W> {
    fn write_table(&mut self, table: &AlignedTable) -> HistoryResult<()> {
        if self.pretty {
            serde_json::to_writer_pretty(&mut self.writer, table)?;
        } else {
            serde_json::to_writer(&mut self.writer, table)?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
