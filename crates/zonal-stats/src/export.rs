//! Ordering and export of batch results.

use std::collections::BTreeMap;
use std::io::Write;

use chrono::{Datelike, NaiveDate};

use crate::types::{Season, SeasonalSummary, ZonalResult};

/// CSV header, in column order.
pub const CSV_HEADER: &str =
    "Month,Total_Rainfall_mm,Mean_Rainfall_mm,Min_Rainfall_mm,Max_Rainfall_mm,Pixel_Count";

/// Parse an `MM-YYYY` label into the first day of that month.
pub fn parse_month_label(label: &str) -> Option<NaiveDate> {
    let (month, year) = label.split_once('-')?;
    if month.len() != 2 || year.len() != 4 {
        return None;
    }
    if !month.bytes().chain(year.bytes()).all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, 1)
}

/// Sort results by calendar month.
///
/// Only applied when every label parses as `MM-YYYY`; otherwise the order
/// is left untouched. Returns whether the results were sorted.
pub fn sort_chronologically(results: &mut [ZonalResult]) -> bool {
    let Some(dates) = results
        .iter()
        .map(|r| parse_month_label(&r.month_label))
        .collect::<Option<Vec<_>>>()
    else {
        return false;
    };

    let mut keyed: Vec<(NaiveDate, ZonalResult)> = dates.into_iter().zip(results.iter().cloned()).collect();
    keyed.sort_by_key(|(date, _)| *date);
    for (slot, (_, result)) in results.iter_mut().zip(keyed) {
        *slot = result;
    }
    true
}

fn csv_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Write results as CSV with a header row.
pub fn write_csv<W: Write>(results: &[ZonalResult], mut writer: W) -> std::io::Result<()> {
    writeln!(writer, "{}", CSV_HEADER)?;
    for r in results {
        writeln!(
            writer,
            "{},{},{},{},{},{}",
            csv_field(&r.month_label),
            r.total_rainfall,
            r.mean_rainfall,
            r.min_rainfall,
            r.max_rainfall,
            r.pixel_count
        )?;
    }
    writer.flush()
}

pub fn to_csv_string(results: &[ZonalResult]) -> String {
    let mut buf = Vec::new();
    // Writing to a Vec cannot fail.
    let _ = write_csv(results, &mut buf);
    String::from_utf8_lossy(&buf).into_owned()
}

/// Group results into meteorological seasons.
///
/// December counts toward the following year's winter. Results whose label
/// is not `MM-YYYY` are ignored. Output is ordered by season year, then
/// season.
pub fn seasonal_summaries(results: &[ZonalResult]) -> Vec<SeasonalSummary> {
    let mut groups: BTreeMap<(i32, Season), (usize, f64)> = BTreeMap::new();

    for r in results {
        let Some(date) = parse_month_label(&r.month_label) else {
            continue;
        };
        let Some(season) = Season::from_month(date.month()) else {
            continue;
        };
        let year = if date.month() == 12 { date.year() + 1 } else { date.year() };
        let entry = groups.entry((year, season)).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += r.total_rainfall;
    }

    groups
        .into_iter()
        .map(|((year, season), (months, total))| SeasonalSummary {
            season,
            year,
            months,
            total_rainfall: total,
            mean_monthly_rainfall: total / months as f64,
        })
        .collect()
}
