//! Plain-text rendering of reports for the terminal.

use std::fmt::Write;
use std::path::Path;

use zonal_stats::{
    BatchReport, ConsistencyReport, ElevationSummary, SeasonalSummary, ValidationReport,
};

fn crs_text(crs: Option<&raster_common::Crs>) -> String {
    crs.map_or_else(|| "undefined".to_string(), |c| c.to_string())
}

pub fn format_validation(reports: &[ValidationReport]) -> String {
    let mut out = String::new();
    for report in reports {
        let _ = write!(out, "{}: {}", report.path.display(), report.verdict);
        if let Some(m) = &report.metadata {
            let _ = write!(
                out,
                " [{}x{}, {}, res ({}, {}), CRS {}, nodata {}]",
                m.width,
                m.height,
                m.pixel_dtype,
                m.resolution.0,
                m.resolution.1,
                crs_text(m.crs.as_ref()),
                m.nodata.map_or_else(|| "none".to_string(), |v| v.to_string()),
            );
        }
        out.push('\n');
    }
    out
}

pub fn format_consistency(report: &ConsistencyReport) -> String {
    let status = if report.passed { "PASS" } else { "FAIL" };
    format!("{}: {}\n", status, report.message())
}

/// Consistency outcome with discrepancies tied back to input positions and
/// paths. `checked` lists the rasters that were compared, in the order they
/// were handed to the check; `excluded` the ones left out with their verdict.
pub fn format_check(
    report: &ConsistencyReport,
    checked: &[(usize, &Path)],
    excluded: &[(usize, &Path, String)],
) -> String {
    let mut out = String::new();
    for (position, path, verdict) in excluded {
        let _ = writeln!(out, "excluded #{} {}: {}", position, path.display(), verdict);
    }

    let Some((ref_position, ref_path)) = checked.first().filter(|_| !report.passed) else {
        out.push_str(&format_consistency(report));
        return out;
    };

    let _ = writeln!(
        out,
        "FAIL: {} of {} rasters disagree with #{} {}",
        report.discrepancies.len(),
        report.compared,
        ref_position,
        ref_path.display()
    );
    for d in &report.discrepancies {
        match checked.get(d.index) {
            Some((position, path)) => {
                let _ = writeln!(out, "  #{} {}: {}", position, path.display(), d.details());
            }
            None => {
                let _ = writeln!(out, "  {}", d);
            }
        }
    }
    out
}

pub fn format_elevation(summary: &ElevationSummary) -> String {
    format!(
        "min {:.2}  max {:.2}  mean {:.2}  relief {:.2}\nCRS {}  resolution ({}, {})  valid pixels {}\n",
        summary.min,
        summary.max,
        summary.mean,
        summary.relief,
        crs_text(summary.crs.as_ref()),
        summary.resolution.0,
        summary.resolution.1,
        summary.valid_pixel_count
    )
}

pub fn format_batch(report: &BatchReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<12} {:>14} {:>10} {:>10} {:>10} {:>8}",
        "Month", "Total (mm)", "Mean", "Min", "Max", "Pixels"
    );
    for r in &report.results {
        let _ = writeln!(
            out,
            "{:<12} {:>14.2} {:>10.2} {:>10.2} {:>10.2} {:>8}",
            r.month_label,
            r.total_rainfall,
            r.mean_rainfall,
            r.min_rainfall,
            r.max_rainfall,
            r.pixel_count
        );
    }
    for w in &report.warnings {
        let _ = writeln!(out, "warning  {}: {}", w.file_label, w.warnings.join("; "));
    }
    for s in &report.skipped {
        let _ = writeln!(out, "skipped  {}: {}", s.file_label, s.reason);
    }
    let _ = writeln!(
        out,
        "{} processed, {} skipped, status {}",
        report.results.len(),
        report.skipped.len(),
        report.status
    );
    out
}

pub fn format_seasons(seasons: &[SeasonalSummary]) -> String {
    let mut out = String::new();
    for s in seasons {
        let _ = writeln!(
            out,
            "{} {:<7} {:>2} months  total {:.2} mm  mean {:.2} mm/month",
            s.year, s.season, s.months, s.total_rainfall, s.mean_monthly_rainfall
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use raster_common::Crs;
    use zonal_stats::{BatchStatus, Discrepancy, SkipRecord, ZonalResult, ZonalStats};

    #[test]
    fn test_check_reports_input_positions() {
        // Input #1 was unreadable, so #2 sits at index 1 of the compared list.
        let report = ConsistencyReport {
            passed: false,
            compared: 2,
            reference_resolution: Some((0.1, 0.1)),
            reference_crs: Some(Crs::WGS84),
            discrepancies: vec![Discrepancy {
                index: 1,
                resolution: Some(((0.1, 0.1), (0.25, 0.25))),
                crs: None,
            }],
        };
        let checked = [
            (0, Path::new("rain/01-2020.tif")),
            (2, Path::new("rain/03-2020.tif")),
        ];
        let excluded = [(
            1,
            Path::new("rain/02-2020.tif"),
            "unreadable: not a TIFF".to_string(),
        )];

        let text = format_check(&report, &checked, &excluded);
        assert!(text.starts_with("excluded #1 rain/02-2020.tif: unreadable"));
        assert!(text.contains("FAIL: 1 of 2 rasters disagree with #0 rain/01-2020.tif"));
        assert!(text.contains(
            "  #2 rain/03-2020.tif: resolution (0.25, 0.25) differs from (0.1, 0.1)"
        ));
    }

    #[test]
    fn test_check_with_nothing_compared() {
        let report = zonal_stats::check_consistency(&[]);
        let text = format_check(&report, &[], &[]);
        assert_eq!(text, "FAIL: nothing to compare\n");
    }

    #[test]
    fn test_batch_table_lists_results_and_skips() {
        let report = BatchReport {
            results: vec![ZonalResult::new(
                "01-2020",
                ZonalStats {
                    sum: 45.0,
                    mean: 5.0,
                    min: 1.0,
                    max: 9.0,
                    count: 9,
                },
            )],
            skipped: vec![SkipRecord::new("02-2020.tif", "no valid data")],
            warnings: Vec::new(),
            status: BatchStatus::Completed,
        };

        let text = format_batch(&report);
        assert!(text.contains("01-2020"));
        assert!(text.contains("45.00"));
        assert!(text.contains("skipped  02-2020.tif: no valid data"));
        assert!(text.ends_with("1 processed, 1 skipped, status completed\n"));
    }
}
