//! Self-contained HTML report: inline CSS and script, no external assets,
//! so the file can be attached to a ticket and opened anywhere.

use crate::{BatchSummary, ReportMeta};
use soundcheck_core::{HarnessError, Severity};
use soundcheck_harness::{BatchResults, EngineTestSuite};
use std::fmt::Write as _;
use std::path::Path;

const STYLE: &str = r#"
body { font-family: -apple-system, 'Segoe UI', Roboto, sans-serif; margin: 2rem; color: #1a1a1a; background: #fafafa; }
h1 { font-size: 1.4rem; } h2 { font-size: 1.1rem; margin: 0; }
.meta { color: #666; font-size: 0.85rem; margin-bottom: 1.5rem; }
.summary { display: flex; gap: 1.5rem; flex-wrap: wrap; margin-bottom: 1.5rem; }
.stat { background: #fff; border: 1px solid #ddd; border-radius: 6px; padding: 0.6rem 1rem; }
.stat .value { font-size: 1.3rem; font-weight: 600; }
.stat .label { font-size: 0.75rem; color: #666; text-transform: uppercase; }
details.engine { background: #fff; border: 1px solid #ddd; border-radius: 6px; margin-bottom: 0.6rem; }
details.engine summary { cursor: pointer; padding: 0.7rem 1rem; display: flex; align-items: center; gap: 0.8rem; }
.scorebar { flex: 0 0 120px; height: 8px; background: #eee; border-radius: 4px; overflow: hidden; }
.scorebar span { display: block; height: 100%; }
.badge { font-size: 0.7rem; font-weight: 600; padding: 0.15rem 0.5rem; border-radius: 4px; color: #fff; }
.badge.ok { background: #2e7d32; } .badge.warning { background: #f9a825; }
.badge.error { background: #e65100; } .badge.critical { background: #c62828; }
table { border-collapse: collapse; width: 100%; font-size: 0.85rem; }
th, td { text-align: left; padding: 0.35rem 0.7rem; border-top: 1px solid #eee; }
tr.failed td:first-child { border-left: 3px solid #c62828; }
.category { padding: 0.4rem 1rem 1rem; }
.category h3 { font-size: 0.9rem; color: #444; margin: 0.6rem 0 0.2rem; }
.rec { color: #7a5c00; font-size: 0.8rem; }
"#;

const SCRIPT: &str = r#"
document.querySelectorAll('[data-expand-failed]').forEach(function (el) {
  el.addEventListener('click', function () {
    document.querySelectorAll('details.engine').forEach(function (d) {
      d.open = d.dataset.failed === 'true';
    });
  });
});
"#;

/// Render the batch as a single HTML page.
pub fn render(results: &BatchResults, meta: &ReportMeta) -> String {
    let summary = BatchSummary::from_results(results);
    let mut out = String::with_capacity(16 * 1024);

    let _ = write!(
        out,
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{}</title>\n<style>{STYLE}</style>\n</head>\n<body>\n",
        escape(&meta.suite_name)
    );
    let _ = write!(
        out,
        "<h1>{}</h1>\n<p class=\"meta\">soundcheck {} | level {} | {} Hz, block {} | \
         unix time {}</p>\n",
        escape(&meta.suite_name),
        escape(&meta.version),
        meta.configuration.level,
        meta.configuration.sample_rate,
        meta.configuration.block_size,
        meta.timestamp_unix
    );

    out.push_str("<div class=\"summary\">\n");
    stat(&mut out, &format!("{}", summary.total_engines), "engines");
    stat(&mut out, &format!("{:.1}", summary.average_score), "avg score");
    stat(&mut out, &format!("{}", summary.critical_count), "critical");
    stat(&mut out, &format!("{}", summary.error_count), "errors");
    stat(&mut out, &format!("{}", summary.warning_count), "warnings");
    stat(
        &mut out,
        &format!("{:.1}%", summary.worst_cpu_percent),
        "worst cpu",
    );
    out.push_str("</div>\n");
    out.push_str("<p><a href=\"#\" data-expand-failed>expand engines with findings</a></p>\n");

    for suite in &results.suites {
        engine_section(&mut out, suite);
    }

    let _ = write!(out, "<script>{SCRIPT}</script>\n</body>\n</html>\n");
    out
}

fn stat(out: &mut String, value: &str, label: &str) {
    let _ = write!(
        out,
        "<div class=\"stat\"><div class=\"value\">{}</div><div class=\"label\">{}</div></div>\n",
        escape(value),
        escape(label)
    );
}

fn engine_section(out: &mut String, suite: &EngineTestSuite) {
    let worst = suite.worst_severity();
    let (badge_class, badge_text) = match worst {
        Severity::Critical => ("critical", "CRITICAL"),
        Severity::Error => ("error", "ERROR"),
        Severity::Warning => ("warning", "WARNING"),
        Severity::Info => ("ok", "OK"),
    };
    let has_findings = worst != Severity::Info;
    let bar_color = match worst {
        Severity::Critical => "#c62828",
        Severity::Error => "#e65100",
        Severity::Warning => "#f9a825",
        Severity::Info => "#2e7d32",
    };

    let _ = write!(
        out,
        "<details class=\"engine\" data-failed=\"{has_findings}\">\n<summary>\
         <span class=\"badge {badge_class}\">{badge_text}</span>\
         <h2>[{}] {}</h2>\
         <div class=\"scorebar\"><span style=\"width:{:.0}%;background:{bar_color}\"></span></div>\
         <span>{:.1}</span></summary>\n",
        suite.engine_id,
        escape(&suite.engine_name),
        suite.overall_score.clamp(0.0, 100.0),
        suite.overall_score
    );

    for category in &suite.categories {
        let _ = write!(
            out,
            "<div class=\"category\"><h3>{} &middot; {:.1}</h3>\n<table>\n",
            escape(&category.name),
            category.aggregate_score
        );
        for result in &category.results {
            let row_class = if result.passed { "" } else { " class=\"failed\"" };
            let _ = write!(
                out,
                "<tr{row_class}><td>{}</td><td>{}</td><td>{}</td></tr>\n",
                escape(&result.name),
                result.severity.label(),
                escape(&result.message)
            );
            for step in &result.recommendations {
                let _ = write!(
                    out,
                    "<tr><td></td><td colspan=\"2\" class=\"rec\">&rarr; {}</td></tr>\n",
                    escape(step)
                );
            }
        }
        out.push_str("</table></div>\n");
    }
    out.push_str("</details>\n");
}

/// Minimal HTML escaping for text nodes and attribute values.
fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Render and write to `path`.
pub fn write(path: &Path, results: &BatchResults, meta: &ReportMeta) -> Result<(), HarnessError> {
    crate::write_report(path, &render(results, meta))
}
