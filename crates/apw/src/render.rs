//! Terminal rendering of an exported result

use apw_core::{CatalogRecord, ExportedResult};
use owo_colors::OwoColorize;
use std::fmt::Write as _;

/// Render the result as text
///
/// Returns `None` when there is nothing to report. With `styled` unset the
/// output carries no escape codes.
pub fn render_text(result: &ExportedResult, styled: bool) -> Option<String> {
    if result.is_empty() {
        return None;
    }

    let hint = if styled {
        "apw dismiss".underline().to_string()
    } else {
        "apw dismiss".to_string()
    };

    let mut out = format!("Detected the following repo changes. Use {hint} to dismiss them.\n");
    for pkg in &result.recent_added_packages {
        push_package(&mut out, &pkg.record, styled, false);
    }
    for pkg in &result.recent_removed_packages {
        push_package(&mut out, &pkg.record, styled, true);
    }
    Some(out)
}

fn push_package(out: &mut String, record: &CatalogRecord, styled: bool, removed: bool) {
    let repo = format!("{}/", record.repo);
    let name = format!("{} ", record.name);

    // Writing into a String cannot fail.
    let _ = match (styled, removed) {
        (false, _) => writeln!(out, "{repo}{name}{}", record.version),
        (true, false) => writeln!(
            out,
            "{}{}{}",
            repo.magenta().bold(),
            name.white().bold(),
            record.version.green().bold()
        ),
        (true, true) => writeln!(
            out,
            "{}{}{}",
            repo.magenta().bold().strikethrough(),
            name.white().bold().strikethrough(),
            record.version.green().bold().strikethrough()
        ),
    };
    let _ = writeln!(out, "    {}", record.desc);

    let url = format!("    {}", record.url);
    let _ = if styled {
        writeln!(out, "{}", url.blue())
    } else {
        writeln!(out, "{url}")
    };
}
