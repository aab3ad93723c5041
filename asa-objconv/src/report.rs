use colored::Colorize;

use crate::pipeline::{BlockError, CheckResult, Stage, TranslationResult};
use crate::registry::RegistryEntry;

/// Render rejected blocks, one line each.
pub fn render_errors(errors: &[BlockError]) -> String {
    let mut out = Vec::with_capacity(errors.len());
    for err in errors {
        let stage = match err.stage {
            Stage::Parse => "PARSE",
            Stage::Classify => "REJECT",
        };
        let name = err.name.as_deref().unwrap_or("<unnamed>");
        out.push(format!(
            "{} line={} {}={} reason={}",
            stage.red().bold(),
            err.line,
            err.category,
            name,
            err.reason
        ));
    }
    out.join("\n")
}

/// One-line counts for a translation.
pub fn render_summary(result: &TranslationResult) -> String {
    summary_line(result.objects.len(), result.errors.len(), result.skipped_lines)
}

/// Object listing plus counts for `check`.
pub fn render_check(result: &CheckResult) -> String {
    let mut out = Vec::new();
    for object in &result.objects {
        out.push(format!(
            "{} line={} {}={} kind={}",
            "OK".green(),
            object.line,
            object.category,
            object.name,
            object.kind.label()
        ));
    }
    if !result.errors.is_empty() {
        out.push(render_errors(&result.errors));
    }
    out.push(summary_line(
        result.objects.len(),
        result.errors.len(),
        result.skipped_lines,
    ));
    out.join("\n")
}

/// Registry listing.
pub fn render_keys(entries: &[RegistryEntry]) -> String {
    if entries.is_empty() {
        return "- none".to_string();
    }
    entries
        .iter()
        .map(|e| format!("- {} {} {}", e.namespace, e.db_key, e.name))
        .collect::<Vec<_>>()
        .join("\n")
}

fn summary_line(objects: usize, errors: usize, skipped: usize) -> String {
    let line = format!("objects={objects} errors={errors} skipped_lines={skipped}");
    if errors > 0 {
        line.yellow().to_string()
    } else {
        line.cyan().to_string()
    }
}
