use std::fmt::Write;

use ripple_operations::operations::ReleasePlan;
use ripple_operations::{PublishResult, RunState};

use super::ReportFormatter;

pub(crate) struct PlainTextFormatter;

impl PlainTextFormatter {
    fn format_names(output: &mut String, title: &str, names: &[String]) {
        if names.is_empty() {
            return;
        }
        let _ = writeln!(output, "{title}:");
        for name in names {
            let _ = writeln!(output, "  {name}");
        }
    }
}

impl ReportFormatter for PlainTextFormatter {
    fn format_plan(&self, plan: &ReleasePlan) -> String {
        let mut output = String::new();
        let releases = plan.releases().count();
        if releases == 0 {
            output.push_str("No crates to release.\n");
            return output;
        }

        for (index, level) in plan.levels.iter().enumerate() {
            let _ = writeln!(output, "Level {index}:");
            for name in level {
                let Some(version) = plan.versions.iter().find(|v| &v.name == name) else {
                    continue;
                };
                if version.skipped {
                    let _ = writeln!(output, "  {name} {} (unchanged)", version.old_version);
                } else {
                    let _ = writeln!(
                        output,
                        "  {name} {} -> {} ({})",
                        version.old_version, version.new_version, version.bump_type
                    );
                }
            }
        }

        let _ = writeln!(
            output,
            "\n{releases} of {} crates will be released.",
            plan.versions.len()
        );
        output
    }

    fn format_result(&self, result: &PublishResult) -> String {
        let mut output = String::new();
        Self::format_names(&mut output, "Published", &result.published);
        Self::format_names(&mut output, "Skipped", &result.skipped);

        if !result.failed.is_empty() {
            output.push_str("Failed:\n");
            for (name, error) in &result.failed {
                let _ = writeln!(output, "  {name}: {error}");
            }
        }

        Self::format_names(&mut output, "Not attempted", &result.pending);
        output
    }

    fn format_state(&self, state: &RunState) -> String {
        let mut output = String::new();
        let _ = writeln!(
            output,
            "Run started {} at commit {}",
            state.started_at().format("%Y-%m-%d %H:%M:%S UTC"),
            state.commit()
        );

        for (index, level) in state.levels().iter().enumerate() {
            let _ = writeln!(output, "Level {index}:");
            for name in level {
                let Some(entry) = state.entry(name) else {
                    continue;
                };
                let _ = write!(output, "  {name} {} {}", entry.version, entry.status);
                if let Some(error) = &entry.error {
                    let _ = write!(output, ": {error}");
                }
                output.push('\n');
            }
        }
        output
    }
}
