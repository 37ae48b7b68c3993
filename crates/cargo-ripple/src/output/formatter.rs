use ripple_operations::operations::ReleasePlan;
use ripple_operations::{PublishResult, RunState};

pub(crate) trait ReportFormatter {
    fn format_plan(&self, plan: &ReleasePlan) -> String;
    fn format_result(&self, result: &PublishResult) -> String;
    fn format_state(&self, state: &RunState) -> String;
}
