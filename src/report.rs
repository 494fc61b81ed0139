use anyhow::Result;
use serde::Serialize;

use crate::api::{BoundParameter, HttpMethod};
use crate::display::{display_json, display_list, DisplayStyle, TerminalDisplay};
use crate::executor::TestResult;
use crate::generator::{AccessControlResult, TestCombination};
use crate::policy::Action;
use crate::runner::{RunReport, Summary};

/// One row of the dry run matrix.
#[derive(Debug, Clone, Serialize)]
pub struct PlanEntry {
    pub user: String,
    pub method: HttpMethod,
    pub url: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub security: Option<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<BoundParameter>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,

    pub expected: AccessControlResult,
}

impl From<&TestCombination> for PlanEntry {
    fn from(c: &TestCombination) -> Self {
        Self {
            user: c.user_name().to_string(),
            method: c.route.method,
            url: c.route.url.clone(),
            security: c.route.security.clone(),
            parameters: c.route.parameters.clone(),
            action: c.action,
            expected: c.expected,
        }
    }
}

impl TerminalDisplay for PlanEntry {
    fn table_titles() -> Vec<&'static str> {
        vec!["#", "USER", "METHOD", "URL", "ACTION", "EXPECTED"]
    }

    fn table_row(self) -> Vec<String> {
        let mut url = self.url;
        for param in self.parameters {
            url.push_str(&format!(
                " [{} {}={}]",
                param.location.as_str(),
                param.name,
                param.value
            ));
        }
        vec![
            String::new(),
            self.user,
            self.method.to_string(),
            url,
            self.action.map(|a| a.to_string()).unwrap_or_else(|| String::from("-")),
            self.expected.to_string(),
        ]
    }
}

impl TerminalDisplay for TestResult {
    fn table_titles() -> Vec<&'static str> {
        vec![
            "USER", "METHOD", "URL", "EXPECTED", "ACTUAL", "STATUS", "RESULT", "EXPLANATION",
        ]
    }

    fn table_row(self) -> Vec<String> {
        vec![
            self.user_name().to_string(),
            self.route.method.to_string(),
            self.route.url,
            self.expected.to_string(),
            self.actual.map(|a| a.to_string()).unwrap_or_else(|| String::from("-")),
            self.status_code.map(|s| s.to_string()).unwrap_or_else(|| String::from("-")),
            self.result.to_string(),
            self.explanation,
        ]
    }
}

pub fn format_summary(summary: &Summary) -> String {
    format!(
        "{} passed, {} failed, {} skipped, {} total",
        summary.passed,
        summary.failed,
        summary.skipped,
        summary.total()
    )
}

pub fn display_plan(combinations: &[TestCombination], style: DisplayStyle) -> Result<()> {
    let entries: Vec<PlanEntry> = combinations.iter().map(PlanEntry::from).collect();
    match style {
        DisplayStyle::Table => {
            let total = entries.len();
            let numbered = entries
                .into_iter()
                .enumerate()
                .map(|(idx, entry)| NumberedEntry { idx, entry })
                .collect();
            display_list::<NumberedEntry>(numbered, style)?;
            println!("{total} test combination(s)");
            Ok(())
        }
        DisplayStyle::Json => display_json(entries),
    }
}

#[derive(Serialize)]
struct NumberedEntry {
    idx: usize,
    #[serde(flatten)]
    entry: PlanEntry,
}

impl TerminalDisplay for NumberedEntry {
    fn table_titles() -> Vec<&'static str> {
        PlanEntry::table_titles()
    }

    fn table_row(self) -> Vec<String> {
        let mut row = self.entry.table_row();
        row[0] = (self.idx + 1).to_string();
        row
    }
}

#[derive(Serialize)]
struct ReportView<'a> {
    summary: Summary,
    results: &'a [TestResult],
}

pub fn display_report(report: &RunReport, style: DisplayStyle) -> Result<()> {
    let summary = report.summary();
    match style {
        DisplayStyle::Table => {
            display_list(report.results.clone(), style)?;
            println!("{}", format_summary(&summary));
            Ok(())
        }
        DisplayStyle::Json => display_json(ReportView {
            summary,
            results: &report.results,
        }),
    }
}

#[cfg(test)]
mod tests {
    use crate::api::{ParameterLocation, Route};
    use crate::executor::ResultSymbol;

    use super::*;

    #[test]
    fn test_result_row() {
        let result = TestResult {
            user: None,
            route: Route::new(HttpMethod::Get, "http://localhost:3333/me"),
            expected: AccessControlResult::Denied,
            actual: Some(AccessControlResult::Denied),
            status_code: Some(401),
            result: ResultSymbol::Pass,
            explanation: String::from("anonymous access denied as expected, status code 401"),
        };
        assert_eq!(
            result.table_row(),
            vec![
                "anonymous",
                "GET",
                "http://localhost:3333/me",
                "denied",
                "denied",
                "401",
                "✅",
                "anonymous access denied as expected, status code 401",
            ]
        );
    }

    #[test]
    fn test_plan_row() {
        let mut route = Route::new(HttpMethod::Put, "http://localhost:3333/todos");
        route.parameters.push(BoundParameter {
            name: String::from("X-Todo"),
            location: ParameterLocation::Header,
            value: String::from("7"),
        });
        let combination = TestCombination {
            user: None,
            route,
            expected: AccessControlResult::Denied,
            action: None,
        };
        let row = PlanEntry::from(&combination).table_row();
        assert_eq!(row[3], "http://localhost:3333/todos [header X-Todo=7]");
        assert_eq!(row[4], "-");
    }

    #[test]
    fn test_summary() {
        let summary = Summary {
            passed: 3,
            failed: 1,
            skipped: 2,
        };
        assert_eq!(format_summary(&summary), "3 passed, 1 failed, 2 skipped, 6 total");
    }
}
