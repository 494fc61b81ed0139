use std::fmt::Debug;
use std::sync::Arc;

use log::info;
use serde::Serialize;

use crate::executor::{ResultSymbol, TestCaseExecutor, TestResult};
use crate::generator::TestCombination;

/// What a test harness offers to a running test case.
pub trait TestContext {
    fn record(&mut self, passed: bool, message: String);

    fn skip(&mut self, reason: Option<String>);

    fn expect<T: PartialEq + Debug>(&mut self, actual: T) -> Expectation<'_, Self, T>
    where
        Self: Sized,
    {
        Expectation { ctx: self, actual }
    }
}

pub struct Expectation<'a, C: TestContext, T> {
    ctx: &'a mut C,
    actual: T,
}

impl<C: TestContext, T: PartialEq + Debug> Expectation<'_, C, T> {
    pub fn to_be(self, expected: T) -> bool {
        let passed = self.actual == expected;
        self.ctx.record(
            passed,
            format!("expected {:?} to be {expected:?}", self.actual),
        );
        passed
    }

    pub fn not_to_be(self, unexpected: T) -> bool {
        let passed = self.actual != unexpected;
        self.ctx.record(
            passed,
            format!("expected {:?} not to be {unexpected:?}", self.actual),
        );
        passed
    }
}

/// A named, executable unit handed to a test harness.
pub struct TestCase {
    pub name: String,
    combination: TestCombination,
    executor: Arc<TestCaseExecutor>,
}

impl TestCase {
    pub fn new(combination: TestCombination, executor: Arc<TestCaseExecutor>) -> Self {
        let name = format!(
            "{} from the perspective of user '{}'",
            combination.route,
            combination.user_name()
        );
        Self {
            name,
            combination,
            executor,
        }
    }

    pub fn combination(&self) -> &TestCombination {
        &self.combination
    }

    pub async fn run<C: TestContext>(&self, ctx: &mut C) -> Option<TestResult> {
        let result = self.executor.execute(&self.combination).await;
        match result.result {
            ResultSymbol::Skip => ctx.skip(Some(result.explanation.clone())),
            ResultSymbol::Pass | ResultSymbol::Fail => {
                ctx.expect(result.result).to_be(ResultSymbol::Pass);
            }
        }
        Some(result)
    }
}

/// Wraps each combination into a test case, keeping their order.
pub fn build_test_cases(
    combinations: Vec<TestCombination>,
    executor: Arc<TestCaseExecutor>,
) -> Vec<TestCase> {
    combinations
        .into_iter()
        .map(|c| TestCase::new(c, executor.clone()))
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl Summary {
    pub fn total(&self) -> usize {
        self.passed + self.failed + self.skipped
    }
}

#[derive(Debug, Default, Serialize)]
pub struct RunReport {
    pub results: Vec<TestResult>,
}

impl RunReport {
    pub fn summary(&self) -> Summary {
        let mut summary = Summary::default();
        for result in self.results.iter() {
            match result.result {
                ResultSymbol::Pass => summary.passed += 1,
                ResultSymbol::Fail => summary.failed += 1,
                ResultSymbol::Skip => summary.skipped += 1,
            }
        }
        summary
    }

    pub fn has_failures(&self) -> bool {
        self.results.iter().any(|r| r.result == ResultSymbol::Fail)
    }
}

#[derive(Debug, Default)]
struct RecordingContext {
    failures: Vec<String>,
    skipped: Option<String>,
}

impl TestContext for RecordingContext {
    fn record(&mut self, passed: bool, message: String) {
        if !passed {
            self.failures.push(message);
        }
    }

    fn skip(&mut self, reason: Option<String>) {
        self.skipped = Some(reason.unwrap_or_default());
    }
}

/// Runs test cases one after another, in the given order.
pub struct SequentialRunner;

impl SequentialRunner {
    pub async fn run(cases: &[TestCase]) -> RunReport {
        let mut report = RunReport::default();
        for (idx, case) in cases.iter().enumerate() {
            let mut ctx = RecordingContext::default();
            let result = case.run(&mut ctx).await;

            let status = if ctx.skipped.is_some() {
                "skipped"
            } else if ctx.failures.is_empty() {
                "passed"
            } else {
                "failed"
            };
            info!("[{}/{}] {}: {status}", idx + 1, cases.len(), case.name);

            if let Some(result) = result {
                report.results.push(result);
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expectation() {
        let mut ctx = RecordingContext::default();
        assert!(ctx.expect(403).to_be(403));
        assert!(ctx.expect("a").not_to_be("b"));
        assert!(ctx.failures.is_empty());

        assert!(!ctx.expect(401).to_be(403));
        assert_eq!(ctx.failures, vec![String::from("expected 401 to be 403")]);
    }
}
