use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Test case as received from the upstream generator.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct TestCase {
    #[serde(default, deserialize_with = "lenient_text")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub description: String,
    #[serde(rename = "type", default, deserialize_with = "lenient_label")]
    pub case_type: CaseType,
    #[serde(default, deserialize_with = "lenient_steps")]
    pub steps: Vec<String>,
    #[serde(default, deserialize_with = "lenient_expected")]
    pub expected_result: Option<String>,
    #[serde(default, deserialize_with = "lenient_label")]
    pub priority: Priority,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum CaseType {
    #[default]
    Positive,
    Negative,
    Boundary,
    Exception,
    Fuzz,
}

impl From<String> for CaseType {
    fn from(label: String) -> Self {
        match label.trim().to_lowercase().as_str() {
            "negative" => Self::Negative,
            "boundary" => Self::Boundary,
            "exception" => Self::Exception,
            "fuzz" => Self::Fuzz,
            // Generators also emit "functional", "security", ... here.
            _ => Self::Positive,
        }
    }
}

impl CaseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
            Self::Boundary => "boundary",
            Self::Exception => "exception",
            Self::Fuzz => "fuzz",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl From<String> for Priority {
    fn from(label: String) -> Self {
        match label.trim().to_lowercase().as_str() {
            "high" => Self::High,
            "low" => Self::Low,
            _ => Self::Medium,
        }
    }
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

/// Steps arrive as strings most of the time, but generators sometimes emit
/// objects (`{"action": ...}`) or numbers. Everything is flattened to text.
fn lenient_steps<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Vec<Value>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .filter_map(|value| match value {
            Value::String(s) => Some(s),
            Value::Null => None,
            Value::Object(map) => ["description", "action", "step", "text"]
                .iter()
                .find_map(|key| map.get(*key).and_then(Value::as_str))
                .map(str::to_string)
                .or_else(|| Some(Value::Object(map).to_string())),
            other => Some(other.to_string()),
        })
        .filter(|step| !step.trim().is_empty())
        .collect())
}

/// Scalar as text: `"TC1"` stays, `7` becomes `"7"`, `null` becomes `""`.
fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Value> = Option::deserialize(deserializer)?;
    Ok(raw.map(value_text).unwrap_or_default())
}

/// `type` and `priority`: unknown, null or non-string labels fall back to
/// the default instead of rejecting the whole case.
fn lenient_label<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: From<String> + Default,
{
    let raw: Option<Value> = Option::deserialize(deserializer)?;
    Ok(match raw {
        None | Some(Value::Null) => T::default(),
        Some(value) => T::from(value_text(value)),
    })
}

/// A list of expectations is joined with `"; "`.
fn lenient_expected<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Value> = Option::deserialize(deserializer)?;
    let text = match raw {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Array(items)) => items
            .into_iter()
            .map(value_text)
            .filter(|item| !item.trim().is_empty())
            .collect::<Vec<_>>()
            .join("; "),
        Some(value) => value_text(value),
    };
    Ok(Some(text).filter(|s| !s.trim().is_empty()))
}

fn value_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct StepResult {
    pub step_number: usize,
    pub step: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct TestCaseResult {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub case_type: CaseType,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub execution_time_ms: u64,
    pub steps_results: Vec<StepResult>,
}

/// Aggregated outcome of one live run.
///
/// Only constructed through [`RunSummary::from_results`] and
/// [`RunSummary::aborted`], which keep the counters consistent.
#[derive(Debug, Serialize, Clone)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub success_rate: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub results: Vec<TestCaseResult>,
}

impl RunSummary {
    pub fn from_results(
        started_at: DateTime<Utc>,
        results: Vec<TestCaseResult>,
        error: Option<String>,
    ) -> Self {
        let total = results.len();
        let passed = results.iter().filter(|r| r.success).count();
        let success_rate = if total > 0 {
            passed as f64 / total as f64
        } else {
            0.0
        };

        Self {
            run_id: Uuid::new_v4(),
            started_at,
            finished_at: Utc::now(),
            total,
            passed,
            failed: total - passed,
            success_rate,
            error,
            results,
        }
    }

    /// Run that never attempted a case.
    pub fn aborted(started_at: DateTime<Utc>, error: impl Into<String>) -> Self {
        Self::from_results(started_at, Vec::new(), Some(error.into()))
    }

    pub fn all_passed(&self) -> bool {
        self.error.is_none() && self.failed == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn case_result(id: &str, success: bool) -> TestCaseResult {
        TestCaseResult {
            id: id.to_string(),
            title: id.to_string(),
            case_type: CaseType::Positive,
            success,
            error: None,
            execution_time_ms: 0,
            steps_results: vec![],
        }
    }

    #[test]
    fn test_lenient_case_deserialization() {
        let case: TestCase = serde_json::from_value(json!({
            "id": "TC001",
            "title": "Login",
            "type": "functional",
            "steps": ["Open the page", {"action": "Click login"}, 3, null, "  "],
            "expected_result": "   ",
            "priority": "urgent",
            "business_impact": "high"
        }))
        .unwrap();

        assert_eq!(case.case_type, CaseType::Positive);
        assert_eq!(case.priority, Priority::Medium);
        assert_eq!(case.steps, vec!["Open the page", "Click login", "3"]);
        assert_eq!(case.expected_result, None);
        assert_eq!(case.description, "");
    }

    #[test]
    fn test_loose_scalar_fields() {
        let case: TestCase = serde_json::from_value(json!({
            "id": 12,
            "title": null,
            "type": 3,
            "priority": false,
            "expected_result": ["Saved", "", "Toast shown"]
        }))
        .unwrap();

        assert_eq!(case.id, "12");
        assert_eq!(case.title, "");
        assert_eq!(case.case_type, CaseType::Positive);
        assert_eq!(case.priority, Priority::Medium);
        assert_eq!(case.expected_result.as_deref(), Some("Saved; Toast shown"));

        let case: TestCase = serde_json::from_value(json!({"expected_result": []})).unwrap();
        assert_eq!(case.expected_result, None);
    }

    #[test]
    fn test_case_type_labels() {
        let case: TestCase =
            serde_json::from_value(json!({"type": "Negative", "priority": "HIGH"})).unwrap();
        assert_eq!(case.case_type, CaseType::Negative);
        assert_eq!(case.priority, Priority::High);

        let value = serde_json::to_value(&case).unwrap();
        assert_eq!(value["type"], "negative");
        assert_eq!(value["priority"], "high");
    }

    #[test]
    fn test_summary_counters() {
        let summary = RunSummary::from_results(
            Utc::now(),
            vec![
                case_result("a", true),
                case_result("b", false),
                case_result("c", true),
                case_result("d", true),
            ],
            None,
        );

        assert_eq!(summary.total, 4);
        assert_eq!(summary.passed, 3);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.passed + summary.failed, summary.total);
        assert!((summary.success_rate - 0.75).abs() < f64::EPSILON);
        assert!(!summary.all_passed());
    }

    #[test]
    fn test_aborted_summary_is_empty() {
        let summary = RunSummary::aborted(Utc::now(), "no browser");
        assert_eq!(summary.total, 0);
        assert_eq!(summary.passed + summary.failed, 0);
        assert_eq!(summary.success_rate, 0.0);
        assert_eq!(summary.error.as_deref(), Some("no browser"));
        assert!(!summary.all_passed());
    }
}
