// Python text helpers: literal escaping and Operation -> statements.

use std::time::Duration;

use crate::planner::{Locator, Operation};

/// Double-quoted Python string literal.
pub fn string_literal(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Single line, safe after `# `.
pub fn comment_text(text: &str) -> String {
    text.split(['\r', '\n'])
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Single line, safe inside a `"""` docstring.
pub fn docstring_text(text: &str) -> String {
    comment_text(text).replace('\\', "\\\\").replace('"', "\\\"")
}

/// `time.sleep` argument: `2`, `1.5`.
pub fn seconds(duration: Duration) -> String {
    format!("{}", duration.as_secs_f64())
}

pub fn by(locator: &Locator) -> String {
    match locator {
        Locator::Id(id) => format!("By.ID, {}", string_literal(id)),
        Locator::Css(selector) => format!("By.CSS_SELECTOR, {}", string_literal(selector)),
        Locator::ClassName(class) => format!("By.CLASS_NAME, {}", string_literal(class)),
    }
}

/// Statements for one operation. `driver` is `self.driver` or `driver`.
pub fn statements(operation: &Operation, driver: &str) -> Vec<String> {
    match operation {
        Operation::Navigate { url } => vec![format!("{driver}.get({})", string_literal(url))],
        Operation::Fill { locator, value } => vec![
            format!("element = {driver}.find_element({})", by(locator)),
            "element.clear()".to_string(),
            format!("element.send_keys({})", string_literal(value)),
        ],
        Operation::Click { locator } => {
            vec![format!("{driver}.find_element({}).click()", by(locator))]
        }
        Operation::AssertUrlContains { fragments } => {
            let tuple = fragments
                .iter()
                .map(|f| string_literal(f))
                .collect::<Vec<_>>()
                .join(", ");
            // one-element tuples need the trailing comma
            let tuple = if fragments.len() == 1 {
                format!("({tuple},)")
            } else {
                format!("({tuple})")
            };
            vec![format!(
                "assert any(fragment in {driver}.current_url for fragment in {tuple}), \
                 {driver}.current_url"
            )]
        }
        Operation::AssertVisible { locator } => vec![format!(
            "assert {driver}.find_element({}).is_displayed(), {}",
            by(locator),
            string_literal(&format!("{locator} is not visible"))
        )],
        Operation::AssertPlaceholder => vec!["pass  # no concrete check for this result".to_string()],
        Operation::Pause { duration } => vec![format!("time.sleep({})", seconds(*duration))],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_literal_escapes_quotes_and_newlines() {
        assert_eq!(string_literal(r#"say "hi""#), r#""say \"hi\"""#);
        assert_eq!(string_literal("a\\b\nc"), r#""a\\b\nc""#);
        assert_eq!(string_literal("密碼"), "\"密碼\"");
    }

    #[test]
    fn test_comment_text_is_single_line() {
        assert_eq!(comment_text("line one\n  line two\r\n"), "line one line two");
    }

    #[test]
    fn test_seconds_formatting() {
        assert_eq!(seconds(Duration::from_secs(2)), "2");
        assert_eq!(seconds(Duration::from_millis(1500)), "1.5");
    }

    #[test]
    fn test_fill_statements() {
        let op = Operation::Fill {
            locator: Locator::Id("username"),
            value: "admin".to_string(),
        };
        assert_eq!(
            statements(&op, "self.driver"),
            vec![
                r#"element = self.driver.find_element(By.ID, "username")"#,
                "element.clear()",
                r#"element.send_keys("admin")"#,
            ]
        );
    }

    #[test]
    fn test_css_selector_quotes_survive() {
        let op = Operation::Click {
            locator: Locator::Css("button[type='submit']"),
        };
        assert_eq!(
            statements(&op, "driver"),
            vec![r#"driver.find_element(By.CSS_SELECTOR, "button[type='submit']").click()"#]
        );
    }
}
