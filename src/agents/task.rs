//! Task templates and prompt variable interpolation

use serde::{Deserialize, Serialize};

use crate::types::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Diagnosis,
    Recovery,
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskKind::Diagnosis => write!(f, "diagnosis"),
            TaskKind::Recovery => write!(f, "recovery"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TaskTemplate {
    pub kind: TaskKind,
    pub description: &'static str,
    pub expected_output: &'static str,
    pub input_variables: &'static [&'static str],
}

impl TaskTemplate {
    /// Prevention and treatment steps tailored to the weather
    pub fn diagnosis() -> Self {
        Self {
            kind: TaskKind::Diagnosis,
            description: r#"Provide disease prevention and treatment steps for {predicted_class} affecting the plant {name} in {language}.

Use your knowledge of plant diseases and agricultural best practices.
Ensure your advice is tailored to the current weather:
- Temperature: {Temperature}
- Condition: {Condition}
- Humidity: {Humidity}
- Wind: {Wind}
- UV Index: {UV_index}"#,
            expected_output: "Prevention and treatment guidance tailored to the disease, plant, and current weather conditions.",
            input_variables: &[
                "question",
                "predicted_class",
                "name",
                "language",
                "Temperature",
                "Humidity",
                "Condition",
                "Wind",
                "UV_index",
            ],
        }
    }

    /// Fertilizer and nutrient plan once the disease is under control
    pub fn recovery() -> Self {
        Self {
            kind: TaskKind::Recovery,
            description: "After prevention and treatment, suggest fertilizers and nutrients to help {name} recover after {predicted_class}. Respond in {language}.",
            expected_output: "List of fertilizers, application tips, and timing for best recovery.",
            input_variables: &["predicted_class", "name", "language"],
        }
    }

    /// Check that every declared variable is present before rendering
    pub fn check_inputs(&self, inputs: &TaskInputs) -> AppResult<()> {
        let missing: Vec<&str> = self
            .input_variables
            .iter()
            .copied()
            .filter(|v| inputs.get(v).is_none())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(AppError::InvalidRequest(format!(
                "{} task is missing inputs: {}",
                self.kind,
                missing.join(", ")
            )))
        }
    }
}

/// Named prompt variables, kept in insertion order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskInputs(Vec<(String, String)>);

impl TaskInputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a variable
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key, value)),
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

fn is_var_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// Substitute `{var}` placeholders.
///
/// `{{` and `}}` produce literal braces. A brace that does not enclose a
/// variable name is copied through unchanged. Referencing a variable that is
/// not in `inputs` is an error.
pub fn render_template(template: &str, inputs: &TaskInputs) -> AppResult<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(pos) = rest.find(['{', '}']) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if tail.starts_with("{{") || tail.starts_with("}}") {
            out.push_str(&tail[..1]);
            rest = &tail[2..];
            continue;
        }

        if tail.starts_with('{') {
            let body = &tail[1..];
            let name_len = body.find(|c: char| !is_var_char(c)).unwrap_or(body.len());
            let name = &body[..name_len];
            let first_ok = name.chars().next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_');

            if first_ok && body[name_len..].starts_with('}') {
                let value = inputs.get(name).ok_or_else(|| {
                    AppError::InvalidRequest(format!("template variable '{}' was not provided", name))
                })?;
                out.push_str(value);
                rest = &body[name_len + 1..];
                continue;
            }
        }

        out.push_str(&tail[..1]);
        rest = &tail[1..];
    }

    out.push_str(rest);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs() -> TaskInputs {
        let mut inputs = TaskInputs::new();
        inputs
            .set("question", "Fungus")
            .set("predicted_class", "Fungus")
            .set("name", "tomato")
            .set("language", "sw")
            .set("Temperature", "22°C")
            .set("Condition", "Partly cloudy")
            .set("Humidity", "64%")
            .set("Wind", "14.4 kph NE")
            .set("UV_index", "6");
        inputs
    }

    #[test]
    fn test_render_substitutes_variables() {
        let rendered = render_template("{predicted_class} on {name} ({language})", &inputs()).unwrap();
        assert_eq!(rendered, "Fungus on tomato (sw)");
    }

    #[test]
    fn test_render_escapes_and_stray_braces() {
        let rendered = render_template("{{literal}} {not a var} x}y {name}", &inputs()).unwrap();
        assert_eq!(rendered, "{literal} {not a var} x}y tomato");
    }

    #[test]
    fn test_render_missing_variable_errors() {
        let err = render_template("Advice for {crop}", &inputs()).unwrap_err();
        assert!(err.to_string().contains("'crop'"));
    }

    #[test]
    fn test_render_handles_multibyte_text() {
        let rendered = render_template("Temperature: {Temperature} 🌿", &inputs()).unwrap();
        assert_eq!(rendered, "Temperature: 22°C 🌿");
    }

    #[test]
    fn test_builtin_templates_render() {
        let inputs = inputs();
        for task in [TaskTemplate::diagnosis(), TaskTemplate::recovery()] {
            task.check_inputs(&inputs).unwrap();
            let rendered = render_template(task.description, &inputs).unwrap();
            assert!(!rendered.contains('{'), "unrendered placeholder in {}", task.kind);
            assert!(rendered.contains("tomato"));
        }
    }

    #[test]
    fn test_check_inputs_lists_missing() {
        let mut partial = TaskInputs::new();
        partial.set("predicted_class", "Virus");
        let err = TaskTemplate::recovery().check_inputs(&partial).unwrap_err();
        assert!(err.to_string().contains("name, language"));
    }

    #[test]
    fn test_set_replaces_existing() {
        let mut inputs = TaskInputs::new();
        inputs.set("name", "maize").set("name", "beans");
        assert_eq!(inputs.get("name"), Some("beans"));
        assert_eq!(inputs.iter().count(), 1);
    }
}
