use regex::Regex;
use rocket::serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::LazyLock;

pub const MAX_NAME_LENGTH: usize = 150;

static NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9a-zA-Z\-_ ]*$").expect("name pattern is a valid regex")
});

/// Field-level validation messages, rendered as `{"field": ["message"]}`.
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq, Eq)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// `Ok(())` when nothing was recorded, otherwise the collected errors.
    pub fn into_result(self) -> Result<(), FormErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

/// Checks a project, experiment or reference name, recording problems
/// under `field`.
pub fn validate_name(errors: &mut FormErrors, field: &str, name: &str) {
    if name.is_empty() {
        errors.add(field, "This field is required.");
        return;
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        errors.add(
            field,
            format!("Ensure this value has at most {MAX_NAME_LENGTH} characters."),
        );
    }
    if !NAME_PATTERN.is_match(name) {
        errors.add(field, "Use only characters, numbers, - and _ in the name.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(name: &str) -> FormErrors {
        let mut errors = FormErrors::default();
        validate_name(&mut errors, "name", name);
        errors
    }

    #[test]
    fn test_accepts_allowed_characters() {
        assert!(check("First_Project").is_empty());
        assert!(check("run-2 replicate 1").is_empty());
    }

    #[test]
    fn test_rejects_special_characters() {
        let errors = check("P&nk");
        assert_eq!(
            errors.get("name"),
            Some(&["Use only characters, numbers, - and _ in the name.".to_string()][..])
        );
    }

    #[test]
    fn test_rejects_empty_and_long_names() {
        assert_eq!(
            check("").get("name"),
            Some(&["This field is required.".to_string()][..])
        );
        assert!(check(&"a".repeat(151)).get("name").is_some());
        assert!(check(&"a".repeat(150)).is_empty());
    }

    #[test]
    fn test_serializes_as_field_map() {
        let mut errors = FormErrors::default();
        errors.add("name", "first");
        errors.add("name", "second");
        assert_eq!(
            serde_json::to_value(&errors).unwrap(),
            serde_json::json!({"name": ["first", "second"]})
        );
    }
}
