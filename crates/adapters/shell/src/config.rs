//! Shell plugin settings, read from the `settings` table of its hardware entry.

use serde::Deserialize;

/// Configuration for the shell plugin.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ShellSettings {
    /// Interpreter the configured commands are handed to.
    pub program: String,
    /// Arguments placed before the command string.
    pub args: Vec<String>,
}

impl Default for ShellSettings {
    fn default() -> Self {
        Self {
            program: "sh".to_string(),
            args: vec!["-c".to_string()],
        }
    }
}

impl ShellSettings {
    /// Parse the raw settings value; `null` yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns the deserialisation error for malformed settings.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, serde_json::Error> {
        if value.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(value.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_default_to_posix_shell() {
        let settings = ShellSettings::default();
        assert_eq!(settings.program, "sh");
        assert_eq!(settings.args, vec!["-c"]);
    }

    #[test]
    fn should_deserialize_from_toml() {
        let toml = r#"
            program = "bash"
            args = ["-lc"]
        "#;
        let settings: ShellSettings = toml::from_str(toml).unwrap();
        assert_eq!(settings.program, "bash");
        assert_eq!(settings.args, vec!["-lc"]);
    }

    #[test]
    fn should_use_defaults_for_missing_fields() {
        let settings =
            ShellSettings::from_value(&serde_json::json!({ "program": "dash" })).unwrap();
        assert_eq!(settings.program, "dash");
        assert_eq!(settings.args, vec!["-c"]);
    }
}
