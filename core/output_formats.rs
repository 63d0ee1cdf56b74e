use crate::error::{AppError, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize)]
pub struct BuiltinIgnores {
    #[serde(default)]
    pub directories: Vec<String>,
    #[serde(default)]
    pub files: Vec<String>,
}

static BUILTIN_IGNORE_PATTERNS: Lazy<BuiltinIgnores> = Lazy::new(|| {
    let yaml_content = include_str!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/../data/builtin_ignores.yaml"
    ));
    serde_yml::from_str(yaml_content).expect("Failed to parse embedded data/builtin_ignores.yaml")
});

pub fn get_builtin_ignore_patterns() -> &'static BuiltinIgnores {
    &BUILTIN_IGNORE_PATTERNS
}

pub fn serialize_to_json<T: Serialize>(data: &T, pretty: bool) -> Result<String, AppError> {
    if pretty {
        serde_json::to_string_pretty(data).map_err(AppError::JsonSerialize)
    } else {
        serde_json::to_string(data).map_err(AppError::JsonSerialize)
    }
}

pub fn serialize_to_yaml<T: Serialize>(data: &T) -> Result<String, AppError> {
    serde_yml::to_string(data).map_err(AppError::YamlError)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_builtin_ignores_parse() {
        let builtin = get_builtin_ignore_patterns();
        assert!(builtin.directories.iter().any(|d| d == "node_modules"));
        assert!(builtin.directories.iter().any(|d| d == ".git"));
        assert!(builtin.files.iter().any(|f| f == "package-lock.json"));
    }

    #[test]
    fn json_serialization_respects_pretty_flag() {
        let data = vec!["a", "b"];
        assert_eq!(serialize_to_json(&data, false).unwrap(), r#"["a","b"]"#);
        assert!(serialize_to_json(&data, true).unwrap().contains('\n'));
    }
}
