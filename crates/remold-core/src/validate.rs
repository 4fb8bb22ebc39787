use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::error::{excerpt, ValidationFailure, ValidationKind};
use crate::model::RefactorResult;

const PRIMARY: (&str, &str) = ("primary_content", "refactored_main");
const BACKUP: (&str, &str) = ("backup_content", "backup_file");
const MODULES: &str = "utility_modules";

pub struct Validator {
    excerpt_len: usize,
}

impl Default for Validator {
    fn default() -> Self {
        Self { excerpt_len: 200 }
    }
}

impl Validator {
    pub fn with_excerpt_len(excerpt_len: usize) -> Self {
        Self { excerpt_len }
    }

    /// Parse `text` strictly and check it has the shape of a [`RefactorResult`].
    ///
    /// Either the whole record is returned or a failure is; nothing
    /// half-filled escapes.
    pub fn validate(&self, text: &str) -> Result<RefactorResult, ValidationFailure> {
        let fail = |kind| ValidationFailure {
            kind,
            raw_excerpt: excerpt(text, self.excerpt_len),
        };

        let value: Value = serde_json::from_str(text.trim()).map_err(|e| {
            fail(ValidationKind::Malformed {
                parser_error: e.to_string(),
            })
        })?;

        let obj = match value {
            Value::Object(obj) => obj,
            other => {
                return Err(fail(ValidationKind::Malformed {
                    parser_error: format!("expected an object, found {}", type_name(&other)),
                }))
            }
        };

        let primary_content = match lookup(&obj, PRIMARY) {
            None | Some(Value::Null) => {
                return Err(fail(ValidationKind::MissingField { field: PRIMARY.0 }))
            }
            Some(Value::String(s)) => s.clone(),
            Some(_) => {
                return Err(fail(ValidationKind::InvalidField {
                    field: PRIMARY.0.into(),
                    expected: "string",
                }))
            }
        };

        let backup_content = match lookup(&obj, BACKUP) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => {
                return Err(fail(ValidationKind::InvalidField {
                    field: BACKUP.0.into(),
                    expected: "string",
                }))
            }
        };

        let mut utility_modules = IndexMap::new();
        match obj.get(MODULES) {
            None | Some(Value::Null) => {}
            Some(Value::Object(modules)) => {
                for (name, content) in modules {
                    let Value::String(content) = content else {
                        return Err(fail(ValidationKind::InvalidField {
                            field: format!("{MODULES}.{name}"),
                            expected: "string",
                        }));
                    };
                    utility_modules.insert(name.clone(), content.clone());
                }
            }
            Some(_) => {
                return Err(fail(ValidationKind::InvalidField {
                    field: MODULES.into(),
                    expected: "object",
                }))
            }
        }

        tracing::debug!(
            primary_len = primary_content.len(),
            modules = utility_modules.len(),
            has_backup = backup_content.is_some(),
            "payload validated"
        );

        Ok(RefactorResult {
            primary_content,
            backup_content,
            utility_modules,
        })
    }
}

/// Validate with the default excerpt length.
pub fn validate(text: &str) -> Result<RefactorResult, ValidationFailure> {
    Validator::default().validate(text)
}

/// Canonical key first, then the legacy alias.
fn lookup<'a>(obj: &'a Map<String, Value>, (key, alias): (&str, &str)) -> Option<&'a Value> {
    obj.get(key).or_else(|| obj.get(alias))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
