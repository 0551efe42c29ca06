use std::collections::HashMap;
use thiserror::Error;

/// Token replaced by the user name given for the connection rather than by
/// the environment variable of the same name. The match is case sensitive,
/// so `<USERNAME>` still reads the environment.
pub const USER_NAME_TOKEN: &str = "UserName";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubstitutionError {
    #[error("Expected a '>' char at pos.{pos} in path {path}")]
    MissingClose { pos: usize, path: String },
    #[error("Expected a '<' char before pos.{pos} in path {path}")]
    MissingOpen { pos: usize, path: String },
    #[error("Unable to resolve '{name}' in {path}")]
    Unresolved { name: String, path: String },
}

/// A lookup from variable name to value, queried for every `<NAME>` token.
pub trait VariableSource {
    fn var(&self, name: &str) -> Option<String>;
}

/// Reads variables from the process environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvVars;

impl VariableSource for EnvVars {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var_os(name).map(|v| v.to_string_lossy().into_owned())
    }
}

impl VariableSource for HashMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

/// Outcome of resolving one path. `result` is empty whenever `error` is set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubstitutionResult {
    pub result: String,
    pub error: Option<String>,
}

impl SubstitutionResult {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

impl From<Result<String, SubstitutionError>> for SubstitutionResult {
    fn from(value: Result<String, SubstitutionError>) -> Self {
        match value {
            Ok(result) => SubstitutionResult { result, error: None },
            Err(e) => SubstitutionResult {
                result: String::new(),
                error: Some(e.to_string()),
            },
        }
    }
}

/// Resolves `<NAME>` placeholders in UNC paths.
///
/// Tokens may not nest. `<UserName>` (exact casing) is replaced by the user
/// name passed to [`TokenSubstitutor::resolve`]; every other token is looked
/// up in the [`VariableSource`].
///
/// ```
/// use std::collections::HashMap;
/// use volatile_drive::TokenSubstitutor;
///
/// let vars = HashMap::from([("SITE".to_string(), "fs01".to_string())]);
/// let subst = TokenSubstitutor::new(vars);
/// let out = subst.resolve(r"\\<SITE>\home\<UserName>", "bob");
/// assert_eq!(out.result, r"\\fs01\home\bob");
/// ```
#[derive(Debug, Default, Clone)]
pub struct TokenSubstitutor<V = EnvVars> {
    vars: V,
}

impl<V: VariableSource> TokenSubstitutor<V> {
    pub fn new(vars: V) -> Self {
        Self { vars }
    }

    pub fn resolve(&self, path: &str, user_name: &str) -> SubstitutionResult {
        self.try_resolve(path, user_name).into()
    }

    /// Like [`resolve`](Self::resolve), but keeps the typed error.
    ///
    /// Positions in error messages count characters, not bytes.
    pub fn try_resolve(&self, path: &str, user_name: &str) -> Result<String, SubstitutionError> {
        let mut out = String::with_capacity(path.len());
        // byte offsets; the token start points at the '<'
        let mut token_start: Option<usize> = None;
        let mut copied_end: Option<usize> = Some(0);
        let mut len = 0;

        for (pos, (byte, ch)) in path.char_indices().enumerate() {
            len = pos + 1;
            match ch {
                '<' => {
                    let Some(end) = copied_end else {
                        return Err(SubstitutionError::MissingClose {
                            pos,
                            path: path.to_string(),
                        });
                    };
                    out.push_str(&path[end..byte]);
                    token_start = Some(byte);
                    copied_end = None;
                }
                '>' => {
                    let Some(start) = token_start.take() else {
                        return Err(SubstitutionError::MissingOpen {
                            pos,
                            path: path.to_string(),
                        });
                    };
                    let name = &path[start + 1..byte];
                    self.substitute(name, path, user_name, &mut out)?;
                    copied_end = Some(byte + 1);
                }
                _ => {}
            }
        }

        match copied_end {
            None => Err(SubstitutionError::MissingClose {
                pos: len.saturating_sub(1),
                path: path.to_string(),
            }),
            Some(end) => {
                out.push_str(&path[end..]);
                Ok(out)
            }
        }
    }

    fn substitute(
        &self,
        name: &str,
        path: &str,
        user_name: &str,
        out: &mut String,
    ) -> Result<(), SubstitutionError> {
        if name == USER_NAME_TOKEN {
            out.push_str(user_name);
            return Ok(());
        }
        let value = self
            .vars
            .var(name)
            .ok_or_else(|| SubstitutionError::Unresolved {
                name: name.to_string(),
                path: path.to_string(),
            })?;
        out.push_str(&value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subst() -> TokenSubstitutor<HashMap<String, String>> {
        TokenSubstitutor::new(HashMap::from([
            ("SERVER".to_string(), "fs01".to_string()),
            ("USERNAME".to_string(), "os-user".to_string()),
        ]))
    }

    #[test]
    fn user_name_token_uses_supplied_name() {
        let out = subst().resolve(r"\\<UserName>\share", "bob");
        assert_eq!(out.result, r"\\bob\share");
        assert_eq!(out.error, None);
        assert!(out.is_ok());
    }

    #[test]
    fn other_casing_reads_variable_source() {
        let out = subst().resolve(r"\\<SERVER>\home\<USERNAME>", "bob");
        assert_eq!(out.result, r"\\fs01\home\os-user");
    }

    #[test]
    fn unknown_variable_is_an_error() {
        let out = subst().resolve(r"\\<NOPE123>\share", "bob");
        assert!(!out.is_ok());
        assert_eq!(out.result, "");
        let err = out.error.unwrap();
        assert!(err.contains("Unable to resolve 'NOPE123'"), "{err}");
    }

    #[test]
    fn unterminated_token_reports_last_index() {
        let path = r"\\<BAD\share";
        let err = subst().try_resolve(path, "bob").unwrap_err();
        assert_eq!(
            err,
            SubstitutionError::MissingClose {
                pos: path.chars().count() - 1,
                path: path.to_string()
            }
        );
        assert!(err.to_string().starts_with("Expected a '>' char at pos.11"));
    }

    #[test]
    fn nested_open_is_an_error() {
        let err = subst().try_resolve(r"\\<A<B>\x", "bob").unwrap_err();
        assert!(matches!(err, SubstitutionError::MissingClose { pos: 4, .. }));
    }

    #[test]
    fn stray_close_is_an_error() {
        let err = subst().try_resolve(r"\\host>\x", "bob").unwrap_err();
        assert!(matches!(err, SubstitutionError::MissingOpen { pos: 6, .. }));

        let err = subst().try_resolve(r"<SERVER>>", "bob").unwrap_err();
        assert!(matches!(err, SubstitutionError::MissingOpen { pos: 8, .. }));
    }

    #[test]
    fn plain_path_passes_through() {
        assert_eq!(subst().try_resolve(r"\\h\s", "bob").unwrap(), r"\\h\s");
        assert_eq!(subst().try_resolve("", "bob").unwrap(), "");
    }

    #[test]
    fn adjacent_tokens_and_trailing_literal() {
        let out = subst().try_resolve("<SERVER><UserName>-x", "bob").unwrap();
        assert_eq!(out, "fs01bob-x");
    }

    #[test]
    fn positions_count_characters() {
        let err = subst().try_resolve(r"\\hôst>", "bob").unwrap_err();
        assert!(matches!(err, SubstitutionError::MissingOpen { pos: 6, .. }));
    }

    #[test]
    fn resolving_a_resolved_path_is_idempotent() {
        let s = subst();
        for path in [r"\\<SERVER>\a", r"\\<UserName>\<SERVER>\b", r"\\plain\c"] {
            let once = s.try_resolve(path, "bob").unwrap();
            let twice = s.try_resolve(&once, "bob").unwrap();
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn env_vars_reads_process_environment() {
        let Some(path) = std::env::var_os("PATH") else {
            return;
        };
        let out = TokenSubstitutor::new(EnvVars).try_resolve("<PATH>", "bob").unwrap();
        assert_eq!(out, path.to_string_lossy());
    }
}
