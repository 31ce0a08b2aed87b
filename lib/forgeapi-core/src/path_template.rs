//! Route templates with numeric path parameters.

use crate::{Error, Result};

/// A relative route such as `projects/{project}/repository_storage_moves/{id}`.
///
/// Expansion only accepts positive integers, formatted in decimal, so no
/// escaping is ever needed. The template itself is kept in request extensions
/// so middleware can log the route instead of the concrete path.
///
/// ```
/// use forgeapi_core::PathTemplate;
///
/// let template = PathTemplate::new("projects/{project}/repository_storage_moves/{id}");
/// let path = template.expand(&[("project", 7), ("id", 12)]).unwrap();
/// assert_eq!(path, "projects/7/repository_storage_moves/12");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathTemplate(&'static str);

impl PathTemplate {
    /// Create a new path template.
    #[must_use]
    pub const fn new(template: &'static str) -> Self {
        Self(template)
    }

    /// Get the template string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        self.0
    }

    /// Substitute every `{name}` placeholder with its value.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidRequest`] if a placeholder has no value, a value is
    /// zero, a value names no placeholder, or a brace is left unbalanced.
    pub fn expand(&self, params: &[(&str, u64)]) -> Result<String> {
        let mut path = String::with_capacity(self.0.len() + params.len() * 4);
        let mut used: Vec<&str> = Vec::with_capacity(params.len());
        let mut rest = self.0;

        while let Some(open) = rest.find('{') {
            let (literal, tail) = rest.split_at(open);
            if literal.contains('}') {
                return Err(self.malformed());
            }
            path.push_str(literal);

            let Some(close) = tail.find('}') else {
                return Err(self.malformed());
            };
            let name = tail.get(1..close).ok_or_else(|| self.malformed())?;
            if name.is_empty() || name.contains('{') {
                return Err(self.malformed());
            }

            let Some(&(_, value)) = params.iter().find(|(key, _)| *key == name) else {
                return Err(Error::invalid_request(format!(
                    "missing path parameter `{name}` for `{}`",
                    self.0
                )));
            };
            if value == 0 {
                return Err(Error::invalid_request(format!(
                    "path parameter `{name}` must be a positive integer"
                )));
            }

            path.push_str(&value.to_string());
            if !used.contains(&name) {
                used.push(name);
            }
            rest = tail.get(close + 1..).unwrap_or_default();
        }

        if rest.contains('}') {
            return Err(self.malformed());
        }
        path.push_str(rest);

        if used.len() != params.len() {
            return Err(Error::invalid_request(format!(
                "unexpected path parameters for `{}`",
                self.0
            )));
        }

        Ok(path)
    }

    fn malformed(&self) -> Error {
        Error::invalid_request(format!("malformed path template `{}`", self.0))
    }
}

impl std::fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for PathTemplate {
    fn as_ref(&self) -> &str {
        self.0
    }
}
