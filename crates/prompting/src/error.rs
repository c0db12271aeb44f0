//! Error types for prompt panels and views.
//!
//! [`PromptError`] covers construction-time contract violations, strict
//! lookups that miss, and definition parsing/fetching failures.
//! [`RenderError`] is the single rejection channel of
//! [`View::render`](crate::view::View::render).

/// Errors raised by the parameter model, the prompt panel, and the API facade.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PromptError {
    /// A required constructor argument was missing or empty.
    #[error("{0} is required")]
    ArgRequired(&'static str),
    /// An argument was present but unusable.
    #[error("invalid argument '{name}': {reason}")]
    InvalidArgument { name: &'static str, reason: String },
    /// Strict lookup of a parameter name that is not part of the definition.
    #[error("unknown parameter '{0}'")]
    UnknownParameter(String),
    /// Strict lookup of a group name that is not part of the definition.
    #[error("unknown parameter group '{0}'")]
    UnknownGroup(String),
    /// Strict lookup of a component name that is not registered.
    #[error("unknown component '{0}'")]
    UnknownComponent(String),
    /// The API facade was used before a panel was rendered.
    #[error("prompt panel not found")]
    PanelNotFound,
    /// The parameter definition could not be parsed.
    #[error("invalid parameter definition: {0}")]
    InvalidDefinition(String),
    /// Requesting a new parameter definition failed.
    #[error("failed to fetch parameter definition: {0}")]
    Fetch(String),
}

/// Why a [`View`](crate::view::View) failed to render.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    /// The model did not validate; rendering was never attempted.
    #[error("visualization is invalid: {}", .0.join("; "))]
    Invalid(Vec<String>),
    /// Rendering started and failed, synchronously or asynchronously.
    #[error("render failed: {0}")]
    Failed(String),
    /// The view was unusable, e.g. disposed.
    #[error(transparent)]
    Argument(#[from] PromptError),
}

/// Whether a by-name lookup that misses is an error.
///
/// `Strict` is the default: a miss surfaces as an invalid-argument error.
/// `Lenient` turns a miss into `Ok(None)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Lookup {
    #[default]
    Strict,
    Lenient,
}

impl Lookup {
    /// Resolve a lookup result under this policy.
    ///
    /// `miss` builds the error for strict mode and is only called on a miss.
    pub fn resolve<T>(
        self,
        found: Option<T>,
        miss: impl FnOnce() -> PromptError,
    ) -> Result<Option<T>, PromptError> {
        match (found, self) {
            (Some(v), _) => Ok(Some(v)),
            (None, Lookup::Lenient) => Ok(None),
            (None, Lookup::Strict) => Err(miss()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_lookup_miss_is_an_error() {
        let found: Option<&str> = None;
        let err = Lookup::Strict
            .resolve(found, || PromptError::UnknownParameter("p9".into()))
            .unwrap_err();
        assert_eq!(err, PromptError::UnknownParameter("p9".into()));
        assert_eq!(err.to_string(), "unknown parameter 'p9'");
    }

    #[test]
    fn lenient_lookup_miss_is_none() {
        let found: Option<&str> = None;
        let res = Lookup::Lenient.resolve(found, || PromptError::PanelNotFound);
        assert_eq!(res, Ok(None));
    }

    #[test]
    fn hits_are_returned_under_both_policies() {
        assert_eq!(
            Lookup::Strict.resolve(Some(3), || PromptError::PanelNotFound),
            Ok(Some(3))
        );
        assert_eq!(
            Lookup::Lenient.resolve(Some(3), || PromptError::PanelNotFound),
            Ok(Some(3))
        );
    }

    #[test]
    fn render_error_messages() {
        let err = RenderError::Invalid(vec!["measures is required".into(), "x".into()]);
        assert_eq!(
            err.to_string(),
            "visualization is invalid: measures is required; x"
        );
        assert_eq!(
            RenderError::Failed("boom".into()).to_string(),
            "render failed: boom"
        );
    }
}
