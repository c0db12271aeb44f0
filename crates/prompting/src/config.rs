//! Configuration for a [`PromptPanel`](crate::panel::PromptPanel).
//!
//! ```ignore
//! let config = PanelConfig::default()
//!     .with_guid("report1")
//!     .with_auto_submit(Some(false))
//!     .with_locale("de");
//! ```

use uuid::Uuid;

use crate::parameters::format::FormattingContext;

/// Per-panel settings. Everything has a working default.
#[derive(Debug, Clone)]
pub struct PanelConfig {
    /// Fixed panel GUID. Default: a random uuid v4 in simple form.
    pub guid: Option<String>,
    /// Overrides the definition's `allow_auto_submit()` when set.
    pub auto_submit: Option<bool>,
    /// Keep removed components in a garbage list instead of clearing them
    /// immediately. Default: `false`.
    pub postpone_clear: bool,
    /// Locale for number parsing. Default: `"en"`.
    pub locale: String,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            guid: None,
            auto_submit: None,
            postpone_clear: false,
            locale: "en".into(),
        }
    }
}

impl PanelConfig {
    pub fn with_guid(mut self, guid: impl Into<String>) -> Self {
        self.guid = Some(guid.into());
        self
    }

    pub fn with_auto_submit(mut self, auto_submit: Option<bool>) -> Self {
        self.auto_submit = auto_submit;
        self
    }

    pub fn with_postpone_clear(mut self, postpone_clear: bool) -> Self {
        self.postpone_clear = postpone_clear;
        self
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    /// The configured GUID, or a fresh random one.
    pub fn resolve_guid(&self) -> String {
        match &self.guid {
            Some(guid) if !guid.is_empty() => guid.clone(),
            _ => Uuid::new_v4().simple().to_string(),
        }
    }

    pub fn formatting(&self) -> FormattingContext {
        FormattingContext::for_locale(&self.locale)
    }
}
