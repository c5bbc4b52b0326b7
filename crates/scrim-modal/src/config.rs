#![forbid(unsafe_code)]

//! Host-facing modal configuration.
//!
//! [`ModalConfig`] is plain data: the host rebuilds it on every render and
//! hands it to [`Modal::update`](crate::Modal::update). Only a change of
//! `is_open` drives a lifecycle transition; the other fields take effect on
//! the next event or the next open.
//!
//! With the `serde` feature the config (de)serializes with every field
//! optional. The `policy-config` feature adds [`ModalConfig::from_toml_str`]
//! for loading defaults from a policy document.

/// Where focus lands when a modal opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "kebab-case")
)]
pub enum InitialFocus {
    /// The content container itself.
    #[default]
    Content,
    /// The first tabbable element inside the content, falling back to the
    /// container when there is none.
    FirstTabbable,
}

/// Modal configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct ModalConfig {
    /// Desired open state.
    pub is_open: bool,
    /// Let the Escape key request dismissal.
    pub close_on_escape: bool,
    /// Let a genuine backdrop click request dismissal.
    pub close_on_overlay_click: bool,
    /// Move focus into the modal when it opens.
    pub focus_after_render: bool,
    /// Give focus back to the previously focused element on close.
    pub return_focus_after_close: bool,
    pub initial_focus: InitialFocus,
}

impl Default for ModalConfig {
    fn default() -> Self {
        Self {
            is_open: false,
            close_on_escape: true,
            close_on_overlay_click: true,
            focus_after_render: true,
            return_focus_after_close: true,
            initial_focus: InitialFocus::Content,
        }
    }
}

impl ModalConfig {
    #[must_use]
    pub fn open(mut self, open: bool) -> Self {
        self.is_open = open;
        self
    }

    #[must_use]
    pub fn close_on_escape(mut self, close: bool) -> Self {
        self.close_on_escape = close;
        self
    }

    #[must_use]
    pub fn close_on_overlay_click(mut self, close: bool) -> Self {
        self.close_on_overlay_click = close;
        self
    }

    #[must_use]
    pub fn focus_after_render(mut self, focus: bool) -> Self {
        self.focus_after_render = focus;
        self
    }

    #[must_use]
    pub fn return_focus_after_close(mut self, restore: bool) -> Self {
        self.return_focus_after_close = restore;
        self
    }

    #[must_use]
    pub fn initial_focus(mut self, initial: InitialFocus) -> Self {
        self.initial_focus = initial;
        self
    }

    /// Trap options derived from this config.
    pub(crate) fn trap_options(&self) -> crate::focus_trap::TrapOptions {
        crate::focus_trap::TrapOptions {
            move_focus: self.focus_after_render,
            return_focus: self.return_focus_after_close,
            initial: self.initial_focus,
        }
    }

    /// Parse a config from a TOML policy document.
    ///
    /// Keys mirror the field names; missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the document is not valid TOML or
    /// a value has the wrong type.
    #[cfg(feature = "policy-config")]
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        toml::from_str(source).map_err(|err| ConfigError::Parse(err.to_string()))
    }
}

/// Errors from loading a [`ModalConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The policy document could not be parsed.
    Parse(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(msg) => write!(f, "invalid modal policy: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}
