//! Result items: the entries a launcher renders for one query.
//!
//! A [`ResultItem`] is validated when it is built: the title is never empty and
//! `arg` is always a string, defaulting to the title.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::path::Path;

const SYSTEM_ICONS: &str = "/System/Library/CoreServices/CoreTypes.bundle/Contents/Resources";

/// How the launcher interprets [`Icon::path`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IconKind {
    /// Use the icon of the file at `path`.
    FileIcon,
    /// `path` is a uniform type identifier; use the icon for that type.
    FileType,
}

/// Icon reference for a result item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Icon {
    pub path: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<IconKind>,
}

impl Icon {
    /// An image file to show as-is.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: None,
        }
    }

    /// An image file given as a filesystem path.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        Self::new(path.to_string_lossy().into_owned())
    }

    /// The icon the launcher shows for the file at `path`.
    pub fn file_icon(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: Some(IconKind::FileIcon),
        }
    }

    /// The icon the launcher shows for a uniform type identifier.
    pub fn file_type(uti: impl Into<String>) -> Self {
        Self {
            path: uti.into(),
            kind: Some(IconKind::FileType),
        }
    }
}

/// System icons used by the runtime's own items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinIcon {
    Error,
    Warning,
    Info,
    Download,
}

impl BuiltinIcon {
    #[must_use]
    pub fn file_name(self) -> &'static str {
        match self {
            Self::Error => "AlertStopIcon.icns",
            Self::Warning => "AlertCautionIcon.icns",
            Self::Info => "ToolbarInfo.icns",
            Self::Download => "SidebarDownloadsFolder.icns",
        }
    }

    #[must_use]
    pub fn icon(self) -> Icon {
        Icon::new(format!("{SYSTEM_ICONS}/{}", self.file_name()))
    }
}

impl From<BuiltinIcon> for Icon {
    fn from(builtin: BuiltinIcon) -> Self {
        builtin.icon()
    }
}

/// One selectable entry.
///
/// Field order is the order keys appear in the serialized document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawResultItem")]
pub struct ResultItem {
    title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    subtitle: Option<String>,
    arg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    uid: Option<String>,
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    autocomplete: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    icon: Option<Icon>,
}

/// Unvalidated wire form, checked by `TryFrom` on the way in.
#[derive(Deserialize)]
struct RawResultItem {
    title: String,
    #[serde(default)]
    subtitle: Option<String>,
    #[serde(default)]
    arg: Option<String>,
    #[serde(default)]
    uid: Option<String>,
    #[serde(default = "default_valid")]
    valid: bool,
    #[serde(default)]
    autocomplete: Option<String>,
    #[serde(default)]
    icon: Option<Icon>,
}

fn default_valid() -> bool {
    true
}

impl TryFrom<RawResultItem> for ResultItem {
    type Error = Error;

    fn try_from(raw: RawResultItem) -> Result<Self, Self::Error> {
        let mut item = Self::new(raw.title)?;
        if let Some(arg) = raw.arg {
            item.arg = arg;
        }
        item.subtitle = raw.subtitle;
        item.uid = raw.uid;
        item.valid = raw.valid;
        item.autocomplete = raw.autocomplete;
        item.icon = raw.icon;
        Ok(item)
    }
}

impl ResultItem {
    /// Create an item. `arg` starts out equal to `title`.
    ///
    /// # Errors
    /// Returns [`Error::EmptyTitle`] if the title is empty or only whitespace.
    pub fn new(title: impl Into<String>) -> Result<Self, Error> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(Error::EmptyTitle);
        }
        Ok(Self {
            arg: title.clone(),
            title,
            subtitle: None,
            uid: None,
            valid: true,
            autocomplete: None,
            icon: None,
        })
    }

    /// Set the value passed downstream when the item is chosen.
    #[must_use]
    pub fn with_arg(mut self, arg: impl ToString) -> Self {
        self.arg = arg.to_string();
        self
    }

    #[must_use]
    pub fn with_subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = Some(subtitle.into());
        self
    }

    /// Stable identity the launcher uses to learn ordering across invocations.
    #[must_use]
    pub fn with_uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = Some(uid.into());
        self
    }

    /// Mark the item actionable or not.
    #[must_use]
    pub fn with_valid(mut self, valid: bool) -> Self {
        self.valid = valid;
        self
    }

    /// Text the launcher puts in its query field when the item is tab-completed.
    #[must_use]
    pub fn with_autocomplete(mut self, autocomplete: impl Into<String>) -> Self {
        self.autocomplete = Some(autocomplete.into());
        self
    }

    #[must_use]
    pub fn with_icon(mut self, icon: impl Into<Icon>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn subtitle(&self) -> Option<&str> {
        self.subtitle.as_deref()
    }

    #[must_use]
    pub fn arg(&self) -> &str {
        &self.arg
    }

    #[must_use]
    pub fn uid(&self) -> Option<&str> {
        self.uid.as_deref()
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    #[must_use]
    pub fn autocomplete(&self) -> Option<&str> {
        self.autocomplete.as_deref()
    }

    #[must_use]
    pub fn icon(&self) -> Option<&Icon> {
        self.icon.as_ref()
    }
}
