use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::index::OrphanPolicy;
use crate::projection::SortPolicy;

/// Default interval between caption status checks.
pub const DEFAULT_CAPTION_POLL_MS: u64 = 300;

/// Host attribute names backing each tree role.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AttributeNames {
    pub node_id: String,
    pub parent_id: String,
    pub caption: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub is_folder: Option<String>,
}

impl AttributeNames {
    pub fn new(
        node_id: impl Into<String>,
        parent_id: impl Into<String>,
        caption: impl Into<String>,
    ) -> Self {
        Self {
            node_id: node_id.into(),
            parent_id: parent_id.into(),
            caption: caption.into(),
            is_folder: None,
        }
    }

    #[must_use]
    pub fn with_folder_flag(mut self, name: impl Into<String>) -> Self {
        self.is_folder = Some(name.into());
        self
    }

    /// Checks that every required name is present.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("node id", &self.node_id),
            ("parent id", &self.parent_id),
            ("caption", &self.caption),
        ];
        for (role, name) in required {
            if name.trim().is_empty() {
                return Err(ConfigError::EmptyAttributeName { role });
            }
        }
        if self
            .is_folder
            .as_deref()
            .is_some_and(|name| name.trim().is_empty())
        {
            return Err(ConfigError::EmptyAttributeName { role: "folder flag" });
        }
        Ok(())
    }
}

/// Configuration surface of a record tree view.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeViewConfig {
    pub attributes: AttributeNames,
    /// Shows the search / expand-all / collapse-all controls row.
    pub show_controls: bool,
    /// Expands every folder after each refresh.
    pub open_expanded: bool,
    pub sort: SortPolicy,
    pub orphans: OrphanPolicy,
    pub caption_poll_ms: u64,
    /// Reduces rows to matching paths while a search is open.
    pub filter_on_search: bool,
}

impl Default for TreeViewConfig {
    fn default() -> Self {
        Self {
            attributes: AttributeNames::default(),
            show_controls: true,
            open_expanded: false,
            sort: SortPolicy::FoldersFirst,
            orphans: OrphanPolicy::Drop,
            caption_poll_ms: DEFAULT_CAPTION_POLL_MS,
            filter_on_search: false,
        }
    }
}

impl TreeViewConfig {
    pub fn new(attributes: AttributeNames) -> Self {
        Self {
            attributes,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn show_controls(mut self, show: bool) -> Self {
        self.show_controls = show;
        self
    }

    #[must_use]
    pub fn open_expanded(mut self, expand: bool) -> Self {
        self.open_expanded = expand;
        self
    }

    #[must_use]
    pub fn sort(mut self, policy: SortPolicy) -> Self {
        self.sort = policy;
        self
    }

    #[must_use]
    pub fn orphans(mut self, policy: OrphanPolicy) -> Self {
        self.orphans = policy;
        self
    }

    #[must_use]
    pub fn caption_poll_ms(mut self, millis: u64) -> Self {
        self.caption_poll_ms = millis;
        self
    }

    #[must_use]
    pub fn filter_on_search(mut self, enabled: bool) -> Self {
        self.filter_on_search = enabled;
        self
    }

    pub const fn caption_poll_interval(&self) -> Duration {
        Duration::from_millis(self.caption_poll_ms)
    }

    pub fn validate(&self) -> Result<()> {
        self.attributes.validate()?;
        if self.caption_poll_ms == 0 {
            return Err(ConfigError::ZeroPollInterval);
        }
        Ok(())
    }
}
