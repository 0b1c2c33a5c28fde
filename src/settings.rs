//! Ordered setting maps with append semantics.
//!
//! Settings accumulate contributions from several places (explicit tool
//! settings, include directories, defines, generated output names). A list
//! contribution extends an existing list; anything else that meets an
//! existing non-empty value is a conflict unless the caller only wanted to
//! fill an unset slot.

use indexmap::IndexMap;
use thiserror::Error;

use crate::error::SchemaError;
use crate::model::{QualifiedTarget, SettingValue};

/// How a contribution treats an existing value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePolicy {
    /// Extend an existing list; conflict on anything else.
    Append,
    /// Leave an existing non-empty value untouched.
    OnlyIfUnset,
}

/// A contribution could not be merged with the stored value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot append {appended} to {setting}; previous value was {previous}")]
pub struct MergeError {
    /// Setting name.
    pub setting: String,
    /// Stored value.
    pub previous: SettingValue,
    /// Rejected contribution.
    pub appended: SettingValue,
}

impl MergeError {
    /// Attach the owning target, configuration and tool.
    #[must_use]
    pub fn in_context(self, target: &QualifiedTarget, configuration: &str, tool: &str) -> SchemaError {
        SchemaError::SettingConflict {
            target: target.clone(),
            configuration: configuration.to_owned(),
            tool: tool.to_owned(),
            setting: self.setting,
            previous: self.previous,
            appended: self.appended,
        }
    }
}

/// Setting name to value, in first-contribution order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings(IndexMap<String, SettingValue>);

impl Settings {
    /// Empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge `value` into `name`.
    ///
    /// Empty contributions are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`MergeError`] when `value` meets an existing non-empty value
    /// under [`MergePolicy::Append`] and they are not both lists.
    pub fn append(
        &mut self,
        name: &str,
        value: SettingValue,
        policy: MergePolicy,
    ) -> Result<(), MergeError> {
        if value.is_empty() {
            return Ok(());
        }
        let Some(existing) = self.0.get_mut(name).filter(|v| !v.is_empty()) else {
            self.0.insert(name.to_owned(), value);
            return Ok(());
        };
        if policy == MergePolicy::OnlyIfUnset {
            return Ok(());
        }
        match (existing, value) {
            (SettingValue::List(items), SettingValue::List(more)) => {
                items.extend(more);
                Ok(())
            }
            (previous, appended) => Err(MergeError {
                setting: name.to_owned(),
                previous: previous.clone(),
                appended,
            }),
        }
    }

    /// Append each item to a list setting, creating it when absent.
    ///
    /// # Errors
    ///
    /// Returns [`MergeError`] when the setting already holds a scalar.
    pub fn append_items<I, S>(&mut self, name: &str, items: I) -> Result<(), MergeError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.append(name, SettingValue::list(items), MergePolicy::Append)
    }

    /// Overwrite `name` unconditionally.
    pub fn set(&mut self, name: &str, value: SettingValue) {
        self.0.insert(name.to_owned(), value);
    }

    /// Stored value for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&SettingValue> {
        self.0.get(name)
    }

    /// Whether nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Entries sorted by name, as emitted into project files.
    #[must_use]
    pub fn sorted(&self) -> Vec<(&str, &SettingValue)> {
        let mut entries: Vec<_> = self.0.iter().map(|(k, v)| (k.as_str(), v)).collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }

    /// Overwrite every entry of `other` into `self`.
    pub fn overlay(&mut self, other: &Self) {
        for (name, value) in &other.0 {
            self.set(name, value.clone());
        }
    }
}
