//! Sparse field-level updates.
//!
//! Each patchable entity declares a delta struct whose fields are all
//! [`Patch<T>`]. A field missing from the JSON body deserializes to
//! [`Patch::Absent`] (via `#[serde(default)]`), anything else to
//! [`Patch::Present`]. For optional columns `null` becomes `Present(None)`,
//! which clears the value.

use serde::{Deserialize, Deserializer};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Patch<T> {
    #[default]
    Absent,
    Present(T),
}

impl<T> Patch<T> {
    pub fn is_absent(&self) -> bool {
        matches!(self, Patch::Absent)
    }

    pub fn is_present(&self) -> bool {
        matches!(self, Patch::Present(_))
    }

    pub fn as_ref(&self) -> Option<&T> {
        match self {
            Patch::Present(value) => Some(value),
            Patch::Absent => None,
        }
    }
}

impl<T: Clone> Patch<T> {
    /// Overwrite `target` when present, leave it untouched otherwise
    pub fn apply_to(&self, target: &mut T) {
        if let Patch::Present(value) = self {
            *target = value.clone();
        }
    }
}

impl<T> From<T> for Patch<T> {
    fn from(value: T) -> Self {
        Patch::Present(value)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Patch<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        T::deserialize(deserializer).map(Patch::Present)
    }
}
