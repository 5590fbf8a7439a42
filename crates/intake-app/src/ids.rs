// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! entity_id {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name(i64);

        impl $name {
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }
    };
}

/// String-keyed ids. Field ids are chosen by the form designer, reference ids
/// are whatever a mention token points at (a field id or an external record).
macro_rules! string_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

entity_id!(FormId);
entity_id!(SubmissionId);

string_id!(FieldId);
string_id!(ReferenceId);

impl From<&FieldId> for ReferenceId {
    fn from(value: &FieldId) -> Self {
        Self(value.0.clone())
    }
}

impl From<FieldId> for ReferenceId {
    fn from(value: FieldId) -> Self {
        Self(value.0)
    }
}

impl ReferenceId {
    /// External records carry a `kind:` prefix; bare ids point at form fields.
    pub fn as_field_id(&self) -> Option<FieldId> {
        if self.0.contains(':') {
            None
        } else {
            Some(FieldId(self.0.clone()))
        }
    }
}
