use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("unknown {category} key `{key}`")]
pub struct UnknownLookupKey {
    pub category: &'static str,
    pub key: String,
}

macro_rules! lookup_enum {
    ($(#[$meta:meta])* $name:ident, $category:literal, { $($variant:ident => $key:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub const fn category() -> &'static str {
                $category
            }

            /// Stable domain key used for storage joins and wire payloads.
            pub fn stable_key(&self) -> &'static str {
                match self {
                    $($name::$variant => $key),+
                }
            }

            pub fn from_stable_key(key: &str) -> Result<Self, UnknownLookupKey> {
                match key {
                    $($key => Ok($name::$variant),)+
                    _ => Err(UnknownLookupKey { category: $category, key: key.to_owned() }),
                }
            }
        }
    };
}

lookup_enum!(TicketType, "ticket_type", {
    Incident => "incident",
    Support => "support",
    Maintenance => "maintenance",
    Installation => "installation",
});

lookup_enum!(Severity, "ticket_severity", {
    Low => "low",
    Medium => "medium",
    High => "high",
    Critical => "critical",
});

lookup_enum!(BusinessImpact, "business_impact", {
    Low => "low",
    Medium => "medium",
    High => "high",
    Critical => "critical",
});

lookup_enum!(Priority, "ticket_priority", {
    P1 => "p1",
    P2 => "p2",
    P3 => "p3",
    P4 => "p4",
});

lookup_enum!(
    /// Coarse labor-hour band used for grouping, bounded by a configured hour range.
    EffortLevel, "effort_level", {
    Low => "low",
    Medium => "medium",
    High => "high",
});

lookup_enum!(ConfidenceLevel, "confidence_level", {
    Low => "low",
    Medium => "medium",
    High => "high",
});

lookup_enum!(QuoteCreator, "quote_creator", {
    System => "system",
    Technician => "technician",
    Administrator => "administrator",
});

/// A seeded catalog row. Identity is the `id`; `name` is the stable join key.
/// Rows are soft-deactivated, never hard-deleted, so historical quotes keep
/// resolving their labels.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupEntry {
    pub id: i64,
    pub name: String,
    pub is_active: bool,
}

/// Immutable-at-runtime mapping from lookup categories to their seeded rows.
/// Built once at process start; everything above it treats it as read-only.
#[derive(Clone, Debug, Default)]
pub struct LookupCatalog {
    categories: Vec<(&'static str, Vec<LookupEntry>)>,
}

impl LookupCatalog {
    /// Catalog covering every closed enum above, ids assigned in declaration
    /// order within each category.
    pub fn seeded() -> Self {
        fn rows<'a>(keys: impl Iterator<Item = &'a str>) -> Vec<LookupEntry> {
            keys.enumerate()
                .map(|(index, key)| LookupEntry {
                    id: index as i64 + 1,
                    name: key.to_owned(),
                    is_active: true,
                })
                .collect()
        }

        let categories = vec![
            (TicketType::category(), rows(TicketType::ALL.iter().map(|v| v.stable_key()))),
            (Severity::category(), rows(Severity::ALL.iter().map(|v| v.stable_key()))),
            (BusinessImpact::category(), rows(BusinessImpact::ALL.iter().map(|v| v.stable_key()))),
            (Priority::category(), rows(Priority::ALL.iter().map(|v| v.stable_key()))),
            (EffortLevel::category(), rows(EffortLevel::ALL.iter().map(|v| v.stable_key()))),
            (
                ConfidenceLevel::category(),
                rows(ConfidenceLevel::ALL.iter().map(|v| v.stable_key())),
            ),
            (QuoteCreator::category(), rows(QuoteCreator::ALL.iter().map(|v| v.stable_key()))),
        ];

        Self { categories }
    }

    pub fn entries(&self, category: &str) -> &[LookupEntry] {
        self.categories
            .iter()
            .find(|(name, _)| *name == category)
            .map(|(_, entries)| entries.as_slice())
            .unwrap_or(&[])
    }

    pub fn lookup(&self, category: &str, name: &str) -> Option<&LookupEntry> {
        self.entries(category).iter().find(|entry| entry.name == name && entry.is_active)
    }

    /// Soft-deactivate a row. Returns false when the row does not exist.
    pub fn deactivate(&mut self, category: &str, name: &str) -> bool {
        for (cat, entries) in &mut self.categories {
            if *cat == category {
                for entry in entries {
                    if entry.name == name {
                        entry.is_active = false;
                        return true;
                    }
                }
            }
        }
        false
    }
}
