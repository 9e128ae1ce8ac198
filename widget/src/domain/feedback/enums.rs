//! Feedback classification enums and their parsers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Parse error shared by the feedback enums.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFeedbackEnumError {
    /// Enum being parsed, e.g. `feedback type`.
    pub kind: &'static str,
    /// Rejected input.
    pub input: String,
}

impl fmt::Display for ParseFeedbackEnumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: {}", self.kind, self.input)
    }
}

impl std::error::Error for ParseFeedbackEnumError {}

macro_rules! feedback_enum {
    (
        $(#[$outer:meta])*
        $name:ident ($kind:literal) {
            $( $(#[$variant_meta:meta])* $variant:ident => $wire:literal, $label:literal ),+ $(,)?
        }
    ) => {
        $(#[$outer])*
        #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $( $(#[$variant_meta])* $variant, )+
        }

        impl $name {
            /// Every variant in display order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Stored column value.
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $( Self::$variant => $wire, )+
                }
            }

            /// Human-readable label.
            pub const fn label(&self) -> &'static str {
                match self {
                    $( Self::$variant => $label, )+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseFeedbackEnumError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value {
                    $( $wire => Ok(Self::$variant), )+
                    _ => Err(ParseFeedbackEnumError {
                        kind: $kind,
                        input: value.to_owned(),
                    }),
                }
            }
        }
    };
}

feedback_enum! {
    /// What kind of feedback the user is sending.
    FeedbackType ("feedback type") {
        /// Something is broken.
        #[default]
        BugReport => "bug_report", "Bug report",
        /// A suggestion for new behaviour.
        FeatureRequest => "feature_request", "Suggestion",
        /// General satisfaction comment.
        Satisfaction => "satisfaction", "Satisfaction",
        /// Anything else.
        Other => "other", "Other",
    }
}

feedback_enum! {
    /// How badly a bug affects the user. Only bug reports carry one.
    FeedbackSeverity ("feedback severity") {
        /// Cosmetic.
        #[default]
        Low => "low", "Low",
        /// Annoying but workable.
        Medium => "medium", "Medium",
        /// Blocks a task.
        High => "high", "High",
        /// Blocks the product.
        Critical => "critical", "Critical",
    }
}

feedback_enum! {
    /// Triage state set by administrators.
    FeedbackStatus ("feedback status") {
        /// Freshly submitted.
        #[default]
        New => "new", "New",
        /// Seen by the team.
        Acknowledged => "acknowledged", "Acknowledged",
        /// Being assessed.
        InReview => "in_review", "In review",
        /// Work has started.
        InProgress => "in_progress", "In progress",
        /// Fixed or answered.
        Resolved => "resolved", "Resolved",
        /// Closed without a fix.
        WontFix => "wont_fix", "Won't fix",
        /// Same as an earlier report.
        Duplicate => "duplicate", "Duplicate",
    }
}
