//! Shared domain enumerations.

use serde::{Deserialize, Serialize};

/// Alternate rendering of the same revision's artifacts.
///
/// Each variant owns a separate cache instance, so a styled artifact set can
/// never be served for a plain request or vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderVariant {
    Default,
    Styled,
}

impl RenderVariant {
    pub const ALL: [RenderVariant; 2] = [RenderVariant::Default, RenderVariant::Styled];

    pub fn as_str(self) -> &'static str {
        match self {
            RenderVariant::Default => "default",
            RenderVariant::Styled => "styled",
        }
    }

    /// Select the variant from the `styled` query flag; any non-empty value opts in.
    pub fn from_flag(flag: Option<&str>) -> Self {
        match flag {
            Some(value) if !value.is_empty() => RenderVariant::Styled,
            _ => RenderVariant::Default,
        }
    }
}
