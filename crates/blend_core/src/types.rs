//! Type definitions for `blend_core`.
//!
//! Components, basis selection, calculation outcomes, and the session
//! command/event vocabulary.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Type aliases
// ---------------------------------------------------------------------------

/// Per-component mass breakdown, one line per component in input order.
pub type BlendResult = Vec<MassLine>;

// ---------------------------------------------------------------------------
// Components
// ---------------------------------------------------------------------------

/// Ratio assigned to a freshly added component.
pub const DEFAULT_RATIO: f64 = 1.0;

/// One named ingredient with a relative weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    /// Free-form label. Not required to be unique or non-empty.
    pub name: String,
    /// Non-negative relative weight.
    pub ratio: f64,
}

impl Component {
    pub fn new(name: impl Into<String>, ratio: f64) -> Self {
        Self {
            name: name.into(),
            ratio,
        }
    }
}

// ---------------------------------------------------------------------------
// Basis
// ---------------------------------------------------------------------------

/// Reference quantity the target mass is matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Basis {
    /// Scale so the component at this index reaches the target mass.
    ByComponent(usize),
    /// Scale so the masses sum to the target mass.
    ByTotal,
}

/// Basis selector as held by a session; the component index lives separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BasisMode {
    #[default]
    Component,
    Total,
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MassLine {
    pub name: String,
    /// Grams, rounded to two decimal places.
    pub mass: f64,
}

/// Why a calculation produced nothing. Prior results stay in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum NoOp {
    InvalidTargetMass,
    NonPositiveTargetMass,
    EmptyComponentSet,
    NegativeRatio { index: usize },
    ZeroTotalRatio,
    BasisOutOfRange { index: usize, len: usize },
    ZeroBasisRatio { index: usize },
    NonFiniteMass,
}

impl std::fmt::Display for NoOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NoOp::InvalidTargetMass => f.write_str("target mass is not a number"),
            NoOp::NonPositiveTargetMass => f.write_str("target mass must be greater than zero"),
            NoOp::EmptyComponentSet => f.write_str("blend has no components"),
            NoOp::NegativeRatio { index } => {
                write!(f, "component {index} has a negative ratio")
            }
            NoOp::ZeroTotalRatio => f.write_str("total ratio is zero"),
            NoOp::BasisOutOfRange { index, len } => {
                write!(f, "basis component {index} is out of range (len {len})")
            }
            NoOp::ZeroBasisRatio { index } => {
                write!(f, "basis component {index} has a zero ratio")
            }
            NoOp::NonFiniteMass => f.write_str("computed masses are not finite"),
        }
    }
}

impl std::error::Error for NoOp {}

// ---------------------------------------------------------------------------
// Edit errors
// ---------------------------------------------------------------------------

/// Why a ratio value was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatioError {
    Unparsable,
    NonFinite,
    Negative,
}

impl std::fmt::Display for RatioError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            RatioError::Unparsable => "ratio is not a number",
            RatioError::NonFinite => "ratio is not finite",
            RatioError::Negative => "ratio is negative",
        })
    }
}

impl std::error::Error for RatioError {}

/// Outcome of a permissive (text) ratio edit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RatioEdit {
    Applied { ratio: f64 },
    /// Input was rejected and the component now weighs zero.
    CoercedToZero { reason: RatioError },
}

impl RatioEdit {
    pub fn ratio(&self) -> f64 {
        match self {
            RatioEdit::Applied { ratio } => *ratio,
            RatioEdit::CoercedToZero { .. } => 0.0,
        }
    }

    pub fn is_coerced(&self) -> bool {
        matches!(self, RatioEdit::CoercedToZero { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "error", rename_all = "snake_case")]
pub enum EditError {
    IndexOutOfRange { index: usize, len: usize },
    InvalidRatio { reason: RatioError },
}

impl std::fmt::Display for EditError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EditError::IndexOutOfRange { index, len } => {
                write!(f, "component index {index} is out of range (len {len})")
            }
            EditError::InvalidRatio { reason } => write!(f, "invalid ratio: {reason}"),
        }
    }
}

impl std::error::Error for EditError {}

impl From<RatioError> for EditError {
    fn from(reason: RatioError) -> Self {
        EditError::InvalidRatio { reason }
    }
}

// ---------------------------------------------------------------------------
// Session commands and events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionCommand {
    AddComponent,
    RemoveComponent { index: usize },
    RenameComponent { index: usize, name: String },
    /// Raw text as typed; invalid input is coerced to zero.
    SetRatio { index: usize, value: String },
    SelectBasisMode { mode: BasisMode },
    SelectBasisComponent { index: usize },
    /// Raw text as typed; parsed only on `Calculate`.
    SetTargetMass { value: String },
    Calculate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    ComponentAdded {
        index: usize,
        name: String,
    },
    ComponentRemoved {
        index: usize,
        component: Component,
        /// Set when the selected basis index was reset to 0.
        basis_reset: bool,
    },
    ComponentRenamed {
        index: usize,
        name: String,
    },
    RatioChanged {
        index: usize,
        edit: RatioEdit,
    },
    BasisModeChanged {
        mode: BasisMode,
    },
    BasisComponentSelected {
        index: usize,
    },
    TargetMassChanged {
        value: String,
    },
    Calculated {
        results: BlendResult,
    },
    CalculationSkipped {
        reason: NoOp,
    },
    /// The command referenced something that does not exist; nothing changed.
    CommandIgnored {
        error: EditError,
    },
}
