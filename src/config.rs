//! Configuration
//!
//! Stage tables and layout budgets are plain values passed into every
//! component call. Nothing here is process-wide state.

use crate::error::ComputeError;
use crate::types::Point;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Stage labels in stage-code order (code 0 is "W")
pub const STATES: [&str; 5] = ["W", "N1", "N2", "N3", "REM"];

/// Stage labels in display order (top lane first)
pub const STATES_ORDERED: [&str; 5] = ["W", "REM", "N1", "N2", "N3"];

/// Stage-code table and display-order table
///
/// Both tables hold the same labels; the code table maps raw stage codes to
/// labels and the display table maps labels to their visual rank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StageTableDef", into = "StageTableDef")]
pub struct StageTables {
    states: Vec<String>,
    display_order: Vec<String>,
    /// Display rank for each stage code
    ranks: Vec<usize>,
}

#[derive(Serialize, Deserialize)]
struct StageTableDef {
    states: Vec<String>,
    display_order: Vec<String>,
}

impl Default for StageTables {
    fn default() -> Self {
        Self::standard()
    }
}

impl StageTables {
    /// The five-stage AASM tables: W, N1, N2, N3, REM
    pub fn standard() -> Self {
        Self {
            states: STATES.iter().map(|s| s.to_string()).collect(),
            display_order: STATES_ORDERED.iter().map(|s| s.to_string()).collect(),
            ranks: vec![0, 2, 3, 4, 1],
        }
    }

    /// Build tables from labels, checking that both orders hold the same set
    pub fn new(states: Vec<String>, display_order: Vec<String>) -> Result<Self, ComputeError> {
        if states.is_empty() {
            return Err(ComputeError::InvalidConfig(
                "stage table must not be empty".to_string(),
            ));
        }
        if states.len() != display_order.len() {
            return Err(ComputeError::InvalidConfig(format!(
                "stage table has {} labels but display order has {}",
                states.len(),
                display_order.len()
            )));
        }

        let unique: HashSet<&str> = states.iter().map(String::as_str).collect();
        if unique.len() != states.len() {
            return Err(ComputeError::InvalidConfig(
                "stage table contains duplicate labels".to_string(),
            ));
        }

        let ranks = states
            .iter()
            .map(|label| {
                display_order
                    .iter()
                    .position(|ordered| ordered == label)
                    .ok_or_else(|| {
                        ComputeError::InvalidConfig(format!(
                            "stage {} missing from display order",
                            label
                        ))
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            states,
            display_order,
            ranks,
        })
    }

    /// Number of stages
    pub fn stage_count(&self) -> usize {
        self.states.len()
    }

    /// Label for a stage code
    pub fn label(&self, code: usize) -> Option<&str> {
        self.states.get(code).map(String::as_str)
    }

    /// Display rank for a stage code
    pub fn display_rank(&self, code: usize) -> Option<usize> {
        self.ranks.get(code).copied()
    }

    /// Label shown at a display rank
    pub fn label_at_rank(&self, rank: usize) -> Option<&str> {
        self.display_order.get(rank).map(String::as_str)
    }

    pub fn states(&self) -> &[String] {
        &self.states
    }

    pub fn display_order(&self) -> &[String] {
        &self.display_order
    }
}

impl TryFrom<StageTableDef> for StageTables {
    type Error = ComputeError;

    fn try_from(def: StageTableDef) -> Result<Self, Self::Error> {
        StageTables::new(def.states, def.display_order)
    }
}

impl From<StageTables> for StageTableDef {
    fn from(tables: StageTables) -> Self {
        Self {
            states: tables.states,
            display_order: tables.display_order,
        }
    }
}

/// Outer margins around each panel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Margin {
    pub top: f64,
    pub left: f64,
}

impl Default for Margin {
    fn default() -> Self {
        Self {
            top: 20.0,
            left: 50.0,
        }
    }
}

/// Animation timing for the panel hand-off (milliseconds)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionTiming {
    /// Overview to decomposed lanes
    pub split_ms: u64,
    /// Decomposed lanes to proportional blocks
    pub merge_ms: u64,
}

impl Default for TransitionTiming {
    fn default() -> Self {
        Self {
            split_ms: 1000,
            merge_ms: 1000,
        }
    }
}

/// Pixel budget for one panel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PanelBudget {
    /// Top-left corner of the panel in chart coordinates
    pub origin: Point,
    pub width: f64,
    pub height: f64,
}

/// Budgets for the three linked panels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PanelBudgets {
    pub overview: PanelBudget,
    pub decomposed: PanelBudget,
    pub proportional: PanelBudget,
    /// When false only the overview panel is laid out
    pub use_transitions: bool,
}

/// Layout configuration for one chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Panel width in pixels
    pub width: f64,
    /// Total chart height shared by the panels
    pub height: f64,
    pub margin: Margin,
    pub use_transitions: bool,
    pub timing: TransitionTiming,
    pub stages: StageTables,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            width: 960.0,
            height: 300.0,
            margin: Margin::default(),
            use_transitions: true,
            timing: TransitionTiming::default(),
            stages: StageTables::standard(),
        }
    }
}

impl LayoutConfig {
    /// Load a configuration from JSON; absent fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, ComputeError> {
        let config: LayoutConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ComputeError> {
        if !(self.width.is_finite() && self.width > 0.0) {
            return Err(ComputeError::InvalidConfig(format!(
                "width must be positive, got {}",
                self.width
            )));
        }
        if !(self.height.is_finite() && self.height > 0.0) {
            return Err(ComputeError::InvalidConfig(format!(
                "height must be positive, got {}",
                self.height
            )));
        }
        let margins = [self.margin.top, self.margin.left];
        if margins.iter().any(|m| !m.is_finite() || *m < 0.0) {
            return Err(ComputeError::InvalidConfig(
                "margins must be finite and non-negative".to_string(),
            ));
        }
        if self.bar_height() < 1.0 {
            return Err(ComputeError::InvalidConfig(format!(
                "height {} leaves no room for {} stage lanes",
                self.height,
                self.stages.stage_count()
            )));
        }
        Ok(())
    }

    /// Height of each bar panel
    ///
    /// With transitions the height is shared by one lane per stage, otherwise
    /// the overview bar takes all of it.
    pub fn bar_height(&self) -> f64 {
        if self.use_transitions {
            (self.height / self.stages.stage_count() as f64).round()
        } else {
            self.height.round()
        }
    }

    /// Panel budgets stacked top to bottom, each offset by one margin
    pub fn panel_budgets(&self) -> PanelBudgets {
        let bar_height = self.bar_height();
        let budget = |k: usize| {
            let k = k as f64;
            PanelBudget {
                origin: Point {
                    x: self.margin.left,
                    y: (k + 1.0) * self.margin.top + k * bar_height,
                },
                width: self.width,
                height: bar_height,
            }
        };

        PanelBudgets {
            overview: budget(0),
            decomposed: budget(1),
            proportional: budget(2),
            use_transitions: self.use_transitions,
        }
    }
}
