//! Transition orchestration
//!
//! This module computes the geometry of the three linked panels and the
//! ordered steps that morph one into the next:
//! - Overview: every interval as a segment of one stacked bar on the time axis
//! - Decomposed: the same segments dropped into one lane per display rank
//! - Proportional: one block per stage, sized by its share of the night
//!
//! Every panel carries exactly one geometry per interval, in interval order,
//! so a renderer can key its marks by interval index and tween between panels.
//! Nothing is drawn here.

use crate::config::{PanelBudget, PanelBudgets, StageTables, TransitionTiming};
use crate::error::ComputeError;
use crate::scale::{LaneScale, TimeDomain, TimeScale};
use crate::types::{FirstOccurrenceIndex, Rect, StageInterval, StageTotals};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// The three panels of the chart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PanelKind {
    Overview,
    Decomposed,
    Proportional,
}

/// Target geometry of one interval in one panel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentGeometry {
    /// Index into the interval list
    pub interval: usize,
    pub display_rank: usize,
    pub rect: Rect,
}

/// All interval geometries of one panel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelGeometry {
    pub kind: PanelKind,
    pub budget: PanelBudget,
    pub segments: Vec<SegmentGeometry>,
}

/// A stage block of the proportional panel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageBlock {
    pub display_rank: usize,
    pub stage_label: String,
    /// Fraction of the night (0-1)
    pub fraction: f64,
    pub rect: Rect,
    /// First interval of this stage, the block's animation anchor
    pub anchor: Option<usize>,
    /// Anchor geometry in the decomposed panel, where the block grows from
    pub source: Option<Rect>,
}

/// One interpolation step between two panels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionStep {
    pub from: PanelKind,
    pub to: PanelKind,
    pub delay_ms: u64,
    pub duration_ms: u64,
}

/// Synchronized layout of the panels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionPlan {
    pub time_domain: TimeDomain,
    pub overview: PanelGeometry,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decomposed: Option<PanelGeometry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proportional: Option<PanelGeometry>,
    pub blocks: Vec<StageBlock>,
    pub steps: Vec<TransitionStep>,
}

impl TransitionPlan {
    /// Panels present in the plan, in hand-off order
    pub fn panels(&self) -> Vec<&PanelGeometry> {
        std::iter::once(&self.overview)
            .chain(self.decomposed.as_ref())
            .chain(self.proportional.as_ref())
            .collect()
    }
}

/// Orchestrator for the panel hand-off
pub struct TransitionOrchestrator<'a> {
    tables: &'a StageTables,
    budgets: PanelBudgets,
    timing: TransitionTiming,
}

impl<'a> TransitionOrchestrator<'a> {
    pub fn new(tables: &'a StageTables, budgets: PanelBudgets, timing: TransitionTiming) -> Self {
        Self {
            tables,
            budgets,
            timing,
        }
    }

    /// Compute the layout of every panel and the steps connecting them
    pub fn plan(
        &self,
        intervals: &[StageInterval],
        totals: &StageTotals,
        index: &FirstOccurrenceIndex,
    ) -> Result<TransitionPlan, ComputeError> {
        let time_domain = TimeDomain::from_intervals(intervals).ok_or(ComputeError::EmptyInput)?;
        self.check_consistency(intervals, totals, index)?;

        if time_domain.span_millis() <= 0 {
            warn!("night spans zero time; all segments collapse to x = 0");
        }

        let overview_budget = self.budgets.overview;
        let overview_scale = TimeScale::new(time_domain, overview_budget.width);
        let overview = PanelGeometry {
            kind: PanelKind::Overview,
            budget: overview_budget,
            segments: intervals
                .iter()
                .enumerate()
                .map(|(i, interval)| {
                    let (x, width) = horizontal_extent(&overview_scale, interval);
                    SegmentGeometry {
                        interval: i,
                        display_rank: interval.display_rank,
                        rect: Rect {
                            x,
                            y: 0.0,
                            width,
                            height: overview_budget.height,
                        },
                    }
                })
                .collect(),
        };

        if !self.budgets.use_transitions {
            debug!(intervals = intervals.len(), "planned overview panel only");
            return Ok(TransitionPlan {
                time_domain,
                overview,
                decomposed: None,
                proportional: None,
                blocks: Vec::new(),
                steps: Vec::new(),
            });
        }

        let decomposed = self.decomposed_panel(intervals, time_domain);
        let blocks = self.stage_blocks(totals, index, &decomposed);
        let proportional = self.proportional_panel(intervals, &blocks);

        let steps = vec![
            TransitionStep {
                from: PanelKind::Overview,
                to: PanelKind::Decomposed,
                delay_ms: 0,
                duration_ms: self.timing.split_ms,
            },
            TransitionStep {
                from: PanelKind::Decomposed,
                to: PanelKind::Proportional,
                delay_ms: self.timing.split_ms,
                duration_ms: self.timing.merge_ms,
            },
        ];

        debug!(
            intervals = intervals.len(),
            blocks = blocks.len(),
            "planned three-panel transition"
        );

        Ok(TransitionPlan {
            time_domain,
            overview,
            decomposed: Some(decomposed),
            proportional: Some(proportional),
            blocks,
            steps,
        })
    }

    /// Reject inputs whose totals, index and intervals disagree
    fn check_consistency(
        &self,
        intervals: &[StageInterval],
        totals: &StageTotals,
        index: &FirstOccurrenceIndex,
    ) -> Result<(), ComputeError> {
        let stage_count = self.tables.stage_count();
        if totals.len() != stage_count || index.len() != stage_count {
            return Err(ComputeError::InconsistentStageData {
                stage: "all stages".to_string(),
                reason: format!(
                    "{} stages configured but {} totals and {} index entries",
                    stage_count,
                    totals.len(),
                    index.len()
                ),
            });
        }

        if let Some(stray) = intervals.iter().find(|i| i.display_rank >= stage_count) {
            return Err(ComputeError::InconsistentStageData {
                stage: stray.stage_label.clone(),
                reason: format!("display rank {} out of range", stray.display_rank),
            });
        }

        for rank in 0..stage_count {
            let stage = self.tables.label_at_rank(rank).unwrap_or("?").to_string();
            match index.get(rank) {
                None if totals.fraction(rank) != 0.0 => {
                    return Err(ComputeError::InconsistentStageData {
                        stage,
                        reason: format!(
                            "{:.4} of the night but no interval",
                            totals.fraction(rank)
                        ),
                    });
                }
                Some(anchor) if intervals.get(anchor).map(|i| i.display_rank) != Some(rank) => {
                    return Err(ComputeError::InconsistentStageData {
                        stage,
                        reason: format!(
                            "first occurrence {} is not an interval of this stage",
                            anchor
                        ),
                    });
                }
                Some(_) if totals.fraction(rank) == 0.0 => {
                    return Err(ComputeError::InconsistentStageData {
                        stage,
                        reason: "interval present but zero share of the night".to_string(),
                    });
                }
                _ => {}
            }
        }

        Ok(())
    }

    fn decomposed_panel(&self, intervals: &[StageInterval], domain: TimeDomain) -> PanelGeometry {
        let budget = self.budgets.decomposed;
        let scale = TimeScale::new(domain, budget.width);
        let lanes = LaneScale::new(budget.height, self.tables.stage_count());

        PanelGeometry {
            kind: PanelKind::Decomposed,
            budget,
            segments: intervals
                .iter()
                .enumerate()
                .map(|(i, interval)| {
                    let (x, width) = horizontal_extent(&scale, interval);
                    SegmentGeometry {
                        interval: i,
                        display_rank: interval.display_rank,
                        rect: Rect {
                            x,
                            y: lanes.top(interval.display_rank),
                            width,
                            height: lanes.height(interval.display_rank),
                        },
                    }
                })
                .collect(),
        }
    }

    /// Blocks left to right in display order, widths proportional to totals
    fn stage_blocks(
        &self,
        totals: &StageTotals,
        index: &FirstOccurrenceIndex,
        decomposed: &PanelGeometry,
    ) -> Vec<StageBlock> {
        let budget = self.budgets.proportional;

        (0..self.tables.stage_count())
            .scan(0.0, |offset, rank| {
                let fraction = totals.fraction(rank);
                let x = *offset * budget.width;
                *offset += fraction;

                let anchor = index.get(rank);
                Some(StageBlock {
                    display_rank: rank,
                    stage_label: self.tables.label_at_rank(rank).unwrap_or_default().to_string(),
                    fraction,
                    rect: Rect {
                        x,
                        y: 0.0,
                        width: fraction * budget.width,
                        height: budget.height,
                    },
                    anchor,
                    source: anchor
                        .and_then(|i| decomposed.segments.get(i))
                        .map(|segment| segment.rect),
                })
            })
            .collect()
    }

    /// Interval targets in the proportional panel
    ///
    /// The anchor interval of a stage becomes its block; later intervals of the
    /// same stage collapse into the block's left edge.
    fn proportional_panel(&self, intervals: &[StageInterval], blocks: &[StageBlock]) -> PanelGeometry {
        PanelGeometry {
            kind: PanelKind::Proportional,
            budget: self.budgets.proportional,
            segments: intervals
                .iter()
                .enumerate()
                .map(|(i, interval)| {
                    let block = &blocks[interval.display_rank];
                    let rect = if block.anchor == Some(i) {
                        block.rect
                    } else {
                        Rect {
                            width: 0.0,
                            ..block.rect
                        }
                    };
                    SegmentGeometry {
                        interval: i,
                        display_rank: interval.display_rank,
                        rect,
                    }
                })
                .collect(),
        }
    }
}

fn horizontal_extent(scale: &TimeScale, interval: &StageInterval) -> (f64, f64) {
    let x0 = scale.map(interval.start_instant);
    let x1 = scale.map(interval.end_instant);
    (x0, x1 - x0)
}
