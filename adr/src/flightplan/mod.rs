// SPDX-License-Identifier: Apache-2.0
// Copyright 2024, 2026 Joe Pearson

//! ICAO flight-plan route resolution and restriction evaluation.
//!
//! [`resolver`] turns a field-15 route string into an ordered list of
//! resolved waypoints; [`evaluator::build_plan`] turns that into a routing
//! graph annotated with airspace membership; [`condition`] matches a
//! restriction's condition tree against that graph; [`evaluator::evaluate`]
//! drives a candidate rule set over it and produces
//! [`evaluator::RestrictionResult`]s.

mod condition;
mod evaluator;
mod resolver;

pub use condition::{evaluate_condition, pre_simplify, prune_alternatives, ConditionMatch, SimplifyContext};
pub use evaluator::{
    build_plan, evaluate, EvaluationMessage, EvaluationSummary, MessageSeverity, Plan, PlanEdge, PlanVertex,
    RestrictionResult,
};
pub use resolver::{fix_invalid_altitudes, resolve, FlightPlanRequest, FlightRules, PathCode, ResolvedRoute, ResolvedWaypoint};
