//! Fitting league models and running the derived rating analyses
//!
//! This crate sits on top of `vpp-engine`: it prepares performance histories,
//! fits the models the engine consumes, and provides the rating extensions
//! that reuse the engine's update loop.
//!
//! # Overview
//!
//! ## League Fitting Workflow
//!
//! 1. **Clean Rows** ([`performances::clean_performances`]): Drop duplicate,
//!    invalid and ambiguous rows, then assign opponents
//! 2. **Fit Base Model** ([`variance_model::fit_league_model`]): Career prior
//!    plus the possessions → noise model
//! 3. **Fit Derived Models** ([`league::fit_league_models`]): Defense and
//!    adjusted-offense models fitted on samples collected during base passes
//!
//! ## Rating Workflow
//!
//! 1. **Rate** ([`league::rate_league`]): One pass producing offense, defense
//!    and adjusted-offense ratings through [`defense::DefenseAdjustment`]
//!
//! ## Allocation Workflow
//!
//! 1. **Observe** ([`allocation::PossessionAllocation`]): Record possession
//!    shares by pre-game rating rank during a pass
//! 2. **Fit** ([`allocation::PossessionAllocator`]): Average by rank and force
//!    the curve to be non-increasing
//! 3. **Allocate** ([`allocation::PossessionAllocator::allocate`]): Split
//!    possessions among a rated roster
//!
//! # Examples
//!
//! ```
//! use std::collections::BTreeMap;
//!
//! use vpp_analysis::allocation::PossessionAllocator;
//! use vpp_engine::{PlayerId, Rating};
//!
//! let allocator = PossessionAllocator::new(vec![0.3, 0.25, 0.2, 0.15, 0.1]).unwrap();
//! let roster = BTreeMap::from([
//!     (PlayerId::from("a"), Rating::new(0.95, 0.01)),
//!     (PlayerId::from("b"), Rating::new(1.10, 0.02)),
//! ]);
//!
//! let shares = allocator.allocate(&roster);
//! assert_eq!(shares[0].0, PlayerId::from("b"));
//! assert!((shares[0].1 - 0.3 / 0.55).abs() < 1e-12);
//! ```

pub mod allocation;
pub mod defense;
pub mod league;
pub mod performances;
pub mod sample;
pub mod variance_model;
