//! # u-subpop
//!
//! Weighted comparison of subpopulations drawn from survey data.
//!
//! Given a response and a score for every observation, plus an optional
//! sample weight, this crate measures how two subpopulations (or one
//! subpopulation and its full population) deviate from each other as a
//! function of score. It knows nothing about where the data came from or
//! how results are drawn.
//!
//! ## Modules
//!
//! - [`observation`]: Validated columns of responses, scores, and weights
//! - [`merge`]: Weighted merge of two disjoint sorted subpopulations
//! - [`cumulative`]: Cumulative differences, Kuiper and Kolmogorov–Smirnov statistics
//! - [`distributions`]: Null distributions turning statistics into p-values
//! - [`binning`]: Equal-width and equal-error reliability-diagram bins
//! - [`ate`]: Average treatment effect by nearest-neighbour matching
//! - [`population`]: Sorting with original ids, score dithering
//! - [`paired`]: Two responses on the same individuals
//! - [`report`]: End-to-end comparisons with a serializable report
//! - [`config`]: Serde-backed settings for [`report`]
//! - [`stats`], [`special`], [`random`]: Numerical and random building blocks
//!
//! ## Design Philosophy
//!
//! - **Explicit provenance**: merged and sorted sequences carry origin tags
//!   and original ids, never inverse permutations
//! - **Injected randomness**: every randomized step takes `&mut impl Rng`
//! - **Property-based testing**: invariants verified via proptest
//!
//! ## Example
//!
//! ```
//! use u_subpop::cumulative::{disjoint, CumulativeOptions};
//! use u_subpop::observation::Subpopulation;
//!
//! let a = Subpopulation::new(&[1.0, 1.0, 1.0], &[0.1, 0.3, 0.5], None).unwrap();
//! let b = Subpopulation::new(&[0.0, 0.0, 0.0], &[0.2, 0.4, 0.6], None).unwrap();
//! let curve = disjoint(&a, &b, &CumulativeOptions::default()).unwrap();
//! assert!((curve.terminal() - 1.0).abs() < 1e-12);
//! ```

pub mod ate;
pub mod binning;
pub mod config;
pub mod cumulative;
pub mod distributions;
pub mod error;
pub mod merge;
pub mod observation;
pub mod paired;
pub mod population;
pub mod random;
pub mod report;
pub mod special;
pub mod stats;

pub use error::{Error, Result};
