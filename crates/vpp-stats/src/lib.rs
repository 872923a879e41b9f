//! Statistical utilities for the VPP rating workspace.
//!
//! This crate provides the small set of numerical tools the rating fitters need:
//!
//! - **Descriptive statistics**: mean, median, sample variance and standard deviation
//! - **Percentiles**: percentile lookups and percentile-rank bucketing
//! - **Regression**: ordinary least squares fits of a polynomial in one variable
//!
//! # Modules
//!
//! - [`descriptive`]: Descriptive statistics for summarizing datasets
//! - [`percentiles`]: Percentile computation and percentile-rank buckets
//! - [`regression`]: Polynomial least squares
//!
//! # Examples
//!
//! ## Computing descriptive statistics
//!
//! ```
//! use vpp_stats::descriptive::DescriptiveStats;
//!
//! let values = [1.0, 2.0, 3.0, 4.0, 5.0];
//! let stats = DescriptiveStats::new(values).unwrap();
//! assert_eq!(stats.mean, 3.0);
//! assert_eq!(stats.variance, Some(2.5));
//! ```
//!
//! ## Bucketing by percentile rank
//!
//! ```
//! use vpp_stats::percentiles::percentile_buckets;
//!
//! let values = [40.0, 10.0, 30.0, 20.0];
//! assert_eq!(percentile_buckets(&values, 2), vec![1, 0, 1, 0]);
//! ```
//!
//! ## Fitting a polynomial
//!
//! ```
//! use vpp_stats::regression::PolynomialFit;
//!
//! let xs = [0.0, 1.0, 2.0, 3.0];
//! let ys = [1.0, 3.0, 5.0, 7.0];
//! let fit = PolynomialFit::fit(&xs, &ys, 1).unwrap();
//! assert!((fit.evaluate(10.0) - 21.0).abs() < 1e-9);
//! ```

pub mod descriptive;
pub mod percentiles;
pub mod regression;
