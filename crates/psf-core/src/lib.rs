//! # PSF Core
//!
//! Synthetic point-spread functions for widefield fluorescence microscopy.
//! This crate evaluates the 3D image of an ideal point emitter seen through
//! an objective whose immersion and coverslip layers may differ from the
//! conditions it was designed for.
//!
//! ## Architecture
//!
//! A [`PsfSource`] holds the live, editable configuration. Generation takes
//! an immutable [`models::Snapshot`] of it, builds the matching
//! [`models::PsfModel`] and fills a [`PsfVolume`] through a
//! [`psf_compute::ComputeBackend`], then rescales the volume to the
//! requested total intensity.
//!
//! Every model reduces to a pupil integral
//!
//! $$U(r, z) = \int_0^1 f(r, z, \rho)\,d\rho$$
//!
//! evaluated with composite Simpson quadrature, whose phase is the optical
//! path difference of the layered specimen / coverslip / oil stack.
//!
//! ## Modules
//!
//! - [`types`] — Optical parameters, grid geometry, Gaussian lobe, volumes.
//! - [`opd`] — Optical path difference of the layer stack.
//! - [`bessel`] — Bessel functions $J_0$, $J_1$, $J_2$.
//! - [`quadrature`] — Composite Simpson rule over the pupil.
//! - [`models`] — Gibson-Lanni, Haeberle, modified Gibson-Lanni and
//!   generalized widefield models.
//! - [`generator`] — Generation pass state machine and region-parallel fill.
//! - [`normalize`] — Post-fill normalization.
//! - [`parameters`] — Named, indexed parameter tables.
//! - [`persistence`] — Attribute-style text format.

pub mod bessel;
pub mod error;
pub mod generator;
pub mod models;
pub mod normalize;
pub mod opd;
pub mod parameters;
pub mod persistence;
pub mod quadrature;
pub mod source;
pub mod types;

pub use error::PsfError;
pub use generator::{GenerationPass, GenerationState};
pub use models::{ModelKind, PsfModel};
pub use source::PsfSource;
pub use types::{GaussianLobe, GridGeometry, OpticalParams, PsfVolume};
