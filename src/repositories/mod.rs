//! # Repository Layer
//!
//! This module contains repository implementations that encapsulate SeaORM
//! operations for the onboarding store and the read-only reference
//! registries.

pub mod onboarding;
pub mod reference;

pub use onboarding::OnboardingRepository;
pub use reference::{ReferenceRepository, ReferenceSets};
