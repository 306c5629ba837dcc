//! Reasoning layer for MnemoDB
//!
//! Three cooperating pieces sit between retrieval and the caller:
//! [`EvidenceFusion`] merges per-source rankings into one list,
//! [`HallucinationDetector`] scores how well a response is grounded in
//! the retrieved evidence, and [`ExplanationBuilder`] turns per-stage
//! telemetry into a renderable reasoning trace.

pub mod explanation;
pub mod fusion;
pub mod hallucination;

pub use explanation::{Explanation, ExplanationBuilder, ReasoningStep, StepKind};
pub use fusion::{EvidenceFusion, FusionWeights};
pub use hallucination::{Evidence, HallucinationDetector, HallucinationReport};
