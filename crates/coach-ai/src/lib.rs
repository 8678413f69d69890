//! Analysis providers for the ReplayCoach pipeline.
//!
//! A single-method capability: given frame files and video metadata,
//! return structured observations, a summary and suggestions. Variants:
//!
//! - [`MockProvider`]: deterministic canned feedback, no external calls.
//! - [`GeminiProvider`]: Gemini REST backend with candidate-model
//!   discovery; permanently degrades to the mock when no candidate
//!   responds, so analysis never fails a job for lack of a backend.

pub mod error;
pub mod gemini;
pub mod json;
pub mod mock;
pub mod provider;

pub use error::{AiError, AiResult};
pub use gemini::GeminiProvider;
pub use json::extract_json_object;
pub use mock::MockProvider;
pub use provider::AnalysisProvider;
