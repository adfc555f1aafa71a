// ttsgate core library
//
// Domain vocabulary and collaborator contracts shared by the server and the CLI:
// model registry, device planning, voice catalog, audio containers, and the
// blocking inference traits the dispatcher drives.

pub mod audio;
pub mod device;
pub mod engine;
pub mod error;
pub mod models;
pub mod types;
pub mod voices;

pub use device::{DType, Device, DevicePlan, DevicePreference, DTypePreference};
pub use engine::{EngineLoader, SpeechEngine, SynthesisOutput, SynthesisParams};
pub use error::{AudioError, SynthesisError};
pub use models::{ModelRegistry, ModelSpec};
pub use types::{AudioFormat, Language};
