//! Core functionalities.
mod distribution;
mod experience_buffer;
mod model;
mod observation;
pub use distribution::ActionDistribution;
pub use experience_buffer::ExperienceBufferBase;
pub use model::{Inference, PolicyValueModel, SyncModel, TrainBatch};
pub use observation::{Observation, RecurrentState};
