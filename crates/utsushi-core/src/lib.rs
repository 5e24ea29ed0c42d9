pub mod engine;
pub mod http;
pub mod registry;

pub use engine::{EngineContext, EngineError, EngineOptions, Initialized};
pub use registry::{
    Constructor, EngineDescriptor, EngineRegistry, PRESET_ENGINE_PREFIX, is_preset_engine_name,
    preset_engine_name,
};
