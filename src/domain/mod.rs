// Domain layer: core models and ports (interfaces). Adapters and pipelines depend on this, never the reverse.

pub mod model;
pub mod ports;
