// Domain layer: shared models and the ports the build stages talk through.

pub mod model;
pub mod ports;
