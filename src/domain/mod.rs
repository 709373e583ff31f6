// Domain layer: dashboard models and the ports the exporter is written against.

pub mod model;
pub mod ports;
