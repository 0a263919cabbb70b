/// JSON scene description for the command line harness.
pub mod desc;
/// Boxes, shapes, paint and addressable properties.
pub mod entity;
/// Entity arena and canvas settings.
pub mod model;
