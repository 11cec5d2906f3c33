//! Controller layer: backend-to-UI events and their error modeling.

pub mod events;
