pub mod schedule;
pub mod sgd;
pub mod update;

pub use schedule::StepLr;
pub use sgd::{Lookahead, Sgd};
pub use update::{FrozenParameters, ParameterUpdate};
