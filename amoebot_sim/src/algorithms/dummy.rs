use amoebot_core::{Action, Algorithm, ParticleView};
use std::any::Any;

/// Placeholder algorithm that never acts.
#[derive(Debug, Clone, Copy, Default)]
pub struct Dummy;

impl Algorithm for Dummy {
    fn execute(&mut self, _particle: &ParticleView<'_>) -> Action {
        Action::Idle
    }

    fn clone_box(&self) -> Box<dyn Algorithm> {
        Box::new(*self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
