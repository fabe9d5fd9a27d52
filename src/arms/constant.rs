use super::arm::{finite, Arm};

use crate::errors::ArmError;

use rand::RngCore;

#[derive(Debug, Clone)]
pub struct Constant {
    value: f64,
}

impl Constant {
    pub fn new(value: f64) -> Result<Self, ArmError> {
        Ok(Self {
            value: finite("value", value)?,
        })
    }
}

impl Arm for Constant {
    fn sample(&self, _: &mut dyn RngCore) -> f64 {
        self.value
    }

    fn mean(&self) -> f64 {
        self.value
    }
}
