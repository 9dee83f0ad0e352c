use crate::config::CoreConfig;
use crate::env::TargetList;
use crate::state::EntityHandle;

use super::{GraphError, RegisterBank};

const N: usize = CoreConfig::REGISTER_COUNT;

/// Caller-owned scratch registers, reused across invocations.
#[derive(Clone, Debug)]
pub struct RegisterBanks {
    pub floats: [f32; N],
    pub ints: [i32; N],
    pub bools: [bool; N],
    pub entities: [EntityHandle; N],
    pub targets: [TargetList; CoreConfig::TARGET_REGISTER_COUNT],
}

impl Default for RegisterBanks {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterBanks {
    pub fn new() -> Self {
        Self {
            floats: [0.0; N],
            ints: [0; N],
            bools: [false; N],
            entities: [EntityHandle::NULL; N],
            targets: core::array::from_fn(|_| TargetList::new()),
        }
    }

    /// Zeroes every bank without releasing storage.
    pub fn reset(&mut self) {
        self.floats = [0.0; N];
        self.ints = [0; N];
        self.bools = [false; N];
        self.entities = [EntityHandle::NULL; N];
        for list in &mut self.targets {
            list.clear();
        }
    }

    pub fn float(&self, index: u8) -> Result<f32, GraphError> {
        self.floats
            .get(index as usize)
            .copied()
            .ok_or(out_of_range(RegisterBank::Float, index))
    }

    pub fn set_float(&mut self, index: u8, value: f32) -> Result<(), GraphError> {
        let slot = self
            .floats
            .get_mut(index as usize)
            .ok_or(out_of_range(RegisterBank::Float, index))?;
        *slot = value;
        Ok(())
    }

    pub fn int(&self, index: u8) -> Result<i32, GraphError> {
        self.ints
            .get(index as usize)
            .copied()
            .ok_or(out_of_range(RegisterBank::Int, index))
    }

    pub fn set_int(&mut self, index: u8, value: i32) -> Result<(), GraphError> {
        let slot = self
            .ints
            .get_mut(index as usize)
            .ok_or(out_of_range(RegisterBank::Int, index))?;
        *slot = value;
        Ok(())
    }

    pub fn bool(&self, index: u8) -> Result<bool, GraphError> {
        self.bools
            .get(index as usize)
            .copied()
            .ok_or(out_of_range(RegisterBank::Bool, index))
    }

    pub fn set_bool(&mut self, index: u8, value: bool) -> Result<(), GraphError> {
        let slot = self
            .bools
            .get_mut(index as usize)
            .ok_or(out_of_range(RegisterBank::Bool, index))?;
        *slot = value;
        Ok(())
    }

    pub fn entity(&self, index: u8) -> Result<EntityHandle, GraphError> {
        self.entities
            .get(index as usize)
            .copied()
            .ok_or(out_of_range(RegisterBank::Entity, index))
    }

    pub fn set_entity(&mut self, index: u8, value: EntityHandle) -> Result<(), GraphError> {
        let slot = self
            .entities
            .get_mut(index as usize)
            .ok_or(out_of_range(RegisterBank::Entity, index))?;
        *slot = value;
        Ok(())
    }

    pub fn targets(&self, index: u8) -> Result<&TargetList, GraphError> {
        self.targets
            .get(index as usize)
            .ok_or(out_of_range(RegisterBank::Target, index))
    }

    pub fn targets_mut(&mut self, index: u8) -> Result<&mut TargetList, GraphError> {
        self.targets
            .get_mut(index as usize)
            .ok_or(out_of_range(RegisterBank::Target, index))
    }
}

fn out_of_range(bank: RegisterBank, index: u8) -> GraphError {
    GraphError::RegisterOutOfRange {
        bank,
        index: index as usize,
    }
}
