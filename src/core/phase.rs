use enumset::{EnumSet, EnumSetType};
use serde::{Deserialize, Serialize};

use crate::quantity::power::Watts;

#[derive(Debug, EnumSetType, Serialize, Deserialize, derive_more::Display)]
#[enumset(serialize_repr = "list")]
#[serde(try_from = "u8", into = "u8")]
pub enum Phase {
    #[display("L1")]
    L1,

    #[display("L2")]
    L2,

    #[display("L3")]
    L3,
}

impl TryFrom<u8> for Phase {
    type Error = String;

    fn try_from(number: u8) -> Result<Self, Self::Error> {
        match number {
            1 => Ok(Self::L1),
            2 => Ok(Self::L2),
            3 => Ok(Self::L3),
            _ => Err(format!("there is no phase {number}, expected 1, 2, or 3")),
        }
    }
}

impl From<Phase> for u8 {
    fn from(phase: Phase) -> Self {
        match phase {
            Phase::L1 => 1,
            Phase::L2 => 2,
            Phase::L3 => 3,
        }
    }
}

/// Power committed per phase during one scheduling pass.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize)]
pub struct PhaseLoad([Watts; 3]);

impl PhaseLoad {
    #[must_use]
    pub const fn get(&self, phase: Phase) -> Watts {
        self.0[phase as usize]
    }

    /// First of the phases that would exceed the limit after adding the power.
    #[must_use]
    pub fn overloaded_phase(
        &self,
        phases: EnumSet<Phase>,
        power: Watts,
        limit: Watts,
    ) -> Option<Phase> {
        phases.iter().find(|phase| self.get(*phase) + power > limit)
    }

    pub fn commit(&mut self, phases: EnumSet<Phase>, power: Watts) {
        for phase in phases {
            self.0[phase as usize] += power;
        }
    }
}
