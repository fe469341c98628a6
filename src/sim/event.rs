/// Events emitted during a simulation step.
/// The presentation layer consumes these for animation, sound and camera;
/// nothing flows back into the core.

use crate::domain::entity::JumpKind;

#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    PlayerDied { cause: DeathCause },
    CollectibleCollected { id: usize, score: u32 },
    GateReached,
    LevelWon,
    LevelRestarted,
    JumpPerformed { kind: JumpKind },
    WalkStateChanged { active: bool },
    CrouchChanged { crouching: bool },
    WallJumpToggled { enabled: bool },
    PickupEffectEnded,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeathCause {
    Enemy { id: usize },
    FellOut,
}
