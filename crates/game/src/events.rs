//! Presentation events drained by the host once per tick (particles, popups, HUD flashes).

use engine_core::Vec2;

use crate::balance::{BossKind, CharacterKind, EnemyKind, ItemKind, TrapKind};
use crate::gate::{GambleOutcome, GateOp, Side};
use crate::run::SegmentKind;

#[derive(Debug, Clone, PartialEq)]
pub enum SimEvent {
    SegmentStarted {
        segment: SegmentKind,
        /// Zero-based index within the run (endless runs keep counting).
        index: u32,
    },
    EnemySpawned {
        id: u32,
        kind: EnemyKind,
    },
    EnemyKilled {
        id: u32,
        kind: EnemyKind,
        pos: Vec2,
        reward: u32,
    },
    EnemyEscaped {
        id: u32,
        kind: EnemyKind,
    },
    MemberLost {
        id: u32,
        kind: CharacterKind,
        pos: Vec2,
    },
    Explosion {
        pos: Vec2,
        radius: f32,
    },
    ShieldBlocked {
        pos: Vec2,
    },
    ItemCollected {
        kind: ItemKind,
        pos: Vec2,
    },
    ItemStolen {
        id: u32,
        pos: Vec2,
    },
    TrapTriggered {
        kind: TrapKind,
        pos: Vec2,
    },
    GatePassed {
        side: Side,
        op: GateOp,
        gamble: Option<GambleOutcome>,
    },
    BossSpawned {
        kind: BossKind,
    },
    BossPhase {
        phase: usize,
    },
    BossDefeated {
        kind: BossKind,
    },
    Combo {
        count: u32,
        bonus_gold: u32,
    },
    RunEnded {
        cleared: bool,
    },
}
