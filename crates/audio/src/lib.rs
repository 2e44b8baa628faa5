//! Audio cue interface for the run simulation.
//!
//! The simulation never synthesises or plays sound itself. It fires named
//! cues at a [`CueSink`] supplied by the host and moves on; no return value,
//! no failure path. A host without sound passes [`NullSink`].

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Named, fire-and-forget sound cues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cue {
    Shoot,
    EnemyHit,
    EnemyDeath,
    BossHit,
    BossPhase,
    BossDeath,
    Explosion,
    Warning,
    Summon,
    ItemCollect,
    TrapTriggered,
    GatePass,
    ShieldBlock,
    PlayerHit,
    MemberLost,
    Combo,
    Victory,
    GameOver,
}

impl Cue {
    /// Stable name used by hosts to map cues onto their sound banks.
    pub fn name(&self) -> &'static str {
        match self {
            Cue::Shoot => "shoot",
            Cue::EnemyHit => "enemyHit",
            Cue::EnemyDeath => "enemyDeath",
            Cue::BossHit => "bossHit",
            Cue::BossPhase => "bossPhase",
            Cue::BossDeath => "bossDeath",
            Cue::Explosion => "explosion",
            Cue::Warning => "warning",
            Cue::Summon => "summon",
            Cue::ItemCollect => "itemCollect",
            Cue::TrapTriggered => "trap",
            Cue::GatePass => "gatePass",
            Cue::ShieldBlock => "shieldBlock",
            Cue::PlayerHit => "playerHit",
            Cue::MemberLost => "memberLost",
            Cue::Combo => "combo",
            Cue::Victory => "victory",
            Cue::GameOver => "gameOver",
        }
    }
}

/// Receiver of audio cues.
pub trait CueSink {
    fn play(&mut self, cue: Cue);

    /// Called once at the end of every simulation tick.
    fn end_frame(&mut self, _dt: f32) {}
}

/// Sink for hosts with audio disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl CueSink for NullSink {
    fn play(&mut self, _cue: Cue) {}
}

/// Forwards cues to the `log` facade at trace level (headless runs).
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl CueSink for LogSink {
    fn play(&mut self, cue: Cue) {
        log::trace!("cue: {}", cue.name());
    }
}

/// Records every cue it receives. Clones share the same buffer, so a test
/// can keep one handle while the simulation owns the other.
#[derive(Debug, Default, Clone)]
pub struct CueRecorder {
    played: Rc<RefCell<Vec<Cue>>>,
}

impl CueRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn played(&self) -> Vec<Cue> {
        self.played.borrow().clone()
    }

    pub fn count(&self, cue: Cue) -> usize {
        self.played.borrow().iter().filter(|c| **c == cue).count()
    }

    pub fn clear(&self) {
        self.played.borrow_mut().clear();
    }
}

impl CueSink for CueRecorder {
    fn play(&mut self, cue: Cue) {
        self.played.borrow_mut().push(cue);
    }
}

/// Drops repeats of the same cue that arrive closer than `min_gap` seconds.
///
/// A squad of a few hundred members fires dozens of rounds per tick; the
/// host only wants one `shoot` per gap.
pub struct ThrottledSink<S: CueSink> {
    inner: S,
    min_gap: f32,
    last_played: HashMap<Cue, f32>,
    clock: f32,
}

impl<S: CueSink> ThrottledSink<S> {
    pub fn new(inner: S, min_gap: f32) -> Self {
        Self {
            inner,
            min_gap: min_gap.max(0.0),
            last_played: HashMap::new(),
            clock: 0.0,
        }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: CueSink> CueSink for ThrottledSink<S> {
    fn play(&mut self, cue: Cue) {
        let allowed = match self.last_played.get(&cue) {
            Some(&t) => self.clock - t >= self.min_gap,
            None => true,
        };
        if allowed {
            self.last_played.insert(cue, self.clock);
            self.inner.play(cue);
        }
    }

    fn end_frame(&mut self, dt: f32) {
        self.clock += dt.max(0.0);
        self.inner.end_frame(dt);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recorder_clones_share_buffer() {
        let recorder = CueRecorder::new();
        let mut sink: Box<dyn CueSink> = Box::new(recorder.clone());
        sink.play(Cue::Shoot);
        sink.play(Cue::Victory);
        assert_eq!(recorder.played(), vec![Cue::Shoot, Cue::Victory]);
        assert_eq!(recorder.count(Cue::Shoot), 1);
    }

    #[test]
    fn throttle_drops_repeats_within_gap() {
        let recorder = CueRecorder::new();
        let mut sink = ThrottledSink::new(recorder.clone(), 0.1);
        sink.play(Cue::Shoot);
        sink.play(Cue::Shoot);
        sink.play(Cue::EnemyHit);
        sink.end_frame(0.05);
        sink.play(Cue::Shoot);
        sink.end_frame(0.06);
        sink.play(Cue::Shoot);
        assert_eq!(recorder.count(Cue::Shoot), 2);
        assert_eq!(recorder.count(Cue::EnemyHit), 1);
    }

    #[test]
    fn null_sink_accepts_everything() {
        let mut sink = NullSink;
        sink.play(Cue::GameOver);
        sink.end_frame(0.016);
    }
}
