// Running per-side tallies derived from the event log.

use serde::{Deserialize, Serialize};

use crate::model::{EventKind, Side, TallyEvent};

/// Six counters: score, defends, and turnovers for each side.
///
/// Kept incrementally by the recorder, but always equal to
/// `Tallies::replay(log)`. Missing fields in stored snapshots default to 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Tallies {
    pub score_a: u32,
    pub score_b: u32,
    pub defends_a: u32,
    pub defends_b: u32,
    pub turnovers_a: u32,
    pub turnovers_b: u32,
}

impl Tallies {
    /// Rebuild counters from an event log.
    pub fn replay(log: &[TallyEvent]) -> Self {
        let mut tallies = Tallies::default();
        for event in log {
            tallies.apply(event);
        }
        tallies
    }

    pub fn get(&self, kind: EventKind, side: Side) -> u32 {
        match (kind, side) {
            (EventKind::Score, Side::A) => self.score_a,
            (EventKind::Score, Side::B) => self.score_b,
            (EventKind::Defend, Side::A) => self.defends_a,
            (EventKind::Defend, Side::B) => self.defends_b,
            (EventKind::Turnover, Side::A) => self.turnovers_a,
            (EventKind::Turnover, Side::B) => self.turnovers_b,
        }
    }

    fn counter_mut(&mut self, kind: EventKind, side: Side) -> &mut u32 {
        match (kind, side) {
            (EventKind::Score, Side::A) => &mut self.score_a,
            (EventKind::Score, Side::B) => &mut self.score_b,
            (EventKind::Defend, Side::A) => &mut self.defends_a,
            (EventKind::Defend, Side::B) => &mut self.defends_b,
            (EventKind::Turnover, Side::A) => &mut self.turnovers_a,
            (EventKind::Turnover, Side::B) => &mut self.turnovers_b,
        }
    }

    /// Count an appended event.
    pub fn apply(&mut self, event: &TallyEvent) {
        *self.counter_mut(event.kind(), event.team()) += 1;
    }

    /// Uncount a removed event. Saturates at zero.
    pub fn revert(&mut self, event: &TallyEvent) {
        let counter = self.counter_mut(event.kind(), event.team());
        *counter = counter.saturating_sub(1);
    }

    pub fn score(&self, side: Side) -> u32 {
        self.get(EventKind::Score, side)
    }

    /// The side with the strictly higher score, if any.
    pub fn leader(&self) -> Option<Side> {
        match self.score_a.cmp(&self.score_b) {
            std::cmp::Ordering::Greater => Some(Side::A),
            std::cmp::Ordering::Less => Some(Side::B),
            std::cmp::Ordering::Equal => None,
        }
    }
}
