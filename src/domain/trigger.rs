/// Spatial triggers placed in a level.
///
/// `QuizTrigger` is one-shot: the first overlap with the player yields
/// its question and the latch blocks every later overlap. `FinishTrigger`
/// fires on entry and re-arms once the player leaves its cell.

use super::physics::Aabb;

#[derive(Clone, Debug)]
pub struct QuizTrigger {
    pub x: usize,
    pub y: usize,
    /// Index into the question bank.
    pub question: usize,
    fired: bool,
}

impl QuizTrigger {
    pub fn new(x: usize, y: usize, question: usize) -> Self {
        QuizTrigger { x, y, question, fired: false }
    }

    pub fn has_fired(&self) -> bool {
        self.fired
    }

    /// Question index on first contact, `None` afterwards.
    pub fn try_fire(&mut self, player: &Aabb) -> Option<usize> {
        if self.fired || !player.intersects(&Aabb::cell(self.x, self.y)) {
            return None;
        }
        self.fired = true;
        Some(self.question)
    }
}

#[derive(Clone, Debug)]
pub struct FinishTrigger {
    pub x: usize,
    pub y: usize,
    inside: bool,
}

impl FinishTrigger {
    pub fn new(x: usize, y: usize) -> Self {
        FinishTrigger { x, y, inside: false }
    }

    /// True on the tick the player enters the flag cell.
    pub fn entered(&mut self, player: &Aabb) -> bool {
        let overlapping = player.intersects(&Aabb::cell(self.x, self.y));
        let entered = overlapping && !self.inside;
        self.inside = overlapping;
        entered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(x: f32, y: f32) -> Aabb {
        Aabb { x, y, w: 1.0, h: 1.0 }
    }

    #[test]
    fn quiz_trigger_fires_once() {
        let mut t = QuizTrigger::new(3, 2, 7);
        assert_eq!(t.try_fire(&at(0.0, 2.0)), None);
        assert_eq!(t.try_fire(&at(2.5, 2.0)), Some(7));
        assert!(t.has_fired());
        assert_eq!(t.try_fire(&at(3.0, 2.0)), None);
        assert_eq!(t.try_fire(&at(0.0, 2.0)), None);
        assert_eq!(t.try_fire(&at(3.0, 2.0)), None);
    }

    #[test]
    fn finish_trigger_rearms_after_leaving() {
        let mut f = FinishTrigger::new(5, 1);
        assert!(!f.entered(&at(3.0, 1.0)));
        assert!(f.entered(&at(4.5, 1.0)));
        assert!(!f.entered(&at(5.0, 1.0)));
        assert!(!f.entered(&at(6.5, 1.0)));
        assert!(f.entered(&at(5.2, 1.0)));
    }
}
