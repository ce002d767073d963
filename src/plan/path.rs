use std::collections::VecDeque;
use std::ops::RangeInclusive;

use crate::action::Action;
use crate::geometry::Polygon;
use crate::types::Pose2;

/// States of a body and the actions leading from each state to the next.
///
/// `actions[i]` moves the body from `poses[i]` to `poses[i + 1]`. Steps are
/// consumed through a queue of remaining action indexes, so the pose and
/// polygon history stays intact for later re-validation.
#[derive(Debug, Clone)]
pub struct Path {
    poses: Vec<Pose2>,
    polygons: Vec<Polygon>,
    actions: Vec<Action>,
    remaining: VecDeque<usize>,
}

impl Path {
    pub fn new(poses: Vec<Pose2>, polygons: Vec<Polygon>, actions: Vec<Action>) -> Self {
        debug_assert_eq!(poses.len(), polygons.len());
        debug_assert_eq!(actions.len(), poses.len().saturating_sub(1));
        let remaining = (0..actions.len()).collect();
        Self {
            poses,
            polygons,
            actions,
            remaining,
        }
    }

    pub fn poses(&self) -> &[Pose2] {
        &self.poses
    }

    pub fn polygons(&self) -> &[Polygon] {
        &self.polygons
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn start_pose(&self) -> Option<&Pose2> {
        self.poses.first()
    }

    pub fn end_pose(&self) -> Option<&Pose2> {
        self.poses.last()
    }

    /// Number of steps not executed yet.
    pub fn len(&self) -> usize {
        self.remaining.len()
    }

    pub fn is_empty(&self) -> bool {
        self.remaining.is_empty()
    }

    pub fn is_started(&self) -> bool {
        self.remaining.len() != self.actions.len()
    }

    /// Index of the state the body is in before the next step.
    pub fn current_state(&self) -> usize {
        self.remaining
            .front()
            .copied()
            .unwrap_or(self.poses.len().saturating_sub(1))
    }

    /// States to re-check: from the current one up to `horizon` steps ahead.
    ///
    /// `None` means there is nothing to check, either because the path is
    /// finished or because the horizon is zero.
    pub fn horizon_states(&self, horizon: Option<usize>) -> Option<RangeInclusive<usize>> {
        if self.is_empty() || horizon == Some(0) {
            return None;
        }
        let first = self.current_state();
        let end = self.poses.len() - 1;
        let last = horizon.map_or(end, |h| (first + h).min(end));
        Some(first..=last)
    }

    pub fn pop_next_step(&mut self) -> Option<Action> {
        let index = self.remaining.pop_front()?;
        self.actions.get(index).cloned()
    }

    pub fn reset(&mut self) {
        self.remaining = (0..self.actions.len()).collect();
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec2;

    use super::*;

    fn three_steps() -> Path {
        let poses: Vec<Pose2> = (0..4).map(|i| Pose2::new(i as f32, 0.0, 0.0)).collect();
        let polygons = poses
            .iter()
            .map(|p| Polygon::rectangle(p.position, 0.5, 0.5))
            .collect();
        let actions = (0..3)
            .map(|_| Action::Translation {
                vector: Vec2::new(1.0, 0.0),
            })
            .collect();
        Path::new(poses, polygons, actions)
    }

    #[test]
    fn test_pop_until_empty() {
        let mut path = three_steps();
        assert!(!path.is_started());
        assert_eq!(path.len(), 3);
        for _ in 0..3 {
            assert!(path.pop_next_step().is_some());
        }
        assert!(path.is_empty());
        assert!(path.pop_next_step().is_none());
        assert!(path.is_empty());
        assert_eq!(path.current_state(), 3);
        assert_eq!(path.poses().len(), 4);
    }

    #[test]
    fn test_horizon_states() {
        let mut path = three_steps();
        assert_eq!(path.horizon_states(None), Some(0..=3));
        assert_eq!(path.horizon_states(Some(1)), Some(0..=1));
        assert_eq!(path.horizon_states(Some(0)), None);
        path.pop_next_step();
        assert_eq!(path.horizon_states(Some(10)), Some(1..=3));
        path.pop_next_step();
        path.pop_next_step();
        assert_eq!(path.horizon_states(None), None);
        path.reset();
        assert_eq!(path.len(), 3);
    }
}
