//! Search progress estimated from straight-line distances

use geo::{Distance, Euclidean, Point};

use crate::{
    model::Segment,
    routing::{IndexGraphStarter, RouterDelegate, astar::SearchObserver},
};

/// Share of the start-finish distance covered by the forward and backward fronts
#[derive(Debug, Clone)]
pub struct AStarProgress {
    start: Point<f64>,
    finish: Point<f64>,
    full_distance: f64,
    forward: f64,
    backward: f64,
}

impl AStarProgress {
    pub fn new(start: Point<f64>, finish: Point<f64>) -> Self {
        Self {
            start,
            finish,
            full_distance: Euclidean.distance(start, finish),
            forward: 0.0,
            backward: 0.0,
        }
    }

    /// Records a vertex at `current` heading to `target` and returns the progress in
    /// percent
    pub fn update(&mut self, current: Point<f64>, target: Point<f64>) -> f64 {
        if self.full_distance <= 0.0 {
            return 100.0;
        }
        let covered = (self.full_distance - Euclidean.distance(current, target)).max(0.0);
        if target == self.finish {
            self.forward = self.forward.max(covered);
        } else if target == self.start {
            self.backward = self.backward.max(covered);
        }
        ((self.forward + self.backward) / self.full_distance * 100.0).min(100.0)
    }
}

/// Search observer forwarding cancellation, progress and point checks to the
/// router delegate.
///
/// Progress is mapped into `[from, to]` so that the passes of one request report a
/// single growing value.
pub struct ProgressObserver<'d> {
    delegate: &'d dyn RouterDelegate,
    progress: Option<AStarProgress>,
    range: (f64, f64),
    interval: f64,
    draw_points_period: u32,
    visits: u32,
    last_reported: f64,
}

impl<'d> ProgressObserver<'d> {
    pub fn new(
        delegate: &'d dyn RouterDelegate,
        interval: f64,
        draw_points_period: u32,
        range: (f64, f64),
    ) -> Self {
        Self {
            delegate,
            progress: None,
            range,
            interval,
            draw_points_period: draw_points_period.max(1),
            visits: 0,
            last_reported: range.0,
        }
    }

    pub fn visits(&self) -> u32 {
        self.visits
    }

    fn report(&mut self, percent: f64) {
        let (from, to) = self.range;
        let mapped = from + (to - from) * percent / 100.0;
        if mapped - self.last_reported > self.interval {
            self.last_reported = mapped;
            self.delegate.on_progress(mapped);
        }
    }
}

impl SearchObserver<IndexGraphStarter<'_>> for ProgressObserver<'_> {
    fn is_cancelled(&self) -> bool {
        self.delegate.is_cancelled()
    }

    fn on_visit(&mut self, graph: &mut IndexGraphStarter<'_>, vertex: &Segment, target: &Segment) {
        self.visits += 1;
        if self.visits % self.draw_points_period != 0 {
            return;
        }
        let (Ok(current), Ok(target)) = (graph.point(vertex, true), graph.point(target, true)) else {
            return;
        };
        self.delegate.on_point_check(current);

        if self.progress.is_none() {
            let start = graph.start_segment();
            let finish = graph.finish_segment();
            if let (Ok(start), Ok(finish)) = (graph.point(&start, true), graph.point(&finish, true)) {
                self.progress = Some(AStarProgress::new(start, finish));
            }
        }
        if let Some(percent) = self.progress.as_mut().map(|p| p.update(current, target)) {
            self.report(percent);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_fronts_add_up() {
        let mut progress = AStarProgress::new(Point::new(0.0, 0.0), Point::new(100.0, 0.0));
        let finish = Point::new(100.0, 0.0);
        let start = Point::new(0.0, 0.0);
        assert!((progress.update(Point::new(30.0, 0.0), finish) - 30.0).abs() < 1e-9);
        // Falling back does not reduce progress.
        assert!((progress.update(Point::new(10.0, 0.0), finish) - 30.0).abs() < 1e-9);
        assert!((progress.update(Point::new(80.0, 0.0), start) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn zero_distance_is_complete() {
        let p = Point::new(1.0, 1.0);
        assert_eq!(AStarProgress::new(p, p).update(p, p), 100.0);
    }
}
