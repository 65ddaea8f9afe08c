//! Edge auto-scroll while dragging
//!
//! Modeled as a timer the caller pumps with `tick(now)`; it only fires while
//! armed, and `stop()` disarms it for good until the next edge entry.

use std::time::{Duration, Instant};
use tracing::debug;

use super::geometry::{Point, Rect};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDirection {
    Up,
    Down,
}

#[derive(Debug, Clone)]
pub struct AutoScroller {
    margin: f32,
    interval: Duration,
    step: f32,
    /// Direction and time of the last fire (or arming)
    armed: Option<(ScrollDirection, Instant)>,
}

impl AutoScroller {
    pub fn new(margin: f32, interval: Duration, step: f32) -> Self {
        Self {
            margin,
            interval,
            step,
            armed: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.armed.is_some()
    }

    pub fn direction(&self) -> Option<ScrollDirection> {
        self.armed.map(|(direction, _)| direction)
    }

    /// Arm, re-aim or disarm based on where the pointer is
    pub fn update(&mut self, pointer: Point, viewport: Rect, now: Instant) {
        let wanted = if pointer.y < viewport.top() + self.margin {
            Some(ScrollDirection::Up)
        } else if pointer.y > viewport.bottom() - self.margin {
            Some(ScrollDirection::Down)
        } else {
            None
        };

        match (wanted, self.armed) {
            (None, Some(_)) => self.stop(),
            (Some(direction), None) => {
                debug!(?direction, "Auto-scroll armed");
                self.armed = Some((direction, now));
            }
            (Some(direction), Some((current, since))) if direction != current => {
                self.armed = Some((direction, since));
            }
            _ => {}
        }
    }

    /// Scroll offset delta if an interval has elapsed since the last fire
    pub fn tick(&mut self, now: Instant) -> Option<f32> {
        let (direction, last) = self.armed?;
        if now.saturating_duration_since(last) < self.interval {
            return None;
        }
        self.armed = Some((direction, now));
        Some(match direction {
            ScrollDirection::Up => -self.step,
            ScrollDirection::Down => self.step,
        })
    }

    pub fn stop(&mut self) {
        if self.armed.take().is_some() {
            debug!("Auto-scroll stopped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scroller() -> AutoScroller {
        AutoScroller::new(40.0, Duration::from_millis(16), 12.0)
    }

    #[test]
    fn test_fires_at_interval_near_bottom() {
        let viewport = Rect::new(0.0, 0.0, 200.0, 400.0);
        let start = Instant::now();
        let mut scroller = scroller();

        scroller.update(Point::new(10.0, 390.0), viewport, start);
        assert_eq!(scroller.direction(), Some(ScrollDirection::Down));
        assert_eq!(scroller.tick(start + Duration::from_millis(5)), None);
        assert_eq!(scroller.tick(start + Duration::from_millis(16)), Some(12.0));
        assert_eq!(scroller.tick(start + Duration::from_millis(20)), None);
        assert_eq!(scroller.tick(start + Duration::from_millis(33)), Some(12.0));
    }

    #[test]
    fn test_top_edge_scrolls_up_and_leaving_stops() {
        let viewport = Rect::new(0.0, 100.0, 200.0, 400.0);
        let start = Instant::now();
        let mut scroller = scroller();

        scroller.update(Point::new(10.0, 120.0), viewport, start);
        assert_eq!(scroller.tick(start + Duration::from_millis(16)), Some(-12.0));

        scroller.update(Point::new(10.0, 300.0), viewport, start + Duration::from_millis(20));
        assert!(!scroller.is_active());
        assert_eq!(scroller.tick(start + Duration::from_secs(1)), None);
    }

    #[test]
    fn test_stop_tears_down_timer() {
        let viewport = Rect::new(0.0, 0.0, 200.0, 400.0);
        let start = Instant::now();
        let mut scroller = scroller();

        scroller.update(Point::new(10.0, 5.0), viewport, start);
        scroller.stop();

        assert_eq!(scroller.tick(start + Duration::from_secs(5)), None);
    }
}
