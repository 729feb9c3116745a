use std::time::{Duration, Instant};

/// A single deferred payload. Scheduling again replaces whatever was
/// pending, so only the newest request ever fires.
#[derive(Debug)]
pub struct ScheduledTask<T> {
    pending: Option<(Instant, T)>,
}

impl<T> Default for ScheduledTask<T> {
    fn default() -> Self {
        Self { pending: None }
    }
}

impl<T> ScheduledTask<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule_at(&mut self, payload: T, due: Instant) {
        self.pending = Some((due, payload));
    }

    pub fn schedule_after(&mut self, payload: T, delay: Duration, now: Instant) {
        self.schedule_at(payload, now + delay);
    }

    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|(_, payload)| payload)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(due, _)| *due)
    }

    pub fn take_due(&mut self, now: Instant) -> Option<T> {
        if self.deadline()? <= now {
            self.cancel()
        } else {
            None
        }
    }
}

#[derive(Debug)]
pub struct Debouncer<T> {
    interval: Duration,
    task: ScheduledTask<T>,
}

impl<T> Debouncer<T> {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            task: ScheduledTask::new(),
        }
    }

    pub fn input(&mut self, payload: T, now: Instant) {
        self.task.schedule_after(payload, self.interval, now);
    }

    pub fn take_due(&mut self, now: Instant) -> Option<T> {
        self.task.take_due(now)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.task.deadline()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: Duration = Duration::from_millis(1);

    #[test]
    fn fires_after_deadline_only_once() {
        let start = Instant::now();
        let mut task = ScheduledTask::new();
        task.schedule_after("go", 10 * MS, start);
        assert_eq!(task.take_due(start + 9 * MS), None);
        assert_eq!(task.take_due(start + 10 * MS), Some("go"));
        assert_eq!(task.take_due(start + 20 * MS), None);
        assert_eq!(task.deadline(), None);
    }

    #[test]
    fn rescheduling_supersedes_pending_payload() {
        let start = Instant::now();
        let mut task = ScheduledTask::new();
        task.schedule_after(1, 10 * MS, start);
        task.schedule_after(2, 10 * MS, start + 5 * MS);
        assert_eq!(task.take_due(start + 12 * MS), None);
        assert_eq!(task.take_due(start + 15 * MS), Some(2));
    }

    #[test]
    fn cancel_drops_payload() {
        let start = Instant::now();
        let mut task = ScheduledTask::new();
        task.schedule_at("x", start);
        assert_eq!(task.cancel(), Some("x"));
        assert_eq!(task.take_due(start + MS), None);
        assert_eq!(task.deadline(), None);
    }

    #[test]
    fn rapid_typing_yields_one_pass_per_pause() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(200 * MS);
        let mut fired = Vec::new();
        for (offset, text) in [(0, "s"), (50, "su"), (120, "sun")] {
            let now = start + offset * MS;
            if let Some(query) = debouncer.take_due(now) {
                fired.push(query);
            }
            debouncer.input(text.to_string(), now);
        }
        assert_eq!(debouncer.take_due(start + 300 * MS), None);
        fired.extend(debouncer.take_due(start + 320 * MS));
        assert_eq!(fired, vec!["sun".to_string()]);
    }
}
