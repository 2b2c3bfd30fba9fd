//! [`ArbiterPolicy`] – who owns the display.
//!
//! Sources rank `Navigation > Playback > DateTime`.  A source that takes the
//! screen holds it until a cooldown expires with no further taking update.
//! Each take starts a new cooldown *generation*; an expiry only releases
//! the screen if it belongs to the latest generation, so a cancelled timer
//! that fires late is harmless.

use mediabox_types::PlayerState;

/// Producer of a display update, in ascending priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Source {
    DateTime,
    Playback,
    Navigation,
}

/// What the arbiter should do with an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Render without touching the cooldown.
    Render,
    /// Clear, render, and (re)arm the cooldown for `generation`.
    Take { generation: u64 },
    Drop,
}

#[derive(Debug, Default)]
pub struct ArbiterPolicy {
    holder: Option<Source>,
    generation: u64,
}

impl ArbiterPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Source currently holding the screen.
    pub fn holder(&self) -> Option<Source> {
        self.holder
    }

    /// `true` when clock frames may be rendered.
    pub fn datetime_allowed(&self) -> bool {
        self.holder.is_none()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn on_datetime(&self) -> Verdict {
        if self.datetime_allowed() {
            Verdict::Render
        } else {
            Verdict::Drop
        }
    }

    pub fn on_navigation(&mut self) -> Verdict {
        self.take(Source::Navigation)
    }

    /// An idle session has nothing to show and never takes the screen.
    pub fn on_playback(&mut self, state: PlayerState) -> Verdict {
        if state == PlayerState::Idle || self.holder > Some(Source::Playback) {
            return Verdict::Drop;
        }
        self.take(Source::Playback)
    }

    /// Cooldown `generation` ran out.  Returns `true` when the screen was
    /// released and should be cleared.
    pub fn on_expired(&mut self, generation: u64) -> bool {
        if generation != self.generation || self.holder.is_none() {
            return false;
        }
        self.holder = None;
        true
    }

    fn take(&mut self, source: Source) -> Verdict {
        self.holder = Some(source);
        self.generation += 1;
        Verdict::Take {
            generation: self.generation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_renders_only_while_nobody_holds_the_screen() {
        let mut policy = ArbiterPolicy::new();
        assert_eq!(policy.on_datetime(), Verdict::Render);

        assert_eq!(policy.on_navigation(), Verdict::Take { generation: 1 });
        assert_eq!(policy.on_datetime(), Verdict::Drop);

        assert!(policy.on_expired(1));
        assert_eq!(policy.on_datetime(), Verdict::Render);
    }

    #[test]
    fn stale_expiry_is_ignored() {
        let mut policy = ArbiterPolicy::new();
        policy.on_navigation();
        policy.on_navigation();

        assert!(!policy.on_expired(1), "first cooldown was superseded");
        assert_eq!(policy.holder(), Some(Source::Navigation));
        assert!(policy.on_expired(2));
        assert!(!policy.on_expired(2), "already released");
    }

    #[test]
    fn navigation_outranks_playback() {
        let mut policy = ArbiterPolicy::new();
        policy.on_navigation();
        assert_eq!(policy.on_playback(PlayerState::Playing), Verdict::Drop);
        assert_eq!(policy.generation(), 1);

        policy.on_expired(1);
        assert_eq!(policy.on_playback(PlayerState::Playing), Verdict::Take { generation: 2 });
        assert_eq!(policy.on_navigation(), Verdict::Take { generation: 3 });
        assert_eq!(policy.holder(), Some(Source::Navigation));
    }

    #[test]
    fn playback_ticks_keep_the_screen() {
        let mut policy = ArbiterPolicy::new();
        policy.on_playback(PlayerState::Playing);
        policy.on_playback(PlayerState::Playing);
        assert!(!policy.on_expired(1));
        assert_eq!(policy.on_datetime(), Verdict::Drop);
    }

    #[test]
    fn idle_playback_is_dropped() {
        let mut policy = ArbiterPolicy::new();
        assert_eq!(policy.on_playback(PlayerState::Idle), Verdict::Drop);
        assert!(policy.datetime_allowed());
    }
}
