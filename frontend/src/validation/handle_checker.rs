//! Debounced availability check for handle inputs.
//!
//! The checker owns no timers or network calls itself. Callers feed it events
//! (keystroke, timer fire, lookup response) and act on what it returns, which
//! keeps the state machine testable without a browser. `T` is whatever handle
//! keeps a scheduled timer alive; dropping it must cancel the timer, as
//! `gloo_timers::callback::Timeout` does.

use std::collections::HashMap;
use std::hash::Hash;
use super::handle::{cache_key, is_valid_shape, normalize, significant_len, MIN_LEN};
use super::lookup::{HandleStatus, LookupResult};

pub const DEBOUNCE_MS: u32 = 450;

/// One scheduled lookup. Stale once its field sees another keystroke.
#[derive(Clone, Debug, PartialEq)]
pub struct Ticket<K> {
    pub key: K,
    pub generation: u64,
    pub handle: String,
}

#[derive(Clone, Debug, PartialEq)]
pub enum InputOutcome<K> {
    /// Nothing to show and nothing scheduled.
    Idle,
    Invalid,
    /// Known from an earlier lookup this session.
    Resolved(HandleStatus),
    /// Field is pending; start a `DEBOUNCE_MS` timer and `arm` it with this ticket.
    Schedule(Ticket<K>),
}

#[derive(Clone, Debug, PartialEq)]
pub enum FireOutcome {
    /// The field moved on; leave the display alone.
    Abandoned,
    Resolved(HandleStatus),
    /// Call the lookup endpoint for this handle, then `on_response`.
    Lookup(String),
}

pub struct HandleChecker<K, T> {
    cache: HashMap<String, LookupResult>,
    pending: HashMap<K, T>,
    generations: HashMap<K, u64>,
    statuses: HashMap<K, HandleStatus>,
}

impl<K, T> Default for HandleChecker<K, T>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, T> HandleChecker<K, T>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self {
            cache: HashMap::new(),
            pending: HashMap::new(),
            generations: HashMap::new(),
            statuses: HashMap::new(),
        }
    }

    fn next_generation(&mut self, key: &K) -> u64 {
        let generation = self.generations.entry(key.clone()).or_insert(0);
        *generation += 1;
        *generation
    }

    fn is_current(&self, ticket: &Ticket<K>) -> bool {
        self.generations.get(&ticket.key) == Some(&ticket.generation)
    }

    fn set_status(&mut self, key: &K, status: HandleStatus) -> HandleStatus {
        self.statuses.insert(key.clone(), status);
        status
    }

    /// A keystroke, blur or submit on the field `key`. `force` shows a bad shape
    /// even while the input is still short.
    pub fn on_input(&mut self, key: &K, raw: &str, force: bool) -> InputOutcome<K> {
        let generation = self.next_generation(key);
        // Dropping the old timer handle cancels it.
        self.pending.remove(key);

        let handle = normalize(raw);
        if handle.is_empty() {
            self.set_status(key, HandleStatus::Idle);
            return InputOutcome::Idle;
        }
        if !is_valid_shape(raw) {
            if force || significant_len(raw) >= MIN_LEN {
                self.set_status(key, HandleStatus::Invalid);
                return InputOutcome::Invalid;
            }
            self.set_status(key, HandleStatus::Idle);
            return InputOutcome::Idle;
        }
        if let Some(hit) = self.cache.get(&cache_key(handle)) {
            let status = HandleStatus::from_result(hit);
            return InputOutcome::Resolved(self.set_status(key, status));
        }
        self.set_status(key, HandleStatus::Pending);
        InputOutcome::Schedule(Ticket {
            key: key.clone(),
            generation,
            handle: handle.to_string(),
        })
    }

    /// Keeps the timer started for `ticket`. A ticket that went stale while the
    /// timer was being created just drops it.
    pub fn arm(&mut self, ticket: &Ticket<K>, timer: T) {
        if self.is_current(ticket) {
            self.pending.insert(ticket.key.clone(), timer);
        }
    }

    pub fn on_timer(&mut self, ticket: &Ticket<K>, current_raw: &str) -> FireOutcome {
        if !self.is_current(ticket) {
            return FireOutcome::Abandoned;
        }
        self.pending.remove(&ticket.key);
        if normalize(current_raw) != ticket.handle {
            return FireOutcome::Abandoned;
        }
        // Spend the ticket so it can only fire once.
        self.next_generation(&ticket.key);
        match self.cache.get(&cache_key(&ticket.handle)) {
            Some(hit) => {
                let status = HandleStatus::from_result(hit);
                FireOutcome::Resolved(self.set_status(&ticket.key, status))
            }
            None => FireOutcome::Lookup(ticket.handle.clone()),
        }
    }

    /// Stores the result (first answer per handle wins) and returns the status
    /// to show, or `None` when the field no longer holds the looked-up handle.
    pub fn on_response(&mut self, ticket: &Ticket<K>, result: LookupResult, current_raw: &str) -> Option<HandleStatus> {
        let result = self
            .cache
            .entry(cache_key(&ticket.handle))
            .or_insert(result)
            .clone();
        if normalize(current_raw) != ticket.handle {
            return None;
        }
        Some(self.set_status(&ticket.key, HandleStatus::from_result(&result)))
    }

    pub fn status(&self, key: &K) -> HandleStatus {
        self.statuses.get(key).copied().unwrap_or(HandleStatus::Idle)
    }

    pub fn has_pending_timer(&self, key: &K) -> bool {
        self.pending.contains_key(key)
    }

    pub fn cached(&self, raw: &str) -> Option<&LookupResult> {
        self.cache.get(&cache_key(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::lookup::NeutralReason;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Stand-in timer that records whether it was cancelled (dropped unfired).
    struct FakeTimer {
        cancelled: Rc<RefCell<u32>>,
    }

    impl Drop for FakeTimer {
        fn drop(&mut self) {
            *self.cancelled.borrow_mut() += 1;
        }
    }

    fn schedule(outcome: InputOutcome<&'static str>) -> Ticket<&'static str> {
        match outcome {
            InputOutcome::Schedule(ticket) => ticket,
            other => panic!("expected a scheduled lookup, got {:?}", other),
        }
    }

    #[test]
    fn matching_handle_left_alone_looks_up_exactly_once() {
        let mut checker: HandleChecker<&str, ()> = HandleChecker::new();
        let ticket = schedule(checker.on_input(&"tg", "@alice_dev", false));
        assert_eq!(checker.status(&"tg"), HandleStatus::Pending);
        checker.arm(&ticket, ());

        assert_eq!(checker.on_timer(&ticket, "@alice_dev"), FireOutcome::Lookup("alice_dev".to_string()));
        assert_eq!(checker.on_timer(&ticket, "@alice_dev"), FireOutcome::Abandoned);
        let shown = checker.on_response(&ticket, LookupResult { ok: true, reason: None }, "@alice_dev");
        assert_eq!(shown, Some(HandleStatus::Valid));
        assert!(!checker.has_pending_timer(&"tg"));
    }

    #[test]
    fn retyping_a_resolved_handle_hits_the_cache() {
        let mut checker: HandleChecker<&str, ()> = HandleChecker::new();
        let ticket = schedule(checker.on_input(&"tg", "ghost_user", false));
        assert!(matches!(checker.on_timer(&ticket, "ghost_user"), FireOutcome::Lookup(_)));
        let first = checker
            .on_response(&ticket, LookupResult { ok: false, reason: Some("not_found".to_string()) }, "ghost_user")
            .unwrap();
        assert_eq!(first, HandleStatus::Neutral(NeutralReason::NotConfirmed));

        checker.on_input(&"tg", "", false);
        assert_eq!(checker.status(&"tg"), HandleStatus::Idle);

        // Different case, same handle: no new lookup, same display.
        assert_eq!(checker.on_input(&"tg", "@Ghost_User", false), InputOutcome::Resolved(first));
        assert_eq!(checker.status(&"tg"), first);
    }

    #[test]
    fn failures_are_cached_like_answers() {
        let mut checker: HandleChecker<&str, ()> = HandleChecker::new();
        let ticket = schedule(checker.on_input(&"tg", "broken_net", false));
        checker.on_timer(&ticket, "broken_net");
        checker.on_response(&ticket, LookupResult::failed(), "broken_net");
        assert_eq!(
            checker.on_input(&"tg", "broken_net", false),
            InputOutcome::Resolved(HandleStatus::Neutral(NeutralReason::LookupFailed))
        );
    }

    #[test]
    fn superseded_lookup_never_touches_the_new_text() {
        let cancelled = Rc::new(RefCell::new(0));
        let mut checker: HandleChecker<&str, FakeTimer> = HandleChecker::new();

        let old = schedule(checker.on_input(&"tg", "alice_dev", false));
        checker.arm(&old, FakeTimer { cancelled: cancelled.clone() });
        let new = schedule(checker.on_input(&"tg", "alice_devs", false));
        assert_eq!(*cancelled.borrow(), 1, "old timer is cancelled on the next keystroke");
        checker.arm(&new, FakeTimer { cancelled: cancelled.clone() });

        // Even if the old timer had fired, it is stale.
        assert_eq!(checker.on_timer(&old, "alice_devs"), FireOutcome::Abandoned);
        assert_eq!(checker.status(&"tg"), HandleStatus::Pending);

        // A response for text the field no longer holds is cached but not shown.
        assert_eq!(checker.on_response(&old, LookupResult { ok: true, reason: None }, "alice_devs"), None);
        assert_eq!(checker.status(&"tg"), HandleStatus::Pending);
        assert!(checker.cached("alice_dev").is_some());
    }

    #[test]
    fn timer_fire_rechecks_the_current_value() {
        let mut checker: HandleChecker<&str, ()> = HandleChecker::new();
        let ticket = schedule(checker.on_input(&"tg", "alice_dev", false));
        assert_eq!(checker.on_timer(&ticket, "alice_de"), FireOutcome::Abandoned);
    }

    #[test]
    fn short_bad_input_waits_for_blur() {
        let mut checker: HandleChecker<&str, ()> = HandleChecker::new();
        assert_eq!(checker.on_input(&"tg", "@abc", false), InputOutcome::Idle);
        assert_eq!(checker.status(&"tg"), HandleStatus::Idle);
        assert_eq!(checker.on_input(&"tg", "@abc", true), InputOutcome::Invalid);
        assert_eq!(checker.status(&"tg"), HandleStatus::Invalid);
        // Long enough to judge while typing.
        assert_eq!(checker.on_input(&"tg", "alice-dev", false), InputOutcome::Invalid);
    }

    #[test]
    fn clearing_or_invalid_input_cancels_the_pending_timer() {
        let cancelled = Rc::new(RefCell::new(0));
        let mut checker: HandleChecker<&str, FakeTimer> = HandleChecker::new();
        let ticket = schedule(checker.on_input(&"tg", "alice_dev", false));
        checker.arm(&ticket, FakeTimer { cancelled: cancelled.clone() });
        assert!(checker.has_pending_timer(&"tg"));

        assert_eq!(checker.on_input(&"tg", "  ", false), InputOutcome::Idle);
        assert!(!checker.has_pending_timer(&"tg"));
        assert_eq!(*cancelled.borrow(), 1);

        let ticket = schedule(checker.on_input(&"tg", "alice_dev", false));
        checker.arm(&ticket, FakeTimer { cancelled: cancelled.clone() });
        checker.on_input(&"tg", "alice dev", false);
        assert_eq!(*cancelled.borrow(), 2);
    }

    #[test]
    fn fields_are_independent() {
        let mut checker: HandleChecker<&str, ()> = HandleChecker::new();
        let a = schedule(checker.on_input(&"apply", "alice_dev", false));
        let b = schedule(checker.on_input(&"enroll", "bob_smith", false));
        checker.arm(&a, ());
        checker.arm(&b, ());
        assert_eq!(checker.on_timer(&a, "alice_dev"), FireOutcome::Lookup("alice_dev".to_string()));
        assert_eq!(checker.on_timer(&b, "bob_smith"), FireOutcome::Lookup("bob_smith".to_string()));
    }
}
