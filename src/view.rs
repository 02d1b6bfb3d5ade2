//! Page-level roster state with request ordering.
//!
//! A [`RosterView`] is what a dashboard page holds: the cascade, the load
//! state and the demo-data banner. Loads are ticketed; a completion only
//! lands if it belongs to the newest request and the view is still open.
//! While a load is in flight the previous roster is not readable.
//!
//! [`Fetched`] carries the same degrade-to-demo rule for one-off fetches
//! that have no cascade, such as fee records or notification listings.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::cascade::Cascade;
use crate::error::Result;
use crate::filter::FilterState;
use crate::ids::Dimension;
use crate::models::Classified;

pub const DEMO_DATA_BANNER: &str = "Failed to load roster - using demo data";

/// Banner shown when `what` could not be fetched.
pub fn demo_banner(what: &str) -> String {
    format!("Failed to load {what} - using demo data")
}

/// Result of a fetch that falls back to demo data on failure.
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched<T> {
    pub data: T,
    pub banner: Option<String>,
}

impl<T> Fetched<T> {
    /// Keep `result`, or log the error and take `fallback()` with a banner.
    pub fn settle(what: &str, result: Result<T>, fallback: impl FnOnce() -> T) -> Self {
        match result {
            Ok(data) => Self { data, banner: None },
            Err(err) => {
                tracing::warn!(error = %err, "{what} load failed, showing demo data");
                Self {
                    data: fallback(),
                    banner: Some(demo_banner(what)),
                }
            }
        }
    }

    /// Await `fetch` and [`settle`](Self::settle) it.
    pub async fn fetch<F>(what: &str, fetch: F, fallback: impl FnOnce() -> T) -> Self
    where
        F: Future<Output = Result<T>>,
    {
        Self::settle(what, fetch.await, fallback)
    }

    pub fn is_degraded(&self) -> bool {
        self.banner.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    Loading,
    Ready,
    /// The fetch failed and the fallback roster is shown.
    Degraded,
}

/// Handle for one in-flight load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct LoadTicket {
    generation: u64,
}

impl LoadTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// What happened to a completed load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Applied {
        degraded: bool,
        reset: Vec<Dimension>,
    },
    /// A newer load was started before this one finished.
    Superseded,
    /// The view was closed.
    Suppressed,
}

#[derive(Debug)]
struct ViewState<R: Classified> {
    cascade: Cascade<R>,
    fallback: Vec<R>,
    generation: u64,
    load: LoadState,
    banner: Option<String>,
    closed: bool,
}

/// Shared handle to a page's roster; clones refer to the same page.
#[derive(Debug)]
pub struct RosterView<R: Classified> {
    inner: Arc<Mutex<ViewState<R>>>,
}

impl<R: Classified> Clone for RosterView<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R: Classified + Clone> RosterView<R> {
    /// Empty view; `fallback` is installed when a load fails.
    pub fn new(fallback: Vec<R>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ViewState {
                cascade: Cascade::new(Vec::new()),
                fallback,
                generation: 0,
                load: LoadState::Idle,
                banner: None,
                closed: false,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ViewState<R>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn begin_load(&self) -> LoadTicket {
        let mut state = self.lock();
        state.generation += 1;
        state.load = LoadState::Loading;
        tracing::debug!(generation = state.generation, "roster load started");
        LoadTicket {
            generation: state.generation,
        }
    }

    pub fn complete(&self, ticket: LoadTicket, result: Result<Vec<R>>) -> Completion {
        let mut state = self.lock();
        if state.closed {
            tracing::debug!(generation = ticket.generation, "view closed, dropping roster");
            return Completion::Suppressed;
        }
        if ticket.generation != state.generation {
            tracing::debug!(
                generation = ticket.generation,
                latest = state.generation,
                "stale roster response ignored"
            );
            return Completion::Superseded;
        }

        let fallback = &state.fallback;
        let fetched = Fetched::settle("roster", result, || fallback.clone());
        let degraded = fetched.is_degraded();
        state.load = if degraded { LoadState::Degraded } else { LoadState::Ready };
        state.banner = fetched.banner;
        let roster = fetched.data;
        let reset = state.cascade.replace_roster(roster);
        if !reset.is_empty() {
            tracing::info!(?reset, "selections reset after reload");
        }
        Completion::Applied { degraded, reset }
    }

    /// Begin a load, await `fetch`, and complete it.
    pub async fn load<F>(&self, fetch: F) -> Completion
    where
        F: Future<Output = Result<Vec<R>>>,
    {
        let ticket = self.begin_load();
        let result = fetch.await;
        self.complete(ticket, result)
    }

    /// Mark the page unmounted. Pending loads will be suppressed.
    pub fn close(&self) {
        self.lock().closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub fn load_state(&self) -> LoadState {
        self.lock().load
    }

    pub fn banner(&self) -> Option<String> {
        self.lock().banner.clone()
    }

    pub fn filters(&self) -> FilterState {
        *self.lock().cascade.filters()
    }

    /// Read the cascade under the view's lock.
    ///
    /// `None` while a load is in flight: the roster it holds is about to be
    /// replaced.
    pub fn read<T>(&self, f: impl FnOnce(&Cascade<R>) -> T) -> Option<T> {
        let state = self.lock();
        if state.load == LoadState::Loading {
            return None;
        }
        Some(f(&state.cascade))
    }

    /// Mutate the cascade, e.g. a dropdown change. Refused while loading.
    pub fn update<T>(&self, f: impl FnOnce(&mut Cascade<R>) -> T) -> Option<T> {
        let mut state = self.lock();
        if state.load == LoadState::Loading {
            tracing::debug!(generation = state.generation, "selection change ignored during load");
            return None;
        }
        Some(f(&mut state.cascade))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PortalError;
    use crate::fixture::demo_students;
    use crate::ids::{BranchId, Choice, YearId};
    use crate::models::StudentRecord;
    use std::time::Duration;

    fn fourth_years() -> Vec<StudentRecord> {
        demo_students().into_iter().filter(|s| s.year == YearId::FINAL).collect()
    }

    #[test]
    fn successful_load_is_applied() {
        let view = RosterView::new(demo_students());
        let ticket = view.begin_load();
        assert_eq!(view.load_state(), LoadState::Loading);

        let completion = view.complete(ticket, Ok(fourth_years()));
        assert_eq!(
            completion,
            Completion::Applied {
                degraded: false,
                reset: vec![]
            }
        );
        assert_eq!(view.load_state(), LoadState::Ready);
        assert_eq!(view.banner(), None);
        assert_eq!(view.read(|c| c.roster().len()), Some(fourth_years().len()));
    }

    #[test]
    fn older_response_loses_to_newer_request() {
        let view = RosterView::new(Vec::new());
        let first = view.begin_load();
        let second = view.begin_load();

        assert_eq!(view.complete(second, Ok(fourth_years())), Completion::Applied {
            degraded: false,
            reset: vec![]
        });
        assert_eq!(view.complete(first, Ok(demo_students())), Completion::Superseded);
        assert_eq!(view.read(|c| c.roster().len()), Some(fourth_years().len()));
    }

    #[test]
    fn closed_view_ignores_completions() {
        let view = RosterView::new(demo_students());
        let ticket = view.begin_load();
        view.close();
        assert_eq!(view.complete(ticket, Ok(fourth_years())), Completion::Suppressed);
        assert_eq!(view.read(|c| c.roster().is_empty()), None);
    }

    #[test]
    fn failure_installs_demo_data_with_banner() {
        let view = RosterView::new(demo_students());
        let ticket = view.begin_load();
        let completion = view.complete(ticket, Err(PortalError::RosterUnavailable("connection refused".into())));

        assert!(matches!(completion, Completion::Applied { degraded: true, .. }));
        assert_eq!(view.load_state(), LoadState::Degraded);
        assert_eq!(view.banner().as_deref(), Some(DEMO_DATA_BANNER));
        assert_eq!(view.read(|c| c.roster().len()), Some(demo_students().len()));
    }

    #[test]
    fn previous_roster_is_hidden_while_loading() {
        let view = RosterView::new(Vec::new());
        let _ = view.complete(view.begin_load(), Ok(demo_students()));
        assert_eq!(view.read(|c| c.visible().len()), Some(demo_students().len()));

        let ticket = view.begin_load();
        assert_eq!(view.read(|c| c.visible().len()), None);
        assert_eq!(view.update(|c| c.select_branch(Choice::Only(BranchId::new(2).unwrap()))), None);

        let _ = view.complete(ticket, Ok(fourth_years()));
        assert_eq!(view.read(|c| c.visible().len()), Some(fourth_years().len()));
        assert_eq!(view.filters().branch, Choice::All);
    }

    #[test]
    fn one_off_fetch_degrades_to_demo_data() {
        let fetched = Fetched::settle("fee records", Ok(vec![1, 2]), Vec::new);
        assert_eq!(fetched, Fetched { data: vec![1, 2], banner: None });

        let fetched: Fetched<Vec<u8>> =
            Fetched::settle("fee records", Err(PortalError::RosterUnavailable("timeout".into())), || vec![9]);
        assert!(fetched.is_degraded());
        assert_eq!(fetched.data, vec![9]);
        assert_eq!(fetched.banner.as_deref(), Some("Failed to load fee records - using demo data"));
        assert_eq!(demo_banner("roster"), DEMO_DATA_BANNER);
    }

    #[test]
    fn reload_drops_selection_the_new_roster_cannot_satisfy() {
        let view = RosterView::new(Vec::new());
        let _ = view.complete(view.begin_load(), Ok(demo_students()));
        view.update(|c| c.select_branch(Choice::Only(BranchId::new(2).unwrap())));

        let completion = view.complete(view.begin_load(), Ok(fourth_years()));
        assert_eq!(
            completion,
            Completion::Applied {
                degraded: false,
                reset: vec![Dimension::Branch]
            }
        );
        assert_eq!(view.filters().branch, Choice::All);
    }

    #[tokio::test]
    async fn slow_first_load_cannot_overwrite_fast_second_load() {
        let view = RosterView::new(Vec::new());

        let slow = {
            let view = view.clone();
            tokio::spawn(async move {
                view.load(async {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    Ok(demo_students())
                })
                .await
            })
        };
        tokio::time::sleep(Duration::from_millis(5)).await;
        let fast = view.load(async { Ok(fourth_years()) }).await;

        assert!(matches!(fast, Completion::Applied { .. }));
        assert_eq!(slow.await.unwrap(), Completion::Superseded);
        assert_eq!(view.read(|c| c.roster().len()), Some(fourth_years().len()));
    }
}
