// Draft state: the active draft, its offered choices, the user's local picks,
// recorded playthroughs, and the count of fetches still in flight.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::auth::{authenticated_fetch, authenticated_request, AuthProvider};
use crate::http::{HttpClient, Method};
use crate::protocol::{
    paths, Choice, ChoicesResponse, DraftList, DraftSummary, Pick, Playthrough,
    PlaythroughsResponse, SavePlaythrough,
};

/// Number of sub-fetches one `reload()` issues (choices, playthroughs).
pub const PARALLEL_FETCHES: usize = 2;

// ---------------------------------------------------------------------------
// DraftState
// ---------------------------------------------------------------------------

/// Observable draft snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DraftState {
    /// Active draft; `None` until the first `load`.
    pub draft_id: Option<i64>,
    /// `None` until the choice set for the active draft has arrived.
    pub choices: Option<Vec<Choice>>,
    /// Local pick list, never fetched.
    pub picks: Vec<Pick>,
    pub playthroughs: Vec<Playthrough>,
    /// Sub-fetches of the current load that have not landed yet.
    pub pending: usize,
    /// Bumped by every reload. Completions tagged with an older value are
    /// dropped.
    pub generation: u64,
}

impl DraftState {
    pub fn is_loading(&self) -> bool {
        self.pending > 0
    }
}

// ---------------------------------------------------------------------------
// InFlight
// ---------------------------------------------------------------------------

/// Handles for the fetches issued by one reload. Dropping it leaves the
/// fetches running.
#[derive(Debug)]
pub struct InFlight {
    generation: u64,
    handles: Vec<JoinHandle<()>>,
}

impl InFlight {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Wait until every fetch of this reload has finished, whatever the
    /// outcome.
    pub async fn join(self) {
        for handle in self.handles {
            if let Err(e) = handle.await {
                warn!("Draft fetch task did not complete: {}", e);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Draft
// ---------------------------------------------------------------------------

/// Handle to the draft state of one client. Clones share state.
///
/// `load` and `reload` spawn tokio tasks and must run inside a runtime.
#[derive(Clone)]
pub struct Draft {
    inner: Arc<DraftInner>,
}

struct DraftInner {
    http: Arc<dyn HttpClient>,
    auth: Arc<dyn AuthProvider>,
    state: watch::Sender<DraftState>,
}

impl Draft {
    pub fn new(http: Arc<dyn HttpClient>, auth: Arc<dyn AuthProvider>) -> Self {
        let (state, _rx) = watch::channel(DraftState::default());
        Draft {
            inner: Arc::new(DraftInner { http, auth, state }),
        }
    }

    // -- accessors ----------------------------------------------------------

    pub fn draft_id(&self) -> Option<i64> {
        self.inner.state.borrow().draft_id
    }

    pub fn choices(&self) -> Option<Vec<Choice>> {
        self.inner.state.borrow().choices.clone()
    }

    pub fn picks(&self) -> Vec<Pick> {
        self.inner.state.borrow().picks.clone()
    }

    pub fn playthroughs(&self) -> Vec<Playthrough> {
        self.inner.state.borrow().playthroughs.clone()
    }

    pub fn pending(&self) -> usize {
        self.inner.state.borrow().pending
    }

    pub fn snapshot(&self) -> DraftState {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DraftState> {
        self.inner.state.subscribe()
    }

    // -- loading ------------------------------------------------------------

    /// Make `id` the active draft and fetch it. Returns `None` without doing
    /// anything when `id` is already active.
    ///
    /// The id switch and the reset of the previous draft's data are published
    /// as one update, so observers never see the new id with old data.
    pub fn load(&self, id: i64) -> Option<InFlight> {
        let mut generation = None;
        self.inner.state.send_if_modified(|s| {
            if s.draft_id == Some(id) {
                return false;
            }
            s.draft_id = Some(id);
            generation = Some(reset_for_reload(s));
            true
        });
        let Some(generation) = generation else {
            debug!(draft_id = id, "draft already active, skipping load");
            return None;
        };
        Some(self.fetch(generation, Some(id)))
    }

    /// Reset the active draft's data and fetch choices and playthroughs
    /// concurrently.
    ///
    /// The reset is visible to observers before either fetch is issued.
    /// Each fetch fills its own slice and decrements `pending`; a fetch that
    /// fails leaves `pending` above zero.
    pub fn reload(&self) -> InFlight {
        let mut target = None;
        let mut generation = 0;
        self.inner.state.send_modify(|s| {
            generation = reset_for_reload(s);
            target = s.draft_id;
        });
        self.fetch(generation, target)
    }

    fn fetch(&self, generation: u64, target: Option<i64>) -> InFlight {
        let Some(id) = target else {
            debug!("reload without an active draft, nothing to fetch");
            return InFlight {
                generation,
                handles: Vec::new(),
            };
        };

        info!("Loading draft {} (gen: {})", id, generation);
        let handles = vec![
            self.spawn_fetch(generation, paths::choices(id), |s, body: ChoicesResponse| {
                s.choices = Some(body.cards);
            }),
            self.spawn_fetch(
                generation,
                paths::playthroughs(id),
                |s, body: PlaythroughsResponse| {
                    s.playthroughs = body.playthroughs;
                },
            ),
        ];

        InFlight {
            generation,
            handles,
        }
    }

    fn spawn_fetch<T, F>(&self, generation: u64, path: String, apply: F) -> JoinHandle<()>
    where
        T: DeserializeOwned + Send + 'static,
        F: FnOnce(&mut DraftState, T) + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let parsed: T = match authenticated_fetch(
                inner.http.as_ref(),
                inner.auth.as_ref(),
                Method::Get,
                &path,
                None,
            )
            .await
            {
                Ok(parsed) => parsed,
                Err(e) if e.is_application() => {
                    warn!("Draft fetch {} rejected: {}", path, e);
                    return;
                }
                Err(e) => {
                    warn!("Draft fetch {} failed: {}", path, e);
                    return;
                }
            };

            let applied = inner.state.send_if_modified(|s| {
                if s.generation != generation {
                    return false;
                }
                apply(s, parsed);
                s.pending = s.pending.saturating_sub(1);
                true
            });

            if applied {
                debug!(path = %path, generation, "draft slice loaded");
            } else {
                debug!(path = %path, generation, "discarding stale draft response");
            }
        })
    }

    // -- local picks and saving --------------------------------------------

    pub fn add_pick(&self, pick: Pick) {
        self.inner.state.send_modify(|s| s.picks.push(pick));
    }

    /// Fetch the list of drafts available to the current user. `None` on any
    /// failure.
    pub async fn list_drafts(&self) -> Option<Vec<DraftSummary>> {
        match authenticated_fetch::<DraftList>(
            self.inner.http.as_ref(),
            self.inner.auth.as_ref(),
            Method::Get,
            paths::DRAFTS,
            None,
        )
        .await
        {
            Ok(list) => Some(list.into_vec()),
            Err(e) => {
                warn!("Listing drafts failed: {}", e);
                None
            }
        }
    }

    /// Submit the local picks as a new playthrough of the active draft.
    ///
    /// On success the draft is reloaded (which clears the local picks) so the
    /// new playthrough shows up. Returns `false` without a request when there
    /// is no active draft or nothing has been picked.
    pub async fn save_playthrough(&self) -> bool {
        let (id, picks) = {
            let state = self.inner.state.borrow();
            match state.draft_id {
                Some(id) if !state.picks.is_empty() => (id, state.picks.clone()),
                _ => return false,
            }
        };

        let body = match serde_json::to_value(SavePlaythrough { picks: &picks }) {
            Ok(body) => body,
            Err(e) => {
                warn!("Failed to encode playthrough: {}", e);
                return false;
            }
        };

        let path = paths::save(id);
        match authenticated_request(
            self.inner.http.as_ref(),
            self.inner.auth.as_ref(),
            Method::Post,
            &path,
            Some(&body),
        )
        .await
        {
            Ok(_) => {
                info!("Saved playthrough of draft {} ({} picks)", id, picks.len());
                if self.draft_id() == Some(id) {
                    // Picks are cleared by the reload; the handle is not needed.
                    let _ = self.reload();
                }
                true
            }
            Err(e) => {
                warn!("Saving playthrough of draft {} failed: {}", id, e);
                false
            }
        }
    }
}

/// Start a new generation: drop everything fetched or picked for the previous
/// one and count the fetches the new one will issue. Returns the generation.
fn reset_for_reload(s: &mut DraftState) -> u64 {
    s.generation += 1;
    s.choices = None;
    s.picks.clear();
    s.playthroughs.clear();
    s.pending = if s.draft_id.is_some() {
        PARALLEL_FETCHES
    } else {
        0
    };
    s.generation
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
