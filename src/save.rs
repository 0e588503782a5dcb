/// Single-flight save coordination.
///
/// The store only supports whole-document overwrite, so two overlapping
/// saves would race and silently drop edits. The coordinator keeps at
/// most one fetch-render-save round trip in flight; callers arriving
/// while one is running are queued FIFO and settle with that round
/// trip's outcome instead of starting their own.
use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;

use crate::session::BoardSession;
use crate::store::{DocumentStore, SyncError};

enum Flight {
    Idle,
    Saving {
        waiters: Vec<oneshot::Sender<Result<(), SyncError>>>,
    },
}

pub struct SaveCoordinator {
    store: Arc<dyn DocumentStore>,
    doc_path: String,
    session: Arc<Mutex<BoardSession>>,
    flight: Arc<Mutex<Flight>>,
}

impl SaveCoordinator {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        doc_path: impl Into<String>,
        session: Arc<Mutex<BoardSession>>,
    ) -> Self {
        Self {
            store,
            doc_path: doc_path.into(),
            session,
            flight: Arc::new(Mutex::new(Flight::Idle)),
        }
    }

    pub fn session(&self) -> &Arc<Mutex<BoardSession>> {
        &self.session
    }

    /// Persist the session's current tree. While a save is already in
    /// flight this only enqueues the caller; the in-flight outcome is
    /// broadcast to everyone once it lands.
    pub async fn save_changes(&self) -> Result<(), SyncError> {
        let (tx, rx) = oneshot::channel();
        let starts_flight = {
            let mut flight = self.flight.lock().unwrap();
            match &mut *flight {
                Flight::Saving { waiters } => {
                    log::debug!(
                        "[boardsync.save] save of {} in flight, queueing caller",
                        self.doc_path
                    );
                    waiters.push(tx);
                    false
                }
                Flight::Idle => {
                    *flight = Flight::Saving { waiters: vec![tx] };
                    true
                }
            }
        };

        if starts_flight {
            let store = Arc::clone(&self.store);
            let session = Arc::clone(&self.session);
            let flight = Arc::clone(&self.flight);
            let doc_path = self.doc_path.clone();
            tokio::spawn(async move {
                let result = run_save(store, &doc_path, session).await;
                match &result {
                    Ok(()) => log::info!("[boardsync.save] saved {}", doc_path),
                    Err(e) => log::warn!("[boardsync.save] save of {} failed: {}", doc_path, e),
                }
                // Back to Idle first, then drain: a waiter reacting to
                // its result may immediately start the next save.
                let waiters = match std::mem::replace(&mut *flight.lock().unwrap(), Flight::Idle) {
                    Flight::Saving { waiters } => waiters,
                    Flight::Idle => Vec::new(),
                };
                for waiter in waiters {
                    let _ = waiter.send(result.clone());
                }
            });
        }

        rx.await
            .unwrap_or_else(|_| Err(SyncError::SaveFailed("save task dropped".to_string())))
    }
}

async fn run_save(
    store: Arc<dyn DocumentStore>,
    doc_path: &str,
    session: Arc<Mutex<BoardSession>>,
) -> Result<(), SyncError> {
    let original = store.fetch(doc_path).await?;
    // The tree is read here, after the fetch: edits applied while the
    // fetch was in flight ride along in this save.
    let updated = session.lock().unwrap().render(&original);
    store.save(doc_path, &updated).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing::MockStore;
    use std::sync::atomic::Ordering;

    const DOC: &str = "\
#### Sprint
##### Todo
- [ ] buy milk
- [ ] walk dog
";

    fn coordinator(store: &Arc<MockStore>, doc: &str) -> SaveCoordinator {
        let session = Arc::new(Mutex::new(BoardSession::load(doc)));
        SaveCoordinator::new(
            Arc::clone(store) as Arc<dyn DocumentStore>,
            "notes/sprint.md",
            session,
        )
    }

    #[tokio::test]
    async fn test_save_round_trip_applies_tree_state() {
        let store = Arc::new(MockStore::new(DOC));
        let coordinator = coordinator(&store, DOC);

        let id = {
            let session = coordinator.session().lock().unwrap();
            session.set.boards[0].columns[0].tasks[1].id.clone()
        };
        coordinator
            .session()
            .lock()
            .unwrap()
            .set
            .toggle_task(&id)
            .unwrap();

        coordinator.save_changes().await.unwrap();
        let saved = store.last_saved().unwrap();
        assert!(saved.contains("- [x] walk dog"));
        assert!(saved.contains("- [ ] buy milk"));
    }

    #[tokio::test]
    async fn test_rapid_saves_coalesce_into_one_round_trip() {
        let store = Arc::new(MockStore::new(DOC));
        let coordinator = coordinator(&store, DOC);

        let (a, b, c) = tokio::join!(
            coordinator.save_changes(),
            coordinator.save_changes(),
            coordinator.save_changes(),
        );
        assert_eq!(a, Ok(()));
        assert_eq!(b, Ok(()));
        assert_eq!(c, Ok(()));

        assert_eq!(store.fetch_count.load(Ordering::SeqCst), 1);
        assert_eq!(store.save_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_sequential_saves_each_round_trip() {
        let store = Arc::new(MockStore::new(DOC));
        let coordinator = coordinator(&store, DOC);

        coordinator.save_changes().await.unwrap();
        coordinator.save_changes().await.unwrap();
        assert_eq!(store.fetch_count.load(Ordering::SeqCst), 2);
        assert_eq!(store.save_count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failure_broadcast_to_all_waiters() {
        let store = Arc::new(MockStore::new(DOC));
        *store.fail_save.lock().unwrap() = Some("503 Service Unavailable".to_string());
        let coordinator = coordinator(&store, DOC);

        let (a, b, c) = tokio::join!(
            coordinator.save_changes(),
            coordinator.save_changes(),
            coordinator.save_changes(),
        );
        let expected = Err(SyncError::SaveFailed("503 Service Unavailable".to_string()));
        assert_eq!(a, expected);
        assert_eq!(b, expected);
        assert_eq!(c, expected);
        assert_eq!(store.save_count.load(Ordering::SeqCst), 1);

        // The coordinator is Idle again: clearing the fault lets the
        // retry go through.
        *store.fail_save.lock().unwrap() = None;
        assert_eq!(coordinator.save_changes().await, Ok(()));
    }

    #[tokio::test]
    async fn test_render_uses_fresh_server_copy() {
        let store = Arc::new(MockStore::new(DOC));
        let coordinator = coordinator(&store, DOC);

        // Another writer prepends prose between load and save.
        *store.content.lock().unwrap() = format!("External note.\n\n{}", DOC);
        coordinator.save_changes().await.unwrap();

        let saved = store.last_saved().unwrap();
        assert!(saved.starts_with("External note.\n"));
        assert!(saved.contains("#### Sprint"));
    }
}
