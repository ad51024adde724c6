//! Task use-case service.
//!
//! # Responsibility
//! - Guard the store behind one lock and expose every store operation.
//! - Write each collection touched by a mutation through to storage.
//! - Run projections, calendar lookups and snapshot exchange.
//!
//! # Invariants
//! - In-memory state is authoritative; a failed write never rolls it back
//!   and the caller still receives what the mutation did.
//! - A read error at startup never triggers a write-back.
//! - Writes happen after the state lock is released, so reads never wait on
//!   storage.
//! - Writers are serialized, so storage sees collections in mutation order.
//! - Import swaps all three collections at once; readers see either the old
//!   or the new state.

use crate::config::CoreConfig;
use crate::exchange::snapshot::{self, ImportError};
use crate::id::{id_generator, IdGenerator};
use crate::model::due_date::DueDate;
use crate::model::state::{Collection, StoreState};
use crate::model::task::{SubtaskId, Task, TaskPatch};
use crate::repo::kv_repo::{KvResult, KvStore};
use crate::repo::persistence::{PersistError, PersistenceAdapter};
use crate::store::task_store::{ListRemoval, TaskStore};
use crate::store::{StoreError, StoreResult};
use crate::view::date_index::CalendarMonth;
use crate::view::projection::{ProjectionCache, ViewState};
use log::{debug, info, warn};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

pub type ServiceResult<T> = Result<T, ServiceError>;

/// What a mutation changed in memory before its write failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    /// A mutation with no value of its own changed state.
    Changed,
    /// The draft task that was created and selected.
    Draft(Task),
    /// New subtask id, or the normalized name of a new list or tag.
    Created(String),
    ListRemoved(ListRemoval),
    /// A snapshot replaced all three collections.
    Imported,
}

trait IntoApplied {
    fn into_applied(self) -> Applied;
}

impl IntoApplied for () {
    fn into_applied(self) -> Applied {
        Applied::Changed
    }
}

impl IntoApplied for Task {
    fn into_applied(self) -> Applied {
        Applied::Draft(self)
    }
}

impl IntoApplied for String {
    fn into_applied(self) -> Applied {
        Applied::Created(self)
    }
}

impl IntoApplied for ListRemoval {
    fn into_applied(self) -> Applied {
        Applied::ListRemoved(self)
    }
}

impl<T: IntoApplied> IntoApplied for Option<T> {
    fn into_applied(self) -> Applied {
        self.map_or(Applied::Changed, IntoApplied::into_applied)
    }
}

/// Errors surfaced to front ends.
#[derive(Debug)]
pub enum ServiceError {
    Store(StoreError),
    Import(ImportError),
    /// State changed in memory but could not be written.
    Persist {
        source: PersistError,
        applied: Applied,
    },
    Export(serde_json::Error),
}

impl ServiceError {
    /// The in-memory outcome of a mutation whose write failed.
    pub fn applied(&self) -> Option<&Applied> {
        match self {
            Self::Persist { applied, .. } => Some(applied),
            _ => None,
        }
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "{err}"),
            Self::Import(err) => write!(f, "{err}"),
            Self::Persist { source, .. } => {
                write!(f, "{source}; the change is kept in memory only")
            }
            Self::Export(err) => write!(f, "failed to export snapshot: {err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::Import(err) => Some(err),
            Self::Persist { source, .. } => Some(source),
            Self::Export(err) => Some(err),
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<ImportError> for ServiceError {
    fn from(value: ImportError) -> Self {
        Self::Import(value)
    }
}

/// Owned copy of one collection, taken under the lock for writing.
enum Pending {
    Lists(Vec<String>),
    Tags(Vec<String>),
    Tasks(Vec<Task>),
}

impl Pending {
    fn capture(store: &TaskStore, collection: Collection) -> Self {
        match collection {
            Collection::Lists => Self::Lists(store.lists().to_vec()),
            Collection::Tags => Self::Tags(store.tags().to_vec()),
            Collection::Tasks => Self::Tasks(store.tasks().to_vec()),
        }
    }

    fn collection(&self) -> Collection {
        match self {
            Self::Lists(_) => Collection::Lists,
            Self::Tags(_) => Collection::Tags,
            Self::Tasks(_) => Collection::Tasks,
        }
    }
}

/// Store facade with write-through persistence.
pub struct TaskService<S: KvStore> {
    state: RwLock<TaskStore>,
    write_gate: Mutex<()>,
    persistence: PersistenceAdapter<S>,
    ids: Box<dyn IdGenerator>,
    projection: Mutex<ProjectionCache>,
}

impl<S: KvStore> TaskService<S> {
    /// Loads the three collections from `kv`, using the id strategy from
    /// `config`.
    pub fn open(kv: S, config: &CoreConfig) -> Self {
        Self::with_id_generator(kv, config, id_generator(config.id_strategy))
    }

    /// Loads the three collections from `kv`.
    ///
    /// Each collection falls back independently: to seed content when
    /// `seed_defaults` is set, otherwise to an empty state holding only the
    /// default list. A store whose reads all succeed and find no
    /// collection is written back immediately; a read error rules that out.
    pub fn with_id_generator(kv: S, config: &CoreConfig, ids: Box<dyn IdGenerator>) -> Self {
        let persistence = PersistenceAdapter::new(kv, config.key_prefix.clone());
        let presence: KvResult<Vec<bool>> = Collection::ALL
            .iter()
            .map(|collection| persistence.contains(collection.key()))
            .collect();
        let fresh = match presence {
            Ok(found) => !found.contains(&true),
            Err(err) => {
                warn!("event=store_load module=service status=degraded reason=read_failed error={err}");
                false
            }
        };

        let defaults = if config.seed_defaults {
            StoreState::seeded(ids.as_ref(), DueDate::today())
        } else {
            StoreState::with_default_list(&config.default_list)
        };
        let loaded = StoreState::new(
            persistence.load(Collection::Lists.key(), defaults.lists),
            persistence.load(Collection::Tags.key(), defaults.tags),
            persistence.load(Collection::Tasks.key(), defaults.tasks),
        );
        let store = TaskStore::new(loaded, config.default_list.clone());
        info!(
            "event=store_load module=service status=ok fresh={fresh} lists={} tags={} tasks={}",
            store.lists().len(),
            store.tags().len(),
            store.tasks().len()
        );

        let service = Self {
            state: RwLock::new(store),
            write_gate: Mutex::new(()),
            persistence,
            ids,
            projection: Mutex::new(ProjectionCache::new()),
        };

        if fresh {
            let pending = {
                let store = service.read_store();
                let pending: Vec<Pending> = Collection::ALL
                    .iter()
                    .map(|collection| Pending::capture(&store, *collection))
                    .collect();
                pending
            };
            match service.flush(pending) {
                Ok(()) => info!("event=store_seed module=service status=ok"),
                Err(err) => warn!("event=store_seed module=service status=error error={err}"),
            }
        }
        service
    }

    pub fn persistence(&self) -> &PersistenceAdapter<S> {
        &self.persistence
    }

    // === Reads ===

    /// Full copy of the current state.
    pub fn snapshot(&self) -> StoreState {
        self.read_store().state().clone()
    }

    pub fn lists(&self) -> Vec<String> {
        self.read_store().lists().to_vec()
    }

    pub fn tags(&self) -> Vec<String> {
        self.read_store().tags().to_vec()
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.read_store().tasks().to_vec()
    }

    pub fn task(&self, task_id: &str) -> Option<Task> {
        self.read_store().task(task_id).cloned()
    }

    pub fn revision(&self) -> u64 {
        self.read_store().revision()
    }

    pub fn has_draft(&self) -> bool {
        self.read_store().has_draft()
    }

    pub fn draft_task(&self) -> Option<Task> {
        self.read_store().draft_task().cloned()
    }

    pub fn selected_task(&self) -> Option<Task> {
        self.read_store().selected_task().cloned()
    }

    pub fn select(&self, task_id: &str) -> bool {
        self.write_store().select(task_id)
    }

    pub fn clear_selection(&self) {
        self.write_store().clear_selection();
    }

    pub fn open_counts(&self) -> Vec<(String, usize)> {
        self.read_store().open_counts()
    }

    /// Tasks visible under `view`, memoized on `(revision, view)`.
    pub fn visible_tasks(&self, view: &ViewState) -> Vec<Task> {
        let store = self.read_store();
        let mut cache = lock(&self.projection);
        cache.get_or_compute(store.revision(), store.tasks(), view)
    }

    /// Days in `month` with at least one task due.
    pub fn dates_with_tasks(&self, month: CalendarMonth) -> BTreeSet<DueDate> {
        month.due_dates(self.read_store().tasks())
    }

    // === Tasks ===

    /// Starts a draft task in `list` and selects it.
    ///
    /// # Errors
    /// - `Store(DraftAlreadyExists)` while a draft is pending.
    /// - `Persist` with `Applied::Draft` when the task collection cannot be
    ///   written; the draft exists and is selected regardless.
    pub fn create_draft_task(&self, list: &str) -> ServiceResult<Task> {
        let ids = self.ids.as_ref();
        self.commit_with(
            |store| store.create_draft_task(ids, list),
            |_| vec![Collection::Tasks],
        )
    }

    pub fn confirm_draft(&self, task_id: &str) -> ServiceResult<bool> {
        self.commit_flag(&[Collection::Tasks], |store| store.confirm_draft(task_id))
    }

    pub fn discard_draft(&self, task_id: &str) -> ServiceResult<bool> {
        self.commit_flag(&[Collection::Tasks], |store| store.discard_draft(task_id))
    }

    pub fn delete_task(&self, task_id: &str) -> ServiceResult<bool> {
        self.commit_flag(&[Collection::Tasks], |store| store.delete_task(task_id))
    }

    pub fn toggle_done(&self, task_id: &str) -> ServiceResult<bool> {
        self.commit_flag(&[Collection::Tasks], |store| store.toggle_done(task_id))
    }

    /// Merges `patch` into a task; `Ok(false)` when the task is unknown or
    /// nothing changed.
    pub fn update_task(&self, task_id: &str, patch: TaskPatch) -> ServiceResult<bool> {
        let changed = self.commit(&[Collection::Tasks], |store| {
            Ok(store.update_task(task_id, patch)?.then_some(()))
        })?;
        Ok(changed.is_some())
    }

    // === Subtasks ===

    pub fn add_subtask(&self, task_id: &str, title: &str) -> ServiceResult<Option<SubtaskId>> {
        let ids = self.ids.as_ref();
        self.commit(&[Collection::Tasks], |store| {
            Ok(store.add_subtask(ids, task_id, title))
        })
    }

    pub fn toggle_subtask(&self, task_id: &str, subtask_id: &str) -> ServiceResult<bool> {
        self.commit_flag(&[Collection::Tasks], |store| {
            store.toggle_subtask(task_id, subtask_id)
        })
    }

    pub fn rename_subtask(
        &self,
        task_id: &str,
        subtask_id: &str,
        title: &str,
    ) -> ServiceResult<bool> {
        self.commit_flag(&[Collection::Tasks], |store| {
            store.rename_subtask(task_id, subtask_id, title)
        })
    }

    pub fn remove_subtask(&self, task_id: &str, subtask_id: &str) -> ServiceResult<bool> {
        self.commit_flag(&[Collection::Tasks], |store| {
            store.remove_subtask(task_id, subtask_id)
        })
    }

    pub fn attach_tag(&self, task_id: &str, tag: &str) -> ServiceResult<bool> {
        self.commit_flag(&[Collection::Tasks], |store| store.attach_tag(task_id, tag))
    }

    pub fn detach_tag(&self, task_id: &str, tag: &str) -> ServiceResult<bool> {
        self.commit_flag(&[Collection::Tasks], |store| store.detach_tag(task_id, tag))
    }

    // === Lists and tags ===

    /// Adds a list; returns the normalized name when it was new.
    pub fn add_list(&self, name: &str) -> ServiceResult<Option<String>> {
        self.commit(&[Collection::Lists], |store| Ok(store.add_list(name)))
    }

    /// Deletes a list, reassigning its tasks in the same step.
    pub fn delete_list(&self, name: &str) -> ServiceResult<Option<ListRemoval>> {
        self.commit_with(
            |store| Ok(store.delete_list(name)),
            |removal| match removal {
                Some(removal) if removal.reassigned > 0 => {
                    vec![Collection::Lists, Collection::Tasks]
                }
                Some(_) => vec![Collection::Lists],
                None => Vec::new(),
            },
        )
    }

    pub fn add_tag(&self, name: &str) -> ServiceResult<Option<String>> {
        self.commit(&[Collection::Tags], |store| Ok(store.add_tag(name)))
    }

    pub fn remove_tag(&self, name: &str) -> ServiceResult<bool> {
        self.commit_flag(&[Collection::Tags], |store| store.remove_tag(name))
    }

    // === Snapshots ===

    /// Serializes the current state as a snapshot document.
    pub fn export_snapshot(&self) -> ServiceResult<String> {
        let state = self.snapshot();
        let document = snapshot::export_snapshot(&state.lists, &state.tags, &state.tasks)
            .map_err(ServiceError::Export)?;
        info!(
            "event=snapshot_export module=service status=ok tasks={} bytes={}",
            state.tasks.len(),
            document.len()
        );
        Ok(document)
    }

    /// Replaces all three collections with the content of `document`.
    ///
    /// # Errors
    /// - `Import` when the document is malformed or incomplete; state is
    ///   left untouched.
    /// - `Persist` with `Applied::Imported` when the new state could not be
    ///   written; the new state stays active in memory.
    pub fn import_snapshot(&self, document: &str) -> ServiceResult<()> {
        let imported = snapshot::import_snapshot(document).map_err(|err| {
            warn!("event=snapshot_import module=service status=error error={err}");
            err
        })?;
        let task_count = imported.tasks.len();

        let _gate = lock(&self.write_gate);
        let pending = {
            let mut store = self.write_store();
            store.replace_state(imported);
            let pending: Vec<Pending> = Collection::ALL
                .iter()
                .map(|collection| Pending::capture(&store, *collection))
                .collect();
            pending
        };
        info!("event=snapshot_import module=service status=ok tasks={task_count}");
        self.flush(pending).map_err(|source| ServiceError::Persist {
            source,
            applied: Applied::Imported,
        })
    }

    // === Internals ===

    fn commit_flag(
        &self,
        collections: &[Collection],
        op: impl FnOnce(&mut TaskStore) -> bool,
    ) -> ServiceResult<bool> {
        let changed = self.commit(collections, |store| Ok(op(store).then_some(())))?;
        Ok(changed.is_some())
    }

    fn commit<T: IntoApplied>(
        &self,
        collections: &[Collection],
        op: impl FnOnce(&mut TaskStore) -> StoreResult<Option<T>>,
    ) -> ServiceResult<Option<T>> {
        self.commit_with(op, |result| {
            if result.is_some() {
                collections.to_vec()
            } else {
                Vec::new()
            }
        })
    }

    /// Applies `op` under the state lock, then writes the collections chosen
    /// by `touched` once the lock is released. An empty choice writes
    /// nothing. A failed write hands the result back inside the error.
    fn commit_with<T: IntoApplied>(
        &self,
        op: impl FnOnce(&mut TaskStore) -> StoreResult<T>,
        touched: impl FnOnce(&T) -> Vec<Collection>,
    ) -> ServiceResult<T> {
        let _gate = lock(&self.write_gate);
        let (result, pending) = {
            let mut store = self.write_store();
            let result = op(&mut *store)?;
            let pending: Vec<Pending> = touched(&result)
                .into_iter()
                .map(|collection| Pending::capture(&store, collection))
                .collect();
            (result, pending)
        };
        match self.flush(pending) {
            Ok(()) => Ok(result),
            Err(source) => Err(ServiceError::Persist {
                source,
                applied: result.into_applied(),
            }),
        }
    }

    /// Writes every pending collection, returning the first failure.
    fn flush(&self, pending: Vec<Pending>) -> Result<(), PersistError> {
        let mut first_error = None;
        for item in pending {
            let key = item.collection().key();
            let result = match &item {
                Pending::Lists(lists) => self.persistence.save(key, lists),
                Pending::Tags(tags) => self.persistence.save(key, tags),
                Pending::Tasks(tasks) => self.persistence.save(key, tasks),
            };
            match result {
                Ok(()) => debug!("event=persist_write module=service status=ok collection={key}"),
                Err(err) => {
                    first_error.get_or_insert(err);
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn read_store(&self) -> RwLockReadGuard<'_, TaskStore> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_store(&self) -> RwLockWriteGuard<'_, TaskStore> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
