use async_trait::async_trait;
use log::{debug, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::pagination::{paginate, Page, PageQuery};
use crate::storage::DocumentStore;
use crate::task::{NewTask, Task, TaskPatch};

/// The whole persisted state: one JSON object holding the task array.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TaskDocument {
  pub tasks: Vec<Task>,
}

/// What `find_all` answers with: the plain array when no pagination was
/// asked for, a page plus metadata otherwise. Serializes untagged so the
/// transport emits either shape directly.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(untagged)]
pub enum TaskListing {
  All(Vec<Task>),
  Paged(Page<Task>),
}

/// Entity-level operations the transport layer programs against.
#[async_trait]
pub trait TaskRepository: Send + Sync {
  async fn find_all(&self, query: PageQuery) -> Result<TaskListing>;
  async fn find_one(&self, id: Uuid) -> Result<Task>;
  async fn create(&self, new_task: NewTask) -> Result<Task>;
  async fn update(&self, id: Uuid, patch: TaskPatch) -> Result<Task>;
  async fn remove(&self, id: Uuid) -> Result<()>;
}

/// Task collection on top of a [`DocumentStore`].
///
/// Lock discipline: `create` appends, which commutes with other creates, so
/// it relies on the write path's own locking. `find_one`, `update` and
/// `remove` need a view consistent with in-flight writes, so they hold the
/// store lock across the whole read(-modify-write) sequence and finish with
/// the unguarded write primitive. The unpaginated `find_all` deliberately
/// takes no lock and may serve a cached, up-to-TTL-stale answer.
pub struct TaskService {
  store: DocumentStore<TaskDocument>,
}

impl TaskService {
  pub fn new(store: DocumentStore<TaskDocument>) -> Self {
    Self { store }
  }

  pub fn store(&self) -> &DocumentStore<TaskDocument> {
    &self.store
  }
}

#[async_trait]
impl TaskRepository for TaskService {
  async fn find_all(&self, query: PageQuery) -> Result<TaskListing> {
    let doc = self.store.read().await?;

    if query.is_empty() {
      debug!("retrieved {} tasks (no pagination)", doc.tasks.len());
      return Ok(TaskListing::All(doc.tasks));
    }

    let page = paginate(&doc.tasks, &query)?;
    debug!(
      "retrieved {} tasks (page {}/{})",
      page.data.len(),
      page.meta.page,
      page.meta.total_pages
    );
    Ok(TaskListing::Paged(page))
  }

  async fn find_one(&self, id: Uuid) -> Result<Task> {
    let _guard = self.store.lock().await;
    let doc = self.store.read().await?;

    match doc.tasks.into_iter().find(|task| task.id == id) {
      Some(task) => Ok(task),
      None => {
        warn!("task not found: {}", id);
        Err(Error::NotFound(id))
      }
    }
  }

  async fn create(&self, new_task: NewTask) -> Result<Task> {
    let mut doc = self.store.read().await?;
    let task = Task::create(new_task);

    doc.tasks.push(task.clone());
    self.store.write(&doc).await?;

    debug!("task created: {}", task.id);
    Ok(task)
  }

  async fn update(&self, id: Uuid, patch: TaskPatch) -> Result<Task> {
    let _guard = self.store.lock().await;
    let mut doc = self.store.read().await?;

    let task = match doc.tasks.iter_mut().find(|task| task.id == id) {
      Some(task) => task,
      None => {
        warn!("cannot update, task not found: {}", id);
        return Err(Error::NotFound(id));
      }
    };

    task.apply(patch);
    let updated = task.clone();
    self.store.write_unlocked(&doc).await?;

    debug!("task updated: {}", updated.id);
    Ok(updated)
  }

  async fn remove(&self, id: Uuid) -> Result<()> {
    let _guard = self.store.lock().await;
    let mut doc = self.store.read().await?;

    let position = match doc.tasks.iter().position(|task| task.id == id) {
      Some(position) => position,
      None => {
        warn!("cannot delete, task not found: {}", id);
        return Err(Error::NotFound(id));
      }
    };

    doc.tasks.remove(position);
    self.store.write_unlocked(&doc).await?;

    debug!("task deleted: {}", id);
    Ok(())
  }
}
