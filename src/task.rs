use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
  High,
  Medium,
  Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
  Pending,
  InProgress,
  Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
  Work,
  Personal,
  Shopping,
  Health,
  Other,
}

impl fmt::Display for Priority {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Priority::High => "high",
      Priority::Medium => "medium",
      Priority::Low => "low",
    };
    write!(f, "{}", name)
  }
}

impl FromStr for Priority {
  type Err = String;

  fn from_str(value: &str) -> Result<Self, Self::Err> {
    match value {
      "high" => Ok(Priority::High),
      "medium" => Ok(Priority::Medium),
      "low" => Ok(Priority::Low),
      other => Err(format!("unknown priority: {}", other)),
    }
  }
}

impl fmt::Display for Status {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Status::Pending => "pending",
      Status::InProgress => "in_progress",
      Status::Completed => "completed",
    };
    write!(f, "{}", name)
  }
}

impl FromStr for Status {
  type Err = String;

  fn from_str(value: &str) -> Result<Self, Self::Err> {
    match value {
      "pending" => Ok(Status::Pending),
      "in_progress" => Ok(Status::InProgress),
      "completed" => Ok(Status::Completed),
      other => Err(format!("unknown status: {}", other)),
    }
  }
}

impl fmt::Display for Category {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Category::Work => "work",
      Category::Personal => "personal",
      Category::Shopping => "shopping",
      Category::Health => "health",
      Category::Other => "other",
    };
    write!(f, "{}", name)
  }
}

impl FromStr for Category {
  type Err = String;

  fn from_str(value: &str) -> Result<Self, Self::Err> {
    match value {
      "work" => Ok(Category::Work),
      "personal" => Ok(Category::Personal),
      "shopping" => Ok(Category::Shopping),
      "health" => Ok(Category::Health),
      "other" => Ok(Category::Other),
      unknown => Err(format!("unknown category: {}", unknown)),
    }
  }
}

/// A single task as persisted in the document file. Field names serialize in
/// camelCase; timestamps are ISO 8601 strings owned by the store, never
/// supplied by clients.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
  pub id: uuid::Uuid,
  pub title: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  pub priority: Priority,
  pub status: Status,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub category: Option<Category>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub due_date: Option<String>,
  pub created_at: String,
  pub updated_at: String,
}

/// Fields a caller supplies when creating a task. Validation (title length
/// and so on) happens in the transport layer before this ever gets built.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
  pub title: String,
  #[serde(default)]
  pub description: Option<String>,
  pub priority: Priority,
  #[serde(default)]
  pub category: Option<Category>,
  #[serde(default)]
  pub due_date: Option<String>,
}

/// Partial update; `None` fields keep their current value.
#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
  #[serde(default)]
  pub title: Option<String>,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(default)]
  pub priority: Option<Priority>,
  #[serde(default)]
  pub status: Option<Status>,
  #[serde(default)]
  pub category: Option<Category>,
  #[serde(default)]
  pub due_date: Option<String>,
}

impl Task {
  /// Builds a task from a creation request: fresh id, pending status, equal
  /// creation and update stamps.
  pub fn create(new_task: NewTask) -> Self {
    let now = timestamp_now();
    Self {
      id: uuid::Uuid::new_v4(),
      title: new_task.title,
      description: new_task.description,
      priority: new_task.priority,
      status: Status::Pending,
      category: new_task.category,
      due_date: new_task.due_date,
      created_at: now.clone(),
      updated_at: now,
    }
  }

  /// Shallow-merges the patch over this task and refreshes `updated_at`.
  pub fn apply(&mut self, patch: TaskPatch) {
    if let Some(title) = patch.title {
      self.title = title;
    }
    if let Some(description) = patch.description {
      self.description = Some(description);
    }
    if let Some(priority) = patch.priority {
      self.priority = priority;
    }
    if let Some(status) = patch.status {
      self.status = status;
    }
    if let Some(category) = patch.category {
      self.category = Some(category);
    }
    if let Some(due_date) = patch.due_date {
      self.due_date = Some(due_date);
    }
    self.updated_at = timestamp_now();
  }
}

/// Current UTC time as an ISO 8601 string with millisecond precision, the
/// same shape the dashboard already stores ("2025-12-14T12:00:00.000Z").
pub(crate) fn timestamp_now() -> String {
  chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

#[cfg(test)]
mod test {
  use super::*;

  fn sample_task() -> Task {
    Task::create(NewTask {
      title: "Buy milk".to_string(),
      description: None,
      priority: Priority::Low,
      category: Some(Category::Shopping),
      due_date: None,
    })
  }

  #[test]
  fn create_defaults_to_pending_with_equal_stamps() {
    let task = sample_task();
    assert_eq!(task.status, Status::Pending);
    assert_eq!(task.created_at, task.updated_at);
  }

  #[test]
  fn apply_merges_only_set_fields() {
    let mut task = sample_task();
    let original_title = task.title.clone();

    task.apply(TaskPatch {
      status: Some(Status::Completed),
      ..TaskPatch::default()
    });

    assert_eq!(task.title, original_title);
    assert_eq!(task.status, Status::Completed);
    assert_eq!(task.category, Some(Category::Shopping));
  }

  #[test]
  fn serializes_with_camel_case_keys_and_no_null_optionals() {
    let task = sample_task();
    let json = serde_json::to_value(&task).unwrap();

    assert!(json.get("createdAt").is_some());
    assert!(json.get("updatedAt").is_some());
    assert_eq!(json.get("category").unwrap(), "shopping");
    assert!(json.get("description").is_none());
    assert!(json.get("dueDate").is_none());
    assert_eq!(json.get("priority").unwrap(), "low");
    assert_eq!(json.get("status").unwrap(), "pending");
  }

  #[test]
  fn status_round_trips_through_snake_case() {
    let parsed: Status = serde_json::from_str("\"in_progress\"").unwrap();
    assert_eq!(parsed, Status::InProgress);
    assert_eq!("in_progress".parse::<Status>().unwrap(), Status::InProgress);
  }
}
