use colored::Colorize;

use taskdock::pagination::PageQuery;
use taskdock::service::{TaskDocument, TaskListing, TaskRepository, TaskService};
use taskdock::storage::DocumentStore;
use taskdock::task::{Category, NewTask, Priority, Status, Task, TaskPatch};
use taskdock::Config;

#[tokio::main]
async fn main() {
  env_logger::init();

  let matches = clap::Command::new("Taskdock")
    .arg_required_else_help(true)
    .subcommand(clap::Command::new("add").args(&[
      clap::Arg::new("title").required(true).index(1),
      clap::Arg::new("description")
        .long("description")
        .takes_value(true),
      clap::Arg::new("priority")
        .long("priority")
        .takes_value(true)
        .default_value("medium"),
      clap::Arg::new("category").long("category").takes_value(true),
      clap::Arg::new("due").long("due").takes_value(true),
    ]))
    .subcommand(clap::Command::new("list").args(&[
      clap::Arg::new("page").long("page").takes_value(true),
      clap::Arg::new("page-size").long("page-size").takes_value(true),
    ]))
    .subcommand(
      clap::Command::new("show").arg(clap::Arg::new("id").required(true).index(1)),
    )
    .subcommand(clap::Command::new("edit").args(&[
      clap::Arg::new("id").required(true).index(1),
      clap::Arg::new("title").long("title").takes_value(true),
      clap::Arg::new("description")
        .long("description")
        .takes_value(true),
      clap::Arg::new("priority").long("priority").takes_value(true),
      clap::Arg::new("status").long("status").takes_value(true),
      clap::Arg::new("category").long("category").takes_value(true),
      clap::Arg::new("due").long("due").takes_value(true),
    ]))
    .subcommand(
      clap::Command::new("done").arg(clap::Arg::new("id").required(true).index(1)),
    )
    .subcommand(
      clap::Command::new("rm").arg(clap::Arg::new("id").required(true).index(1)),
    )
    .subcommand(clap::Command::new("check"))
    .get_matches();

  let config = match Config::load() {
    Ok(config) => config,
    Err(err) => {
      println!("config error: {}", err);
      return;
    }
  };

  let store = DocumentStore::new(&config.data_dir_path, "tasks.json");
  let repo: Box<dyn TaskRepository> = Box::new(TaskService::new(store));

  match matches.subcommand_name() {
    Some("add") => {
      let command_matches = matches.subcommand_matches("add").unwrap();
      let priority = match command_matches.value_of("priority").unwrap().parse::<Priority>() {
        Ok(priority) => priority,
        Err(err) => {
          println!("{}", err);
          return;
        }
      };
      let category = match command_matches.value_of("category") {
        Some(raw) => match raw.parse::<Category>() {
          Ok(category) => Some(category),
          Err(err) => {
            println!("{}", err);
            return;
          }
        },
        None => None,
      };

      let new_task = NewTask {
        title: command_matches.value_of("title").unwrap().to_string(),
        description: command_matches.value_of("description").map(str::to_string),
        priority,
        category,
        due_date: command_matches.value_of("due").map(str::to_string),
      };

      match repo.create(new_task).await {
        Ok(task) => {
          println!("task created:");
          print_task(&task);
        }
        Err(err) => println!("create task err: {}", err),
      };
    }

    Some("list") => {
      let command_matches = matches.subcommand_matches("list").unwrap();
      let query = PageQuery {
        page: command_matches.value_of_t("page").ok(),
        page_size: command_matches.value_of_t("page-size").ok(),
      };

      match repo.find_all(query).await {
        Ok(TaskListing::All(tasks)) => {
          for task in &tasks {
            print_task(task);
          }
          println!("{} tasks", tasks.len());
        }
        Ok(TaskListing::Paged(page)) => {
          for task in &page.data {
            print_task(task);
          }
          println!(
            "page {}/{} ({} tasks total)",
            page.meta.page, page.meta.total_pages, page.meta.total
          );
        }
        Err(err) => println!("list tasks err: {}", err),
      };
    }

    Some("show") => {
      let command_matches = matches.subcommand_matches("show").unwrap();
      if let Some(id) = parse_id(command_matches.value_of("id").unwrap()) {
        match repo.find_one(id).await {
          Ok(task) => print_task(&task),
          Err(err) => println!("{}", err),
        };
      }
    }

    Some("edit") => {
      let command_matches = matches.subcommand_matches("edit").unwrap();
      let id = match parse_id(command_matches.value_of("id").unwrap()) {
        Some(id) => id,
        None => return,
      };

      let mut patch = TaskPatch {
        title: command_matches.value_of("title").map(str::to_string),
        description: command_matches.value_of("description").map(str::to_string),
        due_date: command_matches.value_of("due").map(str::to_string),
        ..TaskPatch::default()
      };
      if let Some(raw) = command_matches.value_of("priority") {
        match raw.parse::<Priority>() {
          Ok(priority) => patch.priority = Some(priority),
          Err(err) => {
            println!("{}", err);
            return;
          }
        }
      }
      if let Some(raw) = command_matches.value_of("status") {
        match raw.parse::<Status>() {
          Ok(status) => patch.status = Some(status),
          Err(err) => {
            println!("{}", err);
            return;
          }
        }
      }
      if let Some(raw) = command_matches.value_of("category") {
        match raw.parse::<Category>() {
          Ok(category) => patch.category = Some(category),
          Err(err) => {
            println!("{}", err);
            return;
          }
        }
      }

      match repo.update(id, patch).await {
        Ok(task) => {
          println!("task updated:");
          print_task(&task);
        }
        Err(err) => println!("update task err: {}", err),
      };
    }

    Some("done") => {
      let command_matches = matches.subcommand_matches("done").unwrap();
      if let Some(id) = parse_id(command_matches.value_of("id").unwrap()) {
        let patch = TaskPatch {
          status: Some(Status::Completed),
          ..TaskPatch::default()
        };
        match repo.update(id, patch).await {
          Ok(task) => {
            println!("task completed:");
            print_task(&task);
          }
          Err(err) => println!("complete task err: {}", err),
        };
      }
    }

    Some("rm") => {
      let command_matches = matches.subcommand_matches("rm").unwrap();
      if let Some(id) = parse_id(command_matches.value_of("id").unwrap()) {
        match repo.remove(id).await {
          Ok(()) => println!("task removed"),
          Err(err) => println!("remove task err: {}", err),
        };
      }
    }

    // Health probe: independent store handle, same file as the service.
    Some("check") => {
      let probe: DocumentStore<TaskDocument> =
        DocumentStore::new(&config.data_dir_path, "tasks.json");
      match probe.verify().await {
        Ok(()) => println!("{} {}", "ok".green(), probe.path().display()),
        Err(err) => println!("{} {}", "unhealthy:".red(), err),
      };
    }

    Some(subcmd) => println!("unknown subcommand {}", subcmd),
    None => println!("subcommand not found"),
  };
}

fn parse_id(raw: &str) -> Option<uuid::Uuid> {
  match uuid::Uuid::parse_str(raw) {
    Ok(id) => Some(id),
    Err(err) => {
      println!("bad task id {}: {}", raw, err);
      None
    }
  }
}

fn print_task(task: &Task) {
  let priority = match task.priority {
    Priority::High => "high".red(),
    Priority::Medium => "medium".yellow(),
    Priority::Low => "low".green(),
  };
  let status = match task.status {
    Status::Pending => "pending".normal(),
    Status::InProgress => "in_progress".blue(),
    Status::Completed => "completed".green(),
  };

  println!(
    "{}  {}  [{} / {}]",
    task.id,
    task.title.bold(),
    priority,
    status
  );
  if let Some(description) = &task.description {
    println!("    {}", description);
  }
  if let Some(category) = &task.category {
    println!("    category: {}", category);
  }
  if let Some(due_date) = &task.due_date {
    println!("    due: {}", due_date);
  }
}
