//! The interactive menus: an auth menu that hands a logged-in user to the
//! task menu.
//!
//! Every step returns `ControlFlow::Break` when input runs out so the whole
//! session unwinds as if the user had chosen Exit.

use crate::credentials::{validate_username, CredentialStore};
use crate::password::PasswordHasher;
use crate::storage::StorageBackend;
use crate::task_list::{TaskList, TaskStore};
use crate::ui::{render_task_table, Console};
use crate::Error;
use std::io::{self, BufRead, Write};
use std::ops::ControlFlow;
use tracing::{error, info};

type Step = io::Result<ControlFlow<()>>;

const CONTINUE: Step = Ok(ControlFlow::Continue(()));
const QUIT: Step = Ok(ControlFlow::Break(()));

/// Read a line or end the session.
macro_rules! read_or_quit {
    ($read:expr) => {
        match $read? {
            Some(value) => value,
            None => return QUIT,
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthChoice {
    Register,
    Login,
    Exit,
}

impl AuthChoice {
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim() {
            "1" => Some(Self::Register),
            "2" => Some(Self::Login),
            "3" => Some(Self::Exit),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskChoice {
    Add,
    View,
    Delete,
    Complete,
    Logout,
}

impl TaskChoice {
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim() {
            "1" => Some(Self::Add),
            "2" => Some(Self::View),
            "3" => Some(Self::Delete),
            "4" => Some(Self::Complete),
            "5" => Some(Self::Logout),
            _ => None,
        }
    }
}

/// Outcome of reading a task id.
#[derive(Debug, PartialEq, Eq)]
enum IdInput {
    /// A well-formed integer. `id` is `None` when it is too large or
    /// negative to name any task; `shown` is how it is echoed back.
    Id { id: Option<u32>, shown: String },
    Invalid,
}

fn parse_id(input: &str) -> IdInput {
    let text = input.trim();
    let digits = text.strip_prefix(['+', '-']).unwrap_or(text);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return IdInput::Invalid;
    }
    match text.parse::<i64>() {
        Ok(n) => IdInput::Id {
            id: u32::try_from(n).ok(),
            shown: n.to_string(),
        },
        Err(_) => IdInput::Id {
            id: None,
            shown: text.to_string(),
        },
    }
}

pub struct Shell<R, W> {
    console: Console<R, W>,
    backend: Box<dyn StorageBackend>,
    hasher: Box<dyn PasswordHasher>,
}

impl<R: BufRead, W: Write> Shell<R, W> {
    pub fn new(
        console: Console<R, W>,
        backend: Box<dyn StorageBackend>,
        hasher: Box<dyn PasswordHasher>,
    ) -> Self {
        Self {
            console,
            backend,
            hasher,
        }
    }

    pub fn console(&self) -> &Console<R, W> {
        &self.console
    }

    pub fn backend(&self) -> &dyn StorageBackend {
        self.backend.as_ref()
    }

    /// Run the auth menu until Exit or end of input.
    pub fn run(&mut self) -> io::Result<()> {
        self.console.clear()?;
        self.console.say("Welcome to the Task Manager CLI!")?;
        loop {
            self.console.say("\n1. Register\n2. Login\n3. Exit")?;
            let Some(choice) = self.console.prompt("Choose an option: ")? else {
                break;
            };
            let step = match AuthChoice::parse(&choice) {
                Some(AuthChoice::Register) => self.register()?,
                Some(AuthChoice::Login) => self.login()?,
                Some(AuthChoice::Exit) => {
                    self.console.say("Exiting application. Goodbye!")?;
                    ControlFlow::Break(())
                }
                None => {
                    self.console.say("Invalid choice.")?;
                    ControlFlow::Continue(())
                }
            };
            if step.is_break() {
                break;
            }
        }
        info!("session ended");
        Ok(())
    }

    fn register(&mut self) -> Step {
        self.console.say("\n--- Register ---")?;
        let username = read_or_quit!(self.console.prompt("Enter a username: "));
        if let Err(e) = validate_username(&username) {
            self.console.say(format!("{}. Try again.", e))?;
            return CONTINUE;
        }

        let taken =
            CredentialStore::new(self.backend.as_mut(), self.hasher.as_ref()).contains(&username);
        match taken {
            Ok(true) => {
                self.console.say("Username already exists. Try again.")?;
                return CONTINUE;
            }
            Ok(false) => {}
            Err(e) => return self.report("Registration failed", e),
        }

        let password = read_or_quit!(self.console.prompt_secret("Enter a password: "));
        let registered = CredentialStore::new(self.backend.as_mut(), self.hasher.as_ref())
            .register(&username, &password);
        match registered {
            Ok(Some(_)) => self.console.say("Registration successful!")?,
            Ok(None) => self.console.say("Username already exists. Try again.")?,
            Err(e) => return self.report("Registration failed", e),
        }
        CONTINUE
    }

    fn login(&mut self) -> Step {
        self.console.say("\n--- Login ---")?;
        let username = read_or_quit!(self.console.prompt("Username: "));
        let password = read_or_quit!(self.console.prompt_secret("Password: "));

        let session = CredentialStore::new(self.backend.as_mut(), self.hasher.as_ref())
            .login(&username, &password);
        match session {
            Ok(Some(user)) => {
                self.console.say(format!("Welcome, {}!", user))?;
                self.task_manager(&user)
            }
            Ok(None) => {
                self.console.say("Invalid credentials. Please try again.")?;
                CONTINUE
            }
            Err(e) => self.report("Login failed", e),
        }
    }

    fn task_manager(&mut self, username: &str) -> Step {
        let loaded = TaskStore::new(self.backend.as_mut()).load(username);
        let mut tasks = match loaded {
            Ok(tasks) => tasks,
            Err(e) => return self.report("Failed to load tasks", e),
        };

        loop {
            self.console.clear()?;
            self.console.say(format!("\n--- Task Manager for {} ---", username))?;
            self.console.say(
                "1. Add Task\n2. View Tasks\n3. Delete Task\n4. Mark Task as Complete\n5. Logout",
            )?;
            let choice = read_or_quit!(self.console.prompt("Enter your choice: "));

            let step = match TaskChoice::parse(&choice) {
                Some(TaskChoice::Add) => self.add_task(&mut tasks, username)?,
                Some(TaskChoice::View) => self.view_tasks(&tasks, username)?,
                Some(TaskChoice::Delete) => self.delete_task(&mut tasks, username)?,
                Some(TaskChoice::Complete) => self.complete_task(&mut tasks, username)?,
                Some(TaskChoice::Logout) => {
                    self.console.say("Logging out...")?;
                    info!(username, "logged out");
                    return CONTINUE;
                }
                None => {
                    self.console.say("Invalid choice. Please try again.")?;
                    ControlFlow::Continue(())
                }
            };
            if step.is_break() {
                return QUIT;
            }
        }
    }

    fn add_task(&mut self, tasks: &mut TaskList, username: &str) -> Step {
        self.console.say("\n--- Add Task ---")?;
        let title = read_or_quit!(self.console.prompt("Enter task title: "));
        let description = read_or_quit!(self.console.prompt("Enter task description: "));
        let due_date = read_or_quit!(self.console.prompt("Enter due date (YYYY-MM-DD): "));
        let priority = read_or_quit!(self.console.prompt("Enter priority (High, Medium, Low): "));

        let before = tasks.clone();
        let task = tasks.add_task(title, description, due_date, priority);
        let (id, title) = (task.id, task.title.clone());
        info!(username, id, "added task");
        if self.persist(tasks, before, username)? {
            self.console.say(format!("Task added: {}", title))?;
        }
        CONTINUE
    }

    fn view_tasks(&mut self, tasks: &TaskList, username: &str) -> Step {
        self.show_tasks(tasks, username)?;
        read_or_quit!(self.console.pause());
        CONTINUE
    }

    fn show_tasks(&mut self, tasks: &TaskList, username: &str) -> io::Result<()> {
        self.console.clear()?;
        if tasks.is_empty() {
            self.console.say("No tasks available.")
        } else {
            let title = format!(" Tasks for {} ", username);
            self.console.say(render_task_table(&title, tasks.tasks()))
        }
    }

    fn delete_task(&mut self, tasks: &mut TaskList, username: &str) -> Step {
        self.show_tasks(tasks, username)?;
        let input = read_or_quit!(self.console.prompt("Enter task ID to delete: "));
        match parse_id(&input) {
            IdInput::Invalid => self.console.say("Invalid ID format.")?,
            IdInput::Id { id, shown } => {
                let before = tasks.clone();
                match id.and_then(|id| tasks.delete_task(id)) {
                    Some(task) => {
                        info!(username, id = task.id, "deleted task");
                        if self.persist(tasks, before, username)? {
                            self.console.say(format!("Task deleted: {}", task.title))?;
                        }
                    }
                    None => self.console.say(format!("No task found with ID {}", shown))?,
                }
            }
        }
        read_or_quit!(self.console.pause());
        CONTINUE
    }

    fn complete_task(&mut self, tasks: &mut TaskList, username: &str) -> Step {
        self.show_tasks(tasks, username)?;
        let input = read_or_quit!(self.console.prompt("Enter task ID to mark as complete: "));
        match parse_id(&input) {
            IdInput::Invalid => self.console.say("Invalid ID format.")?,
            IdInput::Id { id, shown } => {
                let before = tasks.clone();
                let completed = id
                    .and_then(|id| tasks.complete_task(id))
                    .map(|task| (task.id, task.title.clone()));
                match completed {
                    Some((id, title)) => {
                        info!(username, id, "completed task");
                        if self.persist(tasks, before, username)? {
                            self.console.say(format!("Task marked as complete: {}", title))?;
                        }
                    }
                    None => self.console.say(format!("No task found with ID {}", shown))?,
                }
            }
        }
        read_or_quit!(self.console.pause());
        CONTINUE
    }

    /// Save `tasks`, reporting failure to the user and restoring `before` so
    /// memory keeps matching disk. Returns whether it saved.
    fn persist(
        &mut self,
        tasks: &mut TaskList,
        before: TaskList,
        username: &str,
    ) -> io::Result<bool> {
        let saved = TaskStore::new(self.backend.as_mut()).save(tasks, username);
        match saved {
            Ok(()) => Ok(true),
            Err(e) => {
                error!(
                    username,
                    error = %e,
                    location = %self.backend.location(),
                    "failed to save tasks"
                );
                self.console.say(format!("Failed to save tasks: {}", e))?;
                *tasks = before;
                Ok(false)
            }
        }
    }

    fn report(&mut self, what: &str, err: Error) -> Step {
        error!(error = %err, "{}", what);
        self.console.say(format!("{}: {}", what, err))?;
        CONTINUE
    }
}
