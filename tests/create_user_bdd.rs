//! BDD-style integration tests for the create-user command.
//!
//! These tests exercise the CLI-driven create-user workflow against a temporary
//! `SQLite` database, verifying both successful account creation and error
//! handling.

#![cfg(feature = "sqlite")]

use std::cell::RefCell;

use anyhow::{Context, Result, anyhow};
use ecg_community::{
    db::{self, establish_connection},
    server::{self, AppConfig, Cli, Commands, CreateUserArgs},
};
use rstest::fixture;
use rstest_bdd::{assert_step_err, assert_step_ok};
use rstest_bdd_macros::{given, scenarios, then, when};
use tempfile::TempDir;

#[derive(Debug, Clone)]
struct Email(String);

impl std::str::FromStr for Email {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> { Ok(Self(s.to_owned())) }
}

type CommandResult = Result<()>;

struct CreateUserWorld {
    _temp_dir: TempDir,
    config: RefCell<AppConfig>,
    outcome: RefCell<Option<CommandResult>>,
}

impl CreateUserWorld {
    fn new() -> Result<Self> {
        let temp_dir = TempDir::new().context("failed to create tempdir for test")?;
        let db_path = temp_dir.path().join("bdd.ecg.db");
        let config = AppConfig {
            database: db_path.to_string_lossy().into_owned(),
            bind: "127.0.0.1:0".to_owned(),
            argon2_m_cost: 8,
            argon2_t_cost: 1,
            argon2_p_cost: 1,
            ..AppConfig::default()
        };
        Ok(Self {
            _temp_dir: temp_dir,
            config: RefCell::new(config),
            outcome: RefCell::new(None),
        })
    }

    fn database_path(&self) -> String { self.config.borrow().database.clone() }

    async fn run_command(&self, email: Email, role: Option<String>) {
        let args = CreateUserArgs {
            email: Some(email.0),
            username: Some("Operator".to_owned()),
            password: Some("correct horse".to_owned()),
            role,
        };
        let cli = Cli {
            config: self.config.borrow().clone(),
            command: Some(Commands::CreateUser(args)),
        };
        let result = server::run_with_cli(cli).await;
        self.outcome.borrow_mut().replace(result);
    }

    async fn assert_role_held(&self, email: &Email, role: &str) -> Result<()> {
        let db = self.database_path();
        let mut conn = establish_connection(&db)
            .await
            .context("failed to establish db connection")?;
        let user = db::users::find_user_by_email(&mut conn, &email.0)
            .await
            .context("failed to query user")?
            .ok_or_else(|| anyhow!("expected account '{}' to exist", email.0))?;
        let roles: Vec<String> = db::users::roles_for_user(&mut conn, user.id)
            .await?
            .into_iter()
            .map(|r| r.name)
            .collect();
        if roles != [role] {
            return Err(anyhow!("expected only role '{role}', found {roles:?}"));
        }
        Ok(())
    }

    fn assert_failure_contains(&self, message: &str) {
        let outcome_ref = self.outcome.borrow();
        let Some(outcome) = outcome_ref.as_ref() else {
            panic!("command not executed");
        };
        let status = outcome.as_ref().map_err(ToString::to_string);
        let text = assert_step_err!(status);
        assert!(
            text.contains(message),
            "expected error to contain '{message}', got '{text}'"
        );
    }
}

#[fixture]
fn world() -> CreateUserWorld {
    let world = CreateUserWorld::new().unwrap_or_else(|err| {
        panic!("failed to create test world: {err}");
    });
    assert!(
        world.config.borrow().database.ends_with("bdd.ecg.db"),
        "fixture must create a temporary sqlite database"
    );
    world
}

#[given("a temporary sqlite database")]
fn given_temp_db(world: &CreateUserWorld) {
    let binding = world.database_path();
    let path = std::path::Path::new(&binding);
    assert!(path.parent().is_some());
}

#[given("server configuration bound to that database")]
fn given_config_bound(world: &CreateUserWorld) {
    let db_path = world.database_path();
    assert!(
        db_path.ends_with("bdd.ecg.db"),
        "temporary sqlite database path must end with bdd.ecg.db"
    );
}

#[when("the operator runs create-user with email \"{email}\" and role \"{role}\"")]
async fn when_run_with_role(world: &CreateUserWorld, email: Email, role: String) {
    world.run_command(email, Some(role)).await;
}

#[when("the operator runs create-user with email \"{email}\" and no role")]
async fn when_run_without_role(world: &CreateUserWorld, email: Email) {
    world.run_command(email, None).await;
}

#[then("the command completes successfully")]
fn then_success(world: &CreateUserWorld) {
    let outcome_ref = world.outcome.borrow();
    let Some(outcome) = outcome_ref.as_ref() else {
        panic!("command not executed");
    };
    let status = outcome.as_ref().map_err(ToString::to_string);
    assert_step_ok!(status);
}

#[then("the account \"{email}\" holds the role \"{role}\"")]
async fn then_role_held(world: &CreateUserWorld, email: Email, role: String) {
    if let Err(err) = world.assert_role_held(&email, &role).await {
        panic!("role check failed: {err}");
    }
}

#[then("the command fails with message \"{message}\"")]
fn then_failure(world: &CreateUserWorld, message: String) {
    world.assert_failure_contains(&message);
}

scenarios!(
    "tests/features/create_user_command.feature",
    runtime = "tokio-current-thread",
    fixtures = [world: CreateUserWorld]
);
