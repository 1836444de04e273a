//! # ChoreShare Core
//!
//! Chore distribution, rotation and group management on top of the
//! `choreshare-shared` data model.
//!
//! ## Modules
//!
//! - `engine`: pure randomize/rotate algorithms and their random source
//! - `orchestrator`: `ChoreDistributor`, which loads a group, runs the
//!   engine and persists the new assignments under a per-group lock
//! - `services`: group, role and chore management
//! - `lock`: per-group async exclusion
//! - `config`: environment-driven configuration
//! - `error`: service error type and external messages
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use choreshare_core::config::Config;
//! use choreshare_core::orchestrator::ChoreDistributor;
//! use choreshare_shared::db::{migrations::run_migrations, pool::create_pool};
//! use choreshare_shared::models::{GroupId, UserId};
//! use choreshare_shared::repository::PgRepository;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = Config::from_env()?;
//! choreshare_shared::telemetry::init_tracing(&config.log.filter, config.log.json)?;
//!
//! let pool = create_pool(config.database.clone()).await?;
//! run_migrations(&pool).await?;
//!
//! let distributor = ChoreDistributor::with_config(
//!     Arc::new(PgRepository::new(pool)),
//!     config.distributor.clone(),
//!     config.random_source(),
//! );
//! let diff = distributor.rotate(GroupId(1), UserId(1)).await?;
//! println!("{} chores changed hands", diff.changed);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod lock;
pub mod orchestrator;
pub mod services;

pub use error::{ServiceError, ServiceResult};
pub use orchestrator::{AssignmentDiff, ChoreDistributor};
