//! Cascading class roster filter for the college portal.
//!
//! Staff dashboards list students (or their submissions) under three linked
//! selections, year, branch and section. Each selection narrows the choices
//! offered by the others, and a selection the roster can no longer satisfy
//! is reset automatically. The same selections address notifications.

pub mod cascade;
pub mod config;
pub mod correction;
pub mod error;
pub mod filter;
pub mod fixture;
pub mod ids;
pub mod logging;
pub mod models;
pub mod notify;
pub mod options;
pub mod report;
pub mod session;
pub mod source;
pub mod target;
pub mod topology;
pub mod view;

pub use cascade::Cascade;
pub use error::{PortalError, Result};
pub use filter::FilterState;
pub use ids::{BranchId, Choice, Dimension, SectionId, YearId};
pub use source::{DataSource, FixtureDataSource, PortalSource, RemoteDataSource};
pub use view::RosterView;
