//! Cloud Console Core Library
//!
//! Provides the page logic of an OpenStack-style console, including:
//! - An observable per-collection resource store (`ResourceStore`)
//! - List page controller (search, paging, selection, actions)
//! - Detail page controller (primary record, auxiliary record, tabs, cards)
//! - Composite form fields with local state (`FieldBinding`)
//! - Modal form actions (`ModalAction`, `ModalSession`)
//!
//! The crate has no UI. Controllers produce serializable view models, and
//! permissions and routing are abstracted through traits.

pub mod action;
pub mod config;
pub mod context;
pub mod detail_view;
pub mod error;
pub mod form;
pub mod guard;
pub mod list_view;
pub mod store;
pub mod traits;
pub mod types;

#[cfg(test)]
mod test_utils;

// Re-export common types
pub use action::{ActionConfigs, ActionSet, ModalAction, ModalOutcome, ModalSession};
pub use config::ConsoleConfig;
pub use context::{ConsoleContext, PageContext};
pub use detail_view::{DetailPageConfig, DetailPhase, DetailViewController};
pub use error::{CoreError, CoreResult, ErrorKind};
pub use form::{BindingSpec, FieldBinding, FieldSpec, FormModel};
pub use list_view::{ListPageConfig, ListStatus, ListViewController};
pub use store::{ResourceStore, StoreEvent};
pub use traits::{PermissionOracle, RouteTable, Router, StaticPermissions};
