//! # Copier Module
//!
//! Struct-to-struct field copying driven by derived [`Reflect`] descriptors.
//!
//! ## Overview
//!
//! A [`Copier`] wraps a compiled [`CopyPlan`] for one (source, destination)
//! type pair. Every exported destination field with a same-named exported
//! source field is copied, either by direct assignment (identical types) or by
//! conversion (numeric widening/narrowing, `String` <-> `Vec<u8>`). Fields
//! without a usable match keep whatever value they had before the copy.
//!
//! Plans are pure data and are shared through a [`CopierCache`], keyed by the
//! [`TypePair`], with a TTL and a capacity bound.
//!
//! ```rust
//! use puzzle::copier::CopierCache;
//! use puzzle::Reflect;
//!
//! #[derive(Debug, Clone, Default, Reflect)]
//! pub struct UserRow {
//!     pub id: i64,
//!     pub name: String,
//!     pub password_hash: String,
//! }
//!
//! #[derive(Debug, Clone, Default, Reflect)]
//! pub struct UserView {
//!     pub id: f64,
//!     pub name: String,
//!     pub role: String,
//! }
//!
//! let cache = CopierCache::default();
//! let row = UserRow { id: 3, name: "ada".into(), password_hash: "x".into() };
//! let mut view = UserView { role: "admin".into(), ..Default::default() };
//! cache.copy(&mut view, &row).unwrap();
//! assert_eq!(view.id, 3.0);
//! assert_eq!(view.name, "ada");
//! assert_eq!(view.role, "admin");
//! ```

mod cache;
mod plan;

pub use cache::{CopierCache, TypePair};
pub use plan::{CopyAction, CopyPlan};

use crate::reflect::{Kind, Reflect, StructInfo};
use std::any::{Any, TypeId};
use std::fmt;
use tracing::debug;

/// Error returned when a copy cannot be carried out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopyError {
    /// The values passed do not match the types the plan was compiled for.
    InvalidArgument { reason: String },
    /// A converting assignment could not produce a destination value.
    Conversion { field: String, from: Kind, to: Kind },
}

impl fmt::Display for CopyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CopyError::InvalidArgument { reason } => {
                write!(f, "[copier] invalid argument: {}", reason)
            }
            CopyError::Conversion { field, from, to } => {
                write!(
                    f,
                    "[copier] cannot convert field '{}' from {} to {}",
                    field, from, to
                )
            }
        }
    }
}

impl std::error::Error for CopyError {}

/// Copies fields between two fixed struct types.
#[derive(Debug, Clone)]
pub struct Copier {
    plan: CopyPlan,
}

impl Copier {
    /// Compile a copier from `S` values into `D` values.
    pub fn new<S: Reflect, D: Reflect>() -> Self {
        Self::from_info(&S::struct_info(), &D::struct_info())
    }

    /// Compile a copier from explicit descriptors.
    pub fn from_info(source: &StructInfo, dest: &StructInfo) -> Self {
        let plan = CopyPlan::compile(source, dest);
        debug!(
            source = plan.source_name(),
            dest = plan.dest_name(),
            actions = plan.len(),
            "Copy plan compiled"
        );
        Self { plan }
    }

    pub fn plan(&self) -> &CopyPlan {
        &self.plan
    }

    /// Copy every planned field of `src` into `dest`.
    ///
    /// Fields not covered by the plan are left untouched.
    ///
    /// # Errors
    ///
    /// Actions run in plan order and are not rolled back. When a converting
    /// assignment fails with [`CopyError::Conversion`] (a [`Field`] type whose
    /// `from_value` rejects the value), fields planned before it have already
    /// been written and fields after it keep their previous values.
    ///
    /// [`Field`]: crate::reflect::Field
    pub fn copy<D: Reflect, S: Reflect>(&self, dest: &mut D, src: &S) -> Result<(), CopyError> {
        self.copy_dyn(dest, src)
    }

    /// Type-erased [`Copier::copy`]; fails with [`CopyError::InvalidArgument`]
    /// when the values are not of the plan's types.
    pub fn copy_dyn(&self, dest: &mut dyn Any, src: &dyn Any) -> Result<(), CopyError> {
        self.expect_type(
            "destination",
            Any::type_id(&*dest),
            self.plan.dest_type(),
            self.plan.dest_name(),
        )?;
        self.expect_type(
            "source",
            Any::type_id(src),
            self.plan.source_type(),
            self.plan.source_name(),
        )?;
        for action in self.plan.actions() {
            action.apply(dest, src)?;
        }
        Ok(())
    }

    fn expect_type(
        &self,
        role: &str,
        found: TypeId,
        expected: TypeId,
        expected_name: &str,
    ) -> Result<(), CopyError> {
        if found == expected {
            Ok(())
        } else {
            Err(CopyError::InvalidArgument {
                reason: format!("{} must be a {}", role, expected_name),
            })
        }
    }
}

/// Copy a slice of `S` into a new vector of `D`, one default-initialised `D`
/// per element, compiling the plan once.
pub fn copy_slice<S: Reflect, D: Reflect + Default>(src: &[S]) -> Result<Vec<D>, CopyError> {
    if src.is_empty() {
        debug!("Copy of empty slice skipped");
        return Ok(Vec::new());
    }
    let copier = Copier::new::<S, D>();
    copy_each(&copier, src)
}

fn copy_each<S: Reflect, D: Reflect + Default>(
    copier: &Copier,
    src: &[S],
) -> Result<Vec<D>, CopyError> {
    src.iter()
        .map(|item| {
            let mut out = D::default();
            copier.copy(&mut out, item)?;
            Ok(out)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Reflect;

    #[derive(Debug, Clone, Default, PartialEq, Reflect)]
    struct Name {
        pub name: String,
    }

    #[derive(Debug, Clone, Default, PartialEq, Reflect)]
    struct Account {
        #[puzzle(embed)]
        pub base: Name,
        pub id: u64,
        pub email: String,
        pub score: i32,
        pub tags: Vec<String>,
        pub(crate) internal: u32,
    }

    #[derive(Debug, Clone, Default, PartialEq, Reflect)]
    struct AccountView {
        pub name: String,
        pub id: i64,
        pub score: f64,
        pub tags: Vec<String>,
        pub email: Vec<u8>,
        pub internal: u32,
        pub untouched: String,
    }

    fn account() -> Account {
        Account {
            base: Name {
                name: "ada".to_string(),
            },
            id: 9,
            email: "ada@puzzle.com".to_string(),
            score: -3,
            tags: vec!["x".to_string()],
            internal: 42,
        }
    }

    #[test]
    fn test_plan_follows_destination_order() {
        let copier = Copier::new::<Account, AccountView>();
        let plan = copier.plan();
        let dests: Vec<_> = plan.actions().iter().map(CopyAction::dest_path).collect();
        assert_eq!(dests, vec!["name", "id", "score", "tags", "email"]);
        let sources: Vec<_> = plan
            .actions()
            .iter()
            .map(CopyAction::source_path)
            .collect();
        assert_eq!(sources, vec!["base.name", "id", "score", "tags", "email"]);
        let conversions: Vec<_> = plan
            .actions()
            .iter()
            .map(CopyAction::is_conversion)
            .collect();
        assert_eq!(conversions, vec![false, true, true, false, true]);
    }

    #[test]
    fn test_copy_assigns_and_converts() {
        let copier = Copier::new::<Account, AccountView>();
        let mut view = AccountView {
            internal: 1,
            untouched: "keep".to_string(),
            ..Default::default()
        };
        copier.copy(&mut view, &account()).unwrap();
        assert_eq!(view.name, "ada");
        assert_eq!(view.id, 9);
        assert_eq!(view.score, -3.0);
        assert_eq!(view.tags, vec!["x".to_string()]);
        assert_eq!(view.email, b"ada@puzzle.com".to_vec());
        // source field is not exported
        assert_eq!(view.internal, 1);
        assert_eq!(view.untouched, "keep");
    }

    #[test]
    fn test_copy_dyn_rejects_wrong_types() {
        let copier = Copier::new::<Account, AccountView>();
        let mut wrong = Name::default();
        let err = copier.copy_dyn(&mut wrong, &account()).unwrap_err();
        assert!(matches!(err, CopyError::InvalidArgument { .. }));
        assert!(err.to_string().contains("destination must be a AccountView"));

        let mut view = AccountView::default();
        let err = copier.copy_dyn(&mut view, &5u32).unwrap_err();
        assert!(err.to_string().contains("source must be a Account"));
    }

    #[test]
    fn test_copy_slice() {
        let empty: Vec<AccountView> = copy_slice::<Account, AccountView>(&[]).unwrap();
        assert!(empty.is_empty());

        let accounts = vec![account(), Account { id: 2, ..account() }];
        let views: Vec<AccountView> = copy_slice(&accounts).unwrap();
        assert_eq!(views.len(), 2);
        assert_eq!(views[0].id, 9);
        assert_eq!(views[1].id, 2);
    }
}
