//! # Validator Module
//!
//! Tag-driven field validation with an extensible rule registry.
//!
//! ## Overview
//!
//! Fields opt into validation with `#[puzzle(check = "...")]`. A check walks
//! the struct's fields in declaration order, parses each tag into rules
//! ([`parse_rules`]), looks every rule up in the registry and evaluates it
//! against the field's current [`Value`]. Each rule that returns `false`
//! produces one [`ValidationError`]; all rules of a field run even after one
//! fails, so a single pass reports the complete failure set.
//!
//! Fields without a tag carry no constraints and are skipped. Embedded structs
//! are checked as a single value; their own tags apply only when they are
//! checked directly.
//!
//! ## Default rules
//!
//! | Rule      | Argument | Passes when                                      |
//! |-----------|----------|--------------------------------------------------|
//! | `request` | -        | the value is not `None` or an empty collection   |
//! | `min`     | `u64`    | integer `>=` arg, or string length `>=` arg      |
//! | `max`     | `u64`    | integer `<=` arg, or string length `<=` arg      |
//! | `email`   | -        | string looks like an email address               |
//! | `uuid`    | -        | string is a canonical UUID                       |
//! | `fixed`   | `i64`    | string length equals arg                         |
//!
//! ## Thread Safety
//!
//! The registry is an `Arc<RwLock<HashMap>>`: checks take the read lock per
//! lookup, `register`/`unregister` take the write lock. Cloning a `Validator`
//! yields another handle to the same registry.
//!
//! ```rust
//! use puzzle::validator::Validator;
//! use puzzle::Reflect;
//!
//! #[derive(Debug, Clone, Reflect)]
//! pub struct Base {
//!     #[puzzle(check = "min=1,max=1000,request")]
//!     pub id: i64,
//! }
//!
//! let validator = Validator::with_default_rules();
//! let errors = validator.check(&Base { id: 0 }).unwrap();
//! assert_eq!(errors.rules(), vec!["min"]);
//! assert_eq!(errors.to_string(), "[min int id 0]");
//! ```

mod error;
mod parse;
pub mod rules;

pub use error::{ValidateError, ValidationError, ValidationErrors};
pub use parse::{parse_rules, Rule, ARG_SEPARATOR, RULE_SEPARATOR};

use crate::reflect::{Reflect, StructInfo, Value};
use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, warn};

/// A validation predicate: `(field value, rule argument) -> passed`.
pub type RuleFunc = Arc<dyn Fn(&Value<'_>, &str) -> bool + Send + Sync>;

/// Names of the rules installed by [`Validator::setup_default_rules`].
pub const DEFAULT_RULES: [&str; 6] = ["request", "min", "max", "email", "uuid", "fixed"];

/// Rule registry plus the checking entry points.
#[derive(Clone, Default)]
pub struct Validator {
    rules: Arc<RwLock<HashMap<String, RuleFunc>>>,
}

impl std::fmt::Debug for Validator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Validator")
            .field("rules", &self.rule_names())
            .finish()
    }
}

impl Validator {
    /// Create a validator with an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a validator with the default rules installed.
    pub fn with_default_rules() -> Self {
        let validator = Self::new();
        validator.setup_default_rules();
        validator
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, RuleFunc>> {
        self.rules.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, RuleFunc>> {
        self.rules.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Install (or overwrite) the default rules.
    pub fn setup_default_rules(&self) {
        self.register("request", rules::request);
        self.register("min", rules::min);
        self.register("max", rules::max);
        self.register("email", rules::email);
        self.register("uuid", rules::uuid);
        self.register("fixed", rules::fixed);
    }

    /// Insert or overwrite the rule under `name`.
    pub fn register<F>(&self, name: impl Into<String>, rule: F)
    where
        F: Fn(&Value<'_>, &str) -> bool + Send + Sync + 'static,
    {
        let name = name.into();
        let replaced = self.write().insert(name.clone(), Arc::new(rule)).is_some();
        debug!(rule = %name, replaced, "Validation rule registered");
    }

    /// Remove the rule under `name`; unknown names are ignored.
    pub fn unregister(&self, name: &str) {
        if self.write().remove(name).is_some() {
            debug!(rule = %name, "Validation rule unregistered");
        }
    }

    /// Fetch the rule registered under `name`.
    pub fn lookup(&self, name: &str) -> Result<RuleFunc, ValidateError> {
        self.read()
            .get(name)
            .map(Arc::clone)
            .ok_or_else(|| {
                warn!(rule = %name, "Validation rule not registered");
                ValidateError::RuleNotFound {
                    rule: name.to_string(),
                }
            })
    }

    /// Registered rule names, sorted.
    pub fn rule_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Check every tagged field of `value`.
    ///
    /// # Errors
    ///
    /// [`ValidateError::RuleNotFound`] if a tag names an unregistered rule.
    /// Failed rules are not errors; they are returned in the `Ok` list.
    pub fn check<T: Reflect>(&self, value: &T) -> Result<ValidationErrors, ValidateError> {
        self.check_dyn(&T::struct_info(), value)
    }

    /// Type-erased [`Validator::check`] against an explicit descriptor.
    ///
    /// # Errors
    ///
    /// [`ValidateError::InvalidArgument`] when `value` is not the struct `info`
    /// describes, plus everything [`Validator::check`] can return.
    pub fn check_dyn(
        &self,
        info: &StructInfo,
        value: &dyn Any,
    ) -> Result<ValidationErrors, ValidateError> {
        if Any::type_id(value) != info.type_id() {
            return Err(ValidateError::InvalidArgument {
                reason: format!("value must be a {}", info.name()),
            });
        }

        let mut errors = ValidationErrors::default();
        for field in info.fields() {
            let Some(tag) = field.check_tag().filter(|tag| !tag.trim().is_empty()) else {
                continue;
            };
            let current = field
                .value(value)
                .ok_or_else(|| ValidateError::InvalidArgument {
                    reason: format!("field {}.{} is unreadable", info.name(), field.name()),
                })?;
            for rule in parse_rules(tag) {
                let func = self.lookup(rule.name)?;
                if !func(&current, rule.arg_or_empty()) {
                    errors.push(ValidationError {
                        field: field.name().to_string(),
                        kind: field.kind(),
                        value: current.to_string(),
                        rule: rule.name.to_string(),
                    });
                }
            }
        }

        debug!(
            target_type = info.name(),
            failures = errors.len(),
            "Validation check completed"
        );
        Ok(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflect::Kind;
    use crate::Reflect;

    #[derive(Debug, Clone, Reflect)]
    struct Base {
        #[puzzle(check = "min=1,max=1000,request")]
        pub id: i64,
    }

    #[derive(Debug, Clone, Default, Reflect)]
    struct Untagged {
        pub id: i64,
        pub name: String,
    }

    #[derive(Debug, Clone, Default, Reflect)]
    struct Signup {
        #[puzzle(check = "request,min=1")]
        pub id: Option<u32>,
        #[puzzle(check = "email")]
        pub email: String,
        #[puzzle(check = "fixed=11")]
        pub phone: String,
        #[puzzle(check = "uuid")]
        pub(crate) token: String,
        #[puzzle(check = "request")]
        pub tags: Vec<String>,
    }

    #[test]
    fn test_default_rules_registered() {
        let validator = Validator::with_default_rules();
        let mut expected: Vec<String> =
            DEFAULT_RULES.iter().map(|s| s.to_string()).collect();
        expected.sort();
        assert_eq!(validator.rule_names(), expected);
        assert!(Validator::new().rule_names().is_empty());
    }

    #[test]
    fn test_base_zero_fails_only_min() {
        let validator = Validator::with_default_rules();
        let errors = validator.check(&Base { id: 0 }).unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0],
            ValidationError {
                field: "id".to_string(),
                kind: Kind::Int,
                value: "0".to_string(),
                rule: "min".to_string(),
            }
        );
        assert!(validator.check(&Base { id: 5 }).unwrap().is_empty());
    }

    #[test]
    fn test_untagged_struct_has_no_errors() {
        let validator = Validator::with_default_rules();
        assert!(validator.check(&Untagged::default()).unwrap().is_empty());
    }

    #[test]
    fn test_no_short_circuit_within_field() {
        let validator = Validator::with_default_rules();
        let errors = validator.check(&Signup::default()).unwrap();
        // id: None fails both request and min
        assert_eq!(
            errors.rules(),
            vec!["request", "min", "email", "fixed", "uuid", "request"]
        );
        assert_eq!(errors[0].value, "<nil>");
        assert_eq!(errors[0].kind, Kind::Option);
    }

    #[test]
    fn test_valid_signup() {
        let validator = Validator::with_default_rules();
        let signup = Signup {
            id: Some(3),
            email: "ada@puzzle.com".to_string(),
            phone: "18211627891".to_string(),
            token: "92e29510-dc3d-48eb-add2-eec39a29a9df".to_string(),
            tags: vec!["a".to_string()],
        };
        assert!(validator.check(&signup).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_rule_is_an_error() {
        let validator = Validator::new();
        let err = validator.check(&Base { id: 1 }).unwrap_err();
        assert_eq!(
            err,
            ValidateError::RuleNotFound {
                rule: "min".to_string()
            }
        );
    }

    #[test]
    fn test_register_overrides_and_unregister_removes() {
        let validator = Validator::with_default_rules();
        validator.register("min", |_: &Value<'_>, _: &str| true);
        assert!(validator.check(&Base { id: 0 }).unwrap().is_empty());

        validator.unregister("min");
        validator.unregister("min");
        assert!(matches!(
            validator.lookup("min"),
            Err(ValidateError::RuleNotFound { .. })
        ));
    }

    #[test]
    fn test_clones_share_registry() {
        let validator = Validator::new();
        let handle = validator.clone();
        handle.register("even", |v: &Value<'_>, _: &str| {
            matches!(v, Value::Int(n) if n % 2 == 0)
        });
        assert!(validator.lookup("even").is_ok());
    }

    #[test]
    fn test_check_dyn_rejects_mismatched_value() {
        let validator = Validator::with_default_rules();
        let err = validator
            .check_dyn(&Base::struct_info(), &Untagged::default())
            .unwrap_err();
        assert!(err.to_string().contains("value must be a Base"));
    }

    #[test]
    fn test_errors_display() {
        let validator = Validator::with_default_rules();
        let errors = validator.check(&Signup::default()).unwrap();
        let rendered = errors.to_string();
        assert!(rendered.starts_with("[request option id <nil>],[min option id <nil>]"));
    }
}
