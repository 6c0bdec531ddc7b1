//! Copy-plan compilation.
//!
//! A plan is compiled once per (source type, destination type) pair by walking
//! the destination's fields in declaration order and resolving each against the
//! source by name:
//!
//! 1. identical field types produce a direct assignment,
//! 2. convertible kinds ([`Kind::converts_to`]) produce a converting assignment,
//! 3. anything else is skipped, unless the destination field is embedded, in
//!    which case its own fields are matched against the source in place.
//!
//! Both sides follow promoted-field rules: the shallowest field with a name wins,
//! and two fields sharing a name at the same embedding depth are ambiguous. An
//! ambiguous source name matches nothing, and an ambiguous destination name is
//! never written.

use super::CopyError;
use crate::reflect::{
    AssignFn, FieldInfo, Getter, GetterMut, Kind, ReadFn, StructInfo, WriteFn,
};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;

#[derive(Clone, Copy)]
struct DestStep {
    name: &'static str,
    get_mut: GetterMut,
}

#[derive(Clone, Copy)]
struct SourceStep {
    name: &'static str,
    get: Getter,
}

#[derive(Clone, Copy)]
enum Transform {
    Assign(AssignFn),
    Convert { read: ReadFn, write: WriteFn },
}

/// One field-level copy operation.
#[derive(Clone)]
pub struct CopyAction {
    dest: Vec<DestStep>,
    source: Vec<SourceStep>,
    transform: Transform,
    from: Kind,
    to: Kind,
}

fn join<'a>(names: impl Iterator<Item = &'a str>) -> String {
    names.collect::<Vec<_>>().join(".")
}

impl CopyAction {
    /// Dotted destination path, e.g. `base.name` for a field inside an embedded struct.
    pub fn dest_path(&self) -> String {
        join(self.dest.iter().map(|s| s.name))
    }

    pub fn source_path(&self) -> String {
        join(self.source.iter().map(|s| s.name))
    }

    pub fn is_conversion(&self) -> bool {
        matches!(self.transform, Transform::Convert { .. })
    }

    pub fn from_kind(&self) -> Kind {
        self.from
    }

    pub fn to_kind(&self) -> Kind {
        self.to
    }

    pub(crate) fn apply(&self, dest: &mut dyn Any, src: &dyn Any) -> Result<(), CopyError> {
        let mut target = dest;
        for step in &self.dest {
            target = (step.get_mut)(target).ok_or_else(|| self.unreachable_path())?;
        }
        let mut source = src;
        for step in &self.source {
            source = (step.get)(source).ok_or_else(|| self.unreachable_path())?;
        }
        let applied = match self.transform {
            Transform::Assign(assign) => assign(target, source),
            Transform::Convert { read, write } => {
                read(source).is_some_and(|value| write(target, &value))
            }
        };
        if applied {
            Ok(())
        } else {
            Err(CopyError::Conversion {
                field: self.dest_path(),
                from: self.from,
                to: self.to,
            })
        }
    }

    fn unreachable_path(&self) -> CopyError {
        CopyError::InvalidArgument {
            reason: format!(
                "field path {} <- {} does not resolve on the given values",
                self.dest_path(),
                self.source_path()
            ),
        }
    }
}

impl fmt::Debug for CopyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CopyAction")
            .field("dest", &self.dest_path())
            .field("source", &self.source_path())
            .field("conversion", &self.is_conversion())
            .field("from", &self.from)
            .field("to", &self.to)
            .finish()
    }
}

/// Ordered, immutable list of copy actions for one type pair.
#[derive(Debug, Clone)]
pub struct CopyPlan {
    source: TypeId,
    dest: TypeId,
    source_name: &'static str,
    dest_name: &'static str,
    actions: Vec<CopyAction>,
}

impl CopyPlan {
    /// Compile the plan copying `source` values into `dest` values.
    pub fn compile(source: &StructInfo, dest: &StructInfo) -> Self {
        let mut actions = Vec::new();
        let promoted = promoted_names(dest);
        compile_into(source, dest, 0, &promoted, &mut Vec::new(), &mut actions);
        Self {
            source: source.type_id(),
            dest: dest.type_id(),
            source_name: source.name(),
            dest_name: dest.name(),
            actions,
        }
    }

    pub fn source_type(&self) -> TypeId {
        self.source
    }

    pub fn dest_type(&self) -> TypeId {
        self.dest
    }

    pub fn source_name(&self) -> &'static str {
        self.source_name
    }

    pub fn dest_name(&self) -> &'static str {
        self.dest_name
    }

    pub fn actions(&self) -> &[CopyAction] {
        &self.actions
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// Shallowest embedding depth of every destination field name, with the number
/// of fields carrying that name at that depth.
fn promoted_names(dest: &StructInfo) -> HashMap<&'static str, (usize, usize)> {
    let mut names: HashMap<&'static str, (usize, usize)> = HashMap::new();
    let mut frontier = vec![dest.clone()];
    let mut depth = 0;
    while !frontier.is_empty() {
        let mut next = Vec::new();
        for info in &frontier {
            for field in info.fields() {
                let (shallowest, count) = names.entry(field.name()).or_insert((depth, 0));
                if *shallowest == depth {
                    *count += 1;
                }
                if let Some(inner) = field.embedded() {
                    next.push(inner);
                }
            }
        }
        frontier = next;
        depth += 1;
    }
    names
}

fn compile_into(
    source: &StructInfo,
    dest: &StructInfo,
    depth: usize,
    promoted: &HashMap<&'static str, (usize, usize)>,
    prefix: &mut Vec<DestStep>,
    actions: &mut Vec<CopyAction>,
) {
    for field in dest.fields() {
        // Shadowed by a shallower field, or ambiguous at this depth.
        if promoted.get(field.name()) != Some(&(depth, 1)) {
            continue;
        }
        let Some(writer) = field.writer() else {
            continue;
        };
        let step = DestStep {
            name: field.name(),
            get_mut: writer.get_mut,
        };
        let resolved = find_source(source, field.name()).and_then(|(path, matched)| {
            transform_for(&matched, field)
                .map(|transform| (path, matched.kind(), transform))
        });
        match resolved {
            Some((path, from, transform)) => {
                let mut dest_path = prefix.clone();
                dest_path.push(step);
                actions.push(CopyAction {
                    dest: dest_path,
                    source: path,
                    transform,
                    from,
                    to: field.kind(),
                });
            }
            None => {
                if let Some(inner) = field.embedded() {
                    prefix.push(step);
                    compile_into(source, &inner, depth + 1, promoted, prefix, actions);
                    prefix.pop();
                }
            }
        }
    }
}

fn transform_for(source: &FieldInfo, dest: &FieldInfo) -> Option<Transform> {
    let writer = dest.writer()?;
    if source.type_id() == dest.type_id() {
        Some(Transform::Assign(writer.assign))
    } else if source.kind().converts_to(dest.kind()) {
        Some(Transform::Convert {
            read: source.reader().read,
            write: writer.write,
        })
    } else {
        None
    }
}

/// Resolve `name` on `source`, descending breadth-first through embedded fields.
fn find_source(source: &StructInfo, name: &str) -> Option<(Vec<SourceStep>, FieldInfo)> {
    let mut frontier: Vec<(Vec<SourceStep>, StructInfo)> = vec![(Vec::new(), source.clone())];
    while !frontier.is_empty() {
        let mut found = Vec::new();
        let mut next = Vec::new();
        for (path, info) in &frontier {
            for field in info.fields() {
                let mut field_path = path.clone();
                field_path.push(SourceStep {
                    name: field.name(),
                    get: field.reader().get,
                });
                if field.name() == name {
                    found.push((field_path, field.clone()));
                } else if let Some(inner) = field.embedded() {
                    next.push((field_path, inner));
                }
            }
        }
        match found.len() {
            0 => frontier = next,
            1 => {
                return found
                    .pop()
                    .filter(|(_, field)| field.is_exported());
            }
            _ => return None,
        }
    }
    None
}
