//! Arena of `project.pbxproj` objects.
//!
//! Objects refer to each other through [`ObjectRef`] indices. Each object
//! records its parent and a few hashable strings; its final 24-digit id is
//! derived from the hashables of every ancestor followed by its own, so the
//! same graph always yields the same ids.

use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;

use crate::error::GenError;
use crate::ids::{ensure_unique, object_id};

/// Index of an object in an [`ObjectArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectRef(usize);

/// Which object of a remote target an id refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteObject {
    /// The target itself.
    Target,
    /// The target's product file reference.
    Product,
}

/// A target living in another project file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RemoteTarget {
    /// Build file owning the other project.
    pub build_file: Utf8PathBuf,
    /// Target name within it.
    pub target_name: String,
    /// Object whose id is wanted.
    pub object: RemoteObject,
}

/// A property value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Plain string.
    Str(String),
    /// Reference to an object of the same arena.
    Ref(ObjectRef),
    /// Id of a target in another project, known only once that project's
    /// ids are computed.
    Remote(RemoteTarget),
    /// Ordered list.
    List(Vec<Value>),
    /// Dictionary, printed in key order.
    Dict(IndexMap<String, Value>),
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Str(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<ObjectRef> for Value {
    fn from(value: ObjectRef) -> Self {
        Self::Ref(value)
    }
}

/// One object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Object {
    /// Object class.
    pub isa: &'static str,
    /// Properties other than `isa`.
    pub props: IndexMap<String, Value>,
    parent: Option<ObjectRef>,
    hashables: Vec<String>,
}

impl Object {
    /// String value of `key`.
    #[must_use]
    pub fn str_prop(&self, key: &str) -> Option<&str> {
        match self.props.get(key) {
            Some(Value::Str(s)) => Some(s),
            _ => None,
        }
    }

    /// Objects referenced from the list property `key`.
    #[must_use]
    pub fn refs(&self, key: &str) -> Vec<ObjectRef> {
        match self.props.get(key) {
            Some(Value::List(items)) => items
                .iter()
                .filter_map(|v| match v {
                    Value::Ref(r) => Some(*r),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Objects of one project file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectArena {
    objects: Vec<Option<Object>>,
    ids: Vec<String>,
}

impl ObjectArena {
    /// Empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an object of class `isa` below `parent`.
    pub fn add<I, S>(&mut self, isa: &'static str, parent: Option<ObjectRef>, hashables: I) -> ObjectRef
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let r = ObjectRef(self.objects.len());
        self.objects.push(Some(Object {
            isa,
            props: IndexMap::new(),
            parent,
            hashables: std::iter::once(isa.to_owned())
                .chain(hashables.into_iter().map(Into::into))
                .collect(),
        }));
        r
    }

    /// Object behind `r`; `None` once removed.
    #[must_use]
    pub fn get(&self, r: ObjectRef) -> Option<&Object> {
        self.objects.get(r.0).and_then(Option::as_ref)
    }

    fn get_mut(&mut self, r: ObjectRef) -> Option<&mut Object> {
        self.objects.get_mut(r.0).and_then(Option::as_mut)
    }

    /// Class of `r`.
    #[must_use]
    pub fn isa(&self, r: ObjectRef) -> Option<&'static str> {
        self.get(r).map(|o| o.isa)
    }

    /// Move `r` below `parent`.
    pub fn set_parent(&mut self, r: ObjectRef, parent: ObjectRef) {
        if let Some(object) = self.get_mut(r) {
            object.parent = Some(parent);
        }
    }

    /// Drop `r`; references to it must already be gone.
    pub fn remove(&mut self, r: ObjectRef) {
        if let Some(slot) = self.objects.get_mut(r.0) {
            *slot = None;
        }
    }

    /// Parent of `r`.
    #[must_use]
    pub fn parent(&self, r: ObjectRef) -> Option<ObjectRef> {
        self.get(r).and_then(|o| o.parent)
    }

    /// Set `key` on `r`.
    pub fn set(&mut self, r: ObjectRef, key: &str, value: impl Into<Value>) {
        if let Some(object) = self.get_mut(r) {
            object.props.insert(key.to_owned(), value.into());
        }
    }

    /// Append to the list property `key`, creating it when absent.
    pub fn append(&mut self, r: ObjectRef, key: &str, value: impl Into<Value>) {
        self.insert_at(r, key, usize::MAX, value);
    }

    /// Insert into the list property `key` at `index` (clamped).
    pub fn insert_at(&mut self, r: ObjectRef, key: &str, index: usize, value: impl Into<Value>) {
        let Some(object) = self.get_mut(r) else {
            return;
        };
        let slot = object
            .props
            .entry(key.to_owned())
            .or_insert_with(|| Value::List(Vec::new()));
        if let Value::List(items) = slot {
            let at = index.min(items.len());
            items.insert(at, value.into());
        }
    }

    /// Replace the list property `key` with `refs`.
    pub fn set_refs(&mut self, r: ObjectRef, key: &str, refs: &[ObjectRef]) {
        self.set(r, key, Value::List(refs.iter().copied().map(Value::Ref).collect()));
    }

    /// Number of live objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.iter().flatten().count()
    }

    /// Whether the arena holds no live object.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every live object with its reference, in creation order.
    pub fn iter(&self) -> impl Iterator<Item = (ObjectRef, &Object)> {
        self.objects
            .iter()
            .enumerate()
            .filter_map(|(i, o)| o.as_ref().map(|o| (ObjectRef(i), o)))
    }

    /// Derive every object's id from its chain of hashables.
    pub fn compute_ids(&mut self) {
        self.ids = (0..self.objects.len())
            .map(|i| object_id(&self.seed_chain(ObjectRef(i))))
            .collect();
    }

    fn seed_chain(&self, r: ObjectRef) -> Vec<&str> {
        let mut lineage = Vec::new();
        let mut current = Some(r);
        while let Some(c) = current {
            let Some(object) = self.get(c) else {
                break;
            };
            lineage.push(object);
            current = object.parent;
        }
        lineage
            .iter()
            .rev()
            .flat_map(|o| o.hashables.iter().map(String::as_str))
            .collect()
    }

    /// Id of `r`; `None` before [`ObjectArena::compute_ids`] or once removed.
    #[must_use]
    pub fn id(&self, r: ObjectRef) -> Option<&str> {
        self.get(r)?;
        self.ids.get(r.0).map(String::as_str)
    }

    /// Check that computed ids are pairwise distinct.
    ///
    /// # Errors
    ///
    /// Returns [`GenError::IdCollision`] for the first duplicate.
    pub fn ensure_unique_ids(&self, file: &Utf8Path) -> Result<(), GenError> {
        ensure_unique(
            file,
            self.iter().filter_map(|(r, o)| {
                self.id(r)
                    .map(|id| (id.to_owned(), format!("{} {}", o.isa, self.comment(r))))
            }),
        )
    }

    /// Human-readable label printed next to references.
    #[must_use]
    pub fn comment(&self, r: ObjectRef) -> String {
        let Some(object) = self.get(r) else {
            return String::new();
        };
        let named = || {
            object
                .str_prop("name")
                .or_else(|| object.str_prop("path"))
                .unwrap_or(object.isa)
                .to_owned()
        };
        match object.isa {
            "PBXProject" => "Project object".to_owned(),
            "PBXSourcesBuildPhase" => "Sources".to_owned(),
            "PBXFrameworksBuildPhase" => "Frameworks".to_owned(),
            "PBXResourcesBuildPhase" => "Resources".to_owned(),
            "PBXShellScriptBuildPhase" => object.str_prop("name").unwrap_or("ShellScript").to_owned(),
            "PBXBuildFile" => {
                let file = match object.props.get("fileRef") {
                    Some(Value::Ref(f)) => self.comment(*f),
                    _ => String::new(),
                };
                let phase = object.parent.map(|p| self.comment(p)).unwrap_or_default();
                format!("{file} in {phase}")
            }
            "XCConfigurationList" => {
                let owner = object.parent.and_then(|p| self.get(p).map(|o| (p, o)));
                match owner {
                    Some((p, o)) => format!("Build configuration list for {} \"{}\"", o.isa, self.comment(p)),
                    None => "Build configuration list".to_owned(),
                }
            }
            "PBXContainerItemProxy" | "PBXTargetDependency" => object.isa.to_owned(),
            _ => named(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_depend_on_ancestry() {
        let mut arena = ObjectArena::new();
        let a = arena.add("PBXGroup", None, ["a"]);
        let b = arena.add("PBXGroup", None, ["b"]);
        let under_a = arena.add("PBXFileReference", Some(a), ["x.cc"]);
        let under_b = arena.add("PBXFileReference", Some(b), ["x.cc"]);
        arena.compute_ids();
        let (ia, ib) = (arena.id(under_a), arena.id(under_b));
        assert!(ia.is_some());
        assert_ne!(ia, ib);
        assert_eq!(ia.map(str::len), Some(24));
        arena.ensure_unique_ids(Utf8Path::new("p.pbxproj")).expect("distinct ids");
    }

    #[test]
    fn identical_siblings_collide() {
        let mut arena = ObjectArena::new();
        let group = arena.add("PBXGroup", None, ["g"]);
        arena.add("PBXFileReference", Some(group), ["same"]);
        arena.add("PBXFileReference", Some(group), ["same"]);
        arena.compute_ids();
        let err = arena
            .ensure_unique_ids(Utf8Path::new("p.pbxproj"))
            .expect_err("collision");
        assert!(matches!(err, GenError::IdCollision { .. }));
    }

    #[test]
    fn lists_insert_and_append() {
        let mut arena = ObjectArena::new();
        let target = arena.add("PBXNativeTarget", None, ["t"]);
        let first = arena.add("PBXSourcesBuildPhase", Some(target), Vec::<String>::new());
        let script = arena.add("PBXShellScriptBuildPhase", Some(target), ["Action \"gen\""]);
        arena.append(target, "buildPhases", first);
        arena.insert_at(target, "buildPhases", 0, script);
        let phases = arena.get(target).map(|o| o.refs("buildPhases")).unwrap_or_default();
        assert_eq!(phases, [script, first]);
    }

    #[test]
    fn removed_objects_disappear() {
        let mut arena = ObjectArena::new();
        let outer = arena.add("PBXGroup", None, ["outer"]);
        let inner = arena.add("PBXGroup", Some(outer), ["inner"]);
        let file = arena.add("PBXFileReference", Some(inner), ["a.cc"]);
        arena.set_parent(file, outer);
        arena.remove(inner);
        arena.compute_ids();
        assert_eq!(arena.len(), 2);
        assert_eq!(arena.parent(file), Some(outer));
        assert!(arena.id(inner).is_none());
        assert_eq!(arena.isa(file), Some("PBXFileReference"));
    }

    #[test]
    fn build_files_are_described_by_file_and_phase() {
        let mut arena = ObjectArena::new();
        let phase = arena.add("PBXSourcesBuildPhase", None, Vec::<String>::new());
        let file = arena.add("PBXFileReference", None, ["main.cc"]);
        arena.set(file, "path", "main.cc");
        let build = arena.add("PBXBuildFile", Some(phase), ["main.cc"]);
        arena.set(build, "fileRef", file);
        assert_eq!(arena.comment(build), "main.cc in Sources");
    }
}
