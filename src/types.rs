//! Core data structures for the module slicer.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Which source tree a parsed entity came from.
#[derive(
    Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize,
)]
pub enum Area {
    Kernel,
    Module,
}

impl Area {
    pub fn label(self) -> &'static str {
        match self {
            Area::Kernel => "kernel",
            Area::Module => "module",
        }
    }
}

/// Kind of a parsed C top-level construct.
#[derive(
    Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize,
)]
pub enum EntityKind {
    Macro,
    Typedef,
    Enum,
    Struct,
    Global,
    Declaration,
    Function,
}

impl EntityKind {
    /// Tiebreak priority within one emission round: macros first, function
    /// bodies last.
    pub fn emit_priority(self) -> u8 {
        match self {
            EntityKind::Macro => 1,
            EntityKind::Enum => 2,
            EntityKind::Typedef => 3,
            EntityKind::Struct => 4,
            EntityKind::Global => 5,
            EntityKind::Declaration => 6,
            EntityKind::Function => 7,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            EntityKind::Macro => "macro",
            EntityKind::Typedef => "typedef",
            EntityKind::Enum => "enum",
            EntityKind::Struct => "struct",
            EntityKind::Global => "global",
            EntityKind::Declaration => "declaration",
            EntityKind::Function => "function",
        }
    }
}

/// Process-unique opaque handle of an entity.
#[derive(
    Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize,
)]
pub struct EntityId(pub u32);

/// A parsed C top-level construct.
///
/// `code` is the exact text to emit (escrow placeholders included until
/// emission restores them). `ids` is the set of identifiers this entity
/// defines; `tags` is the text other entities' identifiers are searched in
/// when edges are discovered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub name: String,
    pub kind: EntityKind,
    pub area: Area,
    pub code: String,
    pub ids: BTreeSet<String>,
    pub tags: String,
}

impl Entity {
    /// Create an entity with the default derivations: `ids = {name}` and
    /// `tags = code`. Parsers override both where the kind needs it (enum
    /// constants, function bodies).
    pub fn new(id: EntityId, kind: EntityKind, area: Area, name: String, code: String) -> Self {
        let mut ids = BTreeSet::new();
        ids.insert(name.clone());
        let tags = code.clone();
        Entity {
            id,
            name,
            kind,
            area,
            code,
            ids,
            tags,
        }
    }
}

/// Allocates process-unique entity ids in parse order.
///
/// Each area gets its own id space so the two areas can be parsed (and
/// cached) independently without collisions.
#[derive(Debug)]
pub struct IdAllocator {
    next: u32,
}

impl IdAllocator {
    pub fn new(area: Area) -> Self {
        let base = match area {
            Area::Kernel => 0,
            Area::Module => 1 << 31,
        };
        IdAllocator { next: base }
    }

    pub fn next_id(&mut self) -> EntityId {
        let id = EntityId(self.next);
        self.next += 1;
        id
    }
}

/// All entities parsed from one area, grouped by kind.
///
/// Duplicate names within one kind follow the keep-first policy; `insert`
/// reports the rejection so the caller can warn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntitySet {
    pub area: Area,
    by_kind: BTreeMap<EntityKind, Vec<Entity>>,
}

impl EntitySet {
    pub fn new(area: Area) -> Self {
        EntitySet {
            area,
            by_kind: BTreeMap::new(),
        }
    }

    /// Insert an entity. Returns false (and drops the entity) when the name
    /// is already taken for this kind.
    pub fn insert(&mut self, entity: Entity) -> bool {
        debug_assert_eq!(entity.area, self.area);
        let list = self.by_kind.entry(entity.kind).or_default();
        if list.iter().any(|e| e.name == entity.name) {
            return false;
        }
        list.push(entity);
        true
    }

    /// Entities of one kind, in parse order.
    pub fn of_kind(&self, kind: EntityKind) -> &[Entity] {
        self.by_kind.get(&kind).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// All entities, grouped by kind, kinds in enum order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.by_kind.values().flat_map(|v| v.iter())
    }

    pub fn len(&self) -> usize {
        self.by_kind.values().map(|v| v.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind_count(&self, kind: EntityKind) -> usize {
        self.by_kind.get(&kind).map(|v| v.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(id: u32, kind: EntityKind, name: &str) -> Entity {
        Entity::new(
            EntityId(id),
            kind,
            Area::Module,
            name.to_string(),
            format!("code of {}", name),
        )
    }

    #[test]
    fn test_default_ids_and_tags() {
        let e = entity(1, EntityKind::Struct, "foo");
        assert!(e.ids.contains("foo"));
        assert_eq!(e.ids.len(), 1);
        assert_eq!(e.tags, "code of foo");
    }

    #[test]
    fn test_keep_first_duplicate_policy() {
        let mut set = EntitySet::new(Area::Module);
        assert!(set.insert(entity(1, EntityKind::Function, "dup")));
        assert!(!set.insert(entity(2, EntityKind::Function, "dup")));
        assert_eq!(set.kind_count(EntityKind::Function), 1);
        assert_eq!(set.of_kind(EntityKind::Function)[0].id, EntityId(1));
    }

    #[test]
    fn test_same_name_different_kind_coexists() {
        let mut set = EntitySet::new(Area::Module);
        assert!(set.insert(entity(1, EntityKind::Struct, "N")));
        assert!(set.insert(entity(2, EntityKind::Typedef, "N")));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_id_spaces_do_not_collide() {
        let mut kernel = IdAllocator::new(Area::Kernel);
        let mut module = IdAllocator::new(Area::Module);
        let k = kernel.next_id();
        let m = module.next_id();
        assert_ne!(k, m);
    }

    #[test]
    fn test_emit_priority_order() {
        assert!(EntityKind::Macro.emit_priority() < EntityKind::Enum.emit_priority());
        assert!(EntityKind::Enum.emit_priority() < EntityKind::Typedef.emit_priority());
        assert!(EntityKind::Typedef.emit_priority() < EntityKind::Struct.emit_priority());
        assert!(EntityKind::Struct.emit_priority() < EntityKind::Global.emit_priority());
        assert!(EntityKind::Global.emit_priority() < EntityKind::Declaration.emit_priority());
        assert!(EntityKind::Declaration.emit_priority() < EntityKind::Function.emit_priority());
    }
}
