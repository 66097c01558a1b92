use std::fmt;
use std::rc::Rc;

use super::LoadFailure;
use crate::world::{BlocksetRef, WorldRef};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    World,
    Blockset,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ObjectKind::World => "world",
            ObjectKind::Blockset => "blockset",
        })
    }
}

/// A live object held by a pool.
#[derive(Clone)]
pub enum PoolObject {
    World(WorldRef),
    Blockset(BlocksetRef),
}

impl PoolObject {
    pub fn kind(&self) -> ObjectKind {
        match self {
            PoolObject::World(_) => ObjectKind::World,
            PoolObject::Blockset(_) => ObjectKind::Blockset,
        }
    }

    /// Identity comparison; two objects are the same only if they share storage.
    pub fn same_as(&self, other: &PoolObject) -> bool {
        match (self, other) {
            (PoolObject::World(a), PoolObject::World(b)) => Rc::ptr_eq(a, b),
            (PoolObject::Blockset(a), PoolObject::Blockset(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for PoolObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PoolObject::{:?}", self.kind())
    }
}

/// Typed access to one kind of pool object.
pub trait PoolItem: Clone + Sized {
    const KIND: ObjectKind;

    fn from_object(name: &str, object: PoolObject) -> Result<Self, LoadFailure>;
    fn into_object(self) -> PoolObject;
}

impl PoolItem for WorldRef {
    const KIND: ObjectKind = ObjectKind::World;

    fn from_object(name: &str, object: PoolObject) -> Result<Self, LoadFailure> {
        match object {
            PoolObject::World(world) => Ok(world),
            other => Err(LoadFailure::WrongKind {
                name: name.to_string(),
                expected: Self::KIND,
                found: other.kind(),
            }),
        }
    }

    fn into_object(self) -> PoolObject {
        PoolObject::World(self)
    }
}

impl PoolItem for BlocksetRef {
    const KIND: ObjectKind = ObjectKind::Blockset;

    fn from_object(name: &str, object: PoolObject) -> Result<Self, LoadFailure> {
        match object {
            PoolObject::Blockset(blockset) => Ok(blockset),
            other => Err(LoadFailure::WrongKind {
                name: name.to_string(),
                expected: Self::KIND,
                found: other.kind(),
            }),
        }
    }

    fn into_object(self) -> PoolObject {
        PoolObject::Blockset(self)
    }
}
