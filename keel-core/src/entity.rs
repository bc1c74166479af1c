use crate::{Arguments, EntityBuilder, EntityRegistry, Instance, PersistentProperty, Result};
use std::{
    any::{self, Any, TypeId},
    borrow::Cow,
    fmt, slice,
    sync::Arc,
};

/// A mapped record type with an identity (or an embeddable value group without one).
///
/// Implementations describe themselves once, the result is cached by the [`EntityRegistry`].
/// `describe` must not resolve other entities: associations refer to their targets
/// through an [`EntityRef`] that is resolved lazily. Embedded values are the exception,
/// [`EntityBuilder::build`] describes them to check the joins they contribute.
pub trait Entity: Any + Send + Sized {
    fn describe() -> Result<PersistentEntity>;

    /// Metadata from the process wide registry.
    fn persistent_entity() -> Result<Arc<PersistentEntity>> {
        EntityRegistry::global().get::<Self>()
    }

    fn builder(name: &'static str) -> EntityBuilder<Self> {
        EntityBuilder::new(name)
    }
}

/// Lazily resolved handle to the metadata of an entity type.
#[derive(Clone, Copy)]
pub struct EntityRef {
    type_id: fn() -> TypeId,
    type_name: fn() -> &'static str,
    describe: fn() -> Result<PersistentEntity>,
}

impl EntityRef {
    pub fn of<T: Entity>() -> Self {
        Self {
            type_id: TypeId::of::<T>,
            type_name: any::type_name::<T>,
            describe: T::describe,
        }
    }
    pub fn type_id(&self) -> TypeId {
        (self.type_id)()
    }
    pub fn type_name(&self) -> &'static str {
        (self.type_name)()
    }
    pub fn describe(&self) -> Result<PersistentEntity> {
        (self.describe)()
    }
}

impl PartialEq for EntityRef {
    fn eq(&self, other: &Self) -> bool {
        self.type_id() == other.type_id()
    }
}

impl fmt::Debug for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EntityRef").field(&self.type_name()).finish()
    }
}

/// The property (or properties) uniquely identifying an entity instance.
#[derive(Debug)]
pub enum Identity {
    /// Single scalar property.
    Simple(PersistentProperty),
    /// Set of scalar properties.
    Composite(Vec<PersistentProperty>),
    /// Embedded association whose embeddable holds the key columns.
    Embedded(PersistentProperty),
}

impl Identity {
    pub fn properties(&self) -> &[PersistentProperty] {
        match self {
            Identity::Simple(v) | Identity::Embedded(v) => slice::from_ref(v),
            Identity::Composite(v) => v,
        }
    }
}

pub type Constructor = Box<dyn Fn(Arguments) -> Result<Instance> + Send + Sync>;
pub type Factory = Box<dyn Fn() -> Instance + Send + Sync>;

/// How instances of an entity come to life.
pub enum Instantiator {
    /// Parameterized initializer, every parameter names a property.
    Constructor {
        parameters: Vec<&'static str>,
        create: Constructor,
    },
    /// Empty instance first, then properties assigned through their setters.
    Default(Factory),
}

impl fmt::Debug for Instantiator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instantiator::Constructor { parameters, .. } => f
                .debug_struct("Constructor")
                .field("parameters", parameters)
                .finish_non_exhaustive(),
            Instantiator::Default(..) => f.write_str("Default"),
        }
    }
}

/// Position of a property inside its entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyIndex {
    Identity(usize),
    Property(usize),
}

/// Metadata of one entity type.
#[derive(Debug)]
pub struct PersistentEntity {
    pub(crate) name: &'static str,
    pub(crate) persisted_name: Cow<'static, str>,
    pub(crate) properties: Vec<PersistentProperty>,
    pub(crate) identity: Option<Identity>,
    pub(crate) version: Option<usize>,
    pub(crate) instantiator: Instantiator,
}

impl PersistentEntity {
    pub fn name(&self) -> &'static str {
        self.name
    }
    pub fn persisted_name(&self) -> &str {
        &self.persisted_name
    }
    /// Every property except the identity ones, in declaration order.
    pub fn properties(&self) -> &[PersistentProperty] {
        &self.properties
    }
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }
    pub fn version(&self) -> Option<&PersistentProperty> {
        self.version.map(|i| &self.properties[i])
    }
    pub fn associations(&self) -> impl Iterator<Item = &PersistentProperty> {
        self.properties.iter().filter(|v| v.association.is_some())
    }
    pub fn instantiator(&self) -> &Instantiator {
        &self.instantiator
    }
    /// Value groups have no identity, their columns live inside the owner.
    pub fn is_embeddable(&self) -> bool {
        self.identity.is_none()
    }
    pub fn find(&self, name: &str) -> Option<PropertyIndex> {
        if let Some(i) = self
            .identity
            .iter()
            .flat_map(Identity::properties)
            .position(|v| v.name == name)
        {
            return Some(PropertyIndex::Identity(i));
        }
        self.properties
            .iter()
            .position(|v| v.name == name)
            .map(PropertyIndex::Property)
    }
    pub fn property_at(&self, index: PropertyIndex) -> &PersistentProperty {
        match index {
            PropertyIndex::Identity(i) => &self.identity.as_ref().map_or(&[][..], Identity::properties)[i],
            PropertyIndex::Property(i) => &self.properties[i],
        }
    }
    /// Looks up a property by name, identity properties included.
    pub fn property(&self, name: &str) -> Option<&PersistentProperty> {
        self.find(name).map(|i| self.property_at(i))
    }
    pub fn is_identity(&self, name: &str) -> bool {
        matches!(self.find(name), Some(PropertyIndex::Identity(..)))
    }
}
