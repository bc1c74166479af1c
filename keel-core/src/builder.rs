use crate::{
    Arguments, AsValue, Association, Entity, EntityRef, Error, Identity, Instance, Instantiator,
    PersistentEntity, PersistentProperty, Relation, Result, Slot, Value, util::persisted_name,
};
use std::{
    any::{Any, TypeId},
    borrow::Cow,
    cell::RefCell,
    collections::HashSet,
    marker::PhantomData,
};

thread_local! {
    /// Entities being built on this thread, outermost first.
    static BUILDING: RefCell<Vec<TypeId>> = const { RefCell::new(Vec::new()) };
}

/// Declares one property of `T`.
///
/// The entity type is named up front (`Property::<Self>`) so that setters can
/// reach its fields.
///
/// ```
/// # use keel_core::{Entity, Property, PersistentEntity, Result};
/// #[derive(Default)]
/// struct Tag {
///     id: i32,
///     label: Option<String>,
/// }
/// impl Entity for Tag {
///     fn describe() -> Result<PersistentEntity> {
///         Self::builder("Tag")
///             .id(Property::<Self>::of::<i32>("id").set(|t, v| Ok(t.id = v.into_value()?)))
///             .property(
///                 Property::<Self>::of::<String>("label")
///                     .persisted("tag_label")
///                     .nullable()
///                     .set(|t, v| Ok(t.label = v.into_value()?)),
///             )
///             .default_instance()
///             .build()
///     }
/// }
/// let tag = Tag::describe().unwrap();
/// assert_eq!(tag.property("label").unwrap().persisted_name, "tag_label");
/// ```
pub struct Property<T> {
    name: &'static str,
    persisted_name: Option<Cow<'static, str>>,
    value: Value,
    nullable: bool,
    read_only: bool,
    association: Option<Association>,
    setter: Option<crate::Setter>,
    _entity: PhantomData<fn(&mut T)>,
}

impl<T: Entity> Property<T> {
    /// Scalar property with the given empty value as the declared type.
    pub fn new(name: &'static str, value: Value) -> Self {
        Self {
            name,
            persisted_name: None,
            value,
            nullable: false,
            read_only: false,
            association: None,
            setter: None,
            _entity: PhantomData,
        }
    }
    pub fn of<V: AsValue>(name: &'static str) -> Self {
        Self::new(name, V::as_empty_value())
    }
    pub fn association(name: &'static str, kind: Relation, target: EntityRef) -> Self {
        let mut result = Self::new(name, Value::Null);
        result.nullable = !kind.is_to_many();
        result.association = Some(Association {
            kind,
            target,
            owner: kind.default_owner(),
            alias: None,
            foreign_key: None,
        });
        result
    }
    pub fn many_to_one<E: Entity>(name: &'static str) -> Self {
        Self::association(name, Relation::ManyToOne, EntityRef::of::<E>())
    }
    pub fn one_to_one<E: Entity>(name: &'static str) -> Self {
        Self::association(name, Relation::OneToOne, EntityRef::of::<E>())
    }
    pub fn one_to_many<E: Entity>(name: &'static str) -> Self {
        Self::association(name, Relation::OneToMany, EntityRef::of::<E>())
    }
    pub fn many_to_many<E: Entity>(name: &'static str) -> Self {
        Self::association(name, Relation::ManyToMany, EntityRef::of::<E>())
    }
    pub fn embedded<E: Entity>(name: &'static str) -> Self {
        Self::association(name, Relation::Embedded, EntityRef::of::<E>())
    }

    pub fn persisted(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.persisted_name = Some(name.into());
        self
    }
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }
    pub fn required(mut self) -> Self {
        self.nullable = false;
        self
    }
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }
    /// Column prefix used when the association is fetch joined.
    pub fn alias(mut self, alias: impl Into<Cow<'static, str>>) -> Self {
        if let Some(association) = &mut self.association {
            association.alias = Some(alias.into());
        }
        self
    }
    pub fn owner(mut self, owner: bool) -> Self {
        if let Some(association) = &mut self.association {
            association.owner = owner;
        }
        self
    }
    pub fn foreign_key(mut self, column: impl Into<Cow<'static, str>>) -> Self {
        if let Some(association) = &mut self.association {
            association.foreign_key = Some(column.into());
        }
        self
    }
    pub fn set(mut self, setter: impl Fn(&mut T, Slot) -> Result<()> + Send + Sync + 'static) -> Self {
        let name = self.name;
        self.setter = Some(Box::new(move |instance: &mut (dyn Any + Send), slot| {
            let Some(instance) = instance.downcast_mut::<T>() else {
                return Err(Error::msg(format!(
                    "Cannot assign `{name}`, the instance is not a `{}`",
                    std::any::type_name::<T>()
                )));
            };
            setter(instance, slot)
        }));
        self
    }

    fn build(self) -> PersistentProperty {
        PersistentProperty {
            name: self.name,
            persisted_name: self
                .persisted_name
                .unwrap_or_else(|| persisted_name(self.name).into()),
            value: self.value,
            nullable: self.nullable,
            read_only: self.read_only,
            association: self.association,
            setter: self.setter,
        }
    }
}

/// Assembles and validates the [`PersistentEntity`] of `T`.
pub struct EntityBuilder<T: Entity> {
    name: &'static str,
    persisted_name: Option<Cow<'static, str>>,
    identities: Vec<Identity>,
    properties: Vec<PersistentProperty>,
    version: Vec<&'static str>,
    instantiator: Option<Instantiator>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> EntityBuilder<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            persisted_name: None,
            identities: Vec::new(),
            properties: Vec::new(),
            version: Vec::new(),
            instantiator: None,
            _entity: PhantomData,
        }
    }
    pub fn persisted(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.persisted_name = Some(name.into());
        self
    }
    pub fn id(mut self, property: Property<T>) -> Self {
        self.identities.push(Identity::Simple(property.build()));
        self
    }
    pub fn composite_id(mut self, properties: impl IntoIterator<Item = Property<T>>) -> Self {
        self.identities.push(Identity::Composite(
            properties.into_iter().map(Property::build).collect(),
        ));
        self
    }
    pub fn embedded_id(mut self, property: Property<T>) -> Self {
        self.identities.push(Identity::Embedded(property.build()));
        self
    }
    pub fn property(mut self, property: Property<T>) -> Self {
        self.properties.push(property.build());
        self
    }
    /// Optimistic locking counter, also a regular property.
    pub fn version(mut self, property: Property<T>) -> Self {
        self.version.push(property.name);
        self.properties.push(property.build());
        self
    }
    pub fn constructor(
        mut self,
        parameters: &[&'static str],
        create: impl Fn(Arguments) -> Result<T> + Send + Sync + 'static,
    ) -> Self {
        self.instantiator = Some(Instantiator::Constructor {
            parameters: parameters.to_vec(),
            create: Box::new(move |arguments| Ok(Box::new(create(arguments)?) as Instance)),
        });
        self
    }

    pub fn build(mut self) -> Result<PersistentEntity> {
        let name = self.name;
        let error = |message: String| Error::msg(format!("Invalid entity `{name}`: {message}"));
        if self.identities.len() > 1 {
            return Err(error(format!(
                "found {} conflicting identity declarations, only one is allowed",
                self.identities.len()
            )));
        }
        let identity = self.identities.pop();
        if let Some(identity) = &identity {
            match identity {
                Identity::Composite(v) if v.is_empty() => {
                    return Err(error("the composite identity has no properties".into()));
                }
                Identity::Embedded(v) if !v.is_embedded() => {
                    return Err(error(format!(
                        "the embedded identity `{}` must be an embedded association",
                        v.name
                    )));
                }
                Identity::Simple(..) | Identity::Composite(..) => {
                    if let Some(v) = identity.properties().iter().find(|v| v.is_association()) {
                        return Err(error(format!(
                            "the identity `{}` must be a scalar property",
                            v.name
                        )));
                    }
                }
                _ => {}
            }
        }
        let mut names = HashSet::new();
        for property in identity
            .iter()
            .flat_map(Identity::properties)
            .chain(self.properties.iter())
        {
            if !names.insert(property.name) {
                return Err(error(format!(
                    "the property `{}` is declared more than once",
                    property.name
                )));
            }
        }
        BUILDING.with_borrow_mut(|v| v.push(TypeId::of::<T>()));
        let mut joins = HashSet::new();
        let flattened = identity
            .iter()
            .flat_map(Identity::properties)
            .chain(self.properties.iter())
            .try_for_each(|v| join_names(v, None, &mut joins));
        BUILDING.with_borrow_mut(|v| v.pop());
        flattened.map_err(|e| error(format!("{e:#}")))?;
        if self.version.len() > 1 {
            return Err(error("more than one version property".into()));
        }
        let version = match self.version.first() {
            Some(v) => {
                let Some(i) = self.properties.iter().position(|p| p.name == *v) else {
                    return Err(error(format!("unknown version property `{v}`")));
                };
                if self.properties[i].is_association() {
                    return Err(error(format!("the version `{v}` must be a scalar property")));
                }
                Some(i)
            }
            None => None,
        };
        match &self.instantiator {
            None => {
                return Err(error(
                    "it declares neither a constructor nor a default instance".into(),
                ));
            }
            Some(Instantiator::Constructor { parameters, .. }) => {
                if let Some(missing) = parameters.iter().find(|v| !names.contains(*v)) {
                    return Err(error(format!(
                        "the constructor parameter `{missing}` does not match any property"
                    )));
                }
            }
            Some(Instantiator::Default(..)) => {
                if let Some(v) = identity
                    .iter()
                    .flat_map(Identity::properties)
                    .find(|v| !v.has_setter())
                {
                    return Err(error(format!(
                        "the identity `{}` needs a setter to be assigned on a default instance",
                        v.name
                    )));
                }
            }
        }
        let Some(instantiator) = self.instantiator else {
            return Err(error("missing instantiator".into()));
        };
        Ok(PersistentEntity {
            name,
            persisted_name: self
                .persisted_name
                .unwrap_or_else(|| persisted_name(name).into()),
            properties: self.properties,
            identity,
            version,
            instantiator,
        })
    }
}

impl<T: Entity + Default> EntityBuilder<T> {
    /// Instantiate through `Default`, then assign every property through its setter.
    pub fn default_instance(mut self) -> Self {
        self.instantiator = Some(Instantiator::Default(Box::new(|| {
            Box::new(T::default()) as Instance
        })));
        self
    }
}

/// Collects the names associations are joined by. Embedded values add the
/// associations they declare, which are keyed as if declared by the owner.
fn join_names(
    property: &PersistentProperty,
    through: Option<&str>,
    names: &mut HashSet<&'static str>,
) -> Result<()> {
    let Some(association) = &property.association else {
        return Ok(());
    };
    if !association.kind.is_embedded() {
        if !names.insert(property.name) {
            return Err(match through {
                Some(through) => Error::msg(format!(
                    "the association `{}` embedded in `{through}` collides with another association named `{}`",
                    property.name, property.name
                )),
                None => Error::msg(format!(
                    "the association `{}` collides with an embedded association of the same name",
                    property.name
                )),
            });
        }
        return Ok(());
    }
    let target = association.target;
    if BUILDING.with_borrow(|v| v.contains(&target.type_id())) {
        return Err(Error::msg(format!(
            "the embedded `{}` contains its owner `{}`",
            property.name,
            target.type_name()
        )));
    }
    let embedded = target.describe()?;
    let through = match through {
        Some(through) => format!("{through}.{}", property.name),
        None => property.name.to_string(),
    };
    embedded
        .properties()
        .iter()
        .try_for_each(|v| join_names(v, Some(&through), names))
}
