use crate::{DataType, EntityRef, Error, PersistentEntity, Result, Slot, Value};
use std::{any::Any, borrow::Cow, fmt};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    OneToOne,
    OneToMany,
    ManyToOne,
    ManyToMany,
    /// Value group stored in the owner's own columns.
    Embedded,
}

impl Relation {
    pub fn is_to_many(&self) -> bool {
        matches!(self, Relation::OneToMany | Relation::ManyToMany)
    }
    pub fn is_embedded(&self) -> bool {
        *self == Relation::Embedded
    }
    /// Whether the foreign key lives on this side by default.
    pub fn default_owner(&self) -> bool {
        matches!(self, Relation::OneToOne | Relation::ManyToOne)
    }
}

#[derive(Debug, Clone)]
pub struct Association {
    pub kind: Relation,
    pub target: EntityRef,
    /// The owning side holds the foreign key column(s).
    pub owner: bool,
    /// Column prefix of the joined target.
    pub alias: Option<Cow<'static, str>>,
    /// Foreign key column, when different from `<property>_<target identity>`.
    pub foreign_key: Option<Cow<'static, str>>,
}

impl Association {
    /// Owning, non embedded, to-one side.
    pub fn holds_foreign_key(&self) -> bool {
        self.owner && !self.kind.is_to_many() && !self.kind.is_embedded()
    }
}

pub type Setter = Box<dyn Fn(&mut (dyn Any + Send), Slot) -> Result<()> + Send + Sync>;

pub struct PersistentProperty {
    pub name: &'static str,
    pub persisted_name: Cow<'static, str>,
    /// Empty value of the declared type, `Value::Null` for associations.
    pub value: Value,
    pub nullable: bool,
    pub read_only: bool,
    pub association: Option<Association>,
    pub(crate) setter: Option<Setter>,
}

impl PersistentProperty {
    pub fn data_type(&self) -> DataType {
        if self.association.is_some() {
            DataType::Entity
        } else {
            self.value.data_type()
        }
    }
    pub fn is_association(&self) -> bool {
        self.association.is_some()
    }
    pub fn is_embedded(&self) -> bool {
        self.association
            .as_ref()
            .is_some_and(|v| v.kind.is_embedded())
    }
    pub fn has_setter(&self) -> bool {
        self.setter.is_some()
    }
    /// Column prefix of a fetch joined association, `<persisted>_` unless aliased.
    pub fn default_alias(&self) -> Cow<'static, str> {
        match self.association.as_ref().and_then(|v| v.alias.clone()) {
            Some(alias) => alias,
            None => format!("{}_", self.persisted_name).into(),
        }
    }
    pub fn set(&self, instance: &mut (dyn Any + Send), slot: Slot) -> Result<()> {
        let Some(setter) = &self.setter else {
            return Err(Error::msg(format!(
                "Property `{}` cannot be assigned, it has no setter",
                self.name
            )));
        };
        setter(instance, slot)
    }
}

impl fmt::Debug for PersistentProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistentProperty")
            .field("name", &self.name)
            .field("persisted_name", &self.persisted_name)
            .field("value", &self.value)
            .field("nullable", &self.nullable)
            .field("read_only", &self.read_only)
            .field("association", &self.association)
            .field("setter", &self.setter.is_some())
            .finish()
    }
}

/// Key columns of `entity`, relative to the entity's own column prefix.
///
/// Embedded identities contribute one column per scalar of the embeddable,
/// named `<identity>_<component>`.
pub fn identity_columns(
    entity: &PersistentEntity,
    embeddable: Option<&PersistentEntity>,
) -> Result<Vec<(String, Value)>> {
    let Some(identity) = entity.identity() else {
        return Err(Error::msg(format!(
            "Entity `{}` has no identity",
            entity.name()
        )));
    };
    match identity {
        crate::Identity::Simple(id) => Ok(vec![(id.persisted_name.to_string(), id.value.clone())]),
        crate::Identity::Composite(ids) => Ok(ids
            .iter()
            .map(|v| (v.persisted_name.to_string(), v.value.clone()))
            .collect()),
        crate::Identity::Embedded(id) => {
            let Some(embeddable) = embeddable else {
                return Err(Error::msg(format!(
                    "The embedded identity `{}` of `{}` was not resolved",
                    id.name,
                    entity.name()
                )));
            };
            embeddable
                .properties()
                .iter()
                .map(|v| {
                    if v.is_association() {
                        return Err(Error::msg(format!(
                            "Embedded identity `{}` of `{}` can only contain scalar properties, `{}` is an association",
                            id.name,
                            entity.name(),
                            v.name
                        )));
                    }
                    Ok((
                        format!("{}_{}", id.persisted_name, v.persisted_name),
                        v.value.clone(),
                    ))
                })
                .collect()
        }
    }
}

/// Foreign key columns held by `property` for a target with the given key columns.
///
/// An explicit foreign key names the whole column for single column keys and
/// replaces the property name as the prefix otherwise.
pub fn foreign_key_columns(
    property: &PersistentProperty,
    target_columns: Vec<(String, Value)>,
) -> Vec<(String, Value)> {
    let explicit = property
        .association
        .as_ref()
        .and_then(|v| v.foreign_key.as_deref());
    if let (Some(explicit), [(.., value)]) = (explicit, target_columns.as_slice()) {
        return vec![(explicit.to_string(), value.clone())];
    }
    let base = explicit.unwrap_or(&property.persisted_name);
    target_columns
        .into_iter()
        .map(|(name, value)| (format!("{base}_{name}"), value))
        .collect()
}
