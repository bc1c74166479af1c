use crate::{
    Arguments, Context, Entity, EntityRegistry, Error, Identity, Instance, Instantiator, JoinPlan, Key,
    PersistentEntity, PersistentProperty, PropertyPath, Related, Result, RowReader, Slot, Value,
    child_path, downcast, foreign_key_columns, identity_columns,
};
use std::{collections::HashMap, sync::Arc};

/// Value read for one property before any instance exists.
#[derive(Debug)]
enum Field {
    Value(Value),
    /// Joined to-one association or embedded value, `None` when absent.
    One(Option<Node>),
    /// Joined to-many association.
    Many(Children),
    /// Owning association that was not joined, `None` for a null foreign key.
    Reference(Option<Key>),
    NotLoaded,
}

impl Field {
    fn is_empty(&self) -> bool {
        match self {
            Field::Value(v) => v.is_null(),
            Field::One(v) => v.is_none(),
            Field::Many(v) => v.nodes.is_empty(),
            Field::Reference(v) => v.is_none(),
            Field::NotLoaded => true,
        }
    }
}

/// Everything read from the row for one entity (or embedded value).
#[derive(Debug)]
struct Node {
    entity: Arc<PersistentEntity>,
    /// Identity values, `None` for embedded values.
    key: Option<Key>,
    identity: Vec<(&'static str, Field)>,
    fields: Vec<(&'static str, Field)>,
}

/// Nodes sharing an identity, merged in order of first appearance.
#[derive(Debug, Default)]
struct Children {
    nodes: Vec<Node>,
    positions: HashMap<Key, usize>,
}

impl Children {
    fn push(&mut self, node: Node) {
        let position = node.key.as_ref().and_then(|v| self.positions.get(v)).copied();
        match position {
            Some(i) => merge(&mut self.nodes[i], node),
            None => {
                if let Some(key) = &node.key {
                    self.positions.insert(key.clone(), self.nodes.len());
                }
                self.nodes.push(node);
            }
        }
    }
}

/// Builds entity instances out of labeled result rows.
///
/// Reading happens in two phases: the row is first decoded into a tree of plain
/// values following the metadata and the join plan, then instances are created
/// bottom up. An association whose identity columns are all null is absent.
pub struct RowMaterializer<'a> {
    registry: &'a EntityRegistry,
    entity: Arc<PersistentEntity>,
    joins: &'a JoinPlan,
}

impl<'a> RowMaterializer<'a> {
    pub fn new(
        registry: &'a EntityRegistry,
        entity: Arc<PersistentEntity>,
        joins: &'a JoinPlan,
    ) -> Self {
        Self {
            registry,
            entity,
            joins,
        }
    }

    /// Materializer of `T` using the global registry.
    pub fn of<T: Entity>(joins: &'a JoinPlan) -> Result<Self> {
        let registry = EntityRegistry::global();
        Ok(Self::new(registry, registry.get::<T>()?, joins))
    }

    pub fn entity(&self) -> &Arc<PersistentEntity> {
        &self.entity
    }

    /// Reads the root entity of one row.
    pub fn read<R: RowReader + ?Sized>(&self, row: &R) -> Result<Instance> {
        let node = self.read_root(row)?;
        self.instantiate(node)
    }

    pub fn read_as<T: Entity, R: RowReader + ?Sized>(&self, row: &R) -> Result<T> {
        downcast(self.read(row)?)
            .with_context(|| format!("While reading an instance of `{}`", self.entity.name()))
    }

    /// Reads many rows, rows sharing the root identity are merged into one instance.
    ///
    /// The order of first appearance is kept, to-many children of merged rows are
    /// collected (and merged themselves) by identity.
    pub fn read_all<T: Entity, R: RowReader>(
        &self,
        rows: impl IntoIterator<Item = R>,
    ) -> Result<Vec<T>> {
        let result = self.read_all_nodes(rows).and_then(|nodes| {
            nodes
                .into_iter()
                .map(|node| downcast::<T>(self.instantiate(node)?))
                .collect::<Result<Vec<_>>>()
        });
        if let Err(error) = &result {
            log::error!("{:#}", error);
        }
        result
    }

    fn read_all_nodes<R: RowReader>(&self, rows: impl IntoIterator<Item = R>) -> Result<Vec<Node>> {
        let mut roots = Children::default();
        for (i, row) in rows.into_iter().enumerate() {
            roots.push(
                self.read_root(&row)
                    .with_context(|| format!("While reading row {i}"))?,
            );
        }
        Ok(roots.nodes)
    }

    fn read_root<R: RowReader + ?Sized>(&self, row: &R) -> Result<Node> {
        match self.read_entity(&self.entity, None, "", row)? {
            Some(node) => Ok(node),
            None => Err(Error::msg(format!(
                "The identity of `{}` is null, the root of a row cannot be absent",
                self.entity.name()
            ))),
        }
    }

    fn read_entity<R: RowReader + ?Sized>(
        &self,
        entity: &Arc<PersistentEntity>,
        path: Option<&PropertyPath>,
        prefix: &str,
        row: &R,
    ) -> Result<Option<Node>> {
        let (key, identity) = self.read_identity(entity, path, prefix, row)?;
        if key.is_null() {
            return Ok(None);
        }
        let fields = self.read_properties(entity, path, prefix, row)?;
        Ok(Some(Node {
            entity: entity.clone(),
            key: Some(key),
            identity,
            fields,
        }))
    }

    fn read_identity<R: RowReader + ?Sized>(
        &self,
        entity: &Arc<PersistentEntity>,
        path: Option<&PropertyPath>,
        prefix: &str,
        row: &R,
    ) -> Result<(Key, Vec<(&'static str, Field)>)> {
        let Some(identity) = entity.identity() else {
            return Err(Error::msg(format!(
                "`{}` has no identity, it can only be embedded",
                entity.name()
            )));
        };
        match identity {
            Identity::Simple(..) | Identity::Composite(..) => {
                let mut values = Vec::new();
                let mut fields = Vec::new();
                for property in identity.properties() {
                    let value = read_scalar(entity, property, prefix, row)?;
                    values.push(value.clone());
                    fields.push((property.name, Field::Value(value)));
                }
                Ok((Key(values.into()), fields))
            }
            Identity::Embedded(property) => {
                let embeddable = self.target(property)?;
                let node = self.read_embedded(
                    &embeddable,
                    path,
                    &format!("{prefix}{}_", property.persisted_name),
                    row,
                )?;
                let key = match &node {
                    Some(node) => Key(node
                        .fields
                        .iter()
                        .map(|(.., v)| match v {
                            Field::Value(v) => v.clone(),
                            _ => Value::Null,
                        })
                        .collect()),
                    None => Key(Box::new([Value::Null])),
                };
                Ok((key, vec![(property.name, Field::One(node))]))
            }
        }
    }

    fn read_embedded<R: RowReader + ?Sized>(
        &self,
        entity: &Arc<PersistentEntity>,
        path: Option<&PropertyPath>,
        prefix: &str,
        row: &R,
    ) -> Result<Option<Node>> {
        let fields = self.read_properties(entity, path, prefix, row)?;
        if fields.iter().all(|(.., v)| v.is_empty()) {
            return Ok(None);
        }
        Ok(Some(Node {
            entity: entity.clone(),
            key: None,
            identity: Vec::new(),
            fields,
        }))
    }

    /// Reads the properties of `entity`, `path` is the join key of the nearest non
    /// embedded owner (`None` at the root).
    fn read_properties<R: RowReader + ?Sized>(
        &self,
        entity: &Arc<PersistentEntity>,
        path: Option<&PropertyPath>,
        prefix: &str,
        row: &R,
    ) -> Result<Vec<(&'static str, Field)>> {
        let mut fields = Vec::with_capacity(entity.properties().len());
        for property in entity.properties() {
            let Some(association) = &property.association else {
                fields.push((
                    property.name,
                    Field::Value(read_scalar(entity, property, prefix, row)?),
                ));
                continue;
            };
            let current = child_path(path, property.name);
            let field = if association.kind.is_embedded() {
                let target = self.target(property)?;
                Field::One(self.read_embedded(
                    &target,
                    path,
                    &format!("{prefix}{}_", property.persisted_name),
                    row,
                )?)
            } else if let Some(joined) = self.joins.get(&current).filter(|v| v.join.is_fetch()) {
                let target = self.target(property)?;
                let alias = match &joined.alias {
                    Some(alias) => alias.clone(),
                    None => property.default_alias(),
                };
                let node = self
                    .read_entity(&target, Some(&current), &format!("{prefix}{alias}"), row)
                    .with_context(|| format!("While reading the association `{current}`"))?;
                if association.kind.is_to_many() {
                    let mut children = Children::default();
                    node.into_iter().for_each(|v| children.push(v));
                    Field::Many(children)
                } else {
                    Field::One(node)
                }
            } else if association.holds_foreign_key() {
                let target = self.target(property)?;
                let embeddable = match target.identity() {
                    Some(Identity::Embedded(id)) => Some(self.target(id)?),
                    _ => None,
                };
                let columns = foreign_key_columns(
                    property,
                    identity_columns(&target, embeddable.as_deref())?,
                );
                let mut values = Vec::with_capacity(columns.len());
                for (column, prototype) in columns {
                    let column = format!("{prefix}{column}");
                    values.push(row.read(&column, &prototype).with_context(|| {
                        format!(
                            "While reading the foreign key `{column}` of `{}.{}`",
                            entity.name(),
                            property.name
                        )
                    })?);
                }
                let key = Key(values.into());
                Field::Reference(if key.is_null() { None } else { Some(key) })
            } else {
                Field::NotLoaded
            };
            fields.push((property.name, field));
        }
        Ok(fields)
    }

    fn target(&self, property: &PersistentProperty) -> Result<Arc<PersistentEntity>> {
        let Some(association) = &property.association else {
            return Err(Error::msg(format!(
                "`{}` is not an association",
                property.name
            )));
        };
        self.registry.resolve(&association.target)
    }

    fn instantiate(&self, node: Node) -> Result<Instance> {
        let Node {
            entity,
            identity,
            fields,
            ..
        } = node;
        match entity.instantiator() {
            Instantiator::Constructor { parameters, create } => {
                let mut identity = identity;
                let mut fields = fields;
                let mut arguments = Vec::with_capacity(parameters.len());
                for parameter in parameters {
                    let field = take_field(&mut identity, parameter)
                        .or_else(|| take_field(&mut fields, parameter));
                    let (Some(field), Some(property)) = (field, entity.property(parameter)) else {
                        return Err(Error::msg(format!(
                            "Cannot create `{}`: no value for the constructor argument `{parameter}`",
                            entity.name()
                        )));
                    };
                    arguments.push((
                        *parameter,
                        self.argument(&entity, property, field)?,
                    ));
                }
                let mut instance = create(Arguments::new(entity.name(), arguments))
                    .with_context(|| format!("While creating an instance of `{}`", entity.name()))?;
                // Properties outside of the constructor, through their setters
                for (name, field) in fields.into_iter().chain(identity) {
                    if let Some(property) = entity.property(name).filter(|v| v.has_setter()) {
                        self.assign(&entity, &mut instance, property, field)?;
                    }
                }
                Ok(instance)
            }
            Instantiator::Default(create) => {
                let mut instance = create();
                for (name, field) in fields.into_iter().chain(identity) {
                    let Some(property) = entity.property(name) else {
                        continue;
                    };
                    if property.has_setter() {
                        self.assign(&entity, &mut instance, property, field)?;
                    }
                }
                Ok(instance)
            }
        }
    }

    fn argument(
        &self,
        entity: &PersistentEntity,
        property: &PersistentProperty,
        field: Field,
    ) -> Result<Slot> {
        Ok(match field {
            Field::Value(v) => {
                if v.is_null() && !property.nullable {
                    return Err(Error::msg(format!(
                        "Cannot create `{}`: the constructor argument `{}` is not nullable but the column `{}` is null",
                        entity.name(),
                        property.name,
                        property.persisted_name
                    )));
                }
                Slot::Value(v)
            }
            Field::One(Some(node)) => Slot::One(Related::Loaded(Box::new(self.instantiate(node)?))),
            Field::One(None) | Field::Reference(None) => {
                if !property.nullable {
                    return Err(Error::msg(format!(
                        "Cannot create `{}`: the constructor argument `{}` is not nullable but the association is absent",
                        entity.name(),
                        property.name
                    )));
                }
                Slot::One(Related::Absent)
            }
            Field::Reference(Some(key)) => Slot::One(Related::Reference(key)),
            Field::Many(children) => Slot::Many(self.instantiate_all(children.nodes)?),
            Field::NotLoaded => Slot::NotLoaded,
        })
    }

    fn assign(
        &self,
        entity: &PersistentEntity,
        instance: &mut Instance,
        property: &PersistentProperty,
        field: Field,
    ) -> Result<()> {
        let slot = match field {
            Field::Value(v) if v.is_null() && !property.nullable => {
                log::trace!(
                    "Skipping the null value of `{}.{}`, the property is not nullable",
                    entity.name(),
                    property.name
                );
                return Ok(());
            }
            Field::Value(v) => Slot::Value(v),
            Field::One(Some(node)) => Slot::One(Related::Loaded(Box::new(self.instantiate(node)?))),
            Field::One(None) if !property.nullable => {
                log::trace!(
                    "Skipping the absent `{}.{}`, the association is not nullable",
                    entity.name(),
                    property.name
                );
                return Ok(());
            }
            Field::One(None) => Slot::One(Related::Absent),
            Field::Many(children) => Slot::Many(self.instantiate_all(children.nodes)?),
            Field::Reference(..) | Field::NotLoaded => return Ok(()),
        };
        property
            .set(&mut **instance, slot)
            .with_context(|| format!("While assigning `{}.{}`", entity.name(), property.name))
    }

    fn instantiate_all(&self, nodes: Vec<Node>) -> Result<Vec<Instance>> {
        nodes.into_iter().map(|v| self.instantiate(v)).collect()
    }
}

fn read_scalar<R: RowReader + ?Sized>(
    entity: &PersistentEntity,
    property: &PersistentProperty,
    prefix: &str,
    row: &R,
) -> Result<Value> {
    let column = format!("{prefix}{}", property.persisted_name);
    row.read(&column, &property.value).with_context(|| {
        format!(
            "While reading `{}.{}` from the column `{column}`",
            entity.name(),
            property.name
        )
    })
}

fn take_field(fields: &mut Vec<(&'static str, Field)>, name: &str) -> Option<Field> {
    let i = fields.iter().position(|(k, ..)| *k == name)?;
    Some(fields.remove(i).1)
}

/// Folds the to-many children of `from` into `into`, both having the same identity.
fn merge(into: &mut Node, from: Node) {
    for ((.., target), (.., source)) in into.fields.iter_mut().zip(from.fields) {
        match (target, source) {
            (Field::Many(target), Field::Many(source)) => {
                source.nodes.into_iter().for_each(|v| target.push(v));
            }
            (Field::One(Some(target)), Field::One(Some(source))) if target.key == source.key => {
                merge(target, source)
            }
            (target, Field::One(Some(source))) if matches!(target, Field::One(None)) => {
                *target = Field::One(Some(source));
            }
            _ => {}
        }
    }
}
