use crate::{
    EntityRegistry, Error, PersistentEntity, PersistentProperty, PropertyIndex, PropertyPath,
    Result, child_path,
};
use std::sync::Arc;

/// One segment of a resolved property path.
#[derive(Debug, Clone)]
pub struct PathStep {
    /// Path up to and including this segment.
    pub path: PropertyPath,
    /// Join plan key of this segment, the path without its embedded segments.
    pub key: PropertyPath,
    /// Entity declaring the property.
    pub owner: Arc<PersistentEntity>,
    pub index: PropertyIndex,
    /// Associated entity, `None` for scalars.
    pub target: Option<Arc<PersistentEntity>>,
}

impl PathStep {
    pub fn property(&self) -> &PersistentProperty {
        self.owner.property_at(self.index)
    }
    pub fn is_identity(&self) -> bool {
        matches!(self.index, PropertyIndex::Identity(..))
    }
    /// Owning, non embedded, to-one association.
    pub fn holds_foreign_key(&self) -> bool {
        self.property()
            .association
            .as_ref()
            .is_some_and(|v| v.holds_foreign_key())
    }
    /// Non embedded association, a candidate for a join.
    pub fn is_joinable(&self) -> bool {
        self.property()
            .association
            .as_ref()
            .is_some_and(|v| !v.kind.is_embedded())
    }
}

/// Resolves every segment of `path` against the metadata, starting at `root`.
pub fn resolve_path(
    registry: &EntityRegistry,
    root: &Arc<PersistentEntity>,
    path: &PropertyPath,
) -> Result<Vec<PathStep>> {
    let mut owner = root.clone();
    let mut steps: Vec<PathStep> = Vec::with_capacity(path.depth());
    // Key of the nearest non embedded ancestor
    let mut base: Option<PropertyPath> = None;
    for segment in path.segments() {
        if let Some(previous) = steps.last() {
            if previous.target.is_none() {
                return Err(Error::msg(format!(
                    "Cannot resolve `{path}`: `{}` is a scalar property of `{}` and has no property `{segment}`",
                    previous.path,
                    previous.owner.name(),
                )));
            }
        }
        let Some(index) = owner.find(segment) else {
            return Err(Error::msg(format!(
                "Cannot resolve `{path}`: entity `{}` has no property `{segment}`",
                owner.name()
            )));
        };
        let property = owner.property_at(index);
        let target = match &property.association {
            Some(association) => Some(registry.resolve(&association.target)?),
            None => None,
        };
        let key = child_path(base.as_ref(), segment);
        if !property.is_embedded() {
            base = Some(key.clone());
        }
        let step = PathStep {
            path: child_path(steps.last().map(|v| &v.path), segment),
            key,
            owner: owner.clone(),
            index,
            target: target.clone(),
        };
        steps.push(step);
        if let Some(target) = target {
            owner = target;
        }
    }
    Ok(steps)
}

/// How a predicate reaches the end of its path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityAccess {
    /// Every association on the path is joined.
    Joined,
    /// The association at this path is only compared through its identity, the owner's
    /// foreign key column is enough and it is not joined.
    ForeignKey(PropertyPath),
}

impl IdentityAccess {
    /// Detects the trailing identity-only access of a resolved path.
    ///
    /// Matches a path ending at an owning to-one association, or at the identity of
    /// the entity such an association reaches (a simple or composite identity part, an
    /// embedded identity or one of its components).
    pub fn classify(steps: &[PathStep]) -> IdentityAccess {
        let n = steps.len();
        let Some(last) = steps.last() else {
            return IdentityAccess::Joined;
        };
        if last.holds_foreign_key() {
            return IdentityAccess::ForeignKey(last.path.clone());
        }
        if n >= 2 && last.is_identity() && steps[n - 2].holds_foreign_key() {
            return IdentityAccess::ForeignKey(steps[n - 2].path.clone());
        }
        if n >= 3
            && !last.property().is_association()
            && steps[n - 2].is_identity()
            && steps[n - 2].property().is_embedded()
            && steps[n - 3].holds_foreign_key()
        {
            return IdentityAccess::ForeignKey(steps[n - 3].path.clone());
        }
        IdentityAccess::Joined
    }
}
