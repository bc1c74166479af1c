use crate::{
    EntityRegistry, Error, PersistentEntity, PropertyPath, Result, resolve_path,
};
use std::{
    borrow::Cow,
    collections::BTreeMap,
    fmt::{self, Display},
    sync::Arc,
};

#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum JoinType {
    /// Implied by a predicate or a selection, the statement writer picks the kind.
    #[default]
    Default,
    Inner,
    Left,
    LeftFetch,
    Right,
    RightFetch,
    /// Inner join whose columns are projected and materialized.
    Fetch,
}

impl JoinType {
    /// Whether the joined columns are part of the result.
    pub fn is_fetch(&self) -> bool {
        matches!(
            self,
            JoinType::Fetch | JoinType::LeftFetch | JoinType::RightFetch
        )
    }
}

impl Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            JoinType::Default => "DEFAULT",
            JoinType::Inner => "INNER",
            JoinType::Left => "LEFT",
            JoinType::LeftFetch => "LEFT_FETCH",
            JoinType::Right => "RIGHT",
            JoinType::RightFetch => "RIGHT_FETCH",
            JoinType::Fetch => "FETCH",
        })
    }
}

/// Explicit join request supplied with a query.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinDirective {
    pub path: PropertyPath,
    pub join: JoinType,
    pub alias: Option<Cow<'static, str>>,
}

impl JoinDirective {
    /// Fetch join of the association at `path`.
    pub fn new(path: &str) -> Result<Self> {
        Ok(Self {
            path: PropertyPath::new(path)?,
            join: JoinType::Fetch,
            alias: None,
        })
    }
    pub fn join_type(mut self, join: JoinType) -> Self {
        self.join = join;
        self
    }
    pub fn alias(mut self, alias: impl Into<Cow<'static, str>>) -> Self {
        self.alias = Some(alias.into());
        self
    }
}

/// One planned join.
#[derive(Debug, Clone, PartialEq)]
pub struct Joined {
    pub path: PropertyPath,
    pub join: JoinType,
    pub alias: Option<Cow<'static, str>>,
}

/// Orders by path length first, then lexicographically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct JoinKey(usize, String);

impl JoinKey {
    fn of(path: &PropertyPath) -> Self {
        JoinKey(path.as_str().len(), path.to_string())
    }
}

/// Joins planned for one query, iterated parents before children.
///
/// Keys are association paths without their embedded segments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JoinPlan {
    joins: BTreeMap<JoinKey, Joined>,
}

impl JoinPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch joins of `paths` and of all their prefixes, for rows produced without
    /// a planner. Paths are join keys, embedded segments are left out.
    pub fn from_paths(paths: impl IntoIterator<Item = PropertyPath>) -> Self {
        let mut result = Self::new();
        for path in paths {
            for path in path.ancestors() {
                result.register(&path, JoinType::Fetch, None);
            }
        }
        result
    }

    /// Adds or upgrades the join at `path`, returns whether anything changed.
    ///
    /// A later `Default` never replaces an explicit type and a missing alias never
    /// erases an existing one.
    pub(crate) fn register(
        &mut self,
        path: &PropertyPath,
        join: JoinType,
        alias: Option<Cow<'static, str>>,
    ) -> bool {
        match self.joins.get_mut(&JoinKey::of(path)) {
            Some(existing) => {
                let mut changed = false;
                if join != JoinType::Default && existing.join != join {
                    log::debug!("Upgrading join `{path}` from {} to {join}", existing.join);
                    existing.join = join;
                    changed = true;
                }
                if alias.is_some() && existing.alias != alias {
                    existing.alias = alias;
                    changed = true;
                }
                changed
            }
            None => {
                log::debug!("Joining `{path}` as {join}");
                self.joins.insert(
                    JoinKey::of(path),
                    Joined {
                        path: path.clone(),
                        join,
                        alias,
                    },
                );
                true
            }
        }
    }

    pub fn get(&self, path: &PropertyPath) -> Option<&Joined> {
        self.joins.get(&JoinKey::of(path))
    }

    pub fn contains(&self, path: &PropertyPath) -> bool {
        self.get(path).is_some()
    }

    /// Join type at `path`, if joined.
    pub fn join_type(&self, path: &str) -> Option<JoinType> {
        let path = PropertyPath::new(path).ok()?;
        self.get(&path).map(|v| v.join)
    }

    pub fn is_fetched(&self, path: &PropertyPath) -> bool {
        self.get(path).is_some_and(|v| v.join.is_fetch())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Joined> {
        self.joins.values()
    }

    pub fn paths(&self) -> impl Iterator<Item = &PropertyPath> {
        self.joins.values().map(|v| &v.path)
    }

    pub fn fetched(&self) -> impl Iterator<Item = &Joined> {
        self.joins.values().filter(|v| v.join.is_fetch())
    }

    pub fn len(&self) -> usize {
        self.joins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joins.is_empty()
    }

    /// Column prefix of the association at `path`, as read back by the materializer.
    ///
    /// Every fetch joined segment contributes its alias, embedded segments their
    /// persisted name followed by `_`.
    pub fn column_prefix(
        &self,
        registry: &EntityRegistry,
        root: &Arc<PersistentEntity>,
        path: &PropertyPath,
    ) -> Result<String> {
        let mut prefix = String::new();
        for step in resolve_path(registry, root, path)? {
            let property = step.property();
            let Some(association) = &property.association else {
                return Err(Error::msg(format!(
                    "`{}` is a scalar property, it has no column prefix",
                    step.path
                )));
            };
            if association.kind.is_embedded() {
                prefix.push_str(&property.persisted_name);
                prefix.push('_');
                continue;
            }
            let Some(joined) = self.get(&step.key).filter(|v| v.join.is_fetch()) else {
                return Err(Error::msg(format!(
                    "`{}` is not fetch joined, its columns are not part of the result",
                    step.path
                )));
            };
            match &joined.alias {
                Some(alias) => prefix.push_str(alias),
                None => prefix.push_str(&property.default_alias()),
            }
        }
        Ok(prefix)
    }
}
