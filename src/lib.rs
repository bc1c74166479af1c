pub use keel_core::*;

/// Plans the joins of `query` using the global registry.
pub fn plan(query: &Query) -> Result<JoinPlan> {
    JoinPlanner::plan_query(EntityRegistry::global(), query)
}

/// Plans `query`, then reads every row as a `T`, merging rows of the same instance.
pub fn load<T: Entity, R: RowReader>(
    query: &Query,
    rows: impl IntoIterator<Item = R>,
) -> Result<Vec<T>> {
    if query.root != EntityRef::of::<T>() {
        return Err(Error::msg(format!(
            "The query is over `{}`, it cannot be read as `{}`",
            query.root.type_name(),
            std::any::type_name::<T>()
        )));
    }
    let registry = EntityRegistry::global();
    let root = registry.resolve(&query.root)?;
    let joins = JoinPlanner::plan_query(registry, query)?;
    RowMaterializer::new(registry, root, &joins).read_all(rows)
}
