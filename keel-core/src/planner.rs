use crate::{
    Context, EntityRegistry, Error, IdentityAccess, JoinDirective, JoinPlan, JoinType, Operand,
    PathStep, PersistentEntity, Predicate, PropertyPath, Query, Result, Selection, resolve_path,
};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Leaf {
    /// Paths compared in a filter, identity-only access skips the last join.
    Predicate,
    /// Projected paths, the whole chain is joined.
    Selection,
}

/// Computes the joins a query over `root` needs.
///
/// Explicit directives are registered first, then the predicate and the selection
/// add the joins they imply. Implied joins are registered as [`JoinType::Default`]
/// so they never downgrade an explicit join.
///
/// Embedded segments are never joined, an association inside an embedded value is
/// keyed as if it was declared by the nearest non embedded owner: `address.country`
/// is planned as `country`.
pub struct JoinPlanner<'r> {
    registry: &'r EntityRegistry,
    root: Arc<PersistentEntity>,
    plan: JoinPlan,
}

impl<'r> JoinPlanner<'r> {
    pub fn new(registry: &'r EntityRegistry, root: Arc<PersistentEntity>) -> Self {
        Self {
            registry,
            root,
            plan: JoinPlan::new(),
        }
    }

    /// Plans every join of `query`.
    pub fn plan_query(registry: &'r EntityRegistry, query: &Query) -> Result<JoinPlan> {
        let root = registry.resolve(&query.root)?;
        let mut planner = JoinPlanner::new(registry, root);
        planner.seed(&query.joins)?;
        if let Some(predicate) = &query.predicate {
            planner.visit_predicate(predicate)?;
        }
        for selection in &query.selection {
            planner.visit_selection(selection)?;
        }
        Ok(planner.finish())
    }

    pub fn root(&self) -> &Arc<PersistentEntity> {
        &self.root
    }

    pub fn plan(&self) -> &JoinPlan {
        &self.plan
    }

    pub fn finish(self) -> JoinPlan {
        self.plan
    }

    /// Registers explicit join directives, each ancestor of a directive joins with the same type.
    pub fn seed(&mut self, directives: &[JoinDirective]) -> Result<()> {
        for directive in directives {
            let steps = self
                .resolve(&directive.path)
                .with_context(|| format!("While planning the join of `{}`", directive.path))?;
            let Some((last, ancestors)) = steps.split_last() else {
                continue;
            };
            if !last.property().is_association() {
                return Err(Error::msg(format!(
                    "Cannot join `{}`, the property `{}` of `{}` is not an association",
                    directive.path,
                    last.property().name,
                    last.owner.name()
                )));
            }
            for step in ancestors.iter().filter(|v| v.is_joinable()) {
                self.plan.register(&step.key, directive.join, None);
            }
            if last.is_joinable() {
                self.plan
                    .register(&last.key, directive.join, directive.alias.clone());
            } else {
                log::debug!(
                    "`{}` is embedded, its columns are read along with the owner",
                    directive.path
                );
            }
        }
        Ok(())
    }

    pub fn visit_predicate(&mut self, predicate: &Predicate) -> Result<()> {
        match predicate {
            Predicate::And(v) | Predicate::Or(v) => {
                for predicate in v {
                    self.visit_predicate(predicate)?;
                }
            }
            Predicate::Not(v) => self.visit_predicate(v)?,
            Predicate::Path(path) | Predicate::Check { path, .. } => {
                self.visit_path(path, Leaf::Predicate)?
            }
            Predicate::Compare { path, operand, .. } => {
                self.visit_path(path, Leaf::Predicate)?;
                self.visit_operand(operand, Leaf::Predicate)?;
            }
            Predicate::Between { path, low, high } => {
                self.visit_path(path, Leaf::Predicate)?;
                self.visit_operand(low, Leaf::Predicate)?;
                self.visit_operand(high, Leaf::Predicate)?;
            }
            Predicate::In { path, values } => {
                self.visit_path(path, Leaf::Predicate)?;
                for value in values {
                    self.visit_operand(value, Leaf::Predicate)?;
                }
            }
            Predicate::InExpression { path, expression } => {
                self.visit_path(path, Leaf::Predicate)?;
                self.visit_operand(expression, Leaf::Predicate)?;
            }
            Predicate::Extension(v) => return Err(unsupported(v.kind())),
        }
        Ok(())
    }

    pub fn visit_selection(&mut self, selection: &Selection) -> Result<()> {
        match selection {
            Selection::Path(path) => self.visit_path(path, Leaf::Selection)?,
            Selection::Aggregate { operand, .. } => self.visit_operand(operand, Leaf::Selection)?,
            Selection::Compound(v) => {
                for selection in v {
                    self.visit_selection(selection)?;
                }
            }
            Selection::Aliased { selection, .. } => self.visit_selection(selection)?,
            Selection::Literal(..) => {}
            Selection::Extension(v) => return Err(unsupported(v.kind())),
        }
        Ok(())
    }

    fn visit_operand(&mut self, operand: &Operand, leaf: Leaf) -> Result<()> {
        match operand {
            Operand::Path(path) => self.visit_path(path, leaf)?,
            Operand::Value(..) | Operand::Parameter(..) => {}
            Operand::Call { arguments, .. } => {
                for argument in arguments {
                    self.visit_operand(argument, leaf)?;
                }
            }
            Operand::Binary { lhs, rhs, .. } => {
                self.visit_operand(lhs, leaf)?;
                self.visit_operand(rhs, leaf)?;
            }
            Operand::Subquery(query) => {
                log::trace!(
                    "Skipping the subquery over `{}`, it is planned on its own",
                    query.root.type_name()
                );
            }
        }
        Ok(())
    }

    fn visit_path(&mut self, path: &PropertyPath, leaf: Leaf) -> Result<()> {
        let steps = self.resolve(path)?;
        let limit = match leaf {
            Leaf::Selection => None,
            Leaf::Predicate => match IdentityAccess::classify(&steps) {
                IdentityAccess::ForeignKey(association) => {
                    log::trace!(
                        "`{path}` only reads the identity of `{association}`, using the foreign key"
                    );
                    Some(association.depth())
                }
                IdentityAccess::Joined => None,
            },
        };
        for step in steps
            .iter()
            .filter(|v| v.is_joinable() && limit.is_none_or(|limit| v.path.depth() < limit))
        {
            self.plan.register(&step.key, JoinType::Default, None);
        }
        Ok(())
    }

    fn resolve(&self, path: &PropertyPath) -> Result<Vec<PathStep>> {
        resolve_path(self.registry, &self.root, path)
    }
}

fn unsupported(kind: &str) -> Error {
    Error::msg(format!(
        "Cannot plan the joins of a `{kind}` expression, its property paths are unknown"
    ))
}
