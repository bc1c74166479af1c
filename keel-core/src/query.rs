use crate::{Entity, EntityRef, JoinDirective, Predicate, Selection};

/// Shape of a query over one root entity, as seen by the join planner.
#[derive(Debug, Clone)]
pub struct Query {
    pub root: EntityRef,
    pub joins: Vec<JoinDirective>,
    pub predicate: Option<Predicate>,
    pub selection: Vec<Selection>,
}

impl Query {
    pub fn new(root: EntityRef) -> Self {
        Self {
            root,
            joins: Vec::new(),
            predicate: None,
            selection: Vec::new(),
        }
    }
    pub fn of<T: Entity>() -> Self {
        Self::new(EntityRef::of::<T>())
    }
    pub fn join(mut self, directive: JoinDirective) -> Self {
        self.joins.push(directive);
        self
    }
    /// Sets the predicate, a second call combines both with `And`.
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicate = Some(match self.predicate.take() {
            Some(Predicate::And(mut v)) => {
                v.push(predicate);
                Predicate::And(v)
            }
            Some(existing) => Predicate::And(vec![existing, predicate]),
            None => predicate,
        });
        self
    }
    pub fn select(mut self, selection: Selection) -> Self {
        self.selection.push(selection);
        self
    }
}
