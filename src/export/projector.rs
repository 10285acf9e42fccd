//! Primary key projection

use crate::table::{Item, KeySchema};

/// Derives the key-only projection of a row.
#[derive(Debug, Clone)]
pub struct KeyProjector {
    schema: KeySchema,
}

impl KeyProjector {
    pub fn new(schema: KeySchema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &KeySchema {
        &self.schema
    }

    /// Copy every key attribute present in `row` into a new item.
    ///
    /// Key attributes missing from `row` are left out rather than written
    /// as nulls.
    pub fn project(&self, row: &Item) -> Item {
        project(&self.schema, row)
    }
}

/// Free-function form of [`KeyProjector::project`].
pub fn project(schema: &KeySchema, row: &Item) -> Item {
    schema
        .attribute_names()
        .filter_map(|name| row.get(name).map(|value| (name.to_string(), value.clone())))
        .collect()
}
