use keel::{Entity, PersistentEntity, Property, Related, Result};

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Manufacturer {
    pub id: i64,
    pub name: String,
}

impl Entity for Manufacturer {
    fn describe() -> Result<PersistentEntity> {
        Self::builder("Manufacturer")
            .id(Property::<Self>::of::<i64>("id").set(|m, v| {
                m.id = v.into_value()?;
                Ok(())
            }))
            .property(Property::<Self>::of::<String>("name").set(|m, v| {
                m.name = v.into_value()?;
                Ok(())
            }))
            .default_instance()
            .build()
    }
}

/// Created through its constructor, no setters.
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub id: i64,
    pub title: String,
    pub manufacturer: Related<Manufacturer>,
}

impl Entity for Product {
    fn describe() -> Result<PersistentEntity> {
        Self::builder("Product")
            .id(Property::<Self>::of::<i64>("id"))
            .property(Property::<Self>::of::<String>("title"))
            .property(Property::<Self>::many_to_one::<Manufacturer>("manufacturer"))
            .constructor(&["id", "title", "manufacturer"], |mut args| {
                Ok(Product {
                    id: args.value("id")?,
                    title: args.value("title")?,
                    manufacturer: args.related("manufacturer")?,
                })
            })
            .build()
    }
}
