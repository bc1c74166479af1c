use keel::{Entity, PersistentEntity, Property, Related, Result};

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Isbn {
    pub prefix: String,
    pub number: i64,
}

impl Entity for Isbn {
    fn describe() -> Result<PersistentEntity> {
        Self::builder("Isbn")
            .property(Property::<Self>::of::<String>("prefix").set(|i, v| {
                i.prefix = v.into_value()?;
                Ok(())
            }))
            .property(Property::<Self>::of::<i64>("number").set(|i, v| {
                i.number = v.into_value()?;
                Ok(())
            }))
            .default_instance()
            .build()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Book {
    pub isbn: Isbn,
    pub title: String,
    pub subtitle: Option<String>,
}

impl Entity for Book {
    fn describe() -> Result<PersistentEntity> {
        Self::builder("Book")
            .embedded_id(Property::<Self>::embedded::<Isbn>("isbn"))
            .property(Property::<Self>::of::<String>("title"))
            .property(Property::<Self>::of::<String>("subtitle").nullable())
            .constructor(&["isbn", "title", "subtitle"], |mut args| {
                Ok(Book {
                    isbn: args.entity("isbn")?,
                    title: args.value("title")?,
                    subtitle: args.value("subtitle")?,
                })
            })
            .build()
    }
}

/// Constructor based, a non joined book is passed as a reference.
#[derive(Debug, Clone, PartialEq)]
pub struct Edition {
    pub id: i32,
    pub year: i16,
    pub book: Related<Book>,
}

impl Entity for Edition {
    fn describe() -> Result<PersistentEntity> {
        Self::builder("Edition")
            .id(Property::<Self>::of::<i32>("id"))
            .property(Property::<Self>::of::<i16>("year"))
            .property(Property::<Self>::many_to_one::<Book>("book"))
            .constructor(&["id", "year", "book"], |mut args| {
                Ok(Edition {
                    id: args.value("id")?,
                    year: args.value("year")?,
                    book: args.related("book")?,
                })
            })
            .build()
    }
}
