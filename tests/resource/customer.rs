use keel::{Entity, PersistentEntity, Property, Related, Result};
use rust_decimal::Decimal;
use uuid::Uuid;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Country {
    pub code: String,
    pub name: String,
}

impl Entity for Country {
    fn describe() -> Result<PersistentEntity> {
        Self::builder("Country")
            .id(Property::<Self>::of::<String>("code").set(|c, v| {
                c.code = v.into_value()?;
                Ok(())
            }))
            .property(Property::<Self>::of::<String>("name").set(|c, v| {
                c.name = v.into_value()?;
                Ok(())
            }))
            .default_instance()
            .build()
    }
}

/// Embeddable, stored in the columns of its owner.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Address {
    pub street: Option<String>,
    pub city: Option<String>,
    pub country: Related<Country>,
}

impl Entity for Address {
    fn describe() -> Result<PersistentEntity> {
        Self::builder("Address")
            .property(Property::<Self>::of::<String>("street").nullable().set(|a, v| {
                a.street = v.into_value()?;
                Ok(())
            }))
            .property(Property::<Self>::of::<String>("city").nullable().set(|a, v| {
                a.city = v.into_value()?;
                Ok(())
            }))
            .property(Property::<Self>::many_to_one::<Country>("country").set(|a, v| {
                a.country = v.into_related()?;
                Ok(())
            }))
            .default_instance()
            .build()
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Customer {
    pub id: Uuid,
    pub name: String,
    pub address: Option<Address>,
    pub orders: Vec<Order>,
}

impl Entity for Customer {
    fn describe() -> Result<PersistentEntity> {
        Self::builder("Customer")
            .id(Property::<Self>::of::<Uuid>("id").set(|c, v| {
                c.id = v.into_value()?;
                Ok(())
            }))
            .property(Property::<Self>::of::<String>("name").set(|c, v| {
                c.name = v.into_value()?;
                Ok(())
            }))
            .property(Property::<Self>::embedded::<Address>("address").set(|c, v| {
                c.address = v.into_optional()?;
                Ok(())
            }))
            .property(Property::<Self>::one_to_many::<Order>("orders").set(|c, v| {
                c.orders = v.into_many()?;
                Ok(())
            }))
            .default_instance()
            .build()
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Order {
    pub id: i32,
    pub total: Decimal,
    pub version: i32,
    pub customer: Related<Customer>,
    pub lines: Vec<OrderLine>,
}

impl Entity for Order {
    fn describe() -> Result<PersistentEntity> {
        Self::builder("Order")
            .persisted("orders")
            .id(Property::<Self>::of::<i32>("id").set(|o, v| {
                o.id = v.into_value()?;
                Ok(())
            }))
            .property(Property::<Self>::of::<Decimal>("total").set(|o, v| {
                o.total = v.into_value()?;
                Ok(())
            }))
            .version(Property::<Self>::of::<i32>("version").set(|o, v| {
                o.version = v.into_value()?;
                Ok(())
            }))
            .property(Property::<Self>::many_to_one::<Customer>("customer").set(|o, v| {
                o.customer = v.into_related()?;
                Ok(())
            }))
            .property(
                Property::<Self>::one_to_many::<OrderLine>("lines")
                    .alias("line_")
                    .set(|o, v| {
                        o.lines = v.into_many()?;
                        Ok(())
                    }),
            )
            .default_instance()
            .build()
    }
}

/// Identified by the order and its position inside it.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct OrderLine {
    pub order_id: i32,
    pub position: i16,
    pub quantity: u32,
    pub product: Related<super::Product>,
}

impl Entity for OrderLine {
    fn describe() -> Result<PersistentEntity> {
        Self::builder("OrderLine")
            .composite_id([
                Property::<Self>::of::<i32>("order_id").set(|l, v| {
                    l.order_id = v.into_value()?;
                    Ok(())
                }),
                Property::<Self>::of::<i16>("position").set(|l, v| {
                    l.position = v.into_value()?;
                    Ok(())
                }),
            ])
            .property(Property::<Self>::of::<u32>("quantity").set(|l, v| {
                l.quantity = v.into_value()?;
                Ok(())
            }))
            .property(
                Property::<Self>::many_to_one::<super::Product>("product").set(|l, v| {
                    l.product = v.into_related()?;
                    Ok(())
                }),
            )
            .default_instance()
            .build()
    }
}

/// References an order line through its composite identity.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Shipment {
    pub id: i64,
    pub line: Related<OrderLine>,
}

impl Entity for Shipment {
    fn describe() -> Result<PersistentEntity> {
        Self::builder("Shipment")
            .id(Property::<Self>::of::<i64>("id").set(|s, v| {
                s.id = v.into_value()?;
                Ok(())
            }))
            .property(Property::<Self>::many_to_one::<OrderLine>("line").set(|s, v| {
                s.line = v.into_related()?;
                Ok(())
            }))
            .default_instance()
            .build()
    }
}
