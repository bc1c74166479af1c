mod resource;

#[cfg(test)]
mod tests {
    use crate::resource::{
        Address, Book, Country, Customer, Edition, Isbn, Manufacturer, Order, OrderLine, Product,
        init_logs, row,
    };
    use keel::{
        Entity, EntityRegistry, JoinDirective, JoinPlan, JoinPlanner, JoinType, Key,
        PersistentEntity, Property, PropertyPath, Query, Related, RowLabeled, RowMaterializer,
        Value,
    };
    use rust_decimal::Decimal;
    use uuid::Uuid;

    /// Listed product, the product is mandatory.
    #[derive(Debug)]
    struct Listing {
        id: i64,
        product: Related<Product>,
    }

    impl Entity for Listing {
        fn describe() -> keel::Result<PersistentEntity> {
            Self::builder("Listing")
                .id(Property::<Self>::of::<i64>("id"))
                .property(Property::<Self>::many_to_one::<Product>("product").required())
                .constructor(&["id", "product"], |mut args| {
                    Ok(Listing {
                        id: args.value("id")?,
                        product: args.related("product")?,
                    })
                })
                .build()
        }
    }

    fn read<T: Entity>(query: &Query, row: &RowLabeled) -> keel::Result<T> {
        init_logs();
        let registry = EntityRegistry::new();
        let plan = JoinPlanner::plan_query(&registry, query)?;
        let entity = registry.resolve(&query.root)?;
        RowMaterializer::new(&registry, entity, &plan).read_as::<T, _>(row)
    }

    fn product_row(id: Value, manufacturer_id: Value, manufacturer_name: Value) -> RowLabeled {
        row([
            ("id", id),
            ("title", Value::Varchar(Some("Gizmo".into()))),
            ("manufacturer_id", manufacturer_id),
            ("manufacturer_name", manufacturer_name),
        ])
    }

    #[test]
    fn reference_without_join() {
        let product: Product = read(
            &Query::of::<Product>(),
            &product_row(
                Value::Int64(Some(1)),
                Value::Int64(Some(5)),
                Value::Varchar(Some("Acme".into())),
            ),
        )
        .unwrap();
        assert_eq!(
            product,
            Product {
                id: 1,
                title: "Gizmo".into(),
                manufacturer: Related::Reference(Key::from(5_i64)),
            }
        );
        assert_eq!(product.manufacturer.key().unwrap().get::<i64>().unwrap(), 5);
    }

    #[test]
    fn loaded_with_fetch_join() {
        let query = Query::of::<Product>().join(JoinDirective::new("manufacturer").unwrap());
        let product: Product = read(
            &query,
            &product_row(
                Value::Int64(Some(1)),
                Value::Int64(Some(5)),
                Value::Varchar(Some("Acme".into())),
            ),
        )
        .unwrap();
        assert_eq!(
            product.manufacturer,
            Related::Loaded(Box::new(Manufacturer {
                id: 5,
                name: "Acme".into(),
            }))
        );
    }

    #[test]
    fn filter_join_is_not_read() {
        let query = Query::of::<Product>().filter(
            keel::Predicate::eq("manufacturer.name", keel::Operand::value("Acme".to_string()))
                .unwrap(),
        );
        let product: Product = read(
            &query,
            &product_row(
                Value::Int64(Some(1)),
                Value::Int64(Some(5)),
                Value::Varchar(Some("Acme".into())),
            ),
        )
        .unwrap();
        assert_eq!(product.manufacturer, Related::Reference(Key::from(5_i64)));
    }

    #[test]
    fn absent_association() {
        let query = Query::of::<Product>().join(
            JoinDirective::new("manufacturer")
                .unwrap()
                .join_type(JoinType::LeftFetch),
        );
        let product: Product = read(
            &query,
            &product_row(Value::Int64(Some(1)), Value::Null, Value::Null),
        )
        .unwrap();
        assert_eq!(product.manufacturer, Related::Absent);

        let product: Product = read(
            &Query::of::<Product>(),
            &product_row(Value::Int64(Some(1)), Value::Int64(None), Value::Null),
        )
        .unwrap();
        assert_eq!(product.manufacturer, Related::Absent);
    }

    #[test]
    fn null_root_identity() {
        let error = read::<Product>(
            &Query::of::<Product>(),
            &product_row(Value::Null, Value::Int64(Some(5)), Value::Null),
        )
        .unwrap_err();
        assert!(error.to_string().contains("The identity of `Product` is null"));
    }

    #[test]
    fn coerced_columns() {
        let product: Product = read(
            &Query::of::<Product>(),
            &product_row(
                Value::Varchar(Some("7".into())),
                Value::Int32(Some(5)),
                Value::Null,
            ),
        )
        .unwrap();
        assert_eq!(product.id, 7);
        assert_eq!(product.manufacturer, Related::Reference(Key::from(5_i64)));

        let error = read::<Product>(
            &Query::of::<Product>(),
            &product_row(
                Value::Varchar(Some("seven".into())),
                Value::Int32(Some(5)),
                Value::Null,
            ),
        )
        .unwrap_err();
        assert!(format!("{error:#}").contains("`Product.id`"));
    }

    #[test]
    fn missing_column() {
        let error = read::<Product>(
            &Query::of::<Product>(),
            &row([
                ("id", Value::Int64(Some(1))),
                ("manufacturer_id", Value::Null),
            ]),
        )
        .unwrap_err();
        assert!(format!("{error:#}").contains("Column `title` does not exist in the row provided"));
    }

    #[test]
    fn null_constructor_argument() {
        let error = read::<Product>(
            &Query::of::<Product>(),
            &row([
                ("id", Value::Int64(Some(1))),
                ("title", Value::Varchar(None)),
                ("manufacturer_id", Value::Null),
            ]),
        )
        .unwrap_err();
        assert!(format!("{error:#}").contains("`title` is not nullable"));
    }

    #[test]
    fn required_association() {
        let listing: Listing = read(
            &Query::of::<Listing>(),
            &row([("id", Value::Int64(Some(1))), ("product_id", Value::Int64(Some(4)))]),
        )
        .unwrap();
        assert_eq!(listing.id, 1);
        assert_eq!(listing.product, Related::Reference(Key::from(4_i64)));

        let error = read::<Listing>(
            &Query::of::<Listing>(),
            &row([("id", Value::Int64(Some(2))), ("product_id", Value::Int64(None))]),
        )
        .unwrap_err();
        assert!(
            format!("{error:#}")
                .contains("the constructor argument `product` is not nullable but the association is absent")
        );
    }

    #[test]
    fn null_is_skipped_on_default_instances() {
        let manufacturer: Manufacturer = read(
            &Query::of::<Manufacturer>(),
            &row([("id", Value::Int64(Some(3))), ("name", Value::Null)]),
        )
        .unwrap();
        assert_eq!(
            manufacturer,
            Manufacturer {
                id: 3,
                name: String::new(),
            }
        );
    }

    #[test]
    fn embedded_values() {
        let id = Uuid::parse_str("5d6c2f1e-8b8f-4a43-9a47-2f3c1b6a9e10").unwrap();
        let customer_row = |street: Value, city: Value, country: Value| {
            row([
                ("id", Value::Varchar(Some(id.to_string()))),
                ("name", Value::Varchar(Some("Ada".into()))),
                ("address_street", street),
                ("address_city", city),
                ("address_country_code", country),
            ])
        };
        let customer: Customer = read(
            &Query::of::<Customer>(),
            &customer_row(
                Value::Varchar(Some("Via Roma 1".into())),
                Value::Varchar(Some("Rome".into())),
                Value::Varchar(Some("IT".into())),
            ),
        )
        .unwrap();
        assert_eq!(
            customer,
            Customer {
                id,
                name: "Ada".into(),
                address: Some(Address {
                    street: Some("Via Roma 1".into()),
                    city: Some("Rome".into()),
                    country: Related::NotLoaded,
                }),
                orders: Vec::new(),
            }
        );

        let customer: Customer = read(
            &Query::of::<Customer>(),
            &customer_row(Value::Null, Value::Null, Value::Null),
        )
        .unwrap();
        assert_eq!(customer.address, None);
    }

    #[test]
    fn embedded_fetch_join() {
        let query = Query::of::<Customer>().join(JoinDirective::new("address.country").unwrap());
        let customer: Customer = read(
            &query,
            &row([
                ("id", Uuid::nil().to_string().into()),
                ("name", "Bob".into()),
                ("address_street", Value::Null),
                ("address_city", "Lyon".into()),
                ("address_country_code", "FR".into()),
                ("address_country_name", "France".into()),
            ]),
        )
        .unwrap();
        assert_eq!(
            customer.address.unwrap().country,
            Related::Loaded(Box::new(Country {
                code: "FR".into(),
                name: "France".into(),
            }))
        );
    }

    #[test]
    fn embedded_identity() {
        let book: Book = read(
            &Query::of::<Book>(),
            &row([
                ("isbn_prefix", "978".into()),
                ("isbn_number", Value::Int64(Some(441013593))),
                ("title", "Dune".into()),
                ("subtitle", Value::Null),
            ]),
        )
        .unwrap();
        assert_eq!(
            book,
            Book {
                isbn: Isbn {
                    prefix: "978".into(),
                    number: 441013593,
                },
                title: "Dune".into(),
                subtitle: None,
            }
        );

        let edition_row = row([
            ("id", Value::Int32(Some(1))),
            ("year", Value::Int64(Some(1965))),
            ("book_isbn_prefix", "978".into()),
            ("book_isbn_number", Value::Int64(Some(441013593))),
            ("book_title", "Dune".into()),
            ("book_subtitle", "Part one".into()),
        ]);
        let edition: Edition = read(&Query::of::<Edition>(), &edition_row).unwrap();
        assert_eq!(edition.year, 1965);
        assert_eq!(
            edition.book,
            Related::Reference(Key(Box::new([
                Value::Varchar(Some("978".into())),
                Value::Int64(Some(441013593)),
            ])))
        );

        let query = Query::of::<Edition>().join(JoinDirective::new("book").unwrap());
        let edition: Edition = read(&query, &edition_row).unwrap();
        assert_eq!(
            edition.book.get().unwrap().subtitle.as_deref(),
            Some("Part one")
        );

        let partial = row([
            ("id", Value::Int32(Some(2))),
            ("year", Value::Int16(Some(1984))),
            ("book_isbn_prefix", "978".into()),
            ("book_isbn_number", Value::Null),
            ("book_title", Value::Null),
            ("book_subtitle", Value::Null),
        ]);
        let edition: Edition = read(&Query::of::<Edition>(), &partial).unwrap();
        assert_eq!(edition.book, Related::Absent);
        let edition: Edition = read(&query, &partial).unwrap();
        assert_eq!(edition.book, Related::Absent);
    }

    #[test]
    fn rows_are_merged() {
        init_logs();
        let first = Uuid::parse_str("0b3e9f8a-1c1d-4f65-8f1e-3a0c5d3e2b11").unwrap();
        let second = Uuid::parse_str("7e1f0c2d-9a4b-4c3e-b2d1-6f5e4a3b2c10").unwrap();
        let labels = [
            "id",
            "name",
            "address_street",
            "address_city",
            "address_country_code",
            "orders_id",
            "orders_total",
            "orders_version",
            "orders_customer_id",
            "orders_line_order_id",
            "orders_line_position",
            "orders_line_quantity",
            "orders_line_product_id",
        ];
        let data: [(Uuid, &str, Option<(i32, i64)>, Option<(i16, u32)>); 5] = [
            (first, "Ada", Some((10, 1250)), Some((1, 2))),
            (first, "Ada", Some((10, 1250)), Some((2, 1))),
            (second, "Bob", None, None),
            (first, "Ada", Some((11, 990)), Some((1, 5))),
            (first, "Ada", Some((10, 1250)), Some((1, 2))),
        ];
        let rows = data.into_iter().map(|(id, name, order, line)| {
            let values = [
                Value::Uuid(Some(id)),
                name.into(),
                Value::Null,
                Value::Null,
                Value::Null,
                order.map_or(Value::Null, |(id, _)| id.into()),
                order.map_or(Value::Null, |(_, total)| Value::Decimal(Some(Decimal::new(total, 2)), 10, 2)),
                order.map_or(Value::Null, |_| 1_i32.into()),
                order.map_or(Value::Null, |_| id.to_string().into()),
                order.map_or(Value::Null, |(id, _)| id.into()),
                line.map_or(Value::Null, |(position, _)| position.into()),
                line.map_or(Value::Null, |(_, quantity)| quantity.into()),
                line.map_or(Value::Null, |_| 99_i64.into()),
            ];
            labels.iter().copied().zip(values).collect::<RowLabeled>()
        });

        let registry = EntityRegistry::new();
        let query = Query::of::<Customer>().join(
            JoinDirective::new("orders.lines")
                .unwrap()
                .join_type(JoinType::LeftFetch),
        );
        let plan = JoinPlanner::plan_query(&registry, &query).unwrap();
        let customers: Vec<Customer> =
            RowMaterializer::new(&registry, registry.get::<Customer>().unwrap(), &plan)
                .read_all(rows)
                .unwrap();

        let line = |order_id, position, quantity| OrderLine {
            order_id,
            position,
            quantity,
            product: Related::NotLoaded,
        };
        let order = |id, total, lines| Order {
            id,
            total: Decimal::new(total, 2),
            version: 1,
            customer: Related::NotLoaded,
            lines,
        };
        assert_eq!(
            customers,
            [
                Customer {
                    id: first,
                    name: "Ada".into(),
                    address: None,
                    orders: vec![
                        order(10, 1250, vec![line(10, 1, 2), line(10, 2, 1)]),
                        order(11, 990, vec![line(11, 1, 5)]),
                    ],
                },
                Customer {
                    id: second,
                    name: "Bob".into(),
                    address: None,
                    orders: Vec::new(),
                },
            ]
        );
    }

    #[test]
    fn explicit_join_paths() {
        init_logs();
        let registry = EntityRegistry::new();
        let plan = JoinPlan::from_paths([PropertyPath::new("manufacturer").unwrap()]);
        let product = RowMaterializer::new(&registry, registry.get::<Product>().unwrap(), &plan)
            .read_as::<Product, _>(&product_row(
                Value::Int64(Some(1)),
                Value::Int64(Some(5)),
                "Acme".into(),
            ))
            .unwrap();
        assert_eq!(product.manufacturer.get().unwrap().name, "Acme");

        let plan = JoinPlan::from_paths([PropertyPath::new("country").unwrap()]);
        let customer = RowMaterializer::new(&registry, registry.get::<Customer>().unwrap(), &plan)
            .read_as::<Customer, _>(&row([
                ("id", Uuid::nil().to_string().into()),
                ("name", "Eve".into()),
                ("address_street", Value::Null),
                ("address_city", "Oslo".into()),
                ("address_country_code", "NO".into()),
                ("address_country_name", "Norway".into()),
            ]))
            .unwrap();
        assert_eq!(customer.address.unwrap().country.get().unwrap().name, "Norway");
    }

    #[test]
    fn many_distinct_roots() {
        init_logs();
        let registry = EntityRegistry::new();
        let plan = JoinPlan::new();
        let materializer =
            RowMaterializer::new(&registry, registry.get::<Manufacturer>().unwrap(), &plan);
        let rows = (0..40_000_i64).map(|i| {
            let id = i % 20_000;
            row([
                ("id", Value::Int64(Some(id))),
                ("name", format!("Maker {id}").into()),
            ])
        });
        let manufacturers = materializer.read_all::<Manufacturer, _>(rows).unwrap();
        assert_eq!(manufacturers.len(), 20_000);
        assert!(manufacturers.iter().enumerate().all(|(i, v)| v.id == i as i64));
        assert_eq!(manufacturers[19_999].name, "Maker 19999");
    }

    #[test]
    fn wrong_instance_type() {
        init_logs();
        let registry = EntityRegistry::new();
        let plan = JoinPlan::new();
        let materializer =
            RowMaterializer::new(&registry, registry.get::<Manufacturer>().unwrap(), &plan);
        let row = row([("id", Value::Int64(Some(3))), ("name", "Acme".into())]);
        assert!(materializer.read_as::<Manufacturer, _>(&row).is_ok());
        assert!(materializer.read_as::<Country, _>(&row).is_err());
        let error = materializer
            .read_all::<Manufacturer, _>([crate::resource::row([("id", Value::Null), ("name", Value::Null)])])
            .unwrap_err();
        assert!(format!("{error:#}").contains("While reading row 0"));
    }

    #[test]
    fn global_load() {
        init_logs();
        let query = Query::of::<Product>().join(JoinDirective::new("manufacturer").unwrap());
        let rows = [
            product_row(Value::Int64(Some(1)), Value::Int64(Some(5)), "Acme".into()),
            product_row(Value::Int64(Some(2)), Value::Int64(Some(5)), "Acme".into()),
        ];
        let products = keel::load::<Product, _>(&query, &rows).unwrap();
        assert_eq!(products.len(), 2);
        assert!(products.iter().all(|v| v.manufacturer.get().unwrap().name == "Acme"));
        assert!(keel::load::<Manufacturer, _>(&query, &rows).is_err());
        assert_eq!(keel::plan(&query).unwrap().len(), 1);
    }
}
