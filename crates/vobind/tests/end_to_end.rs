use std::collections::{BTreeMap, HashMap};

use once_cell::sync::Lazy;
use vobind::validator::gt;
use vobind::{
    coerce, joint, left_joint, BindError, Binder, DefinitionError, Entity, Field, FieldErrorKind,
    FieldType, MultiValuePolicy, Raw, RequestParts, Schema, SchemaField, Select, Value, Where,
};

struct Order;
impl Entity for Order {
    const TABLE: &'static str = "orders";
}

struct Customer;
impl Entity for Customer {
    const TABLE: &'static str = "customers";
}

static ORDER_ID: Lazy<Field<Order>> =
    Lazy::new(|| Field::new("OrderID", "order_id", "OrderID").expect("order id field"));
static AMOUNT: Lazy<Field<Order>> =
    Lazy::new(|| Field::new("Amount", "amount", "Amount").expect("amount field"));
static PRIORITY: Lazy<Field<Order>> =
    Lazy::new(|| Field::new("Priority", "priority", "Priority").expect("priority field"));
static CUSTOMER_FK: Lazy<Field<Order>> =
    Lazy::new(|| Field::new("CustomerID", "customer_id", "CustomerID").expect("fk field"));
static CUSTOMER_ID: Lazy<Field<Customer>> =
    Lazy::new(|| Field::new("ID", "id", "id").expect("customer id field"));

static ORDER_SCHEMA: Lazy<Schema> = Lazy::new(|| {
    Schema::builder()
        .field(SchemaField::required(&*ORDER_ID, FieldType::String))
        .field(SchemaField::required(&*AMOUNT, FieldType::F64).validate(gt(0.0)))
        .field(SchemaField::optional(&*PRIORITY, FieldType::I32))
        .build()
        .expect("order schema")
});

/// Minimal adapter request: a fixed body plus parameter maps.
struct FakeRequest {
    body: Vec<u8>,
    path: HashMap<String, String>,
    query: HashMap<String, Vec<String>>,
    trace_id: &'static str,
}

impl FakeRequest {
    fn json(body: &str) -> Self {
        Self {
            body: body.as_bytes().to_vec(),
            path: HashMap::new(),
            query: HashMap::new(),
            trace_id: "t1",
        }
    }

    fn path(mut self, key: &str, value: &str) -> Self {
        self.path.insert(key.to_string(), value.to_string());
        self
    }

    fn query(mut self, key: &str, values: &[&str]) -> Self {
        self.query.insert(
            key.to_string(),
            values.iter().map(|v| v.to_string()).collect(),
        );
        self
    }
}

impl RequestParts for FakeRequest {
    type Error = std::io::Error;

    fn read_body(&mut self) -> Result<Vec<u8>, Self::Error> {
        Ok(std::mem::take(&mut self.body))
    }

    fn path_params(&self) -> HashMap<String, String> {
        self.path.clone()
    }

    fn query_params(&self) -> HashMap<String, Vec<String>> {
        self.query.clone()
    }
}

fn binder() -> Binder<FakeRequest> {
    Binder::new(ORDER_SCHEMA.clone())
}

#[test]
fn test_order_binds_present_fields_only() -> anyhow::Result<()> {
    let vo = binder().bind(&mut FakeRequest::json(r#"{"OrderID":"o1","Amount":12.5}"#))?;

    assert_eq!(vo.keys().collect::<Vec<_>>(), ["Amount", "OrderID"]);
    assert_eq!(vo.get("OrderID"), Some(&Value::from("o1")));
    assert_eq!(vo.get_as::<f64>("Amount"), Some(12.5));
    assert!(!vo.contains("Priority"));
    Ok(())
}

#[test]
fn test_order_constraint_violation_cites_amount() {
    let err = binder()
        .bind(&mut FakeRequest::json(r#"{"OrderID":"o1","Amount":-1}"#))
        .unwrap_err();

    let BindError::Validation(err) = err else {
        panic!("expected validation error");
    };
    let errors = err.field_errors().expect("field errors");
    assert_eq!(errors.len(), 1);
    let e = errors.by_field("Amount").next().expect("Amount error");
    assert!(matches!(e.kind, FieldErrorKind::Constraint { .. }));
}

#[test]
fn test_order_enrichment_adds_trace_id() -> anyhow::Result<()> {
    let binder = binder();
    assert!(binder.enrichment().set(|req: &FakeRequest| {
        BTreeMap::from([("traceId".to_string(), Value::from(req.trace_id))])
    }));
    // second configuration is ignored
    assert!(!binder
        .enrichment()
        .set(|_: &FakeRequest| BTreeMap::from([("traceId".to_string(), Value::from("t2"))])));

    let vo = binder.bind(&mut FakeRequest::json(r#"{"OrderID":"o1","Amount":12.5}"#))?;
    let json = serde_json::to_value(&vo)?;
    assert_eq!(
        json,
        serde_json::json!({"OrderID": "o1", "Amount": 12.5, "traceId": "t1"})
    );
    Ok(())
}

#[test]
fn test_missing_required_and_optional_fields() {
    let err = binder()
        .bind(&mut FakeRequest::json(r#"{"Amount":3}"#))
        .unwrap_err();
    let BindError::Validation(err) = err else {
        panic!("expected validation error");
    };
    let errors = err.field_errors().expect("field errors");
    let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
    assert_eq!(fields, ["OrderID"]);
    assert_eq!(errors.iter().next().map(|e| e.kind.code()), Some("missing"));
}

#[test]
fn test_params_fill_the_record() -> anyhow::Result<()> {
    let mut req = FakeRequest::json("")
        .path("OrderID", "o9")
        .query("Amount", &["4.25"])
        .query("Priority", &["3"])
        .query("unused", &[]);

    let vo = binder().bind(&mut req)?;
    assert_eq!(vo.get("OrderID"), Some(&Value::from("o9")));
    assert_eq!(vo.get_as::<f64>("Amount"), Some(4.25));
    assert_eq!(vo.get_as::<i64>("Priority"), Some(3));
    Ok(())
}

#[test]
fn test_path_query_conflict_is_a_definition_error() {
    let mut req = FakeRequest::json(r#"{"Amount":1}"#)
        .path("OrderID", "o1")
        .query("OrderID", &["o2"]);

    let err = binder().bind(&mut req).unwrap_err();
    assert!(matches!(
        err,
        BindError::Definition(DefinitionError::ParamConflict { ref key }) if key == "OrderID"
    ));
    assert!(!err.is_client_error());
}

#[test]
fn test_sequence_policy_binds_lists() -> anyhow::Result<()> {
    struct Article;
    impl Entity for Article {
        const TABLE: &'static str = "articles";
    }
    let tags = Field::<Article>::new("Tags", "tags", "tags")?;
    let schema = Schema::builder()
        .field(SchemaField::optional(&tags, FieldType::list(FieldType::U8)))
        .build()?;

    let mut req = FakeRequest::json("").query("tags", &["1", "2", "300"]);
    let err = Binder::new(schema.clone())
        .with_multi_value(MultiValuePolicy::Sequence)
        .bind(&mut req)
        .unwrap_err();
    let BindError::Validation(err) = err else {
        panic!("expected validation error");
    };
    assert!(err
        .field_errors()
        .expect("field errors")
        .iter()
        .all(|e| e.kind.is_overflow()));

    let mut req = FakeRequest::json("").query("tags", &["1", "2"]);
    let vo = Binder::new(schema)
        .with_multi_value(MultiValuePolicy::Sequence)
        .bind(&mut req)?;
    assert_eq!(vo.get("tags"), Some(&Value::from(vec![1_u64, 2])));
    Ok(())
}

#[test]
fn test_invalid_json_is_rejected_before_fields() {
    let err = binder()
        .bind(&mut FakeRequest::json(r#"{"OrderID": "#))
        .unwrap_err();
    assert!(err.is_client_error());
    let BindError::Validation(err) = err else {
        panic!("expected validation error");
    };
    assert!(err.field_errors().is_none());
}

#[test]
fn test_i64_overflow_is_tagged() {
    let kind = coerce(Raw::Text("9223372036854775808"), &FieldType::I64).unwrap_err();
    assert!(kind.is_overflow());

    let kind = coerce(Raw::Text("92233720368547758x"), &FieldType::I64).unwrap_err();
    assert!(!kind.is_overflow());
}

#[test]
fn test_timestamp_layouts() {
    assert!(coerce(Raw::Text("2024-01-15T10:00:00Z"), &FieldType::Timestamp).is_ok());
    assert!(coerce(Raw::Text("2024-01-15"), &FieldType::Timestamp).is_ok());
    assert!(matches!(
        coerce(Raw::Text("01/15/2024"), &FieldType::Timestamp),
        Err(FieldErrorKind::BadDateFormat { .. })
    ));
}

#[test]
fn test_query_fragments() {
    let (sql, args) = Where::in_list(&*ORDER_ID, Vec::<&str>::new()).build();
    assert_eq!(sql, "1=0");
    assert!(args.is_empty());

    let (sql, args) = Where::<Order>::and([Where::empty(), Where::empty()]).build();
    assert_eq!(sql, "");
    assert!(args.is_empty());
    let (sql, args) = Where::<Order>::or(Vec::<Where<Order>>::new()).build();
    assert_eq!(sql, "");
    assert!(args.is_empty());

    assert_eq!(
        joint(&*CUSTOMER_FK, &*CUSTOMER_ID).clause(),
        "INNER JOIN customers ON orders.customer_id = customers.id"
    );
    assert_eq!(
        left_joint(&*CUSTOMER_FK, &*CUSTOMER_ID).clause(),
        "LEFT JOIN customers ON orders.customer_id = customers.id"
    );

    let (sql, args) = Select::<Order>::new()
        .schema_columns(&ORDER_SCHEMA)
        .join(&joint(&*CUSTOMER_FK, &*CUSTOMER_ID))
        .filter(&Where::and([
            Some(Where::gte(&*AMOUNT, 10)),
            None,
            Some(Where::ne(&*ORDER_ID, "o0")),
        ]))
        .limit(5)
        .to_sql();
    assert_eq!(
        sql,
        "SELECT orders.order_id, orders.amount, orders.priority FROM orders \
         INNER JOIN customers ON orders.customer_id = customers.id \
         WHERE (orders.amount >= ? AND orders.order_id <> ?) LIMIT ?"
    );
    assert_eq!(
        args,
        vec![Value::Int(10), Value::from("o0"), Value::UInt(5)]
    );
}
