//! Value-object schemas and the validation pass.

use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::coerce::{coerce, FieldType, Raw};
use crate::entity::{ColumnRef, Entity, Field};
use crate::error::{DefinitionError, FieldErrorKind, FieldErrors, Result, ValidationError};
use crate::params::{ParamValue, Params};
use crate::validator::Validator;
use crate::value_object::ValueObject;

/// One field of a schema: column, declared type, presence rule and validators.
#[derive(Debug, Clone)]
pub struct SchemaField {
    column: ColumnRef,
    ty: FieldType,
    required: bool,
    validators: Vec<Validator>,
}

impl SchemaField {
    pub fn required<E: Entity>(field: &Field<E>, ty: FieldType) -> Self {
        Self::new(field.erase(), ty, true)
    }

    pub fn optional<E: Entity>(field: &Field<E>, ty: FieldType) -> Self {
        Self::new(field.erase(), ty, false)
    }

    fn new(column: ColumnRef, ty: FieldType, required: bool) -> Self {
        Self {
            column,
            ty,
            required,
            validators: Vec::new(),
        }
    }

    /// Attaches a validator; all attached validators run on every pass.
    pub fn validate(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn column(&self) -> &ColumnRef {
        &self.column
    }

    pub fn view_name(&self) -> &str {
        self.column.view_name()
    }

    pub fn ty(&self) -> &FieldType {
        &self.ty
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn validators(&self) -> &[Validator] {
        &self.validators
    }
}

/// Ordered, duplicate-free set of fields describing one value object.
///
/// Immutable once built and cheap to share (`Arc` inside); read concurrently
/// from any number of request handlers.
#[derive(Debug, Clone)]
pub struct Schema {
    fields: Arc<[SchemaField]>,
}

#[derive(Debug, Default)]
pub struct SchemaBuilder {
    fields: Vec<SchemaField>,
}

impl SchemaBuilder {
    pub fn field(mut self, field: SchemaField) -> Self {
        self.fields.push(field);
        self
    }

    /// Fails with [`DefinitionError::DuplicateField`] on a repeated view-name.
    pub fn build(self) -> Result<Schema> {
        let mut seen = HashSet::with_capacity(self.fields.len());
        for f in &self.fields {
            if !seen.insert(f.view_name()) {
                return Err(DefinitionError::DuplicateField {
                    view: f.view_name().to_string(),
                });
            }
        }
        Ok(Schema {
            fields: self.fields.into(),
        })
    }
}

impl Schema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    pub fn fields(&self) -> &[SchemaField] {
        &self.fields
    }

    pub fn field(&self, view: &str) -> Option<&SchemaField> {
        self.fields.iter().find(|f| f.view_name() == view)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn view_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.view_name())
    }

    /// Binds and validates one request.
    ///
    /// The body is decoded as a JSON object (an empty body counts as `{}`).
    /// For each field the body wins over `params`; a JSON `null` counts as
    /// absent. Every field is inspected and every validator runs, so the
    /// returned [`ValidationError::Fields`] carries all failures at once.
    pub fn validate(
        &self,
        body: &[u8],
        params: &Params,
    ) -> std::result::Result<ValueObject, ValidationError> {
        let body = decode_body(body)?;
        let mut errors = FieldErrors::new();
        let mut record = ValueObject::new();

        for field in self.fields.iter() {
            let view = field.view_name();
            let raw = match body.get(view) {
                Some(serde_json::Value::Null) | None => params.get(view).map(|p| match p {
                    ParamValue::Single(s) => Raw::Text(s),
                    ParamValue::Multi(items) => Raw::Texts(items),
                }),
                Some(v) => Some(Raw::Json(v)),
            };

            let Some(raw) = raw else {
                if field.required {
                    errors.push(view, FieldErrorKind::Missing);
                }
                continue;
            };

            let value = match coerce(raw, &field.ty) {
                Ok(value) => value,
                Err(kind) => {
                    trace!(field = view, error = %kind, "coercion failed");
                    errors.push(view, kind);
                    continue;
                }
            };

            for validator in &field.validators {
                if let Err(message) = validator.check(&value) {
                    errors.push(
                        view,
                        FieldErrorKind::Constraint {
                            validator: validator.name().to_string(),
                            message,
                        },
                    );
                }
            }
            record.set(view, value);
        }

        if !errors.is_empty() {
            debug!(errors = errors.len(), "validation failed");
            return Err(ValidationError::Fields(errors));
        }
        debug!(fields = record.len(), "validation succeeded");
        Ok(record)
    }

    /// [`validate`](Self::validate) for callers holding the body as text.
    pub fn validate_str(
        &self,
        body: &str,
        params: &Params,
    ) -> std::result::Result<ValueObject, ValidationError> {
        self.validate(body.as_bytes(), params)
    }
}

type JsonObject = serde_json::Map<String, serde_json::Value>;

fn decode_body(body: &[u8]) -> std::result::Result<JsonObject, ValidationError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(JsonObject::new());
    }
    Ok(serde_json::from_slice(body)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::{gt, must_be_true};
    use crate::value::Value;

    struct Order;
    impl Entity for Order {
        const TABLE: &'static str = "orders";
    }

    fn field(name: &str, column: &str) -> Field<Order> {
        Field::new(name, column, name).unwrap()
    }

    fn order_schema() -> Schema {
        Schema::builder()
            .field(SchemaField::required(&field("OrderID", "order_id"), FieldType::String))
            .field(
                SchemaField::required(&field("Amount", "amount"), FieldType::F64)
                    .validate(gt(0.0)),
            )
            .field(SchemaField::optional(&field("Priority", "priority"), FieldType::I32))
            .build()
            .unwrap()
    }

    fn single(pairs: &[(&str, &str)]) -> Params {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), ParamValue::Single(v.to_string())))
            .collect()
    }

    #[test]
    fn test_duplicate_view_name_is_rejected() {
        let err = Schema::builder()
            .field(SchemaField::required(&field("OrderID", "order_id"), FieldType::String))
            .field(SchemaField::optional(&field("OrderID", "other"), FieldType::String))
            .build()
            .unwrap_err();
        assert_eq!(err, DefinitionError::DuplicateField { view: "OrderID".into() });
    }

    #[test]
    fn test_valid_body_binds_present_fields() {
        let vo = order_schema()
            .validate_str(r#"{"OrderID":"o1","Amount":12.5}"#, &Params::new())
            .unwrap();
        assert_eq!(vo.keys().collect::<Vec<_>>(), ["Amount", "OrderID"]);
        assert_eq!(vo.get("OrderID"), Some(&Value::from("o1")));
        assert_eq!(vo.get("Amount"), Some(&Value::Float(12.5)));
        assert!(!vo.contains("Priority"));
    }

    #[test]
    fn test_constraint_failure_cites_field() {
        let err = order_schema()
            .validate_str(r#"{"OrderID":"o1","Amount":-1}"#, &Params::new())
            .unwrap_err();
        let errs = err.field_errors().unwrap();
        assert_eq!(errs.len(), 1);
        let e = errs.iter().next().unwrap();
        assert_eq!(e.field, "Amount");
        assert_eq!(e.kind.code(), "constraint");
    }

    #[test]
    fn test_errors_accumulate() {
        let err = order_schema()
            .validate_str(r#"{"Amount":"abc","Priority":"99999999999"}"#, &Params::new())
            .unwrap_err();
        let errs = err.field_errors().unwrap();
        let codes: Vec<_> = errs.iter().map(|e| (e.field.as_str(), e.kind.code())).collect();
        assert_eq!(
            codes,
            [("OrderID", "missing"), ("Amount", "parse"), ("Priority", "overflow")]
        );
    }

    #[test]
    fn test_all_validators_run() {
        let schema = Schema::builder()
            .field(
                SchemaField::required(&field("Flag", "flag"), FieldType::Bool)
                    .validate(must_be_true())
                    .validate(crate::validator::Validator::new("never", |_| {
                        Err("always fails".into())
                    })),
            )
            .build()
            .unwrap();
        let err = schema.validate_str(r#"{"Flag":false}"#, &Params::new()).unwrap_err();
        assert_eq!(err.field_errors().unwrap().by_field("Flag").count(), 2);
    }

    #[test]
    fn test_params_fill_missing_body_fields() {
        let params = single(&[("OrderID", "o7"), ("Amount", "3"), ("Priority", "2")]);
        let vo = order_schema()
            .validate_str(r#"{"Amount":4.5,"Priority":null}"#, &params)
            .unwrap();
        assert_eq!(vo.get("OrderID"), Some(&Value::from("o7")));
        // body wins over params
        assert_eq!(vo.get("Amount"), Some(&Value::Float(4.5)));
        // null falls back to params
        assert_eq!(vo.get_as::<i64>("Priority"), Some(2));
    }

    #[test]
    fn test_empty_body_uses_params_only() {
        let params = single(&[("OrderID", "o7"), ("Amount", "1")]);
        let vo = order_schema().validate(b"  ", &params).unwrap();
        assert_eq!(vo.len(), 2);
    }

    #[test]
    fn test_invalid_json_is_distinct() {
        let err = order_schema().validate_str("{not json", &Params::new()).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidJson(_)));
        assert!(err.field_errors().is_none());

        let err = order_schema().validate_str("[1,2]", &Params::new()).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidJson(_)));
    }

    #[test]
    fn test_multi_value_param_binds_list() {
        let schema = Schema::builder()
            .field(SchemaField::optional(
                &field("Tags", "tags"),
                FieldType::list(FieldType::String),
            ))
            .build()
            .unwrap();
        let params = Params::from([(
            "Tags".to_string(),
            ParamValue::Multi(vec!["a".into(), "b".into()]),
        )]);
        let vo = schema.validate(b"", &params).unwrap();
        assert_eq!(
            vo.get("Tags"),
            Some(&Value::List(vec![Value::from("a"), Value::from("b")]))
        );
    }
}
