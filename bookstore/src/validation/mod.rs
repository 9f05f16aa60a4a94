use crate::schema::Field;
use crate::values::{AttrValue, AttributeSet};
use std::fmt;
use thiserror::Error;

/// The first rule an attribute set violated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("field '{field}' {reason}")]
pub struct ValidationError {
    pub field: String,
    pub reason: ValidationReason,
}

impl ValidationError {
    pub fn new(field: impl ToString, reason: ValidationReason) -> Self {
        Self {
            field: field.to_string(),
            reason,
        }
    }

    /// Whether this error is about the given field.
    pub fn is_for(&self, field: Field) -> bool {
        self.field == field.as_str()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationReason {
    /// A required field is absent or null.
    Missing,
    /// A required text field is empty.
    Empty,
    Negative,
    NotAnInteger,
    NotText,
    UnknownField,
    /// The key names a column the store assigns itself.
    ReadOnly,
}

impl fmt::Display for ValidationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ValidationReason::Missing => "is required",
            ValidationReason::Empty => "must not be empty",
            ValidationReason::Negative => "must not be negative",
            ValidationReason::NotAnInteger => "must be an integer",
            ValidationReason::NotText => "must be text",
            ValidationReason::UnknownField => "is not a book field",
            ValidationReason::ReadOnly => "is assigned by the store and cannot be written",
        };
        f.write_str(text)
    }
}

/// Outcome of validating an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdatePlan {
    /// Nothing to write; the caller should skip storage entirely.
    NoOp,
    Write,
}

/// Validate the attributes of a new book.
///
/// Rules are checked in a fixed order (name, price, quantity, supplier name,
/// then the type-only check on supplier phone) and the first violation is
/// returned. Category is nullable free text and has no rule.
pub fn validate_for_insert(attrs: &AttributeSet) -> Result<(), ValidationError> {
    check(attrs, Presence::Required)
}

/// Validate a partial update. Only fields present in `attrs` are checked.
pub fn validate_for_update(attrs: &AttributeSet) -> Result<UpdatePlan, ValidationError> {
    if attrs.is_empty() {
        return Ok(UpdatePlan::NoOp);
    }
    check(attrs, Presence::IfPresent)?;
    Ok(UpdatePlan::Write)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Presence {
    Required,
    IfPresent,
}

fn check(attrs: &AttributeSet, presence: Presence) -> Result<(), ValidationError> {
    check_required_text(attrs, Field::Name, presence)?;
    check_non_negative(attrs, Field::Price)?;
    check_non_negative(attrs, Field::Quantity)?;
    check_required_text(attrs, Field::SupplierName, presence)?;
    // Supplier phone only needs to be an integer; no range is enforced.
    check_integer(attrs, Field::SupplierPhone)?;
    Ok(())
}

fn check_required_text(
    attrs: &AttributeSet,
    field: Field,
    presence: Presence,
) -> Result<(), ValidationError> {
    match attrs.get(field) {
        None if presence == Presence::IfPresent => Ok(()),
        None | Some(AttrValue::Null) => Err(ValidationError::new(field, ValidationReason::Missing)),
        Some(value) => match value.to_text() {
            Some(text) if text.trim().is_empty() => {
                Err(ValidationError::new(field, ValidationReason::Empty))
            }
            Some(_) => Ok(()),
            None => Err(ValidationError::new(field, ValidationReason::NotText)),
        },
    }
}

fn check_non_negative(attrs: &AttributeSet, field: Field) -> Result<(), ValidationError> {
    match parse_integer(attrs, field)? {
        Some(n) if n < 0 => Err(ValidationError::new(field, ValidationReason::Negative)),
        _ => Ok(()),
    }
}

fn check_integer(attrs: &AttributeSet, field: Field) -> Result<(), ValidationError> {
    parse_integer(attrs, field).map(|_| ())
}

/// A present, non-null value must parse as an integer. Null is allowed here
/// and left to the storage engine's column constraints.
fn parse_integer(attrs: &AttributeSet, field: Field) -> Result<Option<i64>, ValidationError> {
    match attrs.get(field) {
        None | Some(AttrValue::Null) => Ok(None),
        Some(value) => value
            .to_integer()
            .map(Some)
            .ok_or_else(|| ValidationError::new(field, ValidationReason::NotAnInteger)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn valid_book() -> AttributeSet {
        AttributeSet::new()
            .with(Field::Name, "Book A")
            .with(Field::SupplierName, "Acme")
            .with(Field::Price, 10)
            .with(Field::Quantity, 5)
    }

    #[test]
    fn test_valid_insert() {
        assert_eq!(validate_for_insert(&valid_book()), Ok(()));
    }

    #[test]
    fn test_insert_requires_name() {
        let mut attrs = valid_book();
        attrs.remove(Field::Name);
        let err = validate_for_insert(&attrs).unwrap_err();
        assert!(err.is_for(Field::Name));
        assert_eq!(err.reason, ValidationReason::Missing);
    }

    #[test]
    fn test_insert_rejects_empty_name() {
        let attrs = valid_book().with(Field::Name, "  ");
        let err = validate_for_insert(&attrs).unwrap_err();
        assert!(err.is_for(Field::Name));
        assert_eq!(err.reason, ValidationReason::Empty);
    }

    #[test]
    fn test_insert_requires_supplier_name() {
        let mut attrs = valid_book();
        attrs.remove(Field::SupplierName);
        let err = validate_for_insert(&attrs).unwrap_err();
        assert!(err.is_for(Field::SupplierName));
        assert_eq!(err.reason, ValidationReason::Missing);

        let attrs = valid_book().with(Field::SupplierName, AttrValue::Null);
        let err = validate_for_insert(&attrs).unwrap_err();
        assert!(err.is_for(Field::SupplierName));
    }

    #[test]
    fn test_price_and_quantity_are_optional() {
        let attrs = AttributeSet::new()
            .with(Field::Name, "Book A")
            .with(Field::SupplierName, "Acme");
        assert_eq!(validate_for_insert(&attrs), Ok(()));
    }

    #[test]
    fn test_negative_values_rejected() {
        let err = validate_for_insert(&valid_book().with(Field::Price, -1)).unwrap_err();
        assert!(err.is_for(Field::Price));
        assert_eq!(err.reason, ValidationReason::Negative);

        let err = validate_for_insert(&valid_book().with(Field::Quantity, -3)).unwrap_err();
        assert!(err.is_for(Field::Quantity));
        assert_eq!(err.reason, ValidationReason::Negative);
    }

    #[test]
    fn test_zero_is_allowed() {
        let attrs = valid_book().with(Field::Price, 0).with(Field::Quantity, 0);
        assert_eq!(validate_for_insert(&attrs), Ok(()));
    }

    #[test]
    fn test_integer_fields_accept_numeric_text() {
        let attrs = valid_book().with(Field::Price, "12").with(Field::Quantity, "x");
        let err = validate_for_insert(&attrs).unwrap_err();
        assert!(err.is_for(Field::Quantity));
        assert_eq!(err.reason, ValidationReason::NotAnInteger);
    }

    #[test]
    fn test_first_violation_wins() {
        let attrs = AttributeSet::new()
            .with(Field::Name, "")
            .with(Field::Price, -1);
        let err = validate_for_insert(&attrs).unwrap_err();
        assert!(err.is_for(Field::Name));

        let attrs = AttributeSet::new()
            .with(Field::Name, "Book A")
            .with(Field::Quantity, -1)
            .with(Field::Price, -1);
        let err = validate_for_insert(&attrs).unwrap_err();
        assert!(err.is_for(Field::Price));

        // Quantity is checked before the missing supplier name
        let attrs = AttributeSet::new()
            .with(Field::Name, "Book A")
            .with(Field::Quantity, -1);
        let err = validate_for_insert(&attrs).unwrap_err();
        assert!(err.is_for(Field::Quantity));
    }

    #[test]
    fn test_supplier_phone_has_no_range_check() {
        let attrs = valid_book().with(Field::SupplierPhone, -5);
        assert_eq!(validate_for_insert(&attrs), Ok(()));

        let attrs = valid_book().with(Field::SupplierPhone, "call me");
        let err = validate_for_insert(&attrs).unwrap_err();
        assert!(err.is_for(Field::SupplierPhone));
    }

    #[test]
    fn test_category_accepts_any_value() {
        for category in [
            AttrValue::Null,
            AttrValue::from(""),
            AttrValue::from(42),
            AttrValue::from("Fiction"),
        ] {
            let attrs = valid_book().with(Field::Category, category);
            assert_eq!(validate_for_insert(&attrs), Ok(()));
            assert_eq!(validate_for_update(&attrs), Ok(UpdatePlan::Write));
        }
    }

    #[test]
    fn test_partial_update_does_not_require_absent_fields() {
        let attrs = AttributeSet::new().with(Field::Quantity, 5);
        assert_eq!(validate_for_update(&attrs), Ok(UpdatePlan::Write));
    }

    #[test]
    fn test_empty_update_is_noop() {
        assert_eq!(validate_for_update(&AttributeSet::new()), Ok(UpdatePlan::NoOp));
    }

    #[test]
    fn test_update_checks_present_fields() {
        let err = validate_for_update(&AttributeSet::new().with(Field::Name, "")).unwrap_err();
        assert!(err.is_for(Field::Name));

        let err = validate_for_update(&AttributeSet::new().with(Field::Quantity, -2)).unwrap_err();
        assert!(err.is_for(Field::Quantity));
    }

    #[test]
    fn test_update_checks_supplier_name_when_present() {
        // Supplier name is checked on its own key, independent of name
        let attrs = AttributeSet::new().with(Field::SupplierName, AttrValue::Null);
        let err = validate_for_update(&attrs).unwrap_err();
        assert!(err.is_for(Field::SupplierName));
        assert_eq!(err.reason, ValidationReason::Missing);

        let attrs = AttributeSet::new().with(Field::Name, "Renamed");
        assert_eq!(validate_for_update(&attrs), Ok(UpdatePlan::Write));
    }

    #[test]
    fn test_error_message() {
        let err = ValidationError::new(Field::Price, ValidationReason::Negative);
        assert_eq!(err.to_string(), "field 'price' must not be negative");
    }
}
