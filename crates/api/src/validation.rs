use crate::error::ApiError;
use validator::{Validate, ValidationErrors};

pub fn validate<T: Validate>(value: &T) -> Result<(), ApiError> {
    value.validate().map_err(invalid_fields)
}

fn invalid_fields(errors: ValidationErrors) -> ApiError {
    let mut fields: Vec<String> = errors
        .field_errors()
        .into_keys()
        .map(|field| field.to_string())
        .collect();
    fields.sort_unstable();
    ApiError::Validation(format!("invalid fields: {}", fields.join(", ")))
}
