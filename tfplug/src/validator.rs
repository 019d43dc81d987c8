use crate::schema::{Validator, ValidatorRequest, ValidatorResponse};
use crate::types::{Diagnostic, Dynamic};

/// Requires a whole number no smaller than `min`
pub struct IntegerAtLeast {
    pub min: i64,
}

impl IntegerAtLeast {
    pub fn create(min: i64) -> Box<dyn Validator> {
        Box::new(Self { min })
    }
}

impl Validator for IntegerAtLeast {
    fn description(&self) -> String {
        format!("value must be a whole number of at least {}", self.min)
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let mut diagnostics = vec![];

        // Null and unknown values are checked again once known
        if let Dynamic::Number(n) = request.config_value.value {
            if n.fract() != 0.0 {
                diagnostics.push(
                    Diagnostic::error(
                        format!("{} must be a whole number", request.path),
                        format!("Got {}", n),
                    )
                    .with_attribute(request.path.clone()),
                );
            } else if n < self.min as f64 {
                diagnostics.push(
                    Diagnostic::error(
                        format!("{} must be at least {}", request.path, self.min),
                        format!("Got {}", n),
                    )
                    .with_attribute(request.path.clone()),
                );
            }
        }

        ValidatorResponse { diagnostics }
    }
}
