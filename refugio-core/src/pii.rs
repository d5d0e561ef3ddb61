use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Wrapper for contact data that must not leak into Debug/Display output.
/// Serialization passes the inner value through so API responses and stored
/// JSON keep the real value; only log formatting is masked.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct Masked<T>(pub T);

impl<T> Masked<T> {
    pub fn new(value: T) -> Self {
        Masked(value)
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T: fmt::Display> fmt::Debug for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "********")
    }
}

impl<T: fmt::Display> fmt::Display for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "********")
    }
}

impl<T: Serialize> Serialize for Masked<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_is_masked() {
        let email = Masked::new("guest@example.com".to_string());
        assert_eq!(format!("{:?}", email), "********");
        assert_eq!(format!("{}", email), "********");
    }

    #[test]
    fn serialization_keeps_the_value() {
        let email = Masked::new("guest@example.com".to_string());
        let json = serde_json::to_string(&email).unwrap();
        assert_eq!(json, "\"guest@example.com\"");
    }
}
