use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::Error;

/// Deserialize an already validated value with JSON-path context in error messages.
pub fn from_value_with_path<T: DeserializeOwned>(value: Value) -> Result<T, Error> {
    match serde_path_to_error::deserialize::<_, T>(value) {
        Ok(v) => Ok(v),
        Err(err) => {
            let path = err.path().to_string();
            Err(Error::Typed { path, message: err.into_inner().to_string() })
        }
    }
}

pub fn to_value_with_path<T: Serialize>(value: &T) -> Result<Value, Error> {
    match serde_path_to_error::serialize(value, serde_json::value::Serializer) {
        Ok(v) => Ok(v),
        Err(err) => {
            let path = err.path().to_string();
            Err(Error::Typed { path, message: err.into_inner().to_string() })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    #[allow(dead_code)]
    struct Distance {
        miles: u32,
        km: u32,
    }

    #[derive(Debug, Deserialize)]
    #[allow(dead_code)]
    struct Leg {
        distance: Distance,
    }

    #[test]
    fn typed_errors_carry_the_path() {
        let err = from_value_with_path::<Leg>(json!({"distance": {"miles": 1, "km": -2}})).unwrap_err();
        match err {
            Error::Typed { path, .. } => assert_eq!(path, "distance.km"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
