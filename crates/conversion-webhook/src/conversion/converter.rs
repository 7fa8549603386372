use serde_json::Value;

use super::errors::ConversionError;

/// Converts one object to the desired API version.
///
/// The object is handed over by value: the converter owns it and the result
/// never aliases the decoded request.
pub trait Converter {
    fn convert(&self, object: Value, desired_api_version: &str) -> Result<Value, ConversionError>;
}

impl<F> Converter for F
where
    F: Fn(Value, &str) -> Result<Value, ConversionError>,
{
    fn convert(&self, object: Value, desired_api_version: &str) -> Result<Value, ConversionError> {
        self(object, desired_api_version)
    }
}

/// Relabels the object with the desired API version and leaves every other
/// field untouched. Enough for versions that share the same schema.
#[derive(Clone, Debug, Default)]
pub struct ApiVersionConverter;

impl Converter for ApiVersionConverter {
    fn convert(
        &self,
        mut object: Value,
        desired_api_version: &str,
    ) -> Result<Value, ConversionError> {
        if desired_api_version.is_empty() {
            return Err(ConversionError::MissingDesiredApiVersion);
        }

        let fields = object.as_object_mut().ok_or(ConversionError::NotAnObject)?;
        match fields.get("kind") {
            Some(Value::String(kind)) if !kind.is_empty() => {}
            _ => return Err(ConversionError::MissingKind),
        }

        fields.insert(
            "apiVersion".to_owned(),
            Value::String(desired_api_version.to_owned()),
        );

        Ok(object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[test]
    fn sets_the_desired_api_version() {
        let converted = ApiVersionConverter
            .convert(
                json!({"apiVersion": "v1", "kind": "Foo", "spec": {"x": 1}}),
                "v2",
            )
            .unwrap();

        assert_eq!(
            converted,
            json!({"apiVersion": "v2", "kind": "Foo", "spec": {"x": 1}})
        );
    }

    #[test]
    fn converting_to_the_current_version_is_a_noop() {
        let object = json!({
            "apiVersion": "stable.example.com/v1",
            "kind": "CronTab",
            "metadata": {"name": "my-crontab", "labels": {"app": "demo"}},
            "spec": {"cronSpec": "* * * * */5", "replicas": 3}
        });

        let converted = ApiVersionConverter
            .convert(object.clone(), "stable.example.com/v1")
            .unwrap();

        assert_eq!(converted, object);
    }

    #[test]
    fn missing_api_version_is_added() {
        let converted = ApiVersionConverter
            .convert(json!({"kind": "Foo"}), "v2")
            .unwrap();

        assert_eq!(converted["apiVersion"], "v2");
    }

    #[rstest]
    #[case::array(json!([1, 2]), ConversionError::NotAnObject)]
    #[case::string(json!("Foo"), ConversionError::NotAnObject)]
    #[case::no_kind(json!({"apiVersion": "v1"}), ConversionError::MissingKind)]
    #[case::empty_kind(json!({"apiVersion": "v1", "kind": ""}), ConversionError::MissingKind)]
    #[case::kind_not_a_string(json!({"kind": 42}), ConversionError::MissingKind)]
    fn rejects_malformed_objects(#[case] object: Value, #[case] expected: ConversionError) {
        assert_eq!(ApiVersionConverter.convert(object, "v2"), Err(expected));
    }

    #[test]
    fn rejects_empty_desired_version() {
        assert_eq!(
            ApiVersionConverter.convert(json!({"kind": "Foo"}), ""),
            Err(ConversionError::MissingDesiredApiVersion)
        );
    }

    #[test]
    fn closures_are_converters() {
        let converter = |_: Value, _: &str| -> Result<Value, ConversionError> {
            Err(ConversionError::Rejected("nope".to_owned()))
        };

        assert_eq!(
            converter.convert(json!({"kind": "Foo"}), "v2"),
            Err(ConversionError::Rejected("nope".to_owned()))
        );
    }
}
