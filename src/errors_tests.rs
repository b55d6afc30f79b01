// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `errors`

#[cfg(test)]
mod tests {
    use crate::errors::Error;
    use kube::core::response::StatusSummary;
    use kube::core::Status;

    fn api_error(code: u16) -> Error {
        Error::Api(kube::Error::Api(Box::new(Status {
            status: Some(StatusSummary::Failure),
            message: "boom".to_string(),
            reason: "TestReason".to_string(),
            code,
            metadata: None,
            details: None,
        })))
    }

    #[test]
    fn test_is_not_found_own_variant() {
        let err = Error::NotFound {
            kind: "ProwJob",
            name: "hello".to_string(),
        };
        assert!(err.is_not_found());
    }

    #[test]
    fn test_is_not_found_api_404() {
        assert!(api_error(404).is_not_found());
        assert!(!api_error(500).is_not_found());
        assert!(!api_error(409).is_not_found());
    }

    #[test]
    fn test_is_not_found_other_variants() {
        assert!(!Error::EmptyBuildId.is_not_found());
        assert!(!Error::Other("whatever".to_string()).is_not_found());
        assert!(!Error::MalformedKey {
            key: "a/b".to_string()
        }
        .is_not_found());
    }

    #[test]
    fn test_display_messages() {
        let err = Error::MissingPipelineSpec {
            key: "default/ns/world".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "no pipeline_run_spec defined in ProwJob/default/ns/world"
        );

        let err = Error::BuildIdVend {
            job: "unit".to_string(),
            reason: "connection refused".to_string(),
        };
        assert_eq!(err.to_string(), "vend build id for \"unit\": connection refused");

        let err = Error::NoClusterConfig {
            context: "build-eu".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "no cluster configuration found for context \"build-eu\""
        );
    }
}
