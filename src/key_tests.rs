// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `key`

#[cfg(test)]
mod tests {
    use crate::errors::Error;
    use crate::key::RunKey;

    #[test]
    fn test_display() {
        let key = RunKey::new("default", "pipelines", "world");
        assert_eq!(key.to_string(), "default/pipelines/world");
    }

    #[test]
    fn test_round_trip() {
        let key = RunKey::new("build-eu", "team-a", "pull-unit-7");
        let parsed: RunKey = key.to_string().parse().unwrap();
        assert_eq!(parsed, key);
    }

    #[test]
    fn test_parse_rejects_wrong_arity() {
        for bad in ["", "solo", "two/parts", "a/b/c/d"] {
            match bad.parse::<RunKey>() {
                Err(Error::MalformedKey { key }) => assert_eq!(key, bad),
                other => panic!("expected MalformedKey for {bad:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_parse_allows_empty_parts() {
        // Empty segments decode; validation of the parts is the caller's job.
        let parsed: RunKey = "default//world".parse().unwrap();
        assert_eq!(parsed, RunKey::new("default", "", "world"));
    }
}
